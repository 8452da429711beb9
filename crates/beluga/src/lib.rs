#![forbid(unsafe_code)]

//! Force-directed 2D graph layout.
//!
//! A ForceAtlas2-style simulation with Barnes-Hut accelerated repulsion, pluggable initial
//! placement and an optional overlap-prevention pass. Given the same graph, input positions,
//! parameters and seed, a layout is bit-for-bit reproducible.

pub mod atlas2;
pub mod context;
pub mod document;
mod error;
pub mod forces;
pub mod geometry;
mod layout;
pub mod postprocessing;
pub mod quadtree;
mod rng;
pub mod schedule;
pub mod setup;

pub use atlas2::{Atlas2, Atlas2Parameters, Atlas2Report, LayoutState, SpeedController};
pub use beluga_graph::{Graph, Identifier};
pub use context::LayoutContext;
pub use document::{EdgeDocument, GraphDocument};
pub use error::{Error, Result};
pub use forces::SpringParameters;
pub use geometry::{Point, Vector2D};
pub use layout::{Layout, LayoutOutput, LayoutReport, layout};
pub use postprocessing::{OverlapPrevention, OverlapPreventionParameters, PostProcessingReport};
pub use rng::{DEFAULT_SEED, XorShift64Star};
pub use schedule::{ConstantSchedule, UpdateSchedule};
pub use setup::{
    CircleAnnealingSetup, LayoutInput, Setup, SetupKind, SquareRandomBarycenterSetup,
    SquareRandomSetup,
};
