//! Force terms of the simulation.
//!
//! A force is built once per run, initialised against the setup context, then queried for every
//! moving point at every step. Queries only read state; the simulation loop owns all position
//! updates.

mod center;
mod overlap;
mod repulsion;
mod spring;

pub use center::{AttractToCenterForce, CenterParameters};
pub use overlap::{LinearCenterForce, LinearEdgeAttractionForce, OverlapRepulsionForce};
pub use repulsion::{
    RepulsionForce, RepulsionParameters, pair_repulsion, repulsion_kernel, tie_break_direction,
};
pub use spring::{SpringForce, SpringParameters};

use crate::context::LayoutContext;
use crate::error::Result;
use crate::geometry::{Point, Vector2D};
use crate::quadtree::Quadtree;

/// Read-only view handed to every force at one step.
#[derive(Debug)]
pub struct ForceInput<'a, 'g, V, E> {
    pub context: &'a LayoutContext<'g, V, E>,
    /// Quadtree of the most recent scheduled rebuild, if the run uses one.
    pub quadtree: Option<&'a Quadtree>,
}

pub trait Force<V, E> {
    /// Precomputes per-run state and validates parameters against the graph.
    fn init(&mut self, context: &LayoutContext<'_, V, E>) -> Result<()> {
        let _ = context;
        Ok(())
    }

    /// Force acting on `point` (the point of `vertex`). Must not have side effects.
    fn apply(&self, vertex: &V, point: &Point, input: &ForceInput<'_, '_, V, E>) -> Vector2D;
}

/// Sum of every force on one point; non-finite terms are dropped.
pub fn total_force<V, E>(
    forces: &[Box<dyn Force<V, E> + '_>],
    vertex: &V,
    point: &Point,
    input: &ForceInput<'_, '_, V, E>,
) -> Vector2D {
    forces
        .iter()
        .map(|f| f.apply(vertex, point, input).finite_or_zero())
        .sum()
}
