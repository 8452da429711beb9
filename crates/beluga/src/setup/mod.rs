//! Initial placement of every vertex before the simulation starts.
//!
//! Fixed vertices take their caller-supplied position (a fixed vertex without one is a
//! configuration error). Moving vertices keep a supplied initial position when there is one;
//! the strategy places the rest using the random source it is given.

mod circle;
mod square;

pub use circle::CircleAnnealingSetup;
pub use square::{SquareRandomBarycenterSetup, SquareRandomSetup};

use crate::context::LayoutContext;
use crate::error::{Error, Result};
use crate::geometry::Vector2D;
use beluga_graph::{Graph, Identifier};
use indexmap::{IndexMap, IndexSet};
use rand::{Rng, RngCore};
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

/// Caller-supplied positions and the subset of vertices that must not move.
#[derive(Debug, Clone)]
pub struct LayoutInput<V> {
    pub positions: IndexMap<V, Vector2D, FxBuildHasher>,
    pub fixed: IndexSet<V, FxBuildHasher>,
}

impl<V> Default for LayoutInput<V> {
    fn default() -> Self {
        Self {
            positions: IndexMap::default(),
            fixed: IndexSet::default(),
        }
    }
}

impl<V: Identifier> LayoutInput<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial position for a moving vertex.
    pub fn with_position(mut self, vertex: V, position: Vector2D) -> Self {
        self.positions.insert(vertex, position);
        self
    }

    /// Anchors `vertex` at `position`.
    pub fn with_fixed(mut self, vertex: V, position: Vector2D) -> Self {
        self.positions.insert(vertex.clone(), position);
        self.fixed.insert(vertex);
        self
    }
}

pub trait Setup<V, E> {
    fn run<'g>(
        &self,
        graph: &'g Graph<V, E>,
        input: &LayoutInput<V>,
        rng: &mut dyn RngCore,
    ) -> Result<LayoutContext<'g, V, E>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SetupKind {
    SquareRandom(SquareRandomSetup),
    SquareRandomBarycenter(SquareRandomBarycenterSetup),
    CircleAnnealing(CircleAnnealingSetup),
}

impl Default for SetupKind {
    fn default() -> Self {
        Self::SquareRandomBarycenter(SquareRandomBarycenterSetup::default())
    }
}

impl<V: Identifier, E: Identifier> Setup<V, E> for SetupKind {
    fn run<'g>(
        &self,
        graph: &'g Graph<V, E>,
        input: &LayoutInput<V>,
        rng: &mut dyn RngCore,
    ) -> Result<LayoutContext<'g, V, E>> {
        match self {
            Self::SquareRandom(s) => s.run(graph, input, rng),
            Self::SquareRandomBarycenter(s) => s.run(graph, input, rng),
            Self::CircleAnnealing(s) => s.run(graph, input, rng),
        }
    }
}

/// Setup in progress: fixed points are in the context, moving vertices wait in graph order.
#[derive(Debug)]
pub struct Placement<'g, V, E> {
    context: LayoutContext<'g, V, E>,
    moving: Vec<(V, Option<Vector2D>)>,
    supplied_centroid: Option<Vector2D>,
}

impl<'g, V: Identifier, E: Identifier> Placement<'g, V, E> {
    pub fn new(graph: &'g Graph<V, E>, input: &LayoutInput<V>, origin: Vector2D) -> Result<Self> {
        for v in &input.fixed {
            if !graph.has_vertex(v) {
                return Err(Error::UnknownVertex {
                    vertex: format!("{v:?}"),
                });
            }
            if !input.positions.contains_key(v) {
                return Err(Error::MissingFixedPosition {
                    vertex: format!("{v:?}"),
                });
            }
        }
        if let Some(v) = input.positions.keys().find(|v| !graph.has_vertex(v)) {
            return Err(Error::UnknownVertex {
                vertex: format!("{v:?}"),
            });
        }

        let mut context = LayoutContext::new(graph, origin);
        let mut moving = Vec::with_capacity(graph.vertex_count() - input.fixed.len());
        let mut sum = Vector2D::ZERO;
        for v in graph.vertices() {
            let supplied = input.positions.get(v).copied();
            if let Some(p) = supplied {
                sum += p;
            }
            match supplied {
                Some(p) if input.fixed.contains(v) => context.add_fixed_point(v.clone(), p)?,
                _ => moving.push((v.clone(), supplied)),
            }
        }

        let supplied_centroid =
            (!input.positions.is_empty()).then(|| sum / input.positions.len() as f64);
        if let Some(c) = supplied_centroid {
            if c.is_finite() {
                context.set_center(c);
            }
        }

        Ok(Self {
            context,
            moving,
            supplied_centroid,
        })
    }

    pub fn graph(&self) -> &'g Graph<V, E> {
        self.context.graph()
    }

    /// Centroid of every caller-supplied position (fixed and initial).
    pub fn supplied_centroid(&self) -> Option<Vector2D> {
        self.supplied_centroid
    }

    pub fn unplaced_count(&self) -> usize {
        self.moving.iter().filter(|(_, p)| p.is_none()).count()
    }

    /// Supplied positions (fixed or initial) indexed by graph vertex index.
    pub fn supplied_positions(&self) -> Vec<Option<Vector2D>> {
        // `moving` holds every non-fixed vertex in graph order.
        let mut moving = self.moving.iter();
        self.graph()
            .vertices()
            .map(|v| match self.context.position(v) {
                Some(p) => Some(p),
                None => moving.next().and_then(|(_, p)| *p),
            })
            .collect()
    }

    /// Places every remaining vertex with `place` (called in graph order) and returns the
    /// completed context.
    pub fn finish<F>(mut self, mut place: F) -> Result<LayoutContext<'g, V, E>>
    where
        F: FnMut(&V) -> Vector2D,
    {
        for (v, supplied) in std::mem::take(&mut self.moving) {
            let p = match supplied {
                Some(p) => p,
                None => place(&v),
            };
            self.context.add_moving_point(v, p)?;
        }
        debug_assert!(self.context.is_complete());
        tracing::debug!(
            moving = self.context.moving_points().len(),
            fixed = self.context.fixed_points().len(),
            "setup complete"
        );
        Ok(self.context)
    }
}

/// Uniform sample of the square of side `scale` centered on `center`.
pub(crate) fn sample_square(rng: &mut dyn RngCore, center: Vector2D, scale: f64) -> Vector2D {
    let x = rng.gen_range(-0.5..0.5);
    let y = rng.gen_range(-0.5..0.5);
    center + Vector2D::new(x, y) * scale
}
