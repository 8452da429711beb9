use super::{Force, ForceInput};
use crate::context::LayoutContext;
use crate::error::{Result, ensure_non_negative};
use crate::geometry::{MIN_DISTANCE, Point, Vector2D};
use beluga_graph::Identifier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CenterParameters {
    pub intensity: f64,
    /// Scale by `(degree + 1)`, matching the repulsion mass.
    pub degree_weighted: bool,
}

impl Default for CenterParameters {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            degree_weighted: true,
        }
    }
}

/// Constant-magnitude pull towards the context center (ForceAtlas2 gravity).
///
/// Keeps disconnected components from drifting apart under repulsion.
#[derive(Debug, Clone)]
pub struct AttractToCenterForce {
    params: CenterParameters,
}

impl AttractToCenterForce {
    pub fn new(params: CenterParameters) -> Self {
        Self { params }
    }
}

impl<V: Identifier, E: Identifier> Force<V, E> for AttractToCenterForce {
    fn init(&mut self, _context: &LayoutContext<'_, V, E>) -> Result<()> {
        ensure_non_negative("gravity", self.params.intensity)
    }

    fn apply(&self, _vertex: &V, point: &Point, input: &ForceInput<'_, '_, V, E>) -> Vector2D {
        let delta = input.context.center() - point.position();
        if delta.magnitude() < MIN_DISTANCE {
            return Vector2D::ZERO;
        }
        let mass = if self.params.degree_weighted {
            point.mass()
        } else {
            1.0
        };
        delta.normalize() * (self.params.intensity * mass)
    }
}
