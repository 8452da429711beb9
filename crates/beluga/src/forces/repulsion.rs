use super::{Force, ForceInput};
use crate::context::LayoutContext;
use crate::error::{Result, ensure_non_negative};
use crate::geometry::{MIN_DISTANCE, Point, Vector2D};
use beluga_graph::Identifier;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepulsionParameters {
    pub intensity: f64,
    /// Whether fixed points push moving points away.
    pub effect_from_fixed_nodes: bool,
    /// Scale by `(degree + 1)` of both points (ForceAtlas2 mass).
    pub degree_weighted: bool,
    /// Barnes-Hut accuracy threshold; `None` computes exact pairwise repulsion.
    pub barnes_hut_theta: Option<f64>,
}

impl Default for RepulsionParameters {
    fn default() -> Self {
        Self {
            intensity: 2.0,
            effect_from_fixed_nodes: true,
            degree_weighted: true,
            barnes_hut_theta: Some(1.2),
        }
    }
}

impl RepulsionParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("repulsion", self.intensity)?;
        if let Some(theta) = self.barnes_hut_theta {
            ensure_non_negative("barnesHutTheta", theta)?;
        }
        Ok(())
    }

    /// Mass a point carries as a repulsion source.
    pub fn mass(&self, point: &Point) -> f64 {
        if self.degree_weighted { point.mass() } else { 1.0 }
    }
}

/// `strength / d` along `delta` (source towards target). Coincident points get no force since
/// their direction is undefined; see [`pair_repulsion`] for bodies with known ids.
pub fn repulsion_kernel(delta: Vector2D, strength: f64) -> Vector2D {
    let d = delta.magnitude().max(MIN_DISTANCE);
    delta.normalize() * (strength / d)
}

/// Unit direction pushing body `target` away from body `source` when both sit on the same spot.
///
/// Depends only on the two ids and flips sign when they are swapped, so a coincident pair
/// separates in opposite directions and identical runs stay bit-identical.
pub fn tie_break_direction(target: usize, source: usize) -> Vector2D {
    let (lo, hi) = if target < source {
        (target, source)
    } else {
        (source, target)
    };
    let mix = (lo as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (hi as u64).wrapping_add(1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    let angle = TAU * ((mix >> 11) as f64 / (1u64 << 53) as f64);
    let dir = Vector2D::new(angle.cos(), angle.sin());
    if target < source { dir } else { -dir }
}

/// [`repulsion_kernel`] between two bodies. Exactly coincident bodies are pushed apart along
/// [`tie_break_direction`] as if they were `MIN_DISTANCE` apart.
pub fn pair_repulsion(
    delta: Vector2D,
    strength: f64,
    target: Option<usize>,
    source: Option<usize>,
) -> Vector2D {
    match (target, source) {
        (Some(t), Some(s)) if delta == Vector2D::ZERO && t != s => {
            tie_break_direction(t, s) * (strength / MIN_DISTANCE)
        }
        _ => repulsion_kernel(delta, strength),
    }
}

/// Inverse-distance repulsion, exact or Barnes-Hut approximated.
///
/// The approximated variant reads the quadtree from [`ForceInput`]; the tree must have been
/// built with [`RepulsionParameters::mass`] and must contain fixed points exactly when
/// `effect_from_fixed_nodes` is set. Without a tree the force falls back to the exact sum.
#[derive(Debug, Clone)]
pub struct RepulsionForce {
    params: RepulsionParameters,
}

impl RepulsionForce {
    pub fn new(params: RepulsionParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &RepulsionParameters {
        &self.params
    }

    fn exact<V: Identifier, E: Identifier>(
        &self,
        vertex: &V,
        point: &Point,
        context: &LayoutContext<'_, V, E>,
    ) -> Vector2D {
        let strength = self.params.intensity * self.params.mass(point);
        let target = context.body_id(vertex);
        let moving = context.moving_points().len();
        let fixed = context
            .fixed_points()
            .iter()
            .enumerate()
            .map(|(i, entry)| (moving + i, entry))
            .filter(|_| self.params.effect_from_fixed_nodes);
        context
            .moving_points()
            .iter()
            .enumerate()
            .chain(fixed)
            .filter(|(_, (other, _))| *other != vertex)
            .map(|(id, (_, other))| {
                pair_repulsion(
                    point.position() - other.position(),
                    strength * self.params.mass(other),
                    target,
                    Some(id),
                )
            })
            .sum()
    }
}

impl<V: Identifier, E: Identifier> Force<V, E> for RepulsionForce {
    fn init(&mut self, _context: &LayoutContext<'_, V, E>) -> Result<()> {
        self.params.validate()
    }

    fn apply(&self, vertex: &V, point: &Point, input: &ForceInput<'_, '_, V, E>) -> Vector2D {
        match (self.params.barnes_hut_theta, input.quadtree) {
            (Some(theta), Some(tree)) => {
                let strength = self.params.intensity * self.params.mass(point);
                let target = input.context.body_id(vertex);
                tree.accumulate(point.position(), theta, target, |delta, mass, source| {
                    pair_repulsion(delta, strength * mass, target, source)
                })
            }
            _ => self.exact(vertex, point, input.context),
        }
    }
}
