//! Forces of the overlap-prevention pass.
//!
//! Every point is assumed to occupy a disc of radius `point_size`; two discs overlap when their
//! centers are closer than `2 * point_size`.

use super::{Force, ForceInput, pair_repulsion};
use crate::context::LayoutContext;
use crate::geometry::{Point, Vector2D};
use beluga_graph::Identifier;

/// `weak / d` between points whose footprints are apart, `strong / d` between overlapping ones.
///
/// With a quadtree (unit masses, fixed points included) the weak term is Barnes-Hut
/// approximated and the strong term is a range query over the overlapping neighborhood.
#[derive(Debug, Clone)]
pub struct OverlapRepulsionForce {
    weak: f64,
    strong: f64,
    point_size: f64,
    theta: f64,
}

impl OverlapRepulsionForce {
    pub fn new(weak: f64, strong: f64, point_size: f64, theta: f64) -> Self {
        Self {
            weak,
            strong,
            point_size,
            theta,
        }
    }

    pub fn point_size(&self) -> f64 {
        self.point_size
    }

    fn intensity(&self, distance: f64) -> f64 {
        if distance < 2.0 * self.point_size {
            self.strong
        } else {
            self.weak
        }
    }

    fn exact<V: Identifier, E: Identifier>(
        &self,
        vertex: &V,
        point: &Point,
        context: &LayoutContext<'_, V, E>,
    ) -> Vector2D {
        let target = context.body_id(vertex);
        context
            .moving_points()
            .iter()
            .chain(context.fixed_points().iter())
            .enumerate()
            .filter(|(_, (other, _))| *other != vertex)
            .map(|(id, (_, other))| {
                let delta = point.position() - other.position();
                pair_repulsion(delta, self.intensity(delta.magnitude()), target, Some(id))
            })
            .sum()
    }
}

impl<V: Identifier, E: Identifier> Force<V, E> for OverlapRepulsionForce {
    fn apply(&self, vertex: &V, point: &Point, input: &ForceInput<'_, '_, V, E>) -> Vector2D {
        let Some(tree) = input.quadtree else {
            return self.exact(vertex, point, input.context);
        };
        let position = point.position();
        let exclude = input.context.body_id(vertex);

        let mut total = tree.accumulate(position, self.theta, exclude, |delta, mass, source| {
            pair_repulsion(delta, self.weak * mass, exclude, source)
        });
        tree.for_each_within(position, 2.0 * self.point_size, exclude, |b| {
            let strength = (self.strong - self.weak) * b.mass;
            total += pair_repulsion(position - b.position, strength, exclude, Some(b.id));
        });
        total
    }
}

/// `intensity * (neighbor - point)` summed over incident edges.
#[derive(Debug, Clone)]
pub struct LinearEdgeAttractionForce {
    intensity: f64,
}

impl LinearEdgeAttractionForce {
    pub fn new(intensity: f64) -> Self {
        Self { intensity }
    }
}

impl<V: Identifier, E: Identifier> Force<V, E> for LinearEdgeAttractionForce {
    fn apply(&self, vertex: &V, point: &Point, input: &ForceInput<'_, '_, V, E>) -> Vector2D {
        let context = input.context;
        context
            .graph()
            .neighbors(vertex)
            .filter_map(|other| context.position(other))
            .map(|other| (other - point.position()) * self.intensity)
            .sum()
    }
}

/// `intensity * (center - point)`.
#[derive(Debug, Clone)]
pub struct LinearCenterForce {
    intensity: f64,
}

impl LinearCenterForce {
    pub fn new(intensity: f64) -> Self {
        Self { intensity }
    }
}

impl<V: Identifier, E: Identifier> Force<V, E> for LinearCenterForce {
    fn apply(&self, _vertex: &V, point: &Point, input: &ForceInput<'_, '_, V, E>) -> Vector2D {
        (input.context.center() - point.position()) * self.intensity
    }
}
