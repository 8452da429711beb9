//! Overlap-prevention pass run after the main loop.
//!
//! A fixed number of iterations with an exponentially decaying speed. Each point is assumed to
//! occupy a footprint of radius `point_size_scale * vertex_count + point_size_offset`; points whose
//! footprints overlap repel strongly, the rest weakly, while linear edge and center pulls keep
//! the overall shape. A point never moves by more than twice its footprint in one iteration.

use crate::context::LayoutContext;
use crate::error::{Error, Result, ensure_non_negative, ensure_positive};
use crate::forces::{
    Force, ForceInput, LinearCenterForce, LinearEdgeAttractionForce, OverlapRepulsionForce,
    total_force,
};
use crate::geometry::Vector2D;
use crate::quadtree::Quadtree;
use beluga_graph::Identifier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlapPreventionParameters {
    pub iterations: usize,
    pub initial_speed: f64,
    /// Speed multiplier applied after every iteration, in `[0, 1]`.
    pub speed_decay: f64,
    pub point_size_scale: f64,
    pub point_size_offset: f64,
    pub weak_repulsion: f64,
    pub strong_repulsion: f64,
    pub edge_attraction: f64,
    pub center_attraction: f64,
    /// `None` computes the repulsion exactly.
    pub barnes_hut_theta: Option<f64>,
}

impl Default for OverlapPreventionParameters {
    fn default() -> Self {
        Self {
            iterations: 30,
            initial_speed: 0.5,
            speed_decay: 0.9,
            point_size_scale: 0.002,
            point_size_offset: 0.3,
            weak_repulsion: 0.05,
            strong_repulsion: 5.0,
            edge_attraction: 0.02,
            center_attraction: 0.002,
            barnes_hut_theta: Some(1.0),
        }
    }
}

impl OverlapPreventionParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("initialSpeed", self.initial_speed)?;
        ensure_non_negative("speedDecay", self.speed_decay)?;
        if self.speed_decay > 1.0 {
            return Err(Error::InvalidParameter {
                name: "speedDecay",
                reason: format!("expected a value in [0, 1], got {}", self.speed_decay),
            });
        }
        ensure_non_negative("pointSizeScale", self.point_size_scale)?;
        ensure_non_negative("pointSizeOffset", self.point_size_offset)?;
        ensure_non_negative("weakRepulsion", self.weak_repulsion)?;
        ensure_non_negative("strongRepulsion", self.strong_repulsion)?;
        ensure_non_negative("edgeAttraction", self.edge_attraction)?;
        ensure_non_negative("centerAttraction", self.center_attraction)?;
        if let Some(theta) = self.barnes_hut_theta {
            ensure_non_negative("barnesHutTheta", theta)?;
        }
        Ok(())
    }

    /// Footprint radius assumed for every point of a graph with `vertex_count` vertices.
    pub fn point_size(&self, vertex_count: usize) -> f64 {
        self.point_size_scale * vertex_count as f64 + self.point_size_offset
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessingReport {
    pub iterations: usize,
    pub point_size: f64,
    /// Largest single-iteration displacement of any point.
    pub max_displacement: f64,
}

#[derive(Debug, Clone)]
pub struct OverlapPrevention {
    params: OverlapPreventionParameters,
}

impl OverlapPrevention {
    pub fn new(params: OverlapPreventionParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &OverlapPreventionParameters {
        &self.params
    }

    pub fn run<V: Identifier, E: Identifier>(
        &self,
        context: &mut LayoutContext<'_, V, E>,
    ) -> Result<PostProcessingReport> {
        let params = self.params;
        let point_size = params.point_size(context.graph().vertex_count());
        ensure_positive("pointSize", point_size)?;
        let cap = 2.0 * point_size;

        let forces: Vec<Box<dyn Force<V, E> + '_>> = vec![
            Box::new(OverlapRepulsionForce::new(
                params.weak_repulsion,
                params.strong_repulsion,
                point_size,
                params.barnes_hut_theta.unwrap_or(0.0),
            )),
            Box::new(LinearEdgeAttractionForce::new(params.edge_attraction)),
            Box::new(LinearCenterForce::new(params.center_attraction)),
        ];

        let mut speed = params.initial_speed;
        let mut max_displacement: f64 = 0.0;
        let mut iterations = 0;
        if context.moving_points().is_empty() {
            return Ok(PostProcessingReport {
                iterations,
                point_size,
                max_displacement,
            });
        }

        for _ in 0..params.iterations {
            let quadtree = match params.barnes_hut_theta {
                Some(_) => Some(Quadtree::build(context.bodies(true, |_| 1.0))?),
                None => None,
            };
            let input = ForceInput {
                context: &*context,
                quadtree: quadtree.as_ref(),
            };
            let step: Vec<Vector2D> = context
                .moving_points()
                .iter()
                .map(|(v, p)| total_force(&forces, v, p, &input))
                .collect();

            for (point, force) in context.moving_points_mut().values_mut().zip(step) {
                point.apply_force(force);
                let displacement = point.integrate(speed, cap);
                max_displacement = max_displacement.max(displacement.magnitude());
            }
            speed *= params.speed_decay;
            iterations += 1;
        }

        tracing::debug!(iterations, point_size, max_displacement, "overlap prevention done");
        Ok(PostProcessingReport {
            iterations,
            point_size,
            max_displacement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{OverlapPrevention, OverlapPreventionParameters};
    use crate::Error;
    use crate::context::LayoutContext;
    use crate::geometry::Vector2D;
    use beluga_graph::Graph;

    #[test]
    fn footprint_grows_linearly_with_graph_size() {
        let p = OverlapPreventionParameters {
            point_size_scale: 0.5,
            point_size_offset: 1.0,
            ..OverlapPreventionParameters::default()
        };
        assert_eq!(p.point_size(0), 1.0);
        assert_eq!(p.point_size(4), 3.0);
    }

    #[test]
    fn separates_coincident_points_and_keeps_fixed_ones() {
        let mut g: Graph<u8, u8> = Graph::new();
        for v in 0..3 {
            g.add_vertex(v);
        }
        let mut ctx = LayoutContext::new(&g, Vector2D::ZERO);
        ctx.add_moving_point(0, Vector2D::new(0.0, 0.0)).unwrap();
        ctx.add_moving_point(1, Vector2D::new(0.01, 0.0)).unwrap();
        ctx.add_fixed_point(2, Vector2D::new(0.0, 0.01)).unwrap();

        let before = ctx.position(&0).unwrap().distance(ctx.position(&1).unwrap());
        let report = OverlapPrevention::new(OverlapPreventionParameters::default())
            .unwrap()
            .run(&mut ctx)
            .unwrap();
        let after = ctx.position(&0).unwrap().distance(ctx.position(&1).unwrap());

        assert_eq!(report.iterations, 30);
        assert!(after > before, "{before} -> {after}");
        assert_eq!(ctx.position(&2), Some(Vector2D::new(0.0, 0.01)));
        assert!(report.max_displacement <= 2.0 * report.point_size + 1e-12);
    }

    #[test]
    fn rejects_zero_footprint_and_bad_decay() {
        let p = OverlapPreventionParameters {
            speed_decay: 1.5,
            ..OverlapPreventionParameters::default()
        };
        assert!(matches!(
            OverlapPrevention::new(p),
            Err(Error::InvalidParameter { name: "speedDecay", .. })
        ));

        let mut g: Graph<u8, u8> = Graph::new();
        g.add_vertex(0);
        let mut ctx = LayoutContext::new(&g, Vector2D::ZERO);
        ctx.add_moving_point(0, Vector2D::ZERO).unwrap();
        let p = OverlapPreventionParameters {
            point_size_scale: 0.0,
            point_size_offset: 0.0,
            ..OverlapPreventionParameters::default()
        };
        let err = OverlapPrevention::new(p).unwrap().run(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "pointSize", .. }));
    }
}
