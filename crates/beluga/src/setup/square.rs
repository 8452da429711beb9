use super::{LayoutInput, Placement, Setup, sample_square};
use crate::context::LayoutContext;
use crate::error::{Result, ensure_non_negative};
use crate::geometry::Vector2D;
use beluga_graph::{Graph, Identifier};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Uniform placement in a square of side `scale` centered on `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SquareRandomSetup {
    pub center: Vector2D,
    pub scale: f64,
}

impl Default for SquareRandomSetup {
    fn default() -> Self {
        Self {
            center: Vector2D::ZERO,
            scale: 1.0,
        }
    }
}

impl<V: Identifier, E: Identifier> Setup<V, E> for SquareRandomSetup {
    fn run<'g>(
        &self,
        graph: &'g Graph<V, E>,
        input: &LayoutInput<V>,
        rng: &mut dyn RngCore,
    ) -> Result<LayoutContext<'g, V, E>> {
        ensure_non_negative("scale", self.scale)?;
        let placement = Placement::new(graph, input, self.center)?;
        placement.finish(|_| sample_square(&mut *rng, self.center, self.scale))
    }
}

/// Uniform placement in a square around the centroid of the supplied positions.
///
/// The square side grows with the square root of the number of vertices to place, so the
/// initial density stays roughly constant. Without any supplied position the square is
/// centered on `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SquareRandomBarycenterSetup {
    pub origin: Vector2D,
    pub scale: f64,
}

impl Default for SquareRandomBarycenterSetup {
    fn default() -> Self {
        Self {
            origin: Vector2D::ZERO,
            scale: 1.0,
        }
    }
}

impl<V: Identifier, E: Identifier> Setup<V, E> for SquareRandomBarycenterSetup {
    fn run<'g>(
        &self,
        graph: &'g Graph<V, E>,
        input: &LayoutInput<V>,
        rng: &mut dyn RngCore,
    ) -> Result<LayoutContext<'g, V, E>> {
        ensure_non_negative("scale", self.scale)?;
        let placement = Placement::new(graph, input, self.origin)?;
        let center = placement
            .supplied_centroid()
            .filter(|c| c.is_finite())
            .unwrap_or(self.origin);
        let side = self.scale * (placement.unplaced_count() as f64).sqrt();
        placement.finish(|_| sample_square(&mut *rng, center, side))
    }
}

#[cfg(test)]
mod tests {
    use super::{SquareRandomBarycenterSetup, SquareRandomSetup};
    use crate::geometry::Vector2D;
    use crate::rng::XorShift64Star;
    use crate::setup::{LayoutInput, Setup};
    use beluga_graph::Graph;

    fn star(n: usize) -> Graph<usize, usize> {
        let mut g = Graph::new();
        for v in 0..n {
            g.add_vertex(v);
        }
        for v in 1..n {
            g.add_edge(v, 0, v).unwrap();
        }
        g
    }

    #[test]
    fn square_random_stays_inside_the_square() {
        let g = star(50);
        let setup = SquareRandomSetup {
            center: Vector2D::new(10.0, -4.0),
            scale: 2.0,
        };
        let mut rng = XorShift64Star::new(7);
        let ctx = setup.run(&g, &LayoutInput::new(), &mut rng).unwrap();

        assert!(ctx.is_complete());
        for p in ctx.moving_points().values() {
            let pos = p.position();
            assert!((9.0..=11.0).contains(&pos.x), "{pos:?}");
            assert!((-5.0..=-3.0).contains(&pos.y), "{pos:?}");
        }
    }

    #[test]
    fn barycenter_setup_centers_on_supplied_positions() {
        let g = star(5);
        let input = LayoutInput::new()
            .with_fixed(0, Vector2D::new(100.0, 100.0))
            .with_position(1, Vector2D::new(102.0, 100.0));
        let mut rng = XorShift64Star::new(3);
        let ctx = SquareRandomBarycenterSetup::default()
            .run(&g, &input, &mut rng)
            .unwrap();

        // Three vertices placed: side = sqrt(3).
        let half = 3f64.sqrt() / 2.0;
        let c = Vector2D::new(101.0, 100.0);
        assert_eq!(ctx.center(), c);
        assert_eq!(ctx.position(&1), Some(Vector2D::new(102.0, 100.0)));
        for v in 2..5 {
            let p = ctx.position(&v).unwrap();
            assert!((p.x - c.x).abs() <= half && (p.y - c.y).abs() <= half, "{p:?}");
        }
        // Moving points stay in graph order.
        let order: Vec<usize> = ctx.moving_points().keys().copied().collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }
}
