use super::{LayoutInput, Placement, Setup};
use crate::context::LayoutContext;
use crate::error::{Error, Result, ensure_positive};
use crate::geometry::Vector2D;
use beluga_graph::alg::{bfs_from, components};
use beluga_graph::{Graph, Identifier};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Distance between consecutive seed rings, in units of `spacing`.
const RING_GAP: f64 = 2.0;

/// Graph-aware placement.
///
/// Vertices reachable from a supplied position grow outwards from it in breadth-first order,
/// each one dropped next to its already placed neighbors. Every component without a supplied
/// position gets a seed on expanding rings around the anchor (the centroid of the supplied
/// positions, or `center`) and grows from there. A short annealing pass then relaxes the
/// generated points towards edge length `spacing`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircleAnnealingSetup {
    pub center: Vector2D,
    pub spacing: f64,
    pub sweeps: usize,
    /// Temperature multiplier per sweep, in `(0, 1]`.
    pub cooling: f64,
}

impl Default for CircleAnnealingSetup {
    fn default() -> Self {
        Self {
            center: Vector2D::ZERO,
            spacing: 1.0,
            sweeps: 20,
            cooling: 0.85,
        }
    }
}

impl CircleAnnealingSetup {
    fn validate(&self) -> Result<()> {
        ensure_positive("spacing", self.spacing)?;
        ensure_positive("cooling", self.cooling)?;
        if self.cooling > 1.0 {
            return Err(Error::InvalidParameter {
                name: "cooling",
                reason: format!("expected a value in (0, 1], got {}", self.cooling),
            });
        }
        Ok(())
    }

    fn jitter(&self, rng: &mut dyn RngCore, radius: f64) -> Vector2D {
        let angle = rng.gen_range(0.0..TAU);
        let r = radius * rng.gen_range(0.5..1.0);
        Vector2D::new(angle.cos(), angle.sin()) * r
    }

    /// Places every unplaced vertex of `order` next to the mean of its placed neighbors.
    fn grow<V: Identifier, E: Identifier>(
        &self,
        graph: &Graph<V, E>,
        order: &[usize],
        positions: &mut [Option<Vector2D>],
        fallback: Vector2D,
        rng: &mut dyn RngCore,
    ) {
        for &v in order {
            if positions[v].is_some() {
                continue;
            }
            let mean = neighbor_mean(graph, v, positions).unwrap_or(fallback);
            positions[v] = Some(mean + self.jitter(rng, self.spacing));
        }
    }

    /// Edge-length energy of `v` at `p` against its neighbors.
    fn local_energy<V: Identifier, E: Identifier>(
        &self,
        graph: &Graph<V, E>,
        v: usize,
        p: Vector2D,
        positions: &[Option<Vector2D>],
    ) -> f64 {
        graph
            .neighbor_indices(v)
            .filter_map(|n| positions[n])
            .map(|q| {
                let stretch = p.distance(q) - self.spacing;
                stretch * stretch
            })
            .sum()
    }

    fn anneal<V: Identifier, E: Identifier>(
        &self,
        graph: &Graph<V, E>,
        generated: &[usize],
        positions: &mut [Option<Vector2D>],
        rng: &mut dyn RngCore,
    ) {
        let mut temperature = self.spacing;
        for _ in 0..self.sweeps {
            temperature *= self.cooling;
            for &v in generated {
                if graph.degree_at(v) == 0 {
                    continue;
                }
                let Some(current) = positions[v] else {
                    continue;
                };
                let candidate = current + self.jitter(rng, temperature);
                let delta = self.local_energy(graph, v, candidate, positions)
                    - self.local_energy(graph, v, current, positions);
                let threshold = (-delta / temperature).exp();
                if delta <= 0.0 || rng.gen_range(0.0..1.0) < threshold {
                    positions[v] = Some(candidate);
                }
            }
        }
    }
}

fn neighbor_mean<V: Identifier, E: Identifier>(
    graph: &Graph<V, E>,
    v: usize,
    positions: &[Option<Vector2D>],
) -> Option<Vector2D> {
    let (sum, count) = graph
        .neighbor_indices(v)
        .filter_map(|n| positions[n])
        .fold((Vector2D::ZERO, 0usize), |(s, c), p| (s + p, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn farthest(anchor: Vector2D, points: impl IntoIterator<Item = Vector2D>, start: f64) -> f64 {
    points
        .into_iter()
        .map(|p| p.distance(anchor))
        .fold(start, f64::max)
}

/// Slots on concentric rings; ring `k` holds `6 * (k + 1)` evenly spaced seeds.
///
/// A new ring opens at least `gap` outside the previous one and outside everything placed so
/// far, so components grown from earlier seeds never sit under a later ring.
struct Rings {
    anchor: Vector2D,
    gap: f64,
    radius: f64,
    ring: usize,
    slot: usize,
}

impl Rings {
    fn new(anchor: Vector2D, gap: f64) -> Self {
        Self {
            anchor,
            gap,
            radius: 0.0,
            ring: 0,
            slot: 0,
        }
    }

    /// Next seed position; `extent` is the current distance of the farthest placed point from
    /// the anchor.
    fn next_slot(&mut self, extent: f64) -> Vector2D {
        if self.slot == 0 {
            self.radius = (self.radius + self.gap).max(extent + self.gap);
        }
        let capacity = 6 * (self.ring + 1);
        let angle = TAU * self.slot as f64 / capacity as f64;
        self.slot += 1;
        if self.slot == capacity {
            self.ring += 1;
            self.slot = 0;
        }
        self.anchor + Vector2D::new(angle.cos(), angle.sin()) * self.radius
    }
}

impl<V: Identifier, E: Identifier> Setup<V, E> for CircleAnnealingSetup {
    fn run<'g>(
        &self,
        graph: &'g Graph<V, E>,
        input: &LayoutInput<V>,
        rng: &mut dyn RngCore,
    ) -> Result<LayoutContext<'g, V, E>> {
        self.validate()?;
        let placement = Placement::new(graph, input, self.center)?;
        let supplied = placement.supplied_positions();
        let anchor = placement
            .supplied_centroid()
            .filter(|c| c.is_finite())
            .unwrap_or(self.center);

        let mut positions = supplied.clone();
        let seeds: Vec<usize> = (0..supplied.len())
            .filter(|&i| supplied[i].is_some())
            .collect();
        self.grow(graph, &bfs_from(graph, &seeds), &mut positions, anchor, rng);

        let mut extent = farthest(anchor, positions.iter().flatten().copied(), 0.0);
        let mut rings = Rings::new(anchor, RING_GAP * self.spacing);
        let mut anything_placed = !seeds.is_empty();
        let mut ring_seeds = 0usize;
        for component in components(graph) {
            if component.iter().any(|&v| positions[v].is_some()) {
                continue;
            }
            let seed = component[0];
            positions[seed] = Some(if anything_placed {
                ring_seeds += 1;
                rings.next_slot(extent)
            } else {
                anchor
            });
            anything_placed = true;
            self.grow(graph, &bfs_from(graph, &[seed]), &mut positions, anchor, rng);
            extent = farthest(anchor, component.iter().filter_map(|&v| positions[v]), extent);
        }

        let generated: Vec<usize> = (0..supplied.len())
            .filter(|&i| supplied[i].is_none())
            .collect();
        self.anneal(graph, &generated, &mut positions, rng);
        tracing::trace!(
            generated = generated.len(),
            ring_seeds,
            "circle annealing placement"
        );

        placement.finish(|v| {
            graph
                .vertex_index(v)
                .and_then(|i| positions[i])
                .unwrap_or(anchor)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CircleAnnealingSetup, RING_GAP, Rings};
    use crate::Error;
    use crate::geometry::Vector2D;
    use crate::rng::XorShift64Star;
    use crate::setup::{LayoutInput, Setup};
    use beluga_graph::Graph;

    #[test]
    fn ring_capacity_grows_by_six() {
        let mut rings = Rings::new(Vector2D::ZERO, 1.0);
        for _ in 0..6 {
            assert!((rings.next_slot(0.0).magnitude() - 1.0).abs() < 1e-12);
        }
        for _ in 0..12 {
            assert!((rings.next_slot(0.0).magnitude() - 2.0).abs() < 1e-12);
        }
        assert!((rings.next_slot(0.0).magnitude() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn a_new_ring_opens_outside_the_placed_extent() {
        let mut rings = Rings::new(Vector2D::ZERO, 1.0);
        assert!((rings.next_slot(4.0).magnitude() - 5.0).abs() < 1e-12);
        // The rest of the ring keeps its radius even if the extent grows meanwhile.
        for _ in 1..6 {
            assert!((rings.next_slot(9.0).magnitude() - 5.0).abs() < 1e-12);
        }
        assert!((rings.next_slot(9.0).magnitude() - 10.0).abs() < 1e-12);
        assert!((rings.next_slot(0.0).magnitude() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn ring_seeds_clear_components_grown_before_them() {
        // A long path seeded at the center, then an isolated vertex seeded on the first ring.
        let mut g: Graph<u32, u32> = Graph::new();
        for v in 0..41 {
            g.add_vertex(v);
        }
        for v in 1..40 {
            g.add_edge(v, v - 1, v).unwrap();
        }
        let setup = CircleAnnealingSetup {
            sweeps: 0,
            ..CircleAnnealingSetup::default()
        };

        for seed in [1, 7, 42] {
            let mut rng = XorShift64Star::new(seed);
            let ctx = setup.run(&g, &LayoutInput::new(), &mut rng).unwrap();
            let path_extent = (0..40)
                .map(|v| ctx.position(&v).unwrap().magnitude())
                .fold(0.0, f64::max);
            let isolated = ctx.position(&40).unwrap().magnitude();
            assert!(
                isolated >= path_extent + RING_GAP * setup.spacing - 1e-9,
                "seed {seed}: {isolated} vs {path_extent}"
            );
        }
    }

    #[test]
    fn reachable_vertices_grow_from_the_supplied_position() {
        let mut g: Graph<u32, u32> = Graph::new();
        for v in 0..4 {
            g.add_vertex(v);
        }
        g.add_edge(0, 0, 1).unwrap();
        g.add_edge(1, 1, 2).unwrap();

        let anchor = Vector2D::new(50.0, 50.0);
        let input = LayoutInput::new().with_fixed(0, anchor);
        let mut rng = XorShift64Star::new(11);
        let ctx = CircleAnnealingSetup::default()
            .run(&g, &input, &mut rng)
            .unwrap();

        assert_eq!(ctx.position(&0), Some(anchor));
        for v in [1, 2] {
            let p = ctx.position(&v).unwrap();
            assert!(p.distance(anchor) < 20.0, "{v}: {p:?}");
        }
        // Vertex 3 is its own component and is seeded on the first ring.
        let isolated = ctx.position(&3).unwrap();
        assert!(isolated.distance(anchor) >= RING_GAP - 1e-9, "{isolated:?}");
        assert!(ctx.is_complete());
    }

    #[test]
    fn first_component_is_seeded_at_the_center_without_supplied_positions() {
        let mut g: Graph<u32, u32> = Graph::new();
        g.add_vertex(0);
        g.add_vertex(1);
        let setup = CircleAnnealingSetup {
            center: Vector2D::new(-3.0, 4.0),
            ..CircleAnnealingSetup::default()
        };
        let mut rng = XorShift64Star::default();
        let ctx = setup.run(&g, &LayoutInput::new(), &mut rng).unwrap();

        assert_eq!(ctx.position(&0), Some(Vector2D::new(-3.0, 4.0)));
        let p1 = ctx.position(&1).unwrap();
        assert!((p1.distance(Vector2D::new(-3.0, 4.0)) - RING_GAP).abs() < 1e-9);
    }

    #[test]
    fn rejects_cooling_above_one() {
        let g: Graph<u32, u32> = Graph::new();
        let setup = CircleAnnealingSetup {
            cooling: 1.5,
            ..CircleAnnealingSetup::default()
        };
        let mut rng = XorShift64Star::default();
        let err = setup.run(&g, &LayoutInput::new(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "cooling", .. }));
    }
}
