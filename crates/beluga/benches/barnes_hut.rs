use beluga::forces::{Force, ForceInput, RepulsionForce, RepulsionParameters};
use beluga::quadtree::Quadtree;
use beluga::{Graph, LayoutContext, Vector2D};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

fn grid(side: usize) -> Graph<usize, usize> {
    let mut g = Graph::with_capacity(side * side, 2 * side * side);
    for v in 0..side * side {
        g.add_vertex(v);
    }
    let mut edge = 0;
    for r in 0..side {
        for c in 0..side {
            let v = r * side + c;
            if c + 1 < side {
                g.add_edge(edge, v, v + 1).unwrap();
                edge += 1;
            }
            if r + 1 < side {
                g.add_edge(edge, v, v + side).unwrap();
                edge += 1;
            }
        }
    }
    g
}

fn placed(g: &Graph<usize, usize>, side: usize) -> LayoutContext<'_, usize, usize> {
    let mut ctx = LayoutContext::new(g, Vector2D::ZERO);
    for v in 0..side * side {
        let p = Vector2D::new((v % side) as f64, (v / side) as f64);
        ctx.add_moving_point(v, p).unwrap();
    }
    ctx
}

fn sweep(force: &RepulsionForce, ctx: &LayoutContext<'_, usize, usize>, tree: Option<&Quadtree>) {
    let input = ForceInput {
        context: ctx,
        quadtree: tree,
    };
    let mut total = Vector2D::ZERO;
    for (v, p) in ctx.moving_points() {
        total += force.apply(v, p, &input);
    }
    black_box(total);
}

fn bench_repulsion(c: &mut Criterion) {
    let mut group = c.benchmark_group("repulsion");
    group.measurement_time(Duration::from_secs(10));

    for side in [10usize, 20, 40] {
        let g = grid(side);
        let ctx = placed(&g, side);
        let name = format!("grid_{side}x{side}");

        let exact = RepulsionForce::new(RepulsionParameters {
            barnes_hut_theta: None,
            ..RepulsionParameters::default()
        });
        group.bench_with_input(BenchmarkId::new("exact", &name), &ctx, |b, ctx| {
            b.iter(|| sweep(&exact, ctx, None))
        });

        let params = RepulsionParameters::default();
        let approx = RepulsionForce::new(params);
        group.bench_with_input(BenchmarkId::new("barnes_hut", &name), &ctx, |b, ctx| {
            b.iter(|| {
                let tree = Quadtree::build(ctx.bodies(true, |p| params.mass(p))).unwrap();
                sweep(&approx, ctx, Some(&tree));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_repulsion);
criterion_main!(benches);
