//! Barnes-Hut quadtree.
//!
//! The tree is rebuilt wholesale from a body list; there is no incremental update. Every node
//! keeps the number of bodies below it, their total mass and their mass-weighted centroid, so a
//! distant node can stand in for all of its bodies during a force query.

use crate::error::{Error, Result};
use crate::geometry::{MIN_DISTANCE, Vector2D};
use rustc_hash::FxHashMap;

// Below this depth coincident (or nearly coincident) bodies share a bucket leaf instead of
// splitting forever.
const MAX_DEPTH: usize = 48;

/// A point mass indexed by the tree. `id` is chosen by the caller and used for self-exclusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: usize,
    pub position: Vector2D,
    pub mass: f64,
}

/// Axis-aligned square region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: Vector2D,
    size: f64,
}

impl Bounds {
    pub fn new(min: Vector2D, size: f64) -> Result<Self> {
        if !(min.is_finite() && size.is_finite() && size > 0.0) {
            return Err(Error::DegenerateBounds { size });
        }
        Ok(Self { min, size })
    }

    /// Smallest padded square containing every position.
    pub fn enclosing(positions: impl IntoIterator<Item = Vector2D>) -> Result<Self> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut any = false;
        for p in positions {
            any = true;
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if !any {
            return Self::new(Vector2D::new(-0.5, -0.5), 1.0);
        }

        let extent = (max_x - min_x).max(max_y - min_y);
        let pad = (extent * 0.01).max(MIN_DISTANCE);
        Self::new(
            Vector2D::new(min_x - pad, min_y - pad),
            extent + 2.0 * pad,
        )
    }

    pub fn min(&self) -> Vector2D {
        self.min
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn center(&self) -> Vector2D {
        self.min + Vector2D::new(self.size / 2.0, self.size / 2.0)
    }

    pub fn contains(&self, p: Vector2D) -> bool {
        p.x >= self.min.x
            && p.x <= self.min.x + self.size
            && p.y >= self.min.y
            && p.y <= self.min.y + self.size
    }

    /// Quadrant index: 0 = (-x, -y), 1 = (+x, -y), 2 = (-x, +y), 3 = (+x, +y).
    pub fn quadrant(&self, p: Vector2D) -> usize {
        let c = self.center();
        usize::from(p.x >= c.x) | (usize::from(p.y >= c.y) << 1)
    }

    pub fn child(&self, quadrant: usize) -> Self {
        let half = self.size / 2.0;
        let dx = if quadrant & 1 == 1 { half } else { 0.0 };
        let dy = if quadrant & 2 == 2 { half } else { 0.0 };
        Self {
            min: self.min + Vector2D::new(dx, dy),
            size: half,
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Empty,
    /// Body indices. Holds a single body except for coincident bodies at the depth limit.
    Leaf(Vec<usize>),
    Internal([usize; 4]),
}

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: Bounds,
    count: usize,
    mass: f64,
    // Sum of `mass * position`; divided by `mass` once the build completes.
    centroid: Vector2D,
    kind: NodeKind,
}

impl QuadNode {
    fn empty(bounds: Bounds) -> Self {
        Self {
            bounds,
            count: 0,
            mass: 0.0,
            centroid: Vector2D::ZERO,
            kind: NodeKind::Empty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Quadtree {
    nodes: Vec<QuadNode>,
    bodies: Vec<Body>,
    by_id: FxHashMap<usize, usize>,
}

impl Quadtree {
    /// Builds a tree over `bodies` inside the smallest padded square that encloses them.
    pub fn build(bodies: Vec<Body>) -> Result<Self> {
        let bounds = Bounds::enclosing(bodies.iter().map(|b| b.position))?;
        Self::build_in(bounds, bodies)
    }

    /// Builds a tree over `bodies` inside explicit `bounds`.
    pub fn build_in(bounds: Bounds, bodies: Vec<Body>) -> Result<Self> {
        let mut by_id = FxHashMap::default();
        by_id.reserve(bodies.len());
        for (idx, b) in bodies.iter().enumerate() {
            by_id.insert(b.id, idx);
        }

        let mut tree = Self {
            nodes: vec![QuadNode::empty(bounds)],
            bodies,
            by_id,
        };
        for idx in 0..tree.bodies.len() {
            tree.insert_from(0, 0, idx);
        }
        for n in &mut tree.nodes {
            if n.mass > 0.0 {
                n.centroid = n.centroid / n.mass;
            }
        }

        debug_assert_eq!(tree.len(), tree.bodies.len());
        Ok(tree)
    }

    fn insert_from(&mut self, start: usize, start_depth: usize, body: usize) {
        let b = self.bodies[body];
        let mut node = start;
        let mut depth = start_depth;
        loop {
            let n = &mut self.nodes[node];
            n.count += 1;
            n.mass += b.mass;
            n.centroid += b.position * b.mass;

            match &mut n.kind {
                NodeKind::Empty => {
                    n.kind = NodeKind::Leaf(vec![body]);
                    return;
                }
                NodeKind::Internal(children) => {
                    node = children[n.bounds.quadrant(b.position)];
                    depth += 1;
                }
                NodeKind::Leaf(items) => {
                    let coincident = items
                        .iter()
                        .all(|&i| self.bodies[i].position == b.position);
                    if depth >= MAX_DEPTH || coincident {
                        items.push(body);
                        return;
                    }

                    let existing = std::mem::take(items);
                    let bounds = n.bounds;
                    let first_child = self.nodes.len();
                    for q in 0..4 {
                        self.nodes.push(QuadNode::empty(bounds.child(q)));
                    }
                    let children = [first_child, first_child + 1, first_child + 2, first_child + 3];
                    self.nodes[node].kind = NodeKind::Internal(children);

                    for e in existing {
                        let q = bounds.quadrant(self.bodies[e].position);
                        self.insert_from(children[q], depth + 1, e);
                    }
                    node = children[bounds.quadrant(b.position)];
                    depth += 1;
                }
            }
        }
    }

    /// Total number of indexed bodies.
    pub fn len(&self) -> usize {
        self.nodes[0].count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bounds(&self) -> Bounds {
        self.nodes[0].bounds
    }

    pub fn total_mass(&self) -> f64 {
        self.nodes[0].mass
    }

    /// Mass-weighted centroid of all bodies, if any.
    pub fn centroid(&self) -> Option<Vector2D> {
        (!self.is_empty()).then(|| self.nodes[0].centroid)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: usize) -> Option<&Body> {
        self.by_id.get(&id).map(|&idx| &self.bodies[idx])
    }

    /// Barnes-Hut accumulation of `kernel` contributions acting on `position`.
    ///
    /// `kernel(delta, mass, source)` receives the vector from the source (a body or a node
    /// centroid) to `position`, the source mass, and the body id when the source is a single body
    /// (`None` for a collapsed node). A node is collapsed into its centroid when
    /// `node_size / distance < theta`; `theta == 0` visits every body. The body `exclude` never
    /// contributes, and a node holding it is never collapsed.
    pub fn accumulate<F>(
        &self,
        position: Vector2D,
        theta: f64,
        exclude: Option<usize>,
        mut kernel: F,
    ) -> Vector2D
    where
        F: FnMut(Vector2D, f64, Option<usize>) -> Vector2D,
    {
        let anchor = exclude.and_then(|id| self.body(id)).map(|b| b.position);
        let mut total = Vector2D::ZERO;
        let mut stack: Vec<usize> = vec![0];

        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            match &n.kind {
                NodeKind::Empty => {}
                NodeKind::Leaf(items) => {
                    for &i in items {
                        let b = &self.bodies[i];
                        if Some(b.id) == exclude {
                            continue;
                        }
                        total += kernel(position - b.position, b.mass, Some(b.id));
                    }
                }
                NodeKind::Internal(children) => {
                    let holds_excluded = anchor.is_some_and(|a| n.bounds.contains(a));
                    let distance = position.distance(n.centroid).max(MIN_DISTANCE);
                    if !holds_excluded && n.bounds.size() / distance < theta {
                        total += kernel(position - n.centroid, n.mass, None);
                    } else {
                        // Reverse so children are visited in quadrant order.
                        stack.extend(children.iter().rev());
                    }
                }
            }
        }

        total.finite_or_zero()
    }

    /// Calls `f` for every body within `radius` of `position`, except `exclude`.
    pub fn for_each_within<F>(&self, position: Vector2D, radius: f64, exclude: Option<usize>, mut f: F)
    where
        F: FnMut(&Body),
    {
        let mut stack: Vec<usize> = vec![0];
        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            if n.count == 0 || !intersects_disc(&n.bounds, position, radius) {
                continue;
            }
            match &n.kind {
                NodeKind::Empty => {}
                NodeKind::Leaf(items) => {
                    for &i in items {
                        let b = &self.bodies[i];
                        if Some(b.id) != exclude && b.position.distance(position) < radius {
                            f(b);
                        }
                    }
                }
                NodeKind::Internal(children) => stack.extend(children.iter().rev()),
            }
        }
    }

    /// Verifies count and mass bookkeeping. Violations are programming errors.
    pub fn check_invariants(&self) {
        for (idx, n) in self.nodes.iter().enumerate() {
            let expected = match &n.kind {
                NodeKind::Empty => 0,
                NodeKind::Leaf(items) => items.len(),
                NodeKind::Internal(children) => children.iter().map(|&c| self.nodes[c].count).sum(),
            };
            assert_eq!(
                n.count, expected,
                "quadtree node {idx} count does not match its contents"
            );
        }
        assert_eq!(
            self.len(),
            self.bodies.len(),
            "quadtree root count does not match the body list"
        );
    }
}

fn intersects_disc(bounds: &Bounds, center: Vector2D, radius: f64) -> bool {
    let min = bounds.min();
    let max = min + Vector2D::new(bounds.size(), bounds.size());
    let nearest = Vector2D::new(center.x.clamp(min.x, max.x), center.y.clamp(min.y, max.y));
    nearest.distance(center) <= radius
}

#[cfg(test)]
mod tests {
    use super::{Body, Bounds, Quadtree};
    use crate::Error;
    use crate::geometry::Vector2D;

    fn body(id: usize, x: f64, y: f64) -> Body {
        Body {
            id,
            position: Vector2D::new(x, y),
            mass: 1.0,
        }
    }

    #[test]
    fn build_aggregates_count_and_centroid() {
        let tree = Quadtree::build(vec![
            body(0, 0.0, 0.0),
            body(1, 100.0, 0.0),
            body(2, 0.0, 100.0),
            body(3, 100.0, 100.0),
        ])
        .unwrap();

        tree.check_invariants();
        assert_eq!(tree.len(), 4);
        let c = tree.centroid().unwrap();
        assert!(c.distance(Vector2D::new(50.0, 50.0)) < 1e-9);
    }

    #[test]
    fn coincident_bodies_share_a_bucket() {
        let tree = Quadtree::build(vec![body(0, 1.0, 1.0), body(1, 1.0, 1.0), body(2, 1.0, 1.0)])
            .unwrap();
        tree.check_invariants();
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn degenerate_bounds_are_rejected() {
        assert!(matches!(
            Bounds::new(Vector2D::ZERO, 0.0),
            Err(Error::DegenerateBounds { .. })
        ));
        assert!(matches!(
            Quadtree::build(vec![body(0, f64::NAN, 0.0)]),
            Err(Error::DegenerateBounds { .. })
        ));
    }

    #[test]
    fn empty_tree_contributes_nothing() {
        let tree = Quadtree::build(Vec::new()).unwrap();
        assert!(tree.is_empty());
        let f = tree.accumulate(Vector2D::ZERO, 1.0, None, |d, m, _| d * m);
        assert_eq!(f, Vector2D::ZERO);
    }

    #[test]
    fn excluded_body_does_not_act_on_itself() {
        let tree = Quadtree::build(vec![body(0, 0.0, 0.0)]).unwrap();
        let f = tree.accumulate(Vector2D::ZERO, 0.5, Some(0), |_, _, _| Vector2D::new(1.0, 1.0));
        assert_eq!(f, Vector2D::ZERO);
    }

    #[test]
    fn for_each_within_reports_only_nearby_bodies() {
        let tree = Quadtree::build(vec![
            body(0, 0.0, 0.0),
            body(1, 1.0, 0.0),
            body(2, 10.0, 0.0),
            body(3, 0.0, 1.5),
        ])
        .unwrap();
        let mut seen = Vec::new();
        tree.for_each_within(Vector2D::ZERO, 2.0, Some(0), |b| seen.push(b.id));
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3]);
    }
}
