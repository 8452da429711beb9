//! Mutable state of one layout invocation.

use crate::error::{Error, Result};
use crate::geometry::{Point, Vector2D};
use crate::quadtree::Body;
use beluga_graph::{Graph, Identifier};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

pub type PointMap<V> = IndexMap<V, Point, FxBuildHasher>;

/// Graph reference plus the moving and fixed point sets.
///
/// Every graph vertex ends up in exactly one of the two sets once setup completes. Body ids
/// (used by the quadtree for self-exclusion) are the moving index for moving points and
/// `moving_count + fixed index` for fixed points.
#[derive(Debug, Clone)]
pub struct LayoutContext<'g, V, E> {
    graph: &'g Graph<V, E>,
    moving: PointMap<V>,
    fixed: PointMap<V>,
    center: Vector2D,
    origin: Vector2D,
}

impl<'g, V: Identifier, E: Identifier> LayoutContext<'g, V, E> {
    pub fn new(graph: &'g Graph<V, E>, origin: Vector2D) -> Self {
        Self {
            graph,
            moving: PointMap::default(),
            fixed: PointMap::default(),
            center: origin,
            origin,
        }
    }

    pub fn graph(&self) -> &'g Graph<V, E> {
        self.graph
    }

    fn checked_point(&self, vertex: &V, position: Vector2D) -> Result<()> {
        if !self.graph.has_vertex(vertex) {
            return Err(Error::UnknownVertex {
                vertex: format!("{vertex:?}"),
            });
        }
        if !position.is_finite() {
            return Err(Error::InvalidPosition {
                vertex: format!("{vertex:?}"),
                x: position.x,
                y: position.y,
            });
        }
        assert!(
            !self.moving.contains_key(vertex) && !self.fixed.contains_key(vertex),
            "vertex {vertex:?} placed twice"
        );
        Ok(())
    }

    pub fn add_moving_point(&mut self, vertex: V, position: Vector2D) -> Result<()> {
        self.checked_point(&vertex, position)?;
        let degree = self.graph.degree(&vertex);
        self.moving.insert(vertex, Point::new(position, degree));
        Ok(())
    }

    pub fn add_fixed_point(&mut self, vertex: V, position: Vector2D) -> Result<()> {
        self.checked_point(&vertex, position)?;
        let degree = self.graph.degree(&vertex);
        self.fixed.insert(vertex, Point::fixed(position, degree));
        Ok(())
    }

    pub fn moving_points(&self) -> &PointMap<V> {
        &self.moving
    }

    pub fn fixed_points(&self) -> &PointMap<V> {
        &self.fixed
    }

    // Only the integration phase of a simulation moves points.
    pub(crate) fn moving_points_mut(&mut self) -> &mut PointMap<V> {
        &mut self.moving
    }

    pub fn point(&self, vertex: &V) -> Option<&Point> {
        self.moving.get(vertex).or_else(|| self.fixed.get(vertex))
    }

    pub fn position(&self, vertex: &V) -> Option<Vector2D> {
        self.point(vertex).map(Point::position)
    }

    pub fn body_id(&self, vertex: &V) -> Option<usize> {
        self.moving
            .get_index_of(vertex)
            .or_else(|| self.fixed.get_index_of(vertex).map(|i| self.moving.len() + i))
    }

    pub fn is_placed(&self, vertex: &V) -> bool {
        self.point(vertex).is_some()
    }

    pub fn point_count(&self) -> usize {
        self.moving.len() + self.fixed.len()
    }

    /// Whether every graph vertex has exactly one point.
    pub fn is_complete(&self) -> bool {
        self.point_count() == self.graph.vertex_count()
            && self.graph.vertices().all(|v| self.is_placed(v))
    }

    /// Global center the attract-to-center forces pull towards.
    pub fn center(&self) -> Vector2D {
        self.center
    }

    pub fn set_center(&mut self, center: Vector2D) {
        self.center = center;
    }

    pub fn origin(&self) -> Vector2D {
        self.origin
    }

    /// Quadtree bodies for the current positions: moving points, then fixed points if requested.
    pub fn bodies<F>(&self, include_fixed: bool, mass: F) -> Vec<Body>
    where
        F: Fn(&Point) -> f64,
    {
        let moving = self.moving.values().enumerate();
        let fixed = self
            .fixed
            .values()
            .enumerate()
            .map(|(i, p)| (self.moving.len() + i, p))
            .filter(|_| include_fixed);
        moving
            .chain(fixed)
            .map(|(id, p)| Body {
                id,
                position: p.position(),
                mass: mass(p),
            })
            .collect()
    }

    /// All positions in graph vertex order.
    pub fn positions(&self) -> IndexMap<V, Vector2D, FxBuildHasher> {
        self.graph
            .vertices()
            .filter_map(|v| Some((v.clone(), self.position(v)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::LayoutContext;
    use crate::Error;
    use crate::geometry::Vector2D;
    use beluga_graph::Graph;

    fn path() -> Graph<&'static str, u32> {
        let mut g = Graph::new();
        g.add_vertex("a");
        g.add_vertex("b");
        g.add_edge(0, "a", "b").unwrap();
        g
    }

    #[test]
    fn body_ids_put_fixed_points_after_moving_points() {
        let g = path();
        let mut ctx = LayoutContext::new(&g, Vector2D::ZERO);
        ctx.add_fixed_point("a", Vector2D::new(1.0, 1.0)).unwrap();
        ctx.add_moving_point("b", Vector2D::ZERO).unwrap();

        assert_eq!(ctx.body_id(&"b"), Some(0));
        assert_eq!(ctx.body_id(&"a"), Some(1));
        assert!(ctx.is_complete());
        assert_eq!(ctx.point(&"a").unwrap().degree(), 1);
        assert!(ctx.point(&"a").unwrap().is_fixed());
    }

    #[test]
    fn rejects_unknown_vertices_and_non_finite_positions() {
        let g = path();
        let mut ctx = LayoutContext::new(&g, Vector2D::ZERO);
        assert!(matches!(
            ctx.add_moving_point("z", Vector2D::ZERO),
            Err(Error::UnknownVertex { .. })
        ));
        assert!(matches!(
            ctx.add_fixed_point("a", Vector2D::new(f64::INFINITY, 0.0)),
            Err(Error::InvalidPosition { .. })
        ));
        assert!(!ctx.is_complete());
    }
}
