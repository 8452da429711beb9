//! Graph container consumed by `beluga`.
//!
//! The force layout engine only needs an undirected simple graph: vertices and edges carry
//! caller-chosen identities, every edge joins two distinct vertices, and at most one edge joins
//! any pair. Insertion order is preserved everywhere so that layouts are reproducible.

pub mod alg;
mod error;

pub use error::{Error, Result};

use rustc_hash::FxBuildHasher;
use std::fmt::Debug;
use std::hash::Hash;

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// Identity type usable for vertices and edges.
pub trait Identifier: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Identifier for T {}

#[derive(Debug, Clone)]
struct VertexEntry<V> {
    id: V,
    incident: Vec<usize>,
}

#[derive(Debug, Clone)]
struct EdgeEntry<E> {
    id: E,
    a: usize,
    b: usize,
}

#[derive(Debug, Clone)]
pub struct Graph<V, E> {
    vertices: Vec<VertexEntry<V>>,
    vertex_index: HashMap<V, usize>,

    edges: Vec<EdgeEntry<E>>,
    edge_index: HashMap<E, usize>,

    // Canonical `(min, max)` vertex-index pair of every edge; enforces the simple-graph rule.
    pair_index: HashMap<(usize, usize), usize>,
}

impl<V: Identifier, E: Identifier> Default for Graph<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

impl<V: Identifier, E: Identifier> Graph<V, E> {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            vertex_index: HashMap::default(),
            edges: Vec::new(),
            edge_index: HashMap::default(),
            pair_index: HashMap::default(),
        }
    }

    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        let mut g = Self::new();
        g.vertices.reserve(vertices);
        g.vertex_index.reserve(vertices);
        g.edges.reserve(edges);
        g.edge_index.reserve(edges);
        g.pair_index.reserve(edges);
        g
    }

    /// Adds a vertex. Returns `false` when the vertex already exists (the call is a no-op).
    pub fn add_vertex(&mut self, id: V) -> bool {
        if self.vertex_index.contains_key(&id) {
            return false;
        }
        let idx = self.vertices.len();
        self.vertices.push(VertexEntry {
            id: id.clone(),
            incident: Vec::new(),
        });
        self.vertex_index.insert(id, idx);
        true
    }

    /// Adds an undirected edge between two existing, distinct, not yet connected vertices.
    pub fn add_edge(&mut self, id: E, a: V, b: V) -> Result<()> {
        if self.edge_index.contains_key(&id) {
            return Err(Error::DuplicateEdge {
                edge: format!("{id:?}"),
            });
        }
        let Some(&ai) = self.vertex_index.get(&a) else {
            return Err(Error::MissingEndpoint {
                edge: format!("{id:?}"),
                vertex: format!("{a:?}"),
            });
        };
        let Some(&bi) = self.vertex_index.get(&b) else {
            return Err(Error::MissingEndpoint {
                edge: format!("{id:?}"),
                vertex: format!("{b:?}"),
            });
        };
        if ai == bi {
            return Err(Error::SelfLoop {
                edge: format!("{id:?}"),
                vertex: format!("{a:?}"),
            });
        }
        let pair = canonical_pair(ai, bi);
        if let Some(&existing) = self.pair_index.get(&pair) {
            return Err(Error::ParallelEdge {
                edge: format!("{id:?}"),
                existing: format!("{:?}", self.edges[existing].id),
            });
        }

        let idx = self.edges.len();
        self.edges.push(EdgeEntry {
            id: id.clone(),
            a: ai,
            b: bi,
        });
        self.edge_index.insert(id, idx);
        self.pair_index.insert(pair, idx);
        self.vertices[ai].incident.push(idx);
        self.vertices[bi].incident.push(idx);
        Ok(())
    }

    pub fn has_vertex(&self, id: &V) -> bool {
        self.vertex_index.contains_key(id)
    }

    pub fn has_edge(&self, id: &E) -> bool {
        self.edge_index.contains_key(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &V> {
        self.vertices.iter().map(|v| &v.id)
    }

    pub fn vertex(&self, index: usize) -> Option<&V> {
        self.vertices.get(index).map(|v| &v.id)
    }

    pub fn vertex_index(&self, id: &V) -> Option<usize> {
        self.vertex_index.get(id).copied()
    }

    /// Edges in insertion order, with their endpoints in the order they were given.
    pub fn edges(&self) -> impl ExactSizeIterator<Item = (&E, &V, &V)> {
        self.edges
            .iter()
            .map(|e| (&e.id, &self.vertices[e.a].id, &self.vertices[e.b].id))
    }

    pub fn edge_endpoints(&self, id: &E) -> Option<(&V, &V)> {
        let e = &self.edges[*self.edge_index.get(id)?];
        Some((&self.vertices[e.a].id, &self.vertices[e.b].id))
    }

    pub fn degree(&self, id: &V) -> usize {
        self.vertex_index
            .get(id)
            .map_or(0, |&idx| self.vertices[idx].incident.len())
    }

    pub fn degree_at(&self, index: usize) -> usize {
        self.vertices.get(index).map_or(0, |v| v.incident.len())
    }

    /// Incident edges of `id` paired with the opposite endpoint.
    pub fn incident(&self, id: &V) -> impl Iterator<Item = (&E, &V)> {
        self.vertex_index.get(id).into_iter().flat_map(move |&idx| {
            self.vertices[idx].incident.iter().map(move |&e| {
                let edge = &self.edges[e];
                let other = if edge.a == idx { edge.b } else { edge.a };
                (&edge.id, &self.vertices[other].id)
            })
        })
    }

    pub fn incident_edges(&self, id: &V) -> impl Iterator<Item = &E> {
        self.incident(id).map(|(e, _)| e)
    }

    pub fn neighbors(&self, id: &V) -> impl Iterator<Item = &V> {
        self.incident(id).map(|(_, v)| v)
    }

    /// Neighbor vertex indices of the vertex at `index`, in edge insertion order.
    pub fn neighbor_indices(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.vertices
            .get(index)
            .into_iter()
            .flat_map(move |v| v.incident.iter())
            .map(move |&e| {
                let edge = &self.edges[e];
                if edge.a == index { edge.b } else { edge.a }
            })
    }

    pub fn connecting_edge(&self, a: &V, b: &V) -> Option<&E> {
        let ai = self.vertex_index(a)?;
        let bi = self.vertex_index(b)?;
        let idx = self.pair_index.get(&canonical_pair(ai, bi))?;
        Some(&self.edges[*idx].id)
    }
}
