//! Traversal helpers used by the layout setup strategies.
//!
//! Results are vertex indices (see [`Graph::vertex`]) in deterministic breadth-first order.

use crate::{Graph, Identifier};
use std::collections::VecDeque;

/// Connected components, ordered by their first vertex in insertion order.
pub fn components<V: Identifier, E: Identifier>(g: &Graph<V, E>) -> Vec<Vec<usize>> {
    let mut seen = vec![false; g.vertex_count()];
    let mut out: Vec<Vec<usize>> = Vec::new();

    for start in 0..g.vertex_count() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut comp: Vec<usize> = Vec::new();
        let mut q: VecDeque<usize> = VecDeque::new();
        q.push_back(start);
        while let Some(v) = q.pop_front() {
            comp.push(v);
            for n in g.neighbor_indices(v) {
                if !seen[n] {
                    seen[n] = true;
                    q.push_back(n);
                }
            }
        }
        out.push(comp);
    }

    out
}

/// Multi-source breadth-first order starting from `seeds`.
///
/// Seeds come first (deduplicated, out-of-range indices skipped), followed by every vertex
/// reachable from them. Unreachable vertices are not reported.
pub fn bfs_from<V: Identifier, E: Identifier>(g: &Graph<V, E>, seeds: &[usize]) -> Vec<usize> {
    let mut seen = vec![false; g.vertex_count()];
    let mut out: Vec<usize> = Vec::new();
    let mut q: VecDeque<usize> = VecDeque::new();

    for &s in seeds {
        if s >= seen.len() || seen[s] {
            continue;
        }
        seen[s] = true;
        q.push_back(s);
    }

    while let Some(v) = q.pop_front() {
        out.push(v);
        for n in g.neighbor_indices(v) {
            if !seen[n] {
                seen[n] = true;
                q.push_back(n);
            }
        }
    }

    out
}
