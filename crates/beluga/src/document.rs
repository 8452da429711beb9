//! JSON graph documents: a graph with string identities plus everything a run needs.
//!
//! ```json
//! {
//!   "vertices": ["a", "b", "c"],
//!   "edges": [{ "source": "a", "target": "b" }, { "id": "bc", "source": "b", "target": "c", "stiffness": 2.0 }],
//!   "fixed": { "a": { "x": 0.0, "y": 0.0 } },
//!   "initial": { "c": { "x": 4.0, "y": 1.0 } },
//!   "parameters": { "maxSteps": 500 },
//!   "setup": { "kind": "circle-annealing" },
//!   "overlapPrevention": { "iterations": 10 },
//!   "seed": 7
//! }
//! ```
//!
//! Every key is optional. Edge endpoints missing from `vertices` are added in edge order;
//! edges without an `id` are named `e<index>`.

use crate::atlas2::Atlas2Parameters;
use crate::error::Result;
use crate::forces::SpringParameters;
use crate::geometry::Vector2D;
use crate::layout::{Layout, LayoutOutput};
use crate::postprocessing::OverlapPreventionParameters;
use crate::rng::{DEFAULT_SEED, XorShift64Star};
use crate::setup::{LayoutInput, SetupKind};
use beluga_graph::Graph;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    /// Overrides `edgeAttraction` for this edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
    /// Overrides `restLength` for this edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

impl EdgeDocument {
    fn id(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("e{index}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphDocument {
    pub vertices: Vec<String>,
    pub edges: Vec<EdgeDocument>,
    pub fixed: IndexMap<String, Vector2D, FxBuildHasher>,
    pub initial: IndexMap<String, Vector2D, FxBuildHasher>,
    pub parameters: Atlas2Parameters,
    pub setup: SetupKind,
    pub overlap_prevention: Option<OverlapPreventionParameters>,
    pub seed: Option<u64>,
}

impl GraphDocument {
    pub fn graph(&self) -> Result<Graph<String, String>> {
        let mut graph = Graph::with_capacity(self.vertices.len(), self.edges.len());
        for v in &self.vertices {
            graph.add_vertex(v.clone());
        }
        for (index, edge) in self.edges.iter().enumerate() {
            graph.add_vertex(edge.source.clone());
            graph.add_vertex(edge.target.clone());
            graph.add_edge(edge.id(index), edge.source.clone(), edge.target.clone())?;
        }
        Ok(graph)
    }

    pub fn input(&self) -> LayoutInput<String> {
        let mut input = LayoutInput::new();
        for (v, p) in &self.initial {
            input = input.with_position(v.clone(), *p);
        }
        for (v, p) in &self.fixed {
            input = input.with_fixed(v.clone(), *p);
        }
        input
    }

    pub fn layout(&self) -> Layout<String> {
        let mut layout = Layout::new(self.parameters).with_setup(self.setup.clone());
        for (index, edge) in self.edges.iter().enumerate() {
            if edge.stiffness.is_none() && edge.length.is_none() {
                continue;
            }
            let spring = SpringParameters {
                stiffness: edge.stiffness.unwrap_or(self.parameters.edge_attraction),
                length: edge.length.unwrap_or(self.parameters.rest_length),
            };
            layout = layout.with_edge_parameter(edge.id(index), spring);
        }
        if let Some(post) = self.overlap_prevention {
            layout = layout.with_post_processing(post);
        }
        layout
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Builds the graph and runs the configured layout with the document seed.
    pub fn run(&self) -> Result<LayoutOutput<String>> {
        let graph = self.graph()?;
        let mut rng = XorShift64Star::new(self.seed());
        self.layout().run_with_rng(&graph, &self.input(), &mut rng)
    }
}
