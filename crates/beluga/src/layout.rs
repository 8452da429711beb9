//! One layout invocation: setup, simulation, optional post-processing.

use crate::atlas2::{Atlas2, Atlas2Parameters, LayoutState};
use crate::error::Result;
use crate::forces::SpringParameters;
use crate::geometry::Vector2D;
use crate::postprocessing::{OverlapPrevention, OverlapPreventionParameters};
use crate::rng::{DEFAULT_SEED, XorShift64Star};
use crate::setup::{LayoutInput, Setup, SetupKind};
use beluga_graph::{Graph, Identifier};
use indexmap::IndexMap;
use rand::RngCore;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub state: LayoutState,
    pub steps: usize,
    /// Energy (sum of squared displacements) of every simulation step.
    pub energies: Vec<f64>,
    /// Zero when post-processing is disabled.
    pub post_processing_iterations: usize,
}

/// Final position of every vertex, in graph vertex order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutOutput<V: Identifier> {
    pub positions: IndexMap<V, Vector2D, FxBuildHasher>,
    pub report: LayoutReport,
}

impl<V: Identifier> LayoutOutput<V> {
    pub fn position(&self, vertex: &V) -> Option<Vector2D> {
        self.positions.get(vertex).copied()
    }
}

/// Layout configuration, reusable across graphs with the same edge identity type.
#[derive(Debug, Clone)]
pub struct Layout<E> {
    params: Atlas2Parameters,
    setup: SetupKind,
    edge_parameters: IndexMap<E, SpringParameters, FxBuildHasher>,
    post_processing: Option<OverlapPreventionParameters>,
}

impl<E: Identifier> Default for Layout<E> {
    fn default() -> Self {
        Self::new(Atlas2Parameters::default())
    }
}

impl<E: Identifier> Layout<E> {
    pub fn new(params: Atlas2Parameters) -> Self {
        Self {
            params,
            setup: SetupKind::default(),
            edge_parameters: IndexMap::default(),
            post_processing: None,
        }
    }

    pub fn with_setup(mut self, setup: SetupKind) -> Self {
        self.setup = setup;
        self
    }

    /// Per-edge spring overrides; edges not listed use the global attraction and rest length.
    pub fn with_edge_parameters(
        mut self,
        edge_parameters: IndexMap<E, SpringParameters, FxBuildHasher>,
    ) -> Self {
        self.edge_parameters = edge_parameters;
        self
    }

    pub fn with_edge_parameter(mut self, edge: E, params: SpringParameters) -> Self {
        self.edge_parameters.insert(edge, params);
        self
    }

    pub fn with_post_processing(mut self, params: OverlapPreventionParameters) -> Self {
        self.post_processing = Some(params);
        self
    }

    pub fn parameters(&self) -> &Atlas2Parameters {
        &self.params
    }

    pub fn setup(&self) -> &SetupKind {
        &self.setup
    }

    /// Runs with the deterministic default random source.
    pub fn run<V: Identifier>(
        &self,
        graph: &Graph<V, E>,
        input: &LayoutInput<V>,
    ) -> Result<LayoutOutput<V>> {
        let mut rng = XorShift64Star::new(DEFAULT_SEED);
        self.run_with_rng(graph, input, &mut rng)
    }

    /// Runs with a caller-supplied random source (only the setup draws from it).
    ///
    /// Every configuration error is reported before the simulation starts; no partial result
    /// is ever returned.
    pub fn run_with_rng<V: Identifier>(
        &self,
        graph: &Graph<V, E>,
        input: &LayoutInput<V>,
        rng: &mut dyn RngCore,
    ) -> Result<LayoutOutput<V>> {
        tracing::debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            fixed = input.fixed.len(),
            "starting layout"
        );
        let mut atlas = Atlas2::new(self.params, self.edge_parameters.clone())?;
        let post = self
            .post_processing
            .map(OverlapPrevention::new)
            .transpose()?;

        let mut context = self.setup.run(graph, input, rng)?;
        let report = atlas.run(&mut context)?;
        let post_report = match &post {
            Some(p) => Some(p.run(&mut context)?),
            None => None,
        };

        Ok(LayoutOutput {
            positions: context.positions(),
            report: LayoutReport {
                state: report.state,
                steps: report.steps,
                energies: report.energies,
                post_processing_iterations: post_report.map_or(0, |r| r.iterations),
            },
        })
    }
}

/// Lays out `graph` with default setup and no post-processing.
pub fn layout<V: Identifier, E: Identifier>(
    graph: &Graph<V, E>,
    input: &LayoutInput<V>,
    params: Atlas2Parameters,
) -> Result<LayoutOutput<V>> {
    Layout::new(params).run(graph, input)
}
