use super::{Force, ForceInput};
use crate::context::LayoutContext;
use crate::error::{Error, Result, ensure_non_negative};
use crate::geometry::{MIN_DISTANCE, Point, Vector2D};
use beluga_graph::Identifier;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

/// Hookean spring of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpringParameters {
    pub stiffness: f64,
    /// Rest length. Zero gives the linear ForceAtlas2 attraction.
    pub length: f64,
}

impl Default for SpringParameters {
    fn default() -> Self {
        Self {
            stiffness: 1.0,
            length: 0.0,
        }
    }
}

impl SpringParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("stiffness", self.stiffness)?;
        ensure_non_negative("length", self.length)
    }
}

/// `stiffness * (length - rest)` along every incident edge.
#[derive(Debug, Clone)]
pub struct SpringForce<E> {
    default: SpringParameters,
    overrides: IndexMap<E, SpringParameters, FxBuildHasher>,
    resolved: IndexMap<E, SpringParameters, FxBuildHasher>,
}

impl<E: Identifier> SpringForce<E> {
    pub fn new(
        default: SpringParameters,
        overrides: IndexMap<E, SpringParameters, FxBuildHasher>,
    ) -> Self {
        Self {
            default,
            overrides,
            resolved: IndexMap::default(),
        }
    }

    /// Parameters in effect for `edge` after [`Force::init`].
    pub fn parameters(&self, edge: &E) -> Option<&SpringParameters> {
        self.resolved.get(edge)
    }
}

impl<V: Identifier, E: Identifier> Force<V, E> for SpringForce<E> {
    fn init(&mut self, context: &LayoutContext<'_, V, E>) -> Result<()> {
        self.default.validate()?;
        let graph = context.graph();
        for (edge, params) in &self.overrides {
            if !graph.has_edge(edge) {
                return Err(Error::UnknownEdge {
                    edge: format!("{edge:?}"),
                });
            }
            params.validate()?;
        }

        self.resolved = graph
            .edges()
            .map(|(edge, _, _)| {
                let params = self.overrides.get(edge).copied().unwrap_or(self.default);
                (edge.clone(), params)
            })
            .collect();
        Ok(())
    }

    fn apply(&self, vertex: &V, point: &Point, input: &ForceInput<'_, '_, V, E>) -> Vector2D {
        let context = input.context;
        let mut total = Vector2D::ZERO;
        for (edge, other) in context.graph().incident(vertex) {
            let Some(other) = context.position(other) else {
                continue;
            };
            let delta = other - point.position();
            let length = delta.magnitude();
            if length < MIN_DISTANCE {
                continue;
            }
            debug_assert!(self.resolved.contains_key(edge), "spring force used before init");
            let params = self.resolved.get(edge).copied().unwrap_or(self.default);
            total += delta * (params.stiffness * (length - params.length) / length);
        }
        total
    }
}
