//! The main simulation loop (ForceAtlas2 flavour).
//!
//! Each step rebuilds the quadtree when the schedule says so, evaluates every force for every
//! moving point, adapts the global speed from how much the forces swing between consecutive
//! steps, integrates, and sums the squared displacements into the step energy. The loop stops
//! when the energy falls below `min_energy_threshold` or after `max_steps` steps.

use crate::context::LayoutContext;
use crate::error::{Error, Result, ensure_non_negative, ensure_positive};
use crate::forces::{
    AttractToCenterForce, CenterParameters, Force, ForceInput, RepulsionForce,
    RepulsionParameters, SpringForce, SpringParameters, total_force,
};
use crate::geometry::{Point, Vector2D};
use crate::quadtree::Quadtree;
use crate::schedule::{ConstantSchedule, UpdateSchedule};
use beluga_graph::Identifier;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Atlas2Parameters {
    pub max_steps: usize,
    /// The run converges once the sum of squared step displacements drops below this.
    pub min_energy_threshold: f64,
    pub time_step: f64,
    pub repulsion: f64,
    pub edge_attraction: f64,
    pub rest_length: f64,
    pub gravity: f64,
    /// `None` selects exact pairwise repulsion.
    pub barnes_hut_theta: Option<f64>,
    /// Cap on a single point displacement per step.
    pub max_speed: f64,
    /// Cap on the global speed factor.
    pub max_speed_factor: f64,
    pub swing_tolerance: f64,
    pub max_global_speed_increase_ratio: f64,
    pub repulsion_from_fixed_points: bool,
    pub attract_to_center: bool,
    pub degree_weighted: bool,
    pub quadtree_update_increment: usize,
}

impl Default for Atlas2Parameters {
    fn default() -> Self {
        Self {
            max_steps: 2000,
            min_energy_threshold: 1e-3,
            time_step: 1.0,
            repulsion: 2.0,
            edge_attraction: 1.0,
            rest_length: 0.0,
            gravity: 1.0,
            barnes_hut_theta: Some(1.2),
            max_speed: 10.0,
            max_speed_factor: 10.0,
            swing_tolerance: 1.0,
            max_global_speed_increase_ratio: 1.5,
            repulsion_from_fixed_points: true,
            attract_to_center: true,
            degree_weighted: true,
            quadtree_update_increment: 3,
        }
    }
}

impl Atlas2Parameters {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("minEnergyThreshold", self.min_energy_threshold)?;
        ensure_positive("timeStep", self.time_step)?;
        ensure_non_negative("edgeAttraction", self.edge_attraction)?;
        ensure_non_negative("restLength", self.rest_length)?;
        ensure_non_negative("gravity", self.gravity)?;
        ensure_positive("maxSpeed", self.max_speed)?;
        ensure_positive("maxSpeedFactor", self.max_speed_factor)?;
        ensure_non_negative("swingTolerance", self.swing_tolerance)?;
        let ratio = self.max_global_speed_increase_ratio;
        if !(ratio.is_finite() && ratio >= 1.0) {
            return Err(Error::InvalidParameter {
                name: "maxGlobalSpeedIncreaseRatio",
                reason: format!("expected a finite value >= 1, got {ratio}"),
            });
        }
        self.repulsion_parameters().validate()?;
        ConstantSchedule::new(self.quadtree_update_increment)?;
        Ok(())
    }

    pub fn repulsion_parameters(&self) -> RepulsionParameters {
        RepulsionParameters {
            intensity: self.repulsion,
            effect_from_fixed_nodes: self.repulsion_from_fixed_points,
            degree_weighted: self.degree_weighted,
            barnes_hut_theta: self.barnes_hut_theta,
        }
    }

    pub fn spring_parameters(&self) -> SpringParameters {
        SpringParameters {
            stiffness: self.edge_attraction,
            length: self.rest_length,
        }
    }

    pub fn center_parameters(&self) -> CenterParameters {
        CenterParameters {
            intensity: self.gravity,
            degree_weighted: self.degree_weighted,
        }
    }

    fn mass(&self, point: &Point) -> f64 {
        if self.degree_weighted { point.mass() } else { 1.0 }
    }
}

/// Terminal state of a simulation run. Both are successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutState {
    Converged,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atlas2Report {
    pub state: LayoutState,
    pub steps: usize,
    /// Energy of every executed step.
    pub energies: Vec<f64>,
}

const MIN_SPEED_EFFICIENCY: f64 = 0.05;
const MAX_JITTER_TOLERANCE: f64 = 10.0;
const MAX_SPEED_FOR_EFFICIENCY_GROWTH: f64 = 1000.0;

/// Adaptive global speed (Jacomy et al., 2014).
///
/// `swing` is the mass-weighted sum of `|F(t) - F(t-1)|` over the moving points and `traction`
/// the mass-weighted sum of `|F(t) + F(t-1)| / 2`. High swing relative to traction means the
/// points oscillate, so the speed drops; the speed otherwise grows by at most
/// `max_global_speed_increase_ratio` per step, up to `max_speed_factor`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedController {
    speed: f64,
    efficiency: f64,
    tolerance: f64,
    max_factor: f64,
    max_rise: f64,
}

impl SpeedController {
    pub fn new(params: &Atlas2Parameters) -> Self {
        Self {
            speed: 1.0,
            efficiency: 1.0,
            tolerance: params.swing_tolerance,
            max_factor: params.max_speed_factor,
            max_rise: params.max_global_speed_increase_ratio - 1.0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    /// Updates and returns the global speed for one step over `points` moving points.
    pub fn adjust(&mut self, swing: f64, traction: f64, points: usize) -> f64 {
        let n = points.max(1) as f64;
        let estimated = 0.05 * n.sqrt();
        let min_jitter = estimated.sqrt();
        let mut jitter = self.tolerance
            * min_jitter.max(MAX_JITTER_TOLERANCE.min(estimated * traction / (n * n)));

        if traction > 0.0 && swing / traction > 2.0 {
            if self.efficiency > MIN_SPEED_EFFICIENCY {
                self.efficiency *= 0.5;
            }
            jitter = jitter.max(self.tolerance);
        }

        let target = if swing > 0.0 {
            jitter * self.efficiency * traction / swing
        } else {
            f64::INFINITY
        };

        if swing > jitter * traction {
            if self.efficiency > MIN_SPEED_EFFICIENCY {
                self.efficiency *= 0.7;
            }
        } else if self.speed < MAX_SPEED_FOR_EFFICIENCY_GROWTH {
            self.efficiency *= 1.3;
        }

        self.speed += (target - self.speed).min(self.max_rise * self.speed);
        self.speed = self.speed.min(self.max_factor);
        self.speed
    }

    /// Speed of one point given its own mass-weighted swing; swinging points slow down.
    pub fn point_factor(&self, swing: f64) -> f64 {
        self.speed / (1.0 + (self.speed * swing).sqrt())
    }
}

/// Configured simulation: parameters plus the force set built from them.
pub struct Atlas2<'f, V, E> {
    params: Atlas2Parameters,
    forces: Vec<Box<dyn Force<V, E> + 'f>>,
}

impl<V, E> std::fmt::Debug for Atlas2<'_, V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atlas2")
            .field("params", &self.params)
            .field("forces", &self.forces.len())
            .finish()
    }
}

impl<'f, V: Identifier + 'f, E: Identifier + 'f> Atlas2<'f, V, E> {
    /// Repulsion, springs (with per-edge overrides) and, if enabled, the center pull.
    pub fn new(
        params: Atlas2Parameters,
        edge_parameters: IndexMap<E, SpringParameters, FxBuildHasher>,
    ) -> Result<Self> {
        params.validate()?;
        let mut forces: Vec<Box<dyn Force<V, E> + 'f>> = vec![
            Box::new(RepulsionForce::new(params.repulsion_parameters())),
            Box::new(SpringForce::new(params.spring_parameters(), edge_parameters)),
        ];
        if params.attract_to_center {
            forces.push(Box::new(AttractToCenterForce::new(params.center_parameters())));
        }
        Ok(Self { params, forces })
    }

    /// Runs an explicit force set under `params`.
    pub fn with_forces(
        params: Atlas2Parameters,
        forces: Vec<Box<dyn Force<V, E> + 'f>>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, forces })
    }

    pub fn parameters(&self) -> &Atlas2Parameters {
        &self.params
    }

    /// Initialises every force against `context`, then simulates until convergence or
    /// `max_steps`. Fails before touching any position if a force rejects the context.
    pub fn run(&mut self, context: &mut LayoutContext<'_, V, E>) -> Result<Atlas2Report> {
        for force in &mut self.forces {
            force.init(context)?;
        }

        let params = self.params;
        let repulsion = params.repulsion_parameters();
        let mut schedule = ConstantSchedule::new(params.quadtree_update_increment)?;
        let mut controller = SpeedController::new(&params);
        let mut quadtree: Option<Quadtree> = None;
        let moving = context.moving_points().len();
        let mut previous = vec![Vector2D::ZERO; moving];
        let mut energies = Vec::new();
        let mut state = LayoutState::Exhausted;

        if moving == 0 {
            state = LayoutState::Converged;
        }

        for step in 0..params.max_steps {
            if moving == 0 {
                break;
            }

            if params.barnes_hut_theta.is_some() && schedule.is_time_to_update(step) {
                let bodies =
                    context.bodies(params.repulsion_from_fixed_points, |p| repulsion.mass(p));
                let tree = Quadtree::build(bodies)?;
                tracing::trace!(step, bodies = tree.len(), "rebuilt quadtree");
                quadtree = Some(tree);
            }

            let input = ForceInput {
                context: &*context,
                quadtree: quadtree.as_ref(),
            };
            let forces: Vec<Vector2D> = context
                .moving_points()
                .iter()
                .map(|(v, p)| total_force(&self.forces, v, p, &input))
                .collect();

            let mut swing = 0.0;
            let mut traction = 0.0;
            let mut swings = Vec::with_capacity(moving);
            let points = context.moving_points().values();
            for ((point, force), prev) in points.zip(&forces).zip(&previous) {
                let mass = params.mass(point);
                let s = mass * (*force - *prev).magnitude();
                swing += s;
                traction += mass * (*force + *prev).magnitude() / 2.0;
                swings.push(s);
            }
            controller.adjust(swing, traction, moving);

            let mut energy = 0.0;
            let points = context.moving_points_mut().values_mut();
            for ((point, force), s) in points.zip(&forces).zip(&swings) {
                point.apply_force(*force);
                let factor = controller.point_factor(*s);
                let displacement = point.integrate(factor * params.time_step, params.max_speed);
                energy += displacement.magnitude_squared();
            }

            previous = forces;
            energies.push(energy);
            if energy < params.min_energy_threshold {
                state = LayoutState::Converged;
                break;
            }
        }

        let steps = energies.len();
        let final_energy = energies.last().copied().unwrap_or(0.0);
        match state {
            LayoutState::Converged => {
                tracing::debug!(steps, final_energy, speed = controller.speed(), "layout converged");
            }
            LayoutState::Exhausted => {
                tracing::warn!(
                    steps,
                    final_energy,
                    threshold = params.min_energy_threshold,
                    "layout did not converge within maxSteps"
                );
            }
        }

        Ok(Atlas2Report {
            state,
            steps,
            energies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Atlas2, Atlas2Parameters, LayoutState, SpeedController};
    use crate::Error;
    use crate::context::LayoutContext;
    use crate::geometry::Vector2D;
    use beluga_graph::Graph;
    use indexmap::IndexMap;

    #[test]
    fn speed_grows_by_the_increase_ratio_up_to_the_cap() {
        let params = Atlas2Parameters::default();
        let mut c = SpeedController::new(&params);
        assert_eq!(c.adjust(0.0, 1.0, 4), 1.5);
        for _ in 0..20 {
            c.adjust(0.0, 1.0, 4);
        }
        assert_eq!(c.speed(), params.max_speed_factor);
    }

    #[test]
    fn oscillation_slows_the_run_down() {
        let params = Atlas2Parameters::default();
        let mut c = SpeedController::new(&params);
        let speed = c.adjust(10.0, 1.0, 1);
        assert!((speed - 0.05).abs() < 1e-12, "{speed}");
        assert!((c.efficiency() - 0.35).abs() < 1e-12);
        assert!(c.point_factor(4.0) < c.point_factor(0.0));
    }

    #[test]
    fn large_graphs_slow_down_once_swing_passes_the_jitter_floor() {
        let params = Atlas2Parameters::default();
        let mut c = SpeedController::new(&params);
        // 100 points: jitter floor sqrt(0.05 * 10) ~ 0.707, below the 1.5 swing ratio.
        let speed = c.adjust(1.5, 1.0, 100);
        let expected = 0.5f64.sqrt() / 1.5;
        assert!(speed < 1.0, "{speed}");
        assert!((speed - expected).abs() < 1e-12, "{speed} vs {expected}");
        assert!((c.efficiency() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn parameters_load_from_partial_camel_case_json() {
        let p: Atlas2Parameters =
            serde_json::from_str(r#"{"maxSteps": 10, "barnesHutTheta": null}"#).unwrap();
        assert_eq!(p.max_steps, 10);
        assert_eq!(p.barnes_hut_theta, None);
        assert_eq!(p.gravity, 1.0);
        assert_eq!(p.quadtree_update_increment, 3);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad = [
            Atlas2Parameters {
                time_step: 0.0,
                ..Atlas2Parameters::default()
            },
            Atlas2Parameters {
                max_global_speed_increase_ratio: 0.5,
                ..Atlas2Parameters::default()
            },
            Atlas2Parameters {
                repulsion: f64::NAN,
                ..Atlas2Parameters::default()
            },
        ];
        for p in bad {
            assert!(matches!(p.validate(), Err(Error::InvalidParameter { .. })), "{p:?}");
        }
        let p = Atlas2Parameters {
            quadtree_update_increment: 0,
            ..Atlas2Parameters::default()
        };
        assert_eq!(p.validate(), Err(Error::InvalidSchedule { increment: 0 }));
    }

    #[test]
    fn fixed_points_never_move() {
        let mut g: Graph<&str, u32> = Graph::new();
        g.add_vertex("hub");
        g.add_vertex("a");
        g.add_vertex("b");
        g.add_edge(0, "hub", "a").unwrap();
        g.add_edge(1, "hub", "b").unwrap();

        let hub = Vector2D::new(0.3, -7.1);
        let mut ctx = LayoutContext::new(&g, Vector2D::ZERO);
        ctx.add_fixed_point("hub", hub).unwrap();
        ctx.add_moving_point("a", Vector2D::new(1.0, 0.0)).unwrap();
        ctx.add_moving_point("b", Vector2D::new(0.0, 1.0)).unwrap();

        let params = Atlas2Parameters {
            max_steps: 200,
            ..Atlas2Parameters::default()
        };
        let report = Atlas2::new(params, IndexMap::default())
            .unwrap()
            .run(&mut ctx)
            .unwrap();

        assert_eq!(ctx.position(&"hub"), Some(hub));
        assert!(report.steps <= 200);
        assert_eq!(report.energies.len(), report.steps);
        for p in ctx.moving_points().values() {
            assert!(p.position().is_finite());
        }
    }

    #[test]
    fn no_moving_points_converges_immediately() {
        let mut g: Graph<u8, u8> = Graph::new();
        g.add_vertex(1);
        let mut ctx = LayoutContext::new(&g, Vector2D::ZERO);
        ctx.add_fixed_point(1, Vector2D::new(2.0, 2.0)).unwrap();

        let report = Atlas2::new(Atlas2Parameters::default(), IndexMap::default())
            .unwrap()
            .run(&mut ctx)
            .unwrap();
        assert_eq!(report.state, LayoutState::Converged);
        assert_eq!(report.steps, 0);
    }

    #[test]
    fn zero_max_steps_is_exhausted() {
        let mut g: Graph<u8, u8> = Graph::new();
        g.add_vertex(1);
        let mut ctx = LayoutContext::new(&g, Vector2D::ZERO);
        ctx.add_moving_point(1, Vector2D::new(2.0, 2.0)).unwrap();

        let params = Atlas2Parameters {
            max_steps: 0,
            ..Atlas2Parameters::default()
        };
        let report = Atlas2::new(params, IndexMap::default())
            .unwrap()
            .run(&mut ctx)
            .unwrap();
        assert_eq!(report.state, LayoutState::Exhausted);
        assert_eq!(ctx.position(&1), Some(Vector2D::new(2.0, 2.0)));
    }
}
