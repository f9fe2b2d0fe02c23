//! Simulation and resolver configuration
//!
//! Plain serde structs with defaults. The crate never reads files: callers hand
//! over values or JSON strings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::roots::QuarticSolver;
use crate::sim::events::EventClass;
use crate::sim::resolve::ball_ball::ALCIATORE_FIT;
use crate::sim::resolve::{
    BallBallModel, CushionModel, FrictionModel, PocketModel, Resolver, StickModel, TransitionModel,
};

/// Run-length presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SimPreset {
    /// Short cap, analytic roots only
    Quick,
    #[default]
    Standard,
    /// Very high cap, companion-matrix roots only
    Exhaustive,
}

impl SimPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimPreset::Quick => "Quick",
            SimPreset::Standard => "Standard",
            SimPreset::Exhaustive => "Exhaustive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quick" | "fast" => Some(SimPreset::Quick),
            "standard" | "default" => Some(SimPreset::Standard),
            "exhaustive" => Some(SimPreset::Exhaustive),
            _ => None,
        }
    }

    /// Event cap for this preset
    pub fn max_events(&self) -> usize {
        match self {
            SimPreset::Quick => 1_000,
            SimPreset::Standard => 10_000,
            SimPreset::Exhaustive => 1_000_000,
        }
    }

    pub fn quartic_solver(&self) -> QuarticSolver {
        match self {
            SimPreset::Quick => QuarticSolver::Analytic,
            SimPreset::Standard => QuarticSolver::Hybrid,
            SimPreset::Exhaustive => QuarticSolver::Numeric,
        }
    }
}

/// Per-run simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Stop once simulated time reaches this (s)
    pub t_final: Option<f64>,
    /// Stop after this many resolved events; the run is then flagged incomplete
    pub max_events: usize,
    /// Root-finding policy for quartic event equations
    pub quartic_solver: QuarticSolver,
    /// Event classes to detect. Transitions are always detected.
    pub include: BTreeSet<EventClass>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_preset(SimPreset::Standard)
    }
}

impl SimConfig {
    /// Create a config from a preset (every event class included)
    pub fn from_preset(preset: SimPreset) -> Self {
        Self {
            t_final: None,
            max_events: preset.max_events(),
            quartic_solver: preset.quartic_solver(),
            include: EventClass::ALL.into_iter().collect(),
        }
    }

    pub fn with_t_final(mut self, t_final: f64) -> Self {
        self.t_final = Some(t_final);
        self
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn with_solver(mut self, solver: QuarticSolver) -> Self {
        self.quartic_solver = solver;
        self
    }

    /// Restrict detection to `classes`
    pub fn with_include(mut self, classes: &[EventClass]) -> Self {
        self.include = classes.iter().copied().collect();
        self
    }

    /// Whether events of `class` are detected
    pub fn includes(&self, class: EventClass) -> bool {
        class == EventClass::Transition || self.include.contains(&class)
    }

    pub fn validate(&self) -> Result<()> {
        match self.t_final {
            Some(t) if !(t >= 0.0) => Err(SimError::Config(format!("t_final must be non-negative, got {}", t))),
            _ => Ok(()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A named model with numeric parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    /// Ball-ball friction sub-model (`frictional_inelastic` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction: Option<Box<ModelSpec>>,
}

impl ModelSpec {
    pub fn new(model: &str) -> Self {
        Self { model: model.to_string(), params: BTreeMap::new(), friction: None }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_friction(mut self, friction: ModelSpec) -> Self {
        self.friction = Some(Box::new(friction));
        self
    }

    /// Reject parameters the model does not know, or that are not finite
    fn check_params(&self, allowed: &[&str]) -> Result<()> {
        for (name, value) in &self.params {
            if !allowed.contains(&name.as_str()) || !value.is_finite() {
                return Err(self.invalid(name));
            }
        }
        Ok(())
    }

    fn param(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).copied().unwrap_or(default)
    }

    fn non_negative(&self, name: &str, default: f64) -> Result<f64> {
        let value = self.param(name, default);
        if value < 0.0 {
            return Err(self.invalid(name));
        }
        Ok(value)
    }

    fn invalid(&self, name: &str) -> SimError {
        SimError::InvalidParameter { model: self.model.clone(), name: name.to_string() }
    }

    fn unknown(&self, class: EventClass) -> SimError {
        SimError::UnknownModel { class, model: self.model.clone() }
    }
}

/// Model selection for every event class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub ball_ball: ModelSpec,
    pub ball_linear_cushion: ModelSpec,
    pub ball_circular_cushion: ModelSpec,
    pub ball_pocket: ModelSpec,
    pub stick_ball: ModelSpec,
    pub transition: ModelSpec,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ball_ball: ModelSpec::new("frictional_mathavan").with_param("num_iterations", 1000.0),
            ball_linear_cushion: ModelSpec::new("han_2005"),
            ball_circular_cushion: ModelSpec::new("han_2005"),
            ball_pocket: ModelSpec::new("canonical"),
            stick_ball: ModelSpec::new("instantaneous_point")
                .with_param("english_throttle", 0.5)
                .with_param("squirt_throttle", 1.0),
            transition: ModelSpec::new("canonical"),
        }
    }
}

impl ResolverConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON and build the resolver in one step
    pub fn resolver_from_json(json: &str) -> Result<Resolver> {
        Self::from_json(json)?.build()
    }

    /// Turn model names and parameters into a [`Resolver`]
    pub fn build(&self) -> Result<Resolver> {
        let resolver = Resolver {
            ball_ball: build_ball_ball(&self.ball_ball)?,
            ball_linear_cushion: build_cushion(&self.ball_linear_cushion, EventClass::BallLinearCushion)?,
            ball_circular_cushion: build_cushion(&self.ball_circular_cushion, EventClass::BallCircularCushion)?,
            ball_pocket: build_pocket(&self.ball_pocket)?,
            stick_ball: build_stick(&self.stick_ball)?,
            transition: build_transition(&self.transition)?,
        };
        log::debug!(
            "Resolver: {} / {} / {} / {} / {} / {}",
            resolver.ball_ball.as_str(),
            resolver.ball_linear_cushion.as_str(),
            resolver.ball_circular_cushion.as_str(),
            resolver.ball_pocket.as_str(),
            resolver.stick_ball.as_str(),
            resolver.transition.as_str()
        );
        Ok(resolver)
    }
}

fn build_friction(spec: &ModelSpec) -> Result<FrictionModel> {
    match spec.model.as_str() {
        "average" => {
            spec.check_params(&[])?;
            Ok(FrictionModel::Average)
        }
        "alciatore" => {
            spec.check_params(&["a", "b", "c"])?;
            let (a, b, c) = ALCIATORE_FIT;
            Ok(FrictionModel::Alciatore {
                a: spec.non_negative("a", a)?,
                b: spec.non_negative("b", b)?,
                c: spec.non_negative("c", c)?,
            })
        }
        _ => Err(spec.unknown(EventClass::BallBall)),
    }
}

fn build_ball_ball(spec: &ModelSpec) -> Result<BallBallModel> {
    if spec.friction.is_some() && spec.model != "frictional_inelastic" {
        return Err(spec.invalid("friction"));
    }
    match spec.model.as_str() {
        "frictionless_elastic" => {
            spec.check_params(&[])?;
            Ok(BallBallModel::FrictionlessElastic)
        }
        "frictional_inelastic" => {
            spec.check_params(&[])?;
            let friction = match &spec.friction {
                Some(f) => build_friction(f)?,
                None => FrictionModel::Average,
            };
            Ok(BallBallModel::FrictionalInelastic { friction })
        }
        "frictional_mathavan" => {
            spec.check_params(&["num_iterations"])?;
            let n = spec.param("num_iterations", 1000.0);
            if n < 1.0 || n.fract() != 0.0 {
                return Err(spec.invalid("num_iterations"));
            }
            Ok(BallBallModel::FrictionalMathavan { num_iterations: n as usize })
        }
        _ => Err(spec.unknown(EventClass::BallBall)),
    }
}

fn build_cushion(spec: &ModelSpec, class: EventClass) -> Result<CushionModel> {
    let model = match spec.model.as_str() {
        "han_2005" => CushionModel::Han2005,
        "impulse_frictional_inelastic" => CushionModel::ImpulseFrictionalInelastic,
        "mirror_reflection" => CushionModel::MirrorReflection,
        _ => return Err(spec.unknown(class)),
    };
    spec.check_params(&[])?;
    Ok(model)
}

fn build_pocket(spec: &ModelSpec) -> Result<PocketModel> {
    match spec.model.as_str() {
        "canonical" => {
            spec.check_params(&[])?;
            Ok(PocketModel::Canonical)
        }
        _ => Err(spec.unknown(EventClass::BallPocket)),
    }
}

fn build_stick(spec: &ModelSpec) -> Result<StickModel> {
    match spec.model.as_str() {
        "instantaneous_point" => {
            spec.check_params(&["english_throttle", "squirt_throttle"])?;
            Ok(StickModel::InstantaneousPoint {
                english_throttle: spec.non_negative("english_throttle", 0.5)?,
                squirt_throttle: spec.non_negative("squirt_throttle", 1.0)?,
            })
        }
        _ => Err(spec.unknown(EventClass::StickBall)),
    }
}

fn build_transition(spec: &ModelSpec) -> Result<TransitionModel> {
    match spec.model.as_str() {
        "canonical" => {
            spec.check_params(&[])?;
            Ok(TransitionModel::Canonical)
        }
        _ => Err(spec.unknown(EventClass::Transition)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds_default_resolver() {
        let resolver = ResolverConfig::default().build().unwrap();
        assert_eq!(resolver, Resolver::default());
    }

    #[test]
    fn test_json_roundtrip_and_build() {
        let json = r#"{
            "ball_ball": {"model": "frictional_inelastic", "friction": {"model": "alciatore", "params": {"a": 0.01}}},
            "ball_linear_cushion": {"model": "mirror_reflection"},
            "ball_circular_cushion": {"model": "impulse_frictional_inelastic"},
            "ball_pocket": {"model": "canonical"},
            "stick_ball": {"model": "instantaneous_point", "params": {"squirt_throttle": 0.0}},
            "transition": {"model": "canonical"}
        }"#;
        let config = ResolverConfig::from_json(json).unwrap();
        let again = ResolverConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, again);

        let resolver = config.build().unwrap();
        assert_eq!(
            resolver.ball_ball,
            BallBallModel::FrictionalInelastic { friction: FrictionModel::Alciatore { a: 0.01, b: 0.108, c: 1.088 } }
        );
        assert_eq!(resolver.ball_linear_cushion, CushionModel::MirrorReflection);
        assert_eq!(
            resolver.stick_ball,
            StickModel::InstantaneousPoint { english_throttle: 0.5, squirt_throttle: 0.0 }
        );
    }

    #[test]
    fn test_stick_params_default_like_the_model() {
        let mut config = ResolverConfig::default();
        config.stick_ball = ModelSpec::new("instantaneous_point");
        assert_eq!(config.build().unwrap().stick_ball, StickModel::default());
    }

    #[test]
    fn test_unknown_model() {
        let mut config = ResolverConfig::default();
        config.ball_linear_cushion = ModelSpec::new("mathavan_2010");
        assert_eq!(
            config.build(),
            Err(SimError::UnknownModel { class: EventClass::BallLinearCushion, model: "mathavan_2010".into() })
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let mut config = ResolverConfig::default();
        config.ball_ball = ModelSpec::new("frictional_mathavan").with_param("num_iterations", 0.5);
        assert!(matches!(config.build(), Err(SimError::InvalidParameter { .. })));

        config.ball_ball = ModelSpec::new("frictionless_elastic").with_param("u_b", 0.1);
        assert!(matches!(config.build(), Err(SimError::InvalidParameter { ref name, .. }) if name == "u_b"));

        config.ball_ball = ModelSpec::new("frictionless_elastic").with_friction(ModelSpec::new("average"));
        assert!(config.build().unwrap_err().is_config_error());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(ResolverConfig::from_json("{"), Err(SimError::Config(_))));
    }

    #[test]
    fn test_sim_presets() {
        let quick = SimConfig::from_preset(SimPreset::Quick);
        assert_eq!(quick.quartic_solver, QuarticSolver::Analytic);
        assert!(quick.max_events < SimConfig::default().max_events);
        assert_eq!(SimPreset::from_str("FAST"), Some(SimPreset::Quick));
        assert!(SimConfig::default().includes(EventClass::BallPocket));
    }

    #[test]
    fn test_include_keeps_transitions() {
        let config = SimConfig::default().with_include(&[EventClass::BallBall]);
        assert!(config.includes(EventClass::Transition));
        assert!(config.includes(EventClass::BallBall));
        assert!(!config.includes(EventClass::BallLinearCushion));
    }

    #[test]
    fn test_sim_config_json() {
        let config = SimConfig::from_json(r#"{"t_final": 5.0, "quartic_solver": "Numeric"}"#).unwrap();
        assert_eq!(config.t_final, Some(5.0));
        assert_eq!(config.quartic_solver, QuarticSolver::Numeric);
        assert_eq!(config.max_events, SimConfig::default().max_events);
        assert!(SimConfig::from_json(r#"{"t_final": -1.0}"#).is_err());
    }
}
