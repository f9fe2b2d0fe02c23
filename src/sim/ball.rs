//! Ball parameters, kinematic state and motion phases

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Motion phase of a ball. Exactly one applies at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MotionPhase {
    /// At rest, no spin
    Stationary,
    /// In place, spinning about the vertical axis only
    Spinning,
    /// Contact point slipping against the cloth
    Sliding,
    /// Rolling without slip
    Rolling,
    /// Captured by a pocket; out of play for the rest of the run
    Pocketed,
}

impl MotionPhase {
    /// Whether the ball centre moves in this phase
    pub fn is_translating(&self) -> bool {
        matches!(self, MotionPhase::Sliding | MotionPhase::Rolling)
    }

    /// Whether the ball still evolves on its own (moves or spins)
    pub fn is_energetic(&self) -> bool {
        matches!(self, MotionPhase::Sliding | MotionPhase::Rolling | MotionPhase::Spinning)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionPhase::Stationary => "stationary",
            MotionPhase::Spinning => "spinning",
            MotionPhase::Sliding => "sliding",
            MotionPhase::Rolling => "rolling",
            MotionPhase::Pocketed => "pocketed",
        }
    }
}

/// Physical parameters of a ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallParams {
    /// Mass (kg)
    pub m: f64,
    /// Radius (m)
    pub r: f64,
    /// Sliding friction coefficient
    pub u_s: f64,
    /// Rolling friction coefficient
    pub u_r: f64,
    /// Spinning friction per unit radius; the spinning coefficient is this times `r`
    pub u_sp_proportionality: f64,
    /// Ball-ball friction coefficient
    pub u_b: f64,
    /// Ball-ball restitution
    pub e_b: f64,
    /// Ball-cushion restitution
    pub e_c: f64,
    /// Ball-cushion friction
    pub f_c: f64,
    /// Gravitational acceleration (m/s²)
    pub g: f64,
}

impl Default for BallParams {
    fn default() -> Self {
        Self {
            m: 0.170097,
            r: 0.028575,
            u_s: 0.2,
            u_r: 0.01,
            u_sp_proportionality: 10.0 * 2.0 / 5.0 / 9.0,
            u_b: 0.05,
            e_b: 0.95,
            e_c: 0.85,
            f_c: 0.2,
            g: 9.81,
        }
    }
}

impl BallParams {
    /// Spinning friction coefficient
    #[inline]
    pub fn u_sp(&self) -> f64 {
        self.u_sp_proportionality * self.r
    }

    /// Same ball with all cloth friction removed
    pub fn frictionless(mut self) -> Self {
        self.u_s = 0.0;
        self.u_r = 0.0;
        self.u_sp_proportionality = 0.0;
        self
    }

    /// Moment of inertia of a solid sphere
    #[inline]
    pub fn inertia(&self) -> f64 {
        2.0 / 5.0 * self.m * self.r * self.r
    }
}

/// Kinematic state of a ball at absolute time `t`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub pos: DVec3,
    pub vel: DVec3,
    /// Angular velocity (rad/s)
    pub spin: DVec3,
    pub phase: MotionPhase,
    pub t: f64,
}

impl BallState {
    pub fn at_rest(pos: DVec3) -> Self {
        Self {
            pos,
            vel: DVec3::ZERO,
            spin: DVec3::ZERO,
            phase: MotionPhase::Stationary,
            t: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite() && self.spin.is_finite() && self.t.is_finite()
    }
}

/// A ball entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub params: BallParams,
    pub state: BallState,
}

impl Ball {
    pub fn new(id: u32, params: BallParams, state: BallState) -> Self {
        Self { id, params, state }
    }

    /// Stationary ball resting on the cloth at `(x, y)`
    pub fn at_rest(id: u32, x: f64, y: f64, params: BallParams) -> Self {
        Self::new(id, params, BallState::at_rest(DVec3::new(x, y, params.r)))
    }

    #[inline]
    pub fn phase(&self) -> MotionPhase {
        self.state.phase
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.params.r
    }

    /// Translational plus rotational kinetic energy
    pub fn energy(&self) -> f64 {
        let p = &self.params;
        0.5 * p.m * self.state.vel.length_squared() + 0.5 * p.inertia() * self.state.spin.length_squared()
    }
}
