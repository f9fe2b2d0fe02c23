//! Event resolution
//!
//! One closed enum of models per event class, collected in an immutable
//! [`Resolver`] built once per run. The scheduler hands every event to
//! [`Resolver::resolve`] and never looks at which model is behind it.

pub mod ball_ball;
pub mod cushion;
pub mod stick;

pub use ball_ball::{BallBallModel, FrictionModel};
pub use cushion::CushionModel;
pub use stick::StickModel;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::ball::{Ball, BallState, MotionPhase};
use super::events::{Event, EventKind};
use super::system::System;
use super::table::Pocket;

/// Ball-pocket model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PocketModel {
    /// Drop the ball to the pocket centre, below the cloth, at rest
    #[default]
    Canonical,
}

impl PocketModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PocketModel::Canonical => "canonical",
        }
    }

    pub fn solve(&self, ball: &Ball, pocket: &Pocket) -> BallState {
        match self {
            PocketModel::Canonical => {
                let mut state = ball.state;
                state.pos = DVec3::new(pocket.center.x, pocket.center.y, -pocket.depth);
                state.vel = DVec3::ZERO;
                state.spin = DVec3::ZERO;
                state.phase = MotionPhase::Pocketed;
                state
            }
        }
    }
}

/// Motion-phase transition model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransitionModel {
    /// Switch phase and zero whatever the new phase cannot carry
    #[default]
    Canonical,
}

impl TransitionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionModel::Canonical => "canonical",
        }
    }

    pub fn solve(&self, ball: &Ball, to: MotionPhase) -> BallState {
        match self {
            TransitionModel::Canonical => {
                let mut state = ball.state;
                match to {
                    MotionPhase::Stationary | MotionPhase::Pocketed => {
                        state.vel = DVec3::ZERO;
                        state.spin = DVec3::ZERO;
                    }
                    MotionPhase::Spinning => {
                        state.vel = DVec3::ZERO;
                        state.spin.x = 0.0;
                        state.spin.y = 0.0;
                    }
                    MotionPhase::Rolling => {
                        // Contact point at rest: planar spin locked to velocity
                        let r = ball.radius();
                        state.spin.x = -state.vel.y / r;
                        state.spin.y = state.vel.x / r;
                    }
                    MotionPhase::Sliding => {}
                }
                state.phase = to;
                state
            }
        }
    }
}

/// The full set of models, one per event class
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resolver {
    pub ball_ball: BallBallModel,
    pub ball_linear_cushion: CushionModel,
    pub ball_circular_cushion: CushionModel,
    pub ball_pocket: PocketModel,
    pub stick_ball: StickModel,
    pub transition: TransitionModel,
}

impl Resolver {
    /// Apply `event` to the system's balls. All balls must already be at `event.time`.
    ///
    /// Returns the IDs of the balls whose state changed.
    pub fn resolve(&self, system: &mut System, event: &Event) -> Vec<u32> {
        let time = event.time;
        match event.kind {
            EventKind::Null => Vec::new(),
            EventKind::Transition { ball, to, .. } => {
                self.update(system, ball, time, |b| self.transition.solve(b, to));
                vec![ball]
            }
            EventKind::StickBall { ball } => {
                let Some(cue) = system.cue else {
                    log::warn!("Stick-ball event without a cue");
                    return Vec::new();
                };
                self.update(system, ball, time, |b| self.stick_ball.solve(&cue, b));
                vec![ball]
            }
            EventKind::BallBall { ball1, ball2 } => {
                let (Some(i), Some(j)) = (system.index_of(ball1), system.index_of(ball2)) else {
                    log::warn!("Ball-ball event for missing balls {} and {}", ball1, ball2);
                    return Vec::new();
                };
                let (mut s1, mut s2) = self.ball_ball.resolve(&system.balls[i], &system.balls[j]);
                s1.t = time;
                s2.t = time;
                system.balls[i].state = s1;
                system.balls[j].state = s2;
                vec![ball1, ball2]
            }
            EventKind::BallLinearCushion { ball, cushion } => {
                let Some(c) = system.table.linear_cushions.iter().find(|c| c.id == cushion).cloned() else {
                    log::warn!("Event for missing linear cushion {}", cushion);
                    return Vec::new();
                };
                self.update(system, ball, time, |b| self.ball_linear_cushion.resolve_linear(b, &c));
                vec![ball]
            }
            EventKind::BallCircularCushion { ball, cushion } => {
                let Some(c) = system.table.circular_cushions.iter().find(|c| c.id == cushion).cloned() else {
                    log::warn!("Event for missing circular cushion {}", cushion);
                    return Vec::new();
                };
                self.update(system, ball, time, |b| self.ball_circular_cushion.resolve_circular(b, &c));
                vec![ball]
            }
            EventKind::BallPocket { ball, pocket } => {
                let Some(p) = system.table.pockets.iter().find(|p| p.id == pocket).cloned() else {
                    log::warn!("Event for missing pocket {}", pocket);
                    return Vec::new();
                };
                self.update(system, ball, time, |b| self.ball_pocket.solve(b, &p));
                vec![ball]
            }
        }
    }

    fn update(&self, system: &mut System, id: u32, time: f64, solve: impl FnOnce(&Ball) -> BallState) {
        match system.ball_mut(id) {
            Some(ball) => {
                let mut state = solve(ball);
                state.t = time;
                ball.state = state;
            }
            None => log::warn!("Event for missing ball {}", id),
        }
    }
}
