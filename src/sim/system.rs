//! The simulated system: balls, table, cue and the event history
//!
//! Everything a run needs lives here. Balls are kept sorted by ID so iteration
//! order (and therefore every tie-break) is deterministic.

use serde::{Deserialize, Serialize};

use super::ball::{Ball, MotionPhase};
use super::events::Event;
use super::table::Table;
use crate::consts::{CONTACT_TOL, EPS};
use crate::error::{Result, SimError};

/// Cue stick aimed at a ball, ready to strike at `t = 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Ball the cue is aimed at
    pub ball_id: u32,
    /// Impact speed (m/s)
    pub v0: f64,
    /// Aim direction in the table plane (degrees, counter-clockwise from +x)
    pub phi: f64,
    /// Cue elevation above the cloth (degrees)
    pub theta: f64,
    /// Horizontal tip offset from centre, in ball radii (positive is left english)
    pub a: f64,
    /// Vertical tip offset from centre, in ball radii (positive is topspin)
    pub b: f64,
    /// Cue mass (kg)
    pub mass: f64,
    /// Effective mass of the cue end for squirt (kg)
    pub end_mass: f64,
}

impl Default for Cue {
    fn default() -> Self {
        Self {
            ball_id: 0,
            v0: 2.0,
            phi: 0.0,
            theta: 0.0,
            a: 0.0,
            b: 0.25,
            mass: 0.567,
            end_mass: 0.170097 / 30.0,
        }
    }
}

impl Cue {
    pub fn aimed_at(ball_id: u32) -> Self {
        Self { ball_id, ..Default::default() }
    }

    /// Set the stroke (speed, direction, elevation and tip offsets)
    pub fn with_stroke(mut self, v0: f64, phi: f64, theta: f64, a: f64, b: f64) -> Self {
        self.v0 = v0;
        self.phi = phi;
        self.theta = theta;
        self.a = a;
        self.b = b;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.v0, self.phi, self.theta, self.a, self.b, self.mass, self.end_mass]
            .iter()
            .all(|x| x.is_finite());
        if !finite || !(self.mass > 0.0) || !(self.end_mass > 0.0) {
            return Err(SimError::degenerate("cue needs finite stroke values and positive masses"));
        }
        if self.a * self.a + self.b * self.b > 1.0 {
            return Err(SimError::degenerate("cue tip offset lies outside the ball"));
        }
        Ok(())
    }
}

/// One history record: an event and every ball right after it was resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub event: Event,
    pub balls: Vec<Ball>,
}

/// Balls plus everything they can hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub balls: Vec<Ball>,
    pub table: Table,
    #[serde(default)]
    pub cue: Option<Cue>,
    /// Current simulation time (s)
    #[serde(default)]
    pub t: f64,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl System {
    pub fn new(balls: Vec<Ball>, table: Table) -> Self {
        let mut system = Self { balls, table, ..Default::default() };
        system.normalize_order();
        system
    }

    pub fn with_cue(mut self, cue: Cue) -> Self {
        self.cue = Some(cue);
        self
    }

    pub fn ball(&self, id: u32) -> Option<&Ball> {
        self.index_of(id).map(|i| &self.balls[i])
    }

    pub fn ball_mut(&mut self, id: u32) -> Option<&mut Ball> {
        self.index_of(id).map(move |i| &mut self.balls[i])
    }

    /// Position of ball `id` in `balls` (binary search, balls are sorted)
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.balls.binary_search_by_key(&id, |b| b.id).ok()
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.table.normalize_order();
    }

    /// Total translational and rotational kinetic energy
    pub fn energy(&self) -> f64 {
        self.balls.iter().map(|b| b.energy()).sum()
    }

    pub fn has_energy(&self) -> bool {
        self.energy() > EPS
    }

    /// Record `event` with a snapshot of every ball
    pub fn push_history(&mut self, event: Event) {
        self.history.push(HistoryEntry { event, balls: self.balls.clone() });
    }

    /// Reject inputs the event equations cannot handle
    pub fn validate(&self) -> Result<()> {
        self.table.validate()?;
        if !self.t.is_finite() {
            return Err(SimError::degenerate("system time is not finite"));
        }

        for pair in self.balls.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(SimError::degenerate(format!("duplicate ball id {}", pair[0].id)));
            }
        }

        for ball in &self.balls {
            let p = &ball.params;
            if !(p.r > 0.0) || !(p.m > 0.0) || !p.g.is_finite() {
                return Err(SimError::degenerate(format!("ball {} needs positive radius and mass", ball.id)));
            }
            if !ball.state.is_finite() {
                return Err(SimError::degenerate(format!("ball {} has a non-finite state", ball.id)));
            }
            if let Some(pocket) = self.table.pockets.iter().find(|pk| pk.radius <= p.r) {
                return Err(SimError::degenerate(format!(
                    "pocket {} is not larger than ball {}",
                    pocket.id, ball.id
                )));
            }
        }

        let live: Vec<&Ball> = self.balls.iter().filter(|b| b.phase() != MotionPhase::Pocketed).collect();
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                let gap = (a.state.pos - b.state.pos).truncate().length() - (a.radius() + b.radius());
                if gap < -CONTACT_TOL {
                    return Err(SimError::degenerate(format!("balls {} and {} overlap", a.id, b.id)));
                }
            }
        }

        if let Some(cue) = &self.cue {
            cue.validate()?;
            if self.ball(cue.ball_id).is_none() {
                return Err(SimError::degenerate(format!("cue aimed at missing ball {}", cue.ball_id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallParams;
    use glam::DVec3;

    fn two_balls(dx: f64) -> System {
        let p = BallParams::default();
        let balls = vec![Ball::at_rest(2, 0.5 + dx, 0.5, p), Ball::at_rest(1, 0.5, 0.5, p)];
        System::new(balls, Table::rectangular(1.0, 2.0, p.r))
    }

    #[test]
    fn test_new_sorts_balls() {
        let system = two_balls(0.1);
        assert_eq!(system.balls[0].id, 1);
        assert_eq!(system.index_of(2), Some(1));
        assert!(system.ball(3).is_none());
        assert!(system.validate().is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let system = two_balls(0.01);
        assert!(matches!(system.validate(), Err(SimError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_touching_allowed() {
        let system = two_balls(2.0 * BallParams::default().r);
        assert!(system.validate().is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let p = BallParams::default();
        let balls = vec![Ball::at_rest(1, 0.2, 0.2, p), Ball::at_rest(1, 0.6, 0.6, p)];
        let system = System::new(balls, Table::default());
        assert!(system.validate().is_err());
    }

    #[test]
    fn test_bad_ball_params_rejected() {
        let mut p = BallParams::default();
        p.r = 0.0;
        let system = System::new(vec![Ball::at_rest(1, 0.2, 0.2, p)], Table::default());
        assert!(system.validate().is_err());
    }

    #[test]
    fn test_small_pocket_rejected() {
        let mut system = two_balls(0.1);
        system.table.pockets.push(crate::sim::table::Pocket::new(0, DVec3::ZERO, 0.02));
        assert!(system.validate().is_err());
    }

    #[test]
    fn test_cue_validation() {
        let system = two_balls(0.1).with_cue(Cue::aimed_at(7));
        assert!(system.validate().is_err());
        let system = two_balls(0.1).with_cue(Cue::aimed_at(1).with_stroke(2.0, 0.0, 0.0, 0.9, 0.9));
        assert!(system.validate().is_err());
    }

    #[test]
    fn test_energy() {
        let mut system = two_balls(0.1);
        assert!(!system.has_energy());
        system.balls[0].state.vel = DVec3::new(1.0, 0.0, 0.0);
        assert!(system.has_energy());
        assert!((system.energy() - system.balls[0].energy()).abs() < 1e-15);
    }
}
