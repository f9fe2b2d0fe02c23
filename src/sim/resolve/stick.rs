//! Cue strike

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::rotate_z;
use crate::sim::ball::{Ball, BallState, MotionPhase};
use crate::sim::system::Cue;

/// Stick-ball collision model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StickModel {
    /// Instantaneous point contact with squirt deflection.
    ///
    /// `english_throttle` scales the side spin produced; `squirt_throttle` scales the
    /// deflection (0 turns it off).
    InstantaneousPoint { english_throttle: f64, squirt_throttle: f64 },
}

impl Default for StickModel {
    fn default() -> Self {
        StickModel::InstantaneousPoint { english_throttle: 0.5, squirt_throttle: 1.0 }
    }
}

impl StickModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StickModel::InstantaneousPoint { .. } => "instantaneous_point",
        }
    }

    /// State of `ball` right after being struck by `cue`
    pub fn solve(&self, cue: &Cue, ball: &Ball) -> BallState {
        match *self {
            StickModel::InstantaneousPoint { english_throttle, squirt_throttle } => {
                let theta = cue.theta.to_radians();
                // Contact point seen from the ball: the cue frame tilted by theta
                let cue_c = (1.0 - cue.a * cue.a - cue.b * cue.b).max(0.0).sqrt();
                let ball_a = cue.a;
                let ball_c = theta.cos() * cue_c - theta.sin() * cue.b;
                let ball_b = theta.sin() * cue_c + theta.cos() * cue.b;

                let q = ball.radius() * DVec3::new(ball_a, ball_c, ball_b);
                let (v, w) = cue_strike(ball.params.m, cue.mass, ball.radius(), cue.v0, cue.phi, cue.theta, q);

                let alpha = squirt_angle(ball.params.m, cue.end_mass, ball_a, squirt_throttle);
                let mut state = ball.state;
                state.vel = rotate_z(v, alpha);
                state.spin = w * english_throttle;
                state.phase = MotionPhase::Sliding;
                state
            }
        }
    }
}

/// Ball velocity and spin from a cue impact at contact point `q` (ball frame).
///
/// `phi` and `theta` are in degrees. Based on Alciatore's technical proof A-30.
pub fn cue_strike(m: f64, cue_mass: f64, r: f64, v0: f64, phi: f64, theta: f64, q: DVec3) -> (DVec3, DVec3) {
    let phi = phi.to_radians();
    let (sin_t, cos_t) = theta.to_radians().sin_cos();
    let i_over_m = 2.0 / 5.0 * r * r;
    let (a, c, b) = (q.x, q.y, q.z);

    let temp = a * a + (b * cos_t).powi(2) + (c * sin_t).powi(2) - 2.0 * b * c * cos_t * sin_t;
    let speed = 2.0 * v0 / (1.0 + m / cue_mass + temp / i_over_m);

    // Ball frame: the cue points along -y; elevation does not lift the ball
    let v_b = DVec3::new(0.0, -speed * cos_t, 0.0);
    let w_b = speed / i_over_m * DVec3::new(-c * sin_t + b * cos_t, a * sin_t, -a * cos_t);

    let to_table = phi + std::f64::consts::FRAC_PI_2;
    (rotate_z(v_b, to_table), rotate_z(w_b, to_table))
}

/// Squirt (cue-ball deflection) angle in radians for tip offset `a` (in ball radii).
///
/// Negative is a deflection to the right. Alciatore's technical proof A-31.
pub fn squirt_angle(ball_mass: f64, end_mass: f64, a: f64, throttle: f64) -> f64 {
    let mass_ratio = ball_mass / end_mass;
    let k = 1.0 - a * a;
    let numerator = 2.5 * a * k.max(0.0).sqrt();
    let denominator = 1.0 + mass_ratio + 2.5 * k;
    -throttle * numerator.atan2(denominator)
}
