//! Ball-ball collision models
//!
//! Every model works on copies: it receives the two balls at contact and returns
//! their post-collision states. Both balls leave the collision sliding.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::consts::{EPS, EPS_SPACE};
use crate::roots::quadratic;
use crate::sim::ball::{Ball, BallState, MotionPhase};
use crate::{planar_angle, rotate_z};

/// Chased ball takes this fraction of the chaser's radial speed
const TOUCHING_THEFT_FRACTION: f64 = 0.1;
/// Radial relative speed (m/s) below which two balls count as moving together
const TOUCHING_SPEED_THRESHOLD: f64 = 0.01;
/// Minimum cosine between the two velocities for them to count as aligned
const TOUCHING_ALIGNMENT: f64 = 0.9;

/// Ball-ball friction coefficient during the impact
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FrictionModel {
    /// Mean of the two balls' `u_b`
    Average,
    /// Fit `a + b exp(-c v_rel)` on the relative surface speed at the contact point
    Alciatore { a: f64, b: f64, c: f64 },
}

/// `(a, b, c)` of the Alciatore friction fit (technical proof A-14)
pub const ALCIATORE_FIT: (f64, f64, f64) = (9.951e-3, 0.108, 1.088);

impl FrictionModel {
    pub const ALCIATORE: FrictionModel =
        FrictionModel::Alciatore { a: ALCIATORE_FIT.0, b: ALCIATORE_FIT.1, c: ALCIATORE_FIT.2 };

    pub fn as_str(&self) -> &'static str {
        match self {
            FrictionModel::Average => "average",
            FrictionModel::Alciatore { .. } => "alciatore",
        }
    }

    /// Friction coefficient for two balls given the relative surface speed at contact
    pub fn coefficient(&self, b1: &Ball, b2: &Ball, relative_surface_speed: f64) -> f64 {
        match *self {
            FrictionModel::Average => 0.5 * (b1.params.u_b + b2.params.u_b),
            FrictionModel::Alciatore { a, b, c } => a + b * (-c * relative_surface_speed).exp(),
        }
    }
}

/// Ball-ball collision model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallBallModel {
    /// Equal-mass, perfectly elastic, no friction; spins untouched
    FrictionlessElastic,
    /// Restitution along the line of centres plus a single friction impulse
    FrictionalInelastic { friction: FrictionModel },
    /// Mathavan et al. (2014) iterative impulse with ball-cloth friction
    FrictionalMathavan { num_iterations: usize },
}

impl Default for BallBallModel {
    fn default() -> Self {
        BallBallModel::FrictionalMathavan { num_iterations: 1000 }
    }
}

impl BallBallModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BallBallModel::FrictionlessElastic => "frictionless_elastic",
            BallBallModel::FrictionalInelastic { .. } => "frictional_inelastic",
            BallBallModel::FrictionalMathavan { .. } => "frictional_mathavan",
        }
    }

    /// Kiss, solve, then separate balls that would keep colliding
    pub fn resolve(&self, b1: &Ball, b2: &Ball) -> (BallState, BallState) {
        let (s1, s2) = make_kiss(b1, b2);
        let (s1, s2) = self.solve(&with_state(b1, s1), &with_state(b2, s2));
        resolve_continually_touching(s1, s2)
    }

    /// Post-collision states for two balls already at contact
    pub fn solve(&self, b1: &Ball, b2: &Ball) -> (BallState, BallState) {
        match *self {
            BallBallModel::FrictionlessElastic => frictionless_elastic(b1, b2),
            BallBallModel::FrictionalInelastic { friction } => frictional_inelastic(b1, b2, friction),
            BallBallModel::FrictionalMathavan { num_iterations } => mathavan(b1, b2, num_iterations),
        }
    }
}

fn with_state(ball: &Ball, state: BallState) -> Ball {
    Ball { state, ..ball.clone() }
}

/// Place the balls exactly `R1 + R2 + EPS_SPACE` apart.
///
/// Balls are moved back or forward along their (linearised) paths. If that takes
/// more than a few spacers, which happens when they move almost in unison, the
/// chased ball is pushed out along the line of centres instead.
pub fn make_kiss(b1: &Ball, b2: &Ball) -> (BallState, BallState) {
    let (mut s1, mut s2) = (b1.state, b2.state);
    let dr = (s2.pos - s1.pos).truncate();
    let dv = (s2.vel - s1.vel).truncate();
    let initial = dr.length();
    let target = b1.radius() + b2.radius() + EPS_SPACE;
    if initial == 0.0 {
        return (s1, s2);
    }

    let alpha = dv.length_squared();
    let beta = 2.0 * dv.dot(dr);
    let gamma = dr.length_squared() - target * target;

    let shift = if alpha > 0.0 {
        quadratic::complex_roots(alpha, beta, gamma)
            .into_iter()
            .filter(|z| z.im == 0.0 || (z.re != 0.0 && (z.im / z.re).abs() < 1e-3))
            .map(|z| z.re)
            .min_by(|a, b| a.abs().total_cmp(&b.abs()))
    } else {
        None
    };

    let moved = shift.map(|t| (s1.pos + t * s1.vel, s2.pos + t * s2.vel));
    match moved {
        Some((p1, p2)) if (p1 - s1.pos).length() <= 10.0 * EPS_SPACE && (p2 - s2.pos).length() <= 10.0 * EPS_SPACE => {
            s1.pos = p1;
            s2.pos = p2;
        }
        _ => {
            let n = (dr / initial).extend(0.0);
            let push = target - initial;
            if s1.vel.dot(n) > s2.vel.dot(n) {
                s2.pos += push * n;
            } else {
                s1.pos -= push * n;
            }
        }
    }
    (s1, s2)
}

/// Nudge apart two balls moving together along their line of centres.
///
/// A chain of touching balls pushed along its axis would otherwise collide again
/// microseconds later, over and over. The chased ball takes a fraction of the
/// chaser's radial speed; total momentum is unchanged.
pub fn resolve_continually_touching(mut s1: BallState, mut s2: BallState) -> (BallState, BallState) {
    let (v1, v2) = (s1.vel, s2.vel);
    let (speed1, speed2) = (v1.length(), v2.length());
    if speed1 == 0.0 || speed2 == 0.0 {
        return (s1, s2);
    }
    let n = (s2.pos - s1.pos).truncate().normalize_or_zero().extend(0.0);
    let v1_loc = v1.dot(n);
    let v2_loc = v2.dot(n);
    let aligned = v1.dot(v2) / (speed1 * speed2) > TOUCHING_ALIGNMENT;
    if (v2_loc - v1_loc).abs() >= TOUCHING_SPEED_THRESHOLD || !aligned {
        return (s1, s2);
    }

    let (v1_new, v2_new) = if v1_loc > v2_loc {
        let stolen = v1_loc * TOUCHING_THEFT_FRACTION;
        (v1_loc - stolen, v2_loc + stolen)
    } else {
        let stolen = v2_loc * TOUCHING_THEFT_FRACTION;
        (v1_loc + stolen, v2_loc - stolen)
    };
    s1.vel = v1 + (v1_new - v1_loc) * n;
    s2.vel = v2 + (v2_new - v2_loc) * n;
    (s1, s2)
}

fn sliding(mut state: BallState) -> BallState {
    state.vel.z = 0.0;
    state.phase = MotionPhase::Sliding;
    state
}

fn frictionless_elastic(b1: &Ball, b2: &Ball) -> (BallState, BallState) {
    let (mut s1, mut s2) = (b1.state, b2.state);
    let n = (s2.pos - s1.pos).truncate().normalize_or_zero().extend(0.0);
    let exchange = (s1.vel - s2.vel).dot(n);
    s1.vel -= exchange * n;
    s2.vel += exchange * n;
    (sliding(s1), sliding(s2))
}

/// Velocity of the point of a ball's surface in direction `d`
#[inline]
fn surface_velocity(vel: DVec3, spin: DVec3, d: DVec3, r: f64) -> DVec3 {
    vel + spin.cross(r * d)
}

fn frictional_inelastic(b1: &Ball, b2: &Ball, friction: FrictionModel) -> (BallState, BallState) {
    let r = b1.radius();
    let e_b = 0.5 * (b1.params.e_b + b2.params.e_b);

    // Frame with the line of centres along +x
    let theta = planar_angle(b2.state.pos - b1.state.pos);
    let mut v1 = rotate_z(b1.state.vel, -theta);
    let mut w1 = rotate_z(b1.state.spin, -theta);
    let mut v2 = rotate_z(b2.state.vel, -theta);
    let mut w2 = rotate_z(b2.state.spin, -theta);

    let v1_n = 0.5 * ((1.0 - e_b) * v1.x + (1.0 + e_b) * v2.x);
    let v2_n = 0.5 * ((1.0 + e_b) * v1.x + (1.0 - e_b) * v2.x);
    let dv_n = (v2_n - v1_n).abs();
    let (w1_n, w2_n) = (w1.x, w2.x);

    // Tangential problem only
    v1.x = 0.0;
    w1.x = 0.0;
    v2.x = 0.0;
    w2.x = 0.0;

    let v12_c = surface_velocity(v1, w1, DVec3::X, r) - surface_velocity(v2, w2, -DVec3::X, r);
    let u_b = friction.coefficient(b1, b2, v12_c.length());

    let mut slip = None;
    if v12_c.length() > EPS {
        let dv_t = u_b * dv_n * -v12_c.normalize();
        let dw = 2.5 / r * DVec3::X.cross(dv_t);
        let (v1f, w1f, v2f, w2f) = (v1 + dv_t, w1 + dw, v2 - dv_t, w2 + dw);
        let after = surface_velocity(v1f, w1f, DVec3::X, r) - surface_velocity(v2f, w2f, -DVec3::X, r);
        // Friction saturates unless it would reverse the slip
        if v12_c.dot(after) > 0.0 {
            slip = Some((v1f, w1f, v2f, w2f));
        }
    }
    let (mut v1f, mut w1f, mut v2f, mut w2f) = slip.unwrap_or_else(|| {
        let dv_t = -(1.0 / 9.0) * (2.0 * (v1 - v2) + r * (2.0 * w1 + 7.0 * w2).cross(DVec3::X));
        let dw = (5.0 / 9.0) * (w2 - w1 + DVec3::X.cross(v2 - v1) / r);
        (v1 + dv_t, w1 + dw, v2 - dv_t, w2 + dw)
    });

    v1f.x = v1_n;
    v2f.x = v2_n;
    w1f.x = w1_n;
    w2f.x = w2_n;

    let mut s1 = b1.state;
    let mut s2 = b2.state;
    s1.vel = rotate_z(v1f, theta);
    s1.spin = rotate_z(w1f, theta);
    s2.vel = rotate_z(v2f, theta);
    s2.spin = rotate_z(w2f, theta);
    (sliding(s1), sliding(s2))
}

fn mathavan(b1: &Ball, b2: &Ball, num_iterations: usize) -> (BallState, BallState) {
    let r = b1.radius();
    let m = b1.params.m;
    let u_s1 = b1.params.u_s;
    let u_s2 = b2.params.u_s;
    let u_b = 0.5 * (b1.params.u_b + b2.params.u_b);
    let e_b = 0.5 * (b1.params.e_b + b2.params.e_b);

    let y_loc = (b2.state.pos - b1.state.pos).truncate().normalize_or_zero().extend(0.0);
    if y_loc == DVec3::ZERO {
        return (b1.state, b2.state);
    }
    let x_loc = y_loc.cross(DVec3::Z);
    let local = |v: DVec3| DVec3::new(v.dot(x_loc), v.dot(y_loc), v.z);
    let global = |v: DVec3| v.x * x_loc + v.y * y_loc + v.z * DVec3::Z;

    let (mut vi, mut wi) = (local(b1.state.vel), local(b1.state.spin));
    let (mut vj, mut wj) = (local(b2.state.vel), local(b2.state.spin));

    let mut v_ijy = vj.y - vi.y;
    if !(v_ijy < 0.0) {
        // Not approaching along the line of centres
        return (sliding(b1.state), sliding(b2.state));
    }
    let delta_p = 0.5 * (1.0 + e_b) * m * v_ijy.abs() / num_iterations.max(1) as f64;
    let c = 5.0 / (2.0 * m * r);

    let mut work = 0.0;
    let mut work_final = f64::INFINITY;
    let mut compressed = false;
    let max_steps = 20 * num_iterations.max(1) + 100;
    let mut steps = 0;

    while (v_ijy < 0.0 || work < work_final) && steps < max_steps {
        // Slip at the ball-cloth contacts and at the ball-ball contact
        let (ui_x, ui_y) = (vi.x + r * wi.y, vi.y - r * wi.x);
        let (uj_x, uj_y) = (vj.x + r * wj.y, vj.y - r * wj.x);
        let ui_mag = ui_x.hypot(ui_y);
        let uj_mag = uj_x.hypot(uj_y);
        let uc_x = vi.x - vj.x - r * (wi.z + wj.z);
        let uc_z = r * (wi.x + wj.x);
        let uc_mag = uc_x.hypot(uc_z);

        let (mut dp1, mut dp2) = (0.0, 0.0);
        let (mut dpi_x, mut dpi_y, mut dpj_x, mut dpj_y) = (0.0, 0.0, 0.0, 0.0);
        if uc_mag >= 1e-16 {
            dp1 = -u_b * delta_p * uc_x / uc_mag;
            if uc_z.abs() >= 1e-16 {
                dp2 = -u_b * delta_p * uc_z / uc_mag;
                if dp2 > 0.0 {
                    if uj_mag != 0.0 {
                        dpj_x = -u_s2 * (uj_x / uj_mag) * dp2;
                        dpj_y = -u_s2 * (uj_y / uj_mag) * dp2;
                    }
                } else if ui_mag != 0.0 {
                    dpi_x = u_s1 * (ui_x / ui_mag) * dp2;
                    dpi_y = u_s1 * (ui_y / ui_mag) * dp2;
                }
            }
        }

        vi.x += (dp1 + dpi_x) / m;
        vi.y += (-delta_p + dpi_y) / m;
        vj.x += (-dp1 + dpj_x) / m;
        vj.y += (delta_p + dpj_y) / m;
        wi += c * DVec3::new(dp2 + dpi_y, -dpi_x, -dp1);
        wj += c * DVec3::new(dp2 + dpj_y, -dpj_x, -dp1);

        let previous = v_ijy;
        v_ijy = vj.y - vi.y;
        work += 0.5 * delta_p * (previous + v_ijy).abs();
        steps += 1;

        if !compressed && v_ijy > 0.0 {
            compressed = true;
            work_final = (1.0 + e_b * e_b) * work;
        }
    }
    if steps >= max_steps {
        log::warn!("Ball-ball impulse for {}-{} stopped after {} steps", b1.id, b2.id, steps);
    }

    let mut s1 = b1.state;
    let mut s2 = b2.state;
    let v1 = global(DVec3::new(vi.x, vi.y, 0.0));
    let v2 = global(DVec3::new(vj.x, vj.y, 0.0));
    s1.vel = DVec3::new(v1.x, v1.y, s1.vel.z);
    s2.vel = DVec3::new(v2.x, v2.y, s2.vel.z);
    s1.spin = global(wi);
    s2.spin = global(wj);
    (sliding(s1), sliding(s2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallParams;

    fn pair(v1: DVec3, spin1: DVec3) -> (Ball, Ball) {
        let p = BallParams::default();
        let mut a = Ball::at_rest(1, 0.5, 0.5, p);
        a.state.vel = v1;
        a.state.spin = spin1;
        a.state.phase = MotionPhase::Sliding;
        let b = Ball::at_rest(2, 0.5 + 2.0 * p.r, 0.5, p);
        (a, b)
    }

    fn momentum(s1: &BallState, s2: &BallState) -> DVec3 {
        s1.vel + s2.vel
    }

    #[test]
    fn test_elastic_head_on_exchanges_velocity() {
        let (a, b) = pair(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        let (s1, s2) = BallBallModel::FrictionlessElastic.solve(&a, &b);
        assert!(s1.vel.length() < 1e-12);
        assert!((s2.vel - DVec3::X).length() < 1e-12);
        assert_eq!(s2.phase, MotionPhase::Sliding);
    }

    #[test]
    fn test_elastic_cut_is_ninety_degrees() {
        let (a, mut b) = pair(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        let r = a.radius();
        b.state.pos = a.state.pos + DVec3::new(2.0 * r * 0.6, 2.0 * r * 0.8, 0.0);
        let (s1, s2) = BallBallModel::FrictionlessElastic.solve(&a, &b);
        assert!(s1.vel.dot(s2.vel).abs() < 1e-12);
        assert!((momentum(&s1, &s2) - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_inelastic_conserves_momentum_and_loses_energy() {
        let (a, b) = pair(DVec3::new(2.0, 0.0, 0.0), DVec3::new(0.0, 2.0 / 0.028575, 0.0));
        for friction in [FrictionModel::Average, FrictionModel::ALCIATORE] {
            let model = BallBallModel::FrictionalInelastic { friction };
            let (s1, s2) = model.solve(&a, &b);
            assert!((momentum(&s1, &s2) - a.state.vel).length() < 1e-9);
            // Restitution below one: cue ball keeps a little forward speed
            assert!(s1.vel.x > 0.0 && s1.vel.x < 0.1);
            assert!(s2.vel.x > 1.8);
        }
    }

    #[test]
    fn test_mathavan_head_on() {
        let (a, b) = pair(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        let model = BallBallModel::FrictionalMathavan { num_iterations: 1000 };
        let (s1, s2) = model.solve(&a, &b);
        assert!(s2.vel.x > 0.9 && s2.vel.x <= 1.0);
        assert!(s1.vel.x.abs() < 0.1);
        assert!(s1.vel.y.abs() < 1e-9 && s2.vel.y.abs() < 1e-9);
    }

    #[test]
    fn test_mathavan_without_approach_is_noop() {
        let (a, b) = pair(DVec3::new(-1.0, 0.0, 0.0), DVec3::ZERO);
        let model = BallBallModel::FrictionalMathavan { num_iterations: 1000 };
        let (s1, _) = model.solve(&a, &b);
        assert_eq!(s1.vel, a.state.vel);
    }

    #[test]
    fn test_kiss_sets_exact_separation() {
        let (mut a, b) = pair(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        a.state.pos.x -= 1e-12;
        let (s1, s2) = make_kiss(&a, &b);
        let gap = (s2.pos - s1.pos).length() - 2.0 * a.radius();
        assert!((gap - EPS_SPACE).abs() < 1e-12);
    }

    #[test]
    fn test_continually_touching_separates_chasing_balls() {
        let (mut a, mut b) = pair(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        a.state.vel = DVec3::new(0.500, 0.0, 0.0);
        b.state.vel = DVec3::new(0.495, 0.0, 0.0);
        let (s1, s2) = resolve_continually_touching(a.state, b.state);
        assert!(s2.vel.x > s1.vel.x);
        assert!((momentum(&s1, &s2) - momentum(&a.state, &b.state)).length() < 1e-12);

        // Unrelated velocities are left alone
        b.state.vel = DVec3::new(0.0, 0.5, 0.0);
        let (s1, _) = resolve_continually_touching(a.state, b.state);
        assert_eq!(s1.vel, a.state.vel);
    }

    #[test]
    fn test_resolve_leaves_balls_separating() {
        let (a, b) = pair(DVec3::new(1.5, 0.3, 0.0), DVec3::new(0.0, 0.0, 20.0));
        for model in [
            BallBallModel::FrictionlessElastic,
            BallBallModel::FrictionalInelastic { friction: FrictionModel::ALCIATORE },
            BallBallModel::default(),
        ] {
            let (s1, s2) = model.resolve(&a, &b);
            let n = (s2.pos - s1.pos).normalize();
            assert!((s2.vel - s1.vel).dot(n) > 0.0, "{} leaves balls closing", model.as_str());
        }
    }
}
