//! Closed-form ball trajectories
//!
//! Within one motion phase the ball centre follows `a τ² + b τ + c` exactly, so a
//! state can be advanced by any `τ` without integration error. All functions here
//! are pure.

use glam::DVec3;

use super::ball::{BallParams, BallState, MotionPhase};
use crate::consts::EPS;
use crate::guarded_div;

/// Velocity of the ball's contact point with the cloth
#[inline]
pub fn rel_velocity(state: &BallState, r: f64) -> DVec3 {
    let w = state.spin;
    state.vel + r * DVec3::new(-w.y, w.x, 0.0)
}

/// Duration until sliding turns into rolling
pub fn slide_time(state: &BallState, p: &BallParams) -> f64 {
    if p.u_s == 0.0 {
        return f64::INFINITY;
    }
    guarded_div(2.0 * rel_velocity(state, p.r).length(), 7.0 * p.u_s * p.g)
}

/// Duration until rolling comes to a halt
pub fn roll_time(state: &BallState, p: &BallParams) -> f64 {
    if p.u_r == 0.0 {
        return f64::INFINITY;
    }
    guarded_div(state.vel.length(), p.u_r * p.g)
}

/// Duration until vertical-axis spin decays to zero
pub fn spin_time(state: &BallState, p: &BallParams) -> f64 {
    let u_sp = p.u_sp();
    if u_sp == 0.0 {
        return f64::INFINITY;
    }
    guarded_div(state.spin.z.abs() * 2.0 / 5.0 * p.r, u_sp * p.g)
}

/// Vertical spin after `t`, decaying linearly and never past zero
pub fn decay_spin_z(wz: f64, p: &BallParams, t: f64) -> f64 {
    if t == 0.0 || wz.abs() < EPS {
        return wz;
    }
    let alpha = 5.0 * p.u_sp() * p.g / (2.0 * p.r);
    if alpha == 0.0 {
        return wz;
    }
    let t = t.min(wz.abs() / alpha);
    wz - wz.signum() * alpha * t
}

/// Planar trajectory of the ball centre, `r(τ) = a τ² + b τ + c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarTrajectory {
    pub a: DVec3,
    pub b: DVec3,
    pub c: DVec3,
}

impl PlanarTrajectory {
    pub fn at_rest(c: DVec3) -> Self {
        Self { a: DVec3::ZERO, b: DVec3::ZERO, c }
    }

    /// Position at `τ`
    #[inline]
    pub fn position(&self, tau: f64) -> DVec3 {
        self.a * tau * tau + self.b * tau + self.c
    }

    /// Velocity at `τ`
    #[inline]
    pub fn velocity(&self, tau: f64) -> DVec3 {
        2.0 * self.a * tau + self.b
    }
}

/// Trajectory coefficients valid for the remainder of the current phase.
///
/// The z component of `a` and `b` is always zero: balls stay on the cloth.
pub fn trajectory(state: &BallState, p: &BallParams) -> PlanarTrajectory {
    let c = state.pos;
    let b = DVec3::new(state.vel.x, state.vel.y, 0.0);
    match state.phase {
        MotionPhase::Sliding => {
            let u = rel_velocity(state, p.r).normalize_or_zero();
            PlanarTrajectory { a: -0.5 * p.u_s * p.g * u, b, c }
        }
        MotionPhase::Rolling => {
            let v_hat = b.normalize_or_zero();
            PlanarTrajectory { a: -0.5 * p.u_r * p.g * v_hat, b, c }
        }
        _ => PlanarTrajectory::at_rest(c),
    }
}

/// Duration until the current phase ends, with the phase that follows.
///
/// `None` when the ball never transitions on its own.
pub fn next_transition(state: &BallState, p: &BallParams) -> Option<(f64, MotionPhase)> {
    match state.phase {
        MotionPhase::Sliding => Some((slide_time(state, p), MotionPhase::Rolling)),
        MotionPhase::Rolling => {
            let roll = roll_time(state, p);
            // Spin at the moment rolling stops decides what follows
            let spin_left = decay_spin_z(state.spin.z, p, roll);
            let next = if spin_left.abs() >= EPS && roll.is_finite() {
                MotionPhase::Spinning
            } else {
                MotionPhase::Stationary
            };
            Some((roll, next))
        }
        MotionPhase::Spinning => Some((spin_time(state, p), MotionPhase::Stationary)),
        MotionPhase::Stationary | MotionPhase::Pocketed => None,
    }
}

fn slide(state: &BallState, p: &BallParams, t: f64) -> BallState {
    if t == 0.0 {
        return *state;
    }
    let u = rel_velocity(state, p.r).normalize_or_zero();
    let decel = p.u_s * p.g;
    let pos = state.pos + state.vel * t - 0.5 * decel * t * t * u;
    let vel = state.vel - decel * t * u;
    let dw = 2.5 / p.r * decel * t * u.cross(DVec3::Z);
    let mut spin = state.spin - dw;
    spin.z = decay_spin_z(state.spin.z, p, t);
    BallState { pos, vel, spin, phase: MotionPhase::Sliding, t: state.t + t }
}

fn roll(state: &BallState, p: &BallParams, t: f64) -> BallState {
    if t == 0.0 {
        return *state;
    }
    let v_hat = state.vel.normalize_or_zero();
    let decel = p.u_r * p.g;
    let pos = state.pos + state.vel * t - 0.5 * decel * t * t * v_hat;
    let vel = state.vel - decel * t * v_hat;
    let spin = DVec3::new(-vel.y / p.r, vel.x / p.r, decay_spin_z(state.spin.z, p, t));
    BallState { pos, vel, spin, phase: MotionPhase::Rolling, t: state.t + t }
}

fn spin_in_place(state: &BallState, p: &BallParams, t: f64) -> BallState {
    let mut out = *state;
    out.spin.z = decay_spin_z(state.spin.z, p, t);
    out.t = state.t + t;
    out
}

/// Exact state after `dt`, continuing into later phases if `dt` outlasts the
/// current one.
pub fn evolve(state: &BallState, p: &BallParams, dt: f64) -> BallState {
    let mut s = *state;
    let mut t = dt;
    loop {
        match s.phase {
            MotionPhase::Stationary | MotionPhase::Pocketed => {
                s.t += t;
                return s;
            }
            MotionPhase::Sliding => {
                let end = slide_time(&s, p);
                if t < end {
                    return slide(&s, p, t);
                }
                s = slide(&s, p, end);
                s.phase = MotionPhase::Rolling;
                t -= end;
            }
            MotionPhase::Rolling => {
                let end = roll_time(&s, p);
                if t < end {
                    return roll(&s, p, t);
                }
                s = roll(&s, p, end);
                s.vel = DVec3::ZERO;
                s.spin.x = 0.0;
                s.spin.y = 0.0;
                s.phase = MotionPhase::Spinning;
                t -= end;
            }
            MotionPhase::Spinning => {
                let end = spin_time(&s, p);
                if t < end {
                    return spin_in_place(&s, p, t);
                }
                s = spin_in_place(&s, p, end);
                s.spin = DVec3::ZERO;
                s.phase = MotionPhase::Stationary;
                t -= end;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sliding(vel: DVec3, spin: DVec3) -> BallState {
        BallState { pos: DVec3::new(0.5, 0.5, 0.028575), vel, spin, phase: MotionPhase::Sliding, t: 0.0 }
    }

    #[test]
    fn test_stun_shot_becomes_rolling_at_slide_time() {
        let p = BallParams::default();
        let s = sliding(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        let t = slide_time(&s, &p);
        assert!((t - 2.0 / (7.0 * 0.2 * 9.81)).abs() < 1e-12);
        let end = slide(&s, &p, t);
        // Rolling condition: contact point at rest
        assert!(rel_velocity(&end, p.r).length() < 1e-9);
        assert!((end.vel.x - 5.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_roll_comes_to_rest() {
        let p = BallParams::default();
        let mut s = sliding(DVec3::new(0.0, 0.5, 0.0), DVec3::ZERO);
        s.phase = MotionPhase::Rolling;
        s.spin = DVec3::new(-0.5 / p.r, 0.0, 0.0);
        let t = roll_time(&s, &p);
        let end = evolve(&s, &p, t + 1.0);
        assert_eq!(end.phase, MotionPhase::Stationary);
        assert_eq!(end.vel, DVec3::ZERO);
        // Distance covered: v² / (2 u_r g)
        let dist = end.pos.y - s.pos.y;
        assert!((dist - 0.25 / (2.0 * 0.01 * 9.81)).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_with_side_spin_ends_spinning() {
        let p = BallParams::default();
        let mut s = sliding(DVec3::new(0.2, 0.0, 0.0), DVec3::new(0.0, 0.2 / p.r, 30.0));
        s.phase = MotionPhase::Rolling;
        let (t, next) = next_transition(&s, &p).unwrap();
        assert_eq!(next, MotionPhase::Spinning);
        let mid = evolve(&s, &p, t + 1e-6);
        assert_eq!(mid.phase, MotionPhase::Spinning);
        let end = evolve(&s, &p, t + spin_time(&mid, &p) + 1.0);
        assert_eq!(end.phase, MotionPhase::Stationary);
    }

    #[test]
    fn test_trajectory_matches_evolve() {
        let p = BallParams::default();
        let s = sliding(DVec3::new(1.2, -0.4, 0.0), DVec3::new(3.0, 5.0, -2.0));
        let traj = trajectory(&s, &p);
        let tau = 0.5 * slide_time(&s, &p);
        let evolved = evolve(&s, &p, tau);
        assert!((traj.position(tau) - evolved.pos).length() < 1e-12);
        assert!((traj.velocity(tau) - evolved.vel).length() < 1e-12);
    }

    #[test]
    fn test_spin_decay_stops_at_zero() {
        let p = BallParams::default();
        assert_eq!(decay_spin_z(-5.0, &p, 1e6), 0.0);
        assert!(decay_spin_z(5.0, &p, 1e-3) < 5.0);
    }

    #[test]
    fn test_frictionless_transition_never_happens() {
        let p = BallParams::default().frictionless();
        let s = sliding(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO);
        let (t, _) = next_transition(&s, &p).unwrap();
        assert_eq!(t, f64::INFINITY);
    }

    proptest! {
        #[test]
        fn prop_zero_friction_is_straight_line(
            vx in -3.0f64..3.0,
            vy in -3.0f64..3.0,
            wx in -50.0f64..50.0,
            wy in -50.0f64..50.0,
            tau in 0.0f64..20.0,
        ) {
            let p = BallParams::default().frictionless();
            let s = sliding(DVec3::new(vx, vy, 0.0), DVec3::new(wx, wy, 0.0));
            let out = evolve(&s, &p, tau);
            let expect = s.pos + s.vel * tau;
            prop_assert!((out.pos - expect).length() < 1e-9);
            prop_assert!((out.vel - s.vel).length() < 1e-12);
        }
    }
}
