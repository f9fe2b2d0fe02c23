//! Ball-cushion collision models
//!
//! Linear and circular cushions share the models; they differ only in where the
//! contact normal comes from and how the ball is placed at contact.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::consts::EPS_SPACE;
use crate::sim::ball::{Ball, BallState, MotionPhase};
use crate::sim::table::{CircularCushion, LinearCushion};
use crate::{planar_angle, rotate_z};

/// Ball-cushion collision model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CushionModel {
    /// Han (2005) impulse model with the contact point above the ball's equator
    #[default]
    Han2005,
    /// Sphere against a half-space: restitution plus sliding or sticking friction
    ImpulseFrictionalInelastic,
    /// Mirror the velocity about the cushion; spin is kept
    MirrorReflection,
}

impl CushionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CushionModel::Han2005 => "han_2005",
            CushionModel::ImpulseFrictionalInelastic => "impulse_frictional_inelastic",
            CushionModel::MirrorReflection => "mirror_reflection",
        }
    }

    pub fn resolve_linear(&self, ball: &Ball, cushion: &LinearCushion) -> BallState {
        let kissed = kiss_linear(ball, cushion);
        let normal = cushion.normal_towards(kissed.state.pos);
        self.solve(&kissed, normal, cushion.height())
    }

    pub fn resolve_circular(&self, ball: &Ball, cushion: &CircularCushion) -> BallState {
        let kissed = kiss_circular(ball, cushion);
        let normal = cushion.normal_towards(kissed.state.pos);
        self.solve(&kissed, normal, cushion.height())
    }

    /// Post-collision state for a ball touching a cushion of `height`.
    ///
    /// `normal` is the unit contact normal in the table plane pointing from the
    /// cushion towards the ball centre.
    pub fn solve(&self, ball: &Ball, normal: DVec3, height: f64) -> BallState {
        let mut state = match self {
            CushionModel::Han2005 => han_2005(ball, normal, height),
            CushionModel::ImpulseFrictionalInelastic => impulse_frictional_inelastic(ball, normal),
            CushionModel::MirrorReflection => mirror_reflection(ball, normal),
        };
        state.vel.z = 0.0;
        state.phase = MotionPhase::Sliding;
        state
    }
}

/// Move the ball along the cushion normal so it sits `R + EPS_SPACE` from the line
pub fn kiss_linear(ball: &Ball, cushion: &LinearCushion) -> Ball {
    let mut out = ball.clone();
    let pos = ball.state.pos;
    let n = cushion.normal_towards(pos);
    let c = cushion.closest_point(pos);
    let correction = ball.radius() + EPS_SPACE - (pos - c).length();
    out.state.pos += correction * n;
    out
}

/// Move the ball radially so its centre is `R + r_c + EPS_SPACE` from the cushion centre
pub fn kiss_circular(ball: &Ball, cushion: &CircularCushion) -> Ball {
    let mut out = ball.clone();
    let pos = ball.state.pos;
    let n = cushion.normal_towards(pos);
    let c = DVec3::new(cushion.center.x, cushion.center.y, pos.z);
    let correction = ball.radius() + cushion.radius + EPS_SPACE - (pos - c).length();
    out.state.pos += correction * n;
    out
}

/// Reflect a velocity off a surface with unit normal `n`
#[inline]
pub fn reflect_velocity(velocity: DVec3, normal: DVec3) -> DVec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

fn mirror_reflection(ball: &Ball, normal: DVec3) -> BallState {
    let mut state = ball.state;
    // Only reflect a ball that is actually moving into the cushion
    if state.vel.dot(normal) < 0.0 {
        state.vel = reflect_velocity(state.vel, normal);
    }
    state
}

/// Han (2005), "Dynamics in Carom and Three Cushion Billiards".
///
/// Works in a frame where the cushion normal (pointing away from the table) is +x.
fn han_2005(ball: &Ball, normal: DVec3, height: f64) -> BallState {
    let p = &ball.params;
    let (r, m) = (p.r, p.m);
    let e = p.e_c;
    let mu = p.f_c;

    let psi = planar_angle(-normal);
    let mut v = rotate_z(ball.state.vel, -psi);
    let mut w = rotate_z(ball.state.spin, -psi);
    let phi = planar_angle(v).rem_euclid(std::f64::consts::TAU);

    // Angle of the contact point above the ball's equator
    let theta_a = (height / r - 1.0).clamp(-1.0, 1.0).asin();
    let (sin_a, cos_a) = theta_a.sin_cos();

    let sx = v.x * sin_a - v.z * cos_a + r * w.y;
    let sy = -v.y - r * w.z * cos_a + r * w.x * sin_a;
    let c = v.x * cos_a;

    let inertia = p.inertia();
    let a = 7.0 / 2.0 / m;
    let b = 1.0 / m;

    let pz_e = (1.0 + e) * c / b;
    let pz_s = sx.hypot(sy) / a;

    let (px, py, pz) = if pz_s <= pz_e {
        // Contact point stops slipping during the impact
        (
            -sx / a * sin_a - (1.0 + e) * c / b * cos_a,
            sy / a,
            sx / a * cos_a - (1.0 + e) * c / b * sin_a,
        )
    } else {
        let k = (1.0 + e) * c / b;
        (
            -mu * k * phi.cos() * sin_a - k * cos_a,
            mu * k * phi.sin(),
            mu * k * phi.cos() * cos_a - k * sin_a,
        )
    };

    v.x += px / m;
    v.y += py / m;
    w.x += -r / inertia * py * sin_a;
    w.y += r / inertia * (px * sin_a - pz * cos_a);
    w.z += r / inertia * py * cos_a;

    let mut state = ball.state;
    state.vel = rotate_z(v, psi);
    state.spin = rotate_z(w, psi);
    state
}

/// Sphere hitting a half-space with unit normal `normal` (pointing out of the wall)
fn impulse_frictional_inelastic(ball: &Ball, normal: DVec3) -> BallState {
    let p = &ball.params;
    let r = p.r;
    let mut state = ball.state;

    // Velocity of the contact point
    let v_c = state.vel + state.spin.cross(-r * normal);
    let v_n = v_c.dot(normal);
    if v_n >= 0.0 {
        return state;
    }
    let v_t = v_c - v_n * normal;

    let dv_n = (1.0 + p.e_c) * -v_n;
    let dv_t_stick = -(2.0 / 7.0) * v_t;
    let dv_t_slip = -p.f_c * dv_n * v_t.normalize_or_zero();
    let dv_t = if dv_t_stick.length_squared() <= dv_t_slip.length_squared() {
        dv_t_stick
    } else {
        dv_t_slip
    };

    state.vel += dv_n * normal + dv_t;
    state.spin += -(5.0 / (2.0 * r)) * normal.cross(dv_t);
    state
}
