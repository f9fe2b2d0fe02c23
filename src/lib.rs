//! Break Sim - event-based billiards simulation core
//!
//! Core modules:
//! - `sim`: Event-based simulation (trajectories, event detection, resolution, scheduling)
//! - `roots`: Exact-time polynomial root solving (quartic, cubic, quadratic)
//! - `config`: Simulation and resolver configuration
//! - `error`: Error types

pub mod config;
pub mod error;
pub mod roots;
pub mod sim;

pub use config::{ResolverConfig, SimConfig};
pub use error::{Result, SimError};
pub use sim::{SimResult, System, simulate};

use glam::{DVec2, DVec3};

/// Simulation constants
pub mod consts {
    /// Numerical tolerance used for "effectively zero" checks on times and speeds
    pub const EPS: f64 = f64::EPSILON * 100.0;
    /// Gap left between bodies after they are placed in contact (meters)
    pub const EPS_SPACE: f64 = 1e-9;
    /// Two bodies closer than this to exact contact count as touching (meters).
    /// Smaller than `EPS_SPACE`, so a freshly kissed pair is always apart.
    pub const CONTACT_TOL: f64 = 1e-10;
    /// Roots at or below this are rejected for pairs that start out touching (seconds)
    pub const TOUCH_FLOOR: f64 = 1e-9;
    /// Number of balls above which batched root solving goes parallel
    pub const PARALLEL_BATCH_MIN: usize = 64;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Angle of the xy projection of `v`, measured from +x
#[inline]
pub fn planar_angle(v: DVec3) -> f64 {
    v.y.atan2(v.x)
}

/// Rotate `v` about +z by `angle` radians
#[inline]
pub fn rotate_z(v: DVec3, angle: f64) -> DVec3 {
    let (s, c) = angle.sin_cos();
    DVec3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z)
}

/// Divide, mapping `0 / x` to 0 and `x / 0` to infinity
#[inline]
pub fn guarded_div(num: f64, den: f64) -> f64 {
    if num == 0.0 {
        0.0
    } else if den == 0.0 {
        f64::INFINITY
    } else {
        num / den
    }
}
