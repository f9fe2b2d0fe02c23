//! Event equations
//!
//! Turns pairs of closed-form trajectories into polynomials in `τ` (time from now)
//! whose smallest acceptable root is the time of the next event between them.

use glam::DVec3;

use super::ball::{Ball, MotionPhase};
use super::motion::{PlanarTrajectory, next_transition, trajectory};
use super::table::{CircularCushion, CushionDirection, LinearCushion, Pocket};
use crate::consts::{CONTACT_TOL, EPS, TOUCH_FLOOR};
use crate::roots::{Quartic, quadratic};

/// How a pair sits at `τ = 0` relative to exact contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// Clear of each other
    Apart,
    /// Touching within tolerance and moving apart (or not closing)
    TouchingSeparating,
    /// Touching within tolerance and closing in
    TouchingApproaching,
    /// Interpenetrating beyond tolerance
    Overlapping,
}

/// Coefficients of `|p(τ) - q(τ)|² - D²` for two planar trajectories
pub fn distance_quartic(p: &PlanarTrajectory, q: &PlanarTrajectory, d: f64) -> [f64; 5] {
    let a = (q.a - p.a).truncate();
    let b = (q.b - p.b).truncate();
    let c = (q.c - p.c).truncate();
    [
        a.dot(a),
        2.0 * a.dot(b),
        b.dot(b) + 2.0 * a.dot(c),
        2.0 * b.dot(c),
        c.dot(c) - d * d,
    ]
}

/// Classify the `τ = 0` configuration of a distance quartic with contact distance `d`
pub fn classify_contact(coeffs: &[f64; 5], d: f64) -> Contact {
    // e = |Δc|² - D² ≈ 2 D (|Δc| - D) near contact
    let gap = (coeffs[4] + d * d).max(0.0).sqrt() - d;
    if gap < -CONTACT_TOL {
        Contact::Overlapping
    } else if gap <= CONTACT_TOL {
        // Closing now, or at rest relative to each other and accelerating together
        if coeffs[3] < 0.0 || (coeffs[3] <= EPS && coeffs[2] < 0.0) {
            Contact::TouchingApproaching
        } else {
            Contact::TouchingSeparating
        }
    } else {
        Contact::Apart
    }
}

/// Distance quartic ready for the solver; touching-and-separating pairs get the
/// spurious `τ = 0` root removed.
pub fn contact_quartic(coeffs: [f64; 5], d: f64) -> (Quartic, Contact) {
    let contact = classify_contact(&coeffs, d);
    let q = match contact {
        Contact::TouchingSeparating => {
            let mut c = coeffs;
            c[4] = 0.0;
            Quartic::new(c).above(TOUCH_FLOOR)
        }
        _ => Quartic::new(coeffs),
    };
    (q, contact)
}

/// Ball-ball collision equation: centres `R1 + R2` apart
pub fn ball_ball_coeffs(b1: &Ball, b2: &Ball) -> [f64; 5] {
    let p = trajectory(&b1.state, &b1.params);
    let q = trajectory(&b2.state, &b2.params);
    distance_quartic(&p, &q, b1.radius() + b2.radius())
}

/// Ball-circular cushion equation: centre `R + r_cushion` from the cushion centre
pub fn ball_circular_cushion_coeffs(ball: &Ball, cushion: &CircularCushion) -> [f64; 5] {
    let p = trajectory(&ball.state, &ball.params);
    let q = PlanarTrajectory::at_rest(cushion.center);
    distance_quartic(&p, &q, ball.radius() + cushion.radius)
}

/// Ball-pocket equation: centre within `r_pocket - R` of the pocket centre
pub fn ball_pocket_coeffs(ball: &Ball, pocket: &Pocket) -> [f64; 5] {
    let p = trajectory(&ball.state, &ball.params);
    let q = PlanarTrajectory::at_rest(pocket.center);
    distance_quartic(&p, &q, pocket.capture_distance(ball.radius()))
}

/// Time until `ball` touches the linear cushion, `f64::INFINITY` if never.
///
/// The signed distance of the centre from the cushion line is a quadratic in `τ`.
/// A root only counts when the contact point lies within the segment and the ball
/// is moving into the playing-surface side.
pub fn ball_linear_cushion_time(ball: &Ball, cushion: &LinearCushion) -> f64 {
    if !ball.phase().is_translating() {
        return f64::INFINITY;
    }
    let traj = trajectory(&ball.state, &ball.params);
    let n = cushion.normal();
    let r = ball.radius();

    let qa = n.dot(traj.a);
    let qb = n.dot(traj.b);
    let qc = n.dot(traj.c - cushion.p1);

    // +R: ball on the normal side; -R: ball on the far side
    let offsets: &[f64] = match cushion.direction {
        CushionDirection::Side1 => &[r],
        CushionDirection::Side2 => &[-r],
        CushionDirection::Both => &[r, -r],
    };

    let mut best = f64::INFINITY;
    for &offset in offsets {
        for tau in quadratic::real_roots(qa, qb, qc - offset) {
            if !(tau > EPS) || tau >= best {
                continue;
            }
            // Must be moving towards the line from the offset side
            let vn = n.dot(traj.velocity(tau));
            if vn * offset >= 0.0 {
                continue;
            }
            let s = cushion.projection(traj.position(tau));
            if (0.0..=1.0).contains(&s) {
                best = tau;
            }
        }
    }
    best
}

/// Time until the ball's current motion phase ends and the phase after it
pub fn transition_time(ball: &Ball) -> Option<(f64, MotionPhase)> {
    next_transition(&ball.state, &ball.params)
}

/// Whether a rolling ball is moving away from a ball at rest and can never reach it.
///
/// Rolling motion is a straight line with monotonically falling speed, so a ball at
/// rest outside the cone swept ahead of it is unreachable.
pub fn rolling_away_from(mover: &Ball, rest: &Ball) -> bool {
    if mover.phase() != MotionPhase::Rolling || rest.phase().is_translating() {
        return false;
    }
    let v = mover.state.vel.truncate();
    let d = (rest.state.pos - mover.state.pos).truncate();
    let reach = mover.radius() + rest.radius();
    let dist = d.length();
    if dist <= reach || v.length_squared() == 0.0 {
        return false;
    }
    let max_hit_angle = (reach / dist).asin();
    let angle = v.perp_dot(d).atan2(v.dot(d));
    angle.abs() > max_hit_angle + 1e-9
}

/// Position of the ball centre at `τ` along its current phase
pub fn position_at(ball: &Ball, tau: f64) -> DVec3 {
    trajectory(&ball.state, &ball.params).position(tau)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::{QuarticSolver, solve_quartic};
    use crate::sim::ball::BallParams;

    fn moving(id: u32, x: f64, y: f64, vx: f64, vy: f64, p: BallParams) -> Ball {
        let mut b = Ball::at_rest(id, x, y, p);
        b.state.vel = DVec3::new(vx, vy, 0.0);
        b.state.phase = MotionPhase::Sliding;
        b
    }

    #[test]
    fn test_head_on_collision_time() {
        let p = BallParams::default().frictionless();
        let r = p.r;
        let a = moving(1, 0.0, 0.0, 1.0, 0.0, p);
        let b = Ball::at_rest(2, 1.0, 0.0, p);
        let coeffs = ball_ball_coeffs(&a, &b);
        assert_eq!(coeffs[0], 0.0);
        assert_eq!(coeffs[1], 0.0);
        assert!((coeffs[2] - 1.0).abs() < 1e-15);
        assert!((coeffs[3] + 2.0).abs() < 1e-15);
        assert!((coeffs[4] - (1.0 - 4.0 * r * r)).abs() < 1e-15);
        let t = solve_quartic(Quartic::new(coeffs), QuarticSolver::Hybrid);
        assert!((t - (1.0 - 2.0 * r)).abs() < 1e-12);
    }

    #[test]
    fn test_touching_separating_has_no_zero_root() {
        let p = BallParams::default().frictionless();
        let a = moving(1, 0.0, 0.0, -1.0, 0.0, p);
        let b = Ball::at_rest(2, 2.0 * p.r, 0.0, p);
        let coeffs = ball_ball_coeffs(&a, &b);
        let (q, contact) = contact_quartic(coeffs, 2.0 * p.r);
        assert_eq!(contact, Contact::TouchingSeparating);
        assert_eq!(solve_quartic(q, QuarticSolver::Hybrid), f64::INFINITY);
    }

    #[test]
    fn test_touching_and_accelerating_inward_is_approaching() {
        // Zero relative velocity, but ball 1 spins forward and is about to push into ball 2
        let p = BallParams::default();
        let mut a = Ball::at_rest(1, 0.0, 0.0, p);
        a.state.spin = DVec3::new(0.0, 20.0, 0.0);
        a.state.phase = MotionPhase::Sliding;
        let b = Ball::at_rest(2, 2.0 * p.r, 0.0, p);
        let coeffs = ball_ball_coeffs(&a, &b);
        assert_eq!(classify_contact(&coeffs, 2.0 * p.r), Contact::TouchingApproaching);
    }

    #[test]
    fn test_touching_approaching_detected() {
        let p = BallParams::default().frictionless();
        let a = moving(1, 0.0, 0.0, 1.0, 0.0, p);
        let b = Ball::at_rest(2, 2.0 * p.r, 0.0, p);
        let coeffs = ball_ball_coeffs(&a, &b);
        assert_eq!(classify_contact(&coeffs, 2.0 * p.r), Contact::TouchingApproaching);
    }

    #[test]
    fn test_linear_cushion_hit() {
        let p = BallParams::default().frictionless();
        let cushion = LinearCushion::new(0, DVec3::new(0.0, 0.0, 0.04), DVec3::new(2.0, 0.0, 0.04), CushionDirection::Side1);
        let ball = moving(1, 1.0, 0.5, 0.0, -1.0, p);
        let t = ball_linear_cushion_time(&ball, &cushion);
        assert!((t - (0.5 - p.r)).abs() < 1e-12);
        // Moving away never hits
        let away = moving(1, 1.0, 0.5, 0.0, 1.0, p);
        assert_eq!(ball_linear_cushion_time(&away, &cushion), f64::INFINITY);
        // Past the end of the segment never hits
        let past = moving(1, 3.0, 0.5, 0.0, -1.0, p);
        assert_eq!(ball_linear_cushion_time(&past, &cushion), f64::INFINITY);
    }

    #[test]
    fn test_linear_cushion_side2_only() {
        let p = BallParams::default().frictionless();
        let cushion = LinearCushion::new(0, DVec3::new(0.0, 0.0, 0.04), DVec3::new(2.0, 0.0, 0.04), CushionDirection::Side2);
        let above = moving(1, 1.0, 0.5, 0.0, -1.0, p);
        assert_eq!(ball_linear_cushion_time(&above, &cushion), f64::INFINITY);
        let below = moving(1, 1.0, -0.5, 0.0, 1.0, p);
        assert!((ball_linear_cushion_time(&below, &cushion) - (0.5 - p.r)).abs() < 1e-12);
    }

    #[test]
    fn test_pocket_capture_time() {
        let p = BallParams::default().frictionless();
        let pocket = Pocket::new(0, DVec3::new(1.0, 0.0, 0.0), 0.06);
        let ball = moving(1, 0.0, 0.0, 1.0, 0.0, p);
        let coeffs = ball_pocket_coeffs(&ball, &pocket);
        let t = solve_quartic(Quartic::new(coeffs), QuarticSolver::Hybrid);
        assert!((t - (1.0 - (0.06 - p.r))).abs() < 1e-12);
    }

    #[test]
    fn test_circular_cushion_time() {
        let p = BallParams::default().frictionless();
        let cushion = CircularCushion::new(0, DVec3::new(1.0, 0.0, 0.04), 0.01);
        let ball = moving(1, 0.0, 0.0, 1.0, 0.0, p);
        let t = solve_quartic(Quartic::new(ball_circular_cushion_coeffs(&ball, &cushion)), QuarticSolver::Hybrid);
        assert!((t - (1.0 - 0.01 - p.r)).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_away_prune() {
        let p = BallParams::default();
        let mut mover = moving(1, 0.0, 0.0, -1.0, 0.0, p);
        mover.state.phase = MotionPhase::Rolling;
        let rest = Ball::at_rest(2, 0.5, 0.0, p);
        assert!(rolling_away_from(&mover, &rest));
        mover.state.vel = DVec3::new(1.0, 0.0, 0.0);
        assert!(!rolling_away_from(&mover, &rest));
    }

    #[test]
    fn test_sliding_curve_collision_matches_positions() {
        let p = BallParams::default();
        let mut a = moving(1, 0.2, 0.2, 1.5, 0.2, p);
        a.state.spin = DVec3::new(10.0, -30.0, 0.0);
        let b = Ball::at_rest(2, 0.6, 0.25, p);
        let t = solve_quartic(Quartic::new(ball_ball_coeffs(&a, &b)), QuarticSolver::Hybrid);
        assert!(t.is_finite());
        let dist = (position_at(&a, t) - b.state.pos).truncate().length();
        assert!((dist - 2.0 * p.r).abs() < 1e-9);
    }
}
