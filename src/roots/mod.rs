//! Exact-time polynomial root solving
//!
//! Every event time in the simulation is the smallest non-negative real root of a
//! polynomial of degree at most four. Two backends are available:
//! - `quartic`: analytic factorisation, fast and accurate for almost all inputs
//! - `companion`: companion-matrix eigenvalues, slower but robust
//!
//! The hybrid policy runs the analytic backend over a whole batch, then re-solves
//! only the entries it rejected with the numeric backend.

pub mod companion;
pub mod quadratic;
pub mod quartic;

pub use nalgebra::Complex;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{EPS, PARALLEL_BATCH_MIN};

/// Above this magnitude a root's imaginary part is judged in absolute terms
pub const ABS_OR_REL_CUTOFF: f64 = 1e-3;
/// Absolute imaginary tolerance for large roots
pub const ATOL: f64 = 1e-9;
/// Relative imaginary tolerance for small roots
pub const RTOL: f64 = 1e-3;
/// Relative residual at which a near-real pair counts as a (double) real root
pub const GRAZE_RESIDUAL: f64 = 1e-12;

/// Root-finding policy for quartic event equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QuarticSolver {
    /// Analytic first, companion matrix for anything the analytic pass rejects
    #[default]
    Hybrid,
    /// Analytic only; rejected entries yield no event
    Analytic,
    /// Companion matrix only
    Numeric,
}

impl QuarticSolver {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuarticSolver::Hybrid => "hybrid",
            QuarticSolver::Analytic => "analytic",
            QuarticSolver::Numeric => "numeric",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hybrid" => Some(QuarticSolver::Hybrid),
            "analytic" | "1010" => Some(QuarticSolver::Analytic),
            "numeric" | "companion" => Some(QuarticSolver::Numeric),
            _ => None,
        }
    }
}

/// Why a solve attempt was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveFailure {
    /// Inputs or outputs contained NaN or infinity
    NonFinite,
    /// Leading coefficient was zero for a backend that needs the full degree
    DegenerateLeading,
    /// A returned root does not satisfy the polynomial
    ImplausibleResidual,
    /// Eigenvalue iteration did not converge
    NoConvergence,
}

/// One polynomial to solve, `coeffs[0] t⁴ + ... + coeffs[4]`.
///
/// Roots at or below `floor` are rejected when `floor > 0`; a zero floor admits
/// `t = 0` itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartic {
    pub coeffs: [f64; 5],
    pub floor: f64,
}

impl Quartic {
    pub fn new(coeffs: [f64; 5]) -> Self {
        Self { coeffs, floor: 0.0 }
    }

    /// Reject roots at or below `floor`
    pub fn above(mut self, floor: f64) -> Self {
        self.floor = floor;
        self
    }

    /// Degree after dropping exact leading zeros (0 for a constant)
    pub fn degree(&self) -> usize {
        match self.coeffs.iter().position(|c| *c != 0.0) {
            Some(i) => 4 - i,
            None => 0,
        }
    }

    fn accepts(&self, t: f64) -> bool {
        if self.floor > 0.0 { t > self.floor } else { t >= 0.0 }
    }
}

/// Evaluate a real polynomial (highest degree first) at a complex point
pub fn eval_poly(coeffs: &[f64], z: Complex<f64>) -> Complex<f64> {
    coeffs.iter().fold(Complex::new(0.0, 0.0), |acc, c| acc * z + *c)
}

/// Relative backward error `|p(z)| / Σ|cᵢ||z|ⁱ`
pub fn relative_residual(coeffs: &[f64], z: Complex<f64>) -> f64 {
    let r = z.norm();
    let scale = coeffs.iter().fold(0.0, |acc, c| acc * r + c.abs());
    if scale == 0.0 {
        return 0.0;
    }
    eval_poly(coeffs, z).norm() / scale
}

/// Whether a computed root counts as real
pub fn is_real(z: Complex<f64>) -> bool {
    let re = z.re.abs();
    let im = z.im.abs();
    if re > ABS_OR_REL_CUTOFF {
        im < ATOL
    } else if re > 0.0 {
        im / re < RTOL
    } else {
        im == 0.0
    }
}

/// Smallest acceptable real root of `q` among `roots`, Newton-polished.
///
/// A double root usually comes back as a pair with a small imaginary part. Such a
/// pair still counts when the polynomial vanishes at its real part.
pub fn smallest_root(q: &Quartic, roots: &[Complex<f64>]) -> f64 {
    let mut best = f64::INFINITY;
    for z in roots {
        let mut re = z.re;
        if re < 0.0 && re > -EPS {
            re = 0.0;
        }
        if !q.accepts(re) {
            continue;
        }
        if !is_real(Complex::new(re, z.im)) && relative_residual(&q.coeffs, Complex::new(re, 0.0)) > GRAZE_RESIDUAL {
            continue;
        }
        if re < best {
            best = re;
        }
    }
    if best.is_finite() { polish(q, best) } else { best }
}

/// Guarded Newton steps on the real polynomial; only improving steps are kept
fn polish(q: &Quartic, t0: f64) -> f64 {
    let c = &q.coeffs;
    let p = |t: f64| c.iter().fold(0.0, |acc, k| acc * t + k);
    let dp = |t: f64| 4.0 * c[0] * t.powi(3) + 3.0 * c[1] * t * t + 2.0 * c[2] * t + c[3];

    let mut t = t0;
    let mut f = p(t);
    for _ in 0..4 {
        if f == 0.0 {
            break;
        }
        let df = dp(t);
        if df == 0.0 || !df.is_finite() {
            break;
        }
        let next = t - f / df;
        let fnext = p(next);
        if !next.is_finite() || fnext.abs() >= f.abs() || !q.accepts(next) {
            break;
        }
        t = next;
        f = fnext;
    }
    t
}

/// Roots from the cheapest backend that applies to the entry's degree
fn first_attempt(q: &Quartic, solver: QuarticSolver) -> Result<Vec<Complex<f64>>, SolveFailure> {
    let c = q.coeffs;
    if c.iter().any(|k| !k.is_finite()) {
        return Err(SolveFailure::NonFinite);
    }
    match q.degree() {
        0 => Ok(Vec::new()),
        1 => Ok(vec![Complex::new(-c[4] / c[3], 0.0)]),
        2 => Ok(quadratic::complex_roots(c[2], c[3], c[4]).to_vec()),
        3 => companion::roots(&c),
        _ => match solver {
            QuarticSolver::Hybrid | QuarticSolver::Analytic => quartic::solve(c).map(|r| r.to_vec()),
            QuarticSolver::Numeric => companion::roots(&c),
        },
    }
}

fn map_batch<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    // Use parallel processing for large batches
    if items.len() >= PARALLEL_BATCH_MIN {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

/// Smallest acceptable root for every entry, `f64::INFINITY` where none exists.
///
/// Results are written by index, so the output does not depend on scheduling.
pub fn solve_quartics(batch: &[Quartic], solver: QuarticSolver) -> Vec<f64> {
    let attempts = map_batch(batch, |q| first_attempt(q, solver));

    let retry: Vec<usize> = attempts
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_err())
        .map(|(i, _)| i)
        .collect();

    let mut fallback: Vec<Option<Vec<Complex<f64>>>> = vec![None; batch.len()];
    if !retry.is_empty() && solver == QuarticSolver::Hybrid {
        log::debug!("Analytic pass rejected {}/{} quartics, retrying numerically", retry.len(), batch.len());
        let solved = map_batch(&retry, |&i| companion::roots(&batch[i].coeffs));
        for (i, res) in retry.iter().zip(solved) {
            match res {
                Ok(roots) => fallback[*i] = Some(roots),
                Err(e) => log::warn!("Both root backends failed for {:?}: {:?}", batch[*i].coeffs, e),
            }
        }
    }

    batch
        .iter()
        .zip(attempts)
        .zip(fallback)
        .map(|((q, attempt), fb)| match (attempt, fb) {
            (Ok(roots), _) => smallest_root(q, &roots),
            (Err(_), Some(roots)) => smallest_root(q, &roots),
            (Err(_), None) => f64::INFINITY,
        })
        .collect()
}

/// Single-entry convenience over [`solve_quartics`]
pub fn solve_quartic(q: Quartic, solver: QuarticSolver) -> f64 {
    solve_quartics(std::slice::from_ref(&q), solver)[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn from_roots(r: [f64; 4]) -> [f64; 5] {
        let b = -(r[0] + r[1] + r[2] + r[3]);
        let c = r[0] * r[1] + r[0] * r[2] + r[0] * r[3] + r[1] * r[2] + r[1] * r[3] + r[2] * r[3];
        let d = -(r[0] * r[1] * r[2] + r[0] * r[1] * r[3] + r[0] * r[2] * r[3] + r[1] * r[2] * r[3]);
        let e = r[0] * r[1] * r[2] * r[3];
        [1.0, b, c, d, e]
    }

    #[test]
    fn test_smallest_non_negative_root() {
        let q = Quartic::new(from_roots([-1.0, 0.5, 2.0, 3.0]));
        for solver in [QuarticSolver::Hybrid, QuarticSolver::Analytic, QuarticSolver::Numeric] {
            let t = solve_quartic(q, solver);
            assert!((t - 0.5).abs() < 1e-9, "{solver:?} gave {t}");
        }
    }

    #[test]
    fn test_no_real_root_is_infinite() {
        // (t² + 1)(t² + 4)
        let q = Quartic::new([1.0, 0.0, 5.0, 0.0, 4.0]);
        assert_eq!(solve_quartic(q, QuarticSolver::Hybrid), f64::INFINITY);
    }

    #[test]
    fn test_degree_reduction() {
        // 2t - 1 = 0
        assert!((solve_quartic(Quartic::new([0.0, 0.0, 0.0, 2.0, -1.0]), QuarticSolver::Hybrid) - 0.5).abs() < 1e-12);
        // t² - 3t + 2
        assert!((solve_quartic(Quartic::new([0.0, 0.0, 1.0, -3.0, 2.0]), QuarticSolver::Hybrid) - 1.0).abs() < 1e-12);
        // cubic (t - 0.25)(t - 1)(t + 1)
        let c = Quartic::new([0.0, 1.0, -0.25, -1.0, 0.25]);
        assert!((solve_quartic(c, QuarticSolver::Hybrid) - 0.25).abs() < 1e-9);
        // constant
        assert_eq!(solve_quartic(Quartic::new([0.0, 0.0, 0.0, 0.0, 1.0]), QuarticSolver::Hybrid), f64::INFINITY);
    }

    #[test]
    fn test_floor_excludes_touching_root() {
        // t(t - 1)(t - 2)(t - 3): root at 0 is excluded by a positive floor
        let coeffs = from_roots([0.0, 1.0, 2.0, 3.0]);
        assert!(solve_quartic(Quartic::new(coeffs), QuarticSolver::Hybrid).abs() < 1e-12);
        let t = solve_quartic(Quartic::new(coeffs).above(1e-9), QuarticSolver::Hybrid);
        assert!((t - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tiny_negative_root_clamped() {
        let q = Quartic::new(from_roots([-1e-16, 1.0, 2.0, 3.0]));
        let t = solve_quartic(q, QuarticSolver::Hybrid);
        assert!(t.abs() < 1e-12);
    }

    #[test]
    fn test_is_real_thresholds() {
        assert!(is_real(Complex::new(5.0, 1e-10)));
        assert!(!is_real(Complex::new(5.0, 1e-8)));
        assert!(is_real(Complex::new(1e-4, 1e-8)));
        assert!(!is_real(Complex::new(1e-4, 1e-6)));
        assert!(is_real(Complex::new(0.0, 0.0)));
    }

    #[test]
    fn test_batch_matches_single() {
        let batch: Vec<Quartic> = (0..100)
            .map(|i| Quartic::new(from_roots([-2.0, 0.1 + i as f64 * 0.01, 5.0, 7.0])))
            .collect();
        let out = solve_quartics(&batch, QuarticSolver::Hybrid);
        for (i, t) in out.iter().enumerate() {
            assert!((t - (0.1 + i as f64 * 0.01)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_close_roots() {
        let q = Quartic::new(from_roots([1.0, 1.001, 4.0, 5.0]));
        let t = solve_quartic(q, QuarticSolver::Hybrid);
        assert!((t - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_double_root_is_found() {
        // (t - 1)²(t - 2)(t - 3)
        let q = Quartic::new(from_roots([1.0, 1.0, 2.0, 3.0]));
        for solver in [QuarticSolver::Hybrid, QuarticSolver::Analytic, QuarticSolver::Numeric] {
            let t = solve_quartic(q, solver);
            assert!((t - 1.0).abs() < 1e-6, "{solver:?} gave {t}");
        }
        let q = Quartic::new(from_roots([-0.5, 0.25, 0.25, 4.0]));
        assert!((solve_quartic(q, QuarticSolver::Hybrid) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_perturbed_triple_root() {
        // (t - 1)³(t - 4) nudged so only one of the three stays real
        let mut coeffs = from_roots([1.0, 1.0, 1.0, 4.0]);
        coeffs[4] -= 1e-12;
        for solver in [QuarticSolver::Hybrid, QuarticSolver::Numeric] {
            let t = solve_quartic(Quartic::new(coeffs), solver);
            assert!((t - 1.0).abs() < 1e-3, "{solver:?} gave {t}");
        }
    }

    #[test]
    fn test_complex_pair_is_not_a_root() {
        // (t² - 2t + 1.01)(t - 3)(t + 1): the pair at 1 ± 0.1i is skipped
        let q = Quartic::new(from_pairs([-1.0, 3.0], 1.0, 0.1));
        assert!((solve_quartic(q, QuarticSolver::Hybrid) - 3.0).abs() < 1e-9);
    }

    /// `(t - r0)(t - r1)(t - (u + iv))(t - (u - iv))`
    fn from_pairs(real: [f64; 2], u: f64, v: f64) -> [f64; 5] {
        let (s, p) = (real[0] + real[1], real[0] * real[1]);
        let (b2, c2) = (-2.0 * u, u * u + v * v);
        [1.0, b2 - s, c2 - s * b2 + p, -s * c2 + p * b2, p * c2]
    }

    proptest! {
        #[test]
        fn prop_known_roots_recovered(
            r0 in 0.05f64..10.0,
            gap1 in 0.1f64..5.0,
            gap2 in 0.1f64..5.0,
            neg in -10.0f64..-0.05,
        ) {
            let roots = [neg, r0, r0 + gap1, r0 + gap1 + gap2];
            let t = solve_quartic(Quartic::new(from_roots(roots)), QuarticSolver::Hybrid);
            prop_assert!((t - r0).abs() < 1e-9, "got {} want {}", t, r0);
        }

        #[test]
        fn prop_complex_pair_skipped(
            r0 in 0.05f64..10.0,
            gap in 0.1f64..5.0,
            u in -5.0f64..10.0,
            v in 0.1f64..5.0,
        ) {
            let t = solve_quartic(Quartic::new(from_pairs([r0, r0 + gap], u, v)), QuarticSolver::Hybrid);
            prop_assert!((t - r0).abs() < 1e-9, "got {} want {}", t, r0);
        }

        #[test]
        fn prop_negative_roots_mean_no_event(
            n in proptest::array::uniform4(-10.0f64..-0.05),
            u in -5.0f64..10.0,
            v in 0.1f64..5.0,
        ) {
            prop_assert_eq!(solve_quartic(Quartic::new(from_roots(n)), QuarticSolver::Hybrid), f64::INFINITY);
            let mixed = from_pairs([n[0], n[1]], u, v);
            prop_assert_eq!(solve_quartic(Quartic::new(mixed), QuarticSolver::Hybrid), f64::INFINITY);
        }
    }
}
