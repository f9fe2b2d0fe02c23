//! Numeric polynomial roots from companion-matrix eigenvalues

use nalgebra::{Complex, DMatrix, Schur};

use super::SolveFailure;

/// Iteration cap for the Schur decomposition
const MAX_SCHUR_ITERATIONS: usize = 1000;

/// All complex roots of `coeffs[0] xⁿ + ... + coeffs[n]`.
///
/// Leading exact zeros are stripped first, so any degree from 0 to 4 (or higher) is
/// accepted. A constant polynomial has no roots.
pub fn roots(coeffs: &[f64]) -> Result<Vec<Complex<f64>>, SolveFailure> {
    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(SolveFailure::NonFinite);
    }
    let Some(lead) = coeffs.iter().position(|c| *c != 0.0) else {
        return Ok(Vec::new());
    };
    let p = &coeffs[lead..];
    let n = p.len() - 1;
    if n == 0 {
        return Ok(Vec::new());
    }

    // Power-of-two change of variable t = s·x keeps the matrix entries near unity
    let spread = (p[n] / p[0]).abs();
    let s = if spread > 0.0 && spread.is_finite() {
        2f64.powi((spread.log2() / n as f64).round() as i32)
    } else {
        1.0
    };

    let mut m = DMatrix::<f64>::zeros(n, n);
    let mut scale = 1.0;
    for i in 1..=n {
        scale *= s;
        m[(0, i - 1)] = -p[i] / (p[0] * scale);
    }
    for i in 1..n {
        m[(i, i - 1)] = 1.0;
    }

    let schur = Schur::try_new(m, f64::EPSILON, MAX_SCHUR_ITERATIONS).ok_or(SolveFailure::NoConvergence)?;
    let eigen = schur.complex_eigenvalues();
    let out: Vec<Complex<f64>> = eigen.iter().map(|z| *z * s).collect();
    if out.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(SolveFailure::NonFinite);
    }
    Ok(out)
}
