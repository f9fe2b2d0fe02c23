//! Closed-form low-degree roots

use nalgebra::Complex;

/// Complex roots of `a t² + b t + c` for `a != 0`, computed without cancellation
pub fn complex_roots(a: f64, b: f64, c: f64) -> [Complex<f64>; 2] {
    let disc = b * b - 4.0 * a * c;
    if disc >= 0.0 {
        let q = -0.5 * (b + b.signum() * disc.sqrt());
        if q == 0.0 {
            // b == 0 and c == 0
            return [Complex::new(0.0, 0.0); 2];
        }
        [Complex::new(q / a, 0.0), Complex::new(c / q, 0.0)]
    } else {
        let re = -b / (2.0 * a);
        let im = (-disc).sqrt() / (2.0 * a);
        [Complex::new(re, im), Complex::new(re, -im)]
    }
}

/// Real roots of `a t² + b t + c`, dropping to the linear case when `a == 0`.
///
/// Returns an empty vector when there are none (or the equation is constant).
pub fn real_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    complex_roots(a, b, c)
        .into_iter()
        .filter(|z| z.im == 0.0)
        .map(|z| z.re)
        .collect()
}
