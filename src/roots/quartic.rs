//! Analytic quartic solver
//!
//! Factors the monic quartic into two quadratics through an LDLᵀ decomposition,
//! refines the quadratic coefficients with Newton-Raphson, and rescales when
//! intermediate values overflow.
//!
//! Reference: A. G. Orellana and C. De Michele, "Algorithm 1010: Boosting
//! Efficiency in Solving Quartic Equations with No Compromise in Accuracy",
//! ACM Trans. Math. Softw. 46(2), 2020. doi:10.1145/3386241

use std::f64::consts::PI;

use nalgebra::Complex;

use super::{SolveFailure, relative_residual};

const CUBIC_RESCAL_FACT: f64 = 3.488062113727083e102;
const QUART_RESCAL_FACT: f64 = 7.156344627944542e76;
const MACHEPS: f64 = 2.2204460492503131e-16;

/// Relative backward error above which a root is not trusted
pub const MAX_RELATIVE_RESIDUAL: f64 = 1e-6;

type C64 = Complex<f64>;

/// Solve `a t⁴ + b t³ + c t² + d t + e = 0`.
///
/// Fails instead of returning garbage: the caller is expected to fall back to a
/// different backend on `Err`.
pub fn solve(coeffs: [f64; 5]) -> Result<[C64; 4], SolveFailure> {
    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(SolveFailure::NonFinite);
    }
    if coeffs[0] == 0.0 {
        return Err(SolveFailure::DegenerateLeading);
    }

    let roots = roots_1010(coeffs);
    if roots.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(SolveFailure::NonFinite);
    }
    for z in &roots {
        if relative_residual(&coeffs, *z) > MAX_RELATIVE_RESIDUAL {
            return Err(SolveFailure::ImplausibleResidual);
        }
    }
    Ok(roots)
}

/// Raw LDLᵀ factorisation solve. No plausibility checks.
pub fn roots_1010(coeff: [f64; 5]) -> [C64; 4] {
    let zero = C64::new(0.0, 0.0);
    let mut roots = [zero; 4];
    if coeff[0] == 0.0 {
        return roots;
    }

    let mut a = coeff[1] / coeff[0];
    let mut b = coeff[2] / coeff[0];
    let mut c = coeff[3] / coeff[0];
    let mut d = coeff[4] / coeff[0];
    let mut phi0 = calc_phi0(a, b, c, d, false);

    let mut rfact = 1.0;
    if !phi0.is_finite() {
        rfact = QUART_RESCAL_FACT;
        let rfactsq = rfact * rfact;
        a /= rfact;
        b /= rfactsq;
        c /= rfactsq * rfact;
        d /= rfactsq * rfactsq;
        phi0 = calc_phi0(a, b, c, d, true);
    }

    let l1 = a / 2.0;
    let l3 = b / 6.0 + phi0 / 2.0;
    let del2 = c - a * l3;
    let bl311 = 2.0 * b / 3.0 - phi0 - l1 * l1;
    let dml3l3 = d - l3 * l3;

    // Candidate (d2, l2) pairs, best one picked by LDLᵀ error
    let mut cands = [(0.0, 0.0, 0.0); 3];
    let mut nsol = 0;
    if bl311 != 0.0 {
        let l2 = del2 / (2.0 * bl311);
        cands[nsol] = (bl311, l2, err_ldlt(b, c, d, bl311, l1, l2, l3));
        nsol += 1;
    }
    if del2 != 0.0 {
        let l2 = 2.0 * dml3l3 / del2;
        if l2 != 0.0 {
            let d2 = del2 / (2.0 * l2);
            cands[nsol] = (d2, l2, err_ldlt(b, c, d, d2, l1, l2, l3));
            nsol += 1;
        }
        cands[nsol] = (bl311, l2, err_ldlt(b, c, d, bl311, l1, l2, l3));
        nsol += 1;
    }

    let (d2, l2) = if nsol == 0 {
        (0.0, 0.0)
    } else {
        let mut kmin = 0;
        for k in 1..nsol {
            if cands[k].2 < cands[kmin].2 {
                kmin = k;
            }
        }
        (cands[kmin].0, cands[kmin].1)
    };

    // realcase: 1 = real factors, 0 = complex factors, -1 = undecided
    let mut realcase = [-1i8, -1i8];
    let mut whichcase = 0;
    let (mut aq, mut bq, mut cq, mut dq) = (0.0, 0.0, 0.0, 0.0);
    let (mut acx, mut bcx, mut ccx, mut dcx) = (zero, zero, zero, zero);

    if d2 < 0.0 {
        let gamma = (-d2).sqrt();
        aq = l1 + gamma;
        bq = l3 + gamma * l2;
        cq = l1 - gamma;
        dq = l3 - gamma * l2;
        if dq.abs() < bq.abs() {
            dq = d / bq;
        } else if dq.abs() > bq.abs() {
            bq = d / dq;
        }
        if aq.abs() < cq.abs() {
            let mut best: Option<(f64, f64)> = None;
            let mut consider = |v: f64| {
                let err = err_abc(a, b, c, v, bq, cq, dq);
                if best.is_none_or(|(_, e)| err < e) {
                    best = Some((v, err));
                }
            };
            if dq != 0.0 {
                consider((c - bq * cq) / dq);
            }
            if cq != 0.0 {
                consider((b - dq - bq) / cq);
            }
            consider(a - cq);
            if let Some((v, _)) = best {
                aq = v;
            }
        } else {
            let mut best: Option<(f64, f64)> = None;
            let mut consider = |v: f64| {
                let err = err_abc(a, b, c, aq, bq, v, dq);
                if best.is_none_or(|(_, e)| err < e) {
                    best = Some((v, err));
                }
            };
            if bq != 0.0 {
                consider((c - aq * dq) / bq);
            }
            if aq != 0.0 {
                consider((b - bq - dq) / aq);
            }
            consider(a - aq);
            if let Some((v, _)) = best {
                cq = v;
            }
        }
        realcase[0] = 1;
    } else if d2 > 0.0 {
        let gamma = d2.sqrt();
        acx = C64::new(l1, gamma);
        bcx = C64::new(l3, gamma * l2);
        ccx = acx.conj();
        dcx = bcx.conj();
        realcase[0] = 0;
    }

    let d2_small = d2.abs() <= MACHEPS * (2.0 * b / 3.0).abs().max(phi0.abs()).max(l1 * l1);
    if realcase[0] == -1 || d2_small {
        let d3 = d - l3 * l3;
        let err0 = match realcase[0] {
            1 => err_abcd(a, b, c, d, aq, bq, cq, dq),
            0 => err_abcd_cmplx(a, b, c, d, acx, bcx, ccx, dcx),
            _ => 0.0,
        };
        let (err1, real1, cx1) = if d3 <= 0.0 {
            realcase[1] = 1;
            let mut bq1 = l3 + (-d3).sqrt();
            let mut dq1 = l3 - (-d3).sqrt();
            if dq1.abs() < bq1.abs() {
                dq1 = d / bq1;
            } else if dq1.abs() > bq1.abs() {
                bq1 = d / dq1;
            }
            let err = err_abcd(a, b, c, d, l1, bq1, l1, dq1);
            (err, (l1, bq1, l1, dq1), (zero, zero, zero, zero))
        } else {
            realcase[1] = 0;
            let acx1 = C64::new(l1, 0.0);
            let bcx1 = C64::new(l3, d3.sqrt());
            let cx = (acx1, bcx1, acx1, bcx1.conj());
            let err = err_abcd_cmplx(a, b, c, d, cx.0, cx.1, cx.2, cx.3);
            (err, (0.0, 0.0, 0.0, 0.0), cx)
        };
        if realcase[0] == -1 || err1 < err0 {
            whichcase = 1;
            if realcase[1] == 1 {
                (aq, bq, cq, dq) = real1;
            } else {
                (acx, bcx, ccx, dcx) = cx1;
            }
        }
    }

    if realcase[whichcase] == 1 {
        let (aq, bq, cq, dq) = newton_abcd(a, b, c, d, aq, bq, cq, dq);
        let [r0, r1] = solve_monic_quadratic(aq, bq);
        let [r2, r3] = solve_monic_quadratic(cq, dq);
        roots = [r0, r1, r2, r3];
    } else if whichcase == 0 {
        let cdiskr = (acx * acx / 4.0 - bcx).sqrt();
        let zx1 = -acx / 2.0 + cdiskr;
        let zx2 = -acx / 2.0 - cdiskr;
        let zxmax = if zx1.norm() > zx2.norm() { zx1 } else { zx2 };
        let zxmin = bcx / zxmax;
        roots = [zxmin, zxmin.conj(), zxmax, zxmax.conj()];
    } else {
        let [r0, r1] = complex_factor_roots(acx, bcx);
        let [r2, r3] = complex_factor_roots(ccx, dcx);
        roots = [r0, r1, r2, r3];
    }

    if rfact != 1.0 {
        for z in roots.iter_mut() {
            *z *= rfact;
        }
    }
    roots
}

/// Roots of `z² + p z + q` with complex coefficients, larger root first
fn complex_factor_roots(p: C64, q: C64) -> [C64; 2] {
    let cdiskr = (p * p - 4.0 * q).sqrt();
    let zx1 = -0.5 * (p + cdiskr);
    let zx2 = -0.5 * (p - cdiskr);
    let zxmax = if zx1.norm() > zx2.norm() { zx1 } else { zx2 };
    [zxmax, q / zxmax]
}

/// Roots of `z² + a z + b`, computed without cancellation
fn solve_monic_quadratic(a: f64, b: f64) -> [C64; 2] {
    let diskr = a * a - 4.0 * b;
    if diskr >= 0.0 {
        let div = if a >= 0.0 { -a - diskr.sqrt() } else { -a + diskr.sqrt() };
        let zmax = div / 2.0;
        let zmin = if zmax == 0.0 { 0.0 } else { b / zmax };
        [C64::new(zmax, 0.0), C64::new(zmin, 0.0)]
    } else {
        let sqrtd = (-diskr).sqrt();
        [C64::new(-a / 2.0, sqrtd / 2.0), C64::new(-a / 2.0, -sqrtd / 2.0)]
    }
}

/// Largest real root of the depressed cubic `x³ + b x + c`, overflow-safe variant
fn solve_cubic_depressed_handle_inf(b: f64, c: f64) -> f64 {
    let q = -b / 3.0;
    let r = 0.5 * c;
    if r == 0.0 {
        return if b <= 0.0 { (-b).sqrt() } else { 0.0 };
    }

    let kk = if q.abs() < r.abs() {
        let qr = q / r;
        1.0 - q * qr * qr
    } else {
        let rq = r / q;
        q.signum() * (rq * rq / q - 1.0)
    };

    if kk < 0.0 {
        let sqrt_q = q.sqrt();
        let theta = ((r / q.abs()) / sqrt_q).acos();
        if theta < PI / 2.0 {
            -2.0 * sqrt_q * (theta / 3.0).cos()
        } else {
            -2.0 * sqrt_q * ((theta + 2.0 * PI) / 3.0).cos()
        }
    } else {
        let big_a = if q.abs() < r.abs() {
            -r.signum() * (r.abs() * (1.0 + kk.sqrt())).powf(1.0 / 3.0)
        } else {
            -r.signum() * (r.abs() + q.abs().sqrt() * q.abs() * kk.sqrt()).powf(1.0 / 3.0)
        };
        let big_b = if big_a == 0.0 { 0.0 } else { q / big_a };
        big_a + big_b
    }
}

/// Largest real root of the depressed cubic `x³ + b x + c`
fn solve_cubic_depressed(b: f64, c: f64) -> f64 {
    let q = -b / 3.0;
    let r = 0.5 * c;
    if q.abs() > 1e102 || r.abs() > 1e154 {
        return solve_cubic_depressed_handle_inf(b, c);
    }
    let q3 = q * q * q;
    let r2 = r * r;
    if r2 < q3 {
        let theta = (r / q3.sqrt()).acos();
        let sqrt_q = -2.0 * q.sqrt();
        if theta < PI / 2.0 {
            sqrt_q * (theta / 3.0).cos()
        } else {
            sqrt_q * ((theta + 2.0 * PI) / 3.0).cos()
        }
    } else {
        let big_a = -r.signum() * (r.abs() + (r2 - q3).sqrt()).powf(1.0 / 3.0);
        let big_b = if big_a == 0.0 { 0.0 } else { q / big_a };
        big_a + big_b
    }
}

/// Root of the resolvent cubic used to seed the LDLᵀ factorisation
fn calc_phi0(a: f64, b: f64, c: f64, d: f64, scaled: bool) -> f64 {
    let diskr = 9.0 * a * a - 24.0 * b;
    let s = if diskr > 0.0 {
        let diskr = diskr.sqrt();
        if a > 0.0 {
            -2.0 * b / (3.0 * a + diskr)
        } else {
            -2.0 * b / (3.0 * a - diskr)
        }
    } else {
        -a / 4.0
    };

    let aq = a + 4.0 * s;
    let bq = b + 3.0 * s * (a + 2.0 * s);
    let cq = c + s * (2.0 * b + s * (3.0 * a + 4.0 * s));
    let dq = d + s * (c + s * (b + s * (a + s)));
    let gg = bq * bq / 9.0;
    let hh = aq * cq;

    let mut g = hh - 4.0 * dq - 3.0 * gg;
    let mut h = (8.0 * dq + hh - 2.0 * gg) * bq / 3.0 - cq * cq - dq * aq * aq;
    let mut rmax = solve_cubic_depressed(g, h);
    if !rmax.is_finite() {
        rmax = solve_cubic_depressed_handle_inf(g, h);
        if !rmax.is_finite() && scaled {
            let rfact = CUBIC_RESCAL_FACT;
            let dqss = dq / (rfact * rfact);
            let aqs = aq / rfact;
            let bqs = bq / rfact;
            let cqs = cq / rfact;
            let ggss = bqs * bqs / 9.0;
            let hhss = aqs * cqs;
            g = hhss - 4.0 * dqss - 3.0 * ggss;
            h = (8.0 * dqss + hhss - 2.0 * ggss) * bqs / 3.0
                - cqs * (cqs / rfact)
                - (dq / rfact) * aqs * aqs;
            rmax = solve_cubic_depressed(g, h);
            if !rmax.is_finite() {
                rmax = solve_cubic_depressed_handle_inf(g, h);
            }
            rmax *= rfact;
        }
    }

    // Newton polish of the resolvent root
    let mut x = rmax;
    let mut xsq = x * x;
    let mut f = x * (xsq + g) + h;
    let maxtt = (x * xsq).abs().max((g * x).abs()).max(h.abs());
    if f.abs() > MACHEPS * maxtt {
        for _ in 0..8 {
            let df = 3.0 * xsq + g;
            if df == 0.0 {
                break;
            }
            let xold = x;
            x -= f / df;
            let fold = f;
            xsq = x * x;
            f = x * (xsq + g) + h;
            if f == 0.0 {
                break;
            }
            if f.abs() >= fold.abs() {
                x = xold;
                break;
            }
        }
    }
    x
}

#[inline]
fn rel_err(value: f64, target: f64) -> f64 {
    if target == 0.0 {
        value.abs()
    } else {
        ((value - target) / target).abs()
    }
}

#[inline]
fn rel_err_c(value: C64, target: f64) -> f64 {
    if target == 0.0 {
        value.norm()
    } else {
        ((value - target) / target).norm()
    }
}

fn err_ldlt(b: f64, c: f64, d: f64, d2: f64, l1: f64, l2: f64, l3: f64) -> f64 {
    rel_err(d2 + l1 * l1 + 2.0 * l3, b)
        + rel_err(2.0 * d2 * l2 + 2.0 * l1 * l3, c)
        + rel_err(d2 * l2 * l2 + l3 * l3, d)
}

#[allow(clippy::too_many_arguments)]
fn err_abcd(a: f64, b: f64, c: f64, d: f64, aq: f64, bq: f64, cq: f64, dq: f64) -> f64 {
    rel_err(bq * dq, d)
        + rel_err(bq * cq + aq * dq, c)
        + rel_err(bq + aq * cq + dq, b)
        + rel_err(aq + cq, a)
}

#[allow(clippy::too_many_arguments)]
fn err_abcd_cmplx(a: f64, b: f64, c: f64, d: f64, aq: C64, bq: C64, cq: C64, dq: C64) -> f64 {
    rel_err_c(bq * dq, d)
        + rel_err_c(bq * cq + aq * dq, c)
        + rel_err_c(bq + aq * cq + dq, b)
        + rel_err_c(aq + cq, a)
}

fn err_abc(a: f64, b: f64, c: f64, aq: f64, bq: f64, cq: f64, dq: f64) -> f64 {
    rel_err(bq * cq + aq * dq, c) + rel_err(bq + aq * cq + dq, b) + rel_err(aq + cq, a)
}

/// Newton-Raphson refinement of the factor coefficients `(z² + aq z + bq)(z² + cq z + dq)`
#[allow(clippy::too_many_arguments)]
fn newton_abcd(a: f64, b: f64, c: f64, d: f64, aq: f64, bq: f64, cq: f64, dq: f64) -> (f64, f64, f64, f64) {
    let vr = [d, c, b, a];
    let residuals = |x: &[f64; 4]| {
        [
            x[1] * x[3] - d,
            x[1] * x[2] + x[0] * x[3] - c,
            x[1] + x[0] * x[2] + x[3] - b,
            x[0] + x[2] - a,
        ]
    };
    let total_err = |f: &[f64; 4]| {
        f.iter()
            .zip(vr.iter())
            .map(|(fk, vk)| if *vk == 0.0 { fk.abs() } else { (fk / vk).abs() })
            .sum::<f64>()
    };

    let mut x = [aq, bq, cq, dq];
    let mut fvec = residuals(&x);
    let mut errf = total_err(&fvec);

    for _ in 0..8 {
        let x02 = x[0] - x[2];
        let det = x[1] * x[1] + x[1] * (-x[2] * x02 - 2.0 * x[3]) + x[3] * (x[0] * x02 + x[3]);
        if det == 0.0 {
            break;
        }
        let mut jinv = [[0.0; 4]; 4];
        jinv[0][0] = x02;
        jinv[0][1] = x[3] - x[1];
        jinv[0][2] = x[1] * x[2] - x[0] * x[3];
        jinv[0][3] = -x[1] * jinv[0][1] - x[0] * jinv[0][2];
        jinv[1][0] = x[0] * jinv[0][0] + jinv[0][1];
        jinv[1][1] = -x[1] * jinv[0][0];
        jinv[1][2] = -x[1] * jinv[0][1];
        jinv[1][3] = -x[1] * jinv[0][2];
        jinv[2][0] = -jinv[0][0];
        jinv[2][1] = -jinv[0][1];
        jinv[2][2] = -jinv[0][2];
        jinv[2][3] = jinv[0][2] * x[2] + jinv[0][1] * x[3];
        jinv[3][0] = -x[2] * jinv[0][0] - jinv[0][1];
        jinv[3][1] = jinv[0][0] * x[3];
        jinv[3][2] = x[3] * jinv[0][1];
        jinv[3][3] = x[3] * jinv[0][2];

        let xold = x;
        for k1 in 0..4 {
            let dx: f64 = (0..4).map(|k2| jinv[k1][k2] * fvec[k2]).sum();
            x[k1] -= dx / det;
        }
        fvec = residuals(&x);
        let errfold = errf;
        errf = total_err(&fvec);
        if errf == 0.0 {
            break;
        }
        if errf >= errfold {
            x = xold;
            break;
        }
    }
    (x[0], x[1], x[2], x[3])
}
