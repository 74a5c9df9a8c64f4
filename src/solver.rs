//! One-dimensional solvers used by the density refinement and the outer
//! pressure iteration.
//!
//! Objectives return `EosResult<f64>` because every evaluation of the outer
//! objective runs a full composition iteration that can fail; plain numeric
//! functions are wrapped in `Ok`.
use crate::errors::{EosError, EosResult};
use crate::phase_equilibria::{PressureBracket, SolverOptions};
use serde::{Deserialize, Serialize};

/// Brent root finding on a bracketing interval.
pub(crate) fn brent_root<F>(
    f: &mut F,
    a: f64,
    b: f64,
    rtol: f64,
    max_iter: usize,
) -> EosResult<f64>
where
    F: FnMut(f64) -> EosResult<f64>,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a)?;
    let mut fb = f(b)?;
    if fa * fb > 0.0 {
        return Err(EosError::IterationFailed(
            "brent: interval does not bracket a root".to_owned(),
        ));
    }
    let (mut c, mut fc) = (a, fa);
    let mut d = b - a;
    let mut e = d;

    for _ in 0..max_iter {
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }
        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * rtol * b.abs();
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(b);
        }
        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // inverse quadratic interpolation, falling back to the secant
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }
        a = b;
        fa = fb;
        b += if d.abs() > tol1 {
            d
        } else {
            tol1 * xm.signum()
        };
        fb = f(b)?;
    }
    Err(EosError::NotConverged("brent".to_owned()))
}

/// Secant iteration from an initial guess, unbounded.
pub(crate) fn secant_root<F>(
    f: &mut F,
    x0: f64,
    x1: f64,
    rtol: f64,
    max_iter: usize,
) -> EosResult<f64>
where
    F: FnMut(f64) -> EosResult<f64>,
{
    let (mut x0, mut x1) = (x0, x1);
    let mut f0 = f(x0)?;
    let mut f1 = f(x1)?;
    for _ in 0..max_iter {
        if f1 == 0.0 {
            return Ok(x1);
        }
        if (f1 - f0).abs() < f64::MIN_POSITIVE {
            return Err(EosError::IterationFailed("secant".to_owned()));
        }
        let x2 = x1 - f1 * (x1 - x0) / (f1 - f0);
        if !x2.is_finite() {
            return Err(EosError::IterationFailed("secant".to_owned()));
        }
        if (x2 - x1).abs() <= rtol * x2.abs() {
            return Ok(x2);
        }
        x0 = x1;
        f0 = f1;
        x1 = x2;
        f1 = f(x1)?;
    }
    Err(EosError::NotConverged("secant".to_owned()))
}

/// Golden-section minimization on a bounded interval. Returns the abscissa
/// of the minimum; `tol` is an absolute tolerance on the interval width.
pub(crate) fn golden_minimize<F>(
    f: &mut F,
    a: f64,
    b: f64,
    tol: f64,
    max_iter: usize,
) -> EosResult<f64>
where
    F: FnMut(f64) -> EosResult<f64>,
{
    const INVPHI: f64 = 0.618_033_988_749_894_8;
    let (mut lo, mut hi) = (a, b);
    let mut x1 = hi - INVPHI * (hi - lo);
    let mut x2 = lo + INVPHI * (hi - lo);
    let mut f1 = f(x1)?;
    let mut f2 = f(x2)?;
    for _ in 0..max_iter {
        if (hi - lo).abs() <= tol {
            break;
        }
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INVPHI * (hi - lo);
            f1 = f(x1)?;
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INVPHI * (hi - lo);
            f2 = f(x2)?;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// The outer pressure solvers.
///
/// Every strategy implements the same contract: given the objective and a
/// pressure bracket with an interpolated initial guess, return the pressure
/// at which the objective vanishes (or its square is minimal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OuterSolver {
    /// Derivative-free root finding on the bracket.
    #[default]
    BracketedRoot,
    /// Secant iteration from the interpolated guess, unbounded.
    UnboundedRoot,
    /// Minimization of the squared objective on the bracket.
    BoundedMinimize,
}

impl OuterSolver {
    pub(crate) fn solve<F>(
        &self,
        f: &mut F,
        bracket: &PressureBracket,
        options: SolverOptions,
    ) -> EosResult<f64>
    where
        F: FnMut(f64) -> EosResult<f64>,
    {
        let (max_iter, tol, _) = options.unwrap_or(100, 1e-7);
        match self {
            Self::BracketedRoot => brent_root(f, bracket.lower, bracket.upper, tol, max_iter),
            Self::UnboundedRoot => {
                secant_root(f, bracket.guess, bracket.guess * 1.0001, tol, max_iter)
            }
            Self::BoundedMinimize => golden_minimize(
                &mut |p| Ok(f(p)?.powi(2)),
                bracket.lower,
                bracket.upper,
                tol * bracket.upper.abs(),
                max_iter.max(100),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn brent_finds_bracketed_root() {
        let mut f = |x: f64| Ok(x * x - 4.0);
        let root = brent_root(&mut f, 0.0, 10.0, 1e-12, 100).unwrap();
        assert_relative_eq!(root, 2.0, max_relative = 1e-10);

        let mut g = |x: f64| Ok(x * x + 1.0);
        assert!(brent_root(&mut g, 0.0, 10.0, 1e-12, 100).is_err());
    }

    #[test]
    fn secant_converges_from_a_guess() {
        let mut f = |x: f64| Ok(x.cos() - x);
        let root = secant_root(&mut f, 1.0, 1.1, 1e-12, 100).unwrap();
        assert_relative_eq!(root, 0.739_085_133_215_160_6, max_relative = 1e-9);
    }

    #[test]
    fn golden_section_finds_the_minimum() {
        let mut f = |x: f64| Ok((x - 2.0).powi(2));
        let min = golden_minimize(&mut f, 0.0, 5.0, 1e-8, 200).unwrap();
        assert_relative_eq!(min, 2.0, epsilon = 1e-6);
    }
}
