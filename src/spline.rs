//! Smoothing and piecewise-cubic interpolation of sampled curves.
//!
//! Sampled isotherms carry enough numerical noise to create spurious roots,
//! so pressure sequences are passed through a narrow Gaussian kernel before
//! the spline fit. The spline exposes analytic per-segment root extraction,
//! derivative roots and integrals, which is everything the curve layer needs.
use ndarray::Array1;

/// Gaussian smoothing with reflected boundaries.
///
/// The kernel is truncated at four standard deviations, matching the usual
/// convention for discrete Gaussian filters.
pub fn gaussian_smooth(values: &Array1<f64>, sigma: f64) -> Array1<f64> {
    let n = values.len();
    let radius = (4.0 * sigma).ceil() as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = weights.iter().sum();

    Array1::from_shape_fn(n, |i| {
        let mut acc = 0.0;
        for (w, k) in weights.iter().zip(-radius..=radius) {
            let mut idx = i as isize + k;
            if idx < 0 {
                idx = -idx - 1;
            }
            if idx >= n as isize {
                idx = 2 * n as isize - idx - 1;
            }
            acc += w * values[idx as usize];
        }
        acc / norm
    })
}

/// Natural cubic spline through strictly increasing abscissae.
#[derive(Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// second derivatives at the knots
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        let n = x.len();
        assert_eq!(n, y.len());
        assert!(n >= 2, "a spline needs at least two knots");
        let mut m = vec![0.0; n];
        if n > 2 {
            // tridiagonal system for the interior second derivatives,
            // natural boundary conditions m[0] = m[n-1] = 0
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                let h0 = x[i] - x[i - 1];
                let h1 = x[i + 1] - x[i];
                diag[i] = 2.0 * (h0 + h1);
                rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
            }
            // Thomas algorithm
            let mut c_prime = vec![0.0; n];
            for i in 1..n - 1 {
                let h0 = x[i] - x[i - 1];
                let h1 = x[i + 1] - x[i];
                let lower = if i > 1 { h0 } else { 0.0 };
                let denom = diag[i] - lower * c_prime[i - 1];
                c_prime[i] = h1 / denom;
                let prev = if i > 1 { rhs[i - 1] } else { 0.0 };
                rhs[i] = (rhs[i] - lower * prev) / denom;
            }
            for i in (1..n - 1).rev() {
                m[i] = rhs[i] - c_prime[i] * m[i + 1];
            }
        }
        Self { x, y, m }
    }

    /// The same interpolant shifted by a constant. Subtracting a constant
    /// leaves all second derivatives unchanged, so no refit is needed.
    pub fn shifted(&self, shift: f64) -> Self {
        Self {
            x: self.x.clone(),
            y: self.y.iter().map(|y| y - shift).collect(),
            m: self.m.clone(),
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Polynomial coefficients (y0, b, c, d) of segment i in the local
    /// coordinate t = x - x[i].
    fn segment(&self, i: usize) -> (f64, f64, f64, f64) {
        let h = self.x[i + 1] - self.x[i];
        let c = self.m[i] / 2.0;
        let d = (self.m[i + 1] - self.m[i]) / (6.0 * h);
        let b = (self.y[i + 1] - self.y[i]) / h - h * (2.0 * self.m[i] + self.m[i + 1]) / 6.0;
        (self.y[i], b, c, d)
    }

    fn segment_index(&self, x: f64) -> usize {
        let n = self.x.len();
        let idx = self.x.partition_point(|&knot| knot <= x);
        idx.saturating_sub(1).min(n - 2)
    }

    pub fn value(&self, x: f64) -> f64 {
        let i = self.segment_index(x);
        let (y0, b, c, d) = self.segment(i);
        let t = x - self.x[i];
        y0 + t * (b + t * (c + t * d))
    }

    /// All real roots of the interpolant, in increasing order.
    pub fn roots(&self) -> Vec<f64> {
        let mut roots = Vec::new();
        for i in 0..self.x.len() - 1 {
            let (y0, b, c, d) = self.segment(i);
            let h = self.x[i + 1] - self.x[i];
            for t in solve_cubic(d, c, b, y0) {
                let t = polish_cubic_root(d, c, b, y0, t);
                if t >= -1e-10 * h && t <= h * (1.0 + 1e-10) {
                    roots.push(self.x[i] + t.clamp(0.0, h));
                }
            }
        }
        dedup_sorted(&mut roots, self.dedup_tolerance());
        roots
    }

    /// Definite integral of the interpolant between two points inside the
    /// domain. The bounds may be given in either order.
    pub fn integral(&self, a: f64, b: f64) -> f64 {
        let (lo, hi, sign) = if a <= b { (a, b, 1.0) } else { (b, a, -1.0) };
        let (x0, xn) = self.domain();
        let lo = lo.clamp(x0, xn);
        let hi = hi.clamp(x0, xn);

        let mut total = 0.0;
        let first = self.segment_index(lo);
        let last = self.segment_index(hi);
        for i in first..=last {
            let t0 = if i == first { lo - self.x[i] } else { 0.0 };
            let t1 = if i == last {
                hi - self.x[i]
            } else {
                self.x[i + 1] - self.x[i]
            };
            let (y0, b_, c, d) = self.segment(i);
            let anti = |t: f64| t * (y0 + t * (b_ / 2.0 + t * (c / 3.0 + t * d / 4.0)));
            total += anti(t1) - anti(t0);
        }
        sign * total
    }

    fn dedup_tolerance(&self) -> f64 {
        let (x0, xn) = self.domain();
        1e-9 * (xn - x0)
    }
}

fn dedup_sorted(values: &mut Vec<f64>, tol: f64) {
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() <= tol);
}

fn polish_cubic_root(a3: f64, a2: f64, a1: f64, a0: f64, mut t: f64) -> f64 {
    for _ in 0..2 {
        let f = a0 + t * (a1 + t * (a2 + t * a3));
        let df = a1 + t * (2.0 * a2 + t * 3.0 * a3);
        if df.abs() > f64::MIN_POSITIVE {
            t -= f / df;
        }
    }
    t
}

/// Real roots of a3 t³ + a2 t² + a1 t + a0, degenerating gracefully to the
/// quadratic and linear cases.
fn solve_cubic(a3: f64, a2: f64, a1: f64, a0: f64) -> Vec<f64> {
    let scale = a3.abs().max(a2.abs()).max(a1.abs()).max(a0.abs());
    if scale == 0.0 {
        return Vec::new();
    }
    if a3.abs() < 1e-14 * scale {
        return solve_quadratic(a2, a1, a0);
    }
    let p = a2 / a3;
    let q = a1 / a3;
    let r = a0 / a3;
    // depressed cubic u³ + au + b with t = u - p/3
    let a = q - p * p / 3.0;
    let b = 2.0 * p * p * p / 27.0 - p * q / 3.0 + r;
    let shift = -p / 3.0;
    let disc = (b / 2.0).powi(2) + (a / 3.0).powi(3);

    if disc > 0.0 {
        let s = disc.sqrt();
        let u = (-b / 2.0 + s).cbrt() + (-b / 2.0 - s).cbrt();
        vec![u + shift]
    } else if disc == 0.0 {
        let u = (-b / 2.0).cbrt();
        vec![2.0 * u + shift, -u + shift]
    } else {
        // three real roots via the trigonometric form
        let s = (-a / 3.0).sqrt();
        let arg = (3.0 * b / (2.0 * a) * (-3.0 / a).sqrt()).clamp(-1.0, 1.0);
        let theta = arg.acos() / 3.0;
        (0..3)
            .map(|k| 2.0 * s * (theta - 2.0 * std::f64::consts::PI * k as f64 / 3.0).cos() + shift)
            .collect()
    }
}

/// Real roots of a2 t² + a1 t + a0.
fn solve_quadratic(a2: f64, a1: f64, a0: f64) -> Vec<f64> {
    let scale = a2.abs().max(a1.abs()).max(a0.abs());
    if scale == 0.0 {
        return Vec::new();
    }
    if a2.abs() < 1e-14 * scale {
        if a1.abs() < 1e-14 * scale {
            return Vec::new();
        }
        return vec![-a0 / a1];
    }
    let disc = a1 * a1 - 4.0 * a2 * a0;
    if disc < 0.0 {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![-a1 / (2.0 * a2)];
    }
    let q = -0.5 * (a1 + a1.signum() * disc.sqrt());
    if q == 0.0 {
        return vec![0.0];
    }
    vec![q / a2, a0 / q]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;
    use std::f64::consts::PI;

    fn sine_spline() -> CubicSpline {
        let n = 200;
        let x: Vec<f64> = (0..n)
            .map(|i| 0.3 + (2.0 * PI) * i as f64 / (n - 1) as f64)
            .collect();
        let y: Vec<f64> = x.iter().map(|x| x.sin()).collect();
        CubicSpline::new(x, y)
    }

    #[test]
    fn interpolates_samples() {
        let s = sine_spline();
        assert_relative_eq!(s.value(1.0), 1.0f64.sin(), max_relative = 1e-6);
        assert_relative_eq!(s.value(4.0), 4.0f64.sin(), max_relative = 1e-5);
    }

    #[test]
    fn roots_of_sine() {
        let s = sine_spline();
        let roots = s.roots();
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], PI, max_relative = 1e-5);
        assert_relative_eq!(roots[1], 2.0 * PI, max_relative = 1e-5);
    }

    #[test]
    fn integral_of_sine() {
        let s = sine_spline();
        let exact = 0.5f64.cos() - 2.0f64.cos();
        assert_relative_eq!(s.integral(0.5, 2.0), exact, max_relative = 1e-5);
        assert_relative_eq!(s.integral(2.0, 0.5), -exact, max_relative = 1e-5);
    }

    #[test]
    fn shifted_spline_moves_roots() {
        let s = sine_spline();
        let shifted = s.shifted(0.5);
        // sin(x) = 0.5 at π/6 and 5π/6 within the domain
        let roots = shifted.roots();
        assert!(roots.iter().any(|&r| (r - PI / 6.0).abs() < 1e-4));
        assert!(roots
            .iter()
            .any(|&r| (r - 5.0 * PI / 6.0).abs() < 1e-4));
    }

    #[test]
    fn smoothing_preserves_monotonic_sequences() {
        let y = arr1(&[10.0, 8.0, 5.0, 4.5, 3.0, 1.0, 0.5, 0.2, 0.1, 0.05]);
        let smoothed = gaussian_smooth(&y, 0.5);
        for w in smoothed.as_slice().unwrap().windows(2) {
            assert!(w[1] < w[0]);
        }
        let constant = arr1(&[2.0; 8]);
        let smoothed = gaussian_smooth(&constant, 0.5);
        for &v in smoothed.iter() {
            assert_relative_eq!(v, 2.0, max_relative = 1e-12);
        }
    }
}
