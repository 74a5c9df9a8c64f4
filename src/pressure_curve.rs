//! Discretized pressure-volume isotherms for fixed temperature and
//! composition.
//!
//! The curve is sampled on a density grid between a small fraction of the
//! maximum packing density and the maximum packing density itself. Converted
//! to specific volume, a uniform density grid undersamples the low-density
//! region where the curvature of the isotherm is high, so the grid is locally
//! re-gridded uniformly in specific volume wherever the induced spacing
//! exceeds a threshold.
use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::spline::{gaussian_smooth, CubicSpline};
use itertools::Itertools;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Width of the Gaussian kernel applied to sampled pressures, in samples.
const SMOOTHING_SIGMA: f64 = 0.5;

/// Parameters of the density grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityGridSpec {
    /// The minimum density as a fraction of the maximum packing density.
    pub min_density_fraction: f64,
    /// Spacing of the uniform density grid in mol/m³.
    pub density_increment: f64,
    /// Largest tolerated spacing between consecutive specific volumes in
    /// m³/mol before the grid is locally refined.
    pub max_volume_spacing: f64,
    /// Maximum packing fraction passed to the equation of state.
    pub max_packing: f64,
}

impl Default for DensityGridSpec {
    fn default() -> Self {
        Self {
            min_density_fraction: 1.0 / 200_000.0,
            density_increment: 5.0,
            max_volume_spacing: 1e-4,
            max_packing: 0.65,
        }
    }
}

fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// A sampled isotherm, ordered by strictly increasing specific volume.
///
/// The pressure is in general non-monotonic; the van-der-Waals loop of a
/// subcritical isotherm is exactly what makes multi-root detection possible.
pub struct PressureVolumeCurve {
    /// specific volume in m³/mol, strictly increasing
    pub volume: Array1<f64>,
    /// pressure in Pa
    pub pressure: Array1<f64>,
}

impl PressureVolumeCurve {
    pub fn new<E: Eos + ?Sized>(
        eos: &E,
        temperature: f64,
        molefracs: &Array1<f64>,
        grid: &DensityGridSpec,
    ) -> EosResult<Self> {
        let max_rho = eos.max_density(molefracs, temperature, grid.max_packing);
        if !max_rho.is_finite() || max_rho <= 0.0 {
            return Err(EosError::Error(format!(
                "maximum packing density is not usable: {}",
                max_rho
            )));
        }
        let min_rho = max_rho * grid.min_density_fraction;
        let mut densities = arange(min_rho, max_rho, grid.density_increment);
        if densities.len() < 5 {
            return Err(EosError::Error(format!(
                "density grid between {} and {} mol/m³ is too coarse",
                min_rho, max_rho
            )));
        }

        // refine the low-density part uniformly in specific volume
        let switch = densities
            .iter()
            .tuple_windows()
            .enumerate()
            .filter(|(_, (lo, hi))| 1.0 / *lo - 1.0 / *hi > grid.max_volume_spacing)
            .map(|(i, _)| i)
            .last();
        if let Some(switch) = switch {
            let volumes = arange(
                1.0 / densities[switch + 1],
                1.0 / min_rho,
                grid.max_volume_spacing,
            );
            let mut refined: Vec<f64> = volumes.iter().rev().map(|v| 1.0 / v).collect();
            refined.extend_from_slice(&densities[switch + 2..]);
            densities = refined;
        }

        let pressures: Vec<f64> = densities
            .iter()
            .map(|&rho| eos.pressure(rho, temperature, molefracs))
            .collect();

        // reverse so the specific volume increases, dropping the rare pairs
        // that collapse onto the same volume in floating point
        let mut volume = Vec::with_capacity(densities.len());
        let mut pressure = Vec::with_capacity(densities.len());
        for (&rho, &p) in densities.iter().zip(pressures.iter()).rev() {
            let v = 1.0 / rho;
            if volume.last().map_or(true, |&last| v > last) {
                volume.push(v);
                pressure.push(p);
            }
        }
        debug_assert!(volume.windows(2).all(|w| w[1] > w[0]));

        Ok(Self {
            volume: Array1::from(volume),
            pressure: Array1::from(pressure),
        })
    }

    /// Smoothed interpolant of the raw samples.
    pub fn smoothed(&self) -> SmoothedCurve {
        SmoothedCurve::new(&self.volume, &self.pressure)
    }

    /// Smoothed interpolant of `pressure - target`, whose roots are the
    /// candidate densities at the target pressure.
    pub fn smoothed_shifted(&self, target: f64) -> SmoothedCurve {
        self.smoothed().shifted(target)
    }
}

/// A locally smoothed interpolant over a [`PressureVolumeCurve`].
///
/// Root extraction and extrema extraction run on separately constructed fits:
/// the root fit interpolates the smoothed samples directly, while the extrema
/// fit interpolates the finite-difference derivative of the smoothed samples
/// and is root-found in turn. This keeps root accuracy independent of the
/// stability of the derivative.
pub struct SmoothedCurve {
    root_fit: CubicSpline,
    deriv_fit: CubicSpline,
}

impl SmoothedCurve {
    pub fn new(volume: &Array1<f64>, values: &Array1<f64>) -> Self {
        let smoothed = gaussian_smooth(values, SMOOTHING_SIGMA);
        let n = volume.len();
        let mut derivative = vec![0.0; n];
        for i in 0..n {
            let (lo, hi) = (i.saturating_sub(1), (i + 1).min(n - 1));
            derivative[i] = (smoothed[hi] - smoothed[lo]) / (volume[hi] - volume[lo]);
        }
        Self {
            root_fit: CubicSpline::new(volume.to_vec(), smoothed.to_vec()),
            deriv_fit: CubicSpline::new(volume.to_vec(), derivative),
        }
    }

    /// The same curve shifted down by a constant pressure.
    pub fn shifted(&self, shift: f64) -> Self {
        Self {
            root_fit: self.root_fit.shifted(shift),
            deriv_fit: self.deriv_fit.clone(),
        }
    }

    pub fn value(&self, volume: f64) -> f64 {
        self.root_fit.value(volume)
    }

    /// Specific volumes at which the curve crosses zero, increasing.
    pub fn roots(&self) -> Vec<f64> {
        self.root_fit.roots()
    }

    /// Locations of the local extrema, increasing in specific volume.
    ///
    /// At most the first two are retained: a subcritical isotherm has one
    /// local minimum and one local maximum, anything beyond that is noise.
    pub fn extrema(&self) -> Vec<f64> {
        let mut extrema = self.deriv_fit.roots();
        extrema.truncate(2);
        extrema
    }

    pub fn integral(&self, a: f64, b: f64) -> f64 {
        self.root_fit.integral(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubic::PengRobinson;
    use crate::eos::ComponentRecord;
    use itertools::Itertools;
    use ndarray::arr1;

    fn propane() -> PengRobinson {
        PengRobinson::new(
            vec![ComponentRecord::new("propane", 369.96, 4.25e6, 0.153, 44.0962)],
            None,
        )
        .unwrap()
    }

    #[test]
    fn volume_is_strictly_increasing() {
        let eos = propane();
        let curve =
            PressureVolumeCurve::new(&eos, 300.0, &arr1(&[1.0]), &DensityGridSpec::default())
                .unwrap();
        assert!(curve
            .volume
            .iter()
            .tuple_windows()
            .all(|(lo, hi)| hi > lo));
        assert_eq!(curve.volume.len(), curve.pressure.len());
    }

    #[test]
    fn low_density_region_is_refined() {
        let eos = propane();
        let grid = DensityGridSpec::default();
        let curve = PressureVolumeCurve::new(&eos, 300.0, &arr1(&[1.0]), &grid).unwrap();
        // beyond the refinement threshold the spacing must not exceed the cap
        for (lo, hi) in curve.volume.iter().tuple_windows() {
            if *lo > 0.01 {
                assert!(hi - lo <= grid.max_volume_spacing * (1.0 + 1e-9));
            }
        }
    }

    #[test]
    fn subcritical_isotherm_has_extrema() {
        let eos = propane();
        let curve =
            PressureVolumeCurve::new(&eos, 300.0, &arr1(&[1.0]), &DensityGridSpec::default())
                .unwrap();
        let extrema = curve.smoothed().extrema();
        assert_eq!(extrema.len(), 2);
        assert!(extrema[0] < extrema[1]);
    }

    #[test]
    fn supercritical_isotherm_is_monotone() {
        let eos = propane();
        let curve =
            PressureVolumeCurve::new(&eos, 400.0, &arr1(&[1.0]), &DensityGridSpec::default())
                .unwrap();
        assert!(curve
            .pressure
            .iter()
            .tuple_windows()
            .all(|(lo, hi)| hi <= lo));
    }
}
