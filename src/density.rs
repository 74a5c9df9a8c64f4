//! Selection of the physical density root at a target pressure.
//!
//! The smoothed isotherm minus the target pressure has between zero and three
//! relevant roots. Which root (if any) corresponds to a vapor, liquid or
//! critical fluid is decided from the root count and the local extrema; the
//! selected coarse root is then refined against the equation of state itself,
//! because a spline root is only as accurate as the sampling grid.
use crate::eos::Eos;
use crate::errors::EosResult;
use crate::phase_equilibria::{PhaseFlag, Verbosity};
use crate::pressure_curve::{DensityGridSpec, PressureVolumeCurve, SmoothedCurve};
use crate::solver::{brent_root, secant_root};
use crate::log_iter;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Options of the root classification and refinement step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Pressure below which a two-root curve is read as a liquid under
    /// tension instead of an undersampled ideal gas. The comparison value is
    /// the absolute pressure at the first root.
    pub tension_threshold: f64,
    /// Relative tolerance of the density refinement.
    pub refine_rtol: f64,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            tension_threshold: 0.0,
            refine_rtol: 1e-7,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseSearch {
    Vapor,
    Liquid,
}

/// Classify the roots of a curve that has already been shifted by the target
/// pressure and pick the coarse density for the requested search direction.
pub(crate) fn classify(
    search: PhaseSearch,
    curve: &SmoothedCurve,
    target: f64,
    options: &ClassifierOptions,
    verbosity: Verbosity,
) -> (f64, PhaseFlag) {
    let roots = curve.roots();
    let extrema = curve.extrema();

    match roots.len() {
        0 => {
            log_iter!(
                verbosity,
                "    no fluid root at {} Pa, the curve never crosses the target",
                target
            );
            (f64::NAN, PhaseFlag::NoFluid)
        }
        1 => {
            let root = roots[0];
            if extrema.is_empty() {
                (1.0 / root, PhaseFlag::CriticalFluid)
            } else if curve.value(root) + target > curve.value(extrema[extrema.len() - 1]) + target
            {
                (1.0 / root, PhaseFlag::Liquid)
            } else {
                log_iter!(
                    verbosity,
                    "    single vapor root at {} Pa, approaching the critical fluid",
                    target
                );
                (1.0 / root, PhaseFlag::Vapor)
            }
        }
        2 => {
            if curve.value(roots[0]) + target < options.tension_threshold {
                log_iter!(verbosity, "    liquid under tension at {} Pa", target);
                (1.0 / roots[0], PhaseFlag::Liquid)
            } else {
                match search {
                    // the third root exists but was not captured by the grid
                    PhaseSearch::Vapor => {
                        log_iter!(
                            verbosity,
                            "    third root not captured at {} Pa, assuming an ideal gas",
                            target
                        );
                        (f64::NAN, PhaseFlag::IdealGasAssumed)
                    }
                    PhaseSearch::Liquid => (1.0 / roots[0], PhaseFlag::Liquid),
                }
            }
        }
        _ => match search {
            PhaseSearch::Vapor => (1.0 / roots[roots.len() - 1], PhaseFlag::Vapor),
            PhaseSearch::Liquid => (1.0 / roots[0], PhaseFlag::Liquid),
        },
    }
}

/// Restore full precision of a coarse spline root by solving
/// `eos.pressure(rho) - target = 0` close to it.
fn refine_density<E: Eos + ?Sized>(
    eos: &E,
    coarse: f64,
    target: f64,
    temperature: f64,
    molefracs: &Array1<f64>,
    rtol: f64,
) -> f64 {
    let mut residual =
        |rho: f64| -> EosResult<f64> { Ok(eos.pressure(rho, temperature, molefracs) - target) };
    let lower = 0.99 * coarse;
    let upper = 1.01 * coarse;
    let refined = match (residual(lower), residual(upper)) {
        (Ok(flo), Ok(fhi)) if flo * fhi < 0.0 => brent_root(&mut residual, lower, upper, rtol, 100),
        _ => secant_root(&mut residual, lower, upper, rtol, 50),
    };
    match refined {
        Ok(rho) if rho.is_finite() && rho > 0.0 => rho,
        _ => coarse,
    }
}

/// Vapor density at the given pressure, temperature and composition.
///
/// The flag tells the caller what the root actually is; only `Vapor` and
/// `CriticalFluid` densities are refined, all other flags come with NaN or a
/// coarse value that must not be used as a solved root.
pub fn vapor_density<E: Eos + ?Sized>(
    eos: &E,
    pressure: f64,
    temperature: f64,
    molefracs: &Array1<f64>,
    grid: &DensityGridSpec,
    options: &ClassifierOptions,
    verbosity: Verbosity,
) -> EosResult<(f64, PhaseFlag)> {
    let curve = PressureVolumeCurve::new(eos, temperature, molefracs, grid)?;
    let shifted = curve.smoothed_shifted(pressure);
    let (coarse, flag) = classify(PhaseSearch::Vapor, &shifted, pressure, options, verbosity);
    let rho = if flag.is_vapor_like() {
        refine_density(eos, coarse, pressure, temperature, molefracs, options.refine_rtol)
    } else {
        coarse
    };
    Ok((rho, flag))
}

/// Liquid density at the given pressure, temperature and composition.
pub fn liquid_density<E: Eos + ?Sized>(
    eos: &E,
    pressure: f64,
    temperature: f64,
    molefracs: &Array1<f64>,
    grid: &DensityGridSpec,
    options: &ClassifierOptions,
    verbosity: Verbosity,
) -> EosResult<(f64, PhaseFlag)> {
    let curve = PressureVolumeCurve::new(eos, temperature, molefracs, grid)?;
    let shifted = curve.smoothed_shifted(pressure);
    let (coarse, flag) = classify(PhaseSearch::Liquid, &shifted, pressure, options, verbosity);
    let rho = if flag.is_liquid_like() {
        refine_density(eos, coarse, pressure, temperature, molefracs, options.refine_rtol)
    } else {
        coarse
    };
    Ok((rho, flag))
}

/// Vapor fugacity coefficients, density and flag at the given conditions.
///
/// When the classification assumes an ideal gas, unit fugacity coefficients
/// are substituted so the composition iteration can continue.
pub fn fugacity_vapor<E: Eos + ?Sized>(
    eos: &E,
    pressure: f64,
    temperature: f64,
    molefracs: &Array1<f64>,
    grid: &DensityGridSpec,
    options: &ClassifierOptions,
    verbosity: Verbosity,
) -> EosResult<(Array1<f64>, f64, PhaseFlag)> {
    let (rho, flag) = vapor_density(
        eos,
        pressure,
        temperature,
        molefracs,
        grid,
        options,
        verbosity,
    )?;
    let phi = if flag == PhaseFlag::IdealGasAssumed {
        Array1::ones(molefracs.len())
    } else {
        eos.chemical_potential(pressure, rho, molefracs, temperature)
            .mapv(f64::exp)
    };
    Ok((phi, rho, flag))
}

/// Liquid fugacity coefficients, density and flag at the given conditions.
pub fn fugacity_liquid<E: Eos + ?Sized>(
    eos: &E,
    pressure: f64,
    temperature: f64,
    molefracs: &Array1<f64>,
    grid: &DensityGridSpec,
    options: &ClassifierOptions,
    verbosity: Verbosity,
) -> EosResult<(Array1<f64>, f64, PhaseFlag)> {
    let (rho, flag) = liquid_density(
        eos,
        pressure,
        temperature,
        molefracs,
        grid,
        options,
        verbosity,
    )?;
    let phi = eos
        .chemical_potential(pressure, rho, molefracs, temperature)
        .mapv(f64::exp);
    Ok((phi, rho, flag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubic::PengRobinson;
    use crate::eos::ComponentRecord;
    use approx::assert_relative_eq;
    use ndarray::{arr1, Array1};

    fn synthetic(f: impl Fn(f64) -> f64, lo: f64, hi: f64) -> SmoothedCurve {
        let v = Array1::linspace(lo, hi, 400);
        let p = v.mapv(&f);
        SmoothedCurve::new(&v, &p)
    }

    fn opts() -> ClassifierOptions {
        ClassifierOptions::default()
    }

    #[test]
    fn no_root_means_no_fluid() {
        let curve = synthetic(|v| (v - 2.0).powi(2) + 1.0, 0.5, 5.0);
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, 0.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::NoFluid);
        assert!(rho.is_nan());
    }

    #[test]
    fn single_root_without_extrema_is_critical() {
        let curve = synthetic(|v| 5.0 - v, 0.5, 6.0);
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, 0.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::CriticalFluid);
        assert_relative_eq!(rho, 1.0 / 5.0, max_relative = 1e-2);
    }

    #[test]
    fn single_root_above_submerged_extrema_is_liquid() {
        // crosses once at v = 1, the loop beyond stays below zero
        let curve = synthetic(|v| -(v - 1.0) * ((v - 3.0).powi(2) + 0.5), 0.5, 5.0);
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, 0.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::Liquid);
        assert_relative_eq!(rho, 1.0, max_relative = 1e-2);
    }

    #[test]
    fn single_root_below_raised_extrema_is_vapor() {
        // the loop stays above zero, the only crossing is on the vapor branch
        let curve = synthetic(|v| -(v - 4.0) * ((v - 1.5).powi(2) + 0.2), 0.5, 5.0);
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, 0.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::Vapor);
        assert_relative_eq!(rho, 1.0 / 4.0, max_relative = 1e-2);
    }

    #[test]
    fn two_roots_at_negative_pressure_is_liquid_under_tension() {
        let curve = synthetic(|v| (v - 1.5).powi(2) - 0.25, 0.5, 5.0);
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, -5.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::Liquid);
        assert_relative_eq!(rho, 1.0, max_relative = 1e-2);
    }

    #[test]
    fn two_roots_at_positive_pressure_assumes_ideal_gas() {
        let curve = synthetic(|v| (v - 1.5).powi(2) - 0.25, 0.5, 5.0);
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, 5.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::IdealGasAssumed);
        assert!(rho.is_nan());

        // a liquid search keeps the first root instead
        let (rho, flag) = classify(PhaseSearch::Liquid, &curve, 5.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::Liquid);
        assert_relative_eq!(rho, 1.0, max_relative = 1e-2);
    }

    #[test]
    fn tension_threshold_is_configurable() {
        let curve = synthetic(|v| (v - 1.5).powi(2) - 0.25, 0.5, 5.0);
        let options = ClassifierOptions {
            tension_threshold: -10.0,
            ..ClassifierOptions::default()
        };
        // even a negative target reads as an undersampled ideal gas when the
        // threshold is lowered
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, -5.0, &options, Verbosity::None);
        assert_eq!(flag, PhaseFlag::IdealGasAssumed);
        assert!(rho.is_nan());
    }

    #[test]
    fn three_roots_pick_the_outer_branches() {
        let curve = synthetic(|v| (v - 1.0) * (v - 2.0) * (v - 3.0), 0.5, 3.5);
        let (rho, flag) = classify(PhaseSearch::Vapor, &curve, 0.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::Vapor);
        assert_relative_eq!(rho, 1.0 / 3.0, max_relative = 1e-2);

        let (rho, flag) = classify(PhaseSearch::Liquid, &curve, 0.0, &opts(), Verbosity::None);
        assert_eq!(flag, PhaseFlag::Liquid);
        assert_relative_eq!(rho, 1.0, max_relative = 1e-2);
    }

    #[test]
    fn refined_roots_match_the_eos() {
        let eos = PengRobinson::new(
            vec![ComponentRecord::new("propane", 369.96, 4.25e6, 0.153, 44.0962)],
            None,
        )
        .unwrap();
        let x = arr1(&[1.0]);
        let grid = DensityGridSpec::default();

        let (rho, flag) = vapor_density(
            &eos,
            1e5,
            300.0,
            &x,
            &grid,
            &opts(),
            Verbosity::None,
        )
        .unwrap();
        assert_eq!(flag, PhaseFlag::Vapor);
        assert_relative_eq!(eos.pressure(rho, 300.0, &x), 1e5, max_relative = 1e-4);

        let (rho, flag) = liquid_density(
            &eos,
            2e6,
            300.0,
            &x,
            &grid,
            &opts(),
            Verbosity::None,
        )
        .unwrap();
        assert_eq!(flag, PhaseFlag::Liquid);
        assert!(rho > 5000.0);
        assert_relative_eq!(eos.pressure(rho, 300.0, &x), 2e6, max_relative = 1e-4);
    }
}
