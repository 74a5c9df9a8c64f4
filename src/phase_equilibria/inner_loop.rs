//! Fixed-point iteration of one phase's mole fractions at a trial pressure.
//!
//! The other phase's composition and fugacity coefficients are held fixed.
//! The iterate is the vector of "mole numbers" `z_other * phi_other / phi`,
//! which only sums to one when the outer loop has found the right pressure;
//! the inner loop merely converges the sum onto a stationary value.
use crate::density::{fugacity_liquid, fugacity_vapor, ClassifierOptions};
use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::phase_equilibria::{PhaseFlag, SolverOptions, Verbosity};
use crate::pressure_curve::DensityGridSpec;
use crate::{log_iter, log_result};
use ndarray::{arr1, Array1};

const MAX_ITER_VAPOR: usize = 15;
const MAX_ITER_LIQUID: usize = 20;
const TOL_INNER: f64 = 1e-6;
const SCAN_POINTS: usize = 20;

/// Converged state of one phase at a trial pressure.
pub(crate) struct InnerSolution {
    pub molefracs: Array1<f64>,
    pub fugacity_coefficients: Array1<f64>,
    pub flag: PhaseFlag,
}

/// Index of the smallest mole fraction, used for convergence diagnostics.
fn minority_index(molefracs: &Array1<f64>) -> usize {
    molefracs
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap()
}

/// Vapor mole fractions for a fixed liquid composition (bubble direction).
pub(crate) fn solve_vapor_molefracs<E: Eos + ?Sized>(
    eos: &E,
    pressure: f64,
    temperature: f64,
    liquid_molefracs: &Array1<f64>,
    liquid_phi: &Array1<f64>,
    vapor_guess: &Array1<f64>,
    grid: &DensityGridSpec,
    classifier: &ClassifierOptions,
    options: SolverOptions,
) -> EosResult<InnerSolution> {
    let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_VAPOR, TOL_INNER);

    let mut yi = vapor_guess / vapor_guess.sum();
    let mut total = 1.0;
    let mut phi = Array1::ones(yi.len());
    let mut flag = PhaseFlag::Vapor;
    let mut yinew = yi.clone();
    let mut converged = false;

    for _ in 0..max_iter {
        yi = &yi / yi.sum();
        log_iter!(verbosity, "    vapor guess {}", yi);

        let (mut phi_k, _, mut flag_k) = fugacity_vapor(
            eos,
            pressure,
            temperature,
            &yi,
            grid,
            classifier,
            verbosity,
        )?;
        if phi_k.iter().any(|p| !p.is_finite()) || flag_k == PhaseFlag::Liquid {
            // the guess does not correspond to a vapor, scan for one that does
            log_iter!(
                verbosity,
                "    composition does not produce a vapor at {} Pa, scanning",
                pressure
            );
            let alternative = scan_vapor_molefracs(
                eos,
                total,
                pressure,
                temperature,
                liquid_molefracs,
                liquid_phi,
                grid,
                classifier,
                verbosity,
            )?;
            let (phi_alt, _, flag_alt) = fugacity_vapor(
                eos,
                pressure,
                temperature,
                &alternative,
                grid,
                classifier,
                verbosity,
            )?;
            if phi_alt.iter().any(|p| !p.is_finite()) {
                return Err(EosError::IterationFailed(
                    "vapor mole fraction iteration".to_owned(),
                ));
            }
            yi = alternative;
            phi_k = phi_alt;
            flag_k = flag_alt;
        }

        yinew = liquid_molefracs * liquid_phi / &phi_k;
        let new_total = yinew.sum();
        log_iter!(
            verbosity,
            "    mole numbers {} (sum {}, previous {})",
            yinew,
            new_total,
            total
        );

        phi = phi_k;
        flag = flag_k;

        if (new_total - total).abs() < tol {
            converged = true;
            break;
        }
        yi = &yinew / new_total;
        total = new_total;
    }

    let yinew = &yinew / yinew.sum();
    let minority = minority_index(&yi);
    let rel_err = (yinew[minority] - yi[minority]).abs() / yi[minority] * 100.0;
    if converged {
        log_iter!(
            verbosity,
            "    final vapor mole fractions {}, error in the smallest fraction {:.3e} %",
            yi,
            rel_err
        );
    } else {
        log_result!(
            verbosity,
            "    vapor mole fractions did not converge within {} iterations, error in the smallest fraction {:.3} %",
            max_iter,
            rel_err
        );
    }

    Ok(InnerSolution {
        molefracs: yi,
        fugacity_coefficients: phi,
        flag,
    })
}

/// Liquid mole fractions for a fixed vapor composition (dew direction).
pub(crate) fn solve_liquid_molefracs<E: Eos + ?Sized>(
    eos: &E,
    pressure: f64,
    temperature: f64,
    vapor_molefracs: &Array1<f64>,
    vapor_phi: &Array1<f64>,
    liquid_guess: &Array1<f64>,
    grid: &DensityGridSpec,
    classifier: &ClassifierOptions,
    options: SolverOptions,
) -> EosResult<InnerSolution> {
    let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_LIQUID, TOL_INNER);

    let mut xi = liquid_guess / liquid_guess.sum();
    let mut total = 1.0;
    let mut phi = Array1::ones(xi.len());
    let mut flag = PhaseFlag::Liquid;
    let mut xinew = xi.clone();
    let mut converged = false;

    for _ in 0..max_iter {
        xi = &xi / xi.sum();
        log_iter!(verbosity, "    liquid guess {}", xi);

        let (phi_k, _, flag_k) = fugacity_liquid(
            eos,
            pressure,
            temperature,
            &xi,
            grid,
            classifier,
            verbosity,
        )?;
        if phi_k.iter().any(|p| !p.is_finite()) || flag_k == PhaseFlag::Vapor {
            // no liquid root exists for this guess, the system is close to
            // its critical point at a small pressure
            log_result!(
                verbosity,
                "    composition does not produce a liquid or critical fluid at {} Pa",
                pressure
            );
            return Err(EosError::IterationFailed(
                "liquid mole fraction iteration".to_owned(),
            ));
        }

        xinew = vapor_molefracs * vapor_phi / &phi_k;
        let new_total = xinew.sum();
        log_iter!(
            verbosity,
            "    mole numbers {} (sum {}, previous {})",
            xinew,
            new_total,
            total
        );

        phi = phi_k;
        flag = flag_k;

        if (new_total - total).abs() < tol {
            converged = true;
            break;
        }
        xi = &xinew / new_total;
        total = new_total;
    }

    let xinew = &xinew / xinew.sum();
    let minority = minority_index(&xi);
    let rel_err = (xinew[minority] - xi[minority]).abs() / xi[minority] * 100.0;
    if converged {
        log_iter!(
            verbosity,
            "    final liquid mole fractions {}, error in the smallest fraction {:.3e} %",
            xi,
            rel_err
        );
    } else {
        log_result!(
            verbosity,
            "    liquid mole fractions did not converge within {} iterations, error in the smallest fraction {:.3} %",
            max_iter,
            rel_err
        );
    }

    Ok(InnerSolution {
        molefracs: xi,
        fugacity_coefficients: phi,
        flag,
    })
}

/// Scan binary vapor compositions for one that produces a vapor root and
/// comes closest to the target mole-number sum.
fn scan_vapor_molefracs<E: Eos + ?Sized>(
    eos: &E,
    target_total: f64,
    pressure: f64,
    temperature: f64,
    liquid_molefracs: &Array1<f64>,
    liquid_phi: &Array1<f64>,
    grid: &DensityGridSpec,
    classifier: &ClassifierOptions,
    verbosity: Verbosity,
) -> EosResult<Array1<f64>> {
    if liquid_molefracs.len() != 2 {
        return Err(EosError::IncompatibleComponents(2, liquid_molefracs.len()));
    }

    let mut candidates = Vec::with_capacity(SCAN_POINTS);
    for i in 0..SCAN_POINTS {
        let y0 = i as f64 / (SCAN_POINTS - 1) as f64;
        let y = arr1(&[y0, 1.0 - y0]);
        let (phi, _, flag) = fugacity_vapor(
            eos,
            pressure,
            temperature,
            &y,
            grid,
            classifier,
            Verbosity::None,
        )?;
        let objective = (liquid_molefracs * liquid_phi / &phi).sum() - target_total;
        if objective.is_finite() {
            candidates.push((y0, objective, flag));
        }
    }
    if candidates.is_empty() {
        return Err(EosError::IterationFailed(
            "vapor composition scan".to_owned(),
        ));
    }

    // prefer candidates whose root is actually vapor-like
    let preferred: Vec<_> = candidates
        .iter()
        .filter(|(_, _, flag)| !matches!(flag, PhaseFlag::Liquid | PhaseFlag::IdealGasAssumed))
        .copied()
        .collect();
    let pool = if preferred.is_empty() {
        candidates
    } else {
        preferred
    };
    let (y0, objective, _) = pool
        .into_iter()
        .min_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
        .unwrap();
    log_iter!(
        verbosity,
        "    new vapor guess [{}, {}] with mole number error {}",
        y0,
        1.0 - y0,
        objective
    );
    Ok(arr1(&[y0, 1.0 - y0]))
}
