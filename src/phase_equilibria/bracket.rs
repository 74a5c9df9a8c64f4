//! Search for a pressure interval on which the mass-balance objective
//! changes sign.
//!
//! The outer solver needs a bracket; the search starts from a caller-supplied
//! minimum pressure and the pressure at the local maximum of the fixed
//! phase's isotherm, then doubles the upper bound until the objective changes
//! sign or the iteration limit is reached.
use crate::density::{fugacity_liquid, fugacity_vapor, ClassifierOptions};
use crate::eos::Eos;
use crate::errors::{EosError, EosResult};
use crate::log_iter;
use crate::phase_equilibria::{
    solve_liquid_molefracs, solve_vapor_molefracs, SolverOptions, Verbosity,
};
use crate::pressure_curve::{DensityGridSpec, PressureVolumeCurve};
use ndarray::Array1;

const MAX_ITER_BRACKET: usize = 200;
/// The dew search stays below the local maximum of the vapor isotherm,
/// where the vapor root degenerates into the tangent point.
const DEW_CEILING_BACKOFF: f64 = 0.95;

/// A pressure interval with opposite-sign objective values and the
/// interpolated zero of the secant line through its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct PressureBracket {
    pub lower: f64,
    pub upper: f64,
    pub objective_lower: f64,
    pub objective_upper: f64,
    /// Zero of the secant line, used as the outer solver's initial guess.
    pub guess: f64,
}

impl PressureBracket {
    fn from_samples(lower: (f64, f64), upper: (f64, f64)) -> Self {
        let slope = (upper.1 - lower.1) / (upper.0 - lower.0);
        Self {
            lower: lower.0,
            upper: upper.0,
            objective_lower: lower.1,
            objective_upper: upper.1,
            guess: upper.0 - upper.1 / slope,
        }
    }
}

/// The largest sensible trial pressure: the local maximum of the fixed
/// phase's isotherm.
fn curve_pressure_ceiling<E: Eos + ?Sized>(
    eos: &E,
    temperature: f64,
    molefracs: &Array1<f64>,
    grid: &DensityGridSpec,
    pressure_min: f64,
) -> EosResult<f64> {
    let curve = PressureVolumeCurve::new(eos, temperature, molefracs, grid)?;
    let smoothed = curve.smoothed();
    let ceiling = smoothed
        .extrema()
        .iter()
        .map(|&v| smoothed.value(v))
        .fold(f64::NEG_INFINITY, f64::max);
    if !ceiling.is_finite() || ceiling <= pressure_min {
        return Err(EosError::IterationFailed(
            "pressure bracket: the isotherm has no local maximum above the minimum pressure"
                .to_owned(),
        ));
    }
    Ok(ceiling)
}

fn sign_change(previous: f64, current: f64) -> bool {
    (previous - current).abs() > (previous + current).abs()
}

/// Bracket the bubble-point objective for a fixed liquid composition.
///
/// Returns the bracket together with the vapor composition converged at the
/// last evaluated pressure, which makes a good warm start for the outer loop.
pub fn bracket_pressure_bubble<E: Eos + ?Sized>(
    eos: &E,
    temperature: f64,
    liquid_molefracs: &Array1<f64>,
    vapor_guess: &Array1<f64>,
    pressure_min: f64,
    grid: &DensityGridSpec,
    classifier: &ClassifierOptions,
    inner_options: SolverOptions,
    options: SolverOptions,
) -> EosResult<(PressureBracket, Array1<f64>)> {
    let max_iter = options.max_iter.unwrap_or(MAX_ITER_BRACKET);
    let verbosity = options.verbosity;

    let ceiling = curve_pressure_ceiling(eos, temperature, liquid_molefracs, grid, pressure_min)?;

    let mut yi = vapor_guess.clone();
    let mut evaluate = |p: f64, yi: &Array1<f64>| -> EosResult<(f64, Array1<f64>)> {
        let (phil, _, _) = fugacity_liquid(
            eos,
            p,
            temperature,
            liquid_molefracs,
            grid,
            classifier,
            verbosity,
        )?;
        let sol = solve_vapor_molefracs(
            eos,
            p,
            temperature,
            liquid_molefracs,
            &phil,
            yi,
            grid,
            classifier,
            inner_options,
        )?;
        let objective = (liquid_molefracs * &phil / &sol.fugacity_coefficients).sum() - 1.0;
        Ok((objective, sol.molefracs))
    };

    let mut previous = (pressure_min, 0.0);
    let (obj, yi_next) = evaluate(pressure_min, &yi)?;
    previous.1 = obj;
    yi = yi_next;
    log_iter!(
        verbosity,
        "minimum pressure {} Pa, objective {}",
        previous.0,
        previous.1
    );

    let mut current = (ceiling, 0.0);
    let (obj, yi_next) = evaluate(ceiling, &yi)?;
    current.1 = obj;
    yi = yi_next;
    log_iter!(
        verbosity,
        "maximum pressure estimate {} Pa, objective {}",
        current.0,
        current.1
    );

    for _ in 2..max_iter {
        if sign_change(previous.1, current.1) {
            let bracket = PressureBracket::from_samples(previous, current);
            log_iter!(
                verbosity,
                "pressure bracket [{}, {}] Pa, interpolated guess {} Pa",
                bracket.lower,
                bracket.upper,
                bracket.guess
            );
            return Ok((bracket, yi));
        }
        let p = 2.0 * current.0;
        let (obj, yi_next) = evaluate(p, &yi)?;
        yi = yi_next;
        previous = current;
        current = (p, obj);
        log_iter!(verbosity, "pressure {} Pa, objective {}", p, obj);
    }
    Err(EosError::BracketExhausted(max_iter))
}

/// Bracket the dew-point objective for a fixed vapor composition.
pub fn bracket_pressure_dew<E: Eos + ?Sized>(
    eos: &E,
    temperature: f64,
    vapor_molefracs: &Array1<f64>,
    liquid_guess: &Array1<f64>,
    pressure_min: f64,
    grid: &DensityGridSpec,
    classifier: &ClassifierOptions,
    inner_options: SolverOptions,
    options: SolverOptions,
) -> EosResult<(PressureBracket, Array1<f64>)> {
    let max_iter = options.max_iter.unwrap_or(MAX_ITER_BRACKET);
    let verbosity = options.verbosity;

    let ceiling = DEW_CEILING_BACKOFF
        * curve_pressure_ceiling(eos, temperature, vapor_molefracs, grid, pressure_min)?;

    let mut xi = liquid_guess.clone();
    let mut evaluate = |p: f64, xi: &Array1<f64>| -> EosResult<(f64, Array1<f64>)> {
        let (phiv, _, _) = fugacity_vapor(
            eos,
            p,
            temperature,
            vapor_molefracs,
            grid,
            classifier,
            verbosity,
        )?;
        let sol = solve_liquid_molefracs(
            eos,
            p,
            temperature,
            vapor_molefracs,
            &phiv,
            xi,
            grid,
            classifier,
            inner_options,
        )?;
        let objective = (vapor_molefracs * &phiv / &sol.fugacity_coefficients).sum() - 1.0;
        Ok((objective, sol.molefracs))
    };

    let mut previous = (pressure_min, 0.0);
    let (obj, xi_next) = evaluate(pressure_min, &xi)?;
    previous.1 = obj;
    xi = xi_next;
    log_iter!(
        verbosity,
        "minimum pressure {} Pa, objective {}",
        previous.0,
        previous.1
    );

    let mut current = (ceiling, 0.0);
    let (obj, xi_next) = evaluate(ceiling, &xi)?;
    current.1 = obj;
    xi = xi_next;
    log_iter!(
        verbosity,
        "maximum pressure estimate {} Pa, objective {}",
        current.0,
        current.1
    );

    for _ in 2..max_iter {
        if sign_change(previous.1, current.1) {
            let bracket = PressureBracket::from_samples(previous, current);
            log_iter!(
                verbosity,
                "pressure bracket [{}, {}] Pa, interpolated guess {} Pa",
                bracket.lower,
                bracket.upper,
                bracket.guess
            );
            return Ok((bracket, xi));
        }
        let p = 2.0 * current.0;
        let (obj, xi_next) = evaluate(p, &xi)?;
        xi = xi_next;
        previous = current;
        current = (p, obj);
        log_iter!(verbosity, "pressure {} Pa, objective {}", p, obj);
    }
    Err(EosError::BracketExhausted(max_iter))
}
