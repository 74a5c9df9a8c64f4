//! Outer pressure iteration of bubble- and dew-point calculations.
//!
//! The calculation proceeds in stages: estimate a starting pressure from the
//! pure-component saturation pressures, locate a bracket on which the
//! mass-balance objective changes sign, solve the objective with the
//! configured strategy and finally re-run the composition iteration at the
//! converged pressure for a self-consistent result.
use crate::density::{fugacity_liquid, fugacity_vapor, ClassifierOptions};
use crate::eos::{validate_molefracs, Eos, SaturationFallback};
use crate::errors::{EosError, EosResult};
use crate::log_iter;
use crate::phase_equilibria::{
    bracket_pressure_bubble, bracket_pressure_dew, saturation_pressure, solve_liquid_molefracs,
    solve_vapor_molefracs, EquilibriumResult, SolverOptions, Verbosity,
};
use crate::pressure_curve::DensityGridSpec;
use crate::solver::OuterSolver;
use ndarray::Array1;

/// Tolerance of the final composition re-solve at the converged pressure.
const TOL_FINAL: f64 = 1e-10;
/// Objective value reported for unphysical negative trial pressures.
const NEGATIVE_PRESSURE_OBJECTIVE: f64 = 10.0;

/// Configuration of a bubble- or dew-point calculation.
#[derive(Clone, Debug)]
pub struct EquilibriumOptions {
    /// Strategy of the outer pressure solver.
    pub solver: OuterSolver,
    /// Lower end of the pressure bracket search in Pa.
    pub pressure_min: f64,
    /// Density grid used for every isotherm evaluation.
    pub grid: DensityGridSpec,
    /// Root classification options.
    pub classifier: ClassifierOptions,
    /// Options of the composition inner loop.
    pub inner: SolverOptions,
    /// Options of the outer pressure solver.
    pub outer: SolverOptions,
    /// Options of the bracket search.
    pub bracket: SolverOptions,
    /// Options of the pure-component saturation solver.
    pub saturation: SolverOptions,
    /// Placeholder saturation pressures for supercritical components.
    pub fallback: SaturationFallback,
}

impl Default for EquilibriumOptions {
    fn default() -> Self {
        Self {
            solver: OuterSolver::default(),
            pressure_min: 1000.0,
            grid: DensityGridSpec::default(),
            classifier: ClassifierOptions::default(),
            inner: SolverOptions::default(),
            outer: SolverOptions::default(),
            bracket: SolverOptions::default(),
            saturation: SolverOptions::default(),
            fallback: SaturationFallback::default(),
        }
    }
}

impl EquilibriumOptions {
    fn final_inner(&self) -> SolverOptions {
        SolverOptions {
            tol: Some(self.inner.tol.unwrap_or(TOL_FINAL).min(TOL_FINAL)),
            ..self.inner
        }
    }
}

/// Saturation pressure of every component at the given temperature, with the
/// fallback table substituting for supercritical components.
fn pure_saturation_pressures<E: Eos + ?Sized>(
    eos: &E,
    temperature: f64,
    options: &EquilibriumOptions,
    verbosity: Verbosity,
) -> EosResult<Array1<f64>> {
    let names = eos.component_names();
    let mut psat = Array1::zeros(eos.components());
    for i in 0..eos.components() {
        let mut unit = Array1::zeros(eos.components());
        unit[i] = 1.0;
        psat[i] =
            match saturation_pressure(eos, temperature, &unit, &options.grid, options.saturation) {
                Ok(sat) => sat.pressure,
                Err(EosError::SuperCritical(..)) => match options.fallback.get(&names[i]) {
                    Some(p) => {
                        log_iter!(
                            verbosity,
                            "{} is supercritical at {} K, substituting {} Pa",
                            names[i],
                            temperature,
                            p
                        );
                        p
                    }
                    None => {
                        return Err(EosError::SuperCritical(names[i].clone(), temperature));
                    }
                },
                Err(e) => return Err(e),
            };
    }
    Ok(psat)
}

/// Bubble-point pressure and vapor composition for a fixed liquid
/// composition and temperature.
pub fn bubble_point<E: Eos + ?Sized>(
    eos: &E,
    temperature: f64,
    liquid_molefracs: &Array1<f64>,
    pressure_guess: Option<f64>,
    vapor_guess: Option<&Array1<f64>>,
    options: &EquilibriumOptions,
) -> EosResult<EquilibriumResult> {
    validate_molefracs(eos, liquid_molefracs)?;
    let verbosity = options.outer.verbosity;

    let psat = pure_saturation_pressures(eos, temperature, options, verbosity)?;
    let p0 = pressure_guess.unwrap_or_else(|| 1.0 / (liquid_molefracs / &psat).sum());
    let yi0 = match vapor_guess {
        Some(y) => y.clone(),
        None => {
            let y = liquid_molefracs * &psat / p0;
            &y / y.sum()
        }
    };
    log_iter!(
        verbosity,
        "starting pressure {} Pa, vapor estimate {}",
        p0,
        yi0
    );

    let (bracket, warm) = bracket_pressure_bubble(
        eos,
        temperature,
        liquid_molefracs,
        &yi0,
        options.pressure_min,
        &options.grid,
        &options.classifier,
        options.inner,
        options.bracket,
    )?;

    let mut yi = warm;
    let mut objective = |p: f64| -> EosResult<f64> {
        if p < 0.0 {
            return Ok(NEGATIVE_PRESSURE_OBJECTIVE);
        }
        let (phil, _, _) = fugacity_liquid(
            eos,
            p,
            temperature,
            liquid_molefracs,
            &options.grid,
            &options.classifier,
            options.inner.verbosity,
        )?;
        let sol = solve_vapor_molefracs(
            eos,
            p,
            temperature,
            liquid_molefracs,
            &phil,
            &yi,
            &options.grid,
            &options.classifier,
            options.inner,
        )?;
        yi = sol.molefracs;
        let obj = (liquid_molefracs * &phil / &sol.fugacity_coefficients).sum() - 1.0;
        log_iter!(verbosity, "pressure {} Pa, objective {}", p, obj);
        Ok(obj)
    };
    let pressure = options.solver.solve(&mut objective, &bracket, options.outer)?;

    // self-consistent re-solve at the converged pressure
    let (phil, _, liquid_flag) = fugacity_liquid(
        eos,
        pressure,
        temperature,
        liquid_molefracs,
        &options.grid,
        &options.classifier,
        options.inner.verbosity,
    )?;
    let sol = solve_vapor_molefracs(
        eos,
        pressure,
        temperature,
        liquid_molefracs,
        &phil,
        &yi,
        &options.grid,
        &options.classifier,
        options.final_inner(),
    )?;
    let residual = (liquid_molefracs * &phil / &sol.fugacity_coefficients).sum() - 1.0;
    log_iter!(
        verbosity,
        "bubble point at {} Pa, vapor {}, residual {}",
        pressure,
        sol.molefracs,
        residual
    );

    Ok(EquilibriumResult {
        pressure,
        molefracs: sol.molefracs,
        vapor_flag: sol.flag,
        liquid_flag,
        residual,
    })
}

/// Dew-point pressure and liquid composition for a fixed vapor composition
/// and temperature.
pub fn dew_point<E: Eos + ?Sized>(
    eos: &E,
    temperature: f64,
    vapor_molefracs: &Array1<f64>,
    pressure_guess: Option<f64>,
    liquid_guess: Option<&Array1<f64>>,
    options: &EquilibriumOptions,
) -> EosResult<EquilibriumResult> {
    validate_molefracs(eos, vapor_molefracs)?;
    let verbosity = options.outer.verbosity;

    let psat = pure_saturation_pressures(eos, temperature, options, verbosity)?;
    let p0 = pressure_guess.unwrap_or_else(|| 1.0 / (vapor_molefracs / &psat).sum());
    let xi0 = match liquid_guess {
        Some(x) => x.clone(),
        None => {
            let x = vapor_molefracs * p0 / &psat;
            &x / x.sum()
        }
    };
    log_iter!(
        verbosity,
        "starting pressure {} Pa, liquid estimate {}",
        p0,
        xi0
    );

    let (bracket, warm) = bracket_pressure_dew(
        eos,
        temperature,
        vapor_molefracs,
        &xi0,
        options.pressure_min,
        &options.grid,
        &options.classifier,
        options.inner,
        options.bracket,
    )?;

    let mut xi = warm;
    let mut objective = |p: f64| -> EosResult<f64> {
        if p < 0.0 {
            return Ok(NEGATIVE_PRESSURE_OBJECTIVE);
        }
        let (phiv, _, _) = fugacity_vapor(
            eos,
            p,
            temperature,
            vapor_molefracs,
            &options.grid,
            &options.classifier,
            options.inner.verbosity,
        )?;
        let sol = solve_liquid_molefracs(
            eos,
            p,
            temperature,
            vapor_molefracs,
            &phiv,
            &xi,
            &options.grid,
            &options.classifier,
            options.inner,
        )?;
        xi = sol.molefracs;
        let obj = (vapor_molefracs * &phiv / &sol.fugacity_coefficients).sum() - 1.0;
        log_iter!(verbosity, "pressure {} Pa, objective {}", p, obj);
        Ok(obj)
    };
    let pressure = options.solver.solve(&mut objective, &bracket, options.outer)?;

    // self-consistent re-solve at the converged pressure
    let (phiv, _, vapor_flag) = fugacity_vapor(
        eos,
        pressure,
        temperature,
        vapor_molefracs,
        &options.grid,
        &options.classifier,
        options.inner.verbosity,
    )?;
    let sol = solve_liquid_molefracs(
        eos,
        pressure,
        temperature,
        vapor_molefracs,
        &phiv,
        &xi,
        &options.grid,
        &options.classifier,
        options.final_inner(),
    )?;
    let residual = (vapor_molefracs * &phiv / &sol.fugacity_coefficients).sum() - 1.0;
    log_iter!(
        verbosity,
        "dew point at {} Pa, liquid {}, residual {}",
        pressure,
        sol.molefracs,
        residual
    );

    Ok(EquilibriumResult {
        pressure,
        molefracs: sol.molefracs,
        vapor_flag,
        liquid_flag: sol.flag,
        residual,
    })
}
