//! Batch evaluation of independent equilibrium points.
//!
//! Every point is independent of every other point; the only shared state is
//! the read-only equation of state. Failures are caught at the per-point
//! boundary and converted to NaN-filled results so a single bad point never
//! aborts a batch; only input validation, performed before dispatch, does.
//!
//! Sequential execution threads the previously converged composition into
//! the next point as a warm start. Pooled execution cannot observe other
//! workers' convergence history deterministically, so every point then
//! starts from the saturation-pressure estimate instead.
use crate::density::{fugacity_liquid, fugacity_vapor};
use crate::eos::{pure_component_index, validate_molefracs, Eos};
use crate::errors::EosResult;
use crate::log_result;
use crate::phase_equilibria::{
    bubble_point, dew_point, saturation_pressure, EquilibriumOptions, EquilibriumResult,
    PhaseFlag, SaturationPoint, Verbosity,
};
use ndarray::Array1;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One bubble- or dew-point input tuple.
#[derive(Debug, Clone)]
pub struct EquilibriumInput {
    /// Temperature in K.
    pub temperature: f64,
    /// Mole fractions of the fixed phase.
    pub molefracs: Array1<f64>,
    /// Optional initial guess for the equilibrium pressure in Pa.
    pub pressure_guess: Option<f64>,
}

/// One pure-component saturation input tuple.
#[derive(Debug, Clone)]
pub struct SaturationInput {
    /// Temperature in K.
    pub temperature: f64,
    /// Pure composition (exactly one nonzero entry).
    pub molefracs: Array1<f64>,
}

/// One fixed-state property input tuple.
#[derive(Debug, Clone)]
pub struct PropertiesInput {
    /// Pressure in Pa.
    pub pressure: f64,
    /// Temperature in K.
    pub temperature: f64,
    /// Mole fractions of the phase.
    pub molefracs: Array1<f64>,
}

/// Density, fugacity coefficients and root classification of one phase.
#[derive(Debug, Clone)]
pub struct PhaseProperties {
    pub density: f64,
    pub fugacity_coefficients: Array1<f64>,
    pub flag: PhaseFlag,
}

impl PhaseProperties {
    fn failed(components: usize) -> Self {
        Self {
            density: f64::NAN,
            fugacity_coefficients: Array1::from_elem(components, f64::NAN),
            flag: PhaseFlag::NoFluid,
        }
    }
}

/// Execution options of the batch drivers.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Map the points over the worker pool instead of sequentially. Without
    /// the `rayon` feature this falls back to sequential execution.
    pub parallel: bool,
    /// Per-point calculation options.
    pub equilibrium: EquilibriumOptions,
}

fn map_points<I, O, F>(inputs: &[I], parallel: bool, worker: F) -> Vec<O>
where
    I: Sync,
    O: Send,
    F: Fn(&I) -> O + Sync + Send,
{
    #[cfg(feature = "rayon")]
    if parallel {
        return inputs.par_iter().map(worker).collect();
    }
    let _ = parallel;
    inputs.iter().map(worker).collect()
}

/// A single bubble- or dew-point evaluation with the per-point failure
/// boundary: any error becomes a NaN result flagged `NoFluid`.
fn equilibrium_worker<E: Eos + ?Sized>(
    eos: &E,
    input: &EquilibriumInput,
    warm: Option<&Array1<f64>>,
    options: &EquilibriumOptions,
    bubble: bool,
) -> EquilibriumResult {
    let verbosity = options.outer.verbosity;

    // a pure component degenerates to the saturation calculation
    if pure_component_index(&input.molefracs).is_ok() {
        return match saturation_pressure(
            eos,
            input.temperature,
            &input.molefracs,
            &options.grid,
            options.saturation,
        ) {
            Ok(sat) => EquilibriumResult {
                pressure: sat.pressure,
                molefracs: input.molefracs.clone(),
                vapor_flag: PhaseFlag::Vapor,
                liquid_flag: PhaseFlag::Liquid,
                residual: 0.0,
            },
            Err(e) => {
                log_result!(
                    verbosity,
                    "saturation point at {} K failed: {}",
                    input.temperature,
                    e
                );
                EquilibriumResult::failed(eos.components())
            }
        };
    }

    let point = if bubble {
        bubble_point(
            eos,
            input.temperature,
            &input.molefracs,
            input.pressure_guess,
            warm,
            options,
        )
    } else {
        dew_point(
            eos,
            input.temperature,
            &input.molefracs,
            input.pressure_guess,
            warm,
            options,
        )
    };
    point.unwrap_or_else(|e| {
        log_result!(
            verbosity,
            "equilibrium point at {} K, {} failed: {}",
            input.temperature,
            input.molefracs,
            e
        );
        EquilibriumResult::failed(eos.components())
    })
}

fn equilibrium_batch<E: Eos + ?Sized>(
    eos: &E,
    inputs: &[EquilibriumInput],
    options: &BatchOptions,
    bubble: bool,
) -> EosResult<Vec<EquilibriumResult>> {
    for input in inputs {
        validate_molefracs(eos, &input.molefracs)?;
    }
    #[cfg(feature = "rayon")]
    if options.parallel {
        return Ok(inputs
            .par_iter()
            .map(|input| equilibrium_worker(eos, input, None, &options.equilibrium, bubble))
            .collect());
    }

    // sequential execution carries the last converged composition forward
    let mut warm: Option<Array1<f64>> = None;
    let mut results = Vec::with_capacity(inputs.len());
    for input in inputs {
        let result = equilibrium_worker(eos, input, warm.as_ref(), &options.equilibrium, bubble);
        if pure_component_index(&input.molefracs).is_err()
            && result.pressure.is_finite()
            && result.molefracs.iter().all(|x| x.is_finite())
        {
            warm = Some(result.molefracs.clone());
        }
        results.push(result);
    }
    Ok(results)
}

/// Bubble points (pressure and vapor composition) for a list of fixed liquid
/// compositions and temperatures. Result order matches input order.
pub fn bubble_point_batch<E: Eos + ?Sized>(
    eos: &E,
    inputs: &[EquilibriumInput],
    options: &BatchOptions,
) -> EosResult<Vec<EquilibriumResult>> {
    equilibrium_batch(eos, inputs, options, true)
}

/// Dew points (pressure and liquid composition) for a list of fixed vapor
/// compositions and temperatures. Result order matches input order.
pub fn dew_point_batch<E: Eos + ?Sized>(
    eos: &E,
    inputs: &[EquilibriumInput],
    options: &BatchOptions,
) -> EosResult<Vec<EquilibriumResult>> {
    equilibrium_batch(eos, inputs, options, false)
}

/// Pure-component saturation states for a list of temperatures. Failed
/// points (including supercritical ones) are NaN-filled.
pub fn saturation_batch<E: Eos + ?Sized>(
    eos: &E,
    inputs: &[SaturationInput],
    options: &BatchOptions,
) -> EosResult<Vec<SaturationPoint>> {
    for input in inputs {
        validate_molefracs(eos, &input.molefracs)?;
        pure_component_index(&input.molefracs)?;
    }
    let opts = &options.equilibrium;
    Ok(map_points(inputs, options.parallel, |input| {
        saturation_pressure(
            eos,
            input.temperature,
            &input.molefracs,
            &opts.grid,
            opts.saturation,
        )
        .unwrap_or_else(|e| {
            log_result!(
                opts.outer.verbosity,
                "saturation point at {} K failed: {}",
                input.temperature,
                e
            );
            SaturationPoint {
                pressure: f64::NAN,
                liquid_density: f64::NAN,
                vapor_density: f64::NAN,
            }
        })
    }))
}

/// Liquid density and fugacity coefficients at fixed (P, T, composition)
/// points. Result order matches input order.
pub fn liquid_properties_batch<E: Eos + ?Sized>(
    eos: &E,
    inputs: &[PropertiesInput],
    options: &BatchOptions,
) -> EosResult<Vec<PhaseProperties>> {
    for input in inputs {
        validate_molefracs(eos, &input.molefracs)?;
    }
    let opts = &options.equilibrium;
    Ok(map_points(inputs, options.parallel, |input| {
        fugacity_liquid(
            eos,
            input.pressure,
            input.temperature,
            &input.molefracs,
            &opts.grid,
            &opts.classifier,
            Verbosity::None,
        )
        .map(|(phi, rho, flag)| PhaseProperties {
            density: rho,
            fugacity_coefficients: phi,
            flag,
        })
        .unwrap_or_else(|e| {
            log_result!(
                opts.outer.verbosity,
                "liquid state at {} K, {} Pa failed: {}",
                input.temperature,
                input.pressure,
                e
            );
            PhaseProperties::failed(eos.components())
        })
    }))
}

/// Vapor density and fugacity coefficients at fixed (P, T, composition)
/// points. Result order matches input order.
pub fn vapor_properties_batch<E: Eos + ?Sized>(
    eos: &E,
    inputs: &[PropertiesInput],
    options: &BatchOptions,
) -> EosResult<Vec<PhaseProperties>> {
    for input in inputs {
        validate_molefracs(eos, &input.molefracs)?;
    }
    let opts = &options.equilibrium;
    Ok(map_points(inputs, options.parallel, |input| {
        fugacity_vapor(
            eos,
            input.pressure,
            input.temperature,
            &input.molefracs,
            &opts.grid,
            &opts.classifier,
            Verbosity::None,
        )
        .map(|(phi, rho, flag)| PhaseProperties {
            density: rho,
            fugacity_coefficients: phi,
            flag,
        })
        .unwrap_or_else(|e| {
            log_result!(
                opts.outer.verbosity,
                "vapor state at {} K, {} Pa failed: {}",
                input.temperature,
                input.pressure,
                e
            );
            PhaseProperties::failed(eos.components())
        })
    }))
}
