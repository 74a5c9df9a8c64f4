//! Vapor-liquid equilibrium core for equation-of-state models.
//!
//! The equation of state itself is a capability (the [`Eos`] trait): it only
//! has to evaluate pressure, a maximum packing density and chemical
//! potentials. On top of that this crate builds discretized pressure-volume
//! isotherms, classifies their roots into vapor/liquid/critical densities,
//! solves pure-component saturation pressures with the Maxwell equal-area
//! construction and converges the nested composition/pressure iteration of
//! bubble- and dew-point calculations. A Peng-Robinson reference model is
//! included in [`cubic`] so the solver layer can be exercised without an
//! external model.
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

/// Print messages with level `Verbosity::Iter` or higher.
#[macro_export]
macro_rules! log_iter {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= Verbosity::Iter {
            println!($($arg)*);
        }
    }
}

/// Print messages with level `Verbosity::Result` or higher.
#[macro_export]
macro_rules! log_result {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= Verbosity::Result {
            println!($($arg)*);
        }
    }
}

mod batch;
pub mod cubic;
mod density;
mod eos;
mod errors;
mod phase_equilibria;
mod pressure_curve;
mod solver;
mod spline;

pub use batch::{
    bubble_point_batch, dew_point_batch, liquid_properties_batch, saturation_batch,
    vapor_properties_batch, BatchOptions, EquilibriumInput, PhaseProperties, PropertiesInput,
    SaturationInput,
};
pub use density::{
    fugacity_liquid, fugacity_vapor, liquid_density, vapor_density, ClassifierOptions,
};
pub use eos::{
    pure_component_index, validate_molefracs, ComponentRecord, Eos, SaturationFallback, RGAS,
};
pub use errors::{EosError, EosResult};
pub use phase_equilibria::{
    bracket_pressure_bubble, bracket_pressure_dew, bubble_point, dew_point, saturation_pressure,
    EquilibriumOptions, EquilibriumResult, PhaseFlag, PressureBracket, SaturationPoint,
    SolverOptions, Verbosity,
};
pub use pressure_curve::{DensityGridSpec, PressureVolumeCurve, SmoothedCurve};
pub use solver::OuterSolver;
