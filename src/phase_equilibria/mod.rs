use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

mod bracket;
mod bubble_dew;
mod inner_loop;
mod saturation;

pub use bracket::{bracket_pressure_bubble, bracket_pressure_dew, PressureBracket};
pub use bubble_dew::{bubble_point, dew_point, EquilibriumOptions};
pub(crate) use inner_loop::{solve_liquid_molefracs, solve_vapor_molefracs};
pub use saturation::saturation_pressure;

/// Level of detail in the iteration output.
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Do not print output.
    #[default]
    None,
    /// Print information about the success or failure of the iteration.
    Result,
    /// Print a detailed output for every iteration.
    Iter,
}

/// Options for the various iterative solvers.
///
/// If the values are [None], solver specific default values are used.
#[derive(Copy, Clone, Debug, Default)]
pub struct SolverOptions {
    /// Maximum number of iterations.
    pub max_iter: Option<usize>,
    /// Tolerance.
    pub tol: Option<f64>,
    /// Iteration output indicated by the [Verbosity] enum.
    pub verbosity: Verbosity,
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn unwrap_or(self, max_iter: usize, tol: f64) -> (usize, f64, Verbosity) {
        (
            self.max_iter.unwrap_or(max_iter),
            self.tol.unwrap_or(tol),
            self.verbosity,
        )
    }
}

/// Classification of the fluid a density root belongs to.
///
/// `NoFluid` and `IdealGasAssumed` mark degraded outcomes: the associated
/// density is NaN or a contingency fallback, never a physically solved root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PhaseFlag {
    Vapor = 0,
    Liquid = 1,
    CriticalFluid = 2,
    NoFluid = 3,
    IdealGasAssumed = 4,
}

impl PhaseFlag {
    /// A root that can be refined and used as a vapor density.
    pub fn is_vapor_like(&self) -> bool {
        matches!(self, PhaseFlag::Vapor | PhaseFlag::CriticalFluid)
    }

    /// A root that can be refined and used as a liquid density.
    pub fn is_liquid_like(&self) -> bool {
        matches!(self, PhaseFlag::Liquid | PhaseFlag::CriticalFluid)
    }
}

impl fmt::Display for PhaseFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseFlag::Vapor => "vapor",
            PhaseFlag::Liquid => "liquid",
            PhaseFlag::CriticalFluid => "critical fluid",
            PhaseFlag::NoFluid => "no fluid",
            PhaseFlag::IdealGasAssumed => "ideal gas assumed",
        };
        write!(f, "{}", name)
    }
}

/// A converged (or degraded) bubble- or dew-point solution.
#[derive(Debug, Clone)]
pub struct EquilibriumResult {
    /// Equilibrium pressure in Pa.
    pub pressure: f64,
    /// Mole fractions of the phase that was solved for.
    pub molefracs: Array1<f64>,
    /// Classification of the vapor phase root.
    pub vapor_flag: PhaseFlag,
    /// Classification of the liquid phase root.
    pub liquid_flag: PhaseFlag,
    /// Value of the mass-balance objective at the reported pressure.
    pub residual: f64,
}

impl EquilibriumResult {
    /// A NaN-filled result used when a calculation fails for a single point.
    pub fn failed(components: usize) -> Self {
        Self {
            pressure: f64::NAN,
            molefracs: Array1::from_elem(components, f64::NAN),
            vapor_flag: PhaseFlag::NoFluid,
            liquid_flag: PhaseFlag::NoFluid,
            residual: f64::NAN,
        }
    }
}

/// Saturation state of a pure component.
#[derive(Debug, Clone, Copy)]
pub struct SaturationPoint {
    /// Saturation pressure in Pa.
    pub pressure: f64,
    /// Molar density of the saturated liquid in mol/m³.
    pub liquid_density: f64,
    /// Molar density of the saturated vapor in mol/m³.
    pub vapor_density: f64,
}
