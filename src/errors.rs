use thiserror::Error;

/// Error type for improperly defined inputs and convergence problems.
///
/// Numerical outcomes that have a well-defined degraded meaning (no physical
/// root at the requested pressure, an assumed ideal gas) are communicated
/// through [`crate::PhaseFlag`] and NaN values instead of this enum.
#[derive(Error, Debug, Clone)]
pub enum EosError {
    #[error("{0}")]
    Error(String),
    #[error("`{0}` did not converge within the maximum number of iterations.")]
    NotConverged(String),
    #[error("`{0}` encountered illegal values during the iteration.")]
    IterationFailed(String),
    #[error("Equation of state is initialized for {0} components while the input specifies {1} components.")]
    IncompatibleComponents(usize, usize),
    #[error("Invalid composition: {0}")]
    InvalidComposition(String),
    #[error("No pressure bracket with a sign change was found within {0} iterations.")]
    BracketExhausted(usize),
    #[error("Component `{0}` is supercritical at {1} K.")]
    SuperCritical(String, f64),
}

/// Convenience type for `Result<T, EosError>`.
pub type EosResult<T> = Result<T, EosError>;
