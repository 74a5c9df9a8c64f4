//! Saturation pressure of a pure component via the Maxwell equal-area
//! construction.
use crate::eos::{pure_component_index, Eos};
use crate::errors::{EosError, EosResult};
use crate::log_result;
use crate::phase_equilibria::{SaturationPoint, SolverOptions, Verbosity};
use crate::pressure_curve::{DensityGridSpec, PressureVolumeCurve};
use crate::solver::golden_minimize;
use ndarray::Array1;

const MAX_ITER_AREA: usize = 200;
/// Absolute pressure tolerance of the equal-area minimization in Pa.
const TOL_AREA: f64 = 1e-3;
/// Objective value reported when a trial shift does not produce three roots.
const NO_ROOT_PENALTY: f64 = 1e300;

/// Saturation pressure and coexisting densities of a pure component.
///
/// The pressure shift that balances the signed areas between the three
/// Maxwell roots is found by minimizing the squared area sum over the
/// pressure interval spanned by the local minimum and maximum of the
/// isotherm. A monotonically non-increasing isotherm means the component is
/// supercritical at this temperature; no search is attempted in that case.
pub fn saturation_pressure<E: Eos + ?Sized>(
    eos: &E,
    temperature: f64,
    molefracs: &Array1<f64>,
    grid: &DensityGridSpec,
    options: SolverOptions,
) -> EosResult<SaturationPoint> {
    let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_AREA, TOL_AREA);
    let component = pure_component_index(molefracs)?;
    let name = eos.component_names()[component].clone();

    let curve = PressureVolumeCurve::new(eos, temperature, molefracs, grid)?;
    let p = curve.pressure.as_slice().expect("contiguous pressure data");

    // the first rise of the discrete pressure marks the unstable region
    let rise = match p.windows(2).position(|w| w[1] > w[0]) {
        Some(i) => i,
        None => {
            log_result!(
                verbosity,
                "{} is above its critical point at {} K",
                name,
                temperature
            );
            return Err(EosError::SuperCritical(name, temperature));
        }
    };
    let max_offset = p[rise..]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    let p_local_max = p[rise + max_offset];
    let p_dip_min = p[rise..=rise + max_offset]
        .iter()
        .fold(f64::INFINITY, |acc, &x| acc.min(x));
    let search_min = p[p.len() - 1].max(p_dip_min);

    let smoothed = curve.smoothed();
    let mut area_objective = |shift: f64| -> EosResult<f64> {
        let shifted = smoothed.shifted(shift);
        let roots = shifted.roots();
        if roots.len() < 3 {
            return Ok(NO_ROOT_PENALTY);
        }
        let area_1 = shifted.integral(roots[0], roots[1]);
        let area_2 = shifted.integral(roots[1], roots[2]);
        Ok((area_1 + area_2).powi(2))
    };
    let psat = golden_minimize(
        &mut area_objective,
        search_min * 1.0001,
        p_local_max * 0.9999,
        tol,
        max_iter,
    )?;

    // liquid and vapor densities are the outer Maxwell roots at the
    // converged pressure
    let roots = smoothed.shifted(psat).roots();
    if roots.len() < 3 {
        return Err(EosError::IterationFailed(
            "maxwell construction".to_owned(),
        ));
    }
    log_result!(
        verbosity,
        "saturation pressure of {} at {} K: {} Pa",
        name,
        temperature,
        psat
    );
    Ok(SaturationPoint {
        pressure: psat,
        liquid_density: 1.0 / roots[0],
        vapor_density: 1.0 / roots[2],
    })
}
