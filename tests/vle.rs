//! End-to-end vapor-liquid equilibrium scenarios on the Peng-Robinson
//! reference model.
use approx::assert_relative_eq;
use ndarray::arr1;
use vlequil::cubic::PengRobinson;
use vlequil::{
    bracket_pressure_bubble, bubble_point, bubble_point_batch, dew_point, saturation_batch,
    saturation_pressure, BatchOptions, ClassifierOptions, ComponentRecord, DensityGridSpec,
    EosError, EquilibriumInput, EquilibriumOptions, PhaseFlag, PressureVolumeCurve,
    SaturationInput, SolverOptions, fugacity_liquid, fugacity_vapor, Verbosity,
};

fn propane_butane() -> PengRobinson {
    PengRobinson::new(
        vec![
            ComponentRecord::new("propane", 369.96, 4.25e6, 0.153, 44.0962),
            ComponentRecord::new("butane", 425.2, 3.8e6, 0.199, 58.123),
        ],
        None,
    )
    .unwrap()
}

/// A coarser grid than the production default, sufficient for the reference
/// model and much faster for the full nested iteration.
fn grid() -> DensityGridSpec {
    DensityGridSpec {
        density_increment: 20.0,
        max_volume_spacing: 2e-3,
        ..DensityGridSpec::default()
    }
}

fn options() -> EquilibriumOptions {
    EquilibriumOptions {
        grid: grid(),
        ..EquilibriumOptions::default()
    }
}

#[test]
fn saturation_pressure_of_propane() {
    let eos = propane_butane();
    let pure = arr1(&[1.0, 0.0]);
    let sat = saturation_pressure(&eos, 300.0, &pure, &grid(), SolverOptions::default()).unwrap();

    assert!(sat.pressure > 5e5 && sat.pressure < 1.6e6);
    assert!(sat.vapor_density > 0.0);
    assert!(sat.liquid_density > 10.0 * sat.vapor_density);

    // equal-area property at the converged pressure
    let curve = PressureVolumeCurve::new(&eos, 300.0, &pure, &grid()).unwrap();
    let shifted = curve.smoothed_shifted(sat.pressure);
    let roots = shifted.roots();
    assert!(roots.len() >= 3);
    let area_1 = shifted.integral(roots[0], roots[1]);
    let area_2 = shifted.integral(roots[1], roots[2]);
    assert!(area_1.abs() > 0.0 && area_2.abs() > 0.0);
    assert!((area_1 + area_2).abs() <= 1e-3 * (area_1.abs() + area_2.abs()));

    // the construction is idempotent
    let again = saturation_pressure(&eos, 300.0, &pure, &grid(), SolverOptions::default()).unwrap();
    assert_relative_eq!(sat.pressure, again.pressure, max_relative = 1e-4);
}

#[test]
fn supercritical_component_has_no_saturation_pressure() {
    let eos = propane_butane();
    let pure = arr1(&[1.0, 0.0]);
    // propane is above its critical temperature at 400 K
    let result = saturation_pressure(&eos, 400.0, &pure, &grid(), SolverOptions::default());
    assert!(matches!(result, Err(EosError::SuperCritical(_, _))));

    // the batch driver degrades the point to NaN instead of failing
    let outputs = saturation_batch(
        &eos,
        &[
            SaturationInput {
                temperature: 300.0,
                molefracs: pure.clone(),
            },
            SaturationInput {
                temperature: 400.0,
                molefracs: pure.clone(),
            },
        ],
        &BatchOptions {
            equilibrium: options(),
            ..BatchOptions::default()
        },
    )
    .unwrap();
    assert!(outputs[0].pressure.is_finite());
    assert!(outputs[1].pressure.is_nan());
    assert!(outputs[1].liquid_density.is_nan());
}

#[test]
fn bubble_point_of_dilute_propane_in_butane() {
    let eos = propane_butane();
    let liquid = arr1(&[0.0128, 0.9872]);
    let opts = options();
    let result = bubble_point(&eos, 353.0, &liquid, None, None, &opts).unwrap();

    let psat_propane =
        saturation_pressure(&eos, 353.0, &arr1(&[1.0, 0.0]), &opts.grid, SolverOptions::default())
            .unwrap()
            .pressure;
    let psat_butane =
        saturation_pressure(&eos, 353.0, &arr1(&[0.0, 1.0]), &opts.grid, SolverOptions::default())
            .unwrap()
            .pressure;

    // the bubble pressure lies between the pure saturation pressures and the
    // vapor is enriched in the light component
    assert!(result.pressure.is_finite());
    assert!(result.pressure > psat_butane && result.pressure < psat_propane);
    assert!(result.molefracs[0] > liquid[0]);
    assert_relative_eq!(result.molefracs.sum(), 1.0, max_relative = 1e-10);
    assert_eq!(result.vapor_flag, PhaseFlag::Vapor);
    assert_eq!(result.liquid_flag, PhaseFlag::Liquid);
    assert!(result.residual.abs() < 1e-3);

    // fixed-point stability: one more substitution step barely moves the
    // converged vapor composition
    let (phil, _, _) = fugacity_liquid(
        &eos,
        result.pressure,
        353.0,
        &liquid,
        &opts.grid,
        &opts.classifier,
        Verbosity::None,
    )
    .unwrap();
    let (phiv, _, _) = fugacity_vapor(
        &eos,
        result.pressure,
        353.0,
        &result.molefracs,
        &opts.grid,
        &opts.classifier,
        Verbosity::None,
    )
    .unwrap();
    let update = &liquid * &phil / &phiv;
    let update = &update / update.sum();
    for i in 0..2 {
        assert!((update[i] - result.molefracs[i]).abs() < 1e-3);
    }
}

#[test]
fn dew_point_of_dilute_propane_in_butane() {
    let eos = propane_butane();
    let vapor = arr1(&[0.0128, 0.9872]);
    let opts = options();
    let result = dew_point(&eos, 353.0, &vapor, None, None, &opts).unwrap();

    let psat_propane =
        saturation_pressure(&eos, 353.0, &arr1(&[1.0, 0.0]), &opts.grid, SolverOptions::default())
            .unwrap()
            .pressure;
    let psat_butane =
        saturation_pressure(&eos, 353.0, &arr1(&[0.0, 1.0]), &opts.grid, SolverOptions::default())
            .unwrap()
            .pressure;

    assert!(result.pressure.is_finite());
    assert!(result.pressure > psat_butane && result.pressure < psat_propane);
    // the coexisting liquid holds less of the light component than the vapor
    assert!(result.molefracs[0] < vapor[0]);
    assert_eq!(result.vapor_flag, PhaseFlag::Vapor);
    assert_eq!(result.liquid_flag, PhaseFlag::Liquid);
    assert!(result.residual.abs() < 1e-3);
}

#[test]
fn pressure_bracket_endpoints_have_opposite_signs() {
    let eos = propane_butane();
    let liquid = arr1(&[0.0128, 0.9872]);
    let (bracket, vapor) = bracket_pressure_bubble(
        &eos,
        353.0,
        &liquid,
        &arr1(&[0.05, 0.95]),
        1000.0,
        &grid(),
        &ClassifierOptions::default(),
        SolverOptions::default(),
        SolverOptions::default(),
    )
    .unwrap();

    assert!(bracket.objective_lower * bracket.objective_upper < 0.0);
    assert!(bracket.lower < bracket.upper);
    assert!(bracket.guess > bracket.lower && bracket.guess < bracket.upper);
    assert_relative_eq!(vapor.sum(), 1.0, max_relative = 1e-10);
}

#[test]
fn batch_preserves_order_and_isolates_failures() {
    let eos = propane_butane();
    let inputs = vec![
        // a regular binary bubble point
        EquilibriumInput {
            temperature: 353.0,
            molefracs: arr1(&[0.0128, 0.9872]),
            pressure_guess: None,
        },
        // both components supercritical and no fallback entry: the point
        // fails, the batch must not
        EquilibriumInput {
            temperature: 500.0,
            molefracs: arr1(&[0.5, 0.5]),
            pressure_guess: None,
        },
        // a pure component degenerates to the saturation calculation
        EquilibriumInput {
            temperature: 300.0,
            molefracs: arr1(&[1.0, 0.0]),
            pressure_guess: None,
        },
    ];
    let results = bubble_point_batch(
        &eos,
        &inputs,
        &BatchOptions {
            equilibrium: options(),
            ..BatchOptions::default()
        },
    )
    .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].pressure.is_finite());
    assert_eq!(results[0].vapor_flag, PhaseFlag::Vapor);

    assert!(results[1].pressure.is_nan());
    assert!(results[1].molefracs.iter().all(|x| x.is_nan()));
    assert_eq!(results[1].vapor_flag, PhaseFlag::NoFluid);
    assert_eq!(results[1].liquid_flag, PhaseFlag::NoFluid);

    let sat = saturation_pressure(
        &eos,
        300.0,
        &arr1(&[1.0, 0.0]),
        &options().grid,
        SolverOptions::default(),
    )
    .unwrap();
    assert_relative_eq!(results[2].pressure, sat.pressure, max_relative = 1e-10);
    assert_eq!(results[2].residual, 0.0);

    // malformed input aborts the whole batch up front
    let invalid = vec![EquilibriumInput {
        temperature: 353.0,
        molefracs: arr1(&[0.7, 0.7]),
        pressure_guess: None,
    }];
    assert!(bubble_point_batch(&eos, &invalid, &BatchOptions::default()).is_err());
}
