//! Implementation of the Peng-Robinson equation of state.
//!
//! This module acts as a reference on how an equation of state is plugged
//! into the solver layer: a model only has to implement the [`Eos`]
//! capability. The equations follow the standard form of the Peng-Robinson
//! model with van-der-Waals one-fluid mixing rules and binary interaction
//! parameters.
use crate::eos::{ComponentRecord, Eos, RGAS};
use crate::errors::{EosError, EosResult};
use ndarray::{Array1, Array2};
use std::f64::consts::SQRT_2;
use std::fmt;

/// Peng-Robinson parameters for one or more substances.
pub struct PengRobinson {
    /// critical temperature in Kelvin
    tc: Array1<f64>,
    a: Array1<f64>,
    b: Array1<f64>,
    /// binary interaction parameters
    k_ij: Array2<f64>,
    kappa: Array1<f64>,
    /// list of pure component records
    records: Vec<ComponentRecord>,
}

impl fmt::Display for PengRobinson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.records
            .iter()
            .try_for_each(|r| writeln!(f, "{}", r))?;
        writeln!(f, "\nk_ij:\n{}", self.k_ij)
    }
}

impl PengRobinson {
    /// Create a new equation of state from component records and an optional
    /// matrix of binary interaction parameters.
    pub fn new(records: Vec<ComponentRecord>, k_ij: Option<Array2<f64>>) -> EosResult<Self> {
        let n = records.len();
        if n == 0 {
            return Err(EosError::Error(
                "at least one component record is required".to_owned(),
            ));
        }
        let k_ij = k_ij.unwrap_or_else(|| Array2::zeros([n; 2]));
        if k_ij.shape() != [n, n] {
            return Err(EosError::IncompatibleComponents(n, k_ij.shape()[0]));
        }

        let mut tc = Array1::zeros(n);
        let mut a = Array1::zeros(n);
        let mut b = Array1::zeros(n);
        let mut kappa = Array1::zeros(n);
        for (i, r) in records.iter().enumerate() {
            tc[i] = r.tc;
            a[i] = 0.45724 * RGAS.powi(2) * r.tc.powi(2) / r.pc;
            b[i] = 0.07780 * RGAS * r.tc / r.pc;
            kappa[i] = 0.37464 + (1.54226 - 0.26992 * r.acentric_factor) * r.acentric_factor;
        }

        Ok(Self {
            tc,
            a,
            b,
            k_ij,
            kappa,
            records,
        })
    }

    /// Temperature dependent attraction parameters of the pure components.
    fn a_t(&self, temperature: f64) -> Array1<f64> {
        let alpha = (&self.kappa
            * self.tc.mapv(|tc| 1.0 - (temperature / tc).sqrt())
            + 1.0)
            .mapv(|x| x.powi(2));
        &self.a * &alpha
    }

    /// One-fluid mixing rules: (a_mix, b_mix) at the given temperature.
    fn mix_parameters(&self, temperature: f64, molefracs: &Array1<f64>) -> (f64, f64) {
        let ak = self.a_t(temperature);
        let mut a_mix = 0.0;
        for i in 0..ak.len() {
            for j in 0..ak.len() {
                a_mix +=
                    (ak[i] * ak[j]).sqrt() * molefracs[i] * molefracs[j] * (1.0 - self.k_ij[(i, j)]);
            }
        }
        let b_mix = (molefracs * &self.b).sum();
        (a_mix, b_mix)
    }
}

impl Eos for PengRobinson {
    fn components(&self) -> usize {
        self.records.len()
    }

    fn pressure(&self, density: f64, temperature: f64, molefracs: &Array1<f64>) -> f64 {
        let (a, b) = self.mix_parameters(temperature, molefracs);
        let v = 1.0 / density;
        RGAS * temperature / (v - b) - a / (v * v + 2.0 * b * v - b * b)
    }

    fn max_density(&self, molefracs: &Array1<f64>, _temperature: f64, max_packing: f64) -> f64 {
        let b = (molefracs * &self.b).sum();
        // covolume packing fraction is rho*b/4, capped below the pole at v = b
        (4.0 * max_packing).min(0.9) / b
    }

    fn chemical_potential(
        &self,
        pressure: f64,
        density: f64,
        molefracs: &Array1<f64>,
        temperature: f64,
    ) -> Array1<f64> {
        let rt = RGAS * temperature;
        let ak = self.a_t(temperature);
        let (a_mix, b_mix) = self.mix_parameters(temperature, molefracs);

        let big_a = a_mix * pressure / (rt * rt);
        let big_b = b_mix * pressure / rt;
        let z = pressure / (density * rt);
        let log_term = ((z + (1.0 + SQRT_2) * big_b) / (z + (1.0 - SQRT_2) * big_b)).ln();

        Array1::from_shape_fn(molefracs.len(), |i| {
            let sum_a: f64 = (0..ak.len())
                .map(|j| molefracs[j] * (ak[i] * ak[j]).sqrt() * (1.0 - self.k_ij[(i, j)]))
                .sum();
            let bi_b = self.b[i] / b_mix;
            bi_b * (z - 1.0)
                - (z - big_b).ln()
                - big_a / (2.0 * SQRT_2 * big_b) * (2.0 * sum_a / a_mix - bi_b) * log_term
        })
    }

    fn component_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    fn records() -> Vec<ComponentRecord> {
        let records = r#"[
            {
                "name": "propane",
                "tc": 369.96,
                "pc": 4250000.0,
                "acentric_factor": 0.153,
                "molarweight": 44.0962
            },
            {
                "name": "butane",
                "tc": 425.2,
                "pc": 3800000.0,
                "acentric_factor": 0.199,
                "molarweight": 58.123
            }
        ]"#;
        serde_json::from_str(records).expect("Unable to parse json.")
    }

    #[test]
    fn ideal_gas_limit() {
        let eos = PengRobinson::new(records(), None).unwrap();
        let x = arr1(&[0.5, 0.5]);
        let rho = 0.01;
        let t = 300.0;
        let p = eos.pressure(rho, t, &x);
        assert_relative_eq!(p, rho * RGAS * t, max_relative = 1e-3);

        let mu = eos.chemical_potential(p, rho, &x, t);
        for &m in mu.iter() {
            assert!(m.abs() < 1e-3, "ln phi should vanish at low density: {}", m);
        }
    }

    #[test]
    fn covolume_limits_density() {
        let eos = PengRobinson::new(records(), None).unwrap();
        let x = arr1(&[1.0, 0.0]);
        let b = 0.07780 * RGAS * 369.96 / 4.25e6;
        let max_rho = eos.max_density(&x, 300.0, 0.65);
        assert_relative_eq!(max_rho, 0.9 / b, max_relative = 1e-12);
        // pressure stays finite and strongly repulsive at the ceiling
        let p = eos.pressure(max_rho, 300.0, &x);
        assert!(p.is_finite() && p > 1e7);
    }

    #[test]
    fn subcritical_isotherm_is_multivalued() {
        let eos = PengRobinson::new(records(), None).unwrap();
        let x = arr1(&[1.0, 0.0]);
        // the propane isotherm at 300 K has a van-der-Waals loop: the
        // pressure at an intermediate density drops below the pressure at a
        // lower (vapor-like) density
        let p_vapor = eos.pressure(400.0, 300.0, &x);
        let p_loop = eos.pressure(6000.0, 300.0, &x);
        assert!(p_loop < p_vapor);
    }
}
