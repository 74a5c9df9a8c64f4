use crate::errors::{EosError, EosResult};
use indexmap::IndexMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Universal gas constant in J / (mol K).
pub const RGAS: f64 = 8.31446261815324;

const MOLEFRAC_SUM_TOL: f64 = 1e-8;

/// Capability required from an equation of state.
///
/// Every method is a pure function of its arguments. Densities are molar
/// densities in mol/m³, pressures in Pa, temperatures in K. The solver layer
/// borrows the model, it never clones it.
pub trait Eos: Send + Sync {
    /// Number of components the model is parametrized for.
    fn components(&self) -> usize;

    /// Pressure in Pa at the given molar density, temperature and composition.
    fn pressure(&self, density: f64, temperature: f64, molefracs: &Array1<f64>) -> f64;

    /// Highest physically meaningful molar density of the mixture for the
    /// given maximum packing fraction.
    fn max_density(&self, molefracs: &Array1<f64>, temperature: f64, max_packing: f64) -> f64;

    /// Residual chemical potential divided by RT for every component. The
    /// fugacity coefficient of component i is `exp(mu[i])`.
    fn chemical_potential(
        &self,
        pressure: f64,
        density: f64,
        molefracs: &Array1<f64>,
        temperature: f64,
    ) -> Array1<f64>;

    /// Component names, used in diagnostics and for fallback-table lookups.
    fn component_names(&self) -> Vec<String>;
}

/// Check a mole-fraction vector against the model before any numerical work.
pub fn validate_molefracs<E: Eos + ?Sized>(eos: &E, molefracs: &Array1<f64>) -> EosResult<()> {
    if molefracs.len() != eos.components() {
        return Err(EosError::IncompatibleComponents(
            eos.components(),
            molefracs.len(),
        ));
    }
    if molefracs.iter().any(|&x| x < 0.0 || !x.is_finite()) {
        return Err(EosError::InvalidComposition(format!(
            "mole fractions must be finite and non-negative, got {}",
            molefracs
        )));
    }
    let total = molefracs.sum();
    if (total - 1.0).abs() > MOLEFRAC_SUM_TOL {
        return Err(EosError::InvalidComposition(format!(
            "mole fractions sum to {} instead of 1",
            total
        )));
    }
    Ok(())
}

/// Index of the single nonzero entry of a pure-component composition.
///
/// Saturation calculations are only defined for pure components; any second
/// nonzero entry is rejected here rather than deep inside the solver.
pub fn pure_component_index(molefracs: &Array1<f64>) -> EosResult<usize> {
    let nonzero: Vec<usize> = molefracs
        .iter()
        .enumerate()
        .filter(|(_, &x)| x != 0.0)
        .map(|(i, _)| i)
        .collect();
    match nonzero.as_slice() {
        [i] => Ok(*i),
        _ => Err(EosError::InvalidComposition(format!(
            "a pure component is required, but {} entries of {} are nonzero",
            nonzero.len(),
            molefracs
        ))),
    }
}

/// Pure-substance record with the constants the reference model and the
/// starting-pressure heuristics need.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ComponentRecord {
    pub name: String,
    /// critical temperature in Kelvin
    pub tc: f64,
    /// critical pressure in Pascal
    pub pc: f64,
    /// acentric factor
    pub acentric_factor: f64,
    /// molar weight in g/mol
    pub molarweight: f64,
}

impl ComponentRecord {
    pub fn new(name: &str, tc: f64, pc: f64, acentric_factor: f64, molarweight: f64) -> Self {
        Self {
            name: name.to_owned(),
            tc,
            pc,
            acentric_factor,
            molarweight,
        }
    }
}

impl std::fmt::Display for ComponentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ComponentRecord({}, tc={} K, pc={} Pa, acentric factor={})",
            self.name, self.tc, self.pc, self.acentric_factor
        )
    }
}

/// Placeholder saturation pressures for components that are supercritical at
/// the requested temperature.
///
/// The values are approximate stand-ins used only to seed the outer pressure
/// iteration of mixture calculations; they are not computed from the model.
/// The table is injectable so callers can extend or replace the defaults. A
/// missing entry fails the calculation instead of silently substituting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaturationFallback {
    table: IndexMap<String, f64>,
}

impl SaturationFallback {
    /// An empty table; every supercritical component fails the point.
    pub fn empty() -> Self {
        Self {
            table: IndexMap::new(),
        }
    }

    /// The documented placeholder pressures in Pa.
    pub fn with_defaults() -> Self {
        let mut table = IndexMap::new();
        table.insert("CO2".to_owned(), 1.0377e7);
        table.insert("N2".to_owned(), 7.377e6);
        table.insert("CH4".to_owned(), 6.377e6);
        table.insert("C2H6".to_owned(), 7.377e6);
        Self { table }
    }

    pub fn insert(&mut self, name: &str, pressure: f64) {
        self.table.insert(name.to_owned(), pressure);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.table.get(name).copied()
    }
}

impl Default for SaturationFallback {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubic::PengRobinson;
    use ndarray::arr1;

    fn model() -> PengRobinson {
        PengRobinson::new(
            vec![
                ComponentRecord::new("propane", 369.96, 4.25e6, 0.153, 44.0962),
                ComponentRecord::new("butane", 425.2, 3.8e6, 0.199, 58.123),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn molefrac_validation() {
        let eos = model();
        assert!(validate_molefracs(&eos, &arr1(&[0.4, 0.6])).is_ok());
        assert!(matches!(
            validate_molefracs(&eos, &arr1(&[1.0])),
            Err(EosError::IncompatibleComponents(2, 1))
        ));
        assert!(validate_molefracs(&eos, &arr1(&[0.7, 0.6])).is_err());
        assert!(validate_molefracs(&eos, &arr1(&[-0.1, 1.1])).is_err());
    }

    #[test]
    fn pure_index() {
        assert_eq!(pure_component_index(&arr1(&[0.0, 1.0])).unwrap(), 1);
        assert!(pure_component_index(&arr1(&[0.5, 0.5])).is_err());
        assert!(pure_component_index(&arr1(&[0.0, 0.0])).is_err());
    }

    #[test]
    fn fallback_table() {
        let mut table = SaturationFallback::default();
        assert_eq!(table.get("N2"), Some(7.377e6));
        assert_eq!(table.get("He"), None);
        table.insert("He", 2.0e5);
        assert_eq!(table.get("He"), Some(2.0e5));

        let json = r#"{"CO2": 1.0377e7}"#;
        let parsed: SaturationFallback = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.get("CO2"), Some(1.0377e7));
    }
}
