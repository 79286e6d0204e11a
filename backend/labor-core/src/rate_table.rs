// src/rate_table.rs
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{LaborError, LaborResult, RateTableLoadError};

// --- Core Data Structures ---

/// Name of a warehouse activity ("Receiving", "Case Picking", ...).
pub type Function = String;

pub const SHIFT_HOURS_FIELD: &str = "shift_hours";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub function: Function,
    pub hours_per_unit: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftConfig {
    pub productive_hours_per_shift: Decimal,
}

/// A baseline measurement used to derive a rate: `observed_hours` of labor
/// were spent handling `observed_volume` units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub function: Function,
    pub observed_hours: Decimal,
    pub observed_volume: Decimal,
}

/// On-disk / on-wire shape of a rate table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTableDocument {
    pub shift_hours: Decimal,
    pub rates: Vec<RateEntry>,
}

/// Immutable function → hours-per-unit mapping plus the productive hours of
/// one shift. Declared order is preserved and drives sequential allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    shift: ShiftConfig,
    entries: Vec<RateEntry>,
    index: HashMap<Function, usize>,
}

impl RateTable {
    pub fn new<F>(shift_hours: Decimal, rates: Vec<(F, Decimal)>) -> LaborResult<Self>
    where
        F: Into<Function>,
    {
        if shift_hours <= Decimal::ZERO {
            return Err(LaborError::invalid_rate(
                SHIFT_HOURS_FIELD,
                shift_hours,
                "productive hours per shift must be strictly positive",
            ));
        }
        if rates.is_empty() {
            return Err(LaborError::invalid_rate(
                "rates",
                Decimal::ZERO,
                "a rate table needs at least one function",
            ));
        }

        let mut entries = Vec::with_capacity(rates.len());
        let mut index = HashMap::with_capacity(rates.len());
        for (function, hours_per_unit) in rates {
            let function: Function = function.into();
            if hours_per_unit <= Decimal::ZERO {
                return Err(LaborError::invalid_rate(
                    &function,
                    hours_per_unit,
                    "hours per unit must be strictly positive",
                ));
            }
            if index.insert(function.clone(), entries.len()).is_some() {
                return Err(LaborError::invalid_rate(
                    &function,
                    hours_per_unit,
                    "function is listed more than once",
                ));
            }
            entries.push(RateEntry {
                function,
                hours_per_unit,
            });
        }

        debug!(
            "Rate table built: {} functions, {} productive hours per shift",
            entries.len(),
            shift_hours
        );
        Ok(Self {
            shift: ShiftConfig {
                productive_hours_per_shift: shift_hours,
            },
            entries,
            index,
        })
    }

    /// Builds a table whose rates are `observed_hours / observed_volume`.
    pub fn calibrate(shift_hours: Decimal, observations: Vec<Observation>) -> LaborResult<Self> {
        let mut rates = Vec::with_capacity(observations.len());
        for obs in observations {
            if obs.observed_volume <= Decimal::ZERO {
                return Err(LaborError::invalid_rate(
                    &obs.function,
                    obs.observed_volume,
                    "observed volume must be strictly positive",
                ));
            }
            let rate = obs.observed_hours / obs.observed_volume;
            rates.push((obs.function, rate));
        }
        Self::new(shift_hours, rates)
    }

    pub fn from_document(doc: RateTableDocument) -> LaborResult<Self> {
        let rates: Vec<(Function, Decimal)> = doc
            .rates
            .into_iter()
            .map(|e| (e.function, e.hours_per_unit))
            .collect();
        Self::new(doc.shift_hours, rates)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RateTableLoadError> {
        let doc: RateTableDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(doc)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, RateTableLoadError> {
        let json = std::fs::read_to_string(path).map_err(|source| RateTableLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Same rates, different productive hours per shift.
    pub fn with_shift_hours(&self, shift_hours: Decimal) -> LaborResult<Self> {
        let rates: Vec<(Function, Decimal)> = self
            .entries
            .iter()
            .map(|e| (e.function.clone(), e.hours_per_unit))
            .collect();
        Self::new(shift_hours, rates)
    }

    pub fn get_rate(&self, function: &str) -> LaborResult<Decimal> {
        self.index
            .get(function)
            .map(|&i| self.entries[i].hours_per_unit)
            .ok_or_else(|| LaborError::UnknownFunction {
                function: function.to_string(),
            })
    }

    pub fn get_functions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.function.as_str()).collect()
    }

    pub fn get_shift_hours(&self) -> Decimal {
        self.shift.productive_hours_per_shift
    }

    pub fn shift_config(&self) -> ShiftConfig {
        self.shift
    }

    pub fn contains(&self, function: &str) -> bool {
        self.index.contains_key(function)
    }

    /// Entries in declared order.
    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_document(&self) -> RateTableDocument {
        RateTableDocument {
            shift_hours: self.get_shift_hours(),
            rates: self.entries.clone(),
        }
    }
}

// --- Presets ---

// Rates derived from the latest baseline shift (hours / units noted per line).
static STANDARD_RATES: Lazy<Vec<(&'static str, Decimal)>> = Lazy::new(|| {
    vec![
        ("Receiving", dec!(0.0252)),      // 6.3 / 250
        ("Case Picking", dec!(0.00667)),  // 66 / 9900
        ("Putaway", dec!(0.05273)),       // 11.6 / 220
        ("Replenishment", dec!(0.06667)), // 4.0 / 60
        ("Full Pallet", dec!(0.05)),      // 11 / 220
        ("Loading", dec!(0.025)),         // 12 / 480
        ("Layer Picking", dec!(0.004)),   // 10 / 2500
        ("Unloading", dec!(0.02507)),     // 9.4 / 375
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatePreset {
    /// Eight-function table at 7.0 productive hours.
    #[default]
    Standard,
    /// Same rates at 6.8 productive hours.
    ShortShift,
}

impl RatePreset {
    pub const ALL: [RatePreset; 2] = [RatePreset::Standard, RatePreset::ShortShift];

    pub fn name(&self) -> &'static str {
        match self {
            RatePreset::Standard => "standard",
            RatePreset::ShortShift => "short-shift",
        }
    }

    pub fn shift_hours(&self) -> Decimal {
        match self {
            RatePreset::Standard => dec!(7.0),
            RatePreset::ShortShift => dec!(6.8),
        }
    }

    pub fn table(&self) -> RateTable {
        let rates: Vec<(Function, Decimal)> = STANDARD_RATES
            .iter()
            .map(|(f, r)| (f.to_string(), *r))
            .collect();
        // Preset literals are positive and distinct.
        match RateTable::new(self.shift_hours(), rates) {
            Ok(table) => table,
            Err(e) => unreachable!("preset {} is invalid: {}", self.name(), e),
        }
    }
}

impl FromStr for RatePreset {
    type Err = RateTableLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(RatePreset::Standard),
            "short-shift" | "short_shift" => Ok(RatePreset::ShortShift),
            other => Err(RateTableLoadError::UnknownPreset(other.to_string())),
        }
    }
}

impl fmt::Display for RatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_preserves_declared_order() {
        let table = RateTable::new(
            dec!(7.0),
            vec![("Unloading", dec!(0.02)), ("Receiving", dec!(0.03))],
        )
        .unwrap();
        assert_eq!(table.get_functions(), vec!["Unloading", "Receiving"]);
        assert_eq!(table.get_rate("Receiving").unwrap(), dec!(0.03));
        assert_eq!(table.get_shift_hours(), dec!(7.0));
    }

    #[test]
    fn unknown_function_is_rejected() {
        let table = RatePreset::Standard.table();
        let err = table.get_rate("Forklift Dancing").unwrap_err();
        assert_eq!(
            err,
            LaborError::UnknownFunction {
                function: "Forklift Dancing".to_string()
            }
        );
    }

    #[test]
    fn zero_shift_hours_is_invalid_rate() {
        let err = RateTable::new(dec!(0), vec![("Receiving", dec!(0.0252))]).unwrap_err();
        assert!(matches!(err, LaborError::InvalidRate { ref field, .. } if field == SHIFT_HOURS_FIELD));
    }

    #[test]
    fn negative_and_zero_rates_are_invalid() {
        for bad in [dec!(0), dec!(-0.01)] {
            let err = RateTable::new(dec!(7.0), vec![("Loading", bad)]).unwrap_err();
            assert_eq!(err.kind(), "InvalidRate");
        }
    }

    #[test]
    fn duplicate_function_is_invalid_rate() {
        let err = RateTable::new(
            dec!(7.0),
            vec![("Loading", dec!(0.025)), ("Loading", dec!(0.03))],
        )
        .unwrap_err();
        assert!(matches!(err, LaborError::InvalidRate { ref field, .. } if field == "Loading"));
    }

    #[test]
    fn calibrate_derives_rates_from_observations() {
        let table = RateTable::calibrate(
            dec!(7.0),
            vec![
                Observation {
                    function: "Receiving".into(),
                    observed_hours: dec!(6.3),
                    observed_volume: dec!(250),
                },
                Observation {
                    function: "Loading".into(),
                    observed_hours: dec!(12),
                    observed_volume: dec!(480),
                },
            ],
        )
        .unwrap();
        assert_eq!(table.get_rate("Receiving").unwrap(), dec!(0.0252));
        assert_eq!(table.get_rate("Loading").unwrap(), dec!(0.025));
    }

    #[test]
    fn calibrate_rejects_zero_volume() {
        let err = RateTable::calibrate(
            dec!(7.0),
            vec![Observation {
                function: "Putaway".into(),
                observed_hours: dec!(11.6),
                observed_volume: dec!(0),
            }],
        )
        .unwrap_err();
        assert_eq!(err.kind(), "InvalidRate");
    }

    #[test]
    fn json_document_accepts_numbers_and_strings() {
        let table = RateTable::from_json_str(
            r#"{"shift_hours": "6.8", "rates": [
                {"function": "Receiving", "hours_per_unit": "0.0252"},
                {"function": "Loading", "hours_per_unit": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(table.get_shift_hours(), dec!(6.8));
        assert_eq!(table.get_functions(), vec!["Receiving", "Loading"]);
        assert_eq!(table.get_rate("Loading").unwrap(), dec!(1));
    }

    #[test]
    fn json_document_is_validated() {
        let err = RateTable::from_json_str(
            r#"{"shift_hours": "0", "rates": [{"function": "Receiving", "hours_per_unit": "0.0252"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RateTableLoadError::Invalid(LaborError::InvalidRate { .. })));
    }

    #[test]
    fn presets_share_rates_but_not_shift_hours() {
        let standard = RatePreset::Standard.table();
        let short = RatePreset::ShortShift.table();
        assert_eq!(standard.len(), 8);
        assert_eq!(standard.entries(), short.entries());
        assert_eq!(standard.get_shift_hours(), dec!(7.0));
        assert_eq!(short.get_shift_hours(), dec!(6.8));
        assert_eq!("short-shift".parse::<RatePreset>().unwrap(), RatePreset::ShortShift);
        assert!("night".parse::<RatePreset>().is_err());
    }

    #[test]
    fn with_shift_hours_overrides_only_shift() {
        let table = RatePreset::Standard.table().with_shift_hours(dec!(6.8)).unwrap();
        assert_eq!(table, RatePreset::ShortShift.table());
    }
}
