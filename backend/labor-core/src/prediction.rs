// src/prediction.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

use crate::error::{LaborError, LaborResult};
use crate::rate_table::{Function, RateTable, SHIFT_HOURS_FIELD};

// --- Volume Input ---

/// Per-function handling volumes for one shift. Functions left out count as
/// zero volume. Iteration is sorted by function name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeVector(BTreeMap<Function, Decimal>);

impl VolumeVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, function: impl Into<Function>, volume: Decimal) -> Self {
        self.0.insert(function.into(), volume);
        self
    }

    /// Sets (or replaces) the volume of one function.
    pub fn set(&mut self, function: impl Into<Function>, volume: Decimal) {
        self.0.insert(function.into(), volume);
    }

    pub fn get(&self, function: &str) -> Decimal {
        self.0.get(function).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(f, v)| (f.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads `function,volume` rows (with header) from CSV.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut volumes = Self::new();
        for row in rdr.deserialize::<VolumeRow>() {
            let row = row?;
            volumes.set(row.function, row.volume);
        }
        Ok(volumes)
    }
}

impl<F: Into<Function>> FromIterator<(F, Decimal)> for VolumeVector {
    fn from_iter<I: IntoIterator<Item = (F, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(f, v)| (f.into(), v)).collect())
    }
}

#[derive(Debug, Deserialize)]
struct VolumeRow {
    function: Function,
    #[serde(with = "rust_decimal::serde::str")]
    volume: Decimal,
}

// --- Prediction Output ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPrediction {
    pub function: Function,
    pub volume: Decimal,
    pub hours_per_unit: Decimal,
    pub labor_hours: Decimal,
    pub fte: Decimal,
}

/// Per-function hours and FTE in rate-table order, plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub functions: Vec<FunctionPrediction>,
    pub total_hours: Decimal,
    pub total_fte: Decimal,
    pub shift_hours: Decimal,
}

impl PredictionResult {
    pub fn get(&self, function: &str) -> Option<&FunctionPrediction> {
        self.functions.iter().find(|p| p.function == function)
    }

    /// Display copy with every figure rounded to `dp` decimal places.
    pub fn rounded(&self, dp: u32) -> Self {
        Self {
            functions: self
                .functions
                .iter()
                .map(|p| FunctionPrediction {
                    function: p.function.clone(),
                    volume: p.volume,
                    hours_per_unit: p.hours_per_unit,
                    labor_hours: p.labor_hours.round_dp(dp),
                    fte: p.fte.round_dp(dp),
                })
                .collect(),
            total_hours: self.total_hours.round_dp(dp),
            total_fte: self.total_fte.round_dp(dp),
            shift_hours: self.shift_hours,
        }
    }
}

/// Converts volumes into labor hours and FTE for every function in `table`.
///
/// Fails without computing anything if a volume is negative or names a
/// function the table does not know. Volumes are checked in function-name
/// order, so the same input always reports the same error. A volume too large
/// to multiply out is reported as `InvalidVolume`.
pub fn predict(volumes: &VolumeVector, table: &RateTable) -> LaborResult<PredictionResult> {
    for (function, volume) in volumes.iter() {
        if !table.contains(function) {
            debug!("Rejecting volumes: unknown function '{}'", function);
            return Err(LaborError::UnknownFunction {
                function: function.to_string(),
            });
        }
        if volume < Decimal::ZERO {
            debug!("Rejecting volumes: negative volume {} for '{}'", volume, function);
            return Err(LaborError::InvalidVolume {
                function: function.to_string(),
                volume,
            });
        }
    }

    let shift_hours = table.get_shift_hours();
    let mut functions = Vec::with_capacity(table.len());
    let mut total_hours = Decimal::ZERO;
    for entry in table.entries() {
        let volume = volumes.get(&entry.function);
        let too_large = || {
            debug!("Rejecting volumes: {} for '{}' overflows", volume, entry.function);
            LaborError::InvalidVolume {
                function: entry.function.clone(),
                volume,
            }
        };
        let labor_hours = volume
            .checked_mul(entry.hours_per_unit)
            .ok_or_else(too_large)?;
        let fte = labor_hours.checked_div(shift_hours).ok_or_else(too_large)?;
        total_hours = total_hours.checked_add(labor_hours).ok_or_else(too_large)?;
        functions.push(FunctionPrediction {
            function: entry.function.clone(),
            volume,
            hours_per_unit: entry.hours_per_unit,
            labor_hours,
            fte,
        });
    }

    let total_fte = total_hours.checked_div(shift_hours).ok_or_else(|| {
        LaborError::invalid_rate(
            SHIFT_HOURS_FIELD,
            shift_hours,
            "total hours per shift exceed the representable range",
        )
    })?;
    Ok(PredictionResult {
        functions,
        total_hours,
        total_fte,
        shift_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_table::RatePreset;
    use rust_decimal_macros::dec;

    fn two_function_table() -> RateTable {
        RateTable::new(
            dec!(7.0),
            vec![("Receiving", dec!(0.0252)), ("Case Picking", dec!(0.00667))],
        )
        .unwrap()
    }

    #[test]
    fn concrete_two_function_scenario() {
        let volumes = VolumeVector::new()
            .with("Receiving", dec!(250))
            .with("Case Picking", dec!(9900));
        let result = predict(&volumes, &two_function_table()).unwrap();

        assert_eq!(result.get("Receiving").unwrap().labor_hours, dec!(6.3));
        assert_eq!(result.get("Case Picking").unwrap().labor_hours, dec!(66.033));
        assert_eq!(result.total_hours, dec!(72.333));
        assert_eq!(result.total_fte.round_dp(3), dec!(10.333));
    }

    #[test]
    fn all_zero_volumes_give_zero_totals() {
        let table = RatePreset::Standard.table();
        let volumes: VolumeVector = table
            .get_functions()
            .into_iter()
            .map(|f| (f.to_string(), Decimal::ZERO))
            .collect();
        let result = predict(&volumes, &table).unwrap();
        assert_eq!(result.total_hours, Decimal::ZERO);
        assert_eq!(result.total_fte, Decimal::ZERO);
        assert_eq!(result.functions.len(), 8);
    }

    #[test]
    fn missing_functions_count_as_zero_and_order_follows_table() {
        let table = RatePreset::Standard.table();
        let volumes = VolumeVector::new().with("Loading", dec!(480));
        let result = predict(&volumes, &table).unwrap();

        let order: Vec<&str> = result.functions.iter().map(|p| p.function.as_str()).collect();
        assert_eq!(order, table.get_functions());
        assert_eq!(result.total_hours, dec!(12));
        assert_eq!(result.get("Receiving").unwrap().labor_hours, Decimal::ZERO);
    }

    #[test]
    fn labor_hours_are_exact_products() {
        let table = RatePreset::Standard.table();
        let volumes = VolumeVector::new()
            .with("Putaway", dec!(220))
            .with("Unloading", dec!(375))
            .with("Layer Picking", dec!(2500));
        let result = predict(&volumes, &table).unwrap();
        for p in &result.functions {
            assert_eq!(p.labor_hours, volumes.get(&p.function) * table.get_rate(&p.function).unwrap());
        }
        assert_eq!(result.total_fte, result.total_hours / result.shift_hours);
    }

    #[test]
    fn increasing_a_volume_increases_totals() {
        let table = two_function_table();
        let base = predict(&VolumeVector::new().with("Receiving", dec!(100)), &table).unwrap();
        let more = predict(&VolumeVector::new().with("Receiving", dec!(101)), &table).unwrap();
        assert!(more.total_hours > base.total_hours);
        assert!(more.total_fte > base.total_fte);
    }

    #[test]
    fn negative_volume_is_rejected() {
        let volumes = VolumeVector::new()
            .with("Receiving", dec!(250))
            .with("Case Picking", dec!(-1));
        let err = predict(&volumes, &two_function_table()).unwrap_err();
        assert_eq!(
            err,
            LaborError::InvalidVolume {
                function: "Case Picking".to_string(),
                volume: dec!(-1)
            }
        );
    }

    #[test]
    fn volume_for_unknown_function_is_rejected() {
        let volumes = VolumeVector::new().with("Cross Dock", dec!(10));
        let err = predict(&volumes, &two_function_table()).unwrap_err();
        assert_eq!(err.kind(), "UnknownFunction");
    }

    #[test]
    fn unknown_and_negative_together_report_the_same_error_every_time() {
        let volumes = VolumeVector::new()
            .with("Receiving", dec!(-1))
            .with("Cross Dock", dec!(1));
        let table = two_function_table();
        let first = predict(&volumes, &table).unwrap_err();
        assert_eq!(first.kind(), "UnknownFunction");
        for _ in 0..50 {
            assert_eq!(predict(&volumes.clone(), &table).unwrap_err(), first);
        }
    }

    #[test]
    fn overflowing_volume_is_rejected_not_panicking() {
        let table = RateTable::new(dec!(7.0), vec![("Full Pallet", dec!(2))]).unwrap();
        let volumes = VolumeVector::new().with("Full Pallet", Decimal::MAX);
        let err = predict(&volumes, &table).unwrap_err();
        assert_eq!(
            err,
            LaborError::InvalidVolume {
                function: "Full Pallet".to_string(),
                volume: Decimal::MAX
            }
        );
    }

    #[test]
    fn overflowing_total_is_rejected_not_panicking() {
        let table = RateTable::new(
            dec!(7.0),
            vec![("Unloading", dec!(1)), ("Loading", dec!(1))],
        )
        .unwrap();
        let volumes = VolumeVector::new()
            .with("Unloading", Decimal::MAX)
            .with("Loading", Decimal::MAX);
        let err = predict(&volumes, &table).unwrap_err();
        assert_eq!(err.kind(), "InvalidVolume");
    }

    #[test]
    fn rounded_copy_leaves_canonical_result_untouched() {
        let volumes = VolumeVector::new()
            .with("Receiving", dec!(250))
            .with("Case Picking", dec!(9900));
        let result = predict(&volumes, &two_function_table()).unwrap();
        let display = result.rounded(2);
        assert_eq!(display.total_hours, dec!(72.33));
        assert_eq!(display.total_fte, dec!(10.33));
        assert_eq!(result.total_hours, dec!(72.333));
    }

    #[test]
    fn volumes_load_from_csv() {
        let csv = "function,volume\nReceiving,250\nCase Picking, 9900\n";
        let volumes = VolumeVector::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes.get("Case Picking"), dec!(9900));
        assert_eq!(volumes.get("Loading"), Decimal::ZERO);
    }
}
