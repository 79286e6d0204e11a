// src/overtime.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{LaborError, LaborResult};
use crate::prediction::PredictionResult;
use crate::rate_table::{Function, RateTable, SHIFT_HOURS_FIELD};

// --- Policies ---

/// How an aggregate overtime need is spread back across functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OvertimePolicy {
    /// Each function gets overtime in proportion to its share of total hours.
    #[default]
    Proportional,
    /// The threshold is capacity consumed in table order; the first function
    /// that cannot be covered, and every one after it, runs on overtime.
    #[serde(alias = "cascade")]
    Sequential,
}

impl OvertimePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            OvertimePolicy::Proportional => "proportional",
            OvertimePolicy::Sequential => "sequential",
        }
    }
}

impl FromStr for OvertimePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proportional" => Ok(OvertimePolicy::Proportional),
            "sequential" | "cascade" => Ok(OvertimePolicy::Sequential),
            other => Err(format!(
                "unknown overtime policy '{}' (expected proportional or sequential)",
                other
            )),
        }
    }
}

impl fmt::Display for OvertimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- Breakdown ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeAllocation {
    pub function: Function,
    pub overtime_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeBreakdown {
    pub policy: OvertimePolicy,
    pub threshold: Decimal,
    pub expected_overtime_fte: Decimal,
    pub total_overtime_hours: Decimal,
    /// Only functions with a positive allocation, in table order.
    pub allocations: Vec<OvertimeAllocation>,
}

impl OvertimeBreakdown {
    fn none(policy: OvertimePolicy, threshold: Decimal) -> Self {
        Self {
            policy,
            threshold,
            expected_overtime_fte: Decimal::ZERO,
            total_overtime_hours: Decimal::ZERO,
            allocations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn get(&self, function: &str) -> Decimal {
        self.allocations
            .iter()
            .find(|a| a.function == function)
            .map(|a| a.overtime_hours)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn rounded(&self, dp: u32) -> Self {
        Self {
            policy: self.policy,
            threshold: self.threshold,
            expected_overtime_fte: self.expected_overtime_fte.round_dp(dp),
            total_overtime_hours: self.total_overtime_hours.round_dp(dp),
            allocations: self
                .allocations
                .iter()
                .map(|a| OvertimeAllocation {
                    function: a.function.clone(),
                    overtime_hours: a.overtime_hours.round_dp(dp),
                })
                .collect(),
        }
    }
}

fn check_threshold(threshold: Decimal) -> LaborResult<()> {
    if threshold < Decimal::ZERO {
        debug!("Rejecting negative threshold {}", threshold);
        return Err(LaborError::InvalidThreshold { threshold });
    }
    Ok(())
}

/// `threshold * shift_hours`, rejecting thresholds too large to convert.
fn threshold_hours(threshold: Decimal, shift_hours: Decimal) -> LaborResult<Decimal> {
    threshold.checked_mul(shift_hours).ok_or_else(|| {
        debug!("Rejecting threshold {}: overflows at {} hours per shift", threshold, shift_hours);
        LaborError::InvalidThreshold { threshold }
    })
}

/// Splits the overtime needed above `threshold` FTE across functions.
///
/// Returns an empty breakdown when the predicted FTE fits under the threshold.
/// `result` must come from `table`; a result computed at other shift hours is
/// rejected as `InvalidRate`.
pub fn allocate_overtime(
    result: &PredictionResult,
    threshold: Decimal,
    policy: OvertimePolicy,
    table: &RateTable,
) -> LaborResult<OvertimeBreakdown> {
    check_threshold(threshold)?;
    let shift_hours = table.get_shift_hours();
    if result.shift_hours != shift_hours {
        return Err(LaborError::invalid_rate(
            SHIFT_HOURS_FIELD,
            result.shift_hours,
            "prediction was computed with different shift hours than the rate table",
        ));
    }
    if result.total_fte <= threshold || result.total_hours.is_zero() {
        return Ok(OvertimeBreakdown::none(policy, threshold));
    }

    let allocations = match policy {
        OvertimePolicy::Proportional => proportional(result, threshold, shift_hours)?,
        OvertimePolicy::Sequential => sequential(result, threshold, shift_hours)?,
    };
    let mut total_overtime_hours = Decimal::ZERO;
    for a in &allocations {
        total_overtime_hours = total_overtime_hours
            .checked_add(a.overtime_hours)
            .ok_or(LaborError::InvalidThreshold { threshold })?;
    }

    Ok(OvertimeBreakdown {
        policy,
        threshold,
        expected_overtime_fte: result.total_fte - threshold,
        total_overtime_hours,
        allocations,
    })
}

fn proportional(
    result: &PredictionResult,
    threshold: Decimal,
    shift_hours: Decimal,
) -> LaborResult<Vec<OvertimeAllocation>> {
    let overflow = || LaborError::InvalidThreshold { threshold };
    let overtime_hours_total = (result.total_fte - threshold)
        .checked_mul(shift_hours)
        .ok_or_else(overflow)?;
    let mut allocations = Vec::new();
    for p in result.functions.iter().filter(|p| p.labor_hours > Decimal::ZERO) {
        let overtime_hours = p
            .labor_hours
            .checked_div(result.total_hours)
            .and_then(|share| share.checked_mul(overtime_hours_total))
            .ok_or_else(overflow)?;
        if overtime_hours > Decimal::ZERO {
            allocations.push(OvertimeAllocation {
                function: p.function.clone(),
                overtime_hours,
            });
        }
    }
    Ok(allocations)
}

fn sequential(
    result: &PredictionResult,
    threshold: Decimal,
    shift_hours: Decimal,
) -> LaborResult<Vec<OvertimeAllocation>> {
    // Remaining capacity, tracked in hours so the cascade stays exact.
    let mut available = threshold_hours(threshold, shift_hours)?;
    let mut allocations = Vec::new();
    for p in &result.functions {
        if available >= p.labor_hours {
            available -= p.labor_hours;
            continue;
        }
        let overtime_hours = p.labor_hours - available;
        available = Decimal::ZERO;
        if overtime_hours > Decimal::ZERO {
            allocations.push(OvertimeAllocation {
                function: p.function.clone(),
                overtime_hours,
            });
        }
    }
    Ok(allocations)
}

/// Overtime at the hours level only: `max(0, totalHours - threshold * shiftHours)`.
pub fn allocate_overtime_total(result: &PredictionResult, threshold: Decimal) -> LaborResult<Decimal> {
    check_threshold(threshold)?;
    let available = threshold_hours(threshold, result.shift_hours)?;
    // Both sides are non-negative, so the difference cannot overflow.
    let overtime = result.total_hours - available;
    Ok(overtime.max(Decimal::ZERO))
}
