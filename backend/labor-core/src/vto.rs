// src/vto.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LaborError, LaborResult};
use crate::prediction::PredictionResult;
use crate::rate_table::SHIFT_HOURS_FIELD;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtoBreakdown {
    pub headcount: u32,
    pub extra_fte: Decimal,
    pub total_vto_hours: Decimal,
    pub vto_hours_per_person: Decimal,
}

impl VtoBreakdown {
    fn none(headcount: u32) -> Self {
        Self {
            headcount,
            extra_fte: Decimal::ZERO,
            total_vto_hours: Decimal::ZERO,
            vto_hours_per_person: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_vto_hours.is_zero()
    }

    pub fn rounded(&self, dp: u32) -> Self {
        Self {
            headcount: self.headcount,
            extra_fte: self.extra_fte.round_dp(dp),
            total_vto_hours: self.total_vto_hours.round_dp(dp),
            vto_hours_per_person: self.vto_hours_per_person.round_dp(dp),
        }
    }
}

/// Surplus capacity when `headcount` people are scheduled against the
/// predicted need. Zero when the headcount does not exceed the predicted FTE.
///
/// Only a shift length too large to multiply out can fail, as `InvalidRate`.
pub fn allocate_vto(result: &PredictionResult, headcount: u32) -> LaborResult<VtoBreakdown> {
    let staffed = Decimal::from(headcount);
    if headcount == 0 || staffed <= result.total_fte {
        return Ok(VtoBreakdown::none(headcount));
    }

    let extra_fte = staffed - result.total_fte;
    let total_vto_hours = extra_fte.checked_mul(result.shift_hours).ok_or_else(|| {
        LaborError::invalid_rate(
            SHIFT_HOURS_FIELD,
            result.shift_hours,
            "surplus hours exceed the representable range",
        )
    })?;
    Ok(VtoBreakdown {
        headcount,
        extra_fte,
        total_vto_hours,
        vto_hours_per_person: total_vto_hours / staffed,
    })
}
