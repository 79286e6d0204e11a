// src/lib.rs
//! Shift labor planning: converts handling volumes into labor hours and FTE,
//! then estimates overtime or voluntary time off against a staffing level.
//!
//! The engine is a set of pure functions over an immutable [`RateTable`];
//! callers own every result and pass it back in for allocation.

pub mod error;
pub mod overtime;
pub mod prediction;
pub mod rate_table;
pub mod report;
pub mod vto;

pub use error::{LaborError, LaborResult, RateTableLoadError};
pub use overtime::{
    allocate_overtime, allocate_overtime_total, OvertimeAllocation, OvertimeBreakdown,
    OvertimePolicy,
};
pub use prediction::{predict, FunctionPrediction, PredictionResult, VolumeVector};
pub use rate_table::{Function, Observation, RateEntry, RatePreset, RateTable, ShiftConfig};
pub use vto::{allocate_vto, VtoBreakdown};
