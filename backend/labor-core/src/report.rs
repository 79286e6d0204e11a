// src/report.rs
//! Display helpers. Everything here works on rounded copies; the canonical
//! results passed in are never modified.
use serde::Serialize;
use std::fmt::Write as _;
use std::io;

use crate::overtime::OvertimeBreakdown;
use crate::prediction::PredictionResult;
use crate::vto::VtoBreakdown;

pub const DEFAULT_DECIMALS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub function: String,
    pub labor_hours: String,
    pub fte: String,
}

/// One row per function followed by a "Total" row.
pub fn summary_rows(result: &PredictionResult, dp: u32) -> Vec<SummaryRow> {
    let display = result.rounded(dp);
    let mut rows: Vec<SummaryRow> = display
        .functions
        .iter()
        .map(|p| SummaryRow {
            function: p.function.clone(),
            labor_hours: p.labor_hours.to_string(),
            fte: p.fte.to_string(),
        })
        .collect();
    rows.push(SummaryRow {
        function: "Total".to_string(),
        labor_hours: display.total_hours.to_string(),
        fte: display.total_fte.to_string(),
    });
    rows
}

pub fn overtime_headline(breakdown: &OvertimeBreakdown, dp: u32) -> String {
    if breakdown.is_empty() {
        "No overtime workers needed based on this input.".to_string()
    } else {
        format!(
            "You may need {} overtime FTEs ({} overtime hours, {} policy).",
            breakdown.expected_overtime_fte.round_dp(dp),
            breakdown.total_overtime_hours.round_dp(dp),
            breakdown.policy
        )
    }
}

pub fn vto_headline(vto: &VtoBreakdown, dp: u32) -> String {
    if vto.is_empty() {
        format!("No surplus capacity with a headcount of {}.", vto.headcount)
    } else {
        let display = vto.rounded(dp);
        format!(
            "{} extra FTE: {} VTO hours in total, {} hours per person across {} people.",
            display.extra_fte, display.total_vto_hours, display.vto_hours_per_person, vto.headcount
        )
    }
}

// --- Plain Text ---

pub fn render_summary_text(result: &PredictionResult, dp: u32) -> String {
    let rows = summary_rows(result, dp);
    let width = rows.iter().map(|r| r.function.len()).max().unwrap_or(0).max("Function".len());
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>12}  {:>10}", "Function", "Labor Hours", "FTE");
    for row in &rows {
        if row.function == "Total" {
            let _ = writeln!(out, "{}", "-".repeat(width + 26));
        }
        let _ = writeln!(
            out,
            "{:<width$}  {:>12}  {:>10}",
            row.function, row.labor_hours, row.fte
        );
    }
    out
}

pub fn render_overtime_text(breakdown: &OvertimeBreakdown, dp: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", overtime_headline(breakdown, dp));
    if breakdown.is_empty() {
        return out;
    }
    let display = breakdown.rounded(dp);
    let width = display
        .allocations
        .iter()
        .map(|a| a.function.len())
        .max()
        .unwrap_or(0)
        .max("Function".len());
    let _ = writeln!(out, "{:<width$}  {:>22}", "Function", "Overtime Hours Needed");
    for a in &display.allocations {
        let _ = writeln!(out, "{:<width$}  {:>22}", a.function, a.overtime_hours);
    }
    out
}

// --- HTML ---

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_summary_html(result: &PredictionResult, dp: u32) -> String {
    let mut html = String::from(
        "<h2>Prediction Summary</h2><table><tr><th>Function</th><th>Labor Hours</th><th>FTE</th></tr>",
    );
    for row in summary_rows(result, dp) {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&row.function),
            row.labor_hours,
            row.fte
        );
    }
    html.push_str("</table>");
    html
}

pub fn render_overtime_html(breakdown: &OvertimeBreakdown, dp: u32) -> String {
    let mut html = format!(
        "<h2>Overtime Estimation</h2><p>{}</p>",
        escape_html(&overtime_headline(breakdown, dp))
    );
    if !breakdown.is_empty() {
        html.push_str("<table><tr><th>Function</th><th>Overtime Hours Needed</th></tr>");
        for a in breakdown.rounded(dp).allocations {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(&a.function),
                a.overtime_hours
            );
        }
        html.push_str("</table>");
    }
    html
}

pub fn render_vto_html(vto: &VtoBreakdown, dp: u32) -> String {
    format!(
        "<h2>VTO Estimation</h2><p>{}</p>",
        escape_html(&vto_headline(vto, dp))
    )
}

// --- CSV Export ---

pub fn write_summary_csv<W: io::Write>(result: &PredictionResult, dp: u32, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in summary_rows(result, dp) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_overtime_csv<W: io::Write>(
    breakdown: &OvertimeBreakdown,
    dp: u32,
    writer: W,
) -> Result<(), csv::Error> {
    let display = breakdown.rounded(dp);
    let mut wtr = csv::Writer::from_writer(writer);
    // Header is written even when there is nothing to allocate.
    wtr.write_record(["function", "overtime_hours"])?;
    for a in &display.allocations {
        let hours = a.overtime_hours.to_string();
        wtr.write_record([a.function.as_str(), hours.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overtime::{allocate_overtime, OvertimePolicy};
    use crate::prediction::{predict, VolumeVector};
    use crate::rate_table::RateTable;
    use crate::vto::allocate_vto;
    use rust_decimal_macros::dec;

    fn table() -> RateTable {
        RateTable::new(
            dec!(7.0),
            vec![("Receiving", dec!(0.0252)), ("Case Picking", dec!(0.00667))],
        )
        .unwrap()
    }

    fn scenario() -> PredictionResult {
        let volumes = VolumeVector::new()
            .with("Receiving", dec!(250))
            .with("Case Picking", dec!(9900));
        predict(&volumes, &table()).unwrap()
    }

    #[test]
    fn summary_ends_with_total_row() {
        let rows = summary_rows(&scenario(), 2);
        assert_eq!(rows.len(), 3);
        let total = rows.last().unwrap();
        assert_eq!(total.function, "Total");
        assert_eq!(total.labor_hours, "72.33");
        assert_eq!(total.fte, "10.33");
    }

    #[test]
    fn rendering_does_not_round_the_canonical_result() {
        let result = scenario();
        let _ = render_summary_text(&result, 0);
        assert_eq!(result.total_hours, dec!(72.333));
    }

    #[test]
    fn overtime_text_lists_allocations() {
        let result = scenario();
        let breakdown =
            allocate_overtime(&result, dec!(8), OvertimePolicy::Proportional, &table()).unwrap();
        let text = render_overtime_text(&breakdown, 2);
        assert!(text.starts_with("You may need 2.33 overtime FTEs"));
        assert!(text.contains("Case Picking"));
        assert!(text.contains("14.91"));
    }

    #[test]
    fn empty_overtime_has_reassuring_headline() {
        let result = scenario();
        let breakdown =
            allocate_overtime(&result, dec!(40), OvertimePolicy::Sequential, &table()).unwrap();
        assert_eq!(
            overtime_headline(&breakdown, 2),
            "No overtime workers needed based on this input."
        );
    }

    #[test]
    fn html_escapes_function_names() {
        let table = RateTable::new(dec!(7.0), vec![("Pick <A&B>", dec!(1))]).unwrap();
        let result = predict(&VolumeVector::new().with("Pick <A&B>", dec!(1)), &table).unwrap();
        let html = render_summary_html(&result, 2);
        assert!(html.contains("Pick &lt;A&amp;B&gt;"));
    }

    #[test]
    fn vto_headline_reports_per_person_hours() {
        let vto = allocate_vto(&scenario(), 15).unwrap();
        let headline = vto_headline(&vto, 2);
        assert!(headline.contains("2.18 hours per person"));
    }

    #[test]
    fn overtime_csv_has_header_and_rows() {
        let result = scenario();
        let breakdown =
            allocate_overtime(&result, dec!(8), OvertimePolicy::Sequential, &table()).unwrap();
        let mut buf = Vec::new();
        write_overtime_csv(&breakdown, 2, &mut buf).unwrap();
        let csv = String::from_utf8(buf).unwrap();
        assert_eq!(csv, "function,overtime_hours\nCase Picking,16.33\n");
    }
}
