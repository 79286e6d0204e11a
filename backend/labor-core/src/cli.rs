// src/cli.rs
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use labor_core::{
    allocate_overtime, allocate_overtime_total, allocate_vto, predict, report, OvertimePolicy,
    RatePreset, VolumeVector,
};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

use crate::config::TableSource;

#[derive(Debug, Parser)]
#[command(name = "labor-core", version, about = "Shift labor, overtime and VTO planner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve(ServeArgs),
    /// Predict labor hours and FTE per function
    Predict(PredictArgs),
    /// Estimate overtime above an FTE threshold
    Overtime(OvertimeArgs),
    /// Estimate voluntary time off for a headcount
    Vto(VtoArgs),
    /// List the built-in rate presets
    Presets,
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve(ServeArgs::default())
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct TableArgs {
    /// JSON rate table file (overrides LABOR_RATE_TABLE_PATH and presets)
    #[arg(long = "rates")]
    pub rates: Option<PathBuf>,
    /// Built-in rate preset: standard or short-shift
    #[arg(long)]
    pub preset: Option<RatePreset>,
    /// Productive hours per shift, overriding the table's value
    #[arg(long)]
    pub shift_hours: Option<Decimal>,
}

impl TableArgs {
    pub fn into_source(self) -> TableSource {
        TableSource {
            path: self.rates,
            preset: self.preset,
            shift_hours: self.shift_hours,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct VolumeArgs {
    /// CSV file with a `function,volume` header
    #[arg(long = "volumes")]
    pub volumes_csv: Option<PathBuf>,
    /// A single volume, e.g. --volume "Case Picking=9900" (repeatable)
    #[arg(long = "volume", value_parser = parse_volume_pair)]
    pub volume: Vec<(String, Decimal)>,
}

impl VolumeArgs {
    /// CSV rows first, then individual `--volume` values on top.
    pub fn load(&self) -> Result<VolumeVector> {
        let mut volumes = match &self.volumes_csv {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Opening volumes file {} failed", path.display()))?;
                VolumeVector::from_csv_reader(file)
                    .with_context(|| format!("Reading volumes from {} failed", path.display()))?
            }
            None => VolumeVector::new(),
        };
        for (function, volume) in &self.volume {
            volumes.set(function.clone(), *volume);
        }
        if volumes.is_empty() {
            bail!("No volumes given; use --volumes <csv> or --volume \"Function=value\"");
        }
        Ok(volumes)
    }
}

pub fn parse_volume_pair(s: &str) -> Result<(String, Decimal), String> {
    let (function, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FUNCTION=VALUE, got '{}'", s))?;
    let function = function.trim();
    if function.is_empty() {
        return Err(format!("missing function name in '{}'", s));
    }
    let volume = value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid volume '{}': {}", value.trim(), e))?;
    Ok((function.to_string(), volume))
}

#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Decimal places for displayed figures
    #[arg(long, default_value_t = report::DEFAULT_DECIMALS)]
    pub decimals: u32,
    /// Print the canonical (unrounded) result as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// Also write the displayed table as CSV
    #[arg(long)]
    pub csv_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub table: TableArgs,
}

#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub table: TableArgs,
    #[command(flatten)]
    pub volumes: VolumeArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Clone, Args)]
pub struct OvertimeArgs {
    #[command(flatten)]
    pub table: TableArgs,
    #[command(flatten)]
    pub volumes: VolumeArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Available staffing in FTE
    #[arg(long)]
    pub threshold: Decimal,
    /// Allocation policy: proportional or sequential
    #[arg(long, default_value_t = OvertimePolicy::Proportional)]
    pub policy: OvertimePolicy,
    /// Report only the hours-level total, without a per-function breakdown
    #[arg(long)]
    pub hours_only: bool,
}

#[derive(Debug, Clone, Args)]
pub struct VtoArgs {
    #[command(flatten)]
    pub table: TableArgs,
    #[command(flatten)]
    pub volumes: VolumeArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Number of people scheduled
    #[arg(long)]
    pub headcount: u32,
}

// --- One-shot Commands ---

pub fn run_oneshot(command: Command, env_source: TableSource) -> Result<()> {
    match command {
        Command::Serve(_) => bail!("serve is not a one-shot command"),
        Command::Presets => {
            print!("{}", render_presets());
            Ok(())
        }
        Command::Predict(args) => {
            let table = env_source.overridden_by(args.table.into_source()).load()?;
            let volumes = args.volumes.load()?;
            let result = predict(&volumes, &table)?;
            info!("Predicted {} hours / {} FTE", result.total_hours, result.total_fte);
            if args.output.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render_summary_text(&result, args.output.decimals));
            }
            if let Some(path) = &args.output.csv_out {
                let file = File::create(path)
                    .with_context(|| format!("Creating {} failed", path.display()))?;
                report::write_summary_csv(&result, args.output.decimals, file)?;
                info!("Summary written to {}", path.display());
            }
            Ok(())
        }
        Command::Overtime(args) => {
            let table = env_source.overridden_by(args.table.into_source()).load()?;
            let volumes = args.volumes.load()?;
            let result = predict(&volumes, &table)?;
            if args.hours_only {
                let hours = allocate_overtime_total(&result, args.threshold)?;
                if args.output.json {
                    println!("{}", serde_json::json!({ "overtime_hours": hours }));
                } else {
                    println!("Overtime hours: {}", hours.round_dp(args.output.decimals));
                }
                return Ok(());
            }
            let breakdown = allocate_overtime(&result, args.threshold, args.policy, &table)?;
            if args.output.json {
                println!("{}", serde_json::to_string_pretty(&breakdown)?);
            } else {
                print!("{}", report::render_overtime_text(&breakdown, args.output.decimals));
            }
            if let Some(path) = &args.output.csv_out {
                let file = File::create(path)
                    .with_context(|| format!("Creating {} failed", path.display()))?;
                report::write_overtime_csv(&breakdown, args.output.decimals, file)?;
                info!("Overtime breakdown written to {}", path.display());
            }
            Ok(())
        }
        Command::Vto(args) => {
            let table = env_source.overridden_by(args.table.into_source()).load()?;
            let volumes = args.volumes.load()?;
            let result = predict(&volumes, &table)?;
            let vto = allocate_vto(&result, args.headcount)?;
            if args.output.json {
                println!("{}", serde_json::to_string_pretty(&vto)?);
            } else {
                println!("{}", report::vto_headline(&vto, args.output.decimals));
            }
            Ok(())
        }
    }
}

fn render_presets() -> String {
    let mut out = String::new();
    for preset in RatePreset::ALL {
        let table = preset.table();
        out.push_str(&format!(
            "{} ({} productive hours per shift)\n",
            preset,
            table.get_shift_hours()
        ));
        for entry in table.entries() {
            out.push_str(&format!("  {:<16} {}\n", entry.function, entry.hours_per_unit));
        }
    }
    out
}
