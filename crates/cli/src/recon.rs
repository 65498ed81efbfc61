//! `soa run` / `soa validate`: config-driven statement reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use soa_recon::{Pass, ReconConfig, ReconciliationReport, SourceRecord};

use crate::exit_codes::{EXIT_DISCREPANCIES, EXIT_INVALID_CONFIG, EXIT_RUNTIME};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile a statement against invoices, as described by a TOML config
    #[command(after_help = "\
Examples:
  soa run march.soa.toml
  soa run march.soa.toml --json
  soa run march.soa.toml --output report.json
  soa run march.soa.toml --allow-partial")]
    Run {
        /// Path to the .soa.toml config file
        config: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Enable the partial-match pass for every statement line
        #[arg(long)]
        allow_partial: bool,
    },

    /// Validate a config without running
    #[command(after_help = "\
Examples:
  soa validate march.soa.toml")]
    Validate {
        /// Path to the .soa.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run {
            config,
            json,
            output,
            allow_partial,
        } => cmd_run(config, json, output, allow_partial),
        ReconCommands::Validate { config } => cmd_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError {
        code,
        message: msg.into(),
        hint: None,
    }
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot read config {}: {e}", config_path.display())))?;
    ReconConfig::from_toml(&config_str).map_err(CliError::recon)
}

/// Read one side's CSV export. Paths resolve relative to the config file.
fn read_source(base_dir: &Path, section: &str, file: Option<&str>) -> Result<Vec<SourceRecord>, CliError> {
    let file = file.ok_or_else(|| {
        recon_err(EXIT_INVALID_CONFIG, format!("[{section}] has no file"))
            .with_hint(format!("add `file = \"{section}.csv\"` under [{section}]"))
    })?;

    let csv_path = base_dir.join(file);
    let csv_data = std::fs::read_to_string(&csv_path)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot read {}: {e}", csv_path.display())))?;

    let records = soa_recon::read_csv_records(&csv_data).map_err(|e| {
        recon_err(EXIT_RUNTIME, format!("{}: {e}", csv_path.display()))
    })?;
    log::debug!("read {} {} record(s) from {}", records.len(), section, csv_path.display());
    Ok(records)
}

fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    allow_partial: bool,
) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;
    if allow_partial {
        config.allow_partial = true;
    }

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let invoices = read_source(base_dir, "invoices", config.invoices.file.as_deref())?;
    let statement = read_source(base_dir, "statement", config.statement.file.as_deref())?;

    let report = soa_recon::run_source(&config, &invoices, &statement).map_err(CliError::recon)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    let output_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = output_path {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&report);

    if report.is_fully_matched() {
        Ok(())
    } else {
        Err(recon_err(
            EXIT_DISCREPANCIES,
            format!("{} discrepancy(ies) found", report.discrepancies.len()),
        ))
    }
}

/// Human summary to stderr.
fn print_summary(report: &ReconciliationReport) {
    let s = &report.summary;
    eprintln!(
        "recon '{}': {} statement line(s) against {} invoice(s): {} matched, {} discrepancies, {} invoice(s) unmatched",
        report.meta.name, s.total_lines, s.total_invoices, s.matched, s.unmatched_lines, s.unmatched_invoices,
    );

    if !s.matched_by_pass.is_empty() {
        let parts: Vec<String> = Pass::ALL
            .iter()
            .filter_map(|p| {
                s.matched_by_pass
                    .get(&p.to_string())
                    .map(|n| format!("pass {} ({p}): {n}", p.number()))
            })
            .collect();
        eprintln!("  by pass: {}", parts.join(", "));
    }

    for d in &report.discrepancies {
        eprintln!(
            "  line #{} '{}': {} ({}) {}",
            d.statement_line.line_index + 1,
            d.statement_line.reference_text,
            d.discrepancy_type,
            d.severity,
            d.description,
        );
    }
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: recon '{}' (amount tolerance {} / {}, date window {} days, partial {})",
        config.name,
        config.tolerance.amount_absolute,
        config.tolerance.amount_relative,
        config.tolerance.date_window_days,
        if config.allow_partial { "on" } else { "off" },
    );
    Ok(())
}
