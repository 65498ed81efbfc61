use crate::aggregate::build_report;
use crate::config::{MatchOptions, ReconConfig};
use crate::error::ReconError;
use crate::mapper::{map_invoices, map_statement_lines};
use crate::model::{ReconInput, ReconciliationReport};
use crate::pipeline::run_passes;
use crate::source::SourceRecord;

/// Reconcile one batch with the default tolerances. Matching itself cannot
/// fail, so neither can this.
pub fn reconcile(input: &ReconInput, allow_partial: bool) -> ReconciliationReport {
    let options = MatchOptions {
        allow_partial,
        ..MatchOptions::default()
    };
    execute(&options, input)
}

/// Validate the options, then reconcile.
pub fn run(options: &MatchOptions, input: &ReconInput) -> Result<ReconciliationReport, ReconError> {
    options.validate()?;
    Ok(execute(options, input))
}

/// Validate the config, map both source batches into canonical shape, then
/// reconcile. Any malformed record aborts the run before matching starts.
pub fn run_source(
    config: &ReconConfig,
    invoice_records: &[SourceRecord],
    statement_records: &[SourceRecord],
) -> Result<ReconciliationReport, ReconError> {
    config.validate()?;

    let input = ReconInput {
        invoices: map_invoices(invoice_records, &config.invoices)?,
        statement_lines: map_statement_lines(statement_records, &config.statement)?,
    };

    run(&config.match_options(), &input)
}

fn execute(options: &MatchOptions, input: &ReconInput) -> ReconciliationReport {
    log::info!(
        "reconciling '{}': {} statement line(s) against {} invoice(s){}",
        options.name,
        input.statement_lines.len(),
        input.invoices.len(),
        if options.allow_partial { ", partial matching enabled" } else { "" }
    );

    let pipeline = run_passes(&input.statement_lines, &input.invoices, options);
    let report = build_report(options, input, &pipeline);

    log::info!(
        "reconciled '{}': {} matched, {} discrepancies, {} invoice(s) unmatched",
        options.name,
        report.summary.matched,
        report.summary.unmatched_lines,
        report.summary.unmatched_invoices
    );

    report
}
