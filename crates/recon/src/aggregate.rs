use crate::classify::classify_line;
use crate::config::MatchOptions;
use crate::evidence::compute_summary;
use crate::matcher::match_evidence;
use crate::model::{
    MatchResult, MatchedPair, ReconInput, ReconMeta, ReconciliationReport, UnmatchedInvoice, UnmatchedLine,
};
use crate::pipeline::PipelineOutput;

/// Assemble the report from the pipeline's per-line outcomes. Leftover lines
/// go through the classifier; every line lands in exactly one of matched or
/// discrepancies, every invoice in exactly one of matched or unmatched, all
/// in input order.
pub fn build_report(options: &MatchOptions, input: &ReconInput, pipeline: &PipelineOutput) -> ReconciliationReport {
    let lines = &input.statement_lines;
    let invoices = &input.invoices;

    let mut results = Vec::with_capacity(lines.len());
    let mut matched = Vec::new();
    let mut unmatched_lines = Vec::new();
    let mut discrepancies = Vec::new();

    for (line_index, (line, outcome)) in lines.iter().zip(&pipeline.outcomes).enumerate() {
        match outcome.claim.and_then(|c| invoices.get(c.invoice_index).map(|inv| (c, inv))) {
            Some((claim, invoice)) => {
                results.push(MatchResult::Matched {
                    invoice_number: invoice.invoice_number.clone(),
                    pass: claim.pass.number(),
                    confidence: claim.pass.confidence(),
                });
                matched.push(MatchedPair {
                    line_index,
                    line: line.clone(),
                    invoice_index: claim.invoice_index,
                    invoice: invoice.clone(),
                    pass: claim.pass,
                    pass_number: claim.pass.number(),
                    confidence: claim.pass.confidence(),
                    evidence: match_evidence(line, invoice),
                });
            }
            None => {
                results.push(MatchResult::Unmatched);
                unmatched_lines.push(UnmatchedLine {
                    line_index,
                    line: line.clone(),
                });
                discrepancies.push(classify_line(
                    line_index,
                    line,
                    invoices,
                    &pipeline.claimed_by,
                    outcome.ambiguity.as_ref(),
                    options,
                ));
            }
        }
    }

    let unmatched_invoices: Vec<UnmatchedInvoice> = invoices
        .iter()
        .zip(&pipeline.claimed_by)
        .enumerate()
        .filter(|(_, (_, claim))| claim.is_none())
        .map(|(invoice_index, (invoice, _))| UnmatchedInvoice {
            invoice_index,
            invoice: invoice.clone(),
        })
        .collect();

    let summary = compute_summary(lines.len(), invoices.len(), &matched, &discrepancies);

    ReconciliationReport {
        meta: ReconMeta {
            name: options.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            allow_partial: options.allow_partial,
            tolerance: options.tolerance.clone(),
        },
        summary,
        results,
        matched,
        unmatched_lines,
        unmatched_invoices,
        discrepancies,
    }
}
