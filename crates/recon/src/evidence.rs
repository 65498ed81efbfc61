use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::model::{Discrepancy, MatchedPair, ReconSummary};

/// Compute summary statistics from a run's matched pairs and discrepancies.
/// Per-currency totals saturate at the `Decimal` range.
pub fn compute_summary(
    total_lines: usize,
    total_invoices: usize,
    matched: &[MatchedPair],
    discrepancies: &[Discrepancy],
) -> ReconSummary {
    let mut matched_by_pass: BTreeMap<String, usize> = BTreeMap::new();
    let mut matched_amount_by_currency: BTreeMap<String, Decimal> = BTreeMap::new();

    for m in matched {
        *matched_by_pass.entry(m.pass.to_string()).or_insert(0) += 1;
        let total = matched_amount_by_currency
            .entry(m.line.currency.to_ascii_uppercase())
            .or_insert(Decimal::ZERO);
        *total = total.saturating_add(m.line.amount);
    }

    let mut discrepancies_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut discrepancies_by_severity: BTreeMap<String, usize> = BTreeMap::new();

    for d in discrepancies {
        *discrepancies_by_type.entry(d.discrepancy_type.to_string()).or_insert(0) += 1;
        *discrepancies_by_severity.entry(d.severity.to_string()).or_insert(0) += 1;
    }

    ReconSummary {
        total_lines,
        total_invoices,
        matched: matched.len(),
        unmatched_lines: discrepancies.len(),
        unmatched_invoices: total_invoices.saturating_sub(matched.len()),
        matched_by_pass,
        discrepancies_by_type,
        discrepancies_by_severity,
        highest_severity: discrepancies.iter().map(|d| d.severity).max(),
        matched_amount_by_currency,
    }
}
