use rust_decimal::Decimal;

use crate::config::{MatchOptions, ToleranceConfig};
use crate::matcher::{
    amount_bound, amount_delta, amount_within_tolerance, date_offset, exact_document_match,
    grouped_document_match, normalized_document_match, same_currency,
};
use crate::model::{Discrepancy, DiscrepancyType, Invoice, LineRef, Pass, Severity, StatementLine};
use crate::pipeline::{partial_enabled, Ambiguity};

/// Fixed severity per discrepancy type.
pub fn severity_for(discrepancy_type: DiscrepancyType) -> Severity {
    match discrepancy_type {
        DiscrepancyType::NoInvoiceFound => Severity::High,
        DiscrepancyType::AmountMismatch => Severity::High,
        DiscrepancyType::DateMismatch => Severity::Low,
        DiscrepancyType::MultipleCandidates => Severity::Medium,
        DiscrepancyType::CurrencyMismatch => Severity::Blocking,
    }
}

/// Whether a statement reference points at an invoice, exactly or after
/// normalization. With `grouped`, any segment of a multi-document reference
/// counts too, as it does in the partial pass.
pub fn refers_to(reference: &str, invoice_number: &str, grouped: bool) -> bool {
    exact_document_match(reference, invoice_number)
        || normalized_document_match(reference, invoice_number)
        || (grouped && grouped_document_match(reference, invoice_number))
}

/// Classify one statement line the pipeline left unmatched.
///
/// A pass that saw two or more eligible invoices which are still unclaimed
/// makes the line `multiple_candidates`. Otherwise candidates are the
/// still-unclaimed invoices the reference points at, read with the partial
/// pass's document rule when that pass ran for the line. None at all is
/// `no_invoice_found`; none in the line's currency is `currency_mismatch`;
/// several in the line's currency is `multiple_candidates`. Exactly one goes
/// through the single-candidate checks below.
pub fn classify_line(
    line_index: usize,
    line: &StatementLine,
    invoices: &[Invoice],
    claimed_by: &[Option<usize>],
    ambiguity: Option<&Ambiguity>,
    options: &MatchOptions,
) -> Discrepancy {
    let reference = line.reference_text.trim();
    let partial = partial_enabled(line, options.allow_partial);

    let referenced: Vec<&Invoice> = invoices
        .iter()
        .zip(claimed_by)
        .filter(|(inv, claim)| claim.is_none() && refers_to(reference, &inv.invoice_number, partial))
        .map(|(inv, _)| inv)
        .collect();

    let (discrepancy_type, description, candidates) = if let Some((pass, open)) =
        open_ambiguity(ambiguity, invoices, claimed_by).filter(|(_, open)| open.len() > 1)
    {
        (
            DiscrepancyType::MultipleCandidates,
            format!(
                "pass {} ({}) found {} eligible invoices for reference '{}'; ambiguous lines are never auto-resolved",
                pass.number(),
                pass,
                open.len(),
                reference
            ),
            numbers(&open),
        )
    } else if referenced.is_empty() {
        (
            DiscrepancyType::NoInvoiceFound,
            describe_no_invoice(line, invoices, claimed_by, partial),
            Vec::new(),
        )
    } else {
        let same_ccy: Vec<&Invoice> = referenced
            .iter()
            .copied()
            .filter(|inv| same_currency(&inv.currency, &line.currency))
            .collect();

        match same_ccy.as_slice() {
            [] => (
                DiscrepancyType::CurrencyMismatch,
                format!(
                    "reference '{}' matches {} but the line is in {}",
                    reference,
                    list_with_currency(&referenced),
                    line.currency
                ),
                numbers(&referenced),
            ),
            [invoice] => classify_single(line, invoice, invoices, ambiguity, partial, &options.tolerance),
            several => (
                DiscrepancyType::MultipleCandidates,
                format!(
                    "reference '{}' matches {} unclaimed invoices in {}",
                    reference,
                    several.len(),
                    line.currency
                ),
                numbers(several),
            ),
        }
    };

    Discrepancy {
        statement_line: LineRef {
            line_index,
            reference_text: line.reference_text.clone(),
        },
        discrepancy_type,
        severity: severity_for(discrepancy_type),
        description,
        candidates,
    }
}

/// The recorded ambiguity, narrowed to invoices nobody has claimed since.
fn open_ambiguity<'a>(
    ambiguity: Option<&Ambiguity>,
    invoices: &'a [Invoice],
    claimed_by: &[Option<usize>],
) -> Option<(Pass, Vec<&'a Invoice>)> {
    let amb = ambiguity?;
    let open: Vec<&Invoice> = amb
        .candidates
        .iter()
        .filter(|&&i| matches!(claimed_by.get(i), Some(None)))
        .filter_map(|&i| invoices.get(i))
        .collect();
    Some((amb.pass, open))
}

/// One candidate in the line's currency, checked in order:
///
/// 1. amount outside tolerance: `amount_mismatch`;
/// 2. both dates present and outside the window: `date_mismatch`;
/// 3. a pass saw several eligible invoices (others claimed since):
///    `multiple_candidates`;
/// 4. the partial pass ran but a date is missing: `date_mismatch`;
/// 5. otherwise `amount_mismatch`, a sub-tolerance difference only the
///    partial pass could absorb.
fn classify_single(
    line: &StatementLine,
    invoice: &Invoice,
    invoices: &[Invoice],
    ambiguity: Option<&Ambiguity>,
    partial: bool,
    tolerance: &ToleranceConfig,
) -> (DiscrepancyType, String, Vec<String>) {
    let delta = describe_delta(amount_delta(line, invoice));

    if !amount_within_tolerance(line, invoice, tolerance) {
        return (
            DiscrepancyType::AmountMismatch,
            format!(
                "amount {} {} differs from invoice '{}' total {} by {} (tolerance {})",
                line.amount,
                line.currency,
                invoice.invoice_number,
                invoice.total_amount,
                delta,
                amount_bound(invoice.total_amount, tolerance)
            ),
            vec![invoice.invoice_number.clone()],
        );
    }

    if let Some(offset) = date_offset(line.line_date, invoice.invoice_date) {
        if offset.abs() > tolerance.date_window_days {
            return (
                DiscrepancyType::DateMismatch,
                format!(
                    "line date is {} day(s) from invoice '{}' date (window {} days)",
                    offset.abs(),
                    invoice.invoice_number,
                    tolerance.date_window_days
                ),
                vec![invoice.invoice_number.clone()],
            );
        }
    }

    if let Some(amb) = ambiguity {
        let seen: Vec<String> = amb
            .candidates
            .iter()
            .filter_map(|&i| invoices.get(i))
            .map(|inv| inv.invoice_number.clone())
            .collect();
        return (
            DiscrepancyType::MultipleCandidates,
            format!(
                "pass {} ({}) found {} eligible invoices; ambiguous lines are never auto-resolved",
                amb.pass.number(),
                amb.pass,
                seen.len()
            ),
            seen,
        );
    }

    if partial && (line.line_date.is_none() || invoice.invoice_date.is_none()) {
        let side = if line.line_date.is_none() { "statement line" } else { "invoice" };
        return (
            DiscrepancyType::DateMismatch,
            format!(
                "amount is within tolerance of invoice '{}' (delta {}) but the {} date is missing; the partial pass needs both dates",
                invoice.invoice_number, delta, side
            ),
            vec![invoice.invoice_number.clone()],
        );
    }

    let tail = if partial {
        "but no pass accepted it"
    } else {
        "but only the partial pass accepts it"
    };
    (
        DiscrepancyType::AmountMismatch,
        format!(
            "amount {} {} is within tolerance of invoice '{}' total {} (delta {}) {}",
            line.amount, line.currency, invoice.invoice_number, invoice.total_amount, delta, tail
        ),
        vec![invoice.invoice_number.clone()],
    )
}

fn describe_delta(delta: Option<Decimal>) -> String {
    delta.map_or_else(|| "more than a Decimal can hold".into(), |d| d.to_string())
}

fn describe_no_invoice(
    line: &StatementLine,
    invoices: &[Invoice],
    claimed_by: &[Option<usize>],
    grouped: bool,
) -> String {
    let reference = line.reference_text.trim();
    if reference.is_empty() {
        return "statement line has no document reference".into();
    }

    let already: Vec<String> = invoices
        .iter()
        .zip(claimed_by)
        .filter_map(|(inv, claim)| {
            claim
                .filter(|_| refers_to(reference, &inv.invoice_number, grouped))
                .map(|by| format!("'{}' (statement line #{})", inv.invoice_number, by + 1))
        })
        .collect();

    if already.is_empty() {
        format!("no unclaimed invoice matches reference '{reference}'")
    } else {
        format!(
            "reference '{}' points at invoice {} already matched; possible duplicate payment",
            reference,
            already.join(", ")
        )
    }
}

fn numbers(invoices: &[&Invoice]) -> Vec<String> {
    invoices.iter().map(|inv| inv.invoice_number.clone()).collect()
}

fn list_with_currency(invoices: &[&Invoice]) -> String {
    invoices
        .iter()
        .map(|inv| format!("'{}' ({})", inv.invoice_number, inv.currency))
        .collect::<Vec<_>>()
        .join(", ")
}
