//! Matcher core: the comparison primitives the passes are built from.
//! Everything here is a pure function of its arguments.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::ToleranceConfig;
use crate::model::{Invoice, MatchEvidence, StatementLine};

// ---------------------------------------------------------------------------
// Document references
// ---------------------------------------------------------------------------

/// Case-insensitive, whitespace-trimmed equality. An empty reference never
/// matches anything, including another empty reference.
pub fn exact_document_match(reference: &str, invoice_number: &str) -> bool {
    let a = reference.trim();
    let b = invoice_number.trim();
    !a.is_empty() && !b.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Lowercase, drop everything that is not alphanumeric, and strip leading
/// zeros from each run of digits. A separator ends a run, so `10-05`
/// normalizes to `105`. A run made only of zeros keeps a single `0`.
pub fn normalize_reference(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_digits = false;
    let mut leading = false;
    let mut dropped_zero = false;

    for c in raw.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                in_digits = true;
                leading = true;
                dropped_zero = false;
            }
            if leading && c == '0' {
                dropped_zero = true;
                continue;
            }
            leading = false;
            out.push(c);
            continue;
        }

        if in_digits && leading && dropped_zero {
            out.push('0');
        }
        in_digits = false;

        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        }
    }

    if in_digits && leading && dropped_zero {
        out.push('0');
    }

    out
}

/// `"INV-0042"` matches `"inv42"`. Empty normalized forms never match.
pub fn normalized_document_match(reference: &str, invoice_number: &str) -> bool {
    let a = normalize_reference(reference);
    !a.is_empty() && a == normalize_reference(invoice_number)
}

/// Characters that separate several document numbers in one reference.
const GROUP_SEPARATORS: [char; 5] = [',', ';', '/', '+', '&'];

/// True when any segment of a multi-document reference normalizes to the
/// invoice number, e.g. `"PMT INV-41 / INV-42"` against `INV-42`.
pub fn grouped_document_match(reference: &str, invoice_number: &str) -> bool {
    let target = normalize_reference(invoice_number);
    if target.is_empty() {
        return false;
    }
    reference
        .split(|c: char| c.is_whitespace() || GROUP_SEPARATORS.contains(&c))
        .any(|segment| normalize_reference(segment) == target)
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Statement date minus invoice date in days, when both are present.
pub fn date_offset(line_date: Option<NaiveDate>, invoice_date: Option<NaiveDate>) -> Option<i64> {
    match (line_date, invoice_date) {
        (Some(s), Some(i)) => Some((s - i).num_days()),
        _ => None,
    }
}

/// Both dates present and at most `window_days` apart. A missing date never
/// passes this check.
pub fn dates_within_window(
    line_date: Option<NaiveDate>,
    invoice_date: Option<NaiveDate>,
    window_days: i64,
) -> bool {
    date_offset(line_date, invoice_date).is_some_and(|d| d.abs() <= window_days)
}

/// Pass 1 date rule: equal when both present. A missing date is skipped.
pub fn dates_equal_when_present(line_date: Option<NaiveDate>, invoice_date: Option<NaiveDate>) -> bool {
    !matches!(date_offset(line_date, invoice_date), Some(d) if d != 0)
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

pub fn same_currency(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Same currency and decimal-equal (`500` equals `500.00`).
pub fn amounts_equal(line: &StatementLine, invoice: &Invoice) -> bool {
    same_currency(&line.currency, &invoice.currency) && line.amount == invoice.total_amount
}

/// Largest accepted deviation for an invoice total. Saturates at
/// `Decimal::MAX`.
pub fn amount_bound(invoice_total: Decimal, tolerance: &ToleranceConfig) -> Decimal {
    let relative = tolerance
        .amount_relative
        .checked_mul(invoice_total.abs())
        .unwrap_or(Decimal::MAX);
    tolerance.amount_absolute.max(relative)
}

/// Statement amount minus invoice total, or `None` past the `Decimal` range.
pub fn amount_delta(line: &StatementLine, invoice: &Invoice) -> Option<Decimal> {
    line.amount.checked_sub(invoice.total_amount)
}

/// Same currency and `|s - i| <= max(absolute, relative * |i|)`. A difference
/// too large to represent is outside any tolerance.
pub fn amount_within_tolerance(
    line: &StatementLine,
    invoice: &Invoice,
    tolerance: &ToleranceConfig,
) -> bool {
    same_currency(&line.currency, &invoice.currency)
        && amount_delta(line, invoice)
            .is_some_and(|delta| delta.abs() <= amount_bound(invoice.total_amount, tolerance))
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

pub fn match_evidence(line: &StatementLine, invoice: &Invoice) -> MatchEvidence {
    MatchEvidence {
        amount_delta: amount_delta(line, invoice),
        date_offset_days: date_offset(line.line_date, invoice.invoice_date),
        normalized_reference: normalize_reference(&line.reference_text),
        normalized_invoice_number: normalize_reference(&invoice.invoice_number),
    }
}
