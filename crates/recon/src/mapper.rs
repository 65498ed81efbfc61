//! Canonical shape mapper: source records in, `Invoice` / `StatementLine` out.
//!
//! This is the only place that knows source field names. Everything past it
//! works on the canonical shapes, and anything malformed stops here.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{InvoiceSourceConfig, StatementSourceConfig};
use crate::error::MappingError;
use crate::model::{Invoice, MatchMode, StatementLine};
use crate::source::SourceRecord;

pub fn map_invoice(
    position: usize,
    record: &SourceRecord,
    source: &InvoiceSourceConfig,
) -> Result<Invoice, MappingError> {
    let label = format!("invoice #{}", position + 1);
    let cols = &source.columns;

    let total_amount = required_amount(&label, record, &cols.total_amount)?;
    if total_amount < Decimal::ZERO {
        return Err(MappingError::NegativeAmount {
            record: label,
            value: total_amount.to_string(),
        });
    }

    let currency = required_currency(&label, record, &cols.currency)?;
    let invoice_date = optional_date(&label, record, &cols.invoice_date, &source.date_format)?;
    let invoice_number = record.field(&cols.invoice_number);

    if invoice_number.is_none() && invoice_date.is_none() {
        return Err(MappingError::MissingDocumentAndDate { record: label });
    }

    Ok(Invoice {
        invoice_number: invoice_number.unwrap_or_default().to_string(),
        total_amount,
        currency,
        invoice_date,
    })
}

pub fn map_statement_line(
    position: usize,
    record: &SourceRecord,
    source: &StatementSourceConfig,
) -> Result<StatementLine, MappingError> {
    let label = format!("statement line #{}", position + 1);
    let cols = &source.columns;

    let mut amount = required_amount(&label, record, &cols.amount)?;
    if source.invert_sign {
        amount = -amount;
    }

    let currency = required_currency(&label, record, &cols.currency)?;
    let line_date = optional_date(&label, record, &cols.line_date, &source.date_format)?;
    let reference_text = record.field(&cols.reference_text);

    if reference_text.is_none() && line_date.is_none() {
        return Err(MappingError::MissingDocumentAndDate { record: label });
    }

    let match_mode = match record.field(&cols.match_mode) {
        None => MatchMode::Strict,
        Some(raw) => MatchMode::parse(raw).ok_or_else(|| MappingError::MatchModeParse {
            record: label.clone(),
            value: raw.into(),
        })?,
    };

    Ok(StatementLine {
        reference_text: reference_text.unwrap_or_default().to_string(),
        amount,
        currency,
        line_date,
        match_mode,
    })
}

/// Map a whole invoice batch, stopping at the first malformed record.
pub fn map_invoices(
    records: &[SourceRecord],
    source: &InvoiceSourceConfig,
) -> Result<Vec<Invoice>, MappingError> {
    let invoices = records
        .iter()
        .enumerate()
        .map(|(i, r)| map_invoice(i, r, source))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("mapped {} invoice record(s)", invoices.len());
    Ok(invoices)
}

/// Map a whole statement batch, stopping at the first malformed record.
pub fn map_statement_lines(
    records: &[SourceRecord],
    source: &StatementSourceConfig,
) -> Result<Vec<StatementLine>, MappingError> {
    let lines = records
        .iter()
        .enumerate()
        .map(|(i, r)| map_statement_line(i, r, source))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("mapped {} statement line record(s)", lines.len());
    Ok(lines)
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

fn required_amount(label: &str, record: &SourceRecord, column: &str) -> Result<Decimal, MappingError> {
    let raw = record.field(column).ok_or_else(|| MappingError::MissingField {
        record: label.into(),
        field: column.into(),
    })?;
    parse_amount(raw).ok_or_else(|| MappingError::AmountParse {
        record: label.into(),
        value: raw.into(),
    })
}

fn required_currency(label: &str, record: &SourceRecord, column: &str) -> Result<String, MappingError> {
    let raw = record.field(column).ok_or_else(|| MappingError::MissingField {
        record: label.into(),
        field: column.into(),
    })?;
    parse_currency(raw).ok_or_else(|| MappingError::CurrencyParse {
        record: label.into(),
        value: raw.into(),
    })
}

fn optional_date(
    label: &str,
    record: &SourceRecord,
    column: &str,
    format: &str,
) -> Result<Option<NaiveDate>, MappingError> {
    match record.field(column) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, format)
            .map(Some)
            .map_err(|_| MappingError::DateParse {
                record: label.into(),
                value: raw.into(),
            }),
    }
}

/// Accepts `1,250.00`, `1_250`, `+12.5` and accounting negatives like `(12.50)`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    let parenthesized = s.len() >= 2 && s.starts_with('(') && s.ends_with(')');
    if parenthesized {
        s = &s[1..s.len() - 1];
    }

    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '_').collect();
    let cleaned = cleaned.trim();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(cleaned);
    if cleaned.is_empty() || (parenthesized && cleaned.starts_with('-')) {
        return None;
    }

    let value = Decimal::from_str(cleaned).ok()?;
    Some(if parenthesized { -value } else { value })
}

/// Three ASCII letters, upper-cased.
pub fn parse_currency(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}
