use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::ToleranceConfig;

// ---------------------------------------------------------------------------
// Input (canonical shapes)
// ---------------------------------------------------------------------------

/// A tenant invoice in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub total_amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,
}

impl Invoice {
    pub fn new(invoice_number: impl Into<String>, total_amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            total_amount,
            currency: currency.into(),
            invoice_date: None,
        }
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.invoice_date = Some(date);
        self
    }
}

/// Whether a statement line may be resolved by the opt-in partial pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Strict,
    Partial,
}

impl MatchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// One claimed-payment entry from an external statement, in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    pub reference_text: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_date: Option<NaiveDate>,
    pub match_mode: MatchMode,
}

impl StatementLine {
    pub fn new(reference_text: impl Into<String>, amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            reference_text: reference_text.into(),
            amount,
            currency: currency.into(),
            line_date: None,
            match_mode: MatchMode::Strict,
        }
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.line_date = Some(date);
        self
    }

    pub fn partial(mut self) -> Self {
        self.match_mode = MatchMode::Partial;
        self
    }
}

/// One reconciliation batch: statement lines and invoices, both in input order.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub statement_lines: Vec<StatementLine>,
    pub invoices: Vec<Invoice>,
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// The five matching strategies, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Exact,
    DateWindow,
    NormalizedReference,
    AmountTolerance,
    Partial,
}

impl Pass {
    pub const ALL: [Pass; 5] = [
        Pass::Exact,
        Pass::DateWindow,
        Pass::NormalizedReference,
        Pass::AmountTolerance,
        Pass::Partial,
    ];

    pub fn number(self) -> u8 {
        match self {
            Self::Exact => 1,
            Self::DateWindow => 2,
            Self::NormalizedReference => 3,
            Self::AmountTolerance => 4,
            Self::Partial => 5,
        }
    }

    pub fn confidence(self) -> Confidence {
        match self {
            Self::Exact => Confidence::Certain,
            Self::DateWindow => Confidence::High,
            Self::NormalizedReference => Confidence::Moderate,
            Self::AmountTolerance => Confidence::Low,
            Self::Partial => Confidence::Tentative,
        }
    }
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::DateWindow => write!(f, "date_window"),
            Self::NormalizedReference => write!(f, "normalized_reference"),
            Self::AmountTolerance => write!(f, "amount_tolerance"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Ordinal confidence, fixed per pass. Declared low to high so `Ord` agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Tentative,
    Low,
    Moderate,
    High,
    Certain,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tentative => write!(f, "tentative"),
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
            Self::Certain => write!(f, "certain"),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-line results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Matched {
        invoice_number: String,
        pass: u8,
        confidence: Confidence,
    },
    Unmatched,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// How close a matched pair actually was. Kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchEvidence {
    /// Statement amount minus invoice total, absent when it does not fit
    /// in a `Decimal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_delta: Option<Decimal>,
    /// Statement date minus invoice date, when both exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_offset_days: Option<i64>,
    pub normalized_reference: String,
    pub normalized_invoice_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedPair {
    pub line_index: usize,
    pub line: StatementLine,
    pub invoice_index: usize,
    pub invoice: Invoice,
    pub pass: Pass,
    pub pass_number: u8,
    pub confidence: Confidence,
    pub evidence: MatchEvidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedLine {
    pub line_index: usize,
    pub line: StatementLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedInvoice {
    pub invoice_index: usize,
    pub invoice: Invoice,
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    NoInvoiceFound,
    AmountMismatch,
    DateMismatch,
    MultipleCandidates,
    CurrencyMismatch,
}

impl std::fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoInvoiceFound => write!(f, "no_invoice_found"),
            Self::AmountMismatch => write!(f, "amount_mismatch"),
            Self::DateMismatch => write!(f, "date_mismatch"),
            Self::MultipleCandidates => write!(f, "multiple_candidates"),
            Self::CurrencyMismatch => write!(f, "currency_mismatch"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Blocking,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Blocking => write!(f, "blocking"),
        }
    }
}

/// Points back at the statement line a discrepancy is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRef {
    pub line_index: usize,
    pub reference_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub statement_line: LineRef,
    pub discrepancy_type: DiscrepancyType,
    pub severity: Severity,
    pub description: String,
    /// Invoice numbers the classifier looked at.
    pub candidates: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_lines: usize,
    pub total_invoices: usize,
    pub matched: usize,
    pub unmatched_lines: usize,
    pub unmatched_invoices: usize,
    pub matched_by_pass: BTreeMap<String, usize>,
    pub discrepancies_by_type: BTreeMap<String, usize>,
    pub discrepancies_by_severity: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_severity: Option<Severity>,
    pub matched_amount_by_currency: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub engine_version: String,
    pub allow_partial: bool,
    pub tolerance: ToleranceConfig,
}

/// The output of one run. Nothing in it depends on wall-clock time, so two
/// runs over the same batch serialize to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// One entry per statement line, in input order.
    pub results: Vec<MatchResult>,
    pub matched: Vec<MatchedPair>,
    pub unmatched_lines: Vec<UnmatchedLine>,
    pub unmatched_invoices: Vec<UnmatchedInvoice>,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    pub fn is_fully_matched(&self) -> bool {
        self.discrepancies.is_empty()
    }
}
