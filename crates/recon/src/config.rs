use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A reconciliation run described in TOML: where the two batches come from,
/// how their columns map onto the canonical shapes, and the matching options.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Run pass 5 for every statement line, not only `partial` ones.
    #[serde(default)]
    pub allow_partial: bool,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub invoices: InvoiceSourceConfig,
    #[serde(default)]
    pub statement: StatementSourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Amount and date tolerances. The amount bound for an invoice is
/// `max(amount_absolute, amount_relative * |invoice total|)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default = "default_amount_absolute")]
    pub amount_absolute: Decimal,
    #[serde(default = "default_amount_relative")]
    pub amount_relative: Decimal,
    #[serde(default = "default_date_window_days")]
    pub date_window_days: i64,
}

fn default_amount_absolute() -> Decimal {
    Decimal::new(100, 2)
}

fn default_amount_relative() -> Decimal {
    Decimal::new(5, 3)
}

fn default_date_window_days() -> i64 {
    7
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            amount_absolute: default_amount_absolute(),
            amount_relative: default_amount_relative(),
            date_window_days: default_date_window_days(),
        }
    }
}

impl ToleranceConfig {
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.amount_absolute < Decimal::ZERO {
            return Err(ReconError::Configuration(format!(
                "tolerance.amount_absolute must not be negative, got {}",
                self.amount_absolute
            )));
        }
        if self.amount_relative < Decimal::ZERO {
            return Err(ReconError::Configuration(format!(
                "tolerance.amount_relative must not be negative, got {}",
                self.amount_relative
            )));
        }
        if self.amount_relative >= Decimal::ONE {
            return Err(ReconError::Configuration(format!(
                "tolerance.amount_relative is a fraction and must be below 1, got {}",
                self.amount_relative
            )));
        }
        if self.date_window_days < 0 {
            return Err(ReconError::Configuration(format!(
                "tolerance.date_window_days must not be negative, got {}",
                self.date_window_days
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sources + column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSourceConfig {
    /// CSV path, relative to the config file. Only the CLI reads it.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub columns: InvoiceColumns,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for InvoiceSourceConfig {
    fn default() -> Self {
        Self {
            file: None,
            columns: InvoiceColumns::default(),
            date_format: default_date_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementSourceConfig {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub columns: StatementColumns,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Flip the sign of every amount (exports that book payments as negatives).
    #[serde(default)]
    pub invert_sign: bool,
}

impl Default for StatementSourceConfig {
    fn default() -> Self {
        Self {
            file: None,
            columns: StatementColumns::default(),
            date_format: default_date_format(),
            invert_sign: false,
        }
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceColumns {
    #[serde(default = "col_invoice_number")]
    pub invoice_number: String,
    #[serde(default = "col_total_amount")]
    pub total_amount: String,
    #[serde(default = "col_currency")]
    pub currency: String,
    #[serde(default = "col_invoice_date")]
    pub invoice_date: String,
}

impl Default for InvoiceColumns {
    fn default() -> Self {
        Self {
            invoice_number: col_invoice_number(),
            total_amount: col_total_amount(),
            currency: col_currency(),
            invoice_date: col_invoice_date(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementColumns {
    #[serde(default = "col_reference_text")]
    pub reference_text: String,
    #[serde(default = "col_amount")]
    pub amount: String,
    #[serde(default = "col_currency")]
    pub currency: String,
    #[serde(default = "col_line_date")]
    pub line_date: String,
    #[serde(default = "col_match_mode")]
    pub match_mode: String,
}

impl Default for StatementColumns {
    fn default() -> Self {
        Self {
            reference_text: col_reference_text(),
            amount: col_amount(),
            currency: col_currency(),
            line_date: col_line_date(),
            match_mode: col_match_mode(),
        }
    }
}

fn col_invoice_number() -> String {
    "invoice_number".into()
}
fn col_total_amount() -> String {
    "total_amount".into()
}
fn col_currency() -> String {
    "currency".into()
}
fn col_invoice_date() -> String {
    "invoice_date".into()
}
fn col_reference_text() -> String {
    "reference_text".into()
}
fn col_amount() -> String {
    "amount".into()
}
fn col_line_date() -> String {
    "line_date".into()
}
fn col_match_mode() -> String {
    "match_mode".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Match options
// ---------------------------------------------------------------------------

/// Everything the pipeline needs besides the two batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    pub name: String,
    pub tolerance: ToleranceConfig,
    pub allow_partial: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            name: "soa-recon".into(),
            tolerance: ToleranceConfig::default(),
            allow_partial: false,
        }
    }
}

impl MatchOptions {
    pub fn validate(&self) -> Result<(), ReconError> {
        self.tolerance.validate()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::Configuration("name must not be empty".into()));
        }

        self.tolerance.validate()?;

        let inv = &self.invoices.columns;
        let stmt = &self.statement.columns;
        let columns = [
            ("invoices.columns.invoice_number", &inv.invoice_number),
            ("invoices.columns.total_amount", &inv.total_amount),
            ("invoices.columns.currency", &inv.currency),
            ("invoices.columns.invoice_date", &inv.invoice_date),
            ("statement.columns.reference_text", &stmt.reference_text),
            ("statement.columns.amount", &stmt.amount),
            ("statement.columns.currency", &stmt.currency),
            ("statement.columns.line_date", &stmt.line_date),
            ("statement.columns.match_mode", &stmt.match_mode),
        ];
        for (key, value) in columns {
            if value.trim().is_empty() {
                return Err(ReconError::Configuration(format!("{key} must not be empty")));
            }
        }

        if self.invoices.date_format.is_empty() || self.statement.date_format.is_empty() {
            return Err(ReconError::Configuration("date_format must not be empty".into()));
        }

        Ok(())
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            name: self.name.clone(),
            tolerance: self.tolerance.clone(),
            allow_partial: self.allow_partial,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
