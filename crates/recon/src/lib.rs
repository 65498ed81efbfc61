//! `soa-recon` — statement-of-account reconciliation matching engine.
//!
//! Pure engine crate: receives pre-loaded source records or canonical
//! invoices and statement lines, returns a `ReconciliationReport`.
//! No CLI or IO dependencies.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod mapper;
pub mod matcher;
pub mod model;
pub mod pipeline;
pub mod source;

pub use config::{MatchOptions, ReconConfig, ToleranceConfig};
pub use engine::{reconcile, run, run_source};
pub use error::{MappingError, ReconError};
pub use model::{
    Confidence, Discrepancy, DiscrepancyType, Invoice, MatchMode, MatchResult, Pass, ReconInput,
    ReconciliationReport, Severity, StatementLine,
};
pub use source::{read_csv_records, SourceRecord};
