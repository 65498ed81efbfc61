//! CLI Exit Code Registry
//!
//! Single source of truth for `soa` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Every statement line matched                         |
//! | 1    | Run completed, discrepancies found                   |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Invalid config (TOML syntax or validation)           |
//! | 4    | A source record could not be mapped                  |
//! | 5    | I/O or runtime error (unreadable file, bad CSV, ...) |

use soa_recon::ReconError;

/// Success - every statement line was matched.
pub const EXIT_SUCCESS: u8 = 0;

/// The run completed but left discrepancies.
/// Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_DISCREPANCIES: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Config did not parse or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A statement line or invoice was malformed or incomplete.
pub const EXIT_MAPPING: u8 = 4;

/// Cannot read inputs, write outputs, or parse CSV.
pub const EXIT_RUNTIME: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::Configuration(_) => EXIT_INVALID_CONFIG,
        ReconError::Mapping(_) => EXIT_MAPPING,
        ReconError::Io(_) => EXIT_RUNTIME,
    }
}
