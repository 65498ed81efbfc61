// soa - statement-of-account reconciliation from the command line

mod exit_codes;
mod recon;

use std::process::ExitCode;

use clap::Parser;

use exit_codes::{recon_exit_code, EXIT_SUCCESS, EXIT_USAGE};
use recon::ReconCommands;

#[derive(Parser)]
#[command(name = "soa")]
#[command(about = "Match statement-of-account lines against invoices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: ReconCommands,
}

/// Log records go to stderr, filtered by `SOA_LOG` (e.g. `SOA_LOG=soa_recon=debug`).
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SOA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version come through here too
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };
    init_logging();

    match recon::cmd_recon(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn recon(err: soa_recon::ReconError) -> Self {
        let hint = match &err {
            soa_recon::ReconError::Mapping(m) => {
                Some(format!("check the column mapping in the config and the data of {}", m.record()))
            }
            soa_recon::ReconError::ConfigParse(_) => Some("run `soa validate <config>` after fixing".into()),
            _ => None,
        };
        Self {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
