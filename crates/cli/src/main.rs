mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// stx - apply system configuration changes as one transaction
#[derive(Parser)]
#[command(name = "stx")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Apply a plan file; on any failure, undo what was already applied
  Apply {
    /// Path to the plan file
    plan: PathBuf,
  },

  /// List the operations in a plan file without applying them
  Plan {
    /// Path to the plan file
    plan: PathBuf,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let result = match &cli.command {
    Commands::Apply { plan } => cmd::cmd_apply(plan),
    Commands::Plan { plan } => cmd::cmd_plan(plan),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      output::print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
fn init_logging(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}
