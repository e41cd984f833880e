//! jgo CLI binary.
//!
//! This is the entry point for the `jgo` command-line tool. It initializes
//! logging via `tracing`, parses arguments with `clap`, and dispatches to
//! the appropriate command handler. The child JVM's exit code propagates
//! verbatim; internal failures exit 2 (resolution) or 3 (I/O, network).

mod cli;
mod commands;

use jgo_util::errors::JgoError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = cli::parse();
    match commands::dispatch(args).await {
        Ok(code) => std::process::exit(code),
        Err(report) => {
            eprintln!("{report:?}");
            let code = report
                .downcast_ref::<JgoError>()
                .map(JgoError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}
