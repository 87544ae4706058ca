//! Diagnostic logging for the CLI.
//!
//! Results are printed to stdout; everything emitted through `tracing` goes
//! to stderr so output stays pipeable. `RUST_LOG` takes precedence over the
//! `-v` count.

use clap::{ArgAction, Args};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Args)]
pub struct LoggingArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbosity: u8,
}

impl LoggingArgs {
    pub fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn init(&self) {
        let filter = EnvFilter::builder()
            .with_default_directive(self.level().into())
            .from_env_lossy();

        // try_init: a second subscriber (tests) is not an error
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
