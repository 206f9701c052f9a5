//! Diagnostic logging to stderr.
//!
//! `FBADMIN_LOG` takes `EnvFilter` directives (for example
//! `fbadmin=debug,reqwest=info`) and overrides the `-v` level.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "FBADMIN_LOG";

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(verbosity > 1)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
