// src/bin/helperlib.rs

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use helperlib::cli::{Cli, Commands};
use helperlib::commands::check::check_helpers;
use helperlib::commands::constants::print_constants;
use helperlib::commands::report_live_objects;
use helperlib::commands::symbols::list_symbols;
use helperlib::commands::version::print_version;
use helperlib_runtime::alloc_track;

/// A timer that prints nothing.
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(
        &self,
        _w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        Ok(())
    }
}

fn main() -> ExitCode {
    // HELPERLIB_LOG takes an EnvFilter directive.
    // HELPERLIB_LOG_STYLE: "compact" (default) or "full" (with timestamps)
    if let Ok(filter) = EnvFilter::try_from_env("HELPERLIB_LOG") {
        let style = std::env::var("HELPERLIB_LOG_STYLE").unwrap_or_default();
        if style == "full" {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_timer(NoTimestamp)
                .with_writer(std::io::stderr)
                .init();
        }
        tracing::debug!("tracing initialized");
    }

    let cli = Cli::parse();
    if cli.track_allocs {
        alloc_track::enable_tracking();
    }

    let code = match cli.command {
        Commands::Symbols { filter } => list_symbols(filter.as_deref()),
        Commands::Constants => print_constants(),
        Commands::Check { verbose } => check_helpers(verbose),
        Commands::Version => print_version(),
    };

    if !report_live_objects() {
        return ExitCode::FAILURE;
    }
    code
}
