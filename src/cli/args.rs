// src/cli/args.rs

use clap::{Parser, Subcommand};

use crate::commands::version::version_string;

/// Native helper bridge for JIT-compiled code
#[derive(Parser)]
#[command(name = "helperlib")]
#[command(version = version_string())]
#[command(about = "Inspect and self-check the native helper bridge", long_about = None)]
pub struct Cli {
    /// Count live host objects and report any still alive on exit
    #[arg(long, global = true)]
    pub track_allocs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List exported helpers with their addresses
    Symbols {
        /// Only list helpers whose name contains this text
        #[arg(long, value_name = "TEXT")]
        filter: Option<String>,
    },
    /// Print the constants exported alongside the helpers
    Constants,
    /// Call every core helper through the export table against the reference host
    Check {
        /// Also print passing checks
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show version information
    Version,
}
