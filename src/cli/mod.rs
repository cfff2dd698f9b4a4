//! Command-line interface definitions for the `mooring` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use camino::Utf8PathBuf;
use clap::{Args, Parser};

/// Top-level CLI for the `mooring` binary.
#[derive(Debug, Parser)]
#[command(
    name = "mooring",
    about = "Drive the volume lifecycle view of a compute instance from a fixture",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Load a fixture and print the rendering surface as JSON.
    #[command(name = "render", about = "Load a fixture and print the rendering surface")]
    Render(FixtureArgs),
    /// Load a fixture, replay its intents and events, and print every step.
    #[command(
        name = "apply",
        about = "Replay a fixture's intents and events, then print the outcome"
    )]
    Apply(FixtureArgs),
}

impl Cli {
    /// Arguments shared by every subcommand.
    pub(crate) const fn args(&self) -> &FixtureArgs {
        match self {
            Self::Render(args) | Self::Apply(args) => args,
        }
    }
}

/// Arguments shared by `mooring render` and `mooring apply`.
#[derive(Args, Debug)]
pub(crate) struct FixtureArgs {
    /// JSON fixture describing the parent instance, its volumes and intents.
    #[arg(value_name = "FIXTURE")]
    pub(crate) fixture: Utf8PathBuf,
    /// Log filter used when `RUST_LOG` is unset; logs go to stderr.
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    pub(crate) log_level: String,
}
