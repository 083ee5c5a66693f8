//! CLI argument definitions for the warehouse loader.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use ech_model::FactFamily;

#[derive(Parser)]
#[command(
    name = "ech",
    version,
    about = "Regional climate & health statistics warehouse",
    long_about = "Harmonize regional emissions, health, and population sources\n\
                  into a star-schema SQLite warehouse.\n\n\
                  Sources are staged files described by a TOML run manifest;\n\
                  loads are idempotent and transactional per fact family."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run every adapter and load all fact families.
    Load(LoadArgs),

    /// Load a single fact family.
    Family(FamilyArgs),

    /// Run the post-load integrity checks without loading anything.
    Verify(VerifyArgs),
}

#[derive(Parser)]
pub struct LoadArgs {
    /// Path to the TOML run manifest.
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Override the warehouse path from the manifest.
    #[arg(long = "db", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Keep the last record per duplicated grain key instead of aborting
    /// the batch.
    #[arg(long = "overwrite-last-wins")]
    pub overwrite_last_wins: bool,

    /// Restrict the load to level-2 regions (4-character codes).
    #[arg(long = "level2-only")]
    pub level2_only: bool,

    /// Write the run report as JSON to this path.
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct FamilyArgs {
    /// Which fact family to load.
    #[arg(value_enum, value_name = "FAMILY")]
    pub family: FamilyArg,

    /// Path to the TOML run manifest.
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Override the warehouse path from the manifest.
    #[arg(long = "db", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Keep the last record per duplicated grain key instead of aborting
    /// the batch.
    #[arg(long = "overwrite-last-wins")]
    pub overwrite_last_wins: bool,

    /// Restrict the load to level-2 regions (4-character codes).
    #[arg(long = "level2-only")]
    pub level2_only: bool,

    /// Write the run report as JSON to this path.
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Path to the TOML run manifest (for the warehouse path and
    /// tolerance).
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Override the warehouse path from the manifest.
    #[arg(long = "db", value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// CLI spelling of the fact families.
#[derive(Clone, Copy, ValueEnum)]
pub enum FamilyArg {
    Emissions,
    Causes,
    Discharges,
    Population,
}

impl From<FamilyArg> for FactFamily {
    fn from(value: FamilyArg) -> Self {
        match value {
            FamilyArg::Emissions => FactFamily::Emissions,
            FamilyArg::Causes => FactFamily::CausesOfDeath,
            FamilyArg::Discharges => FactFamily::HospitalDischarges,
            FamilyArg::Population => FactFamily::Population,
        }
    }
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
