//! CLI definitions for jobcraft
//!
//! This module defines the CLI structure using clap's derive macros.

use clap::{Parser, ValueEnum};

/// Output format for `--print-config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DumpFormat {
    #[default]
    Yaml,
    Json,
}

/// Job application workspace: configuration and storage
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Extra configuration file, applied above all other layers
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the merged, path-expanded configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Format for --print-config
    #[arg(long, value_enum, default_value_t = DumpFormat::Yaml)]
    pub format: DumpFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}
