use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docrelay")]
#[command(about = "Dispatch files dropped into watched folders", long_about = None)]
pub struct Cli {
    /// Config file (falls back to DOCRELAY_CONFIG, then config/docrelay.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the watched folders until Ctrl+C or SIGTERM
    Watch,
    /// Run a single poll cycle and exit; non-zero if anything needs attention
    Once,
}
