//! UnderLoc CLI - Command-line interface for UDLG dialog translation

pub mod commands;
pub mod progress;

use std::path::PathBuf;

use clap::{Args, Parser};
use commands::Commands;

use crate::config::{Settings, parse_signature};
use crate::formats::udlg::UdlgOptions;
use crate::translation::{ExtractOptions, ExtractionMode};

#[derive(Parser)]
#[command(name = "underloc", version)]
#[command(about = "UnderLoc: Underrail dialog decoding and translation tools", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Settings file (defaults to ./underloc.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Header signature as hex, e.g. 55444c47 ("" disables the check)
    #[arg(long, global = true)]
    pub signature: Option<String>,

    /// Only extract text that contains a space
    #[arg(long, global = true)]
    pub no_single_words: bool,

    /// Extraction mode (english, variables)
    #[arg(short, long, global = true)]
    pub mode: Option<ExtractionMode>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// Settings file values with command-line overrides applied
    pub fn resolve(&self) -> anyhow::Result<(UdlgOptions, ExtractOptions)> {
        let settings = Settings::load_or_default(self.config.as_deref())?;
        let mut codec = settings.codec_options()?;
        let mut extract = settings.extract_options();

        if let Some(signature) = &self.signature {
            codec.signature = parse_signature(signature)?;
        }
        if self.no_single_words {
            extract.heuristic.include_single_words = false;
        }
        if let Some(mode) = self.mode {
            extract.mode = mode;
        }

        tracing::debug!(
            "Signature {}, {} mode, single words {}",
            hex::encode(&codec.signature),
            extract.mode,
            extract.heuristic.include_single_words
        );
        Ok((codec, extract))
    }
}

/// Run the UnderLoc CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cli.command.execute(&cli.global)?;

    Ok(())
}
