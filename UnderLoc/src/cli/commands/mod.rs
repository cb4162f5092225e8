use clap::Subcommand;
use std::path::PathBuf;

use super::GlobalArgs;

pub mod decode;
pub mod encode;
pub mod literals;
pub mod merge;
pub mod translations;

#[derive(Subcommand)]
pub enum Commands {
    /// Decode UDLG file(s) into JSON, optionally extracting text to a table
    Decode {
        /// Input UDLG file or folder
        input: PathBuf,

        /// Output JSON file or folder
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extract texts to a table next to the output (.csv)
        #[arg(short, long)]
        csv: bool,

        /// Add a File column with each entry's source path
        #[arg(short = 'f', long)]
        include_file: bool,
    },

    /// Encode JSON back into UDLG, optionally applying translations
    Encode {
        /// Input JSON file or folder
        input: PathBuf,

        /// Output UDLG file or folder
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Table (.csv/.tsv) with translations
        #[arg(short, long)]
        csv: Option<PathBuf>,

        /// Require the table to carry a File column
        #[arg(short = 'f', long)]
        include_file: bool,
    },

    /// Carry translations from an older table into a freshly extracted one
    MergeCsv {
        /// Table with older translations
        base: PathBuf,

        /// Table extracted from updated game files
        new: PathBuf,

        /// Output table
        merged: PathBuf,
    },

    /// Write the Translation column to a text file, one line per row
    ExportTranslations {
        /// Table to read
        #[arg(long)]
        csv: PathBuf,

        /// Output text file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace the Translation column with the lines of a text file
    InsertTranslations {
        /// Table to update in place
        #[arg(long)]
        csv: PathBuf,

        /// Text file with one translation per line
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Build a table from a JSON array of string literals
    ExtractLiterals {
        /// JSON array of literals dumped from the game binary
        input: PathBuf,

        /// Output table
        #[arg(short, long)]
        output: PathBuf,

        /// Add a File column with the literal file name
        #[arg(short = 'f', long)]
        include_file: bool,
    },

    /// Apply a table to a JSON array of string literals
    PatchLiterals {
        /// JSON array of literals
        input: PathBuf,

        /// Table with translations
        #[arg(long)]
        csv: PathBuf,

        /// Output JSON array (defaults to <input>_patched.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite a table with canonical quoting (CSV and TSV by extension)
    NormalizeCsv {
        /// Table to read
        input: PathBuf,

        /// Output table
        output: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            Commands::Decode {
                input,
                output,
                csv,
                include_file,
            } => decode::execute(input, output.as_deref(), *csv, *include_file, global),
            Commands::Encode {
                input,
                output,
                csv,
                include_file,
            } => encode::execute(input, output.as_deref(), csv.as_deref(), *include_file, global),
            Commands::MergeCsv { base, new, merged } => merge::execute(base, new, merged, global),
            Commands::ExportTranslations { csv, output } => translations::export(csv, output),
            Commands::InsertTranslations { csv, input } => translations::insert(csv, input),
            Commands::ExtractLiterals {
                input,
                output,
                include_file,
            } => literals::extract(input, output, *include_file, global),
            Commands::PatchLiterals { input, csv, output } => {
                literals::patch(input, csv, output.as_deref())
            }
            Commands::NormalizeCsv { input, output } => translations::normalize(input, output),
        }
    }
}

/// Default output folder for a batch run: `<input>_<suffix>` next to the input
fn sibling_dir(input: &std::path::Path, suffix: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{name}_{suffix}"))
}

/// Create the parent folder of `path` if needed
fn ensure_parent(path: &std::path::Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
