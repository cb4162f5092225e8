//! # UnderLoc
//!
//! A pure-Rust library for translating Underrail dialog files.
//!
//! ## Supported Formats
//!
//! - **UDLG** - Dialog containers: a 24-byte header followed by an
//!   MS-NRBF record stream, optionally gzip or zlib compressed
//! - **JSON** - Editable tree of a decoded container
//! - **CSV/TSV** - Translation tables keyed by content hash
//!
//! ## Quick Start
//!
//! ### Decoding and Rebuilding
//!
//! ```no_run
//! use underloc::formats::{UdlgOptions, read_udlg, write_udlg};
//!
//! let options = UdlgOptions::default();
//! let doc = read_udlg("intro.udlg", &options)?;
//! println!("Found {} records", doc.record_count());
//! write_udlg("intro_copy.udlg", &doc, &options)?;
//! # Ok::<(), underloc::Error>(())
//! ```
//!
//! ### Translating
//!
//! ```no_run
//! use underloc::prelude::*;
//!
//! let extract = ExtractOptions::default();
//! let table = UdlgOperations::decode_file(
//!     "intro.udlg",
//!     "intro.json",
//!     &UdlgOptions::default(),
//!     &extract,
//!     None,
//! )?;
//! write_table("intro.csv", &table, TableLayout::default())?;
//!
//! // ...translator fills in the Translation column...
//!
//! let (translated, _) = read_table("intro.csv", extract.mode.category())?;
//! UdlgOperations::encode_file(
//!     "intro.json",
//!     "intro.udlg",
//!     Some(&translated),
//!     &UdlgOptions::default(),
//!     &extract,
//! )?;
//! # Ok::<(), underloc::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `underloc` command-line binary

pub mod batch;
pub mod compression;
pub mod config;
pub mod error;
pub mod formats;
pub mod operations;
pub mod patch;
pub mod translation;

// Re-exports for convenience
pub use error::{Error, ErrorKind, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::compression::PayloadCompression;
    pub use crate::formats::nrbf::{Primitive, Record, Value};
    pub use crate::formats::udlg::{UdlgDocument, UdlgOptions};

    pub use crate::translation::{
        ApplyReport, ExtractOptions, ExtractionMode, MergeReport, TableLayout, TextCategory,
        TextEntry, TranslationTable, apply_translations, extract_entries, merge_tables,
        read_table, stable_key, write_table,
    };

    pub use crate::operations::UdlgOperations;
    pub use crate::batch::{batch_decode, batch_encode, find_files, BatchDecodeResult, BatchEncodeResult};
    pub use crate::config::Settings;
    pub use crate::patch::{LiteralStore, MemoryLiteralStore, extract_literals, patch_literals};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
