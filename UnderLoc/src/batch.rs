//! Batch UDLG operations
//!
//! Decoding and encoding whole directory trees in parallel. Each file is an
//! independent task: a failure is recorded with its path and the remaining
//! files are still processed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{ErrorKind, Result};
use crate::formats::udlg::UdlgOptions;
use crate::operations::UdlgOperations;
use crate::translation::{ApplyReport, ExtractOptions, TranslationTable};

/// Extension of decoded JSON trees
pub const JSON_EXTENSION: &str = "json";

/// Progress of a batch run, passed to the callback once per file
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub file: String,
}

/// Outcome for one file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Error kind and message when the file failed
    pub error: Option<(ErrorKind, String)>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a batch decode
#[derive(Debug, Clone, Default)]
pub struct BatchDecodeResult {
    pub success_count: usize,
    pub fail_count: usize,
    /// One outcome per input, in input order
    pub outcomes: Vec<FileOutcome>,
    /// Entries of every decoded file, merged in path order
    pub table: TranslationTable,
}

/// Result of a batch encode
#[derive(Debug, Clone, Default)]
pub struct BatchEncodeResult {
    pub success_count: usize,
    pub fail_count: usize,
    pub outcomes: Vec<FileOutcome>,
    /// Sum of the per-file apply reports
    pub report: ApplyReport,
}

/// Find all files with extension `ext` under `dir`, sorted
pub fn find_files<P: AsRef<Path>>(dir: P, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|found| found.eq_ignore_ascii_case(ext))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Map `path` below `source_base` to the same relative place below
/// `dest_base`, with a new extension.
pub fn mirror_path(path: &Path, source_base: &Path, dest_base: &Path, ext: &str) -> PathBuf {
    let relative = path.strip_prefix(source_base).unwrap_or(path);
    dest_base.join(relative).with_extension(ext)
}

fn display_path(path: &Path, source_base: &Path) -> String {
    path.strip_prefix(source_base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn outcome<T>(path: &Path, label: &str, result: &Result<T>) -> FileOutcome {
    FileOutcome {
        path: path.to_path_buf(),
        error: result.as_ref().err().map(|e| {
            tracing::warn!("Skipping {}: {}", label, e);
            (e.kind(), e.to_string())
        }),
    }
}

/// Decode UDLG files in parallel
///
/// Each input is written as a JSON tree under `dest_base`, mirroring its
/// place under `source_base`. Entries are labelled with the relative path.
pub fn batch_decode<F>(
    files: &[PathBuf],
    source_base: &Path,
    dest_base: &Path,
    codec: &UdlgOptions,
    extract: &ExtractOptions,
    progress: F,
) -> BatchDecodeResult
where
    F: Fn(&BatchProgress) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let results: Vec<(FileOutcome, Option<TranslationTable>)> = files
        .par_iter()
        .map(|path| {
            let label = display_path(path, source_base);
            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&BatchProgress {
                current,
                total,
                file: label.clone(),
            });

            let output = mirror_path(path, source_base, dest_base, JSON_EXTENSION);
            let result = ensure_parent(&output).and_then(|()| {
                UdlgOperations::decode_file(path, &output, codec, extract, Some(&label))
            });

            if result.is_ok() {
                success_counter.fetch_add(1, Ordering::SeqCst);
            } else {
                fail_counter.fetch_add(1, Ordering::SeqCst);
            }
            (outcome(path, &label, &result), result.ok())
        })
        .collect();

    // par_iter().collect() keeps input order, so tables merge in path order
    let mut table = TranslationTable::new();
    let mut outcomes = Vec::with_capacity(results.len());
    for (file_outcome, file_table) in results {
        if let Some(file_table) = file_table {
            table.extend(file_table);
        }
        outcomes.push(file_outcome);
    }

    BatchDecodeResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        outcomes,
        table,
    }
}

/// Encode JSON trees back to UDLG files in parallel
///
/// `udlg_ext` is the extension given to the rebuilt files.
pub fn batch_encode<F>(
    files: &[PathBuf],
    source_base: &Path,
    dest_base: &Path,
    udlg_ext: &str,
    table: Option<&TranslationTable>,
    codec: &UdlgOptions,
    extract: &ExtractOptions,
    progress: F,
) -> BatchEncodeResult
where
    F: Fn(&BatchProgress) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let results: Vec<(FileOutcome, ApplyReport)> = files
        .par_iter()
        .map(|path| {
            let label = display_path(path, source_base);
            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&BatchProgress {
                current,
                total,
                file: label.clone(),
            });

            let output = mirror_path(path, source_base, dest_base, udlg_ext);
            let result = ensure_parent(&output).and_then(|()| {
                UdlgOperations::encode_file(path, &output, table, codec, extract)
            });

            if result.is_ok() {
                success_counter.fetch_add(1, Ordering::SeqCst);
            } else {
                fail_counter.fetch_add(1, Ordering::SeqCst);
            }
            let report = result.as_ref().copied().unwrap_or_default();
            (outcome(path, &label, &result), report)
        })
        .collect();

    let mut report = ApplyReport::default();
    let mut outcomes = Vec::with_capacity(results.len());
    for (file_outcome, file_report) in results {
        report = report.combine(file_report);
        outcomes.push(file_outcome);
    }

    BatchEncodeResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        outcomes,
        report,
    }
}
