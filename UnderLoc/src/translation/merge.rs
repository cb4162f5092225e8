//! Carrying translations forward onto a regenerated table
//!
//! The fresh table decides which rows exist and in what order. A row keeps
//! the translation from the base table only when both its key and its
//! original text are unchanged.

use std::path::Path;

use super::table::{read_table, write_table};
use super::{TextCategory, TranslationTable};
use crate::error::Result;

/// Counts from a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Rows matched in the base table (translation copied over)
    pub carried: usize,
    /// Rows whose key exists in the base table with different original text
    pub changed: usize,
    /// Rows not in the base table
    pub added: usize,
    /// Base rows no longer present
    pub dropped: usize,
}

/// Result of a merge
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub merged: TranslationTable,
    pub report: MergeReport,
}

/// Merge `base` translations into `fresh`
pub fn merge_tables(base: &TranslationTable, fresh: &TranslationTable) -> MergeResult {
    let mut report = MergeReport::default();
    let mut merged = TranslationTable::new();

    for entry in fresh.iter() {
        let mut entry = entry.clone();
        match base.get(&entry.key) {
            Some(previous) if previous.original == entry.original => {
                entry.translation.clone_from(&previous.translation);
                report.carried += 1;
            }
            Some(_) => {
                entry.translation.clear();
                report.changed += 1;
            }
            None => {
                entry.translation.clear();
                report.added += 1;
            }
        }
        merged.insert(entry);
    }

    report.dropped = base
        .iter()
        .filter(|entry| !fresh.contains_key(&entry.key))
        .count();

    tracing::debug!(
        "Merged tables: {} carried, {} changed, {} added, {} dropped",
        report.carried,
        report.changed,
        report.added,
        report.dropped
    );

    MergeResult { merged, report }
}

/// Merge two table files and write the result
///
/// The output keeps the fresh table's columns.
///
/// # Errors
/// Returns an error if either table cannot be read or the output cannot be written.
pub fn merge_table_files<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    base: P,
    fresh: Q,
    output: R,
    category: TextCategory,
) -> Result<MergeReport> {
    let (base, _) = read_table(base, category)?;
    let (fresh, layout) = read_table(fresh, category)?;
    let result = merge_tables(&base, &fresh);
    write_table(output, &result.merged, layout)?;
    Ok(result.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::TextEntry;
    use pretty_assertions::assert_eq;

    fn table(rows: &[(&str, &str)]) -> TranslationTable {
        rows.iter()
            .map(|(original, translation)| {
                TextEntry::new(*original, TextCategory::English).with_translation(*translation)
            })
            .collect()
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = table(&[("Hello there", "Hallo"), ("Goodbye for now", "")]);
        let result = merge_tables(&base, &base);
        assert_eq!(result.merged, base);
        assert_eq!(
            result.report,
            MergeReport {
                carried: 2,
                ..MergeReport::default()
            }
        );
    }

    #[test]
    fn test_drop_and_carry() {
        let base = table(&[("Old line", "Alte Zeile"), ("Kept line", "Behalten")]);
        let fresh = table(&[("New line", ""), ("Kept line", "")]);

        let result = merge_tables(&base, &fresh);
        let rows: Vec<_> = result
            .merged
            .iter()
            .map(|e| (e.original.as_str(), e.translation.as_str()))
            .collect();
        assert_eq!(rows, vec![("New line", ""), ("Kept line", "Behalten")]);
        assert_eq!(result.report.carried, 1);
        assert_eq!(result.report.added, 1);
        assert_eq!(result.report.dropped, 1);
    }

    #[test]
    fn test_same_key_changed_original_loses_translation() {
        let key = crate::translation::stable_key("Kept line", TextCategory::English);
        let mut base = TranslationTable::new();
        base.insert(TextEntry {
            key: key.clone(),
            original: "Kept line, edited".to_string(),
            translation: "Geaendert".to_string(),
            file: None,
            name: None,
        });
        let fresh = table(&[("Kept line", "")]);

        let result = merge_tables(&base, &fresh);
        assert_eq!(result.report.changed, 1);
        assert_eq!(result.merged.get(&key).unwrap().translation, "");
    }
}
