//! String literals embedded in game binaries
//!
//! Reading and rewriting the literals of a .NET assembly is left to an
//! external tool; this module only needs a store that can list literals and
//! replace one by index. Keys use the `literal` category, so a table built
//! here and a table built from dialog files never collide.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::translation::extract::{Substitution, substitution};
use crate::translation::{
    ApplyReport, HeuristicOptions, TextCategory, TextEntry, TranslationTable,
    normalize_line_breaks,
};

/// Anything that holds an indexed list of string literals
pub trait LiteralStore {
    /// All literals, in index order
    fn literals(&self) -> Vec<String>;

    /// Replace the literal at `index`
    ///
    /// # Errors
    /// Returns [`Error::LiteralOutOfRange`] for an unknown index.
    fn replace_literal(&mut self, index: usize, value: String) -> Result<()>;
}

/// Literal store kept in memory and persisted as a JSON array of strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryLiteralStore {
    literals: Vec<String>,
}

impl MemoryLiteralStore {
    pub fn new(literals: Vec<String>) -> Self {
        Self { literals }
    }

    /// Load a store from a JSON array on disk
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a JSON string array.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the store as a pretty-printed JSON array
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl LiteralStore for MemoryLiteralStore {
    fn literals(&self) -> Vec<String> {
        self.literals.clone()
    }

    fn replace_literal(&mut self, index: usize, value: String) -> Result<()> {
        let slot = self
            .literals
            .get_mut(index)
            .ok_or(Error::LiteralOutOfRange(index))?;
        *slot = value;
        Ok(())
    }
}

/// Build a table from the translatable literals of `store`
pub fn extract_literals<S: LiteralStore + ?Sized>(
    store: &S,
    heuristic: &HeuristicOptions,
    file: Option<&str>,
) -> TranslationTable {
    store
        .literals()
        .iter()
        .map(|text| normalize_line_breaks(text))
        .filter(|text| crate::translation::is_translatable(text, heuristic))
        .map(|text| {
            TextEntry::new(text, TextCategory::Literal).with_file(file.map(ToString::to_string))
        })
        .collect()
}

/// Write matching translations from `table` into `store`
///
/// # Errors
/// Returns an error if the store rejects a replacement.
pub fn patch_literals<S: LiteralStore + ?Sized>(
    store: &mut S,
    table: &TranslationTable,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for (index, text) in store.literals().into_iter().enumerate() {
        match substitution(table, &text, TextCategory::Literal) {
            Substitution::Replace(translated) => {
                store.replace_literal(index, translated)?;
                report.applied += 1;
            }
            Substitution::Stale => report.stale += 1,
            Substitution::Keep => report.untouched += 1,
        }
    }

    tracing::info!(
        "Patched {} literals ({} stale, {} untouched)",
        report.applied,
        report.stale,
        report.untouched
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::stable_key;
    use pretty_assertions::assert_eq;

    fn store() -> MemoryLiteralStore {
        MemoryLiteralStore::new(vec![
            "Saves".to_string(),
            "Load game".to_string(),
            "ui_button_ok".to_string(),
            "Quit to desktop".to_string(),
            "Load game".to_string(),
        ])
    }

    #[test]
    fn test_extract_literals() {
        let table = extract_literals(&store(), &HeuristicOptions::default(), Some("Game.exe"));
        let originals: Vec<_> = table.iter().map(|e| e.original.as_str()).collect();
        assert_eq!(originals, vec!["Load game", "Quit to desktop"]);
        let first = table.iter().next().unwrap();
        assert_eq!(first.key, stable_key("Load game", TextCategory::Literal));
        assert_eq!(first.file.as_deref(), Some("Game.exe"));
    }

    #[test]
    fn test_multi_line_literal_is_classified_normalized() {
        let store = MemoryLiteralStore::new(vec![
            "Yes\r\nNo".to_string(),
            "Press any key\nto continue".to_string(),
        ]);
        let table = extract_literals(&store, &HeuristicOptions::default(), None);
        let originals: Vec<_> = table.iter().map(|e| e.original.as_str()).collect();
        assert_eq!(originals, vec!["Press any key\\nto continue"]);
    }

    #[test]
    fn test_patch_literals() {
        let mut store = store();
        let mut table = extract_literals(&store, &HeuristicOptions::default(), None);
        for entry in table.iter_mut() {
            if entry.original == "Load game" {
                entry.translation = "Spiel laden".to_string();
            }
        }

        let report = patch_literals(&mut store, &table).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.untouched, 3);
        assert_eq!(store.literals()[1], "Spiel laden");
        assert_eq!(store.literals()[4], "Spiel laden");
    }

    #[test]
    fn test_json_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("literals.json");
        fs::write(&path, r#"["One line", "Two\r\nlines"]"#).unwrap();

        let store = MemoryLiteralStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        store.save(&path).unwrap();
        assert_eq!(MemoryLiteralStore::load(&path).unwrap(), store);
    }

    #[test]
    fn test_out_of_range() {
        let mut store = MemoryLiteralStore::default();
        assert!(matches!(
            store.replace_literal(3, String::new()),
            Err(Error::LiteralOutOfRange(3))
        ));
    }
}
