//! Translation workflow support
//!
//! Text is pulled out of decoded dialog documents into [`TextEntry`] values,
//! edited as a CSV/TSV table, and written back. Every entry carries a stable
//! key derived from its category and text only, so translations survive game
//! updates that move strings around.

pub mod extract;
pub mod heuristic;
pub mod key;
pub mod merge;
pub mod table;

pub use extract::{
    ApplyReport, DEFAULT_MARKER, ExtractOptions, apply_translations, extract_entries,
};
pub use heuristic::{HeuristicOptions, classify, is_translatable};
pub use key::{LineBreakStyle, normalize_line_breaks, restore_line_breaks, stable_key};
pub use merge::{MergeReport, MergeResult, merge_table_files, merge_tables};
pub use table::{
    TableFormat, TableLayout, export_translation_column, insert_translation_column, normalize_table,
    parse_table, read_table, serialize_table, write_table,
};

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where a piece of text came from. Part of the key so identical text in
/// different places never collides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCategory {
    /// Dialog text following the English language marker
    English,
    /// Named class member text
    Variable,
    /// Attribute text
    Attribute,
    /// String literal embedded in a game binary
    Literal,
}

impl TextCategory {
    /// Tag used in key derivation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Variable => "variable",
            Self::Attribute => "attribute",
            Self::Literal => "literal",
        }
    }
}

/// How candidate text is located in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Strings that follow the language marker in a value list
    #[default]
    English,
    /// Every inline string member of a class, named by its member
    Variables,
}

impl ExtractionMode {
    /// Key category for text found in this mode
    #[must_use]
    pub fn category(self) -> TextCategory {
        match self {
            Self::English => TextCategory::English,
            Self::Variables => TextCategory::Variable,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Variables => "variables",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "english" => Ok(Self::English),
            "variables" | "variable" => Ok(Self::Variables),
            other => Err(format!(
                "unknown extraction mode '{other}' (expected 'english' or 'variables')"
            )),
        }
    }
}

/// One translatable string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    /// Stable key (32 hex chars)
    pub key: String,
    /// Source text with line breaks normalized to the `\n` escape
    pub original: String,
    /// Translated text, empty until someone fills it in
    pub translation: String,
    /// Source file, when the table was built from several files
    pub file: Option<String>,
    /// Member name (variables mode)
    pub name: Option<String>,
}

impl TextEntry {
    /// Create an untranslated entry, deriving the key from `original`.
    ///
    /// `original` must already be normalized.
    pub fn new(original: impl Into<String>, category: TextCategory) -> Self {
        let original = original.into();
        Self {
            key: stable_key(&original, category),
            original,
            translation: String::new(),
            file: None,
            name: None,
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: Option<String>) -> Self {
        self.file = file;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = translation.into();
        self
    }

    /// Whether a usable translation is present
    pub fn is_translated(&self) -> bool {
        !self.translation.is_empty()
    }
}

/// Ordered set of entries keyed by stable key. The first entry inserted for a
/// key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    entries: IndexMap<String, TextEntry>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry unless its key is already present.
    ///
    /// Returns `true` if the entry was added.
    pub fn insert(&mut self, entry: TextEntry) -> bool {
        if self.entries.contains_key(&entry.key) {
            return false;
        }
        self.entries.insert(entry.key.clone(), entry);
        true
    }

    /// Append every entry of `other` whose key is new here
    pub fn extend(&mut self, other: TranslationTable) -> usize {
        let mut added = 0;
        for entry in other {
            if self.insert(entry) {
                added += 1;
            }
        }
        added
    }

    pub fn get(&self, key: &str) -> Option<&TextEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TextEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TextEntry> {
        self.entries.values_mut()
    }

    /// Number of entries with a non-empty translation
    pub fn translated_count(&self) -> usize {
        self.iter().filter(|entry| entry.is_translated()).count()
    }

    /// Whether any entry carries a source file
    pub fn has_files(&self) -> bool {
        self.iter().any(|entry| entry.file.is_some())
    }

    /// Whether any entry carries a member name
    pub fn has_names(&self) -> bool {
        self.iter().any(|entry| entry.name.is_some())
    }
}

impl FromIterator<TextEntry> for TranslationTable {
    fn from_iter<I: IntoIterator<Item = TextEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

impl IntoIterator for TranslationTable {
    type Item = TextEntry;
    type IntoIter = indexmap::map::IntoValues<String, TextEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_wins() {
        let mut table = TranslationTable::new();
        assert!(table.insert(TextEntry::new("Hello there", TextCategory::English).with_translation("Hallo")));
        assert!(!table.insert(TextEntry::new("Hello there", TextCategory::English).with_translation("Servus")));
        assert!(table.insert(TextEntry::new("Hello there", TextCategory::Variable)));

        assert_eq!(table.len(), 2);
        let key = stable_key("Hello there", TextCategory::English);
        assert_eq!(table.get(&key).unwrap().translation, "Hallo");
    }

    #[test]
    fn test_extend_keeps_order() {
        let first: TranslationTable = ["a b", "c d"]
            .into_iter()
            .map(|text| TextEntry::new(text, TextCategory::English))
            .collect();
        let second: TranslationTable = ["c d", "e f"]
            .into_iter()
            .map(|text| TextEntry::new(text, TextCategory::English))
            .collect();

        let mut merged = first;
        assert_eq!(merged.extend(second), 1);
        let originals: Vec<_> = merged.iter().map(|e| e.original.as_str()).collect();
        assert_eq!(originals, vec!["a b", "c d", "e f"]);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("English".parse::<ExtractionMode>().unwrap(), ExtractionMode::English);
        assert_eq!("variables".parse::<ExtractionMode>().unwrap(), ExtractionMode::Variables);
        assert!("attributes".parse::<ExtractionMode>().is_err());
    }
}
