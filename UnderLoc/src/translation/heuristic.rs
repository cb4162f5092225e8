//! Decides whether a candidate string is player-facing text
//!
//! Rules run in order and the first one that reaches a verdict wins. Anything
//! containing a space is treated as prose; single words have to get past a
//! series of identifier-shaped filters.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Strings that look like words but are never shown to the player
pub const DEFAULT_EXCLUDED: &[&str] = &["Saves"];

static GUID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn guid_pattern() -> &'static Regex {
    GUID_PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
            .expect("invalid GUID pattern")
    })
}

/// Heuristic settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicOptions {
    /// Consider strings without spaces at all
    pub include_single_words: bool,
    /// Exact strings that are always rejected
    pub excluded: Vec<String>,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            include_single_words: true,
            excluded: DEFAULT_EXCLUDED.iter().map(ToString::to_string).collect(),
        }
    }
}

type Rule = fn(&str, &HeuristicOptions) -> Option<bool>;

const RULES: &[(&str, Rule)] = &[
    ("blank", |text, _| text.trim().is_empty().then_some(false)),
    ("excluded", |text, options| {
        options.excluded.iter().any(|s| s == text).then_some(false)
    }),
    ("has-space", |text, _| text.contains(' ').then_some(true)),
    ("single-word-disabled", |_, options| {
        (!options.include_single_words).then_some(false)
    }),
    ("too-short", |text, _| (text.chars().count() < 3).then_some(false)),
    ("all-uppercase", |text, _| {
        (text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase))
            .then_some(false)
    }),
    ("separator", |text, _| {
        text.contains(['_', '/', '\\', ';', ',', ':', '.']).then_some(false)
    }),
    ("digit", |text, _| text.chars().any(|c| c.is_ascii_digit()).then_some(false)),
    ("guid", |text, _| guid_pattern().is_match(text).then_some(false)),
    ("camel-case", |text, _| {
        let mut chars = text.chars();
        let starts_lower = chars.next().is_some_and(char::is_lowercase);
        (starts_lower && chars.any(char::is_uppercase)).then_some(false)
    }),
    ("no-letters", |text, _| (!text.chars().any(char::is_alphabetic)).then_some(false)),
];

/// Run the rules and return the verdict with the name of the deciding rule
#[must_use]
pub fn classify(text: &str, options: &HeuristicOptions) -> (bool, &'static str) {
    RULES
        .iter()
        .find_map(|(name, rule)| rule(text, options).map(|verdict| (verdict, *name)))
        .unwrap_or((true, "word"))
}

/// Whether `text` should be offered for translation
#[must_use]
pub fn is_translatable(text: &str, options: &HeuristicOptions) -> bool {
    classify(text, options).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table() {
        let options = HeuristicOptions::default();
        let cases = [
            ("", false, "blank"),
            ("   ", false, "blank"),
            ("Saves", false, "excluded"),
            ("Hello there", true, "has-space"),
            ("A_B C", true, "has-space"),
            ("Go", false, "too-short"),
            ("NPC", false, "all-uppercase"),
            ("HP2", false, "all-uppercase"),
            ("dialog_node", false, "separator"),
            ("path/to", false, "separator"),
            ("Data.Item", false, "separator"),
            ("Item42", false, "digit"),
            ("abcdefab-abcd-abcd-abcd-abcdefabcdef", false, "guid"),
            ("playerName", false, "camel-case"),
            ("---", false, "no-letters"),
            ("Sword", true, "word"),
            ("abc", true, "word"),
            ("café", true, "word"),
            ("Hello World", true, "has-space"),
            ("OK", false, "too-short"),
            ("HELLO", false, "all-uppercase"),
            ("item_01", false, "separator"),
            ("3f29a1b2-0000-4000-8000-000000000000", false, "digit"),
            ("myVar", false, "camel-case"),
        ];

        for (text, expected, rule) in cases {
            assert_eq!(classify(text, &options), (expected, rule), "text: {text:?}");
        }
    }

    #[test]
    fn test_single_words_disabled() {
        let options = HeuristicOptions {
            include_single_words: false,
            ..HeuristicOptions::default()
        };
        assert_eq!(classify("Sword", &options), (false, "single-word-disabled"));
        assert_eq!(classify("Sword", &HeuristicOptions::default()), (true, "word"));
        assert!(is_translatable("Rusty sword", &options));
    }

    #[test]
    fn test_exclusion_is_exact() {
        let options = HeuristicOptions {
            excluded: vec!["Do not translate".to_string()],
            ..HeuristicOptions::default()
        };
        assert!(!is_translatable("Do not translate", &options));
        assert!(is_translatable("Do not translate!", &options));
        assert!(is_translatable("Saves", &options));
    }
}
