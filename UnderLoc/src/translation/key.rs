//! Stable content keys
//!
//! A key is `md5("<category>:<normalized text>")` as 32 lowercase hex
//! characters. It depends on nothing but the text and its category, which
//! makes it the join column between file versions, languages, and the
//! literal patching tool.

use super::TextCategory;

/// Escape that stands in for a line break in normalized text
pub const LINE_BREAK_ESCAPE: &str = "\\n";

/// Line break convention to restore when writing text back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreakStyle {
    #[default]
    Crlf,
    Lf,
}

impl LineBreakStyle {
    /// Style used by `text`: CRLF if it has any, LF if it only has bare
    /// line feeds, CRLF when it has no line breaks at all.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::Crlf
        } else if text.contains('\n') {
            Self::Lf
        } else {
            Self::Crlf
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crlf => "\r\n",
            Self::Lf => "\n",
        }
    }
}

/// Replace CRLF and LF line breaks with the two-character `\n` escape
#[must_use]
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", LINE_BREAK_ESCAPE)
        .replace('\n', LINE_BREAK_ESCAPE)
}

/// Turn `\n` escapes (and any raw line breaks) back into real line breaks
/// of the given style
#[must_use]
pub fn restore_line_breaks(text: &str, style: LineBreakStyle) -> String {
    normalize_line_breaks(text).replace(LINE_BREAK_ESCAPE, style.as_str())
}

/// Derive the stable key for already-normalized `text`
#[must_use]
pub fn stable_key(text: &str, category: TextCategory) -> String {
    let digest = md5::compute(format!("{}:{}", category.as_str(), text));
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shape_and_determinism() {
        let key = stable_key("Hello there", TextCategory::English);
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(key, stable_key("Hello there", TextCategory::English));
    }

    #[test]
    fn test_known_digest() {
        // md5("english:") is fixed forever
        assert_eq!(
            stable_key("", TextCategory::English),
            format!("{:x}", md5::compute(b"english:"))
        );
    }

    #[test]
    fn test_category_separates_keys() {
        let english = stable_key("Sword", TextCategory::English);
        let variable = stable_key("Sword", TextCategory::Variable);
        let literal = stable_key("Sword", TextCategory::Literal);
        assert_ne!(english, variable);
        assert_ne!(variable, literal);
        assert_ne!(english, literal);
    }

    #[test]
    fn test_position_independent_but_content_sensitive() {
        assert_ne!(
            stable_key("Hello there", TextCategory::English),
            stable_key("Hello there.", TextCategory::English)
        );
        assert_ne!(
            stable_key("Hello there", TextCategory::English),
            stable_key("Hello there ", TextCategory::English)
        );
    }

    #[test]
    fn test_line_break_normalization() {
        assert_eq!(normalize_line_breaks("a\r\nb\nc"), "a\\nb\\nc");
        assert_eq!(
            stable_key(&normalize_line_breaks("a\r\nb"), TextCategory::English),
            stable_key(&normalize_line_breaks("a\nb"), TextCategory::English)
        );
    }

    #[test]
    fn test_restore_line_breaks() {
        assert_eq!(restore_line_breaks("a\\nb", LineBreakStyle::Crlf), "a\r\nb");
        assert_eq!(restore_line_breaks("a\\nb", LineBreakStyle::Lf), "a\nb");
        assert_eq!(restore_line_breaks("a\r\nb\nc", LineBreakStyle::Lf), "a\nb\nc");
    }

    #[test]
    fn test_detect_style() {
        assert_eq!(LineBreakStyle::detect("x\r\ny"), LineBreakStyle::Crlf);
        assert_eq!(LineBreakStyle::detect("x\ny"), LineBreakStyle::Lf);
        assert_eq!(LineBreakStyle::detect("xy"), LineBreakStyle::Crlf);
    }
}
