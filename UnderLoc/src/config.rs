//! Settings file types for underloc.toml

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compression::DEFAULT_COMPRESSION_LEVEL;
use crate::error::{Error, Result};
use crate::formats::udlg::{DEFAULT_SIGNATURE, UdlgOptions};
use crate::translation::heuristic::DEFAULT_EXCLUDED;
use crate::translation::{DEFAULT_MARKER, ExtractOptions, ExtractionMode, HeuristicOptions};

/// Name looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "underloc.toml";

fn default_signature() -> String {
    hex::encode(DEFAULT_SIGNATURE)
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

fn default_true() -> bool {
    true
}

fn default_excluded() -> Vec<String> {
    DEFAULT_EXCLUDED.iter().map(ToString::to_string).collect()
}

/// The full settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub codec: CodecSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
}

/// `[codec]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecSettings {
    /// Header signature as hex; empty disables the check
    #[serde(default = "default_signature")]
    pub signature: String,
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            signature: default_signature(),
            compression_level: default_compression_level(),
        }
    }
}

/// `[extraction]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    #[serde(default)]
    pub mode: ExtractionMode,
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_true")]
    pub include_single_words: bool,
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            marker: default_marker(),
            include_single_words: true,
            excluded: default_excluded(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load `path` if given, else `underloc.toml` if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Codec options described by these settings
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the signature is not valid hex or
    /// the compression level is above 9.
    pub fn codec_options(&self) -> Result<UdlgOptions> {
        let signature = parse_signature(&self.codec.signature)?;
        if self.codec.compression_level > 9 {
            return Err(Error::ConfigError(format!(
                "compression level {} is out of range 0-9",
                self.codec.compression_level
            )));
        }
        Ok(UdlgOptions {
            signature,
            compression_level: self.codec.compression_level,
        })
    }

    /// Extraction options described by these settings
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            mode: self.extraction.mode,
            marker: self.extraction.marker.clone(),
            heuristic: HeuristicOptions {
                include_single_words: self.extraction.include_single_words,
                excluded: self.extraction.excluded.clone(),
            },
        }
    }
}

/// Decode a hex signature such as `55444c47`
pub fn parse_signature(text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim())
        .map_err(|e| Error::ConfigError(format!("invalid signature '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.codec_options().unwrap(), UdlgOptions::default());
        assert_eq!(settings.extract_options(), ExtractOptions::default());
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::from_toml(
            r#"
[codec]
signature = ""

[extraction]
mode = "variables"
excluded = ["Saves", "Options"]
"#,
        )
        .unwrap();

        let codec = settings.codec_options().unwrap();
        assert!(codec.signature.is_empty());
        assert_eq!(codec.compression_level, DEFAULT_COMPRESSION_LEVEL);

        let extract = settings.extract_options();
        assert_eq!(extract.mode, ExtractionMode::Variables);
        assert_eq!(extract.marker, DEFAULT_MARKER);
        assert_eq!(extract.heuristic.excluded, vec!["Saves", "Options"]);
    }

    #[test]
    fn test_bad_values() {
        let mut settings = Settings::default();
        settings.codec.signature = "UDLG".to_string();
        assert!(matches!(settings.codec_options(), Err(Error::ConfigError(_))));

        settings.codec.signature = default_signature();
        settings.codec.compression_level = 12;
        assert!(matches!(settings.codec_options(), Err(Error::ConfigError(_))));

        assert!(matches!(
            Settings::from_toml("[extraction]\nmode = \"attributes\""),
            Err(Error::ConfigError(_))
        ));
    }
}
