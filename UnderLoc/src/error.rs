//! Error types for `UnderLoc`

use thiserror::Error;

use crate::compression::PayloadCompression;

/// The error type for `UnderLoc` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== UDLG Container Errors ====================
    /// The file does not start with the UDLG signature.
    #[error("not a UDLG file: signature mismatch (found {found:02X?})")]
    SignatureMismatch {
        /// The leading bytes that were found instead.
        found: Vec<u8>,
    },

    /// The file ends before the fixed-size header is complete.
    #[error("UDLG header truncated: expected {expected} bytes, found {found}")]
    TruncatedHeader {
        /// Required header length.
        expected: usize,
        /// Bytes available.
        found: usize,
    },

    // ==================== Compression/Decompression Errors ====================
    /// The payload could not be decompressed.
    #[error("{scheme:?} decompression failed: {message}")]
    DecompressionFailed {
        /// The framing detected on the payload.
        scheme: PayloadCompression,
        /// The error message from the decoder.
        message: String,
    },

    /// The size stored in the compressed payload disagrees with the data.
    #[error("payload size mismatch: stored {stored} bytes, decompressed {actual}")]
    PayloadSizeMismatch {
        /// Size recorded in the framing.
        stored: u64,
        /// Size actually produced.
        actual: u64,
    },

    /// The payload could not be recompressed.
    #[error("{scheme:?} compression failed: {message}")]
    CompressionFailed {
        /// The framing being written.
        scheme: PayloadCompression,
        /// The error message from the encoder.
        message: String,
    },

    // ==================== NRBF Record Errors ====================
    /// A record type byte outside the supported set.
    #[error("unsupported record type: {0}")]
    UnsupportedRecordType(u8),

    /// An enumeration byte with no defined meaning.
    #[error("invalid {kind} value: {value}")]
    InvalidEnumValue {
        /// Which enumeration was being read.
        kind: &'static str,
        /// The byte found.
        value: u8,
    },

    /// A `ClassWithId` record refers to class metadata that was never defined.
    #[error("class metadata {0} referenced before definition")]
    UnknownMetadataId(i32),

    /// A negative or oversized length/count field.
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// A variable-length integer longer than five bytes.
    #[error("invalid 7-bit encoded integer")]
    InvalidVarInt,

    /// A boolean primitive holding something other than 0 or 1.
    #[error("invalid boolean byte: {0}")]
    InvalidBoolean(u8),

    /// A char primitive that is not a single UTF-8 scalar.
    #[error("invalid UTF-8 char primitive")]
    InvalidChar,

    /// More array elements than the declared length.
    #[error("array overflow: {found} elements for declared length {declared}")]
    ArrayOverflow {
        /// Declared element count.
        declared: usize,
        /// Elements consumed.
        found: usize,
    },

    /// Records nested deeper than the reader allows.
    #[error("record nesting exceeds {limit} levels")]
    NestingTooDeep {
        /// Maximum depth accepted.
        limit: usize,
    },

    /// Array shapes that cannot be represented (e.g. offset arrays of objects).
    #[error("unsupported array layout: {0}")]
    UnsupportedArray(String),

    // ==================== Translation Table Errors ====================
    /// A required column is missing from the edit table header.
    #[error("translation table is missing the '{0}' column")]
    MissingColumn(&'static str),

    /// A row of the edit table could not be parsed.
    #[error("translation table line {line}: {message}")]
    TableParse {
        /// 1-based line number where the row starts.
        line: usize,
        /// What is wrong with it.
        message: String,
    },

    /// Line-per-translation file does not match the table.
    #[error("translation count mismatch: table has {rows} rows, file has {lines} lines")]
    TranslationCountMismatch {
        /// Rows in the table.
        rows: usize,
        /// Lines in the text file.
        lines: usize,
    },

    // ==================== Literal Patching Errors ====================
    /// A literal index outside the store.
    #[error("literal index {0} out of range")]
    LiteralOutOfRange(usize),

    // ==================== Parsing Errors ====================
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Settings file could not be parsed.
    #[error("config error: {0}")]
    ConfigError(String),

    // ==================== File System Errors ====================
    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

/// Coarse classification of [`Error`] used by batch loops and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not a UDLG file.
    SignatureMismatch,
    /// Corrupt or unsupported payload framing.
    DecompressionFailure,
    /// Edit table malformed.
    TableParse,
    /// Record stream or tree malformed.
    Format,
    /// File system failure.
    Io,
    /// Bad settings or arguments.
    Config,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SignatureMismatch { .. } | Error::TruncatedHeader { .. } => {
                ErrorKind::SignatureMismatch
            }
            Error::DecompressionFailed { .. }
            | Error::PayloadSizeMismatch { .. }
            | Error::CompressionFailed { .. } => ErrorKind::DecompressionFailure,
            Error::MissingColumn(_)
            | Error::TableParse { .. }
            | Error::TranslationCountMismatch { .. } => ErrorKind::TableParse,
            Error::Io(_) | Error::WalkDirError(_) => ErrorKind::Io,
            Error::ConfigError(_) => ErrorKind::Config,
            _ => ErrorKind::Format,
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

/// A specialized Result type for `UnderLoc` operations.
pub type Result<T> = std::result::Result<T, Error>;
