//! .udlg dialog container format
//!
//! A fixed 24-byte header that starts with a signature, followed by an
//! MS-NRBF record stream. The stream may be wrapped in gzip or zlib framing.
//! Bytes after the `MessageEnd` record are kept so the file can be rebuilt
//! exactly. The decoded document serializes to JSON for hand inspection and
//! as the intermediate form between decode and encode.

mod reader;
mod writer;

pub use reader::{parse_udlg_bytes, parse_udlg_json, read_udlg, read_udlg_json};
pub use writer::{serialize_udlg, serialize_udlg_json, write_udlg, write_udlg_json};

use serde::{Deserialize, Serialize};

use crate::compression::{DEFAULT_COMPRESSION_LEVEL, PayloadCompression};
use crate::error::{Error, Result};
use crate::formats::nrbf::Record;

/// Size of the container header, signature included
pub const HEADER_SIZE: usize = 24;

/// Signature expected at the start of the header unless configured otherwise
pub const DEFAULT_SIGNATURE: &[u8] = b"UDLG";

/// A decoded .udlg file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdlgDocument {
    /// The raw header, signature included
    #[serde(with = "hex::serde")]
    pub header: Vec<u8>,
    /// Framing found on the payload, reused when writing
    #[serde(default)]
    pub compression: PayloadCompression,
    /// Records in stream order, ending with `MessageEnd`
    pub records: Vec<Record>,
    /// Anything after `MessageEnd`
    #[serde(default, with = "hex::serde", skip_serializing_if = "Vec::is_empty")]
    pub trailer: Vec<u8>,
}

impl UdlgDocument {
    /// Number of records, `MessageEnd` included
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Codec settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdlgOptions {
    /// Leading header bytes that identify the format. Empty disables the check.
    pub signature: Vec<u8>,
    /// Deflate level used when the payload is recompressed
    pub compression_level: u32,
}

impl Default for UdlgOptions {
    fn default() -> Self {
        Self {
            signature: DEFAULT_SIGNATURE.to_vec(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl UdlgOptions {
    /// Validate that `data` starts with a complete header carrying the signature.
    ///
    /// # Errors
    /// Returns [`Error::SignatureMismatch`] or [`Error::TruncatedHeader`].
    pub fn check_header(&self, data: &[u8]) -> Result<()> {
        if !data.starts_with(&self.signature) {
            let shown = self.signature.len().max(4).min(data.len());
            return Err(Error::SignatureMismatch {
                found: data[..shown].to_vec(),
            });
        }
        if data.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader {
                expected: HEADER_SIZE,
                found: data.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_header() {
        let options = UdlgOptions::default();
        let mut header = b"UDLG".to_vec();
        header.resize(HEADER_SIZE, 0);
        assert!(options.check_header(&header).is_ok());

        let err = options.check_header(b"PK\x03\x04 zip data here....").unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch { ref found } if found == b"PK\x03\x04"));

        let err = options.check_header(b"UDLG\x01\x02").unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedHeader {
                expected: 24,
                found: 6
            }
        ));

        assert!(matches!(
            options.check_header(b"UD"),
            Err(Error::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_signature_accepts_any_header() {
        let options = UdlgOptions {
            signature: Vec::new(),
            ..UdlgOptions::default()
        };
        assert!(options.check_header(&[0xAB; HEADER_SIZE]).is_ok());
    }
}
