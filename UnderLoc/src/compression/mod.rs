//! Payload compression
//!
//! UDLG payloads are stored raw or wrapped in gzip or zlib framing. The
//! framing is detected from the leading bytes and the same scheme is used
//! again when the container is written back.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed deflate level so that re-encoding is reproducible.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Framing applied to a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadCompression {
    /// Stored as-is
    #[default]
    None,
    /// RFC 1952 gzip member
    Gzip,
    /// RFC 1950 zlib stream
    Zlib,
}

impl PayloadCompression {
    /// Classify a payload by its leading bytes
    #[must_use]
    pub fn classify(data: &[u8]) -> Self {
        match data {
            [a, b, ..] if [*a, *b] == GZIP_MAGIC => Self::Gzip,
            [cmf, flg, ..] if is_zlib_header(*cmf, *flg) => Self::Zlib,
            _ => Self::None,
        }
    }

    /// Get a short display name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
        }
    }
}

/// CMF must announce deflate with a window of at most 32K and the
/// CMF/FLG pair must be a multiple of 31.
fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == 8 && cmf >> 4 <= 7 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}

/// Decompress a payload framed with `scheme`
///
/// # Errors
/// Returns [`Error::DecompressionFailed`] if the stream is corrupt, or
/// [`Error::PayloadSizeMismatch`] if a gzip size trailer disagrees with the data.
pub fn decompress(data: &[u8], scheme: PayloadCompression) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let failed = |e: std::io::Error| Error::DecompressionFailed {
        scheme,
        message: e.to_string(),
    };

    match scheme {
        PayloadCompression::None => out.extend_from_slice(data),
        PayloadCompression::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out).map_err(failed)?;
            verify_gzip_size(data, out.len())?;
        }
        PayloadCompression::Zlib => {
            ZlibDecoder::new(data).read_to_end(&mut out).map_err(failed)?;
        }
    }

    Ok(out)
}

/// Check the ISIZE trailer (uncompressed length mod 2^32) of a gzip member.
fn verify_gzip_size(data: &[u8], actual: usize) -> Result<()> {
    let Some(trailer) = data.len().checked_sub(4).map(|start| &data[start..]) else {
        return Err(Error::DecompressionFailed {
            scheme: PayloadCompression::Gzip,
            message: "missing size trailer".to_string(),
        });
    };
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = actual as u64;
    if u64::from(stored) != actual & 0xFFFF_FFFF {
        return Err(Error::PayloadSizeMismatch {
            stored: u64::from(stored),
            actual,
        });
    }
    Ok(())
}

/// Compress a payload with `scheme` at a fixed `level`
///
/// # Errors
/// Returns [`Error::CompressionFailed`] if the encoder fails.
pub fn compress(data: &[u8], scheme: PayloadCompression, level: u32) -> Result<Vec<u8>> {
    let failed = |e: std::io::Error| Error::CompressionFailed {
        scheme,
        message: e.to_string(),
    };
    let level = Compression::new(level.min(9));

    match scheme {
        PayloadCompression::None => Ok(data.to_vec()),
        PayloadCompression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), level);
            encoder.write_all(data).map_err(failed)?;
            encoder.finish().map_err(failed)
        }
        PayloadCompression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(data).map_err(failed)?;
            encoder.finish().map_err(failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"\x00\x01\x00\x00\x00\xff\xff\xff\xff some record bytes";

    #[test]
    fn test_classify() {
        assert_eq!(PayloadCompression::classify(SAMPLE), PayloadCompression::None);
        assert_eq!(PayloadCompression::classify(&[]), PayloadCompression::None);
        assert_eq!(PayloadCompression::classify(&[0x1F]), PayloadCompression::None);
        assert_eq!(PayloadCompression::classify(&[0x1F, 0x8B, 0x08]), PayloadCompression::Gzip);
        assert_eq!(PayloadCompression::classify(&[0x78, 0x9C]), PayloadCompression::Zlib);
        assert_eq!(PayloadCompression::classify(&[0x78, 0x01]), PayloadCompression::Zlib);
        assert_eq!(PayloadCompression::classify(&[0x78, 0xDA]), PayloadCompression::Zlib);
        // Right CMF, bad check bits
        assert_eq!(PayloadCompression::classify(&[0x78, 0x9D]), PayloadCompression::None);
    }

    #[test]
    fn test_compressed_output_is_reclassified() {
        for scheme in [PayloadCompression::Gzip, PayloadCompression::Zlib] {
            let packed = compress(SAMPLE, scheme, DEFAULT_COMPRESSION_LEVEL).unwrap();
            assert_eq!(PayloadCompression::classify(&packed), scheme);
            assert_eq!(decompress(&packed, scheme).unwrap(), SAMPLE);
        }
    }

    #[test]
    fn test_fixed_level_is_reproducible() {
        let a = compress(SAMPLE, PayloadCompression::Gzip, 6).unwrap();
        let b = compress(SAMPLE, PayloadCompression::Gzip, 6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_corrupt_payload() {
        let mut packed = compress(SAMPLE, PayloadCompression::Zlib, 6).unwrap();
        let last = packed.len() - 1;
        packed[last] ^= 0xFF;
        let err = decompress(&packed, PayloadCompression::Zlib).unwrap_err();
        assert!(matches!(err, Error::DecompressionFailed { .. }));
    }

    #[test]
    fn test_gzip_size_trailer_checked() {
        let mut packed = compress(SAMPLE, PayloadCompression::Gzip, 6).unwrap();
        let len = packed.len();
        packed[len - 4] = packed[len - 4].wrapping_add(1);
        assert!(decompress(&packed, PayloadCompression::Gzip).is_err());
    }
}
