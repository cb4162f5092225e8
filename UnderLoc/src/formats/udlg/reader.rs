//! .udlg file reading and parsing

use std::fs;
use std::path::Path;

use super::{HEADER_SIZE, UdlgDocument, UdlgOptions};
use crate::compression::{PayloadCompression, decompress};
use crate::error::Result;
use crate::formats::nrbf::parse_records;

/// Read a .udlg file from disk
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, plus anything
/// [`parse_udlg_bytes`] reports.
///
/// [`Error::Io`]: crate::Error::Io
pub fn read_udlg<P: AsRef<Path>>(path: P, options: &UdlgOptions) -> Result<UdlgDocument> {
    let data = fs::read(path)?;
    parse_udlg_bytes(&data, options)
}

/// Parse .udlg data from bytes
///
/// # Errors
///
/// Returns [`Error::SignatureMismatch`] or [`Error::TruncatedHeader`] for
/// anything that is not a UDLG file, [`Error::DecompressionFailed`] for a
/// corrupt payload, and a format error for a malformed record stream.
///
/// [`Error::SignatureMismatch`]: crate::Error::SignatureMismatch
/// [`Error::TruncatedHeader`]: crate::Error::TruncatedHeader
/// [`Error::DecompressionFailed`]: crate::Error::DecompressionFailed
pub fn parse_udlg_bytes(data: &[u8], options: &UdlgOptions) -> Result<UdlgDocument> {
    options.check_header(data)?;

    let (header, payload) = data.split_at(HEADER_SIZE);
    let compression = PayloadCompression::classify(payload);
    let stream = decompress(payload, compression)?;

    let (records, consumed) = parse_records(&stream)?;
    let trailer = stream[consumed..].to_vec();

    tracing::debug!(
        "Parsed {} records ({} stream bytes, {} trailing, compression {})",
        records.len(),
        consumed,
        trailer.len(),
        compression.as_str()
    );

    Ok(UdlgDocument {
        header: header.to_vec(),
        compression,
        records,
        trailer,
    })
}

/// Read a decoded document from its JSON form on disk
///
/// # Errors
/// Returns an error if the file cannot be read or has invalid JSON.
pub fn read_udlg_json<P: AsRef<Path>>(path: P) -> Result<UdlgDocument> {
    let content = fs::read_to_string(path)?;
    parse_udlg_json(&content)
}

/// Parse a decoded document from JSON
///
/// # Errors
/// Returns an error if the JSON is malformed.
pub fn parse_udlg_json(content: &str) -> Result<UdlgDocument> {
    let doc: UdlgDocument = serde_json::from_str(content)?;
    Ok(doc)
}
