//! .udlg file writing

use std::fs;
use std::path::Path;

use super::{HEADER_SIZE, UdlgDocument, UdlgOptions};
use crate::compression::compress;
use crate::error::{Error, Result};
use crate::formats::nrbf::write_records;

/// Write a .udlg file to disk
///
/// # Errors
/// Returns an error if serialization or file writing fails.
pub fn write_udlg<P: AsRef<Path>>(path: P, doc: &UdlgDocument, options: &UdlgOptions) -> Result<()> {
    let bytes = serialize_udlg(doc, options)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a document to .udlg bytes
///
/// The payload is recompressed with the scheme recorded in the document at
/// the configured level.
///
/// # Errors
/// Returns [`Error::TruncatedHeader`] or [`Error::SignatureMismatch`] if the
/// header was edited into something invalid, or an error from the record
/// writer or compressor.
pub fn serialize_udlg(doc: &UdlgDocument, options: &UdlgOptions) -> Result<Vec<u8>> {
    if doc.header.len() != HEADER_SIZE {
        return Err(Error::TruncatedHeader {
            expected: HEADER_SIZE,
            found: doc.header.len(),
        });
    }
    options.check_header(&doc.header)?;

    let mut stream = write_records(&doc.records)?;
    stream.extend_from_slice(&doc.trailer);
    let payload = compress(&stream, doc.compression, options.compression_level)?;

    tracing::debug!(
        "Serialized {} records ({} stream bytes, {} payload bytes)",
        doc.records.len(),
        stream.len(),
        payload.len()
    );

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&doc.header);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Write a decoded document as JSON
///
/// # Errors
/// Returns an error if serialization or file writing fails.
pub fn write_udlg_json<P: AsRef<Path>>(path: P, doc: &UdlgDocument) -> Result<()> {
    let json = serialize_udlg_json(doc)?;
    fs::write(path, json)?;
    Ok(())
}

/// Serialize a decoded document to pretty-printed JSON
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn serialize_udlg_json(doc: &UdlgDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

#[cfg(test)]
mod tests {
    use super::super::{parse_udlg_bytes, parse_udlg_json};
    use super::*;
    use crate::compression::PayloadCompression;
    use crate::formats::nrbf::{Primitive, PrimitiveType, Record, StreamHeader};
    use pretty_assertions::assert_eq;

    fn sample_doc(compression: PayloadCompression) -> UdlgDocument {
        let mut header = b"UDLG".to_vec();
        header.extend_from_slice(&[1, 0, 0, 0, 0xEE, 0xFF]);
        header.resize(HEADER_SIZE, 0x42);
        UdlgDocument {
            header,
            compression,
            records: vec![
                Record::SerializedStreamHeader(StreamHeader {
                    root_id: 1,
                    header_id: -1,
                    major_version: 1,
                    minor_version: 0,
                }),
                Record::BinaryObjectString {
                    object_id: 1,
                    value: "Line one\r\nLine two".to_string(),
                },
                Record::MemberPrimitiveTyped {
                    value: Primitive::Single(1.5),
                },
                Record::MessageEnd,
            ],
            trailer: vec![0xDE, 0xAD],
        }
    }

    #[test]
    fn test_round_trip_all_schemes() {
        let options = UdlgOptions::default();
        for scheme in [
            PayloadCompression::None,
            PayloadCompression::Gzip,
            PayloadCompression::Zlib,
        ] {
            let doc = sample_doc(scheme);
            let bytes = serialize_udlg(&doc, &options).unwrap();
            let parsed = parse_udlg_bytes(&bytes, &options).unwrap();
            assert_eq!(parsed, doc);
            assert_eq!(serialize_udlg(&parsed, &options).unwrap(), bytes);
        }
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample_doc(PayloadCompression::Zlib);
        let json = serialize_udlg_json(&doc).unwrap();
        assert!(json.contains("\"compression\": \"zlib\""));
        assert!(json.contains("\"trailer\": \"dead\""));
        assert_eq!(parse_udlg_json(&json).unwrap(), doc);
    }

    #[test]
    fn test_json_preserves_double_bits() {
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let values: Vec<Primitive> = (0..2000)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                Primitive::Double(f64::from_bits(state))
            })
            .collect();

        let mut header = b"UDLG".to_vec();
        header.resize(HEADER_SIZE, 0);
        let doc = UdlgDocument {
            header,
            compression: PayloadCompression::None,
            records: vec![
                Record::SerializedStreamHeader(StreamHeader {
                    root_id: 1,
                    header_id: -1,
                    major_version: 1,
                    minor_version: 0,
                }),
                Record::ArraySinglePrimitive {
                    object_id: 1,
                    primitive_type: PrimitiveType::Double,
                    values,
                },
                Record::MessageEnd,
            ],
            trailer: Vec::new(),
        };

        let options = UdlgOptions::default();
        let bytes = serialize_udlg(&doc, &options).unwrap();
        let json = serialize_udlg_json(&parse_udlg_bytes(&bytes, &options).unwrap()).unwrap();
        let rebuilt = serialize_udlg(&parse_udlg_json(&json).unwrap(), &options).unwrap();
        assert!(rebuilt == bytes, "doubles changed through JSON");
    }

    #[test]
    fn test_rejects_bad_header_length() {
        let mut doc = sample_doc(PayloadCompression::None);
        doc.header.truncate(10);
        assert!(matches!(
            serialize_udlg(&doc, &UdlgOptions::default()),
            Err(Error::TruncatedHeader { found: 10, .. })
        ));
    }
}
