//! Single-file UDLG workflows

use std::path::Path;

use crate::error::Result;
use crate::formats::udlg::{UdlgOptions, read_udlg, read_udlg_json, write_udlg, write_udlg_json};
use crate::translation::{
    ApplyReport, ExtractOptions, TranslationTable, apply_translations, extract_entries,
};

pub struct UdlgOperations;

impl UdlgOperations {
    /// Decode a UDLG file into a JSON tree and collect its translatable text
    ///
    /// `file_label` is recorded on every entry (the File column).
    pub fn decode_file<P: AsRef<Path>, Q: AsRef<Path>>(
        input: P,
        output_json: Q,
        codec: &UdlgOptions,
        extract: &ExtractOptions,
        file_label: Option<&str>,
    ) -> Result<TranslationTable> {
        let doc = read_udlg(&input, codec)?;
        write_udlg_json(&output_json, &doc)?;

        let table = extract_entries(&doc, extract, file_label);
        tracing::info!(
            "Decoded {} ({} records, {} entries)",
            input.as_ref().display(),
            doc.record_count(),
            table.len()
        );
        Ok(table)
    }

    /// Rebuild a UDLG file from a JSON tree, applying `table` when given
    pub fn encode_file<P: AsRef<Path>, Q: AsRef<Path>>(
        input_json: P,
        output_udlg: Q,
        table: Option<&TranslationTable>,
        codec: &UdlgOptions,
        extract: &ExtractOptions,
    ) -> Result<ApplyReport> {
        let mut doc = read_udlg_json(&input_json)?;

        let report = match table {
            Some(table) => apply_translations(&mut doc, table, extract),
            None => ApplyReport::default(),
        };

        write_udlg(&output_udlg, &doc, codec)?;
        tracing::info!(
            "Encoded {} ({} translations applied, {} stale)",
            output_udlg.as_ref().display(),
            report.applied,
            report.stale
        );
        Ok(report)
    }
}
