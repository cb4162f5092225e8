//! CLI commands for editing the Translation column outside a spreadsheet

use std::path::Path;

use crate::translation::{export_translation_column, insert_translation_column, normalize_table};

/// Dump translations to a text file
pub fn export(csv: &Path, output: &Path) -> anyhow::Result<()> {
    let count = export_translation_column(csv, output)?;
    println!("Exported {count} translations to {}", output.display());
    Ok(())
}

/// Load translations back from a text file
pub fn insert(csv: &Path, input: &Path) -> anyhow::Result<()> {
    let count = insert_translation_column(csv, input)?;
    println!("Inserted {count} translations into {}", csv.display());
    Ok(())
}

/// Rewrite a table canonically
pub fn normalize(input: &Path, output: &Path) -> anyhow::Result<()> {
    let count = normalize_table(input, output)?;
    println!("Wrote {count} rows to {}", output.display());
    Ok(())
}
