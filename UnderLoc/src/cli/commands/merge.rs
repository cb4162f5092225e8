//! CLI command for merging translation tables

use std::path::Path;

use anyhow::bail;
use console::style;

use super::GlobalArgs;
use crate::translation::merge_table_files;

pub fn execute(base: &Path, new: &Path, merged: &Path, global: &GlobalArgs) -> anyhow::Result<()> {
    for path in [base, new] {
        if !path.exists() {
            bail!("Table {} does not exist", path.display());
        }
    }

    let (_, extract) = global.resolve()?;
    let report = merge_table_files(base, new, merged, extract.mode.category())?;

    if !global.quiet {
        println!("Merged into {}:", merged.display());
        println!("  Carried: {}", style(report.carried).green());
        println!("  Changed: {}", style(report.changed).yellow());
        println!("  Added: {}", report.added);
        println!("  Dropped: {}", style(report.dropped).dim());
    }
    Ok(())
}
