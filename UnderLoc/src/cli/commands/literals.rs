//! CLI commands for string literals of the game binary

use std::path::{Path, PathBuf};

use super::GlobalArgs;
use crate::patch::{MemoryLiteralStore, extract_literals, patch_literals};
use crate::translation::{TableLayout, TextCategory, read_table, write_table};

pub fn extract(
    input: &Path,
    output: &Path,
    include_file: bool,
    global: &GlobalArgs,
) -> anyhow::Result<()> {
    let (_, options) = global.resolve()?;
    let store = MemoryLiteralStore::load(input)?;

    let label = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string());
    let table = extract_literals(&store, &options.heuristic, label.as_deref());
    let layout = TableLayout {
        include_file,
        ..TableLayout::default()
    };
    let rows = write_table(output, &table, layout)?;

    println!(
        "Extracted {rows} of {} literals to {}",
        store.len(),
        output.display()
    );
    Ok(())
}

pub fn patch(input: &Path, csv: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let mut store = MemoryLiteralStore::load(input)?;
    let (table, _) = read_table(csv, TextCategory::Literal)?;
    let report = patch_literals(&mut store, &table)?;

    let output = output.map_or_else(|| patched_path(input), Path::to_path_buf);
    store.save(&output)?;

    println!(
        "Patched {} literals ({} stale) into {}",
        report.applied,
        report.stale,
        output.display()
    );
    Ok(())
}

fn patched_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_patched.json"))
}
