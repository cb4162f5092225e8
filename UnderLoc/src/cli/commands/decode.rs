//! CLI command for decoding UDLG files

use std::path::Path;
use std::time::Instant;

use anyhow::bail;

use super::{GlobalArgs, ensure_parent, sibling_dir};
use crate::batch::{batch_decode, find_files};
use crate::cli::progress::{
    DOCUMENT, LOOKING_GLASS, TRUCK, print_batch_summary, print_done, print_step, simple_bar,
    update_bar,
};
use crate::operations::UdlgOperations;
use crate::translation::{TableLayout, write_table};

/// Extension of dialog containers
pub const UDLG_EXTENSION: &str = "udlg";

pub fn execute(
    input: &Path,
    output: Option<&Path>,
    extract_csv: bool,
    include_file: bool,
    global: &GlobalArgs,
) -> anyhow::Result<()> {
    let (codec, extract) = global.resolve()?;
    let started = Instant::now();
    let steps = if extract_csv { 2 } else { 1 };

    let (table, failed) = if input.is_file() {
        let output_path = output.map_or_else(|| input.with_extension("json"), Path::to_path_buf);
        ensure_parent(&output_path)?;
        if !global.quiet {
            print_step(1, steps, LOOKING_GLASS, &format!("Decoding {}...", input.display()));
        }
        let label = input.to_string_lossy();
        let table = UdlgOperations::decode_file(
            input,
            &output_path,
            &codec,
            &extract,
            include_file.then_some(label.as_ref()),
        )?;
        (table, 0)
    } else if input.is_dir() {
        let output_dir = output.map_or_else(|| sibling_dir(input, "json"), Path::to_path_buf);
        let files = find_files(input, UDLG_EXTENSION);
        if !global.quiet {
            print_step(
                1,
                steps,
                TRUCK,
                &format!("Decoding {} files from {}...", files.len(), input.display()),
            );
        }

        let pb = simple_bar(files.len() as u64, "Decoding", global.quiet);
        let result = batch_decode(&files, input, &output_dir, &codec, &extract, |progress| {
            update_bar(&pb, progress);
        });
        pb.finish_and_clear();

        if !global.quiet {
            print_batch_summary(result.success_count, result.fail_count, &result.outcomes);
        }
        (result.table, result.fail_count)
    } else {
        bail!("{} is not a valid file or directory", input.display());
    };

    if extract_csv {
        let table_path = output.unwrap_or(input).with_extension("csv");
        ensure_parent(&table_path)?;
        let layout = TableLayout::for_mode(extract.mode, include_file);
        let rows = write_table(&table_path, &table, layout)?;
        if !global.quiet {
            print_step(
                2,
                steps,
                DOCUMENT,
                &format!("Wrote {rows} entries to {}", table_path.display()),
            );
        }
    }

    if !global.quiet {
        print_done(started.elapsed());
    }
    if failed > 0 {
        bail!("{failed} file(s) could not be decoded");
    }
    Ok(())
}
