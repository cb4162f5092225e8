//! CLI command for rebuilding UDLG files

use std::path::Path;
use std::time::Instant;

use anyhow::bail;

use super::decode::UDLG_EXTENSION;
use super::{GlobalArgs, ensure_parent, sibling_dir};
use crate::batch::{JSON_EXTENSION, batch_encode, find_files};
use crate::cli::progress::{
    DISK, DOCUMENT, TRUCK, print_batch_summary, print_done, print_step, simple_bar, update_bar,
};
use crate::operations::UdlgOperations;
use crate::translation::{ApplyReport, read_table};

pub fn execute(
    input: &Path,
    output: Option<&Path>,
    csv: Option<&Path>,
    include_file: bool,
    global: &GlobalArgs,
) -> anyhow::Result<()> {
    let (codec, extract) = global.resolve()?;
    let started = Instant::now();
    let steps = if csv.is_some() { 2 } else { 1 };

    let table = match csv {
        Some(path) => {
            if !path.exists() {
                bail!("Table {} does not exist", path.display());
            }
            let (table, layout) = read_table(path, extract.mode.category())?;
            if include_file && !layout.include_file {
                bail!("Table {} has no File column", path.display());
            }
            if !global.quiet {
                print_step(
                    1,
                    steps,
                    DOCUMENT,
                    &format!(
                        "Loaded {} entries ({} translated) from {}",
                        table.len(),
                        table.translated_count(),
                        path.display()
                    ),
                );
            }
            Some(table)
        }
        None => None,
    };

    let (report, failed): (ApplyReport, usize) = if input.is_file() {
        let output_path =
            output.map_or_else(|| input.with_extension(UDLG_EXTENSION), Path::to_path_buf);
        ensure_parent(&output_path)?;
        if !global.quiet {
            print_step(steps, steps, DISK, &format!("Encoding {}...", input.display()));
        }
        let report =
            UdlgOperations::encode_file(input, &output_path, table.as_ref(), &codec, &extract)?;
        (report, 0)
    } else if input.is_dir() {
        let output_dir = output.map_or_else(|| sibling_dir(input, UDLG_EXTENSION), Path::to_path_buf);
        let files = find_files(input, JSON_EXTENSION);
        if !global.quiet {
            print_step(
                steps,
                steps,
                TRUCK,
                &format!("Encoding {} files from {}...", files.len(), input.display()),
            );
        }

        let pb = simple_bar(files.len() as u64, "Encoding", global.quiet);
        let result = batch_encode(
            &files,
            input,
            &output_dir,
            UDLG_EXTENSION,
            table.as_ref(),
            &codec,
            &extract,
            |progress| update_bar(&pb, progress),
        );
        pb.finish_and_clear();

        if !global.quiet {
            print_batch_summary(result.success_count, result.fail_count, &result.outcomes);
        }
        (result.report, result.fail_count)
    } else {
        bail!("{} is not a valid file or directory", input.display());
    };

    if !global.quiet {
        if table.is_some() {
            println!(
                "  Applied: {}, stale: {}, untouched: {}",
                report.applied, report.stale, report.untouched
            );
        }
        print_done(started.elapsed());
    }
    if failed > 0 {
        bail!("{failed} file(s) could not be encoded");
    }
    Ok(())
}
