use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    cli::ExportArgs,
    filter::RowMask,
    io_utils::{self, DEFAULT_CSV_DELIMITER},
    loader::Dataset,
};

/// Name of the download file written into `--output-dir`.
pub const DOWNLOAD_FILE_NAME: &str = "filtered_population.csv";

pub fn execute(args: &ExportArgs) -> Result<()> {
    let dashboard = crate::open_dashboard(&args.input)?;
    let selection = args.filters.selection(&dashboard);
    let mask = dashboard.mask(&selection);
    let destination = output_path(args);

    let written = write_filtered(dashboard.dataset(), &mask, &destination)
        .with_context(|| format!("Exporting filtered rows to {destination:?}"))?;
    info!(
        "Exported {} of {} row(s) to {:?}",
        written,
        dashboard.dataset().row_count(),
        destination
    );
    Ok(())
}

fn output_path(args: &ExportArgs) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| args.output_dir.join(DOWNLOAD_FILE_NAME))
}

/// Writes the header and every selected row as comma-separated UTF-8 with a
/// byte-order mark. Returns the number of data rows written.
pub fn write_filtered(dataset: &Dataset, mask: &RowMask, path: &Path) -> Result<usize> {
    if mask.len() != dataset.row_count() {
        bail!(
            "Row mask covers {} row(s) but the dataset has {}",
            mask.len(),
            dataset.row_count()
        );
    }
    let mut writer = io_utils::open_csv_writer(path, DEFAULT_CSV_DELIMITER, true)?;
    writer
        .write_record(dataset.headers())
        .context("Writing header row")?;
    let mut written = 0usize;
    for (row, (cells, keep)) in dataset.rows().iter().zip(mask.as_slice()).enumerate() {
        if !*keep {
            continue;
        }
        writer
            .write_record(cells)
            .with_context(|| format!("Writing row {}", row + 2))?;
        written += 1;
    }
    writer.flush().context("Flushing output")?;
    Ok(written)
}
