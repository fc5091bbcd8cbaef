use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let dashboard = crate::open_dashboard(&args.input)?;
    let dataset = dashboard.dataset();
    let rows = dataset
        .rows()
        .iter()
        .take(args.rows)
        .cloned()
        .collect::<Vec<_>>();

    table::print_table(dataset.headers(), &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), args.input.input);
    Ok(())
}
