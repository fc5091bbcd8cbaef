pub mod aggregate;
pub mod candidates;
pub mod cli;
pub mod dashboard;
pub mod explore;
pub mod export;
pub mod filter;
pub mod io_utils;
pub mod loader;
pub mod period;
pub mod preview;
pub mod roles;
pub mod summary;
pub mod table;

use std::{env, sync::Arc, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands, InputArgs},
    dashboard::Dashboard,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("popdash", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => summary::execute(&args),
        Commands::Candidates(args) => candidates::execute(&args),
        Commands::Export(args) => export::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Explore(args) => explore::execute(&args),
    }
}

/// Loads the input file and builds the dashboard state for one command.
pub(crate) fn open_dashboard(input: &InputArgs) -> Result<Dashboard> {
    let delimiter = io_utils::resolve_input_delimiter(&input.input, input.delimiter);
    debug!(
        "Opening {:?} with delimiter '{}'",
        input.input,
        printable_delimiter(delimiter)
    );
    let dataset = loader::load_with_delimiter(&input.input, delimiter)
        .with_context(|| format!("Loading {:?}", input.input))?;
    Ok(Dashboard::new(Arc::new(dataset)))
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
