//! Line-driven exploration session.
//!
//! Each stdin line is one interaction: it derives a new [`FilterSelection`]
//! from the previous one and re-renders the summary. The dataset goes through
//! a [`DatasetCache`] before every render, so edits to the input file are
//! picked up while unchanged input is never parsed twice.
//!
//! Accepted lines:
//!
//! - `region-major=서울,부산` (also `region-minor`, `sex`, `age-band`); an
//!   empty value list clears that control
//! - `start=2024-01`, `end=202406`; an empty value clears the bound
//! - `defaults`, `clear`, `show`, `candidates`, `quit`

use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use log::{debug, info};

use crate::{
    candidates::render_candidates,
    cli::{ExploreArgs, FilterArgs, InputArgs},
    dashboard::Dashboard,
    filter::FilterSelection,
    loader::DatasetCache,
    period,
    roles::Role,
    summary::render_view,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select(Role, Vec<String>),
    Start(Option<NaiveDate>),
    End(Option<NaiveDate>),
    Defaults,
    Clear,
    Show,
    Candidates,
    Quit,
}

pub fn execute(args: &ExploreArgs) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(&args.input, &args.filters, stdin.lock(), stdout.lock())
}

pub fn run_session<R, W>(
    input: &InputArgs,
    filters: &FilterArgs,
    reader: R,
    mut out: W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut cache = DatasetCache::new();
    let mut dashboard = refresh(&mut cache, input, None)?;
    let mut selection = filters.selection(&dashboard);
    write!(out, "{}", render_view(&dashboard, &dashboard.view(&selection)))?;

    let mut interactions = 0usize;
    for line in reader.lines() {
        let line = line.context("Reading session input")?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "error: {err}")?;
                continue;
            }
        };
        if command == SessionCommand::Quit {
            break;
        }
        interactions += 1;
        dashboard = refresh(&mut cache, input, Some(dashboard))?;
        selection = apply(&dashboard, &selection, &command);
        debug!("Selection after {command:?}: {selection:?}");

        writeln!(out)?;
        if command == SessionCommand::Candidates {
            let candidates = dashboard.candidates(&selection);
            write!(out, "{}", render_candidates(dashboard.roles(), &candidates))?;
        } else {
            write!(out, "{}", render_view(&dashboard, &dashboard.view(&selection)))?;
        }
    }
    out.flush()?;
    info!("Explore session ended after {interactions} interaction(s)");
    Ok(())
}

/// Reloads through the cache, rebuilding the dashboard only when the
/// underlying dataset changed.
fn refresh(
    cache: &mut DatasetCache,
    input: &InputArgs,
    current: Option<Dashboard>,
) -> Result<Dashboard> {
    let dataset = cache
        .load(&input.input, input.delimiter)
        .with_context(|| format!("Loading {:?}", input.input))?;
    match current {
        Some(dashboard) if std::ptr::eq(dashboard.dataset(), Arc::as_ptr(&dataset)) => {
            Ok(dashboard)
        }
        _ => Ok(Dashboard::new(dataset)),
    }
}

fn apply(
    dashboard: &Dashboard,
    selection: &FilterSelection,
    command: &SessionCommand,
) -> FilterSelection {
    match command {
        SessionCommand::Select(role, values) => {
            selection.clone().with_values(*role, values.clone())
        }
        SessionCommand::Start(start) => selection.clone().with_period(*start, selection.end()),
        SessionCommand::End(end) => selection.clone().with_period(selection.start(), *end),
        SessionCommand::Defaults => dashboard.initial_selection(),
        SessionCommand::Clear => FilterSelection::new(),
        SessionCommand::Show | SessionCommand::Candidates | SessionCommand::Quit => {
            selection.clone()
        }
    }
}

pub fn parse_command(line: &str) -> Result<Option<SessionCommand>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let Some((key, value)) = trimmed.split_once('=') else {
        let command = match trimmed.to_ascii_lowercase().as_str() {
            "defaults" => SessionCommand::Defaults,
            "clear" => SessionCommand::Clear,
            "show" => SessionCommand::Show,
            "candidates" => SessionCommand::Candidates,
            "quit" | "exit" => SessionCommand::Quit,
            _ => bail!("Unknown command '{trimmed}'"),
        };
        return Ok(Some(command));
    };

    let key = key.trim().to_ascii_lowercase();
    let value = value.trim();
    let role = match key.as_str() {
        "region-major" => Role::RegionMajor,
        "region-minor" => Role::RegionMinor,
        "sex" => Role::Sex,
        "age-band" => Role::AgeBand,
        "start" | "end" => {
            let bound = if value.is_empty() {
                None
            } else {
                Some(period::parse_date_bound(value)?)
            };
            return Ok(Some(if key == "start" {
                SessionCommand::Start(bound)
            } else {
                SessionCommand::End(bound)
            }));
        }
        other => return Err(anyhow!("Unknown filter control '{other}'")),
    };
    let values = value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(SessionCommand::Select(role, values)))
}
