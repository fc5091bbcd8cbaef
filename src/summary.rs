use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{OutputFormat, SummaryArgs},
    dashboard::{Dashboard, DashboardView},
    roles::Role,
    table,
};

pub fn execute(args: &SummaryArgs) -> Result<()> {
    let dashboard = crate::open_dashboard(&args.input)?;
    let selection = args.filters.selection(&dashboard);
    let view = dashboard.view(&selection);

    match args.format {
        OutputFormat::Table => print!("{}", render_view(&dashboard, &view)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&view).context("Serializing summary")?;
            println!("{json}");
        }
    }
    info!(
        "Summarized {} of {} row(s) from {:?}",
        view.summary.rows,
        dashboard.dataset().row_count(),
        args.input.input
    );
    Ok(())
}

/// Text rendering of one view: metrics first, then each non-empty chart table.
pub fn render_view(dashboard: &Dashboard, view: &DashboardView) -> String {
    let roles = dashboard.roles();
    let column = |role: Role, fallback: &str| roles.get(role).unwrap_or(fallback).to_string();
    let mut sections = Vec::new();

    let mut metrics = vec![vec!["rows".to_string(), format_count(view.summary.rows as f64)]];
    if let Some(population) = view.summary.population {
        metrics.push(vec!["total population".to_string(), format_count(population)]);
    }
    if let Some(households) = view.summary.households {
        metrics.push(vec!["total households".to_string(), format_count(households)]);
    }
    sections.push(section(
        "Summary",
        &["metric".to_string(), "value".to_string()],
        &metrics,
    ));

    let population = column(Role::PopulationCount, "population");
    if !view.by_period.is_empty() {
        let rows = view
            .by_period
            .iter()
            .map(|t| vec![t.period.to_string(), format_count(t.population)])
            .collect::<Vec<_>>();
        sections.push(section(
            "Population by period",
            &[column(Role::Period, "period"), population.clone()],
            &rows,
        ));
    }

    if !view.by_age_sex.is_empty() {
        let rows = view
            .by_age_sex
            .iter()
            .map(|t| vec![t.age_band.clone(), t.sex.clone(), format_count(t.population)])
            .collect::<Vec<_>>();
        sections.push(section(
            "Population by age band and sex",
            &[
                column(Role::AgeBand, "age_band"),
                column(Role::Sex, "sex"),
                population.clone(),
            ],
            &rows,
        ));
    }

    if !view.by_region.is_empty() {
        let rows = view
            .by_region
            .iter()
            .map(|t| vec![t.region.clone(), format_count(t.population)])
            .collect::<Vec<_>>();
        sections.push(section(
            "Top regions by population",
            &[column(Role::RegionMajor, "region"), population],
            &rows,
        ));
    }

    sections.join("\n")
}

fn section(title: &str, headers: &[String], rows: &[Vec<String>]) -> String {
    format!("{title}\n{}", table::render_table(headers, rows))
}

/// Integer part of `value` with `,` between thousands groups.
pub fn format_count(value: f64) -> String {
    let truncated = value.trunc();
    let digits = format!("{:.0}", truncated.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if truncated < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
