use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{CandidatesArgs, OutputFormat},
    dashboard::FilterCandidates,
    roles::{Role, RoleMapping},
    table,
};

pub fn execute(args: &CandidatesArgs) -> Result<()> {
    let dashboard = crate::open_dashboard(&args.input)?;
    let selection = args.filters.selection(&dashboard);
    let candidates = dashboard.candidates(&selection);

    match args.format {
        OutputFormat::Table => print!("{}", render_candidates(dashboard.roles(), &candidates)),
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&candidates).context("Serializing candidates")?;
            println!("{json}");
        }
    }
    info!(
        "Listed candidates for {} filter control(s)",
        candidates.values.len() + usize::from(candidates.period_bounds.is_some())
    );
    Ok(())
}

pub fn render_candidates(roles: &RoleMapping, candidates: &FilterCandidates) -> String {
    let mut rows = candidates
        .values
        .iter()
        .map(|(role, values)| {
            vec![
                role.to_string(),
                roles.get(*role).unwrap_or_default().to_string(),
                values.len().to_string(),
                values.join(", "),
            ]
        })
        .collect::<Vec<_>>();
    if let Some((first, last)) = candidates.period_bounds {
        rows.push(vec![
            "period".to_string(),
            roles.get(Role::Period).unwrap_or_default().to_string(),
            String::new(),
            format!("{first} ~ {last}"),
        ]);
    }
    let headers = ["control", "column", "count", "values"]
        .map(str::to_string)
        .to_vec();
    table::render_table(&headers, &rows)
}
