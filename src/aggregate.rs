//! Grouped population sums over the selected rows.
//!
//! Every reducer reads raw cells through [`coerce_number`], so a malformed
//! count contributes zero instead of failing the whole chart. Reducers whose
//! roles are unmapped return an empty table.

use std::collections::{BTreeMap, HashMap};

use log::trace;
use serde::Serialize;

use crate::{
    filter::RowMask,
    loader::Dataset,
    period::Period,
    roles::{Role, RoleMapping},
};

pub const TOP_REGIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub period: Period,
    pub population: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeSexTotal {
    pub age_band: String,
    pub sex: String,
    pub population: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTotal {
    pub region: String,
    pub population: f64,
}

/// Headline metrics for the selected rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub population: Option<f64>,
    pub households: Option<f64>,
}

/// Best-effort numeric value of a cell. Blank, non-numeric, and non-finite
/// cells read as zero; `,` thousands separators are accepted.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let parsed = if trimmed.contains(',') {
        trimmed.replace(',', "").parse::<f64>()
    } else {
        trimmed.parse::<f64>()
    };
    match parsed {
        Ok(value) if value.is_finite() => value,
        _ => {
            if !trimmed.is_empty() {
                trace!("Treating non-numeric cell {raw:?} as zero");
            }
            0.0
        }
    }
}

fn column_total(dataset: &Dataset, mask: &RowMask, column: Option<usize>) -> Option<f64> {
    let column = column?;
    Some(
        mask.selected()
            .map(|row| coerce_number(dataset.cell(row, column)))
            .sum(),
    )
}

pub fn summarize(dataset: &Dataset, mask: &RowMask, roles: &RoleMapping) -> Summary {
    Summary {
        rows: mask.selected_count(),
        population: column_total(
            dataset,
            mask,
            roles.index(Role::PopulationCount),
        ),
        households: column_total(
            dataset,
            mask,
            roles.index(Role::HouseholdCount),
        ),
    }
}

/// Population per normalized period, ascending. Rows without a period are skipped.
pub fn by_period(
    dataset: &Dataset,
    mask: &RowMask,
    roles: &RoleMapping,
    periods: &[Option<Period>],
) -> Vec<PeriodTotal> {
    let Some(population) = roles.index(Role::PopulationCount) else {
        return Vec::new();
    };
    let mut totals: BTreeMap<Period, f64> = BTreeMap::new();
    for row in mask.selected() {
        if let Some(Some(period)) = periods.get(row) {
            *totals.entry(*period).or_insert(0.0) += coerce_number(dataset.cell(row, population));
        }
    }
    totals
        .into_iter()
        .map(|(period, population)| PeriodTotal { period, population })
        .collect()
}

/// Population per (age band, sex) pair in key order. Blank keys are skipped.
pub fn by_age_sex(dataset: &Dataset, mask: &RowMask, roles: &RoleMapping) -> Vec<AgeSexTotal> {
    let (Some(age), Some(sex), Some(population)) = (
        roles.index(Role::AgeBand),
        roles.index(Role::Sex),
        roles.index(Role::PopulationCount),
    ) else {
        return Vec::new();
    };
    let mut totals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for row in mask.selected() {
        let key = (dataset.cell(row, age), dataset.cell(row, sex));
        if key.0.is_empty() || key.1.is_empty() {
            continue;
        }
        *totals.entry(key).or_insert(0.0) += coerce_number(dataset.cell(row, population));
    }
    totals
        .into_iter()
        .map(|((age_band, sex), population)| AgeSexTotal {
            age_band: age_band.to_string(),
            sex: sex.to_string(),
            population,
        })
        .collect()
}

/// The [`TOP_REGIONS`] region-major values with the largest population.
/// Equal sums are ordered by region name.
pub fn by_region(dataset: &Dataset, mask: &RowMask, roles: &RoleMapping) -> Vec<RegionTotal> {
    let (Some(region), Some(population)) = (
        roles.index(Role::RegionMajor),
        roles.index(Role::PopulationCount),
    ) else {
        return Vec::new();
    };
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for row in mask.selected() {
        let key = dataset.cell(row, region);
        if key.is_empty() {
            continue;
        }
        *totals.entry(key).or_insert(0.0) += coerce_number(dataset.cell(row, population));
    }
    let mut ranked = totals.into_iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(TOP_REGIONS);
    ranked
        .into_iter()
        .map(|(region, population)| RegionTotal {
            region: region.to_string(),
            population,
        })
        .collect()
}
