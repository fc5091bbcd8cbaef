//! Keyword-table resolution of column names to semantic roles.
//!
//! Column headers in resident-registration exports vary between releases
//! (`시도명`, `행정구역(시도)`, `총인구수`, ...), so roles are found by fuzzy
//! matching rather than fixed names. Substring roles use the **last** matching
//! column in header order: a later match overwrites an earlier one. A single
//! column may fill several roles.

use std::{collections::BTreeMap, fmt};

use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    RegionMajor,
    RegionMinor,
    Sex,
    AgeBand,
    PopulationCount,
    HouseholdCount,
    Period,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::RegionMajor,
        Role::RegionMinor,
        Role::Sex,
        Role::AgeBand,
        Role::PopulationCount,
        Role::HouseholdCount,
        Role::Period,
    ];

    /// Roles whose values are offered as multi-select filter choices.
    pub const CATEGORICAL: [Role; 4] = [
        Role::RegionMajor,
        Role::RegionMinor,
        Role::Sex,
        Role::AgeBand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::RegionMajor => "region_major",
            Role::RegionMinor => "region_minor",
            Role::Sex => "sex",
            Role::AgeBand => "age_band",
            Role::PopulationCount => "population_count",
            Role::HouseholdCount => "household_count",
            Role::Period => "period",
        }
    }

    pub fn is_categorical(&self) -> bool {
        Self::CATEGORICAL.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct KeywordRule {
    role: Role,
    contains: &'static [&'static str],
    exact: &'static [&'static str],
}

const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        role: Role::RegionMajor,
        contains: &["시도", "province"],
        exact: &["도"],
    },
    KeywordRule {
        role: Role::RegionMinor,
        contains: &["시군구", "district", "county"],
        exact: &["구"],
    },
    KeywordRule {
        role: Role::Sex,
        contains: &["성별", "sex", "gender"],
        exact: &[],
    },
    KeywordRule {
        role: Role::AgeBand,
        contains: &["연령", "나이", "age"],
        exact: &[],
    },
    KeywordRule {
        role: Role::PopulationCount,
        contains: &["인구", "population"],
        exact: &[],
    },
    KeywordRule {
        role: Role::HouseholdCount,
        contains: &["세대", "household"],
        exact: &[],
    },
];

/// Exact period column names, in priority order.
pub const PERIOD_CANDIDATES: &[&str] = &[
    "기간",
    "연월",
    "조회년월",
    "기준연월",
    "날짜",
    "period",
    "year-month",
    "query year-month",
    "base year-month",
    "date",
];

impl KeywordRule {
    fn matches(&self, lowered: &str) -> bool {
        self.exact.contains(&lowered) || self.contains.iter().any(|kw| lowered.contains(kw))
    }
}

/// A resolved column: its header position and trimmed name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleColumn {
    pub index: usize,
    pub name: String,
}

/// Role → column, built once per loaded dataset.
///
/// Headers may repeat after trimming, so consumers read cells through
/// [`RoleMapping::index`] rather than looking the name up again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleMapping {
    columns: BTreeMap<Role, RoleColumn>,
}

impl RoleMapping {
    /// Column name for `role`.
    pub fn get(&self, role: Role) -> Option<&str> {
        self.columns.get(&role).map(|column| column.name.as_str())
    }

    /// Header position for `role`.
    pub fn index(&self, role: Role) -> Option<usize> {
        self.columns.get(&role).map(|column| column.index)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn missing(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| !self.contains(*role))
            .collect()
    }
}

pub fn resolve<S: AsRef<str>>(column_names: &[S]) -> RoleMapping {
    let mut columns = BTreeMap::new();

    for (index, name) in column_names.iter().enumerate() {
        let name = name.as_ref();
        let lowered = name.to_lowercase();
        for rule in KEYWORD_RULES {
            if rule.matches(&lowered) {
                columns.insert(
                    rule.role,
                    RoleColumn {
                        index,
                        name: name.to_string(),
                    },
                );
            }
        }
    }

    if let Some((index, period)) = PERIOD_CANDIDATES.iter().find_map(|candidate| {
        column_names
            .iter()
            .position(|name| name.as_ref() == *candidate)
            .map(|index| (index, *candidate))
    }) {
        columns.insert(
            Role::Period,
            RoleColumn {
                index,
                name: period.to_string(),
            },
        );
    }

    let mapping = RoleMapping { columns };
    let missing = mapping.missing();
    if missing.is_empty() {
        info!("Resolved all {} column roles", Role::ALL.len());
    } else {
        info!(
            "Resolved {} column role(s); unavailable: {}",
            Role::ALL.len() - missing.len(),
            missing
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    mapping
}
