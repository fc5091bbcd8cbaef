//! Row selection from per-role value sets and a period range.
//!
//! A [`FilterSelection`] is an immutable value built by the caller for each
//! interaction. [`build_mask`] narrows an all-true [`RowMask`] once per active
//! predicate. A role that is unmapped or has an empty selection leaves the
//! mask untouched, which is "filter inactive" rather than "exclude all".

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    loader::Dataset,
    period::{self, Period},
    roles::{Role, RoleMapping},
};

const INITIAL_REGION_MAJOR_CHOICES: usize = 3;
const INITIAL_REGION_MINOR_CHOICES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    values: BTreeMap<Role, BTreeSet<String>>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the chosen values for a categorical role. Other roles are ignored.
    pub fn with_values<I, S>(mut self, role: Role, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if role.is_categorical() {
            self.values
                .insert(role, values.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn with_period(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn values(&self, role: Role) -> Option<&BTreeSet<String>> {
        self.values.get(&role)
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// The inclusive date range, only when both bounds are set.
    pub fn period_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.start.zip(self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(BTreeSet::is_empty) && self.period_range().is_none()
    }

    /// The dashboard's opening state: the first few region choices, every sex
    /// value, and the full parsed period range.
    pub fn initial(dataset: &Dataset, roles: &RoleMapping, periods: &[Option<Period>]) -> Self {
        let region_major = role_candidates(dataset, roles, Role::RegionMajor)
            .into_iter()
            .take(INITIAL_REGION_MAJOR_CHOICES)
            .collect::<Vec<_>>();
        let mut selection = Self::new().with_values(Role::RegionMajor, region_major);

        let region_minor = region_minor_candidates(dataset, roles, &selection)
            .into_iter()
            .take(INITIAL_REGION_MINOR_CHOICES)
            .collect::<Vec<_>>();
        selection = selection
            .with_values(Role::RegionMinor, region_minor)
            .with_values(Role::Sex, role_candidates(dataset, roles, Role::Sex));

        if let Some((first, last)) = period::bounds(periods) {
            selection = selection.with_period(Some(first.first_day()), Some(last.first_day()));
        }
        selection
    }
}

/// One flag per dataset row; `true` means the row passes every active filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMask(Vec<bool>);

impl RowMask {
    pub fn all(len: usize) -> Self {
        RowMask(vec![true; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.0.get(row).copied().unwrap_or(false)
    }

    pub fn selected_count(&self) -> usize {
        self.0.iter().filter(|keep| **keep).count()
    }

    /// Indices of selected rows, ascending.
    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(idx, keep)| keep.then_some(idx))
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

pub fn build_mask(
    dataset: &Dataset,
    roles: &RoleMapping,
    periods: &[Option<Period>],
    selection: &FilterSelection,
) -> RowMask {
    let mut mask = RowMask::all(dataset.row_count());

    for role in Role::CATEGORICAL {
        let (Some(index), Some(selected)) = (roles.index(role), selection.values(role)) else {
            continue;
        };
        if selected.is_empty() {
            continue;
        }
        for (keep, value) in mask.0.iter_mut().zip(dataset.column_values(index)) {
            *keep &= selected.contains(value);
        }
    }

    if roles.contains(Role::Period)
        && let Some((start, end)) = selection.period_range()
    {
        for (keep, period) in mask.0.iter_mut().zip(periods) {
            *keep &= period.is_some_and(|p| (start..=end).contains(&p.first_day()));
        }
    }

    mask
}

/// Sorted distinct non-empty values of the column at `column`.
pub fn candidates(dataset: &Dataset, column: usize) -> Vec<String> {
    if column >= dataset.headers().len() {
        return Vec::new();
    }
    dataset
        .column_values(column)
        .filter(|value| !value.is_empty())
        .unique()
        .sorted()
        .map(str::to_string)
        .collect()
}

pub fn role_candidates(dataset: &Dataset, roles: &RoleMapping, role: Role) -> Vec<String> {
    roles
        .index(role)
        .map(|column| candidates(dataset, column))
        .unwrap_or_default()
}

/// Region-minor choices limited to rows inside the selected region-major set.
pub fn region_minor_candidates(
    dataset: &Dataset,
    roles: &RoleMapping,
    selection: &FilterSelection,
) -> Vec<String> {
    let Some(minor_index) = roles.index(Role::RegionMinor) else {
        return Vec::new();
    };
    let selected_major = selection
        .values(Role::RegionMajor)
        .filter(|values| !values.is_empty());

    let (Some(selected_major), Some(major_index)) =
        (selected_major, roles.index(Role::RegionMajor))
    else {
        return candidates(dataset, minor_index);
    };

    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(row, _)| selected_major.contains(dataset.cell(*row, major_index)))
        .map(|(row, _)| dataset.cell(row, minor_index))
        .filter(|value| !value.is_empty())
        .unique()
        .sorted()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{period, roles};

    fn sample() -> (Dataset, RoleMapping, Vec<Option<Period>>) {
        let headers = ["시도", "시군구", "성별", "기간", "인구"];
        let rows = [
            ["서울", "종로구", "남", "202401", "100"],
            ["서울", "중구", "여", "202402", "120"],
            ["부산", "해운대구", "남", "invalid", "80"],
            ["대구", "", "여", "202403", "60"],
        ];
        let dataset = Dataset::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        let mapping = roles::resolve(dataset.headers());
        let periods = period::normalize(&dataset, mapping.index(Role::Period));
        (dataset, mapping, periods)
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn empty_selection_keeps_every_row() {
        let (dataset, mapping, periods) = sample();
        let mask = build_mask(&dataset, &mapping, &periods, &FilterSelection::new());
        assert_eq!(mask.as_slice(), [true, true, true, true]);
        assert!(FilterSelection::new().is_empty());
    }

    #[test]
    fn predicates_are_conjoined() {
        let (dataset, mapping, periods) = sample();
        let selection = FilterSelection::new()
            .with_values(Role::RegionMajor, ["서울", "부산"])
            .with_values(Role::Sex, ["남"]);
        let mask = build_mask(&dataset, &mapping, &periods, &selection);
        assert_eq!(mask.as_slice(), [true, false, true, false]);
        assert_eq!(mask.selected().collect::<Vec<_>>(), [0, 2]);
    }

    #[test]
    fn empty_value_set_is_inactive() {
        let (dataset, mapping, periods) = sample();
        let selection = FilterSelection::new().with_values(Role::Sex, Vec::<String>::new());
        let mask = build_mask(&dataset, &mapping, &periods, &selection);
        assert_eq!(mask.selected_count(), 4);
    }

    #[test]
    fn unmapped_role_is_inactive() {
        let (dataset, mapping, periods) = sample();
        let selection = FilterSelection::new().with_values(Role::AgeBand, ["20~29세"]);
        let mask = build_mask(&dataset, &mapping, &periods, &selection);
        assert_eq!(mask.selected_count(), 4);
    }

    #[test]
    fn period_range_is_inclusive_and_drops_unparsed() {
        let (dataset, mapping, periods) = sample();
        let selection = FilterSelection::new().with_period(date(2024, 1, 1), date(2024, 2, 1));
        let mask = build_mask(&dataset, &mapping, &periods, &selection);
        assert_eq!(mask.as_slice(), [true, true, false, false]);
    }

    #[test]
    fn half_open_period_range_is_inactive() {
        let (dataset, mapping, periods) = sample();
        let selection = FilterSelection::new().with_period(date(2024, 1, 1), None);
        let mask = build_mask(&dataset, &mapping, &periods, &selection);
        assert_eq!(mask.selected_count(), 4);
    }

    #[test]
    fn mid_month_start_excludes_that_month() {
        let (dataset, mapping, periods) = sample();
        let selection = FilterSelection::new().with_period(date(2024, 1, 15), date(2024, 3, 31));
        let mask = build_mask(&dataset, &mapping, &periods, &selection);
        assert_eq!(mask.as_slice(), [false, true, false, true]);
    }

    #[test]
    fn candidates_are_sorted_distinct_and_non_empty() {
        let (dataset, _, _) = sample();
        assert_eq!(candidates(&dataset, 0), ["대구", "부산", "서울"]);
        assert_eq!(candidates(&dataset, 1), ["종로구", "중구", "해운대구"]);
        assert!(candidates(&dataset, 9).is_empty());
    }

    #[test]
    fn repeated_region_header_filters_on_the_resolved_column() {
        let dataset = Dataset::new(
            vec![" 시도".to_string(), "시도 ".to_string(), "인구".to_string()],
            vec![
                vec!["old-a".to_string(), "A".to_string(), "10".to_string()],
                vec!["old-b".to_string(), "B".to_string(), "20".to_string()],
            ],
        );
        let mapping = roles::resolve(dataset.headers());
        let selection = FilterSelection::new().with_values(Role::RegionMajor, ["A"]);
        let mask = build_mask(&dataset, &mapping, &[None, None], &selection);
        assert_eq!(mask.as_slice(), [true, false]);
        assert_eq!(
            role_candidates(&dataset, &mapping, Role::RegionMajor),
            ["A", "B"]
        );
    }

    #[test]
    fn region_minor_candidates_follow_region_major_selection() {
        let (dataset, mapping, _) = sample();
        let selection = FilterSelection::new().with_values(Role::RegionMajor, ["서울"]);
        assert_eq!(
            region_minor_candidates(&dataset, &mapping, &selection),
            ["종로구", "중구"]
        );
        assert_eq!(
            region_minor_candidates(&dataset, &mapping, &FilterSelection::new()),
            ["종로구", "중구", "해운대구"]
        );
    }

    #[test]
    fn initial_selection_mirrors_opening_sidebar() {
        let (dataset, mapping, periods) = sample();
        let selection = FilterSelection::initial(&dataset, &mapping, &periods);
        let majors = selection.values(Role::RegionMajor).unwrap();
        assert_eq!(majors.iter().collect::<Vec<_>>(), ["대구", "부산", "서울"]);
        let sexes = selection.values(Role::Sex).unwrap();
        assert_eq!(sexes.len(), 2);
        assert_eq!(selection.period_range(), date(2024, 1, 1).zip(date(2024, 3, 1)));
    }
}
