mod common;

use std::{collections::BTreeSet, sync::Arc};

use chrono::NaiveDate;
use popdash::{
    aggregate,
    dashboard::Dashboard,
    filter::{self, FilterSelection},
    loader::{self, Dataset},
    period::Period,
    roles::Role,
};
use proptest::prelude::*;

use common::{POPULATION_CSV, TestWorkspace};

fn load_fixture() -> Dashboard {
    let workspace = TestWorkspace::new();
    let path = workspace.write("population.csv", POPULATION_CSV);
    Dashboard::new(Arc::new(loader::load(&path).expect("load fixture")))
}

fn dataset(headers: &[&str], rows: &[Vec<String>]) -> Dataset {
    Dataset::new(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.to_vec(),
    )
}

fn month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[test]
fn fixture_resolves_every_role() {
    let dashboard = load_fixture();
    let roles = dashboard.roles();
    assert_eq!(roles.get(Role::Period), Some("기간"));
    assert_eq!(roles.get(Role::RegionMajor), Some("시도명"));
    assert_eq!(roles.get(Role::RegionMinor), Some("시군구명"));
    assert_eq!(roles.get(Role::PopulationCount), Some("총인구수"));
    assert_eq!(roles.get(Role::HouseholdCount), Some("세대수"));
    assert!(roles.missing().is_empty());
}

#[test]
fn unfiltered_view_sums_with_coercion() {
    let dashboard = load_fixture();
    let view = dashboard.view(&FilterSelection::new());

    assert_eq!(view.summary.rows, 6);
    assert_eq!(view.summary.population, Some(3750.0));
    assert_eq!(view.summary.households, Some(1590.0));

    let periods = view
        .by_period
        .iter()
        .map(|t| (t.period.to_string(), t.population))
        .collect::<Vec<_>>();
    assert_eq!(
        periods,
        [("202401".to_string(), 2600.0), ("202402".to_string(), 650.0)]
    );

    let regions = view
        .by_region
        .iter()
        .map(|t| (t.region.as_str(), t.population))
        .collect::<Vec<_>>();
    assert_eq!(
        regions,
        [("서울특별시", 2550.0), ("부산광역시", 700.0), ("대구광역시", 500.0)]
    );

    let age_sex = view
        .by_age_sex
        .iter()
        .map(|t| (t.age_band.as_str(), t.sex.as_str(), t.population))
        .collect::<Vec<_>>();
    assert_eq!(
        age_sex,
        [
            ("20~29세", "남", 1500.0),
            ("20~29세", "여", 900.0),
            ("30~39세", "남", 700.0),
            ("30~39세", "여", 650.0),
        ]
    );
}

#[test]
fn unparsed_period_rows_only_drop_under_a_period_filter() {
    let dashboard = load_fixture();

    let unfiltered = dashboard.view(&FilterSelection::new());
    assert!(unfiltered.by_region.iter().any(|t| t.region == "대구광역시"));

    let ranged = FilterSelection::new().with_period(month(2024, 1), month(2024, 12));
    let view = dashboard.view(&ranged);
    assert_eq!(view.summary.rows, 5);
    assert!(view.mask.as_slice()[..5].iter().all(|keep| *keep));
    assert!(!view.mask.is_selected(5));
    assert!(view.by_region.iter().all(|t| t.region != "대구광역시"));
}

#[test]
fn combined_filters_narrow_the_totals() {
    let dashboard = load_fixture();
    let selection = FilterSelection::new()
        .with_values(Role::RegionMajor, ["서울특별시"])
        .with_values(Role::Sex, ["여"])
        .with_period(month(2024, 2), month(2024, 2));
    let view = dashboard.view(&selection);
    assert_eq!(view.mask.selected().collect::<Vec<_>>(), [3]);
    assert_eq!(view.summary.population, Some(650.0));
    assert_eq!(view.summary.households, Some(0.0));
}

#[test]
fn dependent_region_minor_candidates() {
    let dashboard = load_fixture();
    let selection = FilterSelection::new().with_values(Role::RegionMajor, ["부산광역시"]);
    let candidates = dashboard.candidates(&selection);
    assert_eq!(candidates.values[&Role::RegionMinor], ["해운대구"]);
    assert_eq!(
        candidates.period_bounds,
        Period::from_year_month(2024, 1).zip(Period::from_year_month(2024, 2))
    );
}

#[test]
fn initial_selection_filters_to_opening_state() {
    let dashboard = load_fixture();
    let selection = dashboard.initial_selection();
    assert_eq!(selection.values(Role::RegionMajor).map(BTreeSet::len), Some(3));
    assert_eq!(selection.period_range(), month(2024, 1).zip(month(2024, 2)));
    // The unparsed period row falls outside the opening range.
    assert_eq!(dashboard.view(&selection).summary.rows, 5);
}

#[test]
fn spec_scenario_without_optional_roles() {
    let rows = [["A", "202401", "100"], ["B", "202401", "bad"], ["A", "202402", "50"]]
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect::<Vec<Vec<String>>>();
    let dashboard = Dashboard::new(Arc::new(dataset(&["시도", "기간", "인구"], &rows)));

    let view = dashboard.view(&FilterSelection::new().with_values(Role::RegionMajor, ["A"]));
    assert_eq!(view.mask.as_slice(), [true, false, true]);
    assert_eq!(view.summary.population, Some(150.0));
    assert!(view.by_age_sex.is_empty());
}

fn row_strategy() -> impl Strategy<Value = Vec<String>> {
    (
        prop_oneof![Just("A"), Just("B"), Just("C"), Just("")],
        prop_oneof![Just("x"), Just("y"), Just("z"), Just("")],
        prop_oneof![Just("202401"), Just("202402"), Just("2024"), Just("")],
        prop_oneof!["[0-9]{1,6}", "[0-9]{1,3},[0-9]{3}", "\\PC{0,8}"],
    )
        .prop_map(|(major, minor, period, population)| {
            vec![
                major.to_string(),
                minor.to_string(),
                period.to_string(),
                population,
            ]
        })
}

fn selection_strategy() -> impl Strategy<Value = FilterSelection> {
    (
        proptest::collection::btree_set(prop_oneof![Just("A"), Just("B"), Just("C")], 0..3),
        proptest::collection::btree_set(prop_oneof![Just("x"), Just("y")], 0..2),
        any::<bool>(),
    )
        .prop_map(|(majors, minors, ranged)| {
            let selection = FilterSelection::new()
                .with_values(Role::RegionMajor, majors)
                .with_values(Role::RegionMinor, minors);
            if ranged {
                selection.with_period(month(2024, 1), month(2024, 1))
            } else {
                selection
            }
        })
}

const HEADERS: [&str; 4] = ["시도", "시군구", "기간", "인구"];

proptest! {
    #[test]
    fn mask_length_matches_rows(
        rows in proptest::collection::vec(row_strategy(), 0..40),
        selection in selection_strategy(),
    ) {
        let dashboard = Dashboard::new(Arc::new(dataset(&HEADERS, &rows)));
        let mask = dashboard.mask(&selection);
        prop_assert_eq!(mask.len(), rows.len());
        let unfiltered = dashboard.mask(&FilterSelection::new());
        prop_assert_eq!(unfiltered.selected_count(), rows.len());
    }

    #[test]
    fn views_are_idempotent(
        rows in proptest::collection::vec(row_strategy(), 0..40),
        selection in selection_strategy(),
    ) {
        let dashboard = Dashboard::new(Arc::new(dataset(&HEADERS, &rows)));
        let first = dashboard.view(&selection);
        let second = dashboard.view(&selection);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn region_minor_candidates_stay_inside_selected_majors(
        rows in proptest::collection::vec(row_strategy(), 0..40),
        selection in selection_strategy(),
    ) {
        let data = dataset(&HEADERS, &rows);
        let dashboard = Dashboard::new(Arc::new(data.clone()));
        let offered = filter::region_minor_candidates(&data, dashboard.roles(), &selection);
        let majors = selection.values(Role::RegionMajor).cloned().unwrap_or_default();
        let allowed = rows
            .iter()
            .filter(|row| majors.is_empty() || majors.contains(&row[0]))
            .map(|row| row[1].clone())
            .filter(|minor| !minor.is_empty())
            .collect::<BTreeSet<_>>();
        prop_assert_eq!(offered.into_iter().collect::<BTreeSet<_>>(), allowed);
    }

    #[test]
    fn coercion_never_fails(cell in any::<String>()) {
        let value = aggregate::coerce_number(&cell);
        prop_assert!(value.is_finite());
    }

    #[test]
    fn non_numeric_cells_contribute_nothing(cell in "[a-zA-Z가-힣 ]{1,12}") {
        prop_assume!(cell.trim().parse::<f64>().is_err());
        prop_assert_eq!(aggregate::coerce_number(&cell), 0.0);
    }
}
