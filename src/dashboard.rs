//! The load-once, recompute-per-selection pipeline.
//!
//! A [`Dashboard`] resolves column roles and normalizes periods exactly once
//! for a loaded dataset. [`Dashboard::view`] and [`Dashboard::candidates`]
//! are pure functions of the stored state and the caller's selection.

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;

use crate::{
    aggregate::{self, AgeSexTotal, PeriodTotal, RegionTotal, Summary},
    filter::{self, FilterSelection, RowMask},
    loader::Dataset,
    period::{self, Period},
    roles::{self, Role, RoleMapping},
};

#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: Arc<Dataset>,
    roles: RoleMapping,
    periods: Vec<Option<Period>>,
}

/// Everything the presentation layer renders for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    #[serde(skip)]
    pub mask: RowMask,
    pub summary: Summary,
    pub by_period: Vec<PeriodTotal>,
    pub by_age_sex: Vec<AgeSexTotal>,
    pub by_region: Vec<RegionTotal>,
}

/// Choices for each filter control. Unmapped roles are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCandidates {
    pub values: BTreeMap<Role, Vec<String>>,
    pub period_bounds: Option<(Period, Period)>,
}

impl Dashboard {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let roles = roles::resolve(dataset.headers());
        let periods = period::normalize(&dataset, roles.index(Role::Period));
        Self {
            dataset,
            roles,
            periods,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn roles(&self) -> &RoleMapping {
        &self.roles
    }

    pub fn periods(&self) -> &[Option<Period>] {
        &self.periods
    }

    pub fn initial_selection(&self) -> FilterSelection {
        FilterSelection::initial(&self.dataset, &self.roles, &self.periods)
    }

    pub fn mask(&self, selection: &FilterSelection) -> RowMask {
        filter::build_mask(&self.dataset, &self.roles, &self.periods, selection)
    }

    pub fn view(&self, selection: &FilterSelection) -> DashboardView {
        let mask = self.mask(selection);
        DashboardView {
            summary: aggregate::summarize(&self.dataset, &mask, &self.roles),
            by_period: aggregate::by_period(&self.dataset, &mask, &self.roles, &self.periods),
            by_age_sex: aggregate::by_age_sex(&self.dataset, &mask, &self.roles),
            by_region: aggregate::by_region(&self.dataset, &mask, &self.roles),
            mask,
        }
    }

    /// Candidate lists for the controls; region-minor depends on the current
    /// region-major selection.
    pub fn candidates(&self, selection: &FilterSelection) -> FilterCandidates {
        let mut values = BTreeMap::new();
        for role in Role::CATEGORICAL {
            if !self.roles.contains(role) {
                continue;
            }
            let choices = if role == Role::RegionMinor {
                filter::region_minor_candidates(&self.dataset, &self.roles, selection)
            } else {
                filter::role_candidates(&self.dataset, &self.roles, role)
            };
            values.insert(role, choices);
        }
        FilterCandidates {
            values,
            period_bounds: period::bounds(&self.periods),
        }
    }
}
