use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::dataset::RowStore;
use crate::error::{SelectionError, StateError};
use crate::filters::{toggle_choice, FilterOutcome, PatientFilters};
use crate::models::{SubmissionRole, SurveyRow};
use crate::relationships::resolve_specialists;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Filters,
    Radar,
    Violin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FilterGroup {
    Age,
    Race,
    Appointment,
    Distance,
    NextSteps,
    LowScore,
}

/// Selected ids per role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub patients: Vec<String>,
    pub radiation: Vec<String>,
    pub urologic: Vec<String>,
}

impl Selection {
    pub fn ids(&self, role: SubmissionRole) -> &[String] {
        match role {
            SubmissionRole::Patient => &self.patients,
            SubmissionRole::RadiationOncology => &self.radiation,
            SubmissionRole::UrologicOncology => &self.urologic,
        }
    }

    fn ids_mut(&mut self, role: SubmissionRole) -> &mut Vec<String> {
        match role {
            SubmissionRole::Patient => &mut self.patients,
            SubmissionRole::RadiationOncology => &mut self.radiation,
            SubmissionRole::UrologicOncology => &mut self.urologic,
        }
    }

    pub fn is_complete(&self) -> bool {
        SubmissionRole::ALL
            .into_iter()
            .all(|role| !self.ids(role).is_empty())
    }
}

/// Ids a user may pick for each role: the matched patients and the
/// specialists those patients link to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub patients: Vec<String>,
    pub radiation: Vec<String>,
    pub urologic: Vec<String>,
}

impl Candidates {
    pub fn ids(&self, role: SubmissionRole) -> &[String] {
        match role {
            SubmissionRole::Patient => &self.patients,
            SubmissionRole::RadiationOncology => &self.radiation,
            SubmissionRole::UrologicOncology => &self.urologic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardState {
    pub filters: PatientFilters,
    /// `None` until filters are submitted; an empty list means nothing matched.
    pub matched: Option<Vec<String>>,
    pub selection: Selection,
    pub view: View,
}

impl DashboardState {
    pub fn from_json(text: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn submit_filters<'a>(&mut self, store: &'a RowStore, now: NaiveDateTime) -> FilterOutcome<'a> {
        let outcome = self.filters.apply(&store.patients(), now);
        self.matched = Some(outcome.ids.clone());
        outcome
    }

    pub fn reset_group(&mut self, group: FilterGroup) {
        match group {
            FilterGroup::Age => self.filters.clear_ages(),
            FilterGroup::Race => self.filters.clear_races(),
            FilterGroup::Appointment => self.filters.clear_appointments(),
            FilterGroup::Distance => self.filters.clear_distance(),
            FilterGroup::NextSteps => self.filters.clear_next_steps(),
            FilterGroup::LowScore => self.filters.clear_low_score(),
        }
    }

    /// Patient rows from the last submitted filter run, in store order.
    pub fn matched_rows<'a>(&self, store: &'a RowStore) -> Vec<&'a SurveyRow> {
        let Some(matched) = &self.matched else {
            return Vec::new();
        };
        store
            .patients()
            .into_iter()
            .filter(|row| matched.contains(&row.id))
            .collect()
    }

    pub fn candidates(&self, store: &RowStore) -> Candidates {
        let patients = self.matched_rows(store);
        let linked = resolve_specialists(store, &patients);
        Candidates {
            patients: patients.iter().map(|row| row.id.clone()).collect(),
            radiation: linked.radiation_ids(),
            urologic: linked.urologic_ids(),
        }
    }

    pub fn toggle(&mut self, role: SubmissionRole, id: &str) {
        toggle_choice(self.selection.ids_mut(role), id.to_string());
    }

    /// Adds `id` to a role's selection unless it is already there.
    pub fn select(&mut self, role: SubmissionRole, id: &str) {
        let ids = self.selection.ids_mut(role);
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }

    pub fn select_all(&mut self, role: SubmissionRole, candidates: &Candidates) {
        *self.selection.ids_mut(role) = candidates.ids(role).to_vec();
    }

    pub fn clear(&mut self, role: SubmissionRole) {
        self.selection.ids_mut(role).clear();
    }

    /// Drops selected ids that are no longer offered. Returns what was dropped.
    pub fn prune(&mut self, candidates: &Candidates) -> Vec<(SubmissionRole, String)> {
        let mut dropped = Vec::new();
        for role in SubmissionRole::ALL {
            let offered = candidates.ids(role);
            self.selection.ids_mut(role).retain(|id| {
                let keep = offered.contains(id);
                if !keep {
                    dropped.push((role, id.clone()));
                }
                keep
            });
        }
        dropped
    }

    pub fn require_complete(&self) -> Result<(), SelectionError> {
        match SubmissionRole::ALL
            .into_iter()
            .find(|role| self.selection.ids(*role).is_empty())
        {
            Some(role) => Err(SelectionError::Incomplete(role)),
            None => Ok(()),
        }
    }

    /// Chart views stay closed until every role has a selection.
    pub fn open(&mut self, view: View) -> Result<(), SelectionError> {
        if view != View::Filters {
            self.require_complete()?;
        }
        self.view = view;
        Ok(())
    }
}
