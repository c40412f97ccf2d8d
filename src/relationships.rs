use std::collections::HashSet;

use crate::dataset::RowStore;
use crate::models::{SubmissionRole, SurveyRow};

/// Specialist rows reachable from a set of patients, each listed once in the
/// order the patients first reference them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedSpecialists<'a> {
    pub radiation: Vec<&'a SurveyRow>,
    pub urologic: Vec<&'a SurveyRow>,
}

impl LinkedSpecialists<'_> {
    pub fn radiation_ids(&self) -> Vec<String> {
        self.radiation.iter().map(|row| row.id.clone()).collect()
    }

    pub fn urologic_ids(&self) -> Vec<String> {
        self.urologic.iter().map(|row| row.id.clone()).collect()
    }
}

pub fn resolve_specialists<'a>(store: &'a RowStore, patients: &[&SurveyRow]) -> LinkedSpecialists<'a> {
    LinkedSpecialists {
        radiation: resolve_links(store, patients, SubmissionRole::RadiationOncology, |p| {
            p.radiation_oncologist_id.as_deref()
        }),
        urologic: resolve_links(store, patients, SubmissionRole::UrologicOncology, |p| {
            p.urologist_oncologist_id.as_deref()
        }),
    }
}

fn resolve_links<'a, F>(
    store: &'a RowStore,
    patients: &[&SurveyRow],
    role: SubmissionRole,
    foreign_key: F,
) -> Vec<&'a SurveyRow>
where
    F: for<'p> Fn(&'p SurveyRow) -> Option<&'p str>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut linked = Vec::new();

    for &patient in patients {
        let Some(id) = foreign_key(patient).filter(|id| !id.is_empty()) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        match store.find(role, id) {
            Some(row) => linked.push(row),
            None => {
                tracing::debug!(patient = %patient.id, %role, id, "dropping unresolved specialist link");
            }
        }
    }

    linked
}
