use std::collections::HashSet;

use crate::aggregate::round_one;
use crate::dataset::RowStore;
use crate::models::{DistributionSummary, LongRecord, SubmissionRole};
use crate::questions::CATEGORIES;
use crate::state::Selection;

/// One record per selected row, category and answered question. A row id
/// found in several selections is classified Radiation Oncology first, then
/// Urologic Oncology, then Patient. Unanswered questions are skipped.
pub fn long_form(store: &RowStore, selection: &Selection) -> Vec<LongRecord> {
    let radiation: HashSet<&str> = selection.radiation.iter().map(String::as_str).collect();
    let urologic: HashSet<&str> = selection.urologic.iter().map(String::as_str).collect();
    let patients: HashSet<&str> = selection.patients.iter().map(String::as_str).collect();

    let mut records = Vec::new();
    for row in store.rows() {
        let id = row.id.as_str();
        let role = if radiation.contains(id) {
            SubmissionRole::RadiationOncology
        } else if urologic.contains(id) {
            SubmissionRole::UrologicOncology
        } else if patients.contains(id) {
            SubmissionRole::Patient
        } else {
            continue;
        };

        for category in CATEGORIES.iter() {
            for key in category.questions {
                if let Some(score) = row.score(*key).filter(|s| s.is_finite()) {
                    records.push(LongRecord {
                        category: category.name,
                        score,
                        role: role.respondent_label(),
                    });
                }
            }
        }
    }

    records
}

/// Five-number summary and mean per role and category, roles in dashboard
/// order. Pairs without records are left out.
pub fn summarize(records: &[LongRecord]) -> Vec<DistributionSummary> {
    let mut summaries = Vec::new();

    for role in SubmissionRole::ALL {
        let label = role.respondent_label();
        for category in CATEGORIES.iter() {
            let mut scores: Vec<f64> = records
                .iter()
                .filter(|r| r.role == label && r.category == category.name)
                .map(|r| r.score)
                .collect();
            if scores.is_empty() {
                continue;
            }
            scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let count = scores.len();
            summaries.push(DistributionSummary {
                role: label,
                category: category.name,
                count,
                min: scores[0],
                lower_quartile: quantile(&scores, 0.25),
                median: quantile(&scores, 0.5),
                upper_quartile: quantile(&scores, 0.75),
                max: scores[count - 1],
                mean: round_one(scores.iter().sum::<f64>() / count as f64),
            });
        }
    }

    summaries
}

/// Linear interpolation between closest ranks over sorted, non-empty input.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
