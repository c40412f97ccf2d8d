use std::collections::HashSet;

use crate::dataset::RowStore;
use crate::models::{ChartData, Discrepancy, QuestionKey, Series, SubmissionRole, SurveyRow};
use crate::questions::{self, CATEGORIES};
use crate::state::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Ten values, one per survey question.
    #[default]
    Question,
    /// Four values, one per SDM category.
    Category,
}

impl Granularity {
    pub fn labels(self) -> Vec<String> {
        match self {
            Granularity::Question => questions::question_labels(),
            Granularity::Category => questions::category_labels(),
        }
    }
}

/// Rounds half away from zero to one decimal place.
pub fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(round_one(sum / count as f64))
    }
}

/// Means over the rows of one role whose id is in `ids`. Missing answers
/// count as zero. Category values are the mean of each row's own category
/// mean. An empty selection yields an empty vector, never zeros.
pub fn role_means(rows: &[&SurveyRow], ids: &[String], granularity: Granularity) -> Vec<f64> {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let chosen: Vec<&SurveyRow> = rows
        .iter()
        .copied()
        .filter(|row| wanted.contains(row.id.as_str()))
        .collect();

    if chosen.is_empty() {
        return Vec::new();
    }

    match granularity {
        Granularity::Question => QuestionKey::all()
            .filter_map(|key| mean(chosen.iter().map(|row| row.score_or_zero(key))))
            .collect(),
        Granularity::Category => CATEGORIES
            .iter()
            .filter_map(|category| {
                let row_means = chosen.iter().filter_map(|row| {
                    mean(category.questions.iter().map(|key| row.score_or_zero(*key)))
                });
                mean(row_means)
            })
            .collect(),
    }
}

pub fn chart_data(store: &RowStore, selection: &Selection, granularity: Granularity) -> ChartData {
    let series = SubmissionRole::ALL
        .into_iter()
        .map(|role| Series {
            name: role.series_name().to_string(),
            values: role_means(&store.partition(role), selection.ids(role), granularity),
        })
        .collect();

    ChartData {
        labels: granularity.labels(),
        series,
    }
}

/// Per label, each role's value and the widest gap between any two roles
/// that have data.
pub fn discrepancies(chart: &ChartData) -> Vec<Discrepancy> {
    let value_at = |role: SubmissionRole, index: usize| {
        chart
            .series
            .iter()
            .find(|s| s.name == role.series_name())
            .and_then(|s| s.values.get(index).copied())
    };

    chart
        .labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let patient = value_at(SubmissionRole::Patient, index);
            let radiation = value_at(SubmissionRole::RadiationOncology, index);
            let urologic = value_at(SubmissionRole::UrologicOncology, index);

            let available: Vec<f64> = [patient, radiation, urologic].into_iter().flatten().collect();
            let max_gap = if available.len() < 2 {
                None
            } else {
                let high = available.iter().copied().fold(f64::MIN, f64::max);
                let low = available.iter().copied().fold(f64::MAX, f64::min);
                Some(round_one(high - low))
            };

            Discrepancy {
                label: label.clone(),
                patient,
                radiation,
                urologic,
                max_gap,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scored(id: &str, role: SubmissionRole, scores: [Option<f64>; QuestionKey::COUNT]) -> SurveyRow {
        SurveyRow {
            id: id.to_string(),
            treatment_id: None,
            submission_role: role,
            appointment_date: None,
            age: None,
            race: None,
            distance_miles: None,
            radiation_oncologist_id: None,
            urologist_oncologist_id: None,
            linked_patient_id: None,
            next_steps: "Surgery".to_string(),
            score_below_3: false,
            scores,
        }
    }

    fn uniform(id: &str, role: SubmissionRole, value: f64) -> SurveyRow {
        scored(id, role, [Some(value); QuestionKey::COUNT])
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn category_mean_is_a_mean_of_row_means() {
        let mut first = [Some(5.0); QuestionKey::COUNT];
        first[0] = Some(2.0);
        first[1] = Some(4.0);
        let mut second = [Some(5.0); QuestionKey::COUNT];
        second[0] = Some(4.0);
        second[1] = Some(6.0);
        let rows = [
            scored("P1", SubmissionRole::Patient, first),
            scored("P2", SubmissionRole::Patient, second),
        ];
        let refs: Vec<&SurveyRow> = rows.iter().collect();

        let single = role_means(&refs, &ids(&["P1"]), Granularity::Category);
        assert_eq!(single[0], 3.0);

        let both = role_means(&refs, &ids(&["P1", "P2"]), Granularity::Category);
        assert_eq!(both, vec![4.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn empty_selection_has_no_values() {
        let rows = [uniform("P1", SubmissionRole::Patient, 4.0)];
        let refs: Vec<&SurveyRow> = rows.iter().collect();

        assert!(role_means(&refs, &[], Granularity::Question).is_empty());
        assert!(role_means(&refs, &ids(&["P9"]), Granularity::Category).is_empty());
    }

    #[test]
    fn missing_answers_pull_the_mean_down() {
        let mut sparse = [Some(4.0); QuestionKey::COUNT];
        sparse[0] = None;
        let rows = [
            scored("P1", SubmissionRole::Patient, sparse),
            uniform("P2", SubmissionRole::Patient, 4.0),
        ];
        let refs: Vec<&SurveyRow> = rows.iter().collect();

        let means = role_means(&refs, &ids(&["P1", "P2"]), Granularity::Question);
        assert_eq!(means.len(), QuestionKey::COUNT);
        assert_eq!(means[0], 2.0);
        assert_eq!(means[1], 4.0);
    }

    #[test]
    fn means_are_rounded_to_one_decimal() {
        let rows = [
            uniform("P1", SubmissionRole::Patient, 1.0),
            uniform("P2", SubmissionRole::Patient, 2.0),
            uniform("P3", SubmissionRole::Patient, 2.0),
        ];
        let refs: Vec<&SurveyRow> = rows.iter().collect();

        let means = role_means(&refs, &ids(&["P1", "P2", "P3"]), Granularity::Question);
        assert_eq!(means[0], 1.7);
        assert_eq!(round_one(2.25), 2.3);
    }

    #[test]
    fn chart_data_has_stable_labels_and_series_order() {
        let store = RowStore::new(vec![
            uniform("P1", SubmissionRole::Patient, 3.0),
            uniform("RO1", SubmissionRole::RadiationOncology, 5.0),
            uniform("UO1", SubmissionRole::UrologicOncology, 6.0),
        ]);
        let selection = Selection {
            patients: ids(&["P1"]),
            radiation: ids(&["RO1"]),
            urologic: Vec::new(),
        };

        let chart = chart_data(&store, &selection, Granularity::Category);
        assert_eq!(chart.labels, questions::category_labels());
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Patients", "Radiation Oncologists", "Urologists"]);
        assert_eq!(chart.series[0].values, vec![3.0; 4]);
        assert_eq!(chart.series[1].values, vec![5.0; 4]);
        assert!(chart.series[2].values.is_empty());

        let chart = chart_data(&store, &selection, Granularity::Question);
        assert_eq!(chart.labels[0], "Question 1");
        assert_eq!(chart.labels[9], "Question 10");
    }

    #[test]
    fn ids_are_matched_within_the_role_partition() {
        let store = RowStore::new(vec![
            uniform("X1", SubmissionRole::Patient, 2.0),
            uniform("X1", SubmissionRole::RadiationOncology, 6.0),
        ]);
        let selection = Selection {
            patients: ids(&["X1"]),
            radiation: ids(&["X1"]),
            urologic: Vec::new(),
        };

        let chart = chart_data(&store, &selection, Granularity::Question);
        assert_eq!(chart.series[0].values[0], 2.0);
        assert_eq!(chart.series[1].values[0], 6.0);
    }

    #[test]
    fn discrepancy_reports_the_widest_gap() {
        let chart = ChartData {
            labels: vec!["Exchanging Information".to_string()],
            series: vec![
                Series { name: "Patients".to_string(), values: vec![3.5] },
                Series { name: "Radiation Oncologists".to_string(), values: vec![5.0] },
                Series { name: "Urologists".to_string(), values: vec![] },
            ],
        };

        let gaps = discrepancies(&chart);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].patient, Some(3.5));
        assert_eq!(gaps[0].urologic, None);
        assert_eq!(gaps[0].max_gap, Some(1.5));

        let lonely = ChartData {
            labels: vec!["Question 1".to_string()],
            series: vec![Series { name: "Patients".to_string(), values: vec![4.0] }],
        };
        assert_eq!(discrepancies(&lonely)[0].max_gap, None);
    }
}
