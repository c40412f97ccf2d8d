use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::aggregate::{self, Granularity};
use crate::dataset::RowStore;
use crate::models::{ChartData, Discrepancy, SubmissionRole};
use crate::reshape;
use crate::state::DashboardState;

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "–".to_string(), |v| format!("{v:.1}"))
}

/// Text table of a radar chart: one line per label, one column per role.
pub fn render_chart_table(chart: &ChartData) -> String {
    let mut output = String::new();
    let width = chart.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let _ = write!(output, "{:width$}", "");
    for series in &chart.series {
        let _ = write!(output, "  {:>22}", series.name);
    }
    let _ = writeln!(output, "  {:>8}", "Max gap");

    for gap in aggregate::discrepancies(chart) {
        let _ = write!(output, "{:width$}", gap.label);
        for value in [gap.patient, gap.radiation, gap.urologic] {
            let _ = write!(output, "  {:>22}", format_value(value));
        }
        let _ = writeln!(output, "  {:>8}", format_value(gap.max_gap));
    }

    for series in chart.series.iter().filter(|s| s.values.is_empty()) {
        let _ = writeln!(output, "No data for {}.", series.name);
    }

    output
}

fn largest_gaps(gaps: &[Discrepancy], limit: usize) -> Vec<&Discrepancy> {
    let mut ranked: Vec<&Discrepancy> = gaps.iter().filter(|g| g.max_gap.is_some()).collect();
    ranked.sort_by(|a, b| {
        b.max_gap
            .partial_cmp(&a.max_gap)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

pub fn build_report(store: &RowStore, state: &DashboardState, evaluated_at: NaiveDateTime) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Shared Decision-Making Survey Report");
    let _ = writeln!(
        output,
        "Generated from {} submissions (appointment recency evaluated at {})",
        store.rows().len(),
        evaluated_at.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Patient Filters");

    if state.filters.is_empty() {
        let _ = writeln!(output, "No filters applied; every patient is eligible.");
    } else {
        for line in state.filters.describe() {
            let _ = writeln!(output, "- {line}");
        }
    }

    let _ = writeln!(output);
    match &state.matched {
        None => {
            let _ = writeln!(output, "Filters have not been submitted.");
        }
        Some(matched) => {
            let _ = writeln!(output, "Matched patients: {}", matched.len());
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Selection");
    for role in SubmissionRole::ALL {
        let ids = state.selection.ids(role);
        if ids.is_empty() {
            let _ = writeln!(output, "- {}: none selected", role.series_name());
        } else {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                role.series_name(),
                ids.len(),
                ids.join(", ")
            );
        }
    }

    if !state.selection.is_complete() {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Select at least one Patient, one RO, and one UO to view the survey analysis."
        );
        return output;
    }

    let by_question = aggregate::chart_data(store, &state.selection, Granularity::Question);
    let by_category = aggregate::chart_data(store, &state.selection, Granularity::Category);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mean Scores by Category");
    let _ = writeln!(output, "```");
    let _ = write!(output, "{}", render_chart_table(&by_category));
    let _ = writeln!(output, "```");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mean Scores by Question");
    let _ = writeln!(output, "```");
    let _ = write!(output, "{}", render_chart_table(&by_question));
    let _ = writeln!(output, "```");

    let gaps = aggregate::discrepancies(&by_question);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Largest Disagreements");
    let ranked = largest_gaps(&gaps, 3);
    if ranked.is_empty() {
        let _ = writeln!(output, "Not enough roles with data to compare.");
    } else {
        for gap in ranked {
            let _ = writeln!(
                output,
                "- {}: gap {} (patients {}, radiation {}, urology {})",
                gap.label,
                format_value(gap.max_gap),
                format_value(gap.patient),
                format_value(gap.radiation),
                format_value(gap.urologic)
            );
        }
    }

    let summaries = reshape::summarize(&reshape::long_form(store, &state.selection));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Distribution");
    if summaries.is_empty() {
        let _ = writeln!(output, "No answered questions in this selection.");
    } else {
        let _ = writeln!(output, "| Role | Category | n | Min | Q1 | Median | Q3 | Max | Mean |");
        let _ = writeln!(output, "| --- | --- | --- | --- | --- | --- | --- | --- | --- |");
        for s in summaries {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.1} | {:.2} | {:.2} | {:.2} | {:.1} | {:.1} |",
                s.role,
                s.category,
                s.count,
                s.min,
                s.lower_quartile,
                s.median,
                s.upper_quartile,
                s.max,
                s.mean
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{QuestionKey, Series, SurveyRow};

    fn row(id: &str, role: SubmissionRole, value: f64) -> SurveyRow {
        SurveyRow {
            id: id.to_string(),
            treatment_id: None,
            submission_role: role,
            appointment_date: None,
            age: Some(60.0),
            race: None,
            distance_miles: None,
            radiation_oncologist_id: Some("RO1".to_string()),
            urologist_oncologist_id: Some("UO1".to_string()),
            linked_patient_id: None,
            next_steps: "Surgery".to_string(),
            score_below_3: false,
            scores: [Some(value); QuestionKey::COUNT],
        }
    }

    fn evaluated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn incomplete_selection_stops_before_the_analysis() {
        let store = RowStore::new(vec![row("P1", SubmissionRole::Patient, 4.0)]);
        let report = build_report(&store, &DashboardState::default(), evaluated_at());

        assert!(report.contains("Filters have not been submitted."));
        assert!(report.contains("- Patients: none selected"));
        assert!(report.contains("Select at least one Patient"));
        assert!(!report.contains("## Mean Scores"));
    }

    #[test]
    fn complete_selection_includes_means_and_gaps() {
        let store = RowStore::new(vec![
            row("P1", SubmissionRole::Patient, 3.0),
            row("RO1", SubmissionRole::RadiationOncology, 5.0),
            row("UO1", SubmissionRole::UrologicOncology, 6.0),
        ]);
        let mut state = DashboardState::default();
        state.submit_filters(&store, evaluated_at());
        let candidates = state.candidates(&store);
        for role in SubmissionRole::ALL {
            state.select_all(role, &candidates);
        }

        let report = build_report(&store, &state, evaluated_at());
        assert!(report.contains("Matched patients: 1"));
        assert!(report.contains("## Mean Scores by Category"));
        assert!(report.contains("- Question 1: gap 3.0 (patients 3.0, radiation 5.0, urology 6.0)"));
        assert!(report.contains("| Patient | Establishing Partnership | 2 |"));
    }

    #[test]
    fn chart_table_marks_roles_without_data() {
        let chart = ChartData {
            labels: vec!["Question 1".to_string()],
            series: vec![
                Series { name: "Patients".to_string(), values: vec![4.0] },
                Series { name: "Radiation Oncologists".to_string(), values: vec![] },
                Series { name: "Urologists".to_string(), values: vec![2.5] },
            ],
        };

        let table = render_chart_table(&chart);
        assert!(table.contains("No data for Radiation Oncologists."));
        assert!(table.contains("1.5"));
        assert!(!table.contains("0.0"));
    }
}
