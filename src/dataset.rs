use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::LoadError;
use crate::filters::NEXT_STEPS;
use crate::models::{QuestionKey, SubmissionRole, SurveyRow};

const REQUIRED_COLUMNS: [&str; 20] = [
    "id",
    "submission_role",
    "appointment_date",
    "age",
    "race",
    "distance_miles",
    "radiation_oncologist_id",
    "urologist_oncologist_id",
    "next_steps",
    "score_below_3",
    "survey_q1",
    "survey_q2",
    "survey_q3",
    "survey_q4",
    "survey_q5",
    "survey_q6",
    "survey_q7",
    "survey_q8",
    "survey_q9",
    "survey_q10",
];

#[derive(Deserialize)]
struct CsvRow {
    id: Option<String>,
    #[serde(default)]
    treatment_id: Option<String>,
    submission_role: Option<String>,
    appointment_date: Option<String>,
    age: Option<String>,
    race: Option<String>,
    distance_miles: Option<String>,
    radiation_oncologist_id: Option<String>,
    urologist_oncologist_id: Option<String>,
    #[serde(default)]
    linked_patient_id: Option<String>,
    next_steps: Option<String>,
    score_below_3: Option<String>,
    survey_q1: Option<String>,
    survey_q2: Option<String>,
    survey_q3: Option<String>,
    survey_q4: Option<String>,
    survey_q5: Option<String>,
    survey_q6: Option<String>,
    survey_q7: Option<String>,
    survey_q8: Option<String>,
    survey_q9: Option<String>,
    survey_q10: Option<String>,
}

/// Every survey submission, in file order. Loaded once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<SurveyRow>,
}

impl RowStore {
    #[cfg(test)]
    pub fn new(rows: Vec<SurveyRow>) -> Self {
        RowStore { rows }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path)?;
        let store = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            rows = store.rows.len(),
            patients = store.partition(SubmissionRole::Patient).len(),
            radiation = store.partition(SubmissionRole::RadiationOncology).len(),
            urologic = store.partition(SubmissionRole::UrologicOncology).len(),
            "loaded survey data"
        );
        Ok(store)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(LoadError::MissingColumn(column));
            }
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let raw: CsvRow = record.deserialize(Some(&headers))?;
            rows.push(convert_row(raw, line)?);
        }

        Ok(RowStore { rows })
    }

    pub fn rows(&self) -> &[SurveyRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn partition(&self, role: SubmissionRole) -> Vec<&SurveyRow> {
        self.rows
            .iter()
            .filter(|row| row.submission_role == role)
            .collect()
    }

    pub fn patients(&self) -> Vec<&SurveyRow> {
        self.partition(SubmissionRole::Patient)
    }

    pub fn find(&self, role: SubmissionRole, id: &str) -> Option<&SurveyRow> {
        self.rows
            .iter()
            .find(|row| row.submission_role == role && row.id == id)
    }
}

fn convert_row(raw: CsvRow, line: u64) -> Result<SurveyRow, LoadError> {
    let id = non_blank(raw.id).ok_or(LoadError::MissingId { line })?;

    let role_value = raw.submission_role.unwrap_or_default();
    let submission_role =
        SubmissionRole::parse(&role_value).ok_or_else(|| LoadError::UnknownRole {
            line,
            value: role_value.clone(),
        })?;

    let score_below_3 = parse_flag(raw.score_below_3.as_deref()).ok_or_else(|| {
        LoadError::InvalidField {
            line,
            column: "score_below_3",
            value: raw.score_below_3.clone().unwrap_or_default(),
        }
    })?;

    let next_steps = raw.next_steps.unwrap_or_default();
    if !next_steps.is_empty() && !NEXT_STEPS.contains(&next_steps.as_str()) {
        tracing::debug!(line, next_steps = %next_steps, "next step outside the known vocabulary");
    }

    let raw_scores = [
        raw.survey_q1,
        raw.survey_q2,
        raw.survey_q3,
        raw.survey_q4,
        raw.survey_q5,
        raw.survey_q6,
        raw.survey_q7,
        raw.survey_q8,
        raw.survey_q9,
        raw.survey_q10,
    ];
    let mut scores = [None; QuestionKey::COUNT];
    for ((slot, value), key) in scores
        .iter_mut()
        .zip(raw_scores.iter())
        .zip(QuestionKey::all())
    {
        *slot = parse_number(value.as_deref());
        if slot.is_none() && value.is_some() {
            tracing::debug!(line, column = %key.column(), value = ?value, "non-numeric survey answer");
        }
    }

    Ok(SurveyRow {
        id,
        treatment_id: non_blank(raw.treatment_id),
        submission_role,
        appointment_date: raw.appointment_date.as_deref().and_then(parse_timestamp),
        age: parse_number(raw.age.as_deref()),
        race: non_blank(raw.race),
        distance_miles: parse_number(raw.distance_miles.as_deref()),
        radiation_oncologist_id: non_blank(raw.radiation_oncologist_id),
        urologist_oncologist_id: non_blank(raw.urologist_oncologist_id),
        linked_patient_id: non_blank(raw.linked_patient_id),
        next_steps,
        score_below_3,
        scores,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Some(false),
        Some("true") | Some("1") => Some(true),
        Some("false") | Some("0") => Some(false),
        Some(_) => None,
    }
}

/// Accepts bare dates (read as midnight UTC), naive timestamps with either
/// separator, and RFC 3339 timestamps (converted to UTC).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.naive_utc())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const HEADER: &str = "id,treatment_id,submission_role,appointment_date,age,race,distance_miles,radiation_oncologist_id,urologist_oncologist_id,linked_patient_id,next_steps,score_below_3,survey_q1,survey_q2,survey_q3,survey_q4,survey_q5,survey_q6,survey_q7,survey_q8,survey_q9,survey_q10";

    fn csv_with(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text
    }

    #[test]
    fn parses_patient_and_specialist_rows() {
        let text = csv_with(&[
            "P001,T001,Patient,2026-08-01,62,White,41.5,RO01,UO01,,Surgery,True,5,6,4,5,5,3,4,5,6,6",
            "RO01,T001,Radiation Oncology,2026-08-01,,,,,,P001,Surgery,False,4,4,5,5,4,4,5,4,5,5",
        ]);
        let store = RowStore::from_reader(text.as_bytes()).unwrap();

        assert_eq!(store.rows().len(), 2);
        let patient = &store.rows()[0];
        assert_eq!(patient.submission_role, SubmissionRole::Patient);
        assert_eq!(patient.age, Some(62.0));
        assert_eq!(patient.distance_miles, Some(41.5));
        assert_eq!(patient.radiation_oncologist_id.as_deref(), Some("RO01"));
        assert!(patient.score_below_3);
        assert_eq!(patient.score(QuestionKey::nth(6)), Some(3.0));
        assert_eq!(
            patient.appointment_date,
            NaiveDate::from_ymd_opt(2026, 8, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        );

        let specialist = &store.rows()[1];
        assert_eq!(specialist.age, None);
        assert_eq!(specialist.race, None);
        assert_eq!(specialist.linked_patient_id.as_deref(), Some("P001"));
        assert!(!specialist.score_below_3);
    }

    #[test]
    fn non_numeric_answers_stay_missing_until_aggregation() {
        let text = csv_with(&[
            "P001,,Patient,2026-08-01,62,White,10,,,,Surgery,false,n/a,,4,5,5,3,4,5,6,6",
        ]);
        let store = RowStore::from_reader(text.as_bytes()).unwrap();
        let row = &store.rows()[0];

        assert_eq!(row.score(QuestionKey::nth(1)), None);
        assert_eq!(row.score(QuestionKey::nth(2)), None);
        assert_eq!(row.score_or_zero(QuestionKey::nth(1)), 0.0);
        assert_eq!(row.radiation_oncologist_id, None);
    }

    #[test]
    fn unknown_role_fails_the_whole_load() {
        let text = csv_with(&[
            "P001,,Patient,2026-08-01,62,White,10,,,,Surgery,false,1,2,3,4,5,6,1,2,3,4",
            "X001,,Medical Oncology,2026-08-01,,,,,,,Surgery,false,1,2,3,4,5,6,1,2,3,4",
        ]);
        let err = RowStore::from_reader(text.as_bytes()).unwrap_err();

        match err {
            LoadError::UnknownRole { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "Medical Oncology");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_rows_are_rejected() {
        let text = csv_with(&["P001,,Patient,2026-08-01,62"]);
        let err = RowStore::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn invalid_flag_is_reported_with_its_column() {
        let text = csv_with(&[
            "P001,,Patient,2026-08-01,62,White,10,,,,Surgery,maybe,1,2,3,4,5,6,1,2,3,4",
        ]);
        let err = RowStore::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidField { column: "score_below_3", .. }
        ));
    }

    #[test]
    fn blank_lines_and_extra_columns_are_ignored() {
        let text = format!(
            "{HEADER},notes\n\nP001,,Patient,2026-08-01,,White,10,,,,Surgery,0,1,2,3,4,5,6,1,2,3,4,follow up\n\n"
        );
        let store = RowStore::from_reader(text.as_bytes()).unwrap();

        assert_eq!(store.rows().len(), 1);
        assert_eq!(store.rows()[0].id, "P001");
        assert_eq!(store.rows()[0].age, None);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RowStore::load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn missing_required_column_is_named() {
        let text = "id,submission_role\nP001,Patient\n";
        let err = RowStore::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("appointment_date")));
    }

    #[test]
    fn partitions_are_disjoint_and_cover_the_store() {
        let store = RowStore::from_reader(
            include_str!("../data/radar_survey_synthetic_data.csv").as_bytes(),
        )
        .unwrap();

        let total: usize = SubmissionRole::ALL
            .into_iter()
            .map(|role| store.partition(role).len())
            .sum();
        assert_eq!(total, store.rows().len());
        assert!(!store.patients().is_empty());
        assert!(store.find(SubmissionRole::RadiationOncology, "RO01").is_some());
        assert!(store.find(SubmissionRole::Patient, "RO01").is_none());
    }

    #[test]
    fn loads_from_a_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            csv_with(&["P001,,Patient,2026-08-01,62,White,10,,,,Surgery,0,1,2,3,4,5,6,1,2,3,4"])
        )
        .unwrap();

        let store = RowStore::load(file.path()).unwrap();
        assert_eq!(store.rows().len(), 1);
    }

    #[test]
    fn timestamps_accept_common_shapes() {
        let midnight = NaiveDate::from_ymd_opt(2026, 3, 15).and_then(|d| d.and_hms_opt(0, 0, 0));
        assert_eq!(parse_timestamp("2026-03-15"), midnight);
        assert_eq!(parse_timestamp("2026-03-15 00:00:00"), midnight);
        assert_eq!(parse_timestamp("2026-03-15T00:00:00"), midnight);
        assert_eq!(parse_timestamp("2026-03-15T02:00:00+02:00"), midnight);
        assert_eq!(parse_timestamp("March 15"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
