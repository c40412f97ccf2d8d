use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubmissionRole {
    #[serde(rename = "Patient")]
    Patient,
    #[serde(rename = "Radiation Oncology")]
    RadiationOncology,
    #[serde(rename = "Urologic Oncology")]
    UrologicOncology,
}

impl SubmissionRole {
    pub const ALL: [SubmissionRole; 3] = [
        SubmissionRole::Patient,
        SubmissionRole::RadiationOncology,
        SubmissionRole::UrologicOncology,
    ];

    /// The discriminator exactly as it appears in the `submission_role` column.
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionRole::Patient => "Patient",
            SubmissionRole::RadiationOncology => "Radiation Oncology",
            SubmissionRole::UrologicOncology => "Urologic Oncology",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        SubmissionRole::ALL
            .into_iter()
            .find(|role| role.as_str() == value.trim())
    }

    /// Series name used by the radar chart data.
    pub fn series_name(self) -> &'static str {
        match self {
            SubmissionRole::Patient => "Patients",
            SubmissionRole::RadiationOncology => "Radiation Oncologists",
            SubmissionRole::UrologicOncology => "Urologists",
        }
    }

    /// Role label used by the distribution view.
    pub fn respondent_label(self) -> &'static str {
        match self {
            SubmissionRole::Patient => "Patient",
            SubmissionRole::RadiationOncology => "Radiation Oncologist",
            SubmissionRole::UrologicOncology => "Urologic Oncologist",
        }
    }
}

impl fmt::Display for SubmissionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the ten survey questions, numbered 1 through 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionKey(u8);

impl QuestionKey {
    pub const COUNT: usize = 10;

    pub const fn nth(number: u8) -> Self {
        assert!(number >= 1 && number as usize <= Self::COUNT);
        QuestionKey(number)
    }

    pub fn all() -> impl Iterator<Item = QuestionKey> {
        (1..=Self::COUNT as u8).map(QuestionKey)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn column(self) -> String {
        format!("survey_q{}", self.0)
    }

    /// Short form such as `Q7`.
    pub fn short_label(self) -> String {
        format!("Q{}", self.0)
    }

    /// Axis label such as `Question 7`.
    pub fn chart_label(self) -> String {
        format!("Question {}", self.0)
    }

    fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyRow {
    pub id: String,
    pub treatment_id: Option<String>,
    pub submission_role: SubmissionRole,
    pub appointment_date: Option<NaiveDateTime>,
    pub age: Option<f64>,
    pub race: Option<String>,
    pub distance_miles: Option<f64>,
    pub radiation_oncologist_id: Option<String>,
    pub urologist_oncologist_id: Option<String>,
    pub linked_patient_id: Option<String>,
    pub next_steps: String,
    pub score_below_3: bool,
    pub scores: [Option<f64>; QuestionKey::COUNT],
}

impl SurveyRow {
    /// The raw answer as parsed, `None` when blank or non-numeric.
    pub fn score(&self, key: QuestionKey) -> Option<f64> {
        self.scores[key.index()]
    }

    /// The answer with missing values counted as zero. Averages use this so
    /// every selected row contributes to the denominator.
    pub fn score_or_zero(&self, key: QuestionKey) -> f64 {
        self.score(key).filter(|value| value.is_finite()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub label: String,
    pub patient: Option<f64>,
    pub radiation: Option<f64>,
    pub urologic: Option<f64>,
    pub max_gap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRecord {
    pub category: &'static str,
    pub score: f64,
    pub role: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub role: &'static str,
    pub category: &'static str,
    pub count: usize,
    pub min: f64,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
    pub max: f64,
    pub mean: f64,
}
