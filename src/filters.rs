use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::models::SurveyRow;

pub const RACES: [&str; 4] = [
    "Black or African American",
    "White",
    "Asian",
    "American Indian or Alaska Native",
];

pub const NEXT_STEPS: [&str; 5] = [
    "Still deciding",
    "Further workup",
    "Active surveillance",
    "Radiation",
    "Surgery",
];

pub const MIN_DISTANCE_MILES: u32 = 5;
/// Slider maximum. Selecting it turns distance filtering off.
pub const DISTANCE_DISABLED_MILES: u32 = 400;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Age ranges share their boundary years: 50 is in both `≤ 50` and `50-60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum AgeBucket {
    #[serde(rename = "le50")]
    #[value(name = "le50")]
    UpTo50,
    #[serde(rename = "50-60")]
    #[value(name = "50-60")]
    From50To60,
    #[serde(rename = "60-70")]
    #[value(name = "60-70")]
    From60To70,
    #[serde(rename = "70-80")]
    #[value(name = "70-80")]
    From70To80,
    #[serde(rename = "ge80")]
    #[value(name = "ge80")]
    From80,
}

impl AgeBucket {
    pub fn contains(self, age: f64) -> bool {
        match self {
            AgeBucket::UpTo50 => age <= 50.0,
            AgeBucket::From50To60 => (50.0..=60.0).contains(&age),
            AgeBucket::From60To70 => (60.0..=70.0).contains(&age),
            AgeBucket::From70To80 => (70.0..=80.0).contains(&age),
            AgeBucket::From80 => age >= 80.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::UpTo50 => "≤ 50",
            AgeBucket::From50To60 => "50-60 (Includes 50 & 60)",
            AgeBucket::From60To70 => "60-70 (Includes 60 & 70)",
            AgeBucket::From70To80 => "70-80 (Includes 70 & 80)",
            AgeBucket::From80 => "≥ 80",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum AppointmentBucket {
    #[serde(rename = "0-3-months")]
    #[value(name = "0-3-months")]
    WithinThreeMonths,
    #[serde(rename = "3-6-months")]
    #[value(name = "3-6-months")]
    ThreeToSixMonths,
    #[serde(rename = "over-6-months")]
    #[value(name = "over-6-months")]
    OverSixMonths,
}

impl AppointmentBucket {
    pub fn contains(self, days_ago: f64) -> bool {
        match self {
            AppointmentBucket::WithinThreeMonths => days_ago <= 90.0,
            AppointmentBucket::ThreeToSixMonths => days_ago > 90.0 && days_ago <= 180.0,
            AppointmentBucket::OverSixMonths => days_ago > 180.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppointmentBucket::WithinThreeMonths => "0 - 3 months ago",
            AppointmentBucket::ThreeToSixMonths => "3 - 6 months ago",
            AppointmentBucket::OverSixMonths => "> 6 months ago",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DistanceThreshold(u32);

impl DistanceThreshold {
    pub fn new(miles: u32) -> Result<Self, FilterError> {
        if (MIN_DISTANCE_MILES..=DISTANCE_DISABLED_MILES).contains(&miles) {
            Ok(DistanceThreshold(miles))
        } else {
            Err(FilterError::DistanceOutOfRange(miles))
        }
    }

    pub fn disabled() -> Self {
        DistanceThreshold(DISTANCE_DISABLED_MILES)
    }

    pub fn miles(self) -> u32 {
        self.0
    }

    pub fn is_disabled(self) -> bool {
        self.0 == DISTANCE_DISABLED_MILES
    }

    /// A patient with no recorded distance counts as infinitely far away.
    pub fn excludes(self, distance_miles: Option<f64>) -> bool {
        if self.is_disabled() {
            return false;
        }
        distance_miles.unwrap_or(f64::INFINITY) >= f64::from(self.0)
    }
}

impl Default for DistanceThreshold {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TryFrom<u32> for DistanceThreshold {
    type Error = FilterError;

    fn try_from(miles: u32) -> Result<Self, Self::Error> {
        Self::new(miles)
    }
}

impl From<DistanceThreshold> for u32 {
    fn from(threshold: DistanceThreshold) -> Self {
        threshold.0
    }
}

/// Checkbox groups combine with AND across groups and OR within a group.
/// An empty group filters nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientFilters {
    pub ages: Vec<AgeBucket>,
    pub races: Vec<String>,
    pub appointments: Vec<AppointmentBucket>,
    pub distance: DistanceThreshold,
    pub next_steps: Vec<String>,
    pub low_score_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome<'a> {
    pub ids: Vec<String>,
    pub rows: Vec<&'a SurveyRow>,
}

impl PatientFilters {
    pub fn apply<'a>(&self, patients: &[&'a SurveyRow], now: NaiveDateTime) -> FilterOutcome<'a> {
        let rows: Vec<&'a SurveyRow> = patients
            .iter()
            .copied()
            .filter(|row| self.matches(row, now))
            .collect();
        let ids = rows.iter().map(|row| row.id.clone()).collect();

        tracing::info!(
            candidates = patients.len(),
            matched = rows.len(),
            "applied patient filters"
        );
        FilterOutcome { ids, rows }
    }

    pub fn matches(&self, row: &SurveyRow, now: NaiveDateTime) -> bool {
        if !self.ages.is_empty() {
            let age = row.age.unwrap_or(0.0);
            if !self.ages.iter().any(|bucket| bucket.contains(age)) {
                return false;
            }
        }

        if !self.races.is_empty() {
            let race = row.race.as_deref().unwrap_or("");
            if !self.races.iter().any(|r| r == race) {
                return false;
            }
        }

        if !self.appointments.is_empty() {
            let in_bucket = row.appointment_date.is_some_and(|date| {
                let days_ago = days_between(date, now);
                self.appointments.iter().any(|bucket| bucket.contains(days_ago))
            });
            if !in_bucket {
                return false;
            }
        }

        if self.distance.excludes(row.distance_miles) {
            return false;
        }

        if !self.next_steps.is_empty() && !self.next_steps.contains(&row.next_steps) {
            return false;
        }

        if self.low_score_only && !row.score_below_3 {
            return false;
        }

        true
    }

    pub fn clear_ages(&mut self) {
        self.ages.clear();
    }

    pub fn clear_races(&mut self) {
        self.races.clear();
    }

    pub fn clear_appointments(&mut self) {
        self.appointments.clear();
    }

    pub fn clear_distance(&mut self) {
        self.distance = DistanceThreshold::disabled();
    }

    pub fn clear_next_steps(&mut self) {
        self.next_steps.clear();
    }

    pub fn clear_low_score(&mut self) {
        self.low_score_only = false;
    }

    pub fn is_empty(&self) -> bool {
        self == &PatientFilters::default()
    }

    /// One line per active group, for reports and logs.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.ages.is_empty() {
            let labels: Vec<&str> = self.ages.iter().map(|b| b.label()).collect();
            lines.push(format!("Age: {}", labels.join(", ")));
        }
        if !self.races.is_empty() {
            lines.push(format!("Race: {}", self.races.join(", ")));
        }
        if !self.appointments.is_empty() {
            let labels: Vec<&str> = self.appointments.iter().map(|b| b.label()).collect();
            lines.push(format!("Appointment: {}", labels.join(", ")));
        }
        if !self.distance.is_disabled() {
            lines.push(format!("Distance: under {} miles", self.distance.miles()));
        }
        if !self.next_steps.is_empty() {
            lines.push(format!("Next steps: {}", self.next_steps.join(", ")));
        }
        if self.low_score_only {
            lines.push("Only patients with a score at or below 3".to_string());
        }
        lines
    }
}

/// Adds `value` when absent, removes it when present.
pub fn toggle_choice<T: PartialEq>(choices: &mut Vec<T>, value: T) {
    if let Some(position) = choices.iter().position(|c| *c == value) {
        choices.remove(position);
    } else {
        choices.push(value);
    }
}

/// Fractional days from `appointment` to `now`.
pub fn days_between(appointment: NaiveDateTime, now: NaiveDateTime) -> f64 {
    (now - appointment).num_milliseconds() as f64 / MILLIS_PER_DAY
}

pub fn evaluation_time(as_of: Option<NaiveDate>) -> NaiveDateTime {
    match as_of.and_then(|date| date.and_hms_opt(0, 0, 0)) {
        Some(timestamp) => timestamp,
        None => Utc::now().naive_utc(),
    }
}
