use thiserror::Error;

use crate::models::SubmissionRole;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read survey data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed survey data: {0}")]
    Csv(#[from] csv::Error),

    #[error("survey data is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: unknown submission role '{value}'")]
    UnknownRole { line: u64, value: String },

    #[error("line {line}: row has no id")]
    MissingId { line: u64 },

    #[error("line {line}: '{value}' is not a valid value for {column}")]
    InvalidField {
        line: u64,
        column: &'static str,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("distance threshold {0} is outside the supported range 5-400 miles")]
    DistanceOutOfRange(u32),
}

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Please filter and select all three roles to proceed (no {0} selected).")]
    Incomplete(SubmissionRole),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid dashboard state: {0}")]
    Json(#[from] serde_json::Error),
}
