use thiserror::Error;

/// Errors raised while reading or validating the analyzer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config path is not valid UTF-8.
    #[error("config file path is not valid UTF-8")]
    FilePathIntoString,

    #[error("failed to read configuration: {0}")]
    SettingsInit(String),

    #[error("failed to deserialize configuration: {0}")]
    Deserialize(String),

    #[error("invalid time {value:?} in [{section}] (expected HH:MM)")]
    InvalidTime { section: String, value: String },

    #[error("condition {condition:?} is not available on the {stage} stage")]
    ConditionNotAllowed { stage: String, condition: String },

    #[error("level {level:?} is not valid for the [{section}] stage")]
    InvalidLevel { section: String, level: String },

    #[error("result {result:?} is not a touch label")]
    InvalidResult { result: String },

    #[error("prev_move {value:?} is not a previous-move bucket")]
    InvalidPrevMove { value: String },
}

/// A single input row that could not be interpreted. Rows that fail are
/// skipped by the loaders, never fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("unrecognised date {0:?}")]
    InvalidDate(String),

    #[error("unrecognised timestamp {0:?}")]
    InvalidTimestamp(String),
}
