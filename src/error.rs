use chrono::{NaiveDate, NaiveDateTime};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Append or filler found no remaining capacity in the broadcast day.
    #[error("broadcast day {0} is already full")]
    DayFull(NaiveDate),

    /// An append would run past the end of its broadcast day and the operator has not
    /// confirmed it.
    #[error("program would end at {ends_at}, past the end of broadcast day {date}")]
    Overflow {
        date: NaiveDate,
        ends_at: NaiveDateTime,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("video metadata lookup failed: {0}")]
    Metadata(String),

    #[error("invalid catalog: {0}")]
    Catalog(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DayFull(_) => "day_full",
            Error::Overflow { .. } => "overflow",
            Error::NotFound(_) => "not_found",
            Error::InvalidInput(_) => "invalid_input",
            Error::Storage(_) => "storage",
            Error::Metadata(_) => "metadata",
            Error::Catalog(_) => "catalog",
            Error::Task(_) => "task",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Metadata(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Catalog(value.to_string())
    }
}
