use thiserror::Error;

#[derive(Error, Debug)]
pub enum RollupError {
    #[error("No usable rows: every row was empty or had an unparseable date")]
    NoData,

    #[error("No data for the current month {month_key}")]
    NoCurrentMonthData { month_key: String },

    #[error("Invalid rollup configuration: {0}")]
    InvalidConfig(String),

    #[error("Row source failed: {0}")]
    SourceError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RollupError {
    /// True for the conditions an API layer should surface as "not found"
    /// rather than as a failure.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            RollupError::NoData | RollupError::NoCurrentMonthData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RollupError>;
