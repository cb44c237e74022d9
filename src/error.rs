use thiserror::Error;

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Table not found: {0}")]
    MissingTable(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Taxonomy: {0}")]
    Taxonomy(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("No activities recorded between {start_year} and {end_year}")]
    NoActivities { start_year: i32, end_year: i32 },

    #[error("{0}")]
    General(String),
}

#[cfg(feature = "python")]
impl From<UsageError> for pyo3::PyErr {
    fn from(err: UsageError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for UsageError {
    fn from(err: pyo3::PyErr) -> Self {
        UsageError::General(err.to_string())
    }
}
