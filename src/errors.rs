use thiserror::Error;
use std::num::{ParseFloatError, ParseIntError};

#[derive(Error, Debug)]
pub enum AlphaMatrixError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Parse int error: {0}")]
    ParseIntError(#[from] ParseIntError),

    #[error("Parse float error: {0}")]
    ParseFloatError(#[from] ParseFloatError),

    #[error("Exchange error: {0}")]
    ExchangeError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, AlphaMatrixError>;

impl From<String> for AlphaMatrixError {
    fn from(s: String) -> Self {
        AlphaMatrixError::Unknown(s)
    }
}

impl From<&str> for AlphaMatrixError {
    fn from(s: &str) -> Self {
        AlphaMatrixError::Unknown(s.to_string())
    }
}
