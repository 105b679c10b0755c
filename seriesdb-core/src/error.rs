use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Error writing csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("Error writing output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to parse json: {0}")]
    Json(#[from] serde_json::Error),
}
