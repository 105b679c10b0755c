use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum ClientError {
    #[error("Error creating Client: {0}")]
    CreateClient(String),

    #[error("Invalid server address {0}: {1}")]
    InvalidAddress(String, String),

    #[error("Error pinging server: {0}")]
    Ping(String),

    #[error("Error executing query: {0}")]
    Query(String),

    #[error("Server returned status {0}: {1}")]
    UnexpectedResponse(u16, String),

    #[error("Unknown consistency level {0:?}. Please use any, one, quorum, or all.")]
    UnknownConsistencyLevel(String),

    #[error("Error writing points: {0}")]
    Write(String),
}
