use thiserror::Error;

use crate::schema::Field;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Model call failed: {0}")]
    ModelCallFailed(String),

    #[error("Model reply could not be decoded: {0}")]
    DecodeError(String),

    #[error("Record is missing required fields: {0:?}")]
    IncompleteRecord(Vec<Field>),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
