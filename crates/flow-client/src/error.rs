//! Error types for the flow client.

use crate::flow::FlowStep;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid step: expected {expected}, currently on {actual}")]
    InvalidStep { expected: FlowStep, actual: FlowStep },
}
