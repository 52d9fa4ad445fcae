use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum MindGraphError {
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("Graph invariant violated: {0}")]
    Graph(String),
    #[error("Generation already in flight for node {0}")]
    GenerationInFlight(String),
    #[error("Edge endpoint references a missing node: {0}")]
    MissingEndpoint(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Invalid character range: {0}")]
    Range(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl From<JsonError> for MindGraphError {
    fn from(src: JsonError) -> MindGraphError {
        MindGraphError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for MindGraphError {
    fn from(src: uuid::Error) -> MindGraphError {
        MindGraphError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<fmt::Error> for MindGraphError {
    fn from(x: fmt::Error) -> Self {
        MindGraphError::Custom(format!("{x}"))
    }
}
