//! Error types
//!
//! Only configuration and input validation can fail. Numerical trouble inside the
//! root solvers is handled locally and never surfaces here.

use thiserror::Error;

use crate::sim::events::EventClass;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Unknown {class} model: {model}")]
    UnknownModel { class: EventClass, model: String },

    #[error("Invalid parameter `{name}` for model {model}")]
    InvalidParameter { model: String, name: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SimError {
    pub fn degenerate(msg: impl Into<String>) -> Self {
        SimError::DegenerateGeometry(msg.into())
    }

    /// Whether the error came from the resolver/simulation configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimError::UnknownModel { .. } | SimError::InvalidParameter { .. } | SimError::Config(_)
        )
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
