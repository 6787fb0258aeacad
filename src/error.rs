//! Error types for the onboarding tracker.

use uuid::Uuid;

use crate::pipeline::{Actor, OnboardingStatus};

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// State machine errors: registry lookups, authorization and adjacency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("Unknown onboarding status: {0}")]
    UnknownStatus(String),

    #[error("No status registered at step {0}")]
    StepNotFound(u32),

    #[error("Invalid step registry: {0}")]
    InvalidRegistry(String),

    #[error("{actor} may not move a request into {target}")]
    Forbidden {
        actor: Actor,
        target: OnboardingStatus,
    },

    #[error("Cannot transition from {from} to {to}")]
    IllegalTransition {
        from: OnboardingStatus,
        to: OnboardingStatus,
    },

    #[error("Entering {status} requires field '{field}'")]
    MissingField {
        status: OnboardingStatus,
        field: &'static str,
    },

    #[error("Request is at {actual}, operation requires {expected}")]
    WrongStage {
        expected: OnboardingStatus,
        actual: OnboardingStatus,
    },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatabaseError {
    pub fn request_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "onboarding_request".to_string(),
            id: id.to_string(),
        }
    }
}

/// Email delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    SendFailed(String),
}

/// Contract rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Contract terms incomplete: {0}")]
    IncompleteTerms(String),
}

/// File store errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Storage provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input validation errors (lead creation, request payloads).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: &'static str },

    #[error("Field '{field}' is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type alias for the tracker.
pub type Result<T> = std::result::Result<T, Error>;
