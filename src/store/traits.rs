//! `RequestStore` trait: async persistence interface for onboarding requests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::{OnboardingRequest, RequestUpdate};

/// Backend-agnostic request persistence.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Insert a new request.
    async fn insert(&self, request: &OnboardingRequest) -> Result<(), DatabaseError>;

    /// Every request, newest first.
    async fn list_all(&self) -> Result<Vec<OnboardingRequest>, DatabaseError>;

    /// Get a request by ID. Missing → `DatabaseError::NotFound`.
    async fn get_by_id(&self, id: Uuid) -> Result<OnboardingRequest, DatabaseError>;

    /// Write the set fields of `update`, bump `updated_at`, and return the
    /// stored row.
    async fn update_by_id(
        &self,
        id: Uuid,
        update: &RequestUpdate,
    ) -> Result<OnboardingRequest, DatabaseError>;
}
