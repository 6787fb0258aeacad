//! Onboarding requests: data model, orchestration and REST surface.

pub mod manager;
pub mod model;
pub mod routes;

pub use manager::{ManagerDeps, NotificationResult, OnboardingManager, TransitionReport};
pub use model::{NewLead, OnboardingRequest, RequestUpdate};
pub use routes::{ApiError, OnboardingRouteState, onboarding_routes};
