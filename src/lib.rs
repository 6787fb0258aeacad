//! Onboarding Tracker: moves prospective students from lead to first class.

pub mod config;
pub mod documents;
pub mod error;
pub mod files;
pub mod identity;
pub mod notify;
pub mod onboarding;
pub mod pipeline;
pub mod store;
