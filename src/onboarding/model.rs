//! Onboarding request data models.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::pipeline::OnboardingStatus;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// One prospective student moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingRequest {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    /// National id / passport number.
    pub id_number: String,
    /// Sales rep who created the lead.
    pub sales_email: String,
    pub status: OnboardingStatus,
    /// Proposed class level (e.g. "B1"), set once a class is proposed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_request_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_refused_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingRequest {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Name of this request's document folder: `first_last_id`.
    ///
    /// Path separators and control characters become `_` so the name is
    /// always a single path segment.
    pub fn folder_name(&self) -> String {
        format!("{}_{}_{}", self.first_name, self.last_name, self.id)
            .chars()
            .map(|c| {
                if matches!(c, '/' | '\\') || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect()
    }
}

/// Input for creating a lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLead {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub lead_remarks: Option<String>,
    /// Level already known: skip the placement test.
    #[serde(default)]
    pub skip_test: bool,
    #[serde(default)]
    pub level: Option<String>,
}

impl NewLead {
    /// Check required fields. A skipped test needs a known level.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::Required { field: "first_name" });
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::Required { field: "last_name" });
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::Required { field: "email" });
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: format!("'{}' is not an email address", self.email),
            });
        }
        if self.skip_test && self.level.as_deref().is_none_or(|l| l.trim().is_empty()) {
            return Err(ValidationError::Required { field: "level" });
        }
        Ok(())
    }

    /// Status a new request starts in.
    pub fn initial_status(&self) -> OnboardingStatus {
        if self.skip_test {
            OnboardingStatus::TestCompleted
        } else {
            OnboardingStatus::LeadCreated
        }
    }

    /// Build the request row. Call [`validate`](Self::validate) first.
    pub fn into_request(self, sales_email: impl Into<String>) -> OnboardingRequest {
        let now = Utc::now();
        let status = self.initial_status();
        OnboardingRequest {
            id: Uuid::new_v4(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number,
            id_number: self.id_number,
            sales_email: sales_email.into(),
            status,
            level: self.level.filter(|l| !l.trim().is_empty()),
            start_date: None,
            lead_remarks: self.lead_remarks.filter(|r| !r.trim().is_empty()),
            contract_request_notes: None,
            group_refused_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial field set written by `RequestStore::update_by_id`.
///
/// `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestUpdate {
    pub status: Option<OnboardingStatus>,
    pub level: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub contract_request_notes: Option<String>,
    pub group_refused_reason: Option<String>,
}

impl RequestUpdate {
    pub fn status(status: OnboardingStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
