//! Status, role and actor vocabulary shared by the state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Where a request sits in the onboarding pipeline.
///
/// Exactly one status is active per request. The ordering and ownership of
/// each status live in the [`StepRegistry`](super::StepRegistry), not here.
/// Deserializing goes through [`FromStr`], so an unknown name reports
/// [`PipelineError::UnknownStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum OnboardingStatus {
    LeadCreated,
    TestRequested,
    TestSent,
    TestCompleted,
    ClassProposed,
    ClassConfirmed,
    ContractRequested,
    ContractSent,
    ContractSigned,
    Activated,
    IntroductionConfirmed,
}

impl OnboardingStatus {
    /// Every status, in declaration order.
    pub const ALL: [OnboardingStatus; 11] = [
        Self::LeadCreated,
        Self::TestRequested,
        Self::TestSent,
        Self::TestCompleted,
        Self::ClassProposed,
        Self::ClassConfirmed,
        Self::ContractRequested,
        Self::ContractSent,
        Self::ContractSigned,
        Self::Activated,
        Self::IntroductionConfirmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadCreated => "lead_created",
            Self::TestRequested => "test_requested",
            Self::TestSent => "test_sent",
            Self::TestCompleted => "test_completed",
            Self::ClassProposed => "class_proposed",
            Self::ClassConfirmed => "class_confirmed",
            Self::ContractRequested => "contract_requested",
            Self::ContractSent => "contract_sent",
            Self::ContractSigned => "contract_signed",
            Self::Activated => "activated",
            Self::IntroductionConfirmed => "introduction_confirmed",
        }
    }
}

impl std::fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OnboardingStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PipelineError::UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for OnboardingStatus {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A signed-in staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Sales,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Sales => write!(f, "sales"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "sales" => Ok(Self::Sales),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Who is expected to move requests into a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOwner {
    Sales,
    Admin,
    /// System-initiated (webhooks, public links). Bypasses role checks.
    Automatic,
}

impl StepOwner {
    /// Whether a staff role owns this step.
    pub fn is_role(&self, role: Role) -> bool {
        matches!(
            (self, role),
            (Self::Sales, Role::Sales) | (Self::Admin, Role::Admin)
        )
    }
}

impl std::fmt::Display for StepOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sales => "sales",
            Self::Admin => "admin",
            Self::Automatic => "automatic",
        };
        write!(f, "{s}")
    }
}

/// The party attempting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "role", rename_all = "snake_case")]
pub enum Actor {
    /// Authenticated staff member.
    Staff(Role),
    /// Inbound webhook or public link acting on behalf of the student.
    System,
    /// No identity. Never allowed to transition.
    Anonymous,
}

impl Actor {
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Staff(role) => Some(*role),
            _ => None,
        }
    }
}

impl From<Option<Role>> for Actor {
    fn from(role: Option<Role>) -> Self {
        match role {
            Some(role) => Self::Staff(role),
            None => Self::Anonymous,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staff(role) => write!(f, "{role}"),
            Self::System => write!(f, "system"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for status in OnboardingStatus::ALL {
            let display = format!("{status}");
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(
                format!("\"{display}\""),
                json,
                "Display and serde should match for {status:?}"
            );
        }
    }

    #[test]
    fn parse_every_status() {
        for status in OnboardingStatus::ALL {
            let parsed: OnboardingStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn parse_unknown_status_is_an_error() {
        let err = "class_refused".parse::<OnboardingStatus>().unwrap_err();
        assert_eq!(err, PipelineError::UnknownStatus("class_refused".into()));
        assert!("".parse::<OnboardingStatus>().is_err());
        assert!("Lead_Created".parse::<OnboardingStatus>().is_err());
    }

    #[test]
    fn deserialize_reports_unknown_status() {
        let status: OnboardingStatus = serde_json::from_str("\"class_proposed\"").unwrap();
        assert_eq!(status, OnboardingStatus::ClassProposed);

        let err = serde_json::from_str::<OnboardingStatus>("\"class_refused\"").unwrap_err();
        assert!(err.to_string().contains("class_refused"), "{err}");
        assert!(err.to_string().to_lowercase().contains("unknown"), "{err}");
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" sales ".parse::<Role>().unwrap(), Role::Sales);
        assert!("tutor".parse::<Role>().is_err());
    }

    #[test]
    fn owner_matches_role() {
        assert!(StepOwner::Sales.is_role(Role::Sales));
        assert!(!StepOwner::Sales.is_role(Role::Admin));
        assert!(StepOwner::Admin.is_role(Role::Admin));
        assert!(!StepOwner::Automatic.is_role(Role::Admin));
        assert!(!StepOwner::Automatic.is_role(Role::Sales));
    }

    #[test]
    fn actor_from_identity_role() {
        assert_eq!(Actor::from(Some(Role::Admin)), Actor::Staff(Role::Admin));
        assert_eq!(Actor::from(None), Actor::Anonymous);
        assert_eq!(Actor::System.role(), None);
    }
}
