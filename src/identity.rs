//! Staff identity: who is calling, and with which role.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ConfigError;
use crate::pipeline::{Actor, Role};

/// An authenticated staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffIdentity {
    pub role: Role,
    /// Recorded as `sales_email` on leads this person creates.
    pub email: Option<String>,
}

/// Resolves a bearer token to a staff identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` for a missing or unknown token.
    async fn resolve(&self, bearer: Option<&str>) -> Option<StaffIdentity>;

    /// The actor for a bearer token. Unknown callers are `Anonymous`.
    async fn current_actor(&self, bearer: Option<&str>) -> Actor {
        Actor::from(self.resolve(bearer).await.map(|id| id.role))
    }
}

/// Fixed token table loaded from configuration.
pub struct StaticTokenIdentity {
    tokens: HashMap<String, StaffIdentity>,
}

impl std::fmt::Debug for StaticTokenIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenIdentity")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl StaticTokenIdentity {
    pub fn new(tokens: HashMap<String, StaffIdentity>) -> Self {
        Self { tokens }
    }

    /// Parse `token=role[:email]` entries separated by commas, e.g.
    /// `a1b2=admin:ops@school.test,c3d4=sales:rep@school.test`.
    /// Sales entries must carry an email.
    pub fn parse(table: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "ONBOARDING_STAFF_TOKENS".to_string(),
            message,
        };

        let mut tokens = HashMap::new();
        for entry in table.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, rest) = entry
                .split_once('=')
                .ok_or_else(|| invalid(format!("entry without '=': {entry}")))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid("empty token".to_string()));
            }
            let (role, email) = match rest.split_once(':') {
                Some((role, email)) => (role, Some(email.trim().to_string())),
                None => (rest, None),
            };
            let role: Role = role.parse().map_err(invalid)?;
            let email = email.filter(|e| !e.is_empty());
            if role == Role::Sales && email.is_none() {
                return Err(invalid(format!("sales token '{token}' has no email")));
            }
            if tokens
                .insert(token.to_string(), StaffIdentity { role, email })
                .is_some()
            {
                return Err(invalid("duplicate token".to_string()));
            }
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn resolve(&self, bearer: Option<&str>) -> Option<StaffIdentity> {
        bearer.and_then(|token| self.tokens.get(token.trim()).cloned())
    }
}
