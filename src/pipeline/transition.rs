//! Transition operator: authorizes and applies status changes.
//!
//! A change is legal when the actor may enter the target step and the
//! target is either the next step or the current step's refusal branch.
//! Re-applying the current status is a no-op success for any identified
//! actor. Anonymous callers are refused before anything else is looked at.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::registry::{StepDefinition, StepRegistry};
use super::status::{Actor, OnboardingStatus, StepOwner};
use crate::documents::ContractTerms;
use crate::error::{Error, PipelineError};
use crate::notify::TestAccess;
use crate::onboarding::{OnboardingRequest, RequestUpdate};
use crate::store::RequestStore;

/// How a transition relates to the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Target equals the current status; nothing written.
    Unchanged,
    /// Target is the next step.
    Advance,
    /// Target is the current step's designated refusal branch.
    Refusal,
}

/// A requested status change plus the fields that accompany it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub target: OnboardingStatus,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Stored as contract request notes when entering `contract_requested`.
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub refusal_reason: Option<String>,
    /// Consumed by orchestration when entering `contract_sent`.
    #[serde(default)]
    pub contract: Option<ContractTerms>,
    /// Placement test login, mailed when entering `test_sent`.
    #[serde(default)]
    pub test_access: Option<TestAccess>,
}

impl StatusChange {
    pub fn to(target: OnboardingStatus) -> Self {
        Self {
            target,
            level: None,
            start_date: None,
            notes: None,
            refusal_reason: None,
            contract: None,
            test_access: None,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_refusal_reason(mut self, reason: impl Into<String>) -> Self {
        self.refusal_reason = Some(reason.into());
        self
    }

    pub fn with_contract(mut self, terms: ContractTerms) -> Self {
        self.contract = Some(terms);
        self
    }

    pub fn with_test_access(mut self, access: TestAccess) -> Self {
        self.test_access = Some(access);
        self
    }
}

/// A validated transition, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan<'r> {
    pub kind: TransitionKind,
    pub from: OnboardingStatus,
    /// Definition of the step the request ends up in.
    pub step: &'r StepDefinition,
    /// Fields to write. Empty for `Unchanged`.
    pub update: RequestUpdate,
}

/// Result of an applied transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub kind: TransitionKind,
    pub previous: OnboardingStatus,
    pub step: StepDefinition,
    pub request: OnboardingRequest,
}

/// Check that `actor` may make a move owned by `owner` into `target`.
fn authorize(
    owner: StepOwner,
    target: OnboardingStatus,
    actor: Actor,
) -> Result<(), PipelineError> {
    let allowed = match (actor, owner) {
        (Actor::Anonymous, _) => false,
        (_, StepOwner::Automatic) => true,
        (Actor::Staff(role), owner) => owner.is_role(role),
        (Actor::System, _) => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(PipelineError::Forbidden { actor, target })
    }
}

/// Validate a status change against the registry without touching storage.
pub fn plan_transition<'r>(
    registry: &'r StepRegistry,
    current: OnboardingStatus,
    change: &StatusChange,
    actor: Actor,
) -> Result<TransitionPlan<'r>, PipelineError> {
    if actor == Actor::Anonymous {
        return Err(PipelineError::Forbidden {
            actor,
            target: change.target,
        });
    }

    if change.target == current {
        return Ok(TransitionPlan {
            kind: TransitionKind::Unchanged,
            from: current,
            step: registry.describe(current)?,
            update: RequestUpdate::default(),
        });
    }

    let target = registry.describe(change.target)?;
    let from = registry.describe(current)?;

    authorize(
        from.owner_of_move_to(target.status, target.owner),
        target.status,
        actor,
    )?;

    let kind = if registry.next_after(current)?.map(|d| d.status) == Some(target.status) {
        TransitionKind::Advance
    } else if registry.refusal_for(current)?.map(|d| d.status) == Some(target.status) {
        TransitionKind::Refusal
    } else {
        return Err(PipelineError::IllegalTransition {
            from: current,
            to: change.target,
        });
    };

    check_fields(kind, current, change)?;

    Ok(TransitionPlan {
        kind,
        from: current,
        step: target,
        update: build_update(kind, current, change),
    })
}

/// Fields some transitions cannot do without.
fn check_fields(
    kind: TransitionKind,
    from: OnboardingStatus,
    change: &StatusChange,
) -> Result<(), PipelineError> {
    use OnboardingStatus::*;

    let missing = |field| PipelineError::MissingField {
        status: change.target,
        field,
    };
    let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());

    match (kind, from, change.target) {
        (_, _, ClassProposed) => {
            if blank(&change.level) {
                return Err(missing("level"));
            }
            if change.start_date.is_none() {
                return Err(missing("start_date"));
            }
        }
        (TransitionKind::Refusal, ClassProposed, _) => {
            if blank(&change.refusal_reason) {
                return Err(missing("refusal_reason"));
            }
        }
        (_, _, ContractSent) => {
            if change.contract.is_none() {
                return Err(missing("contract"));
            }
        }
        _ => {}
    }
    Ok(())
}

fn build_update(
    kind: TransitionKind,
    from: OnboardingStatus,
    change: &StatusChange,
) -> RequestUpdate {
    use OnboardingStatus::*;

    let mut update = RequestUpdate::status(change.target);
    match (kind, from, change.target) {
        (_, _, ClassProposed | ClassConfirmed) => {
            update.level = change.level.clone().filter(|l| !l.trim().is_empty());
            update.start_date = change.start_date;
        }
        (_, _, ContractRequested) => {
            update.contract_request_notes = change.notes.clone();
        }
        _ => {}
    }
    if kind == TransitionKind::Refusal && from == ClassProposed {
        update.group_refused_reason = change.refusal_reason.clone();
    }
    update
}

/// Applies planned transitions through the request store.
///
/// There is no concurrency control: two actors transitioning the same
/// request concurrently race and the last store write wins.
pub struct TransitionOperator {
    registry: Arc<StepRegistry>,
    store: Arc<dyn RequestStore>,
}

impl TransitionOperator {
    pub fn new(registry: Arc<StepRegistry>, store: Arc<dyn RequestStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Validate `change` for `request` and persist it.
    pub async fn transition(
        &self,
        request: &OnboardingRequest,
        change: &StatusChange,
        actor: Actor,
    ) -> Result<TransitionOutcome, Error> {
        let plan = plan_transition(&self.registry, request.status, change, actor)?;

        if plan.kind == TransitionKind::Unchanged {
            debug!(request_id = %request.id, status = %request.status, "Transition is a no-op");
            return Ok(TransitionOutcome {
                kind: plan.kind,
                previous: request.status,
                step: plan.step.clone(),
                request: request.clone(),
            });
        }

        let updated = self.store.update_by_id(request.id, &plan.update).await?;

        info!(
            request_id = %request.id,
            from = %plan.from,
            to = %plan.step.status,
            kind = ?plan.kind,
            actor = %actor,
            "Request transitioned"
        );

        Ok(TransitionOutcome {
            kind: plan.kind,
            previous: plan.from,
            step: plan.step.clone(),
            request: updated,
        })
    }
}
