//! Step registry: the validated, ordered table of pipeline steps.
//!
//! Built once at startup (from the built-in table or a JSON data file) and
//! shared read-only afterwards. Construction fails with `InvalidRegistry`
//! unless step numbers are dense from 1 and every refusal branch points at
//! an earlier registered step.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::status::{OnboardingStatus, StepOwner};
use crate::error::{ConfigError, PipelineError};

/// Immutable metadata for one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub status: OnboardingStatus,
    pub step_number: u32,
    pub owner: StepOwner,
    pub description: String,
    /// Earlier status a request may be sent back to from this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<OnboardingStatus>,
    /// Who may take the refusal branch. Falls back to the refusal target's
    /// owner when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal_owner: Option<StepOwner>,
}

impl StepDefinition {
    pub fn new(
        status: OnboardingStatus,
        step_number: u32,
        owner: StepOwner,
        description: impl Into<String>,
    ) -> Self {
        Self {
            status,
            step_number,
            owner,
            description: description.into(),
            refusal: None,
            refusal_owner: None,
        }
    }

    /// Builder: designate the refusal branch out of this step.
    pub fn with_refusal(mut self, target: OnboardingStatus) -> Self {
        self.refusal = Some(target);
        self
    }

    /// Builder: let a different owner take the refusal branch.
    pub fn with_refusal_owner(mut self, owner: StepOwner) -> Self {
        self.refusal_owner = Some(owner);
        self
    }

    /// Owner of the move from this step to `target`, where `target_owner`
    /// is the owner registered for `target` itself.
    pub fn owner_of_move_to(&self, target: OnboardingStatus, target_owner: StepOwner) -> StepOwner {
        match (self.refusal, self.refusal_owner) {
            (Some(refusal), Some(owner)) if refusal == target => owner,
            _ => target_owner,
        }
    }
}

/// Ordered, validated registry of step definitions.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    /// Sorted by step number; index `i` holds step `i + 1`.
    steps: Vec<StepDefinition>,
    by_status: HashMap<OnboardingStatus, usize>,
}

/// Raw data-file entry. Statuses are strings here so an unknown name is
/// reported as `UnknownStatus` instead of a generic parse failure.
#[derive(Debug, Deserialize)]
struct StepEntry {
    status: String,
    step_number: u32,
    owner: StepOwner,
    description: String,
    #[serde(default)]
    refusal: Option<String>,
    #[serde(default)]
    refusal_owner: Option<StepOwner>,
}

impl StepRegistry {
    /// Validate and index a set of step definitions.
    pub fn new(mut defs: Vec<StepDefinition>) -> Result<Self, PipelineError> {
        if defs.is_empty() {
            return Err(PipelineError::InvalidRegistry(
                "registry has no steps".to_string(),
            ));
        }

        defs.sort_by_key(|d| d.step_number);

        let mut by_status = HashMap::with_capacity(defs.len());
        for (idx, def) in defs.iter().enumerate() {
            let expected = idx as u32 + 1;
            if def.step_number != expected {
                let reason = if idx > 0 && defs[idx - 1].step_number == def.step_number {
                    format!(
                        "step {} is used by both {} and {}",
                        def.step_number,
                        defs[idx - 1].status,
                        def.status
                    )
                } else {
                    format!(
                        "expected step {expected}, found {} ({})",
                        def.step_number, def.status
                    )
                };
                return Err(PipelineError::InvalidRegistry(reason));
            }
            if by_status.insert(def.status, idx).is_some() {
                return Err(PipelineError::InvalidRegistry(format!(
                    "status {} is registered twice",
                    def.status
                )));
            }
        }

        for def in &defs {
            if def.refusal.is_none() && def.refusal_owner.is_some() {
                return Err(PipelineError::InvalidRegistry(format!(
                    "{} names a refusal owner but has no refusal target",
                    def.status
                )));
            }
            let Some(target) = def.refusal else { continue };
            let Some(&target_idx) = by_status.get(&target) else {
                return Err(PipelineError::InvalidRegistry(format!(
                    "refusal target {target} of {} is not registered",
                    def.status
                )));
            };
            if defs[target_idx].step_number >= def.step_number {
                return Err(PipelineError::InvalidRegistry(format!(
                    "refusal target {target} of {} must be an earlier step",
                    def.status
                )));
            }
        }

        Ok(Self {
            steps: defs,
            by_status,
        })
    }

    /// The standard eleven-step pipeline.
    pub fn standard() -> Result<Self, PipelineError> {
        use OnboardingStatus::*;
        Self::new(vec![
            StepDefinition::new(
                LeadCreated,
                1,
                StepOwner::Sales,
                "Lead created, placement test not requested yet",
            ),
            StepDefinition::new(
                TestRequested,
                2,
                StepOwner::Sales,
                "Placement test requested, waiting for admin to send it",
            ),
            StepDefinition::new(
                TestSent,
                3,
                StepOwner::Admin,
                "Placement test sent, student is taking it",
            )
            .with_refusal(TestRequested),
            StepDefinition::new(
                TestCompleted,
                4,
                StepOwner::Sales,
                "Test completed, waiting for a class proposal",
            ),
            StepDefinition::new(
                ClassProposed,
                5,
                StepOwner::Sales,
                "Class level and start date proposed to the student",
            )
            .with_refusal(TestCompleted)
            .with_refusal_owner(StepOwner::Automatic),
            StepDefinition::new(
                ClassConfirmed,
                6,
                StepOwner::Automatic,
                "Student accepted the proposed class",
            ),
            StepDefinition::new(
                ContractRequested,
                7,
                StepOwner::Sales,
                "Contract requested with supporting documents",
            ),
            StepDefinition::new(
                ContractSent,
                8,
                StepOwner::Admin,
                "Contract generated and sent to the student",
            )
            .with_refusal(ContractRequested),
            StepDefinition::new(
                ContractSigned,
                9,
                StepOwner::Sales,
                "Signed contract received",
            ),
            StepDefinition::new(Activated, 10, StepOwner::Admin, "Student activated"),
            StepDefinition::new(
                IntroductionConfirmed,
                11,
                StepOwner::Sales,
                "Introduction session confirmed",
            ),
        ])
    }

    /// Build a registry from a JSON array of step entries.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let entries: Vec<StepEntry> = serde_json::from_str(json)
            .map_err(|e| PipelineError::InvalidRegistry(format!("malformed step file: {e}")))?;

        let defs = entries
            .into_iter()
            .map(|entry| {
                let status: OnboardingStatus = entry.status.parse()?;
                let refusal = entry
                    .refusal
                    .as_deref()
                    .map(str::parse::<OnboardingStatus>)
                    .transpose()?;
                Ok(StepDefinition {
                    status,
                    step_number: entry.step_number,
                    owner: entry.owner,
                    description: entry.description,
                    refusal,
                    refusal_owner: entry.refusal_owner,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Self::new(defs)
    }

    /// Read and validate a step data file.
    pub fn load(path: &Path) -> Result<Self, crate::error::Error> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let registry = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), steps = registry.len(), "Step registry loaded");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Metadata for a status.
    pub fn describe(&self, status: OnboardingStatus) -> Result<&StepDefinition, PipelineError> {
        self.by_status
            .get(&status)
            .map(|&idx| &self.steps[idx])
            .ok_or_else(|| PipelineError::UnknownStatus(status.to_string()))
    }

    /// Steps in ascending step-number order. Call again to restart.
    pub fn ordered_steps(&self) -> OrderedSteps<'_> {
        OrderedSteps {
            inner: self.steps.iter(),
        }
    }

    pub fn step_number_for(&self, status: OnboardingStatus) -> Result<u32, PipelineError> {
        self.describe(status).map(|d| d.step_number)
    }

    pub fn status_at_step(&self, step_number: u32) -> Result<OnboardingStatus, PipelineError> {
        self.definition_at(step_number).map(|d| d.status)
    }

    fn definition_at(&self, step_number: u32) -> Result<&StepDefinition, PipelineError> {
        step_number
            .checked_sub(1)
            .and_then(|idx| self.steps.get(idx as usize))
            .ok_or(PipelineError::StepNotFound(step_number))
    }

    /// The step immediately after `status`, or `None` at the last step.
    pub fn next_after(
        &self,
        status: OnboardingStatus,
    ) -> Result<Option<&StepDefinition>, PipelineError> {
        let step = self.step_number_for(status)?;
        Ok(self.steps.get(step as usize))
    }

    /// The designated refusal target out of `status`, if any.
    pub fn refusal_for(
        &self,
        status: OnboardingStatus,
    ) -> Result<Option<&StepDefinition>, PipelineError> {
        match self.describe(status)?.refusal {
            Some(target) => self.describe(target).map(Some),
            None => Ok(None),
        }
    }
}

/// Lazy iterator over a registry's steps, ascending by step number.
#[derive(Debug, Clone)]
pub struct OrderedSteps<'a> {
    inner: std::slice::Iter<'a, StepDefinition>,
}

impl<'a> Iterator for OrderedSteps<'a> {
    type Item = (OnboardingStatus, &'a StepDefinition);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|d| (d.status, d))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for OrderedSteps<'_> {}
