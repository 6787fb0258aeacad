//! Dashboard grouping of requests by step.

use serde::Serialize;

use super::registry::{StepDefinition, StepRegistry};
use crate::error::PipelineError;
use crate::onboarding::OnboardingRequest;

/// Requests currently sitting at `step_number`.
///
/// `None` or an unmatched step yields an empty list. A request whose status
/// is not in the registry is an error rather than being dropped.
pub fn requests_at_step<'a>(
    registry: &StepRegistry,
    requests: &'a [OnboardingRequest],
    step_number: Option<u32>,
) -> Result<Vec<&'a OnboardingRequest>, PipelineError> {
    let Some(step_number) = step_number else {
        return Ok(Vec::new());
    };

    let mut matching = Vec::new();
    for request in requests {
        if registry.step_number_for(request.status)? == step_number {
            matching.push(request);
        }
    }
    Ok(matching)
}

/// Request count for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepCount {
    #[serde(flatten)]
    pub step: StepDefinition,
    pub count: usize,
}

/// Count of requests per registered step, ascending, zeros included.
pub fn step_summary(
    registry: &StepRegistry,
    requests: &[OnboardingRequest],
) -> Result<Vec<StepCount>, PipelineError> {
    let mut counts = vec![0usize; registry.len()];
    for request in requests {
        let step = registry.step_number_for(request.status)?;
        counts[(step - 1) as usize] += 1;
    }

    Ok(registry
        .ordered_steps()
        .zip(counts)
        .map(|((_, step), count)| StepCount {
            step: step.clone(),
            count,
        })
        .collect())
}
