//! Onboarding pipeline state machine.
//!
//! A request moves through numbered steps, each owned by a role:
//! 1. `StepRegistry`: validated step table (order, owner, refusal branch)
//! 2. `plan_transition()`: authorization and adjacency, no I/O
//! 3. `TransitionOperator`: persists a planned transition
//! 4. `requests_at_step()` / `step_summary()`: dashboard grouping
//!
//! Notifications and documents are side effects of the caller, never of
//! the state machine.

pub mod query;
pub mod registry;
pub mod status;
pub mod transition;

pub use query::{StepCount, requests_at_step, step_summary};
pub use registry::{OrderedSteps, StepDefinition, StepRegistry};
pub use status::{Actor, OnboardingStatus, Role, StepOwner};
pub use transition::{
    StatusChange, TransitionKind, TransitionOperator, TransitionOutcome, TransitionPlan,
    plan_transition,
};
