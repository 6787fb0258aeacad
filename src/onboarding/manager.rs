//! OnboardingManager: drives requests through the pipeline and runs the
//! side effects tied to entering a step.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::DocumentGenerator;
use crate::error::{PipelineError, Result, ValidationError};
use crate::files::{FileStore, StoredFile, UploadFile};
use crate::notify::{EmailTemplate, Notifier};
use crate::pipeline::{
    Actor, OnboardingStatus, Role, StatusChange, StepCount, StepRegistry, TransitionKind,
    TransitionOperator, TransitionOutcome, plan_transition, requests_at_step, step_summary,
};
use crate::store::RequestStore;

use super::model::{NewLead, OnboardingRequest};

/// What happened to the email tied to a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationResult {
    /// The target step sends no email, or nothing changed.
    NotRequired,
    Sent { template: String },
    /// The transition is committed; only the email failed.
    Failed { template: String, error: String },
}

/// A committed transition plus its notification outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionReport {
    #[serde(flatten)]
    pub outcome: TransitionOutcome,
    pub notification: NotificationResult,
}

/// Collaborators the manager drives.
pub struct ManagerDeps {
    pub registry: Arc<StepRegistry>,
    pub store: Arc<dyn RequestStore>,
    pub notifier: Arc<dyn Notifier>,
    pub documents: Arc<dyn DocumentGenerator>,
    pub files: Arc<dyn FileStore>,
    /// Public URL used in student-facing links.
    pub base_url: String,
}

/// Coordinates onboarding requests across the state machine and adapters.
pub struct OnboardingManager {
    registry: Arc<StepRegistry>,
    store: Arc<dyn RequestStore>,
    operator: TransitionOperator,
    notifier: Arc<dyn Notifier>,
    documents: Arc<dyn DocumentGenerator>,
    files: Arc<dyn FileStore>,
    base_url: String,
}

impl OnboardingManager {
    pub fn new(deps: ManagerDeps) -> Self {
        Self {
            operator: TransitionOperator::new(Arc::clone(&deps.registry), Arc::clone(&deps.store)),
            registry: deps.registry,
            store: deps.store,
            notifier: deps.notifier,
            documents: deps.documents,
            files: deps.files,
            base_url: deps.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Create a lead. Only sales may do this, and the rep's email is kept
    /// so the student has someone to reply to.
    pub async fn create_lead(
        &self,
        actor: Actor,
        sales_email: Option<&str>,
        lead: NewLead,
    ) -> Result<OnboardingRequest> {
        let initial = lead.initial_status();
        if actor != Actor::Staff(Role::Sales) {
            return Err(PipelineError::Forbidden {
                actor,
                target: initial,
            }
            .into());
        }
        let sales_email = sales_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ValidationError::Required {
                field: "sales_email",
            })?;
        lead.validate()?;
        self.registry.describe(initial)?;

        let request = lead.into_request(sales_email);
        self.store.insert(&request).await?;
        info!(
            request_id = %request.id,
            status = %request.status,
            sales = %request.sales_email,
            "Lead created"
        );
        Ok(request)
    }

    pub async fn list(&self) -> Result<Vec<OnboardingRequest>> {
        Ok(self.store.list_all().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<OnboardingRequest> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Requests at `step_number`, from a fresh snapshot.
    pub async fn by_step(&self, step_number: Option<u32>) -> Result<Vec<OnboardingRequest>> {
        let snapshot = self.store.list_all().await?;
        let matching = requests_at_step(&self.registry, &snapshot, step_number)?;
        Ok(matching.into_iter().cloned().collect())
    }

    /// Per-step counts for the dashboard.
    pub async fn summary(&self) -> Result<Vec<StepCount>> {
        let snapshot = self.store.list_all().await?;
        Ok(step_summary(&self.registry, &snapshot)?)
    }

    /// Move a request and run the side effects of the step it enters.
    ///
    /// There is no concurrency control: concurrent transitions of one
    /// request race and the last store write wins.
    pub async fn transition(
        &self,
        id: Uuid,
        change: StatusChange,
        actor: Actor,
    ) -> Result<TransitionReport> {
        let request = self.store.get_by_id(id).await?;

        // Render before committing so a bad contract never leaves the
        // request at contract_sent without a document.
        let contract = match (&change.contract, change.target) {
            (Some(terms), OnboardingStatus::ContractSent) => {
                let plan = plan_transition(&self.registry, request.status, &change, actor)?;
                if plan.kind == TransitionKind::Unchanged {
                    None
                } else {
                    Some(self.documents.render_contract(&request, terms)?)
                }
            }
            _ => None,
        };

        let outcome = self.operator.transition(&request, &change, actor).await?;
        if outcome.kind == TransitionKind::Unchanged {
            return Ok(TransitionReport {
                outcome,
                notification: NotificationResult::NotRequired,
            });
        }

        let updated = &outcome.request;
        let template = match outcome.step.status {
            OnboardingStatus::TestSent => Some(EmailTemplate::TestInvitation {
                request: updated,
                access: change.test_access.as_ref(),
            }),
            OnboardingStatus::ClassProposed => match (updated.level.as_deref(), updated.start_date)
            {
                (Some(level), Some(start_date)) => Some(EmailTemplate::LevelProposal {
                    request: updated,
                    level,
                    start_date,
                    base_url: &self.base_url,
                    notes: change.notes.as_deref(),
                }),
                _ => None,
            },
            OnboardingStatus::ContractSent => contract.map(|document| EmailTemplate::Contract {
                request: updated,
                document,
            }),
            _ => None,
        };

        let notification = match template {
            Some(template) => self.notify(updated.id, template).await,
            None => NotificationResult::NotRequired,
        };

        Ok(TransitionReport {
            outcome,
            notification,
        })
    }

    async fn notify(&self, request_id: Uuid, template: EmailTemplate<'_>) -> NotificationResult {
        let name = template.name().to_string();
        match self.notifier.send(template.render()).await {
            Ok(()) => {
                info!(request_id = %request_id, template = %name, "Notification sent");
                NotificationResult::Sent { template: name }
            }
            Err(e) => {
                warn!(request_id = %request_id, template = %name, error = %e, "Notification failed");
                NotificationResult::Failed {
                    template: name,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Student accepted a class proposal through the public link.
    ///
    /// `start_date` is `dd/mm/yyyy`.
    pub async fn accept_proposal(
        &self,
        id: Uuid,
        start_date: Option<&str>,
        level: Option<String>,
    ) -> Result<TransitionReport> {
        let raw = start_date
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::Required {
                field: "start_date",
            })?;
        let date = NaiveDate::parse_from_str(raw, "%d/%m/%Y").map_err(|e| {
            ValidationError::Invalid {
                field: "start_date",
                reason: format!("'{raw}' is not dd/mm/yyyy: {e}"),
            }
        })?;

        let mut change = StatusChange::to(OnboardingStatus::ClassConfirmed).with_start_date(date);
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            change = change.with_level(level);
        }
        self.transition(id, change, Actor::System).await
    }

    /// Student declined a class proposal through the public link.
    ///
    /// The request goes back to `test_completed` with the feedback kept as
    /// the refusal reason.
    pub async fn reject_proposal(
        &self,
        id: Uuid,
        feedback: Option<&str>,
    ) -> Result<TransitionReport> {
        let feedback = feedback
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or(ValidationError::Required { field: "feedback" })?;
        let change =
            StatusChange::to(OnboardingStatus::TestCompleted).with_refusal_reason(feedback);
        let report = self.transition(id, change, Actor::System).await?;
        if report.outcome.kind == TransitionKind::Refusal {
            info!(request_id = %id, "Class proposal declined by the student");
        }
        Ok(report)
    }

    /// Store a supporting document in the request's folder.
    ///
    /// Sales only, and only while the request is at `contract_requested`.
    pub async fn upload_document(
        &self,
        id: Uuid,
        actor: Actor,
        file: UploadFile,
    ) -> Result<StoredFile> {
        if actor != Actor::Staff(Role::Sales) {
            return Err(PipelineError::Forbidden {
                actor,
                target: OnboardingStatus::ContractRequested,
            }
            .into());
        }

        let request = self.store.get_by_id(id).await?;
        if request.status != OnboardingStatus::ContractRequested {
            return Err(PipelineError::WrongStage {
                expected: OnboardingStatus::ContractRequested,
                actual: request.status,
            }
            .into());
        }
        file.validate_name()?;

        let folder = self.files.ensure_folder(&request.folder_name()).await?;
        let stored = self.files.upload(&folder, file).await?;
        info!(request_id = %id, file = %stored.name, "Document uploaded");
        Ok(stored)
    }

    pub async fn list_documents(&self, id: Uuid) -> Result<Vec<StoredFile>> {
        let request = self.store.get_by_id(id).await?;
        let folder = self.files.ensure_folder(&request.folder_name()).await?;
        Ok(self.files.list(&folder).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::documents::HtmlContractGenerator;
    use crate::documents::tests::sample_terms;
    use crate::error::{Error, NotifyError, StorageError};
    use crate::files::LocalFileStore;
    use crate::notify::{OutgoingEmail, TestAccess};
    use crate::store::LibSqlBackend;
    use OnboardingStatus::*;

    const SALES: Actor = Actor::Staff(Role::Sales);
    const ADMIN: Actor = Actor::Staff(Role::Admin);

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, email: OutgoingEmail) -> std::result::Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::SendFailed("relay down".to_string()));
            }
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }

    struct Harness {
        manager: OnboardingManager,
        notifier: Arc<RecordingNotifier>,
        _dir: tempfile::TempDir,
    }

    async fn harness_with(notifier: RecordingNotifier) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(notifier);
        let manager = OnboardingManager::new(ManagerDeps {
            registry: Arc::new(StepRegistry::standard().unwrap()),
            store: Arc::new(LibSqlBackend::new_memory().await.unwrap()),
            notifier: Arc::clone(&notifier) as Arc<dyn Notifier>,
            documents: Arc::new(HtmlContractGenerator::default()),
            files: Arc::new(LocalFileStore::new(dir.path())),
            base_url: "https://tracker.test/".to_string(),
        });
        Harness {
            manager,
            notifier,
            _dir: dir,
        }
    }

    async fn harness() -> Harness {
        harness_with(RecordingNotifier::default()).await
    }

    fn lead() -> NewLead {
        NewLead {
            first_name: "Ana".to_string(),
            last_name: "Gomez".to_string(),
            email: "ana@example.com".to_string(),
            phone_number: "3001234567".to_string(),
            id_number: "1020304050".to_string(),
            ..Default::default()
        }
    }

    fn nov_2() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
    }

    async fn lead_at(h: &Harness, status: OnboardingStatus) -> OnboardingRequest {
        let request = h
            .manager
            .create_lead(SALES, Some("rep@school.test"), lead())
            .await
            .unwrap();
        if status == LeadCreated {
            return request;
        }
        h.manager
            .store
            .update_by_id(request.id, &crate::onboarding::RequestUpdate::status(status))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn only_sales_creates_leads() {
        let h = harness().await;
        let request = h
            .manager
            .create_lead(SALES, Some("rep@school.test"), lead())
            .await
            .unwrap();
        assert_eq!(request.status, LeadCreated);
        assert_eq!(request.sales_email, "rep@school.test");

        for actor in [ADMIN, Actor::System, Actor::Anonymous] {
            let err = h.manager.create_lead(actor, None, lead()).await.unwrap_err();
            assert!(matches!(err, Error::Pipeline(PipelineError::Forbidden { .. })));
        }
        assert_eq!(h.manager.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lead_needs_a_sales_email() {
        let h = harness().await;
        for email in [None, Some(""), Some("   ")] {
            let err = h.manager.create_lead(SALES, email, lead()).await.unwrap_err();
            assert!(matches!(
                err,
                Error::Validation(ValidationError::Required {
                    field: "sales_email"
                })
            ));
        }
        assert!(h.manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skipped_test_lands_at_test_completed() {
        let h = harness().await;
        let request = h
            .manager
            .create_lead(
                SALES,
                Some("rep@school.test"),
                NewLead {
                    skip_test: true,
                    level: Some("C1".to_string()),
                    ..lead()
                },
            )
            .await
            .unwrap();
        assert_eq!(request.status, TestCompleted);
        assert_eq!(h.manager.by_step(Some(4)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_lead_is_rejected() {
        let h = harness().await;
        let err = h
            .manager
            .create_lead(
                SALES,
                Some("rep@school.test"),
                NewLead {
                    email: "nope".to_string(),
                    ..lead()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(h.manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_pipeline_sends_three_emails() {
        let h = harness().await;
        let id = lead_at(&h, LeadCreated).await.id;
        let m = &h.manager;

        let steps = [
            (StatusChange::to(TestRequested), SALES),
            (
                StatusChange::to(TestSent).with_test_access(TestAccess {
                    link: "https://quiz.test".to_string(),
                    username: "ana".to_string(),
                    password: "pw".to_string(),
                }),
                ADMIN,
            ),
            (StatusChange::to(TestCompleted), SALES),
            (
                StatusChange::to(ClassProposed)
                    .with_level("B1")
                    .with_start_date(nov_2()),
                SALES,
            ),
            (StatusChange::to(ClassConfirmed), Actor::System),
            (
                StatusChange::to(ContractRequested).with_notes("Two installments"),
                SALES,
            ),
            (
                StatusChange::to(ContractSent).with_contract(sample_terms()),
                ADMIN,
            ),
            (StatusChange::to(ContractSigned), SALES),
            (StatusChange::to(Activated), ADMIN),
            (StatusChange::to(IntroductionConfirmed), SALES),
        ];
        for (change, actor) in steps {
            let target = change.target;
            let report = m.transition(id, change, actor).await.unwrap();
            assert_eq!(report.outcome.kind, TransitionKind::Advance, "into {target}");
            assert_eq!(report.outcome.request.status, target);
        }

        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].html_body.contains("https://quiz.test"));
        assert!(sent[1].html_body.contains(&format!(
            "https://tracker.test/api/public/proposals/{id}/accept?start_date=02%2F11%2F2026"
        )));
        assert_eq!(sent[2].attachments.len(), 1);
        assert_eq!(sent[2].attachments[0].mime_type, "text/html");

        let done = m.get(id).await.unwrap();
        assert_eq!(done.status, IntroductionConfirmed);
        assert_eq!(done.contract_request_notes.as_deref(), Some("Two installments"));
        assert_eq!(done.level.as_deref(), Some("B1"));
    }

    #[tokio::test]
    async fn notifier_failure_is_reported_not_rolled_back() {
        let h = harness_with(RecordingNotifier {
            fail: true,
            ..Default::default()
        })
        .await;
        let id = lead_at(&h, TestRequested).await.id;

        let report = h
            .manager
            .transition(id, StatusChange::to(TestSent), ADMIN)
            .await
            .unwrap();
        assert_eq!(
            report.notification,
            NotificationResult::Failed {
                template: "test_invitation".to_string(),
                error: "SMTP send failed: relay down".to_string(),
            }
        );
        assert_eq!(h.manager.get(id).await.unwrap().status, TestSent);
    }

    #[tokio::test]
    async fn bad_contract_terms_block_the_transition() {
        let h = harness().await;
        let id = lead_at(&h, ContractRequested).await.id;

        let mut terms = sample_terms();
        terms.schedule.clear();
        let err = h
            .manager
            .transition(id, StatusChange::to(ContractSent).with_contract(terms), ADMIN)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Document(_)));
        assert_eq!(h.manager.get(id).await.unwrap().status, ContractRequested);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn forbidden_contract_is_not_rendered() {
        let h = harness().await;
        let id = lead_at(&h, ContractRequested).await.id;
        let err = h
            .manager
            .transition(
                id,
                StatusChange::to(ContractSent).with_contract(sample_terms()),
                SALES,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Pipeline(PipelineError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn unchanged_transition_sends_nothing() {
        let h = harness().await;
        let id = lead_at(&h, TestSent).await.id;
        let report = h
            .manager
            .transition(id, StatusChange::to(TestSent), ADMIN)
            .await
            .unwrap();
        assert_eq!(report.outcome.kind, TransitionKind::Unchanged);
        assert_eq!(report.notification, NotificationResult::NotRequired);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn declined_proposal_goes_back_with_reason() {
        let h = harness().await;
        let id = lead_at(&h, ClassProposed).await.id;
        let report = h
            .manager
            .transition(
                id,
                StatusChange::to(TestCompleted).with_refusal_reason("Evening group only"),
                SALES,
            )
            .await
            .unwrap();
        assert_eq!(report.outcome.kind, TransitionKind::Refusal);
        assert_eq!(
            report.outcome.request.group_refused_reason.as_deref(),
            Some("Evening group only")
        );
    }

    #[tokio::test]
    async fn accept_link_confirms_class() {
        let h = harness().await;
        let id = lead_at(&h, ClassProposed).await.id;

        let report = h
            .manager
            .accept_proposal(id, Some("02/11/2026"), None)
            .await
            .unwrap();
        assert_eq!(report.outcome.request.status, ClassConfirmed);
        assert_eq!(report.outcome.request.start_date, Some(nov_2()));

        // Clicking again is harmless
        let again = h
            .manager
            .accept_proposal(id, Some("02/11/2026"), None)
            .await
            .unwrap();
        assert_eq!(again.outcome.kind, TransitionKind::Unchanged);
    }

    #[tokio::test]
    async fn accept_link_validates_date_and_stage() {
        let h = harness().await;
        let id = lead_at(&h, ClassProposed).await.id;

        assert!(matches!(
            h.manager.accept_proposal(id, None, None).await,
            Err(Error::Validation(ValidationError::Required { .. }))
        ));
        assert!(matches!(
            h.manager.accept_proposal(id, Some("2026-11-02"), None).await,
            Err(Error::Validation(ValidationError::Invalid { .. }))
        ));

        let early = lead_at(&h, TestSent).await.id;
        assert!(matches!(
            h.manager.accept_proposal(early, Some("02/11/2026"), None).await,
            Err(Error::Pipeline(PipelineError::IllegalTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn reject_link_sends_the_request_back() {
        let h = harness().await;
        let id = lead_at(&h, ClassProposed).await.id;

        let report = h
            .manager
            .reject_proposal(id, Some("  Mornings do not work for me  "))
            .await
            .unwrap();
        assert_eq!(report.outcome.kind, TransitionKind::Refusal);
        assert_eq!(report.outcome.request.status, TestCompleted);
        assert_eq!(
            report.outcome.request.group_refused_reason.as_deref(),
            Some("Mornings do not work for me")
        );
        assert_eq!(report.notification, NotificationResult::NotRequired);
    }

    #[tokio::test]
    async fn reject_link_needs_feedback_and_a_proposal() {
        let h = harness().await;
        let id = lead_at(&h, ClassProposed).await.id;
        for feedback in [None, Some(""), Some(" \n ")] {
            assert!(matches!(
                h.manager.reject_proposal(id, feedback).await,
                Err(Error::Validation(ValidationError::Required { field: "feedback" }))
            ));
        }
        assert_eq!(h.manager.get(id).await.unwrap().status, ClassProposed);

        let confirmed = lead_at(&h, ClassConfirmed).await.id;
        assert!(matches!(
            h.manager.reject_proposal(confirmed, Some("Changed my mind")).await,
            Err(Error::Pipeline(PipelineError::IllegalTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn uploads_work_for_names_with_slashes() {
        let h = harness().await;
        let request = h
            .manager
            .create_lead(
                SALES,
                Some("rep@school.test"),
                NewLead {
                    first_name: "Ana/Maria".to_string(),
                    ..lead()
                },
            )
            .await
            .unwrap();
        h.manager
            .store
            .update_by_id(request.id, &crate::onboarding::RequestUpdate::status(ContractRequested))
            .await
            .unwrap();

        let stored = h.manager.upload_document(request.id, SALES, pdf()).await.unwrap();
        assert_eq!(stored.name, "cedula.pdf");
        assert_eq!(h.manager.list_documents(request.id).await.unwrap().len(), 1);
    }

    fn pdf() -> UploadFile {
        UploadFile {
            file_name: "cedula.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4".to_vec(),
        }
    }

    #[tokio::test]
    async fn uploads_only_at_contract_requested() {
        let h = harness().await;
        let early = lead_at(&h, ClassConfirmed).await.id;
        let err = h.manager.upload_document(early, SALES, pdf()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Pipeline(PipelineError::WrongStage {
                expected: ContractRequested,
                actual: ClassConfirmed
            })
        ));

        let ready = lead_at(&h, ContractRequested).await.id;
        let err = h.manager.upload_document(ready, ADMIN, pdf()).await.unwrap_err();
        assert!(matches!(err, Error::Pipeline(PipelineError::Forbidden { .. })));

        let stored = h.manager.upload_document(ready, SALES, pdf()).await.unwrap();
        assert_eq!(stored.name, "cedula.pdf");
        let docs = h.manager.list_documents(ready).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn bad_file_name_is_rejected() {
        let h = harness().await;
        let id = lead_at(&h, ContractRequested).await.id;
        let mut file = pdf();
        file.file_name = "../escape.pdf".to_string();
        let err = h.manager.upload_document(id, SALES, file).await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::InvalidFileName(_))));
    }

    #[tokio::test]
    async fn summary_counts_every_step() {
        let h = harness().await;
        lead_at(&h, LeadCreated).await;
        lead_at(&h, TestCompleted).await;
        lead_at(&h, TestCompleted).await;

        let summary = h.manager.summary().await.unwrap();
        assert_eq!(summary.len(), 11);
        assert_eq!(summary[0].count, 1);
        assert_eq!(summary[3].count, 2);
        assert!(h.manager.by_step(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let h = harness().await;
        let err = h
            .manager
            .transition(Uuid::new_v4(), StatusChange::to(TestSent), ADMIN)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Database(crate::error::DatabaseError::NotFound { .. })
        ));
    }
}
