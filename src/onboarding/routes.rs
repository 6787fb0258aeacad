//! REST endpoints for the onboarding pipeline.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::documents::escape_html;
use crate::error::{DatabaseError, Error, PipelineError, StorageError, ValidationError};
use crate::files::UploadFile;
use crate::identity::{IdentityProvider, StaffIdentity};
use crate::pipeline::{Actor, StatusChange, StepDefinition};

use super::manager::OnboardingManager;
use super::model::NewLead;

/// Largest accepted document upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Error body returned by every endpoint: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "A staff bearer token is required")
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::Pipeline(p) => match p {
                PipelineError::Forbidden { .. } => StatusCode::FORBIDDEN,
                PipelineError::IllegalTransition { .. } | PipelineError::WrongStage { .. } => {
                    StatusCode::CONFLICT
                }
                PipelineError::MissingField { .. } => StatusCode::BAD_REQUEST,
                PipelineError::StepNotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::UnknownStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PipelineError::InvalidRegistry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Database(DatabaseError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Validation(_) | Error::Document(_) => StatusCode::BAD_REQUEST,
            Error::Storage(StorageError::InvalidFileName(_)) => StatusCode::BAD_REQUEST,
            Error::Storage(StorageError::Request(_) | StorageError::Provider { .. })
            | Error::Notify(_) => StatusCode::BAD_GATEWAY,
            Error::Database(_) | Error::Storage(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(error = %e, "Request failed");
        }
        Self::new(status, e.to_string())
    }
}

// Extractor rejections keep axum's status (400, 415 or 422) but use the
// same JSON body as every other error.
macro_rules! from_rejection {
    ($($rejection:ty),+) => {
        $(impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                Self::new(rejection.status(), rejection.body_text())
            }
        })+
    };
}

from_rejection!(
    JsonRejection,
    QueryRejection,
    PathRejection,
    FormRejection,
    MultipartRejection
);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/steps", get(list_steps))
        .route("/api/requests", get(list_requests).post(create_request))
        .route("/api/requests/summary", get(summary))
        .route("/api/requests/{id}", get(get_request))
        .route("/api/requests/{id}/transition", post(transition))
        .route(
            "/api/requests/{id}/documents",
            get(list_documents).post(upload_document),
        )
        .route("/api/public/proposals/{id}/accept", get(accept_proposal))
        .route(
            "/api/public/proposals/{id}/reject",
            get(reject_form).post(reject_proposal),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// ── Identity ────────────────────────────────────────────────────────────

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn caller(state: &OnboardingRouteState, headers: &HeaderMap) -> Option<StaffIdentity> {
    state.identity.resolve(bearer(headers)).await
}

async fn actor(state: &OnboardingRouteState, headers: &HeaderMap) -> Actor {
    state.identity.current_actor(bearer(headers)).await
}

/// Reads are open to any staff member.
async fn require_staff(
    state: &OnboardingRouteState,
    headers: &HeaderMap,
) -> ApiResult<StaffIdentity> {
    caller(state, headers).await.ok_or_else(ApiError::unauthorized)
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "onboarding-tracker"
    }))
}

/// GET /api/steps
async fn list_steps(State(state): State<OnboardingRouteState>) -> Json<Vec<StepDefinition>> {
    Json(
        state
            .manager
            .registry()
            .ordered_steps()
            .map(|(_, step)| step.clone())
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct StepQuery {
    step: Option<u32>,
}

/// GET /api/requests[?step=N]
async fn list_requests(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    query: Result<Query<StepQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&state, &headers).await?;
    let Query(query) = query?;
    let requests = match query.step {
        Some(step) => state.manager.by_step(Some(step)).await?,
        None => state.manager.list().await?,
    };
    Ok(Json(requests))
}

/// GET /api/requests/summary
async fn summary(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    require_staff(&state, &headers).await?;
    Ok(Json(state.manager.summary().await?))
}

/// POST /api/requests
///
/// The caller's email becomes the lead's `sales_email`.
async fn create_request(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    lead: Result<Json<NewLead>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(lead) = lead?;
    let identity = caller(&state, &headers).await;
    let actor = Actor::from(identity.as_ref().map(|id| id.role));
    let sales_email = identity.as_ref().and_then(|id| id.email.as_deref());
    let request = state.manager.create_lead(actor, sales_email, lead).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/requests/{id}
async fn get_request(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&state, &headers).await?;
    let Path(id) = id?;
    Ok(Json(state.manager.get(id).await?))
}

/// POST /api/requests/{id}/transition
async fn transition(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
    change: Result<Json<StatusChange>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let actor = actor(&state, &headers).await;
    let Path(id) = id?;
    let Json(change) = change?;
    Ok(Json(state.manager.transition(id, change, actor).await?))
}

/// POST /api/requests/{id}/documents (multipart, field `file`)
async fn upload_document(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let actor = actor(&state, &headers).await;
    let Path(id) = id?;
    let mut multipart = multipart?;

    let bad_body = |e: axum::extract::multipart::MultipartError| {
        ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid multipart body: {e}"))
    };
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(bad_body)?.to_vec();
        file = Some(UploadFile {
            file_name,
            mime_type,
            bytes,
        });
        break;
    }
    let file = file.ok_or_else(|| Error::from(ValidationError::Required { field: "file" }))?;

    let stored = state.manager.upload_document(id, actor, file).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /api/requests/{id}/documents
async fn list_documents(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&state, &headers).await?;
    let Path(id) = id?;
    Ok(Json(state.manager.list_documents(id).await?))
}

#[derive(Debug, Deserialize)]
struct AcceptQuery {
    /// `dd/mm/yyyy`
    start_date: Option<String>,
    level: Option<String>,
}

/// GET /api/public/proposals/{id}/accept
///
/// Target of the link in the level proposal email. No token: the link
/// itself is the credential, and the move is made as the system.
async fn accept_proposal(
    State(state): State<OnboardingRouteState>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AcceptQuery>, QueryRejection>,
) -> ApiResult<Html<String>> {
    let Path(id) = id?;
    let Query(query) = query?;
    let report = state
        .manager
        .accept_proposal(id, query.start_date.as_deref(), query.level)
        .await
        .inspect_err(|e| warn!(request_id = %id, error = %e, "Proposal acceptance failed"))?;

    let request = &report.outcome.request;
    let date = request
        .start_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default();
    Ok(Html(format!(
        "<!DOCTYPE html>\n<html lang=\"es\"><head><meta charset=\"utf-8\">\
         <title>Propuesta aceptada</title></head>\n<body style=\"font-family: Arial, sans-serif;\">\n\
         <h1>¡Gracias, {}!</h1>\n\
         <p>Hemos confirmado tu clase con fecha de inicio {}.</p>\n\
         <p>Tu asesor se pondrá en contacto contigo para los siguientes pasos.</p>\n\
         <p>El equipo de TLC</p>\n</body></html>",
        escape_html(&request.first_name),
        escape_html(&date),
    )))
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    feedback: Option<String>,
}

/// GET /api/public/proposals/{id}/reject
///
/// Feedback form behind the reject link in the level proposal email.
async fn reject_form(id: Result<Path<Uuid>, PathRejection>) -> ApiResult<Html<String>> {
    let Path(id) = id?;
    Ok(Html(format!(
        "<!DOCTYPE html>\n<html lang=\"es\"><head><meta charset=\"utf-8\">\
         <title>Rechazar propuesta</title></head>\n<body style=\"font-family: Arial, sans-serif;\">\n\
         <h1>Rechazar propuesta</h1>\n\
         <p>Cuéntanos por qué la propuesta no te funciona para ofrecerte otra opción.</p>\n\
         <form method=\"post\" action=\"/api/public/proposals/{id}/reject\">\n\
         <textarea name=\"feedback\" rows=\"6\" cols=\"60\" required></textarea><br>\n\
         <button type=\"submit\">Enviar</button>\n\
         </form>\n</body></html>"
    )))
}

/// POST /api/public/proposals/{id}/reject
///
/// Takes `{"feedback": "..."}` as JSON, or the urlencoded feedback form.
/// JSON callers get the transition report back, the form gets a page.
/// Like the accept link, no token is needed and the move is made as the
/// system.
async fn reject_proposal(
    State(state): State<OnboardingRouteState>,
    id: Result<Path<Uuid>, PathRejection>,
    request: Request,
) -> ApiResult<Response> {
    let Path(id) = id?;
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let body = if is_json {
        Json::<RejectBody>::from_request(request, &state).await?.0
    } else {
        Form::<RejectBody>::from_request(request, &state).await?.0
    };

    let report = state
        .manager
        .reject_proposal(id, body.feedback.as_deref())
        .await
        .inspect_err(|e| warn!(request_id = %id, error = %e, "Proposal rejection failed"))?;

    if is_json {
        return Ok(Json(report).into_response());
    }
    Ok(Html(format!(
        "<!DOCTYPE html>\n<html lang=\"es\"><head><meta charset=\"utf-8\">\
         <title>Propuesta rechazada</title></head>\n<body style=\"font-family: Arial, sans-serif;\">\n\
         <h1>Gracias, {}.</h1>\n\
         <p>Hemos recibido tus comentarios. Tu asesor te enviará una nueva propuesta.</p>\n\
         <p>El equipo de TLC</p>\n</body></html>",
        escape_html(&report.outcome.request.first_name),
    ))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: impl Into<Error>) -> StatusCode {
        ApiError::from(e.into()).status
    }

    #[test]
    fn maps_pipeline_errors_to_statuses() {
        use crate::pipeline::{OnboardingStatus::*, Role};

        assert_eq!(
            status_of(PipelineError::Forbidden {
                actor: Actor::Staff(Role::Admin),
                target: ClassProposed
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(PipelineError::IllegalTransition {
                from: LeadCreated,
                to: Activated
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PipelineError::WrongStage {
                expected: ContractRequested,
                actual: TestSent
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PipelineError::MissingField {
                status: ClassProposed,
                field: "level"
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(PipelineError::StepNotFound(42)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(PipelineError::UnknownStatus("archived".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn maps_adapter_errors_to_statuses() {
        assert_eq!(
            status_of(DatabaseError::request_not_found(Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DatabaseError::Query("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(StorageError::Provider {
                status: 401,
                body: "expired".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(crate::error::NotifyError::SendFailed("down".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ValidationError::Required { field: "email" }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn rejections_keep_their_status() {
        let uri: axum::http::Uri = "/api/requests?step=abc".parse().unwrap();
        let rejection = Query::<StepQuery>::try_from_uri(&uri).unwrap_err();
        let err = ApiError::from(rejection);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.to_lowercase().contains("query"), "{}", err.message);

        let rejection =
            serde_json::from_str::<StatusChange>(r#"{"target":"class_refused"}"#).unwrap_err();
        assert!(rejection.to_string().contains("Unknown onboarding status"));
    }

    #[test]
    fn reads_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer s1".parse().unwrap());
        assert_eq!(bearer(&headers), Some("s1"));
        headers.insert(header::AUTHORIZATION, "Basic s1".parse().unwrap());
        assert_eq!(bearer(&headers), None);
    }
}
