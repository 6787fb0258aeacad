//! libSQL backend: async `RequestStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::{OnboardingRequest, RequestUpdate};
use crate::pipeline::OnboardingStatus;
use crate::store::migrations;
use crate::store::traits::RequestStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

/// Column list for request SELECT queries (15 columns).
const REQUEST_COLUMNS: &str = "id, first_name, last_name, email, phone_number, id_number, sales_email, status, level, start_date, lead_remarks, contract_request_notes, group_refused_reason, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| DatabaseError::Serialization(format!("timestamp '{s}': {e}")))
}

fn row_to_request(row: &libsql::Row) -> Result<OnboardingRequest, DatabaseError> {
    let text = |idx: i32, name: &str| -> Result<String, DatabaseError> {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("request.{name}: {e}")))
    };
    // NULL fails `get::<String>`, so it reads as absent.
    let opt_text =
        |idx: i32| -> Option<String> { row.get::<String>(idx).ok().filter(|s| !s.is_empty()) };

    let id_str = text(0, "id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DatabaseError::Serialization(format!("request.id '{id_str}': {e}")))?;

    let status_str = text(7, "status")?;
    let status: OnboardingStatus = status_str
        .parse()
        .map_err(|e| DatabaseError::Serialization(format!("request {id}: {e}")))?;

    let start_date = opt_text(9)
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| {
                DatabaseError::Serialization(format!("request {id} start_date '{s}': {e}"))
            })
        })
        .transpose()?;

    Ok(OnboardingRequest {
        id,
        first_name: text(1, "first_name")?,
        last_name: text(2, "last_name")?,
        email: text(3, "email")?,
        phone_number: opt_text(4).unwrap_or_default(),
        id_number: opt_text(5).unwrap_or_default(),
        sales_email: text(6, "sales_email")?,
        status,
        level: opt_text(8),
        start_date,
        lead_remarks: opt_text(10),
        contract_request_notes: opt_text(11),
        group_refused_reason: opt_text(12),
        created_at: parse_datetime(&text(13, "created_at")?)?,
        updated_at: parse_datetime(&text(14, "updated_at")?)?,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl RequestStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn insert(&self, request: &OnboardingRequest) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "INSERT INTO onboarding_requests ({REQUEST_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                request.id.to_string(),
                request.first_name.as_str(),
                request.last_name.as_str(),
                request.email.as_str(),
                request.phone_number.as_str(),
                request.id_number.as_str(),
                request.sales_email.as_str(),
                request.status.as_str(),
                request.level.as_deref(),
                request.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
                request.lead_remarks.as_deref(),
                request.contract_request_notes.as_deref(),
                request.group_refused_reason.as_deref(),
                request.created_at.to_rfc3339(),
                request.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert_request: {e}")))?;
        debug!(request_id = %request.id, status = %request.status, "Request inserted");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<OnboardingRequest>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {REQUEST_COLUMNS} FROM onboarding_requests ORDER BY created_at DESC, id ASC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_requests: {e}")))?;

        let mut requests = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_requests row: {e}")))?
        {
            requests.push(row_to_request(&row)?);
        }
        Ok(requests)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<OnboardingRequest, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {REQUEST_COLUMNS} FROM onboarding_requests WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_request: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_request(&row),
            Ok(None) => Err(DatabaseError::request_not_found(id)),
            Err(e) => Err(DatabaseError::Query(format!("get_request row: {e}"))),
        }
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        update: &RequestUpdate,
    ) -> Result<OnboardingRequest, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        let count = conn
            .execute(
                "UPDATE onboarding_requests SET
                    status = COALESCE(?1, status),
                    level = COALESCE(?2, level),
                    start_date = COALESCE(?3, start_date),
                    contract_request_notes = COALESCE(?4, contract_request_notes),
                    group_refused_reason = COALESCE(?5, group_refused_reason),
                    updated_at = ?6
                 WHERE id = ?7",
                params![
                    update.status.map(|s| s.as_str()),
                    update.level.as_deref(),
                    update.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    update.contract_request_notes.as_deref(),
                    update.group_refused_reason.as_deref(),
                    now,
                    id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_request: {e}")))?;

        if count == 0 {
            return Err(DatabaseError::request_not_found(id));
        }
        debug!(request_id = %id, status = ?update.status, "Request updated");

        self.get_by_id(id).await
    }
}
