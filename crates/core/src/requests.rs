//! Prior-authorization request tracking.
//!
//! Requests move through a small lifecycle:
//!
//! ```text
//! draft ──> pending ──> approved
//!   │          ├──────> denied
//!   └──────────┴──────> cancelled
//! ```
//!
//! `approved`, `denied` and `cancelled` are terminal. Every status change is recorded as an
//! [`AuditEntry`]. Materials (transcripts, summaries, drafts, packets) can be attached to a
//! request and are returned oldest first.
//!
//! Durable storage is an external concern; [`RequestRepository`] is the seam and
//! [`InMemoryRequestRepository`] the bundled implementation.

use crate::chat::{answer_question, ChatAnswer};
use crate::constants::DEFAULT_SPECIALTY;
use crate::{PaError, PaResult};
use chrono::{DateTime, Utc};
use pa_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

// ============================================================================
// Domain types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Draft,
    Pending,
    Approved,
    Denied,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::Denied | RequestStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is allowed. Staying put is always allowed.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;

        self == next
            || matches!(
                (self, next),
                (Draft, Pending)
                    | (Draft, Cancelled)
                    | (Pending, Approved)
                    | (Pending, Denied)
                    | (Pending, Cancelled)
            )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = PaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(RequestStatus::Draft),
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "denied" => Ok(RequestStatus::Denied),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(PaError::MalformedInput(format!("unknown status: {other}"))),
        }
    }
}

/// A tracked prior-authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaRequest {
    pub id: Uuid,
    pub payer: NonEmptyText,
    pub specialty: NonEmptyText,
    pub procedure_code: NonEmptyText,
    pub procedure_name: Option<String>,
    pub patient_name: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRequest {
    pub payer: String,
    pub procedure_code: String,
    pub specialty: Option<String>,
    pub procedure_name: Option<String>,
    pub patient_name: Option<String>,
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Transcript,
    Summary,
    Draft,
    Packet,
}

impl MaterialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Transcript => "transcript",
            MaterialKind::Summary => "summary",
            MaterialKind::Draft => "draft",
            MaterialKind::Packet => "packet",
        }
    }
}

impl FromStr for MaterialKind {
    type Err = PaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transcript" => Ok(MaterialKind::Transcript),
            "summary" => Ok(MaterialKind::Summary),
            "draft" => Ok(MaterialKind::Draft),
            "packet" => Ok(MaterialKind::Packet),
            other => Err(PaError::MalformedInput(format!(
                "unknown material kind: {other}"
            ))),
        }
    }
}

/// Content produced while working a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub id: Uuid,
    pub request_id: Uuid,
    pub kind: MaterialKind,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub request_id: Uuid,
    pub action: String,
    pub old_status: Option<RequestStatus>,
    pub new_status: Option<RequestStatus>,
    pub at: DateTime<Utc>,
}

// ============================================================================
// Repository
// ============================================================================

/// Storage seam for requests, materials and audit entries.
pub trait RequestRepository: Send + Sync {
    fn insert(&self, request: PaRequest) -> PaResult<()>;
    fn get(&self, id: Uuid) -> PaResult<PaRequest>;
    fn update(&self, request: PaRequest) -> PaResult<()>;
    /// All requests, newest first.
    fn list(&self) -> PaResult<Vec<PaRequest>>;
    fn add_material(&self, material: Material) -> PaResult<()>;
    /// Materials for one request, oldest first.
    fn materials(&self, request_id: Uuid) -> PaResult<Vec<Material>>;
    fn record_audit(&self, entry: AuditEntry) -> PaResult<()>;
    fn audit_log(&self, request_id: Uuid) -> PaResult<Vec<AuditEntry>>;
}

#[derive(Default, Debug)]
struct MemoryTables {
    requests: HashMap<Uuid, PaRequest>,
    materials: Vec<Material>,
    audit: Vec<AuditEntry>,
}

/// Process-local repository. Contents are lost on restart.
#[derive(Default, Debug)]
pub struct InMemoryRequestRepository {
    tables: RwLock<MemoryTables>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryTables> {
        self.tables.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryTables> {
        self.tables.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl RequestRepository for InMemoryRequestRepository {
    fn insert(&self, request: PaRequest) -> PaResult<()> {
        self.write().requests.insert(request.id, request);
        Ok(())
    }

    fn get(&self, id: Uuid) -> PaResult<PaRequest> {
        self.read()
            .requests
            .get(&id)
            .cloned()
            .ok_or(PaError::RequestNotFound(id))
    }

    fn update(&self, request: PaRequest) -> PaResult<()> {
        let mut tables = self.write();
        match tables.requests.get_mut(&request.id) {
            Some(slot) => {
                *slot = request;
                Ok(())
            }
            None => Err(PaError::RequestNotFound(request.id)),
        }
    }

    fn list(&self) -> PaResult<Vec<PaRequest>> {
        let mut requests: Vec<PaRequest> = self.read().requests.values().cloned().collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    fn add_material(&self, material: Material) -> PaResult<()> {
        let mut tables = self.write();
        if !tables.requests.contains_key(&material.request_id) {
            return Err(PaError::RequestNotFound(material.request_id));
        }
        tables.materials.push(material);
        Ok(())
    }

    fn materials(&self, request_id: Uuid) -> PaResult<Vec<Material>> {
        let tables = self.read();
        if !tables.requests.contains_key(&request_id) {
            return Err(PaError::RequestNotFound(request_id));
        }
        let mut materials: Vec<Material> = tables
            .materials
            .iter()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect();
        materials.sort_by_key(|m| m.created_at);
        Ok(materials)
    }

    fn record_audit(&self, entry: AuditEntry) -> PaResult<()> {
        self.write().audit.push(entry);
        Ok(())
    }

    fn audit_log(&self, request_id: Uuid) -> PaResult<Vec<AuditEntry>> {
        Ok(self
            .read()
            .audit
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Request lifecycle operations over a [`RequestRepository`].
#[derive(Clone)]
pub struct RequestService {
    repo: Arc<dyn RequestRepository>,
}

impl RequestService {
    pub fn new(repo: Arc<dyn RequestRepository>) -> Self {
        Self { repo }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRequestRepository::new()))
    }

    /// Create a request. Status defaults to `draft` and specialty to orthopedics.
    ///
    /// # Errors
    ///
    /// Returns [`PaError::MalformedInput`] if the payer or procedure code is blank.
    pub fn create(&self, new: NewRequest) -> PaResult<PaRequest> {
        let payer = NonEmptyText::new(&new.payer)
            .map_err(|_| PaError::MalformedInput("payer is required".into()))?;
        let procedure_code = NonEmptyText::new(&new.procedure_code)
            .map_err(|_| PaError::MalformedInput("procedure_code is required".into()))?;
        let specialty = match new.specialty.as_deref().map(NonEmptyText::new) {
            Some(Ok(specialty)) => specialty,
            _ => NonEmptyText::new(DEFAULT_SPECIALTY)
                .map_err(|_| PaError::InvalidConfig("default specialty is blank".into()))?,
        };

        let now = Utc::now();
        let request = PaRequest {
            id: Uuid::new_v4(),
            payer,
            specialty,
            procedure_code,
            procedure_name: non_blank(new.procedure_name),
            patient_name: non_blank(new.patient_name),
            status: new.status.unwrap_or(RequestStatus::Draft),
            created_at: now,
            updated_at: now,
        };

        self.repo.insert(request.clone())?;
        self.repo.record_audit(AuditEntry {
            request_id: request.id,
            action: "created".into(),
            old_status: None,
            new_status: Some(request.status),
            at: now,
        })?;

        tracing::info!("created request {} ({})", request.id, request.status);
        Ok(request)
    }

    pub fn get(&self, id: Uuid) -> PaResult<PaRequest> {
        self.repo.get(id)
    }

    pub fn list(&self) -> PaResult<Vec<PaRequest>> {
        self.repo.list()
    }

    /// Move a request to `next`.
    ///
    /// # Errors
    ///
    /// - [`PaError::RequestNotFound`] if the id is unknown.
    /// - [`PaError::InvalidTransition`] if the lifecycle forbids the move.
    pub fn update_status(&self, id: Uuid, next: RequestStatus) -> PaResult<PaRequest> {
        let mut request = self.repo.get(id)?;
        let previous = request.status;

        if previous == next {
            return Ok(request);
        }
        if !previous.can_transition_to(next) {
            return Err(PaError::InvalidTransition {
                from: previous,
                to: next,
            });
        }

        let now = Utc::now();
        request.status = next;
        request.updated_at = now;
        self.repo.update(request.clone())?;
        self.repo.record_audit(AuditEntry {
            request_id: id,
            action: "status_changed".into(),
            old_status: Some(previous),
            new_status: Some(next),
            at: now,
        })?;

        tracing::info!("request {} moved {} -> {}", id, previous, next);
        Ok(request)
    }

    pub fn add_material(
        &self,
        request_id: Uuid,
        kind: MaterialKind,
        content: serde_json::Value,
    ) -> PaResult<Material> {
        let material = Material {
            id: Uuid::new_v4(),
            request_id,
            kind,
            content,
            created_at: Utc::now(),
        };
        self.repo.add_material(material.clone())?;
        Ok(material)
    }

    pub fn materials(&self, request_id: Uuid) -> PaResult<Vec<Material>> {
        self.repo.materials(request_id)
    }

    pub fn audit_log(&self, request_id: Uuid) -> PaResult<Vec<AuditEntry>> {
        self.repo.audit_log(request_id)
    }

    /// Answer a question from the request's materials, oldest first.
    pub fn answer(&self, request_id: Uuid, question: &str) -> PaResult<ChatAnswer> {
        let materials = self.repo.materials(request_id)?;
        answer_question(question, &materials)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
