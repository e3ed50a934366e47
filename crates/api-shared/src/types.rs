//! Request and response bodies for the REST API.
//!
//! These are plain wire types; conversion to and from core types happens in `api-rest`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

// ============================================================================
// Prepare / summarise
// ============================================================================

/// Structured clinical note in SOAP form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SoapNote {
    #[serde(default)]
    pub subjective: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreparePaReq {
    pub payer: String,
    pub procedure_code: String,
    pub soap: Option<SoapNote>,
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreparePaRes {
    /// Extracted values keyed by normalised requirement label.
    pub fields: BTreeMap<String, String>,
    pub attachments: Vec<String>,
    /// Requirement labels with no usable value, in rule order.
    pub missing: Vec<String>,
    pub draft: String,
    /// `high`, `medium` or `low` per requirement.
    pub confidence: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SummarizeReq {
    pub text: String,
}

// ============================================================================
// Rules administration
// ============================================================================

/// A complete payer rules document:
/// `{ "payers": { <payer>: { "procedures": { <code>: { name, requirements, attachments } } } } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RulesDocument(#[schema(value_type = Object)] pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RulesRes {
    pub version: u64,
    pub rules: RulesDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplaceRulesRes {
    pub version: u64,
}

// ============================================================================
// Request tracking
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateRequestReq {
    pub payer: String,
    pub procedure_code: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub procedure_name: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    /// Initial status; defaults to `draft`.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RequestRes {
    pub id: String,
    pub payer: String,
    pub specialty: String,
    pub procedure_code: String,
    pub procedure_name: Option<String>,
    pub patient_name: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListRequestsRes {
    pub requests: Vec<RequestRes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddMaterialReq {
    /// `transcript`, `summary`, `draft` or `packet`.
    pub kind: String,
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaterialRes {
    pub id: String,
    pub request_id: String,
    pub kind: String,
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListMaterialsRes {
    pub materials: Vec<MaterialRes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatReq {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CitationRes {
    /// Kind of the material quoted.
    pub source: String,
    pub material_id: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatRes {
    pub answer: String,
    pub citations: Vec<CitationRes>,
}

// ============================================================================
// Organisation settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrgSettingsDoc {
    pub name: String,
    pub retention_days: u32,
    pub baseline_minutes: u32,
    #[serde(default)]
    pub logo_url: Option<String>,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CountRes {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KpiReportRes {
    pub requests_this_week: usize,
    pub total_requests: usize,
    pub pending_requests: usize,
    pub approved_requests: usize,
    pub denied_requests: usize,
    pub avg_turnaround_days: f64,
    pub first_pass_clean_rate: f64,
    pub total_minutes_saved: u64,
    pub requests_by_payer: Vec<CountRes>,
    pub requests_by_procedure: Vec<CountRes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}
