//! # PA Core
//!
//! Core business logic for prior-authorization drafting.
//!
//! This crate contains pure data operations:
//! - Payer rule sets, their validation, and a versioned in-process rule store
//! - The prepare pipeline (field extraction, confidence scoring, missing-field detection and
//!   draft composition)
//! - SOAP text parsing behind a [`Summariser`] seam
//! - Request tracking with an audit trail, plus KPI reporting and CSV export
//! - Question answering over a request's materials, and organisation settings
//!
//! **No API concerns**: authentication and HTTP servers belong in `api-rest` and `api-shared`.

pub mod chat;
pub mod confidence;
pub mod config;
pub mod constants;
pub mod draft;
pub mod error;
pub mod extract;
pub mod missing;
pub mod prepare;
pub mod reports;
pub mod requests;
pub mod rule_store;
pub mod rules;
pub mod settings;
pub mod soap;

pub use chat::{answer_question, ChatAnswer, Citation};
pub use confidence::Confidence;
pub use config::CoreConfig;
pub use error::{PaError, PaResult};
pub use extract::ExtractedFields;
pub use pa_types::{FieldKey, NonEmptyText};
pub use prepare::{prepare, PrepareInput, PriorAuthDraft, PriorAuthService};
pub use reports::{export_csv, kpi_report, KpiReport};
pub use requests::{
    AuditEntry, InMemoryRequestRepository, Material, MaterialKind, NewRequest, PaRequest,
    RequestRepository, RequestService, RequestStatus,
};
pub use rule_store::{RuleSnapshot, RuleStore};
pub use rules::{PayerRuleSet, ProcedureRule, Requirement, RequirementKind};
pub use settings::{OrgSettings, SettingsStore};
pub use soap::{parse_soap_text, ClinicalNote, LabelledSoapParser, Summariser};
