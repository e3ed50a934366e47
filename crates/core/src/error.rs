use uuid::Uuid;

use crate::requests::RequestStatus;

#[derive(Debug, thiserror::Error)]
pub enum PaError {
    #[error("no rules found for payer: {0}")]
    UnknownPayer(String),
    #[error("no rules found for procedure {code} under payer {payer}")]
    UnknownProcedure { payer: String, code: String },
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid rule set: {0}")]
    InvalidRules(String),
    #[error("failed to read rules file: {0}")]
    RulesRead(std::io::Error),
    #[error("failed to parse rules: {0}")]
    RulesParse(String),
    #[error("failed to serialize rules: {0}")]
    RulesSerialization(String),

    #[error("request not found: {0}")]
    RequestNotFound(Uuid),
    #[error("cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("failed to export requests: {0}")]
    Export(String),

    #[error("summarisation service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PaResult<T> = std::result::Result<T, PaError>;
