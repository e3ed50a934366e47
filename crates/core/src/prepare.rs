//! The prepare-PA pipeline.
//!
//! Rule lookup -> field extraction -> confidence scoring + missing-field detection -> draft
//! composition. The pipeline fails only when the input is malformed or the payer/procedure is
//! unknown; every later step degrades to absent, low-confidence, or default-text values.

use crate::confidence::{score_all, Confidence};
use crate::draft::compose;
use crate::extract::extract;
use crate::missing::find_missing;
use crate::rule_store::RuleStore;
use crate::rules::PayerRuleSet;
use crate::soap::ClinicalNote;
use crate::{PaError, PaResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Input to [`prepare`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareInput {
    pub payer: String,
    pub procedure_code: String,
    /// The structured clinical note. `None` is malformed input.
    pub soap: Option<ClinicalNote>,
    #[serde(default)]
    pub transcript: String,
}

/// Combined pipeline output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorAuthDraft {
    pub fields: BTreeMap<String, String>,
    pub attachments: Vec<String>,
    pub missing: Vec<String>,
    pub draft: String,
    pub confidence: BTreeMap<String, Confidence>,
}

/// Run the full pipeline against a rule set.
///
/// # Errors
///
/// - [`PaError::MalformedInput`] if the payer or procedure code is blank or the note is absent.
/// - [`PaError::UnknownPayer`] / [`PaError::UnknownProcedure`] from the rule lookup.
pub fn prepare(rules: &PayerRuleSet, input: &PrepareInput) -> PaResult<PriorAuthDraft> {
    let payer = input.payer.trim();
    let procedure_code = input.procedure_code.trim();

    if payer.is_empty() || procedure_code.is_empty() {
        return Err(PaError::MalformedInput(
            "payer and procedure_code are required".into(),
        ));
    }
    let note = input
        .soap
        .as_ref()
        .ok_or_else(|| PaError::MalformedInput("clinical note (soap) is required".into()))?;

    let rule = rules.get_rule(payer, procedure_code)?;

    let fields = extract(note, &input.transcript, rule);
    let confidence = score_all(&fields, rule);
    let missing = find_missing(&fields, rule);
    let draft = compose(payer, procedure_code, &fields, rule);

    if !missing.is_empty() {
        tracing::info!(
            "{} {} draft prepared with {} missing field(s)",
            payer,
            procedure_code,
            missing.len()
        );
    }

    Ok(PriorAuthDraft {
        fields: fields.into_map(),
        attachments: rule.attachments().to_vec(),
        missing,
        draft,
        confidence,
    })
}

/// Runs the pipeline against the live rules of a [`RuleStore`].
#[derive(Clone, Debug)]
pub struct PriorAuthService {
    rules: Arc<RuleStore>,
}

impl PriorAuthService {
    pub fn new(rules: Arc<RuleStore>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    /// Prepare a draft using one consistent snapshot of the rules.
    pub fn prepare(&self, input: &PrepareInput) -> PaResult<PriorAuthDraft> {
        let snapshot = self.rules.snapshot();
        prepare(snapshot.rules(), input)
    }
}
