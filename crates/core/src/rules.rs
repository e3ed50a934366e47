//! Payer rule sets.
//!
//! A rule set maps each payer to the procedures it authorises, and each procedure to the
//! requirement labels and attachments a request must carry.
//!
//! Responsibilities:
//! - Define the strict wire model used by rule files (`{"payers": {..: {"procedures": {..}}}}`)
//! - Validate a wire document before it can be used for extraction
//! - Resolve every requirement label to a [`RequirementKind`] once, at load time
//! - Provide the built-in default rule set used when no rules file is configured
//!
//! Wire format (JSON shown; YAML with the same shape is accepted):
//!
//! ```text
//! {
//!   "payers": {
//!     "Discovery": {
//!       "procedures": {
//!         "TKR": {
//!           "name": "Total Knee Replacement",
//!           "requirements": ["Patient Age", "Diagnosis"],
//!           "attachments": ["X-ray images"]
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use crate::{PaError, PaResult};
use pa_types::FieldKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

// ============================================================================
// Wire model
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleSetWire {
    payers: BTreeMap<String, PayerWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PayerWire {
    procedures: BTreeMap<String, ProcedureWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProcedureWire {
    name: String,
    requirements: Vec<String>,
    #[serde(default)]
    attachments: Vec<String>,
}

// ============================================================================
// Domain types
// ============================================================================

/// The extraction strategy a requirement label maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Age,
    Diagnosis,
    Duration,
    FailedTreatments,
    FunctionalLimitations,
    Imaging,
    TreatmentPlan,
    /// No extraction strategy exists; the field is always left absent.
    Other,
}

impl RequirementKind {
    /// Resolve the kind for a normalised field key.
    ///
    /// The first matching rule wins, so "Failed Conservative Treatments" resolves to
    /// `FailedTreatments` even though any other label mentioning treatment is a plan.
    pub fn resolve(key: &FieldKey) -> Self {
        let key = key.as_str();
        let has_word = |word: &str| key.split('_').any(|part| part == word);

        if has_word("age") {
            Self::Age
        } else if key.contains("diagnosis") {
            Self::Diagnosis
        } else if key.contains("duration") {
            Self::Duration
        } else if key.contains("failed") || key.contains("conservative") {
            Self::FailedTreatments
        } else if key.contains("functional") || key.contains("limitation") {
            Self::FunctionalLimitations
        } else if key.contains("imaging")
            || key.contains("x-ray")
            || key.contains("xray")
            || key.contains("radiolog")
            || has_word("mri")
        {
            Self::Imaging
        } else if key.contains("plan") || key.contains("treatment") {
            Self::TreatmentPlan
        } else {
            Self::Other
        }
    }
}

/// A requirement label together with its normalised key and resolved kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    label: String,
    key: FieldKey,
    kind: RequirementKind,
}

impl Requirement {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let key = FieldKey::from_label(&label);
        let kind = RequirementKind::resolve(&key);
        Self { label, key, kind }
    }

    /// The human-readable label exactly as the rule declares it.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    pub fn kind(&self) -> RequirementKind {
        self.kind
    }
}

/// Requirements and attachments for one procedure under one payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureRule {
    code: String,
    name: String,
    requirements: Vec<Requirement>,
    attachments: Vec<String>,
}

impl ProcedureRule {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        requirements: impl IntoIterator<Item = impl Into<String>>,
        attachments: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            requirements: requirements.into_iter().map(Requirement::new).collect(),
            attachments: attachments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display name, falling back to the code when the name is blank.
    pub fn name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.code
        } else {
            &self.name
        }
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    /// First requirement of the given kind, if the rule declares one.
    pub fn requirement_of_kind(&self, kind: RequirementKind) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.kind() == kind)
    }
}

/// Validated, immutable mapping of payer -> procedure code -> [`ProcedureRule`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PayerRuleSet {
    payers: BTreeMap<String, BTreeMap<String, ProcedureRule>>,
}

impl PayerRuleSet {
    /// Look up the rule for a payer and procedure code.
    ///
    /// # Errors
    ///
    /// - [`PaError::UnknownPayer`] when the payer key is absent.
    /// - [`PaError::UnknownProcedure`] when the payer exists but the code does not.
    pub fn get_rule(&self, payer: &str, procedure_code: &str) -> PaResult<&ProcedureRule> {
        let procedures = self
            .payers
            .get(payer)
            .ok_or_else(|| PaError::UnknownPayer(payer.to_string()))?;

        procedures
            .get(procedure_code)
            .ok_or_else(|| PaError::UnknownProcedure {
                payer: payer.to_string(),
                code: procedure_code.to_string(),
            })
    }

    pub fn payer_names(&self) -> impl Iterator<Item = &str> {
        self.payers.keys().map(String::as_str)
    }

    pub fn procedures(&self, payer: &str) -> impl Iterator<Item = &ProcedureRule> {
        self.payers.get(payer).into_iter().flat_map(|p| p.values())
    }

    /// Parse and validate a JSON rules document.
    pub fn from_json_str(text: &str) -> PaResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let wire = serde_path_to_error::deserialize::<_, RuleSetWire>(&mut deserializer)
            .map_err(|err| PaError::RulesParse(describe_path_error(err)))?;
        Self::from_wire(wire)
    }

    /// Parse and validate a YAML rules document.
    pub fn from_yaml_str(text: &str) -> PaResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(text);
        let wire = serde_path_to_error::deserialize::<_, RuleSetWire>(deserializer)
            .map_err(|err| PaError::RulesParse(describe_path_error(err)))?;
        Self::from_wire(wire)
    }

    /// Validate an already-decoded JSON document, as received by the admin API.
    pub fn from_json_value(value: serde_json::Value) -> PaResult<Self> {
        let wire = serde_path_to_error::deserialize::<_, RuleSetWire>(value)
            .map_err(|err| PaError::RulesParse(describe_path_error(err)))?;
        Self::from_wire(wire)
    }

    /// Load a rules file, choosing YAML for `.yaml`/`.yml` extensions and JSON otherwise.
    pub fn load(path: &Path) -> PaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(PaError::RulesRead)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    /// Render the rule set back into its wire shape.
    pub fn to_json_value(&self) -> PaResult<serde_json::Value> {
        serde_json::to_value(self.to_wire())
            .map_err(|err| PaError::RulesSerialization(err.to_string()))
    }

    pub fn to_json_string_pretty(&self) -> PaResult<String> {
        serde_json::to_string_pretty(&self.to_wire())
            .map_err(|err| PaError::RulesSerialization(err.to_string()))
    }

    /// The rule set used when no rules file is configured.
    pub fn builtin_default() -> Self {
        let requirements = [
            "Patient Age",
            "Diagnosis",
            "Symptom Duration",
            "Failed Conservative Treatments",
            "Functional Limitations",
            "Imaging Findings",
        ];

        let tkr = ProcedureRule::new(
            "TKR",
            "Total Knee Replacement",
            requirements,
            [
                "X-ray images",
                "MRI report",
                "Physiotherapy records",
                "Previous treatment records",
            ],
        );
        let thr = ProcedureRule::new(
            "THR",
            "Total Hip Replacement",
            requirements,
            ["X-ray images", "MRI report", "Physiotherapy records"],
        );

        let procedures = BTreeMap::from([("TKR".to_string(), tkr), ("THR".to_string(), thr)]);
        Self {
            payers: BTreeMap::from([("Discovery".to_string(), procedures)]),
        }
    }

    fn from_wire(wire: RuleSetWire) -> PaResult<Self> {
        validate_wire(&wire)?;

        let payers = wire
            .payers
            .into_iter()
            .map(|(payer, payer_wire)| {
                let procedures = payer_wire
                    .procedures
                    .into_iter()
                    .map(|(code, proc)| {
                        let rule =
                            ProcedureRule::new(code.clone(), proc.name, proc.requirements, proc.attachments);
                        (code, rule)
                    })
                    .collect();
                (payer, procedures)
            })
            .collect();

        Ok(Self { payers })
    }

    fn to_wire(&self) -> RuleSetWire {
        let payers = self
            .payers
            .iter()
            .map(|(payer, procedures)| {
                let procedures = procedures
                    .iter()
                    .map(|(code, rule)| {
                        let wire = ProcedureWire {
                            name: rule.name.clone(),
                            requirements: rule
                                .requirements
                                .iter()
                                .map(|r| r.label.clone())
                                .collect(),
                            attachments: rule.attachments.clone(),
                        };
                        (code.clone(), wire)
                    })
                    .collect();
                (payer.clone(), PayerWire { procedures })
            })
            .collect();

        RuleSetWire { payers }
    }
}

fn describe_path_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> String {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    format!("schema mismatch at {path}: {source}")
}

/// Reject structurally valid documents that would produce unusable rules.
fn validate_wire(wire: &RuleSetWire) -> PaResult<()> {
    let invalid = |path: String, problem: &str| PaError::InvalidRules(format!("{path}: {problem}"));

    if wire.payers.is_empty() {
        return Err(invalid("payers".into(), "at least one payer is required"));
    }

    for (payer, payer_wire) in &wire.payers {
        let payer_path = format!("payers.{payer}");
        if payer.trim().is_empty() {
            return Err(invalid(payer_path, "payer name must not be blank"));
        }
        if payer_wire.procedures.is_empty() {
            return Err(invalid(payer_path, "at least one procedure is required"));
        }

        for (code, proc) in &payer_wire.procedures {
            let proc_path = format!("{payer_path}.procedures.{code}");
            if code.trim().is_empty() {
                return Err(invalid(proc_path, "procedure code must not be blank"));
            }
            if proc.name.trim().is_empty() {
                return Err(invalid(format!("{proc_path}.name"), "must not be blank"));
            }
            if proc.requirements.is_empty() {
                return Err(invalid(
                    format!("{proc_path}.requirements"),
                    "at least one requirement is required",
                ));
            }

            let mut seen = HashSet::new();
            for (idx, label) in proc.requirements.iter().enumerate() {
                let label_path = format!("{proc_path}.requirements[{idx}]");
                let key = FieldKey::from_label(label);
                if key.is_empty() {
                    return Err(invalid(label_path, "requirement label must not be blank"));
                }
                if !seen.insert(key) {
                    return Err(invalid(label_path, "duplicate requirement label"));
                }
            }

            for (idx, label) in proc.attachments.iter().enumerate() {
                if label.trim().is_empty() {
                    return Err(invalid(
                        format!("{proc_path}.attachments[{idx}]"),
                        "attachment label must not be blank",
                    ));
                }
            }
        }
    }

    Ok(())
}
