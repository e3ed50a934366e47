//! Field extraction.
//!
//! Each requirement of the active [`ProcedureRule`] is extracted independently using the
//! strategy for its [`RequirementKind`]. Extraction is best-effort: the transcript is searched
//! before the clinical note, the first pattern match wins, and a requirement with no usable
//! value is simply left out of the result.

use crate::constants::LABEL_SEPARATOR;
use crate::rules::{ProcedureRule, RequirementKind};
use crate::soap::ClinicalNote;
use pa_types::FieldKey;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static AGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)[- ]?years?[- ]?old").expect("age pattern is valid")
});

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)[- ]?(day|week|month|year)s?\b").expect("duration pattern is valid")
});

/// Keyword -> canonical label tables for the keyword-scan strategies. Order is output order.
const TREATMENT_KEYWORDS: &[(&[&str], &str)] = &[
    (&["physiotherapy", "physical therapy"], "Physiotherapy"),
    (
        &["nsaid", "ibuprofen", "anti-inflammatory", "medication"],
        "NSAIDs",
    ),
    (&["injection"], "Intra-articular injection"),
];

const LIMITATION_KEYWORDS: &[(&[&str], &str)] = &[
    (&["walking"], "Difficulty walking"),
    (&["stairs"], "Difficulty climbing stairs"),
    (&["sleep"], "Sleep disturbance"),
];

/// Extracted values keyed by normalised requirement label.
///
/// Only requirements with a non-blank value have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedFields(BTreeMap<FieldKey, String>);

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; blank values are ignored so that presence always means usable.
    pub fn insert(&mut self, key: FieldKey, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True if `key` maps to a value that is non-empty after trimming.
    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}

impl FromIterator<(FieldKey, String)> for ExtractedFields {
    fn from_iter<T: IntoIterator<Item = (FieldKey, String)>>(iter: T) -> Self {
        let mut fields = Self::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

/// Extract every requirement of `rule` from the note and transcript.
pub fn extract(note: &ClinicalNote, transcript: &str, rule: &ProcedureRule) -> ExtractedFields {
    let mut fields = ExtractedFields::new();

    for requirement in rule.requirements() {
        if let Some(value) = extract_kind(requirement.kind(), note, transcript) {
            fields.insert(requirement.key().clone(), value);
        }
    }

    tracing::debug!(
        "extracted {} of {} fields for {}",
        fields.len(),
        rule.requirements().len(),
        rule.code()
    );
    fields
}

/// Run the strategy for a single requirement kind.
pub fn extract_kind(kind: RequirementKind, note: &ClinicalNote, transcript: &str) -> Option<String> {
    match kind {
        RequirementKind::Age => first_capture(&AGE_PATTERN, transcript, &note.subjective)
            .map(|caps| caps[0].clone()),
        RequirementKind::Duration => {
            first_capture(&DURATION_PATTERN, transcript, &note.subjective)
                .map(|caps| format!("{} {}s", caps[0], caps[1].to_lowercase()))
        }
        RequirementKind::Diagnosis => verbatim(&note.assessment),
        RequirementKind::Imaging => verbatim(&note.objective),
        RequirementKind::TreatmentPlan => verbatim(&note.plan),
        RequirementKind::FailedTreatments => {
            keyword_scan(TREATMENT_KEYWORDS, &note.subjective, transcript)
        }
        RequirementKind::FunctionalLimitations => {
            keyword_scan(LIMITATION_KEYWORDS, &note.subjective, transcript)
        }
        RequirementKind::Other => None,
    }
}

/// Capture groups of the first match in `primary`, falling back to `secondary`.
fn first_capture(pattern: &Regex, primary: &str, secondary: &str) -> Option<Vec<String>> {
    [primary, secondary].into_iter().find_map(|text| {
        pattern.captures(text).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
    })
}

fn verbatim(section: &str) -> Option<String> {
    (!section.trim().is_empty()).then(|| section.to_string())
}

fn keyword_scan(table: &[(&[&str], &str)], note_text: &str, transcript: &str) -> Option<String> {
    let haystacks = [note_text.to_lowercase(), transcript.to_lowercase()];

    let matched: Vec<&str> = table
        .iter()
        .filter(|(keywords, _)| {
            keywords
                .iter()
                .any(|kw| haystacks.iter().any(|text| text.contains(kw)))
        })
        .map(|(_, label)| *label)
        .collect();

    (!matched.is_empty()).then(|| matched.join(LABEL_SEPARATOR))
}
