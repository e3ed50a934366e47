//! Confidence scoring for extracted values.

use crate::constants::HEURISTIC_MARKER;
use crate::extract::ExtractedFields;
use crate::rules::ProcedureRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Qualitative trust level of an extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score a single value.
///
/// Absent or blank values are `Low`; values carrying the heuristic marker are `Medium`;
/// everything else is `High`.
pub fn score(value: Option<&str>) -> Confidence {
    match value {
        None => Confidence::Low,
        Some(v) if v.trim().is_empty() => Confidence::Low,
        Some(v) if v.contains(HEURISTIC_MARKER) => Confidence::Medium,
        Some(_) => Confidence::High,
    }
}

/// One confidence entry per requirement of `rule`, keyed by normalised field key.
pub fn score_all(fields: &ExtractedFields, rule: &ProcedureRule) -> BTreeMap<String, Confidence> {
    rule.requirements()
        .iter()
        .map(|req| {
            let key = req.key().as_str();
            (key.to_string(), score(fields.get(key)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_types::FieldKey;

    #[test]
    fn scores_by_presence_and_marker() {
        assert_eq!(score(None), Confidence::Low);
        assert_eq!(score(Some("  ")), Confidence::Low);
        assert_eq!(
            score(Some("65 (extracted from referral letter)")),
            Confidence::Medium
        );
        assert_eq!(score(Some("65")), Confidence::High);
    }

    #[test]
    fn score_all_has_one_entry_per_requirement() {
        let rule = ProcedureRule::new(
            "TKR",
            "Total Knee Replacement",
            ["Patient Age", "Diagnosis", "Imaging Findings", "Body Mass Index"],
            Vec::<String>::new(),
        );
        let mut fields = ExtractedFields::new();
        fields.insert(FieldKey::from_label("Patient Age"), "65");
        fields.insert(FieldKey::from_label("Diagnosis"), "Severe osteoarthritis");

        let scores = score_all(&fields, &rule);

        assert_eq!(scores.len(), 4);
        assert_eq!(scores["patient_age"], Confidence::High);
        assert_eq!(scores["diagnosis"], Confidence::High);
        assert_eq!(scores["imaging_findings"], Confidence::Low);
        assert_eq!(scores["body_mass_index"], Confidence::Low);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Confidence::Medium).unwrap(),
            "\"medium\""
        );
    }
}
