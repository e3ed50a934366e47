//! Prior-authorization draft composition.
//!
//! The draft is a fixed template: every section is always emitted, and a section whose field
//! was not extracted falls back to static boilerplate. Values are found through the rule's
//! requirement kinds, so the composer does not depend on how a payer spells its labels.

use crate::constants::{
    DEFAULT_DIAGNOSIS, DEFAULT_FAILED_TREATMENTS, DEFAULT_FUNCTIONAL_LIMITATIONS,
    DEFAULT_IMAGING_FINDINGS, DEFAULT_SYMPTOM_DURATION, DEFAULT_TREATMENT_PLAN,
};
use crate::extract::ExtractedFields;
use crate::rules::{ProcedureRule, RequirementKind};

/// Render the draft request text.
pub fn compose(
    payer: &str,
    procedure_code: &str,
    fields: &ExtractedFields,
    rule: &ProcedureRule,
) -> String {
    let value = |kind: RequirementKind, default: &'static str| -> String {
        rule.requirement_of_kind(kind)
            .and_then(|req| fields.get(req.key().as_str()))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let diagnosis = value(RequirementKind::Diagnosis, DEFAULT_DIAGNOSIS);
    let duration = value(RequirementKind::Duration, DEFAULT_SYMPTOM_DURATION);
    let limitations = value(
        RequirementKind::FunctionalLimitations,
        DEFAULT_FUNCTIONAL_LIMITATIONS,
    );
    let treatments = value(RequirementKind::FailedTreatments, DEFAULT_FAILED_TREATMENTS);
    let imaging = value(RequirementKind::Imaging, DEFAULT_IMAGING_FINDINGS);
    let plan = value(RequirementKind::TreatmentPlan, DEFAULT_TREATMENT_PLAN);
    let procedure_name = rule.name();

    format!(
        "PRIOR AUTHORIZATION REQUEST

Medical Aid: {payer}
Procedure: {procedure_name} ({procedure_code})
Specialty: Orthopedics

CLINICAL JUSTIFICATION:

Patient presents with severe osteoarthritis requiring surgical intervention. The following clinical information supports the medical necessity of this procedure:

DIAGNOSIS:
{diagnosis}

SYMPTOMS AND DURATION:
- Duration: {duration}
- Functional limitations: {limitations}

CONSERVATIVE TREATMENTS TRIED:
{treatments}

IMAGING FINDINGS:
{imaging}

TREATMENT PLAN:
{plan}

This procedure is medically necessary as conservative treatments have been exhausted and the patient meets the clinical criteria for surgical intervention. The procedure will significantly improve the patient's quality of life and functional capacity.

CLINICIAN SIGNATURE REQUIRED:
[ ] Dr. [Name] - [Date]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_types::FieldKey;

    const SECTIONS: [&str; 7] = [
        "CLINICAL JUSTIFICATION:",
        "DIAGNOSIS:",
        "SYMPTOMS AND DURATION:",
        "CONSERVATIVE TREATMENTS TRIED:",
        "IMAGING FINDINGS:",
        "TREATMENT PLAN:",
        "CLINICIAN SIGNATURE REQUIRED:",
    ];

    fn full_rule() -> ProcedureRule {
        ProcedureRule::new(
            "TKR",
            "Total Knee Replacement",
            [
                "Patient Age",
                "Diagnosis",
                "Symptom Duration",
                "Failed Conservative Treatments",
                "Functional Limitations",
                "Imaging Findings",
                "Treatment Plan",
            ],
            ["X-ray images"],
        )
    }

    #[test]
    fn empty_fields_render_every_section_with_defaults() {
        let draft = compose("Discovery", "TKR", &ExtractedFields::new(), &full_rule());

        assert!(draft.contains("Medical Aid: Discovery"));
        assert!(draft.contains("Procedure: Total Knee Replacement (TKR)"));
        for section in SECTIONS {
            assert!(draft.contains(section), "missing section {section}");
        }
        for default in [
            DEFAULT_DIAGNOSIS,
            DEFAULT_SYMPTOM_DURATION,
            DEFAULT_FUNCTIONAL_LIMITATIONS,
            DEFAULT_FAILED_TREATMENTS,
            DEFAULT_IMAGING_FINDINGS,
            DEFAULT_TREATMENT_PLAN,
        ] {
            assert!(draft.contains(default), "missing default {default}");
        }
    }

    #[test]
    fn extracted_values_replace_defaults() {
        let rule = full_rule();
        let mut fields = ExtractedFields::new();
        fields.insert(
            FieldKey::from_label("Diagnosis"),
            "Severe osteoarthritis of right knee, Kellgren-Lawrence Grade 4",
        );
        fields.insert(
            FieldKey::from_label("Failed Conservative Treatments"),
            "Physiotherapy, NSAIDs",
        );
        fields.insert(FieldKey::from_label("Symptom Duration"), "9 months");

        let draft = compose("Discovery", "TKR", &fields, &rule);

        assert!(draft.contains("DIAGNOSIS:\nSevere osteoarthritis of right knee, Kellgren-Lawrence Grade 4\n"));
        assert!(draft.contains("CONSERVATIVE TREATMENTS TRIED:\nPhysiotherapy, NSAIDs\n"));
        assert!(draft.contains("- Duration: 9 months"));
        assert!(!draft.contains(DEFAULT_FAILED_TREATMENTS));
        assert!(draft.contains(DEFAULT_IMAGING_FINDINGS));
    }

    #[test]
    fn values_for_requirements_outside_the_rule_are_ignored() {
        let rule = ProcedureRule::new("THR", "Total Hip Replacement", ["Diagnosis"], ["MRI report"]);
        let mut fields = ExtractedFields::new();
        fields.insert(FieldKey::from_label("Treatment Plan"), "Hip replacement");

        let draft = compose("Discovery", "THR", &fields, &rule);
        assert!(draft.contains(DEFAULT_TREATMENT_PLAN));
        assert!(draft.contains("Total Hip Replacement (THR)"));
    }

    #[test]
    fn compose_is_deterministic() {
        let rule = full_rule();
        let mut fields = ExtractedFields::new();
        fields.insert(FieldKey::from_label("Patient Age"), "65");
        assert_eq!(
            compose("Discovery", "TKR", &fields, &rule),
            compose("Discovery", "TKR", &fields, &rule)
        );
    }
}
