//! Missing-field detection.

use crate::extract::ExtractedFields;
use crate::rules::ProcedureRule;

/// Requirement labels of `rule` that have no usable value in `fields`.
///
/// The original labels are returned (not normalised keys), in the order the rule declares them.
pub fn find_missing(fields: &ExtractedFields, rule: &ProcedureRule) -> Vec<String> {
    rule.requirements()
        .iter()
        .filter(|req| !fields.is_present(req.key().as_str()))
        .map(|req| req.label().to_string())
        .collect()
}
