//! Constants used throughout the prior-authorization core crate.
//!
//! Environment variable names, defaults, and the fixed boilerplate the draft composer falls
//! back to when a field could not be extracted.

/// Environment variable naming the payer rules file (JSON or YAML).
pub const RULES_PATH_ENV: &str = "PA_RULES_PATH";

/// Environment variable overriding the minutes saved per request used in reports.
pub const BASELINE_MINUTES_ENV: &str = "PA_BASELINE_MINUTES";

/// Minutes of clinician time assumed saved per drafted request.
pub const DEFAULT_BASELINE_MINUTES: u32 = 15;

/// Organisation name used until an administrator sets one.
pub const DEFAULT_ORG_NAME: &str = "Demo Orthopedic Practice";

pub const DEFAULT_RETENTION_DAYS: u32 = 180;

/// Specialty recorded on requests that do not name one.
pub const DEFAULT_SPECIALTY: &str = "orthopedics";

/// Marker carried by values produced by a weaker heuristic path.
pub const HEURISTIC_MARKER: &str = "extracted from";

/// Separator used when joining keyword-scan labels.
pub const LABEL_SEPARATOR: &str = ", ";

pub const DEFAULT_DIAGNOSIS: &str = "Severe osteoarthritis";
pub const DEFAULT_SYMPTOM_DURATION: &str = "6 months";
pub const DEFAULT_FUNCTIONAL_LIMITATIONS: &str = "Significant pain and mobility issues";
pub const DEFAULT_FAILED_TREATMENTS: &str = "Physiotherapy, NSAIDs, activity modification";
pub const DEFAULT_IMAGING_FINDINGS: &str =
    "Severe joint space narrowing, osteophytes, subchondral sclerosis";
pub const DEFAULT_TREATMENT_PLAN: &str = "Total joint replacement recommended";

/// Characters of a material quoted in a chat citation.
pub const EXCERPT_CHARS: usize = 100;

pub const NO_ANSWER_FOUND: &str = "No information about this was found in the request's materials.";
