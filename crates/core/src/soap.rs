//! SOAP clinical notes.
//!
//! A [`ClinicalNote`] holds the four free-text sections of a consultation summary. Notes
//! usually arrive already structured; [`parse_soap_text`] turns labelled summariser output
//! (`SUBJECTIVE: ... OBJECTIVE: ... ASSESSMENT: ... PLAN: ...`) into one.
//!
//! Summarisation itself is an external service. [`Summariser`] is the seam it plugs into; the
//! bundled [`LabelledSoapParser`] only parses text that is already labelled and never invents
//! content.

use crate::{PaError, PaResult};
use serde::{Deserialize, Serialize};

/// Subjective / Objective / Assessment / Plan sections. Any section may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalNote {
    #[serde(default)]
    pub subjective: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub plan: String,
}

impl ClinicalNote {
    pub fn is_empty(&self) -> bool {
        [&self.subjective, &self.objective, &self.assessment, &self.plan]
            .iter()
            .all(|s| s.trim().is_empty())
    }
}

#[derive(Clone, Copy)]
enum Section {
    Subjective,
    Objective,
    Assessment,
    Plan,
}

impl Section {
    const ALL: [(Section, &'static str); 4] = [
        (Section::Subjective, "subjective:"),
        (Section::Objective, "objective:"),
        (Section::Assessment, "assessment:"),
        (Section::Plan, "plan:"),
    ];

    fn slot(self, note: &mut ClinicalNote) -> &mut String {
        match self {
            Section::Subjective => &mut note.subjective,
            Section::Objective => &mut note.objective,
            Section::Assessment => &mut note.assessment,
            Section::Plan => &mut note.plan,
        }
    }
}

/// Parse labelled SOAP text.
///
/// A line starting with a section label (case-insensitive) opens that section, with the rest of
/// the line as its first text. Following non-blank lines are appended with a single space.
/// Lines before the first label are ignored.
pub fn parse_soap_text(text: &str) -> ClinicalNote {
    let mut note = ClinicalNote::default();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        let line = line.trim();
        let lower = line.to_lowercase();

        let opened = Section::ALL
            .iter()
            .find(|(_, label)| lower.starts_with(label))
            .copied();

        if let Some((section, label)) = opened {
            current = Some(section);
            let rest = line.get(label.len()..).unwrap_or_default();
            *section.slot(&mut note) = rest.trim().to_string();
        } else if let Some(section) = current {
            if !line.is_empty() {
                let slot = section.slot(&mut note);
                if !slot.is_empty() {
                    slot.push(' ');
                }
                slot.push_str(line);
            }
        }
    }

    note
}

/// Turns consultation text into a structured note.
pub trait Summariser: Send + Sync {
    /// # Errors
    ///
    /// Implementations backed by a remote service return [`PaError::ServiceUnavailable`] when
    /// the service cannot be reached, rather than substituting placeholder content.
    fn summarise(&self, text: &str) -> PaResult<ClinicalNote>;
}

/// Deterministic summariser for text that already carries SOAP labels.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabelledSoapParser;

impl Summariser for LabelledSoapParser {
    fn summarise(&self, text: &str) -> PaResult<ClinicalNote> {
        if text.trim().is_empty() {
            return Err(PaError::MalformedInput("no text provided to summarise".into()));
        }
        let note = parse_soap_text(text);
        if note.is_empty() {
            tracing::debug!("summariser input carried no SOAP labels");
        }
        Ok(note)
    }
}
