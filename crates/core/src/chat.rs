//! Question answering over a request's materials.
//!
//! Answers are assembled only from sentences found in the materials, in the order the materials
//! were attached. When nothing matches, a fixed reply says so; no clinical text is made up.

use crate::constants::{EXCERPT_CHARS, NO_ANSWER_FOUND};
use crate::requests::{Material, MaterialKind};
use crate::{PaError, PaResult};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

const STOP_WORDS: &[&str] = &[
    "about", "and", "any", "are", "been", "did", "does", "for", "from", "had", "has", "have",
    "how", "patient", "tell", "that", "the", "their", "there", "this", "was", "were", "what",
    "when", "where", "which", "who", "why", "with",
];

/// A material an answer was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub source: MaterialKind,
    pub material_id: Uuid,
    /// Opening characters of the material, followed by "..." when cut short.
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Answer `question` from `materials`, which are expected oldest first.
///
/// Each matching sentence is quoted with the kind of material it came from, and every material
/// that contributed gets one citation.
///
/// # Errors
///
/// Returns [`PaError::MalformedInput`] if the question is blank.
pub fn answer_question(question: &str, materials: &[Material]) -> PaResult<ChatAnswer> {
    if question.trim().is_empty() {
        return Err(PaError::MalformedInput("question is required".into()));
    }
    let terms = search_terms(question);

    let mut lines = Vec::new();
    let mut citations = Vec::new();

    if !terms.is_empty() {
        for material in materials {
            let text = material_text(&material.content);
            let matched: Vec<&str> = sentences(&text)
                .filter(|sentence| mentions_any(sentence, &terms))
                .collect();
            if matched.is_empty() {
                continue;
            }

            lines.extend(
                matched
                    .into_iter()
                    .map(|sentence| format!("[{}] {}", material.kind.as_str(), sentence)),
            );
            citations.push(Citation {
                source: material.kind,
                material_id: material.id,
                excerpt: excerpt(&text),
            });
        }
    }

    tracing::debug!(
        "question matched {} sentence(s) in {} of {} material(s)",
        lines.len(),
        citations.len(),
        materials.len()
    );

    let answer = if lines.is_empty() {
        NO_ANSWER_FOUND.to_string()
    } else {
        lines.join("\n")
    };
    Ok(ChatAnswer { answer, citations })
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|word| word.trim_matches('-').to_lowercase())
        .filter(|word| !word.is_empty())
}

/// Lowercased question words worth searching for, with a plural "s" dropped.
fn search_terms(question: &str) -> Vec<String> {
    let mut terms: Vec<String> = words(question)
        .filter(|word| word.chars().count() >= 3 && !STOP_WORDS.contains(&word.as_str()))
        .map(|mut word| {
            if word.ends_with('s') && word.chars().count() > 3 {
                word.pop();
            }
            word
        })
        .collect();
    terms.dedup();
    terms
}

fn mentions_any(sentence: &str, terms: &[String]) -> bool {
    words(sentence).any(|word| terms.iter().any(|term| word.starts_with(term.as_str())))
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
}

/// Flatten material content to searchable text.
///
/// Strings are used as-is; object fields become `key: value` lines.
fn material_text(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(_) | Value::Number(_) => content.to_string(),
        Value::Array(items) => items
            .iter()
            .map(material_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| match value {
                Value::Array(_) | Value::Object(_) => material_text(value),
                _ => format!("{}: {}", key, material_text(value)),
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    let mut excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        excerpt.push_str("...");
    }
    excerpt
}
