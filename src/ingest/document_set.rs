// src/ingest/document_set.rs
// =============================================================================
// Parsing raw text into exams, and the in-memory "document set".
//
// Rules:
//   - A single JSON object is treated as a list of one exam
//   - A JSON array is used as-is
//   - Anything else (a bare string, number, ...) is a parse error, and so
//     is an array element that is not an object
//   - Inside an exam, mistyped fields are coerced or dropped (exam::lenient)
//   - A successful import REPLACES the whole set, nothing is merged
//   - A failed import leaves the previous set exactly as it was
//
// The set also remembers which exam is "focused" for the inspect command.
// It is reset to the first exam on every successful import.
// =============================================================================

use crate::error::{ConvertError, Result};
use crate::exam::ImportedExam;
use serde_json::Value;
use std::collections::HashMap;

/// Parses raw text into a list of exams without touching any state
pub fn parse_documents(text: &str) -> Result<Vec<ImportedExam>> {
    let value: Value = serde_json::from_str(text)?;

    let items = match value {
        Value::Object(_) => vec![value],
        Value::Array(items) => items,
        other => {
            return Err(ConvertError::parse(format!(
                "expected an exam object or an array of exams, found {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(ConvertError::parse(format!(
                    "exam #{}: expected an exam object, found {}",
                    i + 1,
                    json_kind(&item)
                )));
            }
            serde_json::from_value(item)
                .map_err(|e| ConvertError::parse(format!("exam #{}: {}", i + 1, e)))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `_id` values used by more than one question, in first-seen order
pub fn duplicate_question_ids(exams: &[ImportedExam]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    let ids = exams
        .iter()
        .flat_map(|exam| exam.sections())
        .flat_map(|section| section.questions())
        .filter_map(|q| q.id.as_deref());

    for id in ids {
        let count = seen.entry(id).or_insert(0);
        *count += 1;
        if *count == 2 {
            duplicates.push(id.to_string());
        }
    }

    duplicates
}

/// The exams currently loaded
#[derive(Debug, Default)]
pub struct DocumentSet {
    exams: Vec<ImportedExam>,
    focused: Option<usize>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` and, on success, replaces the current set with it.
    /// Returns the number of exams loaded.
    pub fn ingest(&mut self, text: &str) -> Result<usize> {
        let exams = parse_documents(text)?;
        self.replace(exams);
        Ok(self.exams.len())
    }

    pub fn replace(&mut self, exams: Vec<ImportedExam>) {
        self.focused = if exams.is_empty() { None } else { Some(0) };
        self.exams = exams;
    }

    pub fn exams(&self) -> &[ImportedExam] {
        &self.exams
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }

    pub fn focused(&self) -> Option<&ImportedExam> {
        self.focused.and_then(|i| self.exams.get(i))
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    /// Moves focus to another exam. Returns false (and keeps the old focus)
    /// if the index is out of range.
    pub fn focus(&mut self, index: usize) -> bool {
        if index < self.exams.len() {
            self.focused = Some(index);
            true
        } else {
            false
        }
    }

    /// Indices of exams whose name contains `query`, case-insensitively.
    /// An empty query matches everything.
    pub fn matching(&self, query: &str) -> Vec<usize> {
        let needle = query.to_lowercase();
        self.exams
            .iter()
            .enumerate()
            .filter(|(_, exam)| {
                needle.is_empty()
                    || exam
                        .name
                        .as_deref()
                        .map_or(false, |name| name.to_lowercase().contains(&needle))
            })
            .map(|(i, _)| i)
            .collect()
    }
}
