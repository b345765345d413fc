// src/exam/model.rs
// =============================================================================
// Data types for both sides of the conversion.
//
// Imported side (legacy format, we don't own it):
//   ImportedExam -> sections[] -> questions[] -> choices[]
//   Every field is optional. Documents in the wild are missing things,
//   and a missing field must degrade to a default, never fail.
//
// Normalized side (our export format):
//   NormalizedExam -> questions[] with lettered options a..d
//
// Numbers are kept as serde_json::Number so that `"timer": 60` comes back
// out as `60`, not `60.0`. Mistyped fields are coerced or dropped by the
// readers in lenient.rs instead of failing the whole document.
// =============================================================================

use super::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// A string-or-number field (`unit` and `stage` come both ways)
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(Number),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// What a question's `question` field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `question` is an image URL
    Image,
    /// `question` is the question body
    Text,
    /// Anything else the source system may have emitted
    Other,
}

/// One exam in the legacy import format
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportedExam {
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub unit: Option<Scalar>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub stage: Option<Scalar>,
    /// Minutes
    #[serde(deserialize_with = "lenient::number")]
    pub timer: Option<Number>,
    #[serde(deserialize_with = "lenient::number")]
    pub full_degree: Option<Number>,
    #[serde(deserialize_with = "lenient::number")]
    pub tries: Option<Number>,
    #[serde(deserialize_with = "lenient::text")]
    pub publish_date: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub dead_line: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub result_publish_date: Option<String>,
    #[serde(deserialize_with = "lenient::sections")]
    pub sections: Option<Vec<Section>>,
}

impl ImportedExam {
    /// Sections in document order (empty if the field is absent)
    pub fn sections(&self) -> &[Section] {
        self.sections.as_deref().unwrap_or(&[])
    }

    pub fn question_count(&self) -> usize {
        self.sections().iter().map(|s| s.questions().len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "lenient::text")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient::questions")]
    pub questions: Option<Vec<Question>>,
}

impl Section {
    pub fn questions(&self) -> &[Question] {
        self.questions.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id", deserialize_with = "lenient::text")]
    pub id: Option<String>,
    /// 0-based
    #[serde(deserialize_with = "lenient::integer")]
    pub number: Option<i64>,
    #[serde(deserialize_with = "lenient::content_type")]
    pub content_type: Option<ContentType>,
    /// Image URL when content_type is image, question text otherwise
    #[serde(deserialize_with = "lenient::text")]
    pub question: Option<String>,
    /// Unusable entries are kept as "" so later choices keep their slot
    #[serde(deserialize_with = "lenient::choices")]
    pub choices: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::text")]
    pub model_answer: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub full_degree: Option<Number>,
}

impl Question {
    pub fn is_image(&self) -> bool {
        self.content_type == Some(ContentType::Image)
    }

    pub fn choices(&self) -> &[String] {
        self.choices.as_deref().unwrap_or(&[])
    }
}

/// One exam in the normalized export format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedExam {
    pub title: String,
    pub duration: Number,
    pub questions: Vec<NormalizedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuestion {
    pub title: String,
    pub options: OptionSet,
    pub correct_answer: String,
    /// Copied verbatim from the source `question` field; omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// The four answer slots, always populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSet {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}
