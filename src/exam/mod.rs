// src/exam/mod.rs
// =============================================================================
// Exam data types and the legacy -> normalized conversion.
//
// Submodules:
// - model: the imported (legacy) and normalized exam structures
// - lenient: field readers that coerce or drop mistyped legacy values
// - transform: the pure conversion between them
// =============================================================================

mod lenient;
mod model;
mod transform;

pub use model::{ImportedExam, NormalizedExam};
pub use transform::{answer_key_mismatches, transform};

#[cfg(test)]
pub use model::{NormalizedQuestion, OptionSet};
