// src/ingest/mod.rs
// =============================================================================
// Getting exam documents into memory.
//
// - source: reads the raw text from a .json file or from stdin
// - document_set: parses that text and holds the current set of exams
// =============================================================================

mod document_set;
mod source;

pub use document_set::{duplicate_question_ids, DocumentSet};

#[cfg(test)]
pub use document_set::parse_documents;
pub use source::{read_input, InputSource};
