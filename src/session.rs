// src/session.rs
// =============================================================================
// A converter session: one document set plus the image checker bound to it.
//
//   import(text) -> parse -> replace the document set -> start image checks
//   export()     -> transform the (optionally filtered) set -> JSON bytes
//
// Importing again replaces everything. Image checks still running from the
// previous import keep going but their results are ignored.
// =============================================================================

use crate::checker::{ImageProber, LinkValidator, ValidationRun};
use crate::error::Result;
use crate::exam::{self, ImportedExam};
use crate::export;
use crate::ingest::{duplicate_question_ids, DocumentSet};
use tracing::{info, warn};

pub struct Session<P> {
    documents: DocumentSet,
    validator: LinkValidator<P>,
}

impl<P: ImageProber + 'static> Session<P> {
    pub fn new(validator: LinkValidator<P>) -> Self {
        Self {
            documents: DocumentSet::new(),
            validator,
        }
    }

    /// Loads a new document set and starts checking its images.
    /// On a parse error nothing changes, including running checks.
    pub fn import(&mut self, text: &str) -> Result<ValidationRun> {
        self.load(text)?;
        Ok(self.validator.validate_all(self.documents.exams()))
    }

    /// Loads a new document set without checking images
    pub fn load(&mut self, text: &str) -> Result<usize> {
        let count = self.documents.ingest(text)?;
        let exams = self.documents.exams();

        let questions: usize = exams.iter().map(ImportedExam::question_count).sum();
        info!("loaded {} exam(s) with {} question(s)", count, questions);

        let duplicates = duplicate_question_ids(exams);
        if !duplicates.is_empty() {
            warn!(
                "{} question id(s) are used more than once: {}",
                duplicates.len(),
                duplicates.join(", ")
            );
        }

        Ok(count)
    }

    pub fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    pub fn validator(&self) -> &LinkValidator<P> {
        &self.validator
    }

    /// Exams selected by a name filter (all exams when `filter` is None)
    pub fn selection(&self, filter: Option<&str>) -> Vec<usize> {
        self.documents.matching(filter.unwrap_or(""))
    }

    /// Converts the selected exams and serializes them for export
    pub fn export(&self, selection: &[usize]) -> Result<Vec<u8>> {
        let exams: Vec<ImportedExam> = selection
            .iter()
            .filter_map(|&i| self.documents.exams().get(i).cloned())
            .collect();

        let mismatches = exam::answer_key_mismatches(&exams);
        if mismatches > 0 {
            warn!(
                "{} question(s) have a model answer other than the first choice; \
                 the converted file marks \"a\" as correct for every question",
                mismatches
            );
        }

        export::serialize(&exam::transform(&exams))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{ImageStats, ProbeOutcome, ValidatorSettings};
    use crate::error::ConvertError;
    use futures::future::{BoxFuture, FutureExt};
    use serde_json::{json, Value};

    struct AlwaysValid;

    impl ImageProber for AlwaysValid {
        fn probe<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, ProbeOutcome> {
            async { ProbeOutcome::Valid }.boxed()
        }
    }

    fn session() -> Session<AlwaysValid> {
        Session::new(LinkValidator::new(AlwaysValid, ValidatorSettings::default()))
    }

    fn export_json(session: &Session<AlwaysValid>) -> Value {
        let all = session.selection(None);
        serde_json::from_slice(&session.export(&all).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn import_checks_images_of_the_new_set() {
        let mut session = session();
        let run = session
            .import(
                &json!({"sections": [{"questions": [
                    {"contentType": "image", "question": "https://x/1.png"},
                    {"contentType": "image", "question": "https://x/2.png"}
                ]}]})
                .to_string(),
            )
            .unwrap();

        assert_eq!(run.total(), 2);
        assert_eq!(
            run.wait().await,
            ImageStats {
                total: 2,
                working: 2,
                broken: 0,
                pending: 0
            }
        );
    }

    #[tokio::test]
    async fn reimport_fully_replaces_previous_set() {
        let mut session = session();
        session
            .import(&json!([{"name": "A", "sections": [{"questions": [{"question": "from A"}]}]}]).to_string())
            .unwrap();
        session
            .import(&json!([{"name": "B", "sections": [{"questions": [{"question": "from B"}]}]}]).to_string())
            .unwrap();

        let out = export_json(&session);
        assert_eq!(out.as_array().unwrap().len(), 1);
        assert_eq!(out[0]["title"], "B");
        assert!(!out.to_string().contains("from A"));
    }

    #[tokio::test]
    async fn parse_error_keeps_previous_set_and_checks() {
        let mut session = session();
        let first = session
            .import(&json!({"name": "A", "sections": [{"questions": [{"contentType": "image", "question": "u"}]}]}).to_string())
            .unwrap();
        let generation = first.generation();

        let err = session.import("[{]").unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));
        assert_eq!(session.documents().len(), 1);
        assert_eq!(session.validator().generation(), generation);
        first.wait().await;
    }

    #[test]
    fn export_of_empty_set_is_refused() {
        let mut session = session();
        session.load("[]").unwrap();
        let all = session.selection(None);
        assert!(matches!(session.export(&all), Err(ConvertError::ExportRefused)));
    }

    #[test]
    fn filter_with_no_match_is_refused_too() {
        let mut session = session();
        session.load(r#"[{"name": "Physics"}]"#).unwrap();
        let selected = session.selection(Some("chemistry"));
        assert!(matches!(
            session.export(&selected),
            Err(ConvertError::ExportRefused)
        ));
    }

    #[test]
    fn end_to_end_conversion() {
        let mut session = session();
        session
            .load(
                r#"[{"name":"T1","timer":60,"sections":[{"text":"S","questions":[
                    {"_id":"q1","number":0,"contentType":"text","question":"2+2?",
                     "choices":["3","4"],"modelAnswer":"4","fullDegree":5}]}]}]"#,
            )
            .unwrap();

        assert_eq!(
            export_json(&session),
            json!([{
                "title": "T1",
                "duration": 60,
                "questions": [{
                    "title": "Question 1",
                    "options": {"a": "3", "b": "4", "c": "ج", "d": "د"},
                    "correctAnswer": "a",
                    "imageUrl": "2+2?"
                }]
            }])
        );
    }
}
