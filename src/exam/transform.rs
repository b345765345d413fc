// src/exam/transform.rs
// =============================================================================
// Converts legacy exams into the normalized export format.
//
// This is a pure function: no I/O, no errors. Anything missing in the source
// falls back to a default:
//   - name missing or empty   -> "Untitled Exam"
//   - timer missing or zero   -> 90
//   - choice missing or empty -> its Arabic placeholder letter (أ ب ج د)
//   - number missing          -> running position of the question in the exam
//
// Two behaviors are kept on purpose even though they look odd:
//   - correctAnswer is ALWAYS "a". The real modelAnswer is dropped.
//     `answer_key_mismatches` counts how many questions lose information
//     this way so callers can warn the user.
//   - imageUrl is copied from the `question` field for every question,
//     including text questions.
// =============================================================================

use super::model::{ImportedExam, NormalizedExam, NormalizedQuestion, OptionSet, Question};
use serde_json::Number;

pub const DEFAULT_TITLE: &str = "Untitled Exam";
pub const DEFAULT_DURATION_MINUTES: u64 = 90;
pub const FIXED_CORRECT_ANSWER: &str = "a";

/// Placeholders for choices a..d when the source has fewer than four
pub const CHOICE_PLACEHOLDERS: [&str; 4] = ["أ", "ب", "ج", "د"];

/// Converts every exam, preserving exam order and section-then-question order
pub fn transform(exams: &[ImportedExam]) -> Vec<NormalizedExam> {
    exams.iter().map(transform_exam).collect()
}

fn transform_exam(exam: &ImportedExam) -> NormalizedExam {
    let title = match exam.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_TITLE.to_string(),
    };

    let duration = match &exam.timer {
        Some(timer) if !is_zero(timer) => timer.clone(),
        _ => Number::from(DEFAULT_DURATION_MINUTES),
    };

    let questions = exam
        .sections()
        .iter()
        .flat_map(|section| section.questions())
        .enumerate()
        .map(|(position, question)| transform_question(question, position))
        .collect();

    NormalizedExam {
        title,
        duration,
        questions,
    }
}

// `position` is the 0-based index of the question across the whole exam,
// used only when the source question has no number
fn transform_question(question: &Question, position: usize) -> NormalizedQuestion {
    let number = question.number.unwrap_or(position as i64);

    NormalizedQuestion {
        title: format!("Question {}", number.saturating_add(1)),
        options: options_from_choices(question.choices()),
        correct_answer: FIXED_CORRECT_ANSWER.to_string(),
        image_url: question.question.clone(),
    }
}

fn options_from_choices(choices: &[String]) -> OptionSet {
    let slot = |i: usize| match choices.get(i) {
        Some(choice) if !choice.is_empty() => choice.clone(),
        _ => CHOICE_PLACEHOLDERS[i].to_string(),
    };

    OptionSet {
        a: slot(0),
        b: slot(1),
        c: slot(2),
        d: slot(3),
    }
}

fn is_zero(n: &Number) -> bool {
    n.as_f64().map_or(false, |v| v == 0.0)
}

/// Counts questions whose modelAnswer is not the first choice, i.e. the
/// questions where the fixed "a" answer key is wrong
pub fn answer_key_mismatches(exams: &[ImportedExam]) -> usize {
    exams
        .iter()
        .flat_map(|exam| exam.sections())
        .flat_map(|section| section.questions())
        .filter(|q| match q.model_answer.as_deref() {
            Some(answer) => q.choices().first().map(String::as_str) != Some(answer),
            None => false,
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::Section;
    use serde_json::json;

    fn exam_from(value: serde_json::Value) -> ImportedExam {
        serde_json::from_value(value).unwrap()
    }

    fn question(number: i64, choices: &[&str]) -> Question {
        Question {
            id: Some(format!("q{}", number)),
            number: Some(number),
            question: Some(format!("body {}", number)),
            choices: Some(choices.iter().map(|c| c.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn absent_or_empty_sections_yield_no_questions() {
        let cases = [
            json!({"name": "A"}),
            json!({"name": "A", "sections": []}),
            json!({"name": "A", "sections": [{"text": "S"}]}),
            json!({"name": "A", "sections": [{"text": "S", "questions": []}]}),
        ];
        for case in cases {
            let out = transform_exam(&exam_from(case));
            assert!(out.questions.is_empty());
            assert_eq!(out.title, "A");
        }
    }

    #[test]
    fn defaults_for_missing_name_and_timer() {
        let out = transform_exam(&ImportedExam::default());
        assert_eq!(out.title, "Untitled Exam");
        assert_eq!(out.duration, Number::from(90));
    }

    #[test]
    fn empty_name_and_zero_timer_also_default() {
        let out = transform_exam(&exam_from(json!({"name": "", "timer": 0})));
        assert_eq!(out.title, "Untitled Exam");
        assert_eq!(out.duration, Number::from(90));
    }

    #[test]
    fn pads_missing_choices_with_placeholders() {
        let options = options_from_choices(&["X".to_string()]);
        assert_eq!(
            options,
            OptionSet {
                a: "X".into(),
                b: "ب".into(),
                c: "ج".into(),
                d: "د".into(),
            }
        );
    }

    #[test]
    fn no_choices_at_all_gives_all_placeholders() {
        let options = options_from_choices(&[]);
        assert_eq!(options.a, "أ");
        assert_eq!(options.d, "د");
    }

    #[test]
    fn correct_answer_is_always_a() {
        let mut q = question(0, &["1", "2", "3", "4"]);
        q.model_answer = Some("4".into());
        let exam = ImportedExam {
            sections: Some(vec![Section {
                text: None,
                questions: Some(vec![q]),
            }]),
            ..Default::default()
        };

        let out = transform_exam(&exam);
        assert_eq!(out.questions[0].correct_answer, "a");
        assert_eq!(answer_key_mismatches(&[exam]), 1);
    }

    #[test]
    fn image_url_copied_even_for_text_questions() {
        let exam = exam_from(json!({
            "sections": [{"questions": [{"contentType": "text", "question": "What is 1+1?"}]}]
        }));
        let out = transform_exam(&exam);
        assert_eq!(out.questions[0].image_url.as_deref(), Some("What is 1+1?"));
    }

    #[test]
    fn preserves_exam_section_question_order() {
        let make_exam = |base: i64| ImportedExam {
            name: Some(format!("exam {}", base)),
            sections: Some(vec![
                Section {
                    text: None,
                    questions: Some(vec![question(base, &[]), question(base + 1, &[])]),
                },
                Section {
                    text: None,
                    questions: Some(vec![question(base + 2, &[]), question(base + 3, &[])]),
                },
            ]),
            ..Default::default()
        };

        let out = transform(&[make_exam(0), make_exam(10)]);
        let urls: Vec<_> = out
            .iter()
            .flat_map(|e| e.questions.iter())
            .map(|q| q.image_url.clone().unwrap())
            .collect();

        assert_eq!(urls.len(), 8);
        assert_eq!(
            urls,
            vec![
                "body 0", "body 1", "body 2", "body 3", "body 10", "body 11", "body 12", "body 13"
            ]
        );
        assert_eq!(out[1].title, "exam 10");
    }

    #[test]
    fn missing_number_falls_back_to_position() {
        let exam = exam_from(json!({
            "sections": [
                {"questions": [{"question": "x"}]},
                {"questions": [{"question": "y"}]}
            ]
        }));
        let out = transform_exam(&exam);
        assert_eq!(out.questions[0].title, "Question 1");
        assert_eq!(out.questions[1].title, "Question 2");
    }

    #[test]
    fn largest_number_does_not_overflow() {
        let exam = exam_from(json!({
            "sections": [{"questions": [{"number": i64::MAX}, {"number": -1}]}]
        }));
        let out = transform_exam(&exam);
        assert_eq!(out.questions[0].title, format!("Question {}", i64::MAX));
        assert_eq!(out.questions[1].title, "Question 0");
    }

    #[test]
    fn mistyped_fields_still_convert() {
        let exam = exam_from(json!({
            "name": 123,
            "timer": "60",
            "sections": [{"questions": [
                {"number": 1.0, "question": 5, "choices": [null]},
                {"number": "2", "choices": ["x", null, 3]}
            ]}]
        }));

        let out = serde_json::to_value(transform(&[exam])).unwrap();
        assert_eq!(
            out,
            json!([{
                "title": "123",
                "duration": 60,
                "questions": [
                    {
                        "title": "Question 2",
                        "options": {"a": "أ", "b": "ب", "c": "ج", "d": "د"},
                        "correctAnswer": "a",
                        "imageUrl": "5"
                    },
                    {
                        "title": "Question 3",
                        "options": {"a": "x", "b": "ب", "c": "3", "d": "د"},
                        "correctAnswer": "a"
                    }
                ]
            }])
        );
    }

    #[test]
    fn end_to_end_example() {
        let exam = exam_from(json!({
            "name": "T1",
            "timer": 60,
            "sections": [{
                "text": "S",
                "questions": [{
                    "_id": "q1",
                    "number": 0,
                    "contentType": "text",
                    "question": "2+2?",
                    "choices": ["3", "4"],
                    "modelAnswer": "4",
                    "fullDegree": 5
                }]
            }]
        }));

        let out = serde_json::to_value(transform(&[exam])).unwrap();
        assert_eq!(
            out,
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
