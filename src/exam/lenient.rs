// src/exam/lenient.rs
// =============================================================================
// Forgiving field readers for the legacy exam format.
//
// The source documents are hand-edited and come from several exporters, so
// field types drift: "timer": "60", "number": 1.0, "choices": ["x", null, 3].
// Each reader goes through serde_json::Value and never fails:
//   - a usable value is coerced (number <-> string where it makes sense)
//   - anything else becomes None
//
// Used with #[serde(deserialize_with = "...")] on the model fields. The
// structs carry #[serde(default)] so absent fields stay None.
// =============================================================================

use super::model::{ContentType, Question, Scalar, Section};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Strings as-is, numbers and booleans in their JSON spelling
pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(text_from(Value::deserialize(d)?))
}

/// Numbers as-is, numeric strings parsed
pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Number>, D::Error> {
    Ok(number_from(Value::deserialize(d)?))
}

/// Whole numbers only: 2, 2.0 and "2" all give 2
pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let n = match Value::deserialize(d)? {
        Value::Number(n) => n,
        Value::String(s) => match s.trim().parse::<Number>() {
            Ok(n) => n,
            Err(_) => return Ok(None),
        },
        _ => return Ok(None),
    };

    if let Some(i) = n.as_i64() {
        return Ok(Some(i));
    }
    Ok(n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64))
}

pub fn scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Scalar>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => Some(Scalar::Number(n)),
        Value::String(s) => Some(Scalar::Text(s)),
        _ => None,
    })
}

pub fn content_type<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ContentType>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(match s.trim().to_ascii_lowercase().as_str() {
            "image" => ContentType::Image,
            "text" => ContentType::Text,
            _ => ContentType::Other,
        }),
        _ => None,
    })
}

/// Keeps positions: an unusable entry becomes "" so it gets its placeholder
pub fn choices<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| text_from(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}

pub fn sections<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Section>>, D::Error> {
    Ok(objects(Value::deserialize(d)?))
}

pub fn questions<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Question>>, D::Error> {
    Ok(objects(Value::deserialize(d)?))
}

// Array elements that are not objects are skipped
fn objects<T: DeserializeOwned>(value: Value) -> Option<Vec<T>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    }
}

fn text_from(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_from(value: Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::exam::model::{ContentType, ImportedExam, Question, Scalar};
    use serde_json::{json, Number};

    fn question(value: serde_json::Value) -> Question {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn numeric_string_timer_is_parsed() {
        let exam: ImportedExam = serde_json::from_value(json!({"timer": "60"})).unwrap();
        assert_eq!(exam.timer, Some(Number::from(60)));
    }

    #[test]
    fn unusable_timer_is_none() {
        let exam: ImportedExam =
            serde_json::from_value(json!({"timer": "soon", "tries": [1]})).unwrap();
        assert!(exam.timer.is_none());
        assert!(exam.tries.is_none());
    }

    #[test]
    fn numeric_name_becomes_text() {
        let exam: ImportedExam = serde_json::from_value(json!({"name": 123})).unwrap();
        assert_eq!(exam.name.as_deref(), Some("123"));
    }

    #[test]
    fn number_accepts_strings_and_whole_floats() {
        assert_eq!(question(json!({"number": "2"})).number, Some(2));
        assert_eq!(question(json!({"number": 1.0})).number, Some(1));
        assert_eq!(question(json!({"number": 1.5})).number, None);
        assert_eq!(question(json!({"number": true})).number, None);
    }

    #[test]
    fn choices_keep_positions() {
        let q = question(json!({"choices": ["x", null, 3, {"a": 1}]}));
        assert_eq!(q.choices(), ["x", "", "3", ""]);

        assert!(question(json!({"choices": "x"})).choices.is_none());
    }

    #[test]
    fn numeric_question_body_is_text() {
        assert_eq!(question(json!({"question": 5})).question.as_deref(), Some("5"));
    }

    #[test]
    fn content_type_is_case_insensitive() {
        assert_eq!(
            question(json!({"contentType": "IMAGE"})).content_type,
            Some(ContentType::Image)
        );
        assert_eq!(question(json!({"contentType": 1})).content_type, None);
    }

    #[test]
    fn odd_sections_and_questions_are_skipped() {
        let exam: ImportedExam = serde_json::from_value(json!({
            "unit": true,
            "stage": "2",
            "sections": [
                "junk",
                {"text": 7, "questions": [1, {"_id": 9}, null]},
                {"questions": {"not": "a list"}}
            ]
        }))
        .unwrap();

        assert!(exam.unit.is_none());
        assert_eq!(exam.stage, Some(Scalar::Text("2".into())));
        assert_eq!(exam.sections().len(), 2);
        assert_eq!(exam.sections()[0].text.as_deref(), Some("7"));
        assert_eq!(exam.sections()[0].questions()[0].id.as_deref(), Some("9"));
        assert!(exam.sections()[1].questions().is_empty());
    }
}
