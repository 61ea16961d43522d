// src/classifier/response.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Category name -> unnormalized weight.
pub type Distribution = BTreeMap<String, f64>;

pub const REQUIRED_FIELDS: [&str; 7] = [
    "direction",
    "significance_score",
    "topics",
    "timeline",
    "aggressiveness",
    "ai_relevance_score",
    "overall_confidence",
];

/// The classifier's structured judgment about one fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub direction: Distribution,
    pub significance_score: f64,
    pub topics: Distribution,
    pub timeline: Distribution,
    pub aggressiveness: Distribution,
    pub ai_relevance_score: f64,
    pub overall_confidence: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No JSON object found in reply")]
    NoObject,

    #[error("Malformed JSON object: {0}")]
    Malformed(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' has the wrong shape: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl Annotation {
    /// First field that falls outside its documented range, if any.
    /// The parser never checks ranges; callers decide what to do with this.
    pub fn range_violation(&self) -> Option<String> {
        let scalars = [
            ("significance_score", self.significance_score, 3.0),
            ("ai_relevance_score", self.ai_relevance_score, 1.0),
            ("overall_confidence", self.overall_confidence, 1.0),
        ];
        for (name, value, max) in scalars {
            if !value.is_finite() || !(0.0..=max).contains(&value) {
                return Some(format!("{} = {} outside [0, {}]", name, value, max));
            }
        }

        let distributions = [
            ("direction", &self.direction),
            ("topics", &self.topics),
            ("timeline", &self.timeline),
            ("aggressiveness", &self.aggressiveness),
        ];
        for (name, distribution) in distributions {
            if let Some((category, value)) = distribution.iter().find(|(_, v)| !v.is_finite() || **v < 0.0) {
                return Some(format!("{}[{}] = {} is negative or not finite", name, category, value));
            }
        }
        None
    }
}

/// Returns the first brace-balanced `{...}` span in `reply`.
///
/// `Ok(None)` when there is no opening brace at all; `Err` when one opens but never closes.
fn find_object(reply: &str) -> Result<Option<&str>, ParseError> {
    let Some(start) = reply.find('{') else {
        return Ok(None);
    };

    let mut depth = 0usize;
    for (offset, byte) in reply.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(&reply[start..=start + offset]));
                }
            }
            _ => {}
        }
    }
    Err(ParseError::Malformed(format!("object opened at byte {} is never closed", start)))
}

fn scalar(object: &Map<String, Value>, field: &'static str) -> Result<f64, ParseError> {
    object[field].as_f64().ok_or_else(|| ParseError::InvalidField {
        field,
        reason: format!("expected a number, got {}", object[field]),
    })
}

fn distribution(object: &Map<String, Value>, field: &'static str) -> Result<Distribution, ParseError> {
    let entries = object[field].as_object().ok_or_else(|| ParseError::InvalidField {
        field,
        reason: format!("expected an object of probabilities, got {}", object[field]),
    })?;

    entries
        .iter()
        .map(|(category, value)| {
            value
                .as_f64()
                .map(|v| (category.clone(), v))
                .ok_or_else(|| ParseError::InvalidField {
                    field,
                    reason: format!("category '{}' is not a number", category),
                })
        })
        .collect()
}

/// Extracts and validates the single structured object in a classifier reply,
/// ignoring any prose around it.
pub fn parse(reply: &str) -> Result<Annotation, ParseError> {
    let raw_object = find_object(reply)?.ok_or(ParseError::NoObject)?;

    let value: Value = serde_json::from_str(raw_object).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(ParseError::Malformed("top-level value is not an object".to_string()));
    };

    if let Some(missing) = REQUIRED_FIELDS.iter().copied().find(|f| !object.contains_key(*f)) {
        return Err(ParseError::MissingField(missing));
    }

    Ok(Annotation {
        direction: distribution(&object, "direction")?,
        significance_score: scalar(&object, "significance_score")?,
        topics: distribution(&object, "topics")?,
        timeline: distribution(&object, "timeline")?,
        aggressiveness: distribution(&object, "aggressiveness")?,
        ai_relevance_score: scalar(&object, "ai_relevance_score")?,
        overall_confidence: scalar(&object, "overall_confidence")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const VALID_OBJECT: &str = r#"{"direction":{"positive":0.7,"negative":0.1,"other":0.2},"significance_score":2.0,"topics":{"labor":0.1,"investment":0.5,"revenue":0.2,"competition":0.1,"M&A":0.0,"other":0.1},"timeline":{"happened":0.3,"current":0.5,"planning":0.2,"other":0.0},"aggressiveness":{"active":0.8,"passive":0.2,"other":0.0},"ai_relevance_score":0.9,"overall_confidence":0.75}"#;

    #[test]
    fn test_parse_ignores_surrounding_prose() {
        let reply = format!("here is the result: {} thanks", VALID_OBJECT);
        let annotation = parse(&reply).expect("valid annotation");
        assert_eq!(annotation.significance_score, 2.0);
        assert_eq!(annotation.timeline["current"], 0.5);
        assert_eq!(annotation.topics["M&A"], 0.0);
        assert_eq!(annotation.ai_relevance_score, 0.9);
    }

    #[test]
    fn test_parse_takes_first_balanced_object_only() {
        let reply = format!("Result:\n```json\n{}\n```\nAlso see {{\"note\": 1}}", VALID_OBJECT);
        assert!(parse(&reply).is_ok());
        assert_eq!(find_object("a {b {c} d} e {f}").unwrap(), Some("{b {c} d}"));
    }

    #[test]
    fn test_parse_no_object() {
        assert_eq!(parse("I cannot classify this paragraph."), Err(ParseError::NoObject));
        assert_eq!(parse(""), Err(ParseError::NoObject));
    }

    #[test]
    fn test_parse_malformed_is_distinct() {
        assert!(matches!(parse("{\"direction\": {\"positive\": 0.5,}}"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse("text { never closed"), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_parse_missing_field_is_named() {
        let reply = VALID_OBJECT.replace(r#","ai_relevance_score":0.9"#, "");
        assert_eq!(parse(&reply), Err(ParseError::MissingField("ai_relevance_score")));
    }

    #[test]
    fn test_parse_wrong_shape() {
        let reply = VALID_OBJECT.replace(r#""significance_score":2.0"#, r#""significance_score":"high""#);
        assert!(matches!(
            parse(&reply),
            Err(ParseError::InvalidField { field: "significance_score", .. })
        ));
    }

    #[test]
    fn test_parse_does_not_check_ranges() {
        let reply = VALID_OBJECT.replace(r#""ai_relevance_score":0.9"#, r#""ai_relevance_score":4.5"#);
        let annotation = parse(&reply).expect("ranges are the caller's concern");
        assert!(annotation.range_violation().unwrap().contains("ai_relevance_score"));
        assert_eq!(parse(VALID_OBJECT).unwrap().range_violation(), None);
    }
}
