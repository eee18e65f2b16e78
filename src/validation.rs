use rocket::serde::json::{self, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::io;

use crate::internal_error::{InternalError, InternalResult};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Request bodies normalize themselves (trimming) and then check their
/// fields, collecting every violation before failing.
pub trait Validate {
    fn validate(&mut self) -> InternalResult<()>;
}

/// Unwraps a JSON data guard, mapping transport failures onto the error
/// envelope and running field validation.
pub fn accept<T: Validate>(body: Result<Json<T>, json::Error<'_>>) -> InternalResult<T> {
    let mut value = parse_body(body)?;
    value.validate()?;

    Ok(value)
}

/// Like [`accept`] for bodies whose checks are domain rules rather than
/// field validation.
pub fn parse_body<T>(body: Result<Json<T>, json::Error<'_>>) -> InternalResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(json::Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(InternalError::PayloadTooLarge)
        }
        Err(json::Error::Parse(_, e)) if e.is_data() => {
            Err(InternalError::Validation(vec![FieldError {
                field: "body",
                message: e.to_string(),
                value: None,
            }]))
        }
        Err(e) => Err(InternalError::MalformedJson(e.to_string())),
    }
}

/// `{"status": ...}` body of the status PATCH routes.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct StatusChange {
    pub status: Option<String>,
}

impl StatusChange {
    pub fn parse_with<T>(&self, parse: impl Fn(&str) -> Option<T>) -> InternalResult<T> {
        self.status
            .as_deref()
            .map(str::trim)
            .and_then(parse)
            .ok_or_else(|| InternalError::rule("INVALID_STATUS", "Invalid status value"))
    }
}

/// `{"progress": ...}` body of the progress PATCH routes.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ProgressChange {
    pub progress: Option<f64>,
}

impl ProgressChange {
    /// Progress that must already lie within 0..=100.
    pub fn bounded(&self) -> InternalResult<f64> {
        match self.progress {
            Some(progress) if (0.0..=100.0).contains(&progress) => Ok(progress),
            _ => Err(invalid_progress()),
        }
    }

    /// Any finite progress, clamped into 0..=100.
    pub fn clamped(&self) -> InternalResult<f64> {
        match self.progress {
            Some(progress) if progress.is_finite() => Ok(progress.clamp(0.0, 100.0)),
            _ => Err(invalid_progress()),
        }
    }
}

fn invalid_progress() -> InternalError {
    InternalError::rule("INVALID_PROGRESS", "Progress must be a number between 0 and 100")
}

#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Violations {
        Violations::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>, value: Option<Value>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
            value,
        });
    }

    /// Character count (not bytes) within `min..=max`.
    pub fn length(&mut self, field: &'static str, text: &str, min: usize, max: usize) {
        let count = text.chars().count();
        if count < min || count > max {
            let message = if min == 0 {
                format!("{} must not exceed {} characters", field, max)
            } else {
                format!("{} must be between {} and {} characters", field, min, max)
            };
            self.push(field, message, Some(Value::from(text)));
        }
    }

    pub fn range(&mut self, field: &'static str, number: f64, min: f64, max: f64) {
        if !number.is_finite() || number < min || number > max {
            self.push(
                field,
                format!("{} must be between {} and {}", field, min, max),
                serde_json::Number::from_f64(number).map(Value::Number),
            );
        }
    }

    pub fn optional_range(&mut self, field: &'static str, number: Option<f64>, min: f64, max: f64) {
        if let Some(number) = number {
            self.range(field, number, min, max);
        }
    }

    pub fn require<T>(&mut self, field: &'static str, value: &Option<T>, message: &str) {
        if value.is_none() {
            self.push(field, message, None);
        }
    }

    pub fn finish(self) -> InternalResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(InternalError::Validation(self.errors))
        }
    }
}

pub fn trim(text: &mut String) {
    let trimmed = text.trim();
    if trimmed.len() != text.len() {
        *text = trimmed.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_violation() {
        let mut violations = Violations::new();
        violations.length("title", "", 1, 200);
        violations.length("description", &"x".repeat(1001), 0, 1000);
        violations.range("progress", 140.0, 0.0, 100.0);
        violations.require::<f64>("weight", &None, "weight is required for weight entries");
        violations.optional_range("duration", Some(-5.0), 0.0, 1440.0);
        violations.optional_range("calories", None, 0.0, 20_000.0);

        let errors = match violations.finish() {
            Err(InternalError::Validation(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        };

        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "description", "progress", "weight", "duration"]);
        assert_eq!(errors[0].message, "title must be between 1 and 200 characters");
        assert_eq!(errors[1].message, "description must not exceed 1000 characters");
        assert_eq!(errors[2].value, Some(Value::from(140.0)));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut violations = Violations::new();
        violations.length("title", "éééé", 1, 4);
        assert!(violations.finish().is_ok());
    }

    #[test]
    fn non_finite_numbers_are_out_of_range() {
        let mut violations = Violations::new();
        violations.range("amount", f64::NAN, 0.01, 1_000_000.0);
        assert!(violations.finish().is_err());
    }

    #[test]
    fn status_change_reports_unknown_values_as_a_rule() {
        let change = StatusChange {
            status: Some(String::from(" done ")),
        };
        let parse = |text: &str| if text == "done" { Some(()) } else { None };
        assert!(change.parse_with(parse).is_ok());

        let missing = StatusChange::default().parse_with(parse).unwrap_err();
        assert_eq!(missing.code(), "INVALID_STATUS");
    }

    #[test]
    fn progress_change_bounds_or_clamps() {
        let over = ProgressChange {
            progress: Some(140.0),
        };
        assert_eq!(over.bounded().unwrap_err().code(), "INVALID_PROGRESS");
        assert_eq!(over.clamped().unwrap(), 100.0);
        assert!(ProgressChange::default().clamped().is_err());
        assert_eq!(
            ProgressChange {
                progress: Some(-3.0)
            }
            .clamped()
            .unwrap(),
            0.0
        );
    }

    #[test]
    fn trim_only_allocates_when_needed() {
        let mut text = String::from("  walk the dog ");
        trim(&mut text);
        assert_eq!(text, "walk the dog");

        let mut clean = String::from("ok");
        trim(&mut clean);
        assert_eq!(clean, "ok");
    }
}
