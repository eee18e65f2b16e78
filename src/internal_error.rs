use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rusqlite::{ffi, ErrorCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use std::sync::PoisonError;

use crate::config::AppConfig;
use crate::validation::FieldError;

/// Every failure a handler can report, already classified by what the
/// client should see.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid request parameters")]
    InvalidRequest,

    #[error("Malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("{message}")]
    Rule {
        code: &'static str,
        message: String,
    },

    #[error("{entity} not found")]
    NotFound {
        entity: &'static str,
        code: &'static str,
    },

    #[error("Route not found")]
    RouteNotFound,

    #[error("{field} already exists")]
    Duplicate { field: String },

    #[error("{message}")]
    RateLimited {
        code: &'static str,
        message: &'static str,
        retry_after: Option<u64>,
    },

    #[error("Request entity too large")]
    PayloadTooLarge,

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Service temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, InternalError>;

impl InternalError {
    pub fn rule(code: &'static str, message: impl Into<String>) -> InternalError {
        InternalError::Rule {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            InternalError::Validation(_)
            | InternalError::InvalidRequest
            | InternalError::MalformedJson(_)
            | InternalError::Rule { .. }
            | InternalError::Duplicate { .. } => Status::BadRequest,
            InternalError::NotFound { .. } | InternalError::RouteNotFound => Status::NotFound,
            InternalError::RateLimited { .. } => Status::TooManyRequests,
            InternalError::PayloadTooLarge => Status::PayloadTooLarge,
            InternalError::Timeout(_) => Status::RequestTimeout,
            InternalError::Unavailable(_) => Status::ServiceUnavailable,
            InternalError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            InternalError::Validation(_) | InternalError::InvalidRequest => "VALIDATION_ERROR",
            InternalError::MalformedJson(_) => "MALFORMED_JSON",
            InternalError::Rule { code, .. } => code,
            InternalError::NotFound { code, .. } => code,
            InternalError::RouteNotFound => "ROUTE_NOT_FOUND",
            InternalError::Duplicate { .. } => "DUPLICATE_FIELD",
            InternalError::RateLimited { code, .. } => code,
            InternalError::PayloadTooLarge => "REQUEST_TOO_LARGE",
            InternalError::Timeout(_) => "REQUEST_TIMEOUT",
            InternalError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            InternalError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show any client. Server-side failures never leak
    /// their cause here.
    pub fn public_message(&self) -> String {
        match self {
            InternalError::Timeout(_) => String::from("Request timeout"),
            InternalError::Unavailable(_) => String::from("Service temporarily unavailable"),
            InternalError::Internal(_) => String::from("Internal server error"),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<String>,
    timestamp: DateTime<Utc>,
    path: String,
    method: &'static str,
}

impl<'r> Responder<'r, 'static> for InternalError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let expose = req
            .rocket()
            .state::<AppConfig>()
            .map(|config| config.expose_errors)
            .unwrap_or(false);
        let client = req
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| String::from("unknown"));

        if status.code >= 500 {
            error!(method = %req.method(), path = %req.uri().path(), %client, code = self.code(), error = %self, "request failed");
        } else if status == Status::TooManyRequests {
            warn!(method = %req.method(), path = %req.uri().path(), %client, code = self.code(), "request rejected");
        } else {
            debug!(method = %req.method(), path = %req.uri().path(), %client, code = self.code(), error = %self, "request rejected");
        }

        let retry_after = match &self {
            InternalError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        };
        let field = match &self {
            InternalError::Duplicate { field } => Some(field.clone()),
            _ => None,
        };
        let debug = if expose && status.code >= 500 {
            Some(self.to_string())
        } else {
            None
        };
        let error = self.public_message();
        let code = self.code();
        let details = match self {
            InternalError::Validation(details) => Some(details),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error,
            code,
            details,
            field,
            retry_after,
            debug,
            timestamp: Utc::now(),
            path: req.uri().path().to_string(),
            method: req.method().as_str(),
        };

        let mut response = (status, Json(body)).respond_to(req)?;
        if let Some(seconds) = retry_after {
            response.set_raw_header("Retry-After", seconds.to_string());
        }

        Ok(response)
    }
}

impl<T> From<PoisonError<T>> for InternalError {
    fn from(e: PoisonError<T>) -> InternalError {
        InternalError::Internal(e.to_string())
    }
}

impl From<rusqlite::Error> for InternalError {
    fn from(e: rusqlite::Error) -> InternalError {
        if let rusqlite::Error::SqliteFailure(failure, message) = &e {
            match failure.code {
                ErrorCode::ConstraintViolation
                    if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                        || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    return InternalError::Duplicate {
                        field: duplicate_field(message.as_deref()),
                    };
                }
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    return InternalError::Timeout(e.to_string());
                }
                ErrorCode::CannotOpen => return InternalError::Unavailable(e.to_string()),
                _ => {}
            }
        }

        InternalError::Internal(e.to_string())
    }
}

/// Column named by a `UNIQUE constraint failed: table.column, ...` message.
fn duplicate_field(message: Option<&str>) -> String {
    message
        .and_then(|message| message.split(": ").nth(1))
        .and_then(|columns| columns.split(',').next())
        .map(|column| column.trim())
        .map(|column| column.rsplit('.').next().unwrap_or(column).to_string())
        .unwrap_or_else(|| String::from("record"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), Some(message.to_string()))
    }

    #[test]
    fn unique_violation_names_the_first_column() {
        let error = InternalError::from(sqlite_failure(
            ffi::SQLITE_CONSTRAINT_UNIQUE,
            "UNIQUE constraint failed: goal_milestones.goal_id, goal_milestones.num",
        ));

        match error {
            InternalError::Duplicate { ref field } => assert_eq!(field, "goal_id"),
            ref other => panic!("unexpected classification {other:?}"),
        }
        assert_eq!(error.code(), "DUPLICATE_FIELD");
        assert_eq!(error.status(), Status::BadRequest);
        assert_eq!(error.public_message(), "goal_id already exists");
    }

    #[test]
    fn busy_database_is_a_timeout() {
        let error = InternalError::from(sqlite_failure(ffi::SQLITE_BUSY, "database is locked"));
        assert_eq!(error.status(), Status::RequestTimeout);
        assert_eq!(error.code(), "REQUEST_TIMEOUT");
        assert_eq!(error.public_message(), "Request timeout");
    }

    #[test]
    fn unopenable_database_is_unavailable() {
        let error = InternalError::from(sqlite_failure(ffi::SQLITE_CANTOPEN, "unable to open"));
        assert_eq!(error.status(), Status::ServiceUnavailable);
        assert_eq!(error.code(), "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn other_sqlite_errors_hide_their_cause() {
        let error = InternalError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(error.status(), Status::InternalServerError);
        assert_eq!(error.code(), "INTERNAL_ERROR");
        assert_eq!(error.public_message(), "Internal server error");
        assert!(error.to_string().contains("Query returned no rows"));
    }

    #[test]
    fn duplicate_field_falls_back_when_message_is_missing() {
        assert_eq!(duplicate_field(None), "record");
        assert_eq!(duplicate_field(Some("constraint failed")), "record");
        assert_eq!(
            duplicate_field(Some("UNIQUE constraint failed: notes.text")),
            "text"
        );
    }

    #[test]
    fn client_errors_keep_their_message() {
        let error = InternalError::NotFound {
            entity: "Task",
            code: "TASK_NOT_FOUND",
        };
        assert_eq!(error.public_message(), "Task not found");
        assert_eq!(error.status(), Status::NotFound);
        assert_eq!(error.code(), "TASK_NOT_FOUND");
    }
}
