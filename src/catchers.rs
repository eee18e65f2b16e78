//! Turns every response Rocket produces on its own (unmatched routes, failed
//! guards, oversized bodies) into the error envelope.

use rocket::http::Status;
use rocket::{catch, catchers, Catcher, Request};

use crate::internal_error::InternalError;
use crate::rate_limit::{CachedRejection, LimitKind};

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        not_found,
        payload_too_large,
        unprocessable_entity,
        too_many_requests,
        internal_error,
        default_catcher,
    ]
}

#[catch(400)]
pub fn bad_request() -> InternalError {
    InternalError::InvalidRequest
}

#[catch(404)]
pub fn not_found() -> InternalError {
    InternalError::RouteNotFound
}

#[catch(413)]
pub fn payload_too_large() -> InternalError {
    InternalError::PayloadTooLarge
}

/// Path or query parameters that failed to parse.
#[catch(422)]
pub fn unprocessable_entity() -> InternalError {
    InternalError::InvalidRequest
}

#[catch(429)]
pub fn too_many_requests(req: &Request<'_>) -> InternalError {
    match req.local_cache(|| CachedRejection(None)).0 {
        Some(rejection) => InternalError::from(&rejection),
        None => InternalError::RateLimited {
            code: LimitKind::General.code(),
            message: LimitKind::General.message(),
            retry_after: None,
        },
    }
}

#[catch(500)]
pub fn internal_error() -> InternalError {
    InternalError::Internal(String::from("unhandled failure"))
}

#[catch(default)]
pub fn default_catcher(status: Status, _req: &Request<'_>) -> InternalError {
    match status.code {
        408 => InternalError::Timeout(status.to_string()),
        503 => InternalError::Unavailable(status.to_string()),
        code if code >= 500 => InternalError::Internal(status.to_string()),
        _ => InternalError::InvalidRequest,
    }
}
