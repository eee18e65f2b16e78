use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;

use crate::listing::Pagination;

#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Successful response wrapped in the `{success, data}` envelope.
#[derive(Debug)]
pub struct Reply<T> {
    status: Status,
    envelope: Envelope<T>,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(data: T) -> Reply<T> {
        Reply {
            status: Status::Ok,
            envelope: Envelope {
                success: true,
                data,
                message: None,
                pagination: None,
            },
        }
    }

    pub fn created(data: T) -> Reply<T> {
        Reply {
            status: Status::Created,
            ..Reply::ok(data)
        }
    }

    pub fn with_message(mut self, message: &'static str) -> Reply<T> {
        self.envelope.message = Some(message);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Reply<T> {
        self.envelope.pagination = Some(pagination);
        self
    }
}

impl<'r, T: Serialize> Responder<'r, 'static> for Reply<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        (self.status, Json(self.envelope)).respond_to(req)
    }
}

/// Body of a successful delete.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct Deleted {
    pub id: i64,
}
