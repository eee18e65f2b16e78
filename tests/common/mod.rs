#![allow(dead_code)]

use rocket::figment::Figment;
use rocket::http::{ContentType, Status};
use rocket::local::blocking::{Client, LocalResponse};
use rocket::Config;
use serde_json::Value;

/// In-memory service with the limiter switched off.
pub fn client() -> Client {
    client_with(base_figment().merge(("rate_limit.enabled", false)))
}

pub fn base_figment() -> Figment {
    Config::figment()
        .merge(("database", ":memory:"))
        .merge(("log_level", "off"))
}

pub fn client_with(figment: Figment) -> Client {
    Client::tracked(lifeplanner::build(figment)).expect("valid rocket instance")
}

pub fn json_body(response: LocalResponse<'_>) -> Value {
    let body = response.into_string().expect("response body");
    serde_json::from_str(&body).expect("JSON response")
}

pub fn post(client: &Client, uri: &str, body: Value) -> (Status, Value) {
    let response = client
        .post(uri.to_string())
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    (response.status(), json_body(response))
}

pub fn put(client: &Client, uri: &str, body: Value) -> (Status, Value) {
    let response = client
        .put(uri.to_string())
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    (response.status(), json_body(response))
}

pub fn patch(client: &Client, uri: &str, body: Option<Value>) -> (Status, Value) {
    let mut request = client.patch(uri.to_string()).header(ContentType::JSON);
    if let Some(body) = body {
        request = request.body(body.to_string());
    }
    let response = request.dispatch();
    (response.status(), json_body(response))
}

pub fn get(client: &Client, uri: &str) -> (Status, Value) {
    let response = client.get(uri.to_string()).dispatch();
    (response.status(), json_body(response))
}

pub fn delete(client: &Client, uri: &str) -> (Status, Value) {
    let response = client.delete(uri.to_string()).dispatch();
    (response.status(), json_body(response))
}

/// Id of the record in a `{success, data}` envelope.
pub fn id_of(body: &Value) -> i64 {
    body["data"]["id"].as_i64().expect("record id")
}
