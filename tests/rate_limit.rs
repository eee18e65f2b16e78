mod common;

use rocket::http::Status;
use rocket::local::blocking::Client;
use serde_json::Value;

use std::net::SocketAddr;

use common::*;

fn limited_client(general_max: u64, search_max: u64) -> Client {
    client_with(
        base_figment()
            .merge(("rate_limit.enabled", true))
            .merge(("rate_limit.general.window_secs", 60))
            .merge(("rate_limit.general.max", general_max))
            .merge(("rate_limit.search.window_secs", 60))
            .merge(("rate_limit.search.max", search_max)),
    )
}

fn from(addr: &str) -> SocketAddr {
    addr.parse().unwrap()
}

#[test]
fn rejects_the_request_after_the_limit() {
    let client = limited_client(3, 30);

    for remaining in (0..3).rev() {
        let response = client.get("/api/notes").remote(from("10.0.0.1:4000")).dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.headers().get_one("RateLimit-Limit"), Some("3"));
        assert_eq!(
            response.headers().get_one("RateLimit-Remaining"),
            Some(remaining.to_string().as_str())
        );
    }

    let response = client.get("/api/notes").remote(from("10.0.0.1:4000")).dispatch();
    assert_eq!(response.status(), Status::TooManyRequests);
    assert!(response.headers().get_one("Retry-After").is_some());
    let body: Value = json_body(response);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert!(body["retryAfter"].as_u64().unwrap() >= 1);
}

#[test]
fn clients_are_counted_separately() {
    let client = limited_client(1, 30);

    let first = client.get("/api/tasks").remote(from("10.0.0.1:4000")).dispatch();
    assert_eq!(first.status(), Status::Ok);
    let again = client.get("/api/tasks").remote(from("10.0.0.1:4000")).dispatch();
    assert_eq!(again.status(), Status::TooManyRequests);

    let other = client.get("/api/tasks").remote(from("10.0.0.2:4000")).dispatch();
    assert_eq!(other.status(), Status::Ok);
}

#[test]
fn search_has_its_own_tighter_window() {
    let client = limited_client(100, 1);

    let first = client
        .get("/api/tasks/search?q=milk")
        .remote(from("10.0.0.3:4000"))
        .dispatch();
    assert_eq!(first.status(), Status::Ok);
    assert_eq!(first.headers().get_one("RateLimit-Limit"), Some("1"));

    let second = client
        .get("/api/tasks/search?q=milk")
        .remote(from("10.0.0.3:4000"))
        .dispatch();
    assert_eq!(second.status(), Status::TooManyRequests);
    assert_eq!(json_body(second)["code"], "SEARCH_RATE_LIMIT_EXCEEDED");

    let listing = client.get("/api/tasks").remote(from("10.0.0.3:4000")).dispatch();
    assert_eq!(listing.status(), Status::Ok);
}

#[test]
fn health_check_is_not_limited() {
    let client = limited_client(1, 1);

    for _ in 0..3 {
        let response = client.get("/health").remote(from("10.0.0.4:4000")).dispatch();
        assert_eq!(response.status(), Status::Ok);
    }
}

#[test]
fn disabled_limiter_lets_everything_through() {
    let client = client_with(
        base_figment()
            .merge(("rate_limit.enabled", false))
            .merge(("rate_limit.general.max", 1)),
    );

    for _ in 0..5 {
        assert_eq!(client.get("/api/notes").dispatch().status(), Status::Ok);
    }
}
