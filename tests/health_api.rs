mod common;

use chrono::{Duration, Utc};
use rocket::http::Status;
use serde_json::json;

use common::*;

#[test]
fn weight_entries_need_a_weight() {
    let client = client();

    let (status, body) = post(&client, "/api/health", json!({"type": "weight", "title": "Morning"}));
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "weight");

    let (status, body) = post(&client, "/api/health", json!({"title": "No type"}));
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[test]
fn stats_include_streak_and_weight() {
    let client = client();
    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);

    for date in [today, yesterday] {
        let (status, _) = post(
            &client,
            "/api/health",
            json!({"type": "workout", "title": "Run", "duration": 30, "calories": 300, "date": date}),
        );
        assert_eq!(status, Status::Created);
    }
    post(&client, "/api/health", json!({"type": "weight", "title": "Scale", "weight": 71.5}));
    post(&client, "/api/health", json!({"type": "water", "title": "Bottle", "water": 1.5}));

    let (status, body) = get(&client, "/api/health/stats");
    assert_eq!(status, Status::Ok);
    let stats = &body["data"];
    assert_eq!(stats["workouts"], 2);
    assert_eq!(stats["totalDuration"], 60);
    assert_eq!(stats["totalCalories"], 600);
    assert_eq!(stats["averageWorkoutDuration"], 30.0);
    assert_eq!(stats["currentWeight"], 71.5);
    assert_eq!(stats["totalWater"], 1.5);
    assert_eq!(stats["workoutStreak"], 2);

    let weekly = stats["weekly"].as_array().expect("weekly breakdown");
    assert_eq!(weekly.len(), 7);
    assert_eq!(weekly[6]["date"], json!(today));
    assert_eq!(weekly[6]["workouts"], 1);
    assert_eq!(weekly[5]["calories"], 300);
    assert_eq!(stats["weightTrend"], json!([{"date": today, "weight": 71.5}]));
}

#[test]
fn oversized_measurements_are_rejected_and_stats_stay_up() {
    let client = client();

    for _ in 0..2 {
        let (status, body) = post(
            &client,
            "/api/health",
            json!({"type": "workout", "title": "Long", "duration": i64::MAX}),
        );
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["details"][0]["field"], "duration");
    }
    let (status, _) = post(
        &client,
        "/api/health",
        json!({"type": "diet", "title": "Feast", "calories": 20_001}),
    );
    assert_eq!(status, Status::BadRequest);

    let (status, _) = post(
        &client,
        "/api/health",
        json!({"type": "workout", "title": "Ultra", "duration": 1440, "calories": 20_000}),
    );
    assert_eq!(status, Status::Created);

    let (status, body) = get(&client, "/api/health/stats");
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["totalDuration"], 1440);

    let (status, _) = get(&client, "/api/dashboard");
    assert_eq!(status, Status::Ok);
}

#[test]
fn listing_filters_by_type_and_range() {
    let client = client();
    let long_ago = Utc::now().date_naive() - Duration::days(400);
    post(&client, "/api/health", json!({"type": "diet", "title": "Salad"}));
    post(&client, "/api/health", json!({"type": "diet", "title": "Soup", "date": long_ago}));
    post(&client, "/api/health", json!({"type": "workout", "title": "Swim"}));

    let (_, body) = get(&client, "/api/health?type=diet");
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = get(&client, "/api/health?type=diet&range=week");
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["title"], "Salad");

    let (status, body) = get(&client, "/api/health?range=quarter");
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["details"][0]["field"], "range");
}

#[test]
fn entries_can_be_replaced_and_deleted() {
    let client = client();
    let (_, body) = post(&client, "/api/health", json!({"type": "water", "title": "Glass", "water": 0.3}));
    let uri = format!("/api/health/{}", id_of(&body));

    let (status, body) = put(&client, &uri, json!({"type": "water", "title": "Jug", "water": 1.0}));
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["title"], "Jug");

    let (status, _) = delete(&client, &uri);
    assert_eq!(status, Status::Ok);
    let (status, body) = get(&client, &uri);
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["code"], "HEALTH_ENTRY_NOT_FOUND");
}
