mod common;

use rocket::http::Status;
use serde_json::json;

use common::*;

#[test]
fn milestones_drive_progress() {
    let client = client();
    let (status, body) = post(
        &client,
        "/api/goals",
        json!({"title": "Learn Rust", "category": "learning", "milestones": ["Ownership", {"text": "Traits", "completed": false}]}),
    );
    assert_eq!(status, Status::Created);
    assert_eq!(body["data"]["status"], "in-progress");
    assert_eq!(body["data"]["milestones"].as_array().unwrap().len(), 2);
    let id = id_of(&body);

    let (status, body) = patch(&client, &format!("/api/goals/{}/milestones/0/toggle", id), None);
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["milestones"][0]["completed"], true);
    assert_eq!(body["data"]["progress"], 50.0);

    let (status, body) = post(
        &client,
        &format!("/api/goals/{}/milestones", id),
        json!({"text": "Async"}),
    );
    assert_eq!(status, Status::Created);
    assert_eq!(body["data"]["milestones"][2]["text"], "Async");

    let (status, body) = delete(&client, &format!("/api/goals/{}/milestones/2", id));
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["milestones"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["progress"], 50.0);

    let (_, body) = patch(&client, &format!("/api/goals/{}/milestones/1/toggle", id), None);
    assert_eq!(body["data"]["progress"], 100.0);
    assert_eq!(body["data"]["status"], "completed");

    let (_, body) = get(&client, &format!("/api/goals/{}", id));
    assert_eq!(body["data"]["milestones"][1]["completed"], true);
}

#[test]
fn bad_milestone_indexes_are_rejected() {
    let client = client();
    let (_, body) = post(&client, "/api/goals", json!({"title": "Run a marathon"}));
    let id = id_of(&body);

    let (status, body) = patch(&client, &format!("/api/goals/{}/milestones/5/toggle", id), None);
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["code"], "INVALID_MILESTONE_INDEX");

    let (status, body) = delete(&client, &format!("/api/goals/{}/milestones/first", id));
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[test]
fn progress_is_clamped_and_status_completes() {
    let client = client();
    let (_, body) = post(&client, "/api/goals", json!({"title": "Save money"}));
    let id = id_of(&body);

    let (status, body) = patch(
        &client,
        &format!("/api/goals/{}/progress", id),
        Some(json!({"progress": 250})),
    );
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["progress"], 100.0);
    assert_eq!(body["data"]["status"], "completed");

    let (_, body) = patch(
        &client,
        &format!("/api/goals/{}/progress", id),
        Some(json!({"progress": 30})),
    );
    assert_eq!(body["data"]["status"], "in-progress");

    let (_, body) = patch(
        &client,
        &format!("/api/goals/{}/status", id),
        Some(json!({"status": "completed"})),
    );
    assert_eq!(body["data"]["progress"], 100.0);
    assert!(body["data"]["completedAt"].is_string());
}

#[test]
fn goal_stats_and_missing_goals() {
    let client = client();
    post(&client, "/api/goals", json!({"title": "A", "progress": 40, "category": "health"}));
    post(&client, "/api/goals", json!({"title": "B", "status": "completed"}));

    let (status, body) = get(&client, "/api/goals/stats");
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["completed"], 1);
    assert_eq!(body["data"]["averageProgress"], 70.0);
    assert_eq!(body["data"]["byCategory"]["health"], 1);

    let (status, body) = delete(&client, "/api/goals/404");
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["code"], "GOAL_NOT_FOUND");
}
