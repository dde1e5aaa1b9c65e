use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use missionflow::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    build_router(AppState::in_memory())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder.header("content-type", "application/json")
                             .body(Body::from(json.to_string()))
                             .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn ping_reports_store_health() {
    let app = app();
    let (status, body) = call(&app, "GET", "/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "database": "connected"}));
}

#[tokio::test]
async fn workflow_lifecycle_over_http() {
    let app = app();
    let (status, created) = call(&app,
                                 "POST",
                                 "/workflows",
                                 Some(json!({"name": "Launch", "priority": "high", "steps": [{"name": "plan"}, {"name": "ship"}]}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["totalSteps"], 2);
    assert_eq!(created["currentStep"], 1);
    assert_eq!(created["priority"], "high");
    assert_eq!(created["steps"][0]["status"], "active");
    let id = created["id"].as_str().unwrap().to_string();
    let first = created["steps"][0]["id"].as_str().unwrap().to_string();

    let (status, err) = call(&app, "POST", &format!("/workflows/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "STEP_NOT_COMPLETED");

    let (status, done) = call(&app,
                              "POST",
                              &format!("/workflows/{id}/steps/{first}/submit"),
                              Some(json!({"status": "completed"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["steps"][0]["isCompleted"], true);

    let (status, advanced) = call(&app, "POST", &format!("/workflows/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advanced["currentStep"], 2);
    assert_eq!(advanced["steps"][1]["status"], "active");

    let (status, _) = call(&app, "DELETE", &format!("/workflows/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, err) = call(&app, "GET", &format!("/workflows/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_payloads_and_transitions() {
    let app = app();
    let (status, err) = call(&app, "POST", "/workflows", Some(json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (_, created) = call(&app,
                            "POST",
                            "/workflows",
                            Some(json!({"name": "gated", "steps": [{"name": "a"}, {"name": "b"}]}))).await;
    let id = created["id"].as_str().unwrap();
    let second = created["steps"][1]["id"].as_str().unwrap();
    let (status, err) = call(&app,
                             "POST",
                             &format!("/workflows/{id}/steps/{second}/submit"),
                             Some(json!({"status": "active"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn active_workflow_endpoint() {
    let app = app();
    let (status, body) = call(&app, "GET", "/workflows/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let (_, a) = call(&app, "POST", "/workflows", Some(json!({"name": "a"}))).await;
    let (_, b) = call(&app, "POST", "/workflows", Some(json!({"name": "b"}))).await;
    let (a, b) = (a["id"].as_str().unwrap().to_string(), b["id"].as_str().unwrap().to_string());

    call(&app, "POST", &format!("/workflows/{a}/activate"), None).await;
    let (status, active) = call(&app, "POST", &format!("/workflows/{b}/activate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["isActive"], true);

    let (_, list) = call(&app, "GET", "/workflows", None).await;
    let flags: Vec<bool> = list.as_array()
                               .unwrap()
                               .iter()
                               .map(|w| w["isActive"].as_bool().unwrap())
                               .collect();
    assert_eq!(flags, vec![false, true]);

    call(&app, "DELETE", &format!("/workflows/{b}"), None).await;
    let (_, body) = call(&app, "GET", "/workflows/active", None).await;
    assert!(body.is_null());
}

#[tokio::test]
async fn composite_sessions_over_http() {
    let app = app();
    let (status, composite) = call(&app,
                                   "POST",
                                   "/composites",
                                   Some(json!({"name": "release", "items": [
                                       {"orderIndex": 0, "step": {"name": "s1"}},
                                       {"orderIndex": 1, "step": {"name": "s2"}}
                                   ]}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let cid = composite["id"].as_str().unwrap().to_string();
    let s1 = composite["steps"][0]["id"].as_str().unwrap().to_string();

    let (status, session) = call(&app, "POST", &format!("/composites/{cid}/sessions"), Some(json!({"name": "team a"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let sid = session["session"]["id"].as_str().unwrap().to_string();
    let (_, other) = call(&app, "POST", &format!("/composites/{cid}/sessions"), None).await;
    let other_id = other["session"]["id"].as_str().unwrap().to_string();

    let (status, view) = call(&app,
                              "POST",
                              &format!("/composite-sessions/{sid}/steps/{s1}/submit"),
                              Some(json!({"status": "completed", "proof": {"content": "done"}}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["steps"][0]["status"], "completed");
    assert_eq!(view["steps"][1]["status"], "active");
    assert_eq!(view["completedSteps"], 1);

    let (_, untouched) = call(&app, "GET", &format!("/composite-sessions/{other_id}"), None).await;
    assert_eq!(untouched["steps"][0]["status"], "active");
    assert_eq!(untouched["steps"][1]["status"], "locked");

    let stray = uuid::Uuid::new_v4();
    let (status, err) = call(&app,
                             "POST",
                             &format!("/composite-sessions/{sid}/steps/{stray}/submit"),
                             Some(json!({"status": "completed"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "STEP_NOT_IN_COMPOSITE");

    let (_, sessions) = call(&app, "GET", &format!("/composite-sessions?compositeId={cid}"), None).await;
    assert_eq!(sessions.as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "DELETE", &format!("/composites/{cid}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &format!("/composite-sessions/{sid}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notes_crud_over_http() {
    let app = app();
    let (status, note) = call(&app, "POST", "/notes", Some(json!({"title": "todo", "content": "buy milk"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = note["id"].as_str().unwrap().to_string();

    let (status, updated) = call(&app, "PUT", &format!("/notes/{id}"), Some(json!({"title": "done"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "done");
    assert_eq!(updated["createdAt"], note["createdAt"]);

    let (_, list) = call(&app, "GET", "/notes", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, err) = call(&app, "POST", "/notes", Some(json!({"title": " "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, _) = call(&app, "DELETE", &format!("/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &format!("/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn call_raw(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder().method(method)
                                    .uri(uri)
                                    .header("content-type", "application/json")
                                    .body(Body::from(body.to_string()))
                                    .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn malformed_input_is_reported_as_validation_error() {
    let app = app();

    let (status, err) = call_raw(&app, "POST", "/workflows", r#"{"name": "x", "totalSteps": "three"}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "VALIDATION_ERROR");
    assert!(err["error"].as_str().unwrap().contains("totalSteps"));

    let (status, err) = call_raw(&app, "POST", "/workflows", r#"{"name": "x""#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, err) = call(&app, "POST", "/workflows/not-a-uuid/advance", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, err) = call(&app, "GET", "/composite-sessions?compositeId=nope", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}
