use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use peerly::config::Config;
use peerly::domain::{MonthBucket, next_month_boundary};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Arc<peerly::api::AppState>, Router) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    // Keeps the KDF fast in debug builds; production startup rejects this.
    config.auth.pbkdf2_iterations = 1_000;
    config.scheduler.enabled = false;

    let state = peerly::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    let router = peerly::api::router(state.clone());
    (state, router)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn signup_body(name: &str, reg_number: &str, email: &str) -> Value {
    json!({
        "name": name,
        "regNumber": reg_number,
        "mobile": "9876543210",
        "vitEmail": email,
        "personalEmail": format!("personal.{email}"),
        "teamNumber": "7",
        "codename": format!("{name}-cn"),
        "password": "secret123",
        "residenceType": "hostel",
        "hostelType": "MH",
        "blockRoom": "A-101"
    })
}

async fn signup(app: &Router, name: &str, reg_number: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body(name, reg_number, email)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signup failed: {body}");
    body["data"]["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_root_and_health() {
    let (_state, app) = spawn_app().await;

    let (status, body) = send(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["data"]["message"]
            .as_str()
            .unwrap()
            .contains("running")
    );

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, _) = send(&app, "GET", "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_and_login_issue_tokens() {
    let (state, app) = spawn_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body("asha", "21BCE0001", "asha@vit.ac.in")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["access_token"], body["data"]["token"]);

    let claims = state
        .tokens()
        .validate(body["data"]["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.get("sub"), Some("asha@vit.ac.in"));
    assert_eq!(claims.get("reg_number"), Some("21BCE0001"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"regNumber": "21BCE0001", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let claims = state
        .tokens()
        .validate(body["data"]["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.get("sub"), Some("21BCE0001"));
    assert_eq!(claims.get("reg_number"), Some("21BCE0001"));
}

#[tokio::test]
async fn test_stored_credential_is_not_plaintext() {
    let (state, app) = spawn_app().await;
    signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;

    let (_, stored) = state
        .store()
        .get_user_with_password("21BCE0001")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.starts_with("pbkdf2_sha256$1000$"));
    assert!(!stored.contains("secret123"));
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let (_state, app) = spawn_app().await;
    signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body("other", "21BCE0001", "other@vit.ac.in")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(signup_body("other", "21BCE0999", "asha@vit.ac.in")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation() {
    let (_state, app) = spawn_app().await;

    let mut short = signup_body("asha", "21BCE0001", "asha@vit.ac.in");
    short["password"] = json!("12345");
    let (status, _) = send(&app, "POST", "/api/auth/signup", None, Some(short)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_email = signup_body("asha", "21BCE0001", "not-an-email");
    let (status, _) = send(&app, "POST", "/api/auth/signup", None, Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut blank = signup_body("asha", "21BCE0001", "asha@vit.ac.in");
    blank["name"] = json!("   ");
    let (status, _) = send(&app, "POST", "/api/auth/signup", None, Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let (_state, app) = spawn_app().await;

    let mut missing = signup_body("asha", "21BCE0001", "asha@vit.ac.in");
    missing.as_object_mut().unwrap().remove("codename");
    let (status, body) = send(&app, "POST", "/api/auth/signup", None, Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("codename"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"regNumber": 42, "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let token = signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/reviews",
        Some(&token),
        Some(json!({
            "reviewerRegNumber": "21BCE0001",
            "subjectRegNumber": "21BCE0002",
            "content": "no rating"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("rating"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_signups_for_same_reg_number() {
    let (state, app) = spawn_app().await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..5 {
        let app = app.clone();
        tasks.spawn(async move {
            let name = format!("racer{i}");
            let body = signup_body(&name, "21BCE0777", &format!("{name}@vit.ac.in"));
            send(&app, "POST", "/api/auth/signup", None, Some(body)).await
        });
    }

    let mut statuses = Vec::new();
    while let Some(result) = tasks.join_next().await {
        let (status, body) = result.unwrap();
        if status != StatusCode::OK {
            assert_eq!(body["success"], false);
        }
        statuses.push(status);
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(),
        4,
        "unexpected statuses: {statuses:?}"
    );

    let people = state.store().list_people(None).await.unwrap();
    assert_eq!(people.len(), 1);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (_state, app) = spawn_app().await;
    signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;

    let (wrong_status, wrong_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"regNumber": "21BCE0001", "password": "not-the-password"})),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"regNumber": "21BCE9999", "password": "secret123"})),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let (state, app) = spawn_app().await;

    let (status, _) = send(&app, "GET", "/api/reviews/people", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/reviews/people", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let claims = BTreeMap::from([("sub".to_string(), "21BCE0001".to_string())]);
    let expired = state
        .tokens()
        .issue_at(claims.clone(), 1, Utc::now() - Duration::minutes(5))
        .unwrap();
    let (status, _) = send(&app, "GET", "/api/reviews/people", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let fresh = state.tokens().issue(claims, 5).unwrap();
    let (status, _) = send(&app, "GET", "/api/reviews/people", Some(&fresh), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_review_round_trip_and_monthly_purge() {
    let (state, app) = spawn_app().await;
    let token = signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;
    signup(&app, "bilal", "21BCE0002", "bilal@vit.ac.in").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/reviews",
        Some(&token),
        Some(json!({
            "reviewerRegNumber": "21BCE0001",
            "subjectRegNumber": "21BCE0002",
            "content": "Great teammate",
            "rating": 4
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["id"].as_i64().unwrap() > 0);

    let (status, body) = send(
        &app,
        "GET",
        "/api/reviews?subjectRegNumber=21BCE0002",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reviews = body["data"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["reviewerRegNumber"], "21BCE0001");
    assert_eq!(reviews[0]["rating"], 4);
    assert_eq!(reviews[0]["monthYear"], MonthBucket::current().as_str());

    // Purge as it would run once the month has rolled over.
    let next_month = MonthBucket::from_timestamp(next_month_boundary(Utc::now()));
    let removed = state.store().purge_reviews_outside(&next_month).await.unwrap();
    assert_eq!(removed, 1);

    let (status, body) = send(
        &app,
        "GET",
        "/api/reviews?subjectRegNumber=21BCE0002",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_review_validation() {
    let (_state, app) = spawn_app().await;
    let token = signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;
    signup(&app, "bilal", "21BCE0002", "bilal@vit.ac.in").await;

    for rating in [0, 6] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/reviews",
            Some(&token),
            Some(json!({
                "reviewerRegNumber": "21BCE0001",
                "subjectRegNumber": "21BCE0002",
                "content": "ok",
                "rating": rating
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/reviews",
        Some(&token),
        Some(json!({
            "reviewerRegNumber": "21BCE0001",
            "subjectRegNumber": "21BCE0404",
            "content": "who?",
            "rating": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Reviewer or subject not found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/reviews",
        Some(&token),
        Some(json!({
            "reviewerRegNumber": "21BCE0001",
            "subjectRegNumber": "21BCE0002",
            "content": "  ",
            "rating": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reviews_without_subject_is_empty() {
    let (_state, app) = spawn_app().await;
    let token = signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;

    for uri in ["/api/reviews", "/api/reviews?subjectRegNumber="] {
        let (status, body) = send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }
}

#[tokio::test]
async fn test_people_directory_excludes_caller() {
    let (_state, app) = spawn_app().await;
    let token = signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;
    signup(&app, "bilal", "21BCE0002", "bilal@vit.ac.in").await;
    signup(&app, "chen", "21BCE0003", "chen@vit.ac.in").await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/reviews/people?excludeRegNumber=21BCE0001",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            {"name": "bilal", "regNumber": "21BCE0002"},
            {"name": "chen", "regNumber": "21BCE0003"}
        ])
    );

    let (_, body) = send(&app, "GET", "/api/reviews/people", Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_purge_stale_keeps_current_month() {
    let (state, app) = spawn_app().await;
    let token = signup(&app, "asha", "21BCE0001", "asha@vit.ac.in").await;
    signup(&app, "bilal", "21BCE0002", "bilal@vit.ac.in").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/reviews",
        Some(&token),
        Some(json!({
            "reviewerRegNumber": "21BCE0001",
            "subjectRegNumber": "21BCE0002",
            "content": "Solid month",
            "rating": 5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let last_year = Utc::now() - Duration::days(400);
    state
        .store()
        .review_repo()
        .insert_at(
            peerly::db::NewReview {
                reviewer_reg_number: "21BCE0001".to_string(),
                subject_reg_number: "21BCE0002".to_string(),
                content: "Old news".to_string(),
                rating: 1,
            },
            last_year,
        )
        .await
        .unwrap();

    let removed = state.review_service().purge_stale().await.unwrap();
    assert_eq!(removed, 1);

    let remaining = state
        .review_service()
        .reviews_for_subject("21BCE0002")
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content, "Solid month");
}
