//! Request spans carry the authenticated member.

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use peerly::config::Config;
use std::collections::BTreeMap;
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Clone, Default)]
struct UserIdRecorder {
    declared: Arc<Mutex<Vec<String>>>,
    recorded: Arc<Mutex<Vec<String>>>,
}

struct UserIdVisitor(Option<String>);

impl Visit for UserIdVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "user_id" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "user_id" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for UserIdRecorder {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().fields().field("user_id").is_some() {
            self.declared
                .lock()
                .unwrap()
                .push(attrs.metadata().name().to_string());
        }
    }

    fn on_record(&self, _id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = UserIdVisitor(None);
        values.record(&mut visitor);
        if let Some(user_id) = visitor.0 {
            self.recorded.lock().unwrap().push(user_id);
        }
    }
}

#[tokio::test]
async fn authenticated_request_span_records_user_id() {
    let recorder = UserIdRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.jwt_secret = "trace-test-secret".to_string();
    config.auth.pbkdf2_iterations = 1_000;
    config.scheduler.enabled = false;

    let state = peerly::api::create_app_state_from_config(config)
        .await
        .unwrap();
    let app = peerly::api::router(state.clone());

    let claims = BTreeMap::from([
        ("sub".to_string(), "21BCE0001".to_string()),
        ("reg_number".to_string(), "21BCE0001".to_string()),
    ]);
    let token = state.tokens().issue(claims, 5).unwrap();

    let request = Request::builder()
        .uri("/api/reviews/people")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(
        recorder
            .declared
            .lock()
            .unwrap()
            .iter()
            .any(|name| name == "request")
    );
    assert_eq!(*recorder.recorded.lock().unwrap(), vec!["21BCE0001".to_string()]);

    let request = Request::builder()
        .uri("/api/reviews/people")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(recorder.recorded.lock().unwrap().len(), 1);
}
