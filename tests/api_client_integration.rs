//! Integration tests for the API client interceptor
//!
//! Runs a small axum backend on an ephemeral port and checks bearer
//! attachment, role refresh, 401 handling and error normalisation.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use booking_gate::auth::{Role, RouteTable, TokenDecoder};
use booking_gate::client::{
    ApiClient, AuthSession, HistoryNavigator, NavigationKind, SessionState, TokenVault,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

fn token(role: Option<&str>) -> String {
    let now = Utc::now().timestamp();
    let mut payload = json!({ "sub": "user-5", "email": "u5@example.com", "iat": now, "exp": now + 3600 });
    if let Some(role) = role {
        payload["role"] = json!(role);
    }
    encode(&Header::default(), &payload, &EncodingKey::from_secret(b"k")).unwrap()
}

fn auth_header(headers: &HeaderMap) -> Value {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| json!(v))
        .unwrap_or(Value::Null)
}

async fn spawn_backend() -> String {
    async fn echo_auth(headers: HeaderMap) -> Json<Value> {
        Json(json!({ "authorization": auth_header(&headers) }))
    }

    async fn profile() -> Json<Value> {
        Json(json!({ "data": { "user": { "id": "user-5", "role": "FREELANCER" } } }))
    }

    async fn revoked() -> impl IntoResponse {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Token revoked" })),
        )
    }

    async fn conflict() -> impl IntoResponse {
        (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Slot taken", "slotId": 3 })),
        )
    }

    async fn broken() -> impl IntoResponse {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    let app = Router::new()
        .route("/booking/echo-auth", get(echo_auth))
        .route("/auth/echo-auth", get(echo_auth))
        .route("/auth/login", post(revoked))
        .route("/freelancer/profile", get(profile))
        .route("/booking/revoked", get(revoked))
        .route("/service/conflict", post(conflict))
        .route("/service/broken", get(broken));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn session_at(location: &str) -> (Arc<AuthSession>, Arc<HistoryNavigator>) {
    let nav = Arc::new(HistoryNavigator::new(location));
    let session = Arc::new(AuthSession::bootstrap(
        TokenVault::in_memory(),
        TokenDecoder::unverified(),
        RouteTable::default(),
        nav.clone(),
    ));
    (session, nav)
}

#[tokio::test]
async fn test_bearer_attached_except_for_auth_endpoints() {
    let base = spawn_backend().await;
    let (session, _) = session_at("/dashboard");
    let token = token(Some("PATIENT"));
    session.login(&token).unwrap();
    let client = ApiClient::new(&base, session).unwrap();

    let body: Value = client.get("/booking/echo-auth").await.unwrap();
    assert_eq!(body["authorization"], json!(format!("Bearer {}", token)));

    let body: Value = client.get("/auth/echo-auth").await.unwrap();
    assert_eq!(body["authorization"], Value::Null);
}

#[tokio::test]
async fn test_no_bearer_without_token() {
    let base = spawn_backend().await;
    let (session, _) = session_at("/");
    let client = ApiClient::new(&base, session).unwrap();

    let body: Value = client.get("/booking/echo-auth").await.unwrap();
    assert_eq!(body["authorization"], Value::Null);
}

#[tokio::test]
async fn test_role_refreshed_from_response() {
    let base = spawn_backend().await;
    let (session, _) = session_at("/dashboard");
    session.login(&token(None)).unwrap();
    assert_eq!(session.state().role, None);

    let client = ApiClient::new(&base, session.clone()).unwrap();
    let _: Value = client.get("/freelancer/profile").await.unwrap();

    assert_eq!(
        session.state(),
        SessionState {
            is_authenticated: true,
            role: Some(Role::Freelancer)
        }
    );
}

#[tokio::test]
async fn test_unauthorized_clears_session_and_reloads_sign_in() {
    let base = spawn_backend().await;
    let (session, nav) = session_at("/dashboard/my-bookings");
    session.login(&token(Some("PATIENT"))).unwrap();
    let client = ApiClient::new(&base, session.clone()).unwrap();

    let err = client.get::<Value>("/booking/revoked").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.message, "Token revoked");

    assert_eq!(session.state(), SessionState::logged_out());
    assert!(session.token().is_none());
    assert_eq!(
        nav.last_visit(),
        Some(("/authentication/sign-in".to_string(), NavigationKind::Reload))
    );
}

#[tokio::test]
async fn test_unauthorized_inside_auth_flow_does_not_navigate() {
    let base = spawn_backend().await;
    let (session, nav) = session_at("/authentication/sign-in");
    session.login(&token(Some("PATIENT"))).unwrap();
    let client = ApiClient::new(&base, session.clone()).unwrap();

    let err = client.get::<Value>("/booking/revoked").await.unwrap_err();
    assert_eq!(err.status, Some(401));
    assert!(session.token().is_none());
    assert!(nav.visits().is_empty());
}

#[tokio::test]
async fn test_unauthorized_on_lookalike_path_still_reloads() {
    let base = spawn_backend().await;
    let (session, nav) = session_at("/authentication-help");
    session.login(&token(Some("PATIENT"))).unwrap();
    let client = ApiClient::new(&base, session.clone()).unwrap();

    let err = client.get::<Value>("/booking/revoked").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(
        nav.last_visit(),
        Some(("/authentication/sign-in".to_string(), NavigationKind::Reload))
    );
}

#[tokio::test]
async fn test_unauthorized_from_auth_endpoint_keeps_session() {
    let base = spawn_backend().await;
    let (session, nav) = session_at("/dashboard");
    session.login(&token(Some("ADMIN"))).unwrap();
    let client = ApiClient::new(&base, session.clone()).unwrap();

    let err = client
        .post::<Value, _>("/auth/login", &json!({ "email": "a", "password": "b" }))
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(401));
    assert!(session.state().is_authenticated);
    assert!(session.token().is_some());
    assert!(nav.visits().is_empty());
}

#[tokio::test]
async fn test_errors_are_normalized() {
    let base = spawn_backend().await;
    let (session, _) = session_at("/dashboard");
    session.login(&token(Some("PATIENT"))).unwrap();
    let client = ApiClient::new(&base, session.clone()).unwrap();

    let err = client
        .post::<Value, _>("/service/conflict", &json!({ "slot": 3 }))
        .await
        .unwrap_err();
    assert_eq!(err.message, "Slot taken");
    assert_eq!(err.status, Some(409));
    assert_eq!(err.data, Some(json!({ "message": "Slot taken", "slotId": 3 })));

    let err = client.get::<Value>("/service/broken").await.unwrap_err();
    assert_eq!(err.status, Some(500));
    assert_eq!(err.message, "Internal Server Error");

    // Non-401 failures leave the session alone.
    assert!(session.state().is_authenticated);
}

#[tokio::test]
async fn test_transport_failure_has_no_status() {
    let (session, _) = session_at("/dashboard");
    let client = ApiClient::new("http://127.0.0.1:9", session).unwrap();

    let err = client.get::<Value>("/booking/anything").await.unwrap_err();
    assert_eq!(err.status, None);
    assert!(!err.message.is_empty());
}
