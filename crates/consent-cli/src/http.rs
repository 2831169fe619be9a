//! HTTP surface for the consent registry.
//!
//! Handlers parse the request, call exactly one [`ConsentLogic`] operation and
//! turn its result into JSON. Status codes are decided here and nowhere else.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use consent_core::{ConsentDefinition, ConsentError, ConsentLogic, Grants, Verdict};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

pub fn router(logic: ConsentLogic) -> Router {
    Router::new()
        .route("/users/", get(get_users))
        .route("/consents/", get(get_consents).post(post_consent))
        .route("/users/:username/consents/", get(get_user_consents))
        .route(
            "/users/:username/consents/:consent_name",
            get(get_consent_validity)
                .post(post_user_consent)
                .delete(delete_user_consent),
        )
        .with_state(logic)
}

pub async fn serve(addr: SocketAddr, logic: ConsentLogic) -> anyhow::Result<()> {
    let app = router(logic);
    let listener = TcpListener::bind(addr).await?;
    info!("consentd listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("consentd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

/// A failed request on its way out as an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    Core(ConsentError),
    BadRequest(String),
}

impl From<ConsentError> for ApiError {
    fn from(e: ConsentError) -> Self {
        ApiError::Core(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

pub fn status_for(err: &ConsentError) -> StatusCode {
    match err {
        ConsentError::UserNotFound(_) | ConsentError::ConsentNotFound(_) => StatusCode::NOT_FOUND,
        ConsentError::InvalidName(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Core(e) => (status_for(&e), e.to_string()),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
        };
        debug!(status = status.as_u16(), "request rejected: {detail}");
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

#[derive(Debug, Deserialize)]
struct RegisterParams {
    consent_name: String,
    #[serde(default)]
    seconds: i64,
    #[serde(default)]
    days: i64,
}

async fn get_users(State(logic): State<ConsentLogic>) -> Json<Vec<String>> {
    Json(logic.list_users())
}

async fn get_consents(
    State(logic): State<ConsentLogic>,
) -> Json<BTreeMap<String, ConsentDefinition>> {
    Json(logic.list_consents())
}

async fn get_user_consents(
    State(logic): State<ConsentLogic>,
    Path(username): Path<String>,
) -> ApiResult<Grants> {
    Ok(Json(logic.user_consents(&username)?))
}

async fn get_consent_validity(
    State(logic): State<ConsentLogic>,
    Path((username, consent_name)): Path<(String, String)>,
) -> ApiResult<Verdict> {
    Ok(Json(logic.check_consent_validity(&username, &consent_name)?))
}

async fn post_consent(
    State(logic): State<ConsentLogic>,
    params: Result<Query<RegisterParams>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(params) = params?;
    let definition =
        ConsentDefinition::from_signed_parts(params.consent_name, params.seconds, params.days)
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid validity: seconds={} days={} must add up to a non-negative duration",
                    params.seconds, params.days
                ))
            })?;
    logic.register_consent(definition)?;
    Ok(message("Consent registered successfully"))
}

async fn post_user_consent(
    State(logic): State<ConsentLogic>,
    Path((username, consent_name)): Path<(String, String)>,
) -> ApiResult<Value> {
    logic.grant_consent(&username, &consent_name)?;
    Ok(message("Consent added successfully"))
}

async fn delete_user_consent(
    State(logic): State<ConsentLogic>,
    Path((username, consent_name)): Path<(String, String)>,
) -> ApiResult<Value> {
    logic.revoke_consent(&username, &consent_name)?;
    Ok(message("Consent revoked successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::{Duration, Utc};
    use consent_core::{ConsentStore, ManualClock, SeedData};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<ManualClock>) {
        let now = Utc::now();
        let store = Arc::new(ConsentStore::new());
        SeedData::sample().apply(&store, now).unwrap();
        let clock = Arc::new(ManualClock::new(now));
        let logic = ConsentLogic::with_clock(store, clock.clone());
        (router(logic), clock)
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_list_users_and_consents() {
        let (app, _) = test_app();

        let (status, body) = send(&app, Method::GET, "/users/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["John", "Linda", "Maria", "Mike", "Wayne"]));

        let (status, body) = send(&app, Method::GET, "/consents/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["telemarketing"]["validity_secs"], 120);
        assert_eq!(body["promotions"]["validity_secs"], 7 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn test_user_consents() {
        let (app, _) = test_app();

        let (status, body) = send(&app, Method::GET, "/users/John/consents/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("telemarketing").is_some());
        assert!(body.get("promotions").is_none());

        let (status, body) = send(&app, Method::GET, "/users/Nobody/consents/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("User not found"));
    }

    #[tokio::test]
    async fn test_check_validity() {
        let (app, clock) = test_app();
        clock.advance(Duration::seconds(30));

        let (status, body) = send(&app, Method::GET, "/users/John/consents/telemarketing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "username": "John",
                "consent_name": "telemarketing",
                "valid": true,
                "reason": "given",
            })
        );

        let (_, body) = send(&app, Method::GET, "/users/John/consents/catalogues").await;
        assert_eq!(body["reason"], "expired");

        let (_, body) = send(&app, Method::GET, "/users/John/consents/promotions").await;
        assert_eq!(body["reason"], "not given");

        let (status, body) = send(&app, Method::GET, "/users/John/consents/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("Consent not found"));
    }

    #[tokio::test]
    async fn test_register_consent() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/consents/?consent_name=newsletter&seconds=30&days=1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Consent registered successfully");

        let (_, body) = send(&app, Method::GET, "/consents/").await;
        assert_eq!(body["newsletter"]["validity_secs"], 30 + 24 * 60 * 60);

        let (status, body) = send(&app, Method::POST, "/consents/?consent_name=%2A%3F%21dsa").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("Invalid consent name"));

        let (status, body) = send(&app, Method::POST, "/consents/?consent_name=x&days=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("Invalid validity"));
    }

    #[tokio::test]
    async fn test_register_negative_component_with_positive_total() {
        let (app, _) = test_app();

        let (status, _) = send(
            &app,
            Method::POST,
            "/consents/?consent_name=offset&seconds=-10&days=1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, "/consents/").await;
        assert_eq!(body["offset"]["validity_secs"], 24 * 60 * 60 - 10);
    }

    #[tokio::test]
    async fn test_malformed_query_renders_detail() {
        let (app, _) = test_app();

        let (status, body) = send(&app, Method::POST, "/consents/?seconds=10").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, body) =
            send(&app, Method::POST, "/consents/?consent_name=x&seconds=ten").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let (app, _) = test_app();

        let (status, body) = send(&app, Method::POST, "/users/Linda/consents/promotions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Consent added successfully");

        let (_, body) = send(&app, Method::GET, "/users/Linda/consents/promotions").await;
        assert_eq!(body["valid"], true);

        let (status, body) = send(&app, Method::DELETE, "/users/Linda/consents/promotions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Consent revoked successfully");

        // second revoke is still a success
        let (status, _) = send(&app, Method::DELETE, "/users/Linda/consents/promotions").await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, "/users/Linda/consents/promotions").await;
        assert_eq!(body["reason"], "not given");

        let (status, _) = send(&app, Method::POST, "/users/Nobody/consents/promotions").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/users/Linda/consents/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
