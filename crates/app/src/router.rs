use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use madarij_storage::Database;

use crate::auth::TokenValidator;
use crate::problem::ProblemResponse;
use crate::service::{Clock, NotificationService};
use crate::{notifications, telemetry};

const HEALTH_MESSAGE: &str = "مركز مدارج API يعمل بنجاح";
const ROUTE_NOT_FOUND_MESSAGE: &str = "المسار غير موجود";
const METHOD_NOT_ALLOWED_MESSAGE: &str = "الطريقة غير مسموح بها لهذا المسار";

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    service: NotificationService,
    token_validator: TokenValidator,
    clock: Clock,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, database: Database, auth_secret: &[u8]) -> Self {
        let clock: Clock = Arc::new(Utc::now);
        Self {
            metrics,
            service: NotificationService::new(database, clock.clone()),
            token_validator: TokenValidator::new(auth_secret),
            clock,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.service = self.service.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn service(&self) -> &NotificationService {
        &self.service
    }

    pub fn token_validator(&self) -> &TokenValidator {
        &self.token_validator
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics))
        .route(
            "/api/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_as_read),
        )
        .route("/api/notifications/events", post(notifications::publish_event))
        .route("/api/notifications/:id/read", put(notifications::mark_as_read))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: HEALTH_MESSAGE,
    })
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(MessageBody {
            message: ROUTE_NOT_FOUND_MESSAGE,
        }),
    )
}

async fn method_not_allowed() -> ProblemResponse {
    ProblemResponse::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        METHOD_NOT_ALLOWED_MESSAGE,
    )
}

async fn metrics(State(state): State<AppState>) -> Response {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}
