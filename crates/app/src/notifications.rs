use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use tracing::{error, info, warn};

use madarij_core::triggers::DomainEvent;
use madarij_core::types::{
    AckResponse, NewNotification, NotificationResponse, NotificationsResponse, UnreadCountResponse,
};

use crate::auth::AuthUser;
use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::service::ServiceError;

const NOT_FOUND_MESSAGE: &str = "الإشعار غير موجود";
const INVALID_ID_MESSAGE: &str = "معرف الإشعار غير صالح";
const INVALID_BODY_MESSAGE: &str = "بيانات الإشعار غير صالحة";
const MARKED_MESSAGE: &str = "تم تحديد الإشعار كمقروء";
const MARKED_ALL_MESSAGE: &str = "تم تحديد جميع الإشعارات كمقروءة";

impl From<ServiceError> for ProblemResponse {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidId => {
                ProblemResponse::new(StatusCode::BAD_REQUEST, "invalid_id", INVALID_ID_MESSAGE)
            }
            ServiceError::NotFound => {
                ProblemResponse::new(StatusCode::NOT_FOUND, "not_found", NOT_FOUND_MESSAGE)
            }
            ServiceError::Invalid(err) => {
                warn!(stage = "api", error = %err, "notification payload rejected");
                ProblemResponse::new(StatusCode::BAD_REQUEST, "invalid_body", INVALID_BODY_MESSAGE)
            }
            ServiceError::Storage(err) => {
                error!(stage = "api", error = %err, "notification storage failure");
                ProblemResponse::internal()
            }
        }
    }
}

fn track<T>(op: &'static str, result: Result<T, ProblemResponse>) -> Result<T, ProblemResponse> {
    let label = match &result {
        Ok(_) => "ok",
        Err(problem) if problem.status().is_server_error() => "server_error",
        Err(_) => "client_error",
    };
    counter!("notifications_api_requests_total", "op" => op, "result" => label).increment(1);
    result
}

fn body_or_bad_request<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ProblemResponse> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        warn!(stage = "api", error = %rejection.body_text(), "malformed notification body");
        ProblemResponse::new(StatusCode::BAD_REQUEST, "invalid_body", INVALID_BODY_MESSAGE)
    })
}

fn require_staff(user: &AuthUser) -> Result<(), ProblemResponse> {
    if user.is_staff() {
        Ok(())
    } else {
        warn!(stage = "api", user = %user.id, "non-staff principal attempted to create a notification");
        Err(ProblemResponse::forbidden())
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<NotificationsResponse>, ProblemResponse> {
    let result = state
        .service()
        .list_for(&user.id)
        .await
        .map(|notifications| Json(NotificationsResponse { notifications }))
        .map_err(ProblemResponse::from);
    track("list", result)
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UnreadCountResponse>, ProblemResponse> {
    let result = state
        .service()
        .unread_count(&user.id)
        .await
        .map(|count| Json(UnreadCountResponse { count }))
        .map_err(ProblemResponse::from);
    track("unread_count", result)
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>, ProblemResponse> {
    let result = state
        .service()
        .mark_as_read(&user.id, &id)
        .await
        .map(|()| {
            Json(AckResponse {
                message: MARKED_MESSAGE.to_string(),
            })
        })
        .map_err(ProblemResponse::from);
    track("mark_read", result)
}

pub async fn mark_all_as_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AckResponse>, ProblemResponse> {
    let result = state
        .service()
        .mark_all_as_read(&user.id)
        .await
        .map(|_| {
            Json(AckResponse {
                message: MARKED_ALL_MESSAGE.to_string(),
            })
        })
        .map_err(ProblemResponse::from);
    track("mark_all_read", result)
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<NewNotification>, JsonRejection>,
) -> Result<Response, ProblemResponse> {
    let result = async {
        require_staff(&user)?;
        let record = body_or_bad_request(payload)?;
        let notification = state.service().create(record).await?;
        info!(stage = "api", by = %user.id, id = %notification.id, "notification created via api");
        Ok::<_, ProblemResponse>(
            (StatusCode::CREATED, Json(NotificationResponse { notification })).into_response(),
        )
    }
    .await;
    track("create", result)
}

pub async fn publish_event(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<DomainEvent>, JsonRejection>,
) -> Result<Response, ProblemResponse> {
    let result = async {
        require_staff(&user)?;
        let event = body_or_bad_request(payload)?;
        let notification = state.service().publish(&event).await?;
        Ok::<_, ProblemResponse>(
            (StatusCode::CREATED, Json(NotificationResponse { notification })).into_response(),
        )
    }
    .await;
    track("publish_event", result)
}
