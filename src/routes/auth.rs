use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;

use crate::{
    dto::auth_dto::{MeResponse, VerifyInitDataRequest, VerifyInitDataResponse},
    models::telegram_user::AuthenticatedUser,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/auth/me",
    params(
        ("x-telegram-init-data" = Option<String>, Header, description = "Raw initData from Telegram.WebApp.initData")
    ),
    responses(
        (status = 200, description = "Current Telegram user", body = MeResponse),
        (status = 401, description = "Missing or invalid initData"),
        (status = 500, description = "Bot token is not configured")
    )
)]
pub async fn me(Extension(identity): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    Json(MeResponse::from(identity))
}

pub const INVALID_BODY: &str = "INVALID_BODY";

/// Explicit verification for clients that want a verdict without calling a
/// protected route. Always answers with `{ ok, ... }`.
#[utoipa::path(
    post,
    path = "/api/auth/verify",
    request_body = VerifyInitDataRequest,
    responses(
        (status = 200, description = "initData accepted", body = VerifyInitDataResponse),
        (status = 400, description = "Body is not a JSON object with initData", body = VerifyInitDataResponse),
        (status = 401, description = "initData rejected", body = VerifyInitDataResponse),
        (status = 500, description = "Bot token is not configured", body = VerifyInitDataResponse)
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VerifyInitDataRequest>, JsonRejection>,
) -> impl IntoResponse {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Unreadable verify request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(VerifyInitDataResponse::rejected(INVALID_BODY)),
            );
        }
    };

    match state
        .auth_service
        .authenticate(&payload.init_data, Utc::now())
    {
        Ok(identity) => (
            StatusCode::OK,
            Json(VerifyInitDataResponse::accepted(identity)),
        ),
        Err(err) if err.is_config_error() => {
            tracing::error!("TELEGRAM_BOT_TOKEN is not configured, cannot verify initData");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VerifyInitDataResponse::rejected("BOT_TOKEN_MISSING")),
            )
        }
        Err(err) => {
            tracing::debug!(code = err.code(), "initData verification failed");
            (
                StatusCode::UNAUTHORIZED,
                Json(VerifyInitDataResponse::rejected(err.code())),
            )
        }
    }
}
