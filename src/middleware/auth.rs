use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::telegram_user::AuthenticatedUser;
use crate::utils::init_data_source::{find_init_data, init_data_from_json, InitDataSource};
use crate::AppState;

/// Upper bound on a JSON body buffered while looking for `initData`.
pub const MAX_AUTH_BODY_BYTES: usize = 64 * 1024;

pub const NO_INIT_DATA: &str = "NO_INIT_DATA";

pub async fn require_telegram_user(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req).await {
        Ok(req) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

/// Runs after `require_telegram_user`.
pub async fn require_admin(req: Request, next: Next) -> Response {
    let Some(identity) = req.extensions().get::<AuthenticatedUser>() else {
        return Error::Unauthorized(NO_INIT_DATA.to_string()).into_response();
    };
    if !identity.is_admin {
        tracing::info!(user_id = %identity.user.id, path = %req.uri().path(), "Admin route refused");
        return Error::Forbidden("forbidden".to_string()).into_response();
    }
    next.run(req).await
}

async fn authenticate(state: &AppState, req: Request) -> Result<Request> {
    if !state.auth_service.has_bot_token() {
        tracing::error!("TELEGRAM_BOT_TOKEN is not configured, cannot authenticate requests");
        return Err(Error::BotTokenMissing);
    }

    let path = req.uri().path().to_string();
    let (source, mut req) = locate_init_data(req).await?;
    let Some(source) = source else {
        tracing::debug!(%path, "Request carries no initData");
        return Err(Error::Unauthorized(NO_INIT_DATA.to_string()));
    };

    let identity = state
        .auth_service
        .authenticate(&source.init_data, Utc::now())
        .map_err(|err| {
            tracing::debug!(%path, transport = ?source.transport, code = err.code(), "initData rejected");
            Error::from(err)
        })?;

    tracing::debug!(%path, user_id = %identity.user.id, is_admin = identity.is_admin, "Telegram user authenticated");
    req.extensions_mut().insert(identity);
    Ok(req)
}

// Falls back to the JSON body; the buffered bytes are put back for the handler.
async fn locate_init_data(req: Request) -> Result<(Option<InitDataSource>, Request)> {
    if let Some(source) = find_init_data(req.headers(), req.uri()) {
        return Ok((Some(source), req));
    }
    if !is_json(req.headers()) {
        return Ok((None, req));
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_AUTH_BODY_BYTES)
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read request body: {}", e)))?;
    let source = init_data_from_json(&bytes);
    Ok((source, Request::from_parts(parts, Body::from(bytes))))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().starts_with("application/json"))
        .unwrap_or(false)
}
