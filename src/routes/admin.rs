use axum::{response::Json, Extension};

use crate::{dto::auth_dto::MeResponse, models::telegram_user::AuthenticatedUser};

#[utoipa::path(
    get,
    path = "/api/admin/session",
    responses(
        (status = 200, description = "Caller is on the admin allow-list", body = MeResponse),
        (status = 401, description = "Missing or invalid initData"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn session(Extension(identity): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    tracing::info!(user_id = %identity.user.id, "Admin session opened");
    Json(MeResponse::from(identity))
}
