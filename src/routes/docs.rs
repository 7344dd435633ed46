use axum::response::Json;
use utoipa::OpenApi;

use crate::dto::auth_dto::{MeResponse, VerifyInitDataRequest, VerifyInitDataResponse};
use crate::models::telegram_user::TelegramUser;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::auth::me,
        crate::routes::auth::verify,
        crate::routes::admin::session,
    ),
    components(schemas(
        TelegramUser,
        MeResponse,
        VerifyInitDataRequest,
        VerifyInitDataResponse
    )),
    tags((name = "auth", description = "Telegram Mini-App authentication"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
