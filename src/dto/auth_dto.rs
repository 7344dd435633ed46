use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::telegram_user::{AuthenticatedUser, TelegramUser};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyInitDataRequest {
    #[serde(rename = "initData", alias = "init_data", default)]
    pub init_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: TelegramUser,
    /// Unix seconds the initData was signed at.
    pub auth_date: Option<i64>,
    pub display_name: String,
    pub is_admin: bool,
}

impl From<AuthenticatedUser> for MeResponse {
    fn from(identity: AuthenticatedUser) -> Self {
        Self {
            display_name: identity.user.display_name(),
            user: identity.user,
            auth_date: identity.auth_date,
            is_admin: identity.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyInitDataResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<TelegramUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    /// One of the verification codes, e.g. `BAD_HASH` or `BOT_TOKEN_MISSING`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyInitDataResponse {
    pub fn accepted(identity: AuthenticatedUser) -> Self {
        Self {
            ok: true,
            user: Some(identity.user),
            is_admin: Some(identity.is_admin),
            error: None,
        }
    }

    pub fn rejected(code: impl Into<String>) -> Self {
        Self {
            ok: false,
            user: None,
            is_admin: None,
            error: Some(code.into()),
        }
    }
}
