use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller identity recovered from a verified initData payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TelegramUser {
    /// Telegram user id, always rendered as a string.
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl TelegramUser {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) => format!("{} {}", first, last),
            (Some(first), None, _) => first.clone(),
            (None, _, Some(username)) => format!("@{}", username),
            _ => self.id.clone(),
        }
    }
}

/// Request-scoped identity placed into request extensions by the auth
/// middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user: TelegramUser,
    /// Unix seconds the payload was signed at.
    pub auth_date: Option<i64>,
    pub is_admin: bool,
}
