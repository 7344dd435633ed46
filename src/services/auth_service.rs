use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::models::admin::AdminIds;
use crate::models::telegram_user::AuthenticatedUser;
use crate::utils::telegram_auth::{verify_session, VerifyError, VerifyOptions};

/// The single authentication policy every route goes through: one bot
/// token, one replay window, one admin list, all fixed at startup.
#[derive(Debug, Clone)]
pub struct AuthService {
    bot_token: Option<String>,
    options: VerifyOptions,
    admins: AdminIds,
}

impl AuthService {
    pub fn new(bot_token: Option<String>, options: VerifyOptions, admins: AdminIds) -> Self {
        Self {
            bot_token: bot_token.filter(|token| !token.is_empty()),
            options,
            admins,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.telegram_bot_token.clone(),
            config.verify_options(),
            config.admin_telegram_ids.clone(),
        )
    }

    pub fn has_bot_token(&self) -> bool {
        self.bot_token.is_some()
    }

    pub fn is_admin(&self, telegram_id: &str) -> bool {
        self.admins.contains(telegram_id)
    }

    pub fn authenticate(
        &self,
        init_data: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedUser, VerifyError> {
        let bot_token = self.bot_token.as_deref().ok_or(VerifyError::NoBotToken)?;
        let verified = verify_session(init_data, bot_token, &self.options, now)?;
        let is_admin = self.is_admin(&verified.user.id);
        Ok(AuthenticatedUser {
            user: verified.user,
            auth_date: verified.auth_date,
            is_admin,
        })
    }
}
