use crate::error::{Error, Result};
use crate::models::admin::AdminIds;
use crate::utils::telegram_auth::{VerifyOptions, DEFAULT_MAX_AGE_SECS};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// `None` when unset or blank; requests needing it fail with
    /// `BOT_TOKEN_MISSING`.
    pub telegram_bot_token: Option<String>,
    pub admin_telegram_ids: AdminIds,
    pub init_data_max_age_secs: u64,
    pub public_rps: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let init_data_max_age_secs =
            get_env_parse_or("INIT_DATA_MAX_AGE_SECS", DEFAULT_MAX_AGE_SECS)?;
        if init_data_max_age_secs == 0 {
            return Err(Error::Config(
                "INIT_DATA_MAX_AGE_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            telegram_bot_token: get_env_opt("TELEGRAM_BOT_TOKEN"),
            admin_telegram_ids: AdminIds::parse(
                &get_env_opt("ADMIN_TELEGRAM_IDS").unwrap_or_default(),
            ),
            init_data_max_age_secs,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
        })
    }

    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions::with_max_age(self.init_data_max_age_secs)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u64>("PUBLIC_RPS", "fast").unwrap_err();
        assert!(err.to_string().contains("PUBLIC_RPS"));
        assert_eq!(parse_value::<u64>("PUBLIC_RPS", "25").unwrap(), 25);
    }

    #[test]
    fn verify_options_follow_configured_window() {
        let config = Config {
            server_address: "127.0.0.1:0".into(),
            telegram_bot_token: None,
            admin_telegram_ids: AdminIds::default(),
            init_data_max_age_secs: 3600,
            public_rps: 10,
        };
        assert_eq!(config.verify_options().max_age_secs, Some(3600));
        assert_eq!(config.verify_options().future_skew_secs, 60);
    }
}
