//! Verification of the signed `initData` payload Telegram hands to a Mini-App.
//!
//! The payload is a URL-encoded query string. Telegram signs every field
//! except `hash` with a key derived from the bot token:
//!
//! ```text
//! secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)
//! hash       = hex(HMAC_SHA256(key = secret_key, msg = data_check_string))
//! ```
//!
//! where `data_check_string` is every remaining `key=value` pair sorted by
//! key and joined with `\n`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value as JsonValue;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::telegram_user::TelegramUser;

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

pub const DEFAULT_MAX_AGE_SECS: u64 = 86_400;
pub const DEFAULT_FUTURE_SKEW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Replay window. `None` skips the `auth_date` checks entirely.
    pub max_age_secs: Option<u64>,
    /// How far `auth_date` may sit in the future before it is rejected.
    pub future_skew_secs: u64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_age_secs: Some(DEFAULT_MAX_AGE_SECS),
            future_skew_secs: DEFAULT_FUTURE_SKEW_SECS,
        }
    }
}

impl VerifyOptions {
    pub fn with_max_age(max_age_secs: u64) -> Self {
        Self {
            max_age_secs: Some(max_age_secs),
            ..Self::default()
        }
    }

    pub fn signature_only() -> Self {
        Self {
            max_age_secs: None,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    #[error("initData carries no hash")]
    NoHash,
    #[error("initData carries no auth_date")]
    NoAuthDate,
    #[error("auth_date is not a number")]
    BadAuthDate,
    #[error("auth_date is in the future")]
    AuthDateInFuture,
    #[error("initData has expired")]
    Expired,
    #[error("initData signature does not match")]
    BadHash,
    #[error("initData carries no user")]
    NoUser,
    #[error("user field is not valid JSON")]
    BadUserJson,
    #[error("user object has no id")]
    NoUserId,
}

impl InitDataError {
    pub fn code(&self) -> &'static str {
        match self {
            InitDataError::NoHash => "NO_HASH",
            InitDataError::NoAuthDate => "NO_AUTH_DATE",
            InitDataError::BadAuthDate => "BAD_AUTH_DATE",
            InitDataError::AuthDateInFuture => "AUTH_DATE_IN_FUTURE",
            InitDataError::Expired => "INITDATA_EXPIRED",
            InitDataError::BadHash => "BAD_HASH",
            InitDataError::NoUser => "NO_USER",
            InitDataError::BadUserJson => "BAD_USER_JSON",
            InitDataError::NoUserId => "NO_USER_ID",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Deployment problem, not something the caller did wrong.
    #[error("Telegram bot token is not configured")]
    NoBotToken,
    #[error(transparent)]
    Invalid(#[from] InitDataError),
}

impl VerifyError {
    pub fn code(&self) -> &'static str {
        match self {
            VerifyError::NoBotToken => "NO_BOT_TOKEN",
            VerifyError::Invalid(err) => err.code(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, VerifyError::NoBotToken)
    }
}

/// Signed payload after verification: the user plus the `auth_date` it
/// was issued at, when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInitData {
    pub user: TelegramUser,
    pub auth_date: Option<i64>,
}

/// Verifies `init_data` against `bot_token` and returns the signed-in user.
///
/// Pure: the outcome depends only on the arguments, `now` included.
pub fn verify_init_data(
    init_data: &str,
    bot_token: &str,
    options: &VerifyOptions,
    now: DateTime<Utc>,
) -> Result<TelegramUser, VerifyError> {
    verify_session(init_data, bot_token, options, now).map(|verified| verified.user)
}

/// Same checks as [`verify_init_data`], keeping `auth_date` alongside the user.
pub fn verify_session(
    init_data: &str,
    bot_token: &str,
    options: &VerifyOptions,
    now: DateTime<Utc>,
) -> Result<VerifiedInitData, VerifyError> {
    if bot_token.is_empty() {
        return Err(VerifyError::NoBotToken);
    }

    let mut pairs = parse_init_data(init_data);
    let provided_hash = take_hash(&mut pairs).ok_or(InitDataError::NoHash)?;

    if let Some(max_age_secs) = options.max_age_secs {
        check_auth_date(&pairs, max_age_secs, options.future_skew_secs, now)?;
    }

    let check_string = data_check_string(&pairs);
    let computed_hash = compute_hash(&check_string, bot_token);
    if !hashes_match(&computed_hash, &provided_hash) {
        return Err(InitDataError::BadHash.into());
    }

    Ok(VerifiedInitData {
        user: user_from_pairs(&pairs)?,
        auth_date: field(&pairs, "auth_date").and_then(|raw| raw.parse().ok()),
    })
}

/// Splits a URL-encoded query string into decoded pairs, keeping input order
/// and duplicates.
pub fn parse_init_data(init_data: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

pub fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn secret_key(bot_token: &str) -> [u8; 32] {
    hmac_sha256(WEB_APP_DATA_KEY, bot_token.as_bytes())
}

/// Lowercase hex signature of `check_string` for the given bot.
pub fn compute_hash(check_string: &str, bot_token: &str) -> String {
    let key = secret_key(bot_token);
    hex::encode(hmac_sha256(&key, check_string.as_bytes()))
}

/// Renders `pairs` as a URL-encoded initData string with a valid `hash`.
pub fn sign_init_data(pairs: &[(&str, &str)], bot_token: &str) -> String {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let hash = compute_hash(&data_check_string(&owned), bot_token);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

fn take_hash(pairs: &mut Vec<(String, String)>) -> Option<String> {
    let hash = pairs
        .iter()
        .find(|(key, _)| key == "hash")
        .map(|(_, value)| value.clone())?;
    pairs.retain(|(key, _)| key != "hash");
    Some(hash)
}

fn field<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn check_auth_date(
    pairs: &[(String, String)],
    max_age_secs: u64,
    future_skew_secs: u64,
    now: DateTime<Utc>,
) -> Result<(), InitDataError> {
    let raw = field(pairs, "auth_date").ok_or(InitDataError::NoAuthDate)?;
    let auth_date: i64 = raw.parse().map_err(|_| InitDataError::BadAuthDate)?;
    let now = now.timestamp();

    let skew = i64::try_from(future_skew_secs).unwrap_or(i64::MAX);
    if auth_date.saturating_sub(now) > skew {
        return Err(InitDataError::AuthDateInFuture);
    }

    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    if now.saturating_sub(auth_date) > max_age {
        return Err(InitDataError::Expired);
    }

    Ok(())
}

// Length mismatch short-circuits inside `ct_eq`; equal-length buffers are
// compared without early exit.
fn hashes_match(computed: &str, provided: &str) -> bool {
    computed.as_bytes().ct_eq(provided.as_bytes()).into()
}

fn user_from_pairs(pairs: &[(String, String)]) -> Result<TelegramUser, InitDataError> {
    let raw = field(pairs, "user").ok_or(InitDataError::NoUser)?;
    let user: JsonValue = serde_json::from_str(raw).map_err(|_| InitDataError::BadUserJson)?;

    let id = match user.get("id") {
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(InitDataError::NoUserId),
    };

    Ok(TelegramUser {
        id,
        username: user.get("username").and_then(scalar_to_string),
        first_name: user.get("first_name").and_then(scalar_to_string),
        last_name: user.get("last_name").and_then(scalar_to_string),
    })
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    const TOKEN: &str = "123:ABC";
    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).unwrap()
    }

    fn signed(auth_date: i64, user: &str) -> String {
        let auth_date = auth_date.to_string();
        sign_init_data(
            &[("auth_date", auth_date.as_str()), ("query_id", "AAH"), ("user", user)],
            TOKEN,
        )
    }

    fn verify(init_data: &str) -> Result<TelegramUser, VerifyError> {
        verify_init_data(init_data, TOKEN, &VerifyOptions::default(), now())
    }

    #[test]
    fn accepts_documented_two_step_hmac() {
        let check_string = "auth_date=1700000000\nuser={\"id\":42,\"username\":\"doc\"}";

        let mut mac = HmacSha256::new_from_slice(b"WebAppData").unwrap();
        mac.update(TOKEN.as_bytes());
        let key = mac.finalize().into_bytes();
        let mut mac = HmacSha256::new_from_slice(&key).unwrap();
        mac.update(check_string.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(compute_hash(check_string, TOKEN), expected);

        let user_param: String =
            url::form_urlencoded::byte_serialize(br#"{"id":42,"username":"doc"}"#).collect();
        let init_data = format!("auth_date=1700000000&user={}&hash={}", user_param, expected);

        let user = assert_ok!(verify(&init_data));
        assert_eq!(
            user,
            TelegramUser {
                id: "42".into(),
                username: Some("doc".into()),
                first_name: None,
                last_name: None,
            }
        );
    }

    #[test]
    fn flipping_any_hash_character_is_rejected() {
        let init_data = signed(NOW, r#"{"id":7}"#);
        let pairs = parse_init_data(&init_data);
        let hash = field(&pairs, "hash").unwrap().to_string();

        for i in 0..hash.len() {
            let mut bytes = hash.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let tampered_hash = String::from_utf8(bytes).unwrap();
            let tampered = init_data.replace(&hash, &tampered_hash);
            assert_eq!(
                verify(&tampered),
                Err(VerifyError::Invalid(InitDataError::BadHash))
            );
        }
    }

    #[test]
    fn truncated_or_uppercase_hash_is_rejected() {
        let init_data = signed(NOW, r#"{"id":7}"#);
        let pairs = parse_init_data(&init_data);
        let hash = field(&pairs, "hash").unwrap().to_string();

        let truncated = init_data.replace(&hash, &hash[..hash.len() - 2]);
        assert_eq!(verify(&truncated).unwrap_err().code(), "BAD_HASH");

        let upper = init_data.replace(&hash, &hash.to_uppercase());
        assert_eq!(verify(&upper).unwrap_err().code(), "BAD_HASH");
    }

    #[test]
    fn field_order_does_not_matter() {
        let init_data = signed(NOW, r#"{"id":7,"first_name":"Ann"}"#);
        let mut segments: Vec<&str> = init_data.split('&').collect();
        segments.reverse();
        let reordered = segments.join("&");

        assert_eq!(verify(&init_data), verify(&reordered));
        assert_eq!(assert_ok!(verify(&reordered)).first_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn replay_window_boundaries() {
        let options = VerifyOptions::with_max_age(86_400);

        let stale = signed(NOW - 86_401, r#"{"id":1}"#);
        assert_eq!(
            verify_init_data(&stale, TOKEN, &options, now()),
            Err(VerifyError::Invalid(InitDataError::Expired))
        );

        let fresh = signed(NOW - 86_399, r#"{"id":1}"#);
        assert_ok!(verify_init_data(&fresh, TOKEN, &options, now()));

        let exact = signed(NOW - 86_400, r#"{"id":1}"#);
        assert_ok!(verify_init_data(&exact, TOKEN, &options, now()));
    }

    #[test]
    fn future_auth_date_beyond_skew_is_rejected() {
        let ahead = signed(NOW + 120, r#"{"id":1}"#);
        assert_eq!(verify(&ahead).unwrap_err().code(), "AUTH_DATE_IN_FUTURE");

        let slightly_ahead = signed(NOW + 30, r#"{"id":1}"#);
        assert_ok!(verify(&slightly_ahead));

        let at_skew = signed(NOW + 60, r#"{"id":1}"#);
        assert_ok!(verify(&at_skew));

        let past_skew = signed(NOW + 61, r#"{"id":1}"#);
        assert_eq!(verify(&past_skew).unwrap_err().code(), "AUTH_DATE_IN_FUTURE");
    }

    #[test]
    fn session_keeps_auth_date() {
        let init_data = signed(NOW - 5, r#"{"id":3}"#);
        let verified = assert_ok!(verify_session(
            &init_data,
            TOKEN,
            &VerifyOptions::default(),
            now()
        ));
        assert_eq!(verified.user.id, "3");
        assert_eq!(verified.auth_date, Some(NOW - 5));

        let undated = sign_init_data(&[("user", r#"{"id":3}"#)], TOKEN);
        let verified = assert_ok!(verify_session(
            &undated,
            TOKEN,
            &VerifyOptions::signature_only(),
            now()
        ));
        assert_eq!(verified.auth_date, None);
    }

    #[test]
    fn auth_date_is_required_when_freshness_is_enforced() {
        let missing = sign_init_data(&[("user", r#"{"id":1}"#)], TOKEN);
        assert_eq!(verify(&missing).unwrap_err().code(), "NO_AUTH_DATE");

        let garbage = sign_init_data(&[("auth_date", "yesterday"), ("user", r#"{"id":1}"#)], TOKEN);
        assert_eq!(verify(&garbage).unwrap_err().code(), "BAD_AUTH_DATE");

        let ancient = signed(1, r#"{"id":1}"#);
        assert_ok!(verify_init_data(
            &ancient,
            TOKEN,
            &VerifyOptions::signature_only(),
            now()
        ));
    }

    #[test]
    fn user_field_failures() {
        let no_user = sign_init_data(&[("auth_date", "1700000000")], TOKEN);
        assert_eq!(verify(&no_user).unwrap_err().code(), "NO_USER");

        let no_id = signed(NOW, r#"{"no_id":true}"#);
        assert_eq!(verify(&no_id).unwrap_err().code(), "NO_USER_ID");

        let null_id = signed(NOW, r#"{"id":null}"#);
        assert_eq!(verify(&null_id).unwrap_err().code(), "NO_USER_ID");

        let not_json = signed(NOW, "{id:1");
        assert_eq!(verify(&not_json).unwrap_err().code(), "BAD_USER_JSON");
    }

    #[test]
    fn optional_fields_are_coerced_to_strings() {
        let init_data = signed(
            NOW,
            r#"{"id":"99","username":null,"first_name":"Dr. Who","last_name":12}"#,
        );
        let user = assert_ok!(verify(&init_data));
        assert_eq!(user.id, "99");
        assert_eq!(user.username, None);
        assert_eq!(user.first_name.as_deref(), Some("Dr. Who"));
        assert_eq!(user.last_name.as_deref(), Some("12"));
    }

    #[test]
    fn missing_hash_and_empty_input() {
        assert_eq!(verify("").unwrap_err().code(), "NO_HASH");
        assert_eq!(
            verify("auth_date=1700000000&user=%7B%22id%22%3A1%7D").unwrap_err().code(),
            "NO_HASH"
        );
        assert_eq!(verify("%%%&&=").unwrap_err().code(), "NO_HASH");
    }

    #[test]
    fn empty_bot_token_fails_closed() {
        let init_data = signed(NOW, r#"{"id":1}"#);
        let err = assert_err!(verify_init_data(
            &init_data,
            "",
            &VerifyOptions::default(),
            now()
        ));
        assert!(err.is_config_error());
        assert_eq!(err.code(), "NO_BOT_TOKEN");
    }

    #[test]
    fn wrong_bot_token_is_rejected() {
        let init_data = signed(NOW, r#"{"id":1}"#);
        assert_eq!(
            verify_init_data(&init_data, "456:XYZ", &VerifyOptions::default(), now()),
            Err(VerifyError::Invalid(InitDataError::BadHash))
        );
    }

    #[test]
    fn check_string_is_sorted_by_key_bytes() {
        let pairs = vec![
            ("user".to_string(), "u".to_string()),
            ("Zeta".to_string(), "z".to_string()),
            ("auth_date".to_string(), "1".to_string()),
        ];
        assert_eq!(data_check_string(&pairs), "Zeta=z\nauth_date=1\nuser=u");
    }
}
