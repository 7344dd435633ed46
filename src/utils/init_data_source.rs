//! Locating the raw initData string in an incoming request.

use axum::http::{header, HeaderMap, Uri};
use serde_json::Value as JsonValue;

pub const INIT_DATA_HEADERS: [&str; 3] = ["x-telegram-init-data", "x-init-data", "x-tg-init-data"];
pub const INIT_DATA_QUERY_PARAMS: [&str; 3] = ["initData", "init_data", "tgWebAppData"];
pub const INIT_DATA_BODY_FIELDS: [&str; 2] = ["initData", "init_data"];
pub const INIT_DATA_COOKIE: &str = "tg_init_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Header,
    Authorization,
    Query,
    Cookie,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitDataSource {
    pub transport: Transport,
    pub init_data: String,
}

impl InitDataSource {
    fn new(transport: Transport, init_data: impl Into<String>) -> Self {
        Self {
            transport,
            init_data: init_data.into(),
        }
    }
}

/// Looks for initData in headers, `Authorization: tma ...`, the query
/// string and the `tg_init_data` cookie, in that order.
pub fn find_init_data(headers: &HeaderMap, uri: &Uri) -> Option<InitDataSource> {
    from_headers(headers)
        .or_else(|| from_authorization(headers))
        .or_else(|| uri.query().and_then(from_query))
        .or_else(|| from_cookie(headers))
}

pub fn init_data_from_json(body: &[u8]) -> Option<InitDataSource> {
    let value: JsonValue = serde_json::from_slice(body).ok()?;
    INIT_DATA_BODY_FIELDS
        .iter()
        .filter_map(|name| value.get(*name).and_then(JsonValue::as_str))
        .find(|candidate| !candidate.trim().is_empty())
        .map(|init_data| InitDataSource::new(Transport::Body, init_data))
}

fn from_headers(headers: &HeaderMap) -> Option<InitDataSource> {
    INIT_DATA_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|candidate| !candidate.trim().is_empty())
        .map(|init_data| InitDataSource::new(Transport::Header, init_data.trim()))
}

fn from_authorization(headers: &HeaderMap) -> Option<InitDataSource> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, rest) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("tma") || rest.trim().is_empty() {
        return None;
    }
    Some(InitDataSource::new(Transport::Authorization, rest.trim()))
}

fn from_query(query: &str) -> Option<InitDataSource> {
    let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    INIT_DATA_QUERY_PARAMS.iter().find_map(|name| {
        params
            .iter()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| InitDataSource::new(Transport::Query, value.clone()))
    })
}

fn from_cookie(headers: &HeaderMap) -> Option<InitDataSource> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == INIT_DATA_COOKIE && !value.trim().is_empty())
        .map(|(_, value)| {
            let decoded = url::form_urlencoded::parse(format!("v={}", value).as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())
                .unwrap_or_else(|| value.to_string());
            InitDataSource::new(Transport::Cookie, decoded)
        })
}
