use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::utils::init_data_source::INIT_DATA_HEADERS;

/// The Mini-App is served from a different origin than the API, so any
/// origin is accepted; credentials travel in the initData headers.
pub fn mini_app_cors() -> CorsLayer {
    let mut headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
    headers.extend(INIT_DATA_HEADERS.into_iter().map(HeaderName::from_static));

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(headers)
        .allow_origin(Any)
}
