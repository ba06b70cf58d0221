use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Any origin may call the API; only the verbs the routes use are allowed.
pub fn api_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}
