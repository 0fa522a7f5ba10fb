pub mod analyze;
pub mod health;

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::AppState;
use crate::config::Config;
use crate::telemetry::{HttpMakeSpan, HttpOnResponse};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/analyze", post(analyze::analyze_content))
        .with_state(state)
}

/// The served application: routes plus request id, tracing, optional timeout and CORS.
pub fn create_app(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let allowed_origin: HeaderValue = config
        .cors_allowed_origin
        .parse()
        .with_context(|| format!("invalid CORS_ALLOWED_ORIGIN {:?}", config.cors_allowed_origin))?;

    let mut app = create_router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_response(HttpOnResponse),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    if let Some(timeout) = config.request_timeout {
        app = app.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ));
    }

    // Wildcards are not allowed alongside credentials, so methods and headers are mirrored
    Ok(app.layer(
        CorsLayer::new()
            .allow_origin(allowed_origin)
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    ))
}
