use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Level;

use crate::handlers::{bridge_a_to_b, bridge_b_to_a, get_balance, health};
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    let cors = CorsLayer::permissive();
    let body_limit = RequestBodyLimitLayer::new(64 * 1024);
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &axum::http::Request<_>| {
            let req_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri(),
                req_id
            )
        })
        .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
        .on_response(
            tower_http::trace::DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Millis),
        );
    let req_id = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id());

    Router::new()
        .route("/health", get(health))
        .route("/bridge/a-to-b", post(bridge_a_to_b))
        .route("/bridge/b-to-a", post(bridge_b_to_a))
        .route("/balance/{asset}/{address}", get(get_balance))
        .layer(cors)
        .layer(trace)
        .layer(req_id)
        .layer(body_limit)
}
