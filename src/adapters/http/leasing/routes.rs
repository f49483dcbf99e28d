//! Axum router configuration for leasing endpoints.

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    cancel_subscription, handle_stripe_webhook, health, list_plans, list_subscriptions,
    list_transactions, start_checkout, LeaseAppState, USER_ID_HEADER,
};

/// Storefront and dashboard routes, mounted under `/api`.
///
/// # Routes
///
/// ## Public
/// - `GET /plans` - Plan catalog
///
/// ## User Endpoints (require `X-User-Id`)
/// - `POST /checkout` - Start hosted checkout
/// - `GET /subscriptions` - Caller's leases
/// - `POST /subscriptions/:id/cancel` - Cancel a lease
/// - `GET /transactions` - Caller's payments
pub fn leasing_routes() -> Router<LeaseAppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/checkout", post(start_checkout))
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscriptions/:id/cancel", post(cancel_subscription))
        .route("/transactions", get(list_transactions))
}

/// Processor webhooks. No user auth; deliveries are signature verified.
pub fn webhook_routes() -> Router<LeaseAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Complete application router with state applied.
///
/// An empty origin list allows any origin.
pub fn build_router(
    state: LeaseAppState,
    request_timeout: Duration,
    cors_origins: &[String],
) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", leasing_routes())
        .nest("/api/webhooks", webhook_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .allow_origin(allow_origin)
}
