//! HTTP handlers for leasing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Json, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckoutSettings,
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, ListPlansHandler,
    ListSubscriptionsHandler, ListSubscriptionsQuery, ListTransactionsHandler,
    ListTransactionsQuery, StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::domain::leasing::{LeaseError, PlanCatalog, WebhookError};
use crate::ports::{
    CustomerProfileRepository, PaymentProvider, ScooterInventory, SubscriptionRepository,
    TransactionRepository, WebhookEventRepository,
};

use super::dto::{
    CatalogResponse, CheckoutRequest, CheckoutResponse, ErrorResponse, HealthResponse,
    SubscriptionResponse, TransactionResponse, WebhookAck,
};

/// Header the upstream auth gateway sets to the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the processor's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct LeaseAppState {
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub profiles: Arc<dyn CustomerProfileRepository>,
    pub inventory: Arc<dyn ScooterInventory>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub catalog: Arc<PlanCatalog>,
    pub checkout: CheckoutSettings,
}

impl LeaseAppState {
    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.payment_provider.clone(),
            self.profiles.clone(),
            self.inventory.clone(),
            self.catalog.clone(),
            self.checkout.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(
            self.payment_provider.clone(),
            self.subscriptions.clone(),
            self.transactions.clone(),
            self.profiles.clone(),
            self.webhook_events.clone(),
            self.catalog.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.subscriptions.clone(), self.payment_provider.clone())
    }

    pub fn list_subscriptions_handler(&self) -> ListSubscriptionsHandler {
        ListSubscriptionsHandler::new(self.subscriptions.clone())
    }

    pub fn list_transactions_handler(&self) -> ListTransactionsHandler {
        ListTransactionsHandler::new(self.transactions.clone())
    }

    pub fn list_plans_handler(&self) -> ListPlansHandler {
        ListPlansHandler::new(self.catalog.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the request.
///
/// Authentication happens at the gateway in front of this service, which
/// forwards the verified user id in `X-User-Id`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("UNAUTHORIZED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/plans - Storefront catalog
pub async fn list_plans(State(state): State<LeaseAppState>) -> impl IntoResponse {
    Json(CatalogResponse::from(state.list_plans_handler().handle()))
}

/// GET /api/subscriptions - Caller's leases, newest first
pub async fn list_subscriptions(
    State(state): State<LeaseAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, LeaseApiError> {
    let rows = state
        .list_subscriptions_handler()
        .handle(ListSubscriptionsQuery {
            user_id: user.user_id,
        })
        .await?;

    let response: Vec<SubscriptionResponse> =
        rows.into_iter().map(SubscriptionResponse::from).collect();
    Ok(Json(response))
}

/// GET /api/transactions - Caller's payment history, newest first
pub async fn list_transactions(
    State(state): State<LeaseAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, LeaseApiError> {
    let rows = state
        .list_transactions_handler()
        .handle(ListTransactionsQuery {
            user_id: user.user_id,
        })
        .await?;

    let response: Vec<TransactionResponse> =
        rows.into_iter().map(TransactionResponse::from).collect();
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout - Start hosted checkout
pub async fn start_checkout(
    State(state): State<LeaseAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, LeaseApiError> {
    let email = request.email.clone();
    let cmd = StartCheckoutCommand {
        user_id: user.user_id,
        email,
        request: request.into_lease_request()?,
    };

    let result = state.start_checkout_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(result))))
}

/// POST /api/subscriptions/:id/cancel - Owner cancellation
pub async fn cancel_subscription(
    State(state): State<LeaseAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, LeaseApiError> {
    // An unparseable id cannot name any stored subscription
    let subscription_id = id
        .parse::<SubscriptionId>()
        .map_err(|_| LeaseError::validation("id", "must be a UUID"))?;

    let result = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand {
            user_id: user.user_id,
            subscription_id,
        })
        .await?;

    Ok(Json(SubscriptionResponse::from(result.subscription)))
}

/// POST /api/webhooks/stripe - Signed processor event intake
pub async fn handle_stripe_webhook(
    State(state): State<LeaseAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook delivery without signature header");
            WebhookError::InvalidSignature
        })?;

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    state.webhook_handler().handle(cmd).await?;

    Ok(Json(WebhookAck { received: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts lease errors to HTTP responses.
#[derive(Debug)]
pub struct LeaseApiError(LeaseError);

impl From<LeaseError> for LeaseApiError {
    fn from(err: LeaseError) -> Self {
        Self(err)
    }
}

impl LeaseApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            LeaseError::Validation { .. } | LeaseError::InvalidPlan(_) => StatusCode::BAD_REQUEST,
            LeaseError::SubscriptionNotFound(_) | LeaseError::ScooterNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            LeaseError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaseError::AlreadyCancelled(_)
            | LeaseError::ScooterUnavailable(_)
            | LeaseError::InvalidState { .. } => StatusCode::CONFLICT,
            LeaseError::PaymentProcessor { .. } => StatusCode::BAD_GATEWAY,
            LeaseError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LeaseApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        // Store failures are reported without their internals
        let message = match &self.0 {
            LeaseError::Infrastructure(_) => "Internal error, please retry".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}

/// API error type for the webhook endpoint.
///
/// The status code drives the processor's redelivery.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::LivemodeMismatch => "LIVEMODE_MISMATCH",
            WebhookError::MissingMetadata(_) => "MISSING_METADATA",
            WebhookError::InvalidMetadata { .. } => "INVALID_METADATA",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::UnresolvedOwner(_) => "UNRESOLVED_OWNER",
            WebhookError::Storage(_) => "STORAGE_ERROR",
        };
        let message = match &self.0 {
            WebhookError::Storage(_) => "Temporary failure, retry later".to_string(),
            other => other.to_string(),
        };
        (self.0.status_code(), Json(ErrorResponse::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ScooterId;

    fn status_of(err: LeaseError) -> StatusCode {
        LeaseApiError::from(err).into_response().status()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(status_of(LeaseError::validation("x", "bad")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(LeaseError::invalid_plan("gold")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(LeaseError::forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(LeaseError::SubscriptionNotFound(SubscriptionId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LeaseError::already_cancelled(SubscriptionId::new())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LeaseError::ScooterUnavailable(ScooterId::new())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn upstream_and_store_failures_map_to_5xx() {
        assert_eq!(
            status_of(LeaseError::payment_processor("down", true)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(LeaseError::infrastructure("pool timeout")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn webhook_errors_use_their_status() {
        let response = WebhookApiError::from(WebhookError::InvalidSignature).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = WebhookApiError::from(WebhookError::storage("db")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
