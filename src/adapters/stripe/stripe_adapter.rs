//! Stripe payment provider adapter.
//!
//! Implements `PaymentProvider` against the Stripe REST API: form-encoded
//! requests, basic auth with the secret key, and a client-wide timeout so
//! no call can hang a checkout or cancellation.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::from_payment_config(&app_config.payment);
//! let adapter = StripePaymentAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::PaymentConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::leasing::BillingEvent;
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentErrorCode, PaymentProvider,
};

use super::webhook_types::{StripeCheckoutSession, StripeCustomer, StripeErrorBody};
use super::webhook_verifier::{WebhookVerifier, DEFAULT_TOLERANCE_SECS};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    api_base_url: String,
    timeout: Duration,
    signature_tolerance_secs: i64,
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            signature_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            require_livemode: false,
        }
    }

    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        Self::new(
            config.stripe_api_key.clone(),
            config.stripe_webhook_secret.clone(),
        )
        .with_base_url(config.api_base_url.clone())
        .with_timeout(config.api_timeout())
        .with_signature_tolerance(config.signature_tolerance_secs)
        .with_require_livemode(config.require_livemode)
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_signature_tolerance(mut self, secs: i64) -> Self {
        self.signature_tolerance_secs = secs;
        self
    }

    /// Reject test-mode webhook events.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    fn verifier(&self) -> WebhookVerifier {
        WebhookVerifier::new(self.webhook_secret.clone())
            .with_tolerance(self.signature_tolerance_secs)
            .with_require_livemode(self.require_livemode)
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    verifier: WebhookVerifier,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Build the adapter and its HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            verifier: config.verifier(),
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
    }

    /// Send a request and decode the success body, mapping failures.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PaymentError> {
        let response = request.send().await.map_err(|e| transport_error(operation, e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = api_error(status, &body);
            tracing::error!(
                operation,
                status = status.as_u16(),
                code = %error.code,
                provider_code = error.provider_code.as_deref().unwrap_or(""),
                "Stripe request failed"
            );
            return Err(error);
        }

        response.json::<T>().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn transport_error(operation: &'static str, error: reqwest::Error) -> PaymentError {
    tracing::warn!(operation, error = %error, "Stripe request did not complete");
    if error.is_timeout() {
        PaymentError::timeout(format!("{} timed out", operation))
    } else {
        PaymentError::network(error.to_string())
    }
}

/// Map a non-2xx Stripe response to a `PaymentError`.
fn api_error(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorBody>(body).ok();
    let provider_code = parsed.as_ref().and_then(|b| b.error.code.clone());
    let message = parsed
        .as_ref()
        .and_then(|b| b.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let code = match (status.as_u16(), provider_code.as_deref()) {
        (_, Some("resource_missing")) | (404, _) => PaymentErrorCode::NotFound,
        (401, _) => PaymentErrorCode::AuthenticationError,
        (429, _) => PaymentErrorCode::RateLimitExceeded,
        (400..=499, _) => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match provider_code {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

/// Form fields for a checkout session, in Stripe's bracket notation.
fn checkout_form(request: &CreateCheckoutRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "subscription".to_string()),
        ("customer".to_string(), request.customer_id.clone()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        params.push((format!("line_items[{}][price]", i), item.price_ref.clone()));
        params.push((format!("line_items[{}][quantity]", i), item.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
        params.push((
            format!("subscription_data[metadata][{}]", key),
            value.clone(),
        ));
    }

    params
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut params = vec![("metadata[user_id]", request.user_id.to_string())];
        if let Some(email) = &request.email {
            params.push(("email", email.clone()));
        }
        if let Some(name) = &request.name {
            params.push(("name", name.clone()));
        }

        let mut http = self
            .authorized(self.http_client.post(self.url("/v1/customers")))
            .form(&params);
        if let Some(key) = &request.idempotency_key {
            http = http.header("Idempotency-Key", key);
        }

        let customer: StripeCustomer = self.execute("create_customer", http).await?;
        tracing::info!(user_id = %request.user_id, customer_id = %customer.id, "Stripe customer created");

        Ok(Customer {
            id: customer.id,
            email: customer.email.or(request.email),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let http = self
            .authorized(self.http_client.post(self.url("/v1/checkout/sessions")))
            .form(&checkout_form(&request));

        let session: StripeCheckoutSession = self.execute("create_checkout_session", http).await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session has no URL"))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
            expires_at: session.expires_at,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        let http = self.authorized(
            self.http_client
                .delete(self.url(&format!("/v1/subscriptions/{}", subscription_id))),
        );

        let _: serde_json::Value = self.execute("cancel_subscription", http).await?;
        Ok(())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, PaymentError> {
        self.verifier.verify(payload, signature, Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Money;
    use crate::domain::leasing::{Billing, LineItem, LineItemKind, LockTier};
    use std::collections::BTreeMap;

    fn item(kind: LineItemKind, price_ref: &str, cents: i64, billing: Billing) -> LineItem {
        LineItem {
            kind,
            description: price_ref.to_string(),
            price_ref: price_ref.to_string(),
            amount: Money::from_cents(cents),
            billing,
            quantity: 1,
        }
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request Encoding
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn checkout_form_lists_line_items_in_order() {
        let mut metadata = BTreeMap::new();
        metadata.insert("user_id".to_string(), "user-1".to_string());
        metadata.insert("plan_type".to_string(), "premium".to_string());

        let request = CreateCheckoutRequest {
            customer_id: "cus_1".to_string(),
            line_items: vec![
                item(LineItemKind::BasePlan, "price_premium", 5250, Billing::Monthly),
                item(LineItemKind::Insurance, "price_insurance", 999, Billing::Monthly),
                item(LineItemKind::Lock(LockTier::Cable), "price_cable", 2000, Billing::OneTime),
            ],
            success_url: "https://lease.example.edu/checkout/success".to_string(),
            cancel_url: "https://lease.example.edu/scooters".to_string(),
            metadata,
        };

        let params = checkout_form(&request);

        assert_eq!(value(&params, "mode"), Some("subscription"));
        assert_eq!(value(&params, "customer"), Some("cus_1"));
        assert_eq!(value(&params, "line_items[0][price]"), Some("price_premium"));
        assert_eq!(value(&params, "line_items[1][price]"), Some("price_insurance"));
        assert_eq!(value(&params, "line_items[2][price]"), Some("price_cable"));
        assert_eq!(value(&params, "line_items[2][quantity]"), Some("1"));
        assert_eq!(value(&params, "metadata[user_id]"), Some("user-1"));
        assert_eq!(
            value(&params, "subscription_data[metadata][plan_type]"),
            Some("premium")
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn resource_missing_maps_to_not_found() {
        let err = api_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":{"code":"resource_missing","message":"No such subscription: 'sub_gone'"}}"#,
        );
        assert!(err.is_resource_missing());
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
        assert!(err.message.contains("sub_gone"));
    }

    #[test]
    fn status_codes_map_to_error_codes() {
        let cases = [
            (401, PaymentErrorCode::AuthenticationError),
            (429, PaymentErrorCode::RateLimitExceeded),
            (400, PaymentErrorCode::InvalidRequest),
            (500, PaymentErrorCode::ProviderError),
            (503, PaymentErrorCode::ProviderError),
        ];
        for (status, code) in cases {
            let status = reqwest::StatusCode::from_u16(status).unwrap();
            assert_eq!(api_error(status, "").code, code, "status {}", status);
        }
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        assert!(api_error(reqwest::StatusCode::BAD_GATEWAY, "").retryable);
        assert!(!api_error(reqwest::StatusCode::BAD_REQUEST, "").retryable);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_from_payment_config_carries_settings() {
        let payment = PaymentConfig {
            stripe_api_key: "sk_test_1".to_string(),
            stripe_webhook_secret: "whsec_1".to_string(),
            api_base_url: "http://localhost:12111/".to_string(),
            api_timeout_secs: 5,
            signature_tolerance_secs: 120,
            require_livemode: true,
        };

        let config = StripeConfig::from_payment_config(&payment);

        assert_eq!(config.api_base_url, "http://localhost:12111");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.signature_tolerance_secs, 120);
        assert!(config.require_livemode);
    }

    #[tokio::test]
    async fn adapter_verifies_with_configured_secret() {
        let adapter = StripePaymentAdapter::new(StripeConfig::new("sk_test_1", "whsec_1")).unwrap();
        let body = br#"{"id":"evt_1","type":"ping","created":1724572800,"data":{"object":{}}}"#;
        let header = super::super::sign_payload("whsec_1", Timestamp::now().as_unix_secs(), body);

        let event = adapter.verify_webhook(body, &header).await.unwrap();
        assert_eq!(event.id, "evt_1");
    }
}
