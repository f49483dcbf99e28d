//! Mock payment provider for testing.
//!
//! A configurable in-process `PaymentProvider`. Supports:
//! - Call tracking, including the full checkout requests
//! - Error injection per method or for the next call
//! - Real webhook verification when given a signing secret

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::Timestamp;
use crate::domain::leasing::BillingEvent;
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentProvider,
};

use super::webhook_verifier::WebhookVerifier;

/// Mock payment provider for testing.
///
/// Clones share state, so a test can keep one handle for assertions and
/// hand another to the code under test.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::with_webhook_secret("whsec_test");
/// mock.set_method_error("cancel_subscription", PaymentError::network("down"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_customer_seq: u32,
    next_session_seq: u32,

    /// Error to return on the next call to any method.
    next_error: Option<PaymentError>,

    /// Errors returned on every call to the named method.
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
    checkout_requests: Vec<CreateCheckoutRequest>,
    customer_requests: Vec<CreateCustomerRequest>,
    cancelled_subscriptions: Vec<String>,

    verifier: Option<WebhookVerifier>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that verifies webhooks exactly like the real adapter.
    pub fn with_webhook_secret(secret: &str) -> Self {
        let mock = Self::new();
        mock.state().verifier = Some(WebhookVerifier::new(SecretString::new(secret.to_string())));
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn last_checkout_request(&self) -> Option<CreateCheckoutRequest> {
        self.state().checkout_requests.last().cloned()
    }

    pub fn last_customer_request(&self) -> Option<CreateCustomerRequest> {
        self.state().customer_requests.last().cloned()
    }

    /// External subscription ids passed to `cancel_subscription` successfully.
    pub fn cancelled_subscriptions(&self) -> Vec<String> {
        self.state().cancelled_subscriptions.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, then surface any injected error for it.
    fn enter(&self, method: &str, args: Vec<String>) -> Result<(), PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        match state.next_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.enter("create_customer", vec![request.user_id.to_string()])?;

        let mut state = self.state();
        state.next_customer_seq += 1;
        let customer = Customer {
            id: format!("cus_mock_{}", state.next_customer_seq),
            email: request.email.clone(),
        };
        state.customer_requests.push(request);
        Ok(customer)
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.enter(
            "create_checkout_session",
            vec![request.customer_id.clone(), request.line_items.len().to_string()],
        )?;

        let mut state = self.state();
        state.next_session_seq += 1;
        let id = format!("cs_mock_{}", state.next_session_seq);
        state.checkout_requests.push(request);

        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/c/pay/{}", id),
            expires_at: Some(Timestamp::now().plus_secs(24 * 60 * 60).as_unix_secs()),
            id,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        self.enter("cancel_subscription", vec![subscription_id.to_string()])?;
        self.state()
            .cancelled_subscriptions
            .push(subscription_id.to_string());
        Ok(())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, PaymentError> {
        self.enter("verify_webhook", vec![signature.to_string()])?;

        let verifier = self.state().verifier.clone();
        match verifier {
            Some(verifier) => verifier.verify(payload, signature, Timestamp::now()),
            None => Err(PaymentError::invalid_webhook("No signing secret configured")),
        }
    }
}
