//! Webhook signature verification.
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 using the
//! endpoint's signing secret. A delivery is trusted only if one of the
//! `v1` signatures matches in constant time and the timestamp is fresh.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;
use crate::domain::leasing::BillingEvent;
use crate::ports::{PaymentError, PaymentErrorCode};

use super::webhook_types::{hex_encode, SignatureHeader, StripeWebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of a signed timestamp.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Clock skew allowed for timestamps ahead of ours.
const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Verifies and decodes webhook deliveries.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
    require_livemode: bool,
}

impl WebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            require_livemode: false,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    /// Verify `signature_header` against `payload` and decode the event.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: Timestamp,
    ) -> Result<BillingEvent, PaymentError> {
        let header = SignatureHeader::parse(signature_header).map_err(|e| {
            tracing::warn!(error = %e, "Malformed webhook signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        self.check_timestamp(header.timestamp, now)?;
        self.check_signature(payload, &header)?;

        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Signed webhook payload is not an event");
            PaymentError::malformed_payload(format!("Invalid JSON: {}", e))
        })?;

        if self.require_livemode && !stripe_event.livemode {
            tracing::warn!(event_id = %stripe_event.id, "Rejected test mode event");
            return Err(PaymentError::new(
                PaymentErrorCode::LivemodeMismatch,
                "Test mode events are not accepted",
            ));
        }

        stripe_event.into_billing_event()
    }

    fn check_timestamp(&self, signed_at: i64, now: Timestamp) -> Result<(), PaymentError> {
        let now = now.as_unix_secs();
        let Some(age) = now.checked_sub(signed_at) else {
            tracing::warn!(event_timestamp = signed_at, "Webhook timestamp out of range");
            return Err(PaymentError::webhook_expired("Event timestamp out of range"));
        };

        if age > self.tolerance_secs {
            tracing::warn!(
                event_timestamp = signed_at,
                current_time = now,
                age_secs = age,
                "Webhook timestamp too old, possible replay"
            );
            return Err(PaymentError::webhook_expired(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_SKEW_SECS {
            tracing::warn!(
                event_timestamp = signed_at,
                current_time = now,
                "Webhook timestamp in the future"
            );
            return Err(PaymentError::webhook_expired("Event timestamp in future"));
        }

        Ok(())
    }

    fn check_signature(&self, payload: &[u8], header: &SignatureHeader) -> Result<(), PaymentError> {
        let expected = compute_signature(
            self.secret.expose_secret().as_bytes(),
            header.timestamp,
            payload,
        )?;

        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| bool::from(expected.as_slice().ct_eq(provided.as_slice())));

        if !matched {
            tracing::warn!(
                signatures = header.v1_signatures.len(),
                "Webhook signature mismatch"
            );
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }
        Ok(())
    }
}

fn compute_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| PaymentError::invalid_webhook(format!("Unusable signing secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used by tests and local tooling to produce deliveries the verifier
/// accepts.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = compute_signature(secret.as_bytes(), timestamp, payload)
        .map(|bytes| hex_encode(&bytes))
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::leasing::BillingEventKind;

    const SECRET: &str = "whsec_test_secret";

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::new(SECRET.to_string()))
    }

    fn payload(livemode: bool) -> Vec<u8> {
        format!(
            r#"{{"id":"evt_1","type":"customer.subscription.deleted","created":1724572800,"livemode":{},"data":{{"object":{{"id":"sub_1"}}}}}}"#,
            livemode
        )
        .into_bytes()
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn accepts_correctly_signed_payload() {
        let body = payload(false);
        let header = sign_payload(SECRET, 1724572800, &body);

        let event = verifier().verify(&body, &header, at(1724572810)).unwrap();

        assert_eq!(event.id, "evt_1");
        assert!(matches!(event.kind, BillingEventKind::SubscriptionDeleted(_)));
    }

    #[test]
    fn rejects_signature_from_another_secret() {
        let body = payload(false);
        let header = sign_payload("whsec_other", 1724572800, &body);

        let err = verifier().verify(&body, &header, at(1724572800)).unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[test]
    fn rejects_tampered_payload() {
        let body = payload(false);
        let header = sign_payload(SECRET, 1724572800, &body);
        let tampered = String::from_utf8(body).unwrap().replace("sub_1", "sub_2");

        let err = verifier()
            .verify(tampered.as_bytes(), &header, at(1724572800))
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[test]
    fn accepts_any_matching_v1_during_secret_rotation() {
        let body = payload(false);
        let good = sign_payload(SECRET, 1724572800, &body);
        let stale = sign_payload("whsec_old", 1724572800, &body);
        let stale_v1 = stale.split_once(",v1=").unwrap().1;
        let header = format!("{},v1={}", good, stale_v1);

        assert!(verifier().verify(&body, &header, at(1724572800)).is_ok());
    }

    #[test]
    fn missing_header_is_invalid_webhook() {
        let err = verifier().verify(&payload(false), "", at(0)).unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Timestamp Window
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn rejects_stale_timestamp() {
        let body = payload(false);
        let header = sign_payload(SECRET, 1724572800, &body);

        let err = verifier().verify(&body, &header, at(1724572800 + 301)).unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::WebhookExpired);
    }

    #[test]
    fn rejects_timestamp_far_in_future() {
        let body = payload(false);
        let header = sign_payload(SECRET, 1724572800 + 61, &body);

        let err = verifier().verify(&body, &header, at(1724572800)).unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::WebhookExpired);
    }

    #[test]
    fn extreme_timestamps_are_expired_not_overflowed() {
        let body = payload(false);

        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1=00", t);
            let err = verifier().verify(&body, &header, at(1724572800)).unwrap_err();
            assert_eq!(err.code, PaymentErrorCode::WebhookExpired);
        }
    }

    #[test]
    fn honours_custom_tolerance() {
        let body = payload(false);
        let header = sign_payload(SECRET, 1724572800, &body);

        let strict = verifier().with_tolerance(10);
        assert!(strict.verify(&body, &header, at(1724572811)).is_err());
        assert!(strict.verify(&body, &header, at(1724572810)).is_ok());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payload
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn signed_garbage_is_malformed() {
        let body = b"not json".to_vec();
        let header = sign_payload(SECRET, 1724572800, &body);

        let err = verifier().verify(&body, &header, at(1724572800)).unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::MalformedPayload);
    }

    #[test]
    fn livemode_guard_rejects_test_events() {
        let body = payload(false);
        let header = sign_payload(SECRET, 1724572800, &body);

        let err = verifier()
            .with_require_livemode(true)
            .verify(&body, &header, at(1724572800))
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::LivemodeMismatch);

        let live = payload(true);
        let header = sign_payload(SECRET, 1724572800, &live);
        assert!(verifier()
            .with_require_livemode(true)
            .verify(&live, &header, at(1724572800))
            .is_ok());
    }
}
