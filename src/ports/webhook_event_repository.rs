//! WebhookEventRepository port - ledger of applied processor events.
//!
//! The processor may deliver the same event more than once (timeouts,
//! 5xx responses, lost acknowledgements). Events recorded here are
//! acknowledged without running their handlers again.
//!
//! Only applied or ignored events are recorded. A failed attempt leaves
//! no trace so the redelivery runs in full.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// How an event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// Handlers ran and the store reflects the event.
    Applied,
    /// Event type outside the handled set.
    Ignored,
}

impl WebhookDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookDisposition::Applied => "applied",
            WebhookDisposition::Ignored => "ignored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "applied" => Some(WebhookDisposition::Applied),
            "ignored" => Some(WebhookDisposition::Ignored),
            _ => None,
        }
    }
}

/// Record of a processed webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEventRecord {
    /// Processor event ID (evt_xxx format).
    pub event_id: String,

    /// Raw processor event type.
    pub event_type: String,

    pub disposition: WebhookDisposition,

    /// What the handler concluded, e.g. `created` or `no_match`.
    pub detail: Option<String>,

    pub processed_at: Timestamp,
}

impl WebhookEventRecord {
    pub fn applied(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            disposition: WebhookDisposition::Applied,
            detail: Some(detail.into()),
            processed_at: Timestamp::now(),
        }
    }

    pub fn ignored(event_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            disposition: WebhookDisposition::Ignored,
            detail: None,
            processed_at: Timestamp::now(),
        }
    }
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Row was inserted.
    Inserted,
    /// A row with the same unique key already exists.
    AlreadyExists,
}

/// Port for storing and retrieving processed webhook events.
///
/// Implementations key on `event_id` with a unique constraint so
/// concurrent deliveries cannot both insert.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event by its processor event ID.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Record an event, doing nothing if it is already recorded.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_event_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn WebhookEventRepository) {}
    }

    #[test]
    fn applied_record_carries_detail() {
        let record = WebhookEventRecord::applied("evt_1", "checkout.session.completed", "created");
        assert_eq!(record.disposition, WebhookDisposition::Applied);
        assert_eq!(record.detail.as_deref(), Some("created"));
    }

    #[test]
    fn disposition_round_trips_through_str() {
        for disposition in [WebhookDisposition::Applied, WebhookDisposition::Ignored] {
            assert_eq!(WebhookDisposition::parse(disposition.as_str()), Some(disposition));
        }
        assert_eq!(WebhookDisposition::parse("failed"), None);
    }
}
