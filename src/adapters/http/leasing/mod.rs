//! HTTP adapter for the leasing service.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /api/plans` - Plan catalog
//! - `POST /api/checkout` - Start hosted checkout
//! - `GET /api/subscriptions` - Caller's leases
//! - `POST /api/subscriptions/:id/cancel` - Owner cancellation
//! - `GET /api/transactions` - Caller's payments
//! - `POST /api/webhooks/stripe` - Signed processor events

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, LeaseAppState, SIGNATURE_HEADER, USER_ID_HEADER};
pub use routes::{build_router, leasing_routes, webhook_routes};
