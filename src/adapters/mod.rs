//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - Payment processor (plus a scriptable mock)
//! - `postgres` - Durable store
//! - `memory` - In-memory store for development and tests
//! - `http` - Axum REST API

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
