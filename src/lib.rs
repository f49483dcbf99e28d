//! Scooter Lease - checkout and entitlement reconciliation service.
//!
//! Takes a student's plan selection through hosted checkout, confirms it
//! from signed payment-processor events, and materializes the resulting
//! lease as a local subscription record.
//!
//! Layout follows a ports-and-adapters split:
//!
//! - `domain` - plan catalog, lease requests, subscriptions, reconciliation rules
//! - `ports` - traits for the payment processor and the stores
//! - `adapters` - Stripe, PostgreSQL, in-memory and HTTP implementations
//! - `application` - command and query handlers
//! - `config` - environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
