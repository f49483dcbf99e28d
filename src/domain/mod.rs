//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `leasing` - Plans, lease requests, subscriptions and reconciliation rules

pub mod foundation;
pub mod leasing;
