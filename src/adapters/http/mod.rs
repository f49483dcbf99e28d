//! HTTP adapters - REST API implementations.

pub mod leasing;

pub use leasing::{build_router, LeaseAppState};
