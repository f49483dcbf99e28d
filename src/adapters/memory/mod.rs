//! In-memory adapters for local development and tests.

mod in_memory_lease_store;
#[cfg(test)]
mod stale_reads;

pub use in_memory_lease_store::InMemoryLeaseStore;
#[cfg(test)]
pub(crate) use stale_reads::StaleSubscriptionReads;
