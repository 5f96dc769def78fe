//! Client-side query cache for the inventory API.
//!
//! This module keeps fetched data in memory and in sync with the server:
//! - One entry per query key (the collection, or one record by id)
//! - Background refetch of invalidated or aged data without dropping it
//! - Writes that patch the cache once the server confirms them
//! - Out-of-order responses for the same key are dropped by sequence number

mod entry;
mod invalidate;
mod key;
mod mutation;
mod store;
#[cfg(test)]
mod testing;

pub use entry::{CacheEntry, QueryData, QueryStatus};
pub use invalidate::InvalidateFilter;
pub use key::QueryKey;
pub use mutation::{Completion, Mutation, MutationHooks, MutationId};
pub use store::{CacheOptions, Listener, QueryCache, ResponseOrdering, RetryPolicy, SubscriptionId};
