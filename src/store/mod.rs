//! Subscription storage.
//!
//! The dispatcher and the HTTP API consume the [`SubscriptionStore`] trait;
//! backends provide PostgreSQL (production) and in-memory (tests,
//! dependency-free development) implementations.

mod backend;
mod factory;
mod memory_backend;
mod postgres_backend;

pub use backend::{
    NewSubscription, StoreError, Subscription, SubscriptionStore, SubscriptionTotals,
};
pub use factory::create_subscription_store;
pub use memory_backend::MemorySubscriptionStore;
pub use postgres_backend::PostgresSubscriptionStore;
