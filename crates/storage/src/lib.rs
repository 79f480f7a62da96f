//! Persistence for the surge pipeline.
//!
//! Provides:
//! - [`SurgeStore`]: the commit-scoped insert interface the pipeline writes through
//! - [`Catalog`]: its PostgreSQL implementation
//! - [`JobQueue`]: Redis Streams transport for submitted surge jobs

pub mod catalog;
pub mod queue;
pub mod store;

pub use catalog::Catalog;
pub use queue::{ClaimedJob, JobQueue, SurgeJob};
pub use store::SurgeStore;
