//! Data core of the shelter dashboard: a cached REST gateway, an in-memory
//! record store, persisted filter criteria and the statistics derived from
//! the filtered set.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod memo;
pub mod record;
pub mod stats;
pub mod storage;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

pub use cache::{Resource, ResponseCache};
pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{GatewayError, StorageError};
pub use filter::{AgeBucket, FilterCriteria, FilterEngine, FilterField};
pub use gateway::RemoteGateway;
pub use record::{DogPatch, DogRecord, ReferenceItem};
pub use stats::Stats;
pub use store::RecordStore;
