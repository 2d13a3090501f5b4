//! Long-running processors of the indexing pipeline.
//!
//! - `Coordinator`: owns the event queue, pulls events from storage and
//!   hands checked-out events to workers
//! - `IndexWorker`: runs the indexer for one event at a time and reports
//!   the outcome

pub mod coordinator;
pub mod index_worker;

pub use coordinator::{Coordinator, CoordinatorError};
pub use index_worker::{IndexError, IndexWorker, Indexer};
