//! Messages passed between the coordinator and the index workers.
//!
//! # Flow
//!
//! 1. `Coordinator` checks events out of the queue and sends a `WorkItem`
//!    per event on the work channel.
//! 2. One `IndexWorker` receives each item, runs the indexer and answers
//!    with a `Completion`, whether indexing succeeded or not.
//! 3. `Coordinator` records the outcome and releases the events the
//!    completed one was blocking.

pub mod channels;
pub mod types;

pub use channels::{
    CompletionReceiver, CompletionSender, DEFAULT_CHANNEL_BUFFER, SharedWorkReceiver, WorkSender,
    completion_channel, work_channel,
};
pub use types::{Completion, WorkItem};
