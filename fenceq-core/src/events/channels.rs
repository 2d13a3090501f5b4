//! Channel factories for the coordinator and workers.

use super::types::{Completion, WorkItem};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Buffer size of the completion channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// The work channel is unbounded so the coordinator never waits on workers
/// that are themselves waiting to report completions. Its length is bounded
/// by the coordinator's maximum queue size.
pub type WorkSender = mpsc::UnboundedSender<WorkItem>;
/// Work receiver shared by every worker; each item goes to one of them.
pub type SharedWorkReceiver = Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>;

pub type CompletionSender = mpsc::Sender<Completion>;
pub type CompletionReceiver = mpsc::Receiver<Completion>;

pub fn work_channel() -> (WorkSender, SharedWorkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Arc::new(Mutex::new(rx)))
}

pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
