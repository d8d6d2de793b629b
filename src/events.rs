//! Content events and their sequential processing
//!
//! Events are queued by producers and handled one at a time by a single worker holding the
//! store connection. The follow-up events a handler asks for are handled right after it,
//! before the next queued event.

use std::collections::VecDeque;

use cache::Connection;
use cms_models::ContentSource;
use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt as _;
use tokio::sync::mpsc;

use crate::projection::Projector;

/// Something happened in the content store
///
/// Serialized as one JSON object tagged by `event`, e.g.
/// `{"event":"document_saved","id":42,"is_update":true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContentEvent {
    DocumentSaved {
        id: i64,
        #[serde(default)]
        is_update: bool,
    },
    DocumentDeleted {
        id: i64,
    },
    /// The content store finished starting up
    ApplicationReady,
    /// Users or taxonomy terms changed
    ReferencesChanged,
}

#[derive(Debug, thiserror::Error)]
pub enum EventStreamError {
    #[error("event stream could not be read: {0}")]
    Read(#[from] std::io::Error),
    #[error("the event worker stopped")]
    WorkerStopped,
}

/// Producer side of the event queue
///
/// The worker stops once every queue handle is dropped and the pending events are handled.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: mpsc::Sender<ContentEvent>,
}

#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::Receiver<ContentEvent>,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` pending events
    pub fn new(capacity: usize) -> (Self, EventReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, EventReceiver { receiver })
    }

    /// Waits for room in the queue then enqueues `event`
    pub async fn push(&self, event: ContentEvent) -> Result<(), EventStreamError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| EventStreamError::WorkerStopped)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub handled: usize,
    pub failed: usize,
}

/// Handles queued events until the queue is closed
///
/// A failing handler is logged and counted, the worker moves on to the next event.
pub async fn run_worker<S: ContentSource>(
    projector: &Projector<S>,
    conn: &mut Connection,
    mut events: EventReceiver,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    while let Some(event) = events.receiver.recv().await {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            match projector.handle(conn, event.clone()).await {
                Ok(follow_ups) => {
                    stats.handled += 1;
                    pending.extend(follow_ups);
                }
                Err(error) => {
                    stats.failed += 1;
                    tracing::error!(?event, %error, "event handling failed");
                }
            }
        }
    }
    tracing::info!(?stats, "event queue closed");
    stats
}

/// Enqueues the events read from `reader`, one JSON object per line
///
/// Blank lines are ignored, malformed ones are logged and skipped. The queue handle is dropped
/// once the input is exhausted. Returns the number of enqueued events.
pub async fn read_events<R: AsyncBufRead + Unpin>(
    reader: R,
    queue: EventQueue,
) -> Result<usize, EventStreamError> {
    let mut lines = reader.lines();
    let mut nb_events = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ContentEvent>(line) {
            Ok(event) => {
                tracing::debug!(?event, "event received");
                queue.push(event).await?;
                nb_events += 1;
            }
            Err(error) => tracing::warn!(%error, line, "malformed event ignored"),
        }
    }
    Ok(nb_events)
}
