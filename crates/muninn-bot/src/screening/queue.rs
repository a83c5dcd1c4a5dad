//! Ordered work queue in front of the screening engine.
//!
//! Joins, leaves and rechecks wait on the screening lock, which is held
//! across the support fetch. One worker task runs them in arrival order so
//! the sync loop keeps feeding the space cache, the name index and the
//! other commands in the meantime.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use muninn_core::error::{BotError, Result};
use muninn_core::protocol::{EventId, RoomId, UserId};

use crate::screening::engine::ScreeningEngine;

#[derive(Debug)]
pub enum ScreeningJob {
    Join { user: UserId, event_id: EventId },
    Leave { user: UserId },
    Recheck { room_id: RoomId, user: UserId, event_id: EventId },
    /// Answered once every job queued before it has run.
    Flush(oneshot::Sender<()>),
}

impl ScreeningJob {
    fn name(&self) -> &'static str {
        match self {
            ScreeningJob::Join { .. } => "join",
            ScreeningJob::Leave { .. } => "leave",
            ScreeningJob::Recheck { .. } => "recheck",
            ScreeningJob::Flush(_) => "flush",
        }
    }
}

#[derive(Clone)]
pub struct ScreeningQueue {
    tx: mpsc::UnboundedSender<ScreeningJob>,
}

impl ScreeningQueue {
    /// Start the worker. Must be called within a tokio runtime; the worker
    /// stops once every queue handle is dropped.
    pub fn spawn(engine: Arc<ScreeningEngine>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(engine, rx));
        (Self { tx }, worker)
    }

    pub fn submit(&self, job: ScreeningJob) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|e| BotError::Internal(format!("screening worker stopped, {} job lost", e.0.name())))
    }

    /// Wait until everything submitted so far has been handled.
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.submit(ScreeningJob::Flush(done))?;
        wait.await
            .map_err(|_| BotError::Internal("screening worker stopped".into()))
    }
}

async fn run(engine: Arc<ScreeningEngine>, mut rx: mpsc::UnboundedReceiver<ScreeningJob>) {
    while let Some(job) = rx.recv().await {
        let name = job.name();
        let result = match job {
            ScreeningJob::Join { user, event_id } => engine.on_join(&user, &event_id).await.map(|_| ()),
            ScreeningJob::Leave { user } => engine.on_leave(&user).await.map(|_| ()),
            ScreeningJob::Recheck { room_id, user, event_id } => {
                engine.recheck(&room_id, &user, &event_id).await.map(|_| ())
            }
            ScreeningJob::Flush(done) => {
                let _ = done.send(());
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::error!(job = name, kind = e.kind().as_str(), error = %e, "screening job failed");
        }
    }
    tracing::debug!("screening worker stopped");
}
