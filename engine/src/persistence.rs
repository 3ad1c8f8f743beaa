//! Background writer that keeps the durable copy of a game session current.
//!
//! Callers enqueue full snapshots and move on. A single task applies the jobs
//! in the order they were queued, so the newest snapshot is the last write.

use std::sync::Arc;

use database::{Storage, WriteOutcome};
use tokio::sync::{mpsc, oneshot};
use types::{Game, HistoryEntry};
use uuid::Uuid;

enum Job {
    SaveGame(Game),
    SaveHistory {
        game_id: Uuid,
        entries: Vec<HistoryEntry>,
    },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl PersistenceQueue {
    /// Starts the writer task. Must be called from within a tokio runtime.
    pub fn spawn(storage: Arc<Storage>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::SaveGame(game) => {
                        let outcome = storage.save_game(&game).await;
                        log_outcome("game", game.id, outcome);
                    }
                    Job::SaveHistory { game_id, entries } => {
                        let outcome = storage.save_game_history(game_id, &entries).await;
                        log_outcome("history", game_id, outcome);
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            log::debug!("Persistence queue closed");
        });
        Self { tx }
    }

    pub fn save_game(&self, game: Game) {
        let id = game.id;
        if self.tx.send(Job::SaveGame(game)).is_err() {
            log::warn!("Persistence worker stopped, game {id} not saved");
        }
    }

    pub fn save_history(&self, game_id: Uuid, entries: Vec<HistoryEntry>) {
        if self
            .tx
            .send(Job::SaveHistory { game_id, entries })
            .is_err()
        {
            log::warn!("Persistence worker stopped, history for {game_id} not saved");
        }
    }

    /// Resolves once every job queued before this call has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

fn log_outcome(what: &str, game_id: Uuid, outcome: WriteOutcome) {
    match outcome {
        WriteOutcome::Primary => log::debug!("Saved {what} for {game_id}"),
        WriteOutcome::LocalCache => log::debug!("Saved {what} for {game_id} to local cache"),
        WriteOutcome::Failed => log::error!("Could not save {what} for {game_id}"),
    }
}
