use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::handlers::persistence::PersistenceAdapter;
use crate::models::location::LocationRecord;

pub enum PersistJob {
    Save {
        key: Arc<str>,
        records: Vec<LocationRecord>,
    },
    /// Answered once every job queued before it has finished.
    Flush(oneshot::Sender<()>),
}

/// Background task applying snapshot writes in the order they were queued.
pub struct PersistenceWriter;

impl PersistenceWriter {
    pub fn spawn(adapter: PersistenceAdapter, buffer: usize) -> mpsc::Sender<PersistJob> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        tokio::spawn(Self::run_actor(adapter, rx));
        tx
    }

    pub async fn run_actor(adapter: PersistenceAdapter, mut rx: mpsc::Receiver<PersistJob>) {
        while let Some(job) = rx.recv().await {
            match job {
                PersistJob::Save { key, records } => adapter.save(&key, &records).await,
                PersistJob::Flush(done) => {
                    debug!("Persistence queue flushed");
                    done.send(()).ok();
                }
            }
        }
        info!("Persistence writer stopped");
    }
}
