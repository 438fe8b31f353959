use crate::chain::ChainReader;
use crate::types::BlockSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic task that owns the current `BlockSnapshot`.
///
/// The poller is the only writer; everyone else holds a `watch::Receiver`
/// and sees whole snapshots only. A failed poll leaves the previous
/// snapshot in place.
pub struct BlockPoller<R: ChainReader + ?Sized> {
    reader: Arc<R>,
    interval: Duration,
}

impl<R: ChainReader + ?Sized + 'static> BlockPoller<R> {
    pub fn new(reader: Arc<R>, interval: Duration) -> Self {
        Self { reader, interval }
    }

    pub fn spawn(self) -> PollerHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn(run_poller(
            self.reader,
            self.interval,
            snapshot_tx,
            shutdown_rx,
            refresh.clone(),
        ));

        PollerHandle {
            snapshot: snapshot_rx,
            refresh,
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

async fn run_poller<R: ChainReader + ?Sized>(
    reader: Arc<R>,
    period: Duration,
    snapshot_tx: watch::Sender<Option<BlockSnapshot>>,
    mut shutdown_rx: oneshot::Receiver<()>,
    refresh: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {}
            _ = refresh.notified() => {}
        }

        match reader.current_block().await {
            Ok(snapshot) => {
                let changed = snapshot_tx.send_if_modified(|current| {
                    if *current == Some(snapshot) {
                        false
                    } else {
                        *current = Some(snapshot);
                        true
                    }
                });
                if changed {
                    tracing::debug!("New block {} ({:?})", snapshot.number, snapshot.hash);
                }
            }
            Err(e) => {
                tracing::warn!("Block poll failed, keeping previous snapshot: {}", e);
            }
        }
    }

    tracing::debug!("Block poller stopped");
}

pub struct PollerHandle {
    snapshot: watch::Receiver<Option<BlockSnapshot>>,
    refresh: Arc<Notify>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Latest complete snapshot, if any poll has succeeded yet.
    pub fn latest(&self) -> Option<BlockSnapshot> {
        *self.snapshot.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BlockSnapshot>> {
        self.snapshot.clone()
    }

    /// Poll now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Wait until a snapshot newer than the one last seen is published.
    pub async fn next(&mut self) -> Option<BlockSnapshot> {
        self.snapshot.changed().await.ok()?;
        *self.snapshot.borrow_and_update()
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
