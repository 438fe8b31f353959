use crate::chain::ChainReader;
use crate::contract::ContractGateway;
use crate::types::PredictionEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use web3::types::Address;

/// Largest block range asked for in a single `eth_getLogs` call.
const MAX_LOG_RANGE: u64 = 1_000;

/// Polls contract logs and forwards decoded prediction events.
pub struct EventWatcher<G: ?Sized, R: ?Sized> {
    gateway: Arc<G>,
    reader: Arc<R>,
    interval: Duration,
    from_block: Option<u64>,
    predictor: Option<Address>,
}

impl<G, R> EventWatcher<G, R>
where
    G: ContractGateway + ?Sized + 'static,
    R: ChainReader + ?Sized + 'static,
{
    pub fn new(gateway: Arc<G>, reader: Arc<R>, interval: Duration) -> Self {
        Self {
            gateway,
            reader,
            interval,
            from_block: None,
            predictor: None,
        }
    }

    /// Start from `block` instead of the next block after the current head.
    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn only_predictor(mut self, predictor: Address) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn spawn(self) -> EventSubscription {
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(self.run(tx));
        EventSubscription { events: rx, task }
    }

    async fn run(self, tx: mpsc::Sender<PredictionEvent>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cursor = self.from_block;

        loop {
            ticker.tick().await;

            let head = match self.reader.current_block().await {
                Ok(snapshot) => snapshot.number,
                Err(e) => {
                    tracing::warn!("Event watcher could not read head: {}", e);
                    continue;
                }
            };

            let from = *cursor.get_or_insert(head + 1);
            if from > head {
                continue;
            }
            let to = head.min(from + MAX_LOG_RANGE - 1);

            let events = match self.gateway.prediction_events(from, to).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!("Failed to fetch events {}..={}: {}", from, to, e);
                    continue;
                }
            };

            for event in events {
                if self.predictor.is_some_and(|p| p != event.predictor()) {
                    continue;
                }
                if tx.send(event).await.is_err() {
                    tracing::debug!("Event subscriber gone, stopping watcher");
                    return;
                }
            }

            cursor = Some(to + 1);
        }
    }
}

/// Receiving end of an `EventWatcher`. Dropping it stops the watcher.
pub struct EventSubscription {
    events: mpsc::Receiver<PredictionEvent>,
    task: JoinHandle<()>,
}

impl EventSubscription {
    pub async fn recv(&mut self) -> Option<PredictionEvent> {
        self.events.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
