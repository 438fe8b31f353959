use crate::error::{PredictionError, Result};
use blockcast_core::PredictionKey;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Keys with a submit or reveal currently in progress.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuards {
    keys: Arc<Mutex<HashSet<PredictionKey>>>,
}

impl InFlightGuards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: PredictionKey) -> Result<InFlightGuard> {
        if !self.keys.lock().insert(key) {
            tracing::warn!("Refusing concurrent operation on {}", key);
            return Err(PredictionError::OperationInFlight(key));
        }

        Ok(InFlightGuard {
            key,
            keys: self.keys.clone(),
        })
    }

    pub fn is_in_flight(&self, key: &PredictionKey) -> bool {
        self.keys.lock().contains(key)
    }
}

/// Released when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    key: PredictionKey,
    keys: Arc<Mutex<HashSet<PredictionKey>>>,
}

impl InFlightGuard {
    pub fn key(&self) -> PredictionKey {
        self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}
