use std::sync::Arc;
use tokio::sync::watch;

/// Observable flag that is `true` while no run is in flight
///
/// The flag is lowered by [`Readiness::begin_run`] and raised again when the
/// returned [`RunGuard`] drops, so every exit path of a run restores it.
#[derive(Debug, Clone)]
pub struct Readiness {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    /// Create a flag in the ready state
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to flag changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Lower the flag until the returned guard drops
    pub fn begin_run(&self) -> RunGuard {
        self.set(false);
        RunGuard {
            readiness: self.clone(),
        }
    }

    fn set(&self, ready: bool) {
        // Only notify on an actual change
        let changed = self.tx.send_if_modified(|current| {
            if *current == ready {
                return false;
            }
            *current = ready;
            true
        });
        if changed {
            ::log::debug!("Readiness set to {}", ready);
        }
    }
}

/// Marks a run in progress; restores readiness when dropped
#[derive(Debug)]
#[must_use = "readiness is restored as soon as the guard is dropped"]
pub struct RunGuard {
    readiness: Readiness,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.readiness.set(true);
    }
}
