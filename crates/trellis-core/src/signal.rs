//! Single-resolution readiness signals.
//!
//! A [`Signal`] resolves at most once and stays resolved. Any number of tasks can wait on
//! clones of it; waiting on an already-resolved signal returns immediately. The host
//! application hands one to the layout restorer as its "started" signal, and the restorer
//! publishes its own "restored" signal the same way.

use std::sync::Arc;
use tokio::sync::watch;

/// Resolving half of a [`Signal`].
#[derive(Debug, Clone)]
pub struct SignalTrigger {
    tx: Arc<watch::Sender<bool>>,
}

/// Waiting half of a signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Signal {
    rx: watch::Receiver<bool>,
}

impl Signal {
    /// Create an unresolved signal and its trigger.
    pub fn new() -> (SignalTrigger, Signal) {
        let (tx, rx) = watch::channel(false);
        (SignalTrigger { tx: Arc::new(tx) }, Signal { rx })
    }

    /// A signal that is already resolved.
    pub fn resolved() -> Signal {
        let (_tx, rx) = watch::channel(true);
        Signal { rx }
    }

    pub fn is_resolved(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal resolves.
    ///
    /// Returns `false` if every trigger was dropped without resolving; the signal can then
    /// never resolve.
    pub async fn wait(&self) -> bool {
        let mut rx = self.rx.clone();
        let resolved = rx.wait_for(|resolved| *resolved).await.is_ok();
        resolved
    }
}

impl SignalTrigger {
    /// Resolve the signal. Returns `true` only for the call that actually resolved it.
    pub fn resolve(&self) -> bool {
        self.tx.send_if_modified(|resolved| {
            if *resolved {
                false
            } else {
                *resolved = true;
                true
            }
        })
    }

    pub fn is_resolved(&self) -> bool {
        *self.tx.borrow()
    }

    /// Another waiting handle for this trigger's signal.
    pub fn signal(&self) -> Signal {
        Signal {
            rx: self.tx.subscribe(),
        }
    }
}
