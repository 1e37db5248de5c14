//! Signals and per-workflow signal channels

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::cancel::{CancelScope, Interrupted};

/// An external named message delivered to a running workflow
///
/// Two signals with the same name are separate deliveries, never coalesced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    /// Signal name
    pub name: String,

    /// Signal payload (JSON)
    pub payload: serde_json::Value,
}

impl Signal {
    /// Create a new signal
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

struct SignalChannel {
    tx: mpsc::Sender<serde_json::Value>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<serde_json::Value>>>,
}

/// Per-workflow map of signal name to bounded FIFO channel
///
/// A channel materialises on the first use of its name from either side,
/// the workflow receiving or the executor delivering. Later lookups on
/// either side find the same channel.
pub(crate) struct SignalHub {
    capacity: usize,
    channels: Mutex<HashMap<String, SignalChannel>>,
}

impl SignalHub {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn channel(&self, name: &str) -> (mpsc::Sender<serde_json::Value>, Arc<tokio::sync::Mutex<mpsc::Receiver<serde_json::Value>>>) {
        let mut channels = self.channels.lock();
        let channel = channels.entry(name.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::channel(self.capacity);
            SignalChannel {
                tx,
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            }
        });
        (channel.tx.clone(), channel.rx.clone())
    }

    /// Sender half for delivering a signal payload
    pub(crate) fn sender(&self, name: &str) -> mpsc::Sender<serde_json::Value> {
        self.channel(name).0
    }

    /// Receiver handle for workflow code
    pub(crate) fn receiver(&self, name: &str, scope: CancelScope) -> SignalReceiver {
        let (_, rx) = self.channel(name);
        SignalReceiver {
            name: name.to_string(),
            rx,
            scope,
        }
    }
}

/// Receiving end of a named signal channel
///
/// Payloads arrive in the order the corresponding signal calls returned.
/// Repeated [`WorkflowContext::receive_signal`](super::WorkflowContext::receive_signal)
/// calls with the same name yield handles over the same live channel.
#[derive(Clone)]
pub struct SignalReceiver {
    name: String,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<serde_json::Value>>>,
    scope: CancelScope,
}

impl SignalReceiver {
    /// The signal name this receiver is bound to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next payload
    ///
    /// Unblocks with an error when the workflow scope is cancelled.
    pub async fn recv(&self) -> Result<serde_json::Value, Interrupted> {
        tokio::select! {
            payload = async {
                let mut rx = self.rx.lock().await;
                rx.recv().await
            } => payload.ok_or_else(|| self.scope.interrupt_error()),
            _ = self.scope.cancelled() => Err(self.scope.interrupt_error()),
        }
    }

    /// Take the next payload if one is already buffered
    pub fn try_recv(&self) -> Option<serde_json::Value> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}
