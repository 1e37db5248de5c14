//! Cancellation scopes for workflows and activities

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Why a scope was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The workflow was canceled (caller cancellation or an explicit cancel)
    #[error("workflow canceled")]
    Canceled,

    /// A configured deadline elapsed before the work finished
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Interrupted {
    /// Stable code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    cause: OnceLock<Interrupted>,
    parent: Option<Arc<Inner>>,
}

/// A cancellation scope with an attached interrupt cause
///
/// Scopes form a tree. Cancelling a scope cancels all of its descendants,
/// and a descendant reports the cause recorded closest to it. This is the
/// seam through which deadlines and explicit cancellation reach workflow
/// and activity code.
///
/// # Example
///
/// ```
/// use windlass::{CancelScope, Interrupted};
///
/// let root = CancelScope::new();
/// let child = root.child();
///
/// root.cancel(Interrupted::Canceled);
///
/// assert!(child.is_canceled());
/// assert_eq!(child.interrupt_error(), Interrupted::Canceled);
/// ```
#[derive(Debug, Clone)]
pub struct CancelScope {
    inner: Arc<Inner>,
}

impl CancelScope {
    /// Create a new root scope
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                cause: OnceLock::new(),
                parent: None,
            }),
        }
    }

    /// Derive a child scope
    ///
    /// The child is cancelled whenever this scope is cancelled, but can also
    /// be cancelled on its own without affecting this scope.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.child_token(),
                cause: OnceLock::new(),
                parent: Some(self.inner.clone()),
            }),
        }
    }

    /// Cancel this scope and all of its descendants
    ///
    /// The first cause recorded on a scope wins; later calls only re-cancel.
    pub fn cancel(&self, cause: Interrupted) {
        let _ = self.inner.cause.set(cause);
        self.inner.token.cancel();
    }

    /// Whether this scope has been cancelled (directly or via an ancestor)
    pub fn is_canceled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Resolve when this scope is cancelled
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    /// The interrupt cause, if any was recorded on this scope or an ancestor
    pub fn cause(&self) -> Option<Interrupted> {
        let mut current = Some(&self.inner);
        while let Some(inner) = current {
            if let Some(cause) = inner.cause.get() {
                return Some(*cause);
            }
            current = inner.parent.as_ref();
        }
        None
    }

    /// The interrupt cause as an error, defaulting to [`Interrupted::Canceled`]
    pub fn interrupt_error(&self) -> Interrupted {
        self.cause().unwrap_or(Interrupted::Canceled)
    }

    /// Spawn a watcher that cancels this scope with a deadline cause after `timeout`
    ///
    /// The watcher exits on its own if the scope is cancelled first. Callers
    /// abort the returned handle once the guarded work finishes.
    pub(crate) fn deadline_watcher(&self, timeout: Duration) -> tokio::task::JoinHandle<()> {
        let scope = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => scope.cancel(Interrupted::DeadlineExceeded),
                _ = scope.cancelled() => {}
            }
        })
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}
