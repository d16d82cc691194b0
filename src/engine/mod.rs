//! The attendance determinism engine: policy evaluation, session tracking,
//! the verification gate, and the single commit path every check-in method
//! funnels through.

pub mod error;
pub mod flow;
pub mod gate;
pub mod photo;
pub mod policy;
pub mod recorder;
pub mod session;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use utoipa::ToSchema;

use crate::engine::error::EngineError;

/// The two things that can happen to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceEvent {
    CheckIn,
    CheckOut,
}

/// Cooperative cancellation for the multi-step check-in flow. Cancelling
/// aborts the attempt at the next step boundary with zero partial commits;
/// any acquired camera is released on the way out.
#[derive(Clone)]
pub struct CancelToken {
    tx: watch::Sender<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn cancel(&self) {
        // send_replace so the flag sticks even with no subscribed waiters.
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called. Used in `select!` against
    /// suspension points (camera settle, frame acquisition, challenge).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // All senders gone without cancelling; never resolves.
                std::future::pending::<()>().await;
            }
        }
    }

    pub fn ensure_active(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
