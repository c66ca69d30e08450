//! Cancellation of waits
//!
//! Uploads suspend in exactly two places: the throttle delay and the poll
//! interval of the synchronization wait. Both sleep through [`Interrupt::sleep`]
//! so a caller holding the matching [`InterruptHandle`] can cancel them.

use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Error, Result};

/// Sending half of an interrupt signal
#[derive(Debug)]
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

impl InterruptHandle {
    /// Fire the signal
    ///
    /// The signal stays set, so every later wait on the same observer fails too.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Create another observer for this signal
    pub fn subscribe(&self) -> Interrupt {
        Interrupt {
            rx: Some(self.tx.subscribe()),
        }
    }
}

/// Observing half of an interrupt signal
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    rx: Option<watch::Receiver<bool>>,
}

impl Interrupt {
    /// Create a connected handle and observer
    pub fn channel() -> (InterruptHandle, Interrupt) {
        let (tx, rx) = watch::channel(false);
        (InterruptHandle { tx }, Interrupt { rx: Some(rx) })
    }

    /// An observer that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Whether the signal has been fired
    pub fn is_triggered(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fail with [`Error::Interrupted`] if the signal has been fired
    pub fn check(&self, context: &str) -> Result<()> {
        if self.is_triggered() {
            Err(Error::Interrupted(context.to_string()))
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless the signal fires first
    pub async fn sleep(&self, duration: Duration, context: &str) -> Result<()> {
        self.check(context)?;
        let Some(rx) = &self.rx else {
            tokio::time::sleep(duration).await;
            return Ok(());
        };

        let mut rx = rx.clone();
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            Ok(_) = rx.wait_for(|triggered| *triggered) => {
                tracing::debug!("Wait interrupted: {context}");
                Err(Error::Interrupted(context.to_string()))
            }
        }
    }
}
