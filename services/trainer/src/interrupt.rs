//! Process-wide Ctrl-C latch.
//!
//! The signal handler is registered once and stays registered, so a Ctrl-C
//! pressed while the trainer waits on the model or the audio device is kept
//! until the next read picks it up.

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

/// Becomes set on the first Ctrl-C and stays set.
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// Registers the Ctrl-C handler and spawns the task that feeds the latch.
    /// Must be called from inside a tokio runtime.
    pub fn listen() -> Result<Self> {
        #[cfg(unix)]
        let mut signal =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
        #[cfg(windows)]
        let mut signal = tokio::signal::windows::ctrl_c()?;

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            while signal.recv().await.is_some() {
                info!("Interrupted by user");
                if tx.send(true).is_err() {
                    break;
                }
            }
        });
        Ok(Self { rx })
    }

    /// A latch driven by the caller instead of a signal.
    pub fn from_receiver(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A latch that never fires.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the latch is set. Pends forever if it never can be.
    pub async fn triggered(&mut self) {
        if self.rx.wait_for(|set| *set).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
