//! The user I/O boundary of a session.

use anyhow::Result;
use async_trait::async_trait;

/// Source of user answers.
#[async_trait]
pub trait InputHandler: Send {
    /// Shows `prompt` and blocks until the user answers.
    ///
    /// Returns `Ok(None)` when the user interrupts (Ctrl-C) or the input
    /// stream is closed; the session treats that like an exit command.
    async fn get_input(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Sink for everything the session says to the user.
#[async_trait]
pub trait OutputHandler: Send {
    async fn display(&mut self, message: &str) -> Result<()>;
}
