//! Typed input and printed output.

use crate::interrupt::Interrupt;
use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use trainer_core::io::{InputHandler, OutputHandler};

/// Reads one line per answer. Ctrl-C or end of input reads as `None`.
pub struct ConsoleInput<R, W> {
    lines: Lines<R>,
    prompt_out: W,
    interrupt: Interrupt,
}

impl ConsoleInput<BufReader<Stdin>, Stdout> {
    pub fn stdin(interrupt: Interrupt) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .with_interrupt(interrupt)
    }
}

impl<R, W> ConsoleInput<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self {
            lines: reader.lines(),
            prompt_out,
            interrupt: Interrupt::never(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// True once Ctrl-C has been pressed, even outside a read.
    pub fn interrupted(&self) -> bool {
        self.interrupt.is_set()
    }

    /// Writes a status line to the prompt stream.
    pub async fn announce(&mut self, text: &str) -> Result<()> {
        self.prompt_out.write_all(text.as_bytes()).await?;
        self.prompt_out.flush().await?;
        Ok(())
    }

    /// Reads the next line without printing a prompt.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        if self.interrupt.is_set() {
            return Ok(None);
        }
        tokio::select! {
            biased;
            _ = self.interrupt.triggered() => Ok(None),
            line = self.lines.next_line() => Ok(line?.map(|l| l.trim().to_string())),
        }
    }
}

#[async_trait]
impl<R, W> InputHandler for ConsoleInput<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn get_input(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompt_out
            .write_all(format!("{} ", prompt).as_bytes())
            .await?;
        self.prompt_out.flush().await?;
        self.read_line().await
    }
}

/// Writes each message on its own line.
pub struct ConsoleOutput<W> {
    out: W,
}

impl ConsoleOutput<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputHandler for ConsoleOutput<W> {
    async fn display(&mut self, message: &str) -> Result<()> {
        self.out.write_all(message.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}
