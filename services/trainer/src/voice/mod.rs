//! Spoken answers and spoken output.
//!
//! Input records a fixed-length clip, transcribes it, and lets the user
//! accept or correct the transcript by typing. Output always prints and then
//! speaks. Device or service failures degrade to plain console behaviour.

mod device;

pub use device::{CpalMicrophone, CpalSpeaker};

use crate::audio_utils::{decode_pcm16_le, encode_wav_mono16};
use crate::console::{ConsoleInput, ConsoleOutput};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};
use trainer_core::io::{InputHandler, OutputHandler};
use trainer_core::speech::{SpeechToText, TTS_PCM16_SAMPLE_RATE, TextToSpeech};

/// A mono clip at its capture rate.
#[derive(Debug, Clone)]
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

#[async_trait]
pub trait Microphone: Send + Sync {
    async fn record(&self, duration: Duration) -> Result<Recording>;
}

#[async_trait]
pub trait Speaker: Send + Sync {
    async fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()>;
}

pub struct VoiceInput<M, R, W> {
    microphone: M,
    stt: Arc<dyn SpeechToText>,
    console: ConsoleInput<R, W>,
    duration: Duration,
}

impl<M, R, W> VoiceInput<M, R, W>
where
    M: Microphone,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        microphone: M,
        stt: Arc<dyn SpeechToText>,
        console: ConsoleInput<R, W>,
        duration: Duration,
    ) -> Self {
        Self {
            microphone,
            stt,
            console,
            duration,
        }
    }

    async fn transcribe_answer(&mut self) -> Result<String> {
        let recording = self.microphone.record(self.duration).await?;
        let wav = encode_wav_mono16(&recording.samples, recording.sample_rate);
        let transcript = self.stt.transcribe(wav).await?;
        Ok(clean_transcript(&transcript).to_string())
    }
}

#[async_trait]
impl<M, R, W> InputHandler for VoiceInput<M, R, W>
where
    M: Microphone,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn get_input(&mut self, prompt: &str) -> Result<Option<String>> {
        if self.console.interrupted() {
            return Ok(None);
        }
        let announce = format!(
            "{} (speak now, recording for {} seconds)\n",
            prompt,
            self.duration.as_secs()
        );
        self.console.announce(&announce).await?;

        let transcribed = self.transcribe_answer().await;
        if self.console.interrupted() {
            return Ok(None);
        }
        let transcript = match transcribed {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                warn!("Empty transcript, falling back to text input");
                return self.console.get_input("Type your response:").await;
            }
            Err(e) => {
                warn!(error = %e, "Voice input failed, falling back to text input");
                return self.console.get_input("Type your response:").await;
            }
        };
        info!(chars = transcript.len(), "Transcribed answer");

        self.console
            .announce(&format!("Transcribed: {}\n", transcript))
            .await?;
        let correction = self
            .console
            .get_input("Press Enter to accept or type a correction:")
            .await?;
        Ok(correction.map(|typed| if typed.is_empty() { transcript } else { typed }))
    }
}

/// Drops the closing punctuation Whisper adds, so a spoken "Exit." still
/// matches the exit commands.
fn clean_transcript(text: &str) -> &str {
    text.trim().trim_end_matches(['.', '!', '?', '。']).trim_end()
}

pub struct VoiceOutput<S, W> {
    speaker: S,
    tts: Arc<dyn TextToSpeech>,
    console: ConsoleOutput<W>,
}

impl<S: Speaker, W: AsyncWrite + Unpin + Send> VoiceOutput<S, W> {
    pub fn new(speaker: S, tts: Arc<dyn TextToSpeech>, console: ConsoleOutput<W>) -> Self {
        Self {
            speaker,
            tts,
            console,
        }
    }

    async fn speak(&self, message: &str) -> Result<()> {
        let pcm = self.tts.synthesize(message).await?;
        let samples = decode_pcm16_le(&pcm);
        self.speaker.play(samples, TTS_PCM16_SAMPLE_RATE).await
    }
}

#[async_trait]
impl<S: Speaker, W: AsyncWrite + Unpin + Send> OutputHandler for VoiceOutput<S, W> {
    async fn display(&mut self, message: &str) -> Result<()> {
        self.console.display(message).await?;
        if message.trim().is_empty() {
            return Ok(());
        }
        if let Err(e) = self.speak(message.trim()).await {
            warn!(error = %e, "Voice output failed");
        }
        Ok(())
    }
}
