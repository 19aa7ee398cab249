//! Speech collaborators: transcription of recorded answers and synthesis of
//! spoken output. Device capture and playback live outside the core.

use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        AudioInput, CreateSpeechRequestArgs, CreateTranscriptionRequestArgs, SpeechModel,
        SpeechResponseFormat, Voice,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// Sample rate of the raw PCM16 audio returned by [`OpenAITextToSpeech`].
pub const TTS_PCM16_SAMPLE_RATE: u32 = 24_000;

/// Turns a recorded WAV file into a transcript.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Turns text into mono little-endian PCM16 audio at [`TTS_PCM16_SAMPLE_RATE`].
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Whisper transcription through the OpenAI audio API.
pub struct OpenAISpeechToText {
    client: Client<OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl OpenAISpeechToText {
    pub fn new(config: OpenAIConfig, model: String, language: Option<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            language,
        }
    }
}

#[async_trait]
impl SpeechToText for OpenAISpeechToText {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        let mut builder = CreateTranscriptionRequestArgs::default();
        builder
            .file(AudioInput::from_vec_u8("answer.wav".to_string(), wav))
            .model(&self.model);
        if let Some(language) = &self.language {
            builder.language(language);
        }
        let request = builder.build()?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .context("Transcription request failed")?;
        debug!(chars = response.text.len(), "Received transcript");
        Ok(response.text.trim().to_string())
    }
}

/// Text-to-speech through the OpenAI audio API.
pub struct OpenAITextToSpeech {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenAITextToSpeech {
    /// `voice` is an OpenAI voice name such as `"nova"`; unknown names fall back to nova.
    pub fn new(config: OpenAIConfig, model: &str, voice: &str) -> Self {
        Self {
            client: Client::with_config(config),
            model: speech_model(model),
            voice: voice_by_name(voice),
        }
    }
}

#[async_trait]
impl TextToSpeech for OpenAITextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.model.clone())
            .voice(self.voice.clone())
            .response_format(SpeechResponseFormat::Pcm)
            .build()?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .context("Speech synthesis request failed")?;
        Ok(response.bytes.to_vec())
    }
}

fn speech_model(name: &str) -> SpeechModel {
    match name {
        "tts-1-hd" => SpeechModel::Tts1Hd,
        _ => SpeechModel::Tts1,
    }
}

fn voice_by_name(name: &str) -> Voice {
    match name.to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Nova,
    }
}
