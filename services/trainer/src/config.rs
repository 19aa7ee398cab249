use async_openai::config::OpenAIConfig;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use trainer_core::Language;
use trainer_core::pipeline::PipelineSettings;
use trainer_core::session::{QuestionSource, SessionSettings};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backend providers for text generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

/// Command-line flags. Every flag overrides its environment variable.
#[derive(Parser, Debug, Default)]
#[command(version, about = "Interactive voice-enabled trainer for long-form study material")]
pub struct Cli {
    /// Number of topics to extract
    #[arg(long)]
    pub topics: Option<usize>,
    /// Questions asked per topic
    #[arg(long)]
    pub questions: Option<usize>,
    /// Total questions generated during preprocessing
    #[arg(long)]
    pub total_questions: Option<usize>,
    /// Session language (de or en)
    #[arg(long)]
    pub language: Option<String>,
    /// Directory holding the source .txt file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Answer by speaking into the microphone
    #[arg(long)]
    pub voice_input: bool,
    /// Read every message aloud
    #[arg(long)]
    pub voice_output: bool,
    /// Start the session without checking the preprocessing state
    #[arg(long, conflicts_with = "force_preprocessing")]
    pub skip_preprocessing: bool,
    /// Regenerate topics and questions even if already done
    #[arg(long)]
    pub force_preprocessing: bool,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    /// Prompt overrides; built-in prompts are used when unset.
    pub prompts_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    /// Explicit `PROCESSED_DIR`; defaults to `<data_dir>/processed`.
    pub processed_dir: Option<PathBuf>,
    pub language: Language,
    pub topic_count: usize,
    pub total_questions: usize,
    pub questions_per_topic: usize,
    pub chunk_size: usize,
    pub summary_batch_size: usize,
    pub hierarchical_min_chunks: usize,
    pub pipeline_concurrency: usize,
    pub question_source: QuestionSource,
    pub session_seed: Option<u64>,
    pub tts_voice: String,
    pub record_seconds: u64,
    pub voice_input: bool,
    pub voice_output: bool,
    pub skip_preprocessing: bool,
    pub force_preprocessing: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            _ => Provider::OpenAI,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH").ok().map(PathBuf::from);
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let processed_dir = std::env::var("PROCESSED_DIR").ok().map(PathBuf::from);

        match provider {
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            log_level,
            prompts_path,
            data_dir,
            processed_dir,
            language: parse_var("TRAINER_LANGUAGE", Language::German)?,
            topic_count: parse_var("NUM_TOPICS", 10)?,
            total_questions: parse_var("TOTAL_QUESTIONS", 10)?,
            questions_per_topic: parse_var("QUESTIONS_PER_TOPIC", 5)?,
            chunk_size: parse_var("CHUNK_SIZE", trainer_core::chunker::DEFAULT_CHUNK_SIZE)?,
            summary_batch_size: parse_var("SUMMARY_BATCH_SIZE", 10)?,
            hierarchical_min_chunks: parse_var("HIERARCHICAL_MIN_CHUNKS", 5)?,
            pipeline_concurrency: parse_var("PIPELINE_CONCURRENCY", 1)?,
            question_source: parse_var("QUESTION_SOURCE", QuestionSource::Live)?,
            session_seed: std::env::var("SESSION_SEED")
                .ok()
                .map(|raw| {
                    raw.parse::<u64>().map_err(|e| {
                        ConfigError::InvalidValue("SESSION_SEED".to_string(), e.to_string())
                    })
                })
                .transpose()?,
            tts_voice: std::env::var("TTS_VOICE").unwrap_or_else(|_| "nova".to_string()),
            record_seconds: parse_var("RECORD_SECONDS", 10)?,
            voice_input: false,
            voice_output: false,
            skip_preprocessing: false,
            force_preprocessing: false,
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), ConfigError> {
        if let Some(topics) = cli.topics {
            self.topic_count = topics;
        }
        if let Some(questions) = cli.questions {
            self.questions_per_topic = questions;
        }
        if let Some(total) = cli.total_questions {
            self.total_questions = total;
        }
        if let Some(language) = &cli.language {
            self.language = language
                .parse()
                .map_err(|e| ConfigError::InvalidValue("--language".to_string(), e))?;
        }
        if let Some(data_dir) = &cli.data_dir {
            self.data_dir = data_dir.clone();
        }
        self.voice_input |= cli.voice_input;
        self.voice_output |= cli.voice_output;
        self.skip_preprocessing |= cli.skip_preprocessing;
        self.force_preprocessing |= cli.force_preprocessing;
        Ok(())
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.processed_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("processed"))
    }

    /// Client configuration for the chat provider.
    pub fn chat_config(&self) -> OpenAIConfig {
        match self.provider {
            Provider::OpenAI => OpenAIConfig::new()
                .with_api_key(self.openai_api_key.clone().unwrap_or_default())
                .with_api_base(OPENAI_API_BASE),
            Provider::Gemini => OpenAIConfig::new()
                .with_api_key(self.gemini_api_key.clone().unwrap_or_default())
                .with_api_base(GEMINI_API_BASE),
        }
    }

    /// Client configuration for transcription and speech synthesis, which
    /// always go through OpenAI.
    pub fn speech_config(&self) -> Option<OpenAIConfig> {
        self.openai_api_key.as_ref().map(|key| {
            OpenAIConfig::new()
                .with_api_key(key)
                .with_api_base(OPENAI_API_BASE)
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            chunk_size: self.chunk_size,
            topic_count: self.topic_count,
            total_questions: self.total_questions,
            summary_batch_size: self.summary_batch_size,
            hierarchical_min_chunks: self.hierarchical_min_chunks,
            concurrency: self.pipeline_concurrency,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            questions_per_topic: self.questions_per_topic,
            question_source: self.question_source,
            seed: self.session_seed,
            ..SessionSettings::default()
        }
    }
}

/// Parses an optional environment variable, falling back to `default`.
fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
