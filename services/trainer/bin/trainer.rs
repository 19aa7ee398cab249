//! Main entrypoint for the voiced trainer.
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and command line.
//! 2. Preprocessing the study material into topics and questions once.
//! 3. Running an interactive session on the console or by voice.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use trainer_core::{
    TrainerContext,
    io::{InputHandler, OutputHandler},
    llm_client::{LLMClient, OpenAICompatibleClient},
    pipeline::Preprocessor,
    prompts::{PromptBook, load_prompt_dir},
    session::{SessionController, SessionOutcome},
    store::{CorpusStore, FileCorpusStore},
};
use voiced_trainer::{
    config::{Cli, Config},
    console::{ConsoleInput, ConsoleOutput},
    interrupt::Interrupt,
    source::find_source_file,
};

#[cfg(feature = "voice")]
const STT_MODEL: &str = "whisper-1";
#[cfg(feature = "voice")]
const TTS_MODEL: &str = "tts-1";

/// Picks console or voice handlers for each direction.
fn build_io(
    config: &Config,
    interrupt: Interrupt,
) -> (Box<dyn InputHandler>, Box<dyn OutputHandler>) {
    #[cfg(feature = "voice")]
    {
        use std::time::Duration;
        use trainer_core::speech::{OpenAISpeechToText, OpenAITextToSpeech};
        use voiced_trainer::voice::{CpalMicrophone, CpalSpeaker, VoiceInput, VoiceOutput};

        let speech_config = config.speech_config();
        if speech_config.is_none() && (config.voice_input || config.voice_output) {
            warn!("Voice requested but OPENAI_API_KEY is not set, using the console instead");
        }

        let input: Box<dyn InputHandler> = match (&speech_config, config.voice_input) {
            (Some(speech_config), true) => {
                info!(seconds = config.record_seconds, "Using voice input");
                Box::new(VoiceInput::new(
                    CpalMicrophone,
                    Arc::new(OpenAISpeechToText::new(
                        speech_config.clone(),
                        STT_MODEL.to_string(),
                        Some(config.language.tag().to_string()),
                    )),
                    ConsoleInput::stdin(interrupt.clone()),
                    Duration::from_secs(config.record_seconds),
                ))
            }
            _ => Box::new(ConsoleInput::stdin(interrupt.clone())),
        };
        let output: Box<dyn OutputHandler> = match (&speech_config, config.voice_output) {
            (Some(speech_config), true) => {
                info!(voice = %config.tts_voice, "Using voice output");
                Box::new(VoiceOutput::new(
                    CpalSpeaker,
                    Arc::new(OpenAITextToSpeech::new(
                        speech_config.clone(),
                        TTS_MODEL,
                        &config.tts_voice,
                    )),
                    ConsoleOutput::stdout(),
                ))
            }
            _ => Box::new(ConsoleOutput::stdout()),
        };
        (input, output)
    }

    #[cfg(not(feature = "voice"))]
    {
        if config.voice_input || config.voice_output {
            warn!("Built without the `voice` feature, using the console instead");
        }
        (
            Box::new(ConsoleInput::stdin(interrupt.clone())),
            Box::new(ConsoleOutput::stdout()),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    config
        .apply_cli(&cli)
        .context("Invalid command-line arguments")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        language = config.language.tag(),
        "Configuration loaded"
    );

    // --- 3. Initialize Shared Services ---
    let mut prompts = PromptBook::for_language(config.language);
    if let Some(prompts_path) = &config.prompts_path {
        let overrides = load_prompt_dir(prompts_path)
            .with_context(|| format!("Failed to load prompts from {}", prompts_path.display()))?;
        info!(count = overrides.len(), "Loaded prompt overrides");
        prompts = prompts.with_overrides(overrides);
    }
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        config.chat_config(),
        config.chat_model.clone(),
    ));
    let ctx = TrainerContext::new(llm_client, prompts, config.language);
    let store = Arc::new(FileCorpusStore::new(config.processed_dir()));

    // --- 4. Preprocess ---
    if config.skip_preprocessing {
        info!("Skipping preprocessing");
    } else {
        let preprocessor = Preprocessor::new(
            ctx.clone(),
            store.clone() as Arc<dyn CorpusStore>,
            config.pipeline_settings(),
        );
        if config.force_preprocessing || !preprocessor.is_done().await? {
            let source = find_source_file(&config.data_dir)?;
            info!(path = %source.display(), "Preprocessing study material");
            let text = tokio::fs::read_to_string(&source)
                .await
                .with_context(|| format!("Failed to read {}", source.display()))?;
            let outcome = preprocessor
                .run(&text, config.force_preprocessing)
                .await
                .inspect_err(|e| error!(error = %e, "Preprocessing failed"))?;
            let corpus = outcome.corpus();
            info!(
                topics = corpus.topics.len(),
                questions = corpus.questions.len(),
                dir = %store.dir().display(),
                "Preprocessing finished"
            );
        } else {
            info!(dir = %store.dir().display(), "Using stored topics and questions");
        }
    }

    // --- 5. Run Session ---
    // From here on Ctrl-C no longer kills the process; it ends the session.
    let interrupt = Interrupt::listen().context("Failed to install the Ctrl-C handler")?;
    let (mut input, mut output) = build_io(&config, interrupt);
    let mut controller = SessionController::new(ctx, config.session_settings());
    let outcome = controller
        .run_from_store(store.as_ref(), input.as_mut(), output.as_mut())
        .await?;
    info!(?outcome, "Session finished");

    if outcome == SessionOutcome::NoTopics {
        error!(dir = %store.dir().display(), "No topics available, run preprocessing first");
        std::process::exit(1);
    }
    Ok(())
}
