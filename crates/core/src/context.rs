use crate::language::{Language, Vocabulary};
use crate::llm_client::{LLMClient, ask};
use crate::prompts::{PromptBook, PromptKey};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Everything a generation step needs: the text-generation client, the prompt
/// templates, and the session language.
///
/// Cheap to clone; the pipeline components and the session controller each
/// hold their own copy.
#[derive(Clone)]
pub struct TrainerContext {
    llm: Arc<dyn LLMClient>,
    prompts: Arc<PromptBook>,
    language: Language,
}

impl TrainerContext {
    pub fn new(llm: Arc<dyn LLMClient>, prompts: PromptBook, language: Language) -> Self {
        Self {
            llm,
            prompts: Arc::new(prompts),
            language,
        }
    }

    /// A context with the built-in prompts for `language`.
    pub fn with_builtin_prompts(llm: Arc<dyn LLMClient>, language: Language) -> Self {
        Self::new(llm, PromptBook::for_language(language), language)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn vocabulary(&self) -> &'static Vocabulary {
        self.language.vocabulary()
    }

    /// Renders a prompt and sends it.
    pub async fn ask(&self, key: PromptKey, vars: &[(&str, &str)]) -> Result<String> {
        let prompt = self.prompts.render(key, vars);
        debug!(prompt = key.name(), chars = prompt.user.len(), "Sending prompt");
        ask(self.llm.as_ref(), &prompt).await
    }
}
