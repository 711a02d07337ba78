/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService struct, which turns the configured
 * provider into a plain text-in/text-out `Translator`. Prompt rendering and model
 * selection live here; retries and fallbacks live in `translation::client`.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::Path;
use std::time::Instant;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::{Provider, Translator};

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    /// Any OpenAI-compatible API (x.ai, OpenAI, LM Studio)
    OpenAI {
        /// Client instance
        client: OpenAI,
    },

    /// Anthropic API service
    Anthropic {
        /// Client instance
        client: Anthropic,
    },
}

/// Replace the language placeholders of a prompt template with language names
pub fn render_system_prompt(template: &str, source_language: &str, target_language: &str) -> Result<String> {
    let source_name = language_utils::get_language_name(source_language)?;
    let target_name = language_utils::get_language_name(target_language)?;

    Ok(template
        .replace("{source_language}", &source_name)
        .replace("{target_language}", &target_name))
}

/// Read a prompt template from a file
pub fn load_prompt_file(path: &Path) -> Result<String> {
    let prompt = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
    Ok(prompt.trim().to_string())
}

/// Main translation service for subtitle translation
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// Rendered system prompt sent with every request
    system_prompt: String,

    /// Provider name used in logs
    name: String,
}

impl TranslationService {
    /// Create a new translation service for one language pair
    ///
    /// `prompt_override` replaces the configured prompt template.
    pub fn new(
        config: TranslationConfig,
        source_language: &str,
        target_language: &str,
        prompt_override: Option<&str>,
    ) -> Result<Self> {
        let template = prompt_override.unwrap_or(&config.common.system_prompt);
        let system_prompt = render_system_prompt(template, source_language, target_language)?;
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::XAI | ConfigTranslationProvider::OpenAI => {
                TranslationProviderImpl::OpenAI {
                    client: OpenAI::new(config.get_api_key(), config.get_endpoint(), timeout_secs),
                }
            }
            ConfigTranslationProvider::LMStudio => {
                // LM Studio often doesn't require an API key; use a default if empty
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };
                TranslationProviderImpl::OpenAI {
                    client: OpenAI::new(api_key, config.get_endpoint(), timeout_secs),
                }
            }
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(
                    config.get_api_key(),
                    config.get_endpoint(),
                    config.get_model(),
                    timeout_secs,
                ),
            },
        };

        let name = config.provider.display_name().to_string();
        Ok(Self {
            provider,
            config,
            system_prompt,
            name,
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        let result = match &self.provider {
            TranslationProviderImpl::OpenAI { client } => client.test_connection().await,
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
        };

        if result.is_ok() {
            info!("Successfully connected to {}", self.name);
        }
        result
    }

    /// Get the maximum number of tokens for a given model
    fn max_tokens_for_model(&self, model: &str) -> u32 {
        match model {
            // OpenAI models
            "gpt-4" | "gpt-4-0613" => 8192,
            "gpt-4-32k" | "gpt-4-32k-0613" => 32768,
            "gpt-4o" | "gpt-4o-mini" | "gpt-4-turbo" => 4096,
            "gpt-3.5-turbo" | "gpt-3.5-turbo-0613" => 4096,

            // x.ai models
            "grok-beta" | "grok-2" | "grok-2-latest" => 4096,

            // Anthropic models
            "claude-3-opus-20240229" => 4096,
            "claude-3-sonnet-20240229" => 4096,
            "claude-3-haiku-20240307" => 4096,
            "claude-3-5-sonnet-20241022" | "claude-3-5-haiku-20241022" => 8192,

            // Default for unknown models
            _ => 2048,
        }
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(&self, text: &str) -> Result<String, ProviderError> {
        let start_time = Instant::now();
        let model = self.config.get_model();
        let temperature = self.config.common.temperature;

        let translated = match &self.provider {
            TranslationProviderImpl::OpenAI { client } => {
                let request = OpenAIRequest::new(model.as_str())
                    .add_message("system", self.system_prompt.as_str())
                    .add_message("user", text)
                    .temperature(temperature)
                    .max_tokens(self.max_tokens_for_model(&model));
                let response = client.complete(request).await?;
                OpenAI::extract_text(&response)
            }
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(model.as_str(), self.max_tokens_for_model(&model))
                    .system(self.system_prompt.as_str())
                    .add_message("user", text)
                    .temperature(temperature);
                let response = client.complete(request).await?;
                Anthropic::extract_text(&response)
            }
        };

        debug!("{} response received in {:?}", self.name, start_time.elapsed());
        Ok(translated)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderSystemPrompt_shouldUseLanguageNames() {
        let prompt = render_system_prompt("From {source_language} to {target_language}.", "en", "es").unwrap();
        assert_eq!(prompt, "From English to Spanish.");
    }

    #[test]
    fn test_renderSystemPrompt_withUnknownLanguage_shouldFail() {
        assert!(render_system_prompt("{target_language}", "en", "xx").is_err());
    }

    #[test]
    fn test_new_withPromptOverride_shouldRenderOverride() {
        let service = TranslationService::new(
            TranslationConfig::default(),
            "en",
            "fr",
            Some("Translate into {target_language} only."),
        )
        .unwrap();

        assert_eq!(service.system_prompt(), "Translate into French only.");
        assert_eq!(service.name(), "x.ai");
    }

    #[test]
    fn test_maxTokensForModel_withUnknownModel_shouldUseDefault() {
        let service = TranslationService::new(TranslationConfig::default(), "en", "fr", None).unwrap();
        assert_eq!(service.max_tokens_for_model("grok-beta"), 4096);
        assert_eq!(service.max_tokens_for_model("something-new"), 2048);
    }
}
