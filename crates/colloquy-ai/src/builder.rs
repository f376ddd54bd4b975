//! Wire an [`ExchangePipeline`] from configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colloquy_core::config::{
    resolve_secret, AppConfig, GeneratorBackend, GeneratorConfig, MirrorBackend, MirrorConfig,
    ModerationBackend, ModerationConfig,
};
use colloquy_core::{ContentFilter, MirrorSink, ResponseGenerator};

use crate::llm::{ChatCompletionGenerator, EchoGenerator};
use crate::mirror::{DocumentMirror, JsonlMirror};
use crate::moderation::{HttpModerationFilter, KeywordFilter};
use crate::pipeline::ExchangePipeline;

/// Build the full pipeline. Secrets are read from the environment variables
/// named in config; a missing secret for a selected backend is an error.
pub fn build_pipeline(config: &AppConfig) -> Result<ExchangePipeline> {
    let filter = build_filter(&config.moderation)?;
    let generator = build_generator(&config.generator)?;

    let mut pipeline = ExchangePipeline::new(filter, generator)
        .with_policies(config.moderation.input_set(), config.moderation.output_set())
        .with_messages(config.pipeline.clone());

    if let Some(sink) = build_mirror(&config.mirror)? {
        pipeline = pipeline.with_mirror(sink);
    }
    Ok(pipeline)
}

pub fn build_filter(config: &ModerationConfig) -> Result<Arc<dyn ContentFilter>> {
    match config.backend {
        ModerationBackend::Keyword => {
            tracing::info!("Moderation: local keyword filter");
            Ok(Arc::new(KeywordFilter::new().with_terms(config.terms.clone())))
        }
        ModerationBackend::Http => {
            let api_key = config
                .api_key_env
                .as_deref()
                .map(resolve_secret)
                .transpose()?;
            let filter = HttpModerationFilter::new(
                config.endpoint.clone(),
                api_key,
                Duration::from_secs(config.timeout_secs),
            )
            .context("Failed to create moderation client")?;
            tracing::info!("Moderation: {}", config.endpoint);
            Ok(Arc::new(filter))
        }
    }
}

pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn ResponseGenerator>> {
    match config.backend {
        GeneratorBackend::Echo => {
            tracing::info!("Generator: echo");
            Ok(Arc::new(EchoGenerator))
        }
        GeneratorBackend::Chat => {
            let api_key = resolve_secret(&config.api_key_env)?;
            let generator = ChatCompletionGenerator::new(
                config.base_url.clone(),
                config.model.clone(),
                api_key,
                config.params(),
                Duration::from_secs(config.timeout_secs),
            )
            .context("Failed to create generation client")?;
            tracing::info!("Generator: {} via {}", config.model, config.base_url);
            Ok(Arc::new(generator))
        }
    }
}

pub fn build_mirror(config: &MirrorConfig) -> Result<Option<Arc<dyn MirrorSink>>> {
    match config.backend {
        MirrorBackend::None => Ok(None),
        MirrorBackend::Jsonl => {
            let mirror: Arc<dyn MirrorSink> = Arc::new(
                JsonlMirror::open_with_rotation(Path::new(&config.dir), config.rotate_bytes)
                    .with_context(|| format!("Failed to open mirror log in {}", config.dir))?,
            );
            Ok(Some(mirror))
        }
        MirrorBackend::Document => {
            let base_url = match &config.base_url {
                Some(url) => url.clone(),
                None if !config.project_id.is_empty() => {
                    DocumentMirror::project_base_url(&config.project_id)
                }
                None => anyhow::bail!("mirror.project_id or mirror.base_url is required"),
            };
            let token = resolve_secret(&config.api_key_env)?;
            let mirror = DocumentMirror::new(
                &base_url,
                &config.api_version,
                &config.dataset,
                token,
                config.document_type.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .context("Failed to create document mirror client")?;
            tracing::info!("Mirror: {}", mirror.url());
            let mirror: Arc<dyn MirrorSink> = Arc::new(mirror);
            Ok(Some(mirror))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::{ExchangeStatus, TranscriptStore};

    #[tokio::test]
    async fn default_config_builds_offline_pipeline() {
        let pipeline = build_pipeline(&AppConfig::default()).unwrap();
        let mut store = TranscriptStore::new();

        let ex = pipeline.submit(&mut store, "hello").await.unwrap();
        assert_eq!(ex.status, ExchangeStatus::Answered);
        assert_eq!(ex.bot_response, "You said: 'hello'. I heard you!");
    }

    #[tokio::test]
    async fn default_config_blocks_profanity() {
        let pipeline = build_pipeline(&AppConfig::default()).unwrap();
        let mut store = TranscriptStore::new();

        let ex = pipeline.submit(&mut store, "well damn").await.unwrap();
        assert_eq!(ex.status, ExchangeStatus::BlockedInput);
        assert!(ex.bot_response.contains("profanity"));
    }

    #[test]
    fn chat_backend_requires_secret() {
        let config = GeneratorConfig {
            backend: GeneratorBackend::Chat,
            api_key_env: "COLLOQUY_TEST_UNSET_GENERATOR_KEY".into(),
            ..GeneratorConfig::default()
        };
        let err = build_generator(&config).err().unwrap();
        assert!(err.to_string().contains("COLLOQUY_TEST_UNSET_GENERATOR_KEY"));
    }

    #[test]
    fn http_moderation_requires_endpoint() {
        let config = ModerationConfig {
            backend: ModerationBackend::Http,
            ..ModerationConfig::default()
        };
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn document_mirror_requires_project() {
        let config = MirrorConfig {
            backend: MirrorBackend::Document,
            ..MirrorConfig::default()
        };
        assert!(build_mirror(&config).is_err());
    }

    #[test]
    fn no_mirror_by_default() {
        assert!(build_mirror(&MirrorConfig::default()).unwrap().is_none());
    }
}
