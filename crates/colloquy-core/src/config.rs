use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::exchange::{PolicyRule, PolicySet};
use crate::interfaces::GenerationParams;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    /// OpenAI-compatible `/chat/completions` endpoint.
    Chat,
    /// Offline echo responder.
    Echo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_backend")]
    pub backend: GeneratorBackend,
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,
    #[serde(default = "default_generator_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_generator_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_system_instructions")]
    pub system_instructions: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

fn default_generator_backend() -> GeneratorBackend {
    GeneratorBackend::Echo
}
fn default_generator_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_generator_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_generator_key_env() -> String {
    "COLLOQUY_GENERATOR_API_KEY".into()
}
fn default_system_instructions() -> String {
    "You are a helpful, concise assistant.".into()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f32 {
    0.7
}
fn default_generator_timeout() -> u64 {
    30
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: default_generator_backend(),
            base_url: default_generator_base_url(),
            model: default_generator_model(),
            api_key_env: default_generator_key_env(),
            system_instructions: default_system_instructions(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

impl GeneratorConfig {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            system_instructions: self.system_instructions.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationBackend {
    /// Remote moderation API.
    Http,
    /// Local term tables.
    Keyword,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_moderation_backend")]
    pub backend: ModerationBackend,
    #[serde(default)]
    pub endpoint: String,
    /// Optional: moderation services that need no token leave this unset.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "PolicyRule::input_defaults")]
    pub input_policies: Vec<PolicyRule>,
    #[serde(default = "PolicyRule::output_defaults")]
    pub output_policies: Vec<PolicyRule>,
    #[serde(default = "default_moderation_timeout")]
    pub timeout_secs: u64,
    /// Extra terms for the keyword filter, merged with the built-in tables.
    #[serde(default)]
    pub terms: BTreeMap<PolicyRule, Vec<String>>,
}

fn default_moderation_backend() -> ModerationBackend {
    ModerationBackend::Keyword
}
fn default_moderation_timeout() -> u64 {
    10
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            backend: default_moderation_backend(),
            endpoint: String::new(),
            api_key_env: None,
            input_policies: PolicyRule::input_defaults(),
            output_policies: PolicyRule::output_defaults(),
            timeout_secs: default_moderation_timeout(),
            terms: BTreeMap::new(),
        }
    }
}

impl ModerationConfig {
    pub fn input_set(&self) -> PolicySet {
        PolicySet::new(self.input_policies.iter().copied())
    }

    pub fn output_set(&self) -> PolicySet {
        PolicySet::new(self.output_policies.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorBackend {
    None,
    /// Append-only JSONL file.
    Jsonl,
    /// Remote document store (Sanity mutation API).
    Document,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    #[serde(default = "default_mirror_backend")]
    pub backend: MirrorBackend,
    #[serde(default = "default_mirror_dir")]
    pub dir: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_mirror_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    /// Overrides `https://{project_id}.api.sanity.io`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_mirror_timeout")]
    pub timeout_secs: u64,
    /// JSONL file size that triggers rotation on open.
    #[serde(default = "default_rotate_bytes")]
    pub rotate_bytes: u64,
}

fn default_mirror_backend() -> MirrorBackend {
    MirrorBackend::None
}
fn default_mirror_dir() -> String {
    "data/mirror".into()
}
fn default_dataset() -> String {
    "production".into()
}
fn default_api_version() -> String {
    "2021-03-25".into()
}
fn default_mirror_key_env() -> String {
    "COLLOQUY_MIRROR_TOKEN".into()
}
fn default_document_type() -> String {
    "chat".into()
}
fn default_rotate_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_mirror_timeout() -> u64 {
    10
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            backend: default_mirror_backend(),
            dir: default_mirror_dir(),
            project_id: String::new(),
            dataset: default_dataset(),
            api_version: default_api_version(),
            api_key_env: default_mirror_key_env(),
            document_type: default_document_type(),
            base_url: None,
            timeout_secs: default_mirror_timeout(),
            rotate_bytes: default_rotate_bytes(),
        }
    }
}

/// User-facing messages for the non-answered terminal states.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_input_unavailable")]
    pub input_unavailable_message: String,
    #[serde(default = "default_input_blocked_prefix")]
    pub input_blocked_prefix: String,
    #[serde(default = "default_generation_failed")]
    pub generation_failed_message: String,
    #[serde(default = "default_output_unavailable")]
    pub output_unavailable_message: String,
    #[serde(default = "default_output_blocked_prefix")]
    pub output_blocked_prefix: String,
}

fn default_input_unavailable() -> String {
    "Your message could not be checked right now. Please try again later.".into()
}
fn default_input_blocked_prefix() -> String {
    "Your message was blocked for: ".into()
}
fn default_generation_failed() -> String {
    "Sorry, I couldn't generate a response. Please try again later.".into()
}
fn default_output_unavailable() -> String {
    "The response could not be checked right now. Please try again later.".into()
}
fn default_output_blocked_prefix() -> String {
    "The response was withheld for: ".into()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_unavailable_message: default_input_unavailable(),
            input_blocked_prefix: default_input_blocked_prefix(),
            generation_failed_message: default_generation_failed(),
            output_unavailable_message: default_output_unavailable(),
            output_blocked_prefix: default_output_blocked_prefix(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback chain: explicit path → ./config/default.toml → hardcoded defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Self {
        if let Some(path) = explicit_path {
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {e}", path.display());
                }
            }
        }

        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            match Self::load(default_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load default config: {e}");
                }
            }
        }

        tracing::info!("Using hardcoded default configuration");
        Self::default()
    }
}

/// Read a credential from the environment variable named in config.
pub fn resolve_secret(env_name: &str) -> Result<String, ConfigError> {
    match std::env::var(env_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingSecret(env_name.to_string())),
    }
}
