use std::env;

use tracing::debug;

use crate::error::HandlerError;

/// Text-generation providers the backend knows how to talk to.
///
/// DeepSeek and Polza expose OpenAI-compatible chat-completion endpoints, so
/// the same client handles all three; only base URL, model and key differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    DeepSeek,
    Polza,
    OpenAi,
    /// No external provider: a deterministic placeholder script is produced.
    Mock,
}

impl Provider {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "deepseek" => Some(Provider::DeepSeek),
            "polza" => Some(Provider::Polza),
            "openai" => Some(Provider::OpenAi),
            "mock" => Some(Provider::Mock),
            _ => None,
        }
    }

    /// Provider-specific credential variable, tried before the generic
    /// `AI_API_KEY`.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Provider::Polza => Some("POLZA_API_KEY"),
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Mock => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Polza => "https://api.polza.ai/api/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Mock => "",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek-chat",
            Provider::Polza => "openai/gpt-4o-mini",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Mock => "mock",
        }
    }
}

/// LLM call settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Database settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub schema: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub db: Option<DbConfig>,
}

const DEFAULT_MAX_TOKENS: u32 = 4000;
const DEFAULT_TIMEOUT_SECS: u64 = 50;
const DEFAULT_SCHEMA: &str = "public";

impl Config {
    /// Resolve the full configuration from process environment variables.
    ///
    /// Provider precedence: an explicit `LLM_PROVIDER` always wins. Without
    /// it, the first provider whose key variable is set is used, newest
    /// variant first (DeepSeek, then Polza, then OpenAI). With no key at all
    /// the backend runs in mock mode.
    pub fn from_env() -> Result<Self, HandlerError> {
        Ok(Self {
            llm: LlmConfig::from_env()?,
            db: DbConfig::from_env(),
        })
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, HandlerError> {
        let provider = match env::var("LLM_PROVIDER") {
            Ok(name) => Provider::from_name(&name)
                .ok_or_else(|| HandlerError::Config(format!("unknown LLM provider: {}", name)))?,
            Err(_) => detect_provider(),
        };

        let api_key = match provider {
            Provider::Mock => String::new(),
            _ => resolve_api_key(provider).ok_or_else(|| {
                HandlerError::Config(format!(
                    "no API key configured for provider {:?} (set {} or AI_API_KEY)",
                    provider,
                    provider.api_key_env().unwrap_or("AI_API_KEY"),
                ))
            })?,
        };

        let model =
            env::var("LLM_MODEL").unwrap_or_else(|_| provider.default_model().to_string());
        let base_url =
            env::var("LLM_BASE_URL").unwrap_or_else(|_| provider.default_base_url().to_string());
        let max_tokens = env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        debug!("Resolved LLM provider: {:?}, model: {}", provider, model);

        Ok(Self {
            provider,
            api_key,
            model,
            base_url,
            max_tokens,
            timeout_secs,
        })
    }
}

impl DbConfig {
    pub fn from_env() -> Option<Self> {
        let url = env::var("DATABASE_URL").ok()?;
        let schema = env::var("MAIN_DB_SCHEMA").unwrap_or_else(|_| DEFAULT_SCHEMA.to_string());
        Some(Self { url, schema })
    }
}

/// Pick a provider by which credential is present. Order matters: the
/// DeepSeek key shadows the Polza key, which shadows the OpenAI key.
fn detect_provider() -> Provider {
    for provider in [Provider::DeepSeek, Provider::Polza, Provider::OpenAi] {
        if let Some(var) = provider.api_key_env() {
            if env::var(var).map(|v| !v.is_empty()).unwrap_or(false) {
                return provider;
            }
        }
    }
    Provider::Mock
}

/// Provider-specific key variable first, then the generic `AI_API_KEY`.
fn resolve_api_key(provider: Provider) -> Option<String> {
    if let Some(var) = provider.api_key_env() {
        if let Ok(key) = env::var(var) {
            if !key.is_empty() {
                return Some(key);
            }
        }
    }
    env::var("AI_API_KEY").ok().filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_llm_env() {
        for var in [
            "LLM_PROVIDER",
            "LLM_MODEL",
            "LLM_BASE_URL",
            "LLM_MAX_TOKENS",
            "LLM_TIMEOUT_SECS",
            "DEEPSEEK_API_KEY",
            "POLZA_API_KEY",
            "OPENAI_API_KEY",
            "AI_API_KEY",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_no_keys_means_mock_mode() {
        clear_llm_env();
        let config = LlmConfig::from_env().unwrap();
        assert_eq!(config.provider, Provider::Mock);
        assert!(config.api_key.is_empty());
    }

    #[test]
    #[serial]
    fn test_provider_detected_from_key_variable() {
        clear_llm_env();
        env::set_var("OPENAI_API_KEY", "sk-test");
        let config = LlmConfig::from_env().unwrap();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_deepseek_key_shadows_openai_key() {
        clear_llm_env();
        env::set_var("OPENAI_API_KEY", "sk-openai");
        env::set_var("DEEPSEEK_API_KEY", "sk-deepseek");
        let config = LlmConfig::from_env().unwrap();
        assert_eq!(config.provider, Provider::DeepSeek);
        assert_eq!(config.api_key, "sk-deepseek");
        assert_eq!(config.model, "deepseek-chat");
        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_explicit_provider_wins_over_detection() {
        clear_llm_env();
        env::set_var("DEEPSEEK_API_KEY", "sk-deepseek");
        env::set_var("LLM_PROVIDER", "polza");
        env::set_var("POLZA_API_KEY", "sk-polza");
        let config = LlmConfig::from_env().unwrap();
        assert_eq!(config.provider, Provider::Polza);
        assert_eq!(config.api_key, "sk-polza");
        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_generic_key_fallback() {
        clear_llm_env();
        env::set_var("LLM_PROVIDER", "deepseek");
        env::set_var("AI_API_KEY", "sk-generic");
        let config = LlmConfig::from_env().unwrap();
        assert_eq!(config.provider, Provider::DeepSeek);
        assert_eq!(config.api_key, "sk-generic");
        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_explicit_provider_without_key_is_config_error() {
        clear_llm_env();
        env::set_var("LLM_PROVIDER", "openai");
        let result = LlmConfig::from_env();
        assert!(matches!(result, Err(HandlerError::Config(_))));
        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_unknown_provider_name_is_config_error() {
        clear_llm_env();
        env::set_var("LLM_PROVIDER", "grok");
        let result = LlmConfig::from_env();
        assert!(matches!(result, Err(HandlerError::Config(_))));
        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_overrides_apply() {
        clear_llm_env();
        env::set_var("LLM_PROVIDER", "openai");
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("LLM_MODEL", "gpt-4o");
        env::set_var("LLM_BASE_URL", "http://localhost:8080/v1");
        env::set_var("LLM_MAX_TOKENS", "1234");
        env::set_var("LLM_TIMEOUT_SECS", "5");
        let config = LlmConfig::from_env().unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.max_tokens, 1234);
        assert_eq!(config.timeout_secs, 5);
        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_db_config_defaults_schema() {
        env::remove_var("MAIN_DB_SCHEMA");
        env::set_var("DATABASE_URL", "postgres://localhost/app");
        let db = DbConfig::from_env().unwrap();
        assert_eq!(db.schema, "public");
        env::set_var("MAIN_DB_SCHEMA", "t_app");
        let db = DbConfig::from_env().unwrap();
        assert_eq!(db.schema, "t_app");
        env::remove_var("DATABASE_URL");
        env::remove_var("MAIN_DB_SCHEMA");
    }

    #[test]
    #[serial]
    fn test_db_config_absent_without_url() {
        env::remove_var("DATABASE_URL");
        assert!(DbConfig::from_env().is_none());
    }
}
