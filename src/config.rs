use anyhow::Context;
use rand::RngCore;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are DietMate, a friendly assistant for nutrition, \
diets and meal planning. Answer clearly and concisely. When the user attaches a file, use its \
content to ground your answer.";

#[derive(Clone)]
pub struct Config {
    // Server configuration
    pub host: String,
    pub port: u16,

    // Session tokens
    pub secret_key: String,
    pub token_ttl: Duration,

    // Upstream completion service
    pub upstream: UpstreamConfig,

    // Prompt assembly
    pub system_prompt: String,
    pub history_limit: usize,
    pub max_attachment_chars: usize,
    pub template_dir: Option<PathBuf>,

    // Persistence
    pub interaction_log_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_key = match var("SECRET_KEY") {
            Some(secret) => {
                if secret.len() < 32 {
                    tracing::warn!("SECRET_KEY is shorter than 32 bytes");
                }
                secret
            }
            None => {
                tracing::warn!(
                    "⚠️ SECRET_KEY not set, generated an ephemeral one; tokens will not survive a restart"
                );
                generate_secret()
            }
        };

        Ok(Config {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&var, "PORT", 5000)?,

            secret_key,
            token_ttl: Duration::from_secs(parse_or(&var, "TOKEN_TTL_SECS", 86_400)?),

            upstream: UpstreamConfig {
                api_base: var("GROQ_API_BASE")
                    .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key: var("GROQ_API_KEY"),
                model: var("GROQ_GPT_MODEL")
                    .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
                temperature: parse_or(&var, "GROQ_TEMPERATURE", 0.7)?,
                max_tokens: parse_or(&var, "GROQ_MAX_TOKENS", 1024)?,
                timeout: Duration::from_secs(parse_or(&var, "UPSTREAM_TIMEOUT_SECS", 120)?),
            },

            system_prompt: var("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            history_limit: parse_or(&var, "HISTORY_LIMIT", 6)?,
            max_attachment_chars: parse_or(&var, "MAX_ATTACHMENT_CHARS", 20_000)?,
            template_dir: var("PROMPT_TEMPLATE_DIR").map(PathBuf::from),

            interaction_log_path: var("INTERACTION_LOG_PATH").map(PathBuf::from),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, V>(var: &V, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secret_key", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("upstream", &self.upstream)
            .field("history_limit", &self.history_limit)
            .field("max_attachment_chars", &self.max_attachment_chars)
            .field("template_dir", &self.template_dir)
            .field("interaction_log_path", &self.interaction_log_path)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}
