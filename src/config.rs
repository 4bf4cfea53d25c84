use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub phone: PhoneConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// The single Telegram user allowed to talk to the bot
    #[serde(default)]
    pub owner_id: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_llm_base_url(),
            model: default_model(),
            image_model: default_image_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PhoneConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_phone_base_url")]
    pub base_url: String,
    #[serde(default = "default_phone_timeout")]
    pub timeout_secs: u64,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_phone_base_url(),
            timeout_secs: default_phone_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_phone_base_url() -> String {
    "https://phonevalidation.abstractapi.com/v1".to_string()
}

fn default_phone_timeout() -> u64 {
    10
}

impl Config {
    /// Load the optional TOML file, then let the process environment override it.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else if required {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Overlay secrets and identifiers from `lookup` (normally the environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(owner) = lookup("OWNER_ID") {
            let id = owner
                .trim()
                .parse::<u64>()
                .with_context(|| format!("OWNER_ID is not a valid user id: {:?}", owner))?;
            self.telegram.owner_id = Some(id);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(key) = lookup("VOIP_API_KEY") {
            self.phone.api_key = key;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("Missing Telegram bot token (TELEGRAM_TOKEN or [telegram] bot_token)");
        }
        if self.telegram.owner_id.is_none() {
            anyhow::bail!("Missing owner id (OWNER_ID or [telegram] owner_id)");
        }
        if self.llm.api_key.trim().is_empty() {
            anyhow::bail!("Missing completion API key (OPENAI_API_KEY or [llm] api_key)");
        }
        if self.phone.api_key.trim().is_empty() {
            anyhow::bail!("Missing phone validation API key (VOIP_API_KEY or [phone] api_key)");
        }
        Ok(())
    }

    pub fn owner_id(&self) -> Result<u64> {
        self.telegram.owner_id.context("Owner id not configured")
    }
}
