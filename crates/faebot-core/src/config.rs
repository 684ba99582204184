use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{FaebotError, Result};

pub const DEFAULT_BOT_NAME: &str = "faebot";
/// Twitch rejects PRIVMSG payloads longer than this many characters.
pub const DEFAULT_MESSAGE_LIMIT: usize = 500;
pub const DEFAULT_FREQUENCY: u32 = 5;
pub const DEFAULT_HISTORY: usize = 20;
pub const DEFAULT_MODEL: &str = "meta/llama-2-7b-chat";
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 250;
pub const DEFAULT_PERSONA: &str = "You are an AI chatbot called {bot}. \
You are hanging out in {channel}'s chat. This is the conversation log: \n";
pub const TWITCH_IRC_HOST: &str = "irc.chat.twitch.tv";
pub const TWITCH_IRC_TLS_PORT: u16 = 6697;
pub const REPLICATE_BASE_URL: &str = "https://api.replicate.com";

/// Top-level config (faebot.toml + FAEBOT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaebotConfig {
    #[serde(default)]
    pub bot: BotConfig,
    /// Model roster. The first entry is the initial model of every new channel.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default)]
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub replicate: ReplicateConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Default for FaebotConfig {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            models: default_models(),
            twitch: TwitchConfig::default(),
            replicate: ReplicateConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Behaviour of the bot itself and the defaults handed to new channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Name the bot answers to. Also the trigger word for mention replies and
    /// the speaker label of its own transcript lines.
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Prefix tokens that mark a message as a command (e.g. `!freq 3`).
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
    /// Chat names allowed to run administrator commands (`!model`, `!join`).
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default = "default_frequency")]
    pub default_frequency: u32,
    #[serde(default = "default_history")]
    pub default_history: usize,
    /// Maximum characters per outgoing chat message.
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
    /// Persona prompt template; `{bot}` and `{channel}` are substituted.
    #[serde(default = "default_persona")]
    pub persona: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            prefixes: default_prefixes(),
            admins: Vec::new(),
            default_frequency: DEFAULT_FREQUENCY,
            default_history: DEFAULT_HISTORY,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            persona: default_persona(),
        }
    }
}

impl BotConfig {
    /// Render the persona template for a channel.
    pub fn persona_for(&self, channel: &str) -> String {
        self.persona
            .replace("{bot}", &self.name)
            .replace("{channel}", channel)
    }

    pub fn is_admin(&self, name: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    /// OAuth token, with or without the `oauth:` prefix.
    pub token: Option<String>,
    /// Login name; falls back to `bot.name`.
    pub nick: Option<String>,
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    #[serde(default = "default_twitch_host")]
    pub server: String,
    #[serde(default = "default_twitch_port")]
    pub port: u16,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            token: None,
            nick: None,
            channels: default_channels(),
            server: default_twitch_host(),
            port: default_twitch_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    #[serde(default = "default_replicate_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    /// Upper bound on one prediction, including polling.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: default_replicate_base_url(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}
fn default_prefixes() -> Vec<String> {
    vec!["!".to_string()]
}
fn default_frequency() -> u32 {
    DEFAULT_FREQUENCY
}
fn default_history() -> usize {
    DEFAULT_HISTORY
}
fn default_message_limit() -> usize {
    DEFAULT_MESSAGE_LIMIT
}
fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}
fn default_models() -> Vec<String> {
    vec![DEFAULT_MODEL.to_string()]
}
fn default_channels() -> Vec<String> {
    vec!["transfaeries".to_string(), "faebot_01".to_string()]
}
fn default_twitch_host() -> String {
    TWITCH_IRC_HOST.to_string()
}
fn default_twitch_port() -> u16 {
    TWITCH_IRC_TLS_PORT
}
fn default_replicate_base_url() -> String {
    REPLICATE_BASE_URL.to_string()
}
fn default_max_new_tokens() -> u32 {
    DEFAULT_MAX_NEW_TOKENS
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.faebot/faebot.db", home)
}

impl FaebotConfig {
    /// Load config from a TOML file with FAEBOT_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.faebot/faebot.toml
    ///
    /// Nested keys use a double underscore: `FAEBOT_BOT__NAME=fae`.
    /// The bare variables `TWITCH_TOKEN`, `REPLICATE_API_TOKEN`,
    /// `INITIAL_CHANNELS` and `MODEL` are honoured when the file leaves the
    /// corresponding field unset.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// [`FaebotConfig::load`] with an explicit lookup for the bare fallback
    /// variables.
    pub fn load_with<F>(config_path: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let mut config: FaebotConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("FAEBOT_").split("__"))
            .extract()
            .map_err(|e| FaebotError::Config(e.to_string()))?;

        config.apply_env_fallbacks(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Fill unset fields from the well-known bare environment variables.
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.twitch.token.is_none() {
            self.twitch.token = non_empty("TWITCH_TOKEN");
        }
        if self.replicate.api_token.is_none() {
            self.replicate.api_token = non_empty("REPLICATE_API_TOKEN");
        }
        if let Some(list) = non_empty("INITIAL_CHANNELS") {
            self.twitch.channels = list
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(model) = non_empty("MODEL") {
            self.models.retain(|m| *m != model);
            self.models.insert(0, model);
        }
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(FaebotError::Config(
                "model roster is empty; set `models` to at least one model id".to_string(),
            ));
        }
        if self.bot.name.trim().is_empty() {
            return Err(FaebotError::Config("bot.name must not be empty".to_string()));
        }
        if self.bot.message_limit == 0 {
            return Err(FaebotError::Config(
                "bot.message_limit must be greater than zero".to_string(),
            ));
        }
        if self.bot.prefixes.iter().all(|p| p.is_empty()) {
            return Err(FaebotError::Config(
                "bot.prefixes needs at least one non-empty prefix".to_string(),
            ));
        }
        Ok(())
    }

    /// Login nick for the chat transport.
    pub fn nick(&self) -> String {
        self.twitch
            .nick
            .clone()
            .unwrap_or_else(|| self.bot.name.clone())
            .to_ascii_lowercase()
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.faebot/faebot.toml", home)
}
