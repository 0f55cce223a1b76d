//! Watcher configuration types.

use serde::{Deserialize, Serialize};

/// Top-level watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Upstream stock endpoint.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Poll loop parameters.
    #[serde(default)]
    pub polling: PollingConfig,

    /// HTTP read surface.
    #[serde(default)]
    pub server: ServerConfig,

    /// Desktop notifications.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Items to announce when they restock, matched case-insensitively.
    #[serde(default = "default_watch_list")]
    pub watch_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Announce every in-stock watched item on every accepted poll.
    #[serde(default)]
    pub force_notify: bool,

    /// How items in shops without a refresh epoch are de-duplicated.
    #[serde(default)]
    pub timerless_policy: TimerlessPolicy,
}

/// Eligibility rule for night/easter shops, which publish no refresh epoch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimerlessPolicy {
    /// Eligible on every accepted poll while in stock.
    #[default]
    Always,
    /// Eligible only on the accepted poll where the item first shows up in stock.
    OnAppearance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Built web UI served at `/` when set.
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Program invoked as `<command> <app_name> <text>`.
    #[serde(default = "default_command")]
    pub command: String,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_url() -> String {
    "https://growagarden.gg/api/stock".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    "garden-watch/0.1".into()
}
fn default_interval() -> u64 {
    60
}
fn default_listen() -> String {
    "127.0.0.1:8001".into()
}
fn default_app_name() -> String {
    "Grow a Garden".into()
}
fn default_command() -> String {
    "notify-send".into()
}

fn default_watch_list() -> Vec<String> {
    [
        "Mushroom",
        "Pepper",
        "Dragon Fruit",
        "Coconut",
        "Grape",
        "Cacao",
        "Beanstalk",
        "Ember Lily",
        "Sugar Apple",
        "Burning Bud",
        "Giant Pinecone",
        "Basic Sprinkler",
        "Advanced Sprinkler",
        "Godly Sprinkler",
        "Master Sprinkler",
        "Medium Toy",
        "Medium Treat",
        "Tanning Mirror",
        "Friendship Pot",
        "Zen Seed Pack",
        "Zen Egg",
        "Hot Spring",
        "Soft Sunshine",
        "Koi",
        "Spiked Mango",
        "Pet Shard Tranquil",
        "Common Summer Egg",
        "Rare Summer Egg",
        "Mythical Egg",
        "Paradise Egg",
        "Bug Egg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            force_notify: false,
            timerless_policy: TimerlessPolicy::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            static_dir: None,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            app_name: default_app_name(),
            command: default_command(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            polling: PollingConfig::default(),
            server: ServerConfig::default(),
            notify: NotifyConfig::default(),
            watch_list: default_watch_list(),
        }
    }
}
