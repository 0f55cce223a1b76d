//! Configuration loader: merges config.toml, .env, environment, and CLI flags.

use common::config::{TimerlessPolicy, WatchConfig};
use common::Error;
use std::net::SocketAddr;
use std::path::Path;

/// Values given on the command line; highest priority.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub interval_secs: Option<u64>,
    pub no_notify: bool,
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::Config(format!("{env_name} must be an integer > 0"))),
    }
}

fn parse_policy(raw: &str) -> Result<TimerlessPolicy, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "always" => Ok(TimerlessPolicy::Always),
        "on_appearance" | "onappearance" => Ok(TimerlessPolicy::OnAppearance),
        _ => Err(Error::Config(
            "GARDEN_TIMERLESS_POLICY must be one of: always, on_appearance".into(),
        )),
    }
}

/// Apply `GARDEN_*` variables looked up through `var`.
pub fn apply_env_overrides<F>(config: &mut WatchConfig, var: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("GARDEN_STOCK_URL") {
        config.upstream.url = url.trim().to_string();
    }
    if let Some(raw) = var("GARDEN_POLL_INTERVAL_SECS") {
        config.polling.interval_secs = parse_positive_u64(&raw, "GARDEN_POLL_INTERVAL_SECS")?;
    }
    if let Some(listen) = var("GARDEN_LISTEN") {
        config.server.listen = listen.trim().to_string();
    }
    if let Some(raw) = var("GARDEN_NOTIFY") {
        config.notify.enabled = parse_bool(&raw);
    }
    if let Some(raw) = var("GARDEN_FORCE_NOTIFY") {
        config.polling.force_notify = parse_bool(&raw);
    }
    if let Some(raw) = var("GARDEN_TIMERLESS_POLICY") {
        config.polling.timerless_policy = parse_policy(&raw)?;
    }
    if let Some(raw) = var("GARDEN_WATCH_LIST") {
        config.watch_list = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut WatchConfig, overrides: &Overrides) {
    if let Some(listen) = &overrides.listen {
        config.server.listen = listen.clone();
    }
    if let Some(secs) = overrides.interval_secs {
        config.polling.interval_secs = secs;
    }
    if overrides.no_notify {
        config.notify.enabled = false;
    }
}

pub fn validate_config(config: &WatchConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.upstream.url.trim().is_empty() {
        issues.push("upstream.url must not be empty".into());
    }
    if config.upstream.timeout_secs == 0 {
        issues.push("upstream.timeout_secs must be > 0".into());
    }
    if config.polling.interval_secs == 0 {
        issues.push("polling.interval_secs must be > 0".into());
    }
    if config.watch_list.is_empty() {
        issues.push("watch_list must contain at least one item".into());
    }
    if config.server.listen.parse::<SocketAddr>().is_err() {
        issues.push(format!(
            "server.listen must be a socket address, got {:?}",
            config.server.listen
        ));
    }
    if config.notify.enabled && config.notify.command.trim().is_empty() {
        issues.push("notify.command must not be empty when notifications are enabled".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration: defaults, then `path` if it exists, then `.env` and
/// the process environment, then CLI flags.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<WatchConfig, Error> {
    let mut config = WatchConfig::default();

    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    } else {
        tracing::debug!("No config file at {}; using defaults", path.display());
    }

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    apply_cli_overrides(&mut config, overrides);

    validate_config(&config)?;

    Ok(config)
}
