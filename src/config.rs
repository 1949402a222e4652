use anyhow::{bail, Context, Result};
use serde::Deserialize;

use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const TOKEN_ENV: &str = "GITLAB_TOKEN";
/// One year; longer periods overflow the timer's `Instant` arithmetic.
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 366 * 24 * 60;

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Falls back to `GITLAB_TOKEN` when empty.
    #[serde(default)]
    pub gitlab_token: String,
    pub gitlab_url: String,
    pub gitlab_username: String,
    pub reminder_list: String,
    pub poll_interval_minutes: u64,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::from_json(&json, std::env::var(TOKEN_ENV).ok())
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(json: &str, env_token: Option<String>) -> Result<Self> {
        let mut config: Config = serde_json::from_str(json)?;
        if config.gitlab_token.is_empty() {
            config.gitlab_token = env_token.unwrap_or_default();
        }
        config.gitlab_url = config.gitlab_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.gitlab_token.is_empty() {
            bail!("gitlab_token is empty and {} is not set", TOKEN_ENV);
        }
        for (name, value) in [
            ("gitlab_url", &self.gitlab_url),
            ("gitlab_username", &self.gitlab_username),
            ("reminder_list", &self.reminder_list),
        ] {
            if value.trim().is_empty() {
                bail!("{} must not be empty", name);
            }
        }
        if self.poll_interval_minutes == 0 {
            bail!("poll_interval_minutes must be at least 1");
        }
        if self.poll_interval_minutes > MAX_POLL_INTERVAL_MINUTES {
            bail!(
                "poll_interval_minutes is too large: {} (at most {})",
                self.poll_interval_minutes,
                MAX_POLL_INTERVAL_MINUTES
            );
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("gitlab_token", &"<redacted>")
            .field("gitlab_url", &self.gitlab_url)
            .field("gitlab_username", &self.gitlab_username)
            .field("reminder_list", &self.reminder_list)
            .field("poll_interval_minutes", &self.poll_interval_minutes)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn config(gitlab_url: &str) -> Config {
    Config {
        gitlab_token: "secret".to_string(),
        gitlab_url: gitlab_url.to_string(),
        gitlab_username: "jdoe".to_string(),
        reminder_list: "Work".to_string(),
        poll_interval_minutes: 1,
    }
}
