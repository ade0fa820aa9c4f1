use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use outreach_client::{ClientSettings, MESSAGE_POLL_INTERVAL};
use outreach_core::{PollConfig, DEFAULT_MAX_RETRIES};
use outreach_logging::{outreach_info, outreach_warn};
use serde::{Deserialize, Serialize};

pub(crate) const SETTINGS_FILENAME: &str = "outreach.ron";

/// Front-end settings; every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Directory holding the local config cache.
    pub cache_dir: PathBuf,
    pub log_file: PathBuf,
    pub search_poll_secs: u64,
    pub message_poll_secs: u64,
    pub retry_delay_secs: u64,
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let client = ClientSettings::default();
        let poll = PollConfig::default();
        Self {
            base_url: client.base_url,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            cache_dir: PathBuf::from(".outreach"),
            log_file: PathBuf::from("outreach.log"),
            search_poll_secs: poll.interval.as_secs(),
            message_poll_secs: MESSAGE_POLL_INTERVAL.as_secs(),
            retry_delay_secs: poll.retry_delay.as_secs(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Settings {
    pub fn client(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..ClientSettings::default()
        }
    }

    pub fn search_poll(&self) -> PollConfig {
        self.poll(self.search_poll_secs)
    }

    pub fn message_poll(&self) -> PollConfig {
        self.poll(self.message_poll_secs)
    }

    fn poll(&self, interval_secs: u64) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(interval_secs.max(1)),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            max_retries: self.max_retries.max(1),
        }
    }
}

/// Missing or unreadable files fall back to defaults.
pub(crate) fn load_settings(path: &Path) -> Settings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Settings::default();
        }
        Err(err) => {
            outreach_warn!("Failed to read settings from {:?}: {}", path, err);
            return Settings::default();
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => {
            outreach_info!("Loaded settings from {:?}", path);
            settings
        }
        Err(err) => {
            outreach_warn!("Failed to parse settings from {:?}: {}", path, err);
            Settings::default()
        }
    }
}

pub(crate) fn save_settings(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    let pretty = ron::ser::PrettyConfig::new();
    let content =
        ron::ser::to_string_pretty(settings, pretty).context("serializing settings")?;
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
