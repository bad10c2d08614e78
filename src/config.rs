// Settings file and environment credentials.
//
// Settings come from an optional TOML file, overlaid by `REELPOST__*`
// environment variables (`REELPOST__POLLING__INTERVAL_SECS=2`).
// Credentials are only ever read from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, Map};
use serde::Deserialize;

use crate::instagram::{self, InstagramCredentials};
use crate::job::Platform;
use crate::poll::PollPolicy;
use crate::temphost;
use crate::tiktok::{self, TikTokCredentials};

const FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub defaults: Defaults,
    pub endpoints: Endpoints,
    pub polling: Polling,
    pub tiktok: TikTokSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Where relative paths and the interactive picker look for media.
    pub media_dir: Option<PathBuf>,
    /// Published video + caption files are moved here.
    pub published_dir: Option<PathBuf>,
    /// Cover timestamp used when no cover option is given.
    pub thumbnail_at: Option<String>,
    /// Platforms targeted when `--platform` is not given.
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub instagram_api: String,
    pub tiktok_api: String,
    pub temp_host: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            instagram_api: instagram::DEFAULT_API_BASE.to_string(),
            tiktok_api: tiktok::DEFAULT_API_BASE.to_string(),
            temp_host: temphost::DEFAULT_TEMP_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Polling {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Polling {
            interval_secs: policy.interval.as_secs(),
            timeout_secs: policy.timeout.as_secs(),
        }
    }
}

impl Polling {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.interval_secs.max(1)),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TikTokSettings {
    pub privacy_level: String,
    pub client_key: Option<String>,
    pub redirect_uri: Option<String>,
}

impl Default for TikTokSettings {
    fn default() -> Self {
        TikTokSettings {
            privacy_level: tiktok::DEFAULT_PRIVACY_LEVEL.to_string(),
            client_key: None,
            redirect_uri: None,
        }
    }
}

impl Settings {
    /// Load from `explicit` (must exist) or from the first default location
    /// that exists, then apply the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_env(explicit, None)
    }

    /// Same as [`Settings::load`], with an optional replacement for the
    /// process environment.
    pub fn load_with_env(explicit: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(path) = default_path() {
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("REELPOST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("defaults.platforms")
                .source(env),
        );

        let settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(settings)
    }
}

/// `./config.toml` if present, otherwise the per-user config directory.
pub fn default_path() -> Option<PathBuf> {
    let local = PathBuf::from(FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir().map(|dir| dir.join("reelpost").join(FILE_NAME))
}

/// Platform credentials found in the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub instagram: Option<InstagramCredentials>,
    pub tiktok: Option<TikTokCredentials>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let instagram = match (get("INSTAGRAM_ACCOUNT_ID"), get("INSTAGRAM_ACCESS_TOKEN")) {
            (Some(account_id), Some(access_token)) => Some(InstagramCredentials {
                account_id,
                access_token,
            }),
            _ => None,
        };
        let tiktok = get("TIKTOK_ACCESS_TOKEN").map(|access_token| TikTokCredentials { access_token });

        Credentials { instagram, tiktok }
    }

    pub fn has(&self, platform: Platform) -> bool {
        match platform {
            Platform::Instagram => self.instagram.is_some(),
            Platform::TikTok => self.tiktok.is_some(),
        }
    }

    /// Names of the variables a platform needs, for error messages.
    pub fn required_vars(platform: Platform) -> &'static str {
        match platform {
            Platform::Instagram => "INSTAGRAM_ACCOUNT_ID and INSTAGRAM_ACCESS_TOKEN",
            Platform::TikTok => "TIKTOK_ACCESS_TOKEN",
        }
    }
}
