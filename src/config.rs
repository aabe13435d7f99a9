use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::Timing;

const DEFAULT_ENV_PREFIX: &str = "REELS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    pub settle_delay: Duration,
    #[serde(default = "default_playback_delay", with = "humantime_serde")]
    pub playback_delay: Duration,
    #[serde(default = "default_scroll_duration", with = "humantime_serde")]
    pub scroll_duration: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay: default_settle_delay(),
            playback_delay: default_playback_delay(),
            scroll_duration: default_scroll_duration(),
        }
    }
}

impl From<&TimingConfig> for Timing {
    fn from(cfg: &TimingConfig) -> Self {
        Timing {
            settle_delay: cfg.settle_delay,
            playback_delay: cfg.playback_delay,
            scroll_duration: cfg.scroll_duration,
        }
    }
}

fn default_settle_delay() -> Duration {
    crate::viewport::SETTLE_DELAY
}

fn default_playback_delay() -> Duration {
    crate::navigation::PLAYBACK_DELAY
}

fn default_scroll_duration() -> Duration {
    crate::navigation::SCROLL_DURATION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_player_command")]
    pub command: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_player_command(),
        }
    }
}

fn default_player_command() -> Vec<String> {
    vec![
        "mpv".into(),
        "--force-window=yes".into(),
        "--keep-open=no".into(),
        "--loop-file=inf".into(),
        "--really-quiet".into(),
        "--no-config".into(),
        "%URL%".into(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_wheel_step")]
    pub wheel_step: u16,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            wheel_step: default_wheel_step(),
        }
    }
}

fn default_wheel_step() -> u16 {
    3
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if other.feed.path.is_some() {
        base.feed.path = other.feed.path;
    }

    base.timing = other.timing;

    base.player.enabled = other.player.enabled;
    if !other.player.command.is_empty() {
        base.player.command = other.player.command;
    }

    if other.ui.wheel_step != 0 {
        base.ui.wheel_step = other.ui.wheel_step;
    }

    base
}

/// Applies `PREFIX_SECTION__KEY` variables on top of `cfg`.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "feed.path" => cfg.feed.path = Some(PathBuf::from(value)),
        "timing.settle_delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.timing.settle_delay = duration;
            }
        }
        "timing.playback_delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.timing.playback_delay = duration;
            }
        }
        "timing.scroll_duration" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.timing.scroll_duration = duration;
            }
        }
        "player.enabled" => {
            cfg.player.enabled = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "player.command" => {
            cfg.player.command = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "ui.wheel_step" => {
            if let Ok(parsed) = value.parse::<u16>() {
                cfg.ui.wheel_step = parsed;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reels-tui").join("config.yaml"))
}
