use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ratatui::layout::Rect;

use crate::config::{self, Config};
use crate::controller::Timing;
use crate::debug;
use crate::dispatch::InertFollowSink;
use crate::feed::{self, InitError, ReelRecord};
use crate::playback::{MpvBackend, SilentBackend, VideoBackend};
use crate::ui;

/// Loads config and feed, then runs the terminal UI until the user quits.
/// `feed_override` replaces the configured feed file.
pub fn run(feed_override: Option<PathBuf>) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    debug::log(format!("config: {}", friendly_path(config_path.as_deref())));

    let records = load_records(feed_override.as_deref().or(cfg.feed.path.as_deref()));
    let backend = build_backend(&cfg);

    let (width, height) = crossterm::terminal::size().context("query terminal size")?;
    let mut model = ui::Model::new(
        ui::Options {
            records,
            timing: Timing::from(&cfg.timing),
            backend,
            follow_sink: Box::new(InertFollowSink),
            wheel_step: cfg.ui.wheel_step,
        },
        Rect::new(0, 0, width, height),
        Instant::now(),
    );
    model.run()
}

/// Reads the feed file when one is given; otherwise the built-in demo feed.
pub fn load_records(path: Option<&Path>) -> Result<Vec<ReelRecord>, InitError> {
    match path {
        Some(path) => {
            debug::log(format!("loading feed from {}", friendly_path(Some(path))));
            feed::load_file(path)
        }
        None => Ok(feed::demo_records()),
    }
}

fn build_backend(cfg: &Config) -> Box<dyn VideoBackend> {
    if !cfg.player.enabled {
        return Box::new(SilentBackend);
    }
    match MpvBackend::new(cfg.player.command.clone()) {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            debug::log(format!("player disabled: {err:#}"));
            Box::new(SilentBackend)
        }
    }
}

fn friendly_path(path: Option<&Path>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/reels-tui/config.yaml".to_string()
    }
}
