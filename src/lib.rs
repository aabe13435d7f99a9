#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod controller;
pub mod debug;
pub mod dispatch;
pub mod feed;
pub mod navigation;
pub mod playback;
pub mod render;
pub mod schedule;
pub mod ui;
pub mod viewport;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
