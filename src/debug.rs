use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use once_cell::sync::OnceCell;

pub const DEBUG_ENV: &str = "REELS_DEBUG";
pub const DEBUG_LOG_ENV: &str = "REELS_DEBUG_LOG";

pub fn enabled() -> bool {
    static FLAG: OnceCell<bool> = OnceCell::new();
    *FLAG.get_or_init(|| {
        std::env::var(DEBUG_ENV)
            .map(|val| truthy(&val))
            .unwrap_or(false)
    })
}

fn truthy(raw: &str) -> bool {
    let trimmed = raw.trim();
    !(trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("0")
        || trimmed.eq_ignore_ascii_case("false")
        || trimmed.eq_ignore_ascii_case("no")
        || trimmed.eq_ignore_ascii_case("off"))
}

fn writer() -> Option<&'static Mutex<std::fs::File>> {
    static WRITER: OnceCell<Option<Mutex<std::fs::File>>> = OnceCell::new();
    WRITER
        .get_or_init(|| {
            std::env::var(DEBUG_LOG_ENV).ok().and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map(Mutex::new)
                    .ok()
            })
        })
        .as_ref()
}

/// Writes a line to the debug log when `REELS_DEBUG` is set.
///
/// The terminal is in raw alternate-screen mode while the feed runs, so set
/// `REELS_DEBUG_LOG` to a file path to keep the output readable.
pub fn log(message: impl AsRef<str>) {
    if !enabled() {
        return;
    }
    if let Some(writer) = writer() {
        if let Ok(mut file) = writer.lock() {
            let _ = writeln!(file, "{}", message.as_ref());
            return;
        }
    }
    eprintln!("{}", message.as_ref());
}
