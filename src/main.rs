use std::path::{Path, PathBuf};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if handle_cli_flags(&args) {
        return;
    }

    if let Err(err) = reels_tui::run(feed_flag(&args)) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags(args: &[String]) -> bool {
    let mut saw_flag = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Reels-TUI {}", reels_tui::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "Reels-TUI - Scroll a short video feed from the terminal.\n\n  --version, -V           Show version and exit\n  --help,    -h           Show this help message\n  --feed <path>           Load reels from a YAML or JSON file\n  --check-feed <path>     Validate a feed file and exit\n  --dump-feed <path>      Print a feed file as parsed JSON and exit"
                );
                saw_flag = true;
            }
            "--check-feed" => {
                saw_flag = true;
                let path = required_path(arg, iter.next());
                if let Err(err) = check_feed(&path) {
                    eprintln!("error: {err:#}");
                    std::process::exit(1);
                }
            }
            "--dump-feed" => {
                saw_flag = true;
                let path = required_path(arg, iter.next());
                if let Err(err) = dump_feed(&path) {
                    eprintln!("error: {err:#}");
                    std::process::exit(1);
                }
            }
            _ => {}
        }
    }
    saw_flag
}

fn feed_flag(args: &[String]) -> Option<PathBuf> {
    let pos = args.iter().position(|arg| arg == "--feed")?;
    Some(required_path("--feed", args.get(pos + 1)))
}

fn required_path(flag: &str, value: Option<&String>) -> PathBuf {
    match value {
        Some(value) => PathBuf::from(value),
        None => {
            eprintln!("error: {flag} needs a file path");
            std::process::exit(2);
        }
    }
}

fn check_feed(path: &Path) -> anyhow::Result<()> {
    let records = reels_tui::feed::load_file(path)?;
    println!("Feed OK: {} reels", records.len());
    Ok(())
}

fn dump_feed(path: &Path) -> anyhow::Result<()> {
    let records = reels_tui::feed::load_file(path)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
