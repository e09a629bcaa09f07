//! Cosmic Md2Word - Markdown to Word client for the COSMIC desktop
//!
//! Entry point for the application. Handles CLI argument parsing,
//! logging initialization, and application bootstrap.

mod api;
mod app;
mod config;
mod error;
mod file_handler;
mod message;
mod ocr;
mod preview;
mod state;
mod ui;

// Menu and keyboard shortcuts
mod menu;

use app::{CosmicMd2Word, Flags};
use std::path::PathBuf;

/// Application name for logging
const APP_NAME: &str = "cosmic-md2word";

fn main() -> cosmic::iced::Result {
    // Initialize logging
    init_logging();

    log::info!("Starting Cosmic Md2Word");

    // Parse command line arguments
    let flags = parse_args();

    // Don't use .size() with cosmic apps - the window size is managed by the compositor
    cosmic::app::run::<CosmicMd2Word>(
        cosmic::app::Settings::default()
            .size_limits(cosmic::iced::Limits::NONE.min_width(640.0).min_height(400.0)),
        flags,
    )
}

/// Initialize the logging system
fn init_logging() {
    // Set default log level if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,cosmic_md2word=debug");
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();
}

/// Parse command line arguments
fn parse_args() -> Flags {
    let args: Vec<String> = std::env::args().collect();
    let mut flags = Flags::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--server" => {
                if i + 1 < args.len() {
                    flags.server = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --server requires a URL argument");
                    std::process::exit(1);
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
            path => {
                if flags.file.is_some() {
                    eprintln!("Only one file can be opened; ignoring {}", path);
                } else {
                    flags.file = Some(PathBuf::from(path));
                }
            }
        }
        i += 1;
    }

    flags
}

/// Print help message
fn print_help() {
    println!(
        r#"Cosmic Md2Word - Markdown to Word converter

USAGE:
    cosmic-md2word [OPTIONS] [FILE]

OPTIONS:
    -h, --help          Show this help message
    -v, --version       Show version information
    -s, --server URL    Backend base URL (default {server})

EXAMPLES:
    cosmic-md2word                                 Start with an empty document
    cosmic-md2word notes.md                        Load a Markdown file
    cosmic-md2word -s http://10.0.0.5:5000         Use another backend

KEYBOARD SHORTCUTS:
    Ctrl+O              Open and upload a document
    Ctrl+S              Convert to Word
    Ctrl+N              Clear the document
    Ctrl+Shift+F        Recognize a formula from an image
    Ctrl+V              Paste an image to recognize it
    F11                 Toggle fullscreen preview
    Escape              Leave fullscreen / close dialog
"#,
        server = config::DEFAULT_SERVER_URL
    );
}

/// Print version information
fn print_version() {
    println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
}
