//! tweetcorpus - Build a labeled tweet-sentiment corpus
//!
//! Joins a hand-labeled corpus of tweet ids with the tweets themselves,
//! fetched from the Twitter API under its rate limits. Runs are resumable:
//! the output file doubles as the checkpoint.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;
use tweetcorpus_core::shutdown_flag;

#[derive(Parser)]
#[command(name = "tweetcorpus")]
#[command(about = "Fetch tweets for a labeled sentiment corpus")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./tweetcorpus.toml or ~/.config/tweetcorpus/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch tweets for every corpus record not yet saved
    Fetch(cmd::fetch::FetchArgs),
    /// Show progress of the output file against the corpus
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(tweetcorpus_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, the bar shows activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    tweetcorpus_core::init_logging(quiet, cli.debug, multi)
        .context("Failed to initialize logging")?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Fetch(args) => {
            setup_signal_handler()?;
            cmd::fetch::run(args, &config, &progress)
        }
        Command::Status(args) => {
            cmd::status::run(args, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            show_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn show_config(config: &Config) {
    cmd::print_summary(
        "Setting",
        &[
            ("Corpus", config.paths.corpus.display().to_string()),
            ("Output", config.paths.output.display().to_string()),
            ("API URL", config.twitter.api_url.clone()),
            ("Credentials", config.twitter.auth_mode().to_string()),
            ("Timeout", format!("{}s", config.twitter.timeout_secs)),
            (
                "Progress interval",
                format!("{} saves", config.fetch.progress_interval),
            ),
            (
                "Reset margin",
                format!("{}s", config.fetch.reset_margin_secs),
            ),
            ("Max retries", config.fetch.max_retries.to_string()),
        ],
    );
}

/// First signal: finish the current record, then stop.
/// Second signal: exit immediately.
fn setup_signal_handler() -> Result<()> {
    // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGTERM, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .context("Failed to register SIGTERM handler")?;
        signal_hook::low_level::register(signal_hook::consts::SIGINT, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .context("Failed to register SIGINT handler")?;
    }
    Ok(())
}
