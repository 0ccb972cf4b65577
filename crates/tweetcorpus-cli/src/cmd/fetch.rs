//! Fetch subcommand - join corpus records with tweet data

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use tweetcorpus_core::{
    LoopOptions, OutputWriter, SharedProgress, SystemClock, fmt_num, load_corpus, resume_index,
    run_fetch_loop,
};
use tweetcorpus_twitter::TwitterClient;

use super::print_summary;
use crate::config::Config;

/// Exit code after a SIGINT/SIGTERM stop
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Labeled corpus CSV (keyword, sentiment, id)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Output CSV, appended to and used for resuming
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log a progress line every N saved tweets (0 disables)
    #[arg(long)]
    pub progress_interval: Option<usize>,

    /// Seconds to wait past the rate-limit reset before retrying
    #[arg(long)]
    pub reset_margin_secs: Option<u64>,

    /// Retries for network failures before giving up
    #[arg(long)]
    pub max_retries: Option<u32>,
}

impl FetchArgs {
    fn loop_options(&self, config: &Config) -> LoopOptions {
        let mut options = LoopOptions::from(config.fetch);
        if let Some(n) = self.progress_interval {
            options.progress_interval = n;
        }
        if let Some(secs) = self.reset_margin_secs {
            options.reset_margin = Duration::from_secs(secs);
        }
        if let Some(n) = self.max_retries {
            options.max_transport_retries = n;
        }
        options
    }
}

pub fn run(args: FetchArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let corpus_path = args.corpus.clone().unwrap_or_else(|| config.paths.corpus.clone());
    let output_path = args.output.clone().unwrap_or_else(|| config.paths.output.clone());
    let options = args.loop_options(config);

    let corpus = load_corpus(&corpus_path)?;
    let writer = OutputWriter::new(&output_path);
    let start = resume_index(&corpus, writer.path())?;
    if start >= corpus.len() {
        progress.println(format!(
            "Nothing to do: all {} records in {} are processed",
            fmt_num(corpus.len()),
            output_path.display()
        ));
        return Ok(ExitCode::SUCCESS);
    }

    let credentials = config.twitter.credentials()?;
    let mut client = TwitterClient::connect(
        &config.twitter.api_url,
        &credentials,
        config.twitter.timeout(),
    )
    .context("Failed to set up Twitter client")?;

    let pb = progress.fetch_bar(corpus.len(), start);
    let result = run_fetch_loop(&corpus, &writer, &mut client, &SystemClock, &options, &pb);
    pb.finish_and_clear();
    let summary = result.with_context(|| {
        format!(
            "Fetch aborted; rerun to resume from {}",
            output_path.display()
        )
    })?;

    print_summary(
        "Fetch",
        &[
            ("Corpus", fmt_num(summary.total)),
            ("Resumed at", fmt_num(summary.resumed_at)),
            ("Saved", fmt_num(summary.saved)),
            ("Skipped", fmt_num(summary.skipped)),
            ("Rate-limit waits", fmt_num(summary.rate_limit_waits)),
            ("Network retries", fmt_num(summary.transport_retries)),
            ("Remaining", fmt_num(summary.remaining())),
            ("Output", output_path.display().to_string()),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    if summary.interrupted {
        log::warn!(
            "Interrupted with {} records left; rerun to resume",
            fmt_num(summary.remaining())
        );
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
