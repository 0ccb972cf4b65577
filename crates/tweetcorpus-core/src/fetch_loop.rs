//! The resumable, rate-limit-aware fetch loop.
//!
//! Walks the corpus from the resume position to the end, one request at a
//! time:
//! - success: append the joined record (durably), advance
//! - quota exhausted: sleep until reset + margin, retry the same record
//! - any other API error: log, count as skipped, advance (never retried)
//! - transport failure: exponential backoff, then abort
//!
//! Aborting is always safe: the output file only ever holds complete rows,
//! and the next run resumes after the last one.

use std::time::{Duration, Instant};

use indicatif::ProgressBar;

use crate::backoff::{Clock, rate_limit_pause, retry_with_backoff};
use crate::error::LoopError;
use crate::fetcher::{FetchOutcome, TweetFetcher};
use crate::output::OutputWriter;
use crate::progress::fmt_num;
use crate::record::{CorpusRecord, JoinedRecord};
use crate::resume::resume_index;
use crate::shutdown::is_shutdown_requested;

/// Tunables for [`run_fetch_loop`]
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Log a progress line every N saved records (0 disables)
    pub progress_interval: usize,
    /// Added to the API's reset time before retrying after a quota stall
    pub reset_margin: Duration,
    /// Retries for transport failures before the run is aborted
    pub max_transport_retries: u32,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            progress_interval: 50,
            reset_margin: Duration::from_secs(60),
            max_transport_retries: 5,
        }
    }
}

/// Counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Corpus size
    pub total: usize,
    /// Corpus position the run started from
    pub resumed_at: usize,
    /// Corpus position the run stopped at (== total when complete)
    pub stopped_at: usize,
    pub saved: usize,
    pub skipped: usize,
    pub rate_limit_waits: usize,
    pub transport_retries: usize,
    /// Stopped early on SIGINT/SIGTERM
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl FetchSummary {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.stopped_at)
    }
}

/// Fetch every corpus record not yet in the output file.
///
/// The resume position is derived from `writer`'s file, so calling this
/// again after a crash (or after completion) never refetches saved records.
pub fn run_fetch_loop<F: TweetFetcher + ?Sized>(
    corpus: &[CorpusRecord],
    writer: &OutputWriter,
    fetcher: &mut F,
    clock: &dyn Clock,
    options: &LoopOptions,
    pb: &ProgressBar,
) -> Result<FetchSummary, LoopError> {
    let started = Instant::now();
    let start = resume_index(corpus, writer.path()).map_err(LoopError::Resume)?;
    let mut summary = FetchSummary {
        total: corpus.len(),
        resumed_at: start,
        ..Default::default()
    };

    if start >= corpus.len() {
        log::info!("All {} corpus records already processed", fmt_num(corpus.len()));
    } else {
        log::info!(
            "Fetching {} of {} records, starting at {start}",
            fmt_num(corpus.len() - start),
            fmt_num(corpus.len())
        );
    }
    pb.set_position(start as u64);

    let mut index = start;
    while index < corpus.len() {
        if is_shutdown_requested() {
            log::warn!("Shutdown requested, stopping before record {index}");
            summary.interrupted = true;
            break;
        }

        let record = &corpus[index];
        let label = format!("tweet {}", record.id);
        let outcome = match retry_with_backoff(
            &label,
            options.max_transport_retries,
            clock,
            pb,
            || fetcher.fetch(record.id),
        ) {
            Ok((outcome, retries)) => {
                summary.transport_retries += retries as usize;
                outcome
            }
            Err(e) if e.is_retryable() && is_shutdown_requested() => {
                summary.interrupted = true;
                break;
            }
            Err(source) => {
                return Err(LoopError::Fetch {
                    id: record.id,
                    source,
                });
            }
        };

        match outcome {
            FetchOutcome::Success(tweet) => {
                let joined = JoinedRecord::new(record.clone(), tweet);
                writer
                    .append(&joined)
                    .map_err(|source| LoopError::Write {
                        id: record.id,
                        source,
                    })?;
                summary.saved += 1;

                if options.progress_interval > 0 && summary.saved % options.progress_interval == 0
                {
                    let quota = fetcher
                        .quota()
                        .map(|q| format!(", {} calls left in window", q.remaining))
                        .unwrap_or_default();
                    log::info!(
                        "Saved {} tweets ({}/{} processed, {} skipped{quota})",
                        fmt_num(summary.saved),
                        fmt_num(index + 1),
                        fmt_num(corpus.len()),
                        fmt_num(summary.skipped)
                    );
                }
            }
            FetchOutcome::RateLimited(limit) if limit.is_exhausted() => {
                summary.rate_limit_waits += 1;
                let now = clock.now();
                let wait = rate_limit_pause(now, limit.reset_at, options.reset_margin);
                let wake_at = now + chrono::Duration::seconds(wait.as_secs() as i64);
                log::warn!(
                    "Rate limit reached (wait #{}). Sleeping until {wake_at} ({}s)",
                    summary.rate_limit_waits,
                    wait.as_secs()
                );
                pb.set_message(format!(
                    "rate limited until {}",
                    wake_at.with_timezone(&chrono::Local).format("%H:%M:%S")
                ));
                clock.sleep(wait);
                // Same record again
                continue;
            }
            FetchOutcome::RateLimited(limit) => {
                summary.skipped += 1;
                log::warn!(
                    "Skipped {} records. Tweet {} rate limited with {} calls left",
                    summary.skipped,
                    record.id,
                    limit.remaining
                );
            }
            FetchOutcome::Unavailable { status, reason } => {
                summary.skipped += 1;
                log::warn!(
                    "Skipped {} records. Tweet {} got {status}: {reason}",
                    summary.skipped,
                    record.id
                );
            }
        }

        index += 1;
        pb.set_position(index as u64);
        pb.set_message(format!(
            "saved {} skipped {}",
            fmt_num(summary.saved),
            fmt_num(summary.skipped)
        ));
    }

    summary.stopped_at = index;
    summary.elapsed = started.elapsed();
    log::info!(
        "Saved {}, Skipped {}.",
        fmt_num(summary.saved),
        fmt_num(summary.skipped)
    );
    Ok(summary)
}
