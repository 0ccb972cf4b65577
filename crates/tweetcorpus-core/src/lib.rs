//! Tweetcorpus Core - resumable tweet-sentiment corpus builder
//!
//! This crate provides the pieces that turn a labeled corpus of tweet ids
//! into a joined dataset: corpus parsing, the append-only output file,
//! resume detection, and the rate-limit-aware fetch loop that ties them
//! to any [`TweetFetcher`].

pub mod backoff;
pub mod corpus;
pub mod error;
pub mod fetch_loop;
pub mod fetcher;
pub mod logging;
pub mod output;
pub mod progress;
pub mod record;
pub mod resume;
pub mod shutdown;

// Re-exports for convenience
pub use backoff::{
    Clock, MIN_RATE_LIMIT_PAUSE, SystemClock, backoff_duration, rate_limit_pause,
    rate_limit_wake_time,
};
pub use corpus::load_corpus;
pub use error::{CorpusError, FetchError, LoopError};
pub use fetch_loop::{FetchSummary, LoopOptions, run_fetch_loop};
pub use fetcher::{FetchOutcome, RateLimit, TweetFetcher};
pub use logging::{IndicatifLogger, init_logging};
pub use output::{OutputWriter, read_output};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use record::{CorpusRecord, JoinedRecord, Sentiment, TweetPayload};
pub use resume::resume_index;
pub use shutdown::{is_shutdown_requested, shutdown_flag};
