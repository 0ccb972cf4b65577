//! Tweet fetcher abstraction

use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::record::TweetPayload;

/// Quota state reported with an API response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Calls left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    pub fn is_exhausted(&self) -> bool {
        self.remaining < 1
    }
}

/// Result of one fetch call that got a structured response
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(TweetPayload),
    /// Deleted, protected, suspended author, or any other non-quota error
    Unavailable { status: u16, reason: String },
    RateLimited(RateLimit),
}

/// An authenticated client able to fetch a single tweet by id.
///
/// Each call to [`fetch`](TweetFetcher::fetch) performs exactly one request.
pub trait TweetFetcher {
    fn fetch(&mut self, id: i64) -> Result<FetchOutcome, FetchError>;

    /// Quota state of the last call, if the API reported one
    fn quota(&self) -> Option<RateLimit> {
        None
    }
}

impl<F: TweetFetcher + ?Sized> TweetFetcher for &mut F {
    fn fetch(&mut self, id: i64) -> Result<FetchOutcome, FetchError> {
        (**self).fetch(id)
    }

    fn quota(&self) -> Option<RateLimit> {
        (**self).quota()
    }
}
