//! Tweetcorpus Twitter - Twitter API v2 client for the corpus fetch loop
//!
//! Provides [`TwitterClient`], the authenticated [`TweetFetcher`] used by
//! the CLI, the app-only bearer token exchange, and the mapping from API
//! responses to corpus payloads.
//!
//! [`TweetFetcher`]: tweetcorpus_core::TweetFetcher

pub mod auth;
pub mod client;
pub mod http;
pub mod transform;

// Re-exports
pub use auth::{Credentials, obtain_bearer_token};
pub use client::{RawResponse, TwitterClient, classify_response};
pub use transform::{TweetResponse, into_outcome};
