//! Authenticated Twitter API v2 client implementing [`TweetFetcher`]

use std::time::Duration;

use chrono::{DateTime, Utc};
use tweetcorpus_core::{FetchError, FetchOutcome, RateLimit, TweetFetcher};

use crate::auth::{Credentials, obtain_bearer_token};
use crate::http::{block_on, build_client, describe};
use crate::transform::{ApiProblem, TweetResponse, into_outcome};

/// Length of the API's rate-limit window in seconds, used when a 429
/// carries no reset header.
const RATE_LIMIT_WINDOW_SECS: i64 = 15 * 60;

const TWEET_FIELDS: &str = "tweet.fields=created_at,lang&expansions=author_id&user.fields=username";

/// Status line, quota headers, and body of one API response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// `x-rate-limit-remaining`
    pub remaining: Option<u32>,
    /// `x-rate-limit-reset`, epoch seconds
    pub reset: Option<i64>,
    pub body: String,
}

impl RawResponse {
    /// Quota reported by the headers, if both are present and valid
    pub fn rate_limit(&self) -> Option<RateLimit> {
        let remaining = self.remaining?;
        let reset_at = DateTime::<Utc>::from_timestamp(self.reset?, 0)?;
        Some(RateLimit {
            remaining,
            reset_at,
        })
    }
}

/// Translate a raw response into a fetch outcome.
///
/// - 200: decoded tweet, or `Unavailable` for per-tweet problems
/// - 429, or any other error with no calls left: `RateLimited`
/// - 401: fatal `Unauthorized`
/// - anything else: `Unavailable` with the HTTP status
pub fn classify_response(
    raw: &RawResponse,
    now: DateTime<Utc>,
) -> Result<FetchOutcome, FetchError> {
    let limit = raw.rate_limit();
    match raw.status {
        200 => {
            let resp: TweetResponse =
                serde_json::from_str(&raw.body).map_err(|e| FetchError::Decode {
                    message: e.to_string(),
                })?;
            into_outcome(resp)
        }
        401 => Err(FetchError::Unauthorized {
            message: problem_reason(raw),
        }),
        429 => {
            let reset_at = limit.map_or_else(
                || now + chrono::Duration::seconds(RATE_LIMIT_WINDOW_SECS),
                |l| l.reset_at,
            );
            Ok(FetchOutcome::RateLimited(RateLimit {
                remaining: 0,
                reset_at,
            }))
        }
        _ => match limit {
            Some(l) if l.is_exhausted() => Ok(FetchOutcome::RateLimited(l)),
            _ => Ok(FetchOutcome::Unavailable {
                status: raw.status,
                reason: problem_reason(raw),
            }),
        },
    }
}

/// Human-readable reason from an error body, or the body itself.
fn problem_reason(raw: &RawResponse) -> String {
    match serde_json::from_str::<ApiProblem>(&raw.body) {
        Ok(p) if p.title.is_some() || p.detail.is_some() => p.reason(),
        _ if raw.body.trim().is_empty() => format!("HTTP {}", raw.status),
        _ => raw.body.chars().take(200).collect(),
    }
}

/// Twitter API client holding an app-only bearer token.
pub struct TwitterClient {
    api_url: String,
    bearer_token: String,
    http: reqwest::Client,
    last_quota: Option<RateLimit>,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("api_url", &self.api_url)
            .field("last_quota", &self.last_quota)
            .finish_non_exhaustive()
    }
}

impl TwitterClient {
    /// Build an authenticated client, exchanging consumer credentials for a
    /// bearer token when needed.
    pub fn connect(
        api_url: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = build_client(timeout)?;
        let api_url = normalize_base(api_url);
        let bearer_token = match credentials {
            Credentials::Bearer(token) => token.clone(),
            Credentials::Consumer { key, secret } => {
                obtain_bearer_token(&http, &api_url, key, secret)?
            }
        };
        log::debug!("Twitter client ready for {api_url}");
        Ok(Self {
            api_url,
            bearer_token,
            http,
            last_quota: None,
        })
    }

    fn tweet_url(&self, id: i64) -> String {
        format!("{}2/tweets/{id}?{TWEET_FIELDS}", self.api_url)
    }

    fn get(&self, id: i64) -> Result<RawResponse, reqwest::Error> {
        let url = self.tweet_url(id);
        block_on(async {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(&self.bearer_token)
                .send()
                .await?;
            let status = resp.status().as_u16();
            let header = |name: &str| {
                resp.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            };
            let remaining = header("x-rate-limit-remaining").and_then(|v| v.parse().ok());
            let reset = header("x-rate-limit-reset").and_then(|v| v.parse().ok());
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>(RawResponse {
                status,
                remaining,
                reset,
                body,
            })
        })
    }
}

impl TweetFetcher for TwitterClient {
    fn fetch(&mut self, id: i64) -> Result<FetchOutcome, FetchError> {
        let raw = self.get(id).map_err(|e| FetchError::Transport {
            message: describe(e),
        })?;
        if let Some(limit) = raw.rate_limit() {
            self.last_quota = Some(limit);
        }
        log::debug!(
            "tweet {id}: HTTP {} (remaining {:?})",
            raw.status,
            raw.remaining
        );
        classify_response(&raw, Utc::now())
    }

    fn quota(&self) -> Option<RateLimit> {
        self.last_quota
    }
}

/// Ensure the base URL ends with exactly one `/`.
fn normalize_base(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn raw(status: u16, remaining: Option<u32>, reset: Option<i64>, body: &str) -> RawResponse {
        RawResponse {
            status,
            remaining,
            reset,
            body: body.to_string(),
        }
    }

    const RESET: i64 = 1_714_557_600; // 2024-05-01T10:00:00Z

    #[test]
    fn ok_tweet_is_success() {
        let body = r#"{"data":{"id":"1","text":"hello","created_at":"2011-10-18T20:53:40.000Z","lang":"en","author_id":"9"},"includes":{"users":[{"id":"9","username":"bob"}]}}"#;
        let outcome = classify_response(&raw(200, Some(899), Some(RESET), body), now()).unwrap();
        match outcome {
            FetchOutcome::Success(p) => {
                assert_eq!(p.text, "hello");
                assert_eq!(p.author_handle, "bob");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn ok_with_garbage_body_is_decode_error() {
        let result = classify_response(&raw(200, None, None, "<html>"), now());
        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }

    #[test]
    fn too_many_requests_uses_reset_header() {
        let outcome = classify_response(&raw(429, Some(0), Some(RESET + 300), ""), now()).unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::RateLimited(RateLimit {
                remaining: 0,
                reset_at: now() + chrono::Duration::seconds(300),
            })
        );
    }

    #[test]
    fn too_many_requests_without_headers_waits_a_window() {
        let outcome = classify_response(&raw(429, None, None, ""), now()).unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::RateLimited(RateLimit {
                remaining: 0,
                reset_at: now() + chrono::Duration::minutes(15),
            })
        );
    }

    #[test]
    fn error_with_exhausted_quota_is_rate_limited() {
        let outcome = classify_response(&raw(503, Some(0), Some(RESET), ""), now()).unwrap();
        assert!(matches!(outcome, FetchOutcome::RateLimited(l) if l.remaining == 0));
    }

    #[test]
    fn error_with_quota_left_is_unavailable() {
        let body = r#"{"title":"Service Unavailable","detail":"Service Unavailable","type":"about:blank","status":503}"#;
        let outcome = classify_response(&raw(503, Some(10), Some(RESET), body), now()).unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Unavailable {
                status: 503,
                reason: "Service Unavailable (Service Unavailable)".to_string(),
            }
        );
    }

    #[test]
    fn unauthorized_is_fatal() {
        let body = r#"{"title":"Unauthorized","type":"about:blank","status":401,"detail":"Unauthorized"}"#;
        let result = classify_response(&raw(401, None, None, body), now());
        assert!(matches!(result, Err(FetchError::Unauthorized { .. })));
    }

    #[test]
    fn empty_error_body_reason_is_status() {
        let outcome = classify_response(&raw(404, None, None, ""), now()).unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Unavailable {
                status: 404,
                reason: "HTTP 404".to_string(),
            }
        );
    }

    #[test]
    fn rate_limit_requires_both_headers() {
        assert!(raw(200, Some(1), None, "").rate_limit().is_none());
        assert!(raw(200, None, Some(RESET), "").rate_limit().is_none());
        assert_eq!(
            raw(200, Some(5), Some(RESET), "").rate_limit(),
            Some(RateLimit {
                remaining: 5,
                reset_at: now(),
            })
        );
    }

    #[test]
    fn normalize_base_single_slash() {
        assert_eq!(normalize_base("https://api.twitter.com"), "https://api.twitter.com/");
        assert_eq!(normalize_base("https://api.twitter.com//"), "https://api.twitter.com/");
    }
}
