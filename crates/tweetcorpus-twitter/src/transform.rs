//! Twitter API v2 tweet lookup response → corpus payload

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tweetcorpus_core::{FetchError, FetchOutcome, TweetPayload};

/// Language tag Twitter uses when it could not detect one
const UNDETERMINED_LANG: &str = "und";

/// `GET /2/tweets/:id` body (only the fields we consume)
#[derive(Debug, Deserialize)]
pub struct TweetResponse {
    pub data: Option<TweetData>,
    pub includes: Option<Includes>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub lang: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Problem object, both as a top-level error body and inside `errors`
#[derive(Debug, Default, Deserialize)]
pub struct ApiProblem {
    pub title: Option<String>,
    pub detail: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ApiProblem {
    /// HTTP-like status for a per-resource problem in a 200 response
    pub fn status(&self) -> u16 {
        match self.title.as_deref() {
            Some("Not Found Error") => 404,
            Some("Authorization Error") | Some("Forbidden") => 403,
            _ => 400,
        }
    }

    pub fn reason(&self) -> String {
        match (&self.title, &self.detail) {
            (Some(t), Some(d)) => format!("{t} ({d})"),
            (Some(t), None) => t.clone(),
            (None, Some(d)) => d.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Map a decoded 200 response to a fetch outcome.
///
/// Deleted, protected, and suspended tweets come back as 200 with an
/// `errors` array and no `data`; those are `Unavailable`. A tweet without
/// `created_at` means the request fields were ignored, which is a decode
/// error rather than a skippable record.
pub fn into_outcome(resp: TweetResponse) -> Result<FetchOutcome, FetchError> {
    let Some(data) = resp.data else {
        let problem = resp.errors.into_iter().next().unwrap_or_default();
        return Ok(FetchOutcome::Unavailable {
            status: problem.status(),
            reason: problem.reason(),
        });
    };

    let created_at = data.created_at.ok_or_else(|| FetchError::Decode {
        message: format!("tweet {} has no created_at", data.id),
    })?;
    let users = resp.includes.map(|i| i.users).unwrap_or_default();
    let author_handle = author_handle(data.author_id.as_deref(), &users);

    Ok(FetchOutcome::Success(TweetPayload {
        created_at,
        language: data.lang.unwrap_or_else(|| UNDETERMINED_LANG.to_string()),
        author_handle,
        text: data.text,
    }))
}

/// Username of the author from the `includes.users` expansion, falling
/// back to the numeric author id.
fn author_handle(author_id: Option<&str>, users: &[User]) -> String {
    let Some(author_id) = author_id else {
        return String::new();
    };
    users
        .iter()
        .find(|u| u.id == author_id)
        .map_or_else(|| author_id.to_string(), |u| u.username.clone())
}
