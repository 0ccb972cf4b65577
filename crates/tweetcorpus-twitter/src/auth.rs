//! App-only authentication (OAuth 2.0 client credentials)

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use crate::http::{block_on, describe};

/// How to authenticate the client
#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued app-only bearer token
    Bearer(String),
    /// Consumer key/secret, exchanged for a bearer token at startup
    Consumer { key: String, secret: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(..)"),
            Self::Consumer { .. } => f.write_str("Consumer { .. }"),
        }
    }
}

impl Credentials {
    /// Prefer a bearer token; fall back to consumer key + secret.
    pub fn resolve(
        bearer_token: Option<&str>,
        consumer_key: Option<&str>,
        consumer_secret: Option<&str>,
    ) -> Option<Self> {
        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }
        if let Some(token) = non_empty(bearer_token) {
            return Some(Self::Bearer(token.to_string()));
        }
        match (non_empty(consumer_key), non_empty(consumer_secret)) {
            (Some(key), Some(secret)) => Some(Self::Consumer {
                key: key.to_string(),
                secret: secret.to_string(),
            }),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

/// `Basic` credential: base64 of the URL-encoded `key:secret` pair
pub fn basic_credential(key: &str, secret: &str) -> String {
    let pair = format!(
        "{}:{}",
        urlencoding::encode(key),
        urlencoding::encode(secret)
    );
    STANDARD.encode(pair)
}

/// Exchange consumer credentials for an app-only bearer token.
pub fn obtain_bearer_token(
    http: &reqwest::Client,
    api_url: &str,
    key: &str,
    secret: &str,
) -> anyhow::Result<String> {
    log::info!("Requesting app-only bearer token...");
    let url = format!("{api_url}oauth2/token");
    let (status, body) = block_on(async {
        let resp = http
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", basic_credential(key, secret)),
            )
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded;charset=UTF-8",
            )
            .body("grant_type=client_credentials")
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    })
    .map_err(|e| anyhow::anyhow!("Token request failed: {}", describe(e)))?;

    anyhow::ensure!(
        status.is_success(),
        "Token request rejected with HTTP {}",
        status.as_u16()
    );
    parse_token(&body)
}

fn parse_token(body: &str) -> anyhow::Result<String> {
    let token: TokenResponse = serde_json::from_str(body).context("Invalid token response JSON")?;
    anyhow::ensure!(
        token.token_type.eq_ignore_ascii_case("bearer"),
        "Unexpected token type: {}",
        token.token_type
    );
    Ok(token.access_token)
}
