//! Token-introspection client for the external identity service.
//!
//! Exchanges an opaque bearer token for the identity record behind it by
//! calling the service's deanonymise endpoint. The many ways a call can go
//! wrong collapse into the two outcomes callers act on:
//! [`ValidationError::Unauthenticated`] when the token is unknown or expired,
//! and [`ValidationError::UpstreamUnavailable`] when the service itself
//! failed. The finer detail is logged here and goes no further.

use std::time::Duration;

use cloak_core::{
  identity::Identity,
  validator::{TokenValidator, ValidationError},
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the identity service.
#[derive(Debug, Clone)]
pub struct IntrospectorConfig {
  /// Base URL, e.g. `https://accounts.example.org`.
  pub base_url:      String,
  /// Static service-level credential presented on every introspection call.
  /// Unrelated to the end-user tokens being introspected.
  pub service_token: String,
}

/// Time allowed for one introspection call. A slower identity service fails
/// the request as unavailable; there are no retries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Client ──────────────────────────────────────────────────────────────────

/// [`TokenValidator`] backed by the identity service's HTTP API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct TokenIntrospector {
  client: Client,
  config: IntrospectorConfig,
}

impl TokenIntrospector {
  pub fn new(config: IntrospectorConfig) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!(
      "{}/api/v1/deanonymise-token",
      self.config.base_url.trim_end_matches('/')
    )
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// Body of a successful deanonymise response.
#[derive(Debug, Deserialize)]
struct WireIdentity {
  true_subject_identifier:     WireSubjectIdentifier,
  pairwise_subject_identifier: String,
  scopes:                      Vec<String>,
}

/// The true identifier arrives as a JSON string or a JSON number depending
/// on the upstream record; both normalise to a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSubjectIdentifier {
  Text(String),
  Numeric(i64),
}

impl WireSubjectIdentifier {
  fn into_string(self) -> String {
    match self {
      Self::Text(s) => s,
      Self::Numeric(n) => n.to_string(),
    }
  }
}

impl From<WireIdentity> for Identity {
  fn from(wire: WireIdentity) -> Self {
    Identity {
      true_subject_identifier:     wire.true_subject_identifier.into_string(),
      pairwise_subject_identifier: wire.pairwise_subject_identifier,
      scopes:                      wire.scopes,
    }
  }
}

// ─── TokenValidator impl ─────────────────────────────────────────────────────

impl TokenValidator for TokenIntrospector {
  async fn validate(&self, token: &str) -> Result<Identity, ValidationError> {
    let response = self
      .client
      .get(self.url())
      .query(&[("token", token)])
      .bearer_auth(&self.config.service_token)
      .header(reqwest::header::ACCEPT, "application/json")
      .send()
      .await
      .map_err(|e| {
        tracing::warn!(error = %e, "identity service unreachable");
        ValidationError::UpstreamUnavailable(
          "identity service unreachable".to_owned(),
        )
      })?;

    match response.status() {
      status if status.is_success() => {
        let wire: WireIdentity = response.json().await.map_err(|e| {
          tracing::warn!(error = %e, "identity service body was unreadable");
          ValidationError::UpstreamUnavailable(
            "invalid identity service response".to_owned(),
          )
        })?;
        Ok(Identity::from(wire))
      }
      // The service reports an unknown token as 404 and a revoked or
      // expired one as 410; callers see a single unauthenticated outcome.
      StatusCode::NOT_FOUND | StatusCode::GONE => {
        Err(ValidationError::Unauthenticated)
      }
      status => {
        tracing::warn!(status = %status, "identity service failure");
        Err(ValidationError::UpstreamUnavailable(format!(
          "identity service returned {status}"
        )))
      }
    }
  }
}
