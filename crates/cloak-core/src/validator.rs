//! The `TokenValidator` trait — the token-introspection contract.
//!
//! Implemented against the live identity service by `cloak-introspect`, and
//! by in-memory stubs in tests.

use std::future::Future;

use thiserror::Error;

use crate::identity::Identity;

/// Why a bearer token failed to resolve to an [`Identity`].
///
/// Callers cannot distinguish a token that never existed from one that has
/// expired; both are [`Unauthenticated`](ValidationError::Unauthenticated).
/// A failure of the identity service itself is
/// [`UpstreamUnavailable`](ValidationError::UpstreamUnavailable) and must
/// surface as a server error, never as an authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("token is unknown or expired")]
  Unauthenticated,
  #[error("identity service unavailable: {0}")]
  UpstreamUnavailable(String),
}

/// Exchanges an opaque bearer token for the identity record behind it.
pub trait TokenValidator: Send + Sync {
  /// Validate `token` against the identity service.
  ///
  /// Every call re-validates; results are not cached across requests, so a
  /// revocation takes effect on the next request.
  fn validate<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Identity, ValidationError>> + Send + 'a;
}
