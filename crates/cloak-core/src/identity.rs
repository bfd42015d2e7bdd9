//! Identity — the resolved owner of a bearer token.

/// The result of exchanging a bearer token with the identity service.
///
/// Ephemeral: produced per request by a
/// [`TokenValidator`](crate::validator::TokenValidator) and dropped when the
/// request completes. Never persisted.
#[derive(Debug, Clone)]
pub struct Identity {
  /// The real identifier of the data subject. Used only as the store lookup
  /// key; must never appear in a response body.
  pub true_subject_identifier:     String,
  /// The caller-facing identifier substituted into all outbound data.
  pub pairwise_subject_identifier: String,
  /// Scope strings granted to the presenting token.
  pub scopes:                      Vec<String>,
}
