//! The `ClaimStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `cloak-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.
//! Nothing here consults tokens or scopes: the store is keyed purely by the
//! true subject identifier, and authorisation happens before any call
//! reaches it.

use std::future::Future;

use uuid::Uuid;

use crate::claim::Claim;

// ─── Selection ───────────────────────────────────────────────────────────────

/// Which of a subject's claims [`ClaimStore::list_claims`] should return.
#[derive(Debug, Clone)]
pub enum ClaimSelection {
  /// Every claim stored for the subject.
  All,
  /// Only claims whose identifier is in the given set. An empty set yields
  /// an empty result, not an error.
  Only(Vec<Uuid>),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Cloak claims store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ClaimStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch one claim. Returns `None` if the subject has no value for this
  /// claim identifier.
  fn get_claim<'a>(
    &'a self,
    subject_identifier: &'a str,
    claim_identifier: Uuid,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + 'a;

  /// Insert or replace the value for `(subject_identifier,
  /// claim_identifier)` as a single atomic operation.
  ///
  /// Concurrent writers to the same pair serialise to one surviving row.
  /// `created_at` is preserved across replacements; `updated_at` is set by
  /// the store on every call. Returns the stored claim.
  fn upsert_claim<'a>(
    &'a self,
    subject_identifier: &'a str,
    claim_identifier: Uuid,
    claim_value: serde_json::Value,
  ) -> impl Future<Output = Result<Claim, Self::Error>> + Send + 'a;

  /// Remove every claim belonging to the subject, returning how many rows
  /// were removed. Zero is a valid outcome, not an error.
  fn delete_all_claims<'a>(
    &'a self,
    subject_identifier: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Return the selected claims for the subject, ordered by ascending claim
  /// identifier.
  fn list_claims<'a>(
    &'a self,
    subject_identifier: &'a str,
    selection: ClaimSelection,
  ) -> impl Future<Output = Result<Vec<Claim>, Self::Error>> + Send + 'a;
}
