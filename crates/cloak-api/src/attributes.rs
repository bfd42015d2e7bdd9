//! Handlers for the `/v1/attributes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/v1/attributes/{claim_identifier}` | Needs the claim's read (or write) scope; 404 if no value is stored |
//! | `PUT`/`PATCH` | `/v1/attributes/{claim_identifier}` | Body: [`WriteBody`]; needs the write scope; insert and replace are the same call |
//! | `DELETE` | `/v1/attributes/all` | Removes every claim of the resolved subject; needs the delete scope |
//!
//! Responses carry the caller's pairwise identifier, never the true one.

use axum::{
  Json,
  extract::{Path, State},
  http::HeaderMap,
};
use cloak_core::{
  claim::AnonymisedClaim,
  permissions::Operation,
  store::ClaimStore,
  validator::TokenValidator,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, authorize::authorize, error::Error};

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /v1/attributes/{claim_identifier}`
pub async fn read_one<S, V>(
  State(state): State<AppState<S, V>>,
  Path(claim_identifier): Path<Uuid>,
  headers: HeaderMap,
) -> Result<Json<AnonymisedClaim>, Error>
where
  S: ClaimStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  V: TokenValidator + Clone + Send + Sync + 'static,
{
  let identity = authorize(
    &headers,
    state.validator.as_ref(),
    &state.registry,
    Operation::Read(claim_identifier),
  )
  .await?;

  let claim = state
    .store
    .get_claim(&identity.true_subject_identifier, claim_identifier)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::NotFound)?;

  Ok(Json(claim.anonymise(&identity.pairwise_subject_identifier)))
}

// ─── Write ────────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT`/`PATCH /v1/attributes/{claim_identifier}`.
#[derive(Debug, Deserialize)]
pub struct WriteBody {
  /// The replacement value — any JSON document, including `null`. Omitting
  /// the key stores `null`.
  #[serde(default)]
  pub claim_value: serde_json::Value,
}

/// `PUT|PATCH /v1/attributes/{claim_identifier}`
///
/// Writing to a pair that already has a value replaces it in place; the two
/// verbs behave identically.
pub async fn write_one<S, V>(
  State(state): State<AppState<S, V>>,
  Path(claim_identifier): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<WriteBody>,
) -> Result<Json<AnonymisedClaim>, Error>
where
  S: ClaimStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  V: TokenValidator + Clone + Send + Sync + 'static,
{
  let identity = authorize(
    &headers,
    state.validator.as_ref(),
    &state.registry,
    Operation::Write(claim_identifier),
  )
  .await?;

  let claim = state
    .store
    .upsert_claim(
      &identity.true_subject_identifier,
      claim_identifier,
      body.claim_value,
    )
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  Ok(Json(claim.anonymise(&identity.pairwise_subject_identifier)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /v1/attributes/all`
pub async fn delete_all<S, V>(
  State(state): State<AppState<S, V>>,
  headers: HeaderMap,
) -> Result<Json<serde_json::Value>, Error>
where
  S: ClaimStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  V: TokenValidator + Clone + Send + Sync + 'static,
{
  let identity = authorize(
    &headers,
    state.validator.as_ref(),
    &state.registry,
    Operation::DeleteAll,
  )
  .await?;

  let deleted = state
    .store
    .delete_all_claims(&identity.true_subject_identifier)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  // Deleting nothing is still a success.
  Ok(Json(json!({ "deleted": deleted })))
}
