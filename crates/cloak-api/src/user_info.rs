//! Handler for `GET /oidc/user_info` — the aggregated view of every claim
//! the presenting token may read.
//!
//! The document is keyed by claim *name* (not identifier), carries the
//! pairwise subject identifier under `sub`, and simply omits claims the
//! caller cannot read or the subject has never stored. A token with no
//! readable claims still gets a 200 with just `sub`.

use axum::{Json, extract::State, http::HeaderMap};
use cloak_core::{
  store::{ClaimSelection, ClaimStore},
  validator::TokenValidator,
};
use serde_json::{Map, Value};

use crate::{AppState, authorize::authorize_user_info, error::Error};

/// Key carrying the pairwise subject identifier.
const SUBJECT_KEY: &str = "sub";

/// `GET /oidc/user_info`
pub async fn handler<S, V>(
  State(state): State<AppState<S, V>>,
  headers: HeaderMap,
) -> Result<Json<Value>, Error>
where
  S: ClaimStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  V: TokenValidator + Clone + Send + Sync + 'static,
{
  let (identity, readable) =
    authorize_user_info(&headers, state.validator.as_ref(), &state.registry)
      .await?;

  let claims = state
    .store
    .list_claims(
      &identity.true_subject_identifier,
      ClaimSelection::Only(readable),
    )
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let mut document = Map::new();
  document.insert(
    SUBJECT_KEY.to_owned(),
    Value::String(identity.pairwise_subject_identifier),
  );
  for claim in claims {
    // Everything in `readable` came from the registry, so the lookup holds.
    if let Some(definition) = state.registry.definition(claim.claim_identifier)
    {
      document.insert(definition.claim_name.clone(), claim.claim_value);
    }
  }

  Ok(Json(Value::Object(document)))
}
