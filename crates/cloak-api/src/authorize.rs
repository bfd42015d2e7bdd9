//! Request authorisation: bearer extraction, token validation, and scope
//! resolution for one inbound operation.
//!
//! A request with no usable bearer token never reaches the identity service;
//! it short-circuits to 401 locally. Token failures and scope denials stay
//! distinct (401 vs 403) all the way out.

use axum::http::{HeaderMap, header};
use cloak_core::{
  identity::Identity,
  permissions::{ClaimRegistry, Decision, Operation},
  validator::TokenValidator,
};
use uuid::Uuid;

use crate::error::Error;

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(Error::Unauthenticated)
}

/// Resolve the caller's identity from the request headers.
async fn authenticate<V: TokenValidator>(
  headers: &HeaderMap,
  validator: &V,
) -> Result<Identity, Error> {
  let token = bearer_token(headers)?;
  Ok(validator.validate(token).await?)
}

/// Authorise `operation` for the bearer of `headers` and return the resolved
/// identity.
///
/// A deny from the permission table is [`Error::Forbidden`] — the caller
/// proved who they are, so this is not the 401 produced by token failures.
pub async fn authorize<V: TokenValidator>(
  headers: &HeaderMap,
  validator: &V,
  registry: &ClaimRegistry,
  operation: Operation,
) -> Result<Identity, Error> {
  let identity = authenticate(headers, validator).await?;
  match registry.resolve(&identity.scopes, operation) {
    Decision::Allow => Ok(identity),
    _ => Err(Error::Forbidden),
  }
}

/// Authorise the user-info aggregation: resolve the caller plus the set of
/// registered claims their scopes let them read. The set may be empty.
pub async fn authorize_user_info<V: TokenValidator>(
  headers: &HeaderMap,
  validator: &V,
  registry: &ClaimRegistry,
) -> Result<(Identity, Vec<Uuid>), Error> {
  let identity = authenticate(headers, validator).await?;
  match registry.resolve(&identity.scopes, Operation::UserInfo) {
    Decision::AllowClaims(readable) => Ok((identity, readable)),
    // UserInfo always resolves to AllowClaims; any other decision is a deny.
    _ => Err(Error::Forbidden),
  }
}
