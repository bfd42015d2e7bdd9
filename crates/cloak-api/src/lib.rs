//! HTTP surface for the Cloak claims store.
//!
//! Exposes an axum [`Router`] implementing the attribute endpoints and the
//! OIDC-style user-info aggregation, backed by any [`ClaimStore`] and any
//! [`TokenValidator`]. Authorisation happens here, before either backend is
//! touched; every response body carries the caller's pairwise subject
//! identifier and the true identifier never leaves the store boundary.

pub mod attributes;
pub mod authorize;
pub mod error;
pub mod user_info;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  routing::{delete, get},
};
use cloak_core::{
  permissions::ClaimRegistry, store::ClaimStore, validator::TokenValidator,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CLOAK_`-prefixed environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Base URL of the identity service used for token introspection.
  pub account_manager_url:   String,
  /// Service-level credential presented to the identity service.
  pub account_manager_token: String,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ClaimStore, V: TokenValidator> {
  pub store:     Arc<S>,
  pub validator: Arc<V>,
  pub registry:  Arc<ClaimRegistry>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the attribute server.
pub fn router<S, V>(state: AppState<S, V>) -> Router
where
  S: ClaimStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  V: TokenValidator + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/oidc/user_info", get(user_info::handler::<S, V>))
    .route("/v1/attributes/all", delete(attributes::delete_all::<S, V>))
    .route(
      "/v1/attributes/{claim_identifier}",
      get(attributes::read_one::<S, V>)
        .put(attributes::write_one::<S, V>)
        .patch(attributes::write_one::<S, V>),
    )
    .route("/healthz", get(healthz))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Liveness probe. No authentication and no identity-service call.
async fn healthz() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use cloak_core::{
    identity::Identity,
    permissions::{
      CLAIM_DATE_OF_BIRTH, CLAIM_EMAIL_ADDRESS, CLAIM_FULL_NAME,
      ClaimRegistry, DELETE_SCOPE,
    },
    store::{ClaimSelection, ClaimStore},
    validator::{TokenValidator, ValidationError},
  };
  use cloak_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  const TRUE_ID: &str = "true-subject-identifier";
  const PAIRWISE_ID: &str = "pairwise-subject-identifier";

  // ── Stub validators ─────────────────────────────────────────────────────────

  /// Accepts any token and answers with a fixed identity.
  #[derive(Clone)]
  struct StaticValidator {
    identity: Identity,
  }

  impl TokenValidator for StaticValidator {
    async fn validate(&self, _token: &str) -> Result<Identity, ValidationError> {
      Ok(self.identity.clone())
    }
  }

  /// Rejects any token with a fixed error.
  #[derive(Clone)]
  struct FailingValidator {
    error: ValidationError,
  }

  impl TokenValidator for FailingValidator {
    async fn validate(&self, _token: &str) -> Result<Identity, ValidationError> {
      Err(self.error.clone())
    }
  }

  /// Panics if consulted — proves a code path never reached the identity
  /// service.
  #[derive(Clone)]
  struct UnreachableValidator;

  impl TokenValidator for UnreachableValidator {
    async fn validate(&self, _token: &str) -> Result<Identity, ValidationError> {
      panic!("the identity service must not be consulted");
    }
  }

  // ── Helpers ─────────────────────────────────────────────────────────────────

  fn scopes(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  fn identity(scope_names: &[&str]) -> Identity {
    Identity {
      true_subject_identifier:     TRUE_ID.to_owned(),
      pairwise_subject_identifier: PAIRWISE_ID.to_owned(),
      scopes:                      scopes(scope_names),
    }
  }

  async fn state_with<V>(validator: V) -> AppState<SqliteStore, V>
  where
    V: TokenValidator + Clone + Send + Sync + 'static,
  {
    AppState {
      store:     Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      validator: Arc::new(validator),
      registry:  Arc::new(ClaimRegistry::builtin()),
    }
  }

  async fn state_for(scope_names: &[&str]) -> AppState<SqliteStore, StaticValidator> {
    state_with(StaticValidator { identity: identity(scope_names) }).await
  }

  async fn request<S, V>(
    state: AppState<S, V>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> axum::response::Response
  where
    S: ClaimStore + Clone + Send + Sync + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    V: TokenValidator + Clone + Send + Sync + 'static,
  {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
      Some(value) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router(state).oneshot(request).await.unwrap()
  }

  async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
  }

  fn attribute_uri(claim_identifier: Uuid) -> String {
    format!("/v1/attributes/{claim_identifier}")
  }

  // ── Reading one claim ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn read_returns_the_claim_under_the_pairwise_identifier() {
    let state = state_for(&["read:full_name"]).await;
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_FULL_NAME, json!("Alice Liddell"))
      .await
      .unwrap();

    let response = request(
      state,
      "GET",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(!text.contains(TRUE_ID), "true identifier leaked: {text}");

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["subject_identifier"], json!(PAIRWISE_ID));
    assert_eq!(body["claim_identifier"], json!(CLAIM_FULL_NAME.to_string()));
    assert_eq!(body["claim_value"], json!("Alice Liddell"));
  }

  #[tokio::test]
  async fn the_write_scope_also_grants_read() {
    let state = state_for(&["write:full_name"]).await;
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_FULL_NAME, json!("Alice Liddell"))
      .await
      .unwrap();

    let response = request(
      state,
      "GET",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn read_without_a_matching_scope_is_403() {
    let state = state_for(&["read:date_of_birth"]).await;
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_FULL_NAME, json!("Alice Liddell"))
      .await
      .unwrap();

    let response = request(
      state,
      "GET",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
      body_json(response).await,
      json!({ "error": "insufficient scope" })
    );
  }

  #[tokio::test]
  async fn read_of_an_unregistered_claim_is_403() {
    let state = state_for(&[
      "read:full_name",
      "write:full_name",
      DELETE_SCOPE,
    ])
    .await;

    let response = request(
      state,
      "GET",
      &attribute_uri(Uuid::new_v4()),
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn read_of_an_absent_claim_is_404() {
    let state = state_for(&["read:full_name"]).await;

    let response = request(
      state,
      "GET",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }

  // ── Writing one claim ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn put_stores_the_value_and_returns_the_anonymised_claim() {
    let state = state_for(&["write:email_address"]).await;

    let response = request(
      state.clone(),
      "PUT",
      &attribute_uri(CLAIM_EMAIL_ADDRESS),
      Some("user-token"),
      Some(json!({ "claim_value": { "address": "alice@example.com" } })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["subject_identifier"], json!(PAIRWISE_ID));
    assert_eq!(
      body["claim_value"],
      json!({ "address": "alice@example.com" })
    );

    // Readable back through the API because write implies read.
    let read_back = request(
      state,
      "GET",
      &attribute_uri(CLAIM_EMAIL_ADDRESS),
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(read_back.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn patch_behaves_exactly_like_put() {
    let state = state_for(&["write:full_name"]).await;

    let response = request(
      state.clone(),
      "PATCH",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      Some(json!({ "claim_value": "Alice" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = state
      .store
      .get_claim(TRUE_ID, CLAIM_FULL_NAME)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.claim_value, json!("Alice"));
  }

  #[tokio::test]
  async fn a_second_write_replaces_the_value_in_place() {
    let state = state_for(&["write:full_name"]).await;

    for value in ["before", "after"] {
      let response = request(
        state.clone(),
        "PUT",
        &attribute_uri(CLAIM_FULL_NAME),
        Some("user-token"),
        Some(json!({ "claim_value": value })),
      )
      .await;
      assert_eq!(response.status(), StatusCode::OK);
    }

    let stored = state
      .store
      .list_claims(TRUE_ID, ClaimSelection::All)
      .await
      .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].claim_value, json!("after"));
  }

  #[tokio::test]
  async fn write_with_only_the_read_scope_is_403() {
    let state = state_for(&["read:full_name"]).await;

    let response = request(
      state.clone(),
      "PUT",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      Some(json!({ "claim_value": "Mallory" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = state.store.get_claim(TRUE_ID, CLAIM_FULL_NAME).await.unwrap();
    assert!(stored.is_none());
  }

  #[tokio::test]
  async fn a_null_value_is_stored_rather_than_deleted() {
    let state = state_for(&["write:full_name"]).await;

    let response = request(
      state.clone(),
      "PUT",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      Some(json!({ "claim_value": null })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The claim exists with a null value; a read finds it rather than 404ing.
    let read_back = request(
      state,
      "GET",
      &attribute_uri(CLAIM_FULL_NAME),
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(read_back.status(), StatusCode::OK);
    assert_eq!(body_json(read_back).await["claim_value"], Value::Null);
  }

  // ── Deleting everything ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_all_reports_the_rows_removed_and_spares_other_subjects() {
    let state = state_for(&[DELETE_SCOPE]).await;
    for claim_id in [CLAIM_FULL_NAME, CLAIM_EMAIL_ADDRESS, CLAIM_DATE_OF_BIRTH] {
      state
        .store
        .upsert_claim(TRUE_ID, claim_id, json!("x"))
        .await
        .unwrap();
    }
    state
      .store
      .upsert_claim("someone-else", CLAIM_FULL_NAME, json!("kept"))
      .await
      .unwrap();

    let response = request(
      state.clone(),
      "DELETE",
      "/v1/attributes/all",
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "deleted": 3 }));

    let mine = state.store.list_claims(TRUE_ID, ClaimSelection::All).await.unwrap();
    assert!(mine.is_empty());
    let theirs = state
      .store
      .list_claims("someone-else", ClaimSelection::All)
      .await
      .unwrap();
    assert_eq!(theirs.len(), 1);
  }

  #[tokio::test]
  async fn delete_all_without_the_delete_scope_is_403_and_removes_nothing() {
    let state = state_for(&[
      "read:full_name",
      "write:full_name",
      "read:email_address",
      "write:email_address",
    ])
    .await;
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_FULL_NAME, json!("still here"))
      .await
      .unwrap();

    let response = request(
      state.clone(),
      "DELETE",
      "/v1/attributes/all",
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = state.store.list_claims(TRUE_ID, ClaimSelection::All).await.unwrap();
    assert_eq!(stored.len(), 1);
  }

  #[tokio::test]
  async fn delete_all_with_nothing_stored_reports_zero() {
    let state = state_for(&[DELETE_SCOPE]).await;

    let response = request(
      state,
      "DELETE",
      "/v1/attributes/all",
      Some("user-token"),
      None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "deleted": 0 }));
  }

  // ── User info ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn user_info_aggregates_readable_claims_by_name() {
    let state = state_for(&["read:full_name", "write:email_address"]).await;
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_FULL_NAME, json!("Alice Liddell"))
      .await
      .unwrap();
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_EMAIL_ADDRESS, json!("alice@example.com"))
      .await
      .unwrap();
    // Stored but not covered by any held scope.
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_DATE_OF_BIRTH, json!("1852-05-04"))
      .await
      .unwrap();
    // Stored but not registered at all.
    state
      .store
      .upsert_claim(TRUE_ID, Uuid::new_v4(), json!("opaque"))
      .await
      .unwrap();

    let response =
      request(state, "GET", "/oidc/user_info", Some("user-token"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(!text.contains(TRUE_ID), "true identifier leaked: {text}");

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
      body,
      json!({
        "sub": PAIRWISE_ID,
        "full_name": "Alice Liddell",
        "email_address": "alice@example.com",
      })
    );
  }

  #[tokio::test]
  async fn user_info_without_readable_claims_is_just_sub() {
    let state = state_for(&["something:else"]).await;
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_FULL_NAME, json!("Alice Liddell"))
      .await
      .unwrap();

    let response =
      request(state, "GET", "/oidc/user_info", Some("user-token"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "sub": PAIRWISE_ID }));
  }

  #[tokio::test]
  async fn user_info_omits_readable_claims_with_no_stored_value() {
    let state = state_for(&["read:full_name", "read:date_of_birth"]).await;
    state
      .store
      .upsert_claim(TRUE_ID, CLAIM_FULL_NAME, json!("Alice Liddell"))
      .await
      .unwrap();

    let response =
      request(state, "GET", "/oidc/user_info", Some("user-token"), None).await;
    assert_eq!(
      body_json(response).await,
      json!({ "sub": PAIRWISE_ID, "full_name": "Alice Liddell" })
    );
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn a_missing_header_is_401_without_an_introspection_call() {
    let state = state_with(UnreachableValidator).await;

    let response = request(state, "GET", "/oidc/user_info", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn a_non_bearer_scheme_is_401_without_an_introspection_call() {
    let state = state_with(UnreachableValidator).await;

    let req = Request::builder()
      .method("GET")
      .uri("/oidc/user_info")
      .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
      .body(Body::empty())
      .unwrap();
    let response = router(state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn a_rejected_token_is_401_from_every_endpoint() {
    let state = state_with(FailingValidator {
      error: ValidationError::Unauthenticated,
    })
    .await;

    let endpoints: [(&str, String, Option<Value>); 4] = [
      ("GET", "/oidc/user_info".to_owned(), None),
      ("GET", attribute_uri(CLAIM_FULL_NAME), None),
      (
        "PUT",
        attribute_uri(CLAIM_FULL_NAME),
        Some(json!({ "claim_value": "x" })),
      ),
      ("DELETE", "/v1/attributes/all".to_owned(), None),
    ];
    for (method, uri, body) in endpoints {
      let response =
        request(state.clone(), method, &uri, Some("expired-token"), body).await;
      assert_eq!(
        response.status(),
        StatusCode::UNAUTHORIZED,
        "{method} {uri}"
      );
    }
  }

  #[tokio::test]
  async fn an_unavailable_identity_service_is_500_from_every_endpoint() {
    let state = state_with(FailingValidator {
      error: ValidationError::UpstreamUnavailable("connection refused".to_owned()),
    })
    .await;

    let endpoints: [(&str, String, Option<Value>); 4] = [
      ("GET", "/oidc/user_info".to_owned(), None),
      ("GET", attribute_uri(CLAIM_FULL_NAME), None),
      (
        "PUT",
        attribute_uri(CLAIM_FULL_NAME),
        Some(json!({ "claim_value": "x" })),
      ),
      ("DELETE", "/v1/attributes/all".to_owned(), None),
    ];
    for (method, uri, body) in endpoints {
      let response =
        request(state.clone(), method, &uri, Some("user-token"), body).await;
      assert_eq!(
        response.status(),
        StatusCode::INTERNAL_SERVER_ERROR,
        "{method} {uri}"
      );
      assert_eq!(
        body_json(response).await,
        json!({ "error": "identity service unavailable" })
      );
    }
  }

  // ── Health ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn healthz_answers_without_authentication() {
    let state = state_with(UnreachableValidator).await;

    let response = request(state, "GET", "/healthz", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
  }
}
