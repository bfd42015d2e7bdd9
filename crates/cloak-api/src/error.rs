//! API error type and axum `IntoResponse` implementation.
//!
//! Each variant maps to its own status (401 with `WWW-Authenticate: Bearer`,
//! 403, 404, 500) and they are never collapsed into one another. Server-error
//! detail is logged and not echoed to the caller.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use cloak_core::validator::ValidationError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum Error {
  /// No usable bearer token, or the identity service rejected the one
  /// presented.
  #[error("unauthenticated")]
  Unauthenticated,

  /// Authenticated, but the granted scopes do not cover the operation.
  #[error("forbidden")]
  Forbidden,

  /// The claim is absent for an otherwise-authorised read.
  #[error("not found")]
  NotFound,

  /// The identity service failed or was unreachable.
  #[error("identity service unavailable: {0}")]
  Upstream(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ValidationError> for Error {
  fn from(e: ValidationError) -> Self {
    match e {
      ValidationError::Unauthenticated => Error::Unauthenticated,
      ValidationError::UpstreamUnavailable(detail) => Error::Upstream(detail),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthenticated => {
        let mut response = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "unauthenticated" })),
        )
          .into_response();
        response.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer"),
        );
        response
      }
      Error::Forbidden => (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "insufficient scope" })),
      )
        .into_response(),
      Error::NotFound => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
          .into_response()
      }
      Error::Upstream(detail) => {
        tracing::error!(%detail, "identity service unavailable");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "identity service unavailable" })),
        )
          .into_response()
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "internal server error" })),
        )
          .into_response()
      }
    }
  }
}
