//! Claim types — the fundamental unit of the Cloak attribute store.
//!
//! A claim is one named attribute value belonging to one subject. The
//! `(subject_identifier, claim_identifier)` pair is the claim's identity: at
//! most one claim exists per pair, and a write to an existing pair replaces
//! its value in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Claim ───────────────────────────────────────────────────────────────────

/// A stored attribute value, keyed by the *true* identifier of its owner.
///
/// This type deliberately does not implement [`serde::Serialize`]: the only
/// way to render a claim outward is [`Claim::anonymise`], which swaps the
/// true identifier for the caller's pairwise one.
#[derive(Debug, Clone)]
pub struct Claim {
  pub subject_identifier: String,
  pub claim_identifier:   Uuid,
  /// Any JSON document, including `null`.
  pub claim_value:        serde_json::Value,
  /// Server-assigned on first write; never changes afterwards.
  pub created_at:         DateTime<Utc>,
  /// Server-assigned on every write.
  pub updated_at:         DateTime<Utc>,
}

// ─── AnonymisedClaim ─────────────────────────────────────────────────────────

/// The outbound form of a [`Claim`]: identical except that
/// `subject_identifier` holds the pairwise identifier of the requesting
/// token rather than the true identifier of the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymisedClaim {
  pub subject_identifier: String,
  pub claim_identifier:   Uuid,
  pub claim_value:        serde_json::Value,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

impl Claim {
  /// Render this claim for the caller known as `pairwise_subject_identifier`.
  pub fn anonymise(self, pairwise_subject_identifier: &str) -> AnonymisedClaim {
    AnonymisedClaim {
      subject_identifier: pairwise_subject_identifier.to_owned(),
      claim_identifier:   self.claim_identifier,
      claim_value:        self.claim_value,
      created_at:         self.created_at,
      updated_at:         self.updated_at,
    }
  }
}
