//! Conversions between domain types and the plain-text representations the
//! SQLite columns hold.
//!
//! Timestamps are stored as RFC 3339 strings, claim values as compact JSON,
//! and UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use cloak_core::claim::Claim;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `claims` row.
pub struct RawClaim {
  pub subject_identifier: String,
  pub claim_identifier:   String,
  pub claim_value:        String,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawClaim {
  /// Read a [`RawClaim`] from a row selected with
  /// `subject_identifier, claim_identifier, claim_value, created_at,
  /// updated_at` in that column order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_identifier: row.get(0)?,
      claim_identifier:   row.get(1)?,
      claim_value:        row.get(2)?,
      created_at:         row.get(3)?,
      updated_at:         row.get(4)?,
    })
  }

  pub fn into_claim(self) -> Result<Claim> {
    Ok(Claim {
      subject_identifier: self.subject_identifier,
      claim_identifier:   decode_uuid(&self.claim_identifier)?,
      claim_value:        serde_json::from_str(&self.claim_value)?,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}
