//! [`SqliteStore`] — the SQLite implementation of [`ClaimStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use cloak_core::{
  claim::Claim,
  store::{ClaimSelection, ClaimStore},
};

use crate::{
  Result,
  encode::{RawClaim, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cloak claims store backed by a single SQLite file.
///
/// Clones share the underlying connection handle and are cheap to make.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open the database at `path`, creating it and its schema as needed.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory database, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self.conn.call(|conn| Ok(conn.execute_batch(SCHEMA)?)).await?;
    Ok(())
  }
}

// ─── ClaimStore impl ─────────────────────────────────────────────────────────

impl ClaimStore for SqliteStore {
  type Error = crate::Error;

  async fn get_claim(
    &self,
    subject_identifier: &str,
    claim_identifier: Uuid,
  ) -> Result<Option<Claim>> {
    let subject  = subject_identifier.to_owned();
    let claim_id = encode_uuid(claim_identifier);

    let raw: Option<RawClaim> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_identifier, claim_identifier, claim_value,
                      created_at, updated_at
               FROM claims
               WHERE subject_identifier = ?1 AND claim_identifier = ?2",
              rusqlite::params![subject, claim_id],
              RawClaim::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawClaim::into_claim).transpose()
  }

  async fn upsert_claim(
    &self,
    subject_identifier: &str,
    claim_identifier: Uuid,
    claim_value: serde_json::Value,
  ) -> Result<Claim> {
    let subject   = subject_identifier.to_owned();
    let claim_id  = encode_uuid(claim_identifier);
    let value_str = claim_value.to_string();
    let now_str   = encode_dt(Utc::now());

    // One statement. The conflict target is the composite primary key, so
    // two racing writers to the same pair cannot produce a second row;
    // `created_at` survives the conflict path untouched.
    let raw: RawClaim = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO claims (subject_identifier, claim_identifier,
                               claim_value, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)
           ON CONFLICT (subject_identifier, claim_identifier)
           DO UPDATE SET claim_value = excluded.claim_value,
                         updated_at  = excluded.updated_at
           RETURNING subject_identifier, claim_identifier, claim_value,
                     created_at, updated_at",
          rusqlite::params![subject, claim_id, value_str, now_str],
          RawClaim::from_row,
        )?)
      })
      .await?;

    raw.into_claim()
  }

  async fn delete_all_claims(&self, subject_identifier: &str) -> Result<u64> {
    let subject = subject_identifier.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM claims WHERE subject_identifier = ?1",
          rusqlite::params![subject],
        )?)
      })
      .await?;

    Ok(deleted as u64)
  }

  async fn list_claims(
    &self,
    subject_identifier: &str,
    selection: ClaimSelection,
  ) -> Result<Vec<Claim>> {
    let ids = match selection {
      ClaimSelection::All => None,
      ClaimSelection::Only(ids) => {
        if ids.is_empty() {
          return Ok(Vec::new());
        }
        Some(ids.into_iter().map(encode_uuid).collect::<Vec<_>>())
      }
    };

    let mut params = vec![subject_identifier.to_owned()];
    let sql = match ids {
      None => "SELECT subject_identifier, claim_identifier, claim_value,
                      created_at, updated_at
               FROM claims
               WHERE subject_identifier = ?1
               ORDER BY claim_identifier"
        .to_owned(),
      Some(ids) => {
        let placeholders = (0..ids.len())
          .map(|i| format!("?{}", i + 2))
          .collect::<Vec<_>>()
          .join(", ");
        params.extend(ids);
        format!(
          "SELECT subject_identifier, claim_identifier, claim_value,
                  created_at, updated_at
           FROM claims
           WHERE subject_identifier = ?1 AND claim_identifier IN ({placeholders})
           ORDER BY claim_identifier"
        )
      }
    };

    let raws: Vec<RawClaim> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawClaim::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClaim::into_claim).collect()
  }
}
