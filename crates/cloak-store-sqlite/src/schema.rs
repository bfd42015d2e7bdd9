//! SQL schema for the Cloak SQLite store.
//!
//! Applied in full at connection startup. `PRAGMA user_version` records the
//! schema revision; later migrations gate on it.

/// Schema DDL, safe to re-run against an existing database.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- At most one row per (subject, claim) pair, enforced by the primary key.
-- Writes against an existing pair replace the value in place.
CREATE TABLE IF NOT EXISTS claims (
    subject_identifier TEXT NOT NULL,   -- true (non-pairwise) identifier
    claim_identifier   TEXT NOT NULL,   -- hyphenated lowercase UUID
    claim_value        TEXT NOT NULL,   -- JSON document; 'null' is a valid value
    created_at         TEXT NOT NULL,   -- RFC 3339 UTC; set on first insert
    updated_at         TEXT NOT NULL,   -- RFC 3339 UTC; refreshed on every write
    PRIMARY KEY (subject_identifier, claim_identifier)
);

PRAGMA user_version = 1;
";
