//! Scope-to-permission resolution.
//!
//! Every registered claim carries a read scope and a write scope; holding the
//! write scope implies read access to the same claim. A single global scope
//! gates the delete-everything operation. Resolution is a pure, case-sensitive
//! lookup into an enumerated table: an unknown claim or an unmatched scope is
//! a deny, never an error.

use std::collections::HashMap;

use uuid::{Uuid, uuid};

// ─── Registered claims ───────────────────────────────────────────────────────

/// Scope granting [`Operation::DeleteAll`], independent of any per-claim
/// scopes.
pub const DELETE_SCOPE: &str = "delete:attributes";

pub const CLAIM_FULL_NAME: Uuid = uuid!("1f9f512e-b46c-4c5d-9d35-2f5f27a757fe");
pub const CLAIM_DATE_OF_BIRTH: Uuid =
  uuid!("46a92c38-7a4f-4c5a-8f2e-90d6c1a4b7aa");
pub const CLAIM_ADDRESS: Uuid = uuid!("c9063273-9ee2-4927-a136-28f4d373cdf9");
pub const CLAIM_EMAIL_ADDRESS: Uuid =
  uuid!("31b2a0ba-1958-4452-b58b-0a7b52640e72");
pub const CLAIM_PHONE_NUMBER: Uuid =
  uuid!("6de44951-1b29-4f7b-b8a0-2d9c64e37a90");

/// One row of the registry: a claim identifier, the key it is published
/// under in the user-info document, and the scopes that unlock it.
///
/// Scopes are plain strings with no implied structure; two definitions may
/// share a scope, in which case that scope unlocks both claims.
#[derive(Debug, Clone)]
pub struct ClaimDefinition {
  pub claim_identifier: Uuid,
  pub claim_name:       String,
  pub read_scope:       String,
  pub write_scope:      String,
}

// ─── Operations and decisions ────────────────────────────────────────────────

/// An action a caller wants to perform, before any token is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Read(Uuid),
  Write(Uuid),
  /// Remove every claim belonging to the resolved subject.
  DeleteAll,
  /// Aggregate every claim the caller may read.
  UserInfo,
}

/// The outcome of resolving an [`Operation`] against a set of held scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Deny,
  Allow,
  /// [`Operation::UserInfo`] only: the identifiers the caller may read,
  /// in ascending order. An empty set is still an allow.
  AllowClaims(Vec<Uuid>),
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// The enumerated table of registered claims.
///
/// Holds no request state; [`resolve`](ClaimRegistry::resolve) is a pure
/// decision over its inputs.
#[derive(Debug, Clone)]
pub struct ClaimRegistry {
  definitions:  HashMap<Uuid, ClaimDefinition>,
  delete_scope: String,
}

impl ClaimRegistry {
  pub fn new(
    definitions: impl IntoIterator<Item = ClaimDefinition>,
    delete_scope: impl Into<String>,
  ) -> Self {
    Self {
      definitions:  definitions
        .into_iter()
        .map(|def| (def.claim_identifier, def))
        .collect(),
      delete_scope: delete_scope.into(),
    }
  }

  /// The claims registered by default, with `read:<name>` / `write:<name>`
  /// scopes and [`DELETE_SCOPE`] for deletion.
  pub fn builtin() -> Self {
    let definitions = [
      (CLAIM_FULL_NAME, "full_name"),
      (CLAIM_DATE_OF_BIRTH, "date_of_birth"),
      (CLAIM_ADDRESS, "address"),
      (CLAIM_EMAIL_ADDRESS, "email_address"),
      (CLAIM_PHONE_NUMBER, "phone_number"),
    ]
    .into_iter()
    .map(|(claim_identifier, name)| ClaimDefinition {
      claim_identifier,
      claim_name: name.to_owned(),
      read_scope: format!("read:{name}"),
      write_scope: format!("write:{name}"),
    });
    Self::new(definitions, DELETE_SCOPE)
  }

  /// Look up the definition for a claim identifier.
  pub fn definition(&self, claim_identifier: Uuid) -> Option<&ClaimDefinition> {
    self.definitions.get(&claim_identifier)
  }

  /// Decide whether `scopes` permit `operation`.
  ///
  /// Deny by default: a claim identifier absent from the registry denies
  /// reads and writes of it even if the token carries broad scopes.
  pub fn resolve(&self, scopes: &[String], operation: Operation) -> Decision {
    match operation {
      Operation::Read(id) => match self.definitions.get(&id) {
        Some(def)
          if holds(scopes, &def.read_scope)
            || holds(scopes, &def.write_scope) =>
        {
          Decision::Allow
        }
        _ => Decision::Deny,
      },
      Operation::Write(id) => match self.definitions.get(&id) {
        Some(def) if holds(scopes, &def.write_scope) => Decision::Allow,
        _ => Decision::Deny,
      },
      Operation::DeleteAll => {
        if holds(scopes, &self.delete_scope) {
          Decision::Allow
        } else {
          Decision::Deny
        }
      }
      Operation::UserInfo => {
        let mut readable: Vec<Uuid> = self
          .definitions
          .values()
          .filter(|def| {
            holds(scopes, &def.read_scope) || holds(scopes, &def.write_scope)
          })
          .map(|def| def.claim_identifier)
          .collect();
        readable.sort_unstable();
        Decision::AllowClaims(readable)
      }
    }
  }
}

/// Exact, case-sensitive membership test.
fn holds(scopes: &[String], scope: &str) -> bool {
  scopes.iter().any(|held| held == scope)
}
