//! Core types and trait definitions for the Cloak claims store.
//!
//! Nothing in this crate talks HTTP or SQL. The concrete store, the
//! identity-service client and the API surface all live in sibling crates
//! and depend on this one, never the other way round.

pub mod claim;
pub mod identity;
pub mod permissions;
pub mod store;
pub mod validator;

pub use claim::{AnonymisedClaim, Claim};
pub use identity::Identity;
pub use permissions::{ClaimDefinition, ClaimRegistry, Decision, Operation};
pub use validator::{TokenValidator, ValidationError};
