//! Backends for Coachlink's authentication provider, profile store and
//! player data store.
//!
//! - [`memory`]: in-process implementations for tests and local development
//! - [`rest`]: clients for the hosted auth service and table API
//! - [`accounts`]: sign-up, sign-in, and sign-out flows built on the auth and
//!   profile collaborators
//! - [`players`]: the player dashboard and upload records

pub mod accounts;
pub mod memory;
pub mod players;
pub mod rest;

pub use accounts::{AccountOutcome, AccountService, SignInRequest, SignUpRequest};
pub use memory::{MemoryAuthProvider, MemoryPlayerStore, MemoryProfileStore};
pub use players::{PlayerService, UploadRequest};
pub use rest::{RestAuthProvider, RestConfig, RestPlayerStore, RestProfileStore};
