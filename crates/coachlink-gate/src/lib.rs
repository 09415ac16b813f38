//! Access gate for Coachlink routes.
//!
//! Runs once per request, before any page handler, and decides whether the
//! request goes through, is sent to the login page, or is sent to the
//! caller's role home page.
//!
//! # Key Abstractions
//!
//! - [`decide`]: the pure decision procedure over path class, session
//!   presence, and role
//! - [`Gate`]: resolves the session and role for a request (one lookup each,
//!   bounded by a timeout) and applies [`decide`]
//! - [`gate_middleware`]: axum middleware wrapping a router with a [`Gate`]
//! - [`AuthContext`]: what the gate resolved, handed to handlers through
//!   request extensions
//!
//! # Usage
//!
//! ```ignore
//! use coachlink_gate::{Gate, protect};
//!
//! let gate = Gate::from_state(&state);
//! let app = protect(router, gate);
//! ```

pub mod context;
pub mod credentials;
pub mod decision;
pub mod gate;
pub mod middleware;

pub use context::AuthContext;
pub use credentials::extract_credentials;
pub use decision::{Decision, RedirectReason, decide};
pub use gate::{DEFAULT_LOOKUP_TIMEOUT, DEFAULT_SESSION_COOKIE, Evaluation, Gate};
pub use middleware::{gate_middleware, protect};
