//! Server, configuration, and command-line interface for Coachlink.
//!
//! # Key Abstractions
//!
//! - [`CoachlinkConfig`]: file + environment configuration, loaded with `confyg`
//! - [`server::router`]: page routes and the account API behind the gate
//! - [`CoachlinkCli`]: command dispatch for the `coachlink` binary

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod server;

pub use app::CoachlinkCli;
pub use cli::{CliArgs, Command, ConfigAction, ConfigCommand};
pub use config::{BackendConfig, BackendKind, CoachlinkConfig, GateConfig, ServerConfig};
