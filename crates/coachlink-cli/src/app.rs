//! Command dispatch for the `coachlink` binary.

use std::sync::Arc;

use coachlink_backend::{MemoryAuthProvider, MemoryProfileStore};
use coachlink_core::{ConfigProvider, Credentials, Identity, Result, Role};
use coachlink_gate::Gate;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::CoachlinkConfig;
use crate::{config_handlers, server};

const DRY_RUN_TOKEN: &str = "dry-run";

/// The Coachlink command-line application.
pub struct CoachlinkCli {
    name: String,
    config: CoachlinkConfig,
    version: String,
}

impl CoachlinkCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(name: impl Into<String>, args: &CliArgs) -> Result<Self> {
        let config = CoachlinkConfig::load(args.config.as_deref())?;
        Ok(Self::new(name, config))
    }

    /// Create with an already-loaded config.
    pub fn new(name: impl Into<String>, config: CoachlinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &CoachlinkConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // A subscriber may already be installed (e.g. in tests).
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);

        match args.command {
            Some(Command::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            Some(Command::Health) => {
                println!("{}", self.health_report()?);
                Ok(())
            }
            Some(Command::Serve { port }) => server::serve(self.config.clone(), port).await,
            Some(Command::Gate {
                path,
                role,
                anonymous,
            }) => {
                let role = (!anonymous)
                    .then(|| role.as_deref().map(Role::from_stored).unwrap_or_default());
                let report = self.dry_run(&path, role).await?;
                println!("{report}");
                Ok(())
            }
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!("{} {}: use --help for usage", self.name, self.version);
                Ok(())
            }
        }
    }

    fn health_report(&self) -> Result<String> {
        self.config.routes.validate()?;
        Ok(format!(
            "{}: healthy (backend: {:?}, lookup timeout: {} ms)",
            self.name, self.config.backend.kind, self.config.gate.lookup_timeout_ms
        ))
    }

    /// Evaluate `path` for a caller with the given role, or with no session
    /// when `role` is `None`.
    async fn dry_run(&self, path: &str, role: Option<Role>) -> Result<String> {
        let routes = self.config.routes();
        if routes.is_bypassed(path) {
            return Ok(serde_json::to_string_pretty(&json!({
                "path": path,
                "bypassed": true,
            }))?);
        }

        let identity = Identity::new("dry-run-user");
        let auth = MemoryAuthProvider::with_sessions([(DRY_RUN_TOKEN, identity.clone())]);
        let profiles = match role {
            Some(role) if role.is_known() => MemoryProfileStore::from_roles([(identity, role)]),
            _ => MemoryProfileStore::new(),
        };
        let credentials = match role {
            Some(_) => Credentials::bearer(DRY_RUN_TOKEN),
            None => Credentials::none(),
        };

        let gate = Gate::new(routes.clone(), Arc::new(auth), Arc::new(profiles))
            .with_lookup_timeout(self.config.lookup_timeout());
        let evaluation = gate.evaluate(path, &credentials).await;

        Ok(serde_json::to_string_pretty(&json!({
            "path": path,
            "class": evaluation.class,
            "role": evaluation.context.role,
            "decision": evaluation.decision,
        }))?)
    }
}
