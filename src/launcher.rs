//! Command-line launcher.
//!
//! # Responsibilities
//! - Parse flags and subcommands (clap derive)
//! - Merge CLI flags over the bootstrap settings file
//! - Run the lifecycle until a signal, or run one extraction
//! - Map outcomes to exit codes
//!
//! # Exit Codes
//! ```text
//! 0  normal stop / successful extraction
//! 1  FAILED lifecycle / extraction error
//! 2  bad settings (file, flags, logging, endpoint)
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::assembly::ConfigAssembler;
use crate::config::{load_config, validate_config, BootstrapConfig};
use crate::descriptor::{AppRegistry, DescriptorResolver};
use crate::extract::{ConfigExtractor, ExtractionMode, ExtractionTarget};
use crate::lifecycle::{Container, Lifecycle, LifecycleState};
use crate::observability::init_logging;
use crate::remote::{open_store, RemoteStore};
use crate::sources::read_arguments;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILED: u8 = 1;
pub const EXIT_BAD_SETTINGS: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "app-bootstrap")]
#[command(about = "Resolve, configure and run an application, or extract its configuration", long_about = None)]
pub struct Cli {
    /// Bootstrap settings file (defaults to ./bootstrap.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Environment segment of the remote configuration path
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Registered entry type to use instead of scanning
    #[arg(long, global = true, value_name = "TYPE")]
    pub app: Option<String>,

    /// Remote store endpoint (file:///dir or memory:)
    #[arg(long, global = true, value_name = "URI")]
    pub remote: Option<String>,

    /// Local properties location, replacing the descriptor's
    #[arg(long, global = true, value_name = "LOCATION")]
    pub properties: Option<String>,

    /// Explicit override, repeatable
    #[arg(short = 'D', global = true, value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,

    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// pretty or json
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the application and run until SIGINT/SIGTERM
    Run {
        /// Application arguments (highest-precedence layer)
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Write the assembled configuration to a file or the remote store
    Extract {
        #[arg(long)]
        mode: ExtractionMode,

        /// Output file (file mode only)
        #[arg(long, value_name = "PATH")]
        output: Option<String>,

        /// Replace existing remote keys
        #[arg(long)]
        overwrite: bool,

        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

impl Cli {
    /// Apply flags on top of file settings.
    pub fn apply_to(&self, settings: &mut BootstrapConfig) {
        if let Some(env) = &self.env {
            settings.environment = env.clone();
        }
        if let Some(remote) = &self.remote {
            settings.remote.endpoint = Some(remote.clone());
        }
        if let Some(properties) = &self.properties {
            settings.local.properties = Some(properties.clone());
        }
        for (key, value) in &self.overrides {
            settings.set_override(key.clone(), value.clone());
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            settings.logging.format = format.clone();
        }
    }
}

/// Runs one CLI invocation against an application registry.
pub struct Launcher {
    registry: AppRegistry,
    container: Option<Box<dyn Container>>,
}

impl Launcher {
    pub fn new(registry: AppRegistry) -> Self {
        Self {
            registry,
            container: None,
        }
    }

    pub fn container<C: Container + 'static>(mut self, container: C) -> Self {
        self.container = Some(Box::new(container));
        self
    }

    /// Execute and return the process exit code.
    pub async fn execute(self, cli: Cli) -> u8 {
        let mut settings = match load_config(cli.config.as_deref()) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("app-bootstrap: {}", e);
                return EXIT_BAD_SETTINGS;
            }
        };
        cli.apply_to(&mut settings);

        if let Err(errors) = validate_config(&settings) {
            for error in errors {
                eprintln!("app-bootstrap: invalid setting {}", error);
            }
            return EXIT_BAD_SETTINGS;
        }

        if let Err(e) = init_logging(&settings.logging.level, &settings.logging.format) {
            eprintln!("app-bootstrap: {}", e);
            return EXIT_BAD_SETTINGS;
        }

        let store = match settings.remote.endpoint.as_deref().map(open_store).transpose() {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, "Cannot open remote store");
                return EXIT_BAD_SETTINGS;
            }
        };

        tracing::info!(
            environment = %settings.environment,
            remote = settings.remote.endpoint.as_deref().unwrap_or("none"),
            "app-bootstrap starting"
        );

        match cli.command {
            Command::Run { args } => self.run(settings, cli.app, args, store).await,
            Command::Extract {
                mode,
                output,
                overwrite,
                args,
            } => {
                let target = match mode {
                    ExtractionMode::File => ExtractionTarget {
                        mode,
                        path: output,
                        overwrite: true,
                    },
                    ExtractionMode::Remote => {
                        if let Some(output) = output {
                            tracing::warn!(output = %output, "Ignoring --output in remote mode");
                        }
                        ExtractionTarget::remote(overwrite)
                    }
                };
                extract(&self.registry, &settings, cli.app.as_deref(), args, store, target).await
            }
        }
    }

    async fn run(
        self,
        settings: BootstrapConfig,
        app: Option<String>,
        args: Vec<String>,
        store: Option<Arc<dyn RemoteStore>>,
    ) -> u8 {
        let mut builder = Lifecycle::builder(self.registry)
            .settings(settings)
            .args(args)
            .boxed_container(self.container);
        if let Some(app) = app {
            builder = builder.explicit_type(app);
        }
        if let Some(store) = store {
            builder = builder.remote_store(store);
        }
        let lifecycle = builder.build();

        if let Err(e) = lifecycle.start().await {
            tracing::error!(error = %e, "Application failed to start");
            return EXIT_FAILED;
        }

        match lifecycle.run_until_signal().await {
            LifecycleState::Stopped => EXIT_OK,
            state => {
                tracing::error!(state = %state, "Application did not stop cleanly");
                EXIT_FAILED
            }
        }
    }
}

async fn extract(
    registry: &AppRegistry,
    settings: &BootstrapConfig,
    app: Option<&str>,
    args: Vec<String>,
    store: Option<Arc<dyn RemoteStore>>,
    mut target: ExtractionTarget,
) -> u8 {
    let descriptor = match DescriptorResolver::new(registry).resolve(app) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            tracing::error!(error = %e, "Descriptor resolution failed");
            return EXIT_FAILED;
        }
    };

    let assembled = match ConfigAssembler::new(settings, read_arguments(args))
        .with_store(store.clone())
        .assemble(&descriptor)
        .await
    {
        Ok(assembled) => assembled,
        Err(e) => {
            tracing::error!(error = %e, "Configuration assembly failed");
            return EXIT_FAILED;
        }
    };
    let config = assembled.shutdown().await;

    if target.mode == ExtractionMode::File && target.path.is_none() {
        target.path = Some(format!("{}.properties", descriptor.name));
    }

    let outcome = ConfigExtractor::new(settings, store)
        .extract(&descriptor, &config, &target)
        .await;
    match outcome {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!(error = %e, "Failed to render extraction report"),
            }
            if report.is_success() {
                EXIT_OK
            } else {
                EXIT_FAILED
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Extraction failed");
            EXIT_FAILED
        }
    }
}
