//! Command-line interface shared by the server binaries:
//! - Serve an application (default)
//! - Print a default config file
//! - Validate the effective configuration

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{self, AppState};
use crate::config::{generate_default_config, Config, Discovered, LogFormat};
use crate::dispatch::Dispatcher;
use crate::telemetry;
use crate::websocket::Hub;

#[derive(Debug, Parser)]
#[command(name = "wszero")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Minimal real-time messaging over WebSockets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Directory with index.html and js/wszero.js
    #[arg(long, global = true)]
    pub assets: Option<PathBuf>,

    /// Log format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the server
    Serve,

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load the configuration and print the effective settings
    CheckConfig,
}

impl Cli {
    /// Command to run; `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }

    /// Apply command-line overrides on top of file and environment settings
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(assets) = &self.assets {
            config.server.assets_dir = assets.to_string_lossy().to_string();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }

    /// Resolve the effective configuration
    pub fn load_config(&self) -> anyhow::Result<Discovered> {
        let mut found = Config::discover(self.config.as_deref())
            .context("Failed to load configuration")?;
        self.apply(&mut found.config);
        Ok(found)
    }
}

/// Parse the command line and run the application defined by `dispatcher`
pub async fn run(dispatcher: Dispatcher) -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command() {
        Commands::Serve => {
            let found = cli.load_config()?;
            telemetry::init(&found.config.logging)?;
            // Loading ran before the subscriber existed
            found.log();
            serve(found.config, dispatcher).await
        }

        Commands::InitConfig { output } => {
            let content = generate_default_config();
            if let Some(path) = output {
                std::fs::write(&path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Config written to {}", path.display());
            } else {
                print!("{}", content);
            }
            Ok(())
        }

        Commands::CheckConfig => {
            let found = cli.load_config()?;
            for (path, error) in &found.skipped {
                eprintln!("warning: skipped {}: {}", path.display(), error);
            }
            for line in describe(&found) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

/// Human-readable summary of the effective configuration
fn describe(found: &Discovered) -> Vec<String> {
    let config = &found.config;
    let source = match &found.source {
        Some(path) => path.display().to_string(),
        None => "(none, using defaults)".to_string(),
    };

    let mut lines = vec![format!("Config file:      {}", source)];
    for (path, _) in &found.skipped {
        lines.push(format!("Skipped (broken): {}", path.display()));
    }
    lines.extend([
        format!("Listen address:   {}", config.server.addr()),
        format!("Assets directory: {}", config.server.assets_dir),
        format!("Shutdown grace:   {}s", config.server.shutdown_grace_secs),
        format!("Max connections:  {}", config.hub.max_connections),
        format!("Log level:        {}", config.logging.level),
        format!("Log format:       {:?}", config.logging.format),
    ]);
    lines
}

async fn serve(config: Config, dispatcher: Dispatcher) -> anyhow::Result<()> {
    tracing::info!("Starting wszero v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(operations = ?dispatcher.ops(), "Handlers registered");

    if !std::path::Path::new(&config.server.assets_dir).is_dir() {
        tracing::warn!(
            "Assets directory {:?} not found, only /ws and /health will be served",
            config.server.assets_dir
        );
    }

    let hub = Arc::new(Hub::new(config.hub.clone(), dispatcher));
    api::serve(AppState::new(hub, config.server)).await?;
    Ok(())
}
