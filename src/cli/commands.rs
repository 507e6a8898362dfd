use crate::demo::register_demo;
use crate::dispatcher::{Dispatcher, Registrar, UnhandledErrorPolicy};
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer};
use crate::session::InMemorySessionStore;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for the waypoint demo server.
#[derive(Debug, Parser)]
#[command(name = "waypoint")]
#[command(about = "Embedded HTTP router and dispatcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the demo routes
    Serve {
        /// Address and port to bind the server to
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        /// Directory served when no route matches a GET or HEAD
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Directory holding HTML templates
        #[arg(long)]
        template_dir: Option<PathBuf>,

        /// Coroutine worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Unhandled handler errors: `render` a 500 or `close` the connection
        #[arg(long)]
        error_policy: Option<UnhandledErrorPolicy>,
    },
    /// Print the registered routes and exit
    Routes,
}

/// Merge command-line flags over the environment configuration.
#[must_use]
pub fn apply_overrides(
    mut config: RuntimeConfig,
    static_dir: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    workers: Option<usize>,
    error_policy: Option<UnhandledErrorPolicy>,
) -> RuntimeConfig {
    if static_dir.is_some() {
        config.static_dir = static_dir;
    }
    if template_dir.is_some() {
        config.template_dir = template_dir;
    }
    if let Some(workers) = workers.filter(|n| *n > 0) {
        config.workers = workers;
    }
    if let Some(policy) = error_policy {
        config.error_policy = policy;
    }
    config
}

/// Registrar configured from `config` with the demo routes registered.
///
/// # Errors
///
/// Any route or advice registration failure.
pub fn demo_registrar(config: &RuntimeConfig) -> anyhow::Result<Registrar> {
    let mut registrar = Registrar::new();
    registrar
        .sessions(Some(Arc::new(InMemorySessionStore::new(config.session_ttl))))
        .error_policy(config.error_policy);
    if let Some(dir) = &config.static_dir {
        registrar.static_files(dir.clone());
    }
    if let Some(dir) = &config.template_dir {
        registrar.template_dir(dir.clone());
    }
    register_demo(&mut registrar).context("failed to register demo routes")?;
    Ok(registrar)
}

/// Build the demo dispatcher.
///
/// # Errors
///
/// See [`demo_registrar`].
pub fn build_dispatcher(config: &RuntimeConfig) -> anyhow::Result<Dispatcher> {
    Ok(demo_registrar(config)?.freeze())
}

/// Execute a parsed command.
///
/// # Errors
///
/// Registration failures, an unbindable address, or a server coroutine that
/// panicked.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            addr,
            static_dir,
            template_dir,
            workers,
            error_policy,
        } => {
            let config = apply_overrides(
                RuntimeConfig::from_env(),
                static_dir,
                template_dir,
                workers,
                error_policy,
            );
            config.apply();
            info!(
                stack_size = config.stack_size,
                workers = config.workers,
                error_policy = %config.error_policy,
                static_dir = ?config.static_dir,
                template_dir = ?config.template_dir,
                "Runtime configured"
            );

            let dispatcher = build_dispatcher(&config)?;
            let service = AppService::from(dispatcher);
            let handle = HttpServer(service)
                .start(addr.as_str())
                .with_context(|| format!("failed to bind {addr}"))?;
            println!("waypoint listening on {}", handle.addr());
            handle
                .join()
                .map_err(|_| anyhow!("server coroutine panicked"))?;
            Ok(())
        }
        Commands::Routes => {
            let registrar = demo_registrar(&RuntimeConfig::from_env())?;
            registrar.registry().dump_routes();
            Ok(())
        }
    }
}
