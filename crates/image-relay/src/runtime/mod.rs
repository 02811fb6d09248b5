//! Node runtime: everything a relay node needs besides its own logic.
//!
//! Handles logging init, CLI args, config load, scope/machine resolution,
//! shutdown signal, Zenoh session and health heartbeat. Nodes implement
//! [`Node`] and call [`run_node`] from `main()`.

mod context;
mod health;
mod shutdown;
mod zenoh_session;

pub use context::{resolve_machine_id, resolve_scope, scoped_topic, NodeContext};
pub use health::{health_topic, spawn_health_heartbeat};
pub use shutdown::{request_shutdown, setup_shutdown};
pub use zenoh_session::{open_zenoh_session, resolve_endpoint};

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Configuration a [`Node`] loads at startup.
pub trait NodeConfig: Default + Send + Sync + Sized + 'static {
    /// Read, parse and validate a config file.
    fn from_file(path: &Path) -> Result<Self, ConfigError>;

    fn validate(&self) -> Result<(), ConfigError>;
}

/// Load `path` if given, otherwise fall back to validated defaults.
pub fn load_node_config<C: NodeConfig>(path: Option<&Path>) -> Result<C, ConfigError> {
    match path {
        Some(path) => C::from_file(path),
        None => {
            let config = C::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Behavior of a node hosted by [`run_node`].
#[async_trait::async_trait]
pub trait Node: Send + Sync + 'static {
    type Config: NodeConfig;

    /// Node name used in health topics and logs.
    fn name() -> &'static str;

    /// Called once after the Zenoh session is open and config is loaded.
    async fn init(ctx: &NodeContext, config: &Self::Config) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Main loop. Must return `Ok(())` once `ctx.shutdown_rx` fires.
    async fn run(self, ctx: NodeContext) -> anyhow::Result<()>;
}

/// Built-in CLI arguments handled by the runtime.
#[derive(argh::FromArgs)]
#[argh(description = "Image relay node")]
struct RuntimeArgs {
    /// path to configuration file (defaults apply when omitted)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// zenoh endpoint to connect to
    #[argh(option, short = 'e')]
    endpoint: Option<String>,
}

/// Run a node until SIGINT / SIGTERM.
pub async fn run_node<N: Node>() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: RuntimeArgs = argh::from_env();

    let node_config: N::Config = load_node_config(args.config.as_deref())?;
    match &args.config {
        Some(path) => log::info!("{}: config loaded from {}", N::name(), path.display()),
        None => log::info!("{}: no config file given, using defaults", N::name()),
    }

    let scope = resolve_scope();
    let machine_id = resolve_machine_id();
    log::info!("Scope: {}, Machine ID: {}", scope, machine_id);

    let shutdown_tx = setup_shutdown(N::name())?;

    let session = open_zenoh_session(args.endpoint.as_deref()).await?;

    let ctx = NodeContext {
        session,
        scope,
        machine_id,
        shutdown_rx: shutdown_tx.subscribe(),
    };

    let _health_handle = spawn_health_heartbeat(&ctx, N::name()).await?;

    let node = N::init(&ctx, &node_config).await?;
    log::info!("{} node initialized", N::name());

    node.run(ctx).await?;

    log::info!("{} node shut down", N::name());
    Ok(())
}
