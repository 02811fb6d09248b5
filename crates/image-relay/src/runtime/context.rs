use std::sync::Arc;

/// Context handed to nodes by [`super::run_node`].
pub struct NodeContext {
    /// Shared Zenoh session
    pub session: Arc<zenoh::Session>,
    /// Deployment scope (from BUBBALOOP_SCOPE env, default: "local")
    pub scope: String,
    /// Machine identifier (from BUBBALOOP_MACHINE_ID env, default: hostname)
    pub machine_id: String,
    /// Shutdown signal receiver
    pub shutdown_rx: tokio::sync::watch::Receiver<()>,
}

impl NodeContext {
    /// Build a fully-qualified scoped topic: `bubbaloop/{scope}/{machine_id}/{suffix}`
    pub fn topic(&self, suffix: &str) -> String {
        scoped_topic(&self.scope, &self.machine_id, suffix)
    }
}

pub fn scoped_topic(scope: &str, machine_id: &str, suffix: &str) -> String {
    format!("bubbaloop/{}/{}/{}", scope, machine_id, suffix)
}

pub fn resolve_scope() -> String {
    std::env::var("BUBBALOOP_SCOPE").unwrap_or_else(|_| "local".to_string())
}

/// Machine id from BUBBALOOP_MACHINE_ID or the hostname, with `-` replaced
/// by `_` so it stays a single key segment on every transport.
pub fn resolve_machine_id() -> String {
    std::env::var("BUBBALOOP_MACHINE_ID")
        .unwrap_or_else(|_| {
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        })
        .replace('-', "_")
}
