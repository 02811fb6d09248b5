use tokio::sync::watch;

/// Install the process signal handler and return the shutdown sender.
///
/// SIGINT and SIGTERM (systemd stop) both fire it; `ctrlc` needs its
/// `termination` feature for the latter. Nodes watch it through
/// `NodeContext::shutdown_rx`.
pub fn setup_shutdown(node_name: &'static str) -> anyhow::Result<watch::Sender<()>> {
    let tx = watch::Sender::new(());
    let handler_tx = tx.clone();
    ctrlc::set_handler(move || {
        log::info!("{}: shutdown signal received", node_name);
        request_shutdown(&handler_tx);
    })
    .map_err(|e| anyhow::anyhow!("Failed to install signal handler: {}", e))?;
    Ok(tx)
}

/// Notify every receiver subscribed to `tx`.
pub fn request_shutdown(tx: &watch::Sender<()>) {
    if tx.send(()).is_err() {
        log::debug!("Shutdown requested before any task subscribed");
    }
}
