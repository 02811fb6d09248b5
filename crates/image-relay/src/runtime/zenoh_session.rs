use std::sync::Arc;

const DEFAULT_ENDPOINT: &str = "tcp/127.0.0.1:7447";

/// Resolve the router endpoint.
///
/// Order: `ZENOH_ENDPOINT`, `BUBBALOOP_ZENOH_ENDPOINT`, the `cli` argument,
/// then `tcp/127.0.0.1:7447`.
pub fn resolve_endpoint(cli: Option<&str>) -> String {
    pick_endpoint(
        std::env::var("ZENOH_ENDPOINT").ok(),
        std::env::var("BUBBALOOP_ZENOH_ENDPOINT").ok(),
        cli,
    )
}

fn pick_endpoint(env: Option<String>, bubbaloop_env: Option<String>, cli: Option<&str>) -> String {
    env.or(bubbaloop_env)
        .or_else(|| cli.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

/// Open a Zenoh session in client mode.
pub async fn open_zenoh_session(endpoint: Option<&str>) -> anyhow::Result<Arc<zenoh::Session>> {
    let endpoint = resolve_endpoint(endpoint);

    log::info!("Connecting to Zenoh at: {}", endpoint);

    let mut config = zenoh::Config::default();
    // Client mode routes through zenohd
    config
        .insert_json5("mode", r#""client""#)
        .map_err(|e| anyhow::anyhow!("Failed to set Zenoh mode: {}", e))?;
    config
        .insert_json5("connect/endpoints", &format!(r#"["{}"]"#, endpoint))
        .map_err(|e| anyhow::anyhow!("Failed to set Zenoh endpoint: {}", e))?;
    config
        .insert_json5("scouting/multicast/enabled", "false")
        .map_err(|e| anyhow::anyhow!("Failed to disable multicast: {}", e))?;
    config
        .insert_json5("scouting/gossip/enabled", "false")
        .map_err(|e| anyhow::anyhow!("Failed to disable gossip: {}", e))?;

    let session = zenoh::open(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open Zenoh session: {}", e))?;

    log::info!("Connected to Zenoh");
    Ok(Arc::new(session))
}
