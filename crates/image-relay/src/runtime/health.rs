use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::NodeContext;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// `bubbaloop/{scope}/{machine_id}/health/{node_name}`
pub fn health_topic(ctx: &NodeContext, node_name: &str) -> String {
    ctx.topic(&format!("health/{}", node_name))
}

/// Publish `"ok"` on the node's health topic every 5 seconds until
/// `ctx.shutdown_rx` fires.
///
/// A failing put is logged once when it starts failing and once when it
/// recovers, not on every tick.
pub async fn spawn_health_heartbeat(
    ctx: &NodeContext,
    node_name: &str,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let topic = health_topic(ctx, node_name);
    let publisher = ctx
        .session
        .declare_publisher(topic.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create health publisher '{}': {}", topic, e))?;
    log::info!("Health heartbeat: {}", topic);

    let mut shutdown_rx = ctx.shutdown_rx.clone();
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failing = false;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    log::debug!("Health heartbeat stopping");
                    break;
                }
                _ = interval.tick() => match publisher.put("ok").await {
                    Ok(()) if failing => {
                        log::info!("Health heartbeat recovered");
                        failing = false;
                    }
                    Ok(()) => {}
                    Err(e) if !failing => {
                        log::warn!("Health heartbeat failed: {}", e);
                        failing = true;
                    }
                    Err(_) => {}
                },
            }
        }
    });

    Ok(handle)
}
