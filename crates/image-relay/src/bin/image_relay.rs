//! Image relay node binary

use image_relay::{run_node, ImageRelayNode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_node::<ImageRelayNode>().await
}
