use argh::FromArgs;
use prost::Message;
use std::path::PathBuf;

use image_relay::runtime::{
    load_node_config, open_zenoh_session, resolve_machine_id, resolve_scope, scoped_topic,
};
use image_relay::schemas::SaveCommand;
use image_relay::RelayConfig;

/// Send save / publish / clear commands to a running image relay.
#[derive(FromArgs)]
struct Args {
    /// relay configuration file, for non-default command topics
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// zenoh endpoint to connect to
    #[argh(option, short = 'e')]
    endpoint: Option<String>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Save(SaveArgs),
    Publish(PublishArgs),
    Clear(ClearArgs),
}

/// Snapshot the latest image and camera info into a slot.
#[derive(FromArgs)]
#[argh(subcommand, name = "save")]
struct SaveArgs {
    /// slot to save into
    #[argh(positional)]
    slot: i8,
}

/// Republish every saved slot.
#[derive(FromArgs)]
#[argh(subcommand, name = "publish")]
struct PublishArgs {}

/// Drop every saved slot.
#[derive(FromArgs)]
#[argh(subcommand, name = "clear")]
struct ClearArgs {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let config: RelayConfig = load_node_config(args.config.as_deref())?;

    let (suffix, payload) = match args.command {
        Command::Save(save) => (
            config.save_topic.as_str(),
            SaveCommand {
                slot: i32::from(save.slot),
            }
            .encode_to_vec(),
        ),
        Command::Publish(_) => (config.publish_topic.as_str(), Vec::new()),
        Command::Clear(_) => (config.clear_topic.as_str(), Vec::new()),
    };
    let topic = scoped_topic(&resolve_scope(), &resolve_machine_id(), suffix);

    let session = open_zenoh_session(args.endpoint.as_deref()).await?;
    session
        .put(topic.clone(), payload)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send command to '{}': {}", topic, e))?;
    log::info!("Sent command to {}", topic);

    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Zenoh close failed: {e}"))?;
    Ok(())
}
