//! Zenoh binding for [`SnapshotRelay`].
//!
//! Every subscription forwards raw payloads into one channel. A single loop
//! drains it, so image updates and save / publish / clear commands are
//! applied to the relay strictly one at a time.

use prost::Message;
use tokio::sync::mpsc;
use zenoh::pubsub::Publisher;

use crate::config::RelayConfig;
use crate::error::NodeError;
use crate::relay::{PublishBatch, RelayError, SlotId, SnapshotRelay};
use crate::runtime::{Node, NodeContext};
use crate::schemas::{CameraInfo, RawImage, SaveCommand};

/// Capacity of the merged subscriber channel.
const INBOUND_CHANNEL_CAPACITY: usize = 1000;

/// Which subscription a payload arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    Image,
    CameraInfo,
    Save,
    Publish,
    Clear,
}

/// Decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Image(RawImage),
    CameraInfo(CameraInfo),
    /// Requested slot, as sent on the wire
    Save(i32),
    Publish,
    Clear,
}

impl Inbound {
    /// Decode a payload received on the `kind` subscription.
    ///
    /// Publish and clear ignore their payload.
    pub fn decode(kind: InboundKind, payload: &[u8]) -> Result<Self, prost::DecodeError> {
        Ok(match kind {
            InboundKind::Image => Inbound::Image(RawImage::decode(payload)?),
            InboundKind::CameraInfo => Inbound::CameraInfo(CameraInfo::decode(payload)?),
            InboundKind::Save => Inbound::Save(SaveCommand::decode(payload)?.slot),
            InboundKind::Publish => Inbound::Publish,
            InboundKind::Clear => Inbound::Clear,
        })
    }
}

/// Applies inbound events to the relay and logs the outcome.
pub struct RelayDispatcher {
    relay: SnapshotRelay,
    output_prefix: String,
}

impl RelayDispatcher {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            relay: SnapshotRelay::new(config.num_slots),
            output_prefix: config.output_prefix.clone(),
        }
    }

    pub fn relay(&self) -> &SnapshotRelay {
        &self.relay
    }

    /// Apply one event. Returns the batch to send when the event was a
    /// successful publish.
    pub fn handle(&mut self, inbound: Inbound) -> Option<PublishBatch> {
        match inbound {
            Inbound::Image(image) => {
                log::debug!(
                    "Image received ({}x{} {})",
                    image.width,
                    image.height,
                    image.encoding
                );
                self.relay.on_image(image);
                None
            }
            Inbound::CameraInfo(info) => {
                log::debug!("Camera info received ({}x{})", info.width, info.height);
                self.relay.on_camera_info(info);
                None
            }
            Inbound::Save(raw) => {
                self.save(raw);
                None
            }
            Inbound::Publish => match self.relay.publish_all() {
                Ok(batch) => Some(batch),
                Err(e) => {
                    report(&e);
                    None
                }
            },
            Inbound::Clear => {
                let dropped = self.relay.clear();
                log::info!("Buffer was cleared ({} slots dropped)", dropped);
                None
            }
        }
    }

    fn save(&mut self, raw: i32) {
        let num_slots = self.relay.num_slots();
        let result = SlotId::try_from(raw)
            .map_err(|_| RelayError::SlotOutOfRange {
                slot: raw,
                num_slots,
            })
            .and_then(|slot| self.relay.save(slot).map(|snapshot| (slot, snapshot.is_partial())));

        match result {
            Ok((slot, partial)) => {
                if partial {
                    log::warn!(
                        "Slot {} saved with only one of image / camera info present",
                        slot
                    );
                }
                log::info!(
                    "Current images saved for camera with topic `{}_{}`",
                    self.output_prefix,
                    slot
                );
            }
            Err(e) => report(&e),
        }
    }
}

fn report(e: &RelayError) {
    log::log!(e.level(), "{}", e);
}

/// Output publishers for one slot.
struct SlotPublishers {
    image: Publisher<'static>,
    camera_info: Publisher<'static>,
}

/// Relay node: subscribes to the camera and command topics and republishes
/// saved slots on `{prefix}_{i}/image_color` and `{prefix}_{i}/camera_info`.
pub struct ImageRelayNode {
    config: RelayConfig,
    dispatcher: RelayDispatcher,
    publishers: Vec<SlotPublishers>,
}

impl ImageRelayNode {
    /// Send every frame of `batch` on its slot's publishers. Returns the
    /// number of slots sent.
    async fn publish_batch(&self, batch: PublishBatch) -> usize {
        let mut published = 0;
        for frames in batch.frames {
            let Some(publishers) = self.publishers.get(frames.slot as usize) else {
                log::warn!("No publishers for slot {}, skipping", frames.slot);
                continue;
            };

            if let Some(image) = frames.image {
                if let Err(e) = publishers.image.put(image.encode_to_vec()).await {
                    log::warn!("[slot {}] Failed to publish image: {}", frames.slot, e);
                }
            }
            if let Some(info) = frames.camera_info {
                if let Err(e) = publishers.camera_info.put(info.encode_to_vec()).await {
                    log::warn!("[slot {}] Failed to publish camera info: {}", frames.slot, e);
                }
            }
            published += 1;
        }
        published
    }
}

#[async_trait::async_trait]
impl Node for ImageRelayNode {
    type Config = RelayConfig;

    fn name() -> &'static str {
        "image-relay"
    }

    async fn init(ctx: &NodeContext, config: &RelayConfig) -> anyhow::Result<Self> {
        config.validate().map_err(NodeError::from)?;

        let mut publishers = Vec::with_capacity(config.num_slots);
        for slot in config.slot_ids() {
            let image_topic = ctx.topic(&config.image_output_topic(slot));
            let info_topic = ctx.topic(&config.camera_info_output_topic(slot));
            let image = declare_publisher(&ctx.session, image_topic).await?;
            let camera_info = declare_publisher(&ctx.session, info_topic).await?;
            publishers.push(SlotPublishers { image, camera_info });
        }
        log::info!(
            "Declared {} output slots under '{}'",
            publishers.len(),
            ctx.topic(&format!("{}_*", config.output_prefix))
        );

        Ok(Self {
            config: config.clone(),
            dispatcher: RelayDispatcher::new(config),
            publishers,
        })
    }

    async fn run(mut self, ctx: NodeContext) -> anyhow::Result<()> {
        let mut shutdown_rx = ctx.shutdown_rx.clone();

        let (tx, mut rx) = mpsc::channel::<(InboundKind, Vec<u8>)>(INBOUND_CHANNEL_CAPACITY);
        let subscriptions = [
            (InboundKind::Image, &self.config.image_topic),
            (InboundKind::CameraInfo, &self.config.camera_info_topic),
            (InboundKind::Save, &self.config.save_topic),
            (InboundKind::Publish, &self.config.publish_topic),
            (InboundKind::Clear, &self.config.clear_topic),
        ];
        let mut tasks = Vec::with_capacity(subscriptions.len());
        for (kind, suffix) in subscriptions {
            tasks.push(spawn_forwarder(&ctx.session, ctx.topic(suffix), kind, tx.clone()).await?);
        }
        drop(tx);

        log::info!("Node initialized.");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    log::info!("Shutdown signal received, stopping relay");
                    break;
                }
                event = rx.recv() => {
                    let Some((kind, payload)) = event else {
                        log::warn!("All subscriber channels closed");
                        break;
                    };
                    match Inbound::decode(kind, &payload) {
                        Ok(inbound) => {
                            if let Some(batch) = self.dispatcher.handle(inbound) {
                                let published = self.publish_batch(batch).await;
                                log::info!("{} images were published!", published);
                            }
                        }
                        Err(e) => log::warn!("Dropping undecodable {:?} message: {}", kind, e),
                    }
                }
            }
        }

        for handle in tasks {
            handle.abort();
        }
        Ok(())
    }
}

async fn declare_publisher(
    session: &zenoh::Session,
    topic: String,
) -> Result<Publisher<'static>, NodeError> {
    session
        .declare_publisher(topic.clone())
        .await
        .map_err(|e| NodeError::Zenoh(format!("Publisher failed for '{topic}': {e}")))
}

/// Subscribe to `topic` and forward every payload, tagged with `kind`.
async fn spawn_forwarder(
    session: &zenoh::Session,
    topic: String,
    kind: InboundKind,
    tx: mpsc::Sender<(InboundKind, Vec<u8>)>,
) -> Result<tokio::task::JoinHandle<()>, NodeError> {
    let sub = session
        .declare_subscriber(topic.clone())
        .await
        .map_err(|e| NodeError::Zenoh(format!("Subscribe failed for '{topic}': {e}")))?;
    log::info!("Subscribed to: {topic}");

    Ok(tokio::spawn(async move {
        while let Ok(sample) = sub.recv_async().await {
            let payload = sample.payload().to_bytes().to_vec();
            if tx.send((kind, payload)).await.is_err() {
                break;
            }
        }
    }))
}
