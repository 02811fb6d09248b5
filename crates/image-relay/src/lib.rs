//! Image relay node.
//!
//! Latches the most recent camera image and calibration from one upstream
//! camera, snapshots them into numbered slots on command, and republishes
//! every saved slot on its own `cam_{i}` topics with a shared timestamp.
//!
//! # Dataflow
//!
//! ```text
//! camera/color/image_raw ───┐
//! camera/color/camera_info ─┤                         ┌─► cam_0/image_color, cam_0/camera_info
//! save_image ───────────────┼─► mpsc ─► SnapshotRelay ┼─► cam_1/...
//! publish_latched ──────────┤                         └─► cam_{n-1}/...
//! clear_buffer ─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`relay`] — the snapshot buffer with save / publish / clear semantics.
//! - [`schemas`] — protobuf messages exchanged on the topics.
//! - [`config`] — YAML configuration: slot count and topic names.
//! - [`node`] — Zenoh binding: subscribers, per-slot publishers, dispatch loop.
//! - [`runtime`] — node scaffolding: logging, CLI, session, heartbeat, shutdown.

pub mod config;
pub mod error;
pub mod node;
pub mod relay;
pub mod runtime;
pub mod schemas;

pub use config::{ConfigError, RelayConfig};
pub use error::NodeError;
pub use node::{Inbound, InboundKind, ImageRelayNode, RelayDispatcher};
pub use relay::{PublishBatch, RelayError, SlotFrames, SlotId, Snapshot, SnapshotRelay};
pub use runtime::{run_node, Node, NodeConfig, NodeContext};

/// Current wall-clock time in nanoseconds since Unix epoch.
pub(crate) fn now_nanos() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
