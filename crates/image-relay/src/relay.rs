//! Snapshot buffer: latest frame plus per-slot saved copies.
//!
//! ```text
//! on_image / on_camera_info ──► latest ──save(k)──► slots[k] ──publish_all──► PublishBatch
//!                                                      ▲
//!                                                  clear() empties
//! ```
//!
//! The relay is a plain owned value. Callers are expected to drive it from a
//! single task; nothing here blocks or awaits.

use std::collections::BTreeMap;

use crate::schemas::{CameraInfo, RawImage, Stamped};

/// Slot identifier. One slot maps to one `cam_{id}` output pair.
pub type SlotId = i8;

/// Largest slot count addressable by a [`SlotId`].
pub const MAX_SLOTS: usize = SlotId::MAX as usize + 1;

/// Advisory conditions reported by relay operations.
///
/// None of these are fatal; the operation that returned one left the buffer
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("No image or camera info received, failed to save")]
    NoDataAvailable,

    #[error("Buffer was empty, nothing published")]
    EmptyBuffer,

    #[error("Slot {slot} is out of range, relay has {num_slots} output slots")]
    SlotOutOfRange { slot: i32, num_slots: usize },
}

impl RelayError {
    /// Log level this condition is reported at.
    pub fn level(&self) -> log::Level {
        match self {
            RelayError::EmptyBuffer => log::Level::Warn,
            RelayError::NoDataAvailable | RelayError::SlotOutOfRange { .. } => log::Level::Error,
        }
    }
}

/// Image and calibration copied out of the latest frame at save time.
///
/// Either half may be absent when only one stream had delivered anything
/// when the slot was saved. Such partial snapshots are kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub image: Option<RawImage>,
    pub camera_info: Option<CameraInfo>,
}

impl Snapshot {
    /// True when exactly one of image / camera info is present.
    pub fn is_partial(&self) -> bool {
        self.image.is_some() != self.camera_info.is_some()
    }
}

/// Stamped output for a single slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotFrames {
    pub slot: SlotId,
    pub image: Option<RawImage>,
    pub camera_info: Option<CameraInfo>,
}

/// Everything one `publish_all` call emits, stamped with a single timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishBatch {
    /// Shared timestamp in nanoseconds since Unix epoch.
    pub stamp: u64,
    pub frames: Vec<SlotFrames>,
}

impl PublishBatch {
    /// Number of slots in the batch.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Latches the latest image and calibration and snapshots them into slots.
#[derive(Debug, Clone)]
pub struct SnapshotRelay {
    num_slots: usize,
    latest_image: Option<RawImage>,
    latest_camera_info: Option<CameraInfo>,
    slots: BTreeMap<SlotId, Snapshot>,
}

impl SnapshotRelay {
    /// Create an empty relay with `num_slots` output slots.
    ///
    /// `num_slots` is clamped to [`MAX_SLOTS`].
    pub fn new(num_slots: usize) -> Self {
        Self {
            num_slots: num_slots.min(MAX_SLOTS),
            latest_image: None,
            latest_camera_info: None,
            slots: BTreeMap::new(),
        }
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn on_image(&mut self, image: RawImage) {
        self.latest_image = Some(image);
    }

    pub fn on_camera_info(&mut self, camera_info: CameraInfo) {
        self.latest_camera_info = Some(camera_info);
    }

    pub fn latest_image(&self) -> Option<&RawImage> {
        self.latest_image.as_ref()
    }

    pub fn latest_camera_info(&self) -> Option<&CameraInfo> {
        self.latest_camera_info.as_ref()
    }

    /// Map a wire-level slot number onto a configured [`SlotId`].
    pub fn resolve_slot(&self, raw: i32) -> Result<SlotId, RelayError> {
        let out_of_range = RelayError::SlotOutOfRange {
            slot: raw,
            num_slots: self.num_slots,
        };
        let slot = SlotId::try_from(raw).map_err(|_| out_of_range)?;
        if slot < 0 || slot as usize >= self.num_slots {
            return Err(out_of_range);
        }
        Ok(slot)
    }

    /// Copy the latest image and camera info into `slot`, replacing any
    /// previous snapshot there.
    ///
    /// Only fails when neither stream has delivered anything yet, or when
    /// `slot` has no output channels. A snapshot with one half missing is
    /// stored.
    pub fn save(&mut self, slot: SlotId) -> Result<&Snapshot, RelayError> {
        if self.latest_image.is_none() && self.latest_camera_info.is_none() {
            return Err(RelayError::NoDataAvailable);
        }
        let slot = self.resolve_slot(i32::from(slot))?;

        let snapshot = Snapshot {
            image: self.latest_image.clone(),
            camera_info: self.latest_camera_info.clone(),
        };
        self.slots.insert(slot, snapshot);
        Ok(&self.slots[&slot])
    }

    /// Stamp copies of every saved slot with the current time.
    pub fn publish_all(&self) -> Result<PublishBatch, RelayError> {
        self.publish_all_at(crate::now_nanos())
    }

    /// Stamp copies of every saved slot with `now`. Saved slots are left
    /// unchanged.
    pub fn publish_all_at(&self, now: u64) -> Result<PublishBatch, RelayError> {
        if self.slots.is_empty() {
            return Err(RelayError::EmptyBuffer);
        }

        let frames = self
            .slots
            .iter()
            .map(|(&slot, snapshot)| SlotFrames {
                slot,
                image: snapshot.image.clone().map(|mut image| {
                    image.stamp(now);
                    image
                }),
                camera_info: snapshot.camera_info.clone().map(|mut info| {
                    info.stamp(now);
                    info
                }),
            })
            .collect();

        Ok(PublishBatch { stamp: now, frames })
    }

    /// Drop every saved slot. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.slots.len();
        self.slots.clear();
        dropped
    }

    pub fn snapshot(&self, slot: SlotId) -> Option<&Snapshot> {
        self.slots.get(&slot)
    }

    /// Saved slot ids in ascending order.
    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots.keys().copied()
    }

    /// Number of saved slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Header;

    fn image(sequence: u32) -> RawImage {
        RawImage {
            header: Some(Header {
                acq_time: 1_000 + sequence as u64,
                sequence,
                frame_id: "color".into(),
                ..Default::default()
            }),
            width: 2,
            height: 1,
            encoding: "rgb8".into(),
            step: 6,
            data: vec![sequence as u8; 6],
        }
    }

    fn camera_info(width: u32) -> CameraInfo {
        CameraInfo {
            header: Some(Header {
                acq_time: 500,
                ..Default::default()
            }),
            width,
            height: 480,
            distortion_model: "plumb_bob".into(),
            k: vec![600.0, 0.0, 320.0, 0.0, 600.0, 240.0, 0.0, 0.0, 1.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_latest_values_track_most_recent() {
        let mut relay = SnapshotRelay::new(10);
        assert!(relay.latest_image().is_none());
        assert!(relay.latest_camera_info().is_none());

        relay.on_image(image(1));
        relay.on_camera_info(camera_info(640));
        relay.on_image(image(2));
        relay.on_camera_info(camera_info(1280));

        assert_eq!(relay.latest_image(), Some(&image(2)));
        assert_eq!(relay.latest_camera_info(), Some(&camera_info(1280)));
    }

    #[test]
    fn test_save_without_data_is_rejected() {
        let mut relay = SnapshotRelay::new(10);
        assert_eq!(relay.save(0).unwrap_err(), RelayError::NoDataAvailable);
        assert!(relay.is_empty());
    }

    #[test]
    fn test_save_is_a_copy() {
        let mut relay = SnapshotRelay::new(10);
        relay.on_image(image(1));
        relay.on_camera_info(camera_info(640));
        relay.save(4).unwrap();

        relay.on_image(image(2));
        relay.on_camera_info(camera_info(1280));

        let saved = relay.snapshot(4).unwrap();
        assert_eq!(saved.image, Some(image(1)));
        assert_eq!(saved.camera_info, Some(camera_info(640)));
    }

    #[test]
    fn test_save_overwrites_slot() {
        let mut relay = SnapshotRelay::new(10);
        relay.on_image(image(1));
        relay.save(2).unwrap();
        relay.on_image(image(2));
        relay.save(2).unwrap();

        assert_eq!(relay.len(), 1);
        assert_eq!(relay.snapshot(2).unwrap().image, Some(image(2)));
    }

    // A slot can be saved before the second stream has delivered anything.
    #[test]
    fn test_partial_snapshot_is_stored() {
        let mut relay = SnapshotRelay::new(10);
        relay.on_camera_info(camera_info(640));
        let saved = relay.save(1).unwrap();

        assert!(saved.is_partial());
        assert!(saved.image.is_none());

        let batch = relay.publish_all_at(7).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.frames[0].image.is_none());
        assert_eq!(
            batch.frames[0].camera_info.as_ref().unwrap().header.as_ref().unwrap().acq_time,
            7
        );
    }

    #[test]
    fn test_save_out_of_range() {
        let mut relay = SnapshotRelay::new(4);
        relay.on_image(image(1));

        assert_eq!(
            relay.save(4).unwrap_err(),
            RelayError::SlotOutOfRange { slot: 4, num_slots: 4 }
        );
        assert_eq!(
            relay.save(-1).unwrap_err(),
            RelayError::SlotOutOfRange { slot: -1, num_slots: 4 }
        );
        assert!(relay.is_empty());
    }

    #[test]
    fn test_resolve_slot() {
        let relay = SnapshotRelay::new(10);
        assert_eq!(relay.resolve_slot(0), Ok(0));
        assert_eq!(relay.resolve_slot(9), Ok(9));
        assert!(relay.resolve_slot(10).is_err());
        assert!(relay.resolve_slot(300).is_err());
        assert!(relay.resolve_slot(-129).is_err());
    }

    #[test]
    fn test_num_slots_clamped() {
        assert_eq!(SnapshotRelay::new(1000).num_slots(), MAX_SLOTS);
        let relay = SnapshotRelay::new(MAX_SLOTS);
        assert_eq!(relay.resolve_slot(127), Ok(127));
    }

    #[test]
    fn test_publish_empty_buffer() {
        let relay = SnapshotRelay::new(10);
        assert_eq!(relay.publish_all().unwrap_err(), RelayError::EmptyBuffer);
    }

    #[test]
    fn test_publish_shares_one_stamp_and_keeps_slots() {
        let mut relay = SnapshotRelay::new(10);
        relay.on_image(image(1));
        relay.on_camera_info(camera_info(640));
        relay.save(0).unwrap();
        relay.on_image(image(2));
        relay.save(5).unwrap();

        let before: Vec<Snapshot> = relay
            .slot_ids()
            .map(|s| relay.snapshot(s).unwrap().clone())
            .collect();
        let batch = relay.publish_all_at(42).unwrap();

        assert_eq!(batch.stamp, 42);
        assert_eq!(batch.len(), 2);
        for frames in &batch.frames {
            let image_header = frames.image.as_ref().unwrap().header.as_ref().unwrap();
            let info_header = frames.camera_info.as_ref().unwrap().header.as_ref().unwrap();
            assert_eq!(image_header.acq_time, 42);
            assert_eq!(image_header.pub_time, 42);
            assert_eq!(info_header.acq_time, 42);
            assert_eq!(info_header.pub_time, 42);
        }

        let after: Vec<Snapshot> = relay
            .slot_ids()
            .map(|s| relay.snapshot(s).unwrap().clone())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_clear() {
        let mut relay = SnapshotRelay::new(10);
        assert_eq!(relay.clear(), 0);

        relay.on_image(image(1));
        relay.save(1).unwrap();
        relay.save(2).unwrap();
        assert_eq!(relay.clear(), 2);
        assert!(relay.is_empty());
        // Latest values survive a clear.
        assert!(relay.latest_image().is_some());
    }

    #[test]
    fn test_error_levels() {
        assert_eq!(RelayError::EmptyBuffer.level(), log::Level::Warn);
        assert_eq!(RelayError::NoDataAvailable.level(), log::Level::Error);
    }
}
