//! Protobuf messages carried on the relay's topics.
//!
//! Messages follow the bubbaloop convention of a [`Header`] at field 1, so
//! any consumer that only understands the header can still extract
//! timestamps from them.

/// Common message header.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Header {
    /// Acquisition time, nanoseconds since Unix epoch.
    #[prost(uint64, tag = "1")]
    pub acq_time: u64,
    /// Publication time, nanoseconds since Unix epoch.
    #[prost(uint64, tag = "2")]
    pub pub_time: u64,
    #[prost(uint32, tag = "3")]
    pub sequence: u32,
    /// Coordinate frame / source identifier.
    #[prost(string, tag = "4")]
    pub frame_id: String,
    #[prost(string, tag = "5")]
    pub machine_id: String,
    #[prost(string, tag = "6")]
    pub scope: String,
}

/// Uncompressed image frame.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawImage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
    /// Pixel encoding, e.g. `rgb8`, `bgr8`, `mono8`.
    #[prost(string, tag = "4")]
    pub encoding: String,
    /// Row length in bytes.
    #[prost(uint32, tag = "5")]
    pub step: u32,
    #[prost(bytes = "vec", tag = "6")]
    pub data: Vec<u8>,
}

/// Sub-window of the full sensor resolution.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct RegionOfInterest {
    #[prost(uint32, tag = "1")]
    pub x_offset: u32,
    #[prost(uint32, tag = "2")]
    pub y_offset: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
    #[prost(uint32, tag = "4")]
    pub width: u32,
    #[prost(bool, tag = "5")]
    pub do_rectify: bool,
}

/// Camera calibration: intrinsics, distortion, rectification and projection.
///
/// Matrices are row-major: `k` is 3x3, `r` is 3x3 and `p` is 3x4.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CameraInfo {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(uint32, tag = "2")]
    pub height: u32,
    #[prost(uint32, tag = "3")]
    pub width: u32,
    /// Distortion model name, e.g. `plumb_bob`.
    #[prost(string, tag = "4")]
    pub distortion_model: String,
    #[prost(double, repeated, tag = "5")]
    pub d: Vec<f64>,
    #[prost(double, repeated, tag = "6")]
    pub k: Vec<f64>,
    #[prost(double, repeated, tag = "7")]
    pub r: Vec<f64>,
    #[prost(double, repeated, tag = "8")]
    pub p: Vec<f64>,
    #[prost(uint32, tag = "9")]
    pub binning_x: u32,
    #[prost(uint32, tag = "10")]
    pub binning_y: u32,
    #[prost(message, optional, tag = "11")]
    pub roi: Option<RegionOfInterest>,
}

/// Request to snapshot the latest frame into a slot.
///
/// The slot travels as `int32` on the wire; the relay only accepts values
/// that fit its `i8` slot ids.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct SaveCommand {
    #[prost(int32, tag = "1")]
    pub slot: i32,
}

/// Messages that carry a [`Header`] whose timestamps can be rewritten.
pub trait Stamped {
    fn header_mut(&mut self) -> &mut Header;

    /// Overwrite acquisition and publication time with `now`.
    fn stamp(&mut self, now: u64) {
        let header = self.header_mut();
        header.acq_time = now;
        header.pub_time = now;
    }
}

impl Stamped for RawImage {
    fn header_mut(&mut self) -> &mut Header {
        self.header.get_or_insert_with(Header::default)
    }
}

impl Stamped for CameraInfo {
    fn header_mut(&mut self) -> &mut Header {
        self.header.get_or_insert_with(Header::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_stamp_creates_missing_header() {
        let mut img = RawImage {
            width: 4,
            height: 2,
            ..Default::default()
        };
        img.stamp(1_700_000_000_000_000_000);
        let header = img.header.unwrap();
        assert_eq!(header.acq_time, 1_700_000_000_000_000_000);
        assert_eq!(header.pub_time, 1_700_000_000_000_000_000);
    }

    #[test]
    fn test_stamp_keeps_other_header_fields() {
        let mut info = CameraInfo {
            header: Some(Header {
                acq_time: 1,
                sequence: 12,
                frame_id: "color_optical".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        info.stamp(99);
        let header = info.header.unwrap();
        assert_eq!(header.acq_time, 99);
        assert_eq!(header.sequence, 12);
        assert_eq!(header.frame_id, "color_optical");
    }

    #[test]
    fn test_header_is_field_one() {
        // Header-only consumers decode any relay message through field 1.
        #[derive(prost::Message)]
        struct HeaderWrapper {
            #[prost(message, optional, tag = "1")]
            header: Option<Header>,
        }

        let info = CameraInfo {
            header: Some(Header {
                sequence: 7,
                ..Default::default()
            }),
            distortion_model: "plumb_bob".into(),
            d: vec![0.1, -0.2, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        let wrapper = HeaderWrapper::decode(info.encode_to_vec().as_slice()).unwrap();
        assert_eq!(wrapper.header.unwrap().sequence, 7);
    }

    #[test]
    fn test_save_command_negative_slot() {
        let bytes = SaveCommand { slot: -3 }.encode_to_vec();
        assert_eq!(SaveCommand::decode(bytes.as_slice()).unwrap().slot, -3);
    }
}
