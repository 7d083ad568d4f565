//! Record-file format.
//!
//! A capture file is newline-delimited JSON: one [`RecordHeader`] line
//! followed by one [`FramesetRecord`] line per delivered frameset, frame
//! payloads base64-encoded. The header stores the source device identity
//! and the exact profiles that were streaming, so playback can expose them
//! without touching hardware.

pub mod playback;
pub mod recorder;

use serde::{Deserialize, Serialize};

use crate::device::profile::StreamProfile;

pub(crate) const MAGIC: &str = "depthcast";
pub(crate) const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RecordHeader {
    pub magic: String,
    pub version: u32,
    pub device_serial: String,
    pub device_name: String,
    /// RFC 3339, wall-clock time the recording started
    pub recorded_at: String,
    pub streams: Vec<StreamProfile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FramesetRecord {
    /// Capture timestamp, microseconds since stream start
    pub timestamp: i64,
    pub frames: Vec<FrameRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FrameRecord {
    /// Index into the header's stream table
    pub stream: usize,
    pub frame_number: u64,
    /// Base64 payload
    pub data: String,
}
