//! Stream and profile descriptors.
//!
//! A stream is a single sensor data channel identified by kind and index;
//! a profile is a concrete (resolution, format, frame rate) tuple a sensor
//! can produce. Profiles are plain serializable values so they can be
//! embedded in record-file headers.

use serde::{Deserialize, Serialize};

/// Kind of sensor data carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Depth,
    Color,
    Infrared,
    Fisheye,
    Gyro,
    Accel,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StreamKind::Depth => "Depth",
            StreamKind::Color => "Color",
            StreamKind::Infrared => "Infrared",
            StreamKind::Fisheye => "Fisheye",
            StreamKind::Gyro => "Gyro",
            StreamKind::Accel => "Accel",
        };
        write!(f, "{}", name)
    }
}

/// Pixel/sample layout of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 16-bit depth, millimeter scaled
    Z16,
    /// 8-bit RGB, packed
    Rgb8,
    /// 8-bit BGR, packed
    Bgr8,
    /// 8-bit luminance
    Y8,
    /// 16-bit luminance
    Y16,
    /// YUYV 4:2:2
    Yuyv,
    /// 32-bit float triplets (motion streams)
    MotionXyz32F,
}

impl PixelFormat {
    /// Bytes per pixel (or per sample for motion streams).
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Z16 | PixelFormat::Y16 | PixelFormat::Yuyv => 2,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Y8 => 1,
            PixelFormat::MotionXyz32F => 12,
        }
    }
}

/// Identity of one stream on a device: kind plus an index that
/// disambiguates multiple sensors of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    pub kind: StreamKind,
    pub index: u32,
}

impl StreamKey {
    pub fn new(kind: StreamKind, index: u32) -> Self {
        Self { kind, index }
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}

/// A concrete stream mode a sensor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProfile {
    pub key: StreamKey,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub fps: u32,
    /// Marks the sensor's designated default mode for this stream,
    /// selected when the caller declares no explicit request.
    pub is_default: bool,
}

impl StreamProfile {
    pub fn new(
        kind: StreamKind,
        index: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        fps: u32,
    ) -> Self {
        Self {
            key: StreamKey::new(kind, index),
            width,
            height,
            format,
            fps,
            is_default: false,
        }
    }

    /// Builder-style default marker.
    pub fn default_mode(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Pixel area, used for ranking candidates during selection.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Payload size of one frame in this profile.
    pub fn frame_size(&self) -> usize {
        self.area() as usize * self.format.bytes_per_pixel()
    }
}

impl std::fmt::Display for StreamProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}x{} {:?} @{}fps",
            self.key, self.width, self.height, self.format, self.fps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_display() {
        let p = StreamProfile::new(StreamKind::Depth, 0, 640, 480, PixelFormat::Z16, 30);
        assert_eq!(p.to_string(), "Depth#0 640x480 Z16 @30fps");
    }

    #[test]
    fn test_default_mode_marker() {
        let p = StreamProfile::new(StreamKind::Color, 0, 1280, 720, PixelFormat::Rgb8, 30);
        assert!(!p.is_default);
        assert!(p.default_mode().is_default);
    }

    #[test]
    fn test_area_ranking_input() {
        let lo = StreamProfile::new(StreamKind::Depth, 0, 320, 240, PixelFormat::Z16, 60);
        let hi = StreamProfile::new(StreamKind::Depth, 0, 1280, 720, PixelFormat::Z16, 30);
        assert!(hi.area() > lo.area());
    }
}
