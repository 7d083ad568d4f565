//! depthcast — streaming pipeline for camera and depth sensors.
//!
//! The crate sits between sensing devices and an application consuming
//! synchronized frame data, hiding device selection, stream-format
//! negotiation, the start/stop lifecycle and frame delivery behind a
//! single [`Pipeline`] handle:
//!
//! ```no_run
//! use std::time::Duration;
//! use depthcast::{Context, PixelFormat, StreamKind, StreamRequest};
//!
//! # fn run(ctx: Context) -> depthcast::Result<()> {
//! let pipeline = ctx.create_pipeline();
//! pipeline.enable_stream(
//!     StreamRequest::any(StreamKind::Depth, 0)
//!         .with_resolution(640, 480)
//!         .with_format(PixelFormat::Z16)
//!         .with_fps(30),
//! )?;
//! pipeline.start()?;
//! loop {
//!     match pipeline.wait_for_frames(Duration::from_millis(500)) {
//!         Ok(frames) => {
//!             if let Some(depth) = frames.first_of(StreamKind::Depth) {
//!                 println!("depth frame #{} ({} bytes)", depth.frame_number, depth.size());
//!             }
//!             break;
//!         }
//!         Err(e) if e.is_recoverable() => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! pipeline.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! Live devices come from a [`device::DeviceRegistry`]; a session can be
//! recorded to file (`enable_record_to_file`) or replayed from one
//! (`enable_device_from_file`) without the consuming code changing.

pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod record;
mod util;

pub use config::{PipelineConfig, StreamRequest};
pub use context::Context;
pub use device::profile::{PixelFormat, StreamKey, StreamKind, StreamProfile};
pub use device::software::SoftwareDevice;
pub use device::{Device, DeviceHandle, DeviceInfo, DeviceRegistry, StaticRegistry};
pub use error::{PipelineError, Result};
pub use pipeline::queue::{FrameQueue, FrameSink};
pub use pipeline::state::PipelineState;
pub use pipeline::types::{Frame, Frameset, Timestamp};
pub use pipeline::{ActiveStreams, Pipeline};
pub use record::playback::PlaybackDevice;
pub use record::recorder::{Recorder, RecordingDevice};
