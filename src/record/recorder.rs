//! Recording sink.
//!
//! [`Recorder`] serializes framesets to a capture file; [`RecordingDevice`]
//! wraps a live device so every frameset flowing out of it is persisted in
//! addition to being forwarded. The wrap happens before sensors open, so
//! recording attaches at the device level, not the frame level.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use log::{error, info};
use parking_lot::Mutex;

use crate::device::profile::StreamProfile;
use crate::device::{Device, DeviceInfo};
use crate::error::{PipelineError, Result};
use crate::pipeline::queue::FrameSink;
use crate::pipeline::types::Frameset;
use crate::record::{FORMAT_VERSION, FrameRecord, FramesetRecord, MAGIC, RecordHeader};

/// Writes the capture file. Created at `open()` time so an unwritable
/// path fails resolution before any sensor is started.
#[derive(Debug)]
pub struct Recorder {
    writer: Mutex<BufWriter<File>>,
    streams: Vec<StreamProfile>,
    // First write failure is reported once; later frames are skipped.
    failed: AtomicBool,
}

impl Recorder {
    /// Create the file and write the header.
    pub fn create(
        path: &Path,
        device: &DeviceInfo,
        streams: &[StreamProfile],
    ) -> Result<Recorder> {
        let file = File::create(path)
            .map_err(|e| PipelineError::RecordFile(format!("{}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);

        let header = RecordHeader {
            magic: MAGIC.into(),
            version: FORMAT_VERSION,
            device_serial: device.serial.clone(),
            device_name: device.name.clone(),
            recorded_at: Utc::now().to_rfc3339(),
            streams: streams.to_vec(),
        };
        let line = serde_json::to_string(&header)
            .map_err(|e| PipelineError::RecordFile(e.to_string()))?;
        writeln!(writer, "{}", line)
            .map_err(|e| PipelineError::RecordFile(format!("{}: {}", path.display(), e)))?;

        info!("recording to {}", path.display());
        Ok(Recorder {
            writer: Mutex::new(writer),
            streams: streams.to_vec(),
            failed: AtomicBool::new(false),
        })
    }

    /// Persist one frameset. Runs on the capture thread; failures are
    /// logged once and disable further writes rather than killing the
    /// stream.
    pub fn write(&self, frameset: &Frameset) {
        if self.failed.load(Ordering::Relaxed) {
            return;
        }
        let record = FramesetRecord {
            timestamp: frameset.timestamp().micros,
            frames: frameset
                .iter()
                .filter_map(|frame| {
                    let stream = self.streams.iter().position(|s| s.key == frame.profile.key)?;
                    Some(FrameRecord {
                        stream,
                        frame_number: frame.frame_number,
                        data: BASE64.encode(&frame.data),
                    })
                })
                .collect(),
        };
        let mut writer = self.writer.lock();
        let outcome = serde_json::to_string(&record)
            .map_err(std::io::Error::other)
            .and_then(|line| writeln!(writer, "{}", line));
        if let Err(e) = outcome {
            error!("recording write failed, disabling recorder: {}", e);
            self.failed.store(true, Ordering::Relaxed);
        }
    }

    /// Flush buffered records. Called when the session stops.
    pub fn finalize(&self) -> Result<()> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| PipelineError::RecordFile(e.to_string()))
    }
}

/// A live device wrapped with a recording sink.
pub struct RecordingDevice {
    inner: Arc<dyn Device>,
    recorder: Arc<Recorder>,
}

impl RecordingDevice {
    pub fn wrap(inner: Arc<dyn Device>, recorder: Arc<Recorder>) -> Self {
        Self { inner, recorder }
    }
}

impl Device for RecordingDevice {
    fn info(&self) -> DeviceInfo {
        self.inner.info()
    }

    fn supported_profiles(&self) -> Vec<StreamProfile> {
        self.inner.supported_profiles()
    }

    fn start_streams(&self, profiles: &[StreamProfile], sink: FrameSink) -> anyhow::Result<()> {
        let recorder = self.recorder.clone();
        let tapped = sink.with_tap(Arc::new(move |frameset| recorder.write(frameset)));
        self.inner.start_streams(profiles, tapped)
    }

    fn stop_streams(&self) -> anyhow::Result<()> {
        self.inner.stop_streams()?;
        self.recorder.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::profile::{PixelFormat, StreamKind};
    use crate::pipeline::types::{Frame, Timestamp};
    use bytes::Bytes;
    use std::io::BufRead;

    fn profile() -> StreamProfile {
        StreamProfile::new(StreamKind::Depth, 0, 4, 4, PixelFormat::Z16, 30)
    }

    fn frameset(n: u64) -> Frameset {
        let ts = Timestamp::from_micros(n as i64 * 33_333);
        Frameset::new(
            vec![Frame {
                profile: profile(),
                data: Bytes::from(vec![n as u8; 32]),
                timestamp: ts,
                frame_number: n,
            }],
            ts,
        )
    }

    #[test]
    fn test_header_then_frames_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.dcast");
        let recorder =
            Recorder::create(&path, &DeviceInfo::new("SW0", "Software Camera"), &[profile()])
                .unwrap();
        recorder.write(&frameset(0));
        recorder.write(&frameset(1));
        recorder.finalize().unwrap();

        let reader = std::io::BufReader::new(File::open(&path).unwrap());
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 3);

        let header: RecordHeader = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.streams.len(), 1);

        let record: FramesetRecord = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(record.frames[0].frame_number, 1);
        assert_eq!(BASE64.decode(&record.frames[0].data).unwrap(), vec![1u8; 32]);
    }

    #[test]
    fn test_unwritable_path_fails_creation() {
        let err = Recorder::create(
            Path::new("/nonexistent-dir/session.dcast"),
            &DeviceInfo::new("SW0", "Software Camera"),
            &[profile()],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::RecordFile(_)));
    }
}
