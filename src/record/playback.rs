//! Playback device.
//!
//! A virtual device constructed from a capture file. It reports the stream
//! profiles stored in the header and, once started, replays the recorded
//! framesets at their recorded pacing on a driver thread. Reaching
//! end-of-file ends frame production silently: the thread parks with the
//! sink alive until the session stops, so consumers see timeouts, not a
//! disconnected pipeline.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::device::profile::StreamProfile;
use crate::device::{Device, DeviceInfo};
use crate::error::{PipelineError, Result};
use crate::pipeline::queue::FrameSink;
use crate::pipeline::types::{Frame, Frameset, Timestamp};
use crate::record::{FORMAT_VERSION, FramesetRecord, MAGIC, RecordHeader};

#[derive(Debug)]
struct Session {
    signal: crate::util::StopSignal,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
pub struct PlaybackDevice {
    info: DeviceInfo,
    streams: Vec<StreamProfile>,
    framesets: Vec<Frameset>,
    session: Mutex<Option<Session>>,
}

impl PlaybackDevice {
    /// Open and fully parse a capture file.
    pub fn from_file(path: &Path) -> Result<PlaybackDevice> {
        let file = File::open(path)
            .map_err(|e| PipelineError::PlaybackFile(format!("{}: {}", path.display(), e)))?;
        let mut lines = BufReader::new(file).lines();

        let header_line = lines
            .next()
            .ok_or_else(|| PipelineError::PlaybackFile(format!("{}: empty file", path.display())))?
            .map_err(|e| PipelineError::PlaybackFile(e.to_string()))?;
        let header: RecordHeader = serde_json::from_str(&header_line)
            .map_err(|e| PipelineError::PlaybackFile(format!("bad header: {}", e)))?;
        if header.magic != MAGIC || header.version != FORMAT_VERSION {
            return Err(PipelineError::PlaybackFile(format!(
                "{}: not a depthcast capture (magic {:?}, version {})",
                path.display(),
                header.magic,
                header.version
            )));
        }

        // Stored profiles become the file's designated defaults, so a
        // zero-request config replays exactly what was recorded.
        let streams: Vec<StreamProfile> = header
            .streams
            .iter()
            .map(|p| p.default_mode())
            .collect();

        let mut framesets = Vec::new();
        for line in lines {
            let line = line.map_err(|e| PipelineError::PlaybackFile(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: FramesetRecord = serde_json::from_str(&line)
                .map_err(|e| PipelineError::PlaybackFile(format!("bad frame record: {}", e)))?;
            let timestamp = Timestamp::from_micros(record.timestamp);
            let mut frames = Vec::with_capacity(record.frames.len());
            for fr in &record.frames {
                let profile = *streams.get(fr.stream).ok_or_else(|| {
                    PipelineError::PlaybackFile(format!(
                        "frame references unknown stream {}",
                        fr.stream
                    ))
                })?;
                let data = BASE64
                    .decode(&fr.data)
                    .map_err(|e| PipelineError::PlaybackFile(format!("bad payload: {}", e)))?;
                frames.push(Frame {
                    profile,
                    data: Bytes::from(data),
                    timestamp,
                    frame_number: fr.frame_number,
                });
            }
            framesets.push(Frameset::new(frames, timestamp));
        }

        info!(
            "opened capture {} ({} stream(s), {} frameset(s))",
            path.display(),
            streams.len(),
            framesets.len()
        );
        Ok(PlaybackDevice {
            info: DeviceInfo::new(header.device_serial, format!("Playback: {}", header.device_name)),
            streams,
            framesets,
            session: Mutex::new(None),
        })
    }

    /// Number of recorded framesets.
    pub fn frameset_count(&self) -> usize {
        self.framesets.len()
    }
}

impl Device for PlaybackDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn supported_profiles(&self) -> Vec<StreamProfile> {
        self.streams.clone()
    }

    fn start_streams(&self, profiles: &[StreamProfile], sink: FrameSink) -> anyhow::Result<()> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Err(anyhow!("playback already streaming"));
        }
        for profile in profiles {
            if !self.streams.iter().any(|s| s.key == profile.key) {
                return Err(anyhow!("capture file has no stream {}", profile.key));
            }
        }

        let opened: Vec<_> = profiles.iter().map(|p| p.key).collect();
        let framesets = self.framesets.clone();
        let signal = crate::util::StopSignal::new();
        let thread_signal = signal.clone();

        let handle = std::thread::spawn(move || {
            let mut prev = framesets.first().map(|f| f.timestamp());
            for frameset in framesets {
                // Honor recorded pacing between consecutive framesets
                let delta = prev
                    .map(|p| frameset.timestamp().diff(p))
                    .unwrap_or(Duration::ZERO);
                prev = Some(frameset.timestamp());
                if thread_signal.sleep(delta) {
                    return;
                }

                let replayed: Vec<Frame> = frameset
                    .iter()
                    .filter(|f| opened.contains(&f.profile.key))
                    .cloned()
                    .collect();
                if replayed.is_empty() {
                    continue;
                }
                sink.push(Frameset::new(replayed, frameset.timestamp()));
            }

            debug!("playback reached end of file, holding session open");
            // EOF is not fatal: keep the sink alive so waits time out
            // instead of failing, until the session is stopped.
            while !thread_signal.sleep(Duration::from_millis(250)) {}
        });

        *session = Some(Session { signal, handle });
        Ok(())
    }

    fn stop_streams(&self) -> anyhow::Result<()> {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.signal.cancel();
            if session.handle.join().is_err() {
                warn!("playback thread panicked during stop");
            }
        }
        Ok(())
    }
}
