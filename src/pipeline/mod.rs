//! Streaming pipeline.
//!
//! [`Pipeline`] is the single handle an application needs: it accumulates
//! stream requests, resolves them against the context's devices, drives
//! the open/start/stop lifecycle and delivers synchronized framesets by
//! blocking wait or non-blocking poll. Control and coordination live
//! here; capture itself runs on driver threads owned by the device.

pub mod queue;
pub mod resolve;
pub mod state;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use parking_lot::Mutex;

use crate::config::{PipelineConfig, StreamRequest};
use crate::context::Context;
use crate::device::profile::{StreamKey, StreamKind, StreamProfile};
use crate::device::{Device, DeviceHandle};
use crate::error::{PipelineError, Result};
use crate::record::recorder::{Recorder, RecordingDevice};
use queue::FrameQueue;
use resolve::ResolvedProfile;
use state::PipelineState;

/// The resolved stream selection, in request order.
#[derive(Debug, Clone, Default)]
pub struct ActiveStreams {
    streams: Vec<StreamProfile>,
}

impl ActiveStreams {
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StreamProfile> {
        self.streams.get(index)
    }

    /// Profile resolved for a specific stream identity.
    pub fn stream(&self, kind: StreamKind, index: u32) -> Option<&StreamProfile> {
        let key = StreamKey::new(kind, index);
        self.streams.iter().find(|p| p.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamProfile> {
        self.streams.iter()
    }
}

impl IntoIterator for ActiveStreams {
    type Item = StreamProfile;
    type IntoIter = std::vec::IntoIter<StreamProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.streams.into_iter()
    }
}

struct Inner {
    /// Pending declarative configuration; edits affect the next resolution
    config: PipelineConfig,
    state: PipelineState,
    /// Last successful resolution, kept across stop() for restart
    resolved: Option<ResolvedProfile>,
    /// Recording sink created at open() time, consumed by one session
    recorder: Option<Arc<Recorder>>,
    /// Device actually streaming (recording wrapper when recording)
    session_device: Option<Arc<dyn Device>>,
    /// Consumer side of the session conduit
    queue: Option<FrameQueue>,
}

/// A streaming pipeline bound to a [`Context`].
pub struct Pipeline {
    ctx: Context,
    inner: Mutex<Inner>,
}

impl Pipeline {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            inner: Mutex::new(Inner {
                config: PipelineConfig::new(),
                state: PipelineState::Unconfigured,
                resolved: None,
                recorder: None,
                session_device: None,
                queue: None,
            }),
        }
    }

    // ── Configuration ───────────────────────────────────────────

    /// Append a stream request. Takes effect on the next `open`/`start`.
    pub fn enable_stream(&self, request: StreamRequest) -> Result<()> {
        self.inner.lock().config.enable_stream(request)
    }

    /// Restrict resolution to the device with the given serial.
    pub fn enable_device(&self, serial: impl Into<String>) {
        self.inner.lock().config.enable_device(serial)
    }

    /// Use a capture file as the device instead of live hardware.
    pub fn enable_device_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.lock().config.enable_device_from_file(path)
    }

    /// Record every frame of the next session to the given file.
    pub fn enable_record_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.lock().config.enable_record_to_file(path)
    }

    /// Clear all stream requests and device/file constraints.
    pub fn reset_streams(&self) {
        self.inner.lock().config.reset()
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Resolve the pending configuration without starting sensor flow.
    ///
    /// Always permitted: a live session is implicitly stopped first. A
    /// failed resolution keeps the previous resolution (if any) intact.
    pub fn open(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state.is_streaming() {
            Self::stop_session(&mut inner)?;
        }
        Self::open_locked(&mut inner, &self.ctx)
    }

    /// Start streaming, resolving the pending configuration first if
    /// nothing is resolved yet.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state.is_streaming() {
            return Err(PipelineError::InvalidState(
                "pipeline is already streaming".into(),
            ));
        }
        if !inner.state.is_configured() {
            Self::open_locked(&mut inner, &self.ctx)?;
        }

        let resolved = inner
            .resolved
            .clone()
            .expect("configured state implies a resolution");

        // Recording wraps the device before any sensor is opened
        let device: Arc<dyn Device> = match &inner.recorder {
            Some(recorder) => Arc::new(RecordingDevice::wrap(
                resolved.device.clone(),
                recorder.clone(),
            )),
            None => resolved.device.clone(),
        };

        let (sink, queue) = FrameQueue::channel();
        device.start_streams(&resolved.streams, sink)?;

        inner.queue = Some(queue);
        inner.session_device = Some(device);
        inner.state = PipelineState::Streaming {
            started_at: Instant::now(),
        };
        info!(
            "pipeline streaming {} stream(s) on device {}",
            resolved.streams.len(),
            resolved.serial()
        );
        Ok(())
    }

    /// Stop streaming. The resolved configuration is preserved, so a
    /// subsequent `start()` resumes the same selection.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.state.is_streaming() {
            return Err(PipelineError::InvalidState(format!(
                "stop() requires a streaming pipeline ({})",
                inner.state
            )));
        }
        Self::stop_session(&mut inner)
    }

    /// Clear configuration and resolution, returning to the initial
    /// state. Callable from any state; idempotent.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        if inner.state.is_streaming()
            && let Err(e) = Self::stop_session(&mut inner)
        {
            warn!("reset: stopping active session failed: {}", e);
        }
        inner.config.reset();
        inner.resolved = None;
        inner.recorder = None;
        inner.session_device = None;
        inner.queue = None;
        inner.state = PipelineState::Unconfigured;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.inner.lock().state
    }

    // ── Introspection ───────────────────────────────────────────

    /// The resolved stream selection; empty when unconfigured.
    pub fn active_streams(&self) -> ActiveStreams {
        let inner = self.inner.lock();
        match &inner.resolved {
            Some(resolved) if inner.state.is_configured() => ActiveStreams {
                streams: resolved.streams.clone(),
            },
            _ => ActiveStreams::default(),
        }
    }

    /// Non-owning view of the resolved device.
    pub fn device(&self) -> Result<DeviceHandle> {
        let inner = self.inner.lock();
        let device = match (&inner.session_device, &inner.resolved) {
            (Some(device), _) => device.clone(),
            (None, Some(resolved)) if inner.state.is_configured() => resolved.device.clone(),
            _ => {
                return Err(PipelineError::InvalidState(
                    "pipeline has no resolved device".into(),
                ));
            }
        };
        Ok(DeviceHandle::new(device))
    }

    // ── Frame delivery ──────────────────────────────────────────

    /// Block until a frameset is available or `timeout` elapses.
    pub fn wait_for_frames(&self, timeout: Duration) -> Result<types::Frameset> {
        let queue = {
            let inner = self.inner.lock();
            if !inner.state.is_streaming() {
                return Err(PipelineError::InvalidState(format!(
                    "wait_for_frames requires a streaming pipeline ({})",
                    inner.state
                )));
            }
            inner.queue.as_ref().expect("streaming implies a queue").clone()
        };
        // Lock released: a concurrent stop() can proceed and wake us via
        // sink disconnection
        queue.wait(timeout)
    }

    /// Dequeue a frameset if one is available. Never blocks; returns
    /// `None` when the queue is empty or the pipeline is not streaming.
    pub fn poll_for_frames(&self) -> Option<types::Frameset> {
        let queue = {
            let inner = self.inner.lock();
            if !inner.state.is_streaming() {
                return None;
            }
            inner.queue.as_ref()?.clone()
        };
        queue.poll()
    }

    // ── Internals ───────────────────────────────────────────────

    fn open_locked(inner: &mut Inner, ctx: &Context) -> Result<()> {
        let config = inner.config.clone();
        let resolved = resolve::resolve(&config, ctx)?;

        // An unwritable record file fails open() before any sensor starts
        let recorder = match config.record_file() {
            Some(path) => Some(Arc::new(Recorder::create(
                path,
                &resolved.device.info(),
                &resolved.streams,
            )?)),
            None => None,
        };

        debug_assert!(inner.state.can_transition_to(&PipelineState::Configured));
        inner.resolved = Some(resolved);
        inner.recorder = recorder;
        inner.state = PipelineState::Configured;
        Ok(())
    }

    fn stop_session(inner: &mut Inner) -> Result<()> {
        let device = inner.session_device.take();
        let streamed_for = inner.state.streaming_duration();
        // The session is over even if the driver fails to stop cleanly:
        // tear down the pipeline side first so the state stays consistent
        // when the error below propagates.
        // Recording covers exactly one session; reconfigure to record again
        inner.recorder = None;
        inner.queue = None;
        inner.state = PipelineState::Configured;
        // Stopping the device cancels and joins its capture threads, which
        // drops every sink clone: a blocked wait_for_frames wakes with
        // InvalidState once the queue drains. Nothing captured after this
        // call returns can ever be delivered.
        if let Some(device) = device {
            device.stop_streams()?;
        }
        match streamed_for {
            Some(elapsed) => info!("pipeline stopped after {:.1?}", elapsed),
            None => info!("pipeline stopped"),
        }
        Ok(())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state.is_streaming()
            && let Some(device) = inner.session_device.take()
            && let Err(e) = device.stop_streams()
        {
            warn!("failed to stop device while dropping pipeline: {}", e);
        }
    }
}
