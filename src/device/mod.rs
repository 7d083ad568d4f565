//! Device abstraction layer.
//!
//! The pipeline never talks to hardware directly: it enumerates devices
//! through a [`DeviceRegistry`] and drives each one through the [`Device`]
//! trait. Driver implementations own their capture threads and deliver
//! already-synchronized framesets into the [`FrameSink`] handed to
//! [`Device::start_streams`]. Frameset composition across sensors happens
//! inside the driver, before the sink.

pub mod profile;
pub mod software;

use std::sync::Arc;

use crate::pipeline::queue::FrameSink;
use profile::StreamProfile;

/// Static identity of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Unique serial number, used for explicit device selection.
    pub serial: String,
    /// Human-readable product name.
    pub name: String,
}

impl DeviceInfo {
    pub fn new(serial: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            name: name.into(),
        }
    }
}

/// Trait for sensing-device drivers.
///
/// `start_streams` must be non-blocking: it spawns or resumes the driver's
/// capture threads and returns. `stop_streams` must stop frame production,
/// join or park those threads, and drop every clone of the sink so the
/// consumer side observes disconnection.
pub trait Device: Send + Sync {
    /// Identity of this device.
    fn info(&self) -> DeviceInfo;

    /// Every concrete stream mode this device can produce, in the
    /// device's fixed declaration order. Ordering matters: resolution
    /// ties are broken by it.
    fn supported_profiles(&self) -> Vec<StreamProfile>;

    /// Open the given streams and begin delivering framesets to `sink`.
    fn start_streams(
        &self,
        profiles: &[StreamProfile],
        sink: FrameSink,
    ) -> Result<(), anyhow::Error>;

    /// Close all open streams and release the sink.
    fn stop_streams(&self) -> Result<(), anyhow::Error>;
}

/// Registry of connected devices.
///
/// `devices()` returns a snapshot in a stable enumeration order; the
/// resolver relies on that order for deterministic tie-breaking. The
/// registry owns device lifetime; the pipeline only borrows handles for
/// the duration of a session.
pub trait DeviceRegistry: Send + Sync {
    fn devices(&self) -> Vec<Arc<dyn Device>>;
}

/// Fixed, in-memory registry. Enough for software devices and tests;
/// hot-plug aware registries implement [`DeviceRegistry`] themselves.
#[derive(Default)]
pub struct StaticRegistry {
    devices: Vec<Arc<dyn Device>>,
}

impl StaticRegistry {
    pub fn new(devices: Vec<Arc<dyn Device>>) -> Self {
        Self { devices }
    }
}

impl DeviceRegistry for StaticRegistry {
    fn devices(&self) -> Vec<Arc<dyn Device>> {
        self.devices.clone()
    }
}

/// Non-owning view of the device a pipeline resolved to.
///
/// Cloning the handle never extends a streaming session; the registry (or
/// the pipeline, for playback/recording wrappers) remains the owner.
#[derive(Clone)]
pub struct DeviceHandle {
    inner: Arc<dyn Device>,
}

impl DeviceHandle {
    pub(crate) fn new(inner: Arc<dyn Device>) -> Self {
        Self { inner }
    }

    pub fn info(&self) -> DeviceInfo {
        self.inner.info()
    }

    pub fn supported_profiles(&self) -> Vec<StreamProfile> {
        self.inner.supported_profiles()
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("info", &self.inner.info())
            .finish()
    }
}
