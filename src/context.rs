//! Library context.
//!
//! The context owns the device registry and is passed explicitly to every
//! pipeline; there is no ambient global state.

use std::sync::Arc;

use crate::device::{Device, DeviceRegistry, StaticRegistry};
use crate::pipeline::Pipeline;

/// Owns the device registry and creates pipelines against it.
#[derive(Clone)]
pub struct Context {
    registry: Arc<dyn DeviceRegistry>,
}

impl Context {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Context over a fixed set of devices.
    pub fn with_devices(devices: Vec<Arc<dyn Device>>) -> Self {
        Self::new(Arc::new(StaticRegistry::new(devices)))
    }

    /// Snapshot of the connected devices, in registry enumeration order.
    pub fn devices(&self) -> Vec<Arc<dyn Device>> {
        self.registry.devices()
    }

    /// Create a pipeline bound to this context.
    pub fn create_pipeline(&self) -> Pipeline {
        Pipeline::new(self.clone())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("devices", &self.registry.devices().len())
            .finish()
    }
}
