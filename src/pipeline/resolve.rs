//! Configuration resolution.
//!
//! Turns the declarative request set into one concrete device plus an
//! ordered profile selection. Resolution is deterministic for a fixed
//! registry snapshot: candidates are visited in registry enumeration
//! order and ranking ties are broken by device declaration order, never by
//! concurrency. The commit is all-or-nothing: a single unmatchable request
//! fails the whole resolution.

use std::sync::Arc;

use log::{debug, info};

use crate::config::{PipelineConfig, StreamRequest};
use crate::context::Context;
use crate::device::Device;
use crate::device::profile::StreamProfile;
use crate::error::{PipelineError, Result};
use crate::record::playback::PlaybackDevice;

/// Outcome of a successful resolution: the selected device and the
/// concrete profiles to activate, in request order.
#[derive(Clone)]
pub struct ResolvedProfile {
    pub device: Arc<dyn Device>,
    pub streams: Vec<StreamProfile>,
}

impl ResolvedProfile {
    pub fn serial(&self) -> String {
        self.device.info().serial
    }
}

impl std::fmt::Debug for ResolvedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("device", &self.device.info())
            .field("streams", &self.streams)
            .finish()
    }
}

/// Resolve `config` against the context's registry snapshot.
pub fn resolve(config: &PipelineConfig, ctx: &Context) -> Result<ResolvedProfile> {
    // Playback bypasses live enumeration entirely
    if let Some(path) = config.playback_file() {
        let device: Arc<dyn Device> = Arc::new(PlaybackDevice::from_file(path)?);
        let streams = select(device.as_ref(), config.requests())?;
        info!("resolved playback device from {}", path.display());
        return Ok(ResolvedProfile { device, streams });
    }

    let mut candidates = ctx.devices();
    if let Some(serial) = config.device_serial() {
        candidates.retain(|d| d.info().serial == serial);
        if candidates.is_empty() {
            return Err(PipelineError::NoMatchingDevice(format!(
                "no connected device with serial {}",
                serial
            )));
        }
    }
    if candidates.is_empty() {
        return Err(PipelineError::NoMatchingDevice(
            "no devices connected".into(),
        ));
    }

    // First device in registry order whose sensors satisfy every request
    let mut last_err = None;
    for device in candidates {
        match select(device.as_ref(), config.requests()) {
            Ok(streams) => {
                info!(
                    "resolved device {} with {} stream(s)",
                    device.info().serial,
                    streams.len()
                );
                return Ok(ResolvedProfile { device, streams });
            }
            Err(err) => {
                debug!("device {} rejected: {}", device.info().serial, err);
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        PipelineError::UnsatisfiableRequest("no candidate device".into())
    }))
}

/// Select concrete profiles on `device` for every request, or the device's
/// designated defaults when no request was declared.
pub fn select(device: &dyn Device, requests: &[StreamRequest]) -> Result<Vec<StreamProfile>> {
    let supported = device.supported_profiles();

    if requests.is_empty() {
        return default_selection(&supported);
    }

    let mut streams = Vec::with_capacity(requests.len());
    for request in requests {
        let profile = best_match(&supported, request).ok_or_else(|| {
            PipelineError::UnsatisfiableRequest(format!(
                "no profile on device matches request for {}",
                request.key
            ))
        })?;
        streams.push(profile);
    }
    Ok(streams)
}

/// One designated default profile per stream identity, in declaration
/// order of first appearance.
fn default_selection(supported: &[StreamProfile]) -> Result<Vec<StreamProfile>> {
    let mut streams: Vec<StreamProfile> = Vec::new();
    for profile in supported.iter().filter(|p| p.is_default) {
        if !streams.iter().any(|s| s.key == profile.key) {
            streams.push(*profile);
        }
    }
    if streams.is_empty() {
        return Err(PipelineError::UnsatisfiableRequest(
            "device exposes no default profiles".into(),
        ));
    }
    Ok(streams)
}

/// Best profile for one request. Specified fields must match exactly;
/// remaining candidates are ranked by the fixed priority order: device
/// default first, then higher resolution, then higher frame rate, then
/// declaration order.
fn best_match(supported: &[StreamProfile], request: &StreamRequest) -> Option<StreamProfile> {
    supported
        .iter()
        .filter(|p| {
            p.key == request.key
                && request.width.is_none_or(|w| p.width == w)
                && request.height.is_none_or(|h| p.height == h)
                && request.format.is_none_or(|f| p.format == f)
                && request.fps.is_none_or(|fps| p.fps == fps)
        })
        // max_by_key keeps the *last* max; reverse the scan so ties fall
        // to the earliest declared profile
        .rev()
        .max_by_key(|p| (p.is_default, p.area(), p.fps))
        .copied()
}
