//! Software device backend.
//!
//! Synthesizes framesets on a driver thread at the pace of the fastest
//! opened stream. Serves as the generic fallback when no hardware backend
//! is present, and as the device double for the test suite. Payloads are
//! deterministic (each frame filled with its sequence number) so consumers
//! can assert on content.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use bytes::Bytes;
use log::{debug, info};
use parking_lot::Mutex;

use crate::device::profile::StreamProfile;
use crate::device::{Device, DeviceInfo};
use crate::pipeline::queue::FrameSink;
use crate::pipeline::types::{Frame, Frameset, Timestamp};
use crate::util::StopSignal;

struct Session {
    signal: StopSignal,
    handle: JoinHandle<()>,
}

pub struct SoftwareDevice {
    info: DeviceInfo,
    profiles: Vec<StreamProfile>,
    session: Mutex<Option<Session>>,
}

impl SoftwareDevice {
    /// A device offering exactly the given profiles, in declaration order.
    pub fn new(info: DeviceInfo, profiles: Vec<StreamProfile>) -> Arc<Self> {
        Arc::new(Self {
            info,
            profiles,
            session: Mutex::new(None),
        })
    }

    fn synthesize(profiles: &[StreamProfile], seq: u64, timestamp: Timestamp) -> Frameset {
        let frames = profiles
            .iter()
            .map(|profile| Frame {
                profile: *profile,
                data: Bytes::from(vec![(seq & 0xff) as u8; profile.frame_size()]),
                timestamp,
                frame_number: seq,
            })
            .collect();
        Frameset::new(frames, timestamp)
    }
}

impl Device for SoftwareDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn supported_profiles(&self) -> Vec<StreamProfile> {
        self.profiles.clone()
    }

    fn start_streams(
        &self,
        profiles: &[StreamProfile],
        sink: FrameSink,
    ) -> Result<(), anyhow::Error> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Err(anyhow!("device {} already streaming", self.info.serial));
        }
        for profile in profiles {
            if !self.profiles.contains(profile) {
                return Err(anyhow!("unsupported profile {}", profile));
            }
        }

        let fps = profiles.iter().map(|p| p.fps).max().unwrap_or(30).max(1);
        let interval = Duration::from_secs_f64(1.0 / fps as f64);
        info!(
            "software device {} streaming {} profile(s) at {} fps",
            self.info.serial,
            profiles.len(),
            fps
        );
        let profiles = profiles.to_vec();
        let signal = StopSignal::new();
        let thread_signal = signal.clone();
        let serial = self.info.serial.clone();

        let handle = std::thread::spawn(move || {
            let base = Instant::now();
            let mut seq: u64 = 0;
            loop {
                if thread_signal.sleep(interval) {
                    break;
                }
                let timestamp = Timestamp::from_instant(Instant::now(), base);
                sink.push(Self::synthesize(&profiles, seq, timestamp));
                seq += 1;
            }
            debug!("software device {} capture thread exiting after {} frames", serial, seq);
            // sink dropped here: consumer observes disconnection
        });

        *session = Some(Session { signal, handle });
        Ok(())
    }

    fn stop_streams(&self) -> Result<(), anyhow::Error> {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.signal.cancel();
            // Join so every sink clone is gone when we return
            session
                .handle
                .join()
                .map_err(|_| anyhow!("capture thread panicked"))?;
            info!("software device {} stopped", self.info.serial);
        }
        Ok(())
    }
}
