use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::{Clock, Millis};
use crate::error::{CaptureError, CaptureResult};
use crate::models::GazeSample;

use super::capability::{GazeCapability, GazeListener, Regression};
use super::throttle::{GazeSampleThrottle, LOGGING_INTERVAL_MS};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// State shared with the capability's listener callback.
struct LiveCapture {
    /// Bumped on every start; listeners from older captures are ignored.
    generation: u64,
    accepting: bool,
    throttle: GazeSampleThrottle,
    samples: Vec<GazeSample>,
}

fn lock_live(live: &Mutex<LiveCapture>) -> MutexGuard<'_, LiveCapture> {
    match live.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Owns start/stop of the gaze capability and the two sample buffers.
///
/// The live buffer accumulates throttled samples while a capture is running
/// and is emptied at every start and stop. The final buffer is written only
/// by `stop()` and survives until [`reset_final_buffer`] or the next stop.
///
/// [`reset_final_buffer`]: GazeModelLifecycle::reset_final_buffer
pub struct GazeModelLifecycle {
    capability: Box<dyn GazeCapability>,
    clock: Arc<dyn Clock>,
    live: Arc<Mutex<LiveCapture>>,
    final_samples: Vec<GazeSample>,
    initialized: bool,
    calibrated: bool,
}

impl GazeModelLifecycle {
    pub fn new(capability: Box<dyn GazeCapability>, clock: Arc<dyn Clock>) -> Self {
        Self::with_logging_interval(capability, clock, LOGGING_INTERVAL_MS)
    }

    pub fn with_logging_interval(
        capability: Box<dyn GazeCapability>,
        clock: Arc<dyn Clock>,
        interval_ms: Millis,
    ) -> Self {
        Self {
            capability,
            clock,
            live: Arc::new(Mutex::new(LiveCapture {
                generation: 0,
                accepting: false,
                throttle: GazeSampleThrottle::new(interval_ms),
                samples: Vec::new(),
            })),
            final_samples: Vec::new(),
            initialized: false,
            calibrated: false,
        }
    }

    /// Starts a capture. Calling this while a capture is already running is
    /// a no-op.
    pub async fn start(&mut self) -> CaptureResult<()> {
        if self.initialized {
            log_debug!("gaze capture already running; start ignored");
            return Ok(());
        }

        if !self.capability.is_loaded() {
            log_error!("gaze capability is not loaded");
            return Err(CaptureError::CapabilityUnavailable);
        }

        let generation = {
            let mut live = lock_live(&self.live);
            live.generation += 1;
            live.accepting = true;
            live.samples.clear();
            live.throttle.reset();
            live.generation
        };

        let listener = self.throttled_listener(generation);
        self.capability.configure_regression(Regression::Ridge);
        self.capability.set_listener(listener);
        self.capability.show_preview(false);

        if let Err(err) = self.capability.begin().await {
            let mut live = lock_live(&self.live);
            live.accepting = false;
            live.samples.clear();
            log_error!("gaze capability failed to begin: {err:#}");
            return Err(CaptureError::CapabilityFailed(format!("{err:#}")));
        }

        self.initialized = true;
        log_info!("gaze capture started (generation {generation})");
        Ok(())
    }

    fn throttled_listener(&self, generation: u64) -> GazeListener {
        let live = Arc::clone(&self.live);
        let clock = Arc::clone(&self.clock);

        Box::new(move |prediction| {
            let Some(raw) = prediction else {
                return;
            };
            let now = clock.now_millis();
            let mut live = lock_live(&live);
            if !live.accepting || live.generation != generation {
                return;
            }
            if let Some(sample) = live.throttle.offer(raw, now) {
                live.samples.push(sample);
            }
        })
    }

    /// Ends the capture and snapshots the live buffer into the final buffer.
    /// Does nothing (and never touches the capability) when not running.
    pub fn stop(&mut self) {
        if !self.initialized {
            return;
        }

        let (samples, dropped) = {
            let mut live = lock_live(&self.live);
            live.accepting = false;
            (mem::take(&mut live.samples), live.throttle.dropped())
        };

        log_info!(
            "gaze capture stopped: {} samples kept, {} dropped by throttle",
            samples.len(),
            dropped
        );

        self.final_samples = samples;
        self.capability.end();
        self.initialized = false;
    }

    pub fn reset_final_buffer(&mut self) {
        self.final_samples.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn set_calibrated(&mut self, calibrated: bool) {
        self.calibrated = calibrated;
    }

    pub fn final_samples(&self) -> &[GazeSample] {
        &self.final_samples
    }

    pub fn live_samples(&self) -> Vec<GazeSample> {
        lock_live(&self.live).samples.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}

impl Drop for GazeModelLifecycle {
    fn drop(&mut self) {
        self.stop();
    }
}
