//! In-process gaze capability fed from recorded predictions.
//!
//! Used by the replay driver to push captured browser sessions back through
//! the pipeline, and by tests as a scripted stand-in for the camera model.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::RawGaze;

use super::capability::{GazeCapability, GazeListener, Regression};

#[derive(Default)]
struct ReplayShared {
    listener: Option<GazeListener>,
    running: bool,
    begin_calls: usize,
    end_calls: usize,
    regression: Option<Regression>,
    preview_visible: Option<bool>,
}

fn lock_shared(shared: &Mutex<ReplayShared>) -> MutexGuard<'_, ReplayShared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct ReplayCapability {
    loaded: bool,
    begin_failure: Option<String>,
    shared: Arc<Mutex<ReplayShared>>,
}

/// Producer side of a [`ReplayCapability`]; cheap to clone.
#[derive(Clone)]
pub struct ReplayHandle {
    shared: Arc<Mutex<ReplayShared>>,
}

impl ReplayCapability {
    pub fn new() -> (Self, ReplayHandle) {
        Self::build(true, None)
    }

    /// A capability that reports itself as missing from the environment.
    pub fn unloaded() -> (Self, ReplayHandle) {
        Self::build(false, None)
    }

    /// A capability whose `begin()` always fails, e.g. camera permission denied.
    pub fn failing(reason: impl Into<String>) -> (Self, ReplayHandle) {
        Self::build(true, Some(reason.into()))
    }

    fn build(loaded: bool, begin_failure: Option<String>) -> (Self, ReplayHandle) {
        let shared = Arc::new(Mutex::new(ReplayShared::default()));
        (
            Self {
                loaded,
                begin_failure,
                shared: Arc::clone(&shared),
            },
            ReplayHandle { shared },
        )
    }
}

#[async_trait]
impl GazeCapability for ReplayCapability {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn configure_regression(&mut self, regression: Regression) {
        lock_shared(&self.shared).regression = Some(regression);
    }

    fn set_listener(&mut self, listener: GazeListener) {
        lock_shared(&self.shared).listener = Some(listener);
    }

    fn show_preview(&mut self, visible: bool) {
        lock_shared(&self.shared).preview_visible = Some(visible);
    }

    async fn begin(&mut self) -> Result<()> {
        let mut shared = lock_shared(&self.shared);
        shared.begin_calls += 1;
        if let Some(reason) = &self.begin_failure {
            return Err(anyhow!("{reason}"));
        }
        shared.running = true;
        Ok(())
    }

    fn end(&mut self) {
        let mut shared = lock_shared(&self.shared);
        shared.end_calls += 1;
        shared.running = false;
    }
}

impl ReplayHandle {
    /// Delivers a prediction to the most recently registered listener.
    /// Delivery does not check `running`, so late predictions after `end()`
    /// reach the listener the way a slow engine's final frames would.
    pub fn emit(&self, raw: RawGaze) {
        self.deliver(Some(raw));
    }

    /// Delivers a frame for which the model had no estimate.
    pub fn emit_empty(&self) {
        self.deliver(None);
    }

    fn deliver(&self, prediction: Option<RawGaze>) {
        let mut shared = lock_shared(&self.shared);
        if let Some(listener) = shared.listener.as_mut() {
            listener(prediction);
        }
    }

    pub fn is_running(&self) -> bool {
        lock_shared(&self.shared).running
    }

    pub fn begin_calls(&self) -> usize {
        lock_shared(&self.shared).begin_calls
    }

    pub fn end_calls(&self) -> usize {
        lock_shared(&self.shared).end_calls
    }

    pub fn regression(&self) -> Option<Regression> {
        lock_shared(&self.shared).regression
    }

    pub fn preview_visible(&self) -> Option<bool> {
        lock_shared(&self.shared).preview_visible
    }
}
