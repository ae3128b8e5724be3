//! Animation frame scheduling.
//!
//! Passes through to the host's native `requestAnimationFrame` pair when
//! both halves exist. Otherwise falls back to timers spaced no closer than
//! [`FRAME_INTERVAL_MS`] apart, after Erik Möller's polyfill.

use std::cell::Cell;

use serde::Serialize;

/// Minimum spacing of polyfilled frames.
pub const FRAME_INTERVAL_MS: f64 = 16.0;

/// Identifier returned by a frame request, valid for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameId(pub u32);

/// Invoked with the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

pub type TimerCallback = Box<dyn FnOnce()>;

/// Scheduling primitives of the host.
pub trait FrameHost {
    /// Whether both native request and cancel primitives are available.
    fn has_native_frames(&self) -> bool;

    fn request_native_frame(&self, callback: FrameCallback) -> FrameId;

    fn cancel_native_frame(&self, id: FrameId);

    /// Wall-clock time in milliseconds.
    fn now_ms(&self) -> f64;

    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> FrameId;

    fn clear_timeout(&self, id: FrameId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameMode {
    Native,
    Polyfill,
}

/// Uniform `request`/`cancel` over native or polyfilled frames.
pub struct FrameScheduler {
    host: Box<dyn FrameHost>,
    mode: FrameMode,
    last_call: Cell<f64>,
}

impl FrameScheduler {
    pub fn new(host: Box<dyn FrameHost>) -> Self {
        let mode = if host.has_native_frames() {
            FrameMode::Native
        } else {
            FrameMode::Polyfill
        };
        Self {
            host,
            mode,
            last_call: Cell::new(0.0),
        }
    }

    #[must_use]
    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    /// Schedules `callback` for the next frame.
    pub fn request(&self, callback: FrameCallback) -> FrameId {
        match self.mode {
            FrameMode::Native => self.host.request_native_frame(callback),
            FrameMode::Polyfill => {
                let now = self.host.now_ms();
                let delay = (FRAME_INTERVAL_MS - (now - self.last_call.get())).max(0.0);
                let target = now + delay;
                self.last_call.set(target);
                self.host
                    .set_timeout(delay, Box::new(move || callback(target)))
            }
        }
    }

    /// Best-effort cancellation of a pending request.
    pub fn cancel(&self, id: FrameId) {
        match self.mode {
            FrameMode::Native => self.host.cancel_native_frame(id),
            FrameMode::Polyfill => self.host.clear_timeout(id),
        }
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("mode", &self.mode)
            .field("last_call", &self.last_call.get())
            .finish_non_exhaustive()
    }
}
