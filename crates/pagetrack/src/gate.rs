//! Capture gating over consecutive stable detections.
//!
//! A single matched frame is no reason to fire the camera: the gate counts
//! consecutive in-bounds matches and only triggers capture once the counter
//! reaches its required length. The hysteresis also keeps the user-facing
//! status from flickering between "hold steady" and "not found" on isolated
//! bad frames.

use serde::{Deserialize, Serialize};

/// Gate tuning constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Consecutive matched frames required before capture fires.
    pub required_frames: u32,
    /// Completion fraction above which status switches from
    /// [`GateStatus::HoldSteady`] to [`GateStatus::Capturing`].
    pub capturing_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            required_frames: 30,
            capturing_threshold: 0.33,
        }
    }
}

/// User-visible gate status, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Photo pipeline is running; increments are ignored.
    Processing,
    /// Tracked page extends beyond the visible frame.
    OutOfBounds,
    /// Enough consecutive matches that capture is imminent.
    Capturing,
    /// Matching, but not yet stable for long enough.
    HoldSteady,
    /// No current match.
    NotFound,
}

impl GateStatus {
    /// Status line shown to the user while scanning.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Processing => "Processing…",
            Self::OutOfBounds => "Move the document into the frame",
            Self::Capturing => "Hold still…",
            Self::HoldSteady => "Keep the marker steady",
            Self::NotFound => "Looking for a marker",
        }
    }
}

/// Hysteresis counter that converts sustained detection into a one-shot
/// capture trigger.
#[derive(Debug, Clone)]
pub struct SteadyFrameGate {
    config: GateConfig,
    count: u32,
    percentage: f64,
    processing: bool,
    out_of_bounds: bool,
    capture_pending: bool,
}

impl SteadyFrameGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            count: 0,
            percentage: 0.0,
            processing: false,
            out_of_bounds: false,
            capture_pending: false,
        }
    }

    /// Record one matched, in-bounds frame. No-op while processing or out
    /// of bounds. Fires the capture trigger exactly once when the counter
    /// completes.
    pub fn increment(&mut self) {
        if self.processing || self.out_of_bounds {
            return;
        }
        if self.count < self.config.required_frames {
            self.count += 1;
            self.percentage = f64::from(self.count) / f64::from(self.config.required_frames);
            if self.count == self.config.required_frames {
                self.capture_pending = true;
            }
        }
    }

    /// Completion fraction in [0, 1].
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn status(&self) -> GateStatus {
        if self.processing {
            GateStatus::Processing
        } else if self.out_of_bounds {
            GateStatus::OutOfBounds
        } else if self.count == 0 {
            GateStatus::NotFound
        } else if self.percentage > self.config.capturing_threshold {
            GateStatus::Capturing
        } else {
            GateStatus::HoldSteady
        }
    }

    /// Take the one-shot capture trigger, if armed. The caller is expected
    /// to set [`set_processing`](Self::set_processing) before starting the
    /// photo pipeline.
    pub fn take_capture_trigger(&mut self) -> bool {
        std::mem::take(&mut self.capture_pending)
    }

    /// Mark the photo pipeline as running/finished. While set, increments
    /// and out-of-bounds flags are suppressed and survive `reset()`.
    pub fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Flag the current frame's geometry as (not) fully visible. Ignored
    /// while processing. Going out of bounds zeroes the steady counter;
    /// the marker is still tracked, so only the count restarts.
    pub fn set_out_of_bounds(&mut self, out_of_bounds: bool) {
        if self.processing {
            return;
        }
        if out_of_bounds && !self.out_of_bounds {
            self.count = 0;
            self.percentage = 0.0;
            self.capture_pending = false;
        }
        self.out_of_bounds = out_of_bounds;
    }

    /// Zero the counter and clear out-of-bounds. The processing flag is
    /// preserved until explicitly cleared.
    pub fn reset(&mut self) {
        self.count = 0;
        self.percentage = 0.0;
        self.out_of_bounds = false;
        self.capture_pending = false;
    }
}
