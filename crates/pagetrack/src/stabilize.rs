//! Two-stage temporal stabilization of projected page bounds.
//!
//! Raw per-frame projections are noisy: small marker-corner jitter is
//! amplified by the homography into visible page-corner swings. Stage A is
//! outlier-rejecting exponential smoothing — a new estimate whose largest
//! corner displacement exceeds the jump threshold is discarded outright and
//! the previous output is held. Stage B is a fixed-window per-coordinate
//! median over recent Stage-A outputs, trading a few frames of latency for
//! rejecting single-frame spikes that survive the first stage.
//!
//! Both stages share one tracking session; losing the marker resets them
//! together so stale geometry never blends into a reacquired one.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Quad};

/// Stabilizer tuning constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilizerConfig {
    /// Weight of the previous output in the exponential blend;
    /// `out = current * (1 - f) + previous * f`.
    pub smoothing_factor: f64,
    /// Maximum accepted corner displacement (pixels) between consecutive
    /// outputs; larger jumps are rejected and the previous output held.
    pub jump_threshold_px: f64,
    /// Number of recent quads the median filter looks back over.
    pub median_window: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.6,
            jump_threshold_px: 50.0,
            median_window: 5,
        }
    }
}

/// Tracking state of a stabilizer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Tracking,
}

/// Per-session stabilization filter chain.
#[derive(Debug, Clone)]
pub struct QuadStabilizer {
    config: StabilizerConfig,
    previous: Option<Quad>,
    window: VecDeque<Quad>,
}

impl QuadStabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            previous: None,
            window: VecDeque::new(),
        }
    }

    pub fn state(&self) -> TrackingState {
        if self.previous.is_some() {
            TrackingState::Tracking
        } else {
            TrackingState::Idle
        }
    }

    /// Feed one raw estimate; returns the stabilized quad.
    pub fn update(&mut self, estimate: &Quad) -> Quad {
        let smoothed = self.smooth(estimate);
        self.previous = Some(smoothed);
        self.median(smoothed)
    }

    /// Clear both filter stages. Call on any lost frame (no marker, no
    /// template, projection failure) before processing resumes.
    pub fn reset(&mut self) {
        self.previous = None;
        self.window.clear();
    }

    /// Stage A: jump rejection, then per-corner exponential blend.
    fn smooth(&self, estimate: &Quad) -> Quad {
        let Some(previous) = self.previous else {
            return *estimate;
        };
        if estimate.max_corner_displacement(&previous) > self.config.jump_threshold_px {
            return previous;
        }
        let f = self.config.smoothing_factor;
        let blend = |cur: Point, prev: Point| {
            Point::new(cur.x * (1.0 - f) + prev.x * f, cur.y * (1.0 - f) + prev.y * f)
        };
        Quad::new(
            blend(estimate.top_left, previous.top_left),
            blend(estimate.top_right, previous.top_right),
            blend(estimate.bottom_right, previous.bottom_right),
            blend(estimate.bottom_left, previous.bottom_left),
        )
    }

    /// Stage B: push into the bounded window, output the per-coordinate
    /// median. Fewer than two samples pass through unchanged.
    fn median(&mut self, quad: Quad) -> Quad {
        if self.window.len() == self.config.median_window {
            self.window.pop_front();
        }
        self.window.push_back(quad);
        if self.window.len() < 2 {
            return quad;
        }

        let corner = |pick: fn(&Quad) -> Point| {
            let xs: Vec<f64> = self.window.iter().map(|q| pick(q).x).collect();
            let ys: Vec<f64> = self.window.iter().map(|q| pick(q).y).collect();
            Point::new(median_of(xs), median_of(ys))
        };
        Quad::new(
            corner(|q| q.top_left),
            corner(|q| q.top_right),
            corner(|q| q.bottom_right),
            corner(|q| q.bottom_left),
        )
    }
}

/// Median of a non-empty sample; even-length samples average the middle pair.
fn median_of(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
