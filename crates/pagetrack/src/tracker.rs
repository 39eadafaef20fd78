//! Per-frame tracking session: decode → lookup → project → scale →
//! stabilize → gate.
//!
//! [`PageTracker`] owns all per-session state (coordinate mapping,
//! stabilizer, gate) and processes one frame at a time to completion;
//! `&mut self` makes the single-worker model explicit and lock-free.
//! Every frame yields a well-formed [`FrameResult`] — the error taxonomy
//! (no match, projection failure, out of bounds) is encoded as result
//! fields, never as panics or exceptions crossing the frame boundary.

use serde::{Deserialize, Serialize};

use crate::gate::{GateConfig, GateStatus, SteadyFrameGate};
use crate::geometry::Quad;
use crate::homography::project_template;
use crate::stabilize::{QuadStabilizer, StabilizerConfig};
use crate::template::TemplateCatalog;
use crate::viewport::{CoordinateSpace, Extent, Rotation, ScaleOffset};

/// Decoder output for one frame: an opaque payload plus the marker's four
/// corners in camera-space pixels, either of which may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeResult {
    pub payload: Option<String>,
    pub corners: Option<Quad>,
}

/// Source frame geometry supplied by the camera layer once per frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: f64,
    pub height: f64,
    pub rotation: Rotation,
}

/// Display/preview geometry supplied by the UI layer on layout change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetGeometry {
    pub width: f64,
    pub height: f64,
}

/// One recorded camera frame: geometry plus decoder output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameObservation {
    pub frame: FrameGeometry,
    pub decode: DecodeResult,
}

/// Capability interface for anything that yields per-frame marker corner
/// observations — a live QR decoder, a contour-based edge detector, or a
/// recorded replay. Selected by configuration, not subclassing.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<FrameObservation>;
}

/// Session tuning: stabilizer and gate constants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub stabilizer: StabilizerConfig,
    pub gate: GateConfig,
}

/// Per-frame detection result consumed by the rendering and capture
/// collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResult {
    /// A payload was decoded and matched a catalog template, and the
    /// projection succeeded.
    pub match_found: bool,
    /// The stabilized page extends beyond the visible display frame.
    /// Suppresses capture without clearing the smoothing state.
    pub out_of_bounds: bool,
    /// Marker corners were degenerate this frame. Treated as no-match for
    /// gating, but worth counting: it indicates tracking instability.
    pub projection_failed: bool,
    pub payload: Option<String>,
    pub template_id: Option<String>,
    /// Stabilized page bounds in camera (analysis) space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_camera: Option<Quad>,
    /// Stabilized page bounds in display space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_display: Option<Quad>,
    /// Marker corners in display space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_display: Option<Quad>,
    /// Rotation applied when reconciling camera and display space.
    pub rotation: Rotation,
    /// Active camera→display mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_offset: Option<ScaleOffset>,
    pub status: GateStatus,
    /// Gate completion fraction in [0, 1].
    pub percentage: f64,
    /// One-shot: the gate completed on this frame.
    pub capture_triggered: bool,
}

impl FrameResult {
    fn unmatched(rotation: Rotation, status: GateStatus, percentage: f64) -> Self {
        Self {
            match_found: false,
            out_of_bounds: false,
            projection_failed: false,
            payload: None,
            template_id: None,
            page_camera: None,
            page_display: None,
            marker_display: None,
            rotation,
            scale_offset: None,
            status,
            percentage,
            capture_triggered: false,
        }
    }
}

/// A single tracking session over one camera stream.
///
/// Create one per scanning session; state never leaks across sessions.
/// Frames are processed strictly one at a time (the caller's frame source
/// is expected to drop frames arriving while one is in flight).
pub struct PageTracker<C> {
    catalog: C,
    config: TrackerConfig,
    space: CoordinateSpace,
    stabilizer: QuadStabilizer,
    gate: SteadyFrameGate,
    capture_requested: bool,
    projection_failures: u64,
}

impl<C: TemplateCatalog> PageTracker<C> {
    pub fn new(catalog: C, config: TrackerConfig) -> Self {
        let stabilizer = QuadStabilizer::new(config.stabilizer.clone());
        let gate = SteadyFrameGate::new(config.gate.clone());
        Self {
            catalog,
            config,
            space: CoordinateSpace::new(),
            stabilizer,
            gate,
            capture_requested: false,
            projection_failures: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Set (or update, on layout change) the display geometry.
    pub fn set_target_geometry(&mut self, target: TargetGeometry) {
        self.space
            .set_target_size(Extent::new(target.width, target.height));
    }

    /// Count of frames dropped to degenerate marker corners this session.
    pub fn projection_failures(&self) -> u64 {
        self.projection_failures
    }

    /// One-shot: true once after the gate completed, until taken.
    pub fn take_capture_request(&mut self) -> bool {
        std::mem::take(&mut self.capture_requested)
    }

    /// Tell the gate the photo pipeline has started; increments are
    /// suppressed until [`finish_capture`](Self::finish_capture).
    pub fn begin_capture(&mut self) {
        self.gate.set_processing(true);
    }

    /// Photo pipeline completed: clear processing and re-arm the gate.
    pub fn finish_capture(&mut self) {
        self.gate.set_processing(false);
        self.gate.reset();
        self.stabilizer.reset();
    }

    /// Process one frame to completion.
    ///
    /// Calling before [`set_target_geometry`](Self::set_target_geometry) is
    /// a call-order bug; debug builds assert, release builds report an
    /// unmatched frame.
    pub fn process_frame(&mut self, frame: &FrameGeometry, decode: &DecodeResult) -> FrameResult {
        self.space
            .set_source_size(Extent::new(frame.width, frame.height));
        self.space.set_rotation(frame.rotation);
        debug_assert!(
            self.space.is_ready(),
            "PageTracker::process_frame called before set_target_geometry"
        );
        self.space.recompute();
        let Some(scale_offset) = self.space.scale_offset() else {
            return self.lost_frame(frame.rotation);
        };

        let (Some(payload), Some(marker)) = (decode.payload.as_deref(), decode.corners) else {
            return self.lost_frame(frame.rotation);
        };
        let Some(template) = self.catalog.lookup(payload) else {
            tracing::debug!(payload, "decoded payload has no catalog template");
            return self.lost_frame(frame.rotation);
        };
        let template_id = template.id.clone();

        let page_camera_raw = match project_template(&marker, &template.page) {
            Ok(q) => q,
            Err(err) => {
                self.projection_failures += 1;
                tracing::warn!(%err, payload, "projection failed, dropping frame");
                let mut result = self.lost_frame(frame.rotation);
                result.projection_failed = true;
                result.payload = Some(payload.to_owned());
                return result;
            }
        };

        // Display-space geometry; the stabilizer runs in display space so
        // its pixel thresholds match what the user sees.
        let page_display_raw = scale_offset.apply_quad(&page_camera_raw);
        let marker_display = scale_offset.apply_quad(&marker);
        let page_display = self.stabilizer.update(&page_display_raw);
        let page_camera = scale_offset.unapply_quad(&page_display);

        let target = self
            .space
            .target_size()
            .unwrap_or(Extent::new(frame.width, frame.height));
        let out_of_bounds = !page_display.is_within(target.width, target.height);
        self.gate.set_out_of_bounds(out_of_bounds);
        if !out_of_bounds {
            self.gate.increment();
        }
        let capture_triggered = self.gate.take_capture_trigger();
        if capture_triggered {
            self.capture_requested = true;
        }

        FrameResult {
            match_found: true,
            out_of_bounds,
            projection_failed: false,
            payload: Some(payload.to_owned()),
            template_id: Some(template_id),
            page_camera: Some(page_camera),
            page_display: Some(page_display),
            marker_display: Some(marker_display),
            rotation: frame.rotation,
            scale_offset: Some(scale_offset),
            status: self.gate.status(),
            percentage: self.gate.percentage(),
            capture_triggered,
        }
    }

    /// A frame with no usable match: clear filter and gate state so stale
    /// geometry never blends into a reacquired marker.
    fn lost_frame(&mut self, rotation: Rotation) -> FrameResult {
        self.stabilizer.reset();
        self.gate.reset();
        FrameResult::unmatched(rotation, self.gate.status(), self.gate.percentage())
    }
}

/// Drain a frame source through a tracker, collecting per-frame results.
pub fn run_frames<C: TemplateCatalog, S: FrameSource>(
    tracker: &mut PageTracker<C>,
    source: &mut S,
) -> Vec<FrameResult> {
    let mut results = Vec::new();
    while let Some(obs) = source.next_frame() {
        results.push(tracker.process_frame(&obs.frame, &obs.decode));
    }
    results
}
