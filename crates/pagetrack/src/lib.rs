//! pagetrack — marker-anchored page outline tracking.
//!
//! Overlays a stabilized document-page outline on a live camera feed by
//! anchoring on a single planar marker (QR/barcode) per frame, and gates
//! automatic photo capture on sustained, jitter-free detection. The
//! pipeline stages, run once per frame, are:
//!
//! 1. **Viewport** – aspect-fill reconciliation of sensor/analysis space
//!    and display space under device rotation.
//! 2. **Template** – decoded payload → page template lookup (marker-unit
//!    corner geometry).
//! 3. **Homography** – exact unit-square → marker solve; template corners
//!    projected into camera space with correct perspective foreshortening.
//! 4. **Stabilize** – outlier-rejecting exponential smoothing chained with
//!    a fixed-window per-coordinate median filter.
//! 5. **Gate** – steady-frame hysteresis counter that fires a one-shot
//!    capture trigger.
//!
//! Camera acquisition, barcode decoding, rendering and photo persistence
//! are external collaborators; the crate consumes per-frame
//! [`DecodeResult`]/[`FrameGeometry`] values and produces [`FrameResult`]s.
//!
//! # Public API
//! [`PageTracker`] is the primary entry point: one instance per scanning
//! session, fed frames through [`PageTracker::process_frame`] or a
//! [`FrameSource`].

pub mod gate;
pub mod geometry;
pub mod homography;
pub mod stabilize;
pub mod template;
pub mod tracker;
pub mod viewport;

pub use gate::{GateConfig, GateStatus, SteadyFrameGate};
pub use geometry::{Point, Quad, Rect};
pub use homography::{project_template, ProjectionError};
pub use stabilize::{QuadStabilizer, StabilizerConfig, TrackingState};
pub use template::{CatalogError, InMemoryCatalog, PageTemplate, TemplateCatalog};
pub use tracker::{
    run_frames, DecodeResult, FrameGeometry, FrameObservation, FrameResult, FrameSource,
    PageTracker, TargetGeometry, TrackerConfig,
};
pub use viewport::{CoordinateSpace, Extent, Rotation, ScaleOffset};
