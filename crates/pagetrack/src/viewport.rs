//! Sensor-to-display coordinate reconciliation.
//!
//! Camera frames are analyzed at sensor resolution while the overlay is
//! drawn at display resolution; the two differ in size, aspect ratio and
//! rotation. [`CoordinateSpace`] computes the aspect-fill (center-crop)
//! mapping between them: a single uniform scale plus a signed crop offset,
//! recomputed lazily only when one of its inputs changes.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Quad};

/// Frame rotation reported by the camera layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Build from a degree value; anything outside {0, 90, 180, 270} is `None`.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// True when the rotation transposes width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Width/height extent of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// Affine map from source pixel space to target pixel space: uniform scale
/// plus an additive crop offset (in source-space units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleOffset {
    pub scale: f64,
    pub offset: Point,
}

impl ScaleOffset {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: Point { x: 0.0, y: 0.0 },
    };

    /// Map a source-space point into target space.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset.x) * self.scale,
            (p.y - self.offset.y) * self.scale,
        )
    }

    /// Map a whole quad into target space.
    pub fn apply_quad(&self, q: &Quad) -> Quad {
        q.map(|p| self.apply(p))
    }

    /// Inverse of [`apply`](Self::apply): map a target-space point back
    /// into source space.
    pub fn unapply(&self, p: Point) -> Point {
        Point::new(
            p.x / self.scale + self.offset.x,
            p.y / self.scale + self.offset.y,
        )
    }

    /// Map a target-space quad back into source space.
    pub fn unapply_quad(&self, q: &Quad) -> Quad {
        q.map(|p| self.unapply(p))
    }
}

/// Lazily-recomputed aspect-fill mapping between a source frame (sensor /
/// analysis resolution, possibly rotated) and a target frame (display).
///
/// All three inputs must be set before [`CoordinateSpace::scale_offset`]
/// returns a value; setters mark the state dirty and [`recompute`] is a
/// no-op when nothing changed.
///
/// [`recompute`]: CoordinateSpace::recompute
#[derive(Debug, Clone, Default)]
pub struct CoordinateSpace {
    source: Option<Extent>,
    target: Option<Extent>,
    rotation: Option<Rotation>,
    dirty: bool,
    cached: Option<ScaleOffset>,
}

impl CoordinateSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source_size(&mut self, source: Extent) {
        if self.source != Some(source) {
            self.source = Some(source);
            self.dirty = true;
        }
    }

    pub fn set_target_size(&mut self, target: Extent) {
        if self.target != Some(target) {
            self.target = Some(target);
            self.dirty = true;
        }
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        if self.rotation != Some(rotation) {
            self.rotation = Some(rotation);
            self.dirty = true;
        }
    }

    /// True once source size, target size and rotation have all been set.
    pub fn is_ready(&self) -> bool {
        self.source.is_some() && self.target.is_some() && self.rotation.is_some()
    }

    /// Recompute the cached mapping if any input changed since the last call.
    pub fn recompute(&mut self) {
        if !self.dirty && self.cached.is_some() {
            return;
        }
        let (Some(source), Some(target), Some(rotation)) =
            (self.source, self.target, self.rotation)
        else {
            return;
        };
        self.cached = Some(aspect_fill(source, target, rotation));
        self.dirty = false;
    }

    /// The current mapping, or `None` before all inputs are set.
    pub fn scale_offset(&self) -> Option<ScaleOffset> {
        self.cached
    }

    /// The current mapping. Calling before [`is_ready`](Self::is_ready) and
    /// [`recompute`](Self::recompute) is a call-order bug in the caller.
    pub fn scale_offset_unchecked(&self) -> ScaleOffset {
        debug_assert!(
            self.cached.is_some(),
            "CoordinateSpace queried before source/target/rotation were set"
        );
        self.cached.unwrap_or(ScaleOffset::IDENTITY)
    }

    pub fn rotation(&self) -> Option<Rotation> {
        self.rotation
    }

    pub fn target_size(&self) -> Option<Extent> {
        self.target
    }
}

/// Aspect-fill (center-crop) mapping: scale the source uniformly so it
/// fully covers the target, cropping the overflowing axis symmetrically.
/// The crop offset is expressed in source-space units.
fn aspect_fill(source: Extent, target: Extent, rotation: Rotation) -> ScaleOffset {
    // A 90/270 rotation transposes the sensor frame before it is compared
    // against the display.
    let source = if rotation.swaps_axes() {
        Extent::new(source.height, source.width)
    } else {
        source
    };

    if source.aspect() > target.aspect() {
        // Source is wider: match heights, crop horizontally.
        let scale = target.height / source.height;
        let crop = (source.width * scale - target.width) / 2.0 / scale;
        ScaleOffset {
            scale,
            offset: Point::new(crop, 0.0),
        }
    } else {
        // Source is taller (or equal): match widths, crop vertically.
        let scale = target.width / source.width;
        let crop = (source.height * scale - target.height) / 2.0 / scale;
        ScaleOffset {
            scale,
            offset: Point::new(0.0, crop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ready_space(source: Extent, target: Extent, rotation: Rotation) -> CoordinateSpace {
        let mut cs = CoordinateSpace::new();
        cs.set_source_size(source);
        cs.set_target_size(target);
        cs.set_rotation(rotation);
        cs.recompute();
        cs
    }

    #[test]
    fn not_ready_until_all_inputs_set() {
        let mut cs = CoordinateSpace::new();
        assert!(!cs.is_ready());
        cs.set_source_size(Extent::new(100.0, 100.0));
        cs.set_target_size(Extent::new(200.0, 200.0));
        assert!(!cs.is_ready());
        cs.recompute();
        assert!(cs.scale_offset().is_none());
        cs.set_rotation(Rotation::Deg0);
        assert!(cs.is_ready());
    }

    #[test]
    fn matching_aspect_has_no_crop() {
        let cs = ready_space(
            Extent::new(300.0, 300.0),
            Extent::new(600.0, 600.0),
            Rotation::Deg0,
        );
        let so = cs.scale_offset().unwrap();
        assert_relative_eq!(so.scale, 2.0);
        assert_relative_eq!(so.offset.x, 0.0);
        assert_relative_eq!(so.offset.y, 0.0);
    }

    #[test]
    fn identity_when_sizes_match() {
        let cs = ready_space(
            Extent::new(300.0, 300.0),
            Extent::new(300.0, 300.0),
            Rotation::Deg0,
        );
        assert_eq!(cs.scale_offset().unwrap(), ScaleOffset::IDENTITY);
    }

    #[test]
    fn wider_source_crops_horizontally() {
        // 200x100 source into 100x100 target: scale 1.0, crop 50 off each side.
        let cs = ready_space(
            Extent::new(200.0, 100.0),
            Extent::new(100.0, 100.0),
            Rotation::Deg0,
        );
        let so = cs.scale_offset().unwrap();
        assert_relative_eq!(so.scale, 1.0);
        assert_relative_eq!(so.offset.x, 50.0);
        assert_relative_eq!(so.offset.y, 0.0);
    }

    #[test]
    fn taller_source_crops_vertically() {
        let cs = ready_space(
            Extent::new(100.0, 200.0),
            Extent::new(100.0, 100.0),
            Rotation::Deg0,
        );
        let so = cs.scale_offset().unwrap();
        assert_relative_eq!(so.scale, 1.0);
        assert_relative_eq!(so.offset.x, 0.0);
        assert_relative_eq!(so.offset.y, 50.0);
    }

    #[test]
    fn rotation_90_swaps_source_axes() {
        // Portrait sensor 1080x1920 rotated 90° behaves as landscape
        // 1920x1080 against a landscape 1920x1080 display: exact cover.
        let cs = ready_space(
            Extent::new(1080.0, 1920.0),
            Extent::new(1920.0, 1080.0),
            Rotation::Deg90,
        );
        let so = cs.scale_offset().unwrap();
        assert_relative_eq!(so.scale, 1.0);
        assert_relative_eq!(so.offset.x, 0.0);
        assert_relative_eq!(so.offset.y, 0.0);
    }

    #[test]
    fn recompute_is_lazy() {
        let mut cs = ready_space(
            Extent::new(100.0, 100.0),
            Extent::new(100.0, 100.0),
            Rotation::Deg0,
        );
        let before = cs.scale_offset().unwrap();
        // Same values: no dirty flag, recompute keeps the cache.
        cs.set_source_size(Extent::new(100.0, 100.0));
        cs.recompute();
        assert_eq!(cs.scale_offset().unwrap(), before);

        cs.set_target_size(Extent::new(200.0, 200.0));
        cs.recompute();
        assert_relative_eq!(cs.scale_offset().unwrap().scale, 2.0);
    }

    #[test]
    fn apply_quad_scales_and_offsets() {
        let so = ScaleOffset {
            scale: 2.0,
            offset: Point::new(10.0, 0.0),
        };
        let q = crate::geometry::Quad::new(
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
        );
        let mapped = so.apply_quad(&q);
        assert_relative_eq!(mapped.top_left.x, 0.0);
        assert_relative_eq!(mapped.top_right.x, 20.0);
        assert_relative_eq!(mapped.bottom_right.y, 20.0);
    }
}
