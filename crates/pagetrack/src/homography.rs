//! Unit-square homography estimation and template projection.
//!
//! The marker's four observed corners define a plane-to-image perspective
//! transform. Because exactly four correspondences are given, the system is
//! solved exactly (8 equations, 8 unknowns, h22 = 1) — no least squares and
//! no normalization pass are needed. Template corners live in marker-unit
//! space (the marker occupies the unit square), so projecting them through
//! this homography yields page corners in camera space with correct
//! perspective foreshortening.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::geometry::{Point, Quad};

/// Homography below this |w| is treated as projecting to infinity.
const MIN_PROJECTIVE_W: f64 = 1e-12;

/// Determinant below this magnitude marks the 8x8 solve as singular.
const MIN_SYSTEM_PIVOT: f64 = 1e-12;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// Marker corners are collinear or coincident; the homography is singular.
    DegenerateCorners,
    /// A template corner projected to (or beyond) the plane at infinity.
    PointAtInfinity,
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateCorners => write!(f, "degenerate marker corners"),
            Self::PointAtInfinity => write!(f, "template corner projects to infinity"),
        }
    }
}

impl std::error::Error for ProjectionError {}

// ── Projection ───────────────────────────────────────────────────────────

/// Project a 2D point through a 3×3 homography: H * [x, y, 1]^T → [u, v].
pub fn homography_project(h: &Matrix3<f64>, p: Point) -> Result<Point, ProjectionError> {
    let v = h * Vector3::new(p.x, p.y, 1.0);
    if v[2].abs() < MIN_PROJECTIVE_W {
        return Err(ProjectionError::PointAtInfinity);
    }
    Ok(Point::new(v[0] / v[2], v[1] / v[2]))
}

// ── Estimation ───────────────────────────────────────────────────────────

/// Solve the homography mapping the unit square onto `marker`.
///
/// Correspondences: (0,0)→TL, (1,0)→TR, (1,1)→BR, (0,1)→BL.
pub fn unit_square_to_quad(marker: &Quad) -> Result<Matrix3<f64>, ProjectionError> {
    let src = [
        Point::new(0.0, 0.0),
        Point::new(1.0, 0.0),
        Point::new(1.0, 1.0),
        Point::new(0.0, 1.0),
    ];
    let dst = marker.corners();

    // Each correspondence contributes two rows of A h = b with h22 fixed
    // to 1: [x y 1 0 0 0 -x*u -y*u] and [0 0 0 x y 1 -x*v -y*v].
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let r = 2 * i;
        a[(r, 0)] = s.x;
        a[(r, 1)] = s.y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -s.x * d.x;
        a[(r, 7)] = -s.y * d.x;
        b[r] = d.x;

        a[(r + 1, 3)] = s.x;
        a[(r + 1, 4)] = s.y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -s.x * d.y;
        a[(r + 1, 7)] = -s.y * d.y;
        b[r + 1] = d.y;
    }

    let lu = a.lu();
    if lu.determinant().abs() < MIN_SYSTEM_PIVOT {
        return Err(ProjectionError::DegenerateCorners);
    }
    let h = lu.solve(&b).ok_or(ProjectionError::DegenerateCorners)?;

    Ok(Matrix3::new(
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
    ))
}

/// Project a page template (marker-unit space) into camera space through the
/// homography anchored on the observed marker corners.
pub fn project_template(marker: &Quad, template: &Quad) -> Result<Quad, ProjectionError> {
    let h = unit_square_to_quad(marker)?;
    Ok(Quad::new(
        homography_project(&h, template.top_left)?,
        homography_project(&h, template.top_right)?,
        homography_project(&h, template.bottom_right)?,
        homography_project(&h, template.bottom_left)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::geometry::Rect;

    fn assert_point_eq(a: Point, b: Point, eps: f64) {
        assert_relative_eq!(a.x, b.x, epsilon = eps);
        assert_relative_eq!(a.y, b.y, epsilon = eps);
    }

    fn unit_square() -> Quad {
        Quad::from_rect(Rect {
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        })
    }

    #[test]
    fn unit_square_round_trip_reproduces_marker() {
        let marker = Quad::new(
            Point::new(120.3, 80.7),
            Point::new(260.1, 95.2),
            Point::new(250.8, 230.4),
            Point::new(110.5, 210.9),
        );
        let h = unit_square_to_quad(&marker).unwrap();
        let src = unit_square().corners();
        for (s, expected) in src.iter().zip(marker.corners().iter()) {
            let p = homography_project(&h, *s).unwrap();
            assert_point_eq(p, *expected, 1e-9);
        }
    }

    #[test]
    fn identity_marker_gives_identity_projection() {
        let marker = unit_square();
        let template = Quad::new(
            Point::new(-0.5, -2.0),
            Point::new(3.5, -2.0),
            Point::new(3.5, 4.0),
            Point::new(-0.5, 4.0),
        );
        let page = project_template(&marker, &template).unwrap();
        for (got, want) in page.corners().iter().zip(template.corners().iter()) {
            assert_point_eq(*got, *want, 1e-9);
        }
    }

    #[test]
    fn axis_aligned_marker_scales_template() {
        // Marker at (100,100)-(200,200): the homography is a pure
        // scale+translate, so template corners map affinely.
        let marker = Quad::from_rect(Rect {
            left: 100.0,
            top: 100.0,
            right: 200.0,
            bottom: 200.0,
        });
        let template = Quad::new(
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 3.0),
            Point::new(0.0, 3.0),
        );
        let page = project_template(&marker, &template).unwrap();
        assert_point_eq(page.top_left, Point::new(100.0, 100.0), 1e-9);
        assert_point_eq(page.top_right, Point::new(300.0, 100.0), 1e-9);
        assert_point_eq(page.bottom_right, Point::new(300.0, 400.0), 1e-9);
        assert_point_eq(page.bottom_left, Point::new(100.0, 400.0), 1e-9);
    }

    #[test]
    fn perspective_is_not_affine() {
        // A trapezoid marker must foreshorten the template: the midpoint of
        // the projected top edge is not the affine midpoint.
        let marker = Quad::new(
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(180.0, 200.0),
            Point::new(120.0, 200.0),
        );
        let h = unit_square_to_quad(&marker).unwrap();
        let mid = homography_project(&h, Point::new(0.5, 0.5)).unwrap();
        assert!((mid.x - 150.0).abs() < 1.0);
        assert!((mid.y - 150.0).abs() > 1.0);
    }

    #[test]
    fn collinear_corners_are_degenerate() {
        let marker = Quad::new(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        );
        assert_eq!(
            unit_square_to_quad(&marker).unwrap_err(),
            ProjectionError::DegenerateCorners
        );
    }

    #[test]
    fn coincident_corners_are_degenerate() {
        let p = Point::new(50.0, 50.0);
        let marker = Quad::new(p, p, p, p);
        assert!(unit_square_to_quad(&marker).is_err());
    }
}
