use std::f64::consts::{FRAC_PI_4, PI, TAU};

use super::Vec2;

/// Scale used when the caller does not pick one.
pub const DEFAULT_MERCATOR_SCALE: f64 = 30.0;

/// Spherical Mercator projection with a configurable center, scale and
/// translation.
///
/// Follows the d3 `geoMercator` convention: the center maps to `translate`,
/// x grows eastward and y grows southward (screen space). Inputs are in
/// degrees. Point longitudes outside `[-180, 180]` are wrapped into it
/// before projecting; the center is used as given.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorProjection {
    /// `[lon_deg, lat_deg]`
    pub center: [f64; 2],
    pub scale: f64,
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    NonFiniteCenter,
    NonFiniteTranslate,
    InvalidScale(f64),
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::NonFiniteCenter => write!(f, "projection center must be finite"),
            ProjectionError::NonFiniteTranslate => {
                write!(f, "projection translate must be finite")
            }
            ProjectionError::InvalidScale(s) => {
                write!(f, "projection scale must be positive and finite, got {s}")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

impl Default for MercatorProjection {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            scale: DEFAULT_MERCATOR_SCALE,
            translate: [0.0, 0.0],
        }
    }
}

impl MercatorProjection {
    pub fn new(center: [f64; 2], scale: f64, translate: [f64; 2]) -> Self {
        Self {
            center,
            scale,
            translate,
        }
    }

    pub fn validate(&self) -> Result<(), ProjectionError> {
        if !(self.center[0].is_finite() && self.center[1].is_finite()) {
            return Err(ProjectionError::NonFiniteCenter);
        }
        if !(self.translate[0].is_finite() && self.translate[1].is_finite()) {
            return Err(ProjectionError::NonFiniteTranslate);
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ProjectionError::InvalidScale(self.scale));
        }
        Ok(())
    }

    /// Projects `(lon_deg, lat_deg)`, or `None` when the result is not finite
    /// (poles, NaN input).
    pub fn try_project(&self, lon_deg: f64, lat_deg: f64) -> Option<Vec2> {
        let (x, y) = mercator_raw(wrap_longitude(lon_deg.to_radians()), lat_deg.to_radians());
        let (cx, cy) = mercator_raw(self.center[0].to_radians(), self.center[1].to_radians());

        let out = Vec2::new(
            self.translate[0] + self.scale * (x - cx),
            self.translate[1] - self.scale * (y - cy),
        );
        out.is_finite().then_some(out)
    }

    /// Projects `(lon_deg, lat_deg)`, falling back to the origin for points
    /// the projection is undefined at.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> Vec2 {
        self.try_project(lon_deg, lat_deg).unwrap_or(Vec2::ZERO)
    }
}

/// Brings `lambda` (radians) into `[-PI, PI]`. Halfway cases round up, so
/// `3 * PI` becomes `-PI`.
fn wrap_longitude(lambda: f64) -> f64 {
    if lambda.abs() > PI {
        lambda - (lambda / TAU + 0.5).floor() * TAU
    } else {
        lambda
    }
}

fn mercator_raw(lambda: f64, phi: f64) -> (f64, f64) {
    (lambda, (FRAC_PI_4 + phi / 2.0).tan().ln())
}

#[cfg(test)]
mod tests {
    use super::{MercatorProjection, ProjectionError};
    use crate::math::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn center_maps_to_translate() {
        let p = MercatorProjection::new([104.0, 37.5], 30.0, [12.0, -4.0]);
        let v = p.project(104.0, 37.5);
        assert_close(v.x, 12.0, 1e-9);
        assert_close(v.y, -4.0, 1e-9);
    }

    #[test]
    fn equator_longitude_is_linear_in_scale() {
        let p = MercatorProjection::default();
        let v = p.project(1.0, 0.0);
        assert_close(v.x, 30.0 * 1f64.to_radians(), 1e-12);
        assert_close(v.y, 0.0, 1e-12);
    }

    #[test]
    fn north_is_negative_y() {
        let p = MercatorProjection::default();
        let v = p.project(0.0, 10.0);
        assert!(v.y < 0.0);
    }

    #[test]
    fn projection_is_bit_identical_across_calls() {
        let p = MercatorProjection::new([116.4, 39.9], 850.0, [3.0, 7.0]);
        let a = p.project(121.47, 31.23);
        let b = p.project(121.47, 31.23);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
    }

    #[test]
    fn degenerate_points_fall_back_to_origin() {
        let p = MercatorProjection::new([0.0, 0.0], 30.0, [5.0, 5.0]);
        assert_eq!(p.try_project(0.0, -90.0), None);
        assert_eq!(p.try_project(f64::NAN, 10.0), None);
        assert_eq!(p.project(0.0, -90.0), Vec2::ZERO);
    }

    #[test]
    fn longitudes_past_the_antimeridian_wrap() {
        let p = MercatorProjection::default();
        for lat in [-45.0, 0.0, 10.0, 60.0] {
            let east = p.project(190.0, lat);
            let west = p.project(-170.0, lat);
            assert_close(east.x, west.x, 1e-9);
            assert_close(east.y, west.y, 1e-9);
        }
        assert_close(p.project(-200.0, 0.0).x, p.project(160.0, 0.0).x, 1e-9);
        assert_close(p.project(370.0, 0.0).x, p.project(10.0, 0.0).x, 1e-9);
    }

    #[test]
    fn antimeridian_itself_is_not_wrapped() {
        let p = MercatorProjection::default();
        assert_close(p.project(180.0, 0.0).x, 30.0 * std::f64::consts::PI, 1e-9);
        assert_close(p.project(-180.0, 0.0).x, -30.0 * std::f64::consts::PI, 1e-9);
    }

    #[test]
    fn center_longitude_is_not_wrapped() {
        let p = MercatorProjection::new([190.0, 0.0], 30.0, [0.0, 0.0]);
        // 190 wraps to -170 for the point but not for the center.
        let v = p.project(190.0, 0.0);
        assert_close(v.x, -30.0 * 360f64.to_radians(), 1e-9);
    }

    #[test]
    fn validate_rejects_bad_scale() {
        let p = MercatorProjection::new([0.0, 0.0], 0.0, [0.0, 0.0]);
        assert_eq!(p.validate(), Err(ProjectionError::InvalidScale(0.0)));
        assert!(MercatorProjection::default().validate().is_ok());
    }
}
