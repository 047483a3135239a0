// src/gps/projection.rs
//! Projection of geodetic fixes onto a local plane around an origin

use super::data::{DecodedFix, GeodeticOrigin, GeodeticPosition, PlanarCoordinate};
use crate::error::ProjectionError;

/// Radius of the spherical earth model in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Bearing and haversine-distance projector on a sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticProjector {
    radius: f64,
}

impl Default for GeodeticProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl GeodeticProjector {
    pub fn new() -> Self {
        Self {
            radius: EARTH_RADIUS_M,
        }
    }

    pub fn with_radius(radius: f64) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Project a decoded fix, failing if it carries no coordinates
    pub fn project(
        &self,
        fix: &DecodedFix,
        origin: GeodeticOrigin,
    ) -> Result<PlanarCoordinate, ProjectionError> {
        let position = fix.position.ok_or(ProjectionError::NoFix)?;
        Ok(self.project_position(position, origin))
    }

    /// Project a position: `x = d·sin(θ)`, `y = d·cos(θ)` with `d` the
    /// haversine distance from the origin and `θ` the bearing angle.
    pub fn project_position(
        &self,
        position: GeodeticPosition,
        origin: GeodeticOrigin,
    ) -> PlanarCoordinate {
        let lat0 = origin.lat0_deg.to_radians();
        let lon0 = origin.lon0_deg.to_radians();
        let lat = position.latitude_deg.to_radians();
        let lon = position.longitude_deg.to_radians();

        let delta_lat = lat - lat0;
        let delta_lon = lon - lon0;

        // The east term pairs sin(Δλ) with cos of the fix longitude, not the
        // textbook cos(φ). Outputs must match recorded tracks, so keep it.
        let bx = lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * delta_lon.cos();
        let by = delta_lon.sin() * lon.cos();
        let theta = by.atan2(bx);

        let h = (delta_lat / 2.0).sin().powi(2)
            + lat0.cos() * lat.cos() * (delta_lon / 2.0).sin().powi(2);
        let distance = self.radius * central_angle(h);

        if distance == 0.0 {
            return PlanarCoordinate::new(0.0, 0.0);
        }

        PlanarCoordinate::new(distance * theta.sin(), distance * theta.cos())
    }

    /// Great-circle distance in meters between two positions
    pub fn distance(&self, from: GeodeticPosition, to: GeodeticPosition) -> f64 {
        let lat0 = from.latitude_deg.to_radians();
        let lat = to.latitude_deg.to_radians();
        let delta_lat = lat - lat0;
        let delta_lon = to.longitude_deg.to_radians() - from.longitude_deg.to_radians();

        let h = (delta_lat / 2.0).sin().powi(2)
            + lat0.cos() * lat.cos() * (delta_lon / 2.0).sin().powi(2);
        self.radius * central_angle(h)
    }
}

/// Central angle `2·asin(√h)` for a haversine value `h`.
///
/// Rounding can push `h` slightly outside `[0, 1]` near antipodal points;
/// it is clamped so the result is always finite.
fn central_angle(h: f64) -> f64 {
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::data::TimeOfDay;
    use std::f64::consts::PI;

    fn project(lat0: f64, lon0: f64, lat: f64, lon: f64) -> PlanarCoordinate {
        GeodeticProjector::new()
            .project_position(GeodeticPosition::new(lat, lon), GeodeticOrigin::new(lat0, lon0))
    }

    #[test]
    fn test_fix_at_origin_is_zero() {
        for (lat, lon) in [(0.0, 0.0), (48.1173, 11.5167), (-42.3, -171.9), (89.9, 179.0)] {
            let coord = project(lat, lon, lat, lon);
            assert_eq!(coord, PlanarCoordinate::new(0.0, 0.0));
            assert!(coord.x.is_sign_positive() && coord.y.is_sign_positive());
        }
    }

    #[test]
    fn test_one_degree_north() {
        let coord = project(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_M * PI / 180.0;

        assert!(coord.y > 0.0);
        assert!(coord.x.abs() < 1e-9);
        assert!((coord.y - expected).abs() < 1e-6);
        assert!((coord.y - 111_195.0).abs() < 1.0);
    }

    #[test]
    fn test_one_degree_east_and_south() {
        let east = project(0.0, 0.0, 0.0, 1.0);
        assert!(east.x > 0.0);
        assert!(east.y.abs() < 1e-6);
        assert!((east.distance() - 111_194.93).abs() < 0.1);

        let south = project(0.0, 0.0, -1.0, 0.0);
        assert!(south.y < 0.0);
        assert!(south.x.abs() < 1e-9);
    }

    #[test]
    fn test_matches_reference_formula() {
        // Same construction written out inline
        let (lat0, lon0, lat, lon) = (42.0_f64, -8.0_f64, 42.01_f64, -7.99_f64);
        let coord = project(lat0, lon0, lat, lon);

        let (p0, l0, p, l) = (lat0.to_radians(), lon0.to_radians(), lat.to_radians(), lon.to_radians());
        let bx = p0.cos() * p.sin() - p0.sin() * p.cos() * (l - l0).cos();
        let by = (l - l0).sin() * l.cos();
        let theta = by.atan2(bx);
        let h = ((p - p0) / 2.0).sin().powi(2) + p0.cos() * p.cos() * ((l - l0) / 2.0).sin().powi(2);
        let d = 2.0 * EARTH_RADIUS_M * h.sqrt().asin();

        assert_eq!(coord.x, d * theta.sin());
        assert_eq!(coord.y, d * theta.cos());
    }

    #[test]
    fn test_distance_preserved_by_projection() {
        let projector = GeodeticProjector::new();
        let origin = GeodeticPosition::new(42.2, -8.7);
        let fix = GeodeticPosition::new(42.25, -8.6);

        let coord = projector.project_position(fix, origin.into());
        assert!((coord.distance() - projector.distance(origin, fix)).abs() < 1e-6);
    }

    #[test]
    fn test_project_without_fix() {
        let fix = DecodedFix::new(None, Some(TimeOfDay::new(1, 2, 3)));
        let result = GeodeticProjector::new().project(&fix, GeodeticOrigin::new(0.0, 0.0));
        assert_eq!(result, Err(ProjectionError::NoFix));
    }

    #[test]
    fn test_central_angle_clamps() {
        assert!((central_angle(1.0 + 1e-15) - PI).abs() < 1e-15);
        assert!((central_angle(1.0) - PI).abs() < 1e-15);
        assert_eq!(central_angle(-1e-18), 0.0);
        assert!(!(2.0 * (1.0_f64 + 1e-15).sqrt().asin()).is_finite());
    }

    #[test]
    fn test_antipodal_points_are_finite() {
        let projector = GeodeticProjector::new();
        let half_circumference = PI * EARTH_RADIUS_M;

        let cases = [
            (0.0, 0.0, 0.0, 180.0),
            (0.0, 0.0, 0.0, -180.0),
            (45.0, 10.0, -45.0, -170.0),
            (90.0, 0.0, -90.0, 0.0),
            (12.345_678, 98.765_432, -12.345_678, -81.234_568),
            (-33.9, 151.2, 33.9, -28.8),
        ];

        for (lat0, lon0, lat, lon) in cases {
            let coord = project(lat0, lon0, lat, lon);
            assert!(coord.x.is_finite() && coord.y.is_finite(), "{:?}", (lat0, lon0, lat, lon));
            let distance = projector.distance(
                GeodeticPosition::new(lat0, lon0),
                GeodeticPosition::new(lat, lon),
            );
            assert!(distance.is_finite());
            assert!((distance - half_circumference).abs() < 1.0);
        }
    }

    #[test]
    fn test_custom_radius_scales_output() {
        let unit = GeodeticProjector::with_radius(1.0);
        let coord = unit.project_position(GeodeticPosition::new(1.0, 0.0), GeodeticOrigin::new(0.0, 0.0));
        assert!((coord.y - PI / 180.0).abs() < 1e-15);
        assert_eq!(unit.radius(), 1.0);
    }
}
