use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean earth radius in metres (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = 26.73208)]
    pub latitude: f64,
    #[schema(example = 68.071982)]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite latitude in [-90, 90] and longitude in [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance in metres between two points given in degrees.
pub fn haversine_distance(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Circular boundary around the office point.
#[derive(Debug, Clone, Copy)]
pub struct Geofence {
    pub center: Coordinates,
    pub radius_m: f64,
}

impl Geofence {
    pub fn new(center: Coordinates, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    pub fn distance_to(&self, point: Coordinates) -> f64 {
        haversine_distance(self.center, point)
    }

    /// Returns the distance on success, or the distance that broke the radius.
    pub fn check(&self, point: Coordinates) -> Result<f64, f64> {
        let distance = self.distance_to(point);
        // NaN on either side fails the fence
        if distance <= self.radius_m {
            Ok(distance)
        } else {
            Err(distance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office() -> Geofence {
        Geofence::new(Coordinates::new(26.73208, 68.071982), 200.0)
    }

    #[test]
    fn identical_points_are_zero_apart() {
        let p = Coordinates::new(26.73208, 68.071982);
        assert_eq!(haversine_distance(p, p), 0.0);
        assert_eq!(office().check(p), Ok(0.0));
    }

    #[test]
    fn point_outside_office_radius_is_rejected() {
        let distance = office()
            .check(Coordinates::new(26.7340, 68.0719))
            .unwrap_err();
        assert!((distance - 220.0).abs() <= 10.0, "distance was {distance}");
    }

    #[test]
    fn small_offsets_scale_linearly() {
        let fence = office();
        let one = fence.distance_to(Coordinates::new(26.73208 + 0.001, 68.071982));
        let two = fence.distance_to(Coordinates::new(26.73208 + 0.002, 68.071982));
        assert!((two / one - 2.0).abs() < 1e-3);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance(Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 1.0);
    }

    #[test]
    fn out_of_range_coordinates_are_invalid() {
        assert!(Coordinates::new(26.73208, 68.071982).is_valid());
        assert!(Coordinates::new(-90.0, 180.0).is_valid());
        assert!(!Coordinates::new(153.26792, 248.071982).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn nan_radius_admits_nothing() {
        let fence = Geofence::new(office().center, f64::NAN);
        assert!(fence.check(office().center).is_err());
    }

    #[test]
    fn boundary_is_inclusive() {
        let fence = office();
        let p = Coordinates::new(26.73308, 68.071982);
        let exact = Geofence::new(fence.center, fence.distance_to(p));
        assert!(exact.check(p).is_ok());
    }
}
