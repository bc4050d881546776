use crate::model::attendance::GeoPoint;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters (haversine).
///
/// NaN coordinates propagate to a NaN distance; callers check for a
/// missing location before getting here.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let p = GeoPoint::new(10.0, 106.0);
        assert_eq!(distance_m(p, p), 0.0);
    }

    #[test]
    fn symmetric() {
        let a = GeoPoint::new(10.7769, 106.7009);
        let b = GeoPoint::new(21.0285, 105.8542);
        assert!((distance_m(a, b) - distance_m(b, a)).abs() < 1e-6);
    }

    #[test]
    fn thousandth_of_a_degree_north_is_about_111_m() {
        let office = GeoPoint::new(10.0, 106.0);
        let here = GeoPoint::new(10.001, 106.0);
        let d = distance_m(office, here);
        assert!((d - 111.19).abs() < 1.0, "got {d}");
    }

    #[test]
    fn nan_propagates() {
        let a = GeoPoint::new(f64::NAN, 106.0);
        assert!(distance_m(a, GeoPoint::new(10.0, 106.0)).is_nan());
    }
}
