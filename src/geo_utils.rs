//! Geographic utilities: bounding boxes and distances.

use crate::{Bounds, GeoPoint};

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Check whether `point` lies inside the box spanned by `bottom_left` and
/// `top_right`. Both edges are inclusive. No antimeridian handling: quest
/// zones are small and local.
pub fn in_bounding_box(bottom_left: &GeoPoint, top_right: &GeoPoint, point: &GeoPoint) -> bool {
    let lng_in_range =
        point.longitude >= bottom_left.longitude && point.longitude <= top_right.longitude;
    let lat_in_range =
        point.latitude >= bottom_left.latitude && point.latitude <= top_right.latitude;
    lng_in_range && lat_in_range
}

/// Min/max bounds over `points`.
///
/// Returns [`Bounds::ZERO`] for an empty slice. That placeholder is what the
/// area check treats as "waypoints not resolved yet".
pub fn compute_bounds(points: &[GeoPoint]) -> Bounds {
    Bounds::from_points(points).unwrap_or(Bounds::ZERO)
}

/// Grow `bounds` by `margin` degrees on all four sides.
pub fn expand_bounds(bounds: &Bounds, margin: f64) -> Bounds {
    Bounds {
        min_lng: bounds.min_lng - margin,
        max_lng: bounds.max_lng + margin,
        min_lat: bounds.min_lat - margin,
        max_lat: bounds.max_lat + margin,
    }
}

/// Great-circle distance between two points in meters.
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let delta_lat = (p2.latitude - p1.latitude).to_radians();
    let delta_lng = (p2.longitude - p1.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lng_lat(lng: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lat, lng)
    }

    #[test]
    fn test_in_bounding_box_inclusive_edges() {
        let bl = lng_lat(10.0, 10.0);
        let tr = lng_lat(20.0, 20.0);

        assert!(in_bounding_box(&bl, &tr, &lng_lat(15.0, 15.0)));
        assert!(in_bounding_box(&bl, &tr, &lng_lat(10.0, 10.0)));
        assert!(in_bounding_box(&bl, &tr, &lng_lat(20.0, 20.0)));
        assert!(in_bounding_box(&bl, &tr, &lng_lat(10.0, 20.0)));
        assert!(in_bounding_box(&bl, &tr, &lng_lat(15.0, 10.0)));

        assert!(!in_bounding_box(&bl, &tr, &lng_lat(9.999, 15.0)));
        assert!(!in_bounding_box(&bl, &tr, &lng_lat(15.0, 20.001)));
        assert!(!in_bounding_box(&bl, &tr, &lng_lat(100.0, 100.0)));
    }

    #[test]
    fn test_compute_bounds_empty_is_zero() {
        assert_eq!(compute_bounds(&[]), Bounds::ZERO);
    }

    #[test]
    fn test_compute_bounds_contains_every_point() {
        let points = vec![
            lng_lat(139.7967, 35.7148),
            lng_lat(139.8107, 35.7101),
            lng_lat(139.7745, 35.7138),
            lng_lat(139.7920, 35.6995),
            lng_lat(-0.1278, 51.5074),
        ];
        let bounds = compute_bounds(&points);

        assert!(bounds.min_lng <= bounds.max_lng);
        assert!(bounds.min_lat <= bounds.max_lat);
        for p in &points {
            assert!(bounds.contains(p), "{:?} outside {:?}", p, bounds);
        }
        assert_eq!(bounds.min_lng, -0.1278);
        assert_eq!(bounds.max_lat, 51.5074);
    }

    #[test]
    fn test_compute_bounds_single_point() {
        let p = lng_lat(139.7967, 35.7148);
        let bounds = compute_bounds(&[p]);
        assert_eq!(bounds.min_lng, bounds.max_lng);
        assert_eq!(bounds.min_lat, bounds.max_lat);
        assert!(bounds.contains(&p));
    }

    #[test]
    fn test_expand_bounds_is_symmetric() {
        let bounds = Bounds {
            min_lng: 10.0,
            max_lng: 20.0,
            min_lat: 30.0,
            max_lat: 40.0,
        };
        let expanded = expand_bounds(&bounds, 0.5);
        assert_eq!(expanded.min_lng, 9.5);
        assert_eq!(expanded.max_lng, 20.5);
        assert_eq!(expanded.min_lat, 29.5);
        assert_eq!(expanded.max_lat, 40.5);
    }

    #[test]
    fn test_haversine_distance() {
        let asakusa = GeoPoint::new(35.7148, 139.7967);
        assert!(haversine_distance(&asakusa, &asakusa) < 1e-6);

        // 0.001 degree of latitude is ~111m
        let north = GeoPoint::new(35.7158, 139.7967);
        let d = haversine_distance(&asakusa, &north);
        assert!((d - 111.2).abs() < 1.0, "distance was {}", d);
    }
}
