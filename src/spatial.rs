//! Spatial index over a quest's waypoints.
//!
//! Points are stored in a local equirectangular projection (longitude scaled
//! by the cosine of the reference latitude) so that R-tree distances rank
//! the same way ground distances do within a quest zone.

use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::GeoPoint;

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// R-tree of waypoint positions, keyed by their index in the quest path.
#[derive(Debug, Clone)]
pub struct WaypointIndex {
    tree: RTree<IndexedPoint>,
    lng_scale: f64,
}

impl WaypointIndex {
    /// Build the index. The reference latitude is the mean of the points.
    pub fn new(points: &[GeoPoint]) -> Self {
        let lng_scale = if points.is_empty() {
            1.0
        } else {
            let mean_lat = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
            mean_lat.to_radians().cos().max(1e-6)
        };

        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new([p.longitude * lng_scale, p.latitude], i))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
            lng_scale,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    fn project(&self, point: &GeoPoint) -> [f64; 2] {
        [point.longitude * self.lng_scale, point.latitude]
    }

    /// Index of the waypoint closest to `point`.
    pub fn nearest(&self, point: &GeoPoint) -> Option<usize> {
        self.tree.nearest_neighbor(&self.project(point)).map(|e| e.data)
    }

    /// All waypoint indices, closest first.
    pub fn by_distance(&self, point: &GeoPoint) -> Vec<usize> {
        self.tree
            .nearest_neighbor_iter(&self.project(point))
            .map(|e| e.data)
            .collect()
    }

    /// Waypoint indices within `meters` of `point`, closest first.
    pub fn within_meters(&self, point: &GeoPoint, meters: f64) -> Vec<usize> {
        let radius = meters / METERS_PER_DEGREE;
        let query = self.project(point);
        let mut hits: Vec<(f64, usize)> = self
            .tree
            .locate_within_distance(query, radius * radius)
            .map(|e| {
                let [x, y] = *e.geom();
                let d2 = (x - query[0]).powi(2) + (y - query[1]).powi(2);
                (d2, e.data)
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, i)| i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::haversine_distance;

    fn asakusa_points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(35.7119, 139.7953), // Inoko Ramen
            GeoPoint::new(35.7148, 139.7967), // Senso-ji
            GeoPoint::new(35.7106, 139.7982), // Azuma Bridge
            GeoPoint::new(35.7137, 139.7880), // Kappabashi
        ]
    }

    #[test]
    fn test_nearest() {
        let index = WaypointIndex::new(&asakusa_points());
        assert_eq!(index.len(), 4);
        assert_eq!(index.nearest(&GeoPoint::new(35.7150, 139.7970)), Some(1));
        assert_eq!(index.nearest(&GeoPoint::new(35.7135, 139.7870)), Some(3));
    }

    #[test]
    fn test_by_distance_matches_haversine_order() {
        let points = asakusa_points();
        let index = WaypointIndex::new(&points);
        let user = GeoPoint::new(35.7110, 139.7960);

        let order = index.by_distance(&user);
        assert_eq!(order.len(), 4);

        let distances: Vec<f64> = order
            .iter()
            .map(|&i| haversine_distance(&user, &points[i]))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]), "{:?}", distances);
    }

    #[test]
    fn test_within_meters() {
        let index = WaypointIndex::new(&asakusa_points());
        // ~10m north of Senso-ji
        let tap = GeoPoint::new(35.71489, 139.7967);
        assert_eq!(index.within_meters(&tap, 25.0), vec![1]);
        assert!(index.within_meters(&GeoPoint::new(35.70, 139.70), 25.0).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = WaypointIndex::new(&[]);
        assert!(index.is_empty());
        assert_eq!(index.nearest(&GeoPoint::new(0.0, 0.0)), None);
        assert!(index.by_distance(&GeoPoint::new(0.0, 0.0)).is_empty());
    }
}
