//! Deep links to an external maps application.
//!
//! Routing itself is delegated: the host opens the link and forgets about it.

use serde::Serialize;
use url::Url;

use crate::GeoPoint;

const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    Transit,
    Driving,
}

impl TravelMode {
    fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Transit => "transit",
            TravelMode::Driving => "driving",
        }
    }
}

/// A request for directions, handed to the external maps app.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsRequest {
    /// Omitted from the link when unknown; the maps app then uses the
    /// device position.
    pub origin: Option<GeoPoint>,
    pub destination: GeoPoint,
    pub travel_mode: TravelMode,
}

impl DirectionsRequest {
    pub fn new(destination: GeoPoint, origin: Option<GeoPoint>, travel_mode: TravelMode) -> Self {
        Self {
            origin,
            destination,
            travel_mode,
        }
    }

    /// Walking directions from wherever the user is to `destination`.
    pub fn walking_to(destination: GeoPoint, origin: Option<GeoPoint>) -> Self {
        Self::new(destination, origin, TravelMode::Walking)
    }

    /// Universal maps URL for this request.
    pub fn url(&self) -> String {
        let mut url = match Url::parse(DIRECTIONS_BASE_URL) {
            Ok(url) => url,
            Err(_) => return String::new(),
        };
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api", "1");
            if let Some(origin) = &self.origin {
                pairs.append_pair("origin", &lat_lng(origin));
            }
            pairs.append_pair("destination", &lat_lng(&self.destination));
            pairs.append_pair("travelmode", self.travel_mode.as_str());
        }
        url.into()
    }
}

fn lat_lng(point: &GeoPoint) -> String {
    format!("{},{}", point.latitude, point.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walking_url() {
        let request = DirectionsRequest::walking_to(GeoPoint::new(35.7119, 139.7953), None);
        assert_eq!(
            request.url(),
            "https://www.google.com/maps/dir/?api=1&destination=35.7119%2C139.7953&travelmode=walking"
        );
    }

    #[test]
    fn test_travel_mode_in_url() {
        let destination = GeoPoint::new(35.7148, 139.7967);
        for (mode, expected) in [
            (TravelMode::Transit, "transit"),
            (TravelMode::Driving, "driving"),
        ] {
            let url = Url::parse(&DirectionsRequest::new(destination, None, mode).url()).unwrap();
            let travelmode = url
                .query_pairs()
                .find(|(k, _)| k == "travelmode")
                .map(|(_, v)| v.into_owned());
            assert_eq!(travelmode.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_url_with_origin() {
        let request = DirectionsRequest::walking_to(
            GeoPoint::new(35.7119, 139.7953),
            Some(GeoPoint::new(35.6812, 139.7671)),
        );
        let url = Url::parse(&request.url()).unwrap();
        let origin = url
            .query_pairs()
            .find(|(k, _)| k == "origin")
            .map(|(_, v)| v.into_owned());
        assert_eq!(origin.as_deref(), Some("35.6812,139.7671"));
    }
}
