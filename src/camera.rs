//! Camera commands for the map surface.

use log::debug;
use serde::Serialize;

use crate::config::MapConfig;
use crate::{Bounds, GeoPoint};

/// Zoom used when flying to a single place.
pub const PLACE_ZOOM_LEVEL: f64 = 16.0;

/// A camera instruction for the map SDK. Coordinates are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CameraCommand {
    FitBounds {
        ne: [f64; 2],
        sw: [f64; 2],
        padding: u32,
        duration_ms: u32,
        /// Wait this long before animating.
        delay_ms: u32,
    },
    FlyTo {
        center: [f64; 2],
        zoom: Option<f64>,
        duration_ms: u32,
    },
}

/// Issues camera commands and remembers whether the initial fit happened.
#[derive(Debug, Clone)]
pub struct CameraController {
    config: MapConfig,
    camera_ready: bool,
    initial_fit_done: bool,
}

impl CameraController {
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            camera_ready: false,
            initial_fit_done: false,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.camera_ready
    }

    /// The map camera is mounted. May return the initial fit.
    pub fn on_camera_ready(&mut self, bounds: &Bounds) -> Option<CameraCommand> {
        self.camera_ready = true;
        self.initial_fit(bounds)
    }

    /// Quest bounds changed. May return the initial fit.
    pub fn on_bounds_changed(&mut self, bounds: &Bounds) -> Option<CameraCommand> {
        self.initial_fit(bounds)
    }

    /// Fit once, after the camera is ready and the bounds are known, in
    /// whichever order those arrive.
    fn initial_fit(&mut self, bounds: &Bounds) -> Option<CameraCommand> {
        if !self.camera_ready || self.initial_fit_done || bounds.is_degenerate() {
            return None;
        }
        self.initial_fit_done = true;
        debug!("[CameraController] Initial fit to {:?}", bounds);
        Some(self.fit_command(bounds, self.config.initial_fit_delay_ms))
    }

    /// Fit the quest zone on demand.
    pub fn fit_to_zone(&self, bounds: &Bounds) -> Option<CameraCommand> {
        if bounds.is_degenerate() {
            return None;
        }
        Some(self.fit_command(bounds, 0))
    }

    fn fit_command(&self, bounds: &Bounds, delay_ms: u32) -> CameraCommand {
        CameraCommand::FitBounds {
            ne: bounds.top_right().lng_lat(),
            sw: bounds.bottom_left().lng_lat(),
            padding: self.config.fit_padding,
            duration_ms: self.config.animation_duration_ms,
            delay_ms,
        }
    }

    /// Center on the user. `None` while no fix is known.
    pub fn fly_to_user(&self, location: Option<GeoPoint>) -> Option<CameraCommand> {
        location.map(|point| self.fly_to(point, None))
    }

    /// Center on the current destination at street zoom.
    pub fn fly_to_destination(&self, destination: Option<GeoPoint>) -> Option<CameraCommand> {
        destination.map(|point| self.fly_to(point, Some(PLACE_ZOOM_LEVEL)))
    }

    fn fly_to(&self, point: GeoPoint, zoom: Option<f64>) -> CameraCommand {
        CameraCommand::FlyTo {
            center: point.lng_lat(),
            zoom: zoom.map(|z| z.clamp(self.config.min_zoom_level, self.config.max_zoom_level)),
            duration_ms: self.config.animation_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Bounds {
        Bounds {
            min_lng: 139.7880,
            max_lng: 139.7982,
            min_lat: 35.7106,
            max_lat: 35.7148,
        }
    }

    #[test]
    fn test_initial_fit_once_after_ready() {
        let mut camera = CameraController::new(MapConfig::default());

        // Bounds before the camera: nothing yet
        assert!(camera.on_bounds_changed(&zone()).is_none());

        let fit = camera.on_camera_ready(&zone()).unwrap();
        assert_eq!(
            fit,
            CameraCommand::FitBounds {
                ne: [139.7982, 35.7148],
                sw: [139.7880, 35.7106],
                padding: 30,
                duration_ms: 1000,
                delay_ms: 500,
            }
        );

        assert!(camera.on_bounds_changed(&zone()).is_none());
        assert!(camera.on_camera_ready(&zone()).is_none());
    }

    #[test]
    fn test_initial_fit_waits_for_real_bounds() {
        let mut camera = CameraController::new(MapConfig::default());
        assert!(camera.on_camera_ready(&Bounds::ZERO).is_none());
        assert!(camera.is_ready());
        assert!(camera.on_bounds_changed(&zone()).is_some());
    }

    #[test]
    fn test_fit_to_zone_on_demand() {
        let camera = CameraController::new(MapConfig::default());
        assert!(camera.fit_to_zone(&Bounds::ZERO).is_none());
        match camera.fit_to_zone(&zone()) {
            Some(CameraCommand::FitBounds { delay_ms, .. }) => assert_eq!(delay_ms, 0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fly_to() {
        let camera = CameraController::new(MapConfig::default());
        assert!(camera.fly_to_user(None).is_none());

        let user = GeoPoint::new(35.7119, 139.7953);
        assert_eq!(
            camera.fly_to_user(Some(user)),
            Some(CameraCommand::FlyTo {
                center: [139.7953, 35.7119],
                zoom: None,
                duration_ms: 1000,
            })
        );

        let config = MapConfig {
            max_zoom_level: 14.0,
            ..MapConfig::default()
        };
        let camera = CameraController::new(config);
        match camera.fly_to_destination(Some(user)) {
            Some(CameraCommand::FlyTo { zoom, .. }) => assert_eq!(zoom, Some(14.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_serialization() {
        let camera = CameraController::new(MapConfig::default());
        let json = serde_json::to_value(camera.fit_to_zone(&zone()).unwrap()).unwrap();
        assert_eq!(json["type"], "fit_bounds");
        assert_eq!(json["padding"], 30);
    }
}
