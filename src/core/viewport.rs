use crate::core::constants::{EARTH_RADIUS, TILE_SIZE};
use crate::core::geo::{LatLng, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Snapshot of the map view handed to layers on every change: center, zoom,
/// and screen dimensions. Layers never keep it beyond the pass it drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current (possibly fractional) zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self { center, zoom, size }
    }

    /// Returns a copy of this viewport at another center
    pub fn with_center(&self, center: LatLng) -> Self {
        Self {
            center,
            ..self.clone()
        }
    }

    /// Returns a copy of this viewport at another zoom
    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self {
            zoom,
            ..self.clone()
        }
    }

    /// Scale factor between two zoom levels (Leaflet's `getZoomScale`)
    pub fn zoom_scale(to_zoom: f64, from_zoom: f64) -> f64 {
        2_f64.powf(to_zoom - from_zoom)
    }

    /// Projects a LatLng to world pixel coordinates at the given zoom level
    /// This is the unified Web Mercator projection implementation (EPSG:3857)
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let z = zoom.unwrap_or(self.zoom);
        let scale = TILE_SIZE as f64 * 2_f64.powf(z);

        let lat = LatLng::clamp_lat(lat_lng.lat);
        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let y = ((PI / 4.0 + lat.to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;

        // scale = 0.5 / (π * R), offset = 0.5
        let pixel_x = (x + PI * EARTH_RADIUS) / (2.0 * PI * EARTH_RADIUS) * scale;
        let pixel_y = (-y + PI * EARTH_RADIUS) / (2.0 * PI * EARTH_RADIUS) * scale;

        Point::new(pixel_x, pixel_y)
    }

    /// Unprojects world pixel coordinates back to LatLng at the given zoom level
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let z = zoom.unwrap_or(self.zoom);
        let scale = TILE_SIZE as f64 * 2_f64.powf(z);

        let x = (pixel.x / scale) * (2.0 * PI * EARTH_RADIUS) - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - (pixel.y / scale) * (2.0 * PI * EARTH_RADIUS);

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();

        LatLng::new(lat, lng)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::default(), 0.0, Point::new(800.0, 600.0))
    }
}
