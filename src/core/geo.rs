use crate::core::constants::{MAX_LATITUDE, MAX_TILE_ZOOM};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    /// Clamps latitude to the Web Mercator range
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in screen, pixel or tile-grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn divide_by(&self, scalar: f64) -> Point {
        Point::new(self.x / scalar, self.y / scalar)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    pub fn ceil(&self) -> Point {
        Point::new(self.x.ceil(), self.y.ceil())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    /// True when the two areas share interior, touching edges do not count
    pub fn overlaps(&self, other: &LatLngBounds) -> bool {
        other.north_east.lat > self.south_west.lat
            && other.south_west.lat < self.north_east.lat
            && other.north_east.lng > self.south_west.lng
            && other.south_west.lng < self.north_east.lng
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

/// A cell of the slippy map tile grid.
///
/// Column and row are signed: a viewport that wraps around the antimeridian
/// produces columns outside `0..2^z`, and those tiles keep their unwrapped
/// coordinate (and key) while only the request URL is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: i32, y: i32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Number of tiles along one axis at this zoom
    pub fn grid_size(zoom: u8) -> i64 {
        1i64 << zoom.min(MAX_TILE_ZOOM)
    }

    /// Canonical cache key for this coordinate
    pub fn key(&self) -> TileKey {
        TileKey::from(*self)
    }

    /// Position in tile-grid units, used for distance ordering
    pub fn as_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Same tile folded back into `0..2^z` horizontally
    pub fn wrapped(&self) -> TileCoord {
        let n = Self::grid_size(self.z);
        let x = (self.x as i64).rem_euclid(n);
        TileCoord::new(x as i32, self.y, self.z)
    }

    /// Converts tile coordinate to LatLng (northwest corner)
    pub fn to_lat_lng(&self) -> LatLng {
        let n = 2_f64.powi(self.z as i32);
        let lng = self.x as f64 / n * 360.0 - 180.0;
        let lat_rad = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan();
        LatLng::new(lat_rad.to_degrees(), lng)
    }

    /// Gets the geographic bounds of the tile
    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.to_lat_lng();
        let se = TileCoord::new(self.x + 1, self.y + 1, self.z).to_lat_lng();
        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Canonical string encoding of a tile coordinate: `"x:y:z"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey(String);

impl TileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the key back into its coordinate
    pub fn coord(&self) -> Result<TileCoord> {
        let invalid = || MapError::InvalidTileKey(self.0.clone());
        let mut parts = self.0.split(':');
        let x = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let y = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let z = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(TileCoord::new(x, y, z))
    }
}

impl From<TileCoord> for TileKey {
    fn from(coord: TileCoord) -> Self {
        TileKey(format!("{}:{}:{}", coord.x, coord.y, coord.z))
    }
}

impl FromStr for TileKey {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        let key = TileKey(s.to_string());
        // Only canonical spellings are accepted so that lookups never alias
        let coord = key.coord()?;
        if coord.key() != key {
            return Err(MapError::InvalidTileKey(s.to_string()));
        }
        Ok(key)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
