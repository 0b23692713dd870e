//! Core constants derived from Leaflet defaults and common web-map conventions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Web Mercator sphere radius in meters (EPSG:3857).
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude at which the Web Mercator world becomes square.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Tiles kept around the visible range before they become prunable (Leaflet's `keepBuffer`).
pub const DEFAULT_KEEP_BUFFER: u32 = 2;

/// Highest tile zoom served by typical public tile servers.
pub const DEFAULT_MAX_ZOOM: u8 = 18;

/// Highest tile zoom whose grid still fits `i32` tile coordinates.
pub const MAX_TILE_ZOOM: u8 = 30;

/// Largest distance between the live map zoom and the tile zoom an incremental
/// update tolerates before it falls back to a full reset.
pub const MAX_ZOOM_DRIFT: f64 = 1.0;

/// User agent sent by the HTTP fetcher unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "maplet-tilegeojson/0.1";
