//! Layer configuration
//!
//! `TileLayerOptions` mirrors the subset of Leaflet's `GridLayer` options the
//! GeoJSON tile layer honours. Every field has a default, so partial JSON
//! documents are accepted by [`TileLayerOptions::from_json_str`].

use crate::core::constants::{DEFAULT_KEEP_BUFFER, DEFAULT_MAX_ZOOM, MAX_TILE_ZOOM, TILE_SIZE};
use crate::core::geo::LatLngBounds;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayerOptions {
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Below this quantized zoom the layer shows no tiles
    pub min_zoom: u8,
    /// Above this quantized zoom the layer shows no tiles
    pub max_zoom: u8,
    /// Lowest zoom the tile server provides; lower map zooms reuse it
    pub min_native_zoom: Option<u8>,
    /// Highest zoom the tile server provides; higher map zooms reuse it
    pub max_native_zoom: Option<u8>,
    /// Tiles kept beyond the visible range before they can be pruned
    pub keep_buffer: u32,
    /// Treat a change of quantized zoom as a full reset
    pub update_when_zooming: bool,
    /// Do not wrap the world horizontally
    pub no_wrap: bool,
    /// Only tiles overlapping these bounds are requested
    pub bounds: Option<LatLngBounds>,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            min_zoom: 0,
            max_zoom: DEFAULT_MAX_ZOOM,
            min_native_zoom: None,
            max_native_zoom: None,
            keep_buffer: DEFAULT_KEEP_BUFFER,
            update_when_zooming: true,
            no_wrap: false,
            bounds: None,
        }
    }
}

impl TileLayerOptions {
    /// Parses options from a JSON document and validates them
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: TileLayerOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(MapError::Config("tile_size must be positive".into()));
        }
        for (name, zoom) in [
            ("max_zoom", Some(self.max_zoom)),
            ("min_native_zoom", self.min_native_zoom),
            ("max_native_zoom", self.max_native_zoom),
        ] {
            if let Some(zoom) = zoom.filter(|z| *z > MAX_TILE_ZOOM) {
                return Err(MapError::Config(format!(
                    "{} {} is above the highest tile zoom {}",
                    name, zoom, MAX_TILE_ZOOM
                )));
            }
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapError::Config(format!(
                "min_zoom {} is above max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if let (Some(min), Some(max)) = (self.min_native_zoom, self.max_native_zoom) {
            if min > max {
                return Err(MapError::Config(format!(
                    "min_native_zoom {} is above max_native_zoom {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    pub fn with_keep_buffer(mut self, keep_buffer: u32) -> Self {
        self.keep_buffer = keep_buffer;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_no_wrap(mut self, no_wrap: bool) -> Self {
        self.no_wrap = no_wrap;
        self
    }
}
