//! Web Mercator tile-grid projection
//!
//! Reproduces the grid math of Leaflet's `GridLayer` (`_clampZoom`,
//! `_getTiledPixelBounds`, `_pxBoundsToTileRange`, `_isValidTile`,
//! `_wrapCoords`) on top of [`Viewport::project`].

use crate::{
    core::{
        bounds::{Bounds, TileRange},
        config::TileLayerOptions,
        geo::{LatLng, LatLngBounds, Point, TileCoord},
        viewport::Viewport,
    },
    traits::Projection,
};

#[derive(Debug, Clone)]
pub struct WebMercatorProjection {
    tile_size: f64,
    min_native_zoom: Option<u8>,
    max_native_zoom: Option<u8>,
    no_wrap: bool,
    bounds: Option<LatLngBounds>,
}

impl WebMercatorProjection {
    pub fn new(options: &TileLayerOptions) -> Self {
        Self {
            tile_size: options.tile_size.max(1) as f64,
            min_native_zoom: options.min_native_zoom,
            max_native_zoom: options.max_native_zoom,
            no_wrap: options.no_wrap,
            bounds: options.bounds.clone(),
        }
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }
}

impl Default for WebMercatorProjection {
    fn default() -> Self {
        Self::new(&TileLayerOptions::default())
    }
}

impl Projection for WebMercatorProjection {
    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if let Some(min) = self.min_native_zoom {
            if zoom < min as f64 {
                return min as f64;
            }
        }
        if let Some(max) = self.max_native_zoom {
            if zoom > max as f64 {
                return max as f64;
            }
        }
        zoom
    }

    fn pixel_bounds_for_center(
        &self,
        viewport: &Viewport,
        center: &LatLng,
        tile_zoom: u8,
    ) -> Bounds {
        let scale = Viewport::zoom_scale(viewport.zoom, tile_zoom as f64);
        let pixel_center = viewport.project(center, Some(tile_zoom as f64)).floor();
        let half_size = viewport.size.divide_by(scale * 2.0);

        Bounds::new(pixel_center.subtract(&half_size), pixel_center.add(&half_size))
    }

    fn tile_range_from_pixel_bounds(&self, bounds: &Bounds) -> TileRange {
        Bounds::new(
            bounds.min.divide_by(self.tile_size).floor(),
            bounds
                .max
                .divide_by(self.tile_size)
                .ceil()
                .subtract(&Point::new(1.0, 1.0)),
        )
    }

    fn is_valid_tile(&self, coord: &TileCoord) -> bool {
        let n = TileCoord::grid_size(coord.z);
        let (x, y) = (coord.x as i64, coord.y as i64);

        // Latitude never wraps; longitude only when wrapping is allowed
        if y < 0 || y >= n {
            return false;
        }
        if self.no_wrap && (x < 0 || x >= n) {
            return false;
        }

        match &self.bounds {
            Some(bounds) => bounds.overlaps(&self.wrap_coord(coord).bounds()),
            None => true,
        }
    }

    fn wrap_coord(&self, coord: &TileCoord) -> TileCoord {
        if self.no_wrap {
            *coord
        } else {
            coord.wrapped()
        }
    }
}
