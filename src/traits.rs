//! Shared trait abstractions
//!
//! The tile engine talks to everything outside of it through these traits:
//! the projection that turns a viewport into a tile range, the transport that
//! fetches a tile payload, the sink that renders overlays, and the hosting map
//! that drives a layer with viewport changes.

use async_trait::async_trait;

use crate::{
    core::{
        bounds::{Bounds, TileRange},
        geo::{LatLng, Point, TileCoord},
        viewport::Viewport,
    },
    layers::{overlay::TileOverlay, tile::loader::Batch},
    Result,
};

/// Viewport and tile-grid math consumed by the reconciler.
pub trait Projection: Send + Sync {
    /// Clamps a zoom level to what the tile source can serve
    fn clamp_zoom(&self, zoom: f64) -> f64;

    /// Pixel-space area visible around `center` when tiles are drawn at `tile_zoom`
    fn pixel_bounds_for_center(&self, viewport: &Viewport, center: &LatLng, tile_zoom: u8)
        -> Bounds;

    /// Inclusive tile range covering the given pixel bounds
    fn tile_range_from_pixel_bounds(&self, bounds: &Bounds) -> TileRange;

    /// Whether a tile exists for this configuration (world and layer bounds)
    fn is_valid_tile(&self, coord: &TileCoord) -> bool;

    /// Coordinate used to build the request URL for a tile
    fn wrap_coord(&self, coord: &TileCoord) -> TileCoord {
        *coord
    }

    fn distance(&self, a: &Point, b: &Point) -> f64 {
        a.distance_to(b)
    }
}

/// Receives rendered tile overlays.
///
/// Calls are made while the layer's state lock is held, so implementations
/// must not call back into the layer.
pub trait OverlaySink: Send + Sync {
    fn add_overlay(&self, overlay: &TileOverlay);

    fn remove_overlay(&self, overlay: &TileOverlay);

    /// Drops every overlay this sink received from the layer
    fn clear_overlays(&self);
}

/// Network transport used to download tile payloads.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Fetch the raw payload at `url`; non-success responses are errors
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// A layer driven by explicit viewport-change events from the hosting map.
pub trait ViewportLayer {
    fn attach(&mut self);

    fn detach(&mut self);

    fn on_viewport_changed(&mut self, viewport: &Viewport) -> Result<Option<Batch>>;

    fn redraw(&mut self) -> Result<Option<Batch>>;

    fn is_loading(&self) -> bool;
}
