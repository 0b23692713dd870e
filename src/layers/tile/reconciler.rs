//! Viewport to tile-set reconciliation
//!
//! Given the current viewport, decides which tiles are required, which
//! existing records may stay, and which tiles still need a fetch. The flow
//! follows Leaflet's `GridLayer._setView` / `_update`: a change of quantized
//! zoom resets the cache, otherwise records outside the keep range are marked
//! stale and missing tiles in the fetch range are created closest-first.

use std::sync::Arc;

use crate::core::bounds::TileRange;
use crate::core::config::TileLayerOptions;
use crate::core::constants::MAX_ZOOM_DRIFT;
use crate::core::geo::{Point, TileCoord};
use crate::core::viewport::Viewport;
use crate::layers::tile::cache::TileCache;
use crate::layers::tile::types::FetchTicket;
use crate::traits::Projection;
use crate::{MapError, Result};

/// Tile ranges computed for one pass
#[derive(Debug, Clone, PartialEq)]
pub struct TileRanges {
    pub zoom: u8,
    /// Tiles that must exist for the viewport
    pub fetch: TileRange,
    /// Tiles allowed to survive pruning
    pub keep: TileRange,
    /// Center of the fetch range, used to order fetches
    pub center: Point,
}

pub struct ViewportReconciler {
    projection: Arc<dyn Projection>,
    min_zoom: u8,
    max_zoom: u8,
    keep_buffer: f64,
    update_when_zooming: bool,
}

impl ViewportReconciler {
    pub fn new(projection: Arc<dyn Projection>, options: &TileLayerOptions) -> Self {
        Self {
            projection,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            keep_buffer: options.keep_buffer as f64,
            update_when_zooming: options.update_when_zooming,
        }
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    /// Quantized tile zoom for a map zoom, or `None` when the layer has
    /// nothing to show at that zoom.
    pub fn tile_zoom(&self, map_zoom: f64) -> Option<u8> {
        if !map_zoom.is_finite() {
            return None;
        }
        let zoom = self.projection.clamp_zoom(map_zoom.round()).round();
        if zoom < self.min_zoom as f64 || zoom > self.max_zoom as f64 {
            return None;
        }
        Some(zoom as u8)
    }

    /// Fetch and keep ranges for `viewport` drawn with tiles at `zoom`
    pub fn tile_ranges(&self, viewport: &Viewport, zoom: u8) -> Result<TileRanges> {
        let pixel_bounds = self
            .projection
            .pixel_bounds_for_center(viewport, &viewport.center, zoom);
        let fetch = self.projection.tile_range_from_pixel_bounds(&pixel_bounds);
        if !fetch.is_finite() {
            return Err(MapError::UnboundedViewport);
        }

        Ok(TileRanges {
            zoom,
            keep: fetch.expanded(self.keep_buffer),
            center: fetch.center(),
            fetch,
        })
    }

    /// True when the live zoom has moved too far from the active tile zoom
    /// for the current tiles to be worth keeping.
    pub fn zoom_drifted(&self, viewport: &Viewport, active_zoom: u8) -> bool {
        (self.projection.clamp_zoom(viewport.zoom) - active_zoom as f64).abs() > MAX_ZOOM_DRIFT
    }

    /// Valid coordinates of the fetch range in row-major order
    pub fn required_tiles(&self, ranges: &TileRanges) -> Vec<TileCoord> {
        let fetch = &ranges.fetch;
        let (min_x, max_x) = (fetch.min.x as i64, fetch.max.x as i64);
        let (min_y, max_y) = (fetch.min.y as i64, fetch.max.y as i64);

        let mut coords = Vec::new();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
                    continue;
                };
                let coord = TileCoord::new(x, y, ranges.zoom);
                if self.projection.is_valid_tile(&coord) {
                    coords.push(coord);
                }
            }
        }
        coords
    }

    /// Coordinate substituted into the request URL for `coord`
    pub fn request_coord(&self, coord: &TileCoord) -> TileCoord {
        self.projection.wrap_coord(coord)
    }

    /// Runs one reconciliation pass and returns the tiles to fetch, nearest
    /// to the viewport center first.
    ///
    /// `force_reset` drops every record first, as after attaching or a
    /// redraw. An unbounded viewport is reported before any record is
    /// touched, apart from the reset itself.
    pub fn reconcile(
        &self,
        cache: &mut TileCache,
        viewport: &Viewport,
        force_reset: bool,
    ) -> Result<Vec<FetchTicket>> {
        let tile_zoom = self.tile_zoom(viewport.zoom);
        let zoom_changed = self.update_when_zooming && tile_zoom != cache.active_zoom();

        if force_reset || zoom_changed {
            self.set_view(cache, viewport, tile_zoom)
        } else {
            self.update(cache, viewport)
        }
    }

    fn set_view(
        &self,
        cache: &mut TileCache,
        viewport: &Viewport,
        tile_zoom: Option<u8>,
    ) -> Result<Vec<FetchTicket>> {
        log::debug!(
            "resetting view: tile zoom {:?} -> {:?}",
            cache.active_zoom(),
            tile_zoom
        );
        cache.invalidate_all();
        cache.set_active_zoom(tile_zoom);
        if tile_zoom.is_none() {
            return Ok(Vec::new());
        }
        self.update(cache, viewport)
    }

    fn update(&self, cache: &mut TileCache, viewport: &Viewport) -> Result<Vec<FetchTicket>> {
        let Some(zoom) = cache.active_zoom() else {
            return Ok(Vec::new());
        };

        let ranges = self.tile_ranges(viewport, zoom)?;
        cache.mark_current_or_stale(&ranges.keep, zoom);

        if self.zoom_drifted(viewport, zoom) {
            return self.set_view(cache, viewport, self.tile_zoom(viewport.zoom));
        }

        let mut queue = Vec::new();
        for coord in self.required_tiles(&ranges) {
            let (record, created) = cache.get_or_create(coord);
            if created {
                queue.push(coord);
            } else {
                record.current = true;
            }
        }

        // Stable, so equidistant tiles keep row-major order
        let center = ranges.center;
        queue.sort_by(|a, b| {
            let da = self.projection.distance(&a.as_point(), &center);
            let db = self.projection.distance(&b.as_point(), &center);
            da.total_cmp(&db)
        });

        let tickets: Vec<FetchTicket> = queue
            .iter()
            .filter_map(|coord| cache.get(coord).map(|record| cache.ticket_for(record)))
            .collect();
        if !tickets.is_empty() {
            log::debug!(
                "zoom {}: {} tiles to fetch, {} tracked",
                zoom,
                tickets.len(),
                cache.len()
            );
        }
        Ok(tickets)
    }
}
