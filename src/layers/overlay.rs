//! Rendered tile overlays and a headless sink that keeps them in memory.

use std::sync::{Arc, Mutex};

use crate::core::geo::{LatLngBounds, TileCoord};
use crate::data::geojson::StyledFeature;
use crate::prelude::HashMap;
use crate::traits::OverlaySink;

/// Opaque identity of one overlay; never reused within a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

/// The drawable features of one tile.
///
/// Owned by the tile's cache record; sinks only ever see it by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TileOverlay {
    id: OverlayId,
    coord: TileCoord,
    features: Arc<Vec<StyledFeature>>,
}

impl TileOverlay {
    pub fn new(id: OverlayId, coord: TileCoord, features: Vec<StyledFeature>) -> Self {
        Self {
            id,
            coord,
            features: Arc::new(features),
        }
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn features(&self) -> &[StyledFeature] {
        &self.features
    }

    /// Bounding box of every feature geometry
    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.features
            .iter()
            .filter_map(|f| f.feature.geometry.as_ref()?.bounds())
            .reduce(|mut acc, b| {
                acc.extend(&b.south_west);
                acc.extend(&b.north_east);
                acc
            })
    }
}

/// Sink that keeps every added overlay, for headless use and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryOverlaySink {
    overlays: Arc<Mutex<HashMap<OverlayId, TileOverlay>>>,
}

impl MemoryOverlaySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.overlays.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.overlays
            .lock()
            .map(|o| o.values().any(|overlay| overlay.coord == *coord))
            .unwrap_or(false)
    }

    /// Coordinates currently drawn, sorted
    pub fn coords(&self) -> Vec<TileCoord> {
        let mut coords: Vec<_> = self
            .overlays
            .lock()
            .map(|o| o.values().map(|overlay| overlay.coord).collect())
            .unwrap_or_default();
        coords.sort();
        coords
    }

    pub fn feature_count(&self) -> usize {
        self.overlays
            .lock()
            .map(|o| o.values().map(|overlay| overlay.features.len()).sum())
            .unwrap_or(0)
    }
}

impl OverlaySink for MemoryOverlaySink {
    fn add_overlay(&self, overlay: &TileOverlay) {
        if let Ok(mut overlays) = self.overlays.lock() {
            overlays.insert(overlay.id, overlay.clone());
        }
    }

    fn remove_overlay(&self, overlay: &TileOverlay) {
        if let Ok(mut overlays) = self.overlays.lock() {
            overlays.remove(&overlay.id);
        }
    }

    fn clear_overlays(&self) {
        if let Ok(mut overlays) = self.overlays.lock() {
            overlays.clear();
        }
    }
}
