//! Prelude module for common tilegeojson types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilegeojson::prelude::*;`

pub use crate::core::{
    bounds::{Bounds, TileRange},
    builder::LayerBuilder,
    config::TileLayerOptions,
    geo::{LatLng, LatLngBounds, Point, TileCoord, TileKey},
    projection::WebMercatorProjection,
    viewport::Viewport,
};

pub use crate::layers::overlay::{MemoryOverlaySink, OverlayId, TileOverlay};

pub use crate::layers::tile::{
    Batch, BatchReport, LoadState, TileEvent, TileGeoJsonLayer, TileSnapshot, TileTask,
};

pub use crate::data::geojson::{
    FeatureStyle, GeoJson, GeoJsonFeature, GeoJsonGeometry, RenderOptions, StyledFeature,
};

pub use crate::tiles::{HttpFetcher, HttpFetcherConfig, TileSource, UrlTemplate};

pub use crate::traits::{OverlaySink, Projection, TileFetcher, ViewportLayer};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
