//! # tilegeojson
//!
//! A tile-driven GeoJSON overlay layer for slippy maps, modelled on
//! Leaflet's `GridLayer`.
//!
//! The hosting map reports viewport changes; the layer works out which tiles
//! the viewport needs, fetches one GeoJSON document per tile, renders it into
//! an overlay and drops tiles once they fall out of range. Stale responses
//! from before a zoom change or redraw are discarded.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilegeojson::prelude::*;
//!
//! # async fn run() -> tilegeojson::Result<()> {
//! let sink = MemoryOverlaySink::new();
//! let mut layer = TileGeoJsonLayer::builder("https://tiles.example.com/{z}/{x}/{y}.geojson")
//!     .with_sink(Arc::new(sink.clone()))
//!     .build()?;
//!
//! layer.attach();
//! let viewport = Viewport::new(LatLng::new(51.5, -0.12), 12.0, Point::new(800.0, 600.0));
//! if let Some(batch) = layer.on_viewport_changed(&viewport)? {
//!     let report = batch.settle().await;
//!     println!("{} tiles loaded, {} overlays drawn", report.loaded, sink.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod data;
pub mod layers;
pub mod prelude;
pub mod tiles;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::{Bounds, TileRange},
    builder::LayerBuilder,
    config::TileLayerOptions,
    geo::{LatLng, LatLngBounds, Point, TileCoord, TileKey},
    viewport::Viewport,
};

pub use layers::{
    overlay::{MemoryOverlaySink, OverlayId, TileOverlay},
    tile::{Batch, BatchReport, LoadState, TileEvent, TileGeoJsonLayer, TileSnapshot},
};

pub use data::geojson::{FeatureStyle, GeoJson, GeoJsonFeature, RenderOptions};

pub use tiles::{HttpFetcher, HttpFetcherConfig, UrlTemplate};

pub use traits::{OverlaySink, Projection, TileFetcher, ViewportLayer};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("attempted to load an infinite number of tiles")]
    UnboundedViewport,

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid tile key: {0}")]
    InvalidTileKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Initialise `env_logger` from `RUST_LOG`; repeated calls are ignored
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
