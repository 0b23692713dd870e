//! GeoJSON tile layer
//!
//! The tile lifecycle engine: a keyed cache of tile records, the reconciler
//! that maps a viewport onto required tiles, and the loader that fetches
//! them in batches and hands rendered overlays to a sink.

pub mod cache;
pub mod events;
pub mod layer;
pub mod loader;
pub mod reconciler;
pub mod types;

pub use cache::TileCache;
pub use events::{TileEvent, TileEvents};
pub use layer::TileGeoJsonLayer;
pub use loader::{Batch, TileLoader, TileTask};
pub use reconciler::{TileRanges, ViewportReconciler};
pub use types::{BatchReport, FetchTicket, LoadState, TileOutcome, TileRecord, TileSnapshot};
