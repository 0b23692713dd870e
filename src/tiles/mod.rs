pub mod loader;
pub mod source;

// Re-exports for convenience
pub use loader::{HttpFetcher, HttpFetcherConfig};
pub use source::{TileSource, UrlTemplate};
