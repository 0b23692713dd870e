//! Layer builder for fluent configuration
//!
//! `LayerBuilder` assembles a [`TileGeoJsonLayer`] from a URL template plus
//! optional options, styling, projection, transport and overlay sink. Every
//! collaborator left unset gets its default: Web Mercator grid, the shared
//! reqwest transport and an in-memory sink.

use std::sync::Arc;

use crate::{
    core::{config::TileLayerOptions, geo::LatLngBounds, projection::WebMercatorProjection},
    data::geojson::RenderOptions,
    layers::{overlay::MemoryOverlaySink, tile::TileGeoJsonLayer},
    tiles::{loader::HttpFetcher, source::UrlTemplate},
    traits::{OverlaySink, Projection, TileFetcher},
    Result,
};

/// Builder for creating and configuring [`TileGeoJsonLayer`] instances
pub struct LayerBuilder {
    url_template: String,
    subdomains: Option<Vec<String>>,
    options: TileLayerOptions,
    render_options: RenderOptions,
    projection: Option<Arc<dyn Projection>>,
    fetcher: Option<Arc<dyn TileFetcher>>,
    sink: Option<Arc<dyn OverlaySink>>,
}

impl LayerBuilder {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            subdomains: None,
            options: TileLayerOptions::default(),
            render_options: RenderOptions::default(),
            projection: None,
            fetcher: None,
            sink: None,
        }
    }

    /// Replace all layer options at once
    pub fn with_options(mut self, options: TileLayerOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the quantized zoom range in which tiles are shown
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.options.min_zoom = min_zoom;
        self.options.max_zoom = max_zoom;
        self
    }

    /// Set the zoom range the tile server actually provides
    pub fn with_native_zoom(mut self, min_native: Option<u8>, max_native: Option<u8>) -> Self {
        self.options.min_native_zoom = min_native;
        self.options.max_native_zoom = max_native;
        self
    }

    /// Tiles kept around the visible range
    pub fn with_keep_buffer(mut self, keep_buffer: u32) -> Self {
        self.options.keep_buffer = keep_buffer;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.options.tile_size = tile_size;
        self
    }

    pub fn with_no_wrap(mut self, no_wrap: bool) -> Self {
        self.options.no_wrap = no_wrap;
        self
    }

    pub fn with_update_when_zooming(mut self, enabled: bool) -> Self {
        self.options.update_when_zooming = enabled;
        self
    }

    /// Only request tiles overlapping `bounds`
    pub fn with_bounds(mut self, bounds: LatLngBounds) -> Self {
        self.options.bounds = Some(bounds);
        self
    }

    /// Subdomains substituted for `{s}`
    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = Some(subdomains.into_iter().map(Into::into).collect());
        self
    }

    /// Styling and filtering applied to every tile payload
    pub fn with_render_options(mut self, render_options: RenderOptions) -> Self {
        self.render_options = render_options;
        self
    }

    pub fn with_projection(mut self, projection: Arc<dyn Projection>) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn TileFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OverlaySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and build a detached layer
    pub fn build(self) -> Result<TileGeoJsonLayer> {
        self.options.validate()?;

        let mut source = UrlTemplate::parse(&self.url_template)?;
        if let Some(subdomains) = self.subdomains {
            source = source.with_subdomains(subdomains)?;
        }

        let options = self.options;
        let projection = self
            .projection
            .unwrap_or_else(|| Arc::new(WebMercatorProjection::new(&options)));
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::new()));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(MemoryOverlaySink::new()));

        Ok(TileGeoJsonLayer::from_parts(
            source,
            options,
            self.render_options,
            projection,
            fetcher,
            sink,
        ))
    }
}
