use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;

use crate::core::builder::LayerBuilder;
use crate::core::config::TileLayerOptions;
use crate::core::geo::TileCoord;
use crate::core::projection::WebMercatorProjection;
use crate::core::viewport::Viewport;
use crate::data::geojson::RenderOptions;
use crate::layers::tile::cache::TileCache;
use crate::layers::tile::events::{TileEvent, TileEvents};
use crate::layers::tile::loader::{lock_state, Batch, LayerState, SharedState, TileLoader, TileTask};
use crate::layers::tile::reconciler::ViewportReconciler;
use crate::layers::tile::types::TileSnapshot;
use crate::tiles::source::{TileSource, UrlTemplate};
use crate::traits::{OverlaySink, Projection, TileFetcher, ViewportLayer};
use crate::Result;

/// A layer that shows GeoJSON fetched per map tile.
///
/// The hosting map drives it: [`attach`](Self::attach) once, then
/// [`on_viewport_changed`](Self::on_viewport_changed) after every view change.
/// Each call that needs new tiles returns a [`Batch`]; the caller settles or
/// spawns it. Completed tiles show up in the configured [`OverlaySink`].
pub struct TileGeoJsonLayer {
    options: TileLayerOptions,
    source: UrlTemplate,
    reconciler: ViewportReconciler,
    loader: TileLoader,
    state: SharedState,
    events: TileEvents,
    attached: bool,
    pending_reset: bool,
    last_viewport: Option<Viewport>,
}

impl TileGeoJsonLayer {
    /// Layer on the Web Mercator grid
    pub fn new(
        url_template: &str,
        options: TileLayerOptions,
        fetcher: Arc<dyn TileFetcher>,
        sink: Arc<dyn OverlaySink>,
    ) -> Result<Self> {
        options.validate()?;
        let projection = Arc::new(WebMercatorProjection::new(&options));
        Ok(Self::from_parts(
            UrlTemplate::parse(url_template)?,
            options,
            RenderOptions::default(),
            projection,
            fetcher,
            sink,
        ))
    }

    pub fn builder(url_template: impl Into<String>) -> LayerBuilder {
        LayerBuilder::new(url_template)
    }

    pub(crate) fn from_parts(
        source: UrlTemplate,
        options: TileLayerOptions,
        render_options: RenderOptions,
        projection: Arc<dyn Projection>,
        fetcher: Arc<dyn TileFetcher>,
        sink: Arc<dyn OverlaySink>,
    ) -> Self {
        let events = TileEvents::new();
        let mut state = LayerState::new(TileCache::new(sink).with_events(events.clone()));
        state.render_options = render_options;
        let state = Arc::new(Mutex::new(state));

        Self {
            reconciler: ViewportReconciler::new(projection, &options),
            loader: TileLoader::new(Arc::clone(&state), fetcher, events.clone()),
            options,
            source,
            state,
            events,
            attached: false,
            pending_reset: true,
            last_viewport: None,
        }
    }

    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    pub fn source(&self) -> &UrlTemplate {
        &self.source
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Starts tracking viewport changes; the next change rebuilds the tile set
    pub fn attach(&mut self) {
        if self.attached {
            return;
        }
        if let Ok(mut state) = lock_state(&self.state) {
            state.cache.invalidate_all();
        }
        self.attached = true;
        self.pending_reset = true;
        log::debug!("tile layer attached to {}", self.source);
    }

    /// Stops tracking and drops every tile and overlay
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        if let Ok(mut state) = lock_state(&self.state) {
            state.cache.invalidate_all();
        }
        self.attached = false;
        self.pending_reset = true;
        self.last_viewport = None;
        log::debug!("tile layer detached from {}", self.source);
    }

    /// Reconciles the tile set with `viewport`.
    ///
    /// Returns the batch of tiles that still have to be fetched, or `None`
    /// when nothing new is needed or the layer is detached.
    pub fn on_viewport_changed(&mut self, viewport: &Viewport) -> Result<Option<Batch>> {
        if !self.attached {
            return Ok(None);
        }
        self.last_viewport = Some(viewport.clone());

        let mut state = lock_state(&self.state)?;
        // A forced reset happens even when the pass itself fails
        let force_reset = std::mem::take(&mut self.pending_reset);
        let tickets = self
            .reconciler
            .reconcile(&mut state.cache, viewport, force_reset)?;

        let tasks = tickets
            .into_iter()
            .map(|ticket| {
                let url = self.source.url(self.reconciler.request_coord(&ticket.coord));
                TileTask::new(ticket, url)
            })
            .collect();
        Ok(self.loader.dispatch(&mut state, tasks))
    }

    /// Drops every tile and rebuilds the set for the last known viewport
    pub fn redraw(&mut self) -> Result<Option<Batch>> {
        if !self.attached {
            return Ok(None);
        }
        lock_state(&self.state)?.cache.invalidate_all();
        self.pending_reset = true;

        match self.last_viewport.clone() {
            Some(viewport) => self.on_viewport_changed(&viewport),
            None => Ok(None),
        }
    }

    /// Points the layer at a new URL template and redraws
    pub fn set_source_url(&mut self, url_template: &str) -> Result<Option<Batch>> {
        self.source = self.source.rebind(url_template)?;
        log::info!("tile source changed to {}", self.source);
        self.redraw()
    }

    /// Replaces the styling applied to tiles that complete from now on
    pub fn set_render_options(&mut self, render_options: RenderOptions) -> Result<()> {
        lock_state(&self.state)?.render_options = render_options;
        Ok(())
    }

    /// True while any batch is in flight
    pub fn is_loading(&self) -> bool {
        lock_state(&self.state)
            .map(|state| state.batches_in_flight > 0)
            .unwrap_or(false)
    }

    /// Receiver for this layer's lifecycle events
    pub fn events(&self) -> Receiver<TileEvent> {
        self.events.receiver()
    }

    pub fn tile(&self, coord: &TileCoord) -> Option<TileSnapshot> {
        lock_state(&self.state)
            .ok()?
            .cache
            .get(coord)
            .map(|record| record.snapshot())
    }

    pub fn tiles(&self) -> Vec<TileSnapshot> {
        lock_state(&self.state)
            .map(|state| state.cache.snapshots())
            .unwrap_or_default()
    }

    pub fn tile_count(&self) -> usize {
        lock_state(&self.state).map(|state| state.cache.len()).unwrap_or(0)
    }

    pub fn active_zoom(&self) -> Option<u8> {
        lock_state(&self.state).ok()?.cache.active_zoom()
    }

    pub fn epoch(&self) -> u64 {
        lock_state(&self.state).map(|state| state.cache.epoch()).unwrap_or(0)
    }
}

impl ViewportLayer for TileGeoJsonLayer {
    fn attach(&mut self) {
        TileGeoJsonLayer::attach(self)
    }

    fn detach(&mut self) {
        TileGeoJsonLayer::detach(self)
    }

    fn on_viewport_changed(&mut self, viewport: &Viewport) -> Result<Option<Batch>> {
        TileGeoJsonLayer::on_viewport_changed(self, viewport)
    }

    fn redraw(&mut self) -> Result<Option<Batch>> {
        TileGeoJsonLayer::redraw(self)
    }

    fn is_loading(&self) -> bool {
        TileGeoJsonLayer::is_loading(self)
    }
}

impl std::fmt::Debug for TileGeoJsonLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileGeoJsonLayer")
            .field("source", &self.source.as_str())
            .field("options", &self.options)
            .field("attached", &self.attached)
            .finish()
    }
}
