//! Batched tile fetching
//!
//! A reconciliation pass hands its fetch queue to [`TileLoader::dispatch`],
//! which turns it into a [`Batch`]. Settling a batch runs every fetch
//! concurrently, writes each result back into the cache if its ticket is
//! still valid, and prunes stale records once all fetches have resolved.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;

use crate::core::geo::TileCoord;
use crate::data::geojson::{GeoJson, RenderOptions};
use crate::layers::overlay::{OverlayId, TileOverlay};
use crate::layers::tile::cache::TileCache;
use crate::layers::tile::events::{TileEvent, TileEvents};
use crate::layers::tile::types::{BatchReport, FetchTicket, TileOutcome};
use crate::traits::TileFetcher;
use crate::{MapError, Result};

/// Everything a layer shares with its in-flight batches
pub struct LayerState {
    pub cache: TileCache,
    pub render_options: RenderOptions,
    pub batches_in_flight: usize,
}

impl LayerState {
    pub fn new(cache: TileCache) -> Self {
        Self {
            cache,
            render_options: RenderOptions::default(),
            batches_in_flight: 0,
        }
    }
}

pub type SharedState = Arc<Mutex<LayerState>>;

pub(crate) fn lock_state(state: &SharedState) -> Result<MutexGuard<'_, LayerState>> {
    state
        .lock()
        .map_err(|_| MapError::Layer("tile layer state lock poisoned".into()))
}

/// One tile to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct TileTask {
    pub ticket: FetchTicket,
    pub url: String,
}

impl TileTask {
    pub fn new(ticket: FetchTicket, url: String) -> Self {
        Self { ticket, url }
    }

    pub fn coord(&self) -> TileCoord {
        self.ticket.coord
    }
}

#[derive(Clone)]
pub struct TileLoader {
    state: SharedState,
    fetcher: Arc<dyn TileFetcher>,
    events: TileEvents,
    next_batch: Arc<AtomicU64>,
}

impl TileLoader {
    pub fn new(state: SharedState, fetcher: Arc<dyn TileFetcher>, events: TileEvents) -> Self {
        Self {
            state,
            fetcher,
            events,
            next_batch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wraps `tasks` into a batch, counting it as in flight.
    ///
    /// Takes the already locked state so the reconciliation pass and the
    /// dispatch happen under one lock.
    pub fn dispatch(&self, state: &mut LayerState, tasks: Vec<TileTask>) -> Option<Batch> {
        if tasks.is_empty() {
            return None;
        }

        if state.batches_in_flight == 0 {
            self.events.emit(TileEvent::Loading);
        }
        state.batches_in_flight += 1;

        let id = self.next_batch.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("dispatching batch {} with {} tiles", id, tasks.len());
        Some(Batch {
            id,
            tasks,
            loader: self.clone(),
            _in_flight: InFlight {
                state: Arc::clone(&self.state),
                events: self.events.clone(),
            },
        })
    }

    async fn fetch_tile(&self, task: &TileTask) -> TileOutcome {
        let coord = task.coord();
        self.events.emit(TileEvent::TileLoadStart { coord });

        let result = match self.fetcher.fetch(&task.url).await {
            Ok(payload) => GeoJson::from_slice(&payload),
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => {
                // Style and filter closures run without the layer lock held
                let render_options = match self.state.lock() {
                    Ok(state) if state.cache.is_stale(&task.ticket) => {
                        log::debug!("discarding stale result for tile {}", coord);
                        return TileOutcome::Discarded;
                    }
                    Ok(state) => state.render_options.clone(),
                    Err(_) => return self.poisoned(coord),
                };
                let features = render_options.render(data);
                let overlay = TileOverlay::new(OverlayId(task.ticket.sequence), coord, features);

                let Ok(mut state) = self.state.lock() else {
                    return self.poisoned(coord);
                };
                if state.cache.complete_loaded(&task.ticket, overlay) {
                    self.events.emit(TileEvent::TileLoad { coord });
                    TileOutcome::Loaded
                } else {
                    TileOutcome::Discarded
                }
            }
            Err(e) => {
                let Ok(mut state) = self.state.lock() else {
                    return self.poisoned(coord);
                };
                let error = e.to_string();
                if state.cache.complete_failed(&task.ticket, error.clone()) {
                    log::warn!("Failed to load tile {} from {}: {}", coord, task.url, error);
                    self.events.emit(TileEvent::TileError { coord, error });
                    TileOutcome::Failed
                } else {
                    log::debug!("ignoring error for stale tile {}: {}", coord, error);
                    TileOutcome::Discarded
                }
            }
        }
    }

    fn poisoned(&self, coord: TileCoord) -> TileOutcome {
        log::warn!("tile layer state poisoned, dropping result for {}", coord);
        TileOutcome::Discarded
    }

    fn prune(&self) -> usize {
        match self.state.lock() {
            Ok(mut state) => state.cache.prune().len(),
            Err(_) => 0,
        }
    }
}

/// Decrements the in-flight counter when a batch settles or is dropped
struct InFlight {
    state: SharedState,
    events: TileEvents,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.batches_in_flight = state.batches_in_flight.saturating_sub(1);
            if state.batches_in_flight == 0 {
                self.events.emit(TileEvent::Load);
            }
        }
    }
}

/// The fetches started by one reconciliation pass.
///
/// Nothing is fetched until the batch is settled or spawned. Dropping an
/// unsettled batch abandons its fetches; their records stay `Loading` until
/// a later pass prunes or the cache is invalidated.
#[must_use = "a batch fetches nothing unless it is settled or spawned"]
pub struct Batch {
    id: u64,
    tasks: Vec<TileTask>,
    loader: TileLoader,
    _in_flight: InFlight,
}

impl Batch {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Fetch order, nearest to the viewport center first
    pub fn tasks(&self) -> &[TileTask] {
        &self.tasks
    }

    pub fn coords(&self) -> Vec<TileCoord> {
        self.tasks.iter().map(TileTask::coord).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every fetch concurrently, then prunes stale records.
    pub async fn settle(self) -> BatchReport {
        let Batch {
            id,
            tasks,
            loader,
            _in_flight: in_flight,
        } = self;

        let outcomes = join_all(tasks.iter().map(|task| loader.fetch_tile(task))).await;

        let mut report = BatchReport {
            batch_id: id,
            ..BatchReport::default()
        };
        for outcome in outcomes {
            report.record(outcome);
        }

        // Unload events go out before the counter drops so `Load` comes last
        report.pruned = loader.prune();
        drop(in_flight);

        log::debug!(
            "batch {} settled: {} loaded, {} failed, {} discarded, {} pruned",
            id,
            report.loaded,
            report.failed,
            report.discarded,
            report.pruned
        );
        report
    }

    /// Settles the batch on the tokio runtime
    #[cfg(feature = "tokio-runtime")]
    pub fn spawn(self) -> tokio::task::JoinHandle<BatchReport> {
        tokio::spawn(self.settle())
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("id", &self.id)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}
