//! Core data types for tile lifecycle tracking

use crate::core::geo::{TileCoord, TileKey};
use crate::layers::overlay::TileOverlay;

/// Load state of one tracked tile.
///
/// A record moves `Unset -> Loading -> {Loaded, Failed}` and never leaves a
/// terminal state; a tile that is required again after being pruned gets a
/// brand new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    #[default]
    Unset,
    Loading,
    Loaded,
    Failed,
}

impl LoadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Loaded | LoadState::Failed)
    }
}

/// Identifies the one fetch allowed to complete a record.
///
/// `epoch` is the cache generation at dispatch time and `sequence` the
/// record's own number; a completion carrying either an old epoch or a
/// sequence that no longer matches the record is stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub key: TileKey,
    pub coord: TileCoord,
    pub epoch: u64,
    pub sequence: u64,
}

/// Cache entry for one tile key.
///
/// Invariant: `overlay` is `Some` exactly when the state is `Loaded`.
#[derive(Debug)]
pub struct TileRecord {
    coord: TileCoord,
    load_state: LoadState,
    pub(crate) current: bool,
    overlay: Option<TileOverlay>,
    error: Option<String>,
    sequence: u64,
}

impl TileRecord {
    pub(crate) fn new(coord: TileCoord, sequence: u64) -> Self {
        Self {
            coord,
            load_state: LoadState::Unset,
            current: false,
            overlay: None,
            error: None,
            sequence,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn key(&self) -> TileKey {
        self.coord.key()
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_current(&self) -> bool {
        self.current
    }

    pub fn overlay(&self) -> Option<&TileOverlay> {
        self.overlay.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn begin_loading(&mut self) {
        if self.load_state == LoadState::Unset {
            self.load_state = LoadState::Loading;
        }
    }

    pub(crate) fn mark_loaded(&mut self, overlay: TileOverlay) {
        self.load_state = LoadState::Loaded;
        self.overlay = Some(overlay);
        self.error = None;
    }

    pub(crate) fn mark_failed(&mut self, error: String) {
        self.load_state = LoadState::Failed;
        self.overlay = None;
        self.error = Some(error);
    }

    pub(crate) fn take_overlay(&mut self) -> Option<TileOverlay> {
        self.overlay.take()
    }

    pub(crate) fn snapshot(&self) -> TileSnapshot {
        TileSnapshot {
            coord: self.coord,
            key: self.key(),
            load_state: self.load_state,
            current: self.current,
            error: self.error.clone(),
            feature_count: self.overlay.as_ref().map_or(0, |o| o.features().len()),
        }
    }
}

/// Read-only copy of a record handed out to callers
#[derive(Debug, Clone, PartialEq)]
pub struct TileSnapshot {
    pub coord: TileCoord,
    pub key: TileKey,
    pub load_state: LoadState,
    pub current: bool,
    pub error: Option<String>,
    pub feature_count: usize,
}

/// What happened to one fetch of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    Loaded,
    Failed,
    /// The completion arrived after the record it was meant for went away
    Discarded,
}

/// Summary returned once every fetch of a batch has resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub batch_id: u64,
    pub loaded: usize,
    pub failed: usize,
    pub discarded: usize,
    pub pruned: usize,
}

impl BatchReport {
    pub(crate) fn record(&mut self, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Loaded => self.loaded += 1,
            TileOutcome::Failed => self.failed += 1,
            TileOutcome::Discarded => self.discarded += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.loaded + self.failed + self.discarded
    }
}
