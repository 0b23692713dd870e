use std::sync::Arc;

use crate::core::bounds::TileRange;
use crate::core::geo::{TileCoord, TileKey};
use crate::layers::overlay::TileOverlay;
use crate::layers::tile::events::{TileEvent, TileEvents};
use crate::layers::tile::types::{FetchTicket, LoadState, TileRecord, TileSnapshot};
use crate::prelude::HashMap;
use crate::traits::OverlaySink;

/// Keyed store of tile records for one layer.
///
/// The cache owns every overlay it hands to the sink: an overlay is added to
/// the sink when its record becomes `Loaded` and removed again when the record
/// is pruned or the whole cache is invalidated.
pub struct TileCache {
    tiles: HashMap<TileKey, TileRecord>,
    sink: Arc<dyn OverlaySink>,
    events: Option<TileEvents>,
    active_zoom: Option<u8>,
    epoch: u64,
    next_sequence: u64,
}

impl TileCache {
    pub fn new(sink: Arc<dyn OverlaySink>) -> Self {
        Self {
            tiles: HashMap::default(),
            sink,
            events: None,
            active_zoom: None,
            epoch: 0,
            next_sequence: 0,
        }
    }

    /// Emits `TileUnload` whenever a loaded tile's overlay is removed
    pub fn with_events(mut self, events: TileEvents) -> Self {
        self.events = Some(events);
        self
    }

    fn notify_unload(&self, coord: TileCoord) {
        if let Some(events) = &self.events {
            events.emit(TileEvent::TileUnload { coord });
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, coord: &TileCoord) -> Option<&TileRecord> {
        self.tiles.get(&coord.key())
    }

    pub fn records(&self) -> impl Iterator<Item = &TileRecord> {
        self.tiles.values()
    }

    /// Sorted copies of every record
    pub fn snapshots(&self) -> Vec<TileSnapshot> {
        let mut snapshots: Vec<_> = self.tiles.values().map(TileRecord::snapshot).collect();
        snapshots.sort_by_key(|s| s.coord);
        snapshots
    }

    pub fn active_zoom(&self) -> Option<u8> {
        self.active_zoom
    }

    pub fn set_active_zoom(&mut self, zoom: Option<u8>) {
        self.active_zoom = zoom;
    }

    /// Generation counter; bumped by every invalidation
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drops every record and overlay and starts a new epoch.
    ///
    /// Fetches dispatched before this call can no longer complete a record.
    /// Returns how many records were dropped.
    pub fn invalidate_all(&mut self) -> usize {
        for record in self.tiles.values() {
            if record.load_state() == LoadState::Loaded {
                self.notify_unload(record.coord());
            }
        }
        self.sink.clear_overlays();
        let dropped = self.tiles.len();
        self.tiles.clear();
        self.active_zoom = None;
        self.epoch += 1;
        log::debug!("invalidated {} tiles, epoch is now {}", dropped, self.epoch);
        dropped
    }

    /// Flags records outside `keep` or at another zoom as stale. Records
    /// inside `keep` are left as they are; only enumeration of the fetch
    /// range makes a record current again.
    pub fn mark_current_or_stale(&mut self, keep: &TileRange, zoom: u8) {
        for record in self.tiles.values_mut() {
            let coord = record.coord();
            if coord.z != zoom || !keep.contains(&coord.as_point()) {
                record.current = false;
            }
        }
    }

    /// Returns the record for `coord`, creating it in `Loading` state when
    /// absent. The flag is true when the record was created by this call.
    pub fn get_or_create(&mut self, coord: TileCoord) -> (&mut TileRecord, bool) {
        let mut created = false;
        let next_sequence = &mut self.next_sequence;
        let record = self.tiles.entry(coord.key()).or_insert_with(|| {
            created = true;
            *next_sequence += 1;
            let mut record = TileRecord::new(coord, *next_sequence);
            record.begin_loading();
            record.current = true;
            record
        });
        (record, created)
    }

    /// Ticket a fetch for `record` must present to complete it
    pub fn ticket_for(&self, record: &TileRecord) -> FetchTicket {
        FetchTicket {
            key: record.key(),
            coord: record.coord(),
            epoch: self.epoch,
            sequence: record.sequence(),
        }
    }

    /// Removes every record whose `current` flag is false and returns them.
    ///
    /// Overlays of removed `Loaded` records are taken out of the sink first,
    /// so the returned records carry no overlay.
    /// Calling it twice in a row removes nothing the second time.
    pub fn prune(&mut self) -> Vec<TileRecord> {
        let stale: Vec<TileKey> = self
            .tiles
            .iter()
            .filter(|(_, record)| !record.current)
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = Vec::with_capacity(stale.len());
        for key in stale {
            if let Some(mut record) = self.tiles.remove(&key) {
                if let Some(overlay) = record.take_overlay() {
                    self.sink.remove_overlay(&overlay);
                    self.notify_unload(record.coord());
                }
                removed.push(record);
            }
        }
        if !removed.is_empty() {
            log::debug!("pruned {} tiles, {} remain", removed.len(), self.tiles.len());
        }
        removed
    }

    /// True when `ticket` can no longer complete its record
    pub fn is_stale(&self, ticket: &FetchTicket) -> bool {
        self.pending_record(ticket).is_none()
    }

    fn pending_record(&self, ticket: &FetchTicket) -> Option<&TileRecord> {
        if ticket.epoch != self.epoch {
            return None;
        }
        self.tiles
            .get(&ticket.key)
            .filter(|r| r.sequence() == ticket.sequence && r.load_state() == LoadState::Loading)
    }

    fn pending_record_mut(&mut self, ticket: &FetchTicket) -> Option<&mut TileRecord> {
        if ticket.epoch != self.epoch {
            return None;
        }
        self.tiles
            .get_mut(&ticket.key)
            .filter(|r| r.sequence() == ticket.sequence && r.load_state() == LoadState::Loading)
    }

    /// Stores a successful fetch and hands its overlay to the sink.
    ///
    /// Returns false, leaving cache and sink untouched, when the ticket is
    /// stale.
    pub fn complete_loaded(&mut self, ticket: &FetchTicket, overlay: TileOverlay) -> bool {
        let sink = Arc::clone(&self.sink);
        let Some(record) = self.pending_record_mut(ticket) else {
            return false;
        };
        sink.add_overlay(&overlay);
        record.mark_loaded(overlay);
        record.current = true;
        true
    }

    /// Records a failed fetch. The record keeps its `current` flag so a tile
    /// that is still in view is not fetched again on the next pass.
    pub fn complete_failed(&mut self, ticket: &FetchTicket, error: String) -> bool {
        let Some(record) = self.pending_record_mut(ticket) else {
            return false;
        };
        record.mark_failed(error);
        true
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("tiles", &self.tiles.len())
            .field("active_zoom", &self.active_zoom)
            .field("epoch", &self.epoch)
            .finish()
    }
}
