use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::core::geo::TileCoord;

/// Queue length after which new events are dropped until someone drains it
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Lifecycle notifications emitted by a tile layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TileEvent {
    /// The first batch started while no other batch was in flight
    Loading,
    TileLoadStart { coord: TileCoord },
    TileLoad { coord: TileCoord },
    TileError { coord: TileCoord, error: String },
    /// A loaded tile's overlay was removed by pruning
    TileUnload { coord: TileCoord },
    /// The last in-flight batch finished
    Load,
}

/// Sending half shared by every component of a layer, plus a receiver that
/// can be cloned out to any number of consumers.
#[derive(Debug, Clone)]
pub struct TileEvents {
    tx: Sender<TileEvent>,
    rx: Receiver<TileEvent>,
}

impl TileEvents {
    pub fn new() -> Self {
        let (tx, rx) = bounded(EVENT_QUEUE_CAPACITY);
        Self { tx, rx }
    }

    pub fn emit(&self, event: TileEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::trace!("event queue full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn receiver(&self) -> Receiver<TileEvent> {
        self.rx.clone()
    }

    /// Everything queued right now, oldest first
    pub fn drain(&self) -> Vec<TileEvent> {
        self.rx.try_iter().collect()
    }
}

impl Default for TileEvents {
    fn default() -> Self {
        Self::new()
    }
}
