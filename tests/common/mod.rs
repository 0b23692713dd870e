//! Shared test doubles for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::oneshot;
use tilegeojson::prelude::*;

pub const TEMPLATE: &str = "mock://{z}/{x}/{y}.json";

/// Two features per tile: a point of interest and a road
pub const DEFAULT_BODY: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"kind": "poi"},
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
        },
        {
            "type": "Feature",
            "properties": {"kind": "road"},
            "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
        }
    ]
}"#;

#[derive(Clone)]
enum Scripted {
    Body(Vec<u8>),
    Status(u16),
}

/// In-memory transport. Unknown URLs answer with [`DEFAULT_BODY`].
#[derive(Default)]
pub struct MockFetcher {
    scripted: Mutex<HashMap<String, Scripted>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, body: &str) {
        self.scripted
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Body(body.as_bytes().to_vec()));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.scripted
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Status(status));
    }

    /// Holds the response for `url` until the returned sender fires or drops
    pub fn gate(&self, url: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(url.to_string(), rx);
        tx
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| *r == url).count()
    }
}

#[async_trait]
impl TileFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());

        let gate = self.gates.lock().unwrap().remove(url);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let scripted = self.scripted.lock().unwrap().get(url).cloned();
        match scripted {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::Status(status)) => Err(MapError::Http {
                status,
                url: url.to_string(),
            }),
            None => Ok(DEFAULT_BODY.as_bytes().to_vec()),
        }
    }
}

/// Projection where one tile is one unit.
///
/// The viewport center's `lng`/`lat` are read directly as tile-grid `x`/`y`
/// and the viewport size as the visible span in tiles. Only tiles with
/// non-negative coordinates are valid.
#[derive(Debug, Default)]
pub struct FixedGridProjection;

impl Projection for FixedGridProjection {
    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom
    }

    fn pixel_bounds_for_center(&self, viewport: &Viewport, center: &LatLng, _tile_zoom: u8) -> Bounds {
        let half = viewport.size.divide_by(2.0);
        let center = Point::new(center.lng, center.lat);
        Bounds::new(center.subtract(&half), center.add(&half))
    }

    fn tile_range_from_pixel_bounds(&self, bounds: &Bounds) -> TileRange {
        Bounds::new(
            bounds.min.floor(),
            bounds.max.ceil().subtract(&Point::new(1.0, 1.0)),
        )
    }

    fn is_valid_tile(&self, coord: &TileCoord) -> bool {
        coord.x >= 0 && coord.y >= 0
    }
}

/// Viewport covering `width` x `height` tiles centered on tile-grid `(x, y)`
pub fn grid_viewport(x: f64, y: f64, zoom: f64, width: f64, height: f64) -> Viewport {
    Viewport::new(LatLng::new(y, x), zoom, Point::new(width, height))
}

/// Viewport whose fetch range is exactly the square of `span` tiles
/// starting at `(min_x, min_y)`
pub fn square(min_x: i32, min_y: i32, span: i32, zoom: f64) -> Viewport {
    let half = span as f64 / 2.0;
    grid_viewport(min_x as f64 + half, min_y as f64 + half, zoom, span as f64, span as f64)
}

pub fn url(coord: TileCoord) -> String {
    format!("mock://{}/{}/{}.json", coord.z, coord.x, coord.y)
}

pub struct Harness {
    pub layer: TileGeoJsonLayer,
    pub fetcher: Arc<MockFetcher>,
    pub sink: MemoryOverlaySink,
}

/// Attached layer on the fixed grid with the given keep buffer
pub fn harness(keep_buffer: u32) -> Harness {
    harness_with(TileLayerOptions::default().with_keep_buffer(keep_buffer))
}

pub fn harness_with(options: TileLayerOptions) -> Harness {
    let fetcher = MockFetcher::new();
    let sink = MemoryOverlaySink::new();
    let mut layer = TileGeoJsonLayer::builder(TEMPLATE)
        .with_options(options)
        .with_projection(Arc::new(FixedGridProjection))
        .with_fetcher(fetcher.clone())
        .with_sink(Arc::new(sink.clone()))
        .build()
        .expect("layer builds");
    layer.attach();
    Harness {
        layer,
        fetcher,
        sink,
    }
}

/// Runs one pass and settles its batch, if any
pub async fn load(layer: &mut TileGeoJsonLayer, viewport: &Viewport) -> Option<BatchReport> {
    match layer.on_viewport_changed(viewport).expect("reconciliation succeeds") {
        Some(batch) => Some(batch.settle().await),
        None => None,
    }
}
