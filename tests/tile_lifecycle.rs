//! End-to-end tile lifecycle: reconciliation, batching, pruning and
//! stale-response suppression, driven the way a hosting map would.

mod common;

use common::*;
use tilegeojson::prelude::*;

fn coord(x: i32, y: i32, z: u8) -> TileCoord {
    TileCoord::new(x, y, z)
}

#[tokio::test]
async fn test_fetches_closest_tiles_first_and_reuses_existing() {
    let Harness {
        mut layer, fetcher, ..
    } = harness(1);

    load(&mut layer, &square(2, 2, 1, 5.0)).await.unwrap();
    assert_eq!(layer.tile(&coord(2, 2, 5)).unwrap().load_state, LoadState::Loaded);

    let batch = layer
        .on_viewport_changed(&square(1, 1, 3, 5.0))
        .unwrap()
        .expect("eight tiles are missing");
    assert_eq!(
        batch.coords(),
        vec![
            coord(2, 1, 5),
            coord(1, 2, 5),
            coord(3, 2, 5),
            coord(2, 3, 5),
            coord(1, 1, 5),
            coord(3, 1, 5),
            coord(1, 3, 5),
            coord(3, 3, 5),
        ]
    );
    // Existing tile stays current while the batch is in flight
    assert!(layer.tile(&coord(2, 2, 5)).unwrap().current);

    let report = batch.settle().await;
    assert_eq!(report.loaded, 8);
    assert_eq!(report.pruned, 0);
    assert_eq!(fetcher.request_count(&url(coord(2, 2, 5))), 1);
    assert_eq!(layer.tile_count(), 9);
}

#[tokio::test]
async fn test_margin_tiles_survive_pruning() {
    let Harness {
        mut layer, sink, ..
    } = harness(1);

    // One row of six tiles, x = 0..=5 at y = 2
    load(&mut layer, &grid_viewport(3.0, 2.5, 5.0, 6.0, 1.0))
        .await
        .unwrap();
    assert_eq!(layer.tile_count(), 6);

    let report = load(&mut layer, &square(1, 1, 3, 5.0)).await.unwrap();
    assert_eq!(report.loaded, 6);
    assert_eq!(report.pruned, 1);

    // Outside the 3x3 fetch range but inside the 5x5 keep range
    for kept in [coord(0, 2, 5), coord(4, 2, 5)] {
        let tile = layer.tile(&kept).expect("margin tile kept");
        assert_eq!(tile.load_state, LoadState::Loaded);
        assert!(sink.contains(&kept));
    }
    // Beyond the margin
    assert!(layer.tile(&coord(5, 2, 5)).is_none());
    assert!(!sink.contains(&coord(5, 2, 5)));
    assert_eq!(layer.tile_count(), 11);
    assert_eq!(sink.len(), 11);
}

#[tokio::test]
async fn test_stale_tile_stays_stale_when_view_returns_to_margin() {
    let Harness { mut layer, .. } = harness(1);

    load(&mut layer, &square(0, 0, 3, 5.0)).await.unwrap();
    assert_eq!(layer.tile_count(), 9);

    // Pan away and abandon the batch before it settles
    let away = layer.on_viewport_changed(&square(10, 10, 3, 5.0)).unwrap();
    drop(away);
    assert!(!layer.tile(&coord(0, 0, 5)).unwrap().current);

    // (0, 0) is back inside the keep margin but outside the fetch range
    let back = layer
        .on_viewport_changed(&square(1, 1, 3, 5.0))
        .unwrap()
        .expect("row and column 3 are missing");
    assert!(!layer.tile(&coord(0, 0, 5)).unwrap().current);
    assert!(layer.tile(&coord(1, 1, 5)).unwrap().current);

    back.settle().await;
    assert!(layer.tile(&coord(0, 0, 5)).is_none());
    assert!(layer.tile(&coord(0, 1, 5)).is_none());
    assert!(layer.tile(&coord(10, 10, 5)).is_none());
    assert_eq!(layer.tile(&coord(1, 1, 5)).unwrap().load_state, LoadState::Loaded);
    assert_eq!(layer.tile_count(), 9);
}

#[tokio::test]
async fn test_every_required_tile_has_a_record() {
    let Harness { mut layer, .. } = harness(2);
    let viewport = grid_viewport(10.3, 7.5, 6.0, 4.5, 2.0);

    load(&mut layer, &viewport).await.unwrap();

    let tiles = layer.tiles();
    for x in 8..=12 {
        for y in 6..=8 {
            let tile = tiles
                .iter()
                .find(|t| t.coord == coord(x, y, 6))
                .unwrap_or_else(|| panic!("missing record for {}/{}", x, y));
            assert_eq!(tile.load_state, LoadState::Loaded);
            assert!(tile.current);
        }
    }
    assert_eq!(tiles.len(), 15);
}

#[tokio::test]
async fn test_failed_tile_does_not_block_batch() {
    let Harness {
        mut layer,
        fetcher,
        sink,
    } = harness(1);
    fetcher.fail(&url(coord(1, 1, 4)), 500);

    let report = load(&mut layer, &square(0, 0, 3, 4.0)).await.unwrap();
    assert_eq!(report.loaded, 8);
    assert_eq!(report.failed, 1);

    let failed = layer.tile(&coord(1, 1, 4)).unwrap();
    assert_eq!(failed.load_state, LoadState::Failed);
    assert!(failed.error.unwrap().contains("500"));
    assert_eq!(failed.feature_count, 0);
    assert!(!sink.contains(&coord(1, 1, 4)));
    assert_eq!(sink.len(), 8);
    assert!(!layer.is_loading());

    // Still required, so it is neither refetched nor pruned
    assert!(layer.on_viewport_changed(&square(0, 0, 3, 4.0)).unwrap().is_none());
    assert_eq!(fetcher.request_count(&url(coord(1, 1, 4))), 1);
}

#[tokio::test]
async fn test_malformed_payload_is_a_failure() {
    let Harness {
        mut layer, fetcher, ..
    } = harness(0);
    fetcher.respond(&url(coord(0, 0, 2)), "{ not json");
    fetcher.respond(&url(coord(1, 0, 2)), r#"{"type": "Topology"}"#);

    let report = load(&mut layer, &grid_viewport(1.0, 0.5, 2.0, 2.0, 1.0))
        .await
        .unwrap();
    assert_eq!(report.failed, 2);
    assert_eq!(layer.tile(&coord(0, 0, 2)).unwrap().load_state, LoadState::Failed);
    assert_eq!(layer.tile(&coord(1, 0, 2)).unwrap().load_state, LoadState::Failed);
}

#[tokio::test]
async fn test_stale_completion_after_zoom_change_is_discarded() {
    let Harness {
        mut layer,
        fetcher,
        sink,
    } = harness(1);
    let release = fetcher.gate(&url(coord(0, 0, 3)));

    let slow = layer
        .on_viewport_changed(&square(0, 0, 1, 3.0))
        .unwrap()
        .unwrap();
    let slow = tokio::spawn(slow.settle());

    // Zooming in resets the cache before the slow tile answers
    let report = load(&mut layer, &square(0, 0, 1, 4.0)).await.unwrap();
    assert_eq!(report.loaded, 1);
    assert_eq!(layer.active_zoom(), Some(4));

    release.send(()).unwrap();
    let report = slow.await.unwrap();
    assert_eq!(report.loaded, 0);
    assert_eq!(report.discarded, 1);

    assert!(layer.tile(&coord(0, 0, 3)).is_none());
    assert_eq!(sink.coords(), vec![coord(0, 0, 4)]);
    assert_eq!(layer.tile(&coord(0, 0, 4)).unwrap().load_state, LoadState::Loaded);
    assert!(!layer.is_loading());
}

#[tokio::test]
async fn test_stale_completion_after_round_trip_zoom_is_discarded() {
    let Harness {
        mut layer,
        fetcher,
        sink,
    } = harness(1);
    let release = fetcher.gate(&url(coord(0, 0, 3)));

    let slow = layer
        .on_viewport_changed(&square(0, 0, 1, 3.0))
        .unwrap()
        .unwrap();
    let slow = tokio::spawn(slow.settle());

    // Out and back again: the zoom matches but the epoch does not
    assert!(load(&mut layer, &square(0, 0, 1, 4.0)).await.is_some());
    let fresh = layer
        .on_viewport_changed(&square(0, 0, 1, 3.0))
        .unwrap()
        .unwrap();

    release.send(()).unwrap();
    assert_eq!(slow.await.unwrap().discarded, 1);
    assert_eq!(layer.tile(&coord(0, 0, 3)).unwrap().load_state, LoadState::Loading);
    assert!(sink.is_empty());

    let report = fresh.settle().await;
    assert_eq!(report.loaded, 1);
    assert_eq!(sink.coords(), vec![coord(0, 0, 3)]);
}

#[tokio::test]
async fn test_zoom_drift_forces_reset_without_zoom_updates() {
    let Harness { mut layer, .. } =
        harness_with(TileLayerOptions {
            update_when_zooming: false,
            ..TileLayerOptions::default()
        });

    load(&mut layer, &square(0, 0, 2, 3.0)).await.unwrap();
    assert_eq!(layer.active_zoom(), Some(3));

    // Within one level the tiles at zoom 3 are kept
    assert!(layer.on_viewport_changed(&square(0, 0, 2, 3.8)).unwrap().is_none());
    assert_eq!(layer.active_zoom(), Some(3));

    let epoch = layer.epoch();
    let batch = layer.on_viewport_changed(&square(0, 0, 2, 5.0)).unwrap().unwrap();
    assert_eq!(layer.active_zoom(), Some(5));
    assert!(layer.epoch() > epoch);
    assert!(batch.coords().iter().all(|c| c.z == 5));
    batch.settle().await;
    assert!(layer.tiles().iter().all(|t| t.coord.z == 5));
}

#[tokio::test]
async fn test_zoom_outside_layer_range_clears_tiles() {
    let Harness {
        mut layer, sink, ..
    } = harness_with(TileLayerOptions::default().with_zoom_range(2, 8));

    load(&mut layer, &square(0, 0, 2, 4.0)).await.unwrap();
    assert_eq!(sink.len(), 4);

    assert!(layer.on_viewport_changed(&square(0, 0, 2, 9.0)).unwrap().is_none());
    assert_eq!(layer.active_zoom(), None);
    assert_eq!(layer.tile_count(), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_unbounded_viewport_aborts_pass() {
    let Harness { mut layer, .. } = harness(1);
    load(&mut layer, &square(0, 0, 2, 3.0)).await.unwrap();

    let unbounded = grid_viewport(1.0, 1.0, 3.0, f64::INFINITY, 2.0);
    let err = layer.on_viewport_changed(&unbounded).unwrap_err();
    assert!(matches!(err, MapError::UnboundedViewport));
    assert_eq!(err.to_string(), "attempted to load an infinite number of tiles");

    let nan = grid_viewport(f64::NAN, 1.0, 3.0, 2.0, 2.0);
    assert!(matches!(
        layer.on_viewport_changed(&nan).unwrap_err(),
        MapError::UnboundedViewport
    ));

    assert_eq!(layer.tile_count(), 4);
    assert!(layer.tiles().iter().all(|t| t.current));
    assert!(!layer.is_loading());
}

#[tokio::test]
async fn test_redraw_requests_the_same_tiles() {
    let Harness {
        mut layer, fetcher, ..
    } = harness(1);
    let viewport = grid_viewport(4.2, 3.7, 6.0, 3.0, 2.0);

    let first = layer.on_viewport_changed(&viewport).unwrap().unwrap();
    let mut expected = first.coords();
    first.settle().await;
    let epoch = layer.epoch();

    let again = layer.redraw().unwrap().unwrap();
    let mut coords = again.coords();
    again.settle().await;

    expected.sort();
    coords.sort();
    assert_eq!(coords, expected);
    assert!(layer.epoch() > epoch);
    assert_eq!(fetcher.requests().len(), expected.len() * 2);
}

#[tokio::test]
async fn test_detach_then_attach_starts_empty() {
    let Harness {
        mut layer,
        fetcher,
        sink,
    } = harness(1);
    load(&mut layer, &square(0, 0, 2, 3.0)).await.unwrap();
    assert_eq!(sink.len(), 4);

    let release = fetcher.gate(&url(coord(4, 4, 3)));
    let pending = layer
        .on_viewport_changed(&square(4, 4, 1, 3.0))
        .unwrap()
        .unwrap();
    let pending = tokio::spawn(pending.settle());

    layer.detach();
    assert_eq!(layer.tile_count(), 0);
    assert!(sink.is_empty());
    assert!(layer.on_viewport_changed(&square(0, 0, 2, 3.0)).unwrap().is_none());

    layer.attach();
    release.send(()).unwrap();
    assert_eq!(pending.await.unwrap().discarded, 1);
    assert_eq!(layer.tile_count(), 0);
    assert!(sink.is_empty());

    // The next viewport change loads from scratch
    let report = load(&mut layer, &square(0, 0, 2, 3.0)).await.unwrap();
    assert_eq!(report.loaded, 4);
}

#[tokio::test]
async fn test_set_source_url_reloads_from_new_source() {
    let Harness {
        mut layer, fetcher, ..
    } = harness(1);
    load(&mut layer, &square(0, 0, 1, 2.0)).await.unwrap();

    let batch = layer
        .set_source_url("mock://v2/{z}/{x}/{y}.json")
        .unwrap()
        .unwrap();
    assert_eq!(batch.tasks()[0].url, "mock://v2/2/0/0.json");
    batch.settle().await;
    assert_eq!(fetcher.requests().last().unwrap(), "mock://v2/2/0/0.json");

    assert!(matches!(
        layer.set_source_url("mock://{z}/{x}/{y}.json?key={token}"),
        Err(MapError::InvalidTemplate(_))
    ));
}

#[tokio::test]
async fn test_loading_flag_and_events() {
    let Harness { mut layer, .. } = harness(1);
    let events = layer.events();
    assert!(!layer.is_loading());

    let batch = layer
        .on_viewport_changed(&square(0, 0, 2, 3.0))
        .unwrap()
        .unwrap();
    assert!(layer.is_loading());
    batch.settle().await;
    assert!(!layer.is_loading());

    let received: Vec<TileEvent> = events.try_iter().collect();
    assert_eq!(received.first(), Some(&TileEvent::Loading));
    assert_eq!(received.last(), Some(&TileEvent::Load));
    let loads = received
        .iter()
        .filter(|e| matches!(e, TileEvent::TileLoad { .. }))
        .count();
    assert_eq!(loads, 4);

    // Panning away unloads the tiles that fall out of the keep range
    load(&mut layer, &square(10, 10, 1, 3.0)).await.unwrap();
    let unloads = events
        .try_iter()
        .filter(|e| matches!(e, TileEvent::TileUnload { .. }))
        .count();
    assert_eq!(unloads, 4);

    // A dropped batch no longer counts as in flight
    let batch = layer
        .on_viewport_changed(&square(20, 20, 1, 3.0))
        .unwrap()
        .unwrap();
    assert!(layer.is_loading());
    drop(batch);
    assert!(!layer.is_loading());
}

#[tokio::test]
async fn test_detached_layer_ignores_viewport_changes() {
    let Harness {
        mut layer, fetcher, ..
    } = harness(1);
    layer.detach();

    assert!(layer.on_viewport_changed(&square(0, 0, 2, 3.0)).unwrap().is_none());
    assert!(layer.redraw().unwrap().is_none());
    assert!(fetcher.requests().is_empty());
}
