use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tilegeojson::prelude::*;

/// Load the GeoJSON tiles covering one map viewport and report what was drawn
#[derive(Parser, Debug)]
#[command(name = "tilegeojson-app", version)]
struct Args {
    /// Tile URL template, e.g. https://host/{z}/{x}/{y}.json
    url: String,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    lng: f64,

    #[arg(long, default_value_t = 2.0)]
    zoom: f64,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 600.0)]
    height: f64,

    /// Tiles kept around the visible range
    #[arg(long, default_value_t = 2)]
    keep_buffer: u32,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Layer options as a JSON document; overrides --keep-buffer
    #[arg(long)]
    options: Option<String>,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let options = match &args.options {
        Some(json) => TileLayerOptions::from_json_str(json)?,
        None => TileLayerOptions::default().with_keep_buffer(args.keep_buffer),
    };
    let fetcher = HttpFetcher::with_config(HttpFetcherConfig {
        timeout: args.timeout.map(Duration::from_secs),
        user_agent: None,
    })?;
    let sink = MemoryOverlaySink::new();

    let mut layer = TileGeoJsonLayer::builder(args.url.as_str())
        .with_options(options)
        .with_fetcher(Arc::new(fetcher))
        .with_sink(Arc::new(sink.clone()))
        .build()?;
    layer.attach();

    let viewport = Viewport::new(
        LatLng::new(args.lat, args.lng),
        args.zoom,
        Point::new(args.width, args.height),
    );
    let Some(batch) = layer.on_viewport_changed(&viewport)? else {
        log::info!("no tiles required at zoom {}", args.zoom);
        return Ok(());
    };

    log::info!("fetching {} tiles from {}", batch.len(), layer.source());
    let report = batch.spawn().await?;
    log::info!(
        "{} loaded, {} failed, {} features drawn",
        report.loaded,
        report.failed,
        sink.feature_count()
    );

    for tile in layer.tiles() {
        match tile.load_state {
            LoadState::Loaded => println!("{}\tloaded\t{} features", tile.coord, tile.feature_count),
            LoadState::Failed => println!(
                "{}\tfailed\t{}",
                tile.coord,
                tile.error.as_deref().unwrap_or("unknown error")
            ),
            state => println!("{}\t{:?}", tile.coord, state),
        }
    }

    layer.detach();
    Ok(())
}
