use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use engine::{DatasetCache, EngineConfig, HeadlessPlatform, MapHost, SceneInputs};
use formats::display_config::{DisplayConfig, HubRef};
use formats::geojson::FeatureCollection;
use foundation::math::{LonLat, MercatorProjector, ProjectionParams, Vec3};
use foundation::time::Millis;
use layers::symbology::{HIT_ZONE_LIFT, SPOT_Z};
use layers::{project_local, MapKind};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the 3D map engine")]
struct Args {
    /// GeoJSON FeatureCollection for the domestic map
    #[arg(long)]
    dataset: PathBuf,

    /// GeoJSON FeatureCollection for the world map (empty world when unset)
    #[arg(long)]
    world_dataset: Option<PathBuf>,

    /// Region → city → district display config (JSON array)
    #[arg(long)]
    display: Option<PathBuf>,

    /// Engine config JSON; MAP3D_* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Domestic projection center: lon,lat
    #[arg(long, default_value = "104.0,35.0", value_parser = parse_lon_lat)]
    center: LonLat,

    /// Domestic projection scale
    #[arg(long, default_value_t = 20.0)]
    scale: f64,

    /// World projection scale (centered on 0,0)
    #[arg(long, default_value_t = 5.0)]
    world_scale: f64,

    /// Hub region name; flights need both hub flags
    #[arg(long)]
    hub_region: Option<String>,

    /// Hub city name
    #[arg(long)]
    hub_city: Option<String>,

    /// Decorative capital star: lon,lat
    #[arg(long, value_parser = parse_lon_lat)]
    capital: Option<LonLat>,

    /// Simulated run length
    #[arg(long, default_value_t = 3000.0)]
    duration_ms: f64,

    /// Simulated frame interval
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,

    /// Point the pointer at lon,lat once the intro has played
    #[arg(long, value_parser = parse_lon_lat)]
    hover: Option<LonLat>,

    /// Switch to this map kind halfway through the run
    #[arg(long)]
    switch_to: Option<MapKind>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(summary) => {
            println!("{summary:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("viewer failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    }
    .with_env_overrides()?;
    if args.frame_ms <= 0.0 || !args.frame_ms.is_finite() {
        return Err("--frame-ms must be positive".into());
    }

    let display = match &args.display {
        Some(path) => DisplayConfig::from_json_str(&read(path)?)?,
        None => DisplayConfig::default(),
    };
    let display = Arc::new(display);
    let hub = match (&args.hub_region, &args.hub_city) {
        (Some(region), Some(city)) => Some(HubRef {
            region: region.clone(),
            city: city.clone(),
        }),
        (None, None) => None,
        _ => {
            warn!("hub needs both --hub-region and --hub-city; flights disabled");
            None
        }
    };

    let mut cache = DatasetCache::new(4);
    let domestic_data = cache.get_or_parse(
        &args.dataset.display().to_string(),
        &read(&args.dataset)?,
        MapKind::Domestic,
    )?;
    let world_data = match &args.world_dataset {
        Some(path) => {
            cache.get_or_parse(&path.display().to_string(), &read(path)?, MapKind::World)?
        }
        None => Arc::new(FeatureCollection::default()),
    };

    let domestic = SceneInputs {
        kind: MapKind::Domestic,
        dataset: domestic_data,
        projection: ProjectionParams::new(args.center, args.scale),
        display: display.clone(),
        hub,
        capital: args.capital,
    };
    let world = SceneInputs {
        kind: MapKind::World,
        dataset: world_data,
        projection: ProjectionParams::new(LonLat::new(0.0, 0.0), args.world_scale),
        display,
        hub: None,
        capital: None,
    };
    let hover_projection = domestic.projection;

    let platform = HeadlessPlatform::new(config.device_pixel_ratio);
    let intro_ms = config.animation.intro_duration_ms;
    let defer_ms = config.build_defer_ms;
    let mut host = MapHost::new(platform, config);
    host.mount_both(domestic, world, Millis(0.0))?;

    let hover_at = defer_ms + intro_ms + args.frame_ms;
    let switch_at = args.duration_ms * 0.5;
    let mut hovered = false;
    let mut switched = false;
    let mut frames = 0;
    let mut now = 0.0;
    while now <= args.duration_ms {
        if !hovered && now >= hover_at {
            hovered = true;
            if let Some(target) = args.hover {
                point_at(&mut host, hover_projection, target);
            }
        }
        if !switched && now >= switch_at {
            switched = true;
            if let Some(kind) = args.switch_to {
                host.switch_to(kind);
            }
        }
        frames += host.pump(Millis(now));
        now += args.frame_ms;
    }

    let active = host.active();
    let tooltip = active.tooltip().map(|t| {
        json!({
            "label": t.label,
            "parent": t.parent_name,
            "links": t.links.iter().map(|l| json!({"name": l.name, "url": l.url})).collect::<Vec<_>>(),
            "is_interactive_kind": t.is_interactive_kind,
            "pinned": t.pinned,
        })
    });
    let diagnostics = active.diagnostics().map(serde_json::to_value).transpose()?;
    let summary_kind = active.kind();
    let state = active.state();
    let live = active.resource_counts().total();
    let cache_stats = cache.stats();

    host.unmount_all();
    let leaked = host.instance(MapKind::Domestic).resource_counts().total()
        + host.instance(MapKind::World).resource_counts().total();
    info!(frames, leaked, "run finished");

    Ok(json!({
        "active": summary_kind.as_str(),
        "state": state.as_str(),
        "frames": frames,
        "max_outstanding_frames": host.platform().max_outstanding_frames(),
        "resources_live": live,
        "resources_after_unmount": leaked,
        "tooltip": tooltip,
        "diagnostics": diagnostics,
        "dataset_cache": {"hits": cache_stats.hits, "misses": cache_stats.misses},
    }))
}

fn point_at(host: &mut MapHost<HeadlessPlatform>, projection: ProjectionParams, target: LonLat) {
    let projector = MercatorProjector::new(projection);
    let Some(local) = project_local(&projector, target) else {
        warn!(lon = target.lon_deg, lat = target.lat_deg, "hover target does not project");
        return;
    };
    let anchor = Vec3::new(local.x, local.y, SPOT_Z + HIT_ZONE_LIFT);
    let px = host.instance(MapKind::Domestic).screen_position(anchor);
    match px {
        Some(px) => host.pointer_move(px),
        None => warn!("hover target is off screen"),
    }
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()).into())
}

fn parse_lon_lat(raw: &str) -> Result<LonLat, String> {
    let (lon, lat) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat, got {raw:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("bad longitude: {lon:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude: {lat:?}"))?;
    let at = LonLat::new(lon, lat);
    if at.is_valid() {
        Ok(at)
    } else {
        Err(format!("out of range: {raw:?}"))
    }
}
