// quakedist - command-line distance calculator
//
// Builds a raster site grid around a seismic source, computes the
// requested distance measures and prints a per-measure summary.

use clap::Parser;
use serde::Deserialize;
use tracing::info;

use quakedist::config::Config;
use quakedist::distance::{self, DistanceMeasure};
use quakedist::ps2ff::TableStore;
use quakedist::rupture::{EventParams, Point, Quadrilateral, Rupture, Source, TectonicRegion};
use quakedist::sites::SiteGrid;

/// On-disk rupture description: quadrilaterals grouped by segment
#[derive(Debug, Deserialize)]
struct RuptureFile {
    segments: Vec<Vec<Quadrilateral>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_logging(config.verbose);

    // Assemble the source
    let rupture = match &config.rupture {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let file: RuptureFile = serde_json::from_str(&text)?;
            let r = Rupture::from_segments(file.segments)?;
            info!(
                "loaded rupture: {} quadrilaterals in {} segments",
                r.quads().len(),
                r.segment_count()
            );
            Some(r)
        }
        None => None,
    };
    let hypocenter = match &config.hypocenter {
        Some(s) => Some(parse_hypocenter(s)?),
        None => None,
    };
    if rupture.is_none() && hypocenter.is_none() {
        return Err("need at least one of --rupture and --hypocenter".into());
    }
    let event = EventParams {
        magnitude: config.magnitude,
        rake: config.rake,
        tectonic_region: parse_region(config.region.as_deref())?,
    };
    let source = Source {
        rupture,
        hypocenter,
        event,
    };

    // Site grid
    let bounds = match &config.bounds {
        Some(s) => parse_bounds(s)?,
        None => default_bounds(&source),
    };
    let sites = build_grid(bounds, config.spacing)?;
    info!(
        "site grid: {} points over lon {}..{}, lat {}..{}",
        sites.len(),
        bounds[0],
        bounds[1],
        bounds[2],
        bounds[3]
    );

    // Requested measures
    let measures: Vec<DistanceMeasure> = if config.measures.is_empty() {
        DistanceMeasure::ALL.to_vec()
    } else {
        config
            .measures
            .iter()
            .map(|s| s.parse())
            .collect::<Result<_, _>>()?
    };

    let tables = TableStore::with_defaults();
    let result = distance::get_distances(
        &measures,
        &sites,
        &source,
        &tables,
        !config.no_median_distance,
    )?;

    println!("{:>6} {:>12} {:>12} {:>12}", "dist", "min km", "mean km", "max km");
    for m in &measures {
        if let Some(v) = result.get(*m) {
            let (min, mean, max) = stats(v);
            println!("{:>6} {:>12.3} {:>12.3} {:>12.3}", m.to_string(), min, mean, max);
        }
    }
    if let Some(var) = &result.rjb_var {
        let (min, mean, max) = stats(var);
        println!("{:>6} {:>12.3} {:>12.3} {:>12.3}", "rjbvar", min, mean, max);
    }
    if let Some(var) = &result.rrup_var {
        let (min, mean, max) = stats(var);
        println!("{:>6} {:>12.3} {:>12.3} {:>12.3}", "rrupvar", min, mean, max);
    }
    if !result.warnings.is_empty() {
        println!();
        for w in &result.warnings {
            println!("warning: {}", w);
        }
    }

    Ok(())
}

fn stats(v: &[f64]) -> (f64, f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &x in v {
        min = min.min(x);
        max = max.max(x);
        sum += x;
    }
    (min, sum / v.len().max(1) as f64, max)
}

fn parse_hypocenter(s: &str) -> Result<Point, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("invalid hypocenter '{}': expected LON,LAT,DEPTH", s));
    }
    let nums: Result<Vec<f64>, _> = parts.iter().map(|p| p.trim().parse::<f64>()).collect();
    match nums {
        Ok(n) => Ok(Point::new(n[0], n[1], n[2])),
        Err(e) => Err(format!("invalid hypocenter '{}': {}", s, e)),
    }
}

fn parse_bounds(s: &str) -> Result<[f64; 4], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err(format!("invalid bounds '{}': expected W,E,S,N", s));
    }
    let nums: Result<Vec<f64>, _> = parts.iter().map(|p| p.trim().parse::<f64>()).collect();
    match nums {
        Ok(n) if n[0] < n[1] && n[2] < n[3] => Ok([n[0], n[1], n[2], n[3]]),
        Ok(_) => Err(format!("invalid bounds '{}': need W<E and S<N", s)),
        Err(e) => Err(format!("invalid bounds '{}': {}", s, e)),
    }
}

fn parse_region(s: Option<&str>) -> Result<Option<TectonicRegion>, String> {
    let s = match s {
        Some(s) => s,
        None => return Ok(None),
    };
    match s {
        "active-shallow-crust" => Ok(Some(TectonicRegion::ActiveShallowCrust)),
        "stable-shallow-crust" => Ok(Some(TectonicRegion::StableShallowCrust)),
        "subduction" => Ok(Some(TectonicRegion::Subduction)),
        "volcanic" => Ok(Some(TectonicRegion::Volcanic)),
        other => Err(format!("unknown tectonic region '{}'", other)),
    }
}

/// Bounds covering the hypocenter and every rupture vertex with a
/// one-degree margin
fn default_bounds(source: &Source) -> [f64; 4] {
    let mut lons = Vec::new();
    let mut lats = Vec::new();
    if let Some(h) = &source.hypocenter {
        lons.push(h.lon);
        lats.push(h.lat);
    }
    if let Some(r) = &source.rupture {
        for quad in r.quads() {
            for c in quad.corners() {
                lons.push(c.lon);
                lats.push(c.lat);
            }
        }
    }
    let min = |v: &[f64]| v.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = |v: &[f64]| v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    [
        min(&lons) - 1.0,
        max(&lons) + 1.0,
        min(&lats) - 1.0,
        max(&lats) + 1.0,
    ]
}

/// Row-major raster grid over the bounds, north to south, at the surface
fn build_grid(bounds: [f64; 4], spacing: f64) -> Result<SiteGrid, Box<dyn std::error::Error>> {
    if spacing <= 0.0 {
        return Err("grid spacing must be positive".into());
    }
    let [west, east, south, north] = bounds;
    let nx = ((east - west) / spacing).floor() as usize + 1;
    let ny = ((north - south) / spacing).floor() as usize + 1;

    let mut lat = Vec::with_capacity(ny * nx);
    let mut lon = Vec::with_capacity(ny * nx);
    for iy in 0..ny {
        for ix in 0..nx {
            lat.push(north - iy as f64 * spacing);
            lon.push(west + ix as f64 * spacing);
        }
    }
    let dep = vec![0.0; ny * nx];
    Ok(SiteGrid::raster(lat, lon, dep, ny, nx)?)
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
