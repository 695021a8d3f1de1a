use clap::Parser;

/// Source-to-site distance computation for ground-motion prediction
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Rupture description JSON file: {"segments": [[{quad}, ...], ...]}
    #[arg(long, value_name = "FILE")]
    pub rupture: Option<String>,

    /// Hypocenter as lon,lat,depth-km
    #[arg(long, value_name = "LON,LAT,DEPTH")]
    pub hypocenter: Option<String>,

    /// Moment magnitude
    #[arg(long, default_value_t = 6.5)]
    pub magnitude: f64,

    /// Rake angle in degrees; drives the mechanism class of the
    /// point-source conversion
    #[arg(long)]
    pub rake: Option<f64>,

    /// Tectonic region: active-shallow-crust, stable-shallow-crust,
    /// subduction or volcanic
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Grid bounds as west,east,south,north in degrees; default covers
    /// the source with a one-degree margin
    #[arg(long, value_name = "W,E,S,N")]
    pub bounds: Option<String>,

    /// Grid spacing in degrees
    #[arg(long, default_value_t = 0.05)]
    pub spacing: f64,

    /// Comma-separated distance measures to compute
    /// (default: repi,rhypo,rjb,rrup,rx,ry,ry0,U,T)
    #[arg(long, value_delimiter = ',')]
    pub measures: Vec<String>,

    /// Degrade rjb/rrup to repi/rhypo instead of using the
    /// magnitude-dependent median conversion when no rupture is available
    #[arg(long, default_value_t = false)]
    pub no_median_distance: bool,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}
