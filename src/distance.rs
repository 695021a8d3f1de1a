// Distance dispatcher
//
// The one public compute operation: given a set of requested distance
// measures, a site grid and a source description, produce one array per
// measure shaped like the grid. Finite-fault measures loop over the
// rupture quadrilaterals accumulating running minima (Rrup, Rjb) or the
// GC2 weighted sums; without rupture geometry they degrade to
// point-source estimates with explicit warnings.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::constants::MIN_DIST_SEED_KM;
use crate::error::{DistanceError, Warning};
use crate::gc2;
use crate::geodesy;
use crate::ps2ff::{self, ConversionKind, TableStore};
use crate::quaddist;
use crate::rupture::Source;
use crate::sites::{GridShape, SiteGrid};

/// The supported distance vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceMeasure {
    /// Distance to the epicenter
    Repi,
    /// Distance to the hypocenter
    Rhypo,
    /// Joyner-Boore distance: closest distance to the surface projection
    /// of the rupture
    Rjb,
    /// Rupture distance: closest distance to the rupture plane
    Rrup,
    /// Strike-normal distance; the GC2 coordinate T with its sign kept
    Rx,
    /// Strike-parallel distance; GC2 U shifted to the trace midpoint
    Ry,
    /// Distance off the end of the rupture measured parallel to strike;
    /// zero alongside the rupture
    Ry0,
    /// GC2 coordinate U
    GC2U,
    /// GC2 coordinate T
    GC2T,
}

impl DistanceMeasure {
    /// Every supported measure
    pub const ALL: [DistanceMeasure; 9] = [
        DistanceMeasure::Repi,
        DistanceMeasure::Rhypo,
        DistanceMeasure::Rjb,
        DistanceMeasure::Rrup,
        DistanceMeasure::Rx,
        DistanceMeasure::Ry,
        DistanceMeasure::Ry0,
        DistanceMeasure::GC2U,
        DistanceMeasure::GC2T,
    ];

    /// Canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMeasure::Repi => "repi",
            DistanceMeasure::Rhypo => "rhypo",
            DistanceMeasure::Rjb => "rjb",
            DistanceMeasure::Rrup => "rrup",
            DistanceMeasure::Rx => "rx",
            DistanceMeasure::Ry => "ry",
            DistanceMeasure::Ry0 => "ry0",
            DistanceMeasure::GC2U => "U",
            DistanceMeasure::GC2T => "T",
        }
    }
}

impl fmt::Display for DistanceMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMeasure {
    type Err = DistanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistanceMeasure::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| DistanceError::UnsupportedMeasure(s.to_string()))
    }
}

/// Result of one distance computation: one array per requested measure,
/// optional variance arrays when median conversion ran, and the
/// degraded-data warnings that accumulated along the way.
#[derive(Debug, Clone)]
pub struct DistanceSet {
    /// Logical shape of every array in the set
    pub shape: GridShape,
    values: HashMap<DistanceMeasure, Vec<f64>>,
    /// Variance of the median Rjb estimate, present only when the
    /// point-source conversion produced Rjb
    pub rjb_var: Option<Vec<f64>>,
    /// Variance of the median Rrup estimate, present only when the
    /// point-source conversion produced Rrup
    pub rrup_var: Option<Vec<f64>>,
    /// Structured diagnostics; empty for a clean finite-fault computation
    pub warnings: Vec<Warning>,
}

impl DistanceSet {
    /// The array for one measure, when it was requested
    pub fn get(&self, measure: DistanceMeasure) -> Option<&[f64]> {
        self.values.get(&measure).map(|v| v.as_slice())
    }
}

/// Compute the requested distance measures for every site.
///
/// Point-source measures (repi, rhypo) always come from the hypocenter.
/// Finite-fault measures use the rupture geometry when present; otherwise
/// rjb/rrup degrade to magnitude-dependent median estimates (when
/// `use_median_distance` is set) or to repi/rhypo, and rx/ry/ry0 degrade
/// as documented on each warning. GC2 U/T have no point-source fallback.
///
/// The requested set is taken as-is; callers wanting the union of several
/// consumers' requirements union them beforehand.
pub fn get_distances(
    measures: &[DistanceMeasure],
    sites: &SiteGrid,
    source: &Source,
    tables: &TableStore,
    use_median_distance: bool,
) -> Result<DistanceSet, DistanceError> {
    let n = sites.len();
    if sites.lat.len() != sites.lon.len() || sites.lat.len() != sites.depth.len() {
        return Err(DistanceError::ShapeMismatch {
            lat: sites.lat.len(),
            lon: sites.lon.len(),
            depth: sites.depth.len(),
        });
    }
    if sites.shape.len() != n {
        if let GridShape::Raster { ny, nx } = sites.shape {
            return Err(DistanceError::RasterMismatch { ny, nx, len: n });
        }
        return Err(DistanceError::ShapeMismatch {
            lat: n,
            lon: n,
            depth: n,
        });
    }

    let requested: HashSet<DistanceMeasure> = measures.iter().copied().collect();
    let has_rupture = source.rupture.is_some();
    let needs_gc2 = [
        DistanceMeasure::Rx,
        DistanceMeasure::Ry,
        DistanceMeasure::Ry0,
        DistanceMeasure::GC2U,
        DistanceMeasure::GC2T,
    ]
    .iter()
    .any(|m| requested.contains(m));

    debug!(
        requested = ?measures,
        sites = n,
        has_rupture,
        use_median_distance,
        "computing distances"
    );

    let mut values: HashMap<DistanceMeasure, Vec<f64>> = HashMap::new();
    let mut warnings: Vec<Warning> = Vec::new();
    let mut rjb_var = None;
    let mut rrup_var = None;

    // Point-source distances, also needed internally by the fallbacks
    let needs_repi = requested.contains(&DistanceMeasure::Repi)
        || (!has_rupture
            && (requested.contains(&DistanceMeasure::Rjb)
                || requested.contains(&DistanceMeasure::Ry)
                || requested.contains(&DistanceMeasure::Ry0)
                || (requested.contains(&DistanceMeasure::Rrup) && use_median_distance)));
    let needs_rhypo = requested.contains(&DistanceMeasure::Rhypo)
        || (!has_rupture && requested.contains(&DistanceMeasure::Rrup) && !use_median_distance);

    let mut repi: Option<Vec<f64>> = None;
    let mut rhypo: Option<Vec<f64>> = None;
    if needs_repi || needs_rhypo {
        let hypo = source.hypocenter.ok_or(DistanceError::MissingHypocenter)?;
        if needs_repi {
            repi = Some(
                (0..n)
                    .map(|k| {
                        geodesy::distance_km(
                            hypo.lon,
                            hypo.lat,
                            0.0,
                            sites.lon[k],
                            sites.lat[k],
                            sites.depth[k],
                        )
                    })
                    .collect(),
            );
        }
        if needs_rhypo {
            rhypo = Some(
                (0..n)
                    .map(|k| {
                        geodesy::distance_km(
                            hypo.lon,
                            hypo.lat,
                            hypo.depth,
                            sites.lon[k],
                            sites.lat[k],
                            sites.depth[k],
                        )
                    })
                    .collect(),
            );
        }
    }

    if let Some(rupture) = &source.rupture {
        let sites_ecef = if requested.contains(&DistanceMeasure::Rrup)
            || requested.contains(&DistanceMeasure::Rjb)
        {
            sites.ecef()
        } else {
            Vec::new()
        };

        if requested.contains(&DistanceMeasure::Rrup) {
            let mut min_rrup = vec![MIN_DIST_SEED_KM; n];
            for quad in rupture.quads() {
                let d = quaddist::quad_distance_km(&quad.ecef(), &sites_ecef)?;
                for k in 0..n {
                    min_rrup[k] = min_rrup[k].min(d[k]);
                }
            }
            values.insert(DistanceMeasure::Rrup, min_rrup);
        }

        if requested.contains(&DistanceMeasure::Rjb) {
            // Joyner-Boore is the distance to the surface projection:
            // flatten every vertex to zero depth before the kernel
            let mut min_rjb = vec![MIN_DIST_SEED_KM; n];
            for quad in rupture.quads() {
                let d = quaddist::quad_distance_km(&quad.flattened().ecef(), &sites_ecef)?;
                for k in 0..n {
                    min_rjb[k] = min_rjb[k].min(d[k]);
                }
            }
            values.insert(DistanceMeasure::Rjb, min_rjb);
        }

        if needs_gc2 {
            let g = gc2::compute(rupture, sites)?;
            if requested.contains(&DistanceMeasure::Rx) {
                // Sign preserved: hanging wall positive, footwall negative
                values.insert(DistanceMeasure::Rx, g.t.clone());
            }
            if requested.contains(&DistanceMeasure::Ry) {
                let half = g.total_length_km / 2.0;
                values.insert(
                    DistanceMeasure::Ry,
                    g.u.iter().map(|&u| u - half).collect(),
                );
            }
            if requested.contains(&DistanceMeasure::Ry0) {
                let end = g.trace_end_km;
                values.insert(
                    DistanceMeasure::Ry0,
                    g.u.iter()
                        .map(|&u| {
                            if u < 0.0 {
                                -u
                            } else if u > end {
                                u - end
                            } else {
                                0.0
                            }
                        })
                        .collect(),
                );
            }
            if requested.contains(&DistanceMeasure::GC2T) {
                values.insert(DistanceMeasure::GC2T, g.t.clone());
            }
            if requested.contains(&DistanceMeasure::GC2U) {
                values.insert(DistanceMeasure::GC2U, g.u.clone());
            }
        }
    } else {
        // GC2 coordinates have no point-source fallback
        for m in [DistanceMeasure::GC2U, DistanceMeasure::GC2T] {
            if requested.contains(&m) {
                return Err(DistanceError::MissingRupture(m));
            }
        }

        if requested.contains(&DistanceMeasure::Rjb) {
            let repi_arr = repi.as_ref().map(|v| v.as_slice()).unwrap_or(&[]);
            if use_median_distance {
                let w = Warning::MedianConversion {
                    measure: DistanceMeasure::Rjb,
                };
                warn!("{}", w);
                warnings.push(w);
                let (median, var, tw) =
                    ps2ff::median_distance(tables, ConversionKind::Rjb, &source.event, repi_arr)?;
                warnings.extend(tw);
                values.insert(DistanceMeasure::Rjb, median);
                rjb_var = Some(var);
            } else {
                let w = Warning::Substituted {
                    measure: DistanceMeasure::Rjb,
                    substitute: DistanceMeasure::Repi,
                };
                warn!("{}", w);
                warnings.push(w);
                values.insert(DistanceMeasure::Rjb, repi_arr.to_vec());
            }
        }

        if requested.contains(&DistanceMeasure::Rrup) {
            if use_median_distance {
                let w = Warning::MedianConversion {
                    measure: DistanceMeasure::Rrup,
                };
                warn!("{}", w);
                warnings.push(w);
                let repi_arr = repi.as_ref().map(|v| v.as_slice()).unwrap_or(&[]);
                let (median, var, tw) =
                    ps2ff::median_distance(tables, ConversionKind::Rrup, &source.event, repi_arr)?;
                warnings.extend(tw);
                values.insert(DistanceMeasure::Rrup, median);
                rrup_var = Some(var);
            } else {
                let w = Warning::Substituted {
                    measure: DistanceMeasure::Rrup,
                    substitute: DistanceMeasure::Rhypo,
                };
                warn!("{}", w);
                warnings.push(w);
                let rhypo_arr = rhypo.as_ref().map(|v| v.as_slice()).unwrap_or(&[]);
                values.insert(DistanceMeasure::Rrup, rhypo_arr.to_vec());
            }
        }

        if requested.contains(&DistanceMeasure::Rx) {
            let w = Warning::Zeroed {
                measure: DistanceMeasure::Rx,
            };
            warn!("{}", w);
            warnings.push(w);
            values.insert(DistanceMeasure::Rx, vec![0.0; n]);
        }

        for m in [DistanceMeasure::Ry, DistanceMeasure::Ry0] {
            if requested.contains(&m) {
                let w = Warning::Substituted {
                    measure: m,
                    substitute: DistanceMeasure::Repi,
                };
                warn!("{}", w);
                warnings.push(w);
                let repi_arr = repi.as_ref().map(|v| v.as_slice()).unwrap_or(&[]);
                values.insert(m, repi_arr.to_vec());
            }
        }
    }

    if requested.contains(&DistanceMeasure::Repi) {
        if let Some(v) = repi {
            values.insert(DistanceMeasure::Repi, v);
        }
    }
    if requested.contains(&DistanceMeasure::Rhypo) {
        if let Some(v) = rhypo {
            values.insert(DistanceMeasure::Rhypo, v);
        }
    }

    debug_assert!(
        requested.iter().all(|m| values.contains_key(m)),
        "a requested measure is missing from the result"
    );

    Ok(DistanceSet {
        shape: sites.shape,
        values,
        rjb_var,
        rrup_var,
        warnings,
    })
}
