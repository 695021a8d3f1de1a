// Point-source to finite-fault distance conversion
//
// When no finite rupture geometry exists, median Rjb/Rrup estimates are
// produced from the epicentral distance through magnitude- and
// mechanism-dependent ratio tables, evaluated by bilinear interpolation
// over (ln repi, magnitude). Table selection is a data lookup keyed by
// tectonic region and focal mechanism; unsupported regions fall back to a
// documented default table, never to silent zeros.

use std::collections::HashMap;

use nalgebra::DMatrix;
use tracing::warn;

use crate::error::{DistanceError, Warning};
use crate::rupture::{rake_to_mech, EventParams, Mechanism, TectonicRegion};

/// Which finite-fault measure a table converts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// Joyner-Boore distance
    Rjb,
    /// Rupture distance
    Rrup,
}

/// Coefficient family behind a conversion table: magnitude-scaling
/// relation plus the aspect-ratio assumption it was derived with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalingFamily {
    /// Wells & Coppersmith (1994), aspect ratio 1.0 - the default family
    Wc94Ar1p0,
    /// Wells & Coppersmith (1994), aspect ratio 1.7 - active shallow crust
    Wc94Ar1p7,
    /// Somerville (2014) - stable shallow crust
    S14,
}

/// Identifier of one ratio/variance table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId {
    /// Measure the table converts to
    pub kind: ConversionKind,
    /// Coefficient family
    pub family: ScalingFamily,
    /// Focal mechanism class
    pub mechanism: Mechanism,
}

/// Region-to-family assignments for supported tectonic regions. Regions
/// not listed here use the default family with an `All` mechanism.
const REGION_FAMILIES: &[(TectonicRegion, ScalingFamily)] = &[
    (TectonicRegion::ActiveShallowCrust, ScalingFamily::Wc94Ar1p7),
    (TectonicRegion::StableShallowCrust, ScalingFamily::S14),
];

/// The documented default: used when the tectonic region is missing or has
/// no table family of its own
const DEFAULT_FAMILY: ScalingFamily = ScalingFamily::Wc94Ar1p0;

/// Resolve a table identifier for a region/mechanism pair. Returns the
/// degraded-data warning when an unsupported region forced the default.
pub fn select_table(
    kind: ConversionKind,
    region: Option<TectonicRegion>,
    mechanism: Mechanism,
) -> (TableId, Option<Warning>) {
    match region {
        None => (
            TableId {
                kind,
                family: DEFAULT_FAMILY,
                mechanism: Mechanism::All,
            },
            None,
        ),
        Some(r) => match REGION_FAMILIES.iter().find(|(reg, _)| *reg == r) {
            Some(&(_, family)) => (
                TableId {
                    kind,
                    family,
                    mechanism,
                },
                None,
            ),
            None => (
                TableId {
                    kind,
                    family: DEFAULT_FAMILY,
                    mechanism: Mechanism::All,
                },
                Some(Warning::DefaultTable {
                    region: Some(r),
                    mechanism,
                }),
            ),
        },
    }
}

/// One ratio/variance table: a bilinear interpolant over
/// (ln epicentral distance, magnitude). Rows follow the distance axis,
/// columns the magnitude axis. Evaluation clamps to the grid hull.
#[derive(Debug, Clone)]
pub struct RatioTable {
    ln_repi: Vec<f64>,
    magnitude: Vec<f64>,
    ratio: DMatrix<f64>,
    variance: DMatrix<f64>,
}

impl RatioTable {
    /// Build a table from a distance axis (km), magnitude axis, and
    /// ratio/variance grids with one row per distance and one column per
    /// magnitude.
    pub fn new(
        repi_km: Vec<f64>,
        magnitude: Vec<f64>,
        ratio: DMatrix<f64>,
        variance: DMatrix<f64>,
    ) -> Result<Self, DistanceError> {
        if repi_km.len() < 2 || magnitude.len() < 2 {
            return Err(DistanceError::InvalidTable(
                "each axis needs at least two points".into(),
            ));
        }
        if repi_km.windows(2).any(|w| w[1] <= w[0]) || magnitude.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DistanceError::InvalidTable(
                "axes must be strictly ascending".into(),
            ));
        }
        if repi_km.iter().any(|&r| r <= 0.0) {
            return Err(DistanceError::InvalidTable(
                "distance axis must be positive".into(),
            ));
        }
        for (name, grid) in [("ratio", &ratio), ("variance", &variance)] {
            if grid.nrows() != repi_km.len() || grid.ncols() != magnitude.len() {
                return Err(DistanceError::InvalidTable(format!(
                    "{} grid is {}x{}, expected {}x{}",
                    name,
                    grid.nrows(),
                    grid.ncols(),
                    repi_km.len(),
                    magnitude.len()
                )));
            }
        }
        Ok(RatioTable {
            ln_repi: repi_km.iter().map(|r| r.ln()).collect(),
            magnitude,
            ratio,
            variance,
        })
    }

    /// Locate `x` on an ascending axis: interval start index and fraction
    fn locate(axis: &[f64], x: f64) -> (usize, f64) {
        let x = x.clamp(axis[0], axis[axis.len() - 1]);
        let i = axis
            .partition_point(|&v| v <= x)
            .saturating_sub(1)
            .min(axis.len() - 2);
        let frac = (x - axis[i]) / (axis[i + 1] - axis[i]);
        (i, frac)
    }

    fn eval(&self, grid: &DMatrix<f64>, repi_km: f64, mag: f64) -> f64 {
        let (i, fx) = Self::locate(&self.ln_repi, repi_km.ln());
        let (j, fy) = Self::locate(&self.magnitude, mag);
        let g00 = grid[(i, j)];
        let g10 = grid[(i + 1, j)];
        let g01 = grid[(i, j + 1)];
        let g11 = grid[(i + 1, j + 1)];
        g00 * (1.0 - fx) * (1.0 - fy) + g10 * fx * (1.0 - fy) + g01 * (1.0 - fx) * fy
            + g11 * fx * fy
    }

    /// Ratio of the converted measure to repi at this distance/magnitude
    pub fn ratio(&self, repi_km: f64, mag: f64) -> f64 {
        self.eval(&self.ratio, repi_km, mag)
    }

    /// Additional variance of the converted measure
    pub fn variance(&self, repi_km: f64, mag: f64) -> f64 {
        self.eval(&self.variance, repi_km, mag)
    }
}

/// Explicit cache of conversion tables. Built once, read-only afterwards;
/// safe to share across computations (and threads).
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    tables: HashMap<TableId, RatioTable>,
}

impl TableStore {
    /// An empty store. Every lookup fails until tables are inserted.
    pub fn new() -> Self {
        TableStore::default()
    }

    /// A store seeded with coarse built-in grids for every table
    /// identifier, so conversion always has a usable (if approximate)
    /// table. Callers with full-resolution coefficient data replace
    /// entries via `insert`.
    pub fn with_defaults() -> Self {
        let mut store = TableStore::new();
        for kind in [ConversionKind::Rjb, ConversionKind::Rrup] {
            for family in [
                ScalingFamily::Wc94Ar1p0,
                ScalingFamily::Wc94Ar1p7,
                ScalingFamily::S14,
            ] {
                for mechanism in [
                    Mechanism::All,
                    Mechanism::StrikeSlip,
                    Mechanism::Reverse,
                    Mechanism::Normal,
                ] {
                    let id = TableId {
                        kind,
                        family,
                        mechanism,
                    };
                    store.insert(id, builtin_table(id));
                }
            }
        }
        store
    }

    /// Insert or replace a table
    pub fn insert(&mut self, id: TableId, table: RatioTable) {
        self.tables.insert(id, table);
    }

    /// Direct table access
    pub fn get(&self, id: &TableId) -> Option<&RatioTable> {
        self.tables.get(id)
    }

    /// Resolve and fetch the table for a region/mechanism pair, degrading
    /// to the default table (with a warning) when the exact entry is
    /// absent. Fails only when not even a default table exists.
    pub fn lookup(
        &self,
        kind: ConversionKind,
        region: Option<TectonicRegion>,
        mechanism: Mechanism,
    ) -> Result<(&RatioTable, Vec<Warning>), DistanceError> {
        let mut warnings = Vec::new();
        let (id, w) = select_table(kind, region, mechanism);
        warnings.extend(w);

        if let Some(table) = self.tables.get(&id) {
            return Ok((table, warnings));
        }

        let default_id = TableId {
            kind,
            family: DEFAULT_FAMILY,
            mechanism: Mechanism::All,
        };
        if id != default_id {
            if let Some(table) = self.tables.get(&default_id) {
                warnings.push(Warning::DefaultTable { region, mechanism });
                return Ok((table, warnings));
            }
        }
        Err(DistanceError::InvalidTable(format!(
            "no table for {:?} and no default available",
            id
        )))
    }
}

/// Median converted distance and its variance for a batch of epicentral
/// distances (km). Warnings carry any table degradation that occurred.
pub fn median_distance(
    store: &TableStore,
    kind: ConversionKind,
    event: &EventParams,
    repi: &[f64],
) -> Result<(Vec<f64>, Vec<f64>, Vec<Warning>), DistanceError> {
    let mechanism = rake_to_mech(event.rake);
    let (table, warnings) = store.lookup(kind, event.tectonic_region, mechanism)?;
    for w in &warnings {
        warn!("{}", w);
    }

    let mut median = Vec::with_capacity(repi.len());
    let mut variance = Vec::with_capacity(repi.len());
    for &r in repi {
        median.push(r * table.ratio(r, event.magnitude));
        variance.push(table.variance(r, event.magnitude));
    }
    Ok((median, variance, warnings))
}

/// Wells & Coppersmith (1994) subsurface rupture length in km,
/// log10 L = a + b * M by mechanism class
fn wc94_length_km(mechanism: Mechanism, mag: f64) -> f64 {
    let (a, b) = match mechanism {
        Mechanism::StrikeSlip => (-2.57, 0.62),
        Mechanism::Reverse => (-2.42, 0.58),
        Mechanism::Normal => (-1.88, 0.50),
        Mechanism::All => (-2.44, 0.59),
    };
    10f64.powf(a + b * mag)
}

/// Coarse built-in grid for one table identifier: a first-order geometric
/// approximation (site against a rupture of WC94 length centered near the
/// epicenter) on a 13 x 10 (ln distance, magnitude) lattice. Intended as a
/// standalone default; replace with full-resolution tables for production
/// coefficient sets.
fn builtin_table(id: TableId) -> RatioTable {
    let repi: Vec<f64> = (0..13).map(|i| 10f64.powf(i as f64 * 0.25)).collect();
    let mags: Vec<f64> = (0..10).map(|i| 4.0 + 0.5 * i as f64).collect();

    let (depth_km, length_scale) = match id.family {
        ScalingFamily::Wc94Ar1p0 => (5.0, 1.0),
        ScalingFamily::Wc94Ar1p7 => (5.0, 0.8),
        ScalingFamily::S14 => (7.5, 1.0),
    };

    let nr = repi.len();
    let nm = mags.len();
    let mut ratio = DMatrix::zeros(nr, nm);
    let mut variance = DMatrix::zeros(nr, nm);
    for (i, &r) in repi.iter().enumerate() {
        for (j, &m) in mags.iter().enumerate() {
            // Characteristic in-plane extent of the rupture
            let rho = 0.25 * length_scale * wc94_length_km(id.mechanism, m);
            let rjb_ratio = r / (r * r + rho * rho).sqrt();
            ratio[(i, j)] = match id.kind {
                ConversionKind::Rjb => rjb_ratio,
                ConversionKind::Rrup => {
                    ((r * rjb_ratio).powi(2) + depth_km * depth_km).sqrt() / r
                }
            };
            // Spread of the estimate, dominated by the unknown position of
            // the rupture around the epicenter
            let spread = 0.3 * rho * r / (r + rho);
            variance[(i, j)] = spread * spread;
        }
    }

    // Axes and grids are constructed consistently above
    match RatioTable::new(repi, mags, ratio, variance) {
        Ok(t) => t,
        Err(_) => unreachable!("built-in table axes are fixed and ascending"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> RatioTable {
        // ln axis over {1, e^2} km for easy fractions; magnitudes {5, 7}
        let repi = vec![1.0, (2f64).exp()];
        let mags = vec![5.0, 7.0];
        let ratio = DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 2.0, 4.0]);
        let var = DMatrix::from_row_slice(2, 2, &[0.1, 0.3, 0.2, 0.4]);
        RatioTable::new(repi, mags, ratio, var).unwrap()
    }

    #[test]
    fn test_bilinear_exact_on_nodes() {
        let t = small_table();
        assert!((t.ratio(1.0, 5.0) - 1.0).abs() < 1e-12);
        assert!((t.ratio(1.0, 7.0) - 3.0).abs() < 1e-12);
        assert!((t.ratio((2f64).exp(), 5.0) - 2.0).abs() < 1e-12);
        assert!((t.ratio((2f64).exp(), 7.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let t = small_table();
        // Center of the cell in (ln r, M) space: ln r = 1, M = 6
        let mid = t.ratio(1f64.exp(), 6.0);
        assert!((mid - 2.5).abs() < 1e-12, "midpoint: {}", mid);
    }

    #[test]
    fn test_eval_clamps_to_hull() {
        let t = small_table();
        assert!((t.ratio(0.01, 4.0) - 1.0).abs() < 1e-12);
        assert!((t.ratio(1e4, 9.0) - 4.0).abs() < 1e-12);
        // Zero distance clamps to the near edge instead of producing NaN
        assert!(t.ratio(0.0, 6.0).is_finite());
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let ratio = DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 2.0, 4.0]);
        let var = ratio.clone();
        assert!(matches!(
            RatioTable::new(vec![2.0, 1.0], vec![5.0, 7.0], ratio.clone(), var.clone()),
            Err(DistanceError::InvalidTable(_))
        ));
        assert!(matches!(
            RatioTable::new(vec![1.0, 2.0, 3.0], vec![5.0, 7.0], ratio, var),
            Err(DistanceError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_selection_map() {
        let (id, w) = select_table(
            ConversionKind::Rjb,
            Some(TectonicRegion::ActiveShallowCrust),
            Mechanism::StrikeSlip,
        );
        assert_eq!(id.family, ScalingFamily::Wc94Ar1p7);
        assert_eq!(id.mechanism, Mechanism::StrikeSlip);
        assert!(w.is_none());

        let (id, w) = select_table(
            ConversionKind::Rrup,
            Some(TectonicRegion::StableShallowCrust),
            Mechanism::Reverse,
        );
        assert_eq!(id.family, ScalingFamily::S14);
        assert!(w.is_none());

        // Unsupported region degrades to the default family, mechanism All
        let (id, w) = select_table(
            ConversionKind::Rjb,
            Some(TectonicRegion::Subduction),
            Mechanism::Normal,
        );
        assert_eq!(id.family, ScalingFamily::Wc94Ar1p0);
        assert_eq!(id.mechanism, Mechanism::All);
        assert!(matches!(w, Some(Warning::DefaultTable { .. })));

        // Missing region is the documented default, no warning
        let (id, w) = select_table(ConversionKind::Rjb, None, Mechanism::StrikeSlip);
        assert_eq!(id.family, ScalingFamily::Wc94Ar1p0);
        assert!(w.is_none());
    }

    #[test]
    fn test_store_falls_back_to_default_entry() {
        let default_id = TableId {
            kind: ConversionKind::Rjb,
            family: ScalingFamily::Wc94Ar1p0,
            mechanism: Mechanism::All,
        };
        let mut store = TableStore::new();
        store.insert(default_id, small_table());

        // Exact entry missing: served from the default with a warning
        let (_, warnings) = store
            .lookup(
                ConversionKind::Rjb,
                Some(TectonicRegion::ActiveShallowCrust),
                Mechanism::StrikeSlip,
            )
            .unwrap();
        assert!(matches!(warnings[0], Warning::DefaultTable { .. }));

        // Completely empty store cannot serve anything
        let empty = TableStore::new();
        assert!(matches!(
            empty.lookup(ConversionKind::Rjb, None, Mechanism::All),
            Err(DistanceError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_median_distance_applies_ratio() {
        let mut store = TableStore::new();
        // Constant ratio 2.0, constant variance 0.25
        let repi_axis = vec![1.0, 100.0];
        let mags = vec![4.0, 8.0];
        let table = RatioTable::new(
            repi_axis,
            mags,
            DMatrix::from_element(2, 2, 2.0),
            DMatrix::from_element(2, 2, 0.25),
        )
        .unwrap();
        store.insert(
            TableId {
                kind: ConversionKind::Rrup,
                family: ScalingFamily::Wc94Ar1p0,
                mechanism: Mechanism::All,
            },
            table,
        );

        let event = EventParams {
            magnitude: 6.0,
            rake: None,
            tectonic_region: None,
        };
        let (median, var, warnings) =
            median_distance(&store, ConversionKind::Rrup, &event, &[10.0, 50.0]).unwrap();
        assert!((median[0] - 20.0).abs() < 1e-12);
        assert!((median[1] - 100.0).abs() < 1e-12);
        assert!((var[0] - 0.25).abs() < 1e-12);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_builtin_tables_are_sane() {
        let store = TableStore::with_defaults();
        for kind in [ConversionKind::Rjb, ConversionKind::Rrup] {
            let (table, warnings) = store
                .lookup(kind, Some(TectonicRegion::ActiveShallowCrust), Mechanism::StrikeSlip)
                .unwrap();
            assert!(warnings.is_empty());
            for &r in &[1.0, 10.0, 100.0] {
                for &m in &[4.5, 6.5, 8.0] {
                    let ratio = table.ratio(r, m);
                    assert!(ratio.is_finite() && ratio > 0.0);
                    if kind == ConversionKind::Rjb {
                        // Joyner-Boore never exceeds the epicentral distance
                        assert!(ratio <= 1.0, "rjb ratio {} at r={} m={}", ratio, r, m);
                    }
                    assert!(table.variance(r, m) >= 0.0);
                }
            }
        }
    }
}
