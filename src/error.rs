// Error taxonomy and structured diagnostics

use std::fmt;

use crate::distance::DistanceMeasure;
use crate::rupture::{Mechanism, TectonicRegion};

/// Fatal failures of a distance computation. Any of these aborts the whole
/// request; partial results are never returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistanceError {
    /// Site latitude/longitude/depth arrays disagree in shape.
    #[error("site lat/lon/depth arrays must have the same shape (lat={lat}, lon={lon}, depth={depth})")]
    ShapeMismatch { lat: usize, lon: usize, depth: usize },

    /// A raster shape does not cover the supplied site arrays.
    #[error("raster shape {ny}x{nx} does not match site array length {len}")]
    RasterMismatch { ny: usize, nx: usize, len: usize },

    /// A requested distance label is outside the supported vocabulary.
    #[error("unsupported distance measure '{0}'")]
    UnsupportedMeasure(String),

    /// Epicentral/hypocentral distance was requested but no hypocenter exists.
    /// There is no fallback for these.
    #[error("cannot compute epicentral or hypocentral distance without a hypocenter")]
    MissingHypocenter,

    /// A measure with no point-source fallback was requested without rupture
    /// geometry.
    #[error("cannot compute {0} without rupture geometry")]
    MissingRupture(DistanceMeasure),

    /// The rupture description violates a structural invariant.
    #[error("invalid rupture geometry: {0}")]
    InvalidRupture(String),

    /// A conversion table is malformed or the table store has no usable
    /// entry at all.
    #[error("invalid conversion table: {0}")]
    InvalidTable(String),

    /// A site could not be classified against a rupture plane (the kernel
    /// produced a non-finite distance). Treated as a bug signal, not a
    /// recoverable condition.
    #[error("could not calculate some distances: non-finite result in the rupture-plane kernel")]
    GeometryInconsistency,
}

/// Non-fatal degraded-data notices. These are collected on the result (and
/// mirrored to the log) but never abort computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// No rupture geometry; the measure was estimated from the
    /// magnitude-dependent point-source conversion tables.
    MedianConversion { measure: DistanceMeasure },

    /// No rupture geometry; the measure was replaced element-wise by another
    /// computed measure.
    Substituted {
        measure: DistanceMeasure,
        substitute: DistanceMeasure,
    },

    /// No rupture geometry; the measure was set to zero everywhere.
    Zeroed { measure: DistanceMeasure },

    /// No conversion table exists for this exact tectonic-region/mechanism
    /// pair; the documented default table was used instead.
    DefaultTable {
        region: Option<TectonicRegion>,
        mechanism: Mechanism,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MedianConversion { measure } => write!(
                f,
                "no rupture geometry; replacing {measure} with median {measure} given magnitude and repi"
            ),
            Warning::Substituted {
                measure,
                substitute,
            } => write!(f, "no rupture geometry; replacing {measure} with {substitute}"),
            Warning::Zeroed { measure } => {
                write!(f, "no rupture geometry; setting {measure} to zero")
            }
            Warning::DefaultTable { region, mechanism } => match region {
                Some(r) => write!(
                    f,
                    "no conversion table for region {r:?} / mechanism {mechanism:?}; using default table"
                ),
                None => write!(
                    f,
                    "no tectonic region; using default conversion table for mechanism {mechanism:?}"
                ),
            },
        }
    }
}
