// Rupture geometry - points, fault quadrilaterals, segments and event data

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::DistanceError;
use crate::geodesy;

/// A geodetic point: longitude/latitude in degrees, depth in kilometers
/// (positive down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// Depth in kilometers, positive down
    pub depth: f64,
}

impl Point {
    /// Construct a point from lon/lat (degrees) and depth (km)
    pub fn new(lon: f64, lat: f64, depth: f64) -> Self {
        Point { lon, lat, depth }
    }

    /// The same horizontal position at zero depth
    pub fn surface(&self) -> Point {
        Point {
            depth: 0.0,
            ..*self
        }
    }

    /// ECEF position in meters
    pub fn ecef(&self) -> Vector3<f64> {
        geodesy::lld2ecef(self.lat, self.lon, self.depth)
    }
}

/// One planar fault patch: four vertices ordered top-left, top-right,
/// bottom-right, bottom-left, where "left to right" follows the strike
/// direction of the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    /// First top-edge vertex (strike origin)
    pub top_left: Point,
    /// Second top-edge vertex
    pub top_right: Point,
    /// Bottom-edge vertex below the second top vertex
    pub bottom_right: Point,
    /// Bottom-edge vertex below the first top vertex
    pub bottom_left: Point,
}

impl Quadrilateral {
    /// Construct from the four corner points in strike order
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Quadrilateral {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Corner points in ring order (top-left, top-right, bottom-right,
    /// bottom-left)
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// ECEF positions (meters) of the four corners in ring order
    pub fn ecef(&self) -> [Vector3<f64>; 4] {
        let c = self.corners();
        [c[0].ecef(), c[1].ecef(), c[2].ecef(), c[3].ecef()]
    }

    /// The same quadrilateral with every vertex moved to zero depth
    /// (surface projection, used for Joyner-Boore distance)
    pub fn flattened(&self) -> Quadrilateral {
        Quadrilateral {
            top_left: self.top_left.surface(),
            top_right: self.top_right.surface(),
            bottom_right: self.bottom_right.surface(),
            bottom_left: self.bottom_left.surface(),
        }
    }

    /// Along-strike length of the top edge in kilometers (ECEF chord)
    pub fn top_edge_length_km(&self) -> f64 {
        (self.top_right.ecef() - self.top_left.ecef()).norm() / crate::constants::M_PER_KM
    }
}

/// Tectonic-region classification of the event. Conversion tables exist for
/// the shallow crustal classes; other classes fall back to the default
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TectonicRegion {
    /// Active shallow crustal tectonics
    ActiveShallowCrust,
    /// Stable continental interior
    StableShallowCrust,
    /// Subduction interface or intraslab
    Subduction,
    /// Volcanic zones
    Volcanic,
}

/// Focal mechanism class derived from the rake angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mechanism {
    /// Unknown or oblique mechanism
    All,
    /// Reverse faulting
    Reverse,
    /// Normal faulting
    Normal,
    /// Strike-slip faulting
    StrikeSlip,
}

/// Classify a rake angle (degrees) into a focal mechanism class.
/// Pure strike-slip within 30 degrees of 0/180, reverse within 30 degrees
/// of +90, normal within 30 degrees of -90; oblique or missing rakes map
/// to `All`.
pub fn rake_to_mech(rake: Option<f64>) -> Mechanism {
    let rake = match rake {
        Some(r) => r,
        None => return Mechanism::All,
    };
    // Normalize to [-180, 180]
    let r = (rake + 180.0).rem_euclid(360.0) - 180.0;
    if (-180.0..=-150.0).contains(&r) || (-30.0..=30.0).contains(&r) || (150.0..=180.0).contains(&r)
    {
        Mechanism::StrikeSlip
    } else if (60.0..=120.0).contains(&r) {
        Mechanism::Reverse
    } else if (-120.0..=-60.0).contains(&r) {
        Mechanism::Normal
    } else {
        Mechanism::All
    }
}

/// Scalar event parameters needed by the point-source fallback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventParams {
    /// Moment magnitude
    pub magnitude: f64,
    /// Rake angle in degrees, when known
    pub rake: Option<f64>,
    /// Tectonic-region classification, when known
    pub tectonic_region: Option<TectonicRegion>,
}

/// A finite rupture: an ordered list of quadrilaterals partitioned into
/// contiguous segments that each share one strike sense.
#[derive(Debug, Clone, PartialEq)]
pub struct Rupture {
    quads: Vec<Quadrilateral>,
    segment_index: Vec<usize>,
}

impl Rupture {
    /// Build a rupture from quadrilaterals and a parallel segment index.
    /// Segment indices must start at zero and form contiguous,
    /// non-decreasing blocks (0,0,1,1,1,2,...).
    pub fn new(quads: Vec<Quadrilateral>, segment_index: Vec<usize>) -> Result<Self, DistanceError> {
        if quads.is_empty() {
            return Err(DistanceError::InvalidRupture(
                "rupture must contain at least one quadrilateral".into(),
            ));
        }
        if quads.len() != segment_index.len() {
            return Err(DistanceError::InvalidRupture(format!(
                "segment index length {} does not match quadrilateral count {}",
                segment_index.len(),
                quads.len()
            )));
        }
        if segment_index[0] != 0 {
            return Err(DistanceError::InvalidRupture(
                "segment indices must start at zero".into(),
            ));
        }
        for w in segment_index.windows(2) {
            if w[1] != w[0] && w[1] != w[0] + 1 {
                return Err(DistanceError::InvalidRupture(format!(
                    "segment indices must be contiguous and non-decreasing (found {} after {})",
                    w[1], w[0]
                )));
            }
        }
        for (i, q) in quads.iter().enumerate() {
            if q.top_edge_length_km() <= 0.0 {
                return Err(DistanceError::InvalidRupture(format!(
                    "quadrilateral {} has a zero-length top edge",
                    i
                )));
            }
        }
        Ok(Rupture {
            quads,
            segment_index,
        })
    }

    /// Build a rupture whose quadrilaterals all belong to one segment
    pub fn single_segment(quads: Vec<Quadrilateral>) -> Result<Self, DistanceError> {
        let n = quads.len();
        Self::new(quads, vec![0; n])
    }

    /// Build a rupture from per-segment quadrilateral lists
    pub fn from_segments(segments: Vec<Vec<Quadrilateral>>) -> Result<Self, DistanceError> {
        let mut quads = Vec::new();
        let mut index = Vec::new();
        for (s, seg) in segments.into_iter().enumerate() {
            index.extend(std::iter::repeat(s).take(seg.len()));
            quads.extend(seg);
        }
        Self::new(quads, index)
    }

    /// The quadrilaterals in strike order
    pub fn quads(&self) -> &[Quadrilateral] {
        &self.quads
    }

    /// Segment index of each quadrilateral
    pub fn segment_index(&self) -> &[usize] {
        &self.segment_index
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.segment_index.last().map_or(0, |s| s + 1)
    }

    /// First and last quadrilateral index of each segment
    pub fn segment_bounds(&self) -> Vec<(usize, usize)> {
        let mut bounds: Vec<(usize, usize)> = Vec::with_capacity(self.segment_count());
        for (i, &s) in self.segment_index.iter().enumerate() {
            if s == bounds.len() {
                bounds.push((i, i));
            } else {
                bounds[s].1 = i;
            }
        }
        bounds
    }
}

/// Everything the distance dispatcher needs to know about the source:
/// finite rupture geometry (optional), hypocenter (optional) and scalar
/// event parameters.
#[derive(Debug, Clone)]
pub struct Source {
    /// Finite rupture geometry, when available
    pub rupture: Option<Rupture>,
    /// Hypocenter, when available
    pub hypocenter: Option<Point>,
    /// Scalar event parameters
    pub event: EventParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(lon0: f64, lon1: f64) -> Quadrilateral {
        Quadrilateral::new(
            Point::new(lon0, 0.0, 0.0),
            Point::new(lon1, 0.0, 0.0),
            Point::new(lon1, -0.05, 10.0),
            Point::new(lon0, -0.05, 10.0),
        )
    }

    #[test]
    fn test_top_edge_length() {
        // 0.2 degrees of longitude at the equator, ~22.2 km
        let q = quad(-0.1, 0.1);
        let l = q.top_edge_length_km();
        assert!((l - 22.24).abs() < 0.1, "length: {} km", l);
    }

    #[test]
    fn test_flattened_zeroes_depth() {
        let q = quad(0.0, 0.1).flattened();
        for c in q.corners() {
            assert_eq!(c.depth, 0.0);
        }
    }

    #[test]
    fn test_segment_bounds() {
        let quads = vec![quad(0.0, 0.1), quad(0.1, 0.2), quad(0.3, 0.4)];
        let r = Rupture::new(quads, vec![0, 0, 1]).unwrap();
        assert_eq!(r.segment_count(), 2);
        assert_eq!(r.segment_bounds(), vec![(0, 1), (2, 2)]);
    }

    #[test]
    fn test_noncontiguous_segments_rejected() {
        let quads = vec![quad(0.0, 0.1), quad(0.1, 0.2)];
        assert!(matches!(
            Rupture::new(quads, vec![0, 2]),
            Err(DistanceError::InvalidRupture(_))
        ));
    }

    #[test]
    fn test_degenerate_top_edge_rejected() {
        let q = Quadrilateral::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, -0.05, 10.0),
            Point::new(0.0, -0.05, 10.0),
        );
        assert!(matches!(
            Rupture::single_segment(vec![q]),
            Err(DistanceError::InvalidRupture(_))
        ));
    }

    #[test]
    fn test_rake_to_mech_classes() {
        assert_eq!(rake_to_mech(None), Mechanism::All);
        assert_eq!(rake_to_mech(Some(0.0)), Mechanism::StrikeSlip);
        assert_eq!(rake_to_mech(Some(175.0)), Mechanism::StrikeSlip);
        assert_eq!(rake_to_mech(Some(-170.0)), Mechanism::StrikeSlip);
        assert_eq!(rake_to_mech(Some(90.0)), Mechanism::Reverse);
        assert_eq!(rake_to_mech(Some(70.0)), Mechanism::Reverse);
        assert_eq!(rake_to_mech(Some(-90.0)), Mechanism::Normal);
        assert_eq!(rake_to_mech(Some(-100.0)), Mechanism::Normal);
        // Oblique rakes are unclassified
        assert_eq!(rake_to_mech(Some(45.0)), Mechanism::All);
        assert_eq!(rake_to_mech(Some(-45.0)), Mechanism::All);
        // Rakes outside [-180, 180] are normalized first
        assert_eq!(rake_to_mech(Some(450.0)), Mechanism::Reverse);
    }
}
