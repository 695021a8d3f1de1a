// Site grid - evaluation points for distance computation

use nalgebra::Vector3;

use crate::error::DistanceError;
use crate::geodesy;

/// Logical shape of a site grid. Distances are returned as flat arrays in
/// row-major order together with this tag, so callers can reshape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridShape {
    /// 1-D list of scattered sites
    Scattered(usize),
    /// 2-D raster grid, row-major (ny rows of nx columns)
    Raster { ny: usize, nx: usize },
}

impl GridShape {
    /// Number of sites covered by this shape
    pub fn len(&self) -> usize {
        match *self {
            GridShape::Scattered(n) => n,
            GridShape::Raster { ny, nx } => ny * nx,
        }
    }

    /// True when the shape covers no sites
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A batch of evaluation points: equal-shaped latitude, longitude and depth
/// arrays. Depth is in kilometers, positive down.
#[derive(Debug, Clone)]
pub struct SiteGrid {
    /// Site latitudes in degrees
    pub lat: Vec<f64>,
    /// Site longitudes in degrees
    pub lon: Vec<f64>,
    /// Site depths in kilometers (positive down)
    pub depth: Vec<f64>,
    /// Logical shape of the three arrays
    pub shape: GridShape,
}

impl SiteGrid {
    /// Build a 1-D grid of scattered sites. The three arrays must have the
    /// same length; mismatch is a hard input-validation failure.
    pub fn scattered(lat: Vec<f64>, lon: Vec<f64>, depth: Vec<f64>) -> Result<Self, DistanceError> {
        Self::check_lengths(&lat, &lon, &depth)?;
        let shape = GridShape::Scattered(lat.len());
        Ok(SiteGrid {
            lat,
            lon,
            depth,
            shape,
        })
    }

    /// Build a 2-D raster grid from row-major arrays of ny*nx points.
    pub fn raster(
        lat: Vec<f64>,
        lon: Vec<f64>,
        depth: Vec<f64>,
        ny: usize,
        nx: usize,
    ) -> Result<Self, DistanceError> {
        Self::check_lengths(&lat, &lon, &depth)?;
        if lat.len() != ny * nx {
            return Err(DistanceError::RasterMismatch {
                ny,
                nx,
                len: lat.len(),
            });
        }
        Ok(SiteGrid {
            lat,
            lon,
            depth,
            shape: GridShape::Raster { ny, nx },
        })
    }

    fn check_lengths(lat: &[f64], lon: &[f64], depth: &[f64]) -> Result<(), DistanceError> {
        if lat.len() != lon.len() || lat.len() != depth.len() {
            return Err(DistanceError::ShapeMismatch {
                lat: lat.len(),
                lon: lon.len(),
                depth: depth.len(),
            });
        }
        Ok(())
    }

    /// Number of sites
    pub fn len(&self) -> usize {
        self.lat.len()
    }

    /// True when the grid holds no sites
    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// ECEF position (meters) of every site, in grid order
    pub fn ecef(&self) -> Vec<Vector3<f64>> {
        (0..self.len())
            .map(|i| geodesy::lld2ecef(self.lat[i], self.lon[i], self.depth[i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scattered_ok() {
        let g = SiteGrid::scattered(vec![0.0, 1.0], vec![2.0, 3.0], vec![0.0, 0.0]).unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.shape, GridShape::Scattered(2));
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let err = SiteGrid::scattered(vec![0.0, 1.0], vec![2.0], vec![0.0, 0.0]).unwrap_err();
        assert_eq!(
            err,
            DistanceError::ShapeMismatch {
                lat: 2,
                lon: 1,
                depth: 2
            }
        );
    }

    #[test]
    fn test_raster_mismatch_is_fatal() {
        let err = SiteGrid::raster(vec![0.0; 5], vec![0.0; 5], vec![0.0; 5], 2, 3).unwrap_err();
        assert_eq!(err, DistanceError::RasterMismatch { ny: 2, nx: 3, len: 5 });
    }

    #[test]
    fn test_ecef_matches_pointwise_conversion() {
        let g = SiteGrid::scattered(vec![10.0, -20.0], vec![30.0, 40.0], vec![0.0, 5.0]).unwrap();
        let e = g.ecef();
        assert_eq!(e.len(), 2);
        assert_eq!(e[1], geodesy::lld2ecef(-20.0, 40.0, 5.0));
    }
}
