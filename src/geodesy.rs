// Geodesy module - coordinate transformations and distance calculations
//
// Provides:
// - LLD (latitude/longitude/depth-km) to ECEF (Earth-Centered Earth-Fixed)
//   conversion on the WGS84 ellipsoid, used to bring rupture vertices and
//   sites into a common metric 3-D frame
// - great-circle surface distance and point distance with depth, on the
//   mean-radius sphere, used for epicentral/hypocentral distances
// - a local orthographic (locally flat) projection used by the generalized
//   coordinate engine
//
// The two distance scales serve different purposes and are never mixed:
// plane geometry runs in ECEF meters, epicentral/hypocentral distances use
// the great-circle formulas in kilometers.

use nalgebra::Vector3;

use crate::constants::{DTOR, EARTH_RADIUS_KM, M_PER_KM, WGS84_A, WGS84_ECC_SQ};

/// Converts a geodetic point to ECEF coordinates (meters).
///
/// # Arguments
/// * `lat` - Latitude in degrees
/// * `lon` - Longitude in degrees
/// * `depth` - Depth in kilometers below the WGS84 ellipsoid (positive down)
///
/// # Returns
/// ECEF position vector (x, y, z) in meters
pub fn lld2ecef(lat: f64, lon: f64, depth: f64) -> Vector3<f64> {
    let lat_rad = lat * DTOR;
    let lon_rad = lon * DTOR;
    let alt = -depth * M_PER_KM;

    let slat = lat_rad.sin();
    let slon = lon_rad.sin();
    let clat = lat_rad.cos();
    let clon = lon_rad.cos();

    // Radius of curvature in prime vertical
    let d = (1.0 - (slat * slat * WGS84_ECC_SQ)).sqrt();
    let rn = WGS84_A / d;

    let x = (rn + alt) * clat * clon;
    let y = (rn + alt) * clat * slon;
    let z = (rn * (1.0 - WGS84_ECC_SQ) + alt) * slat;

    Vector3::new(x, y, z)
}

/// Returns the great-circle surface distance in kilometers between two
/// lon/lat points (degrees), on the mean-radius sphere. Haversine form,
/// stable for short arcs.
pub fn geodetic_distance_km(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> f64 {
    let la0 = lat0 * DTOR;
    let la1 = lat1 * DTOR;
    let dlat = (la1 - la0) / 2.0;
    let dlon = (lon1 - lon0) * DTOR / 2.0;

    let h = dlat.sin().powi(2) + la0.cos() * la1.cos() * dlon.sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Returns the distance in kilometers between two points given as
/// lon/lat (degrees) and depth (km, positive down): great-circle surface
/// separation combined with the depth offset.
pub fn distance_km(lon0: f64, lat0: f64, depth0: f64, lon1: f64, lat1: f64, depth1: f64) -> f64 {
    let surface = geodetic_distance_km(lon0, lat0, lon1, lat1);
    let dz = depth1 - depth0;
    (surface * surface + dz * dz).sqrt()
}

/// Local orthographic projection: maps lon/lat (degrees) to a planar
/// (x, y) frame in kilometers, tangent at the center of the construction
/// bounding box. Accurate over the span of a single rupture segment.
#[derive(Debug, Clone, Copy)]
pub struct OrthographicProjection {
    lam0: f64,
    phi0: f64,
}

impl OrthographicProjection {
    /// Build a projection centered on the given bounding box (degrees).
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        OrthographicProjection {
            lam0: 0.5 * (west + east) * DTOR,
            phi0: 0.5 * (south + north) * DTOR,
        }
    }

    /// Project a lon/lat point (degrees) to planar coordinates in km.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lam = lon * DTOR;
        let phi = lat * DTOR;
        let dlam = lam - self.lam0;

        let x = EARTH_RADIUS_KM * phi.cos() * dlam.sin();
        let y = EARTH_RADIUS_KM
            * (self.phi0.cos() * phi.sin() - self.phi0.sin() * phi.cos() * dlam.cos());
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WGS84_B;

    const EPSILON: f64 = 1e-6;

    #[test]
    fn test_lld2ecef_equator() {
        // Point on equator at prime meridian, zero depth
        let p = lld2ecef(0.0, 0.0, 0.0);

        assert!((p.x - WGS84_A).abs() < EPSILON);
        assert!(p.y.abs() < EPSILON);
        assert!(p.z.abs() < EPSILON);
    }

    #[test]
    fn test_lld2ecef_north_pole() {
        let p = lld2ecef(90.0, 0.0, 0.0);

        assert!(p.x.abs() < EPSILON);
        assert!(p.y.abs() < EPSILON);
        assert!((p.z - WGS84_B).abs() < 1.0); // within 1 meter
    }

    #[test]
    fn test_lld2ecef_depth_is_down() {
        // 10 km depth at the equator shortens the radial coordinate by 10 km
        let p = lld2ecef(0.0, 0.0, 10.0);
        assert!((p.x - (WGS84_A - 10_000.0)).abs() < EPSILON);
    }

    #[test]
    fn test_geodetic_distance_london_paris() {
        let d = geodetic_distance_km(-0.1278, 51.5074, 2.3522, 48.8566);

        // ~344 km
        assert!((d - 344.0).abs() < 5.0, "distance: {} km", d);
    }

    #[test]
    fn test_geodetic_distance_same_point() {
        let d = geodetic_distance_km(-0.1, 51.5, -0.1, 51.5);
        assert!(d.abs() < EPSILON);
    }

    #[test]
    fn test_geodetic_distance_one_degree_equator() {
        // One degree of longitude on the equator spans R * pi/180 km
        let d = geodetic_distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - EARTH_RADIUS_KM * DTOR).abs() < 1e-9, "distance: {} km", d);
    }

    #[test]
    fn test_distance_with_depth() {
        // Coincident surface points, 10 km depth difference
        let d = distance_km(0.0, 0.0, 0.0, 0.0, 0.0, 10.0);
        assert!((d - 10.0).abs() < EPSILON);

        // 3-4-5 triangle: surface leg of 40 km with 30 km depth offset
        let lon1 = 40.0 / (EARTH_RADIUS_KM * DTOR);
        let d = distance_km(0.0, 0.0, 0.0, lon1, 0.0, 30.0);
        assert!((d - 50.0).abs() < 1e-3, "distance: {} km", d);
    }

    #[test]
    fn test_projection_center_is_origin() {
        let proj = OrthographicProjection::new(-1.0, 1.0, -1.0, 1.0);
        let (x, y) = proj.project(0.0, 0.0);
        assert!(x.abs() < EPSILON);
        assert!(y.abs() < EPSILON);
    }

    #[test]
    fn test_projection_axes() {
        let proj = OrthographicProjection::new(-1.0, 1.0, -1.0, 1.0);

        // East displacement maps to +x, north displacement to +y
        let (x, y) = proj.project(0.1, 0.0);
        assert!(x > 0.0 && y.abs() < 1e-9);
        let (x, y) = proj.project(0.0, 0.1);
        assert!(x.abs() < EPSILON && y > 0.0);
    }

    #[test]
    fn test_projection_scale_matches_great_circle() {
        // Near the tangent point the projected separation matches the
        // great-circle distance to well under a meter
        let proj = OrthographicProjection::new(-0.2, 0.2, -0.2, 0.2);
        let (x0, y0) = proj.project(-0.1, 0.05);
        let (x1, y1) = proj.project(0.1, -0.05);
        let planar = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let gc = geodetic_distance_km(-0.1, 0.05, 0.1, -0.05);
        assert!((planar - gc).abs() < 1e-3, "planar {} vs gc {}", planar, gc);
    }
}
