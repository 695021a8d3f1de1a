// Point-to-quadrilateral distance kernel
//
// Computes the minimum distance from a batch of ECEF site positions to a
// planar fault patch. Each site is classified against four "fence" planes
// erected along the patch edges: if all four side tests agree, the nearest
// point on the infinite plane projects inside the patch and the distance is
// the perpendicular plane distance; otherwise the distance is the minimum
// over the four bounding edges.

use nalgebra::Vector3;

use crate::constants::M_PER_KM;
use crate::error::DistanceError;

/// Squared distance (meters^2) from the origin to the segment spanned by
/// the site-relative endpoints `p0` and `p1`.
///
/// The projection parameter of the origin on the line (p0, p1) is clamped
/// to the segment: negative projections collapse to `p0`, projections past
/// the far end collapse to `p1`, otherwise the perpendicular foot applies.
/// A zero-length segment collapses to the point distance.
fn dist_sq_to_segment(p0: &Vector3<f64>, p1: &Vector3<f64>) -> f64 {
    let v = p1 - p0;
    let vv = v.dot(&v);
    if vv == 0.0 {
        return p0.dot(p0);
    }

    let c1 = -p0.dot(&v);
    if c1 <= 0.0 {
        return p0.dot(p0);
    }
    if vv <= c1 {
        return p1.dot(p1);
    }

    let foot = p0 + v * (c1 / vv);
    foot.dot(&foot)
}

/// Minimum distance in kilometers from each site to the quadrilateral
/// surface.
///
/// # Arguments
/// * `quad` - The four corner positions in ECEF meters, ring order
/// * `sites` - Site positions in ECEF meters
///
/// # Errors
/// `InvalidRupture` when the quadrilateral is degenerate (zero normal);
/// `GeometryInconsistency` when a site produces a non-finite distance,
/// which indicates corrupt geometry rather than a recoverable state.
pub fn quad_distance_km(
    quad: &[Vector3<f64>; 4],
    sites: &[Vector3<f64>],
) -> Result<Vec<f64>, DistanceError> {
    let [p0, p1, p2, p3] = quad;

    // Unit normal of the patch plane
    let normal = (p1 - p0).cross(&(p2 - p0)).try_normalize(0.0).ok_or_else(|| {
        DistanceError::InvalidRupture("degenerate quadrilateral: corners are collinear".into())
    })?;

    // Fence-plane normals, one per edge, pointing outward from the patch
    let fences = [
        (p1 - p0).cross(&normal),
        (p2 - p1).cross(&normal),
        (p3 - p2).cross(&normal),
        (p0 - p3).cross(&normal),
    ];

    let mut out = Vec::with_capacity(sites.len());
    for s in sites {
        // Corner positions relative to the site
        let d0 = p0 - s;
        let d1 = p1 - s;
        let d2 = p2 - s;
        let d3 = p3 - s;

        let sgn0 = fences[0].dot(&d0).is_sign_negative();
        let sgn1 = fences[1].dot(&d1).is_sign_negative();
        let sgn2 = fences[2].dot(&d2).is_sign_negative();
        let sgn3 = fences[3].dot(&d3).is_sign_negative();

        let dist_sq = if sgn0 == sgn1 && sgn1 == sgn2 && sgn2 == sgn3 {
            // Projects inside the patch: perpendicular plane distance
            let d = d0.dot(&normal);
            d * d
        } else {
            // Projects outside: nearest bounding edge
            let s0 = dist_sq_to_segment(&d0, &d1);
            let s1 = dist_sq_to_segment(&d1, &d2);
            let s2 = dist_sq_to_segment(&d2, &d3);
            let s3 = dist_sq_to_segment(&d3, &d0);
            s0.min(s1).min(s2).min(s3)
        };

        let dist = dist_sq.sqrt() / M_PER_KM;
        if !dist.is_finite() {
            return Err(DistanceError::GeometryInconsistency);
        }
        out.push(dist);
    }

    Ok(out)
}
