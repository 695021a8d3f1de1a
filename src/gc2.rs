// GC2 generalized coordinate engine
//
// Computes the strike-parallel (U) and strike-normal (T) generalized
// coordinates of Spudich and Chiou (2015, USGS OFR 2015-1028) for a site
// batch over a rupture of one or more segments. Every quadrilateral
// contributes a weighted (t_i, u_i) pair measured in a locally flat frame
// around its top edge; weights fall off with distance so that each site is
// dominated by the nearest part of the trace.
//
// For multi-segment ruptures the along-strike sense of each segment can
// disagree (strike discordance). The reference strike axis is the
// most-separated pair of segment endpoints; each segment's contribution to
// the backbone direction is sign-flipped when it disagrees with the
// aggregate sense, and segment origin offsets are measured along the
// resulting backbone.

use nalgebra::{Vector2, Vector3};
use tracing::debug;

use crate::constants::M_PER_KM;
use crate::error::DistanceError;
use crate::geodesy::{self, OrthographicProjection};
use crate::rupture::{Point, Rupture};
use crate::sites::SiteGrid;

/// GC2 coordinates for a site batch, plus the along-strike extent of the
/// trace needed to derive Ry and Ry0.
#[derive(Debug, Clone)]
pub struct Gc2 {
    /// Strike-normal coordinate per site, km; hanging wall positive
    pub t: Vec<f64>,
    /// Strike-parallel coordinate per site, km, measured from the trace
    /// origin
    pub u: Vec<f64>,
    /// Total along-strike length of the rupture in km (sum of quad top
    /// edges)
    pub total_length_km: f64,
    /// U coordinate of the far end of the trace in km
    pub trace_end_km: f64,
}

/// Sign with a true zero case (unlike `f64::signum`, which maps 0.0 to 1.0)
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Per-segment discordance resolution for multi-segment ruptures
struct Backbone {
    /// Origin offset of each segment along the backbone, km, already
    /// carrying the segment's discordance sign
    origin_km: Vec<f64>,
}

fn resolve_backbone(rupture: &Rupture) -> Result<Backbone, DistanceError> {
    let bounds = rupture.segment_bounds();
    let nseg = bounds.len();
    let quads = rupture.quads();

    // Trace endpoints of each segment, at the surface
    let starts: Vec<Point> = bounds
        .iter()
        .map(|&(i0, _)| quads[i0].top_left.surface())
        .collect();
    let ends: Vec<Point> = bounds
        .iter()
        .map(|&(_, i1)| quads[i1].top_right.surface())
        .collect();

    // Reference strike axis: the most-separated pair of segment endpoints
    // over all segment pairs. Ties keep the first pair in segment order,
    // which is deterministic.
    let mut best = (starts[0], ends[0]);
    let mut best_d = -1.0;
    for i in 0..nseg {
        for j in (i + 1)..nseg {
            for pa in [starts[i], ends[i]] {
                for pb in [starts[j], ends[j]] {
                    let d = geodesy::geodetic_distance_km(pa.lon, pa.lat, pb.lon, pb.lat);
                    if d > best_d {
                        best_d = d;
                        best = (pa, pb);
                    }
                }
            }
        }
    }
    let p_origin = best.0.ecef();
    let ahat = (best.1.ecef() - p_origin).try_normalize(0.0).ok_or_else(|| {
        DistanceError::InvalidRupture(
            "multi-segment trace endpoints coincide; no reference strike axis".into(),
        )
    })?;

    // Along-trace vector of each segment and its sense along the reference
    // axis
    let b_prime: Vec<Vector3<f64>> = (0..nseg)
        .map(|j| ends[j].ecef() - starts[j].ecef())
        .collect();
    let e: Vec<f64> = b_prime.iter().map(|bp| ahat.dot(bp)).collect();
    let e_total: f64 = e.iter().sum();
    let dc: Vec<f64> = e.iter().map(|&ej| sign(ej) * sign(e_total)).collect();
    debug!(nseg, ?dc, "resolved strike discordance");

    // Consensus backbone from the sign-corrected segment vectors
    let mut b = Vector3::zeros();
    for j in 0..nseg {
        b += b_prime[j] * dc[j];
    }
    let bhat = b.try_normalize(0.0).ok_or_else(|| {
        DistanceError::InvalidRupture(
            "segment strike vectors cancel; cannot form a backbone direction".into(),
        )
    })?;

    let origin_km = (0..nseg)
        .map(|j| ((starts[j].ecef() - p_origin) * dc[j]).dot(&bhat) / M_PER_KM)
        .collect();
    Ok(Backbone { origin_km })
}

/// Compute GC2 coordinates for every site.
///
/// Weight of one quadrilateral with along-strike length L at local
/// coordinates (u, t), per the closed-form arc-tangent integral:
/// - t != 0:             w = [atan((L-u)/t) - atan(-u/t)] / t
/// - t == 0, u outside:  w = 1/(u-L) - 1/u
/// - t == 0, u in [0,L]: the site is on the trace; the weighting diverges
///   in the limit, so the site takes its coordinates from this segment
///   directly (T = 0, U from the local strike coordinate).
pub fn compute(rupture: &Rupture, sites: &SiteGrid) -> Result<Gc2, DistanceError> {
    let n = sites.len();
    let quads = rupture.quads();
    let seg_of = rupture.segment_index();
    let nseg = rupture.segment_count();

    let backbone = if nseg > 1 {
        Some(resolve_backbone(rupture)?)
    } else {
        None
    };

    let lengths: Vec<f64> = quads.iter().map(|q| q.top_edge_length_km()).collect();

    let mut tot_w = vec![0.0; n];
    let mut t_acc = vec![0.0; n];
    let mut u_acc = vec![0.0; n];
    // Sites that land exactly on a segment trace within its span
    let mut on_trace: Vec<Option<f64>> = vec![None; n];

    let mut s_cum = 0.0; // cumulative length of all prior quads
    let mut seg_cum = 0.0; // cumulative length of prior quads within the segment
    let mut last_off = 0.0; // origin offset of the final quad

    for (i, quad) in quads.iter().enumerate() {
        if i > 0 && seg_of[i] != seg_of[i - 1] {
            seg_cum = 0.0;
        }

        // Local flat frame around this quad's top edge
        let p0 = quad.top_left;
        let p1 = quad.top_right;
        let proj = OrthographicProjection::new(
            p0.lon.min(p1.lon),
            p0.lon.max(p1.lon),
            p0.lat.min(p1.lat),
            p0.lat.max(p1.lat),
        );
        let (p0x, p0y) = proj.project(p0.lon, p0.lat);
        let (p1x, p1y) = proj.project(p1.lon, p1.lat);
        let u_hat = Vector2::new(p1x - p0x, p1y - p0y)
            .try_normalize(0.0)
            .ok_or_else(|| {
                DistanceError::InvalidRupture(format!(
                    "quadrilateral {} has a zero-length top edge",
                    i
                ))
            })?;
        let t_hat = Vector2::new(u_hat.y, -u_hat.x);
        let l = lengths[i];

        // Along-strike origin of this quad: cumulative length for a single
        // segment; within-segment cumulative length plus the segment's
        // backbone origin offset otherwise
        let s_off = match &backbone {
            None => s_cum,
            Some(bb) => seg_cum + bb.origin_km[seg_of[i]],
        };

        for k in 0..n {
            let (sx, sy) = proj.project(sites.lon[k], sites.lat[k]);
            let r = Vector2::new(sx - p0x, sy - p0y);
            let u_i = u_hat.dot(&r);
            let t_i = t_hat.dot(&r);

            if t_i != 0.0 {
                let w = (((l - u_i) / t_i).atan() - (-u_i / t_i).atan()) / t_i;
                tot_w[k] += w;
                t_acc[k] += w * t_i;
                u_acc[k] += w * (u_i + s_off);
            } else if u_i < 0.0 || u_i > l {
                let w = 1.0 / (u_i - l) - 1.0 / u_i;
                tot_w[k] += w;
                u_acc[k] += w * (u_i + s_off);
            } else if on_trace[k].is_none() {
                on_trace[k] = Some(u_i + s_off);
            }
        }

        last_off = s_off;
        s_cum += l;
        seg_cum += l;
    }

    let total_length_km = s_cum;
    let trace_end_km = if nseg > 1 {
        last_off + lengths[lengths.len() - 1]
    } else {
        total_length_km
    };

    let mut t = Vec::with_capacity(n);
    let mut u = Vec::with_capacity(n);
    for k in 0..n {
        let (tk, uk) = match on_trace[k] {
            Some(u_on) => (0.0, u_on),
            None => (t_acc[k] / tot_w[k], u_acc[k] / tot_w[k]),
        };
        if !tk.is_finite() || !uk.is_finite() {
            return Err(DistanceError::GeometryInconsistency);
        }
        t.push(tk);
        u.push(uk);
    }

    Ok(Gc2 {
        t,
        u,
        total_length_km,
        trace_end_km,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rupture::Quadrilateral;

    /// Vertical-ish quad with its top edge on the lat=0 trace between the
    /// given longitudes, dipping south
    fn trace_quad(lon0: f64, lon1: f64) -> Quadrilateral {
        Quadrilateral::new(
            Point::new(lon0, 0.0, 0.0),
            Point::new(lon1, 0.0, 0.0),
            Point::new(lon1, -0.03, 12.0),
            Point::new(lon0, -0.03, 12.0),
        )
    }

    fn grid(points: &[(f64, f64)]) -> SiteGrid {
        let lat = points.iter().map(|p| p.1).collect();
        let lon = points.iter().map(|p| p.0).collect();
        let dep = vec![0.0; points.len()];
        SiteGrid::scattered(lat, lon, dep).unwrap()
    }

    #[test]
    fn test_u_monotonic_along_strike() {
        let r = Rupture::single_segment(vec![trace_quad(-0.1, 0.1)]).unwrap();
        let sites = grid(&[(-0.08, -0.05), (0.0, -0.05), (0.09, -0.05)]);
        let gc2 = compute(&r, &sites).unwrap();
        assert!(
            gc2.u[0] < gc2.u[1] && gc2.u[1] < gc2.u[2],
            "u not monotonic: {:?}",
            gc2.u
        );
    }

    #[test]
    fn test_t_sign_symmetry() {
        // Strike points east, so the hanging wall (dip side) is south
        let r = Rupture::single_segment(vec![trace_quad(-0.1, 0.1)]).unwrap();
        let sites = grid(&[(0.02, -0.05), (0.02, 0.05)]);
        let gc2 = compute(&r, &sites).unwrap();
        assert!(gc2.t[0] > 0.0, "hanging-wall site should be positive");
        assert!(gc2.t[1] < 0.0, "footwall site should be negative");
        assert!(
            (gc2.t[0] + gc2.t[1]).abs() < 1e-6,
            "mirror sites should negate: {:?}",
            gc2.t
        );
    }

    #[test]
    fn test_on_trace_site_takes_segment_coordinates() {
        let r = Rupture::single_segment(vec![trace_quad(-0.1, 0.1)]).unwrap();
        let sites = grid(&[(0.0, 0.0)]);
        let gc2 = compute(&r, &sites).unwrap();
        assert_eq!(gc2.t[0], 0.0);
        assert!(
            (gc2.u[0] - gc2.total_length_km / 2.0).abs() < 0.05,
            "u: {} vs half-length {}",
            gc2.u[0],
            gc2.total_length_km / 2.0
        );
    }

    #[test]
    fn test_collinear_quads_give_exact_u() {
        // Two collinear quads in one segment: U is the plain along-strike
        // coordinate regardless of how the weights split
        let r =
            Rupture::single_segment(vec![trace_quad(0.0, 0.1), trace_quad(0.1, 0.2)]).unwrap();
        let sites = grid(&[(0.15, -0.04)]);
        let gc2 = compute(&r, &sites).unwrap();
        let want = geodesy::geodetic_distance_km(0.0, 0.0, 0.15, 0.0);
        assert!(
            (gc2.u[0] - want).abs() < 0.05,
            "u: {} vs along-strike {}",
            gc2.u[0],
            want
        );
    }

    #[test]
    fn test_concordant_two_segment_offsets() {
        let r = Rupture::from_segments(vec![
            vec![trace_quad(0.0, 0.15)],
            vec![trace_quad(0.15, 0.25)],
        ])
        .unwrap();
        let sites = grid(&[(0.2, -0.04)]);
        let gc2 = compute(&r, &sites).unwrap();
        let want = geodesy::geodetic_distance_km(0.0, 0.0, 0.2, 0.0);
        assert!(
            (gc2.u[0] - want).abs() < 0.05,
            "u: {} vs along-strike {}",
            gc2.u[0],
            want
        );
        // Trace end is the second segment's origin plus its length
        let end = geodesy::geodetic_distance_km(0.0, 0.0, 0.25, 0.0);
        assert!((gc2.trace_end_km - end).abs() < 0.05);
    }

    #[test]
    fn test_discordant_segments_resolve_deterministically() {
        // Second segment is traced west while the first is traced east.
        // T keeps each segment's own sign convention, so sites close to a
        // segment follow that segment's hanging wall.
        let quad_rev = Quadrilateral::new(
            Point::new(0.25, 0.0, 0.0),
            Point::new(0.15, 0.0, 0.0),
            Point::new(0.15, 0.03, 12.0),
            Point::new(0.25, 0.03, 12.0),
        );
        let r = Rupture::from_segments(vec![vec![trace_quad(0.0, 0.15)], vec![quad_rev]]).unwrap();

        let sites = grid(&[(0.075, -0.02), (0.2, -0.02)]);
        let gc2 = compute(&r, &sites).unwrap();
        for v in gc2.t.iter().chain(gc2.u.iter()) {
            assert!(v.is_finite());
        }
        // South of the east-striking first segment: hanging wall, positive
        assert!(gc2.t[0] > 0.0, "t near segment 1: {}", gc2.t[0]);
        // South of the west-striking second segment: footwall side in that
        // segment's frame, negative
        assert!(gc2.t[1] < 0.0, "t near segment 2: {}", gc2.t[1]);
    }
}
