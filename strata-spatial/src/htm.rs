//! Hierarchical triangular mesh
//!
//! The sphere is tiled by recursive subdivision of the eight octahedron
//! faces. A trixel id is a 64-bit integer: a 4-bit face id (`0b1000` to
//! `0b1111`) followed by 2 bits per refinement level, so ids at deeper
//! levels are longer. Full-depth ids (level 25) form the flat key space
//! that coverings and value slots are expressed in.

use crate::cartesian::Cartesian;
use crate::ranges::Range;

/// Deepest refinement level; full-depth ids carry `4 + 2 * MAX_LEVEL` bits.
pub const MAX_LEVEL: u8 = 25;

const V0: Cartesian = Cartesian { x: 0.0, y: 0.0, z: 1.0 };
const V1: Cartesian = Cartesian { x: 1.0, y: 0.0, z: 0.0 };
const V2: Cartesian = Cartesian { x: 0.0, y: 1.0, z: 0.0 };
const V3: Cartesian = Cartesian { x: -1.0, y: 0.0, z: 0.0 };
const V4: Cartesian = Cartesian { x: 0.0, y: -1.0, z: 0.0 };
const V5: Cartesian = Cartesian { x: 0.0, y: 0.0, z: -1.0 };

/// A mesh triangle: its id and corner vectors, counter-clockwise seen
/// from outside the sphere.
#[derive(Debug, Clone, Copy)]
pub struct Trixel {
    pub id: u64,
    pub corners: [Cartesian; 3],
}

/// The eight level-0 trixels (southern faces first).
pub fn start_trixels() -> [Trixel; 8] {
    [
        Trixel { id: 0b1000, corners: [V1, V5, V2] },
        Trixel { id: 0b1001, corners: [V2, V5, V3] },
        Trixel { id: 0b1010, corners: [V3, V5, V4] },
        Trixel { id: 0b1011, corners: [V4, V5, V1] },
        Trixel { id: 0b1100, corners: [V1, V0, V4] },
        Trixel { id: 0b1101, corners: [V4, V0, V3] },
        Trixel { id: 0b1110, corners: [V3, V0, V2] },
        Trixel { id: 0b1111, corners: [V2, V0, V1] },
    ]
}

/// Refinement level encoded in an id's bit length.
pub fn id_level(id: u64) -> u8 {
    debug_assert!(id >= 0b1000);
    let bits = 64 - id.leading_zeros() as u8;
    (bits - 4) / 2
}

/// The inclusive full-depth interval covered by a trixel id.
pub fn id_to_range(id: u64) -> Range {
    let shift = 2 * u64::from(MAX_LEVEL - id_level(id));
    Range::new(id << shift, ((id + 1) << shift) - 1)
}

/// Decompose a full-depth interval back into maximal aligned trixel ids.
pub fn range_to_ids(range: &Range) -> Vec<u64> {
    let mut ids = Vec::new();
    let mut start = range.start;
    while start <= range.end {
        // Largest aligned block starting here that still fits.
        let mut shift = (start.trailing_zeros() & !1).min(2 * u32::from(MAX_LEVEL));
        loop {
            let block = 1u64 << shift;
            let id = start >> shift;
            if id >= 0b1000 && start.checked_add(block - 1).is_some_and(|e| e <= range.end) {
                ids.push(id);
                start += block;
                break;
            }
            shift -= 2;
        }
        if start == 0 {
            break;
        }
    }
    ids
}

/// Flatten a canonical range set into its covering trixel ids.
pub fn ids_for_ranges(ranges: &[Range]) -> Vec<u64> {
    ranges.iter().flat_map(range_to_ids).collect()
}

impl Trixel {
    pub fn level(&self) -> u8 {
        id_level(self.id)
    }

    /// The four children from midpoint subdivision.
    pub fn children(&self) -> [Trixel; 4] {
        let [v0, v1, v2] = self.corners;
        let w0 = v1.midpoint(&v2);
        let w1 = v0.midpoint(&v2);
        let w2 = v0.midpoint(&v1);
        let base = self.id << 2;
        [
            Trixel { id: base, corners: [v0, w2, w1] },
            Trixel { id: base | 1, corners: [v1, w0, w2] },
            Trixel { id: base | 2, corners: [v2, w1, w0] },
            Trixel { id: base | 3, corners: [w0, w1, w2] },
        ]
    }

    /// Point-in-trixel test with a small tolerance so boundary points are
    /// always claimed by some trixel.
    pub fn contains(&self, p: &Cartesian) -> bool {
        const EPS: f64 = -1e-12;
        let [v0, v1, v2] = self.corners;
        v0.cross(&v1).dot(p) >= EPS && v1.cross(&v2).dot(p) >= EPS && v2.cross(&v0).dot(p) >= EPS
    }

    /// Spherical centroid of the corners.
    pub fn centroid(&self) -> Cartesian {
        Cartesian::centroid(&self.corners)
    }

    /// Bounding cap: centroid plus the largest corner distance.
    pub fn bounding_cap(&self) -> (Cartesian, f64) {
        let c = self.centroid();
        let r = self
            .corners
            .iter()
            .map(|v| c.angle_to(v))
            .fold(0.0, f64::max);
        (c, r)
    }
}

/// The full-depth trixel id containing a point.
pub fn point_to_id(p: &Cartesian) -> u64 {
    point_to_id_at(p, MAX_LEVEL)
}

/// The trixel id containing a point at the given level.
pub fn point_to_id_at(p: &Cartesian, level: u8) -> u64 {
    let faces = start_trixels();
    let mut current = *faces
        .iter()
        .find(|t| t.contains(p))
        .unwrap_or_else(|| best_by_centroid(&faces, p));
    for _ in 0..level {
        let children = current.children();
        current = *children
            .iter()
            .find(|t| t.contains(p))
            .unwrap_or_else(|| best_by_centroid(&children, p));
    }
    current.id
}

fn best_by_centroid<'a>(trixels: &'a [Trixel], p: &Cartesian) -> &'a Trixel {
    // Numeric corner case: no trixel claimed the point, pick the closest.
    trixels
        .iter()
        .max_by(|a, b| {
            a.centroid()
                .dot(p)
                .partial_cmp(&b.centroid().dot(p))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("non-empty trixel set")
}

// ---------------------------------------------------------------------------
// Regions and coverings
// ---------------------------------------------------------------------------

/// Trixel/region overlap classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    Inside,
    Partial,
    Outside,
}

/// A region of the sphere a covering can be generated for.
pub trait Region {
    fn classify(&self, trixel: &Trixel) -> Overlap;
}

/// Spherical cap: all points within `radius` radians of `center`.
#[derive(Debug, Clone, Copy)]
pub struct Cap {
    pub center: Cartesian,
    pub radius: f64,
}

impl Cap {
    pub fn contains(&self, p: &Cartesian) -> bool {
        self.center.angle_to(p) <= self.radius
    }
}

impl Region for Cap {
    fn classify(&self, trixel: &Trixel) -> Overlap {
        let inside = trixel
            .corners
            .iter()
            .filter(|v| self.contains(v))
            .count();
        // Caps are geodesically convex, so three corners inside implies
        // the whole triangle is inside.
        if inside == 3 {
            return Overlap::Inside;
        }
        if inside > 0 {
            return Overlap::Partial;
        }
        if trixel.contains(&self.center) {
            return Overlap::Partial;
        }
        let [v0, v1, v2] = trixel.corners;
        for (a, b) in [(v0, v1), (v1, v2), (v2, v0)] {
            if arc_distance(&self.center, &a, &b) <= self.radius {
                return Overlap::Partial;
            }
        }
        Overlap::Outside
    }
}

/// Convex spherical polygon: intersection of the hemispheres left of each
/// edge, corners counter-clockwise seen from outside.
#[derive(Debug, Clone)]
pub struct ConvexPolygon {
    pub vertices: Vec<Cartesian>,
    normals: Vec<Cartesian>,
}

impl ConvexPolygon {
    pub fn new(vertices: Vec<Cartesian>) -> Self {
        let n = vertices.len();
        let normals = (0..n)
            .map(|i| vertices[i].cross(&vertices[(i + 1) % n]).normalized())
            .collect();
        ConvexPolygon { vertices, normals }
    }

    pub fn contains(&self, p: &Cartesian) -> bool {
        const EPS: f64 = -1e-12;
        self.normals.iter().all(|n| n.dot(p) >= EPS)
    }
}

impl Region for ConvexPolygon {
    fn classify(&self, trixel: &Trixel) -> Overlap {
        let inside = trixel
            .corners
            .iter()
            .filter(|v| self.contains(v))
            .count();
        if inside == 3 {
            return Overlap::Inside;
        }
        if inside > 0 {
            return Overlap::Partial;
        }
        if self.vertices.iter().any(|v| trixel.contains(v)) {
            return Overlap::Partial;
        }
        let [t0, t1, t2] = trixel.corners;
        let n = self.vertices.len();
        for (a, b) in [(t0, t1), (t1, t2), (t2, t0)] {
            for i in 0..n {
                if arcs_intersect(&a, &b, &self.vertices[i], &self.vertices[(i + 1) % n]) {
                    return Overlap::Partial;
                }
            }
        }
        Overlap::Outside
    }
}

/// Angular distance from `p` to the great-circle arc `a..b`.
fn arc_distance(p: &Cartesian, a: &Cartesian, b: &Cartesian) -> f64 {
    let n = a.cross(b);
    if n.norm() < 1e-15 {
        return p.angle_to(a);
    }
    let n = n.normalized();
    // Foot of the perpendicular from p onto the great circle.
    let d = n.dot(p);
    let foot = Cartesian::new(p.x - d * n.x, p.y - d * n.y, p.z - d * n.z);
    if foot.norm() > 1e-15 {
        let foot = foot.normalized();
        let within = a.cross(&foot).dot(&n) >= 0.0 && foot.cross(b).dot(&n) >= 0.0;
        if within {
            return d.abs().asin();
        }
    }
    p.angle_to(a).min(p.angle_to(b))
}

/// Great-circle arc intersection test.
fn arcs_intersect(a: &Cartesian, b: &Cartesian, c: &Cartesian, d: &Cartesian) -> bool {
    let n1 = a.cross(b);
    let n2 = c.cross(d);
    let t = n1.cross(&n2);
    if t.norm() < 1e-15 {
        return false;
    }
    let t = t.normalized();
    for candidate in [t, Cartesian::new(-t.x, -t.y, -t.z)] {
        let on_ab = a.cross(&candidate).dot(&n1.normalized()) >= 0.0
            && candidate.cross(b).dot(&n1.normalized()) >= 0.0;
        let on_cd = c.cross(&candidate).dot(&n2.normalized()) >= 0.0
            && candidate.cross(d).dot(&n2.normalized()) >= 0.0;
        if on_ab && on_cd {
            return true;
        }
    }
    false
}

/// Pick the terminal covering level for a region of angular size `radius`:
/// trixels shrink by half each level, and `error` scales how much finer
/// than the region they must get.
pub fn appropriate_level(radius: f64, error: f64) -> u8 {
    let target = (radius * error.clamp(0.05, 1.0)).max(1e-10);
    let mut level = 0u8;
    let mut size = std::f64::consts::FRAC_PI_2;
    while size > target && level < MAX_LEVEL {
        size /= 2.0;
        level += 1;
    }
    level
}

/// Generate a covering of a region down to `max_level`.
///
/// Trixels fully inside are emitted at whatever level they close at;
/// partially-overlapping trixels recurse, and at the terminal level are
/// kept only when `partials` is set.
pub fn covering(region: &dyn Region, max_level: u8, partials: bool) -> Vec<u64> {
    let mut out = Vec::new();
    let mut stack: Vec<Trixel> = start_trixels().to_vec();
    while let Some(t) = stack.pop() {
        match region.classify(&t) {
            Overlap::Inside => out.push(t.id),
            Overlap::Outside => {}
            Overlap::Partial => {
                if t.level() >= max_level {
                    if partials {
                        out.push(t.id);
                    }
                } else {
                    stack.extend(t.children());
                }
            }
        }
    }
    out.sort_unstable();
    out
}

/// Canonical range set for a covering.
pub fn covering_to_ranges(ids: &[u64]) -> Vec<Range> {
    let mut ranges: Vec<Range> = ids.iter().map(|&id| id_to_range(id)).collect();
    crate::ranges::merge(&mut ranges);
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> Cartesian {
        Cartesian::from_degrees(lat, lon).unwrap()
    }

    #[test]
    fn every_point_has_a_face() {
        for (lat, lon) in [
            (0.0, 0.0),
            (90.0, 0.0),
            (-90.0, 0.0),
            (45.0, 45.0),
            (-30.0, -120.0),
            (19.32, -99.55),
        ] {
            let id = point_to_id(&p(lat, lon));
            assert_eq!(id_level(id), MAX_LEVEL);
        }
    }

    #[test]
    fn id_range_roundtrip() {
        let id = point_to_id_at(&p(10.0, 20.0), 8);
        let range = id_to_range(id);
        assert_eq!(range_to_ids(&range), vec![id]);
    }

    #[test]
    fn point_lookup_is_prefix_stable() {
        // The level-8 id must be a prefix of the level-15 id.
        let pt = p(19.32, -99.55);
        let shallow = point_to_id_at(&pt, 8);
        let deep = point_to_id_at(&pt, 15);
        assert_eq!(deep >> (2 * (15 - 8)), shallow);
    }

    #[test]
    fn cap_covering_contains_center() {
        let center = p(19.32, -99.55);
        let cap = Cap { center, radius: 10_000.0 / crate::cartesian::EARTH_RADIUS_METERS };
        let level = appropriate_level(cap.radius, 0.3);
        let ids = covering(&cap, level, true);
        assert!(!ids.is_empty());
        let ranges = covering_to_ranges(&ids);
        let full = point_to_id(&center);
        assert!(ranges.iter().any(|r| r.start <= full && full <= r.end));
    }

    #[test]
    fn polygon_covering_contains_interior() {
        let poly = ConvexPolygon::new(vec![
            p(0.0, 0.0),
            p(0.0, 10.0),
            p(10.0, 10.0),
            p(10.0, 0.0),
        ]);
        assert!(poly.contains(&p(5.0, 5.0)));
        assert!(!poly.contains(&p(20.0, 5.0)));
        let ids = covering(&poly, 7, true);
        let ranges = covering_to_ranges(&ids);
        let inner = point_to_id(&p(5.0, 5.0));
        assert!(ranges.iter().any(|r| r.start <= inner && inner <= r.end));
    }

    #[test]
    fn deeper_levels_refine() {
        let cap = Cap { center: p(40.0, -3.0), radius: 0.01 };
        let coarse = covering(&cap, 6, true).len();
        let fine = covering(&cap, 12, true).len();
        assert!(fine >= coarse);
    }
}
