//! Geometry value types
//!
//! Leaf geometries arrive either as EWKT strings or as cast objects
//! (`_point`, `_circle`, `_polygon`, ...). Every geometry reduces to a
//! canonical full-depth trixel range set plus a centroid; the range set is
//! what value slots store and the centroid is what the hash term is
//! derived from.

use crate::cartesian::{Cartesian, EARTH_RADIUS_METERS};
use crate::error::{Result, SpatialError};
use crate::htm::{
    appropriate_level, covering, covering_to_ranges, point_to_id, Cap, ConvexPolygon, MAX_LEVEL,
};
use crate::ranges::{intersection, union, Range};
use serde_json::Value;

/// A geodetic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Point { latitude, longitude }
    }

    pub fn to_cartesian(&self) -> Result<Cartesian> {
        Cartesian::from_degrees(self.latitude, self.longitude)
    }
}

/// A cap described by center and radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    fn cap(&self) -> Result<Cap> {
        if self.radius <= 0.0 || !self.radius.is_finite() {
            return Err(SpatialError::out_of_range(format!(
                "circle radius {} must be positive",
                self.radius
            )));
        }
        Ok(Cap {
            center: self.center.to_cartesian()?,
            radius: self.radius / EARTH_RADIUS_METERS,
        })
    }
}

/// Any indexable geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    MultiPoint(Vec<Point>),
    Circle(Circle),
    MultiCircle(Vec<Circle>),
    /// Intersection of caps.
    Convex(Vec<Circle>),
    MultiConvex(Vec<Vec<Circle>>),
    /// Convex polygon from an explicit ring.
    Polygon(Vec<Point>),
    MultiPolygon(Vec<Vec<Point>>),
    /// Convex hull of a point cloud.
    Chull(Vec<Point>),
    MultiChull(Vec<Vec<Point>>),
    /// Union of member geometries.
    Collection(Vec<Geometry>),
    /// Intersection of member geometries.
    Intersection(Vec<Geometry>),
}

/// Canonical reduction of a geometry: merged full-depth ranges plus the
/// spherical centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduced {
    pub ranges: Vec<Range>,
    pub centroid: Cartesian,
}

impl Geometry {
    /// Reduce to ranges and centroid.
    ///
    /// `error` scales the terminal covering level relative to the
    /// geometry's angular size; `partials` keeps terminal trixels that
    /// only partially overlap.
    pub fn reduce(&self, error: f64, partials: bool) -> Result<Reduced> {
        match self {
            Geometry::Point(p) => {
                let c = p.to_cartesian()?;
                let id = point_to_id(&c);
                Ok(Reduced {
                    ranges: vec![Range::new(id, id)],
                    centroid: c,
                })
            }
            Geometry::Circle(circle) => {
                let cap = circle.cap()?;
                let level = appropriate_level(cap.radius, error);
                let ids = covering(&cap, level, partials);
                Ok(Reduced {
                    ranges: covering_to_ranges(&ids),
                    centroid: cap.center,
                })
            }
            Geometry::Convex(circles) => {
                if circles.is_empty() {
                    return Err(SpatialError::parse("Empty convex"));
                }
                let mut reduced: Option<Vec<Range>> = None;
                let mut centers = Vec::with_capacity(circles.len());
                for circle in circles {
                    let part = Geometry::Circle(*circle).reduce(error, partials)?;
                    centers.push(part.centroid);
                    reduced = Some(match reduced {
                        None => part.ranges,
                        Some(acc) => intersection(&acc, &part.ranges),
                    });
                }
                Ok(Reduced {
                    ranges: reduced.unwrap_or_default(),
                    centroid: Cartesian::centroid(&centers),
                })
            }
            Geometry::Polygon(ring) => reduce_polygon(ring, error, partials),
            Geometry::Chull(points) => {
                let ring = hull_ring(points)?;
                reduce_polygon(&ring, error, partials)
            }
            Geometry::MultiPoint(points) => {
                reduce_union(points.iter().map(|p| Geometry::Point(*p)), error, partials)
            }
            Geometry::MultiCircle(circles) => reduce_union(
                circles.iter().map(|c| Geometry::Circle(*c)),
                error,
                partials,
            ),
            Geometry::MultiConvex(convexes) => reduce_union(
                convexes.iter().map(|c| Geometry::Convex(c.clone())),
                error,
                partials,
            ),
            Geometry::MultiPolygon(rings) => reduce_union(
                rings.iter().map(|r| Geometry::Polygon(r.clone())),
                error,
                partials,
            ),
            Geometry::MultiChull(clouds) => reduce_union(
                clouds.iter().map(|c| Geometry::Chull(c.clone())),
                error,
                partials,
            ),
            Geometry::Collection(members) => {
                reduce_union(members.iter().cloned(), error, partials)
            }
            Geometry::Intersection(members) => {
                if members.is_empty() {
                    return Err(SpatialError::parse("Empty intersection"));
                }
                let mut acc: Option<Vec<Range>> = None;
                let mut centroids = Vec::with_capacity(members.len());
                for member in members {
                    let part = member.reduce(error, partials)?;
                    centroids.push(part.centroid);
                    acc = Some(match acc {
                        None => part.ranges,
                        Some(prev) => intersection(&prev, &part.ranges),
                    });
                }
                Ok(Reduced {
                    ranges: acc.unwrap_or_default(),
                    centroid: Cartesian::centroid(&centroids),
                })
            }
        }
    }
}

fn reduce_union<I>(members: I, error: f64, partials: bool) -> Result<Reduced>
where
    I: Iterator<Item = Geometry>,
{
    let mut ranges: Vec<Range> = Vec::new();
    let mut centroids = Vec::new();
    let mut any = false;
    for member in members {
        any = true;
        let part = member.reduce(error, partials)?;
        ranges = union(&ranges, &part.ranges);
        centroids.push(part.centroid);
    }
    if !any {
        return Err(SpatialError::parse("Empty geometry collection"));
    }
    Ok(Reduced {
        ranges,
        centroid: Cartesian::centroid(&centroids),
    })
}

fn reduce_polygon(ring: &[Point], error: f64, partials: bool) -> Result<Reduced> {
    if ring.len() < 3 {
        return Err(SpatialError::parse(format!(
            "Polygon needs at least 3 corners, got {}",
            ring.len()
        )));
    }
    let mut vertices = Vec::with_capacity(ring.len());
    for p in ring {
        vertices.push(p.to_cartesian()?);
    }
    // Drop a closing vertex equal to the first.
    if vertices.len() > 3 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    let centroid = Cartesian::centroid(&vertices);
    // Normalize winding so the interior is on the positive side.
    if vertices[0].cross(&vertices[1]).dot(&centroid) < 0.0 {
        vertices.reverse();
    }
    let polygon = ConvexPolygon::new(vertices);
    let radius = polygon
        .vertices
        .iter()
        .map(|v| centroid.angle_to(v))
        .fold(0.0, f64::max);
    let level = appropriate_level(radius.max(1e-6), error).min(MAX_LEVEL);
    let ids = covering(&polygon, level, partials);
    Ok(Reduced {
        ranges: covering_to_ranges(&ids),
        centroid,
    })
}

/// Order a point cloud counter-clockwise around its centroid so it can be
/// treated as a convex ring.
fn hull_ring(points: &[Point]) -> Result<Vec<Point>> {
    if points.len() < 3 {
        return Err(SpatialError::parse(format!(
            "Hull needs at least 3 points, got {}",
            points.len()
        )));
    }
    let mut carts = Vec::with_capacity(points.len());
    for p in points {
        carts.push((*p, p.to_cartesian()?));
    }
    let centroid = Cartesian::centroid(&carts.iter().map(|(_, c)| *c).collect::<Vec<_>>());
    // Local tangent basis at the centroid.
    let up = if centroid.z.abs() < 0.9 {
        Cartesian::new(0.0, 0.0, 1.0)
    } else {
        Cartesian::new(1.0, 0.0, 0.0)
    };
    let east = centroid.cross(&up).normalized();
    let north = east.cross(&centroid).normalized();
    carts.sort_by(|(_, a), (_, b)| {
        let ta = f64::atan2(a.dot(&north), a.dot(&east));
        let tb = f64::atan2(b.dot(&north), b.dot(&east));
        ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(carts.into_iter().map(|(p, _)| p).collect())
}

// ---------------------------------------------------------------------------
// Cast-object parsing
// ---------------------------------------------------------------------------

fn num(value: &Value, key: &str) -> Result<f64> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| SpatialError::parse(format!("Missing or invalid {key}")))
}

fn parse_point_object(value: &Value) -> Result<Point> {
    match value {
        Value::Object(_) => Ok(Point::new(num(value, "_latitude")?, num(value, "_longitude")?)),
        Value::Array(pair) if pair.len() == 2 => {
            let lat = pair[0]
                .as_f64()
                .ok_or_else(|| SpatialError::parse("Invalid latitude"))?;
            let lon = pair[1]
                .as_f64()
                .ok_or_else(|| SpatialError::parse("Invalid longitude"))?;
            Ok(Point::new(lat, lon))
        }
        other => Err(SpatialError::parse(format!("Invalid point {other}"))),
    }
}

fn parse_circle_object(value: &Value) -> Result<Circle> {
    Ok(Circle {
        center: parse_point_object(value)?,
        radius: num(value, "_radius")?,
    })
}

/// Parse a ring: either `{_latitude: [...], _longitude: [...]}` parallel
/// arrays or an array of point objects.
fn parse_ring(value: &Value) -> Result<Vec<Point>> {
    match value {
        Value::Object(map) => {
            let lats = map
                .get("_latitude")
                .and_then(Value::as_array)
                .ok_or_else(|| SpatialError::parse("Missing _latitude array"))?;
            let lons = map
                .get("_longitude")
                .and_then(Value::as_array)
                .ok_or_else(|| SpatialError::parse("Missing _longitude array"))?;
            if lats.len() != lons.len() {
                return Err(SpatialError::parse(
                    "_latitude and _longitude lengths differ",
                ));
            }
            lats.iter()
                .zip(lons)
                .map(|(lat, lon)| {
                    Ok(Point::new(
                        lat.as_f64()
                            .ok_or_else(|| SpatialError::parse("Invalid latitude"))?,
                        lon.as_f64()
                            .ok_or_else(|| SpatialError::parse("Invalid longitude"))?,
                    ))
                })
                .collect()
        }
        Value::Array(items) => items.iter().map(parse_point_object).collect(),
        other => Err(SpatialError::parse(format!("Invalid ring {other}"))),
    }
}

fn parse_many<T>(value: &Value, f: impl Fn(&Value) -> Result<T>) -> Result<Vec<T>> {
    value
        .as_array()
        .ok_or_else(|| SpatialError::parse("Expected an array"))?
        .iter()
        .map(f)
        .collect()
}

/// Geometry cast kinds, named after their `_`-prefixed document keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoCast {
    Point,
    Circle,
    Convex,
    Polygon,
    Chull,
    MultiPoint,
    MultiCircle,
    MultiConvex,
    MultiPolygon,
    MultiChull,
    Collection,
    Intersection,
    Ewkt,
}

impl Geometry {
    /// Build a geometry from a cast object's payload.
    pub fn from_cast(kind: GeoCast, value: &Value) -> Result<Geometry> {
        Ok(match kind {
            GeoCast::Point => Geometry::Point(parse_point_object(value)?),
            GeoCast::Circle => Geometry::Circle(parse_circle_object(value)?),
            GeoCast::Convex => Geometry::Convex(parse_many(value, parse_circle_object)?),
            GeoCast::Polygon => Geometry::Polygon(parse_ring(value)?),
            GeoCast::Chull => Geometry::Chull(parse_ring(value)?),
            GeoCast::MultiPoint => Geometry::MultiPoint(parse_many(value, parse_point_object)?),
            GeoCast::MultiCircle => Geometry::MultiCircle(parse_many(value, parse_circle_object)?),
            GeoCast::MultiConvex => Geometry::MultiConvex(parse_many(value, |v| {
                parse_many(v, parse_circle_object)
            })?),
            GeoCast::MultiPolygon => Geometry::MultiPolygon(parse_many(value, parse_ring)?),
            GeoCast::MultiChull => Geometry::MultiChull(parse_many(value, parse_ring)?),
            GeoCast::Collection => Geometry::Collection(parse_members(value)?),
            GeoCast::Intersection => Geometry::Intersection(parse_members(value)?),
            GeoCast::Ewkt => match value {
                Value::String(s) => crate::ewkt::parse_ewkt(s)?,
                other => return Err(SpatialError::parse(format!("Invalid EWKT {other}"))),
            },
        })
    }
}

fn cast_kind(key: &str) -> Option<GeoCast> {
    Some(match key {
        "_point" => GeoCast::Point,
        "_circle" => GeoCast::Circle,
        "_convex" => GeoCast::Convex,
        "_polygon" => GeoCast::Polygon,
        "_chull" => GeoCast::Chull,
        "_multipoint" => GeoCast::MultiPoint,
        "_multicircle" => GeoCast::MultiCircle,
        "_multiconvex" => GeoCast::MultiConvex,
        "_multipolygon" => GeoCast::MultiPolygon,
        "_multichull" => GeoCast::MultiChull,
        "_geo_collection" => GeoCast::Collection,
        "_geo_intersection" => GeoCast::Intersection,
        "_ewkt" => GeoCast::Ewkt,
        _ => return None,
    })
}

/// Collection/intersection members: an array of single-key cast objects,
/// or one object whose keys are all casts.
fn parse_members(value: &Value) -> Result<Vec<Geometry>> {
    match value {
        Value::Array(items) => items.iter().map(parse_single_cast).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, inner)| {
                let kind = cast_kind(key)
                    .ok_or_else(|| SpatialError::parse(format!("Unknown geometry cast {key}")))?;
                Geometry::from_cast(kind, inner)
            })
            .collect(),
        other => Err(SpatialError::parse(format!("Invalid members {other}"))),
    }
}

fn parse_single_cast(value: &Value) -> Result<Geometry> {
    let map = value
        .as_object()
        .filter(|m| m.len() == 1)
        .ok_or_else(|| SpatialError::parse("Expected a single-cast object"))?;
    let (key, inner) = map.iter().next().expect("len checked");
    let kind =
        cast_kind(key).ok_or_else(|| SpatialError::parse(format!("Unknown geometry cast {key}")))?;
    Geometry::from_cast(kind, inner)
}

/// Parse any geometry leaf: EWKT string or cast object.
pub fn parse_geometry(value: &Value) -> Result<Geometry> {
    match value {
        Value::String(s) => crate::ewkt::parse_ewkt(s),
        Value::Object(map) if map.len() == 1 => parse_single_cast(value),
        other => Err(SpatialError::parse(format!("Invalid geometry {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn point_cast() {
        let geo = Geometry::from_cast(
            GeoCast::Point,
            &json!({"_latitude": 19.32, "_longitude": -99.55}),
        )
        .unwrap();
        let reduced = geo.reduce(0.3, true).unwrap();
        assert_eq!(reduced.ranges.len(), 1);
        assert_eq!(reduced.ranges[0].start, reduced.ranges[0].end);
    }

    #[test]
    fn same_geometry_reduces_identically() {
        let geo = Geometry::Circle(Circle {
            center: Point::new(19.32, -99.55),
            radius: 1000.0,
        });
        assert_eq!(geo.reduce(0.3, true).unwrap(), geo.reduce(0.3, true).unwrap());
    }

    #[test]
    fn collection_unions_members() {
        let a = Geometry::Point(Point::new(0.0, 0.0));
        let b = Geometry::Point(Point::new(45.0, 45.0));
        let collection = Geometry::Collection(vec![a.clone(), b.clone()]);
        let reduced = collection.reduce(0.3, true).unwrap();
        let ra = a.reduce(0.3, true).unwrap();
        let rb = b.reduce(0.3, true).unwrap();
        for r in ra.ranges.iter().chain(&rb.ranges) {
            assert!(reduced
                .ranges
                .iter()
                .any(|m| m.start <= r.start && r.end <= m.end));
        }
    }

    #[test]
    fn intersection_of_disjoint_is_empty() {
        let a = Geometry::Circle(Circle {
            center: Point::new(0.0, 0.0),
            radius: 1000.0,
        });
        let b = Geometry::Circle(Circle {
            center: Point::new(45.0, 45.0),
            radius: 1000.0,
        });
        let reduced = Geometry::Intersection(vec![a, b]).reduce(0.3, true).unwrap();
        assert!(reduced.ranges.is_empty());
    }

    #[test]
    fn polygon_ring_forms() {
        let parallel = json!({"_latitude": [0.0, 0.0, 10.0], "_longitude": [0.0, 10.0, 5.0]});
        let objects = json!([
            {"_latitude": 0.0, "_longitude": 0.0},
            {"_latitude": 0.0, "_longitude": 10.0},
            {"_latitude": 10.0, "_longitude": 5.0},
        ]);
        let a = Geometry::from_cast(GeoCast::Polygon, &parallel).unwrap();
        let b = Geometry::from_cast(GeoCast::Polygon, &objects).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_radius_rejected() {
        let geo = Geometry::Circle(Circle {
            center: Point::new(0.0, 0.0),
            radius: -5.0,
        });
        assert!(geo.reduce(0.3, true).is_err());
    }
}
