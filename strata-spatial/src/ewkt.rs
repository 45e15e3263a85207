//! EWKT parsing
//!
//! Accepts the WGS84 subset: an optional `SRID=4326;` prefix followed by
//! one geometry keyword. Coordinates are `longitude latitude` pairs in
//! degrees; circle radii are meters.

use crate::error::{Result, SpatialError};
use crate::geometry::{Circle, Geometry, Point};
use once_cell::sync::Lazy;
use regex::Regex;

static HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:SRID\s*=\s*(\d+)\s*;\s*)?([A-Z]+)\s*\(").expect("valid regex")
});

/// Cheap detection predicate used by dynamic type inference.
pub fn is_ewkt(s: &str) -> bool {
    HEAD.captures(s).is_some_and(|caps| {
        matches!(
            &caps[2],
            "POINT"
                | "CIRCLE"
                | "CONVEX"
                | "POLYGON"
                | "CHULL"
                | "MULTIPOINT"
                | "MULTICIRCLE"
                | "MULTICONVEX"
                | "MULTIPOLYGON"
                | "MULTICHULL"
                | "GEOMETRYCOLLECTION"
                | "GEOMETRYINTERSECTION"
        )
    }) && parse_ewkt(s).is_ok()
}

/// Parse an EWKT string.
pub fn parse_ewkt(s: &str) -> Result<Geometry> {
    let caps = HEAD
        .captures(s)
        .ok_or_else(|| SpatialError::parse(format!("Invalid EWKT {s:?}")))?;
    if let Some(srid) = caps.get(1) {
        if srid.as_str() != "4326" {
            return Err(SpatialError::Unsupported(format!(
                "SRID {} (only 4326 is supported)",
                srid.as_str()
            )));
        }
    }
    let keyword = caps.get(2).expect("matched").as_str();
    let open = caps.get(0).expect("matched").end() - 1;
    let body = balanced(&s[open..])?;
    let tail = &s[open + body.len() + 2..];
    if !tail.trim().is_empty() {
        return Err(SpatialError::parse(format!(
            "Trailing content after geometry: {tail:?}"
        )));
    }
    parse_keyword(keyword, body)
}

fn parse_keyword(keyword: &str, body: &str) -> Result<Geometry> {
    Ok(match keyword {
        "POINT" => Geometry::Point(parse_point(body)?),
        "CIRCLE" => Geometry::Circle(parse_circle(body)?),
        "CONVEX" => Geometry::Convex(parse_each(body, |s| parse_circle(strip_parens(s)?))?),
        "POLYGON" => Geometry::Polygon(parse_first_ring(body)?),
        "CHULL" => Geometry::Chull(parse_first_ring(body)?),
        "MULTIPOINT" => Geometry::MultiPoint(parse_each(body, parse_loose_point)?),
        "MULTICIRCLE" => Geometry::MultiCircle(parse_each(body, |s| parse_circle(strip_parens(s)?))?),
        "MULTICONVEX" => Geometry::MultiConvex(parse_each(body, |s| {
            parse_each(strip_parens(s)?, |c| parse_circle(strip_parens(c)?))
        })?),
        "MULTIPOLYGON" => {
            Geometry::MultiPolygon(parse_each(body, |s| parse_first_ring(strip_parens(s)?))?)
        }
        "MULTICHULL" => {
            Geometry::MultiChull(parse_each(body, |s| parse_first_ring(strip_parens(s)?))?)
        }
        "GEOMETRYCOLLECTION" => Geometry::Collection(parse_each(body, parse_sub)?),
        "GEOMETRYINTERSECTION" => Geometry::Intersection(parse_each(body, parse_sub)?),
        _ => {
            return Err(SpatialError::parse(format!(
                "Unknown geometry keyword {keyword}"
            )))
        }
    })
}

/// Body of the balanced paren group starting at `s[0] == '('`.
fn balanced(s: &str) -> Result<&str> {
    debug_assert!(s.starts_with('('));
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&s[1..i]);
                }
            }
            _ => {}
        }
    }
    Err(SpatialError::parse("Unbalanced parentheses"))
}

/// Split on commas at paren depth zero.
fn split_top(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(s[start..].trim());
    out
}

fn strip_parens(s: &str) -> Result<&str> {
    let s = s.trim();
    if !s.starts_with('(') {
        return Err(SpatialError::parse(format!("Expected parentheses in {s:?}")));
    }
    let body = balanced(s)?;
    if !s[body.len() + 2..].trim().is_empty() {
        return Err(SpatialError::parse(format!("Trailing content in {s:?}")));
    }
    Ok(body)
}

fn parse_each<T>(body: &str, f: impl Fn(&str) -> Result<T>) -> Result<Vec<T>> {
    split_top(body).into_iter().map(f).collect()
}

fn parse_f64(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| SpatialError::parse(format!("Invalid number {s:?}")))
}

/// `lon lat` coordinate pair.
fn parse_point(s: &str) -> Result<Point> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(SpatialError::parse(format!("Invalid coordinates {s:?}")));
    }
    Ok(Point::new(parse_f64(parts[1])?, parse_f64(parts[0])?))
}

/// Multipoint member: parenthesized or bare pair.
fn parse_loose_point(s: &str) -> Result<Point> {
    let s = s.trim();
    if s.starts_with('(') {
        parse_point(strip_parens(s)?)
    } else {
        parse_point(s)
    }
}

/// `lon lat, radius`.
fn parse_circle(s: &str) -> Result<Circle> {
    let parts = split_top(s);
    if parts.len() != 2 {
        return Err(SpatialError::parse(format!("Invalid circle {s:?}")));
    }
    Ok(Circle {
        center: parse_point(parts[0])?,
        radius: parse_f64(parts[1])?,
    })
}

/// First (outer) ring of a polygon body; inner rings are not supported.
fn parse_first_ring(body: &str) -> Result<Vec<Point>> {
    let rings = split_top(body);
    let outer = rings
        .first()
        .ok_or_else(|| SpatialError::parse("Empty polygon"))?;
    if rings.len() > 1 {
        return Err(SpatialError::Unsupported(
            "Polygon holes are not supported".into(),
        ));
    }
    parse_each(strip_parens(outer)?, parse_point)
}

/// Nested geometry inside a collection (no SRID prefix).
fn parse_sub(s: &str) -> Result<Geometry> {
    parse_ewkt(s.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point() {
        let geo = parse_ewkt("POINT (-99.55 19.32)").unwrap();
        assert_eq!(geo, Geometry::Point(Point::new(19.32, -99.55)));
    }

    #[test]
    fn srid_prefix() {
        assert!(parse_ewkt("SRID=4326;POINT (10 20)").is_ok());
        assert!(matches!(
            parse_ewkt("SRID=3857;POINT (10 20)"),
            Err(SpatialError::Unsupported(_))
        ));
    }

    #[test]
    fn circle() {
        let geo = parse_ewkt("CIRCLE (-99.55 19.32, 1000)").unwrap();
        assert_eq!(
            geo,
            Geometry::Circle(Circle {
                center: Point::new(19.32, -99.55),
                radius: 1000.0
            })
        );
    }

    #[test]
    fn polygon() {
        let geo = parse_ewkt("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))").unwrap();
        match geo {
            Geometry::Polygon(ring) => assert_eq!(ring.len(), 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn multipoint_both_forms() {
        let a = parse_ewkt("MULTIPOINT ((0 0), (10 10))").unwrap();
        let b = parse_ewkt("MULTIPOINT (0 0, 10 10)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn collection() {
        let geo =
            parse_ewkt("GEOMETRYCOLLECTION (POINT (1 2), CIRCLE (3 4, 500))").unwrap();
        match geo {
            Geometry::Collection(members) => assert_eq!(members.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn detection() {
        assert!(is_ewkt("POINT (1 2)"));
        assert!(is_ewkt("SRID=4326;CIRCLE (1 2, 10)"));
        assert!(!is_ewkt("LINESTRING (0 0, 1 1)"));
        assert!(!is_ewkt("not a geometry"));
        assert!(!is_ewkt("POINT (oops)"));
    }

    #[test]
    fn holes_rejected() {
        assert!(parse_ewkt("POLYGON ((0 0, 1 0, 1 1), (0 0, 1 0, 1 1))").is_err());
    }
}
