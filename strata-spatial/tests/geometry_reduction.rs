//! Geometry parsing and reduction end to end.

use serde_json::json;
use strata_spatial::{parse_ewkt, parse_geometry, Geometry, Point};

#[test]
fn ewkt_and_cast_agree() {
    let from_ewkt = parse_ewkt("POINT (-99.55 19.32)").unwrap();
    let from_cast =
        parse_geometry(&json!({"_point": {"_latitude": 19.32, "_longitude": -99.55}})).unwrap();
    assert_eq!(from_ewkt, from_cast);
    assert_eq!(
        from_ewkt.reduce(0.3, true).unwrap(),
        from_cast.reduce(0.3, true).unwrap()
    );
}

#[test]
fn circle_contains_its_center() {
    let circle = parse_ewkt("CIRCLE (-3.7 40.4, 2000)").unwrap();
    let reduced = circle.reduce(0.3, true).unwrap();
    let center = Geometry::Point(Point::new(40.4, -3.7))
        .reduce(0.3, true)
        .unwrap();
    let center_id = center.ranges[0].start;
    assert!(reduced
        .ranges
        .iter()
        .any(|r| r.start <= center_id && center_id <= r.end));
}

#[test]
fn smaller_error_refines_coverage() {
    let coarse = parse_ewkt("CIRCLE (10 10, 50000)")
        .unwrap()
        .reduce(1.0, true)
        .unwrap();
    let fine = parse_ewkt("CIRCLE (10 10, 50000)")
        .unwrap()
        .reduce(0.1, true)
        .unwrap();
    assert!(fine.ranges.len() >= coarse.ranges.len());
}

#[test]
fn intersection_narrower_than_members() {
    let a = parse_ewkt("CIRCLE (0 0, 100000)").unwrap();
    let b = parse_ewkt("CIRCLE (0.5 0.5, 100000)").unwrap();
    let sum: u64 = a
        .reduce(0.3, true)
        .unwrap()
        .ranges
        .iter()
        .map(|r| r.end - r.start + 1)
        .sum();
    let inter = Geometry::Intersection(vec![a, b]).reduce(0.3, true).unwrap();
    let inter_sum: u64 = inter.ranges.iter().map(|r| r.end - r.start + 1).sum();
    assert!(inter_sum <= sum);
    assert!(inter_sum > 0, "overlapping circles intersect");
}

#[test]
fn multipolygon_unions() {
    let multi = parse_ewkt(
        "MULTIPOLYGON (((0 0, 5 0, 5 5, 0 5)), ((20 20, 25 20, 25 25, 20 25)))",
    )
    .unwrap();
    let reduced = multi.reduce(0.3, true).unwrap();
    let near = Geometry::Point(Point::new(2.0, 2.0)).reduce(0.3, true).unwrap();
    let far = Geometry::Point(Point::new(22.0, 22.0)).reduce(0.3, true).unwrap();
    for probe in [near, far] {
        let id = probe.ranges[0].start;
        assert!(reduced.ranges.iter().any(|r| r.start <= id && id <= r.end));
    }
}

#[test]
fn chull_orders_unsorted_points() {
    let shuffled = parse_geometry(&json!({"_chull": [
        {"_latitude": 0.0, "_longitude": 0.0},
        {"_latitude": 10.0, "_longitude": 10.0},
        {"_latitude": 0.0, "_longitude": 10.0},
        {"_latitude": 10.0, "_longitude": 0.0},
    ]}))
    .unwrap();
    let reduced = shuffled.reduce(0.3, true).unwrap();
    let inner = Geometry::Point(Point::new(5.0, 5.0)).reduce(0.3, true).unwrap();
    let id = inner.ranges[0].start;
    assert!(reduced.ranges.iter().any(|r| r.start <= id && id <= r.end));
}
