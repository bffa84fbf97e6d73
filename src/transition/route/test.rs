use crate::graph::testing::init_graph;
use crate::graph::{BuiltGraph, GraphId, GraphReader};
use crate::transition::*;

use approx::assert_relative_eq;
use pathsnap_fixtures::STRAIGHT_ROAD;
use std::error::Error;

struct Road {
    reader: GraphReader,
    edges: [GraphId; 3],
    reverse: GraphId,
}

fn init_road() -> Result<Road, Box<dyn Error>> {
    let graph: BuiltGraph = init_graph(STRAIGHT_ROAD)?;
    let edge = |from, to| graph.edge_between(from, to).ok_or("missing edge");

    let edges = [edge(0, 1)?, edge(1, 2)?, edge(2, 3)?];
    let reverse = edge(1, 0)?;

    Ok(Road {
        reader: graph.into_reader(usize::MAX),
        edges,
        reverse,
    })
}

#[test]
fn merges_continuing_segments() -> Result<(), Box<dyn Error>> {
    let Road { edges, .. } = init_road()?;

    let mut route = vec![];
    merge_route(
        &mut route,
        [
            EdgeSegment::new(edges[0], 0.0, 0.4),
            EdgeSegment::new(edges[0], 0.4, 0.9),
        ],
    );
    merge_route(&mut route, [EdgeSegment::new(edges[0], 0.9, 1.0), EdgeSegment::full(edges[1])]);

    assert_eq!(
        route,
        vec![EdgeSegment::full(edges[0]), EdgeSegment::full(edges[1])]
    );

    // A gap along the edge is kept apart
    merge_route(&mut route, [EdgeSegment::new(edges[1], 0.2, 0.3)]);
    assert_eq!(route.len(), 3);

    Ok(())
}

#[test]
fn validates_continuous_route() -> Result<(), Box<dyn Error>> {
    let Road { reader, edges, .. } = init_road()?;

    let route = vec![
        EdgeSegment::new(edges[0], 0.5, 1.0),
        EdgeSegment::full(edges[1]),
        EdgeSegment::new(edges[2], 0.0, 0.5),
    ];
    validate_route(&reader, &route)?;

    // Along a single edge
    validate_route(&reader, &[EdgeSegment::new(edges[1], 0.3, 0.3)])?;
    validate_route(&reader, &[])?;

    Ok(())
}

#[test]
fn rejects_broken_routes() -> Result<(), Box<dyn Error>> {
    let Road {
        reader,
        edges,
        reverse,
    } = init_road()?;

    let skipping = [EdgeSegment::full(edges[0]), EdgeSegment::full(edges[2])];
    assert!(matches!(
        validate_route(&reader, &skipping),
        Err(RouteError::NotAdjoined { index: 1 })
    ));

    let stopping_short = [
        EdgeSegment::new(edges[0], 0.0, 0.5),
        EdgeSegment::full(edges[1]),
    ];
    assert!(matches!(
        validate_route(&reader, &stopping_short),
        Err(RouteError::NotAdjoined { index: 1 })
    ));

    let looping = [
        EdgeSegment::full(edges[0]),
        EdgeSegment::full(reverse),
        EdgeSegment::full(edges[0]),
    ];
    assert!(matches!(
        validate_route(&reader, &looping),
        Err(RouteError::Loop(edge)) if edge == edges[0]
    ));

    let dangling = GraphId::new(edges[0].tile(), 999);
    assert!(matches!(
        validate_route(&reader, &[EdgeSegment::full(dangling)]),
        Err(RouteError::DanglingEdge(edge)) if edge == dangling
    ));

    let backwards = [EdgeSegment::new(edges[0], 0.7, 0.3)];
    assert!(matches!(
        validate_route(&reader, &backwards),
        Err(RouteError::InvalidRange { index: 0, .. })
    ));

    Ok(())
}

#[test]
fn adjoined_segments() -> Result<(), Box<dyn Error>> {
    let Road {
        reader,
        edges,
        reverse,
    } = init_road()?;

    let first = EdgeSegment::full(edges[0]);
    assert!(first.adjoined(&reader, &EdgeSegment::new(edges[1], 0.0, 0.5))?);
    assert!(first.adjoined(&reader, &EdgeSegment::full(reverse))?);
    assert!(!first.adjoined(&reader, &EdgeSegment::full(edges[2]))?);
    assert!(!first.adjoined(&reader, &EdgeSegment::new(edges[1], 0.1, 0.5))?);

    let partial = EdgeSegment::new(edges[1], 0.2, 0.6);
    assert!(partial.adjoined(&reader, &EdgeSegment::new(edges[1], 0.6, 0.9))?);

    Ok(())
}

#[test]
fn renders_route() -> Result<(), Box<dyn Error>> {
    let Road { reader, edges, .. } = init_road()?;

    let route = [
        EdgeSegment::new(edges[0], 0.5, 1.0),
        EdgeSegment::new(edges[1], 0.0, 0.25),
    ];

    let (_, middle) = reader.edge_nodes(edges[0])?.ok_or("missing edge")?;
    let rendered = route_to_string(&reader, &route)?;
    assert_eq!(
        rendered,
        format!("[0.500 {} {middle}] [{middle} {} 0.250]", edges[0], edges[1])
    );

    let dangling = GraphId::new(edges[0].tile(), 999);
    let rendered = route_to_string(&reader, &[EdgeSegment::full(dangling)])?;
    assert!(rendered.contains("dummy"));

    let shape = route_shape(&reader, &route)?;
    let first = shape.points().next().ok_or("empty shape")?;
    let last = shape.points().last().ok_or("empty shape")?;
    assert_relative_eq!(first.x(), 10.001, epsilon = 1e-9);
    assert_relative_eq!(last.x(), 10.0025, epsilon = 1e-9);

    let wkt = route_to_wkt(&reader, &route)?;
    assert!(wkt.starts_with("LINESTRING"));

    Ok(())
}
