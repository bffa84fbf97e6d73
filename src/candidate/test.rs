use crate::candidate::*;
use crate::costing::{Costing, UniversalCost};
use crate::graph::testing::{CountingSource, init_graph};
use crate::graph::{DEFAULT_TILE_CACHE_SIZE, DirectedEdge, GraphReader, GraphTile};

use approx::assert_relative_eq;
use geo::Point;
use pathsnap_fixtures::{GRID_CITY, STRAIGHT_ROAD};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn nothing(_: &DirectedEdge, _: &GraphTile) -> bool {
    false
}

#[test_log::test]
fn finds_closest_edges() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(STRAIGHT_ROAD)?;
    let forward = graph.edge_between(1, 2).ok_or("missing edge")?;
    let reverse = graph.edge_between(2, 1).ok_or("missing edge")?;

    let reader = Arc::new(graph.into_reader(DEFAULT_TILE_CACHE_SIZE));
    let query = CandidateGridQuery::new(reader, DEFAULT_GRID_CACHE_SIZE);

    let point = Point::new(10.003, 45.0001);
    let candidates = query.query(point, 50.0, 8, &nothing)?;

    assert_eq!(candidates.len(), 2);
    let mut edges = candidates.iter().map(|c| c.edge_id).collect::<Vec<_>>();
    edges.sort();
    let mut expected = vec![forward, reverse];
    expected.sort();
    assert_eq!(edges, expected);

    for candidate in &candidates {
        assert_relative_eq!(candidate.percent_along, 0.5, epsilon = 1e-6);
        assert_relative_eq!(candidate.distance, 11.12, max_relative = 1e-2);
        assert_relative_eq!(candidate.sq_distance(), candidate.distance.powi(2));
        assert_relative_eq!(candidate.point.y(), 45.0, epsilon = 1e-9);
    }

    assert_eq!(query.query(point, 50.0, 1, &nothing)?.len(), 1);
    assert!(query.query(point, 5.0, 8, &nothing)?.is_empty());
    assert!(query.query(point, 50.0, 8, &|_, _| true)?.is_empty());

    Ok(())
}

#[test]
fn candidates_are_sorted_by_distance() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(GRID_CITY)?;
    let reader = Arc::new(graph.into_reader(DEFAULT_TILE_CACHE_SIZE));
    let query = CandidateGridQuery::new(reader, DEFAULT_GRID_CACHE_SIZE);

    let candidates = query.query(Point::new(9.9992, 44.9991), 100.0, 64, &nothing)?;
    assert!(candidates.len() > 2);

    for pair in candidates.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    // One candidate per edge
    let mut edges = candidates.iter().map(|c| c.edge_id).collect::<Vec<_>>();
    edges.sort();
    edges.dedup();
    assert_eq!(edges.len(), candidates.len());

    Ok(())
}

#[test]
fn costing_filters_transit_lines() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(GRID_CITY)?;
    let reader = Arc::new(graph.into_reader(DEFAULT_TILE_CACHE_SIZE));
    let query = CandidateGridQuery::new(reader, DEFAULT_GRID_CACHE_SIZE);

    // Middle of a block, on the diagonal transit line only
    let point = Point::new(9.9995, 44.9995);

    let unfiltered = query.query(point, 30.0, 8, &nothing)?;
    assert_eq!(unfiltered.len(), 1);
    assert_relative_eq!(unfiltered[0].distance, 0.0, epsilon = 0.5);

    let costing = UniversalCost;
    let filtered = query.query(point, 30.0, 8, &|edge, tile| costing.filter_candidate(edge, tile))?;
    assert!(filtered.is_empty());

    Ok(())
}

#[test]
fn filters_by_start_node() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(STRAIGHT_ROAD)?;
    let inbound = graph.edge_between(1, 0).ok_or("missing edge")?;

    let reader = Arc::new(graph.into_reader(DEFAULT_TILE_CACHE_SIZE));
    let query = CandidateGridQuery::new(reader, DEFAULT_GRID_CACHE_SIZE);
    let point = Point::new(10.001, 45.0);

    assert_eq!(query.query(point, 30.0, 8, &nothing)?.len(), 2);

    // The edge leaving the dead end at the start of the road is dropped
    let away_from_dead_ends = |edge: &DirectedEdge, tile: &GraphTile| {
        tile.node(edge.start_node)
            .is_some_and(|node| node.is_dead_end())
    };
    let candidates = query.query(point, 30.0, 8, &away_from_dead_ends)?;

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].edge_id, inbound);

    Ok(())
}

#[test]
fn search_boxes_split_at_antimeridian() {
    let boxes = search_boxes(Point::new(10.0, 45.0), 50.0);
    assert_eq!(boxes.len(), 1);

    let boxes = search_boxes(Point::new(179.9999, 45.0), 50.0);
    assert_eq!(boxes.len(), 2);

    let (east, west) = (&boxes[0], &boxes[1]);
    assert_relative_eq!(east.upper().x(), 180.0);
    assert_relative_eq!(west.lower().x(), -180.0);
    assert!(east.lower().x() > 179.99);
    assert!(west.upper().x() < -179.99);

    let boxes = search_boxes(Point::new(-179.9999, 45.0), 50.0);
    assert_eq!(boxes.len(), 2);
    assert!(boxes.iter().all(|bbox| bbox.upper().x() - bbox.lower().x() < 0.01));
}

#[test]
fn antimeridian_query_loads_few_tiles() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(STRAIGHT_ROAD)?;
    let source = CountingSource::new(graph.tiles.clone());
    let loads = source.counter();

    let reader = Arc::new(GraphReader::new(graph.grid, source, DEFAULT_TILE_CACHE_SIZE));
    let query = CandidateGridQuery::new(reader, DEFAULT_GRID_CACHE_SIZE);

    let candidates = query.query(Point::new(179.9999, 45.0), 50.0, 8, &nothing)?;
    assert!(candidates.is_empty());
    assert!(loads.load(Ordering::Relaxed) <= 32);

    Ok(())
}

#[test_log::test]
fn grid_cache_is_bounded() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(GRID_CITY)?;
    let reader = Arc::new(graph.into_reader(DEFAULT_TILE_CACHE_SIZE));

    let point = Point::new(10.0, 45.0);

    let bounded = CandidateGridQuery::new(reader.clone(), 1);
    assert!(!bounded.query(point, 100.0, 8, &nothing)?.is_empty());
    assert_eq!(bounded.len(), 1);
    assert!(bounded.size() > 0);

    let unbounded = CandidateGridQuery::new(reader, DEFAULT_GRID_CACHE_SIZE);
    unbounded.query(point, 100.0, 8, &nothing)?;
    assert_eq!(unbounded.len(), 4);

    unbounded.clear();
    assert!(unbounded.is_empty());
    assert_eq!(unbounded.size(), 0);

    Ok(())
}

#[test]
fn clamps_percent_along() {
    let candidate = Candidate::new(Default::default(), 1.2, Point::new(0.0, 0.0), 3.0);
    assert_relative_eq!(candidate.percent_along, 1.0);
    assert_relative_eq!(candidate.sq_distance(), 9.0);
}
