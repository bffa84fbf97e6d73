use crate::costing::*;
use crate::graph::testing::init_graph;
use crate::graph::{BuiltGraph, DirectedEdge, GraphTile};
use crate::transition::Label;

use approx::assert_relative_eq;
use pathfinding::num_traits::Zero;
use pathsnap_fixtures::{GRID_CITY, STRAIGHT_ROAD};
use std::error::Error;
use strum::IntoEnumIterator;

fn edge_of<'a>(
    graph: &'a BuiltGraph,
    from: usize,
    to: usize,
) -> Result<(&'a GraphTile, &'a DirectedEdge), Box<dyn Error>> {
    let id = graph.edge_between(from, to).ok_or("missing edge")?;
    let tile = graph
        .tiles
        .iter()
        .find(|tile| tile.id() == id.tile())
        .ok_or("missing tile")?;
    let edge = tile.edge(id).ok_or("edge not in tile")?;

    Ok((tile, edge))
}

/// A label which arrived at the end of the edge.
fn arrived_along(edge: &DirectedEdge) -> Label {
    Label {
        edge: Default::default(),
        from_node: edge.start_node,
        node: edge.end_node,
        destination: None,
        source: 0.0,
        target: 1.0,
        cost: Cost::zero(),
        distance: edge.length,
        turn_cost: 0.0,
        heading: edge.end_heading,
        predecessor: Some(0),
    }
}

#[test]
fn travel_mode_names() {
    assert_eq!("auto".parse::<TravelMode>(), Ok(TravelMode::Drive));
    assert_eq!("pedestrian".parse::<TravelMode>(), Ok(TravelMode::Pedestrian));
    assert_eq!("bicycle".parse::<TravelMode>(), Ok(TravelMode::Bicycle));
    assert_eq!("multimodal".parse::<TravelMode>(), Ok(TravelMode::Universal));
    assert!("hovercraft".parse::<TravelMode>().is_err());

    for mode in TravelMode::iter() {
        assert_eq!(mode.name().parse::<TravelMode>(), Ok(mode));
        assert!(mode.index() < MODE_COSTING_COUNT);
    }

    assert_eq!(TravelMode::Drive.to_string(), "auto");
}

#[test]
fn cost_accumulates() {
    let total = Cost::new(3.0, 2.0) + Cost::new(1.5, 0.5);
    assert_eq!(total, Cost::new(4.5, 2.5));

    assert!(Cost::zero().is_zero());
    assert_eq!(Cost::new(10.0, 4.0).scale(0.25), Cost::new(2.5, 1.0));
}

#[test]
fn universal_cost_is_length() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(STRAIGHT_ROAD)?;
    let (tile, edge) = edge_of(&graph, 0, 1)?;
    let costing = create_universal_cost(&CostingOptions::default());

    assert_eq!(costing.travel_mode(), TravelMode::Universal);
    assert_eq!(costing.edge_cost(edge, 0), Cost::new(edge.length, edge.length));
    assert_relative_eq!(costing.astar_cost_factor(), 0.0);
    assert!(!costing.filter_edge(edge));

    // Turning back is never restricted
    let (_, reverse) = edge_of(&graph, 1, 0)?;
    let arrived = arrived_along(edge);
    assert!(costing.allowed(reverse, Some(&arrived), tile, Default::default()));

    Ok(())
}

#[test]
fn universal_cost_skips_transit() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(GRID_CITY)?;
    let (tile, transit) = edge_of(&graph, 0, 35)?;
    let costing = UniversalCost;

    assert!(transit.is_transit_line());
    assert!(costing.filter_edge(transit));
    assert!(!costing.allowed(transit, None, tile, Default::default()));

    Ok(())
}

#[test]
fn access_cost_respects_access() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(GRID_CITY)?;
    let (tile, transit) = edge_of(&graph, 0, 35)?;
    let (_, street) = edge_of(&graph, 0, 1)?;

    let auto = AccessCost::auto(&CostingOptions::default());
    assert!(auto.filter_edge(transit));
    assert!(!auto.filter_edge(street));

    // Transit lines are walkable once permitted
    let pedestrian = AccessCost::pedestrian(&CostingOptions::default());
    assert!(pedestrian.filter_edge(transit));

    let options = CostingOptions {
        transit_lines: true,
        ..Default::default()
    };
    let pedestrian = AccessCost::pedestrian(&options);
    assert!(!pedestrian.filter_edge(transit));
    assert!(pedestrian.allowed(transit, None, tile, Default::default()));

    Ok(())
}

#[test]
fn access_cost_blocks_uturns() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(STRAIGHT_ROAD)?;
    let options = CostingOptions::default();

    let auto = AccessCost::auto(&options);
    let pedestrian = AccessCost::pedestrian(&options);

    // Reversing at a junction
    let (tile, forward) = edge_of(&graph, 0, 1)?;
    let (_, reverse) = edge_of(&graph, 1, 0)?;
    let arrived = arrived_along(forward);

    assert!(!auto.allowed(reverse, Some(&arrived), tile, Default::default()));
    assert!(pedestrian.allowed(reverse, Some(&arrived), tile, Default::default()));

    // Carrying straight on
    let (_, next) = edge_of(&graph, 1, 2)?;
    assert!(auto.allowed(next, Some(&arrived), tile, Default::default()));

    // Reversing at a dead end
    let (_, last) = edge_of(&graph, 2, 3)?;
    let (_, back) = edge_of(&graph, 3, 2)?;
    let arrived = arrived_along(last);
    assert!(auto.allowed(back, Some(&arrived), tile, Default::default()));

    Ok(())
}

#[test]
fn access_cost_edge_time() -> Result<(), Box<dyn Error>> {
    let graph = init_graph(STRAIGHT_ROAD)?;
    let (_, edge) = edge_of(&graph, 0, 1)?;
    let options = CostingOptions::default();

    // Drivers use the posted speed
    let auto = create_auto_cost(&options);
    let cost = auto.edge_cost(edge, 0);
    assert_relative_eq!(cost.secs, edge.length / (edge.speed / 3.6), epsilon = 1e-9);
    assert_relative_eq!(cost.cost, cost.secs);
    assert_relative_eq!(auto.astar_cost_factor(), 3.6 / options.top_speed, epsilon = 1e-12);

    // Walkers use their own
    let pedestrian = create_pedestrian_cost(&options);
    let cost = pedestrian.edge_cost(edge, 0);
    assert_relative_eq!(
        cost.secs,
        edge.length / (options.walking_speed / 3.6),
        epsilon = 1e-9
    );

    let bicycle = create_bicycle_cost(&options);
    assert!(bicycle.edge_cost(edge, 0).secs < cost.secs);
    assert_eq!(bicycle.travel_mode(), TravelMode::Bicycle);

    Ok(())
}
