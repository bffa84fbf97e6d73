use crate::candidate::Candidate;
use crate::costing::Costing;
use crate::geometry::DistanceApproximator;
use crate::graph::{GraphError, GraphId, GraphReader, TileCursor};
use crate::transition::{Label, LabelSet, TurnCostTable};

use indexmap::IndexMap;
use indexmap::map::Entry;
use log::trace;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Everything a search needs besides its origin and destinations.
#[derive(Debug, Clone, Copy)]
pub struct RoutingContext<'a> {
    pub reader: &'a GraphReader,
    pub costing: &'a dyn Costing,
    pub turn_costs: &'a TurnCostTable,

    /// Centered on the measurement the destinations were found around.
    pub approximator: DistanceApproximator,

    /// Radius the destinations were searched within, in meters.
    pub search_radius: f64,

    /// Routes longer than this, in meters, are abandoned.
    pub max_route_distance: f64,
}

impl RoutingContext<'_> {
    /// Lower bound of the cost remaining from the node to the destinations.
    fn heuristic(&self, node: GraphId) -> Result<f64, GraphError> {
        let factor = self.costing.astar_cost_factor();
        if factor <= 0.0 {
            return Ok(0.0);
        }

        let Some(position) = self.reader.node_position(node)? else {
            return Ok(0.0);
        };

        Ok(factor * (self.approximator.distance(position) - self.search_radius).max(0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LabelKey {
    Node(GraphId),
    Destination(usize),
}

impl From<&Label> for LabelKey {
    fn from(label: &Label) -> Self {
        match label.destination {
            Some(destination) => LabelKey::Destination(destination),
            None => LabelKey::Node(label.node),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Status {
    label: usize,
    settled: bool,
}

#[derive(Debug)]
struct SmallestHolder {
    cost: f64,
    index: usize,
}

impl PartialEq for SmallestHolder {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}

impl Eq for SmallestHolder {}

impl PartialOrd for SmallestHolder {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestHolder {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost)
    }
}

#[derive(Debug, Default)]
struct Frontier {
    labels: LabelSet,
    queue: BinaryHeap<SmallestHolder>,
    status: FxIndexMap<LabelKey, Status>,
}

impl Frontier {
    /// Records the label unless its key already holds a cheaper or
    /// settled label.
    fn relax(&mut self, label: Label, sortcost: f64) {
        match self.status.entry(LabelKey::from(&label)) {
            Entry::Vacant(entry) => {
                let index = self.labels.push(label);
                entry.insert(Status {
                    label: index,
                    settled: false,
                });
                self.queue.push(SmallestHolder {
                    cost: sortcost,
                    index,
                });
            }
            Entry::Occupied(mut entry) => {
                let status = entry.get_mut();
                if status.settled {
                    return;
                }

                let current = self
                    .labels
                    .get(status.label)
                    .map_or(f64::INFINITY, |existing| existing.cost.cost);

                if label.cost.cost < current {
                    let index = self.labels.push(label);
                    status.label = index;
                    self.queue.push(SmallestHolder {
                        cost: sortcost,
                        index,
                    });
                }
            }
        }
    }

    /// Settles the label, unless it was superseded or already settled.
    fn settle(&mut self, index: usize) -> Option<Label> {
        let label = *self.labels.get(index)?;
        let status = self.status.get_mut(&LabelKey::from(&label))?;

        if status.settled || status.label != index {
            return None;
        }

        status.settled = true;
        Some(label)
    }
}

/// Finds the cheapest routes from the origin candidate to every
/// reachable destination candidate.
///
/// Returns every label created, alongside the index of the label
/// settled on each reached destination (keyed by destination index).
/// Destinations further than the context's route distance, or which
/// cannot be reached, are absent from the map.
///
/// The origin's own edge is never entered again once left, so a
/// destination behind the origin on the same edge is never reached.
/// When a `predecessor` is given, the origin edge must be allowed after
/// it or nothing is reached.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
pub fn find_shortest_path(
    context: &RoutingContext<'_>,
    origin: &Candidate,
    destinations: &[Candidate],
    predecessor: Option<&Label>,
) -> Result<(LabelSet, FxHashMap<usize, usize>), GraphError> {
    let mut reached = FxHashMap::default();
    let mut frontier = Frontier::default();
    let mut cursor = TileCursor::new(context.reader);

    let Some(origin_tile) = cursor.get(origin.edge_id)? else {
        return Ok((frontier.labels, reached));
    };
    let Some(origin_edge) = origin_tile.edge(origin.edge_id) else {
        return Ok((frontier.labels, reached));
    };

    let percent = origin.percent_along;
    let root = frontier.labels.push(Label::origin(
        origin.edge_id,
        origin_edge.start_node,
        percent,
        origin_edge.end_heading,
    ));

    let blocked = predecessor.is_some_and(|label| {
        !context
            .costing
            .allowed(origin_edge, Some(label), &origin_tile, origin.edge_id)
    });

    if destinations.is_empty() || blocked {
        return Ok((frontier.labels, reached));
    }

    let mut targets: FxHashMap<GraphId, SmallVec<[usize; 4]>> = FxHashMap::default();
    for (index, destination) in destinations.iter().enumerate() {
        targets.entry(destination.edge_id).or_default().push(index);
    }

    let density = origin_tile
        .node(origin_edge.start_node)
        .map_or(0, |node| node.density);
    let origin_cost = context.costing.edge_cost(origin_edge, density);

    // Destinations ahead on the origin edge are reached without leaving it
    for &destination in targets.get(&origin.edge_id).into_iter().flatten() {
        let along = destinations[destination].percent_along;
        if along < percent {
            continue;
        }

        let cost = origin_cost.scale(along - percent);
        frontier.relax(
            Label {
                edge: origin.edge_id,
                from_node: origin_edge.start_node,
                node: GraphId::INVALID,
                destination: Some(destination),
                source: percent,
                target: along,
                cost,
                distance: origin_edge.length * (along - percent),
                turn_cost: 0.0,
                heading: origin_edge.end_heading,
                predecessor: Some(root),
            },
            cost.cost,
        );
    }

    let distance = origin_edge.length * (1.0 - percent);
    if distance <= context.max_route_distance {
        let cost = origin_cost.scale(1.0 - percent);
        let sortcost = cost.cost + context.heuristic(origin_edge.end_node)?;

        frontier.relax(
            Label {
                edge: origin.edge_id,
                from_node: origin_edge.start_node,
                node: origin_edge.end_node,
                destination: None,
                source: percent,
                target: 1.0,
                cost,
                distance,
                turn_cost: 0.0,
                heading: origin_edge.end_heading,
                predecessor: Some(root),
            },
            sortcost,
        );
    }

    while let Some(SmallestHolder { index, .. }) = frontier.queue.pop() {
        let Some(label) = frontier.settle(index) else {
            continue;
        };

        if let Some(destination) = label.destination {
            reached.insert(destination, index);
            if reached.len() == destinations.len() {
                break;
            }

            continue;
        }

        let Some(tile) = cursor.get(label.node)? else {
            continue;
        };
        let Some(node) = tile.node(label.node) else {
            continue;
        };

        if !context.costing.allowed_node(node) {
            continue;
        }

        for (edge_id, edge) in tile.outgoing(node) {
            if edge_id == origin.edge_id
                || !context.costing.allowed(edge, Some(&label), &tile, edge_id)
            {
                continue;
            }

            let turn_cost =
                label.turn_cost + context.turn_costs.between(label.heading, edge.begin_heading);
            let edge_cost = context.costing.edge_cost(edge, node.density);

            for &destination in targets.get(&edge_id).into_iter().flatten() {
                let along = destinations[destination].percent_along;
                let distance = label.distance + edge.length * along;
                if distance > context.max_route_distance {
                    continue;
                }

                let cost = label.cost + edge_cost.scale(along);
                frontier.relax(
                    Label {
                        edge: edge_id,
                        from_node: edge.start_node,
                        node: GraphId::INVALID,
                        destination: Some(destination),
                        source: 0.0,
                        target: along,
                        cost,
                        distance,
                        turn_cost,
                        heading: edge.end_heading,
                        predecessor: Some(index),
                    },
                    cost.cost,
                );
            }

            let distance = label.distance + edge.length;
            if distance > context.max_route_distance {
                continue;
            }

            let cost = label.cost + edge_cost;
            let sortcost = cost.cost + context.heuristic(edge.end_node)?;
            frontier.relax(
                Label {
                    edge: edge_id,
                    from_node: edge.start_node,
                    node: edge.end_node,
                    destination: None,
                    source: 0.0,
                    target: 1.0,
                    cost,
                    distance,
                    turn_cost,
                    heading: edge.end_heading,
                    predecessor: Some(index),
                },
                sortcost,
            );
        }
    }

    trace!(
        "Routed from {} reaching {}/{} destinations using {} labels",
        origin.edge_id,
        reached.len(),
        destinations.len(),
        frontier.labels.len()
    );

    Ok((frontier.labels, reached))
}
