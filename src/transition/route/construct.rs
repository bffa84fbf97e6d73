use crate::graph::{GraphError, GraphId, GraphReader};
use crate::transition::route::segment::same_fraction;
use crate::transition::{EdgeSegment, MapMatching, RouteError, State, StateId};

use geo::{Coord, LineString};
use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashSet;
use wkt::ToWkt;

/// Appends the segments to the route, extending the last segment
/// instead when a segment continues along the same edge from where it
/// ends.
pub fn merge_route(route: &mut Vec<EdgeSegment>, segments: impl IntoIterator<Item = EdgeSegment>) {
    for segment in segments {
        if let Some(last) = route.last_mut() {
            if last.edge_id == segment.edge_id && same_fraction(last.target, segment.source) {
                last.target = segment.target;
                continue;
            }
        }

        route.push(segment);
    }
}

/// A run of decoded states and the route travelled through them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteFragment {
    pub states: Vec<StateId>,
    pub route: Vec<EdgeSegment>,
}

/// Segments of the route found from `left` to `right`, in travel order.
fn pair_segments(
    matching: &MapMatching,
    left: &State,
    right: &State,
) -> Result<Vec<EdgeSegment>, RouteError> {
    matching.route(left, right)?;

    let Some(path) = left.route_path(right) else {
        return Err(RouteError::Disconnected {
            from: left.id(),
            to: right.id(),
        });
    };

    let mut segments = path
        .map(|label| EdgeSegment::new(label.edge, label.source, label.target))
        .collect::<Vec<_>>();
    segments.reverse();

    Ok(segments)
}

fn single_segment(state: &State) -> EdgeSegment {
    let candidate = state.candidate();
    EdgeSegment::new(candidate.edge_id, candidate.percent_along, candidate.percent_along)
}

/// Whether merging the segments onto the route would enter an edge of
/// `covered` anywhere but where the route currently ends.
fn reenters(
    route: &[EdgeSegment],
    covered: &FxHashSet<GraphId>,
    segments: &[EdgeSegment],
) -> bool {
    let mut end = route.last().map(|segment| (segment.edge_id, segment.target));

    for segment in segments {
        let continues = end.is_some_and(|(edge, target)| {
            edge == segment.edge_id && same_fraction(target, segment.source)
        });

        if !continues && covered.contains(&segment.edge_id) {
            return true;
        }

        end = Some((segment.edge_id, segment.target));
    }

    false
}

/// Builds the route travelled through the given states, in order, from
/// the routes found between each consecutive pair.
///
/// Fails when a pair of consecutive states is not connected.
pub fn construct_route(
    matching: &MapMatching,
    states: &[StateId],
) -> Result<Vec<EdgeSegment>, RouteError> {
    let states = states
        .iter()
        .filter_map(|id| matching.state(*id))
        .collect::<Vec<_>>();

    let mut route = vec![];

    if let [state] = states.as_slice() {
        route.push(single_segment(state));
        return Ok(route);
    }

    for (left, right) in states.iter().tuple_windows() {
        merge_route(&mut route, pair_segments(matching, left, right)?);
    }

    Ok(route)
}

/// Builds the routes travelled through the given connected states,
/// starting a new fragment wherever the route between two consecutive
/// states would enter an edge the current fragment already covers, as
/// happens when a trace doubles back or laps. The state closing a
/// fragment also opens the next one.
///
/// Fails when a pair of consecutive states is not connected.
pub fn construct_fragments(
    matching: &MapMatching,
    states: &[StateId],
) -> Result<Vec<RouteFragment>, RouteError> {
    let states = states
        .iter()
        .filter_map(|id| matching.state(*id))
        .collect::<Vec<_>>();

    let Some(first) = states.first() else {
        return Ok(vec![]);
    };

    let mut fragments = vec![];
    let mut current = RouteFragment {
        states: vec![first.id()],
        route: vec![single_segment(first)],
    };
    let mut covered = FxHashSet::from_iter([first.candidate().edge_id]);

    for (left, right) in states.iter().tuple_windows() {
        let segments = pair_segments(matching, left, right)?;

        if reenters(&current.route, &covered, &segments) {
            debug!(
                "Route from state {} to {} re-enters its fragment, starting another",
                left.id(),
                right.id()
            );

            let mut route = vec![];
            merge_route(&mut route, segments);
            covered = route.iter().map(|segment| segment.edge_id).collect();

            fragments.push(std::mem::replace(
                &mut current,
                RouteFragment {
                    states: vec![left.id(), right.id()],
                    route,
                },
            ));
            continue;
        }

        covered.extend(segments.iter().map(|segment| segment.edge_id));
        merge_route(&mut current.route, segments);
        current.states.push(right.id());
    }

    fragments.push(current);
    Ok(fragments)
}

/// Checks that the route is a single walk through the graph: every
/// edge exists, every range lies within its edge, every segment
/// continues from the one before it and no edge is used twice.
pub fn validate_route(reader: &GraphReader, route: &[EdgeSegment]) -> Result<(), RouteError> {
    let mut seen = FxHashSet::default();

    for (index, segment) in route.iter().enumerate() {
        if reader.edge_nodes(segment.edge_id)?.is_none() {
            return Err(RouteError::DanglingEdge(segment.edge_id));
        }

        let ordered = segment.source <= segment.target || same_fraction(segment.source, segment.target);
        if segment.source < 0.0 || segment.target > 1.0 || !ordered {
            return Err(RouteError::InvalidRange {
                index,
                edge: segment.edge_id,
                from: segment.source,
                to: segment.target,
            });
        }

        if !seen.insert(segment.edge_id) {
            return Err(RouteError::Loop(segment.edge_id));
        }

        if let Some(previous) = index.checked_sub(1).and_then(|i| route.get(i)) {
            if !previous.adjoined(reader, segment)? {
                return Err(RouteError::NotAdjoined { index });
            }
        }
    }

    Ok(())
}

/// Renders the route as `[start edge end]` groups, where the start and
/// end show the node when the segment reaches it, or the fraction along
/// the edge otherwise.
pub fn route_to_string(reader: &GraphReader, route: &[EdgeSegment]) -> Result<String, GraphError> {
    let mut rendered = Vec::with_capacity(route.len());

    for segment in route {
        let Some((start_node, end_node)) = reader.edge_nodes(segment.edge_id)? else {
            rendered.push(format!("[dummy {}]", segment.edge_id));
            continue;
        };

        let start = if segment.starts_at_node() {
            start_node.to_string()
        } else {
            format!("{:.3}", segment.source)
        };

        let end = if segment.ends_at_node() {
            end_node.to_string()
        } else {
            format!("{:.3}", segment.target)
        };

        rendered.push(format!("[{start} {} {end}]", segment.edge_id));
    }

    Ok(rendered.join(" "))
}

/// The geometry travelled along the route, as a single line.
pub fn route_shape(reader: &GraphReader, route: &[EdgeSegment]) -> Result<LineString, GraphError> {
    let mut coords: Vec<Coord> = vec![];

    for segment in route {
        for coord in segment.shape(reader)? {
            if coords.last() != Some(&coord) {
                coords.push(coord);
            }
        }
    }

    Ok(LineString::new(coords))
}

/// The route's geometry in well-known text.
pub fn route_to_wkt(reader: &GraphReader, route: &[EdgeSegment]) -> Result<String, GraphError> {
    Ok(route_shape(reader, route)?.wkt_string())
}
