use crate::candidate::{Candidate, CandidateQuery};
use crate::costing::{ModeCosting, TravelMode};
use crate::graph::{DirectedEdge, GraphError, GraphId, GraphReader, GraphTile};
use crate::transition::*;

use geo::{Distance, Haversine, Point};
use log::{debug, log_enabled, trace, warn};
use measure_time::debug_time;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::Level;

/// How a measurement was placed onto the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Decoded as part of the most likely path.
    Matched,

    /// Too close to its predecessor to be decoded, and projected onto
    /// the route afterwards.
    Interpolated,

    /// No candidate, or no route to place it on.
    Unmatched,
}

/// Position of a segment within [`MatchedTrace::routes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteIndex {
    pub fragment: usize,
    pub segment: usize,
}

/// The outcome for one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub kind: MatchKind,

    /// The measured position.
    pub position: Point,

    /// Position on the network the measurement was placed at.
    pub point: Option<Point>,
    pub edge_id: Option<GraphId>,
    pub percent_along: f64,

    /// Distance from `position` to `point`, in meters.
    pub distance_from: f64,

    /// Accumulated path cost at the measurement, for decoded measurements.
    pub cost: Option<f64>,

    pub state: Option<StateId>,

    /// The route segment the measurement lies on.
    pub route: Option<RouteIndex>,
}

impl MatchResult {
    pub fn unmatched(position: Point) -> Self {
        Self {
            kind: MatchKind::Unmatched,
            position,
            point: None,
            edge_id: None,
            percent_along: 0.0,
            distance_from: 0.0,
            cost: None,
            state: None,
            route: None,
        }
    }

    #[inline]
    pub fn is_matched(&self) -> bool {
        self.kind != MatchKind::Unmatched
    }
}

/// Results of a trace, alongside the routes travelled.
///
/// The path is split into fragments wherever it breaks or doubles back
/// onto an edge it already travelled, each fragment being a valid,
/// continuous route without repeated edges. The state where the path
/// doubles back ends one fragment and starts the next, and its result
/// refers to the later one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedTrace {
    pub results: Vec<MatchResult>,
    pub routes: Vec<Vec<EdgeSegment>>,
}

/// Matches whole traces for one travel mode.
///
/// Built by a [`MapMatcherFactory`], sharing its graph reader and
/// candidate index with every other matcher of the factory.
pub struct MapMatcher {
    options: MatcherOptions,
    reader: Arc<GraphReader>,
    query: Arc<dyn CandidateQuery>,
    mapmatching: MapMatching,
}

impl std::fmt::Debug for MapMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapMatcher")
            .field("options", &self.options)
            .field("mode", &self.mapmatching.travel_mode())
            .field("states", &self.mapmatching.size())
            .finish_non_exhaustive()
    }
}

impl MapMatcher {
    pub fn new(
        options: MatcherOptions,
        reader: Arc<GraphReader>,
        query: Arc<dyn CandidateQuery>,
        mode_costing: ModeCosting,
        mode: TravelMode,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let mapmatching = MapMatching::new(reader.clone(), mode_costing, mode, &options)?;

        Ok(Self {
            options,
            reader,
            query,
            mapmatching,
        })
    }

    #[inline]
    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    #[inline]
    pub fn reader(&self) -> &Arc<GraphReader> {
        &self.reader
    }

    #[inline]
    pub fn query(&self) -> &Arc<dyn CandidateQuery> {
        &self.query
    }

    #[inline]
    pub fn travel_mode(&self) -> TravelMode {
        self.mapmatching.travel_mode()
    }

    /// The model of the most recent trace.
    #[inline]
    pub fn mapmatching(&self) -> &MapMatching {
        &self.mapmatching
    }

    /// Matches the trace, returning one result per measurement.
    pub fn offline_match(
        &mut self,
        measurements: &[Measurement],
    ) -> Result<Vec<MatchResult>, MatchError> {
        Ok(self.offline_match_trace(measurements)?.results)
    }

    /// Matches the trace, returning one result per measurement and the
    /// route fragments travelled.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn offline_match_trace(
        &mut self,
        measurements: &[Measurement],
    ) -> Result<MatchedTrace, MatchError> {
        debug_time!("offline match of {} measurements", measurements.len());
        self.mapmatching.clear();

        if measurements.is_empty() {
            return Ok(MatchedTrace::default());
        }

        let measurements = measurements
            .iter()
            .map(|measurement| {
                let radius = self.options.effective_search_radius(
                    measurement.search_radius(),
                    measurement.gps_accuracy(),
                );

                measurement.with_search_radius(radius)
            })
            .collect::<Vec<_>>();

        let decoded = self.select_decoded(&measurements);
        let candidates = self.query_candidates(&measurements, &decoded)?;

        // Input index of every appended column
        let mut times = Vec::with_capacity(decoded.len());
        for (index, candidates) in decoded.iter().zip(candidates) {
            self.mapmatching.append_state(measurements[*index], candidates);
            times.push(*index);
        }

        let path = self.mapmatching.search_path(self.mapmatching.size() - 1)?;

        let mut fragments = vec![];
        let mut routes = vec![];
        for connected in self.split_connected(&path) {
            for fragment in construct_fragments(&self.mapmatching, &connected)? {
                validate_route(&self.reader, &fragment.route)?;

                if log_enabled!(log::Level::Trace) {
                    trace!(
                        "Matched fragment {}",
                        route_to_wkt(&self.reader, &fragment.route)?
                    );
                }

                fragments.push(fragment.states);
                routes.push(fragment.route);
            }
        }

        let mut results = measurements
            .iter()
            .map(|measurement| MatchResult::unmatched(measurement.position()))
            .collect::<Vec<_>>();

        for (fragment, states) in fragments.iter().enumerate() {
            let route = &routes[fragment];
            let mut segment = 0;

            for state in states {
                let Some(state) = self.mapmatching.state(*state) else {
                    continue;
                };

                let candidate = state.candidate();
                segment = locate_segment(route, segment, candidate).unwrap_or(segment);

                results[times[state.time()]] = MatchResult {
                    kind: MatchKind::Matched,
                    position: measurements[times[state.time()]].position(),
                    point: Some(candidate.point),
                    edge_id: Some(candidate.edge_id),
                    percent_along: candidate.percent_along,
                    distance_from: candidate.distance,
                    cost: self.mapmatching.costsofar(state.id()),
                    state: Some(state.id()),
                    route: Some(RouteIndex { fragment, segment }),
                };
            }
        }

        let mut is_decoded = vec![false; measurements.len()];
        for index in &decoded {
            is_decoded[*index] = true;
        }

        self.interpolate(&measurements, &is_decoded, &routes, &mut results)?;

        let matched = results.iter().filter(|result| result.is_matched()).count();
        debug!(
            "Matched {matched}/{} measurements over {} route fragments",
            results.len(),
            routes.len()
        );

        Ok(MatchedTrace { results, routes })
    }

    /// Input indices of the measurements to decode: the first and last,
    /// and every other one far enough from the previously decoded one.
    fn select_decoded(&self, measurements: &[Measurement]) -> Vec<usize> {
        let mut decoded: Vec<usize> = vec![];
        let last = measurements.len() - 1;

        for (index, measurement) in measurements.iter().enumerate() {
            let far = decoded.last().is_none_or(|previous| {
                measurements[*previous].distance(measurement) > self.options.interpolation_distance
            });

            if far || index == last {
                decoded.push(index);
            }
        }

        decoded
    }

    fn query_candidates(
        &self,
        measurements: &[Measurement],
        decoded: &[usize],
    ) -> Result<Vec<Vec<Candidate>>, GraphError> {
        debug_time!("candidate search for {} measurements", decoded.len());

        let query = self.query.as_ref();
        let costing = self.mapmatching.costing();
        let max_candidates = self.options.max_candidates;
        let filter = |edge: &DirectedEdge, tile: &GraphTile| costing.filter_candidate(edge, tile);

        decoded
            .par_iter()
            .map(|index| {
                let measurement = &measurements[*index];
                query.query(
                    measurement.position(),
                    measurement.search_radius(),
                    max_candidates,
                    &filter,
                )
            })
            .collect()
    }

    /// Splits the decoded path into runs of states linked by their
    /// predecessors.
    fn split_connected(&self, path: &[Option<StateId>]) -> Vec<Vec<StateId>> {
        let mut runs: Vec<Vec<StateId>> = vec![];

        for state in path.iter().flatten() {
            let continues = runs
                .last()
                .and_then(|run| run.last())
                .is_some_and(|last| self.mapmatching.predecessor(*state) == Some(*last));

            match runs.last_mut() {
                Some(run) if continues => run.push(*state),
                _ => runs.push(vec![*state]),
            }
        }

        runs
    }

    /// Projects every measurement which was not decoded onto the route
    /// between the decoded measurements around it.
    fn interpolate(
        &self,
        measurements: &[Measurement],
        decoded: &[bool],
        routes: &[Vec<EdgeSegment>],
        results: &mut [MatchResult],
    ) -> Result<(), GraphError> {
        let mut previous: Option<RouteIndex> = None;

        for index in 0..results.len() {
            if decoded[index] {
                // Nothing follows on from an unmatched measurement
                previous = results[index].route;
                continue;
            }

            let Some(from) = previous else {
                continue;
            };

            // Up to the next placed measurement of the same fragment
            let until = results[index + 1..]
                .iter()
                .filter_map(|result| result.route)
                .find(|route| route.fragment == from.fragment)
                .map_or(routes[from.fragment].len() - 1, |route| route.segment);

            let position = measurements[index].position();
            let Some((segment, candidate)) =
                self.project_onto(&routes[from.fragment], from.segment, until, position)?
            else {
                continue;
            };

            results[index] = MatchResult {
                kind: MatchKind::Interpolated,
                position,
                point: Some(candidate.point),
                edge_id: Some(candidate.edge_id),
                percent_along: candidate.percent_along,
                distance_from: candidate.distance,
                cost: None,
                state: None,
                route: Some(RouteIndex {
                    fragment: from.fragment,
                    segment,
                }),
            };

            previous = results[index].route;
        }

        Ok(())
    }

    /// Closest position to `position` along the segments `from..=until`.
    fn project_onto(
        &self,
        route: &[EdgeSegment],
        from: usize,
        until: usize,
        position: Point,
    ) -> Result<Option<(usize, Candidate)>, GraphError> {
        let mut best: Option<(usize, Candidate)> = None;

        for (index, segment) in route.iter().enumerate().take(until + 1).skip(from) {
            let Some(tile) = self.reader.tile_of(segment.edge_id)? else {
                warn!("Route segment on missing edge {}", segment.edge_id);
                continue;
            };

            let Some(edge) = tile.edge(segment.edge_id) else {
                continue;
            };

            let Some((fraction, _, _)) = edge.project(&position) else {
                continue;
            };

            let fraction = fraction.clamp(segment.source, segment.target.max(segment.source));
            let Some(point) = edge.point_at(fraction) else {
                continue;
            };

            let candidate = Candidate::new(
                segment.edge_id,
                fraction,
                point,
                Haversine.distance(position, point),
            );

            if best.is_none_or(|(_, best)| candidate.distance < best.distance) {
                best = Some((index, candidate));
            }
        }

        Ok(best)
    }
}

/// Index of the first segment, at or after `from`, containing the
/// candidate's position.
fn locate_segment(route: &[EdgeSegment], from: usize, candidate: &Candidate) -> Option<usize> {
    const TOLERANCE: f64 = 1e-9;

    route
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, segment)| {
            segment.edge_id == candidate.edge_id
                && segment.source <= candidate.percent_along + TOLERANCE
                && candidate.percent_along <= segment.target + TOLERANCE
        })
        .map(|(index, _)| index)
}
