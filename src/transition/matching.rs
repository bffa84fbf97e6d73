use crate::candidate::Candidate;
use crate::costing::{Costing, CostingRef, ModeCosting, TravelMode};
use crate::geometry::DistanceApproximator;
use crate::graph::{GraphError, GraphReader};
use crate::transition::*;

use log::trace;
use std::cell::RefCell;
use std::sync::Arc;

/// The hidden Markov model of one trace.
///
/// Holds the measurements and their candidate states, column by column,
/// and scores them with a [`ViterbiSearch`] as they are queried. States
/// are owned here and referred to by [`StateId`], which count up from
/// zero in the order states are appended.
#[derive(Debug)]
pub struct MapMatching {
    reader: Arc<GraphReader>,
    mode_costing: ModeCosting,
    mode: TravelMode,
    costing: CostingRef,

    measurements: Vec<Measurement>,
    states: Vec<State>,
    columns: Vec<Vec<StateId>>,

    sigma_z: f64,
    inv_double_sq_sigma_z: f64,
    beta: f64,
    inv_beta: f64,
    breakage_distance: f64,
    max_route_distance_factor: f64,
    turn_costs: TurnCostTable,

    search: RefCell<ViterbiSearch>,
}

impl MapMatching {
    /// Fails when the table holds no costing for the mode.
    pub fn new(
        reader: Arc<GraphReader>,
        mode_costing: ModeCosting,
        mode: TravelMode,
        options: &MatcherOptions,
    ) -> Result<Self, ConfigError> {
        let costing = mode_costing
            .get(mode.index())
            .cloned()
            .flatten()
            .ok_or(ConfigError::UnregisteredMode(mode))?;

        Ok(Self {
            reader,
            mode_costing,
            mode,
            costing,
            measurements: vec![],
            states: vec![],
            columns: vec![],
            sigma_z: options.sigma_z,
            inv_double_sq_sigma_z: 1.0 / (2.0 * options.sigma_z * options.sigma_z),
            beta: options.beta,
            inv_beta: 1.0 / options.beta,
            breakage_distance: options.breakage_distance,
            max_route_distance_factor: options.max_route_distance_factor,
            turn_costs: TurnCostTable::new(options.turn_penalty_factor),
            search: RefCell::new(ViterbiSearch::new()),
        })
    }

    /// Drops every measurement and state. Later states are numbered
    /// from zero again.
    pub fn clear(&mut self) {
        self.measurements.clear();
        self.states.clear();
        self.columns.clear();
        self.search.get_mut().clear();
    }

    #[inline]
    pub fn reader(&self) -> &GraphReader {
        &self.reader
    }

    #[inline]
    pub fn travel_mode(&self) -> TravelMode {
        self.mode
    }

    #[inline]
    pub fn costing(&self) -> &dyn Costing {
        self.costing.as_ref()
    }

    #[inline]
    pub fn mode_costing(&self) -> &ModeCosting {
        &self.mode_costing
    }

    #[inline]
    pub fn sigma_z(&self) -> f64 {
        self.sigma_z
    }

    #[inline]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Number of appended measurements.
    #[inline]
    pub fn size(&self) -> usize {
        self.measurements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn measurement(&self, time: Time) -> Option<&Measurement> {
        self.measurements.get(time)
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id)
    }

    /// States of the column at `time`, empty beyond the trace.
    pub fn states(&self, time: Time) -> &[StateId] {
        self.columns.get(time).map(Vec::as_slice).unwrap_or_default()
    }

    /// Appends the measurement as a new column, with one state per
    /// candidate, returning its time.
    pub fn append_state(
        &mut self,
        measurement: Measurement,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Time {
        let time = self.measurements.len();
        let mut column = vec![];

        for candidate in candidates {
            let id = self.states.len();
            self.states.push(State::new(id, time, candidate));
            column.push(id);
        }

        trace!("Appended {} states at time {time}", column.len());

        self.measurements.push(measurement);
        self.columns.push(column);
        time
    }

    /// Cost of observing the measurement from the state's candidate.
    #[inline]
    pub fn emission_cost_of(&self, state: &State) -> f64 {
        state.candidate().sq_distance() * self.inv_double_sq_sigma_z
    }

    /// Great-circle distance between the measurements of two states.
    pub fn great_circle_distance(&self, left: &State, right: &State) -> f64 {
        match (
            self.measurements.get(left.time()),
            self.measurements.get(right.time()),
        ) {
            (Some(a), Some(b)) => a.distance(b),
            _ => f64::INFINITY,
        }
    }

    /// Longest route considered between two states, in meters.
    ///
    /// The great-circle distance scaled by the configured factor, but at
    /// least enough to cover it plus both search radii, and never beyond
    /// the breakage distance.
    pub fn max_route_distance(&self, left: &State, right: &State) -> f64 {
        let distance = self.great_circle_distance(left, right);
        let radii = [left.time(), right.time()]
            .iter()
            .filter_map(|time| self.measurements.get(*time))
            .map(Measurement::search_radius)
            .sum::<f64>();

        (distance * self.max_route_distance_factor)
            .max(distance + radii)
            .min(self.breakage_distance)
    }

    /// Searches the routes out of `left` towards the column of `right`,
    /// unless already done.
    pub fn route(&self, left: &State, right: &State) -> Result<(), GraphError> {
        self.route_after(left, right, None)
    }

    /// Searches the routes out of `left` towards the column of `right`,
    /// unless already done, continuing the route by which `predecessor`
    /// reached `left`.
    pub fn route_after(
        &self,
        left: &State,
        right: &State,
        predecessor: Option<&State>,
    ) -> Result<(), GraphError> {
        if left.routed() {
            return Ok(());
        }

        let Some(measurement) = self.measurements.get(right.time()) else {
            return Ok(());
        };

        let targets = self
            .states(right.time())
            .iter()
            .filter_map(|id| self.states.get(*id))
            .collect::<Vec<_>>();

        let context = RoutingContext {
            reader: &self.reader,
            costing: self.costing.as_ref(),
            turn_costs: &self.turn_costs,
            approximator: DistanceApproximator::new(measurement.position()),
            search_radius: measurement.search_radius(),
            max_route_distance: self.max_route_distance(left, right),
        };

        let arrival = predecessor.and_then(|state| state.last_label(left)).copied();
        left.route(&targets, &context, arrival.as_ref())
    }

    /// Cost of moving from one state to the other: the difference
    /// between route and great-circle distances plus any turn penalty,
    /// over beta. Infinite when the measurements are beyond the breakage
    /// distance or no route connects the states.
    pub fn transition_cost_of(&self, left: &State, right: &State) -> Result<f64, GraphError> {
        self.transition_cost_after(left, right, None)
    }

    /// As [`transition_cost_of`](Self::transition_cost_of), routing on
    /// from the way `predecessor` reached `left`.
    pub fn transition_cost_after(
        &self,
        left: &State,
        right: &State,
        predecessor: Option<&State>,
    ) -> Result<f64, GraphError> {
        let distance = self.great_circle_distance(left, right);
        if distance > self.breakage_distance {
            return Ok(f64::INFINITY);
        }

        self.route_after(left, right, predecessor)?;

        Ok(match left.last_label(right) {
            Some(label) => (label.turn_cost + (label.distance - distance).abs()) * self.inv_beta,
            None => f64::INFINITY,
        })
    }

    /// The cheapest state at `time`, if the column has any.
    pub fn search_winner(&self, time: Time) -> Result<Option<StateId>, GraphError> {
        self.search.borrow_mut().search_winner(self, time)
    }

    /// The most likely state of every column up to `time`.
    pub fn search_path(&self, time: Time) -> Result<Vec<Option<StateId>>, GraphError> {
        self.search.borrow_mut().search_path(self, time)
    }

    /// The state preceding `state` on its most likely path, once scored.
    pub fn predecessor(&self, state: StateId) -> Option<StateId> {
        self.search.borrow().predecessor(state)
    }

    /// Accumulated cost of the most likely path into `state`, once scored.
    pub fn costsofar(&self, state: StateId) -> Option<f64> {
        self.search.borrow().costsofar(state)
    }
}

impl Trellis for MapMatching {
    type Error = GraphError;

    fn time_len(&self) -> usize {
        self.columns.len()
    }

    fn states(&self, time: Time) -> &[StateId] {
        MapMatching::states(self, time)
    }

    fn emission_cost(&self, state: StateId) -> f64 {
        self.states
            .get(state)
            .map_or(f64::INFINITY, |state| self.emission_cost_of(state))
    }

    fn transition_cost(
        &self,
        left: StateId,
        predecessor: Option<StateId>,
        right: StateId,
    ) -> Result<f64, GraphError> {
        let predecessor = predecessor.and_then(|id| self.states.get(id));

        match (self.states.get(left), self.states.get(right)) {
            (Some(left), Some(right)) => self.transition_cost_after(left, right, predecessor),
            _ => Ok(f64::INFINITY),
        }
    }

    fn cost_sofar(&self, prev_costsofar: f64, transition_cost: f64, emission_cost: f64) -> f64 {
        prev_costsofar + transition_cost + emission_cost
    }
}
