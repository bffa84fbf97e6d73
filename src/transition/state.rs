use crate::candidate::Candidate;
use crate::graph::GraphError;
use crate::transition::{Label, LabelSet, RoutePath, RoutingContext, find_shortest_path};

use rustc_hash::FxHashMap;
use std::cell::OnceCell;

/// Index of a state within its [`MapMatching`](crate::transition::MapMatching).
pub type StateId = usize;

/// Index of a measurement within a trace.
pub type Time = usize;

#[derive(Debug)]
struct RouteLabels {
    labels: LabelSet,

    /// Label settled on each reached state.
    reached: FxHashMap<StateId, usize>,
}

/// A hidden state: one candidate of the measurement at `time`.
///
/// Routes from the state to the states of the next column are searched
/// for once, the first time they are needed, and kept with the state.
#[derive(Debug)]
pub struct State {
    id: StateId,
    time: Time,
    candidate: Candidate,
    routes: OnceCell<RouteLabels>,
}

impl State {
    pub fn new(id: StateId, time: Time, candidate: Candidate) -> Self {
        Self {
            id,
            time,
            candidate,
            routes: OnceCell::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> StateId {
        self.id
    }

    #[inline]
    pub fn time(&self) -> Time {
        self.time
    }

    #[inline]
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Whether routes from this state have been searched for.
    #[inline]
    pub fn routed(&self) -> bool {
        self.routes.get().is_some()
    }

    /// Searches routes from this state to the target states. Once done,
    /// later calls return immediately, whatever their targets.
    pub fn route(
        &self,
        targets: &[&State],
        context: &RoutingContext<'_>,
        predecessor: Option<&Label>,
    ) -> Result<(), GraphError> {
        if self.routed() {
            return Ok(());
        }

        let destinations = targets
            .iter()
            .map(|target| target.candidate)
            .collect::<Vec<_>>();

        let (labels, reached) =
            find_shortest_path(context, &self.candidate, &destinations, predecessor)?;

        let mut reached = reached
            .into_iter()
            .map(|(destination, label)| (targets[destination].id, label))
            .collect::<FxHashMap<_, _>>();

        // A state trivially reaches itself
        if targets.iter().any(|target| target.id == self.id) && !labels.is_empty() {
            reached.insert(self.id, 0);
        }

        let _ = self.routes.set(RouteLabels { labels, reached });
        Ok(())
    }

    /// The last label of the route to the state, if it was reached.
    pub fn last_label(&self, state: &State) -> Option<&Label> {
        let routes = self.routes.get()?;
        let index = routes.reached.get(&state.id)?;
        routes.labels.get(*index)
    }

    /// Labels of the route to the state, from its end back to this
    /// state, if it was reached.
    pub fn route_path(&self, state: &State) -> Option<RoutePath<'_>> {
        let routes = self.routes.get()?;
        let index = routes.reached.get(&state.id)?;
        Some(routes.labels.path(*index))
    }
}
