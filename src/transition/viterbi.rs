use crate::transition::{StateId, Time};

use log::debug;
use rustc_hash::FxHashMap;

/// A layered graph of hidden states, one layer (column) per time.
pub trait Trellis {
    type Error;

    /// Number of columns.
    fn time_len(&self) -> usize;

    fn states(&self, time: Time) -> &[StateId];

    fn emission_cost(&self, state: StateId) -> f64;

    /// Cost of moving from `left` to `right`, where `predecessor` is the
    /// state before `left` on its best path. Infinite when `right`
    /// cannot follow `left`.
    fn transition_cost(
        &self,
        left: StateId,
        predecessor: Option<StateId>,
        right: StateId,
    ) -> Result<f64, Self::Error>;

    /// Accumulates the cost of the best path into a state.
    fn cost_sofar(&self, prev_costsofar: f64, transition_cost: f64, emission_cost: f64) -> f64;
}

/// The best known path into a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub state: StateId,
    pub time: Time,
    pub costsofar: f64,

    /// `None` at the start of the trace, and wherever the path restarts
    /// because nothing before could reach this column.
    pub predecessor: Option<StateId>,
}

/// Lazy, incremental Viterbi decoding over a [`Trellis`].
///
/// Columns are scored in order, each exactly once, on the first query
/// which needs them. Columns without states are stepped over, the next
/// column continuing from the last column which had any. When no state
/// of a column can be reached from the previous one the path breaks and
/// restarts from emission costs alone.
#[derive(Debug, Default)]
pub struct ViterbiSearch {
    scores: FxHashMap<StateId, Scored>,

    /// Cheapest state of every scored column.
    winners: Vec<Option<StateId>>,
}

impl ViterbiSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every scored column.
    pub fn clear(&mut self) {
        self.scores.clear();
        self.winners.clear();
    }

    /// Number of columns scored so far.
    #[inline]
    pub fn scored_len(&self) -> usize {
        self.winners.len()
    }

    fn last_scored(&self) -> Option<Time> {
        self.winners.iter().rposition(Option::is_some)
    }

    fn advance<T: Trellis>(&mut self, trellis: &T, until: Time) -> Result<(), T::Error> {
        while self.winners.len() <= until && self.winners.len() < trellis.time_len() {
            let time = self.winners.len();
            let previous = self.last_scored();

            let mut column = trellis
                .states(time)
                .iter()
                .map(|&state| Scored {
                    state,
                    time,
                    costsofar: f64::INFINITY,
                    predecessor: None,
                })
                .collect::<Vec<_>>();

            let emissions = column
                .iter()
                .map(|scored| trellis.emission_cost(scored.state))
                .collect::<Vec<_>>();

            if let Some(previous) = previous {
                for &left in trellis.states(previous) {
                    let Some(&Scored {
                        costsofar,
                        predecessor,
                        ..
                    }) = self
                        .scores
                        .get(&left)
                        .filter(|scored| scored.costsofar.is_finite())
                    else {
                        continue;
                    };

                    for (right, emission) in column.iter_mut().zip(&emissions) {
                        let transition = trellis.transition_cost(left, predecessor, right.state)?;
                        if !transition.is_finite() {
                            continue;
                        }

                        let cost = trellis.cost_sofar(costsofar, transition, *emission);
                        if cost < right.costsofar {
                            right.costsofar = cost;
                            right.predecessor = Some(left);
                        }
                    }
                }
            }

            if column.iter().all(|scored| !scored.costsofar.is_finite()) {
                if previous.is_some() && !column.is_empty() {
                    debug!("Path breaks at time {time}, restarting");
                }

                for (scored, emission) in column.iter_mut().zip(&emissions) {
                    scored.costsofar = trellis.cost_sofar(0.0, 0.0, *emission);
                    scored.predecessor = None;
                }
            }

            let winner = column
                .iter()
                .filter(|scored| scored.costsofar.is_finite())
                .min_by(|a, b| a.costsofar.total_cmp(&b.costsofar))
                .map(|scored| scored.state);

            self.scores
                .extend(column.into_iter().map(|scored| (scored.state, scored)));
            self.winners.push(winner);
        }

        Ok(())
    }

    /// The cheapest state at `time`, or `None` if the column is empty
    /// (or beyond the trellis).
    pub fn search_winner<T: Trellis>(
        &mut self,
        trellis: &T,
        time: Time,
    ) -> Result<Option<StateId>, T::Error> {
        self.advance(trellis, time)?;
        Ok(self.winners.get(time).copied().flatten())
    }

    /// The most likely state of every column from 0 up to `time`,
    /// backtracked from the winner at `time`. Empty columns hold `None`.
    pub fn search_path<T: Trellis>(
        &mut self,
        trellis: &T,
        time: Time,
    ) -> Result<Vec<Option<StateId>>, T::Error> {
        self.advance(trellis, time)?;

        let len = self.winners.len().min(time.saturating_add(1));
        let mut path = vec![None; len];
        let mut pending: Option<Scored> = None;

        for time in (0..len).rev() {
            let current = match pending {
                Some(scored) if scored.time == time => Some(scored),
                // An empty column stepped over by the path
                Some(_) => None,
                None => self.winners[time].and_then(|state| self.scores.get(&state).copied()),
            };

            if let Some(scored) = current {
                path[time] = Some(scored.state);
                pending = scored
                    .predecessor
                    .and_then(|state| self.scores.get(&state).copied());
            }
        }

        Ok(path)
    }

    /// The state preceding `state` on its best path.
    pub fn predecessor(&self, state: StateId) -> Option<StateId> {
        self.scores.get(&state)?.predecessor
    }

    /// Accumulated cost of the best path into `state`, once scored.
    pub fn costsofar(&self, state: StateId) -> Option<f64> {
        self.scores.get(&state).map(|scored| scored.costsofar)
    }
}
