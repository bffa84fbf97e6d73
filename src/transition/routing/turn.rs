use crate::geometry::turn_degree;

/// Penalty for every interior turn angle, from 0 (reversal) to 180
/// (straight on), in whole degrees.
///
/// The penalty decays exponentially as the turn straightens, starting
/// from the penalty factor for a full reversal.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCostTable([f64; 181]);

impl TurnCostTable {
    pub fn new(penalty_factor: f64) -> Self {
        let mut table = [0.0; 181];

        if penalty_factor > 0.0 {
            for (degree, cost) in table.iter_mut().enumerate() {
                *cost = penalty_factor * (-(degree as f64) / 45.0).exp();
            }
        }

        Self(table)
    }

    #[inline]
    pub fn cost(&self, degree: usize) -> f64 {
        self.0[degree.min(180)]
    }

    /// Penalty of the turn from arriving along `inbound` to leaving along
    /// `outbound`, both in degrees clockwise from north.
    #[inline]
    pub fn between(&self, inbound: f64, outbound: f64) -> f64 {
        self.cost(turn_degree(inbound, outbound))
    }
}

impl Default for TurnCostTable {
    fn default() -> Self {
        Self([0.0; 181])
    }
}
