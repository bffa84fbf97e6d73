use crate::costing::MODE_COSTING_COUNT;
use crate::graph::Access;

use strum::{EnumCount, EnumIter, EnumString, IntoStaticStr};

/// The ways of travelling a trace can be matched for.
///
/// Parsed from, and displayed as, the names used in configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumCount, EnumIter,
)]
#[repr(u8)]
pub enum TravelMode {
    #[strum(serialize = "auto")]
    Drive = 0,
    #[strum(serialize = "pedestrian")]
    Pedestrian = 1,
    #[strum(serialize = "bicycle")]
    Bicycle = 2,
    #[strum(serialize = "multimodal")]
    Universal = 3,
}

const _: () = assert!(<TravelMode as EnumCount>::COUNT <= MODE_COSTING_COUNT);

impl TravelMode {
    /// Slot of the mode in a [`ModeCosting`](crate::costing::ModeCosting) table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Access an edge must grant for the mode to use it.
    pub fn access(self) -> Access {
        match self {
            TravelMode::Drive => Access::AUTO,
            TravelMode::Pedestrian => Access::PEDESTRIAN,
            TravelMode::Bicycle => Access::BICYCLE,
            TravelMode::Universal => Access::empty(),
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
