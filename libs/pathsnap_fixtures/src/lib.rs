//! Road-network descriptions shared by the tests and benchmarks.
//!
//! Each fixture is a JSON graph description with `nodes` given as
//! `[longitude, latitude]` pairs and `edges` referencing them by index.

/// Three consecutive ~157m hops running east along latitude 45.
pub const STRAIGHT_ROAD: &str = "straight_road.json";

/// Two short roads on the same latitude with no connection between them.
pub const ISLANDS: &str = "islands.json";

/// A 6x6 block grid spread over four tiles, carrying a single transit line
/// diagonally across it.
pub const GRID_CITY: &str = "grid_city.json";

pub fn fixture_path(file: &str) -> String {
    format!("{}/resources/{}", env!("CARGO_MANIFEST_DIR"), file)
}
