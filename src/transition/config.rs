use crate::candidate::DEFAULT_GRID_CACHE_SIZE;
use crate::costing::CostingOptions;
use crate::graph::DEFAULT_TILE_CACHE_SIZE;
use crate::transition::ConfigError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Parameters of a single matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherOptions {
    /// Standard deviation of the measurement noise, in meters.
    pub sigma_z: f64,

    /// Scale of the tolerated difference between route and
    /// great-circle distances, in meters.
    pub beta: f64,

    /// Consecutive measurements further apart than this, in meters, are
    /// never connected.
    pub breakage_distance: f64,

    /// Multiple of the great-circle distance a route may extend to.
    pub max_route_distance_factor: f64,

    /// Penalty of a full reversal. Zero disables turn penalties.
    pub turn_penalty_factor: f64,

    /// Default candidate search radius, in meters.
    pub search_radius: f64,

    /// Upper bound of any candidate search radius, in meters.
    pub max_search_radius: f64,

    /// Most candidates kept per measurement.
    pub max_candidates: usize,

    /// Measurements closer than this, in meters, to the previous
    /// decoded measurement are placed onto the route afterwards instead
    /// of being decoded.
    pub interpolation_distance: f64,

    pub costing: CostingOptions,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            sigma_z: 4.07,
            beta: 3.0,
            breakage_distance: 2000.0,
            max_route_distance_factor: 5.0,
            turn_penalty_factor: 0.0,
            search_radius: 50.0,
            max_search_radius: 100.0,
            max_candidates: 16,
            interpolation_distance: 10.0,
            costing: CostingOptions::default(),
        }
    }
}

fn positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }

    Err(ConfigError::InvalidValue {
        key,
        reason: format!("must be a positive number, got {value}"),
    })
}

fn non_negative(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }

    Err(ConfigError::InvalidValue {
        key,
        reason: format!("must not be negative, got {value}"),
    })
}

impl MatcherOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sigma_z", self.sigma_z)?;
        positive("beta", self.beta)?;
        positive("breakage_distance", self.breakage_distance)?;
        positive("max_route_distance_factor", self.max_route_distance_factor)?;
        non_negative("turn_penalty_factor", self.turn_penalty_factor)?;
        non_negative("search_radius", self.search_radius)?;
        non_negative("max_search_radius", self.max_search_radius)?;
        non_negative("interpolation_distance", self.interpolation_distance)?;

        if self.max_candidates == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_candidates",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Candidate search radius of a measurement: its own radius (or the
    /// default when it has none), widened to its accuracy and capped at
    /// the maximum.
    pub fn effective_search_radius(&self, search_radius: f64, gps_accuracy: f64) -> f64 {
        let radius = if search_radius > 0.0 {
            search_radius
        } else {
            self.search_radius
        };

        radius.max(gps_accuracy).min(self.max_search_radius)
    }
}

/// Candidate grid settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridOptions {
    /// In bytes.
    pub cache_size: usize,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_GRID_CACHE_SIZE,
        }
    }
}

/// Configuration of a [`MapMatcherFactory`](crate::transition::MapMatcherFactory).
///
/// The options of a matcher are its mode's section of `modes` laid over
/// `default`, with request overrides laid over both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactoryConfig {
    pub default: MatcherOptions,

    /// Partial [`MatcherOptions`] per travel mode name.
    pub modes: BTreeMap<String, Value>,

    pub grid: GridOptions,

    /// Tile cache budget, in bytes.
    pub tile_cache_size: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        let modes = [
            ("auto", json!({ "turn_penalty_factor": 200.0 })),
            ("bicycle", json!({ "turn_penalty_factor": 140.0 })),
            ("pedestrian", json!({ "turn_penalty_factor": 100.0, "max_search_radius": 50.0 })),
            ("multimodal", json!({ "turn_penalty_factor": 70.0 })),
        ];

        Self {
            default: MatcherOptions::default(),
            modes: modes
                .into_iter()
                .map(|(mode, options)| (mode.to_string(), options))
                .collect(),
            grid: GridOptions::default(),
            tile_cache_size: DEFAULT_TILE_CACHE_SIZE,
        }
    }
}

impl FromStr for FactoryConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl FactoryConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        std::fs::read_to_string(path)?.parse()
    }

    /// Options of the named mode, with `overrides` (a JSON object, or
    /// null for none) applied on top.
    pub fn merge(&self, mode: &str, overrides: &Value) -> Result<MatcherOptions, ConfigError> {
        let mut merged = serde_json::to_value(&self.default)?;

        if let Some(section) = self.modes.get(mode) {
            if !section.is_object() {
                return Err(ConfigError::NotAnObject(format!("modes.{mode}")));
            }

            merge_values(&mut merged, section);
        }

        match overrides {
            Value::Null => {}
            Value::Object(_) => merge_values(&mut merged, overrides),
            _ => return Err(ConfigError::NotAnObject("overrides".to_string())),
        }

        let options: MatcherOptions = serde_json::from_value(merged)?;
        options.validate()?;

        Ok(options)
    }
}

/// Lays `patch` over `base`, merging nested objects key by key.
fn merge_values(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => merge_objects(base, patch),
        (base, patch) => *base = patch.clone(),
    }
}

fn merge_objects(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match base.get_mut(key) {
            Some(existing) => merge_values(existing, value),
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
