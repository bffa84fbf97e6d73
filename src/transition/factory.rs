use crate::candidate::CandidateGridQuery;
use crate::costing::{
    CostingFactory, CostingOptions, CostingRef, MODE_COSTING_COUNT, ModeCosting, TravelMode,
    create_auto_cost, create_bicycle_cost, create_pedestrian_cost, create_universal_cost,
};
use crate::graph::{GraphReader, TileGrid, TileSource};
use crate::transition::{ConfigError, FactoryConfig, MapMatcher, MatcherOptions};

use log::debug;
use serde_json::Value;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct CachedCosting {
    options: CostingOptions,
    costing: CostingRef,
}

type CostingCache = [Option<CachedCosting>; MODE_COSTING_COUNT];

/// Builds [`MapMatcher`]s, sharing one graph reader, one candidate index
/// and one costing per travel mode between all of them.
///
/// The factory is safe to share between threads. Each matcher it
/// creates is independent, so traces may be matched concurrently by
/// creating one matcher per trace.
///
/// Costings are built from their registered constructor the first time
/// their mode is requested, and rebuilt only when a request asks for
/// different costing options than the cached costing was built with.
#[derive(Debug)]
pub struct MapMatcherFactory {
    config: FactoryConfig,
    reader: Arc<GraphReader>,
    query: Arc<CandidateGridQuery>,

    constructors: [Option<CostingFactory>; MODE_COSTING_COUNT],
    costings: RwLock<CostingCache>,
}

impl MapMatcherFactory {
    /// A factory over the reader, with the built-in costing of every
    /// travel mode registered.
    pub fn new(config: FactoryConfig, reader: Arc<GraphReader>) -> Self {
        let query = Arc::new(CandidateGridQuery::new(
            reader.clone(),
            config.grid.cache_size,
        ));

        let mut factory = Self {
            config,
            reader,
            query,
            constructors: [None; MODE_COSTING_COUNT],
            costings: RwLock::new(Default::default()),
        };

        factory.register_costing(TravelMode::Drive, create_auto_cost);
        factory.register_costing(TravelMode::Pedestrian, create_pedestrian_cost);
        factory.register_costing(TravelMode::Bicycle, create_bicycle_cost);
        factory.register_costing(TravelMode::Universal, create_universal_cost);

        factory
    }

    /// A factory reading tiles from the source, within the configured
    /// tile cache budget.
    pub fn with_source(
        config: FactoryConfig,
        grid: TileGrid,
        source: impl TileSource + 'static,
    ) -> Self {
        let reader = Arc::new(GraphReader::new(grid, source, config.tile_cache_size));
        Self::new(config, reader)
    }

    #[inline]
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    #[inline]
    pub fn reader(&self) -> &Arc<GraphReader> {
        &self.reader
    }

    #[inline]
    pub fn query(&self) -> &Arc<CandidateGridQuery> {
        &self.query
    }

    /// The travel mode of the name, which must have a registered costing.
    pub fn name_to_travel_mode(&self, name: &str) -> Result<TravelMode, ConfigError> {
        let mode =
            TravelMode::from_str(name).map_err(|_| ConfigError::UnknownMode(name.to_string()))?;

        if self.constructors[mode.index()].is_none() {
            return Err(ConfigError::UnregisteredMode(mode));
        }

        Ok(mode)
    }

    #[inline]
    pub fn travel_mode_to_name(&self, mode: TravelMode) -> &'static str {
        mode.name()
    }

    /// Registers the constructor of the mode's costing, replacing any
    /// costing built for it before.
    pub fn register_costing(&mut self, mode: TravelMode, constructor: CostingFactory) {
        self.constructors[mode.index()] = Some(constructor);
        self.costings.get_mut().unwrap_or_else(PoisonError::into_inner)[mode.index()] = None;
    }

    /// The options a matcher of the named mode would be created with.
    pub fn merge_config(&self, name: &str, overrides: &Value) -> Result<MatcherOptions, ConfigError> {
        self.config.merge(name, overrides)
    }

    pub fn create(&self, mode: TravelMode) -> Result<MapMatcher, ConfigError> {
        self.create_with(mode, &Value::Null)
    }

    /// A matcher for the mode, with `overrides` (a JSON object, or null)
    /// applied over the configured options.
    pub fn create_with(&self, mode: TravelMode, overrides: &Value) -> Result<MapMatcher, ConfigError> {
        let options = self.merge_config(mode.name(), overrides)?;
        let mode_costing = self.mode_costing(mode, &options.costing)?;

        MapMatcher::new(
            options,
            self.reader.clone(),
            self.query.clone(),
            mode_costing,
            mode,
        )
    }

    /// As [`MapMatcherFactory::create_with`], for the mode of the name.
    pub fn create_by_name(&self, name: &str, overrides: &Value) -> Result<MapMatcher, ConfigError> {
        let mode = self.name_to_travel_mode(name)?;
        self.create_with(mode, overrides)
    }

    /// The costing currently cached for the mode, if it was built.
    pub fn cached_costing(&self, mode: TravelMode) -> Option<CostingRef> {
        self.read_costings()[mode.index()]
            .as_ref()
            .map(|cached| cached.costing.clone())
    }

    /// Evicts cached tiles and grids beyond their budgets.
    pub fn clear_cache(&self) {
        let trimmed = self.reader.trim();
        self.query.trim();

        debug!(
            "Trimmed caches to {} tiles and {} grids (tiles evicted: {trimmed})",
            self.reader.cache_len(),
            self.query.len()
        );
    }

    /// Drops every cached tile and grid.
    pub fn clear_full_cache(&self) {
        self.reader.clear();
        self.query.clear();
        debug!("Cleared tile and grid caches");
    }

    fn read_costings(&self) -> RwLockReadGuard<'_, CostingCache> {
        self.costings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_costings(&self) -> RwLockWriteGuard<'_, CostingCache> {
        self.costings.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The costing table for a matcher of the mode, (re)building the
    /// mode's costing when it is missing or was built with other options.
    fn mode_costing(
        &self,
        mode: TravelMode,
        options: &CostingOptions,
    ) -> Result<ModeCosting, ConfigError> {
        let constructor = self.constructors[mode.index()].ok_or(ConfigError::UnregisteredMode(mode))?;
        let current = |costings: &CostingCache| {
            costings[mode.index()]
                .as_ref()
                .is_some_and(|cached| cached.options == *options)
        };

        {
            let costings = self.read_costings();
            if current(&costings) {
                return Ok(snapshot(&costings));
            }
        }

        let mut costings = self.write_costings();

        // Another request may have built it while unlocked
        if !current(&costings) {
            debug!("Building {mode} costing");
            costings[mode.index()] = Some(CachedCosting {
                options: options.clone(),
                costing: constructor(options),
            });
        }

        Ok(snapshot(&costings))
    }
}

fn snapshot(costings: &CostingCache) -> ModeCosting {
    std::array::from_fn(|index| {
        costings[index]
            .as_ref()
            .map(|cached| cached.costing.clone())
    })
}
