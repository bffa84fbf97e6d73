use crate::candidate::{Candidate, CandidateGrid};
use crate::graph::{DirectedEdge, GraphError, GraphId, GraphReader, GraphTile, TileId};

use geo::{Destination, Distance, Geodesic, Haversine, Point};
use itertools::Itertools;
use log::debug;
use lru::LruCache;
use rstar::AABB;
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Grid budget used when none is configured, in bytes.
pub const DEFAULT_GRID_CACHE_SIZE: usize = 64 * 1024 * 1024;

/// Predicate over edges and the tile owning them, returning `true` for
/// edges which must never be offered as candidates.
pub type EdgeFilter<'a> = dyn Fn(&DirectedEdge, &GraphTile) -> bool + Sync + 'a;

/// Finds the candidates of a measurement.
pub trait CandidateQuery: Send + Sync {
    /// The closest position on every edge lying within `radius` meters
    /// of the point, nearest first, keeping at most `max_candidates`.
    fn query(
        &self,
        point: Point,
        radius: f64,
        max_candidates: usize,
        filter: &EdgeFilter<'_>,
    ) -> Result<Vec<Candidate>, GraphError>;
}

#[derive(Debug)]
struct GridCache {
    grids: LruCache<TileId, Arc<CandidateGrid>>,
    footprint: usize,
}

/// Candidate lookup backed by one [`CandidateGrid`] per tile.
///
/// Grids are built on first use and evicted least-recently-used first
/// once their combined footprint exceeds the budget.
#[derive(Debug)]
pub struct CandidateGridQuery {
    reader: Arc<GraphReader>,
    cache: Mutex<GridCache>,
    max_cache_size: usize,
}

impl CandidateGridQuery {
    pub fn new(reader: Arc<GraphReader>, max_cache_size: usize) -> Self {
        Self {
            reader,
            cache: Mutex::new(GridCache {
                grids: LruCache::unbounded(),
                footprint: 0,
            }),
            max_cache_size,
        }
    }

    #[inline]
    pub fn reader(&self) -> &Arc<GraphReader> {
        &self.reader
    }

    fn lock(&self) -> MutexGuard<'_, GridCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cached grids.
    pub fn len(&self) -> usize {
        self.lock().grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().grids.is_empty()
    }

    /// Combined footprint of the cached grids, in bytes.
    pub fn size(&self) -> usize {
        self.lock().footprint
    }

    pub fn clear(&self) {
        let mut cache = self.lock();
        cache.grids.clear();
        cache.footprint = 0;
    }

    /// Evicts grids until the cache fits its budget.
    pub fn trim(&self) {
        let mut cache = self.lock();
        Self::evict(&mut cache, self.max_cache_size, 0);
    }

    /// Evicts least-recently-used grids beyond the budget, always
    /// keeping the `keep` most recent ones.
    fn evict(cache: &mut GridCache, budget: usize, keep: usize) {
        while cache.footprint > budget && cache.grids.len() > keep {
            let Some((tile, grid)) = cache.grids.pop_lru() else {
                break;
            };

            cache.footprint = cache.footprint.saturating_sub(grid.footprint());
            debug!("Evicted candidate grid of tile {tile}");
        }
    }

    /// The grid of the tile, building it if needed.
    pub fn grid(&self, tile: TileId) -> Result<Option<Arc<CandidateGrid>>, GraphError> {
        if let Some(grid) = self.lock().grids.get(&tile) {
            return Ok(Some(grid.clone()));
        }

        let Some(graph_tile) = self.reader.tile(tile)? else {
            return Ok(None);
        };

        let grid = Arc::new(CandidateGrid::new(graph_tile));

        let mut cache = self.lock();
        cache.footprint += grid.footprint();
        if let Some(replaced) = cache.grids.put(tile, grid.clone()) {
            cache.footprint = cache.footprint.saturating_sub(replaced.footprint());
        }

        Self::evict(&mut cache, self.max_cache_size, 1);
        Ok(Some(grid))
    }
}

impl CandidateQuery for CandidateGridQuery {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, filter)))]
    fn query(
        &self,
        point: Point,
        radius: f64,
        max_candidates: usize,
        filter: &EdgeFilter<'_>,
    ) -> Result<Vec<Candidate>, GraphError> {
        let boxes = search_boxes(point, radius);

        // Shapes may leave the tile owning their edge, so the
        // neighbouring tiles are searched as well
        let margin = self.reader.local_tile_size();
        let tiles = boxes
            .iter()
            .flat_map(|bbox| {
                let (lower, upper) = (bbox.lower(), bbox.upper());
                self.reader.grid().tiles_intersecting(
                    Point::new(lower.x() - margin, lower.y() - margin),
                    Point::new(upper.x() + margin, upper.y() + margin),
                )
            })
            .unique()
            .collect::<Vec<_>>();

        let mut closest: FxHashMap<GraphId, Candidate> = FxHashMap::default();

        for tile in tiles {
            let Some(grid) = self.grid(tile)? else {
                continue;
            };

            for piece in boxes.iter().flat_map(|bbox| grid.pieces_within(bbox)) {
                let (percent_along, projected) = piece.project(&point);
                let distance = Haversine.distance(point, projected);

                if distance > radius {
                    continue;
                }

                if closest
                    .get(&piece.edge_id)
                    .is_some_and(|existing| existing.distance <= distance)
                {
                    continue;
                }

                let Some(edge) = grid.tile().edge(piece.edge_id) else {
                    continue;
                };

                if filter(edge, grid.tile()) {
                    continue;
                }

                closest.insert(
                    piece.edge_id,
                    Candidate::new(piece.edge_id, percent_along, projected, distance),
                );
            }
        }

        Ok(closest
            .into_values()
            .sorted_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then_with(|| a.edge_id.cmp(&b.edge_id))
            })
            .take(max_candidates)
            .collect())
    }
}

/// Boxes, in degrees, enclosing the search circle around the point.
///
/// Longitudes are unwrapped around the point, and a box crossing the
/// antimeridian is split in two, one either side of it.
pub(crate) fn search_boxes(point: Point, radius: f64) -> SmallVec<[AABB<Point>; 2]> {
    // Corners of the square enclosing the search circle
    let diagonal = radius * std::f64::consts::SQRT_2;
    let bottom_right = Geodesic.destination(point, 135.0, diagonal);
    let top_left = Geodesic.destination(point, 315.0, diagonal);

    let west = point.x() - wrap_longitude(point.x() - top_left.x());
    let east = point.x() + wrap_longitude(bottom_right.x() - point.x());
    let south = bottom_right.y().max(-90.0);
    let north = top_left.y().min(90.0);

    let spans: SmallVec<[(f64, f64); 2]> = if west < -180.0 {
        smallvec![(west + 360.0, 180.0), (-180.0, east)]
    } else if east > 180.0 {
        smallvec![(west, 180.0), (-180.0, east - 360.0)]
    } else {
        smallvec![(west, east)]
    };

    spans
        .into_iter()
        .map(|(west, east)| AABB::from_corners(Point::new(west, south), Point::new(east, north)))
        .collect()
}

/// Longitude difference folded into `[-180, 180)`.
#[inline]
fn wrap_longitude(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}
