use geo::{Distance, Haversine, Point};

/// One observed position of the trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    position: Point,

    /// Expected error of the position, in meters.
    gps_accuracy: f64,

    /// Radius to search for candidates within, in meters. Zero defers
    /// to the matcher's configured radius.
    search_radius: f64,
}

impl Measurement {
    pub fn new(position: Point, gps_accuracy: f64, search_radius: f64) -> Self {
        Self {
            position,
            gps_accuracy: gps_accuracy.max(0.0),
            search_radius: search_radius.max(0.0),
        }
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.position
    }

    #[inline]
    pub fn gps_accuracy(&self) -> f64 {
        self.gps_accuracy
    }

    #[inline]
    pub fn search_radius(&self) -> f64 {
        self.search_radius
    }

    #[inline]
    pub fn sq_search_radius(&self) -> f64 {
        self.search_radius * self.search_radius
    }

    /// A copy searching within the given radius instead.
    #[inline]
    pub fn with_search_radius(self, search_radius: f64) -> Self {
        Self {
            search_radius: search_radius.max(0.0),
            ..self
        }
    }

    /// Great-circle distance to the other measurement, in meters.
    #[inline]
    pub fn distance(&self, other: &Measurement) -> f64 {
        Haversine.distance(self.position, other.position)
    }
}

impl From<Point> for Measurement {
    fn from(position: Point) -> Self {
        Measurement::new(position, 0.0, 0.0)
    }
}
