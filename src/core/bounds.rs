use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Represents a bounding box in pixel or tile-grid coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

/// Inclusive range of tile columns (`x`) and rows (`y`) at one zoom level.
///
/// Kept in floating point so that a runaway projection shows up as a
/// non-finite corner instead of silently saturating an integer.
pub type TileRange = Bounds;

impl Bounds {
    /// Creates bounds from two corners, normalising them so that `min <= max`
    pub fn new(a: Point, b: Point) -> Self {
        let (min_x, max_x) = ordered(a.x, b.x);
        let (min_y, max_y) = ordered(a.y, b.y);
        Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Checks if the bounds contain a point (edges included)
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Returns a new bounds grown by `amount` on every side
    pub fn expanded(&self, amount: f64) -> Bounds {
        Bounds {
            min: Point::new(self.min.x - amount, self.min.y - amount),
            max: Point::new(self.max.x + amount, self.max.y + amount),
        }
    }

    /// True when every corner coordinate is a finite number
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Number of integer cells covered when read as an inclusive tile range
    pub fn tile_count(&self) -> u64 {
        if !self.is_finite() {
            return 0;
        }
        let width = (self.max.x - self.min.x + 1.0).max(0.0);
        let height = (self.max.y - self.min.y + 1.0).max(0.0);
        (width * height) as u64
    }
}

// NaN never compares less, so a NaN corner survives normalisation
fn ordered(a: f64, b: f64) -> (f64, f64) {
    if b < a {
        (b, a)
    } else {
        (a, b)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0))
    }
}
