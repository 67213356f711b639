//! Axis-aligned primitives for plate-level collision checks.
//!
//! Everything here works in millimetres in bed coordinates. Overlap
//! tests are strict: rectangles that only share an edge or a corner do
//! not overlap, and neither do ones that intersect by less than
//! [`EPSILON`].

use serde::{Deserialize, Serialize};

/// Slack for overlap and containment tests, so that an offset computed as
/// `edge - other_edge` lands exactly on the edge despite rounding.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// A closed range `[min, max]` along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Interval { min, max }
    }

    pub fn len(&self) -> f64 {
        self.max - self.min
    }

    /// True if the interiors overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.min < other.max - EPSILON && self.max > other.min + EPSILON
    }

    pub fn translate(&self, d: f64) -> Interval {
        Interval::new(self.min + d, self.max + d)
    }
}

/// Axis-aligned rectangle on the plate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Rect {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Rect {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn depth(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Zero extent on at least one axis.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.depth() <= 0.0
    }

    /// Finite bounds with `min <= max` on both axes. Infinite bounds are
    /// only produced internally (the gantry bar) and never accepted as
    /// input.
    pub fn is_well_formed(&self) -> bool {
        [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    pub fn range(&self, axis: Axis) -> Interval {
        match axis {
            Axis::X => Interval::new(self.x_min, self.x_max),
            Axis::Y => Interval::new(self.y_min, self.y_max),
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.x_min + dx,
            self.y_min + dy,
            self.x_max + dx,
            self.y_max + dy,
        )
    }

    /// Shift along a single axis.
    pub fn translate_along(&self, axis: Axis, d: f64) -> Rect {
        match axis {
            Axis::X => self.translate(d, 0.0),
            Axis::Y => self.translate(0.0, d),
        }
    }

    /// Expand by `d` on every side.
    pub fn grow(&self, d: f64) -> Rect {
        Rect::new(
            self.x_min - d,
            self.y_min - d,
            self.x_max + d,
            self.y_max + d,
        )
    }

    /// Minkowski sum with a rectangle given in local coordinates around
    /// the origin: the area swept by `local` while its origin visits every
    /// point of `self`.
    pub fn expand_by(&self, local: &Rect) -> Rect {
        Rect::new(
            self.x_min + local.x_min,
            self.y_min + local.y_min,
            self.x_max + local.x_max,
            self.y_max + local.y_max,
        )
    }

    /// True if the interiors overlap. Touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.range(Axis::X).overlaps(&other.range(Axis::X))
            && self.range(Axis::Y).overlaps(&other.range(Axis::Y))
    }

    /// Overlap after growing `self` by `padding`, i.e. the gap between
    /// the two is smaller than `padding`.
    pub fn overlaps_padded(&self, other: &Rect, padding: f64) -> bool {
        self.grow(padding).overlaps(other)
    }

    /// True if `other` lies within `self` (edges inclusive).
    pub fn contains(&self, other: &Rect) -> bool {
        other.x_min >= self.x_min - EPSILON
            && other.x_max <= self.x_max + EPSILON
            && other.y_min >= self.y_min - EPSILON
            && other.y_max <= self.y_max + EPSILON
    }
}

/// A rectangle extruded between two heights. `z_max` may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    pub base: Rect,
    pub z_min: f64,
    pub z_max: f64,
}

impl Cuboid {
    pub fn new(base: Rect, z_min: f64, z_max: f64) -> Self {
        Cuboid { base, z_min, z_max }
    }

    /// Something standing on the plate, from z = 0 up to `height`.
    pub fn on_plate(base: Rect, height: f64) -> Self {
        Cuboid::new(base, 0.0, height)
    }

    pub fn overlaps(&self, other: &Cuboid) -> bool {
        let z = Interval::new(self.z_min, self.z_max);
        let other_z = Interval::new(other.z_min, other.z_max);
        self.base.overlaps(&other.base) && z.overlaps(&other_z)
    }

    /// Overlap after growing `self` by `padding` in all three dimensions.
    pub fn overlaps_padded(&self, other: &Cuboid, padding: f64) -> bool {
        Cuboid::new(
            self.base.grow(padding),
            self.z_min - padding,
            self.z_max + padding,
        )
        .overlaps(other)
    }
}
