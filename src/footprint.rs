//! Object footprints on the build plate.

use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Cuboid, Rect};

/// Planar translation applied to a job before printing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Offset { dx, dy }
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

#[derive(Deserialize)]
struct FootprintFields {
    rect: Rect,
    height: f64,
    #[serde(default)]
    offset: Offset,
}

impl TryFrom<FootprintFields> for Footprint {
    type Error = Error;

    fn try_from(f: FootprintFields) -> Result<Self> {
        Footprint::new(f.rect, f.height, f.offset)
    }
}

/// An object's rectangle in bed coordinates, its print height, and the
/// offset it is (or will be) printed at. Only constructed through
/// [`Footprint::new`], so every instance is well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FootprintFields")]
pub struct Footprint {
    rect: Rect,
    height: f64,
    offset: Offset,
}

impl Footprint {
    pub fn new(rect: Rect, height: f64, offset: Offset) -> Result<Self> {
        if !rect.is_well_formed() {
            return Err(Error::InvalidFootprint(format!(
                "rectangle must be finite with min <= max, got {rect:?}"
            )));
        }
        if !height.is_finite() || height < 0.0 {
            return Err(Error::InvalidFootprint(format!(
                "height must be a non-negative number, got {height}"
            )));
        }
        if !(offset.dx.is_finite() && offset.dy.is_finite()) {
            return Err(Error::InvalidFootprint(format!(
                "offset must be finite, got {offset:?}"
            )));
        }
        Ok(Footprint {
            rect,
            height,
            offset,
        })
    }

    /// A footprint printed where the slicer put it.
    pub fn at_origin(rect: Rect, height: f64) -> Result<Self> {
        Footprint::new(rect, height, Offset::ZERO)
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Same object printed at a different offset.
    pub fn with_offset(&self, offset: Offset) -> Result<Self> {
        Footprint::new(self.rect, self.height, offset)
    }

    /// Unchecked variant for offsets computed from already valid values.
    pub(crate) fn shifted(&self, offset: Offset) -> Self {
        Footprint {
            rect: self.rect,
            height: self.height,
            offset,
        }
    }

    /// Rectangle where the object actually ends up on the plate.
    pub fn placed_rect(&self) -> Rect {
        self.rect.translate(self.offset.dx, self.offset.dy)
    }

    pub fn cuboid(&self) -> Cuboid {
        Cuboid::on_plate(self.placed_rect(), self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.rect.is_degenerate()
    }
}
