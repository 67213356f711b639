//! Machine geometry: printhead, gantry and clearance padding.
//!
//! All bounds are nozzle-local: the nozzle tip sits at the origin and
//! the printhead / gantry rectangles are described around it. A
//! [`GeometrySpec`] is validated once when it is built and is read-only
//! afterwards, so one instance can be shared by any number of checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Axis, Cuboid, Rect};
use crate::types::GeometryConfig;

pub const DEFAULT_PADDING: f64 = 5.0;

/// The axis the gantry bar runs parallel to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GantryOrientation {
    /// Bar parallel to X; it moves along Y with the nozzle.
    X,
    /// Bar parallel to Y; it moves along X with the nozzle.
    Y,
}

impl GantryOrientation {
    /// Axis the bar spans in full.
    pub fn bar_axis(self) -> Axis {
        match self {
            GantryOrientation::X => Axis::X,
            GantryOrientation::Y => Axis::Y,
        }
    }

    /// Axis along which the bar travels with the nozzle.
    pub fn travel_axis(self) -> Axis {
        self.bar_axis().other()
    }

    /// Plan view of the bar while the nozzle visits every point of `area`.
    /// The bar is unbounded along its own axis.
    pub fn sweep(self, area: &Rect, gantry: &Gantry) -> Rect {
        match self {
            GantryOrientation::X => Rect::new(
                f64::NEG_INFINITY,
                area.y_min + gantry.xy_min,
                f64::INFINITY,
                area.y_max + gantry.xy_max,
            ),
            GantryOrientation::Y => Rect::new(
                area.x_min + gantry.xy_min,
                f64::NEG_INFINITY,
                area.x_max + gantry.xy_max,
                f64::INFINITY,
            ),
        }
    }
}

impl FromStr for GantryOrientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" => Ok(GantryOrientation::X),
            "y" => Ok(GantryOrientation::Y),
            other => Err(Error::InvalidGeometry(format!(
                "unknown gantry orientation {other:?}, expected \"x\" or \"y\""
            ))),
        }
    }
}

impl fmt::Display for GantryOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GantryOrientation::X => write!(f, "x"),
            GantryOrientation::Y => write!(f, "y"),
        }
    }
}

/// Cross-section of the gantry bar relative to the nozzle, on the axis
/// the bar travels along, plus the height of its underside when the
/// nozzle touches the plate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gantry {
    pub xy_min: f64,
    pub xy_max: f64,
    pub z_min: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySpec {
    printhead: Rect,
    gantry: Gantry,
    orientation: GantryOrientation,
    padding: f64,
}

impl GeometrySpec {
    pub fn new(
        printhead: Rect,
        gantry: Gantry,
        orientation: GantryOrientation,
        padding: f64,
    ) -> Result<Self> {
        if !printhead.is_well_formed() {
            return Err(Error::InvalidGeometry(format!(
                "printhead bounds must be finite with min <= max, \
                 got {printhead:?}"
            )));
        }
        let gantry_finite = gantry.xy_min.is_finite()
            && gantry.xy_max.is_finite()
            && gantry.z_min.is_finite();
        if !gantry_finite {
            return Err(Error::InvalidGeometry(format!(
                "gantry bounds must be finite, got {gantry:?}"
            )));
        }
        if gantry.xy_min > gantry.xy_max {
            return Err(Error::InvalidGeometry(format!(
                "gantry xy_min {} exceeds xy_max {}",
                gantry.xy_min, gantry.xy_max
            )));
        }
        if !padding.is_finite() || padding < 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "padding must be a non-negative number, got {padding}"
            )));
        }
        Ok(GeometrySpec {
            printhead,
            gantry,
            orientation,
            padding,
        })
    }

    pub fn printhead(&self) -> &Rect {
        &self.printhead
    }

    pub fn gantry(&self) -> &Gantry {
        &self.gantry
    }

    pub fn orientation(&self) -> GantryOrientation {
        self.orientation
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Same machine with a different clearance margin.
    pub fn with_padding(&self, padding: f64) -> Result<Self> {
        GeometrySpec::new(
            self.printhead,
            self.gantry,
            self.orientation,
            padding,
        )
    }

    /// Area the printhead body covers while the nozzle prints `area`.
    pub fn printhead_sweep(&self, area: &Rect) -> Rect {
        area.expand_by(&self.printhead)
    }

    /// Volume the gantry may occupy while the nozzle prints `area`: the
    /// swept bar, from its lowest position upward without limit.
    pub fn gantry_sweep(&self, area: &Rect) -> Cuboid {
        Cuboid::new(
            self.orientation.sweep(area, &self.gantry),
            self.gantry.z_min,
            f64::INFINITY,
        )
    }

    /// True if an object of this height reaches into the gantry's path
    /// once padding is taken into account.
    pub fn reaches_gantry(&self, height: f64) -> bool {
        height + self.padding > self.gantry.z_min
    }
}

/// Host configuration keys. The `*_min` values are distances from the
/// nozzle toward the negative axis and get negated here.
impl TryFrom<GeometryConfig> for GeometrySpec {
    type Error = Error;

    fn try_from(config: GeometryConfig) -> Result<Self> {
        let orientation: GantryOrientation = config.gantry_orientation.parse()?;
        let printhead = Rect::new(
            -config.printhead_x_min,
            -config.printhead_y_min,
            config.printhead_x_max,
            config.printhead_y_max,
        );
        let gantry = Gantry {
            xy_min: -config.gantry_xy_min,
            xy_max: config.gantry_xy_max,
            z_min: config.gantry_z_min,
        };
        GeometrySpec::new(printhead, gantry, orientation, config.padding)
    }
}

impl TryFrom<&GeometryConfig> for GeometrySpec {
    type Error = Error;

    fn try_from(config: &GeometryConfig) -> Result<Self> {
        GeometrySpec::try_from(config.clone())
    }
}
