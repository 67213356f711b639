//! Data types for the JSON boundary with the host.
//!
//! Requests carry the raw host configuration ([`GeometryConfig`]) along
//! with the plate snapshot; every footprint, bed and option value is
//! validated while it is deserialized.

use serde::{Deserialize, Serialize};

use crate::collision::{BuildVolume, Collision};
use crate::footprint::{Footprint, Offset};
use crate::machine::DEFAULT_PADDING;
use crate::placement::PlacementPolicy;
use crate::search::{SearchOptions, SearchOutcome};

// -- Configuration -------------------------------------------------

/// Machine geometry as the host reads it from its config file. The
/// `*_min` keys are distances from the nozzle toward the negative axis,
/// so all values are normally non-negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub printhead_x_min: f64,
    pub printhead_x_max: f64,
    pub printhead_y_min: f64,
    pub printhead_y_max: f64,
    pub gantry_xy_min: f64,
    pub gantry_xy_max: f64,
    pub gantry_z_min: f64,
    /// `"x"` or `"y"`.
    pub gantry_orientation: String,
    #[serde(default = "default_padding")]
    pub padding: f64,
}

fn default_padding() -> f64 {
    DEFAULT_PADDING
}

// -- Requests ------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionRequest {
    pub geometry: GeometryConfig,
    pub job: Footprint,
    #[serde(default)]
    pub placed: Vec<Footprint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetRequest {
    pub geometry: GeometryConfig,
    pub job: Footprint,
    #[serde(default)]
    pub placed: Vec<Footprint>,
    pub bed: BuildVolume,
    #[serde(default)]
    pub search: SearchOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub geometry: GeometryConfig,
    pub job: Footprint,
    #[serde(default)]
    pub placed: Vec<Footprint>,
    pub bed: BuildVolume,
    #[serde(default)]
    pub policy: PlacementPolicy,
    #[serde(default)]
    pub search: SearchOptions,
}

// -- Responses -----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionResponse {
    pub collides: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision: Option<Collision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetResponse {
    /// `null` when no valid placement was found.
    pub offset: Option<Offset>,
    pub positions_tried: usize,
    #[serde(default)]
    pub truncated: bool,
}

impl From<SearchOutcome> for OffsetResponse {
    fn from(outcome: SearchOutcome) -> Self {
        OffsetResponse {
            offset: outcome.offset,
            positions_tried: outcome.positions_tried,
            truncated: outcome.truncated,
        }
    }
}
