//! Whether a queued job may start now, and where.
//!
//! This is the decision the host makes before pulling the next job off
//! its queue. The plate contents are owned by the host and passed in as
//! a snapshot.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::collision::{find_collision, fits_on_bed, BuildVolume, Collision};
use crate::footprint::{Footprint, Offset};
use crate::machine::GeometrySpec;
use crate::search::{search, SearchOptions};

/// Host settings that govern job admission. Both default to off, in
/// which case a job only starts on an empty plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementPolicy {
    /// Start jobs while finished prints are still on the plate.
    #[serde(default)]
    pub continuous_printing: bool,
    /// Move a colliding job to a free spot instead of waiting.
    #[serde(default)]
    pub reposition: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    /// Offset to print the job at. The job's own offset unless it was
    /// repositioned.
    pub offset: Offset,
    /// What blocks the job at its own offset, if anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision: Option<Collision>,
}

pub fn check_available(
    job: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
    policy: &PlacementPolicy,
    options: &SearchOptions,
) -> Availability {
    let unmoved = |available, collision| Availability {
        available,
        offset: job.offset(),
        collision,
    };

    if !policy.continuous_printing {
        return unmoved(placed.is_empty(), None);
    }

    let collision = find_collision(job, placed, geometry);
    if collision.is_none() && fits_on_bed(job, bed) {
        return unmoved(true, None);
    }
    if !policy.reposition {
        return unmoved(false, collision);
    }

    match search(job, placed, geometry, bed, options).offset {
        Some(offset) => {
            debug!("repositioning job to ({}, {})", offset.dx, offset.dy);
            Availability {
                available: true,
                offset,
                collision,
            }
        }
        None => unmoved(false, collision),
    }
}
