//! Entry points for the host.
//!
//! [`check_collision`] and [`find_valid_offset`] take loose values and
//! validate them. The `*_json` functions take a whole request as a JSON
//! string and return the response as one, which is what the Python
//! bindings forward to.

use crate::collision::{find_collision, BuildVolume};
use crate::error::Result;
use crate::footprint::{Footprint, Offset};
use crate::geometry::Rect;
use crate::machine::GeometrySpec;
use crate::placement::check_available;
use crate::search::{find_offset, search, SearchOptions};
use crate::types::{
    AvailabilityRequest, CollisionRequest, CollisionResponse, OffsetRequest,
    OffsetResponse,
};

/// True if a job with this rectangle and height, printed at `offset`,
/// would collide with anything in `placed`.
pub fn check_collision(
    rect: Rect,
    height: f64,
    offset: Offset,
    placed: &[Footprint],
    geometry: &GeometrySpec,
) -> Result<bool> {
    let job = Footprint::new(rect, height, offset)?;
    Ok(find_collision(&job, placed, geometry).is_some())
}

/// Offset at which a new job can be printed, using the default search.
/// `Ok(None)` means there is no room for it right now.
pub fn find_valid_offset(
    rect: Rect,
    height: f64,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
) -> Result<Option<Offset>> {
    let job = Footprint::at_origin(rect, height)?;
    Ok(find_offset(&job, placed, geometry, bed, &SearchOptions::default()))
}

pub fn check_collision_json(request_json: &str) -> Result<String> {
    let req: CollisionRequest = serde_json::from_str(request_json)?;
    let geometry = GeometrySpec::try_from(req.geometry)?;
    let collision = find_collision(&req.job, &req.placed, &geometry);
    let response = CollisionResponse {
        collides: collision.is_some(),
        collision,
    };
    Ok(serde_json::to_string(&response)?)
}

pub fn find_offset_json(request_json: &str) -> Result<String> {
    let req: OffsetRequest = serde_json::from_str(request_json)?;
    let geometry = GeometrySpec::try_from(req.geometry)?;
    let outcome =
        search(&req.job, &req.placed, &geometry, &req.bed, &req.search);
    Ok(serde_json::to_string(&OffsetResponse::from(outcome))?)
}

pub fn check_available_json(request_json: &str) -> Result<String> {
    let req: AvailabilityRequest = serde_json::from_str(request_json)?;
    let geometry = GeometrySpec::try_from(req.geometry)?;
    let availability = check_available(
        &req.job,
        &req.placed,
        &geometry,
        &req.bed,
        &req.policy,
        &req.search,
    );
    Ok(serde_json::to_string(&availability)?)
}
