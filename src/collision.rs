//! Collision predicate between a job and the objects already on the plate.
//!
//! Three hazards are checked per placed object, in order:
//! the job itself (padded in 3D), the printhead body sweeping around the
//! job at plate level, and the gantry bar sweeping over the plate at or
//! above its minimum height. Padding is applied once per pair, so two
//! objects collide when the gap between them is smaller than the padding.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::footprint::Footprint;
use crate::geometry::{Rect, EPSILON};
use crate::machine::GeometrySpec;

/// Which part of the machine would hit the placed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionKind {
    /// The job's own volume comes within padding of the object.
    Object,
    /// The printhead body passes over the object while printing the job.
    Printhead,
    /// The gantry bar passes over an object tall enough to reach it.
    Gantry,
}

impl fmt::Display for CollisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollisionKind::Object => "object",
            CollisionKind::Printhead => "printhead",
            CollisionKind::Gantry => "gantry",
        };
        f.write_str(name)
    }
}

/// First collision found for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    /// Index into the slice of placed footprints.
    pub placed_index: usize,
    pub kind: CollisionKind,
}

#[derive(Deserialize)]
struct BuildVolumeFields {
    plate: Rect,
    #[serde(default)]
    max_height: Option<f64>,
}

impl TryFrom<BuildVolumeFields> for BuildVolume {
    type Error = Error;

    fn try_from(f: BuildVolumeFields) -> Result<Self> {
        BuildVolume::new(f.plate, f.max_height)
    }
}

/// Printable area of the plate and, optionally, the highest printable Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BuildVolumeFields")]
pub struct BuildVolume {
    plate: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_height: Option<f64>,
}

impl BuildVolume {
    pub fn new(plate: Rect, max_height: Option<f64>) -> Result<Self> {
        if !plate.is_well_formed() {
            return Err(Error::InvalidBuildVolume(format!(
                "plate must be finite with min <= max, got {plate:?}"
            )));
        }
        if let Some(h) = max_height {
            if !h.is_finite() || h < 0.0 {
                return Err(Error::InvalidBuildVolume(format!(
                    "max height must be a non-negative number, got {h}"
                )));
            }
        }
        Ok(BuildVolume { plate, max_height })
    }

    pub fn plate(&self) -> &Rect {
        &self.plate
    }

    pub fn max_height(&self) -> Option<f64> {
        self.max_height
    }

    pub(crate) fn admits_height(&self, height: f64) -> bool {
        self.max_height.map_or(true, |max| height <= max + EPSILON)
    }
}

impl TryFrom<Rect> for BuildVolume {
    type Error = Error;

    fn try_from(plate: Rect) -> Result<Self> {
        BuildVolume::new(plate, None)
    }
}

/// Object-vs-object clearance only: true if the two footprints come
/// closer than `padding`. Symmetric in its arguments.
pub fn footprints_collide(a: &Footprint, b: &Footprint, padding: f64) -> bool {
    if a.is_degenerate() || b.is_degenerate() {
        return false;
    }
    a.cuboid().overlaps_padded(&b.cuboid(), padding)
}

/// Check a single pair. The printhead and gantry belong to the job being
/// printed (`candidate`), so this is not symmetric in general.
pub fn collision_between(
    candidate: &Footprint,
    other: &Footprint,
    geometry: &GeometrySpec,
) -> Option<CollisionKind> {
    if candidate.is_degenerate() || other.is_degenerate() {
        return None;
    }
    let padding = geometry.padding();
    let area = candidate.placed_rect();
    let target = other.cuboid();

    if candidate.cuboid().overlaps_padded(&target, padding) {
        Some(CollisionKind::Object)
    } else if geometry
        .printhead_sweep(&area)
        .overlaps_padded(&target.base, padding)
    {
        Some(CollisionKind::Printhead)
    } else if geometry.gantry_sweep(&area).overlaps_padded(&target, padding) {
        Some(CollisionKind::Gantry)
    } else {
        None
    }
}

/// Find the first placed object the job would collide with.
pub fn find_collision(
    candidate: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
) -> Option<Collision> {
    let hit = placed.iter().enumerate().find_map(|(placed_index, other)| {
        collision_between(candidate, other, geometry)
            .map(|kind| Collision { placed_index, kind })
    });
    if let Some(c) = &hit {
        debug!(
            "job at ({}, {}) hits placed object {} ({})",
            candidate.offset().dx,
            candidate.offset().dy,
            c.placed_index,
            c.kind
        );
    }
    hit
}

pub fn has_collision(
    candidate: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
) -> bool {
    find_collision(candidate, placed, geometry).is_some()
}

/// True if the job lies within the plate (edges inclusive) and is not
/// taller than the printer allows.
pub fn fits_on_bed(candidate: &Footprint, bed: &BuildVolume) -> bool {
    bed.plate.contains(&candidate.placed_rect())
        && bed.admits_height(candidate.height())
}

/// The job fits on the plate and collides with nothing.
pub fn is_valid_placement(
    candidate: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
) -> bool {
    fits_on_bed(candidate, bed) && !has_collision(candidate, placed, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::Offset;
    use crate::machine::{Gantry, GantryOrientation};

    fn rect(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Rect {
        Rect::new(x_min, y_min, x_max, y_max)
    }

    fn fp(x_min: f64, x_max: f64, y_min: f64, y_max: f64, h: f64) -> Footprint {
        Footprint::at_origin(rect(x_min, x_max, y_min, y_max), h)
            .expect("valid footprint")
    }

    /// Square printhead reaching `printhead` mm from the nozzle, X gantry
    /// 20 mm deep at z >= 50.
    fn small_machine(printhead: f64) -> GeometrySpec {
        GeometrySpec::new(
            rect(-printhead, printhead, -printhead, printhead),
            Gantry {
                xy_min: -10.0,
                xy_max: 10.0,
                z_min: 50.0,
            },
            GantryOrientation::X,
            5.0,
        )
        .expect("valid geometry")
    }

    /// Offset printhead on a 500 x 1000 mm class machine.
    fn large_machine(orientation: GantryOrientation) -> GeometrySpec {
        GeometrySpec::new(
            rect(-80.0, 26.0, -49.9, 72.0),
            Gantry {
                xy_min: -28.5,
                xy_max: 32.0,
                z_min: 84.0,
            },
            orientation,
            5.0,
        )
        .expect("valid geometry")
    }

    #[test]
    fn gap_equal_to_padding_is_clear() {
        let placed = fp(0.0, 50.0, 0.0, 50.0, 10.0);
        let job = fp(55.0, 100.0, 0.0, 50.0, 10.0);
        assert!(!footprints_collide(&job, &placed, 5.0));
        assert!(!has_collision(&job, &[placed], &small_machine(0.0)));
    }

    #[test]
    fn gap_below_padding_collides() {
        let placed = fp(0.0, 50.0, 0.0, 50.0, 10.0);
        let job = fp(52.0, 100.0, 0.0, 50.0, 10.0);
        assert!(footprints_collide(&job, &placed, 5.0));
        let hit = find_collision(&job, &[placed], &small_machine(0.0))
            .expect("collision");
        assert_eq!(hit.kind, CollisionKind::Object);
        assert_eq!(hit.placed_index, 0);
    }

    #[test]
    fn printhead_envelope_reaches_neighbour() {
        // Clear of the neighbour itself, but a 40 mm printhead printing the
        // job's left edge hangs 20 mm over it.
        let placed = fp(0.0, 50.0, 0.0, 50.0, 10.0);
        let job = fp(55.0, 100.0, 0.0, 50.0, 10.0);
        let hit = find_collision(&job, &[placed], &small_machine(20.0))
            .expect("collision");
        assert_eq!(hit.kind, CollisionKind::Printhead);
    }

    #[test]
    fn gantry_hits_tall_object_far_from_printhead() {
        let tall = fp(0.0, 50.0, 0.0, 50.0, 60.0);
        let job = fp(150.0, 200.0, 0.0, 50.0, 10.0);
        let g = small_machine(20.0);
        assert!(!g.printhead_sweep(job.rect()).grow(5.0).overlaps(tall.rect()));
        let hit = find_collision(&job, &[tall], &g).expect("collision");
        assert_eq!(hit.kind, CollisionKind::Gantry);
    }

    #[test]
    fn gantry_passes_over_short_object() {
        let short = fp(0.0, 50.0, 0.0, 50.0, 40.0);
        let job = fp(150.0, 200.0, 0.0, 50.0, 10.0);
        assert!(!has_collision(&job, &[short], &small_machine(20.0)));
    }

    #[test]
    fn gantry_band_only_covers_travel_extent() {
        let tall = fp(0.0, 50.0, 0.0, 50.0, 60.0);
        let job = fp(150.0, 200.0, 100.0, 150.0, 10.0);
        assert!(!has_collision(&job, &[tall], &small_machine(20.0)));
    }

    #[test]
    fn degenerate_footprints_never_collide() {
        let g = small_machine(20.0);
        let placed = fp(0.0, 50.0, 0.0, 50.0, 60.0);
        let sliver = fp(25.0, 25.0, 0.0, 50.0, 10.0);
        assert!(!has_collision(&sliver, &[placed.clone()], &g));
        assert!(!has_collision(&placed, &[sliver.clone()], &g));
        assert!(!footprints_collide(&sliver, &placed, 5.0));
    }

    #[test]
    fn no_self_collision_when_excluded() {
        let g = large_machine(GantryOrientation::Y);
        let job = fp(100.0, 200.0, 100.0, 200.0, 150.0);
        let others = vec![fp(400.0, 450.0, 800.0, 900.0, 10.0)];
        assert!(!has_collision(&job, &others, &g));
        // Sanity: the job would of course collide with itself.
        assert!(has_collision(&job, &[job.clone()], &g));
    }

    #[test]
    fn reports_first_colliding_index() {
        let g = small_machine(0.0);
        let job = fp(100.0, 150.0, 100.0, 150.0, 10.0);
        let placed = vec![
            fp(300.0, 350.0, 300.0, 350.0, 10.0),
            fp(140.0, 180.0, 100.0, 150.0, 10.0),
            fp(90.0, 110.0, 90.0, 110.0, 10.0),
        ];
        let hit = find_collision(&job, &placed, &g).expect("collision");
        assert_eq!(hit.placed_index, 1);
    }

    #[test]
    fn offset_moves_the_job_and_its_envelope() {
        let g = small_machine(20.0);
        let placed = fp(0.0, 50.0, 0.0, 50.0, 10.0);
        let job = fp(0.0, 50.0, 0.0, 50.0, 10.0);
        assert!(has_collision(&job, &[placed.clone()], &g));
        let moved = job.with_offset(Offset::new(100.0, 0.0)).expect("valid");
        assert!(!has_collision(&moved, &[placed], &g));
    }

    #[test]
    fn collision_is_symmetric_for_centred_machine() {
        // Printhead centred on the nozzle, symmetric gantry and equal
        // heights: the printhead/gantry envelopes look the same from
        // either side, so the relation is symmetric.
        let g = small_machine(20.0);
        let shapes = [
            fp(0.0, 50.0, 0.0, 50.0, 60.0),
            fp(55.0, 100.0, 0.0, 50.0, 60.0),
            fp(80.0, 120.0, 100.0, 150.0, 60.0),
            fp(300.0, 320.0, 0.0, 10.0, 60.0),
            fp(0.0, 40.0, 200.0, 230.0, 60.0),
        ];
        for a in &shapes {
            for b in &shapes {
                assert_eq!(
                    has_collision(a, &[b.clone()], &g),
                    has_collision(b, &[a.clone()], &g),
                    "{a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn gantry_asymmetry_between_tall_and_short_jobs() {
        // Named exception to symmetry: the gantry belongs to the job being
        // printed and only tall *placed* objects reach it.
        let g = small_machine(20.0);
        let tall = fp(0.0, 50.0, 0.0, 50.0, 60.0);
        let short = fp(150.0, 200.0, 0.0, 50.0, 10.0);
        assert!(has_collision(&short, &[tall.clone()], &g));
        assert!(!has_collision(&tall, &[short], &g));
    }

    #[test]
    fn padding_is_monotone() {
        let g = large_machine(GantryOrientation::X);
        let placed = vec![
            fp(10.0, 100.0, 10.0, 100.0, 80.0),
            fp(250.0, 300.0, 400.0, 500.0, 30.0),
        ];
        let jobs = [
            fp(184.0, 300.0, 10.0, 100.0, 80.0),
            fp(200.0, 260.0, 200.0, 260.0, 40.0),
            fp(400.0, 480.0, 700.0, 800.0, 20.0),
        ];
        for job in &jobs {
            let mut seen_collision = false;
            for step in 0..=20 {
                let g = g.with_padding(step as f64).expect("valid padding");
                let hit = has_collision(job, &placed, &g);
                assert!(
                    !seen_collision || hit,
                    "padding {step} cleared a collision"
                );
                seen_collision |= hit;
            }
        }
    }

    #[test]
    fn orientation_scenarios() {
        let gy = large_machine(GantryOrientation::Y);
        let gx = large_machine(GantryOrientation::X);

        // Objects spread along X: only the Y gantry can pass between them.
        let placed = [fp(10.0, 150.0, 10.0, 100.0, 120.0)];
        let job = fp(250.0, 400.0, 10.0, 200.0, 150.0);
        assert!(!has_collision(&job, &placed, &gy));
        let hit = find_collision(&job, &placed, &gx).expect("gantry");
        assert_eq!(hit.kind, CollisionKind::Gantry);

        // First object low enough to pass under the gantry.
        let placed = [fp(10.0, 150.0, 10.0, 100.0, 75.0)];
        assert!(!has_collision(&job, &placed, &gy));
        assert!(!has_collision(&job, &placed, &gx));

        // Gantry passes, printhead does not.
        let placed = [fp(50.0, 150.0, 50.0, 150.0, 75.0)];
        let job = fp(170.0, 300.0, 50.0, 150.0, 75.0);
        assert!(has_collision(&job, &placed, &gy));
        assert!(has_collision(&job, &placed, &gx));

        // Diagonal layout: both orientations fit.
        let placed = [fp(10.0, 100.0, 10.0, 100.0, 200.0)];
        let job = fp(200.0, 400.0, 200.0, 400.0, 200.0);
        assert!(!has_collision(&job, &placed, &gy));
        assert!(!has_collision(&job, &placed, &gx));

        // 4 mm gap: too close with 5 mm padding, fine with 3 mm.
        let placed = [fp(10.0, 100.0, 10.0, 100.0, 80.0)];
        let job = fp(184.0, 300.0, 10.0, 100.0, 80.0);
        assert!(has_collision(&job, &placed, &gy));
        assert!(has_collision(&job, &placed, &gx));
        let gy3 = gy.with_padding(3.0).expect("valid");
        let gx3 = gx.with_padding(3.0).expect("valid");
        assert!(!has_collision(&job, &placed, &gy3));
        assert!(!has_collision(&job, &placed, &gx3));
    }

    #[test]
    fn fits_on_bed_checks_area_and_height() {
        let bed = BuildVolume::new(rect(0.0, 500.0, 0.0, 1000.0), Some(600.0))
            .expect("valid");
        assert!(fits_on_bed(&fp(0.0, 500.0, 0.0, 1000.0, 600.0), &bed));
        assert!(!fits_on_bed(&fp(0.0, 501.0, 0.0, 100.0, 10.0), &bed));
        assert!(!fits_on_bed(&fp(0.0, 100.0, 0.0, 100.0, 601.0), &bed));
        let flat = BuildVolume::try_from(rect(0.0, 500.0, 0.0, 1000.0))
            .expect("valid");
        assert!(fits_on_bed(&fp(0.0, 100.0, 0.0, 100.0, 1e6), &flat));
    }

    #[test]
    fn build_volume_validation() {
        assert!(matches!(
            BuildVolume::new(rect(10.0, 0.0, 0.0, 10.0), None),
            Err(Error::InvalidBuildVolume(_))
        ));
        assert!(matches!(
            BuildVolume::new(rect(0.0, 10.0, 0.0, 10.0), Some(-1.0)),
            Err(Error::InvalidBuildVolume(_))
        ));
        let json = r#"{
            "plate": {"x_min": 0, "x_max": 200, "y_min": 0, "y_max": 200}
        }"#;
        let bed: BuildVolume = serde_json::from_str(json).expect("deserialize");
        assert_eq!(bed.max_height(), None);
    }

    #[test]
    fn valid_placement_combines_bed_and_collisions() {
        let g = small_machine(20.0);
        let bed = BuildVolume::try_from(rect(0.0, 200.0, 0.0, 200.0))
            .expect("valid");
        let placed = vec![fp(0.0, 50.0, 0.0, 50.0, 10.0)];
        let valid =
            |job: Footprint| is_valid_placement(&job, &placed, &g, &bed);
        assert!(valid(fp(120.0, 180.0, 120.0, 180.0, 10.0)));
        assert!(!valid(fp(20.0, 60.0, 20.0, 60.0, 10.0)));
        assert!(!valid(fp(180.0, 220.0, 120.0, 180.0, 10.0)));
    }
}
