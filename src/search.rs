//! Offset search: find where a job can be printed when its slicer
//! position collides with what is already on the plate.
//!
//! Two strategies share the same contract. Given identical inputs they
//! return identical results, only ever propose offsets that keep the job
//! on the plate, and re-validate every result with the full collision
//! predicate before returning it.
//!
//! - [`SearchStrategy::Rings`] walks a grid of offsets in concentric
//!   square rings around the job's current offset.
//! - [`SearchStrategy::Sweep`] snaps the job's clearance envelope to the
//!   edges of the objects in its way, scanning across the gantry's travel
//!   axis. It needs far fewer positions than the grid and is not limited
//!   to grid resolution, but may miss pockets that only the grid finds.

use std::cmp::Ordering;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::collision::{fits_on_bed, is_valid_placement, BuildVolume};
use crate::error::{Error, Result};
use crate::footprint::{Footprint, Offset};
use crate::geometry::{Axis, Interval, Rect, EPSILON};
use crate::machine::GeometrySpec;

/// Grid step used when the machine has no padding to derive one from.
pub const DEFAULT_STEP: f64 = 1.0;

/// Furthest grid index the ring search visits on either side of the
/// job's current offset.
const MAX_GRID_INDEX: i64 = i32::MAX as i64;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    #[default]
    Rings,
    Sweep,
}

#[derive(Deserialize)]
struct SearchOptionsFields {
    #[serde(default)]
    strategy: SearchStrategy,
    #[serde(default)]
    step: Option<f64>,
    #[serde(default)]
    max_steps: Option<usize>,
}

impl TryFrom<SearchOptionsFields> for SearchOptions {
    type Error = Error;

    fn try_from(f: SearchOptionsFields) -> Result<Self> {
        let mut options = SearchOptions::new(f.strategy);
        if let Some(step) = f.step {
            options = options.with_step(step)?;
        }
        if let Some(max_steps) = f.max_steps {
            options = options.with_max_steps(max_steps)?;
        }
        Ok(options)
    }
}

/// Tuning for [`find_offset`]. The default is the ring search with a step
/// of half the padding and no cap on positions tried.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SearchOptionsFields")]
pub struct SearchOptions {
    strategy: SearchStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_steps: Option<usize>,
}

impl SearchOptions {
    pub fn new(strategy: SearchStrategy) -> Self {
        SearchOptions {
            strategy,
            step: None,
            max_steps: None,
        }
    }

    /// Grid resolution for the ring search, in millimetres.
    pub fn with_step(self, step: f64) -> Result<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::InvalidSearch(format!(
                "step must be a positive number, got {step}"
            )));
        }
        Ok(SearchOptions {
            step: Some(step),
            ..self
        })
    }

    /// Upper bound on the number of positions evaluated.
    pub fn with_max_steps(self, max_steps: usize) -> Result<Self> {
        if max_steps == 0 {
            return Err(Error::InvalidSearch(
                "max_steps must be at least 1".into(),
            ));
        }
        Ok(SearchOptions {
            max_steps: Some(max_steps),
            ..self
        })
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    /// The configured step, or half the padding, or [`DEFAULT_STEP`] when
    /// the padding is zero.
    pub fn step_for(&self, geometry: &GeometrySpec) -> f64 {
        self.step.unwrap_or_else(|| {
            if geometry.padding() > 0.0 {
                geometry.padding() / 2.0
            } else {
                DEFAULT_STEP
            }
        })
    }
}

/// Result of a search together with how much work it took.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Absolute offset to print the job at, if one was found.
    pub offset: Option<Offset>,
    pub positions_tried: usize,
    /// The step cap ran out before the search space was exhausted.
    pub truncated: bool,
}

/// Counts evaluated positions against the optional cap.
struct Budget {
    limit: Option<usize>,
    used: usize,
    exhausted: bool,
}

impl Budget {
    fn new(limit: Option<usize>) -> Self {
        Budget {
            limit,
            used: 0,
            exhausted: false,
        }
    }

    /// Claim one position. False once the cap is reached.
    fn take(&mut self) -> bool {
        if self.limit.map_or(false, |limit| self.used >= limit) {
            self.exhausted = true;
            return false;
        }
        self.used += 1;
        true
    }
}

/// Search for an offset at which `candidate` fits on the plate and
/// collides with nothing in `placed`.
pub fn search(
    candidate: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
    options: &SearchOptions,
) -> SearchOutcome {
    let mut budget = Budget::new(options.max_steps);
    let offset = match options.strategy {
        SearchStrategy::Rings => {
            let step = options.step_for(geometry);
            rings(candidate, placed, geometry, bed, step, &mut budget)
        }
        SearchStrategy::Sweep => {
            sweep_search(candidate, placed, geometry, bed, &mut budget)
        }
    };

    if budget.exhausted {
        warn!(
            "offset search stopped after {} positions without a result",
            budget.used
        );
    } else if let Some(o) = offset {
        info!(
            "found offset ({}, {}) after {} positions",
            o.dx, o.dy, budget.used
        );
    } else {
        debug!("no valid offset after {} positions", budget.used);
    }

    SearchOutcome {
        offset,
        positions_tried: budget.used,
        truncated: budget.exhausted,
    }
}

/// Offset at which `candidate` can be printed, or `None` if the search
/// finds no such position.
pub fn find_offset(
    candidate: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
    options: &SearchOptions,
) -> Option<Offset> {
    search(candidate, placed, geometry, bed, options).offset
}

fn check(
    job: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
    budget: &mut Budget,
) -> Option<bool> {
    if !budget.take() {
        return None;
    }
    Some(is_valid_placement(job, placed, geometry, bed))
}

// -- Rings ---------------------------------------------------------

/// Grid indices `k` with `lo <= k * step <= hi`, clipped to
/// `±MAX_GRID_INDEX`, or `None` if empty.
fn index_range(lo: f64, hi: f64, step: f64) -> Option<(i64, i64)> {
    let limit = MAX_GRID_INDEX as f64;
    let first = ((lo - EPSILON) / step).ceil().max(-limit);
    let last = ((hi + EPSILON) / step).floor().min(limit);
    if first > last {
        None
    } else {
        Some((first as i64, last as i64))
    }
}

/// Grid positions at Chebyshev distance `r` from the origin that lie
/// within both index ranges, nearest first by taxicab distance, then
/// lexicographically.
fn ring_positions(
    r: i64,
    xs: (i64, i64),
    ys: (i64, i64),
) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    for i in xs.0.max(-r)..=xs.1.min(r) {
        if i.abs() == r {
            for j in ys.0.max(-r)..=ys.1.min(r) {
                out.push((i, j));
            }
        } else {
            for j in [-r, r] {
                if j >= ys.0 && j <= ys.1 {
                    out.push((i, j));
                }
            }
        }
    }
    out.sort_by_key(|&(i, j)| (i.abs() + j.abs(), i, j));
    out
}

fn rings(
    candidate: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
    step: f64,
    budget: &mut Budget,
) -> Option<Offset> {
    if !bed.admits_height(candidate.height()) {
        debug!("job height {} exceeds the build volume", candidate.height());
        return None;
    }
    let rect = candidate.placed_rect();
    let plate = bed.plate();
    // Relative shifts that keep the job on the plate.
    let xs = index_range(
        plate.x_min - rect.x_min,
        plate.x_max - rect.x_max,
        step,
    )?;
    let ys = index_range(
        plate.y_min - rect.y_min,
        plate.y_max - rect.y_max,
        step,
    )?;
    let max_ring = ring_ceil(xs).max(ring_ceil(ys));
    let min_ring = ring_floor(xs).max(ring_floor(ys));
    debug!(
        "ring search: step {step}, rings {min_ring}..={max_ring}, grid {}x{}",
        xs.1 - xs.0 + 1,
        ys.1 - ys.0 + 1
    );

    let base = candidate.offset();
    for r in min_ring..=max_ring {
        for (i, j) in ring_positions(r, xs, ys) {
            let shift = Offset::new(i as f64 * step, j as f64 * step);
            let offset = base + shift;
            let job = candidate.shifted(offset);
            if check(&job, placed, geometry, bed, budget)? {
                return Some(offset);
            }
        }
    }
    None
}

/// Smallest |k| within an index range.
fn ring_floor(range: (i64, i64)) -> i64 {
    if range.0 > 0 {
        range.0
    } else if range.1 < 0 {
        -range.1
    } else {
        0
    }
}

/// Largest |k| within an index range.
fn ring_ceil(range: (i64, i64)) -> i64 {
    range.0.abs().max(range.1.abs())
}

// -- Sweep ---------------------------------------------------------

enum Scan {
    /// Clear at this shift along the travel axis.
    Found(f64),
    /// Hit both ends of the plate, or stopped making progress.
    Blocked,
    OutOfSteps,
}

/// Shift that moves the centre of `rect` onto the centre of `plate`.
fn centering_offset(rect: &Rect, plate: &Rect) -> Offset {
    let (px, py) = plate.center();
    let (rx, ry) = rect.center();
    Offset::new(px - rx, py - ry)
}

/// Merge intervals that overlap, touch, or leave less than `min_space`
/// between them.
fn condense_ranges(
    mut ranges: Vec<Interval>,
    min_space: f64,
) -> Vec<Interval> {
    ranges.sort_by(|a, b| {
        a.min.total_cmp(&b.min).then(a.max.total_cmp(&b.max))
    });
    let mut condensed: Vec<Interval> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match condensed.last_mut() {
            Some(prev) if r.min <= prev.max + min_space => {
                prev.max = prev.max.max(r.max);
            }
            _ => condensed.push(r),
        }
    }
    condensed
}

/// Bands along the gantry's travel axis that the job's own extent may
/// not enter, because the bar would then pass over a placed object tall
/// enough to reach it. Bands closer together than `min_space` are merged
/// since the job could not fit between them anyway.
fn gantry_stripes(
    placed: &[Footprint],
    geometry: &GeometrySpec,
    min_space: f64,
) -> Vec<Interval> {
    let travel = geometry.orientation().travel_axis();
    let gantry = geometry.gantry();
    let padding = geometry.padding();
    let ranges = placed
        .iter()
        .filter(|p| !p.is_degenerate())
        .filter(|p| geometry.reaches_gantry(p.height()))
        .map(|p| {
            let r = p.placed_rect().range(travel);
            Interval::new(
                r.min - gantry.xy_max - padding,
                r.max - gantry.xy_min + padding,
            )
        })
        .collect();
    condense_ranges(ranges, min_space)
}

/// Candidate shifts along the bar axis: zero, plus every shift that puts
/// an edge of `space` flush against an edge of a placed object while the
/// job stays on the plate. Sorted by magnitude, negative first on ties.
fn side_offsets(
    object: &Rect,
    space: &Rect,
    boxes: &[Rect],
    plate: &Rect,
    bar: Axis,
) -> Vec<f64> {
    let o = object.range(bar);
    let s = space.range(bar);
    let p = plate.range(bar);
    let mut offsets = vec![0.0];
    for b in boxes {
        let r = b.range(bar);
        if r.max > s.min {
            let d = r.max - s.min;
            if o.max + d <= p.max + EPSILON {
                offsets.push(d);
            }
        }
        if r.min < s.max {
            let d = r.min - s.max;
            if o.min + d >= p.min - EPSILON {
                offsets.push(d);
            }
        }
    }
    offsets.sort_by(|a, b| match a.abs().total_cmp(&b.abs()) {
        Ordering::Equal => a.total_cmp(b),
        other => other,
    });
    offsets.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
    offsets
}

struct Sweep<'a> {
    geometry: &'a GeometrySpec,
    plate: Rect,
    travel: Axis,
    boxes: &'a [Rect],
    stripes: &'a [Interval],
}

impl Sweep<'_> {
    /// Scan along the travel axis, each time jumping just far enough to
    /// clear everything hit so far, towards whichever side needs the
    /// smaller move and still fits on the plate.
    fn run(&self, object: &Rect, space: &Rect, budget: &mut Budget) -> Scan {
        let padding = self.geometry.padding();
        let head = self.geometry.printhead().range(self.travel);
        let plate = self.plate.range(self.travel);
        let o = object.range(self.travel);
        let s = space.range(self.travel);
        // Where the upper edge of the space must move down to, and the
        // lower edge up to, to clear everything seen so far.
        let mut next_min = s.max;
        let mut next_max = s.min;
        let mut shift = 0.0;

        loop {
            if !budget.take() {
                return Scan::OutOfSteps;
            }
            let here = space.translate_along(self.travel, shift);
            let job = o.translate(shift);
            let mut clear = true;
            for b in self.boxes.iter().filter(|b| here.overlaps(b)) {
                let r = b.range(self.travel);
                next_min = next_min.min(r.min);
                next_max = next_max.max(r.max);
                clear = false;
            }
            for stripe in self.stripes.iter().filter(|st| job.overlaps(st)) {
                // Stripes bound the job's own extent; convert to bounds on
                // the space around it.
                next_min = next_min.min(stripe.min + head.max + padding);
                next_max = next_max.max(stripe.max + head.min - padding);
                clear = false;
            }
            if clear {
                return Scan::Found(shift);
            }

            let down = next_min - s.max;
            let up = next_max - s.min;
            let end_min = o.min + down < plate.min - EPSILON;
            let end_max = o.max + up > plate.max + EPSILON;
            let next = if (up <= -down || end_min) && !end_max {
                up
            } else if !end_min {
                down
            } else {
                return Scan::Blocked;
            };
            if (next - shift).abs() <= EPSILON {
                return Scan::Blocked;
            }
            shift = next;
        }
    }
}

fn sweep_search(
    candidate: &Footprint,
    placed: &[Footprint],
    geometry: &GeometrySpec,
    bed: &BuildVolume,
    budget: &mut Budget,
) -> Option<Offset> {
    if check(candidate, placed, geometry, bed, budget)? {
        return Some(candidate.offset());
    }

    let plate = *bed.plate();
    let rect = candidate.placed_rect();
    if rect.width() > plate.width() + EPSILON
        || rect.depth() > plate.depth() + EPSILON
        || !bed.admits_height(candidate.height())
    {
        debug!("job is larger than the build volume");
        return None;
    }

    let mut base = candidate.offset();
    if !fits_on_bed(candidate, bed) {
        base = base + centering_offset(&rect, &plate);
        let centred = candidate.shifted(base);
        if check(&centred, placed, geometry, bed, budget)? {
            return Some(base);
        }
    }

    let object = candidate.shifted(base).placed_rect();
    let space = geometry.printhead_sweep(&object).grow(geometry.padding());
    let travel = geometry.orientation().travel_axis();
    let bar = geometry.orientation().bar_axis();
    let boxes: Vec<Rect> = placed
        .iter()
        .filter(|p| !p.is_degenerate())
        .map(|p| p.placed_rect())
        .collect();
    let min_space = object.range(travel).len();
    let stripes = gantry_stripes(placed, geometry, min_space);
    let sides = side_offsets(&object, &space, &boxes, &plate, bar);
    debug!(
        "sweep search under {} gantry: {} side offsets, {} gantry stripes",
        geometry.orientation(),
        sides.len(),
        stripes.len()
    );

    let sweep = Sweep {
        geometry,
        plate,
        travel,
        boxes: &boxes,
        stripes: &stripes,
    };
    for side in sides {
        let object = object.translate_along(bar, side);
        let space = space.translate_along(bar, side);
        match sweep.run(&object, &space, budget) {
            Scan::Found(shift) => {
                let offset = base
                    + axis_offset(bar, side)
                    + axis_offset(travel, shift);
                let job = candidate.shifted(offset);
                if is_valid_placement(&job, placed, geometry, bed) {
                    return Some(offset);
                }
                debug!(
                    "sweep result ({}, {}) failed validation",
                    offset.dx, offset.dy
                );
            }
            Scan::Blocked => {}
            Scan::OutOfSteps => return None,
        }
    }
    None
}

fn axis_offset(axis: Axis, d: f64) -> Offset {
    match axis {
        Axis::X => Offset::new(d, 0.0),
        Axis::Y => Offset::new(0.0, d),
    }
}
