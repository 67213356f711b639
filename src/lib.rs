//! Collision checking for printers that start new jobs while finished
//! prints are still on the plate.
//!
//! A job is checked against the objects already placed for three hazards:
//! the object itself, the printhead body, and the gantry bar. When a job
//! collides, [`search::find_offset`] looks for a spot on the plate where it
//! can be printed instead.
//!
//! With the `python` feature the crate builds as a Python extension
//! exposing JSON-in / JSON-out functions, see [`api`].

pub mod api;
pub mod collision;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod machine;
pub mod placement;
pub mod search;
pub mod types;

pub use api::{check_collision, find_valid_offset};
pub use collision::{
    find_collision, fits_on_bed, footprints_collide, has_collision,
    is_valid_placement, BuildVolume, Collision, CollisionKind,
};
pub use error::{Error, Result};
pub use footprint::{Footprint, Offset};
pub use geometry::Rect;
pub use machine::{Gantry, GantryOrientation, GeometrySpec};
pub use placement::{check_available, Availability, PlacementPolicy};
pub use search::{
    find_offset, search, SearchOptions, SearchOutcome, SearchStrategy,
};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    use crate::api;
    use crate::error::Error;

    fn to_py_err(e: Error) -> PyErr {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
    }

    /// Check a job against the plate.
    ///
    /// Takes a JSON `CollisionRequest` and returns a JSON
    /// `CollisionResponse`.
    #[pyfunction]
    fn check_collision_json(request_json: &str) -> PyResult<String> {
        api::check_collision_json(request_json).map_err(to_py_err)
    }

    /// Search for an offset where a job fits.
    ///
    /// Takes a JSON `OffsetRequest` and returns a JSON `OffsetResponse`;
    /// `offset` is `null` when there is no room.
    #[pyfunction]
    fn find_offset_json(request_json: &str) -> PyResult<String> {
        api::find_offset_json(request_json).map_err(to_py_err)
    }

    /// Decide whether a queued job may start, repositioning it if allowed.
    #[pyfunction]
    fn check_available_json(request_json: &str) -> PyResult<String> {
        api::check_available_json(request_json).map_err(to_py_err)
    }

    /// Collision engine, importable from Python.
    #[pymodule]
    fn collision_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(check_collision_json, m)?)?;
        m.add_function(wrap_pyfunction!(find_offset_json, m)?)?;
        m.add_function(wrap_pyfunction!(check_available_json, m)?)?;
        Ok(())
    }
}
