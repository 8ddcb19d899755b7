//! Geometry clipping to the buffered request envelope.
//!
//! Clips geometries to the request envelope grown by a pixel buffer so that
//! symbols straddling the tile edge are drawn identically on both sides.
//!
//! The clipper only computes the raw intersection. That result can have a
//! lower dimension than the input (a polygon grazing the envelope leaves a
//! point or a segment behind); see [`crate::filter`] for how those leftovers
//! are removed.
//!
//! Invalid input is not repaired here. Structurally broken geometries are
//! reported as [`GeometryError::Invalid`]; fixing them is the data source's job.

use geo::Geometry;

use crate::envelope::Envelope;
use crate::geometry::type_name;
use crate::kernel::{GeometryError, GeometryKernel};

/// Clip a geometry to an already buffered envelope.
///
/// # Returns
///
/// The raw intersection, or `None` if the geometry does not reach the envelope
pub fn clip<K: GeometryKernel + ?Sized>(
    kernel: &K,
    geom: &Geometry<f64>,
    envelope: &Envelope,
) -> Result<Option<Geometry<f64>>, GeometryError> {
    let result = kernel.intersection(geom, envelope)?;
    if result.is_none() {
        log::trace!("{} lies outside the clip envelope", type_name(geom));
    }
    Ok(result)
}
