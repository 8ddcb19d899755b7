//! Removal of degenerate clip results.
//!
//! Intersecting a geometry with a rectangle can return pieces of a lower
//! dimension than the input: a line that leaves the envelope and bounces off
//! its edge leaves isolated points, and a polygon that only grazes the
//! envelope leaves a point or a boundary segment. None of those belong in
//! the tile.
//!
//! Every input class has an expected output dimension:
//!
//! - Point, MultiPoint → 0
//! - LineString, MultiLineString → 1
//! - Polygon, MultiPolygon → 2
//!
//! and only components with exactly that dimension survive. Dimension is the
//! sole criterion: a zero-length segment or a zero-area sliver with the right
//! dimension is kept.
//!
//! Pre-existing `GeometryCollection` inputs are not clipped as a whole.
//! Each child is clipped and filtered against its own expected dimension and
//! the survivors are wrapped back into a collection.

use geo::{Geometry, GeometryCollection};

use crate::clip::clip;
use crate::envelope::Envelope;
use crate::geometry::{dimension, is_empty, type_name, wrap_parts, Dimension};
use crate::kernel::{GeometryError, GeometryKernel};

/// What became of one geometry after clipping and filtering
#[derive(Debug, Clone, PartialEq)]
pub enum ClipOutcome {
    /// The geometry does not reach the envelope
    Outside,
    /// The geometry reaches the envelope but only degenerate pieces remain
    Degenerate,
    /// Tile-ready geometry
    Kept(Geometry<f64>),
}

impl ClipOutcome {
    /// The kept geometry, if any.
    pub fn into_geometry(self) -> Option<Geometry<f64>> {
        match self {
            ClipOutcome::Kept(geom) => Some(geom),
            ClipOutcome::Outside | ClipOutcome::Degenerate => None,
        }
    }
}

/// Keep only the parts of a raw clip result with the expected dimension.
///
/// - A non-collection result with the expected dimension is returned unchanged.
/// - A collection is searched recursively; matching components are kept.
/// - Several survivors are wrapped in the multi variant for `expected`,
///   a single survivor keeps its simple type.
/// - No survivors gives `None`.
pub fn filter_degenerate(raw: Geometry<f64>, expected: Dimension) -> Option<Geometry<f64>> {
    match raw {
        Geometry::GeometryCollection(gc) => {
            let mut survivors = Vec::new();
            collect_matching(gc, expected, &mut survivors);
            wrap_parts(expected, survivors)
        }
        other => {
            if matches_dimension(&other, expected) {
                Some(other)
            } else {
                log::trace!(
                    "dropping degenerate {} (expected dimension {})",
                    type_name(&other),
                    expected.value()
                );
                None
            }
        }
    }
}

fn matches_dimension(geom: &Geometry<f64>, expected: Dimension) -> bool {
    !is_empty(geom) && matches!(dimension(geom), Ok(Some(d)) if d == expected)
}

fn collect_matching(gc: GeometryCollection<f64>, expected: Dimension, out: &mut Vec<Geometry<f64>>) {
    for child in gc.0 {
        match child {
            Geometry::GeometryCollection(inner) => collect_matching(inner, expected, out),
            other if matches_dimension(&other, expected) => out.push(other),
            other => log::trace!("discarding {} clip artifact", type_name(&other)),
        }
    }
}

/// Clip `geom` to `envelope` and filter the result against the dimension of `geom`.
pub fn clip_and_filter<K: GeometryKernel + ?Sized>(
    kernel: &K,
    geom: &Geometry<f64>,
    envelope: &Envelope,
) -> Result<ClipOutcome, GeometryError> {
    if let Geometry::GeometryCollection(gc) = geom {
        return clip_collection(kernel, gc, envelope);
    }

    let expected = match dimension(geom)? {
        Some(dim) => dim,
        None => return Ok(ClipOutcome::Outside),
    };

    let raw = match clip(kernel, geom, envelope)? {
        Some(raw) => raw,
        None => return Ok(ClipOutcome::Outside),
    };

    Ok(match filter_degenerate(raw, expected) {
        Some(kept) => ClipOutcome::Kept(kept),
        None => ClipOutcome::Degenerate,
    })
}

/// Component-wise clip of a pre-existing collection.
///
/// Nested collections recurse. The result is `Kept` with a collection of the
/// surviving children, `Degenerate` if some child reached the envelope but
/// nothing survived, or `Outside` otherwise.
fn clip_collection<K: GeometryKernel + ?Sized>(
    kernel: &K,
    gc: &GeometryCollection<f64>,
    envelope: &Envelope,
) -> Result<ClipOutcome, GeometryError> {
    let mut kept = Vec::new();
    let mut touched = false;

    for child in &gc.0 {
        match clip_and_filter(kernel, child, envelope)? {
            ClipOutcome::Kept(geom) => kept.push(geom),
            ClipOutcome::Degenerate => touched = true,
            ClipOutcome::Outside => {}
        }
    }

    Ok(if !kept.is_empty() {
        ClipOutcome::Kept(Geometry::GeometryCollection(GeometryCollection::new_from(
            kept,
        )))
    } else if touched {
        ClipOutcome::Degenerate
    } else {
        ClipOutcome::Outside
    })
}
