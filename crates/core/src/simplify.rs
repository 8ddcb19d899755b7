//! Resolution-based geometry simplification.
//!
//! Uses the Ramer-Douglas-Peucker (RDP) algorithm via `geo::Simplify` to drop
//! vertices that cannot be told apart at the rendered resolution. The
//! tolerance is given in pixels and converted to ground units with the same
//! ground-per-pixel ratio the buffer calculation uses, so a 1 px tolerance
//! removes detail smaller than one rendered pixel.
//!
//! Simplification runs before clipping: the clipper then cuts fewer segments
//! and the cut points on the envelope edge are exact.

use geo::{Geometry, GeometryCollection, LineString, MultiLineString, MultiPolygon, Polygon, Simplify};

use crate::envelope::Envelope;

/// Convert a pixel tolerance into ground units for a request.
///
/// `tolerance_px * envelope.width() / width_px`; a zero image width gives 0.
pub fn ground_tolerance(tolerance_px: f64, envelope: &Envelope, width_px: u32) -> f64 {
    if width_px == 0 {
        return 0.0;
    }
    tolerance_px * envelope.width() / width_px as f64
}

/// Simplify a geometry with a ground-unit tolerance.
///
/// Points and MultiPoints pass through unchanged since they have no vertices
/// to reduce. Collections are simplified member by member.
///
/// Rings are simplified one at a time; a ring that would collapse below a
/// valid ring (4 coordinates) is kept as it was, so simplification never
/// turns an area into something the kernel rejects.
pub fn simplify_geometry(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return geom.clone();
    }

    match geom {
        Geometry::Point(_) | Geometry::MultiPoint(_) => geom.clone(),
        Geometry::LineString(ls) => Geometry::LineString(simplify_line(ls, tolerance)),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
            mls.0.iter().map(|ls| simplify_line(ls, tolerance)).collect(),
        )),
        Geometry::Polygon(poly) => Geometry::Polygon(simplify_polygon(poly, tolerance)),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
            mp.0.iter().map(|p| simplify_polygon(p, tolerance)).collect(),
        )),
        Geometry::GeometryCollection(gc) => {
            Geometry::GeometryCollection(GeometryCollection::new_from(
                gc.0.iter().map(|g| simplify_geometry(g, tolerance)).collect(),
            ))
        }
        // Line, Rect and Triangle are rejected downstream
        other => other.clone(),
    }
}

fn simplify_line(ls: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    // geo::Simplify needs at least 2 points; shorter lines are reported by validation
    if ls.0.len() < 2 {
        return ls.clone();
    }
    ls.simplify(&tolerance)
}

fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    if ring.0.len() <= 4 {
        return ring.clone();
    }
    let simplified = ring.simplify(&tolerance);
    if simplified.0.len() < 4 {
        ring.clone()
    } else {
        simplified
    }
}

fn simplify_polygon(poly: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    Polygon::new(
        simplify_ring(poly.exterior(), tolerance),
        poly.interiors()
            .iter()
            .map(|ring| simplify_ring(ring, tolerance))
            .collect(),
    )
}
