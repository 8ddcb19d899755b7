//! Geometry kernel used by the pipeline stages.
//!
//! The pipeline never builds geometry on its own; it asks a [`GeometryKernel`]
//! for intersections and interior points. A kernel handle is passed to every
//! stage explicitly, so each request can own one (or share an immutable one)
//! without any global state.
//!
//! [`PlanarKernel`] is the default implementation on top of `geo`. Its
//! intersection behaves like a full overlay engine for the one case the
//! pipeline needs, geometry ∩ axis-aligned rectangle, including the
//! lower-dimension leftovers such an engine reports:
//!
//! - a line that only touches the envelope yields a `Point`
//! - a polygon that only touches the envelope at a corner yields a `Point`
//! - a polygon sharing an edge with the envelope from outside yields a `LineString`
//! - mixed results come back as a `GeometryCollection`
//!
//! Removing those leftovers is the job of [`crate::filter`], not the kernel.

use std::iter;

use geo::{
    BooleanOps, BoundingRect, Coord, Geometry, GeometryCollection, InteriorPoint, Intersects,
    LineString, MultiPolygon, Point, Polygon,
};
use thiserror::Error;

use crate::envelope::Envelope;
use crate::geometry::{ensure_supported, type_name, wrap_parts, Dimension};

/// Failures reported by a geometry kernel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// The input is structurally broken and cannot be intersected
    #[error("invalid geometry: {0}")]
    Invalid(String),

    /// The input uses a variant the pipeline does not model
    #[error("unsupported geometry type {0}")]
    Unsupported(&'static str),
}

/// Geometry operations the pipeline relies on.
pub trait GeometryKernel {
    /// Intersect `geom` with `envelope`.
    ///
    /// Returns `Ok(None)` when the intersection is empty. The result may have
    /// a lower dimension than the input or mix dimensions.
    fn intersection(
        &self,
        geom: &Geometry<f64>,
        envelope: &Envelope,
    ) -> Result<Option<Geometry<f64>>, GeometryError>;

    /// A point guaranteed to lie in the interior of `geom`, if any.
    fn interior_point(&self, geom: &Geometry<f64>) -> Option<Point<f64>>;
}

impl<K: GeometryKernel + ?Sized> GeometryKernel for &K {
    fn intersection(
        &self,
        geom: &Geometry<f64>,
        envelope: &Envelope,
    ) -> Result<Option<Geometry<f64>>, GeometryError> {
        (**self).intersection(geom, envelope)
    }

    fn interior_point(&self, geom: &Geometry<f64>) -> Option<Point<f64>> {
        (**self).interior_point(geom)
    }
}

/// Planar kernel backed by `geo`.
///
/// Stateless; cheap to copy and safe to share between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarKernel;

impl GeometryKernel for PlanarKernel {
    fn intersection(
        &self,
        geom: &Geometry<f64>,
        envelope: &Envelope,
    ) -> Result<Option<Geometry<f64>>, GeometryError> {
        ensure_supported(geom)?;
        validate_geometry(geom)?;
        Ok(intersect(geom, envelope))
    }

    fn interior_point(&self, geom: &Geometry<f64>) -> Option<Point<f64>> {
        geom.interior_point()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check that a geometry is structurally usable.
///
/// Rejects non-finite coordinates, linestrings with a single coordinate and
/// non-empty rings with fewer than 4 coordinates. Self-intersections are not
/// rejected; the boolean overlay resolves them.
pub fn validate_geometry(geom: &Geometry<f64>) -> Result<(), GeometryError> {
    match geom {
        Geometry::Point(p) => validate_coord(&p.0, "Point"),
        Geometry::MultiPoint(mp) => mp
            .0
            .iter()
            .try_for_each(|p| validate_coord(&p.0, "MultiPoint")),
        Geometry::LineString(ls) => validate_line(ls),
        Geometry::MultiLineString(mls) => mls.0.iter().try_for_each(validate_line),
        Geometry::Polygon(poly) => validate_polygon(poly),
        Geometry::MultiPolygon(mp) => {
            for (i, poly) in mp.0.iter().enumerate() {
                validate_polygon(poly).map_err(|e| match e {
                    GeometryError::Invalid(reason) => {
                        GeometryError::Invalid(format!("polygon at index {}: {}", i, reason))
                    }
                    other => other,
                })?;
            }
            Ok(())
        }
        Geometry::GeometryCollection(gc) => gc.0.iter().try_for_each(validate_geometry),
        other => Err(GeometryError::Unsupported(type_name(other))),
    }
}

fn validate_coord(c: &Coord<f64>, owner: &str) -> Result<(), GeometryError> {
    if c.x.is_finite() && c.y.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::Invalid(format!(
            "{} has non-finite coordinates",
            owner
        )))
    }
}

fn validate_line(ls: &LineString<f64>) -> Result<(), GeometryError> {
    if ls.0.len() == 1 {
        return Err(GeometryError::Invalid(
            "LineString must have 0 or at least 2 points".to_string(),
        ));
    }
    for (i, coord) in ls.0.iter().enumerate() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(GeometryError::Invalid(format!(
                "LineString has non-finite coordinate at index {}",
                i
            )));
        }
    }
    Ok(())
}

fn validate_polygon(poly: &Polygon<f64>) -> Result<(), GeometryError> {
    validate_ring(poly.exterior(), "exterior ring")?;
    for (i, interior) in poly.interiors().iter().enumerate() {
        validate_ring(interior, &format!("interior ring at index {}", i))?;
    }

    Ok(())
}

fn validate_ring(ring: &LineString<f64>, ring_name: &str) -> Result<(), GeometryError> {
    let coords = &ring.0;
    if coords.is_empty() {
        return Ok(());
    }

    // 3 distinct points + closing point
    if coords.len() < 4 {
        return Err(GeometryError::Invalid(format!(
            "{} must have at least 3 distinct points",
            ring_name
        )));
    }

    for (idx, coord) in coords.iter().enumerate() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(GeometryError::Invalid(format!(
                "{} has a non-finite coordinate at index {}",
                ring_name, idx
            )));
        }
    }

    Ok(())
}

// ============================================================================
// Rectangle intersection
// ============================================================================

/// Pieces of an intersection result, grouped by dimension.
#[derive(Debug, Default)]
struct Pieces {
    polygons: Vec<Polygon<f64>>,
    lines: Vec<LineString<f64>>,
    points: Vec<Point<f64>>,
}

impl Pieces {
    fn push_point(&mut self, p: Point<f64>) {
        if !self.points.contains(&p) {
            self.points.push(p);
        }
    }

    /// Drop points that lie on one of the collected lines.
    fn drop_covered_points(&mut self) {
        let lines = &self.lines;
        self.points
            .retain(|p| !lines.iter().any(|line| line.intersects(p)));
    }

    /// Assemble the pieces the way an overlay engine reports them: one
    /// component keeps its simple type, several same-dimension components
    /// become a multi type, mixed dimensions become a collection ordered
    /// areas, lines, points.
    fn into_geometry(mut self) -> Option<Geometry<f64>> {
        self.drop_covered_points();

        let kinds = [
            !self.polygons.is_empty(),
            !self.lines.is_empty(),
            !self.points.is_empty(),
        ];

        match kinds {
            [false, false, false] => None,
            [true, false, false] => wrap_parts(
                Dimension::Area,
                self.polygons.into_iter().map(Geometry::Polygon).collect(),
            ),
            [false, true, false] => wrap_parts(
                Dimension::Line,
                self.lines.into_iter().map(Geometry::LineString).collect(),
            ),
            [false, false, true] => wrap_parts(
                Dimension::Point,
                self.points.into_iter().map(Geometry::Point).collect(),
            ),
            _ => {
                let mut parts: Vec<Geometry<f64>> = Vec::with_capacity(
                    self.polygons.len() + self.lines.len() + self.points.len(),
                );
                parts.extend(self.polygons.into_iter().map(Geometry::Polygon));
                parts.extend(self.lines.into_iter().map(Geometry::LineString));
                parts.extend(self.points.into_iter().map(Geometry::Point));
                Some(Geometry::GeometryCollection(GeometryCollection::new_from(
                    parts,
                )))
            }
        }
    }
}

fn intersect(geom: &Geometry<f64>, envelope: &Envelope) -> Option<Geometry<f64>> {
    if let Geometry::GeometryCollection(gc) = geom {
        let parts: Vec<Geometry<f64>> = gc
            .0
            .iter()
            .filter_map(|child| intersect(child, envelope))
            .collect();
        return if parts.is_empty() {
            None
        } else {
            Some(Geometry::GeometryCollection(GeometryCollection::new_from(
                parts,
            )))
        };
    }

    // Quick rejection test; empty geometries have no bounding box
    let rect = geom.bounding_rect()?;
    if !envelope.intersects_rect(&rect) {
        return None;
    }

    // FAST PATH: fully inside, nothing to cut
    if envelope.contains_rect(&rect) {
        return Some(geom.clone());
    }

    let mut pieces = Pieces::default();
    match geom {
        Geometry::Point(p) => {
            if envelope.contains_coord(&p.0) {
                pieces.push_point(*p);
            }
        }
        Geometry::MultiPoint(mp) => {
            for p in &mp.0 {
                if envelope.contains_coord(&p.0) {
                    pieces.push_point(*p);
                }
            }
        }
        Geometry::LineString(ls) => clip_line(ls, envelope, &mut pieces),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                clip_line(ls, envelope, &mut pieces);
            }
        }
        Geometry::Polygon(poly) => clip_area(std::slice::from_ref(poly), envelope, &mut pieces),
        Geometry::MultiPolygon(mp) => clip_area(&mp.0, envelope, &mut pieces),
        other => {
            log::trace!("no rectangle intersection for {}", type_name(other));
            return None;
        }
    }

    pieces.into_geometry()
}

/// Clip a segment with Liang-Barsky.
///
/// Returns the clipped start and end, which are equal when the segment only
/// touches the envelope. Computed entry/exit points are clamped onto the
/// envelope so they never fall outside it.
fn clip_segment(a: Coord<f64>, b: Coord<f64>, env: &Envelope) -> Option<(Coord<f64>, Coord<f64>)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let edges = [
        (-dx, a.x - env.min_x),
        (dx, env.max_x - a.x),
        (-dy, a.y - env.min_y),
        (dy, env.max_y - a.y),
    ];

    for (p, q) in edges {
        if p == 0.0 {
            // parallel to this edge
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return None;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }

    let at = |t: f64| -> Coord<f64> {
        if t <= 0.0 {
            a
        } else if t >= 1.0 {
            b
        } else {
            env.clamp(Coord {
                x: a.x + t * dx,
                y: a.y + t * dy,
            })
        }
    };

    Some((at(t0), at(t1)))
}

/// Clip a linestring, joining consecutive inside segments into runs.
fn clip_line(ls: &LineString<f64>, env: &Envelope, pieces: &mut Pieces) {
    fn flush(run: &mut Vec<Coord<f64>>, lines: &mut Vec<LineString<f64>>) {
        if run.len() >= 2 {
            lines.push(LineString::new(std::mem::take(run)));
        } else {
            run.clear();
        }
    }

    let mut run: Vec<Coord<f64>> = Vec::new();

    for seg in ls.lines() {
        match clip_segment(seg.start, seg.end, env) {
            None => flush(&mut run, &mut pieces.lines),
            Some((s, e)) if s == e => {
                // repeated vertex inside a run
                if seg.start == seg.end && run.last() == Some(&s) {
                    continue;
                }
                flush(&mut run, &mut pieces.lines);
                pieces.push_point(Point::from(s));
            }
            Some((s, e)) => {
                if run.last() != Some(&s) {
                    flush(&mut run, &mut pieces.lines);
                    run.push(s);
                }
                run.push(e);
                // exits the envelope
                if e != seg.end {
                    flush(&mut run, &mut pieces.lines);
                }
            }
        }
    }

    flush(&mut run, &mut pieces.lines);
}

fn on_boundary(c: &Coord<f64>, env: &Envelope) -> bool {
    c.x == env.min_x || c.x == env.max_x || c.y == env.min_y || c.y == env.max_y
}

/// True if every segment of the line runs along one envelope edge.
fn runs_along_boundary(line: &LineString<f64>, env: &Envelope) -> bool {
    line.lines().all(|seg| {
        (seg.start.x == env.min_x && seg.end.x == env.min_x)
            || (seg.start.x == env.max_x && seg.end.x == env.max_x)
            || (seg.start.y == env.min_y && seg.end.y == env.min_y)
            || (seg.start.y == env.max_y && seg.end.y == env.max_y)
    })
}

fn line_covered_by(line: &LineString<f64>, area: &MultiPolygon<f64>) -> bool {
    line.lines().all(|seg| {
        area.intersects(&Point::from(seg.start))
            && area.intersects(&Point::from(seg.end))
            && area.intersects(&Point::from(seg.start + (seg.end - seg.start) / 2.0))
    })
}

/// Clip polygons: the area part comes from the boolean overlay, and the
/// boundary contacts it misses come from clipping every ring as a line.
///
/// Each member is overlaid on its own, so overlapping members keep their
/// overlap just as they do when the whole input lies inside the envelope.
fn clip_area(polygons: &[Polygon<f64>], env: &Envelope, pieces: &mut Pieces) {
    let clip_poly = env.to_rect().to_polygon();
    let area = MultiPolygon::new(
        polygons
            .iter()
            .flat_map(|poly| poly.intersection(&clip_poly).0)
            .filter(|p| !p.exterior().0.is_empty())
            .collect(),
    );

    let mut contacts = Pieces::default();
    for poly in polygons {
        for ring in iter::once(poly.exterior()).chain(poly.interiors()) {
            clip_line(ring, env, &mut contacts);
        }
    }
    contacts.drop_covered_points();

    // Ring pieces strictly inside the envelope bound the area part; only
    // pieces lying on the envelope boundary can be left uncovered.
    for line in contacts.lines {
        if runs_along_boundary(&line, env) && !line_covered_by(&line, &area) {
            pieces.lines.push(line);
        }
    }
    for p in contacts.points {
        if on_boundary(&p.0, env) && !area.intersects(&p) {
            pieces.push_point(p);
        }
    }

    pieces.polygons.extend(area.0);
}
