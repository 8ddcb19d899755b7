//! Geometry model helpers.
//!
//! The pipeline works on `geo::Geometry<f64>` but only models seven of its
//! variants: Point, MultiPoint, LineString, MultiLineString, Polygon,
//! MultiPolygon and GeometryCollection. `Line`, `Rect` and `Triangle` are
//! rejected with [`GeometryError::Unsupported`] wherever a dimension is needed.
//!
//! Every modelled variant has a topological [`Dimension`]:
//!
//! | Variant                        | Dimension |
//! |--------------------------------|-----------|
//! | Point, MultiPoint              | 0         |
//! | LineString, MultiLineString    | 1         |
//! | Polygon, MultiPolygon          | 2         |
//! | GeometryCollection             | max of its children |

use geo::{Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::kernel::GeometryError;

/// Topological dimension of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    /// Puntal geometries (0-D)
    Point,
    /// Lineal geometries (1-D)
    Line,
    /// Polygonal geometries (2-D)
    Area,
}

impl Dimension {
    /// Numeric dimension (0, 1 or 2).
    pub fn value(self) -> u8 {
        match self {
            Dimension::Point => 0,
            Dimension::Line => 1,
            Dimension::Area => 2,
        }
    }
}

/// Name of the geometry variant, used in logs and errors.
pub fn type_name(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Line(_) => "Line",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Fail fast on the `geo` variants the pipeline does not model.
pub fn ensure_supported(geom: &Geometry<f64>) -> Result<(), GeometryError> {
    match geom {
        Geometry::Line(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
            Err(GeometryError::Unsupported(type_name(geom)))
        }
        Geometry::GeometryCollection(gc) => gc.0.iter().try_for_each(ensure_supported),
        _ => Ok(()),
    }
}

/// Dimension of a geometry.
///
/// Collections report the highest dimension among their children; an empty
/// collection has no dimension and returns `Ok(None)`.
pub fn dimension(geom: &Geometry<f64>) -> Result<Option<Dimension>, GeometryError> {
    match geom {
        Geometry::Point(_) | Geometry::MultiPoint(_) => Ok(Some(Dimension::Point)),
        Geometry::LineString(_) | Geometry::MultiLineString(_) => Ok(Some(Dimension::Line)),
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(Some(Dimension::Area)),
        Geometry::GeometryCollection(gc) => {
            let mut max = None;
            for child in &gc.0 {
                max = max.max(dimension(child)?);
            }
            Ok(max)
        }
        other => Err(GeometryError::Unsupported(type_name(other))),
    }
}

/// True when the geometry has no coordinates at all.
pub fn is_empty(geom: &Geometry<f64>) -> bool {
    match geom {
        Geometry::Point(_) => false,
        Geometry::MultiPoint(mp) => mp.0.is_empty(),
        Geometry::LineString(ls) => ls.0.is_empty(),
        Geometry::MultiLineString(mls) => mls.0.iter().all(|ls| ls.0.is_empty()),
        Geometry::Polygon(poly) => poly.exterior().0.is_empty(),
        Geometry::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.is_empty()),
        Geometry::GeometryCollection(gc) => gc.0.iter().all(is_empty),
        Geometry::Line(_) | Geometry::Rect(_) | Geometry::Triangle(_) => false,
    }
}

/// Wrap same-dimension parts into the smallest geometry that holds them.
///
/// No parts gives `None`, one part is returned as is, and several parts are
/// flattened into the multi variant for `dim`. Parts whose class does not
/// match `dim` are skipped.
pub fn wrap_parts(dim: Dimension, parts: Vec<Geometry<f64>>) -> Option<Geometry<f64>> {
    if parts.len() <= 1 {
        return parts.into_iter().next();
    }

    let wrapped = match dim {
        Dimension::Point => {
            let mut points: Vec<Point<f64>> = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    Geometry::Point(p) => points.push(p),
                    Geometry::MultiPoint(mp) => points.extend(mp.0),
                    other => log::trace!("skipping {} in point wrap", type_name(&other)),
                }
            }
            Geometry::MultiPoint(MultiPoint::new(points))
        }
        Dimension::Line => {
            let mut lines: Vec<LineString<f64>> = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    Geometry::LineString(ls) => lines.push(ls),
                    Geometry::MultiLineString(mls) => lines.extend(mls.0),
                    other => log::trace!("skipping {} in line wrap", type_name(&other)),
                }
            }
            Geometry::MultiLineString(MultiLineString::new(lines))
        }
        Dimension::Area => {
            let mut polygons: Vec<Polygon<f64>> = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    Geometry::Polygon(p) => polygons.push(p),
                    Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
                    other => log::trace!("skipping {} in area wrap", type_name(&other)),
                }
            }
            Geometry::MultiPolygon(MultiPolygon::new(polygons))
        }
    };

    Some(wrapped)
}
