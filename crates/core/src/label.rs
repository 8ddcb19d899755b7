//! Label-point extraction for area features.
//!
//! Renderers place polygon labels at a point inside the polygon. Computing
//! that point on the client is expensive and clipped polygons give different
//! answers in neighbouring tiles, so the pipeline can emit it up front as a
//! separate point feature in a companion layer.

use geo::{Geometry, Point};

use crate::feature::Feature;
use crate::kernel::GeometryKernel;

/// Suffix appended to the parent layer name for label features
pub const DEFAULT_LABEL_SUFFIX: &str = "_labels";

/// Interior point of an area geometry.
///
/// Uses the kernel's interior point rather than the centroid, which can fall
/// outside concave shapes. Returns `None` for non-area geometries.
pub fn label_point<K: GeometryKernel + ?Sized>(
    kernel: &K,
    geom: &Geometry<f64>,
) -> Option<Point<f64>> {
    match geom {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => kernel.interior_point(geom),
        _ => None,
    }
}

/// Build label features for every area feature in `features`.
///
/// - Polygon: one label, same id as the parent
/// - MultiPolygon: one label per part, id `<parent id>.<part index>`
/// - anything else: no label
///
/// Labels go to layer `<parent layer><suffix>` and copy the parent's
/// attributes and geometry name.
pub fn label_features<K: GeometryKernel + ?Sized>(
    kernel: &K,
    features: &[Feature],
    suffix: &str,
) -> Vec<Feature> {
    let mut labels = Vec::new();

    for feature in features {
        match &feature.geometry {
            Geometry::Polygon(_) => {
                if let Some(point) = label_point(kernel, &feature.geometry) {
                    labels.push(label_for(feature, feature.id.clone(), point, suffix));
                }
            }
            Geometry::MultiPolygon(mp) => {
                for (idx, poly) in mp.0.iter().enumerate() {
                    let part = Geometry::Polygon(poly.clone());
                    if let Some(point) = label_point(kernel, &part) {
                        let id = format!("{}.{}", feature.id, idx);
                        labels.push(label_for(feature, id, point, suffix));
                    }
                }
            }
            _ => {}
        }
    }

    log::trace!("extracted {} label points", labels.len());
    labels
}

fn label_for(parent: &Feature, id: String, point: Point<f64>, suffix: &str) -> Feature {
    Feature::new(
        format!("{}{}", parent.layer_name, suffix),
        id,
        Geometry::Point(point),
    )
    .with_geometry_name(parent.geometry_name.clone())
    .with_attributes(parent.attributes.clone())
}
