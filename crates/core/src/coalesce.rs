//! Feature coalescing.
//!
//! Features in the same layer whose attribute maps are identical render the
//! same way, so they can be encoded as one feature with a multi-geometry.
//! That shrinks tiles with many small parts (building blocks, road segments
//! split at every intersection).

use geo::{Geometry, GeometryCollection};

use crate::feature::Feature;
use crate::geometry::{dimension, wrap_parts};

/// Merge features that share a layer and an identical attribute map.
///
/// Groups are emitted in the order their first member appears. A group of
/// one is returned unchanged. A larger group keeps the id, geometry name and
/// attributes of its first member and merges all member geometries:
///
/// - same dimension everywhere: the matching multi type, with multi members flattened
/// - mixed dimensions or a collection member: a `GeometryCollection` of the members
///
/// Coalescing an already coalesced set is a no-op.
pub fn coalesce(features: Vec<Feature>) -> Vec<Feature> {
    let mut groups: Vec<Vec<Feature>> = Vec::new();

    for feature in features {
        match groups.iter().position(|g| same_group(&g[0], &feature)) {
            Some(i) => groups[i].push(feature),
            None => groups.push(vec![feature]),
        }
    }

    groups.into_iter().filter_map(merge_group).collect()
}

/// Same layer and equal attribute maps, compared by value.
///
/// Attribute values may hold floats, so the map cannot be hashed; groups are
/// found by a scan over the group heads.
fn same_group(head: &Feature, feature: &Feature) -> bool {
    head.layer_name == feature.layer_name && head.attributes == feature.attributes
}

fn merge_group(mut members: Vec<Feature>) -> Option<Feature> {
    if members.len() <= 1 {
        return members.pop();
    }

    let count = members.len();
    let mut iter = members.into_iter();
    let first = iter.next()?;
    let (head, first_geometry) = split_geometry(first);

    let mut geometries = Vec::with_capacity(count);
    geometries.push(first_geometry);
    geometries.extend(iter.map(|f| f.geometry));

    log::trace!(
        "coalescing {} features into {} ({})",
        count,
        head.id,
        head.layer_name
    );

    Some(head.with_geometry(merge_geometries(geometries)))
}

/// Take the geometry out of a feature, leaving an empty collection behind.
fn split_geometry(mut feature: Feature) -> (Feature, Geometry<f64>) {
    let geometry = std::mem::replace(
        &mut feature.geometry,
        Geometry::GeometryCollection(GeometryCollection::new_from(vec![])),
    );
    (feature, geometry)
}

fn merge_geometries(geometries: Vec<Geometry<f64>>) -> Geometry<f64> {
    let mut common = None;
    let mut uniform = true;
    for geom in &geometries {
        if matches!(geom, Geometry::GeometryCollection(_)) {
            uniform = false;
            break;
        }
        match (dimension(geom), common) {
            (Ok(Some(dim)), None) => common = Some(dim),
            (Ok(Some(dim)), Some(seen)) if dim == seen => {}
            _ => {
                uniform = false;
                break;
            }
        }
    }

    match common {
        Some(dim) if uniform => match wrap_parts(dim, geometries) {
            Some(merged) => merged,
            None => Geometry::GeometryCollection(GeometryCollection::new_from(vec![])),
        },
        _ => Geometry::GeometryCollection(GeometryCollection::new_from(geometries)),
    }
}
