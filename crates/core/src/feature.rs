//! Feature and attribute model.
//!
//! A [`Feature`] is what the data source hands to the pipeline and what the
//! pipeline hands to the tile encoder: a layer name, an id, the name of the
//! geometry attribute, the geometry itself and a map of scalar attributes.

use std::collections::BTreeMap;

use geo::Geometry;
use serde::{Deserialize, Serialize};

/// Geometry attribute name used when the data source does not provide one
pub const DEFAULT_GEOMETRY_NAME: &str = "geometry";

/// A scalar attribute value that a vector tile can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Float(f32),
    Double(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Null,
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(d: f64) -> Self {
        AttributeValue::Double(d)
    }
}

impl From<f32> for AttributeValue {
    fn from(f: f32) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<u64> for AttributeValue {
    fn from(u: u64) -> Self {
        AttributeValue::UInt(u)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

/// Attribute map. Keys are unique; ordering carries no meaning.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A single feature flowing through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Logical layer the feature is encoded into
    pub layer_name: String,
    /// Feature id as reported by the data source
    pub id: String,
    /// Name of the geometry attribute
    pub geometry_name: String,
    pub geometry: Geometry<f64>,
    pub attributes: Attributes,
}

impl Feature {
    /// Create a feature with no attributes and the default geometry name.
    pub fn new(layer_name: impl Into<String>, id: impl Into<String>, geometry: Geometry<f64>) -> Self {
        Self {
            layer_name: layer_name.into(),
            id: id.into(),
            geometry_name: DEFAULT_GEOMETRY_NAME.to_string(),
            geometry,
            attributes: Attributes::new(),
        }
    }

    /// Set the geometry attribute name.
    pub fn with_geometry_name(mut self, name: impl Into<String>) -> Self {
        self.geometry_name = name.into();
        self
    }

    /// Add or replace an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Replace the whole attribute map.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Same feature with a different geometry.
    pub fn with_geometry(mut self, geometry: Geometry<f64>) -> Self {
        self.geometry = geometry;
        self
    }
}
