//! Vector-tile geometry pipeline.
//!
//! Takes the features returned by a spatial query for one tile/map request and
//! turns them into tile-ready features for a binary tile encoder:
//!
//! 1. Optionally simplify each geometry to a pixel tolerance
//! 2. Clip it to the request envelope grown by a style-derived pixel buffer
//! 3. Drop the degenerate pieces the clip leaves behind (stray points and
//!    boundary segments where an area only grazes the envelope)
//! 4. Optionally coalesce features with identical attributes
//! 5. Optionally derive interior label points for area features
//!
//! Encoding, caching and the data source are left to the caller.
//!
//! # Examples
//!
//! ```
//! use geo::{line_string, Geometry};
//! use tilepipe_core::{Envelope, Feature, PlanarKernel, TilePipeline, TileRequest};
//!
//! let request = TileRequest::new(Envelope::new(0.0, 0.0, 10.0, 10.0), 256, 256);
//! let pipeline = TilePipeline::new(request, PlanarKernel).unwrap();
//!
//! let road = Feature::new(
//!     "roads",
//!     "roads.1",
//!     Geometry::LineString(line_string![(x: -5.0, y: 5.0), (x: 5.0, y: 5.0)]),
//! );
//! let features = pipeline.process(vec![road]).unwrap();
//! assert_eq!(features.len(), 1);
//! ```

use thiserror::Error;

pub mod clip;
pub mod coalesce;
pub mod envelope;
pub mod feature;
pub mod filter;
pub mod geometry;
pub mod kernel;
pub mod label;
pub mod pipeline;
pub mod simplify;

pub use envelope::{compute_buffer, Envelope};
pub use feature::{AttributeValue, Feature};
pub use geometry::Dimension;
pub use kernel::{GeometryError, GeometryKernel, PlanarKernel};
pub use pipeline::{
    FeatureSink, PipelineConfig, PipelineState, PipelineStats, TilePipeline, TileRequest,
};

/// Errors that can occur while running the tile pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    #[error("Unsupported geometry type {kind} at feature {feature_id}")]
    UnsupportedGeometry {
        feature_id: String,
        kind: &'static str,
    },

    #[error("Invalid tile request: {0}")]
    InvalidRequest(String),

    #[error("Feature sink failed: {0}")]
    Sink(String),
}

impl Error {
    /// Attach a feature id to a kernel failure.
    pub fn from_geometry(feature_id: &str, err: GeometryError) -> Self {
        match err {
            GeometryError::Invalid(reason) => Error::InvalidGeometry {
                feature_id: feature_id.to_string(),
                reason,
            },
            GeometryError::Unsupported(kind) => Error::UnsupportedGeometry {
                feature_id: feature_id.to_string(),
                kind,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
