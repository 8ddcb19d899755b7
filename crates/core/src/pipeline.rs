//! Tile pipeline - wires together simplification, clipping, degenerate-result
//! filtering, coalescing and label extraction for one tile request.
//!
//! The pipeline:
//! 1. Computes the buffered clip envelope once per request
//! 2. Streams the input features through simplify → clip → filter
//! 3. Optionally coalesces the survivors
//! 4. Optionally appends label points for area features
//! 5. Emits everything to a [`FeatureSink`] in order
//!
//! A pipeline owns nothing but its request, its config and a kernel handle.
//! It holds no state between calls, so one instance can serve the same
//! request from several threads when the kernel allows it.

use serde::{Deserialize, Serialize};

use crate::coalesce::coalesce;
use crate::envelope::{compute_buffer, Envelope, DEFAULT_BUFFER_PIXELS};
use crate::feature::Feature;
use crate::filter::{clip_and_filter, ClipOutcome};
use crate::kernel::GeometryKernel;
use crate::label::{label_features, DEFAULT_LABEL_SUFFIX};
use crate::simplify::{ground_tolerance, simplify_geometry};
use crate::{Error, Result};

/// Renderer oversampling factor used when the request does not set one
pub const DEFAULT_OVERSAMPLE: f64 = 1.0;

/// Target CRS used when the request does not name one
pub const DEFAULT_CRS: &str = "EPSG:3857";

fn default_oversample() -> f64 {
    DEFAULT_OVERSAMPLE
}

fn default_crs() -> String {
    DEFAULT_CRS.to_string()
}

/// Parameters of one map/tile render.
///
/// Immutable for the duration of a render. Built with [`TileRequest::new`]
/// and the `with_*` methods, or deserialized from JSON where everything but
/// the envelope and image size is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRequest {
    /// Requested area, in the CRS of the geometries
    pub envelope: Envelope,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Pixel buffer declared by the style; `None` falls back to the config default
    #[serde(default)]
    pub buffer_pixels: Option<f64>,
    /// Renderer oversampling factor
    #[serde(default = "default_oversample")]
    pub oversample: f64,
    /// Target CRS identifier, carried through for the encoder
    #[serde(default = "default_crs")]
    pub crs: String,
    /// Merge features with identical attributes
    #[serde(default)]
    pub coalesce: bool,
    /// Emit label points for area features
    #[serde(default)]
    pub labels: bool,
    /// Douglas-Peucker tolerance in pixels, applied before clipping
    #[serde(default)]
    pub simplify_tolerance_px: Option<f64>,
}

impl TileRequest {
    /// Create a request with no buffer override, no coalescing, no labels
    /// and no simplification.
    pub fn new(envelope: Envelope, width: u32, height: u32) -> Self {
        Self {
            envelope,
            width,
            height,
            buffer_pixels: None,
            oversample: DEFAULT_OVERSAMPLE,
            crs: default_crs(),
            coalesce: false,
            labels: false,
            simplify_tolerance_px: None,
        }
    }

    /// Set the style pixel buffer.
    pub fn with_buffer(mut self, buffer_pixels: f64) -> Self {
        self.buffer_pixels = Some(buffer_pixels);
        self
    }

    /// Set the oversampling factor.
    pub fn with_oversample(mut self, oversample: f64) -> Self {
        self.oversample = oversample;
        self
    }

    /// Set the target CRS identifier.
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = crs.into();
        self
    }

    /// Enable or disable coalescing.
    pub fn with_coalesce(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }

    /// Enable or disable label-point extraction.
    pub fn with_labels(mut self, labels: bool) -> Self {
        self.labels = labels;
        self
    }

    /// Simplify geometries to the given pixel tolerance before clipping.
    pub fn with_simplify_tolerance(mut self, tolerance_px: f64) -> Self {
        self.simplify_tolerance_px = Some(tolerance_px);
        self
    }
}

/// Deployment-wide pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pixel buffer used when neither the request nor the style declares one
    pub default_buffer_pixels: f64,
    /// Suffix appended to a layer name to form its label layer name
    pub label_suffix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_buffer_pixels: DEFAULT_BUFFER_PIXELS,
            label_suffix: DEFAULT_LABEL_SUFFIX.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Set the default pixel buffer.
    pub fn with_default_buffer(mut self, buffer_pixels: f64) -> Self {
        self.default_buffer_pixels = buffer_pixels;
        self
    }

    /// Set the label layer suffix.
    pub fn with_label_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.label_suffix = suffix.into();
        self
    }
}

/// Stage a pipeline run is in.
///
/// Clipping and filtering are fused into one streaming pass over the input;
/// the run reports `Filtering` once that pass has drained the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Clipping,
    Filtering,
    Coalescing,
    LabelExtraction,
    Emitting,
}

impl PipelineState {
    /// The state that follows this one; disabled stages are skipped.
    pub fn next(self, coalesce: bool, labels: bool) -> Self {
        match self {
            PipelineState::Idle => PipelineState::Clipping,
            PipelineState::Clipping => PipelineState::Filtering,
            PipelineState::Filtering if coalesce => PipelineState::Coalescing,
            PipelineState::Filtering | PipelineState::Coalescing if labels => {
                PipelineState::LabelExtraction
            }
            PipelineState::Filtering
            | PipelineState::Coalescing
            | PipelineState::LabelExtraction => PipelineState::Emitting,
            PipelineState::Emitting => PipelineState::Idle,
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Features pulled from the input
    pub input: usize,
    /// Features whose geometry does not reach the clip envelope
    pub outside: usize,
    /// Features whose clip left only degenerate pieces
    pub degenerate: usize,
    /// Features absorbed into another by coalescing
    pub coalesced: usize,
    /// Label features added
    pub labels: usize,
    /// Features handed to the sink
    pub emitted: usize,
}

/// Consumer of tile-ready features, typically a vector-tile encoder.
pub trait FeatureSink {
    fn emit(&mut self, feature: Feature) -> Result<()>;
}

impl FeatureSink for Vec<Feature> {
    fn emit(&mut self, feature: Feature) -> Result<()> {
        self.push(feature);
        Ok(())
    }
}

/// Geometry pipeline bound to one tile request.
#[derive(Debug, Clone)]
pub struct TilePipeline<K> {
    request: TileRequest,
    config: PipelineConfig,
    kernel: K,
    clip_envelope: Envelope,
    simplify_tolerance: Option<f64>,
}

impl<K: GeometryKernel> TilePipeline<K> {
    /// Create a pipeline with the default [`PipelineConfig`].
    pub fn new(request: TileRequest, kernel: K) -> Result<Self> {
        Self::with_config(request, kernel, PipelineConfig::default())
    }

    /// Create a pipeline, validating the request and computing the buffered
    /// clip envelope.
    pub fn with_config(request: TileRequest, kernel: K, config: PipelineConfig) -> Result<Self> {
        let style_buffer = request.buffer_pixels.or(Some(config.default_buffer_pixels));
        let buffer = compute_buffer(
            style_buffer,
            request.width,
            request.height,
            &request.envelope,
            request.oversample,
        )?;
        let clip_envelope = request.envelope.buffered(buffer);

        let simplify_tolerance = match request.simplify_tolerance_px {
            Some(px) if !px.is_finite() || px < 0.0 => {
                return Err(Error::InvalidRequest(format!(
                    "simplification tolerance must be a non-negative number, got {}",
                    px
                )));
            }
            Some(px) if px > 0.0 => Some(ground_tolerance(px, &request.envelope, request.width)),
            _ => None,
        };

        log::debug!(
            "tile pipeline for {:?} at {}x{} ({}): buffer {} ground units, simplify {:?}",
            request.envelope,
            request.width,
            request.height,
            request.crs,
            buffer,
            simplify_tolerance
        );

        Ok(Self {
            request,
            config,
            kernel,
            clip_envelope,
            simplify_tolerance,
        })
    }

    pub fn request(&self) -> &TileRequest {
        &self.request
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The request envelope grown by the pixel buffer.
    pub fn clip_envelope(&self) -> &Envelope {
        &self.clip_envelope
    }

    /// Lazily simplify, clip and filter `features`.
    ///
    /// Features are pulled from the input one at a time, so dropping the
    /// returned iterator stops consumption of the input.
    pub fn clipped<I>(&self, features: I) -> ClippedFeatures<'_, K, I::IntoIter>
    where
        I: IntoIterator<Item = Feature>,
    {
        ClippedFeatures {
            pipeline: self,
            features: features.into_iter(),
            stats: PipelineStats::default(),
        }
    }

    /// Run the whole pipeline and collect the output.
    pub fn process<I>(&self, features: I) -> Result<Vec<Feature>>
    where
        I: IntoIterator<Item = Feature>,
    {
        let mut out = Vec::new();
        self.run(features, &mut out)?;
        Ok(out)
    }

    /// Run the whole pipeline, handing the output to `sink`.
    ///
    /// Fails on the first invalid geometry or sink error; nothing after the
    /// failing feature is processed.
    pub fn run<I, S>(&self, features: I, sink: &mut S) -> Result<PipelineStats>
    where
        I: IntoIterator<Item = Feature>,
        S: FeatureSink + ?Sized,
    {
        let mut state = self.advance(PipelineState::Idle);

        let mut clipped = self.clipped(features);
        let mut kept = Vec::new();
        for feature in &mut clipped {
            kept.push(feature?);
        }
        let mut stats = clipped.stats();

        state = self.advance(state);
        state = self.advance(state);

        if state == PipelineState::Coalescing {
            let before = kept.len();
            kept = coalesce(kept);
            stats.coalesced = before - kept.len();
            state = self.advance(state);
        }

        if state == PipelineState::LabelExtraction {
            let labels = label_features(&self.kernel, &kept, &self.config.label_suffix);
            stats.labels = labels.len();
            kept.extend(labels);
            state = self.advance(state);
        }

        for feature in kept {
            sink.emit(feature)?;
            stats.emitted += 1;
        }
        self.advance(state);

        log::debug!(
            "tile pipeline done: {} in, {} outside, {} degenerate, {} coalesced, {} labels, {} out",
            stats.input,
            stats.outside,
            stats.degenerate,
            stats.coalesced,
            stats.labels,
            stats.emitted
        );

        Ok(stats)
    }

    fn advance(&self, state: PipelineState) -> PipelineState {
        let next = state.next(self.request.coalesce, self.request.labels);
        log::debug!("pipeline state {:?} -> {:?}", state, next);
        next
    }

    fn clip_feature(&self, feature: &Feature) -> Result<ClipOutcome> {
        let simplified;
        let geometry = match self.simplify_tolerance {
            Some(tolerance) => {
                simplified = simplify_geometry(&feature.geometry, tolerance);
                &simplified
            }
            None => &feature.geometry,
        };

        clip_and_filter(&self.kernel, geometry, &self.clip_envelope)
            .map_err(|e| Error::from_geometry(&feature.id, e))
    }
}

/// Lazy simplify/clip/filter stream returned by [`TilePipeline::clipped`].
///
/// Yields `Err` for a feature whose geometry the kernel rejects; the caller
/// decides whether to stop or to keep pulling.
pub struct ClippedFeatures<'a, K, I> {
    pipeline: &'a TilePipeline<K>,
    features: I,
    stats: PipelineStats,
}

impl<K, I> ClippedFeatures<'_, K, I> {
    /// Counters so far. Only `input`, `outside` and `degenerate` are filled.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}

impl<K, I> Iterator for ClippedFeatures<'_, K, I>
where
    K: GeometryKernel,
    I: Iterator<Item = Feature>,
{
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        for feature in self.features.by_ref() {
            self.stats.input += 1;
            match self.pipeline.clip_feature(&feature) {
                Ok(ClipOutcome::Kept(geometry)) => {
                    return Some(Ok(feature.with_geometry(geometry)));
                }
                Ok(ClipOutcome::Outside) => {
                    self.stats.outside += 1;
                    log::trace!("feature {} is outside the tile", feature.id);
                }
                Ok(ClipOutcome::Degenerate) => {
                    self.stats.degenerate += 1;
                    log::trace!("feature {} dropped as degenerate", feature.id);
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::PlanarKernel;
    use geo::{line_string, point, polygon, Geometry, Intersects, Polygon};
    use std::cell::Cell;
    use std::iter;

    fn env10() -> Envelope {
        Envelope::new(0.0, 0.0, 10.0, 10.0)
    }

    fn pipeline(request: TileRequest) -> TilePipeline<PlanarKernel> {
        TilePipeline::new(request, PlanarKernel).unwrap()
    }

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    // ========== TileRequest / PipelineConfig Tests ==========

    #[test]
    fn test_tile_request_defaults() {
        let request = TileRequest::new(env10(), 256, 256);
        assert_eq!(request.buffer_pixels, None);
        assert_eq!(request.oversample, DEFAULT_OVERSAMPLE);
        assert_eq!(request.crs, DEFAULT_CRS);
        assert!(!request.coalesce);
        assert!(!request.labels);
        assert_eq!(request.simplify_tolerance_px, None);
    }

    #[test]
    fn test_tile_request_builder() {
        let request = TileRequest::new(env10(), 512, 256)
            .with_buffer(16.0)
            .with_oversample(2.0)
            .with_crs("EPSG:4326")
            .with_coalesce(true)
            .with_labels(true)
            .with_simplify_tolerance(0.5);

        assert_eq!(request.width, 512);
        assert_eq!(request.height, 256);
        assert_eq!(request.buffer_pixels, Some(16.0));
        assert_eq!(request.oversample, 2.0);
        assert_eq!(request.crs, "EPSG:4326");
        assert!(request.coalesce);
        assert!(request.labels);
        assert_eq!(request.simplify_tolerance_px, Some(0.5));
    }

    #[test]
    fn test_tile_request_from_json() {
        let json = r#"{
            "envelope": {"min_x": 0.0, "min_y": 0.0, "max_x": 10.0, "max_y": 10.0},
            "width": 256,
            "height": 256,
            "buffer_pixels": 8.0,
            "labels": true
        }"#;
        let request: TileRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.envelope, env10());
        assert_eq!(request.buffer_pixels, Some(8.0));
        assert_eq!(request.oversample, DEFAULT_OVERSAMPLE);
        assert_eq!(request.crs, DEFAULT_CRS);
        assert!(request.labels);
        assert!(!request.coalesce);
    }

    #[test]
    fn test_pipeline_config_from_partial_json() {
        let config: PipelineConfig = serde_json::from_str(r#"{"label_suffix": "_pts"}"#).unwrap();
        assert_eq!(config.label_suffix, "_pts");
        assert_eq!(config.default_buffer_pixels, DEFAULT_BUFFER_PIXELS);
    }

    // ========== Construction Tests ==========

    #[test]
    fn test_clip_envelope_is_buffered() {
        // 10 units over 100 px = 0.1 units per pixel
        let p = pipeline(TileRequest::new(env10(), 100, 100).with_buffer(5.0));
        let env = p.clip_envelope();
        assert!((env.min_x + 0.5).abs() < 1e-12);
        assert!((env.max_y - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_config_default_buffer_applies_without_style_buffer() {
        let config = PipelineConfig::default().with_default_buffer(10.0);
        let p = TilePipeline::with_config(TileRequest::new(env10(), 100, 100), PlanarKernel, config)
            .unwrap();
        assert!((p.clip_envelope().max_x - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        let bad_size = TileRequest::new(env10(), 0, 256);
        assert!(matches!(
            TilePipeline::new(bad_size, PlanarKernel),
            Err(Error::InvalidRequest(_))
        ));

        let bad_tolerance = TileRequest::new(env10(), 256, 256).with_simplify_tolerance(-1.0);
        assert!(matches!(
            TilePipeline::new(bad_tolerance, PlanarKernel),
            Err(Error::InvalidRequest(_))
        ));
    }

    // ========== State Machine Tests ==========

    fn walk(coalesce: bool, labels: bool) -> Vec<PipelineState> {
        let mut states = vec![PipelineState::Idle];
        let mut state = PipelineState::Idle;
        loop {
            state = state.next(coalesce, labels);
            states.push(state);
            if state == PipelineState::Idle {
                return states;
            }
        }
    }

    #[test]
    fn test_state_sequence_all_stages() {
        use PipelineState::*;
        assert_eq!(
            walk(true, true),
            vec![Idle, Clipping, Filtering, Coalescing, LabelExtraction, Emitting, Idle]
        );
    }

    #[test]
    fn test_state_sequence_skips_disabled_stages() {
        use PipelineState::*;
        assert_eq!(walk(false, false), vec![Idle, Clipping, Filtering, Emitting, Idle]);
        assert_eq!(
            walk(false, true),
            vec![Idle, Clipping, Filtering, LabelExtraction, Emitting, Idle]
        );
        assert_eq!(
            walk(true, false),
            vec![Idle, Clipping, Filtering, Coalescing, Emitting, Idle]
        );
    }

    // ========== Processing Tests ==========

    #[test]
    fn test_process_drops_outside_and_degenerate() {
        let p = pipeline(TileRequest::new(env10(), 256, 256));
        let features = vec![
            Feature::new(
                "roads",
                "inside",
                Geometry::LineString(line_string![(x: 1.0, y: 1.0), (x: 2.0, y: 2.0)]),
            ),
            Feature::new(
                "roads",
                "touching",
                Geometry::LineString(line_string![(x: -1.0, y: -1.0), (x: 0.0, y: 0.0)]),
            ),
            Feature::new("pois", "outside", Geometry::Point(point!(x: 50.0, y: 50.0))),
        ];

        let mut out = Vec::new();
        let stats = p.run(features, &mut out).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "inside");
        assert_eq!(
            stats,
            PipelineStats {
                input: 3,
                outside: 1,
                degenerate: 1,
                coalesced: 0,
                labels: 0,
                emitted: 1,
            }
        );
    }

    #[test]
    fn test_process_preserves_input_order_and_metadata() {
        let p = pipeline(TileRequest::new(env10(), 256, 256));
        let features = vec![
            Feature::new("a", "1", Geometry::Point(point!(x: 1.0, y: 1.0)))
                .with_attribute("k", 1_i64),
            Feature::new("b", "2", Geometry::Point(point!(x: 2.0, y: 2.0)))
                .with_geometry_name("the_geom"),
        ];

        let out = p.process(features.clone()).unwrap();
        assert_eq!(out, features);
    }

    #[test]
    fn test_process_with_coalesce_and_labels() {
        let request = TileRequest::new(env10(), 256, 256)
            .with_coalesce(true)
            .with_labels(true);
        let p = pipeline(request);

        let features = vec![
            Feature::new("parks", "p.1", Geometry::Polygon(square(1.0, 1.0, 2.0)))
                .with_attribute("kind", "park"),
            Feature::new("parks", "p.2", Geometry::Polygon(square(5.0, 5.0, 2.0)))
                .with_attribute("kind", "park"),
        ];

        let mut out = Vec::new();
        let stats = p.run(features, &mut out).unwrap();

        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.labels, 2);
        assert_eq!(stats.emitted, 3);

        assert_eq!(out[0].layer_name, "parks");
        assert!(matches!(out[0].geometry, Geometry::MultiPolygon(_)));

        // labels come after the area features
        assert_eq!(out[1].layer_name, "parks_labels");
        assert_eq!(out[1].id, "p.1.0");
        assert_eq!(out[2].id, "p.1.1");
        match (&out[1].geometry, &out[2].geometry) {
            (Geometry::Point(a), Geometry::Point(b)) => {
                assert!(square(1.0, 1.0, 2.0).intersects(a));
                assert!(square(5.0, 5.0, 2.0).intersects(b));
            }
            other => panic!("Expected label points, got {:?}", other),
        }
    }

    #[test]
    fn test_labels_use_clipped_geometry() {
        let request = TileRequest::new(env10(), 256, 256).with_labels(true);
        let p = pipeline(request);
        let big = Feature::new("land", "l.1", Geometry::Polygon(square(-50.0, -50.0, 55.0)));

        let out = p.process(vec![big]).unwrap();
        assert_eq!(out.len(), 2);
        match &out[1].geometry {
            Geometry::Point(pt) => assert!(env10().contains_coord(&pt.0)),
            other => panic!("Expected Point, got {:?}", other),
        }
    }

    #[test]
    fn test_simplification_runs_before_clipping() {
        let coords: Vec<(f64, f64)> = (0..=100)
            .map(|i| (i as f64 * 0.1, 5.0 + if i % 2 == 0 { 0.001 } else { -0.001 }))
            .collect();
        let line = Geometry::LineString(coords.into());

        let plain = pipeline(TileRequest::new(env10(), 10, 10));
        let simplified = pipeline(TileRequest::new(env10(), 10, 10).with_simplify_tolerance(1.0));

        let count = |p: &TilePipeline<PlanarKernel>| match &p
            .process(vec![Feature::new("l", "1", line.clone())])
            .unwrap()[0]
            .geometry
        {
            Geometry::LineString(ls) => ls.0.len(),
            other => panic!("Expected LineString, got {:?}", other),
        };

        assert_eq!(count(&plain), 101);
        assert!(count(&simplified) < 10);
    }

    // ========== Error Tests ==========

    #[test]
    fn test_invalid_geometry_reports_feature_id() {
        let p = pipeline(TileRequest::new(env10(), 256, 256));
        let features = vec![
            Feature::new("ok", "1", Geometry::Point(point!(x: 1.0, y: 1.0))),
            Feature::new("bad", "bad.7", Geometry::Point(point!(x: f64::NAN, y: 1.0))),
        ];

        match p.process(features) {
            Err(Error::InvalidGeometry { feature_id, .. }) => assert_eq!(feature_id, "bad.7"),
            other => panic!("Expected InvalidGeometry, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_geometry_reports_kind() {
        let p = pipeline(TileRequest::new(env10(), 256, 256));
        let rect = geo::Rect::new(geo::coord! { x: 1.0, y: 1.0 }, geo::coord! { x: 2.0, y: 2.0 });
        let features = vec![Feature::new("r", "r.1", Geometry::Rect(rect))];

        match p.process(features) {
            Err(Error::UnsupportedGeometry { feature_id, kind }) => {
                assert_eq!(feature_id, "r.1");
                assert_eq!(kind, "Rect");
            }
            other => panic!("Expected UnsupportedGeometry, got {:?}", other),
        }
    }

    struct FailingSink {
        accepted: usize,
    }

    impl FeatureSink for FailingSink {
        fn emit(&mut self, _feature: Feature) -> Result<()> {
            if self.accepted == 1 {
                return Err(Error::Sink("encoder buffer full".to_string()));
            }
            self.accepted += 1;
            Ok(())
        }
    }

    #[test]
    fn test_sink_error_stops_emission() {
        let p = pipeline(TileRequest::new(env10(), 256, 256));
        let features: Vec<Feature> = (0..3)
            .map(|i| Feature::new("pts", i.to_string(), Geometry::Point(point!(x: 1.0, y: 1.0))))
            .collect();

        let mut sink = FailingSink { accepted: 0 };
        assert!(matches!(p.run(features, &mut sink), Err(Error::Sink(_))));
        assert_eq!(sink.accepted, 1);
    }

    // ========== Streaming Tests ==========

    #[test]
    fn test_clipped_stream_stops_pulling_when_dropped() {
        let p = pipeline(TileRequest::new(env10(), 256, 256));
        let pulled = Cell::new(0usize);
        let endless = iter::repeat_with(|| {
            pulled.set(pulled.get() + 1);
            Feature::new("pts", "p", Geometry::Point(point!(x: 1.0, y: 1.0)))
        });

        let first_two: Vec<Feature> = p.clipped(endless).take(2).map(|r| r.unwrap()).collect();
        assert_eq!(first_two.len(), 2);
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_clipped_stream_counts() {
        let p = pipeline(TileRequest::new(env10(), 256, 256));
        let features = vec![
            Feature::new("a", "1", Geometry::Point(point!(x: 1.0, y: 1.0))),
            Feature::new("a", "2", Geometry::Point(point!(x: 20.0, y: 1.0))),
        ];

        let mut stream = p.clipped(features);
        let kept: Vec<Feature> = stream.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(stream.stats().input, 2);
        assert_eq!(stream.stats().outside, 1);
    }

    #[test]
    fn test_pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TilePipeline<PlanarKernel>>();
    }
}
