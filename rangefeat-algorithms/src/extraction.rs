//! Per-scan feature extraction and the two-input node around it
//!
//! [`FeatureExtractor`] owns the per-point state and turns one validated
//! [`ScanFrame`] into [`FeatureClouds`]. It learns the range-image
//! dimensions exactly once and refuses frames until then.
//!
//! [`FeatureExtractionNode`] adds the host-facing behavior: dimension
//! discovery from the original cloud, frame rejection with empty output on
//! malformed input, and publication through a [`FeatureSink`] where
//! failures are logged but never stop the stream.

use crate::config::FeatureExtractionConfig;
use crate::features::{
    calculate_smoothness, mark_occluded_points, select_features, FeatureClouds, FeatureSelector,
    PointFeature,
};
use crate::filtering::VoxelGrid;
use rangefeat_core::{
    CloudInfo, Error, FeatureCloudInfo, Header, PointCloud, Positioned, Result, ScanFrame,
};
use std::time::{Duration, Instant};

/// Initialization state of an extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorState {
    /// No frame dimensions observed yet; frames are rejected
    Uninitialized,
    /// Range-image dimensions fixed for the extractor's lifetime
    Dimensioned { height: usize, width: usize },
}

/// Rate limiter for periodic log lines
#[derive(Debug)]
struct LogThrottle {
    period: Duration,
    last: Option<Instant>,
}

impl LogThrottle {
    fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Stateful per-scan feature extractor
#[derive(Debug)]
pub struct FeatureExtractor {
    config: FeatureExtractionConfig,
    selector: FeatureSelector,
    state: ExtractorState,
    features: Vec<PointFeature>,
    last_frame_len: usize,
    summary_throttle: LogThrottle,
}

impl FeatureExtractor {
    /// Build an extractor; an invalid configuration is refused here so no
    /// frame is ever processed with meaningless thresholds.
    pub fn new(config: FeatureExtractionConfig) -> Result<Self> {
        config.validate()?;

        let downsampler =
            VoxelGrid::new(config.planar_voxel_leaf_size, config.voxel_representative)?;
        log::debug!(
            "Planar voxel leaf {} m, {:?} representative",
            downsampler.leaf_size(),
            downsampler.representative()
        );

        let selector = FeatureSelector {
            edge_threshold: config.edge_threshold,
            surf_threshold: config.surf_threshold,
            params: config.selection,
            downsampler,
        };

        Ok(Self {
            config,
            selector,
            state: ExtractorState::Uninitialized,
            features: Vec::new(),
            last_frame_len: 0,
            summary_throttle: LogThrottle::new(Duration::from_secs(1)),
        })
    }

    pub fn config(&self) -> &FeatureExtractionConfig {
        &self.config
    }

    pub fn state(&self) -> ExtractorState {
        self.state
    }

    pub fn is_dimensioned(&self) -> bool {
        matches!(self.state, ExtractorState::Dimensioned { .. })
    }

    /// Record the range-image dimensions.
    ///
    /// Only the first observation takes effect; it sizes the per-point state
    /// once. Returns whether this call performed the transition.
    pub fn observe_dimensions(&mut self, height: usize, width: usize) -> Result<bool> {
        if self.is_dimensioned() {
            return Ok(false);
        }
        if height == 0 || width == 0 {
            return Err(Error::InvalidData(format!(
                "scan dimensions must be non-zero, got {}x{}",
                height, width
            )));
        }

        let capacity = height.checked_mul(width).ok_or_else(|| {
            Error::InvalidData(format!("scan dimensions {}x{} overflow", height, width))
        })?;

        self.features = vec![PointFeature::default(); capacity];
        self.state = ExtractorState::Dimensioned { height, width };
        log::info!("First scan height: {} width: {}", height, width);
        Ok(true)
    }

    /// Per-point state left by the most recent successfully processed frame
    pub fn point_features(&self) -> &[PointFeature] {
        &self.features[..self.last_frame_len]
    }

    /// Score, filter and select the features of one frame
    pub fn extract<T: Positioned>(&mut self, frame: &ScanFrame<T>) -> Result<FeatureClouds<T>> {
        let ExtractorState::Dimensioned { height, width } = self.state else {
            return Err(Error::Uninitialized);
        };
        self.last_frame_len = 0;
        frame.validate(height, width)?;

        let n = frame.len();
        let features = &mut self.features[..n];
        calculate_smoothness(&frame.range[..n], features);
        let columns = &frame.column_index[..n];
        mark_occluded_points(&frame.range[..n], columns, features, &self.selector.params);
        let clouds = select_features(frame, features, &self.selector)?;
        self.last_frame_len = n;

        if self.summary_throttle.ready() {
            log::info!(
                "rings: {} points: {} corners: {} surf: {}",
                height,
                n,
                clouds.corner_cloud.len(),
                clouds.surface_cloud.len()
            );
        }

        Ok(clouds)
    }
}

/// Destination of the extracted features
pub trait FeatureSink<T> {
    /// Whether anyone consumes the standalone corner/surface clouds
    fn has_subscribers(&self) -> bool {
        true
    }

    fn publish_corners(&mut self, header: &Header, cloud: &PointCloud<T>) -> Result<()>;

    fn publish_surfaces(&mut self, header: &Header, cloud: &PointCloud<T>) -> Result<()>;

    fn publish_info(&mut self, info: FeatureCloudInfo<T>) -> Result<()>;
}

/// Sink that keeps everything it receives
#[derive(Debug, Clone)]
pub struct MemorySink<T> {
    pub corners: Vec<(Header, PointCloud<T>)>,
    pub surfaces: Vec<(Header, PointCloud<T>)>,
    pub infos: Vec<FeatureCloudInfo<T>>,
}

impl<T> MemorySink<T> {
    pub fn new() -> Self {
        Self {
            corners: Vec::new(),
            surfaces: Vec::new(),
            infos: Vec::new(),
        }
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FeatureSink<T> for MemorySink<T> {
    fn publish_corners(&mut self, header: &Header, cloud: &PointCloud<T>) -> Result<()> {
        self.corners.push((header.clone(), cloud.clone()));
        Ok(())
    }

    fn publish_surfaces(&mut self, header: &Header, cloud: &PointCloud<T>) -> Result<()> {
        self.surfaces.push((header.clone(), cloud.clone()));
        Ok(())
    }

    fn publish_info(&mut self, info: FeatureCloudInfo<T>) -> Result<()> {
        self.infos.push(info);
        Ok(())
    }
}

/// Feature extraction stage wired to a sink
#[derive(Debug)]
pub struct FeatureExtractionNode<S> {
    extractor: FeatureExtractor,
    sink: S,
    frame_id: String,
}

impl<S> FeatureExtractionNode<S> {
    pub fn new(config: FeatureExtractionConfig, sink: S) -> Result<Self> {
        let frame_id = config.frame_id();
        let extractor = FeatureExtractor::new(config)?;
        log::info!("Feature extraction initialized, publishing in frame {}", frame_id);
        Ok(Self { extractor, sink, frame_id })
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Handle an original (organized) cloud; only its dimensions matter and
    /// only the first one is used.
    pub fn on_original_cloud(&mut self, height: usize, width: usize) -> Result<()> {
        if !self.extractor.observe_dimensions(height, width)? {
            log::debug!("Ignoring original cloud {}x{}, dimensions already known", height, width);
        }
        Ok(())
    }

    /// Handle one deskewed cloud-info record.
    ///
    /// Frames arriving before the dimensions are known are rejected with
    /// [`Error::Uninitialized`]. A malformed frame is reported and answered
    /// with empty feature clouds. Publication failures are logged only.
    pub fn on_cloud_info<T>(&mut self, msg: CloudInfo<T>) -> Result<()>
    where
        T: Positioned,
        S: FeatureSink<T>,
    {
        let clouds = match self.extractor.extract(&msg.frame) {
            Ok(clouds) => clouds,
            Err(Error::Uninitialized) => {
                log::warn!(
                    "Dropping cloud info at {:.3}: scan dimensions not known yet",
                    msg.header.stamp
                );
                return Err(Error::Uninitialized);
            }
            Err(e @ Error::MalformedFrame(_)) => {
                log::warn!("Rejecting cloud info at {:.3}: {}", msg.header.stamp, e);
                FeatureClouds::default()
            }
            Err(e) => return Err(e),
        };

        self.publish(msg, clouds);
        Ok(())
    }

    fn publish<T>(&mut self, msg: CloudInfo<T>, clouds: FeatureClouds<T>)
    where
        S: FeatureSink<T>,
    {
        let header = Header {
            stamp: msg.header.stamp,
            frame_id: self.frame_id.clone(),
        };

        if self.sink.has_subscribers() {
            if let Err(e) = self.sink.publish_corners(&header, &clouds.corner_cloud) {
                log::error!("Failed to publish corner cloud: {}", e);
            }
            if let Err(e) = self.sink.publish_surfaces(&header, &clouds.surface_cloud) {
                log::error!("Failed to publish surface cloud: {}", e);
            }
        }

        let info = msg.into_feature_info(clouds.corner_cloud, clouds.surface_cloud);
        if let Err(e) = self.sink.publish_info(info) {
            log::error!("Failed to publish cloud info: {}", e);
        }
    }
}
