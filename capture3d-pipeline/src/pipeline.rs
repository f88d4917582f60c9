//! The geometry pipeline as seen by the UI and renderer
//!
//! The free functions are the stateless entry points. [`CapturePipeline`]
//! strings them together for a capture and owns the state that must outlive a
//! single call: the generation counter and the published spatial index.

use crate::config::PipelineConfig;
use capture3d_algorithms::{
    estimate_motions, generate_levels, select_level, BuildParams, IdentityFilter, IndexParams,
    LodLevel, NoiseFilter, Octree, PointCloudBuilder, SharedIndex,
};
use capture3d_core::{Error, Frame, PointCloud, Result, SegmentationMask, TriangleMesh, Vector3f};
use capture3d_simplification::{decimate, repair_mesh as repair};
use std::sync::Arc;

/// Build a point cloud from frames, with optional per-frame motion
///
/// Each call uses a fresh generation counter, so the result is always
/// generation 1. Use [`CapturePipeline`] for increasing generations.
pub fn build_point_cloud(
    frames: &[Frame],
    motions: Option<&[Vector3f]>,
    params: &BuildParams,
) -> Result<PointCloud> {
    PointCloudBuilder::new(*params).build(frames, motions)
}

/// Build an octree over `cloud`
pub fn build_index(cloud: &PointCloud, max_depth: u32, max_leaf_size: u32) -> Result<Octree> {
    Octree::build(
        cloud,
        IndexParams {
            max_depth,
            max_points_per_leaf: max_leaf_size,
        },
    )
}

/// Produce `level_count` progressively decimated copies of `cloud`
pub fn generate_lod_levels(cloud: PointCloud, level_count: u32) -> Result<Vec<LodLevel>> {
    generate_levels(cloud, level_count)
}

/// The one level the renderer should draw at `distance`
pub fn select_active_level(levels: &[LodLevel], distance: f32) -> Result<&LodLevel> {
    levels
        .get(select_level(levels.len(), distance))
        .ok_or_else(|| Error::EmptyInput("no LOD levels to select from".to_string()))
}

/// Decimate a mesh toward `target_triangle_count`
pub fn simplify_mesh(mesh: &TriangleMesh, target_triangle_count: usize) -> Result<TriangleMesh> {
    decimate(mesh, target_triangle_count)
}

/// Fill holes and smooth
pub fn repair_mesh(mesh: &TriangleMesh) -> Result<TriangleMesh> {
    repair(mesh)
}

/// Multiply each frame's alpha by its segmentation mask
///
/// `masks[i]` applies to `frames[i]`; frames beyond the end of `masks` are
/// passed through unchanged.
pub fn apply_masks(frames: &[Frame], masks: &[SegmentationMask]) -> Result<Vec<Frame>> {
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| match masks.get(i) {
            Some(mask) => frame.apply_mask(mask),
            None => Ok(frame.clone()),
        })
        .collect()
}

/// Everything the renderer needs from one processed capture
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    pub levels: Vec<LodLevel>,
    pub index: Arc<Octree>,
}

impl CaptureOutput {
    pub fn generation(&self) -> u64 {
        self.index.generation()
    }

    pub fn active_level(&self, distance: f32) -> Result<&LodLevel> {
        select_active_level(&self.levels, distance)
    }
}

/// Runs captures through sampling, filtering, indexing and LOD generation
///
/// Stages run one after another on the calling thread. The spatial index is
/// published through a [`SharedIndex`] so renderer-side readers can keep a
/// snapshot while the next capture is processed.
pub struct CapturePipeline {
    config: PipelineConfig,
    builder: PointCloudBuilder,
    index: Arc<SharedIndex>,
    filter: Box<dyn NoiseFilter + Send + Sync>,
}

impl CapturePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: PointCloudBuilder::new(config.build),
            config,
            index: Arc::new(SharedIndex::new()),
            filter: Box::new(IdentityFilter),
        })
    }

    /// Replace the noise filter run before indexing
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: NoiseFilter + Send + Sync + 'static,
    {
        self.filter = Box::new(filter);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle readers can use to snapshot the latest index
    pub fn shared_index(&self) -> Arc<SharedIndex> {
        Arc::clone(&self.index)
    }

    /// Process still frames (no motion depth)
    pub fn process_frames(
        &mut self,
        frames: &[Frame],
        masks: Option<&[SegmentationMask]>,
    ) -> Result<CaptureOutput> {
        self.process(frames, masks, false)
    }

    /// Process consecutive video frames, using motion between them as depth
    pub fn process_video(
        &mut self,
        frames: &[Frame],
        masks: Option<&[SegmentationMask]>,
    ) -> Result<CaptureOutput> {
        self.process(frames, masks, true)
    }

    fn process(
        &mut self,
        frames: &[Frame],
        masks: Option<&[SegmentationMask]>,
        video: bool,
    ) -> Result<CaptureOutput> {
        let masked;
        let frames = match masks {
            Some(masks) => {
                masked = apply_masks(frames, masks)?;
                masked.as_slice()
            }
            None => frames,
        };

        let motions = if video {
            Some(estimate_motions(frames)?)
        } else {
            None
        };

        let cloud = self.builder.build(frames, motions.as_deref())?;
        let cloud = self.filter.filter(cloud)?;
        if cloud.is_empty() {
            return Err(Error::EmptyInput(
                "every sample was dropped by the alpha threshold or filter".to_string(),
            ));
        }

        let index = self.index.rebuild(&cloud, self.config.index)?;
        let levels = generate_levels(cloud, self.config.level_count())?;
        log::debug!(
            "capture generation {} ready: {} levels, finest {} points",
            index.generation(),
            levels.len(),
            levels.first().map(LodLevel::len).unwrap_or(0)
        );

        Ok(CaptureOutput { levels, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityTier;
    use capture3d_algorithms::RadiusOutlierFilter;

    #[test]
    fn test_select_active_level_empty() {
        assert!(matches!(
            select_active_level(&[], 3.0),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_apply_masks_passes_extra_frames_through() {
        let frames = vec![Frame::filled(1, 1, [0, 0, 0, 255]); 2];
        let masks = [SegmentationMask::new(1, 1, vec![0.0]).unwrap()];
        let masked = apply_masks(&frames, &masks).unwrap();
        assert_eq!(masked[0].pixel(0, 0)[3], 0);
        assert_eq!(masked[1], frames[1]);
    }

    #[test]
    fn test_pipeline_generations_increase() {
        let mut pipeline =
            CapturePipeline::new(PipelineConfig::for_quality(QualityTier::Medium)).unwrap();
        let frames = vec![Frame::filled(8, 8, [255, 255, 255, 255])];
        let first = pipeline.process_frames(&frames, None).unwrap();
        let second = pipeline.process_frames(&frames, None).unwrap();
        assert!(second.generation() > first.generation());
        assert_eq!(
            pipeline.shared_index().snapshot().unwrap().generation(),
            second.generation()
        );
        assert_eq!(first.levels.len(), 4);
        assert_eq!(first.levels[0].len(), 16);
    }

    #[test]
    fn test_fully_masked_capture_is_empty_input() {
        let mut pipeline = CapturePipeline::new(PipelineConfig::default()).unwrap();
        let frames = vec![Frame::filled(4, 4, [255, 255, 255, 255])];
        let masks = [SegmentationMask::new(4, 4, vec![0.0; 16]).unwrap()];
        assert!(matches!(
            pipeline.process_frames(&frames, Some(&masks[..])),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_custom_filter_runs_before_indexing() {
        let mut pipeline = CapturePipeline::new(PipelineConfig::for_quality(QualityTier::High))
            .unwrap()
            .with_filter(RadiusOutlierFilter::new(1.5, 2));
        let mut frame = Frame::filled(9, 9, [0, 0, 0, 0]);
        for y in 0..3 {
            for x in 0..3 {
                frame.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        frame.set_pixel(8, 8, [255, 255, 255, 255]);
        let output = pipeline.process_frames(&[frame], None).unwrap();
        assert_eq!(output.levels[0].len(), 9);
        assert_eq!(output.index.len(), 9);
    }

    #[test]
    fn test_video_capture_has_depth() {
        let config = PipelineConfig::for_quality(QualityTier::High).with_depth_scale(2.0);
        let mut pipeline = CapturePipeline::new(config).unwrap();
        let first = Frame::filled(4, 4, [0, 255, 255, 255]);
        let mut second = first.clone();
        second.set_pixel(3, 3, [255, 255, 255, 255]);
        let output = pipeline.process_video(&[first, second], None).unwrap();
        let finest = &output.levels[0].points;
        assert_eq!(finest.len(), 32);
        assert!(finest.iter().take(16).all(|p| p.position.z == 0.0));
        assert!(finest.iter().skip(16).all(|p| p.position.z > 0.0));
    }
}
