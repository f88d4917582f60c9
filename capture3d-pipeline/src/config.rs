//! Pipeline configuration
//!
//! Every knob is an explicit field; the only defaults are the ones written in
//! the `Default` impls below.

use capture3d_algorithms::{BuildParams, IndexParams, SamplerParams};
use capture3d_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Preview quality requested by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    /// Sparse sampling, few levels
    Low,
    /// Balanced density and level count
    Medium,
    /// Every pixel sampled, most levels
    High,
}

impl QualityTier {
    /// Number of LOD levels generated at this tier
    pub fn level_count(self) -> u32 {
        match self {
            QualityTier::Low => 3,
            QualityTier::Medium => 4,
            QualityTier::High => 5,
        }
    }

    /// Frame sampling stride at this tier
    pub fn stride(self) -> u32 {
        match self {
            QualityTier::Low => 4,
            QualityTier::Medium => 2,
            QualityTier::High => 1,
        }
    }
}

/// Configuration for [`crate::CapturePipeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub quality: QualityTier,
    pub build: BuildParams,
    pub index: IndexParams,
    /// Use this many levels instead of the tier's count
    pub level_count_override: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_quality(QualityTier::Medium)
    }
}

impl PipelineConfig {
    /// Configuration whose stride and level count follow `quality`
    pub fn for_quality(quality: QualityTier) -> Self {
        Self {
            quality,
            build: BuildParams {
                sampler: SamplerParams {
                    stride: quality.stride(),
                    ..SamplerParams::default()
                },
                ..BuildParams::default()
            },
            index: IndexParams::default(),
            level_count_override: None,
        }
    }

    pub fn with_alpha_threshold(mut self, alpha_threshold: f32) -> Self {
        self.build.sampler.alpha_threshold = alpha_threshold;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.build.sampler.scale = scale;
        self
    }

    pub fn with_depth_scale(mut self, depth_scale: f32) -> Self {
        self.build.depth_scale = depth_scale;
        self
    }

    pub fn with_level_count(mut self, level_count: u32) -> Self {
        self.level_count_override = Some(level_count);
        self
    }

    /// Levels to generate
    pub fn level_count(&self) -> u32 {
        self.level_count_override
            .unwrap_or_else(|| self.quality.level_count())
    }

    pub fn validate(&self) -> Result<()> {
        self.build.sampler.validate()?;
        self.index.validate()?;
        if !self.build.depth_scale.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "depth scale must be finite, got {}",
                self.build.depth_scale
            )));
        }
        if self.level_count() == 0 {
            return Err(Error::InvalidParameter("level count must be at least 1".to_string()));
        }
        Ok(())
    }
}
