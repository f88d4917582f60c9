//! Point cloud assembly from sampled frames

use crate::motion::motion_depth;
use crate::sampling::{sample_frame, SamplerParams};
use capture3d_core::{Error, Frame, Point, PointCloud, Result, Vector3f};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for [`PointCloudBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildParams {
    pub sampler: SamplerParams,
    /// Multiplier turning motion magnitude into depth
    pub depth_scale: f32,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            sampler: SamplerParams::default(),
            depth_scale: 1.0,
        }
    }
}

/// Sample one frame, pushing samples back by motion-derived depth when given
///
/// With motion, every sample's z becomes `|motion| * depth_scale` times the
/// mean of its color channels, so brighter samples sit further along +z.
pub fn sample_with_motion(
    frame: &Frame,
    motion: Option<&Vector3f>,
    params: &BuildParams,
) -> Result<Vec<Point>> {
    let points = sample_frame(frame, &params.sampler)?;
    Ok(match motion {
        Some(motion) => {
            let depth = motion_depth(motion, params.depth_scale);
            points
                .into_iter()
                .map(|p| {
                    let z = depth * p.luminance();
                    p.with_depth(z)
                })
                .collect()
        }
        None => points,
    })
}

/// Builds point clouds from frames and hands out increasing generation ids
///
/// The generation counter lives in the builder, so whoever owns the builder
/// owns the numbering. Every successful build returns a generation strictly
/// greater than any earlier one from the same builder.
#[derive(Debug, Clone, Default)]
pub struct PointCloudBuilder {
    params: BuildParams,
    generation: u64,
}

impl PointCloudBuilder {
    pub fn new(params: BuildParams) -> Self {
        Self {
            params,
            generation: 0,
        }
    }

    pub fn params(&self) -> &BuildParams {
        &self.params
    }

    /// Generation of the most recently started build (0 before the first)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn check_inputs(&self, frames: &[Frame]) -> Result<()> {
        if frames.is_empty() {
            return Err(Error::EmptyInput("no frames to build a point cloud from".to_string()));
        }
        self.params.sampler.validate()
    }

    /// Build a cloud from all frames at once
    ///
    /// Frames are sampled in parallel; the output keeps frame order and, within
    /// a frame, sample order. `motions[i]` (when present) applies to `frames[i]`.
    pub fn build(&mut self, frames: &[Frame], motions: Option<&[Vector3f]>) -> Result<PointCloud> {
        self.check_inputs(frames)?;

        let per_frame: Vec<Vec<Point>> = frames
            .par_iter()
            .enumerate()
            .map(|(i, frame)| {
                let motion = motions.and_then(|m| m.get(i));
                sample_with_motion(frame, motion, &self.params)
            })
            .collect::<Result<_>>()?;

        let total = per_frame.iter().map(Vec::len).sum();
        let mut cloud = PointCloud::with_capacity(total);
        for points in per_frame {
            cloud.extend(points);
        }

        self.generation += 1;
        log::debug!(
            "built point cloud generation {} with {} points from {} frames",
            self.generation,
            cloud.len(),
            frames.len()
        );
        Ok(cloud.with_generation(self.generation))
    }

    /// Start a build that processes one frame per [`BuildSession::step`]
    pub fn session<'a>(
        &mut self,
        frames: &'a [Frame],
        motions: Option<&'a [Vector3f]>,
    ) -> Result<BuildSession<'a>> {
        self.check_inputs(frames)?;
        self.generation += 1;
        Ok(BuildSession {
            frames,
            motions,
            params: self.params,
            next: 0,
            points: Vec::new(),
            generation: self.generation,
        })
    }
}

/// An in-progress build that yields control between frames
///
/// Between steps the session holds only whole frames' worth of samples.
/// Dropping it discards the partial result and touches nothing else.
#[derive(Debug)]
pub struct BuildSession<'a> {
    frames: &'a [Frame],
    motions: Option<&'a [Vector3f]>,
    params: BuildParams,
    next: usize,
    points: Vec<Point>,
    generation: u64,
}

impl BuildSession<'_> {
    /// Sample the next frame; returns `false` once every frame is done
    pub fn step(&mut self) -> Result<bool> {
        let Some(frame) = self.frames.get(self.next) else {
            return Ok(false);
        };
        let motion = self.motions.and_then(|m| m.get(self.next));
        let samples = sample_with_motion(frame, motion, &self.params)?;
        log::trace!("frame {} produced {} samples", self.next, samples.len());
        self.points.extend(samples);
        self.next += 1;
        Ok(self.next < self.frames.len())
    }

    /// Frames processed so far
    pub fn frames_done(&self) -> usize {
        self.next
    }

    pub fn frames_total(&self) -> usize {
        self.frames.len()
    }

    /// Run the remaining steps and return the cloud
    pub fn finish(mut self) -> Result<PointCloud> {
        while self.step()? {}
        Ok(PointCloud::from_points(self.points).with_generation(self.generation))
    }
}
