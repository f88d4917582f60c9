//! Noise filtering stage and its background worker
//!
//! Filters run between cloud building and LOD generation. The default filter
//! is the identity; [`RadiusOutlierFilter`] drops isolated samples. A
//! [`FilterWorker`] runs any filter off the calling thread with single-shot,
//! cancellable requests.

use crate::octree::{IndexParams, Octree};
use capture3d_core::{Error, NearestNeighborSearch, PointCloud, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A point cloud filter applied before LOD generation
///
/// Filters consume the cloud and return a new one, preserving its generation.
pub trait NoiseFilter {
    fn filter(&self, cloud: PointCloud) -> Result<PointCloud>;
}

/// Returns the cloud unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFilter;

impl NoiseFilter for IdentityFilter {
    fn filter(&self, cloud: PointCloud) -> Result<PointCloud> {
        Ok(cloud)
    }
}

/// Radius outlier removal
///
/// Removes points that have fewer than `min_neighbors` other points within
/// `radius`. Neighbor counts come from an octree over the cloud.
///
/// # Example
/// ```rust
/// use capture3d_core::{Point, Point3f, PointCloud};
/// use capture3d_algorithms::{NoiseFilter, RadiusOutlierFilter};
///
/// fn main() -> capture3d_core::Result<()> {
///     let cloud: PointCloud = [
///         Point3f::new(0.0, 0.0, 0.0),
///         Point3f::new(0.1, 0.0, 0.0),
///         Point3f::new(0.0, 0.1, 0.0),
///         Point3f::new(10.0, 10.0, 10.0), // outlier
///     ]
///     .into_iter()
///     .map(|p| Point::new(p, [1.0; 3], 1.0))
///     .collect();
///
///     let filtered = RadiusOutlierFilter::new(0.5, 2).filter(cloud)?;
///     assert_eq!(filtered.len(), 3);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusOutlierFilter {
    pub radius: f32,
    pub min_neighbors: usize,
    pub index: IndexParams,
}

impl RadiusOutlierFilter {
    pub fn new(radius: f32, min_neighbors: usize) -> Self {
        Self {
            radius,
            min_neighbors,
            index: IndexParams::default(),
        }
    }
}

impl NoiseFilter for RadiusOutlierFilter {
    fn filter(&self, cloud: PointCloud) -> Result<PointCloud> {
        if !(self.radius > 0.0) {
            return Err(Error::InvalidParameter("radius must be positive".to_string()));
        }
        if self.min_neighbors == 0 {
            return Err(Error::InvalidParameter(
                "min_neighbors must be greater than 0".to_string(),
            ));
        }
        if cloud.is_empty() {
            return Ok(cloud);
        }

        let tree = Octree::build(&cloud, self.index)?;
        let keep: Vec<bool> = cloud
            .points
            .par_iter()
            .map(|point| {
                // the point itself is always within the radius
                let found = tree.find_radius_neighbors(&point.position, self.radius);
                found.len().saturating_sub(1) >= self.min_neighbors
            })
            .collect();

        let generation = cloud.generation;
        let before = cloud.len();
        let points: Vec<_> = cloud
            .into_iter()
            .zip(keep)
            .filter_map(|(point, keep)| keep.then_some(point))
            .collect();
        log::debug!("radius filter kept {} of {} points", points.len(), before);

        Ok(PointCloud::from_points(points).with_generation(generation))
    }
}

struct FilterJob {
    cloud: PointCloud,
    cancelled: Arc<AtomicBool>,
    reply: flume::Sender<Result<PointCloud>>,
}

/// Runs a [`NoiseFilter`] on a dedicated thread
///
/// Each [`FilterWorker::submit`] is one request with one reply. Requests are
/// served in submission order. Dropping the worker finishes queued requests
/// and joins the thread.
pub struct FilterWorker {
    requests: Option<flume::Sender<FilterJob>>,
    handle: Option<JoinHandle<()>>,
}

impl FilterWorker {
    pub fn spawn<F>(filter: F) -> Self
    where
        F: NoiseFilter + Send + 'static,
    {
        let (requests, jobs) = flume::unbounded::<FilterJob>();
        let handle = std::thread::spawn(move || {
            for job in jobs.iter() {
                let outcome = if job.cancelled.load(Ordering::Acquire) {
                    Err(Error::Cancelled)
                } else {
                    filter.filter(job.cloud)
                };
                // the ticket may already be gone
                let _ = job.reply.send(outcome);
            }
        });

        Self {
            requests: Some(requests),
            handle: Some(handle),
        }
    }

    /// Queue `cloud` for filtering
    pub fn submit(&self, cloud: PointCloud) -> Result<FilterTicket> {
        let (reply, response) = flume::bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let job = FilterJob {
            cloud,
            cancelled: Arc::clone(&cancelled),
            reply,
        };
        self.requests
            .as_ref()
            .ok_or(Error::Cancelled)?
            .send(job)
            .map_err(|_| Error::Cancelled)?;
        Ok(FilterTicket {
            cancelled,
            response,
        })
    }
}

impl Drop for FilterWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("filter worker thread panicked");
            }
        }
    }
}

/// Handle to one pending filter request
#[derive(Debug)]
pub struct FilterTicket {
    cancelled: Arc<AtomicBool>,
    response: flume::Receiver<Result<PointCloud>>,
}

impl FilterTicket {
    /// Abandon the request; a later `wait` returns `Cancelled`
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The result if the worker has already replied
    pub fn try_result(&self) -> Option<Result<PointCloud>> {
        if self.is_cancelled() {
            return Some(Err(Error::Cancelled));
        }
        self.response.try_recv().ok()
    }

    /// Block until the worker replies
    pub fn wait(self) -> Result<PointCloud> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let outcome = self.response.recv().unwrap_or(Err(Error::Cancelled));
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        outcome
    }
}
