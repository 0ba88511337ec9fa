//! Renderer - the per-frame orchestrator.
//!
//! One frame:
//!
//! ```text
//! snapshot camera ─► update skip node ─► LOD constants
//!        │
//!        ▼
//! cast every pixel in parallel ──requests──► AdaptiveSubdivider (async)
//!        │
//!        ▼
//! post-process (colors, depths) ─► every N frames: BrickManager::unify_bricks
//! ```
//!
//! Subdivision runs concurrently with rendering and across frames. Brick
//! unification only runs between frames, when no ray is in flight.

use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;

use glam::DVec3;
use rayon::prelude::*;
use web_time::Instant;

use crate::bricks::{BrickManager, UnifyStats};
use crate::camera::{CameraProvider, CameraSnapshot};
use crate::color::positional_color;
use crate::config::RenderConfig;
use crate::constants::{BACKGROUND, NO_HIT};
use crate::error::{OctreeError, Result};
use crate::lod::LodConstants;
use crate::octree::{NodeBox, NodeId, Octree};
use crate::oracle::FractalOracle;
use crate::skip_node::SkipNode;
use crate::subdivider::{AdaptiveSubdivider, SubdivisionQueue, SubdivisionStats};
use crate::traversal::Traversal;

/// Screen-space pass run over the finished frame.
pub trait PostProcess: Send {
  /// `colors` and `depth` are row-major, `width * height` long. Misses have
  /// depth [`NO_HIT`].
  fn apply(&mut self, colors: &mut [u32], depth: &[f64], width: u32, height: u32);
}

/// What one call to [`Renderer::render_frame`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
  /// 1 for the first frame.
  pub frame_index: u64,
  pub rays: u64,
  pub hits: u64,
  pub misses: u64,
  /// Requests accepted by the subdivision queue during the frame.
  pub subdivisions_queued: u64,
  /// Pixels painted background because their ray hit a broken tree.
  pub consistency_errors: u64,
  pub duration: Duration,
  /// Set on frames that ended with brick unification.
  pub unify: Option<UnifyStats>,
}

#[derive(Clone, Copy, Default)]
struct Tally {
  hits: u64,
  misses: u64,
  errors: u64,
}

impl AddAssign for Tally {
  fn add_assign(&mut self, other: Self) {
    self.hits += other.hits;
    self.misses += other.misses;
    self.errors += other.errors;
  }
}

/// Owns the tree and its workers and renders frames from camera snapshots.
pub struct Renderer {
  config: RenderConfig,
  tree: Arc<Octree>,
  bricks: Arc<BrickManager>,
  queue: SubdivisionQueue,
  subdivider: AdaptiveSubdivider,
  pool: rayon::ThreadPool,
  skip: SkipNode,
  frame_index: u64,
  depth: Vec<f64>,
  opt_tmin: f64,
  post: Option<Box<dyn PostProcess>>,
}

impl Renderer {
  /// Renderer over a fresh tree whose root is one full leaf.
  pub fn new(config: RenderConfig, oracle: Arc<dyn FractalOracle>) -> Result<Self> {
    config.validate()?;
    let tree = Arc::new(Octree::with_capacity(
      positional_color(DVec3::ZERO),
      config.arena_groups,
    ));
    Self::with_tree(config, tree, oracle)
  }

  /// Renderer over an existing tree.
  pub fn with_tree(
    config: RenderConfig,
    tree: Arc<Octree>,
    oracle: Arc<dyn FractalOracle>,
  ) -> Result<Self> {
    config.validate()?;
    let bricks = Arc::new(BrickManager::new(Arc::clone(&tree), config.unify_threads)?);
    let (subdivider, queue) = AdaptiveSubdivider::spawn(
      Arc::clone(&tree),
      oracle,
      Arc::clone(&bricks),
      config.subdivider(),
    )?;
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(config.render_threads)
      .thread_name(|i| format!("render-{i}"))
      .build()
      .map_err(|source| OctreeError::ThreadPool {
        pool: "render",
        source,
      })?;

    tracing::info!(
      width = config.width,
      height = config.height,
      strategy = %config.strategy,
      render_threads = pool.current_num_threads(),
      subdivision_threads = subdivider.threads(),
      "renderer ready"
    );

    let depth = if config.depth_buffer {
      vec![NO_HIT; config.pixel_count()]
    } else {
      Vec::new()
    };
    Ok(Self {
      config,
      tree,
      bricks,
      queue,
      subdivider,
      pool,
      skip: SkipNode::new(),
      frame_index: 0,
      depth,
      opt_tmin: 0.0,
      post: None,
    })
  }

  /// Run `post` over every frame. Needs the depth buffer.
  pub fn set_post_process(&mut self, post: Box<dyn PostProcess>) {
    if !self.config.depth_buffer {
      tracing::warn!("depth buffer disabled, post-process will not run");
    }
    self.post = Some(post);
  }

  pub fn config(&self) -> &RenderConfig {
    &self.config
  }

  pub fn tree(&self) -> &Arc<Octree> {
    &self.tree
  }

  pub fn bricks(&self) -> &Arc<BrickManager> {
    &self.bricks
  }

  /// Frames rendered so far.
  pub fn frame_index(&self) -> u64 {
    self.frame_index
  }

  /// Ray distances of the last frame, empty if the depth buffer is off.
  pub fn depth(&self) -> &[f64] {
    &self.depth
  }

  /// Distance to the surface under the screen center, carried over from
  /// earlier frames while the center ray misses.
  pub fn opt_tmin(&self) -> f64 {
    self.opt_tmin
  }

  pub fn skip_node(&self) -> Option<(NodeId, NodeBox)> {
    self.skip.current()
  }

  pub fn subdivision_stats(&self) -> SubdivisionStats {
    self.subdivider.stats()
  }

  /// Block until queued subdivisions are done or `timeout` passes.
  pub fn wait_idle(&self, timeout: Duration) -> bool {
    self.subdivider.wait_idle(timeout)
  }

  /// Render one frame from whatever `camera` currently shows.
  pub fn render_from(&mut self, camera: &dyn CameraProvider, colors: &mut [u32]) -> Result<FrameStats> {
    let snapshot = camera.snapshot();
    self.render_frame(&snapshot, colors)
  }

  /// Render one frame into `colors` (row-major, `width * height`).
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "renderer::render_frame"))]
  pub fn render_frame(&mut self, camera: &CameraSnapshot, colors: &mut [u32]) -> Result<FrameStats> {
    let expected = self.config.pixel_count();
    if colors.len() != expected {
      return Err(OctreeError::BufferSize {
        expected,
        actual: colors.len(),
      });
    }

    let start = Instant::now();
    self.frame_index += 1;
    let frame_index = self.frame_index;
    let _span = tracing::info_span!("render_frame", frame = frame_index).entered();
    let queued_before = self.queue.submitted();

    let (start_node, start_box) = self
      .config
      .use_skip_node
      .then(|| self.skip.update(&self.tree, camera.position))
      .flatten()
      .unwrap_or((self.tree.root(), NodeBox::ROOT));

    let width = self.config.width;
    let height = self.config.height;
    let strict = self.config.strict_consistency;
    let traversal = Traversal::new(&self.tree, &self.queue, LodConstants::from_camera(camera, width))
      .with_strategy(self.config.strategy)
      .with_max_steps(self.config.max_traversal_steps);

    let tally = {
      let _span = tracing::info_span!("cast_rays").entered();
      let row_len = width as usize;
      let depth = &mut self.depth;
      let render_row = |row: usize, colors: &mut [u32], mut depth: Option<&mut [f64]>| -> Result<Tally> {
        let mut tally = Tally::default();
        for (col, color) in colors.iter_mut().enumerate() {
          let ray = camera.ray_through_pixel(col as u32, row as u32, width, height);
          let (rgb, distance) = match traversal.cast(&ray, start_node, start_box) {
            Ok(hit) => {
              if hit.is_hit() {
                tally.hits += 1;
              } else {
                tally.misses += 1;
              }
              (hit.color, hit.distance)
            }
            Err(err) if err.is_consistency_violation() && !strict => {
              tracing::error!(row, col, error = %err, "ray hit an inconsistent tree");
              tally.errors += 1;
              (BACKGROUND, NO_HIT)
            }
            Err(err) => return Err(err),
          };
          *color = rgb;
          if let Some(depth) = depth.as_deref_mut() {
            depth[col] = distance;
          }
        }
        Ok(tally)
      };

      self.pool.install(|| {
        let rows = colors.par_chunks_mut(row_len).enumerate();
        if depth.is_empty() {
          rows
            .map(|(row, colors)| render_row(row, colors, None))
            .try_reduce(Tally::default, |mut a, b| {
              a += b;
              Ok(a)
            })
        } else {
          rows
            .zip(depth.par_chunks_mut(row_len))
            .map(|((row, colors), depth)| render_row(row, colors, Some(depth)))
            .try_reduce(Tally::default, |mut a, b| {
              a += b;
              Ok(a)
            })
        }
      })?
    };

    if !self.depth.is_empty() {
      let center = (height as usize / 2) * width as usize + width as usize / 2;
      if self.depth[center] < NO_HIT {
        self.opt_tmin = self.depth[center];
      }
      if let Some(post) = self.post.as_mut() {
        let _span = tracing::info_span!("post_process").entered();
        post.apply(colors, &self.depth, width, height);
      }
    }

    let interval = self.config.unify_interval;
    let unify = (interval > 0 && frame_index % interval == 0).then(|| self.bricks.unify_bricks());

    let stats = FrameStats {
      frame_index,
      rays: expected as u64,
      hits: tally.hits,
      misses: tally.misses,
      subdivisions_queued: self.queue.submitted().saturating_sub(queued_before),
      consistency_errors: tally.errors,
      duration: start.elapsed(),
      unify,
    };
    tracing::info!(
      frame = frame_index,
      hits = stats.hits,
      misses = stats.misses,
      queued = stats.subdivisions_queued,
      errors = stats.consistency_errors,
      ms = stats.duration.as_secs_f64() * 1000.0,
      "frame rendered"
    );
    Ok(stats)
  }
}

#[cfg(test)]
#[path = "renderer_test.rs"]
mod renderer_test;
