use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::oracle::{EmptyOracle, FnOracle, SolidOracle, SphereOracle};
use crate::test_utils::{bricks_for, split};
use crate::traversal::TraversalStrategy;

fn small_config() -> RenderConfig {
  RenderConfig::new(16, 16).with_threads(2)
}

/// Far enough back that the cube covers only the middle of the screen.
fn distant_camera() -> CameraSnapshot {
  CameraSnapshot::look_at(DVec3::new(0.0, 0.0, 10.0), DVec3::ZERO, 3.0, 1.5, 1.5)
}

struct CountingPost {
  calls: Arc<AtomicUsize>,
}

impl PostProcess for CountingPost {
  fn apply(&mut self, colors: &mut [u32], depth: &[f64], width: u32, height: u32) {
    assert_eq!(colors.len(), (width * height) as usize);
    assert_eq!(depth.len(), colors.len());
    self.calls.fetch_add(1, Ordering::SeqCst);
    for (color, &d) in colors.iter_mut().zip(depth) {
      if d == NO_HIT {
        *color = 0x0000FF;
      }
    }
  }
}

// =========================================================================
// Frame basics
// =========================================================================

#[test]
fn test_buffer_size_checked() {
  let mut renderer = Renderer::new(small_config(), Arc::new(SolidOracle)).unwrap();
  let mut colors = vec![0u32; 10];
  match renderer.render_frame(&CameraSnapshot::default(), &mut colors) {
    Err(OctreeError::BufferSize { expected, actual }) => {
      assert_eq!(expected, 256);
      assert_eq!(actual, 10);
    }
    other => panic!("expected BufferSize, got {other:?}"),
  }
  assert_eq!(renderer.frame_index(), 0);
}

#[test]
fn test_invalid_config_rejected() {
  let result = Renderer::new(RenderConfig::new(0, 4), Arc::new(SolidOracle));
  assert!(matches!(result, Err(OctreeError::InvalidConfig(_))));
}

/// The first frame sees the single root leaf in the middle of the screen.
#[test]
fn test_first_frame_hits_root() {
  let config = small_config().with_unify_interval(0);
  let mut renderer = Renderer::new(config, Arc::new(SolidOracle)).unwrap();
  let mut colors = vec![0u32; 256];

  let stats = renderer.render_frame(&distant_camera(), &mut colors).unwrap();
  assert_eq!(stats.frame_index, 1);
  assert_eq!(stats.rays, 256);
  assert_eq!(stats.hits + stats.misses, 256);
  assert!(stats.hits > 0 && stats.misses > 0, "{stats:?}");
  assert_eq!(stats.consistency_errors, 0);
  assert!(stats.unify.is_none());

  // The subdivider may split the root mid-frame, so only check that the
  // center was painted.
  let center = 8 * 16 + 8;
  assert_ne!(colors[center], BACKGROUND);
  assert_eq!(colors[0], BACKGROUND);
  assert!((renderer.depth()[center] - 9.0).abs() < 0.1);
  assert_eq!(renderer.depth()[0], NO_HIT);
  assert_eq!(renderer.opt_tmin(), renderer.depth()[center]);
}

/// Requests from the first frame refine the tree before later frames.
#[test]
fn test_subdivision_refines_between_frames() {
  let mut renderer = Renderer::new(small_config().with_unify_interval(0), Arc::new(EmptyOracle)).unwrap();
  let mut colors = vec![0u32; 256];

  let first = renderer.render_frame(&distant_camera(), &mut colors).unwrap();
  assert!(first.hits > 0);
  assert!(first.subdivisions_queued >= 1);
  assert!(renderer.wait_idle(Duration::from_secs(5)));

  let second = renderer.render_frame(&distant_camera(), &mut colors).unwrap();
  assert_eq!(second.hits, 0, "an empty oracle leaves nothing to hit");
  assert!(colors.iter().all(|&c| c == BACKGROUND));
  assert_eq!(renderer.subdivision_stats().emptied, 1);
}

#[test]
fn test_unify_interval() {
  let config = small_config().with_unify_interval(2);
  let mut renderer = Renderer::new(config, Arc::new(SolidOracle)).unwrap();
  let mut colors = vec![0u32; 256];

  let frames: Vec<FrameStats> = (0..4)
    .map(|_| renderer.render_frame(&distant_camera(), &mut colors).unwrap())
    .collect();
  let unified: Vec<bool> = frames.iter().map(|f| f.unify.is_some()).collect();
  assert_eq!(unified, [false, true, false, true]);
}

#[test]
fn test_post_process_runs() {
  let calls = Arc::new(AtomicUsize::new(0));
  let mut renderer = Renderer::new(small_config(), Arc::new(SolidOracle)).unwrap();
  renderer.set_post_process(Box::new(CountingPost {
    calls: Arc::clone(&calls),
  }));
  let mut colors = vec![0u32; 256];

  renderer.render_frame(&distant_camera(), &mut colors).unwrap();
  renderer.render_frame(&distant_camera(), &mut colors).unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(colors[0], 0x0000FF);
}

#[test]
fn test_depth_buffer_disabled() {
  let config = small_config().with_depth_buffer(false);
  let mut renderer = Renderer::new(config, Arc::new(SolidOracle)).unwrap();
  let mut colors = vec![0u32; 256];
  let stats = renderer.render_frame(&distant_camera(), &mut colors).unwrap();
  assert!(stats.hits > 0);
  assert!(renderer.depth().is_empty());
}

// =========================================================================
// Skip node and strategies
// =========================================================================

/// A camera inside the root starts rays at the leaf around it.
#[test]
fn test_skip_node_inside_root() {
  let mut renderer = Renderer::new(small_config(), Arc::new(SolidOracle)).unwrap();
  let camera = CameraSnapshot::look_at(DVec3::new(0.2, 0.3, 0.4), DVec3::ZERO, 3.0, 1.5, 1.5);
  let mut colors = vec![0u32; 256];

  let stats = renderer.render_frame(&camera, &mut colors).unwrap();
  assert_eq!(stats.hits, 256, "every ray starts inside a full leaf");
  assert_eq!(renderer.skip_node().map(|(id, _)| id), Some(renderer.tree().root()));
  assert!(renderer.depth().iter().all(|&d| d == 0.0));
}

#[test]
fn test_skip_node_disabled() {
  let mut renderer = Renderer::new(small_config().with_skip_node(false), Arc::new(SolidOracle)).unwrap();
  let camera = CameraSnapshot::look_at(DVec3::new(0.2, 0.3, 0.4), DVec3::ZERO, 3.0, 1.5, 1.5);
  let mut colors = vec![0u32; 256];
  renderer.render_frame(&camera, &mut colors).unwrap();
  assert!(renderer.skip_node().is_none());
}

/// The restart walker runs through the same frame loop.
#[test]
fn test_restart_strategy_renders() {
  let config = small_config().with_strategy(TraversalStrategy::Restart);
  let mut renderer = Renderer::new(config, Arc::new(EmptyOracle)).unwrap();
  let mut colors = vec![0u32; 256];
  let stats = renderer.render_frame(&distant_camera(), &mut colors).unwrap();
  assert!(stats.hits > 0 && stats.misses > 0, "{stats:?}");
  assert_eq!(stats.consistency_errors, 0);
}

// =========================================================================
// Concurrent refinement
// =========================================================================

/// Render a sphere for many frames while the subdivider refines it and
/// unification folds unseen bricks away. Whenever the workers settle after a
/// unify pass, the tree must be structurally sound.
fn render_and_check(config: RenderConfig) {
  let oracle = Arc::new(SphereOracle::new(DVec3::new(0.1, -0.2, 0.05), 0.55));
  let mut renderer = Renderer::new(config, oracle).unwrap();
  let mut colors = vec![0u32; 64 * 64];

  let outside = |frame: u32| {
    let angle = f64::from(frame) * 0.1;
    let eye = DVec3::new(3.0 * angle.sin(), 0.5, 3.0 * angle.cos());
    CameraSnapshot::look_at(eye, DVec3::ZERO, 2.0, 1.5, 1.5)
  };
  let inside = |frame: u32| {
    let eye = DVec3::new(0.9 - 0.01 * f64::from(frame), 0.8, 0.9);
    CameraSnapshot::look_at(eye, DVec3::new(0.1, -0.2, 0.05), 1.0, 1.5, 1.5)
  };

  let mut unified = 0;
  for frame in 0..60 {
    let camera = if frame < 30 { outside(frame) } else { inside(frame - 30) };
    let stats = renderer.render_frame(&camera, &mut colors).unwrap();
    assert_eq!(stats.consistency_errors, 0, "frame {frame}: {stats:?}");
    if stats.unify.is_some() {
      unified += 1;
      assert!(renderer.wait_idle(Duration::from_secs(30)));
      let problems = renderer.tree().check_invariants();
      assert!(problems.is_empty(), "frame {frame}: {problems:?}");
    }
  }
  assert_eq!(unified, 20);
  assert!(renderer.tree().counts().interior > 1, "the sphere should have been refined");
}

fn stress_config() -> RenderConfig {
  RenderConfig::new(64, 64).with_threads(4).with_unify_interval(3)
}

#[test]
fn test_neighbor_walk_keeps_tree_sound() {
  render_and_check(stress_config());
}

#[test]
fn test_fill_exposed_keeps_tree_sound() {
  render_and_check(stress_config().with_fill_exposed(true));
}

#[test]
fn test_restart_keeps_tree_sound() {
  render_and_check(stress_config().with_strategy(TraversalStrategy::Restart));
}

// =========================================================================
// Consistency errors
// =========================================================================

fn two_step_tree() -> Arc<Octree> {
  let tree = Arc::new(Octree::new(0));
  let setup = bricks_for(&tree);
  split(&tree, &setup, tree.root(), NodeBox::ROOT, &FnOracle(|p: DVec3| Ok(p.z < 0.0)));
  tree
}

/// Lenient mode paints the failed pixels and keeps going.
#[test]
fn test_lenient_consistency_counts_errors() {
  let mut config = small_config()
    .with_strict_consistency(false)
    .with_unify_interval(0);
  config.max_traversal_steps = 1;
  let mut renderer = Renderer::with_tree(config, two_step_tree(), Arc::new(SolidOracle)).unwrap();
  let mut colors = vec![0u32; 256];

  let stats = renderer.render_frame(&CameraSnapshot::default(), &mut colors).unwrap();
  assert!(stats.consistency_errors > 0, "{stats:?}");
  assert_eq!(stats.hits + stats.misses + stats.consistency_errors, 256);
}

#[test]
fn test_strict_consistency_fails_frame() {
  let mut config = small_config().with_unify_interval(0);
  config.max_traversal_steps = 1;
  let mut renderer = Renderer::with_tree(config, two_step_tree(), Arc::new(SolidOracle)).unwrap();
  let mut colors = vec![0u32; 256];

  match renderer.render_frame(&CameraSnapshot::default(), &mut colors) {
    Err(OctreeError::IterationCapExceeded { limit }) => assert_eq!(limit, 1),
    other => panic!("expected IterationCapExceeded, got {other:?}"),
  }
}
