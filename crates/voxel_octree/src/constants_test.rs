use super::*;

#[test]
fn test_box_dim_at_depth() {
  assert_eq!(box_dim_at_depth(0), 2.0);
  assert_eq!(box_dim_at_depth(1), 1.0);
  assert_eq!(box_dim_at_depth(2), 0.5);
  assert_eq!(box_dim_at_depth(5), 0.0625);
}

/// Root cube is centered on the origin.
#[test]
fn test_root_cube_centered() {
  let center = ROOT_MIN + DVec3::splat(ROOT_DIM * 0.5);
  assert_eq!(center, DVec3::ZERO);
}

#[test]
fn test_brick_depths() {
  assert!(is_brick_depth(0));
  assert!(!is_brick_depth(1));
  assert!(is_brick_depth(2));
  assert!(!is_brick_depth(3));
  assert!(is_brick_depth(4));
}

/// The entry nudge must still move the sample point at the deepest level.
#[test]
fn test_entry_nudge_survives_max_depth() {
  let dim = box_dim_at_depth(MAX_DEPTH);
  let nudge = ENTRY_NUDGE * dim;
  assert!(1.0 + nudge > 1.0);
  assert!(4.0 + nudge > 4.0);
}
