use super::*;

#[test]
fn test_pack_unpack() {
  assert_eq!(pack(0xAA, 0xBB, 0xCC), 0xAABBCC);
  assert_eq!(unpack(0xAABBCC), (0xAA, 0xBB, 0xCC));
}

/// Opposite corners of the root cube map to black and white.
#[test]
fn test_positional_color_corners() {
  assert_eq!(positional_color(DVec3::splat(-1.0)), 0x000000);
  assert_eq!(positional_color(DVec3::splat(1.0)), 0xFFFFFF);
}

#[test]
fn test_positional_color_per_axis() {
  // Only x at the max edge: red channel saturated, others at 127.
  let rgb = positional_color(DVec3::new(1.0, 0.0, 0.0));
  assert_eq!(unpack(rgb), (255, 127, 127));
}

/// Points outside the cube clamp instead of wrapping into other channels.
#[test]
fn test_positional_color_saturates() {
  assert_eq!(positional_color(DVec3::new(3.0, -5.0, 0.0)), pack(255, 0, 127));
}

#[test]
fn test_average_true_mean() {
  let avg = average([pack(10, 20, 30), pack(30, 40, 50)]).unwrap();
  assert_eq!(unpack(avg), (20, 30, 40));

  let single = average([0x123456]).unwrap();
  assert_eq!(single, 0x123456);
}

#[test]
fn test_average_empty() {
  assert_eq!(average(std::iter::empty()), None);
}

/// Averaging eight white voxels must not overflow any channel.
#[test]
fn test_average_no_overflow() {
  let avg = average(std::iter::repeat(0xFFFFFF).take(8)).unwrap();
  assert_eq!(avg, 0xFFFFFF);
}

#[test]
fn test_adjust_light_clamps() {
  assert_eq!(adjust_light(pack(100, 5, 250), 10), pack(90, 0, 240));
  assert_eq!(adjust_light(pack(100, 5, 250), -10), pack(110, 15, 255));
  assert_eq!(adjust_light(0x808080, 0), 0x808080);
}
