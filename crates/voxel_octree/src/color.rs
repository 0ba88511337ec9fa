//! Packed `0x00RRGGBB` color helpers.

use glam::DVec3;

/// Pack 8-bit channels into `0x00RRGGBB`.
#[inline]
pub fn pack(r: u8, g: u8, b: u8) -> u32 {
  ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Split a packed color into `(r, g, b)`.
#[inline]
pub fn unpack(rgb: u32) -> (u8, u8, u8) {
  ((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// Color derived from a position inside the root cube.
///
/// Each axis maps `[-1, 1]` linearly onto `[0, 255]`, so the color of a voxel
/// tells where it sits in the cube. Positions outside the cube saturate.
pub fn positional_color(p: DVec3) -> u32 {
  let channel = |c: f64| (((c + 1.0) * 0.5) * 255.0).clamp(0.0, 255.0) as u8;
  pack(channel(p.x), channel(p.y), channel(p.z))
}

/// Per-channel mean of a set of colors. Returns `None` for an empty set.
pub fn average<I>(colors: I) -> Option<u32>
where
  I: IntoIterator<Item = u32>,
{
  let mut sum = [0u32; 3];
  let mut count = 0u32;
  for rgb in colors {
    let (r, g, b) = unpack(rgb);
    sum[0] += r as u32;
    sum[1] += g as u32;
    sum[2] += b as u32;
    count += 1;
  }
  if count == 0 {
    return None;
  }
  Some(pack(
    (sum[0] / count) as u8,
    (sum[1] / count) as u8,
    (sum[2] / count) as u8,
  ))
}

/// Darken (positive `shadow`) or lighten (negative `shadow`) every channel,
/// clamping to `[0, 255]`.
pub fn adjust_light(rgb: u32, shadow: i32) -> u32 {
  let (r, g, b) = unpack(rgb);
  let shade = |c: u8| (c as i32 - shadow).clamp(0, 255) as u8;
  pack(shade(r), shade(g), shade(b))
}

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;
