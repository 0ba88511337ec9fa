//! Screen-space ambient occlusion from the depth buffer.
//!
//! For every pixel the relative depth differences to its `(2k+1)²`
//! neighborhood are summed. Nearby geometry that sits in front of the pixel
//! darkens it; large jumps (silhouettes) are ignored.

use voxel_octree::color::adjust_light;
use voxel_octree::constants::NO_HIT;
use voxel_octree::PostProcess;

/// Neighborhood radius in pixels.
const KERNEL: usize = 3;
/// Relative depth differences above this are edges, not occluders.
const CUT_OFF_DIST: f64 = 0.05;
/// Shadow strength per unit of relative depth difference.
const MULTIPLE: f64 = 128.0;
/// Scale applied to negative sums (pixels in front of their surroundings).
const SALIENT_SCALE: f64 = 0.5;
/// Darkest shadow.
const MAX_SHADOW: f64 = 200.0;

/// SSAO pass. Keeps its occlusion buffer between frames.
#[derive(Debug, Default)]
pub struct Ssao {
	occlusion: Vec<i32>,
}

impl Ssao {
	pub fn new() -> Self {
		Self::default()
	}

	/// Shadow strength per pixel from the last frame.
	pub fn occlusion(&self) -> &[i32] {
		&self.occlusion
	}

	/// Fill the occlusion buffer from `depth`. Border pixels within the
	/// kernel radius and misses get no shadow.
	pub fn compute(&mut self, depth: &[f64], width: usize, height: usize) {
		self.occlusion.clear();
		self.occlusion.resize(width * height, 0);
		if width <= 2 * KERNEL || height <= 2 * KERNEL {
			return;
		}

		for row in KERNEL..height - KERNEL {
			for col in KERNEL..width - KERNEL {
				let index = row * width + col;
				let center = depth[index];
				if center == NO_HIT || center <= 0.0 {
					continue;
				}
				let mut sum = 0.0;
				for r in row - KERNEL..=row + KERNEL {
					for c in col - KERNEL..=col + KERNEL {
						let d = (center - depth[r * width + c]) / center;
						if d.abs() <= CUT_OFF_DIST {
							sum += d * MULTIPLE;
						}
					}
				}
				if sum < 0.0 {
					sum *= SALIENT_SCALE;
				}
				self.occlusion[index] = sum.min(MAX_SHADOW) as i32;
			}
		}
	}
}

impl PostProcess for Ssao {
	fn apply(&mut self, colors: &mut [u32], depth: &[f64], width: u32, height: u32) {
		self.compute(depth, width as usize, height as usize);
		for (color, &shadow) in colors.iter_mut().zip(&self.occlusion) {
			*color = adjust_light(*color, shadow);
		}
	}
}
