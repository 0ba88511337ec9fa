//! PNG frame recording.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use voxel_octree::color::unpack;

/// Writes frames as `frame_00001.png`, `frame_00002.png`, ...
#[derive(Debug)]
pub struct FrameRecorder {
	dir: PathBuf,
	written: usize,
}

impl FrameRecorder {
	/// Recorder writing into `dir`, created if missing.
	pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir)
			.with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
		Ok(Self { dir, written: 0 })
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Frames written so far.
	pub fn written(&self) -> usize {
		self.written
	}

	pub fn frame_path(&self, index: u64) -> PathBuf {
		self.dir.join(format!("frame_{index:05}.png"))
	}

	/// Save packed RGB `colors` (row-major) as frame `index`.
	pub fn save(&mut self, index: u64, colors: &[u32], width: u32, height: u32) -> Result<PathBuf> {
		anyhow::ensure!(
			colors.len() == width as usize * height as usize,
			"frame holds {} pixels, expected {}x{}",
			colors.len(),
			width,
			height
		);
		let image = image::RgbImage::from_fn(width, height, |x, y| {
			let (r, g, b) = unpack(colors[(y * width + x) as usize]);
			image::Rgb([r, g, b])
		});
		let path = self.frame_path(index);
		image
			.save(&path)
			.with_context(|| format!("Failed to write: {}", path.display()))?;
		self.written += 1;
		tracing::debug!(path = %path.display(), "frame saved");
		Ok(path)
	}
}
