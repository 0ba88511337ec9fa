//! Viewer parameters loaded from TOML.

use std::path::Path;

use anyhow::{Context, Result};
use glam::DVec3;
use serde::Deserialize;
use voxel_fractal::FractalKind;
use voxel_octree::{RenderConfig, TraversalStrategy};

use crate::camera::Camera;
use crate::flight::FlightPath;

/// Root configuration for a rendering run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Screen width in pixels.
	pub width: u32,
	/// Screen height in pixels.
	pub height: u32,
	/// Fractal name (sierpinski, menger, mandelbulb, mandelbox).
	pub fractal: String,
	/// Save every frame as PNG.
	pub recording: bool,
	/// Frames to render.
	pub frames: u64,
	/// Directory for recorded frames.
	pub output_dir: String,
	/// Traversal strategy (neighbor, restart).
	pub strategy: String,
	/// Worker threads per pool (0 = one per core).
	pub threads: usize,
	/// Frames between brick unification passes (0 disables).
	pub unify_interval: u64,
	/// Refine empty cells exposed next to each split.
	pub fill_exposed: bool,
	/// Darken creases with screen-space ambient occlusion.
	pub ssao: bool,
	/// Starting view.
	pub camera: CameraConfig,
	/// Scripted motion.
	pub flight: FlightConfig,
}

/// Starting camera.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
	pub position: [f64; 3],
	pub look_at: [f64; 3],
	pub distance_to_viewplane: f64,
	pub viewplane_width: f64,
	pub viewplane_height: f64,
}

/// Camera motion between frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlightConfig {
	/// Camera stays put.
	Still,
	/// One orbit about +Y through the origin.
	Orbit { frames: u32, approach: f64 },
	/// Keep closing in on the surface under the screen center.
	Zoom { frames: u32 },
}

impl Default for Config {
	fn default() -> Self {
		Self {
			width: 256,
			height: 256,
			fractal: "sierpinski".into(),
			recording: false,
			frames: 60,
			output_dir: "frames".into(),
			strategy: "neighbor".into(),
			threads: 0,
			unify_interval: 10,
			fill_exposed: false,
			ssao: true,
			camera: CameraConfig::default(),
			flight: FlightConfig::default(),
		}
	}
}

impl Default for CameraConfig {
	fn default() -> Self {
		Self {
			position: [0.0, 0.0, 5.0],
			look_at: [0.0, 0.0, 0.0],
			distance_to_viewplane: 3.0,
			viewplane_width: 1.5,
			viewplane_height: 1.5,
		}
	}
}

impl Default for FlightConfig {
	fn default() -> Self {
		FlightConfig::Zoom { frames: 500 }
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
	}

	/// Parse and check configuration TOML.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.width == 0 || self.height == 0 {
			anyhow::bail!("width and height must be non-zero, got {}x{}", self.width, self.height);
		}
		self.fractal_kind()?;
		self.traversal_strategy()?;
		if self.camera.distance_to_viewplane <= 0.0 {
			anyhow::bail!(
				"camera.distance_to_viewplane must be positive, got {}",
				self.camera.distance_to_viewplane
			);
		}
		if DVec3::from(self.camera.position) == DVec3::from(self.camera.look_at) {
			anyhow::bail!("camera.position and camera.look_at must differ");
		}
		Ok(())
	}

	pub fn fractal_kind(&self) -> Result<FractalKind> {
		Ok(self.fractal.parse()?)
	}

	pub fn traversal_strategy(&self) -> Result<TraversalStrategy> {
		Ok(self.strategy.parse()?)
	}

	/// Core renderer settings for this run.
	pub fn render_config(&self) -> Result<RenderConfig> {
		Ok(RenderConfig::new(self.width, self.height)
			.with_strategy(self.traversal_strategy()?)
			.with_threads(self.threads)
			.with_unify_interval(self.unify_interval)
			.with_fill_exposed(self.fill_exposed)
			.with_strict_consistency(false))
	}

	pub fn camera(&self) -> Camera {
		let c = &self.camera;
		Camera::new(
			c.position.into(),
			c.look_at.into(),
			c.distance_to_viewplane,
			c.viewplane_width,
			c.viewplane_height,
		)
	}

	pub fn flight_path(&self) -> FlightPath {
		match self.flight {
			FlightConfig::Still => FlightPath::still(),
			FlightConfig::Orbit { frames, approach } => FlightPath::orbit(frames, approach),
			FlightConfig::Zoom { frames } => FlightPath::zoom(frames),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_file_uses_defaults() {
		let config = Config::parse("").unwrap();
		assert_eq!(config.width, 256);
		assert_eq!(config.fractal_kind().unwrap(), FractalKind::Sierpinski);
		assert_eq!(config.traversal_strategy().unwrap(), TraversalStrategy::NeighborWalk);
		assert!(matches!(config.flight, FlightConfig::Zoom { frames: 500 }));
	}

	#[test]
	fn test_full_file() {
		let config = Config::parse(
			r#"
			width = 320
			height = 200
			fractal = "menger"
			strategy = "restart"
			recording = true
			frames = 12

			[camera]
			position = [-0.3, -0.3, 0.3]
			look_at = [0.7, 0.7, -0.7]
			distance_to_viewplane = 2.0

			[flight]
			kind = "orbit"
			frames = 120
			approach = 1.5
			"#,
		)
		.unwrap();
		assert_eq!((config.width, config.height), (320, 200));
		assert_eq!(config.fractal_kind().unwrap(), FractalKind::Menger);
		assert!(matches!(config.flight, FlightConfig::Orbit { frames: 120, .. }));

		let render = config.render_config().unwrap();
		assert_eq!(render.strategy, TraversalStrategy::Restart);
		assert_eq!(render.pixel_count(), 320 * 200);
		assert!(!render.strict_consistency);
	}

	#[test]
	fn test_rejects_bad_values() {
		assert!(Config::parse("fractal = \"julia\"").is_err());
		assert!(Config::parse("strategy = \"beam\"").is_err());
		assert!(Config::parse("width = 0").is_err());
		assert!(Config::parse("colour = 3").is_err(), "unknown keys are rejected");
		assert!(Config::parse("[camera]\nposition = [0.0, 0.0, 0.0]\nlook_at = [0.0, 0.0, 0.0]").is_err());
	}
}
