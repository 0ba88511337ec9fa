//! Headless fractal flythrough.
//!
//! Renders a scripted camera flight through a distance-estimated fractal,
//! refining the octree between frames, and optionally writes every frame
//! to `frame_NNNNN.png`.

mod camera;
mod config;
mod flight;
mod recorder;
mod ssao;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voxel_octree::Renderer;
use web_time::Instant;

use config::Config;
use recorder::FrameRecorder;
use ssao::Ssao;

/// Sparse voxel octree fractal renderer.
#[derive(Parser, Debug)]
#[command(name = "render_frames")]
#[command(about = "Ray-marches a fractal through an adaptively refined octree")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: Option<PathBuf>,

	#[arg(long)]
	width: Option<u32>,

	#[arg(long)]
	height: Option<u32>,

	/// sierpinski, menger, mandelbulb or mandelbox.
	#[arg(short, long)]
	fractal: Option<String>,

	/// Number of frames to render.
	#[arg(short = 'n', long)]
	frames: Option<u64>,

	/// Write frames as PNG into this directory.
	#[arg(short, long)]
	output_dir: Option<PathBuf>,

	/// Save every frame.
	#[arg(short, long)]
	record: bool,

	/// neighbor or restart.
	#[arg(long)]
	strategy: Option<String>,

	/// Worker threads per pool (0 = one per core).
	#[arg(short, long)]
	threads: Option<usize>,
}

impl Args {
	fn apply(self, mut config: Config) -> Result<Config> {
		if let Some(width) = self.width {
			config.width = width;
		}
		if let Some(height) = self.height {
			config.height = height;
		}
		if let Some(fractal) = self.fractal {
			config.fractal = fractal;
		}
		if let Some(frames) = self.frames {
			config.frames = frames;
		}
		if let Some(dir) = self.output_dir {
			config.output_dir = dir.display().to_string();
			config.recording = true;
		}
		if self.record {
			config.recording = true;
		}
		if let Some(strategy) = self.strategy {
			config.strategy = strategy;
		}
		if let Some(threads) = self.threads {
			config.threads = threads;
		}
		config.validate().context("Invalid command line overrides")?;
		Ok(config)
	}
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let mut args = Args::parse();
	let config = match args.config.take() {
		Some(path) => {
			info!(path = %path.display(), "loading config");
			Config::load(&path)?
		}
		None => Config::default(),
	};
	let config = args.apply(config)?;

	let kind = config.fractal_kind()?;
	let render_config = config.render_config()?;
	let mut renderer = Renderer::new(render_config, voxel_fractal::oracle(kind))
		.context("Failed to start renderer")?;
	if config.ssao {
		renderer.set_post_process(Box::new(Ssao::new()));
	}

	let mut recorder = if config.recording {
		Some(FrameRecorder::new(&config.output_dir)?)
	} else {
		None
	};

	let mut camera = config.camera();
	let mut flight = config.flight_path();
	let mut colors = vec![0u32; config.width as usize * config.height as usize];

	info!(
		fractal = %kind,
		width = config.width,
		height = config.height,
		frames = config.frames,
		recording = recorder.is_some(),
		"starting flight"
	);

	let start = Instant::now();
	let mut consistency_errors = 0;
	for frame in 1..=config.frames {
		flight.advance(&mut camera, renderer.opt_tmin());
		let stats = renderer
			.render_from(&camera, &mut colors)
			.with_context(|| format!("Frame {frame} failed"))?;
		consistency_errors += stats.consistency_errors;

		if let Some(recorder) = recorder.as_mut() {
			recorder.save(stats.frame_index, &colors, config.width, config.height)?;
		}
	}

	let elapsed = start.elapsed().as_secs_f64();
	let frames = renderer.frame_index();
	let subdivision = renderer.subdivision_stats();
	let counts = renderer.tree().counts();
	if consistency_errors > 0 {
		warn!(consistency_errors, "rays hit a broken tree during the flight");
	}
	info!(
		frames,
		seconds = elapsed,
		fps = if elapsed > 0.0 { frames as f64 / elapsed } else { 0.0 },
		nodes = counts.total(),
		max_depth = counts.max_depth,
		subdivided = subdivision.subdivided,
		emptied = subdivision.emptied,
		dropped = subdivision.dropped,
		written = recorder.as_ref().map_or(0, FrameRecorder::written),
		"done"
	);

	Ok(())
}
