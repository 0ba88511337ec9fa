//! Scripted camera flights.
//!
//! A flight is a list of segments played one frame at a time, followed by
//! an "infinite zoom" stage that keeps closing in on whatever surface lies
//! under the screen center.

use std::f64::consts::TAU;

use glam::DVec3;

use crate::camera::Camera;

/// Fraction of the center-pixel distance covered per zoom frame.
const ZOOM_STEP: f64 = 0.01;

/// One leg of a flight.
#[derive(Clone, Debug)]
pub enum Segment {
	/// Straight move to `end` over `frames` frames, optionally blending the
	/// look direction toward `end_look`.
	Lerp {
		frames: u32,
		end: DVec3,
		end_look: Option<DVec3>,
	},
	/// Orbit `turns` of a full circle about `axis` through `origin`, moving
	/// `radius_change` along the look direction over the segment.
	Circle {
		frames: u32,
		turns: f64,
		radius_change: f64,
		axis: DVec3,
		origin: DVec3,
	},
}

impl Segment {
	fn frames(&self) -> u32 {
		match self {
			Segment::Lerp { frames, .. } | Segment::Circle { frames, .. } => *frames,
		}
	}
}

/// Lerp state captured on the segment's first frame.
#[derive(Clone, Copy, Debug)]
struct LerpStart {
	step: DVec3,
	look: DVec3,
}

/// Segment player plus the trailing zoom stage.
#[derive(Clone, Debug)]
pub struct FlightPath {
	segments: Vec<Segment>,
	index: usize,
	t: u32,
	lerp: Option<LerpStart>,
	zoom_frames: u32,
	zoomed: u32,
}

impl FlightPath {
	pub fn new(segments: Vec<Segment>, zoom_frames: u32) -> Self {
		Self {
			segments,
			index: 0,
			t: 0,
			lerp: None,
			zoom_frames,
			zoomed: 0,
		}
	}

	/// A camera that never moves.
	pub fn still() -> Self {
		Self::new(Vec::new(), 0)
	}

	/// One full orbit about +Y through the origin, closing in by `approach`.
	pub fn orbit(frames: u32, approach: f64) -> Self {
		Self::new(
			vec![Segment::Circle {
				frames,
				turns: 1.0,
				radius_change: approach,
				axis: DVec3::Y,
				origin: DVec3::ZERO,
			}],
			0,
		)
	}

	/// Zoom straight ahead for `frames` frames.
	pub fn zoom(frames: u32) -> Self {
		Self::new(Vec::new(), frames)
	}

	/// True once every segment and the zoom stage have played.
	pub fn finished(&self) -> bool {
		self.index >= self.segments.len() && self.zoomed >= self.zoom_frames
	}

	/// Move `camera` by one frame. `opt_tmin` is the distance to the surface
	/// under the screen center.
	pub fn advance(&mut self, camera: &mut Camera, opt_tmin: f64) {
		if let Some(segment) = self.segments.get(self.index).cloned() {
			self.play(&segment, camera);
			self.t += 1;
			if self.t >= segment.frames() {
				self.index += 1;
				self.t = 0;
				self.lerp = None;
			}
		} else if self.zoomed < self.zoom_frames {
			camera.move_by(camera.look_vector() * opt_tmin * ZOOM_STEP);
			self.zoomed += 1;
		}
	}

	fn play(&mut self, segment: &Segment, camera: &mut Camera) {
		match *segment {
			Segment::Lerp { frames, end, end_look } => {
				let frames = frames.max(1);
				let start = *self.lerp.get_or_insert_with(|| LerpStart {
					step: (end - camera.position()) / frames as f64,
					look: camera.look_vector(),
				});
				camera.move_by(start.step);
				if let Some(end_look) = end_look {
					let d = (1.0 + self.t as f64) / frames as f64;
					camera.set_look_vector(start.look * (1.0 - d) + end_look.normalize() * d);
				}
			}
			Segment::Circle {
				frames,
				turns,
				radius_change,
				axis,
				origin,
			} => {
				let frames = frames.max(1) as f64;
				camera.rotate_around(origin, axis, TAU * turns / frames);
				camera.move_by(camera.look_vector() * (radius_change / frames));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: DVec3, b: DVec3) -> bool {
		(a - b).length() < 1e-9
	}

	#[test]
	fn test_lerp_reaches_end() {
		let mut camera = Camera::default();
		let end = DVec3::new(1.0, 2.0, 3.0);
		let mut flight = FlightPath::new(
			vec![Segment::Lerp {
				frames: 4,
				end,
				end_look: Some(DVec3::X),
			}],
			0,
		);
		for _ in 0..4 {
			assert!(!flight.finished());
			flight.advance(&mut camera, 1.0);
		}
		assert!(flight.finished());
		assert!(close(camera.position(), end));
		assert!(close(camera.look_vector(), DVec3::X));
	}

	/// A full orbit comes back to the start.
	#[test]
	fn test_orbit_returns() {
		let mut camera = Camera::default();
		let start = camera.position();
		let mut flight = FlightPath::orbit(12, 0.0);
		for _ in 0..12 {
			flight.advance(&mut camera, 1.0);
		}
		assert!(flight.finished());
		assert!(close(camera.position(), start));
	}

	/// Each zoom frame covers one percent of the center distance.
	#[test]
	fn test_zoom_moves_toward_surface() {
		let mut camera = Camera::default();
		let mut flight = FlightPath::zoom(2);
		flight.advance(&mut camera, 4.0);
		assert!(close(camera.position(), DVec3::new(0.0, 0.0, 4.96)));
		flight.advance(&mut camera, 4.0);
		flight.advance(&mut camera, 4.0);
		assert!(close(camera.position(), DVec3::new(0.0, 0.0, 4.92)));
		assert!(flight.finished());
	}

	#[test]
	fn test_still_never_moves() {
		let mut camera = Camera::default();
		let mut flight = FlightPath::still();
		flight.advance(&mut camera, 3.0);
		assert!(flight.finished());
		assert!(close(camera.position(), DVec3::new(0.0, 0.0, 5.0)));
	}
}
