use nalgebra::Vector3;
use serde::Serialize;
use crate::RollPitchYaw;

/// Raw readings as handed over by the device driver, in device counts.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct RawMotion {
	pub acc: [i16; 3],
	pub gyr: [i16; 3],
	pub mag: [i16; 3],
}

impl RawMotion {
	/// Accelerometer, gyroscope then magnetometer axes.
	pub fn values(&self) -> [i16; 9] {
		let [ax, ay, az] = self.acc;
		let [gx, gy, gz] = self.gyr;
		let [mx, my, mz] = self.mag;
		[ax, ay, az, gx, gy, gz, mx, my, mz]
	}
}

/// One calibrated sample of the three sensors. The gyroscope is in rad/s.
#[derive(Serialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Motion9 {
	pub acc: Vector3<f32>,
	pub gyr: Vector3<f32>,
	pub mag: Vector3<f32>,
}

/// A calibrated sample along with the orientation estimated from it.
#[derive(Serialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Attitude12 {
	pub acc: Vector3<f32>,
	pub gyr: Vector3<f32>,
	pub mag: Vector3<f32>,
	pub euler: RollPitchYaw<f32>,
}

impl Attitude12 {
	pub fn new(motion: Motion9, euler: RollPitchYaw<f32>) -> Self {
		Attitude12 {
			acc: motion.acc,
			gyr: motion.gyr,
			mag: motion.mag,
			euler,
		}
	}
}

/// Running bounds of one axis. Empty (`min > max`) until the first sample.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Range {
	pub min: f32,
	pub max: f32,
}

/// Spans narrower than this are never used for normalization.
const MIN_HALF_SPAN: f32 = 1e-3;

/// An axis counts as swept once its half span reaches this fraction of the field magnitude.
/// Turning the device through every orientation sweeps each axis over about `±|field|`, while
/// a device at rest only spans its sensor noise.
pub const SWEPT_FRACTION: f32 = 0.5;

impl Range {
	pub const EMPTY: Range = Range { min: f32::INFINITY, max: f32::NEG_INFINITY };

	pub fn is_initialized(&self) -> bool {
		self.min <= self.max
	}

	/// Bounds only widen. Non-finite values are ignored.
	pub fn update(&mut self, value: f32) {
		if value.is_finite() {
			self.min = self.min.min(value);
			self.max = self.max.max(value);
		}
	}

	pub fn mid(&self) -> f32 {
		(self.min + self.max) / 2.
	}

	pub fn half_span(&self) -> f32 {
		(self.max - self.min) / 2.
	}

	/// `value` mapped so that the bounds land on -1 and 1, once the half span is wider than
	/// `min_half_span`.
	pub fn normalize(&self, value: f32, min_half_span: f32) -> Option<f32> {
		if self.is_initialized() && self.half_span() > min_half_span.max(MIN_HALF_SPAN) {
			Some((value - self.mid()) / self.half_span())
		} else {
			None
		}
	}
}

impl Default for Range {
	fn default() -> Self {
		Range::EMPTY
	}
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Range3 {
	pub x: Range,
	pub y: Range,
	pub z: Range,
}

impl Range3 {
	pub fn update(&mut self, value: &Vector3<f32>) {
		self.x.update(value.x);
		self.y.update(value.y);
		self.z.update(value.z);
	}

	/// Per axis normalization, or `value` untouched while any axis has not been swept over
	/// [`SWEPT_FRACTION`] of the magnitude of `value`.
	pub fn normalize(&self, value: &Vector3<f32>) -> Vector3<f32> {
		let min_half_span = SWEPT_FRACTION * value.norm();

		match (self.x.normalize(value.x, min_half_span),
			   self.y.normalize(value.y, min_half_span),
			   self.z.normalize(value.z, min_half_span)) {
			(Some(x), Some(y), Some(z)) => Vector3::new(x, y, z),
			_ => *value,
		}
	}
}
