use nalgebra::Vector3;
use crate::{ImuConfig, Motion9, Range3, RawMotion, SensorGateway};

/// Running mean and population standard deviation (Welford).
#[derive(Debug, Default, Clone)]
struct SampleStatistics {
	count: usize,
	mean: Vector3<f64>,
	sum_of_squares: Vector3<f64>,
}

impl SampleStatistics {
	fn push(&mut self, sample: Vector3<f64>) {
		self.count += 1;

		let delta = sample - self.mean;
		self.mean += delta / self.count as f64;
		self.sum_of_squares += delta.component_mul(&(sample - self.mean));
	}

	/// Zero for an empty window.
	fn mean(&self) -> Vector3<f32> {
		self.mean.map(|x| x as f32)
	}

	fn standard_deviation(&self) -> Vector3<f32> {
		if self.count == 0 {
			return Vector3::zeros();
		}

		(self.sum_of_squares / self.count as f64).map(|x| x.sqrt() as f32)
	}
}

fn to_vector(raw: &[i16; 3]) -> Vector3<f32> {
	Vector3::new(raw[0] as f32, raw[1] as f32, raw[2] as f32)
}

/// Turns raw device counts into calibrated vectors.
///
/// Accelerometer: fixed offset and scale. Gyroscope: zero rate offset measured at startup, then
/// converted to rad/s. Magnetometer: fixed hard iron offset, with running bounds kept for
/// normalization.
#[derive(Debug, Clone)]
pub struct Calibration {
	acc_offset: Vector3<f32>,
	acc_scale: Vector3<f32>,
	mag_offset: Vector3<f32>,
	gravity: f32,
	gyro_scale: f32,
	gyro_zero: Vector3<f32>,
	gyro_noise: Vector3<f32>,
	acc_bias: Vector3<f32>,
	acc_noise: Vector3<f32>,
	mag_range: Range3,
}

impl Calibration {
	pub fn new(config: &ImuConfig) -> Self {
		Calibration {
			acc_offset: config.acc_offset,
			acc_scale: config.acc_scale,
			mag_offset: config.mag_offset,
			gravity: config.gravity,
			gyro_scale: config.gyro_scale,
			gyro_zero: Vector3::zeros(),
			gyro_noise: Vector3::zeros(),
			acc_bias: Vector3::zeros(),
			acc_noise: Vector3::zeros(),
			mag_range: Range3::default(),
		}
	}

	/// `(raw - offset) * scale`, per axis.
	pub fn accelerometer(&self, raw: &[i16; 3]) -> Vector3<f32> {
		(to_vector(raw) - self.acc_offset).component_mul(&self.acc_scale)
	}

	/// `raw - zero`, in device counts.
	pub fn gyroscope(&self, raw: &[i16; 3]) -> Vector3<f32> {
		to_vector(raw) - self.gyro_zero
	}

	/// Zero corrected angular rate in rad/s.
	pub fn gyroscope_rate(&self, raw: &[i16; 3]) -> Vector3<f32> {
		self.gyroscope(raw) * self.gyro_scale
	}

	/// `raw - offset`, widening the tracked bounds.
	pub fn magnetometer(&mut self, raw: &[i16; 3]) -> Vector3<f32> {
		let mag = to_vector(raw) - self.mag_offset;
		self.mag_range.update(&mag);
		mag
	}

	pub fn calibrate(&mut self, raw: &RawMotion) -> Motion9 {
		Motion9 {
			acc: self.accelerometer(&raw.acc),
			gyr: self.gyroscope_rate(&raw.gyr),
			mag: self.magnetometer(&raw.mag),
		}
	}

	/// Calibrated magnetometer mapped onto `[-1, 1]` per axis by the tracked bounds, or left as is
	/// until every axis has been swept.
	pub fn normalized_magnetometer(&self, mag: &Vector3<f32>) -> Vector3<f32> {
		self.mag_range.normalize(mag)
	}

	/// Averages `samples` gyroscope readings taken at rest into the zero rate offset. The device
	/// must not move meanwhile. No samples means a zero offset.
	pub fn zero_gyroscope<G: SensorGateway>(&mut self,
											gateway: &mut G,
											samples: usize) -> Result<(), G::Error> {
		let mut statistics = SampleStatistics::default();

		for _ in 0..samples {
			let raw = gateway.read_motion()?;
			statistics.push(to_vector(&raw.gyr).map(f64::from));
		}

		self.gyro_zero = statistics.mean();
		self.gyro_noise = statistics.standard_deviation() * self.gyro_scale;

		info!("Gyroscope zero {:?}, noise {:?} rad/s", self.gyro_zero.as_slice(), self.gyro_noise.as_slice());
		Ok(())
	}

	/// Measures the accelerometer bias at rest (z axis up). The bias is kept for diagnostics only
	/// and is not removed from samples: the fixed offsets already account for it.
	pub fn zero_accelerometer<G: SensorGateway>(&mut self,
												gateway: &mut G,
												samples: usize) -> Result<(), G::Error> {
		let mut statistics = SampleStatistics::default();

		for _ in 0..samples {
			let raw = gateway.read_motion()?;
			statistics.push(self.accelerometer(&raw.acc).map(f64::from));
		}

		self.acc_bias = if statistics.count > 0 {
			statistics.mean() - Vector3::new(0., 0., self.gravity)
		} else {
			Vector3::zeros()
		};
		self.acc_noise = statistics.standard_deviation();

		info!("Accelerometer bias {:?}, noise {:?}", self.acc_bias.as_slice(), self.acc_noise.as_slice());
		Ok(())
	}

	/// Forgets zeroing results and magnetometer bounds.
	pub fn reset(&mut self) {
		self.gyro_zero = Vector3::zeros();
		self.gyro_noise = Vector3::zeros();
		self.acc_bias = Vector3::zeros();
		self.acc_noise = Vector3::zeros();
		self.mag_range = Range3::default();
	}

	pub fn gyroscope_zero(&self) -> &Vector3<f32> {
		&self.gyro_zero
	}

	pub fn set_gyroscope_zero(&mut self, zero: Vector3<f32>) {
		self.gyro_zero = zero;
	}

	/// Standard deviation of the gyroscope at rest (rad/s).
	pub fn gyroscope_noise(&self) -> &Vector3<f32> {
		&self.gyro_noise
	}

	pub fn accelerometer_bias(&self) -> &Vector3<f32> {
		&self.acc_bias
	}

	/// Standard deviation of the calibrated accelerometer at rest.
	pub fn accelerometer_noise(&self) -> &Vector3<f32> {
		&self.acc_noise
	}

	pub fn magnetometer_range(&self) -> &Range3 {
		&self.mag_range
	}
}
