use ahrs::{euler_degrees, tilt_compensated_heading, Estimator, OrientationEstimator};
use nalgebra::{UnitQuaternion, Vector3};
use std::time::Instant;
use crate::{Altimeter, Attitude12, Calibration, ImuConfig, Motion9, RollPitch, RollPitchYaw, SensorGateway,
			YawSource};

/// Roll and pitch in degrees from the measured gravity direction alone.
pub fn accel_angles(acc: &Vector3<f32>) -> RollPitch<f32> {
	RollPitch {
		roll: acc.y.atan2(acc.z).to_degrees(),
		pitch: (-acc.x).atan2((acc.y * acc.y + acc.z * acc.z).sqrt()).to_degrees(),
	}
}

/// Attitude and heading reference: calibrates the samples read from `G`, runs the orientation
/// estimator and the altimeter.
///
/// Meant to be polled at a fixed rate from a single loop. [`Imu::init`] has to be called with the
/// device at rest before any other query.
pub struct Imu<G: SensorGateway> {
	gateway: G,
	config: ImuConfig,
	calibration: Calibration,
	estimator: Estimator<f32>,
	altimeter: Altimeter,
	last_instant: Option<Instant>,
	heading: Option<f32>,
}

impl<G: SensorGateway> Imu<G> {
	pub fn new(gateway: G, config: ImuConfig) -> Self {
		Imu {
			gateway,
			calibration: Calibration::new(&config),
			estimator: Estimator::new(config.estimator, config.two_kp, config.two_ki),
			altimeter: Altimeter::new(),
			last_instant: None,
			heading: None,
			config,
		}
	}

	/// Zeroes the gyroscope and measures sensor noise, then restarts the estimator and the
	/// altimeter from scratch. The device must not move meanwhile.
	pub fn init(&mut self) -> Result<(), G::Error> {
		info!("Initializing IMU ({} estimator, {} zeroing samples)",
			  self.config.estimator, self.config.zero_samples);

		self.calibration.reset();
		self.calibration.zero_gyroscope(&mut self.gateway, self.config.zero_samples)?;
		self.calibration.zero_accelerometer(&mut self.gateway, self.config.zero_samples)?;

		self.estimator.reset();
		self.altimeter.reset();
		self.last_instant = None;
		self.heading = None;

		Ok(())
	}

	/// Accelerometer, gyroscope then magnetometer counts, as read.
	pub fn raw_values(&mut self) -> Result<[i16; 9], G::Error> {
		Ok(self.gateway.read_motion()?.values())
	}

	/// One calibrated sample. The estimator is left untouched.
	pub fn motion9(&mut self) -> Result<Motion9, G::Error> {
		let raw = self.gateway.read_motion()?;
		Ok(self.calibration.calibrate(&raw))
	}

	pub fn attitude(&mut self) -> Result<Attitude12, G::Error> {
		self.attitude_at(Instant::now())
	}

	/// Runs one estimator tick on a fresh sample, taking `now` as the sample time.
	///
	/// The first tick after [`Imu::init`] integrates over the configured sample period. A tick
	/// that does not move forward in time, or whose sample is rejected by the estimator, leaves
	/// the orientation as it was.
	pub fn attitude_at(&mut self, now: Instant) -> Result<Attitude12, G::Error> {
		let raw = self.gateway.read_motion()?;
		let motion = self.calibration.calibrate(&raw);

		let dt = match self.last_instant {
			Some(last_instant) => now.checked_duration_since(last_instant)
				.map_or(0., |elapsed| elapsed.as_secs_f32()),
			None => self.config.sample_period,
		};

		let mag = self.calibration.normalized_magnetometer(&motion.mag);

		if dt > 0. {
			self.last_instant = Some(now);

			let fused_mag = if self.config.use_magnetometer { Some(&mag) } else { None };

			if let Err(e) = self.estimator.update(&motion.gyr, &motion.acc, fused_mag, dt) {
				warn!("Skipped estimator tick: {} (acc {:?}, gyr {:?}, mag {:?})",
					  e, motion.acc.as_slice(), motion.gyr.as_slice(), motion.mag.as_slice());
			}
		} else {
			warn!("Skipped estimator tick: time did not advance ({} s)", dt);
		}

		self.heading = tilt_compensated_heading(&motion.acc, &mag);

		let (roll, pitch, estimator_yaw) = euler_degrees(&self.estimator.orientation());

		let yaw = match self.config.yaw_source {
			YawSource::Estimator => estimator_yaw,
			YawSource::Compass => self.heading.unwrap_or(estimator_yaw),
		};

		debug!(target: "ahrs", "{} {} {}", roll, pitch, yaw);

		Ok(Attitude12::new(motion, RollPitchYaw::from((roll, pitch, yaw))))
	}

	/// Smoothed barometric altitude (m), fed with a fresh pressure sample.
	pub fn altitude(&mut self) -> Result<f32, G::Error> {
		let pressure = self.gateway.read_pressure()?;
		Ok(self.altimeter.update(pressure))
	}

	/// Per axis standard deviation of the calibrated accelerometer, measured by [`Imu::init`].
	pub fn accel_measurement_noise(&self) -> Vector3<f32> {
		*self.calibration.accelerometer_noise()
	}

	/// Per axis standard deviation of the gyroscope (rad/s), measured by [`Imu::init`].
	pub fn gyro_measurement_noise(&self) -> Vector3<f32> {
		*self.calibration.gyroscope_noise()
	}

	pub fn orientation(&self) -> UnitQuaternion<f32> {
		self.estimator.orientation()
	}

	/// Tilt compensated magnetic heading of the last tick, if the compass was usable.
	pub fn heading(&self) -> Option<f32> {
		self.heading
	}

	pub fn calibration(&self) -> &Calibration {
		&self.calibration
	}

	pub fn config(&self) -> &ImuConfig {
		&self.config
	}

	pub fn gateway_mut(&mut self) -> &mut G {
		&mut self.gateway
	}
}
