use ahrs::EstimatorKind;
use assert_approx_eq::assert_approx_eq;
use imu::{accel_angles, pressure_to_altitude, Attitude12, HandoffGateway, Imu, ImuConfig, RawMotion, SampleHandoff,
		  SensorGateway, YawSource, ACC_OFFSET, ACC_SCALE, ALTITUDE_WINDOW, GRAVITY, MAG_OFFSET};
use std::{
	convert::Infallible,
	sync::Arc,
	time::{Duration, Instant},
};

/// Replays `samples` in a loop at a constant pressure.
struct Recorded {
	samples: Vec<RawMotion>,
	pressure: f32,
	reads: usize,
}

impl Recorded {
	fn new(samples: Vec<RawMotion>, pressure: f32) -> Self {
		Recorded { samples, pressure, reads: 0 }
	}
}

impl SensorGateway for Recorded {
	type Error = Infallible;

	fn read_motion(&mut self) -> Result<RawMotion, Self::Error> {
		let sample = self.samples[self.reads % self.samples.len()];
		self.reads += 1;
		Ok(sample)
	}

	fn read_pressure(&mut self) -> Result<f32, Self::Error> {
		Ok(self.pressure)
	}
}

/// Raw accelerometer counts for a device at rest with the given roll (about x).
fn raw_gravity(roll_degrees: f32) -> [i16; 3] {
	let gravity = [
		0.,
		GRAVITY * roll_degrees.to_radians().sin(),
		GRAVITY * roll_degrees.to_radians().cos(),
	];

	let mut raw = [0; 3];
	for axis in 0..3 {
		raw[axis] = (gravity[axis] / ACC_SCALE[axis] + ACC_OFFSET[axis]).round() as i16;
	}
	raw
}

/// Raw magnetometer counts for a calibrated field.
fn raw_field(x: f32, y: f32, z: f32) -> [i16; 3] {
	[(x + MAG_OFFSET[0]) as i16, (y + MAG_OFFSET[1]) as i16, (z + MAG_OFFSET[2]) as i16]
}

fn at_rest(roll_degrees: f32) -> RawMotion {
	RawMotion {
		acc: raw_gravity(roll_degrees),
		gyr: [0, 0, 0],
		mag: raw_field(200., 0., -150.),
	}
}

/// Runs `ticks` attitude updates 10 ms apart.
fn run<G: SensorGateway>(imu: &mut Imu<G>, ticks: u64) -> Attitude12 {
	let start = Instant::now();
	let mut attitude = Default::default();

	for tick in 0..ticks {
		attitude = imu.attitude_at(start + Duration::from_millis(10 * tick)).unwrap();
	}

	attitude
}

#[test]
fn stationary_end_to_end() {
	let mut imu = Imu::new(Recorded::new(vec![at_rest(0.)], 101_325.), ImuConfig::default());
	imu.init().unwrap();

	let attitude = run(&mut imu, 500);

	assert_approx_eq!(attitude.euler.roll, 0., 1.);
	assert_approx_eq!(attitude.euler.pitch, 0., 1.);
	assert_approx_eq!(attitude.acc.z, GRAVITY, 1.);

	let mut altitude = f32::NAN;
	for _ in 0..ALTITUDE_WINDOW {
		altitude = imu.altitude().unwrap();
	}
	assert_approx_eq!(altitude, pressure_to_altitude(101_325.), 1.);
	assert_approx_eq!(altitude, 0., 1.);
}

#[test]
fn tilted_device_converges_to_gravity() {
	for estimator in &[EstimatorKind::Quaternion, EstimatorKind::DirectionCosine] {
		for use_magnetometer in &[false, true] {
			let config = ImuConfig {
				estimator: *estimator,
				use_magnetometer: *use_magnetometer,
				..ImuConfig::default()
			};

			let mut imu = Imu::new(Recorded::new(vec![at_rest(20.)], 101_325.), config);
			imu.init().unwrap();

			let attitude = run(&mut imu, 6000);
			let reference = accel_angles(&attitude.acc);

			assert_approx_eq!(reference.roll, 20., 0.1);
			assert_approx_eq!(attitude.euler.roll, reference.roll, 1.);
			assert_approx_eq!(attitude.euler.pitch, reference.pitch, 1.);
		}
	}
}

#[test]
fn gyroscope_bias_is_zeroed() {
	let mut sample = at_rest(0.);
	sample.gyr = [40, -25, 13];

	let mut imu = Imu::new(Recorded::new(vec![sample], 101_325.), ImuConfig::default());
	imu.init().unwrap();

	let attitude = run(&mut imu, 1000);

	assert_eq!(attitude.gyr, nalgebra::Vector3::zeros());
	assert_approx_eq!(attitude.euler.roll, 0., 1.);
	assert_approx_eq!(attitude.euler.pitch, 0., 1.);
	assert!(attitude.euler.yaw < 1. || attitude.euler.yaw > 359.);
}

#[test]
fn noise_estimates_come_from_init() {
	let mut quiet = at_rest(0.);
	let mut noisy = at_rest(0.);
	quiet.gyr = [10, 0, 0];
	noisy.gyr = [12, 0, 0];
	quiet.acc[1] -= 5;
	noisy.acc[1] += 5;

	let config = ImuConfig::default();
	let gyro_scale = config.gyro_scale;

	let mut imu = Imu::new(Recorded::new(vec![quiet, noisy], 101_325.), config);
	imu.init().unwrap();

	let gyro_noise = imu.gyro_measurement_noise();
	assert_approx_eq!(gyro_noise.x, gyro_scale, 1e-7);
	assert_eq!(gyro_noise.y, 0.);

	let accel_noise = imu.accel_measurement_noise();
	assert_approx_eq!(accel_noise.y, 5. * ACC_SCALE[1], 1e-3);
	assert_eq!(accel_noise.x, 0.);

	// Not recomputed per tick
	run(&mut imu, 50);
	assert_eq!(imu.gyro_measurement_noise(), gyro_noise);
	assert_eq!(imu.accel_measurement_noise(), accel_noise);
}

#[test]
fn compass_reports_heading() {
	let config = ImuConfig {
		use_magnetometer: false,
		yaw_source: YawSource::Compass,
		..ImuConfig::default()
	};

	// North on the left of the body
	let mut sample = at_rest(0.);
	sample.mag = raw_field(0., 200., -150.);

	let mut imu = Imu::new(Recorded::new(vec![sample], 101_325.), config);
	imu.init().unwrap();

	let attitude = run(&mut imu, 10);
	assert_approx_eq!(attitude.euler.yaw, 270., 1e-2);

	// Estimator yaw did not move without fusion
	let (_, _, estimator_yaw) = ahrs::euler_degrees(&imu.orientation());
	assert!(estimator_yaw < 1e-3 || estimator_yaw > 360. - 1e-3);
}

#[test]
fn fused_magnetometer_aligns_estimator_yaw() {
	let mut sample = at_rest(0.);
	sample.mag = raw_field(0., 200., -150.);

	let mut imu = Imu::new(Recorded::new(vec![sample], 101_325.), ImuConfig::default());
	imu.init().unwrap();

	let attitude = run(&mut imu, 6000);
	let heading = imu.heading().unwrap();

	assert_approx_eq!(heading, 270., 1e-2);
	assert_approx_eq!(attitude.euler.yaw, heading, 1.);
}

#[test]
fn noisy_magnetometer_at_rest_keeps_heading() {
	// One count of noise on every axis around a field along the body x axis
	let mut samples = Vec::new();
	for dx in &[-1f32, 1.] {
		for dy in &[-1f32, 1.] {
			for dz in &[-1f32, 1.] {
				let mut sample = at_rest(0.);
				sample.mag = raw_field(200. + *dx, *dy, -150. + *dz);
				samples.push(sample);
			}
		}
	}

	for yaw_source in &[YawSource::Estimator, YawSource::Compass] {
		let config = ImuConfig { yaw_source: *yaw_source, ..ImuConfig::default() };

		let mut imu = Imu::new(Recorded::new(samples.clone(), 101_325.), config);
		imu.init().unwrap();

		let attitude = run(&mut imu, 2000);
		let heading = imu.heading().unwrap();

		assert!(heading < 1. || heading > 359.);
		assert!(attitude.euler.yaw < 1. || attitude.euler.yaw > 359.);
		assert_approx_eq!(attitude.euler.roll, 0., 1.);
		assert_approx_eq!(attitude.euler.pitch, 0., 1.);

		// Noise alone never enables the bounds
		assert_eq!(imu.calibration().normalized_magnetometer(&attitude.mag), attitude.mag);
	}
}

#[test]
fn altitude_follows_pressure_after_a_window() {
	let mut gateway = Recorded::new(vec![at_rest(0.)], 101_325.);

	{
		let mut imu = Imu::new(&mut gateway, ImuConfig { zero_samples: 10, ..ImuConfig::default() });
		imu.init().unwrap();

		for _ in 0..ALTITUDE_WINDOW {
			imu.altitude().unwrap();
		}

		imu.gateway_mut().pressure = 89_875.;
		for _ in 0..ALTITUDE_WINDOW {
			imu.altitude().unwrap();
		}
		assert_approx_eq!(imu.altitude().unwrap(), pressure_to_altitude(89_875.), 0.1);
	}

	assert_eq!(gateway.reads, 20);
}

#[test]
fn handoff_gateway_feeds_imu() {
	let handoff = Arc::new(SampleHandoff::new());
	handoff.publish_motion(at_rest(0.));
	handoff.publish_pressure(95_000.);

	let mut imu = Imu::new(HandoffGateway::new(handoff.clone()),
						   ImuConfig { zero_samples: 20, ..ImuConfig::default() });
	imu.init().unwrap();

	// Only the first zeroing read was fresh
	assert_eq!(imu.gateway_mut().stale_reads(), 39);

	let producer = {
		let handoff = handoff.clone();
		std::thread::spawn(move || {
			for _ in 0..100 {
				handoff.publish_motion(at_rest(10.));
			}
		})
	};
	producer.join().unwrap();

	let attitude = run(&mut imu, 3000);
	assert_approx_eq!(attitude.euler.roll, 10., 1.);
	assert_approx_eq!(imu.altitude().unwrap(), pressure_to_altitude(95_000.), 1e-2);
}
