use ahrs::EstimatorKind;
use log::LevelFilter;
use nalgebra::Vector3;
use std::{convert::TryFrom, f32::consts::PI, fmt::Display, path::Path, str::FromStr};
use tini::Ini;

/// Firmware calibration of the accelerometer (device counts).
pub const ACC_OFFSET: [f32; 3] = [1806., -352., 1192.];
pub const ACC_SCALE: [f32; 3] = [0.0849344, 0.0889208, 0.0801823];

/// Hard iron offset of the magnetometer (device counts).
pub const MAG_OFFSET: [f32; 3] = [-38., 136., -31.];

/// Norm of the calibrated accelerometer at rest.
pub const GRAVITY: f32 = 1671.;

/// ±250 °/s full scale, in rad/s per count.
pub const GYR_250_DPS_SCALE: f32 = 250. * PI / i16::max_value() as f32 / 180.;

pub const ZERO_SAMPLES: usize = 500;

/// Δt of the first tick after initialization (s).
pub const SAMPLE_PERIOD: f32 = 0.01;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum YawSource {
	/// Yaw of the orientation estimator.
	Estimator,
	/// Tilt compensated magnetic heading, estimator yaw while the compass is degenerate.
	Compass,
}

impl FromStr for YawSource {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"estimator" => Ok(YawSource::Estimator),
			"compass" => Ok(YawSource::Compass),
			other => Err(format!("Unknown yaw source \"{}\"", other)),
		}
	}
}

#[derive(Debug, Clone)]
pub struct ImuConfig {
	pub log_level_filter: LevelFilter,
	pub acc_offset: Vector3<f32>,
	pub acc_scale: Vector3<f32>,
	pub mag_offset: Vector3<f32>,
	pub gravity: f32,
	pub gyro_scale: f32,
	pub zero_samples: usize,
	pub estimator: EstimatorKind,
	pub two_kp: f32,
	pub two_ki: f32,
	pub use_magnetometer: bool,
	pub yaw_source: YawSource,
	pub sample_period: f32,
}

impl Default for ImuConfig {
	fn default() -> Self {
		ImuConfig {
			log_level_filter: LevelFilter::Info,
			acc_offset: ACC_OFFSET.into(),
			acc_scale: ACC_SCALE.into(),
			mag_offset: MAG_OFFSET.into(),
			gravity: GRAVITY,
			gyro_scale: GYR_250_DPS_SCALE,
			zero_samples: ZERO_SAMPLES,
			estimator: EstimatorKind::Quaternion,
			two_kp: ahrs::TWO_KP as f32,
			two_ki: ahrs::TWO_KI as f32,
			use_magnetometer: true,
			yaw_source: YawSource::Estimator,
			sample_period: SAMPLE_PERIOD,
		}
	}
}

impl ImuConfig {
	/// Defaults overridden by the keys present in the INI file at `path`.
	pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
		let ini = Ini::from_file(path.as_ref())
			.map_err(|e| anyhow!("Failed to load configuration file {:?}: {:?}", path.as_ref(), e))?;

		Self::try_from(&ini)
	}

	fn value<T>(ini: &Ini, section: &str, key: &str) -> anyhow::Result<Option<T>>
		where T: FromStr, T::Err: Display {
		match ini.get::<String>(section, key) {
			Some(value) => value.trim()
				.parse::<T>()
				.map(Some)
				.map_err(|e| Self::error(section, key, e)),
			None => Ok(None),
		}
	}

	fn vector(ini: &Ini, section: &str, key: &str) -> anyhow::Result<Option<Vector3<f32>>> {
		const VECTOR_LEN: usize = 3;

		let values = match ini.get_vec::<String>(section, key) {
			Some(values) => values,
			None => return Ok(None),
		};

		if values.len() != VECTOR_LEN {
			return Err(Self::error(section, key, format!("expected {} values, found {}",
														  VECTOR_LEN, values.len())));
		}

		let mut vector = Vector3::zeros();
		for (i, value) in values.iter().enumerate() {
			vector[i] = value.trim().parse::<f32>().map_err(|e| Self::error(section, key, e))?;
		}

		Ok(Some(vector))
	}

	fn error<E: Display>(section: &str, key: &str, cause: E) -> anyhow::Error {
		anyhow!("Failed to read configuration: section \"{}\", key \"{}\": {}", section, key, cause)
	}

	/// Numbers that parse but cannot be used: `NaN`, infinities, negative gains, zero scales.
	fn validate(&self) -> anyhow::Result<()> {
		const CALIBRATION_SECTION: &str = "calibration";
		const FILTER_SECTION: &str = "filter";

		let finite = |section, key, vector: &Vector3<f32>| if vector.iter().all(|x| x.is_finite()) {
			Ok(())
		} else {
			Err(Self::error(section, key, "must be finite"))
		};

		finite(CALIBRATION_SECTION, "acc_offset", &self.acc_offset)?;
		finite(CALIBRATION_SECTION, "acc_scale", &self.acc_scale)?;
		finite(CALIBRATION_SECTION, "mag_offset", &self.mag_offset)?;

		if self.acc_scale.iter().any(|x| *x == 0.) {
			return Err(Self::error(CALIBRATION_SECTION, "acc_scale", "must not be zero"));
		}
		if !self.gyro_scale.is_finite() || self.gyro_scale == 0. {
			return Err(Self::error(CALIBRATION_SECTION, "gyro_scale", "must be finite and not zero"));
		}
		if !self.gravity.is_finite() || !(self.gravity > 0.) {
			return Err(Self::error(CALIBRATION_SECTION, "gravity", "must be finite and strictly positive"));
		}

		for (key, gain) in [("two_kp", self.two_kp), ("two_ki", self.two_ki)].iter() {
			if !gain.is_finite() || *gain < 0. {
				return Err(Self::error(FILTER_SECTION, key, "must be finite and not negative"));
			}
		}

		Ok(())
	}
}

pub fn parse_level_filter(name: &str) -> anyhow::Result<LevelFilter> {
	Ok(match name {
		"none" => LevelFilter::Off,
		"error" => LevelFilter::Error,
		"warn" => LevelFilter::Warn,
		"info" => LevelFilter::Info,
		"debug" => LevelFilter::Debug,
		"all" => LevelFilter::Trace,
		other => return Err(anyhow!("Invalid log level filter \"{}\"", other)),
	})
}

impl TryFrom<&Ini> for ImuConfig {
	type Error = anyhow::Error;

	fn try_from(ini: &Ini) -> Result<Self, Self::Error> {
		let mut config = ImuConfig::default();

		const LOG_SECTION: &str = "log";
		const LEVEL_FILTER: &str = "level";

		if let Some(level) = Self::value::<String>(ini, LOG_SECTION, LEVEL_FILTER)? {
			config.log_level_filter = parse_level_filter(&level)
				.map_err(|e| Self::error(LOG_SECTION, LEVEL_FILTER, e))?;
		}

		const CALIBRATION_SECTION: &str = "calibration";

		if let Some(acc_offset) = Self::vector(ini, CALIBRATION_SECTION, "acc_offset")? {
			config.acc_offset = acc_offset;
		}
		if let Some(acc_scale) = Self::vector(ini, CALIBRATION_SECTION, "acc_scale")? {
			config.acc_scale = acc_scale;
		}
		if let Some(mag_offset) = Self::vector(ini, CALIBRATION_SECTION, "mag_offset")? {
			config.mag_offset = mag_offset;
		}
		if let Some(gravity) = Self::value(ini, CALIBRATION_SECTION, "gravity")? {
			config.gravity = gravity;
		}
		if let Some(gyro_scale) = Self::value(ini, CALIBRATION_SECTION, "gyro_scale")? {
			config.gyro_scale = gyro_scale;
		}
		if let Some(zero_samples) = Self::value(ini, CALIBRATION_SECTION, "zero_samples")? {
			config.zero_samples = zero_samples;
		}

		const FILTER_SECTION: &str = "filter";

		if let Some(estimator) = Self::value(ini, FILTER_SECTION, "estimator")? {
			config.estimator = estimator;
		}
		if let Some(two_kp) = Self::value(ini, FILTER_SECTION, "two_kp")? {
			config.two_kp = two_kp;
		}
		if let Some(two_ki) = Self::value(ini, FILTER_SECTION, "two_ki")? {
			config.two_ki = two_ki;
		}
		if let Some(use_magnetometer) = Self::value(ini, FILTER_SECTION, "use_magnetometer")? {
			config.use_magnetometer = use_magnetometer;
		}
		if let Some(yaw_source) = Self::value(ini, FILTER_SECTION, "yaw_source")? {
			config.yaw_source = yaw_source;
		}

		const SAMPLE_PERIOD_KEY: &str = "sample_period";

		if let Some(sample_period) = Self::value::<f32>(ini, FILTER_SECTION, SAMPLE_PERIOD_KEY)? {
			if !(sample_period > 0.) {
				return Err(Self::error(FILTER_SECTION, SAMPLE_PERIOD_KEY, "must be strictly positive"));
			}
			config.sample_period = sample_period;
		}

		config.validate()?;

		Ok(config)
	}
}
