#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

pub use crate::altimeter::{pressure_to_altitude, Altimeter, LAPSE_RATE, SEA_LEVEL_PRESSURE, SEA_LEVEL_TEMPERATURE};
pub use crate::calibration::Calibration;
pub use crate::config::{parse_level_filter, ImuConfig, YawSource, ACC_OFFSET, ACC_SCALE, GRAVITY,
						GYR_250_DPS_SCALE, MAG_OFFSET, SAMPLE_PERIOD, ZERO_SAMPLES};
pub use crate::gateway::SensorGateway;
pub use crate::handoff::{HandoffGateway, SampleHandoff};
pub use crate::imu::{accel_angles, Imu};
pub use crate::motion::{Attitude12, Motion9, Range, Range3, RawMotion, SWEPT_FRACTION};
pub use crate::roll_pitch_yaw::{RollPitch, RollPitchYaw};

mod altimeter;
mod calibration;
mod config;
mod gateway;
mod handoff;
mod imu;
mod motion;
mod roll_pitch_yaw;

/// Number of pressure samples averaged by the altimeter.
pub const ALTITUDE_WINDOW: usize = 32;
