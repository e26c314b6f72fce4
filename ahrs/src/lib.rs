pub use crate::direction_cosine_filter::DirectionCosineFilter;
pub use crate::estimator::{Estimator, EstimatorKind};
pub use crate::heading::{euler_degrees, tilt_compensated_heading, wrap_degrees};
pub use crate::quaternion_filter::QuaternionFilter;
use nalgebra::{RealField, UnitQuaternion, Vector3};
use std::fmt;

mod direction_cosine_filter;
mod estimator;
mod heading;
mod quaternion_filter;

/// Default proportional gain, doubled.
pub const TWO_KP: f64 = 2.0 * 0.5;

/// Default integral gain, doubled.
pub const TWO_KI: f64 = 2.0 * 0.1;

/// Vectors shorter than this are treated as missing (saturated or free-falling sensor).
const MIN_VECTOR_NORM: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AhrsError {
	/// A NaN or infinite value reached the filter; the tick was discarded.
	NonFiniteInput,
	/// Time delta was not strictly positive.
	InvalidTimeDelta,
}

impl fmt::Display for AhrsError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AhrsError::NonFiniteInput => write!(f, "non-finite sensor input"),
			AhrsError::InvalidTimeDelta => write!(f, "time delta must be strictly positive"),
		}
	}
}

impl std::error::Error for AhrsError {}

/// Attitude estimators fusing body rates with the gravity and magnetic field references.
///
/// Implementations keep their state on `Err`: a rejected tick never reaches the orientation.
pub trait OrientationEstimator<N: RealField> where Self: Send + Sync + 'static {
	/// `gyroscope` in rad/s, `accelerometer` and `magnetometer` in any consistent unit.
	/// An accelerometer of near-zero norm skips the correction step for this tick.
	fn update(&mut self,
			  gyroscope: &Vector3<N>,
			  accelerometer: &Vector3<N>,
			  magnetometer: Option<&Vector3<N>>,
			  dt: N) -> Result<(), AhrsError>;

	fn update_imu(&mut self,
				  gyroscope: &Vector3<N>,
				  accelerometer: &Vector3<N>,
				  dt: N) -> Result<(), AhrsError> {
		self.update(gyroscope, accelerometer, None, dt)
	}

	/// Rotation from the body frame to the earth frame (z up).
	fn orientation(&self) -> UnitQuaternion<N>;

	/// Back to identity, integral feedback cleared.
	fn reset(&mut self);
}

#[inline]
pub(crate) fn is_finite<N: RealField>(value: N) -> bool {
	// NaN and infinities are the only values for which `x - x` is not zero
	value - value == N::zero()
}

pub(crate) fn validate<N: RealField>(gyroscope: &Vector3<N>,
									 accelerometer: &Vector3<N>,
									 magnetometer: Option<&Vector3<N>>,
									 dt: N) -> Result<(), AhrsError> {
	let finite = |v: &Vector3<N>| v.iter().all(|x| is_finite(*x));

	if !finite(gyroscope) || !finite(accelerometer) || !magnetometer.map_or(true, finite) {
		return Err(AhrsError::NonFiniteInput);
	}

	if !is_finite(dt) || dt <= N::zero() {
		return Err(AhrsError::InvalidTimeDelta);
	}

	Ok(())
}

#[inline]
pub(crate) fn min_vector_norm<N: RealField>() -> N {
	nalgebra::convert(MIN_VECTOR_NORM)
}
