use nalgebra::{RealField, UnitQuaternion, Vector3};
use std::{fmt, str::FromStr};
use crate::{AhrsError, DirectionCosineFilter, OrientationEstimator, QuaternionFilter};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EstimatorKind {
	Quaternion,
	DirectionCosine,
}

impl FromStr for EstimatorKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"quaternion" | "mahony" => Ok(EstimatorKind::Quaternion),
			"dcm" | "direction_cosine" => Ok(EstimatorKind::DirectionCosine),
			other => Err(format!("Unknown estimator \"{}\"", other)),
		}
	}
}

impl fmt::Display for EstimatorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EstimatorKind::Quaternion => write!(f, "quaternion"),
			EstimatorKind::DirectionCosine => write!(f, "dcm"),
		}
	}
}

/// Estimator picked at construction time.
#[derive(Debug, Clone)]
pub enum Estimator<N: RealField> {
	Quaternion(QuaternionFilter<N>),
	DirectionCosine(DirectionCosineFilter<N>),
}

impl<N: RealField> Estimator<N> {
	pub fn new(kind: EstimatorKind, two_kp: N, two_ki: N) -> Self {
		match kind {
			EstimatorKind::Quaternion => Estimator::Quaternion(QuaternionFilter::new(two_kp, two_ki)),
			EstimatorKind::DirectionCosine => {
				Estimator::DirectionCosine(DirectionCosineFilter::new(two_kp, two_ki))
			}
		}
	}

	pub fn kind(&self) -> EstimatorKind {
		match self {
			Estimator::Quaternion(_) => EstimatorKind::Quaternion,
			Estimator::DirectionCosine(_) => EstimatorKind::DirectionCosine,
		}
	}

	pub fn integral_feedback(&self) -> &Vector3<N> {
		match self {
			Estimator::Quaternion(filter) => filter.integral_feedback(),
			Estimator::DirectionCosine(filter) => filter.integral_feedback(),
		}
	}
}

impl<N: RealField> OrientationEstimator<N> for Estimator<N> {
	fn update(&mut self,
			  gyroscope: &Vector3<N>,
			  accelerometer: &Vector3<N>,
			  magnetometer: Option<&Vector3<N>>,
			  dt: N) -> Result<(), AhrsError> {
		match self {
			Estimator::Quaternion(filter) => filter.update(gyroscope, accelerometer, magnetometer, dt),
			Estimator::DirectionCosine(filter) => {
				filter.update(gyroscope, accelerometer, magnetometer, dt)
			}
		}
	}

	fn orientation(&self) -> UnitQuaternion<N> {
		match self {
			Estimator::Quaternion(filter) => filter.orientation(),
			Estimator::DirectionCosine(filter) => filter.orientation(),
		}
	}

	fn reset(&mut self) {
		match self {
			Estimator::Quaternion(filter) => filter.reset(),
			Estimator::DirectionCosine(filter) => filter.reset(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_from_str() {
		assert_eq!("quaternion".parse(), Ok(EstimatorKind::Quaternion));
		assert_eq!("mahony".parse(), Ok(EstimatorKind::Quaternion));
		assert_eq!("dcm".parse(), Ok(EstimatorKind::DirectionCosine));
		assert!("kalman".parse::<EstimatorKind>().is_err());
	}

	#[test]
	fn new_builds_requested_variant() {
		for kind in &[EstimatorKind::Quaternion, EstimatorKind::DirectionCosine] {
			let estimator = Estimator::<f32>::new(*kind, 1.0, 0.2);
			assert_eq!(estimator.kind(), *kind);
			assert!(estimator.orientation().angle_to(&UnitQuaternion::identity()) < 1e-6);
		}
	}

	#[test]
	fn display_round_trips_through_from_str() {
		let kind = EstimatorKind::DirectionCosine;
		assert_eq!(kind.to_string().parse(), Ok(kind));
	}
}
