use nalgebra::{Quaternion, RealField, UnitQuaternion, Vector3};
use crate::{min_vector_norm, validate, AhrsError, OrientationEstimator};

/// Mahony-style complementary filter: gyroscope integration with proportional-integral
/// feedback from the gravity and (optionally) the magnetic field directions.
#[derive(Debug, Clone)]
pub struct QuaternionFilter<N: RealField> {
	/// Proportional gain, doubled.
	two_kp: N,
	/// Integral gain, doubled.
	two_ki: N,
	/// Integral error, scaled by `two_ki`.
	integral_feedback: Vector3<N>,
	/// Filter state quaternion.
	quaternion: Quaternion<N>,
}

impl<N: RealField> QuaternionFilter<N> {
	pub fn new(two_kp: N, two_ki: N) -> Self {
		Self::with_orientation(two_kp, two_ki, UnitQuaternion::identity())
	}

	pub fn with_orientation(two_kp: N, two_ki: N, orientation: UnitQuaternion<N>) -> Self {
		QuaternionFilter {
			two_kp,
			two_ki,
			integral_feedback: nalgebra::zero(),
			quaternion: orientation.into_inner(),
		}
	}

	pub fn integral_feedback(&self) -> &Vector3<N> {
		&self.integral_feedback
	}

	/// Raw state, as stored (not renormalized on read).
	pub fn quaternion(&self) -> &Quaternion<N> {
		&self.quaternion
	}
}

impl<N: RealField> OrientationEstimator<N> for QuaternionFilter<N> {
	fn update(&mut self,
			  gyroscope: &Vector3<N>,
			  accelerometer: &Vector3<N>,
			  magnetometer: Option<&Vector3<N>>,
			  dt: N) -> Result<(), AhrsError> {
		validate(gyroscope, accelerometer, magnetometer, dt)?;

		let q = self.quaternion;

		let zero: N = nalgebra::zero();
		let half: N = nalgebra::convert(0.5);

		let mut gyro = *gyroscope;

		// Compute feedback only if accelerometer measurement is valid
		if let Some(acc) = accelerometer.try_normalize(min_vector_norm()) {
			// Estimated direction of gravity, half length
			#[rustfmt::skip]
			let half_v = Vector3::new(
				q.i * q.k - q.w * q.j,
				q.w * q.i + q.j * q.k,
				q.w * q.w - half + q.k * q.k,
			);

			let mut half_e = acc.cross(&half_v);

			if let Some(mag) = magnetometer.and_then(|m| m.try_normalize(min_vector_norm())) {
				let rotation = UnitQuaternion::new_unchecked(q);

				// Reference direction of Earth's magnetic field
				let h = rotation * mag;
				let b = Vector3::new((h.x * h.x + h.y * h.y).sqrt(), zero, h.z);

				// Estimated direction of magnetic field, half length
				let half_w = rotation.inverse() * b * half;

				half_e += mag.cross(&half_w);
			}

			if self.two_ki > zero {
				self.integral_feedback += half_e * (self.two_ki * dt);
				gyro += self.integral_feedback;
			} else {
				self.integral_feedback = nalgebra::zero();
			}

			// Apply proportional feedback
			gyro += half_e * self.two_kp;
		}

		// Compute rate of change of quaternion
		let q_dot = q * Quaternion::from_parts(zero, gyro) * half;

		// Integrate to yield quaternion
		self.quaternion = (q + q_dot * dt).normalize();

		Ok(())
	}

	fn orientation(&self) -> UnitQuaternion<N> {
		UnitQuaternion::new_normalize(self.quaternion)
	}

	fn reset(&mut self) {
		self.quaternion = UnitQuaternion::identity().into_inner();
		self.integral_feedback = nalgebra::zero();
	}
}
