use nalgebra::{Matrix3, RealField, Rotation3, UnitQuaternion, Vector3};
use crate::{min_vector_norm, validate, AhrsError, OrientationEstimator};

/// Direction cosine matrix estimator with the same proportional-integral drift correction as
/// [`QuaternionFilter`](crate::QuaternionFilter), kept as a rotation matrix and re-orthonormalized
/// every tick.
#[derive(Debug, Clone)]
pub struct DirectionCosineFilter<N: RealField> {
	two_kp: N,
	two_ki: N,
	integral_feedback: Vector3<N>,
	/// Body to earth rotation. Rows are the earth axes expressed in the body frame.
	matrix: Matrix3<N>,
}

impl<N: RealField> DirectionCosineFilter<N> {
	pub fn new(two_kp: N, two_ki: N) -> Self {
		Self::with_orientation(two_kp, two_ki, UnitQuaternion::identity())
	}

	pub fn with_orientation(two_kp: N, two_ki: N, orientation: UnitQuaternion<N>) -> Self {
		DirectionCosineFilter {
			two_kp,
			two_ki,
			integral_feedback: nalgebra::zero(),
			matrix: orientation.to_rotation_matrix().into_inner(),
		}
	}

	pub fn integral_feedback(&self) -> &Vector3<N> {
		&self.integral_feedback
	}

	pub fn matrix(&self) -> &Matrix3<N> {
		&self.matrix
	}

	/// Removes the drift of the three rows away from an orthonormal basis.
	fn renormalize(&mut self) {
		let half: N = nalgebra::convert(0.5);
		let three: N = nalgebra::convert(3.0);

		let x = self.matrix.row(0).transpose();
		let y = self.matrix.row(1).transpose();

		// Share the orthogonality error equally between the first two rows
		let error = x.dot(&y);
		let x_orthogonal = x - y * (error * half);
		let y_orthogonal = y - x * (error * half);
		let z_orthogonal = x_orthogonal.cross(&y_orthogonal);

		// First order approximation of 1 / norm, valid for small errors
		let scale = |v: Vector3<N>| v * (half * (three - v.dot(&v)));

		self.matrix = Matrix3::from_rows(&[
			scale(x_orthogonal).transpose(),
			scale(y_orthogonal).transpose(),
			scale(z_orthogonal).transpose(),
		]);
	}
}

impl<N: RealField> OrientationEstimator<N> for DirectionCosineFilter<N> {
	fn update(&mut self,
			  gyroscope: &Vector3<N>,
			  accelerometer: &Vector3<N>,
			  magnetometer: Option<&Vector3<N>>,
			  dt: N) -> Result<(), AhrsError> {
		validate(gyroscope, accelerometer, magnetometer, dt)?;

		let zero: N = nalgebra::zero();
		let one: N = nalgebra::one();
		let half: N = nalgebra::convert(0.5);

		let mut gyro = *gyroscope;

		if let Some(acc) = accelerometer.try_normalize(min_vector_norm()) {
			// Earth z axis seen from the body, i.e. the estimated gravity direction
			let v = self.matrix.row(2).transpose();

			let mut half_e = acc.cross(&v) * half;

			if let Some(mag) = magnetometer.and_then(|m| m.try_normalize(min_vector_norm())) {
				let h = self.matrix * mag;
				let b = Vector3::new((h.x * h.x + h.y * h.y).sqrt(), zero, h.z);
				let w = self.matrix.transpose() * b;

				half_e += mag.cross(&w) * half;
			}

			if self.two_ki > zero {
				self.integral_feedback += half_e * (self.two_ki * dt);
				gyro += self.integral_feedback;
			} else {
				self.integral_feedback = nalgebra::zero();
			}

			gyro += half_e * self.two_kp;
		}

		let w = gyro * dt;

		#[rustfmt::skip]
		let update = Matrix3::new(
			one, -w.z, w.y,
			w.z, one, -w.x,
			-w.y, w.x, one,
		);

		self.matrix = self.matrix * update;
		self.renormalize();

		Ok(())
	}

	fn orientation(&self) -> UnitQuaternion<N> {
		UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.matrix))
	}

	fn reset(&mut self) {
		self.matrix = Matrix3::identity();
		self.integral_feedback = nalgebra::zero();
	}
}
