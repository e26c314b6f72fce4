use nalgebra::{RealField, UnitQuaternion, Vector3};
use crate::min_vector_norm;

/// Maps an angle in degrees into `[0, 360)`.
pub fn wrap_degrees<N: RealField>(angle: N) -> N {
	let full_turn: N = nalgebra::convert(360.0);

	let wrapped = angle % full_turn;
	let wrapped = if wrapped < N::zero() { wrapped + full_turn } else { wrapped };

	// `-tiny + 360` rounds to 360
	if wrapped >= full_turn { N::zero() } else { wrapped }
}

fn to_degrees<N: RealField>(radians: N) -> N {
	radians * nalgebra::convert(180.0) / N::pi()
}

/// Roll, pitch and yaw in degrees, yaw within `[0, 360)`.
pub fn euler_degrees<N: RealField>(orientation: &UnitQuaternion<N>) -> (N, N, N) {
	let (roll, pitch, yaw) = orientation.euler_angles();
	(to_degrees(roll), to_degrees(pitch), wrap_degrees(to_degrees(yaw)))
}

/// Magnetic heading in degrees within `[0, 360)`, counter-clockwise about the measured up axis
/// (same sense as the estimators' yaw).
///
/// The magnetic field is projected onto the plane orthogonal to `accelerometer`, which makes the
/// result independent of tilt. Returns `None` when either vector is degenerate or when the field
/// is aligned with gravity.
pub fn tilt_compensated_heading<N: RealField>(accelerometer: &Vector3<N>,
											  magnetometer: &Vector3<N>) -> Option<N> {
	let up = accelerometer.try_normalize(min_vector_norm())?;

	let horizontal = magnetometer - up * magnetometer.dot(&up);
	let north = horizontal.try_normalize(min_vector_norm())?;
	let west = up.cross(&north);

	// Angle of the body x axis from magnetic north, in the horizontal plane
	Some(wrap_degrees(to_degrees(west.x.atan2(north.x))))
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_approx_eq::assert_approx_eq;

	#[test]
	fn wrap_degrees_test() {
		assert_approx_eq!(wrap_degrees(0f32), 0.);
		assert_approx_eq!(wrap_degrees(370f32), 10.);
		assert_approx_eq!(wrap_degrees(-90f32), 270.);
		assert_approx_eq!(wrap_degrees(-720f32), 0.);
		assert_eq!(wrap_degrees(-1e-6f32), 0.);
	}

	#[test]
	fn euler_degrees_wraps_yaw() {
		let orientation = UnitQuaternion::from_euler_angles(
			10f64.to_radians(), -20f64.to_radians(), -30f64.to_radians());
		let (roll, pitch, yaw) = euler_degrees(&orientation);

		assert_approx_eq!(roll, 10., 1e-9);
		assert_approx_eq!(pitch, -20., 1e-9);
		assert_approx_eq!(yaw, 330., 1e-9);
	}

	#[test]
	fn level_heading_follows_field() {
		let up = Vector3::new(0f64, 0., 1.);

		let north = tilt_compensated_heading(&up, &Vector3::new(1., 0., 0.)).unwrap();
		assert!(north < 1e-9 || north > 360. - 1e-9);

		// North on the left of the body means the body faces 90 degrees clockwise
		assert_approx_eq!(tilt_compensated_heading(&up, &Vector3::new(0., 1., 0.)).unwrap(), 270., 1e-9);
		assert_approx_eq!(tilt_compensated_heading(&up, &Vector3::new(-1., 0., 0.)).unwrap(), 180., 1e-9);
		assert_approx_eq!(tilt_compensated_heading(&up, &Vector3::new(0., -1., 0.)).unwrap(), 90., 1e-9);
	}

	#[test]
	fn vertical_field_component_is_ignored() {
		let up = Vector3::new(0f64, 0., 1.);

		let flat = tilt_compensated_heading(&up, &Vector3::new(0.3, 0.2, 0.)).unwrap();
		let dipped = tilt_compensated_heading(&up, &Vector3::new(0.3, 0.2, -0.8)).unwrap();

		assert_approx_eq!(flat, dipped, 1e-9);
	}

	#[test]
	fn heading_is_tilt_independent() {
		let yaw = 40f64.to_radians();
		let field = Vector3::new(0.4, 0., -0.3);

		let level = UnitQuaternion::from_euler_angles(0., 0., yaw);
		let tilted = UnitQuaternion::from_euler_angles(0.35, -0.25, yaw);

		let heading = |orientation: UnitQuaternion<f64>| {
			let body = orientation.inverse();
			tilt_compensated_heading(&(body * Vector3::z()), &(body * field)).unwrap()
		};

		assert_approx_eq!(heading(level), 40., 1e-6);
		assert_approx_eq!(heading(tilted), 40., 1e-6);
	}

	#[test]
	fn degenerate_inputs() {
		let up = Vector3::new(0f32, 0., 1.);

		assert!(tilt_compensated_heading::<f32>(&Vector3::zeros(), &Vector3::x()).is_none());
		assert!(tilt_compensated_heading(&up, &Vector3::zeros()).is_none());
		assert!(tilt_compensated_heading(&up, &Vector3::new(0., 0., -2.)).is_none());
	}
}
