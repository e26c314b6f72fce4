use serde::Serialize;

#[derive(Serialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct RollPitch<N> {
	pub roll: N,
	pub pitch: N,
}

/// Euler angles in degrees.
#[derive(Serialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct RollPitchYaw<N> {
	pub roll: N,
	pub pitch: N,
	pub yaw: N,
}

impl<N> From<(N, N, N)> for RollPitchYaw<N> {
	fn from((roll, pitch, yaw): (N, N, N)) -> Self {
		RollPitchYaw { roll, pitch, yaw }
	}
}
