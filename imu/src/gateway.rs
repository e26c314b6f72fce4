use crate::RawMotion;

/// Access to the inertial and barometric device drivers.
///
/// Reads are polls: implementations return the latest available sample and never wait for a fresh
/// one. Retrying a failed bus transaction is the implementation's business.
pub trait SensorGateway {
	type Error: std::error::Error + Send + Sync + 'static;

	fn read_motion(&mut self) -> Result<RawMotion, Self::Error>;

	/// Static pressure in Pa.
	fn read_pressure(&mut self) -> Result<f32, Self::Error>;
}

impl<G: SensorGateway + ?Sized> SensorGateway for &mut G {
	type Error = G::Error;

	fn read_motion(&mut self) -> Result<RawMotion, Self::Error> {
		(**self).read_motion()
	}

	fn read_pressure(&mut self) -> Result<f32, Self::Error> {
		(**self).read_pressure()
	}
}
