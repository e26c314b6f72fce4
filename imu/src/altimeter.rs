use dsp::MovingAverage;
use crate::ALTITUDE_WINDOW;

/// Reference pressure at zero altitude (Pa).
pub const SEA_LEVEL_PRESSURE: f32 = 101_325.;

/// Reference temperature at zero altitude (K).
pub const SEA_LEVEL_TEMPERATURE: f32 = 288.15;

/// Standard atmosphere temperature lapse rate (K/m).
pub const LAPSE_RATE: f32 = 0.0065;

/// `R * L / (g * M)` for dry air.
const BAROMETRIC_EXPONENT: f32 = 0.190_263;

/// Altitude in metres above the reference pressure level, standard atmosphere.
pub fn pressure_to_altitude(pressure: f32) -> f32 {
	SEA_LEVEL_TEMPERATURE / LAPSE_RATE
		* (1. - (pressure / SEA_LEVEL_PRESSURE).powf(BAROMETRIC_EXPONENT))
}

/// Barometric altitude smoothed over the last [`ALTITUDE_WINDOW`] samples.
#[derive(Debug, Clone, Default)]
pub struct Altimeter {
	window: MovingAverage<f32, ALTITUDE_WINDOW>,
}

impl Altimeter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reset(&mut self) {
		self.window.reset();
	}

	/// Feeds one pressure sample (Pa) and returns the smoothed altitude. Unusable samples are
	/// dropped and the previous estimate is returned.
	pub fn update(&mut self, pressure: f32) -> f32 {
		if !pressure.is_finite() || pressure <= 0. {
			warn!("Dropped pressure sample {}", pressure);
			return self.window.mean();
		}

		self.window.update(pressure_to_altitude(pressure))
	}

	pub fn altitude(&self) -> f32 {
		self.window.mean()
	}
}
