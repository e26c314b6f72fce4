use nalgebra::{RealField, zero};

/// Arithmetic mean over the last `CAPACITY` samples, stored in a fixed ring.
///
/// The oldest sample is overwritten first. Until the ring is full, the mean covers only the
/// samples pushed so far.
#[derive(Debug, Clone)]
pub struct MovingAverage<N: RealField, const CAPACITY: usize> {
	buffer: [N; CAPACITY],
	cursor: usize,
	len: usize,
}

impl<N: RealField, const CAPACITY: usize> MovingAverage<N, CAPACITY> {
	pub fn new() -> Self {
		Self {
			buffer: [zero(); CAPACITY],
			cursor: 0,
			len: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn is_full(&self) -> bool {
		self.len == CAPACITY
	}

	pub fn reset(&mut self) {
		self.buffer = [zero(); CAPACITY];
		self.cursor = 0;
		self.len = 0;
	}

	/// Pushes `value` and returns the updated mean.
	pub fn update(&mut self, value: N) -> N {
		if CAPACITY == 0 {
			return value;
		}

		self.buffer[self.cursor] = value;
		self.cursor = (self.cursor + 1) % CAPACITY;

		if self.len < CAPACITY {
			self.len += 1;
		}

		self.mean()
	}

	/// Zero when empty.
	pub fn mean(&self) -> N {
		if self.len == 0 {
			return zero();
		}

		// Slots past `len` are still zero when the ring is not full
		let sum = self.buffer.iter().fold(zero::<N>(), |sum, value| sum + *value);
		sum / nalgebra::convert::<f64, N>(self.len as f64)
	}
}

impl<N: RealField, const CAPACITY: usize> Default for MovingAverage<N, CAPACITY> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::MovingAverage;
	use assert_approx_eq::assert_approx_eq;

	#[test]
	fn empty_mean_is_zero() {
		let average = MovingAverage::<f32, 4>::new();
		assert!(average.is_empty());
		assert_eq!(average.mean(), 0.);
	}

	#[test]
	fn partial_window_averages_pushed_samples() {
		let mut average = MovingAverage::<f64, 4>::new();

		assert_approx_eq!(average.update(2.), 2.);
		assert_approx_eq!(average.update(4.), 3.);
		assert_eq!(average.len(), 2);
		assert!(!average.is_full());
	}

	#[test]
	fn oldest_sample_is_overwritten() {
		let mut average = MovingAverage::<f64, 3>::new();

		for value in &[1., 2., 3.] {
			average.update(*value);
		}
		assert!(average.is_full());
		assert_approx_eq!(average.mean(), 2.);

		// Replaces 1.
		assert_approx_eq!(average.update(7.), 4.);
		// Replaces 2.
		assert_approx_eq!(average.update(8.), 6.);
		assert_eq!(average.len(), 3);
	}

	#[test]
	fn outlier_self_heals_within_capacity() {
		let mut average = MovingAverage::<f64, 8>::new();

		for _ in 0..8 {
			average.update(10.);
		}
		assert_approx_eq!(average.update(90.), 20.);

		for _ in 0..7 {
			average.update(10.);
		}
		assert_approx_eq!(average.mean(), 20.);
		assert_approx_eq!(average.update(10.), 10.);
	}

	#[test]
	fn reset_clears_window() {
		let mut average = MovingAverage::<f32, 4>::new();
		average.update(5.);
		average.reset();

		assert!(average.is_empty());
		assert_approx_eq!(average.update(1.), 1.);
	}
}
