use crossbeam_utils::{atomic::AtomicCell, Backoff};
use std::{convert::Infallible, sync::Arc};
use crate::{altimeter::SEA_LEVEL_PRESSURE, RawMotion, SensorGateway};

/// Three 64 bit words behind a sequence number. The sequence is odd while a write is in
/// progress; a read is valid when the sequence was even and did not change across it.
///
/// One writer and one reader at most. The writer never waits, the reader retries when a write
/// lands in the middle of its read.
#[derive(Debug, Default)]
struct Slot {
	sequence: AtomicCell<u64>,
	words: [AtomicCell<u64>; 3],
	/// Sequence of the last value taken by the reader.
	consumed: AtomicCell<u64>,
}

impl Slot {
	fn store(&self, words: [u64; 3]) {
		self.sequence.fetch_add(1);

		for (cell, word) in self.words.iter().zip(words.iter()) {
			cell.store(*word);
		}

		self.sequence.fetch_add(1);
	}

	/// Words written since the previous take, if any.
	fn take(&self) -> Option<[u64; 3]> {
		let backoff = Backoff::new();

		loop {
			let before = self.sequence.load();
			if before % 2 == 1 {
				backoff.snooze();
				continue;
			}

			let words = [self.words[0].load(), self.words[1].load(), self.words[2].load()];

			if self.sequence.load() != before {
				backoff.spin();
				continue;
			}

			if before == 0 || before == self.consumed.load() {
				return None;
			}

			self.consumed.store(before);
			return Some(words);
		}
	}
}

fn pack(axes: &[i16; 3]) -> u64 {
	axes.iter()
		.enumerate()
		.fold(0, |word, (lane, axis)| word | u64::from(*axis as u16) << (16 * lane))
}

fn unpack(word: u64) -> [i16; 3] {
	[word as u16 as i16, (word >> 16) as u16 as i16, (word >> 32) as u16 as i16]
}

/// Single-slot mailboxes between a sample producer (driver callback, interrupt handler) and the
/// control loop. A newer sample replaces an unread one.
///
/// Samples are packed into 64 bit atomics, so publishing never takes a lock on targets with
/// native 64 bit atomics (see [`SampleHandoff::is_lock_free`]). One producer and one consumer.
#[derive(Debug, Default)]
pub struct SampleHandoff {
	motion: Slot,
	pressure: Slot,
}

impl SampleHandoff {
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether the underlying cells are native atomics on this target.
	pub fn is_lock_free() -> bool {
		AtomicCell::<u64>::is_lock_free()
	}

	pub fn publish_motion(&self, motion: RawMotion) {
		self.motion.store([pack(&motion.acc), pack(&motion.gyr), pack(&motion.mag)]);
	}

	pub fn publish_pressure(&self, pressure: f32) {
		self.pressure.store([u64::from(pressure.to_bits()), 0, 0]);
	}

	pub fn take_motion(&self) -> Option<RawMotion> {
		self.motion.take().map(|[acc, gyr, mag]| RawMotion {
			acc: unpack(acc),
			gyr: unpack(gyr),
			mag: unpack(mag),
		})
	}

	pub fn take_pressure(&self) -> Option<f32> {
		self.pressure.take().map(|[bits, _, _]| f32::from_bits(bits as u32))
	}
}

/// Gateway reading from a [`SampleHandoff`]. When nothing new was published since the last
/// read, the previous sample is served again.
#[derive(Debug)]
pub struct HandoffGateway {
	handoff: Arc<SampleHandoff>,
	motion: RawMotion,
	pressure: f32,
	stale_reads: u64,
}

impl HandoffGateway {
	pub fn new(handoff: Arc<SampleHandoff>) -> Self {
		Self {
			handoff,
			motion: RawMotion::default(),
			pressure: SEA_LEVEL_PRESSURE,
			stale_reads: 0,
		}
	}

	/// Number of reads that found no fresh sample.
	pub fn stale_reads(&self) -> u64 {
		self.stale_reads
	}
}

impl SensorGateway for HandoffGateway {
	type Error = Infallible;

	fn read_motion(&mut self) -> Result<RawMotion, Self::Error> {
		match self.handoff.take_motion() {
			Some(motion) => self.motion = motion,
			None => self.stale_reads += 1,
		}

		Ok(self.motion)
	}

	fn read_pressure(&mut self) -> Result<f32, Self::Error> {
		match self.handoff.take_pressure() {
			Some(pressure) => self.pressure = pressure,
			None => self.stale_reads += 1,
		}

		Ok(self.pressure)
	}
}
