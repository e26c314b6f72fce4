#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

use black_box::BlackBox;
use imu::{parse_level_filter, Attitude12, Imu, ImuConfig, RawMotion, SensorGateway};
use serde::{Deserialize, Serialize};
use std::{
	fmt,
	fs::File,
	io::{self, BufRead, BufReader, Write},
	time::{Duration, Instant},
};

/// One line of a recording.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
struct Sample {
	/// Seconds, any origin.
	t: f64,
	acc: [i16; 3],
	gyr: [i16; 3],
	mag: [i16; 3],
	/// Pa
	pressure: f32,
}

#[derive(Serialize)]
struct Frame {
	t: f64,
	#[serde(flatten)]
	attitude: Attitude12,
	altitude: f32,
}

#[derive(Debug, Eq, PartialEq)]
enum ReplayError {
	Exhausted,
	NoSample,
}

impl fmt::Display for ReplayError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ReplayError::Exhausted => write!(f, "recording exhausted"),
			ReplayError::NoSample => write!(f, "pressure read before any motion sample"),
		}
	}
}

impl std::error::Error for ReplayError {}

/// Serves recorded samples in order: every motion read moves to the next sample, pressure reads
/// return the pressure of the current one.
struct ReplayGateway {
	samples: std::vec::IntoIter<Sample>,
	current: Option<Sample>,
}

impl ReplayGateway {
	fn new(samples: Vec<Sample>) -> Self {
		ReplayGateway {
			samples: samples.into_iter(),
			current: None,
		}
	}

	/// Time of the sample the next motion read returns.
	fn next_time(&self) -> Option<f64> {
		self.samples.as_slice().first().map(|sample| sample.t)
	}
}

impl SensorGateway for ReplayGateway {
	type Error = ReplayError;

	fn read_motion(&mut self) -> Result<RawMotion, Self::Error> {
		let sample = self.samples.next().ok_or(ReplayError::Exhausted)?;
		self.current = Some(sample);

		Ok(RawMotion {
			acc: sample.acc,
			gyr: sample.gyr,
			mag: sample.mag,
		})
	}

	fn read_pressure(&mut self) -> Result<f32, Self::Error> {
		self.current
			.map(|sample| sample.pressure)
			.ok_or(ReplayError::NoSample)
	}
}

/// JSON lines, blank lines skipped.
fn parse_samples<R: BufRead>(reader: R) -> anyhow::Result<Vec<Sample>> {
	let mut samples = Vec::new();

	for (index, line) in reader.lines().enumerate() {
		let line = line?;
		if line.trim().is_empty() {
			continue;
		}

		let sample = serde_json::from_str(&line)
			.map_err(|e| anyhow!("Invalid sample on line {}: {}", index + 1, e))?;
		samples.push(sample);
	}

	Ok(samples)
}

/// Initializes on the head of the recording, then writes one frame per remaining sample.
fn replay<W: Write>(imu: &mut Imu<ReplayGateway>, output: &mut W) -> anyhow::Result<usize> {
	imu.init()?;

	let origin = match imu.gateway_mut().next_time() {
		Some(t) => t,
		None => return Err(anyhow!("Recording too short for {} zeroing samples", imu.config().zero_samples)),
	};

	let start = Instant::now();
	let mut frames = 0;

	while let Some(t) = imu.gateway_mut().next_time() {
		let attitude = imu.attitude_at(start + Duration::from_secs_f64((t - origin).max(0.)))?;
		let altitude = imu.altitude()?;

		serde_json::to_writer(&mut *output, &Frame { t, attitude, altitude })?;
		writeln!(output)?;

		frames += 1;
	}

	Ok(frames)
}

fn main() -> anyhow::Result<()> {
	const INPUT_ARG: &str = "input";
	const CONFIG_ARG: &str = "config";
	const LOG_LEVEL_ARG: &str = "log-level";
	const LOG_FILE_ARG: &str = "log-file";

	let args = clap::Command::new("replay")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Runs the attitude estimator over a recorded sample file")
		.arg(clap::Arg::new(INPUT_ARG)
			.long("input")
			.short('i')
			.takes_value(true)
			.required(true)
			.help("JSON lines recording: {\"t\", \"acc\", \"gyr\", \"mag\", \"pressure\"}"))
		.arg(clap::Arg::new(CONFIG_ARG)
			.long("config")
			.short('c')
			.takes_value(true)
			.help("INI configuration overriding the firmware constants"))
		.arg(clap::Arg::new(LOG_LEVEL_ARG)
			.long("log-level")
			.takes_value(true)
			.help("Overrides the configured log level: none, error, warn, info, debug or all"))
		.arg(clap::Arg::new(LOG_FILE_ARG)
			.long("log-file")
			.takes_value(true)
			.help("Log file, timestamped in the working directory by default"))
		.get_matches();

	// Configuration
	let mut config = match args.value_of(CONFIG_ARG) {
		Some(path) => ImuConfig::read(path)?,
		None => ImuConfig::default(),
	};

	if let Some(level) = args.value_of(LOG_LEVEL_ARG) {
		config.log_level_filter = parse_level_filter(level)?;
	}

	// Log
	let black_box = match args.value_of(LOG_FILE_ARG) {
		Some(path) => BlackBox::with_path(path)?,
		None => BlackBox::new()?,
	};
	black_box.spawn(config.log_level_filter)?;

	info!("Replay {}", env!("CARGO_PKG_VERSION"));

	// Recording
	let input = args.value_of(INPUT_ARG).ok_or_else(|| anyhow!("Missing input file"))?;
	let file = File::open(input).map_err(|e| anyhow!("Failed to open {}: {}", input, e))?;
	let samples = parse_samples(BufReader::new(file))?;

	info!("Loaded {} samples from {}", samples.len(), input);

	let mut imu = Imu::new(ReplayGateway::new(samples), config);

	let stdout = io::stdout();
	let result = replay(&mut imu, &mut stdout.lock());

	match &result {
		Ok(frames) => info!("Replayed {} frames", frames),
		Err(e) => error!("Replay failed: {}", e),
	}

	log::logger().flush();
	std::thread::sleep(Duration::from_millis(100));

	result.map(|_| ())
}
