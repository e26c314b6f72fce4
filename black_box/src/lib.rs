#[macro_use]
extern crate lazy_static;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::{
	collections::VecDeque,
	fs::{File, OpenOptions},
	io::{self, Write},
	path::Path,
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

lazy_static! {
	static ref BLACK_BOX_CHANNEL: (Sender<Message>, Receiver<Message>) = unbounded::<Message>();
	static ref BLACK_BOX_LOGGER: BlackBoxLogger = BlackBoxLogger {
		start_instant: Instant::now()
	};
}

enum Message {
	Log(String),
	Flush,
}

/// Buffered log file writer, fed by the global logger installed by [`BlackBox::spawn`].
pub struct BlackBox {
	file: File,
	buffer: VecDeque<String>,
}

/// Buffered lines are written out once this many are pending.
const MAX_BUFFER_LEN: usize = 8;

impl BlackBox {
	/// Log file named after the local start time, in the working directory.
	pub fn new() -> io::Result<Self> {
		let file_name = chrono::Local::now()
			.format("ahrs_%Y-%m-%d_%H-%M-%S.log")
			.to_string();

		Self::with_path(file_name)
	}

	pub fn with_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
		Ok(BlackBox {
			file: OpenOptions::new()
				.write(true)
				.create(true)
				.truncate(true)
				.open(path)?,
			buffer: VecDeque::with_capacity(MAX_BUFFER_LEN),
		})
	}

	fn try_flush(&mut self) {
		if let Err(e) = self.flush() {
			self.buffer.push_back(format!("Failed to flush black box: {}", e));
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		while let Some(line) = self.buffer.front() {
			writeln!(self.file, "{}", line)?;
			self.buffer.pop_front();
		}
		self.file.flush()
	}

	fn receive(&mut self, message: Message) {
		match message {
			Message::Log(line) => self.buffer.push_back(line),
			Message::Flush => self.try_flush(),
		}

		if self.buffer.len() >= MAX_BUFFER_LEN {
			self.try_flush();
		}
	}

	fn receive_loop(&mut self) {
		const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

		while let Ok(message) = BLACK_BOX_CHANNEL.1.recv_timeout(RECEIVE_TIMEOUT) {
			self.receive(message);
		}

		// Idle
		if !self.buffer.is_empty() {
			self.try_flush();
		}
	}

	/// Installs the global logger and moves the writer to its own thread. Fails if a logger is
	/// already installed.
	pub fn spawn(mut self, level_filter: LevelFilter) -> Result<JoinHandle<()>, SetLoggerError> {
		log::set_logger(&*BLACK_BOX_LOGGER)?;
		log::set_max_level(level_filter);

		Ok(thread::spawn(move || loop {
			self.receive_loop()
		}))
	}
}

/// `[elapsed][level][module] message`, followed by the source location for errors.
pub fn format_record(elapsed: Duration, record: &Record) -> String {
	let module = record.module_path().unwrap_or("unknown");

	if record.level() == Level::Error {
		format!("[{:.3}][{:?}][{}] {} ({}:{})",
				elapsed.as_secs_f32(),
				record.level(),
				module,
				record.args(),
				record.file().unwrap_or("unknown"),
				record.line().unwrap_or(0))
	} else {
		format!("[{:.3}][{:?}][{}] {}",
				elapsed.as_secs_f32(),
				record.level(),
				module,
				record.args())
	}
}

struct BlackBoxLogger {
	start_instant: Instant,
}

impl Log for BlackBoxLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			let line = format_record(self.start_instant.elapsed(), record);

			// The receiver lives in a static, sending cannot fail
			let _ = BLACK_BOX_CHANNEL.0.send(Message::Log(line));
		}
	}

	fn flush(&self) {
		let _ = BLACK_BOX_CHANNEL.0.send(Message::Flush);
	}
}
