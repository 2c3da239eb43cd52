// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! A windowed front-end for the gameboy core library.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter, Log, Metadata, Record};
use minifb::{Key, Scale, Window, WindowOptions};

use dmg_emu::bus::joypad::{Button, Controller, InputState};
use dmg_emu::bus::ppu::compositor::{Frame, HEIGHT, WIDTH};
use dmg_emu::session::{Session, SessionState};
use dmg_emu::{Config, Emulator, GameboyError};

/// The 0xRRGGBB color of each shade, from the lightest.
const PALETTE: [u32; 4] = [0xe0f8d0, 0x88c070, 0x346856, 0x081820];

const KEYMAP: [(Key, Button); 9] = [
	(Key::Right, Button::Right),
	(Key::Left, Button::Left),
	(Key::Up, Button::Up),
	(Key::Down, Button::Down),
	(Key::Enter, Button::Start),
	(Key::RightShift, Button::Select),
	(Key::Space, Button::Select),
	(Key::Z, Button::B),
	(Key::X, Button::A),
];

#[derive(Parser, Debug)]
#[command(name = "emulator", about = "Run a GameBoy cartridge in a window.")]
struct Args {
	/// The rom image to run.
	rom: PathBuf,

	/// Window scale factor (1, 2, 4 or 8).
	#[arg(long, default_value_t = 4)]
	scale: u8,

	/// Pause when reaching this address (hex), may be repeated.
	#[arg(long = "break", value_name = "ADDR", value_parser = parse_address)]
	breakpoints: Vec<u16>,

	/// The most verbose level to log.
	#[arg(long, default_value_t = LevelFilter::Info)]
	log_level: LevelFilter,
}

fn parse_address(value: &str) -> Result<u16, String> {
	let digits = value.trim_start_matches("0x").trim_start_matches("0X");
	u16::from_str_radix(digits, 16).map_err(|err| format!("invalid address {}: {}", value, err))
}

/// Writes the log records to stderr.
struct StderrLogger;

impl Log for StderrLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
		}
	}

	fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

enum EmulatorError {
	Std(std::io::Error),
	Gameboy(GameboyError),
	Window(minifb::Error),
	Scale(u8),
}

impl From<std::io::Error> for EmulatorError {
	fn from(e: std::io::Error) -> Self {
		EmulatorError::Std(e)
	}
}

impl From<GameboyError> for EmulatorError {
	fn from(e: GameboyError) -> Self {
		EmulatorError::Gameboy(e)
	}
}

impl From<minifb::Error> for EmulatorError {
	fn from(e: minifb::Error) -> Self {
		EmulatorError::Window(e)
	}
}

impl fmt::Debug for EmulatorError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			EmulatorError::Std(ref err) => err.fmt(f),
			EmulatorError::Gameboy(ref err) => fmt::Display::fmt(err, f),
			EmulatorError::Window(ref err) => err.fmt(f),
			EmulatorError::Scale(scale) => write!(f, "unsupported scale factor {}", scale),
		}
	}
}

fn window_scale(scale: u8) -> Result<Scale, EmulatorError> {
	match scale {
		1 => Ok(Scale::X1),
		2 => Ok(Scale::X2),
		4 => Ok(Scale::X4),
		8 => Ok(Scale::X8),
		_ => Err(EmulatorError::Scale(scale)),
	}
}

fn update_key_state(input: &mut InputState, window: &Window) {
	let mut pressed = 0;

	// Several keys may map to the same button.
	for (key, button) in KEYMAP.iter() {
		if window.is_key_down(*key) {
			pressed |= button.value();
		}
	}

	for button in Button::ALL.iter() {
		if pressed & button.value() != 0 {
			input.down(*button);
		} else {
			input.up(*button);
		}
	}
}

fn draw(frame: &Frame, buffer: &mut [u32]) {
	for (pixel, shade) in buffer.iter_mut().zip(frame.iter()) {
		*pixel = PALETTE[(*shade & 3) as usize];
	}
}

fn main() -> Result<(), EmulatorError> {
	let args = Args::parse();

	// The logger can only be set once, right here.
	let _ = log::set_logger(&LOGGER);
	log::set_max_level(args.log_level);

	let rom = fs::read(&args.rom)?;
	let mut emulator = Emulator::new(Config::default(), rom)?;

	for address in args.breakpoints.iter() {
		emulator.toggle_breakpoint(*address);
	}

	let mut window = Window::new(
		"GameBoy",
		WIDTH,
		HEIGHT,
		WindowOptions {
			scale: window_scale(args.scale)?,
			..WindowOptions::default()
		},
	)?;
	window.set_target_fps(60);

	let mut buffer: Vec<u32> = vec![PALETTE[0]; WIDTH * HEIGHT];

	let session = Session::start_realtime(emulator);
	let frames = session.frames();
	let mut input = session.input();

	while window.is_open() && !window.is_key_down(Key::Escape) {
		if let Some(frame) = frames.take() {
			draw(&frame, &mut buffer);
		}

		window.update_with_buffer(&buffer, WIDTH, HEIGHT)?;
		update_key_state(&mut input, &window);

		if session.state() == SessionState::Stopped {
			break;
		}
	}

	let faulted = session.state() == SessionState::Faulted;

	// Stopping a worker that exited on its own is fine.
	let _ = session.stop();
	let emulator = session.join()?;

	let statistics = emulator.statistics();
	info!("executed {} instructions, {} frames", statistics.instructions, statistics.frames);

	if faulted {
		return Err(GameboyError::Faulted.into());
	}

	Ok(())
}
