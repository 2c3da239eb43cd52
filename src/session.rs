// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Runs an emulator on a dedicated worker thread.
//!
//! The worker is the only one touching the machine's state. The controller talks
//! to it with commands, which are only looked at between two instructions: every
//! command raises an attention flag that the worker polls once per instruction,
//! and the command channel is drained only when the flag is set.
//!
//! Frames and buttons cross the thread boundary through two "latest value wins"
//! slots: the [`FrameMailbox`] and the [`InputState`].

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::bus::joypad::InputState;
use crate::bus::ppu::compositor::{DisplaySink, Frame};
use crate::cpu::Event;
use crate::emulator::Emulator;
use crate::GameboyError;

/// A frame lasts 70224 cycles of the 4.194304MHz clock.
pub const FRAME_DURATION: Duration = Duration::from_nanos(16_742_706);

/// The worker's state, as seen by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	/// Instructions are executed.
	Running = 0,
	/// Waiting for commands, after a pause request or a breakpoint.
	Paused = 1,
	/// The worker exited.
	Stopped = 2,
	/// The machine hit a fatal error, only a reset or a stop are useful now.
	Faulted = 3,
}

impl SessionState {
	fn from_u8(value: u8) -> Self {
		match value {
			0 => SessionState::Running,
			1 => SessionState::Paused,
			3 => SessionState::Faulted,
			_ => SessionState::Stopped,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
	Pause,
	Resume,
	Stop,
	Reset,
	ToggleBreakpoint(u16),
	Step(usize),
}

/// State shared by the worker and its handle.
struct Shared {
	attention: AtomicBool,
	state: AtomicU8,
}

impl Shared {
	fn state(&self) -> SessionState {
		SessionState::from_u8(self.state.load(Ordering::Acquire))
	}

	fn set_state(&self, state: SessionState) {
		self.state.store(state as u8, Ordering::Release);
	}
}

/// Holds the most recently completed frame.
#[derive(Clone, Default)]
pub struct FrameMailbox(Arc<Mutex<Option<Box<Frame>>>>);

impl FrameMailbox {
	/// Create an empty mailbox.
	pub fn new() -> Self {
		FrameMailbox::default()
	}

	/// Takes the newest frame, if one was presented since the last call.
	pub fn take(&self) -> Option<Box<Frame>> {
		self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
	}
}

impl DisplaySink for FrameMailbox {
	fn present(&mut self, frame: &Frame) {
		let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);

		match slot.as_mut() {
			// The previous frame was never taken, reuse its buffer.
			Some(buffer) => buffer.copy_from_slice(frame),
			None => *slot = Some(Box::new(*frame)),
		}
	}
}

/// The worker side of a session.
pub struct Session {
	emulator: Emulator,
	commands: Receiver<Command>,
	shared: Arc<Shared>,
	/// Frames are paced to the real hardware's rate when set.
	frame_duration: Option<Duration>,
	deadline: Instant,
	frames: u64,
}

impl Session {
	/// Runs the emulator on a new thread, as fast as possible.
	pub fn start(emulator: Emulator) -> SessionHandle {
		Session::spawn(emulator, None)
	}

	/// Runs the emulator on a new thread, at the hardware's frame rate.
	pub fn start_realtime(emulator: Emulator) -> SessionHandle {
		Session::spawn(emulator, Some(FRAME_DURATION))
	}

	fn spawn(mut emulator: Emulator, frame_duration: Option<Duration>) -> SessionHandle {
		let (sender, receiver) = mpsc::channel();
		let shared = Arc::new(Shared {
			attention: AtomicBool::new(false),
			state: AtomicU8::new(SessionState::Running as u8),
		});

		let frames = FrameMailbox::new();
		emulator.set_display(Box::new(frames.clone()));
		let input = emulator.input();

		let session = Session {
			frames: emulator.statistics().frames,
			emulator,
			commands: receiver,
			shared: shared.clone(),
			frame_duration,
			deadline: Instant::now(),
		};

		info!("starting emulation session");
		let worker = thread::spawn(move || session.run());

		SessionHandle {
			commands: sender,
			shared,
			frames,
			input,
			worker,
		}
	}

	/// The worker's loop. Returns the emulator once stopped.
	fn run(mut self) -> Emulator {
		loop {
			if self.shared.attention.swap(false, Ordering::AcqRel) {
				loop {
					match self.commands.try_recv() {
						Ok(command) => self.handle(command),
						Err(TryRecvError::Empty) => break,
						Err(TryRecvError::Disconnected) => self.shared.set_state(SessionState::Stopped),
					}

					if self.shared.state() == SessionState::Stopped {
						break;
					}
				}
			}

			match self.shared.state() {
				SessionState::Running => self.step(),
				SessionState::Paused | SessionState::Faulted => {
					// Nothing to do until the next command.
					match self.commands.recv() {
						Ok(command) => self.handle(command),
						Err(_) => self.shared.set_state(SessionState::Stopped),
					}
				}
				SessionState::Stopped => break,
			}
		}

		info!("emulation session stopped");
		self.emulator
	}

	fn handle(&mut self, command: Command) {
		debug!("session command {:?}", command);

		let state = self.shared.state();

		match command {
			Command::Pause => {
				if state == SessionState::Running {
					self.shared.set_state(SessionState::Paused);
				}
			}
			Command::Resume => {
				if state == SessionState::Paused {
					self.deadline = Instant::now();
					self.shared.set_state(SessionState::Running);
				}
			}
			Command::Stop => {
				self.shared.set_state(SessionState::Stopped);
			}
			Command::Reset => {
				self.emulator.reset();
				self.frames = 0;

				if state == SessionState::Faulted {
					self.shared.set_state(SessionState::Paused);
				}
			}
			Command::ToggleBreakpoint(address) => {
				self.emulator.toggle_breakpoint(address);
			}
			Command::Step(count) => {
				if state == SessionState::Faulted {
					return;
				}

				self.shared.set_state(SessionState::Paused);

				if let Err(err) = self.emulator.step(count) {
					self.fault(err);
				}
			}
		}
	}

	/// Runs a single instruction.
	fn step(&mut self) {
		match self.emulator.cpu_mut().step() {
			Ok(Event::Executed { .. }) => self.pace(),
			Ok(Event::Breakpoint { address }) => {
				debug!("session paused on breakpoint at {:04x}", address);
				self.shared.set_state(SessionState::Paused);
			}
			Err(err) => self.fault(err),
		}
	}

	/// Sleeps once a frame was completed ahead of time.
	fn pace(&mut self) {
		let frames = self.emulator.statistics().frames;

		if frames == self.frames {
			return;
		}

		self.frames = frames;

		if let Some(duration) = self.frame_duration {
			self.deadline += duration;

			let now = Instant::now();
			if self.deadline > now {
				thread::sleep(self.deadline - now);
			} else {
				// Running late, don't try to catch up.
				self.deadline = now;
			}
		}
	}

	fn fault(&mut self, err: GameboyError) {
		error!("emulation halted: {}", err);
		self.shared.set_state(SessionState::Faulted);
	}
}

/// The controller side of a session.
pub struct SessionHandle {
	commands: Sender<Command>,
	shared: Arc<Shared>,
	frames: FrameMailbox,
	input: InputState,
	worker: JoinHandle<Emulator>,
}

impl SessionHandle {
	fn send(&self, command: Command) -> Result<(), GameboyError> {
		if self.shared.state() == SessionState::Stopped {
			return Err(GameboyError::Stopped);
		}

		self.commands.send(command).map_err(|_| GameboyError::Stopped)?;
		self.shared.attention.store(true, Ordering::Release);

		Ok(())
	}

	/// Pauses before the next instruction.
	pub fn pause(&self) -> Result<(), GameboyError> {
		self.send(Command::Pause)
	}

	/// Resumes a paused session.
	pub fn resume(&self) -> Result<(), GameboyError> {
		self.send(Command::Resume)
	}

	/// Stops the worker, use [`SessionHandle::join`] to wait for it.
	pub fn stop(&self) -> Result<(), GameboyError> {
		self.send(Command::Stop)
	}

	/// Restores the machine's power-on state. A faulted session is paused afterwards.
	pub fn reset(&self) -> Result<(), GameboyError> {
		self.send(Command::Reset)
	}

	/// Adds or removes a breakpoint.
	pub fn toggle_breakpoint(&self, address: u16) -> Result<(), GameboyError> {
		self.send(Command::ToggleBreakpoint(address))
	}

	/// Pauses the session and runs the given amount of instructions.
	pub fn step(&self, count: usize) -> Result<(), GameboyError> {
		if self.shared.state() == SessionState::Faulted {
			return Err(GameboyError::Faulted);
		}

		self.send(Command::Step(count))
	}

	/// The worker's current state.
	pub fn state(&self) -> SessionState {
		self.shared.state()
	}

	/// The mailbox receiving the completed frames.
	pub fn frames(&self) -> FrameMailbox {
		self.frames.clone()
	}

	/// The buttons sampled by the emulated joypad.
	pub fn input(&self) -> InputState {
		self.input.clone()
	}

	/// Waits for the worker to stop, and returns the emulator.
	pub fn join(self) -> Result<Emulator, GameboyError> {
		self.worker.join().map_err(|_| GameboyError::Faulted)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bus::ppu::compositor::{WIDTH, HEIGHT};

	#[test]
	fn test_mailbox_keeps_latest() {
		let mut mailbox = FrameMailbox::new();
		let reader = mailbox.clone();

		assert!(reader.take().is_none());

		mailbox.present(&[1; WIDTH * HEIGHT]);
		mailbox.present(&[2; WIDTH * HEIGHT]);

		let frame = reader.take();
		assert_eq!(Some(2), frame.map(|frame| frame[0]));
		assert!(reader.take().is_none());
	}

	#[test]
	fn test_state_encoding() {
		for state in [SessionState::Running, SessionState::Paused, SessionState::Stopped, SessionState::Faulted] {
			assert_eq!(state, SessionState::from_u8(state as u8));
		}
	}
}
