// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
//! Gameboy's joypad controller.
//!
//! The pressed buttons are kept in an atomic bitmask shared with the front-end,
//! and are sampled into P1 whenever the software selects a button group.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU8, Ordering};

use super::Memory;

use crate::GameboyError;
use crate::cpu::interrupts::*;

pub mod consts {
	pub const IO_P1: u16 = 0xFF00;

	/// Selects the direction keys when cleared.
	pub const SELECT_DIRECTIONS: u8 = 0x10;
	/// Selects the action buttons when cleared.
	pub const SELECT_ACTIONS: u8 = 0x20;
}

use consts::*;

/// The matrix layout for the P1 register, according to the Gameboy CPU manual.
///
/// The lower nibble holds the direction keys, the upper nibble the action buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
	Down,
	Up,
	Left,
	Right,
	Start,
	Select,
	B,
	A,
}

impl Button {
	pub const ALL: [Button; 8] = [
		Button::Down,
		Button::Up,
		Button::Left,
		Button::Right,
		Button::Start,
		Button::Select,
		Button::B,
		Button::A,
	];

	pub fn value(&self) -> u8 {
		match self {
			Button::Right => 1,
			Button::Left => 2,
			Button::Up => 4,
			Button::Down => 8,
			Button::A => 16,
			Button::B => 32,
			Button::Select => 64,
			Button::Start => 128,
		}
	}
}

pub trait Controller {
	/// Mark the given button as currently pressed.
	fn down(&mut self, button: Button);

	/// Mark the given button as released.
	fn up(&mut self, button: Button);
}

/// The pressed buttons, shared between the input thread and the emulated joypad.
///
/// A set bit means the button is pressed.
#[derive(Clone, Debug, Default)]
pub struct InputState(Arc<AtomicU8>);

impl InputState {
	pub fn new() -> Self {
		InputState(Arc::new(AtomicU8::new(0)))
	}

	pub fn press(&self, button: Button) {
		self.0.fetch_or(button.value(), Ordering::Relaxed);
	}

	pub fn release(&self, button: Button) {
		self.0.fetch_and(!button.value(), Ordering::Relaxed);
	}

	/// Replace the complete bitmask at once.
	pub fn set(&self, pressed: u8) {
		self.0.store(pressed, Ordering::Relaxed);
	}

	pub fn is_pressed(&self, button: Button) -> bool {
		self.snapshot() & button.value() != 0
	}

	/// The current bitmask of pressed buttons.
	pub fn snapshot(&self) -> u8 {
		self.0.load(Ordering::Relaxed)
	}
}

impl Controller for InputState {
	fn down(&mut self, button: Button) {
		self.press(button);
	}

	fn up(&mut self, button: Button) {
		self.release(button);
	}
}

pub struct Joypad {
	input: InputState,
	/// The group selection bits (P14, P15) as written by the software.
	select: u8,
	/// The input lines latched on the last selection, active low.
	latched: u8,
	/// The buttons pressed on the last poll.
	previous: u8,
	interrupt_flag: InterruptMask,
}

impl Joypad {
	/// Initialize a new joypad sampling the given buttons.
	pub fn new(input: InputState) -> Self {
		let mut joypad = Joypad {
			input,
			select: 0,
			latched: 0x0F,
			previous: 0,
			interrupt_flag: 0,
		};

		joypad.reset();

		joypad
	}

	pub fn reset(&mut self) {
		self.select = 0;
		self.latched = 0x0F;
		self.previous = self.input.snapshot();
		self.interrupt_flag = 0;
	}

	pub fn input(&self) -> InputState {
		self.input.clone()
	}

	pub fn set_input(&mut self, input: InputState) {
		self.previous = input.snapshot();
		self.input = input;
	}

	/// The pressed buttons that are visible through the current selection.
	fn selected(&self, pressed: u8) -> u8 {
		let mut lines = 0;

		if self.select & SELECT_DIRECTIONS == 0 {
			lines |= pressed & 0x0F;
		}

		if self.select & SELECT_ACTIONS == 0 {
			lines |= pressed >> 4;
		}

		lines
	}

	/// Sample the input lines and raise the interrupt on a high to low transition.
	fn relatch(&mut self) {
		let lines = !self.selected(self.input.snapshot()) & 0x0F;

		if self.latched & !lines != 0 {
			self.interrupt_flag |= Interrupt::Joypad.value();
		}

		self.latched = lines;
	}

	/// Raise the joypad interrupt for buttons pressed since the last poll.
	pub fn process(&mut self, _cycles: usize) {
		let pressed = self.input.snapshot();
		let new = pressed & !self.previous;

		if self.selected(new) != 0 {
			self.interrupt_flag |= Interrupt::Joypad.value();
		}

		self.previous = pressed;
	}
}

impl InterruptSource for Joypad {
	fn interrupts(&self) -> InterruptMask {
		self.interrupt_flag
	}

	fn clear(&mut self) {
		self.interrupt_flag = 0;
	}
}

impl Memory for Joypad {
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		if address != IO_P1 {
			return Err(GameboyError::MemoryFault { address });
		}

		self.select = value & (SELECT_DIRECTIONS | SELECT_ACTIONS);
		self.relatch();

		Ok(())
	}

	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		if address != IO_P1 {
			return Err(GameboyError::MemoryFault { address });
		}

		Ok(0xC0 | self.select | self.latched)
	}
}
