// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Abstraction for the cpu's interrupts.

use core::iter::Iterator;

use bitflags::bitflags;
use log::debug;

use super::Cpu;
use super::state::registers::*;
use crate::GameboyError;

/// Marks which interrupts are currently active.
pub type InterruptMask = u8;

/// The amount of cycles it takes to push the program counter and jump to a vector.
pub const DISPATCH_CYCLES: usize = 20;

bitflags! {
	/// The layout shared by the IF (0xFF0F) and IE (0xFFFF) registers.
	#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
	pub struct InterruptFlags: u8 {
		/// Vertical blank.
		const VBLANK = 1 << 0;
		/// Lcd status (STAT) conditions.
		const LCD_STAT = 1 << 1;
		/// Timer (TIMA) overflow.
		const TIMER = 1 << 2;
		/// Serial transfer completion.
		const SERIAL = 1 << 3;
		/// Joypad button press.
		const JOYPAD = 1 << 4;
	}
}

/// Represents a peripheral that may raise interrupts.
pub trait InterruptSource {
	/// Returns the active interrupts mask.
	fn interrupts(&self) -> InterruptMask;

	/// Clears the peripheral's interrupt mask.
	fn clear(&mut self);
}

/// Interrupts that can be thrown by peripherals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
	/// Triggered when the LCD controller enters V-Blank at scanline 144.
	VerticalBlank,
	/// Triggered by configured LCD events (such as scanline coincidence).
	LcdStat,
	/// Triggered when TIMA overflows.
	Timer,
	/// Triggered when a serial transfer of 1 byte is complete.
	Serial,
	/// Triggered when one of the P1 input lines is changed from 1 to 0.
	Joypad,
}

impl Interrupt {
	/// All interrupts, from the highest priority to the lowest.
	pub const ALL: [Interrupt; 5] = [
		Interrupt::VerticalBlank,
		Interrupt::LcdStat,
		Interrupt::Timer,
		Interrupt::Serial,
		Interrupt::Joypad,
	];

	/// Get the identifier of the given interrupt.
	pub fn ordinal(&self) -> u8 {
		match self {
			Interrupt::VerticalBlank => 0,
			Interrupt::LcdStat => 1,
			Interrupt::Timer => 2,
			Interrupt::Serial => 3,
			Interrupt::Joypad => 4,
		}
	}

	/// Get the relevant bit of the given interrupt.
	pub fn value(&self) -> u8 {
		1 << self.ordinal()
	}

	/// The address the cpu jumps to when servicing this interrupt.
	pub fn vector(&self) -> u16 {
		0x40 + 8 * self.ordinal() as u16
	}
}

/// Iterates over raised interrupts by their priority.
pub struct InterruptIter {
	/// The iterator's active interrupts mask.
	/// Iterated interrupts are popped from the mask.
	pub mask: InterruptMask,
}

impl InterruptIter {
	/// Create a new interrupt iterator.
	pub fn new(mask: InterruptMask) -> Self {
		InterruptIter {
			mask
		}
	}
}

impl Iterator for InterruptIter {
	type Item = Interrupt;

	fn next(&mut self) -> Option<Self::Item> {
		let interrupt = Interrupt::ALL.iter()
			.find(|interrupt| self.mask & interrupt.value() != 0)
			.copied()?;

		self.mask &= !interrupt.value();

		Some(interrupt)
	}
}

impl Cpu {
	/// Returns the interrupts that are both requested and enabled.
	pub fn pending_interrupts(&self) -> InterruptMask {
		self.mmap.interrupt_flag().bits() & self.mmap.interrupt_enable().bits()
	}

	/// Services at most a single interrupt, if the master enable flag allows it.
	///
	/// Returns the amount of cycles spent on the dispatch (zero if nothing was serviced).
	pub fn dispatch_interrupts(&mut self) -> Result<usize, GameboyError> {
		if !self.registers.ime() {
			return Ok(0);
		}

		// The master enable is dropped while we're checking, so nothing re-enters.
		self.registers.set_ime(false);

		let serviced = match InterruptIter::new(self.pending_interrupts()).next() {
			Some(interrupt) => {
				self.mmap.acknowledge(interrupt);

				let pc = self.registers.get(Register::PC);
				self.push(pc)?;
				self.registers.set(Register::PC, interrupt.vector());

				debug!("dispatching {:?} from {:04x}", interrupt, pc);
				DISPATCH_CYCLES
			}
			None => 0,
		};

		self.registers.set_ime(true);

		Ok(serviced)
	}
}
