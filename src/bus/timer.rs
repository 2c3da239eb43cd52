// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
//! Gameboy's timer controller.

use super::Memory;
use super::memory_range::*;

use crate::GameboyError;

use crate::config::*;
use crate::cpu::interrupts::*;

pub mod consts {
	use super::*;

	pub const IO_DIV: u16 = 0xFF04;
	pub const IO_TIMA: u16 = 0xFF05;
	pub const IO_TMA: u16 = 0xFF06;
	pub const IO_TAC: u16 = 0xFF07;

	pub const MMAP_IO_TIMER: MemoryRange = make_range!(0xFF04, 0xFF07);

	/// DIV is incremented every 256 cycles.
	pub const DIV_PERIOD: usize = 256;

	/// TIMA's period for each of TAC's clock selections.
	pub const TIMA_PERIODS: [usize; 4] = [1024, 16, 64, 256];
}

use consts::*;

pub struct Timer {
	/// DIV consists of 2 bytes, and only the higher 8 bits are exposed to the cpu.
	div: u16,
	/// Timer counter.
	tima: u8,
	/// Timer modulo.
	tma: u8,
	/// Timer control.
	tac: Tac,
	/// Cycles accumulated towards the next TIMA increment.
	tima_cycles: usize,

	interrupt_flag: InterruptMask,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Tac {
	pub enable: bool,
	pub frequency: u8,
}

impl Timer {
	/// Initialize a new timer instance.
	pub fn new(config: &Config) -> Self {
		let mut timer = Timer {
			div: 0,
			tima: 0,
			tma: 0,
			tac: Tac::new(),
			tima_cycles: 0,
			interrupt_flag: 0,
		};

		timer.reset(config);

		timer
	}

	/// Reset the peripheral to boot state.
	pub fn reset(&mut self, config: &Config) {
		self.div = config.model.boot_divider();
		self.tima = 0;
		self.tma = 0;
		self.tima_cycles = 0;
		self.tac.reset();
		self.interrupt_flag = 0;
	}

	/// Update the timer's state according to the elapsed time.
	pub fn process(&mut self, cycles: usize) {
		self.div = self.div.wrapping_add(cycles as u16);

		if !self.tac.enable {
			return;
		}

		let period = TIMA_PERIODS[self.tac.frequency as usize];
		self.tima_cycles += cycles;

		while self.tima_cycles >= period {
			self.tima_cycles -= period;

			// Increment the timer.
			self.tima = self.tima.wrapping_add(1);

			if self.tima == 0 {
				self.interrupt_flag |= Interrupt::Timer.value();
				self.tima = self.tma;
			}
		}
	}
}

impl Memory for Timer {
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		match address {
			IO_DIV => {
				// div is set to 0 on write, whatever the value is.
				self.div = 0;
			}
			IO_TIMA => {
				self.tima = value;
			}
			IO_TMA => {
				self.tma = value;
			}
			IO_TAC => {
				let old = self.tac;
				self.tac.write(value);

				if old != self.tac {
					self.tima_cycles = 0;
				}
			}
			_ => {
				return Err(GameboyError::MemoryFault { address });
			}
		}

		Ok(())
	}

	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		match address {
			IO_DIV => {
				Ok(((self.div & 0xFF00) >> 8) as u8)
			}
			IO_TIMA => {
				Ok(self.tima)
			}
			IO_TMA => {
				Ok(self.tma)
			}
			IO_TAC => {
				Ok(self.tac.read())
			}
			_ => {
				Err(GameboyError::MemoryFault { address })
			}
		}
	}
}

impl InterruptSource for Timer {
	fn interrupts(&self) -> InterruptMask {
		self.interrupt_flag
	}

	fn clear(&mut self) {
		self.interrupt_flag = 0;
	}
}

impl Tac {
	pub fn new() -> Self {
		Tac { enable: false, frequency: 0 }
	}

	pub fn reset(&mut self) {
		self.enable = false;
		self.frequency = 0;
	}

	pub fn write(&mut self, value: u8) {
		self.enable = (value & 4) != 0;
		self.frequency = value & 3;
	}

	/// The unused upper bits read as set.
	pub fn read(&self) -> u8 {
		0xF8 | self.frequency | if self.enable { 4 } else { 0 }
	}
}
