// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulate the real time clock, that appears in type-3 MBCs.

use super::Memory;
use crate::GameboyError;
use core::ops::RangeInclusive;

/// The rtc registers are mapped to 0xA000-0xBFFF whenever
/// a value within the control range is written to the RAM/RTC select
/// register.
pub const RTC_CONTROL_RANGE: RangeInclusive<u8> = 0x8..=0xC;

/// The clock is driven by the emulated cpu clock.
pub const CYCLES_PER_SECOND: usize = 4_194_304;

/// Halts the clock when set.
const FLAG_HALT: u8 = 0x40;
/// Set when the day counter overflows.
const FLAG_DAY_CARRY: u8 = 0x80;
/// The day counter's MSB.
const FLAG_DAY_HIGH: u8 = 0x01;

/// The cartridge's real-time clock registers.
///
/// Internally, the clock is incremented using an internal counter,
/// and the registers are updated whenever the clock data is latched
/// by the software.
#[derive(Clone, Debug)]
pub struct Rtc {
	/// The running clock.
	registers: [u8; 5],
	/// The copy visible to the software.
	latched: [u8; 5],
	active_register: u8,
	counter: usize,
	/// The last value written to the latch register.
	last_latch: u8,
}

#[derive(Clone, Copy)]
enum RtcRegister {
	Seconds = 0,
	Minutes = 1,
	Hours = 2,
	DaysLow = 3,
	Flags = 4,
}

impl Rtc {
	/// Create a new real-time clock.
	pub fn new() -> Self {
		Rtc {
			registers: [0_u8; 5],
			latched: [0_u8; 5],
			active_register: 0,
			counter: 0,
			last_latch: 0xFF,
		}
	}

	fn get(&self, reg: RtcRegister) -> u8 {
		self.latched[reg as usize]
	}

	/// Returns the register containing the seconds counter.
	pub fn seconds(&self) -> u8 {
		self.get(RtcRegister::Seconds)
	}

	/// Returns the register containing the minutes counter.
	pub fn minutes(&self) -> u8 {
		self.get(RtcRegister::Minutes)
	}

	/// Returns the register containing the hours counter.
	pub fn hours(&self) -> u8 {
		self.get(RtcRegister::Hours)
	}

	/// The days are represented by 9 bits.
	/// This function returns the lower 8 bits.
	pub fn days_low(&self) -> u8 {
		self.get(RtcRegister::DaysLow)
	}

	/// The flags register contains flags and another days bit:
	///
	/// * Bit 0 - Day counter's MSB.
	/// * Bit 6 - Halt flag (0 = Active, 1 = Stop timer).
	/// * Bit 7 - Day counter carry flag.
	pub fn flags(&self) -> u8 {
		self.get(RtcRegister::Flags)
	}

	/// Advance the clock by the given amount of cpu cycles.
	pub fn tick(&mut self, cycles: usize) {
		if self.registers[RtcRegister::Flags as usize] & FLAG_HALT != 0 {
			return;
		}

		self.counter += cycles;

		while self.counter >= CYCLES_PER_SECOND {
			self.counter -= CYCLES_PER_SECOND;
			self.increment_second();
		}
	}

	fn increment_second(&mut self) {
		let regs = &mut self.registers;

		regs[RtcRegister::Seconds as usize] += 1;
		if regs[RtcRegister::Seconds as usize] < 60 {
			return;
		}
		regs[RtcRegister::Seconds as usize] = 0;

		regs[RtcRegister::Minutes as usize] += 1;
		if regs[RtcRegister::Minutes as usize] < 60 {
			return;
		}
		regs[RtcRegister::Minutes as usize] = 0;

		regs[RtcRegister::Hours as usize] += 1;
		if regs[RtcRegister::Hours as usize] < 24 {
			return;
		}
		regs[RtcRegister::Hours as usize] = 0;

		let flags = regs[RtcRegister::Flags as usize];
		let days = (((flags & FLAG_DAY_HIGH) as u16) << 8 | regs[RtcRegister::DaysLow as usize] as u16) + 1;

		regs[RtcRegister::DaysLow as usize] = (days & 0xFF) as u8;
		regs[RtcRegister::Flags as usize] = (flags & !FLAG_DAY_HIGH) | ((days >> 8) & 1) as u8;

		// The counter has 9 bits.
		if days > 0x1FF {
			regs[RtcRegister::Flags as usize] |= FLAG_DAY_CARRY;
		}
	}

	/// Fetch the clock data into the rtc's registers.
	///
	/// The latching process consists of writing 0x00 and then 0x01 to
	/// the Latch Clock Data register.
	pub fn latch(&mut self, value: u8) {
		if self.last_latch == 0 && value == 1 {
			self.latched = self.registers;
		}

		self.last_latch = value;
	}

	/// Set the currently memory mapped RTC register.
	pub fn set_active_register(&mut self, value: u8) -> Result<(), GameboyError> {
		if RTC_CONTROL_RANGE.contains(&value) {
			self.active_register = value - 0x08;
			return Ok(())
		}

		Err(GameboyError::MemoryFault { address: value as u16 })
	}
}

impl Default for Rtc {
	fn default() -> Self {
		Rtc::new()
	}
}

impl Memory for Rtc {
	/// Writes to the rtc's currently active register.
	fn write(&mut self, _address: u16, value: u8) -> Result<(), GameboyError> {
		let index = self.active_register as usize;

		if index == RtcRegister::Seconds as usize {
			// Writing the seconds resets the sub-second counter.
			self.counter = 0;
		}

		self.registers[index] = value;
		self.latched[index] = value;

		Ok(())
	}

	/// Reads the rtc's currently active register.
	fn read(&self, _address: u16) -> Result<u8, GameboyError> {
		Ok(self.latched[self.active_register as usize])
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_latched_clock() -> Result<(), GameboyError> {
		let mut rtc = Rtc::new();

		rtc.tick(CYCLES_PER_SECOND * 61);
		assert_eq!(0, rtc.seconds());

		rtc.latch(0);
		rtc.latch(1);
		assert_eq!(1, rtc.seconds());
		assert_eq!(1, rtc.minutes());

		rtc.set_active_register(0x09)?;
		assert_eq!(1, rtc.read(0xA000)?);

		Ok(())
	}

	#[test]
	fn test_halted_clock() -> Result<(), GameboyError> {
		let mut rtc = Rtc::new();

		rtc.set_active_register(0x0C)?;
		rtc.write(0xA000, FLAG_HALT)?;
		rtc.tick(CYCLES_PER_SECOND * 10);

		rtc.latch(0);
		rtc.latch(1);
		assert_eq!(0, rtc.seconds());
		assert!(rtc.set_active_register(0x07).is_err());

		Ok(())
	}

	#[test]
	fn test_day_carry() {
		let mut rtc = Rtc::new();

		rtc.registers = [59, 59, 23, 0xFF, FLAG_DAY_HIGH];
		rtc.tick(CYCLES_PER_SECOND);
		rtc.latch(0);
		rtc.latch(1);

		assert_eq!(0, rtc.days_low());
		assert_eq!(FLAG_DAY_CARRY, rtc.flags());
	}
}
