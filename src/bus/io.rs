// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Emulate the remaining I/O memory-mapped registers (serial, sound and such).
//!
//! These registers have no behavior in the core, they only keep what was written.

use super::Memory;
use super::consts::*;

use crate::config::*;
use crate::GameboyError;

#[allow(unused, missing_docs)]
pub mod consts {
	/// The total size of the registers' memory mapping.
	pub const IO_SIZE: usize = 0x80;

	pub const IO_SB: u16 = 0xFF01;
	pub const IO_SC: u16 = 0xFF02;
	pub const IO_NR10: u16 = 0xFF10;
	pub const IO_NR11: u16 = 0xFF11;
	pub const IO_NR12: u16 = 0xFF12;
	pub const IO_NR13: u16 = 0xFF13;
	pub const IO_NR14: u16 = 0xFF14;
	pub const IO_NR21: u16 = 0xFF16;
	pub const IO_NR22: u16 = 0xFF17;
	pub const IO_NR23: u16 = 0xFF18;
	pub const IO_NR24: u16 = 0xFF19;
	pub const IO_NR30: u16 = 0xFF1A;
	pub const IO_NR31: u16 = 0xFF1B;
	pub const IO_NR32: u16 = 0xFF1C;
	pub const IO_NR33: u16 = 0xFF1D;
	pub const IO_NR34: u16 = 0xFF1E;
	pub const IO_NR41: u16 = 0xFF20;
	pub const IO_NR42: u16 = 0xFF21;
	pub const IO_NR43: u16 = 0xFF22;
	pub const IO_NR44: u16 = 0xFF23;
	pub const IO_NR50: u16 = 0xFF24;
	pub const IO_NR51: u16 = 0xFF25;
	pub const IO_NR52: u16 = 0xFF26;
}

/// Convert address constants to register array offset.
macro_rules! port_offset {
	($address:expr) => (($address - 0xFF00) as usize)
}

use consts::*;

/// Handles read and write operation on I/O registers.
pub struct IoPorts {
	/// Registers that are mapped to the range 0xFF00-0xFF7F.
	registers: [u8; IO_SIZE],
}

impl IoPorts {
	/// Initialize the I/O registers with boot state.
	pub fn new(config: &Config) -> Self {
		let mut io = IoPorts {
			registers: [0_u8; IO_SIZE],
		};

		// Reset the registers' state.
		io.reset(config);

		io
	}

	/// Reset the I/O registers.
	pub fn reset(&mut self, config: &Config) {
		const DEFAULTS: [(u16, u8); 18] = [
			(IO_NR10, 0x80),
			(IO_NR11, 0xBF),
			(IO_NR12, 0xF3),
			(IO_NR14, 0xBF),
			(IO_NR21, 0x3F),
			(IO_NR22, 0x00),
			(IO_NR24, 0xBF),
			(IO_NR30, 0x7F),
			(IO_NR31, 0xFF),
			(IO_NR32, 0x9F),
			(IO_NR34, 0xBF),
			(IO_NR41, 0xFF),
			(IO_NR42, 0x00),
			(IO_NR43, 0x00),
			(IO_NR44, 0xBF),
			(IO_NR50, 0x77),
			(IO_NR51, 0xF3),
			(IO_DMA, 0xFF),
		];

		self.registers = [0_u8; IO_SIZE];

		for (address, value) in DEFAULTS {
			self.registers[port_offset!(address)] = value;
		}

		self.registers[port_offset!(IO_NR52)] = match config.model {
			HardwareModel::SGB => 0xF0,
			_ => 0xF1,
		};
	}
}

impl Memory for IoPorts {
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		match address {
			memory_range!(MMAP_IO_PORTS) => {
				self.registers[port_offset!(address)] = value;
				Ok(())
			}
			_ => {
				Err(GameboyError::MemoryFault { address })
			}
		}
	}

	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		match address {
			memory_range!(MMAP_IO_PORTS) => {
				Ok(self.registers[port_offset!(address)])
			}
			_ => {
				Err(GameboyError::MemoryFault { address })
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_sound_defaults() -> Result<(), GameboyError> {
		let io = IoPorts::new(&Config::default());

		assert_eq!(0x80, io.read(IO_NR10)?);
		assert_eq!(0xF1, io.read(IO_NR52)?);
		assert_eq!(0x77, io.read(IO_NR50)?);

		let config = Config { model: HardwareModel::SGB, ..Config::default() };
		assert_eq!(0xF0, IoPorts::new(&config).read(IO_NR52)?);

		Ok(())
	}

	#[test]
	fn test_registers_rw() -> Result<(), GameboyError> {
		let mut io = IoPorts::new(&Config::default());

		io.write(IO_SB, 0x42)?;
		assert_eq!(0x42, io.read(IO_SB)?);
		assert!(io.write(0xFF80, 0).is_err());

		Ok(())
	}
}
