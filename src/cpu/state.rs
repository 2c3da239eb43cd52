// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Gameboy's processor state.

use crate::config::HardwareModel;
use registers::*;

#[allow(missing_docs)]
pub mod registers {
	/// The size of the register file
	pub const NUM_REGS: usize = 6;

	/// We have 6 registers and they're 16-bit wide.
	pub type RegisterFile = [u16; NUM_REGS];

	#[derive(PartialEq, Eq, Clone, Copy, Debug)]
	pub enum Register {
		/// Accumulator and Flag registers
		A, F, AF,
		B, C, BC,
		D, E, DE,
		/// Indirect access register
		H, L, HL,
		/// Stack pointer
		SP,
		/// Program counter
		PC,
	}

	impl Register {
		/// The registers selected by the 3-bit operand fields of the opcodes.
		/// Index 6 selects the memory pointed by HL and has no register.
		pub const OPERANDS_8: [Option<Register>; 8] = [
			Some(Register::B), Some(Register::C),
			Some(Register::D), Some(Register::E),
			Some(Register::H), Some(Register::L),
			None, Some(Register::A),
		];

		/// The register pairs selected by the 2-bit operand fields of the
		/// arithmetic and load opcodes.
		pub const OPERANDS_16: [Register; 4] = [
			Register::BC, Register::DE, Register::HL, Register::SP,
		];

		/// The register pairs selected by the 2-bit operand fields of push and pop.
		pub const STACK_OPERANDS: [Register; 4] = [
			Register::BC, Register::DE, Register::HL, Register::AF,
		];
	}

	/// The register's "type" is essentially the internal representation
	/// of the virtual register's bitmask within the register file.
	#[derive(PartialEq, Eq)]
	pub enum RegisterType {
		Wide,
		Low8,
		High8,
	}

	pub fn get_type(reg: &Register) -> RegisterType {
		match reg {
			Register::A |
			Register::B |
			Register::D |
			Register::H => RegisterType::High8,

			Register::F |
			Register::C |
			Register::E |
			Register::L => RegisterType::Low8,

			Register::AF |
			Register::BC |
			Register::DE |
			Register::HL |
			Register::SP |
			Register::PC => RegisterType::Wide,
		}
	}

	/// Get the index of a given register within the register file
	pub fn get_index(reg: &Register) -> usize {
		match reg {
			Register::A | Register::F | Register::AF => 0,
			Register::B | Register::C | Register::BC => 1,
			Register::D | Register::E | Register::DE => 2,
			Register::H | Register::L | Register::HL => 3,
			Register::SP => 4,
			Register::PC => 5,
		}
	}

	/// The flag register encodes the following flags within
	/// the register's bits.
	#[derive(Clone, Copy, Debug, PartialEq, Eq)]
	pub enum Flag {
		/// Carry flag
		C = 4,
		/// Half-Carry flag
		H = 5,
		/// Subtract flag
		N = 6,
		/// Zero flag
		Z = 7,
	}

	/// The lower nibble of F doesn't exist in hardware and always reads as zero.
	pub const FLAGS_MASK: u16 = 0x00F0;
}

/// Structure holding the current processor state.
#[derive(Clone, Debug)]
pub struct CpuState {
	regs: RegisterFile,
	/// Interrupt master enable.
	ime: bool,
}

impl CpuState {
	/// Initializes a new cpu state
	pub fn new(model: HardwareModel) -> Self {
		let mut state = CpuState {
			regs: [0; NUM_REGS],
			ime: false,
		};

		// Reset the registers.
		state.reset(model);

		state
	}

	/// Reset registers to their initial boot state.
	pub fn reset(&mut self, model: HardwareModel) {
		self.set(Register::F, 0xB0);
		self.set(Register::BC, 0x0013);
		self.set(Register::DE, 0x00D8);
		self.set(Register::HL, 0x014D);
		self.set(Register::SP, 0xFFFE);
		self.set(Register::PC, 0x0100);
		self.set(Register::A, model.boot_accumulator() as u16);
		self.ime = false;
	}

	/// Writes a value to a given register.
	///
	/// * `reg` - The register file identifier to write into.
	/// * `value` - The value to write. In cases of 8-bit register,
	///     the higher 8 bits will be discarded.
	pub fn set(&mut self, reg: Register, value: u16) {
		// Keep the flags' unused nibble clear.
		let value = match reg {
			Register::F | Register::AF => value & !0x000F,
			_ => value,
		};

		let reg_type: RegisterType = get_type(&reg);
		let reg: &mut u16 = &mut self.regs[get_index(&reg)];

		match reg_type {
			RegisterType::Wide => *reg = value,
			RegisterType::Low8 => *reg = (*reg & 0xFF00) | (value & 0x00FF),
			RegisterType::High8 => *reg = (*reg & 0x00FF) | ((value << 8) & 0xFF00),
		}
	}

	/// Reads the given register.
	pub fn get(&self, reg: Register) -> u16 {
		let reg_value: u16 = self.regs[get_index(&reg)];
		let reg_type: RegisterType = get_type(&reg);

		match reg_type {
			RegisterType::Wide => reg_value,
			RegisterType::Low8 => reg_value & 0x00FF,
			RegisterType::High8 => (reg_value >> 8) & 0x00FF,
		}
	}

	/// Reads an 8-bit register.
	pub fn get8(&self, reg: Register) -> u8 {
		debug_assert!(get_type(&reg) != RegisterType::Wide);

		self.get(reg) as u8
	}

	/// Returns the state of the given cpu flag, as stored in
	/// the 'F' register.
	pub fn flag(&self, flag: Flag) -> bool {
		let flags_value: u16 = self.get(Register::F);

		// Check whether the relevant bit is on
		((flags_value >> flag as u8) & 1) == 1
	}

	/// Sets the state of the given cpu flag, as stored in
	/// the 'F' register.
	pub fn set_flag(&mut self, flag: Flag, value: bool) {
		let old_flags: u16 = self.get(Register::F);

		let new_flags = if value {
			// Turn on the relevant bit
			old_flags | (1 << (flag as u8))
		} else {
			// Turn off the relevant bit
			old_flags & !(1 << (flag as u8))
		};

		self.set(Register::F, new_flags);
	}

	/// Packs the four flags into the F register layout.
	pub fn flags(&self) -> u8 {
		(self.get(Register::F) & FLAGS_MASK) as u8
	}

	/// Unpacks the four flags from the F register layout.
	pub fn set_flags(&mut self, value: u8) {
		self.set(Register::F, value as u16);
	}

	/// Sets all four flags at once.
	pub fn assign_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
		let value = ((z as u8) << Flag::Z as u8) |
					((n as u8) << Flag::N as u8) |
					((h as u8) << Flag::H as u8) |
					((c as u8) << Flag::C as u8);

		self.set_flags(value);
	}

	/// Returns the interrupt master enable flag.
	pub fn ime(&self) -> bool {
		self.ime
	}

	/// Sets the interrupt master enable flag.
	pub fn set_ime(&mut self, value: bool) {
		self.ime = value;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_registers_rw() {
		let mut cpu: CpuState = CpuState::new(HardwareModel::GB);

		assert_eq!(0x0013, cpu.get(Register::BC));

		cpu.set(Register::AF, 0x1234);
		assert_eq!(0x12, cpu.get(Register::A));
		assert_eq!(0x30, cpu.get(Register::F));

		cpu.set(Register::B, 0x18);
		assert_eq!(0x18, cpu.get(Register::B));

		cpu.set(Register::SP, 0x7FFC);
		assert_eq!(0x7FFC, cpu.get(Register::SP));
	}

	#[test]
	fn test_cpu_flags() {
		let mut cpu: CpuState = CpuState::new(HardwareModel::GB);

		cpu.set(Register::F, 0b10010000);
		//                    ^ZNHC
		assert!(cpu.flag(Flag::Z) &&
				!cpu.flag(Flag::N) &&
				!cpu.flag(Flag::H) &&
				 cpu.flag(Flag::C));

		cpu.set(Register::F, 0b01000000);
		assert!(!cpu.flag(Flag::Z) &&
				 cpu.flag(Flag::N) &&
				!cpu.flag(Flag::H) &&
				!cpu.flag(Flag::C));

		cpu.set_flag(Flag::N, false);
		assert_eq!(false, cpu.flag(Flag::N));

		cpu.set_flag(Flag::C, true);
		assert_eq!(true, cpu.flag(Flag::C));
	}

	#[test]
	fn test_flags_low_nibble() {
		let mut cpu: CpuState = CpuState::new(HardwareModel::GB);

		cpu.set_flags(0xFF);
		assert_eq!(0xF0, cpu.flags());

		cpu.assign_flags(true, false, true, false);
		assert_eq!(0xA0, cpu.flags());
	}

	#[test]
	fn test_boot_accumulator() {
		assert_eq!(0x11, CpuState::new(HardwareModel::GBC).get(Register::A));
		assert_eq!(0x01, CpuState::new(HardwareModel::GB).get(Register::A));
	}
}
