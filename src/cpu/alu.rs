// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy cpu's arithmetic and logic unit.
//!
//! The operations work on raw operands and only touch the flags register,
//! the instruction handlers take care of fetching operands and storing results.

use super::state::CpuState;
use super::state::registers::*;

/// Implementation of 8-bit arithmetic operations.
pub mod alu8 {
	use super::*;

	/// A binary ALU operation on the accumulator.
	pub type Alu8Op = fn(&mut CpuState, u8, u8) -> u8;

	/// A unary operation from the rotate and shift family.
	pub type ShiftOp = fn(&mut CpuState, u8) -> u8;

	/// The accumulator operations, ordered by the opcodes' 3-bit operation field.
	pub const OPS: [Alu8Op; 8] = [add, adc, sub, sbc, and, xor, or, cp];

	/// The rotate and shift operations, ordered by the extended opcodes' operation field.
	pub const SHIFT_OPS: [ShiftOp; 8] = [rlc, rrc, rl, rr, sla, sra, swap, srl];

	/// Adds the given arguments, sets the relevant flags accordinately and returns the result.
	pub fn add(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		let result_16 = (lhs as u16) + (rhs as u16);
		let result_8 = (lhs & 0x0F) + (rhs & 0x0F);

		let result: u8 = (result_16 & 0xFF) as u8;

		state.assign_flags(result == 0, false, result_8 > 0x0F, result_16 > 0xFF);

		result
	}

	/// Adds the given arguments and the carry flag, if set.
	pub fn adc(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		let carry = state.flag(Flag::C) as u8;

		let result_16 = (lhs as u16) + (rhs as u16) + (carry as u16);
		let result_8 = (lhs & 0x0F) + (rhs & 0x0F) + carry;

		let result: u8 = (result_16 & 0xFF) as u8;

		state.assign_flags(result == 0, false, result_8 > 0x0F, result_16 > 0xFF);

		result
	}

	/// Subtracts the given arguments, sets the relevant flags accordinately and returns the result.
	pub fn sub(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		let result: u8 = lhs.wrapping_sub(rhs);

		state.assign_flags(result == 0, true, (lhs & 0x0F) < (rhs & 0x0F), lhs < rhs);

		result
	}

	/// Subtracts with carry, sets the relevant flags accordinately and returns the result.
	pub fn sbc(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		let carry = state.flag(Flag::C) as u16;

		let result: u8 = (lhs as u16).wrapping_sub(rhs as u16).wrapping_sub(carry) as u8;
		let half = ((lhs & 0x0F) as u16) < ((rhs & 0x0F) as u16) + carry;
		let full = (lhs as u16) < (rhs as u16) + carry;

		state.assign_flags(result == 0, true, half, full);

		result
	}

	/// Performs logical AND between the given arguments.
	pub fn and(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		let result: u8 = lhs & rhs;

		state.assign_flags(result == 0, false, true, false);

		result
	}

	/// Performs logical OR between the given arguments.
	pub fn or(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		let result: u8 = lhs | rhs;

		state.assign_flags(result == 0, false, false, false);

		result
	}

	/// Performs logical XOR between the given arguments.
	pub fn xor(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		let result: u8 = lhs ^ rhs;

		state.assign_flags(result == 0, false, false, false);

		result
	}

	/// Compares the given arguments and sets the relevant flags accordinately.
	///
	/// Returns the left operand untouched, so storing the result is a no-op.
	pub fn cp(state: &mut CpuState, lhs: u8, rhs: u8) -> u8 {
		// Compare is basically subtraction.
		sub(state, lhs, rhs);

		lhs
	}

	/// Increments the given value. The carry flag is not affected.
	pub fn inc(state: &mut CpuState, value: u8) -> u8 {
		let result = value.wrapping_add(1);

		state.set_flag(Flag::Z, result == 0);
		state.set_flag(Flag::N, false);
		state.set_flag(Flag::H, (value & 0x0F) == 0x0F);

		result
	}

	/// Decrements the given value. The carry flag is not affected.
	pub fn dec(state: &mut CpuState, value: u8) -> u8 {
		let result = value.wrapping_sub(1);

		state.set_flag(Flag::Z, result == 0);
		state.set_flag(Flag::N, true);
		state.set_flag(Flag::H, (value & 0x0F) == 0);

		result
	}

	/// Rotates left, bit 7 goes both to the carry flag and to bit 0.
	pub fn rlc(state: &mut CpuState, value: u8) -> u8 {
		let result = value.rotate_left(1);

		state.assign_flags(result == 0, false, false, (value & 0x80) != 0);

		result
	}

	/// Rotates right, bit 0 goes both to the carry flag and to bit 7.
	pub fn rrc(state: &mut CpuState, value: u8) -> u8 {
		let result = value.rotate_right(1);

		state.assign_flags(result == 0, false, false, (value & 1) != 0);

		result
	}

	/// Rotates left through the carry flag.
	pub fn rl(state: &mut CpuState, value: u8) -> u8 {
		let old_carry = state.flag(Flag::C) as u8;
		let result = (value << 1) | old_carry;

		state.assign_flags(result == 0, false, false, (value & 0x80) != 0);

		result
	}

	/// Rotates right through the carry flag.
	pub fn rr(state: &mut CpuState, value: u8) -> u8 {
		let old_carry = state.flag(Flag::C) as u8;
		let result = (value >> 1) | (old_carry << 7);

		state.assign_flags(result == 0, false, false, (value & 1) != 0);

		result
	}

	/// Shifts left, bit 0 is cleared.
	pub fn sla(state: &mut CpuState, value: u8) -> u8 {
		let result = value << 1;

		state.assign_flags(result == 0, false, false, (value & 0x80) != 0);

		result
	}

	/// Arithmetic shift right, the MSB stays the same.
	pub fn sra(state: &mut CpuState, value: u8) -> u8 {
		let result = (value >> 1) | (value & 0x80);

		state.assign_flags(result == 0, false, false, (value & 1) != 0);

		result
	}

	/// Logic shift right, the MSB is cleared.
	pub fn srl(state: &mut CpuState, value: u8) -> u8 {
		let result = value >> 1;

		state.assign_flags(result == 0, false, false, (value & 1) != 0);

		result
	}

	/// Swaps the lower and higher nibbles of the given value.
	pub fn swap(state: &mut CpuState, value: u8) -> u8 {
		let result: u8 = value.rotate_left(4);

		state.assign_flags(result == 0, false, false, false);

		result
	}

	/// Tests a single bit. Z is set when the bit is clear.
	pub fn bit(state: &mut CpuState, index: u8, value: u8) {
		state.set_flag(Flag::Z, (value >> index) & 1 == 0);
		state.set_flag(Flag::N, false);
		state.set_flag(Flag::H, true);
	}

	/// Decimal-adjusts the accumulator after a BCD addition or subtraction.
	pub fn daa(state: &mut CpuState, value: u8) -> u8 {
		let subtract = state.flag(Flag::N);
		let half = state.flag(Flag::H);
		let mut carry = state.flag(Flag::C);

		let mut correction: u8 = 0;

		if half || (!subtract && (value & 0x0F) > 0x09) {
			correction |= 0x06;
		}

		if carry || (!subtract && value > 0x99) {
			correction |= 0x60;
			carry = true;
		}

		let result = if subtract {
			value.wrapping_sub(correction)
		} else {
			value.wrapping_add(correction)
		};

		state.set_flag(Flag::Z, result == 0);
		state.set_flag(Flag::H, false);
		state.set_flag(Flag::C, carry);

		result
	}

	/// Complements the accumulator.
	pub fn cpl(state: &mut CpuState, value: u8) -> u8 {
		state.set_flag(Flag::N, true);
		state.set_flag(Flag::H, true);

		!value
	}

	/// Sets the carry flag.
	pub fn scf(state: &mut CpuState) {
		state.set_flag(Flag::N, false);
		state.set_flag(Flag::H, false);
		state.set_flag(Flag::C, true);
	}

	/// Complements the carry flag.
	pub fn ccf(state: &mut CpuState) {
		let carry = state.flag(Flag::C);

		state.set_flag(Flag::N, false);
		state.set_flag(Flag::H, false);
		state.set_flag(Flag::C, !carry);
	}

	#[cfg(test)]
	mod tests {
		use super::*;
		use crate::config::HardwareModel;
		use proptest::prelude::*;

		fn state() -> CpuState {
			CpuState::new(HardwareModel::GB)
		}

		proptest! {
			#[test]
			fn test_add_flags(a: u8, b: u8) {
				let mut state = state();
				let result = add(&mut state, a, b);

				prop_assert_eq!(result, a.wrapping_add(b));
				prop_assert_eq!(state.flag(Flag::Z), a.wrapping_add(b) == 0);
				prop_assert_eq!(state.flag(Flag::C), (a as u16) + (b as u16) > 0xFF);
				prop_assert_eq!(state.flag(Flag::H), (a & 0x0F) + (b & 0x0F) > 0x0F);
				prop_assert!(!state.flag(Flag::N));
			}

			#[test]
			fn test_cp_keeps_accumulator(a: u8, b: u8) {
				let mut state = state();

				prop_assert_eq!(cp(&mut state, a, b), a);
				prop_assert_eq!(state.flag(Flag::Z), a == b);
				prop_assert_eq!(state.flag(Flag::C), a < b);
				prop_assert!(state.flag(Flag::N));
			}
		}

		#[test]
		fn test_dec_half_carry() {
			let mut state = state();

			assert_eq!(0x0F, dec(&mut state, 0x10));
			assert!(state.flag(Flag::H) && !state.flag(Flag::Z));

			assert_eq!(0x00, dec(&mut state, 0x01));
			assert!(!state.flag(Flag::H) && state.flag(Flag::Z));
		}

		#[test]
		fn test_inc_keeps_carry() {
			let mut state = state();

			state.set_flag(Flag::C, true);
			assert_eq!(0x00, inc(&mut state, 0xFF));
			assert!(state.flag(Flag::Z) && state.flag(Flag::H) && state.flag(Flag::C));

			state.set_flag(Flag::C, false);
			assert_eq!(0x00, dec(&mut state, 0x01));
			assert!(!state.flag(Flag::C));
		}

		#[test]
		fn test_sbc_borrow() {
			let mut state = state();

			state.set_flag(Flag::C, true);
			assert_eq!(0xFF, sbc(&mut state, 0x00, 0x00));
			assert!(state.flag(Flag::C) && state.flag(Flag::H) && state.flag(Flag::N));
		}

		#[test]
		fn test_rotates() {
			let mut state = state();

			state.set_flag(Flag::C, false);
			assert_eq!(0x00, rl(&mut state, 0x80));
			assert!(state.flag(Flag::C) && state.flag(Flag::Z));

			assert_eq!(0x01, rl(&mut state, 0x00));
			assert!(!state.flag(Flag::C));

			assert_eq!(0x81, rrc(&mut state, 0x03));
			assert!(state.flag(Flag::C));

			assert_eq!(0xC0, sra(&mut state, 0x81));
			assert_eq!(0x40, srl(&mut state, 0x81));
			assert_eq!(0x5A, swap(&mut state, 0xA5));
		}

		#[test]
		fn test_daa() {
			let mut state = state();

			// 0x15 + 0x27 = 0x3C -> 42 in BCD.
			let sum = add(&mut state, 0x15, 0x27);
			assert_eq!(0x42, daa(&mut state, sum));
			assert!(!state.flag(Flag::C));

			// 0x99 + 0x01 = 0x9A -> 00 in BCD with carry.
			let sum = add(&mut state, 0x99, 0x01);
			assert_eq!(0x00, daa(&mut state, sum));
			assert!(state.flag(Flag::C) && state.flag(Flag::Z));

			// 0x42 - 0x15 = 0x2D -> 27 in BCD.
			let diff = sub(&mut state, 0x42, 0x15);
			assert_eq!(0x27, daa(&mut state, diff));
		}

		#[test]
		fn test_bit() {
			let mut state = state();

			bit(&mut state, 7, 0x7F);
			assert!(state.flag(Flag::Z) && state.flag(Flag::H));

			bit(&mut state, 0, 0x01);
			assert!(!state.flag(Flag::Z));
		}
	}
}

/// Implementation of 16-bit arithmetic operations.
pub mod alu16 {
	use super::*;

	/// Adds the given arguments into HL's value.
	/// In this operation, the zero flag is not affected.
	pub fn add_hl(state: &mut CpuState, lhs: u16, rhs: u16) -> u16 {
		let result_32 = (lhs as u32) + (rhs as u32);
		let result_12 = (lhs & 0x0FFF) + (rhs & 0x0FFF);

		state.set_flag(Flag::N, false);
		state.set_flag(Flag::H, result_12 > 0x0FFF);
		state.set_flag(Flag::C, result_32 > 0xFFFF);

		(result_32 & 0xFFFF) as u16
	}

	/// Adds a signed displacement to the stack pointer's value.
	///
	/// The flags are computed from the unsigned addition of the low bytes,
	/// and Z is always cleared.
	pub fn add_sp(state: &mut CpuState, sp: u16, offset: i8) -> u16 {
		let rhs = offset as u8;

		let half = (sp & 0x0F) + (rhs as u16 & 0x0F) > 0x0F;
		let carry = (sp & 0xFF) + (rhs as u16) > 0xFF;

		state.assign_flags(false, false, half, carry);

		sp.wrapping_add(offset as i16 as u16)
	}

	#[cfg(test)]
	mod tests {
		use super::*;
		use crate::config::HardwareModel;

		#[test]
		fn test_add_hl() {
			let mut state = CpuState::new(HardwareModel::GB);

			state.set_flag(Flag::Z, true);
			assert_eq!(0x1000, add_hl(&mut state, 0x0FFF, 0x0001));
			assert!(state.flag(Flag::H) && !state.flag(Flag::C) && state.flag(Flag::Z));

			assert_eq!(0x0000, add_hl(&mut state, 0xFFFF, 0x0001));
			assert!(state.flag(Flag::C));
		}

		#[test]
		fn test_add_sp() {
			let mut state = CpuState::new(HardwareModel::GB);

			assert_eq!(0xFFFD, add_sp(&mut state, 0xFFFE, -1));
			assert!(state.flag(Flag::C) && state.flag(Flag::H) && !state.flag(Flag::Z));

			assert_eq!(0x0010, add_sp(&mut state, 0x0008, 8));
			assert!(!state.flag(Flag::C) && state.flag(Flag::H));
		}
	}
}
