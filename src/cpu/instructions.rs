// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Implementation of the Z80-like cpu's instructions.
//!
//! Handlers are shared between opcodes of the same family, the register
//! operands are decoded from the opcode's bit fields.

use core::fmt;

use super::Cpu;
use super::alu::*;
use super::state::registers::*;

use crate::bus::Memory;
use crate::GameboyError;

/// Instructions implementations returns the amount of cycles taken,
/// of the relevant error if occured.
pub type InsnResult = Result<usize, GameboyError>;

/// An instruction's method.
pub type Handler = fn(&mut Cpu, Operands) -> InsnResult;

/// The extra cycles a taken relative or absolute jump costs.
const JUMP_TAKEN_CYCLES: usize = 4;
/// The extra cycles a taken conditional call or return costs.
const CALL_TAKEN_CYCLES: usize = 12;

/// The bytes fetched with an opcode, handed to its handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operands {
	/// The (possibly extended) opcode.
	pub opcode: u8,
	/// The two bytes following the opcode, little-endian.
	pub imm: u16,
	/// The base cycle cost from the instruction's descriptor.
	pub cycles: usize,
}

impl Operands {
	/// The immediate byte.
	#[inline]
	pub fn imm8(&self) -> u8 {
		(self.imm & 0xFF) as u8
	}

	/// The immediate word.
	#[inline]
	pub fn imm16(&self) -> u16 {
		self.imm
	}

	/// The immediate byte as a signed displacement.
	#[inline]
	pub fn offset(&self) -> i8 {
		self.imm8() as i8
	}

	/// Bits 3-5, the destination operand or operation.
	#[inline]
	fn dst(&self) -> usize {
		((self.opcode >> 3) & 7) as usize
	}

	/// Bits 0-2, the source operand.
	#[inline]
	fn src(&self) -> usize {
		(self.opcode & 7) as usize
	}

	/// Bits 4-5, the register pair.
	#[inline]
	fn pair(&self) -> usize {
		((self.opcode >> 4) & 3) as usize
	}

	/// Bits 3-4, the branch condition.
	#[inline]
	fn condition(&self) -> usize {
		((self.opcode >> 3) & 3) as usize
	}
}

/// Describes a single opcode.
#[derive(Clone, Copy)]
pub struct Instruction {
	/// The opcode value.
	pub opcode: u8,
	/// Assembly form of the instruction.
	pub mnemonic: &'static str,
	/// Length in bytes, including the opcode (and its prefix).
	pub length: u8,
	/// Base cycle cost. Taken conditional branches cost more.
	pub cycles: u8,
	/// The state transition.
	pub execute: Handler,
}

impl fmt::Debug for Instruction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instruction")
			.field("opcode", &self.opcode)
			.field("mnemonic", &self.mnemonic)
			.field("length", &self.length)
			.field("cycles", &self.cycles)
			.finish()
	}
}

/// Internal utilities for implementing repeating logic once.
mod util {
	use super::*;

	/// Resolves the address of the indirect accumulator loads,
	/// applying the post increment or decrement of HL.
	pub fn indirect_address(cpu: &mut Cpu, field: usize) -> u16 {
		match field {
			0 => cpu.registers.get(Register::BC),
			1 => cpu.registers.get(Register::DE),
			2 => {
				let hl = cpu.registers.get(Register::HL);
				cpu.registers.set(Register::HL, hl.wrapping_add(1));
				hl
			},
			_ => {
				let hl = cpu.registers.get(Register::HL);
				cpu.registers.set(Register::HL, hl.wrapping_sub(1));
				hl
			},
		}
	}

	/// Evaluates the branch condition (NZ, Z, NC, C).
	pub fn condition(cpu: &Cpu, field: usize) -> bool {
		match field {
			0 => !cpu.registers.flag(Flag::Z),
			1 => cpu.registers.flag(Flag::Z),
			2 => !cpu.registers.flag(Flag::C),
			_ => cpu.registers.flag(Flag::C),
		}
	}

	/// Adds a signed displacement to the program counter.
	pub fn jump_relative(cpu: &mut Cpu, offset: i8) {
		let pc = cpu.registers.get(Register::PC);
		cpu.registers.set(Register::PC, pc.wrapping_add(offset as i16 as u16));
	}

	/// Pushes the program counter and jumps to the given address.
	pub fn call(cpu: &mut Cpu, address: u16) -> Result<(), GameboyError> {
		let pc = cpu.registers.get(Register::PC);
		cpu.push(pc)?;
		cpu.registers.set(Register::PC, address);

		Ok(())
	}

	/// Pops the program counter.
	pub fn ret(cpu: &mut Cpu) -> Result<(), GameboyError> {
		let address = cpu.pop()?;
		cpu.registers.set(Register::PC, address);

		Ok(())
	}
}

use util::*;

/// nop
pub fn nop(_cpu: &mut Cpu, ops: Operands) -> InsnResult {
	Ok(ops.cycles)
}

/// stop
///
/// The low power mode needs an external wake up, which isn't modeled.
pub fn stop(_cpu: &mut Cpu, ops: Operands) -> InsnResult {
	Ok(ops.cycles)
}

/// halt
pub fn halt(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	cpu.halted = true;

	Ok(ops.cycles)
}

/// ld r, r
pub fn ld_r_r(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.read_operand(ops.src())?;
	cpu.write_operand(ops.dst(), value)?;

	Ok(ops.cycles)
}

/// ld r, n
pub fn ld_r_d8(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	cpu.write_operand(ops.dst(), ops.imm8())?;

	Ok(ops.cycles)
}

/// ld rr, nn
pub fn ld_rr_d16(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	cpu.registers.set(Register::OPERANDS_16[ops.pair()], ops.imm16());

	Ok(ops.cycles)
}

/// ld (BC), A / ld (DE), A / ld (HL+), A / ld (HL-), A
pub fn ld_ind_a(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address = indirect_address(cpu, ops.pair());
	let value = cpu.registers.get8(Register::A);

	cpu.mmap.write(address, value)?;

	Ok(ops.cycles)
}

/// ld A, (BC) / ld A, (DE) / ld A, (HL+) / ld A, (HL-)
pub fn ld_a_ind(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address = indirect_address(cpu, ops.pair());
	let value = cpu.mmap.read(address)?;

	cpu.registers.set(Register::A, value as u16);

	Ok(ops.cycles)
}

/// ld (nn), SP
pub fn ld_a16_sp(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address = ops.imm16();
	let value = cpu.registers.get(Register::SP);

	cpu.mmap.write(address, (value & 0xFF) as u8)?;
	cpu.mmap.write(address.wrapping_add(1), (value >> 8) as u8)?;

	Ok(ops.cycles)
}

/// ld (nn), A
pub fn ld_a16_a(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.registers.get8(Register::A);
	cpu.mmap.write(ops.imm16(), value)?;

	Ok(ops.cycles)
}

/// ld A, (nn)
pub fn ld_a_a16(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.mmap.read(ops.imm16())?;
	cpu.registers.set(Register::A, value as u16);

	Ok(ops.cycles)
}

/// ldh (n), A
pub fn ldh_a8_a(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address: u16 = 0xFF00 | ops.imm8() as u16;
	let value = cpu.registers.get8(Register::A);

	cpu.mmap.write(address, value)?;

	Ok(ops.cycles)
}

/// ldh A, (n)
pub fn ldh_a_a8(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address: u16 = 0xFF00 | ops.imm8() as u16;
	let value = cpu.mmap.read(address)?;

	cpu.registers.set(Register::A, value as u16);

	Ok(ops.cycles)
}

/// ld (C), A
pub fn ld_c_a(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address: u16 = 0xFF00 | cpu.registers.get(Register::C);
	let value = cpu.registers.get8(Register::A);

	cpu.mmap.write(address, value)?;

	Ok(ops.cycles)
}

/// ld A, (C)
pub fn ld_a_c(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address: u16 = 0xFF00 | cpu.registers.get(Register::C);
	let value = cpu.mmap.read(address)?;

	cpu.registers.set(Register::A, value as u16);

	Ok(ops.cycles)
}

/// ld SP, HL
pub fn ld_sp_hl(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.registers.get(Register::HL);
	cpu.registers.set(Register::SP, value);

	Ok(ops.cycles)
}

/// ld HL, SP+n
pub fn ld_hl_sp_r8(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let sp = cpu.registers.get(Register::SP);
	let result = alu16::add_sp(&mut cpu.registers, sp, ops.offset());

	cpu.registers.set(Register::HL, result);

	Ok(ops.cycles)
}

/// add SP, n
pub fn add_sp_r8(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let sp = cpu.registers.get(Register::SP);
	let result = alu16::add_sp(&mut cpu.registers, sp, ops.offset());

	cpu.registers.set(Register::SP, result);

	Ok(ops.cycles)
}

/// push rr
pub fn push(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.registers.get(Register::STACK_OPERANDS[ops.pair()]);
	cpu.push(value)?;

	Ok(ops.cycles)
}

/// pop rr
pub fn pop(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.pop()?;
	cpu.registers.set(Register::STACK_OPERANDS[ops.pair()], value);

	Ok(ops.cycles)
}

/// inc r
pub fn inc_r(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.read_operand(ops.dst())?;
	let result = alu8::inc(&mut cpu.registers, value);
	cpu.write_operand(ops.dst(), result)?;

	Ok(ops.cycles)
}

/// dec r
pub fn dec_r(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.read_operand(ops.dst())?;
	let result = alu8::dec(&mut cpu.registers, value);
	cpu.write_operand(ops.dst(), result)?;

	Ok(ops.cycles)
}

/// inc rr
pub fn inc_rr(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let reg = Register::OPERANDS_16[ops.pair()];
	let value = cpu.registers.get(reg);
	cpu.registers.set(reg, value.wrapping_add(1));

	Ok(ops.cycles)
}

/// dec rr
pub fn dec_rr(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let reg = Register::OPERANDS_16[ops.pair()];
	let value = cpu.registers.get(reg);
	cpu.registers.set(reg, value.wrapping_sub(1));

	Ok(ops.cycles)
}

/// add HL, rr
pub fn add_hl_rr(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let lhs = cpu.registers.get(Register::HL);
	let rhs = cpu.registers.get(Register::OPERANDS_16[ops.pair()]);
	let result = alu16::add_hl(&mut cpu.registers, lhs, rhs);

	cpu.registers.set(Register::HL, result);

	Ok(ops.cycles)
}

/// add / adc / sub / sbc / and / xor / or / cp A, r
pub fn alu_r(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let rhs = cpu.read_operand(ops.src())?;
	let lhs = cpu.registers.get8(Register::A);

	let result = alu8::OPS[ops.dst()](&mut cpu.registers, lhs, rhs);
	cpu.registers.set(Register::A, result as u16);

	Ok(ops.cycles)
}

/// add / adc / sub / sbc / and / xor / or / cp A, n
pub fn alu_d8(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let lhs = cpu.registers.get8(Register::A);

	let result = alu8::OPS[ops.dst()](&mut cpu.registers, lhs, ops.imm8());
	cpu.registers.set(Register::A, result as u16);

	Ok(ops.cycles)
}

/// rlca / rrca / rla / rra
///
/// Unlike the extended forms, these leave the zero flag as it was.
pub fn rotate_a(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let zero = cpu.registers.flag(Flag::Z);
	let value = cpu.registers.get8(Register::A);

	let result = alu8::SHIFT_OPS[ops.dst()](&mut cpu.registers, value);

	cpu.registers.set(Register::A, result as u16);
	cpu.registers.set_flag(Flag::Z, zero);

	Ok(ops.cycles)
}

/// daa
pub fn daa(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.registers.get8(Register::A);
	let result = alu8::daa(&mut cpu.registers, value);
	cpu.registers.set(Register::A, result as u16);

	Ok(ops.cycles)
}

/// cpl
pub fn cpl(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.registers.get8(Register::A);
	let result = alu8::cpl(&mut cpu.registers, value);
	cpu.registers.set(Register::A, result as u16);

	Ok(ops.cycles)
}

/// scf
pub fn scf(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	alu8::scf(&mut cpu.registers);

	Ok(ops.cycles)
}

/// ccf
pub fn ccf(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	alu8::ccf(&mut cpu.registers);

	Ok(ops.cycles)
}

/// jr n
pub fn jr(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	jump_relative(cpu, ops.offset());

	Ok(ops.cycles)
}

/// jr cc, n
pub fn jr_cc(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	if !condition(cpu, ops.condition()) {
		return Ok(ops.cycles);
	}

	jump_relative(cpu, ops.offset());

	Ok(ops.cycles + JUMP_TAKEN_CYCLES)
}

/// jp nn
pub fn jp(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	cpu.registers.set(Register::PC, ops.imm16());

	Ok(ops.cycles)
}

/// jp cc, nn
pub fn jp_cc(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	if !condition(cpu, ops.condition()) {
		return Ok(ops.cycles);
	}

	cpu.registers.set(Register::PC, ops.imm16());

	Ok(ops.cycles + JUMP_TAKEN_CYCLES)
}

/// jp (HL)
pub fn jp_hl(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let address = cpu.registers.get(Register::HL);
	cpu.registers.set(Register::PC, address);

	Ok(ops.cycles)
}

/// call nn
pub fn call_a16(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	call(cpu, ops.imm16())?;

	Ok(ops.cycles)
}

/// call cc, nn
pub fn call_cc(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	if !condition(cpu, ops.condition()) {
		return Ok(ops.cycles);
	}

	call(cpu, ops.imm16())?;

	Ok(ops.cycles + CALL_TAKEN_CYCLES)
}

/// rst n
pub fn rst(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	call(cpu, (ops.opcode & 0x38) as u16)?;

	Ok(ops.cycles)
}

/// ret
pub fn ret_unconditional(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	ret(cpu)?;

	Ok(ops.cycles)
}

/// ret cc
pub fn ret_cc(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	if !condition(cpu, ops.condition()) {
		return Ok(ops.cycles);
	}

	ret(cpu)?;

	Ok(ops.cycles + CALL_TAKEN_CYCLES)
}

/// reti
pub fn reti(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	ret(cpu)?;
	cpu.registers.set_ime(true);

	Ok(ops.cycles)
}

/// di
pub fn di(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	cpu.registers.set_ime(false);

	Ok(ops.cycles)
}

/// ei
pub fn ei(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	cpu.registers.set_ime(true);

	Ok(ops.cycles)
}

/// The 0xCB prefix, runs an instruction from the extended table.
pub fn prefix_cb(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let opcode = ops.imm8();
	let address = cpu.registers.get(Register::PC).wrapping_sub(2);

	let insn = super::decode::decode_cb(opcode)
		.ok_or(GameboyError::IllegalOpcode { opcode, prefixed: true, address })?;

	let extended = Operands {
		opcode,
		imm: 0,
		cycles: insn.cycles as usize,
	};

	(insn.execute)(cpu, extended)
}

/// rlc / rrc / rl / rr / sla / sra / swap / srl r
pub fn cb_shift(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.read_operand(ops.src())?;
	let result = alu8::SHIFT_OPS[ops.dst()](&mut cpu.registers, value);
	cpu.write_operand(ops.src(), result)?;

	Ok(ops.cycles)
}

/// bit b, r
pub fn cb_bit(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.read_operand(ops.src())?;
	alu8::bit(&mut cpu.registers, ops.dst() as u8, value);

	Ok(ops.cycles)
}

/// res b, r
pub fn cb_res(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.read_operand(ops.src())?;
	cpu.write_operand(ops.src(), value & !(1 << ops.dst()))?;

	Ok(ops.cycles)
}

/// set b, r
pub fn cb_set(cpu: &mut Cpu, ops: Operands) -> InsnResult {
	let value = cpu.read_operand(ops.src())?;
	cpu.write_operand(ops.src(), value | (1 << ops.dst()))?;

	Ok(ops.cycles)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cpu::tests::cpu_with_program;

	#[test]
	fn test_operand_fields() {
		// ld D, (HL)
		let ops = Operands { opcode: 0x56, imm: 0, cycles: 8 };
		assert_eq!(2, ops.dst());
		assert_eq!(6, ops.src());

		// jr C, n
		let ops = Operands { opcode: 0x38, imm: 0x00FE, cycles: 8 };
		assert_eq!(3, ops.condition());
		assert_eq!(-2, ops.offset());

		// pop AF
		let ops = Operands { opcode: 0xF1, imm: 0, cycles: 12 };
		assert_eq!(Register::AF, Register::STACK_OPERANDS[ops.pair()]);
	}

	#[test]
	fn test_push_pop() -> Result<(), GameboyError> {
		// push BC; pop DE
		let mut cpu = cpu_with_program(&[0xC5, 0xD1])?;
		cpu.registers.set(Register::BC, 0xBEEF);
		let sp = cpu.registers.get(Register::SP);

		cpu.step()?;
		assert_eq!(sp.wrapping_sub(2), cpu.registers.get(Register::SP));
		assert_eq!(0xBE, cpu.mmap.read(sp.wrapping_sub(1))?);
		assert_eq!(0xEF, cpu.mmap.read(sp.wrapping_sub(2))?);

		cpu.step()?;
		assert_eq!(sp, cpu.registers.get(Register::SP));
		assert_eq!(0xBEEF, cpu.registers.get(Register::DE));

		Ok(())
	}

	#[test]
	fn test_conditional_cycles() -> Result<(), GameboyError> {
		// jr NZ, +2 (taken); jr Z, +2 (not taken)
		let mut cpu = cpu_with_program(&[0x20, 0x02, 0x00, 0x00, 0x28, 0x02])?;
		cpu.registers.set_flag(Flag::Z, false);

		let start = cpu.registers.get(Register::PC);
		assert_eq!(12, cpu.execute()?);
		assert_eq!(start + 4, cpu.registers.get(Register::PC));

		assert_eq!(8, cpu.execute()?);
		assert_eq!(start + 6, cpu.registers.get(Register::PC));

		Ok(())
	}

	#[test]
	fn test_call_ret() -> Result<(), GameboyError> {
		let mut cpu = cpu_with_program(&[0xCD, 0x00, 0xC1])?;
		cpu.mmap.write(0xC100, 0xC9)?;

		let start = cpu.registers.get(Register::PC);
		assert_eq!(24, cpu.execute()?);
		assert_eq!(0xC100, cpu.registers.get(Register::PC));

		assert_eq!(16, cpu.execute()?);
		assert_eq!(start + 3, cpu.registers.get(Register::PC));

		Ok(())
	}

	#[test]
	fn test_short_rotate_keeps_zero() -> Result<(), GameboyError> {
		// rlca; rlc A
		let mut cpu = cpu_with_program(&[0x07, 0xCB, 0x07])?;

		cpu.registers.set(Register::A, 0x00);
		cpu.registers.set_flag(Flag::Z, false);
		cpu.execute()?;
		assert!(!cpu.registers.flag(Flag::Z));

		assert_eq!(8, cpu.execute()?);
		assert!(cpu.registers.flag(Flag::Z));

		Ok(())
	}

	#[test]
	fn test_hl_increment_loads() -> Result<(), GameboyError> {
		// ld (HL+), A; ld A, (HL-)
		let mut cpu = cpu_with_program(&[0x22, 0x3A])?;
		cpu.registers.set(Register::HL, 0xC200);
		cpu.registers.set(Register::A, 0x5A);

		cpu.execute()?;
		assert_eq!(0x5A, cpu.mmap.read(0xC200)?);
		assert_eq!(0xC201, cpu.registers.get(Register::HL));

		cpu.execute()?;
		assert_eq!(0xC200, cpu.registers.get(Register::HL));

		Ok(())
	}

	#[test]
	fn test_cb_memory_operand() -> Result<(), GameboyError> {
		// set 3, (HL); bit 3, (HL)
		let mut cpu = cpu_with_program(&[0xCB, 0xDE, 0xCB, 0x5E])?;
		cpu.registers.set(Register::HL, 0xC300);

		assert_eq!(16, cpu.execute()?);
		assert_eq!(0x08, cpu.mmap.read(0xC300)?);

		assert_eq!(12, cpu.execute()?);
		assert!(!cpu.registers.flag(Flag::Z));

		Ok(())
	}
}
