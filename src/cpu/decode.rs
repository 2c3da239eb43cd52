// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy cpu's opcode decoder.
//!
//! Both dispatch tables are built at compile time, decoding an opcode is
//! a plain table lookup.

use super::Cpu;
use super::instructions::*;
use crate::GameboyError;

/// The primary opcodes, indexed by the opcode byte. Unmapped opcodes are `None`.
pub static PRIMARY_TABLE: [Option<Instruction>; 256] = build_primary();

/// The opcodes prefixed by 0xCB, indexed by the second byte.
pub static CB_TABLE: [Option<Instruction>; 256] = build_extended();

/// Returns the primary instruction that matches the given opcode.
#[inline]
pub fn decode(opcode: u8) -> Option<&'static Instruction> {
	PRIMARY_TABLE[opcode as usize].as_ref()
}

/// Decode the second byte of an opcode that starts with 0xCB.
#[inline]
pub fn decode_cb(opcode: u8) -> Option<&'static Instruction> {
	CB_TABLE[opcode as usize].as_ref()
}

impl Cpu {
	/// Disassembles the instruction at the given address.
	///
	/// Returns the instruction's mnemonic and its length in bytes.
	pub fn disassemble(&self, address: u16) -> Result<(&'static str, u8), GameboyError> {
		let opcode: u8 = self.peek(address)?;

		let insn = decode(opcode)
			.ok_or(GameboyError::IllegalOpcode { opcode, prefixed: false, address })?;

		if opcode != 0xCB {
			return Ok((insn.mnemonic, insn.length));
		}

		let extended: u8 = self.peek(address.wrapping_add(1))?;

		match decode_cb(extended) {
			Some(insn) => Ok((insn.mnemonic, insn.length)),
			None => Err(GameboyError::IllegalOpcode { opcode: extended, prefixed: true, address }),
		}
	}
}

const fn insn(opcode: u8, length: u8, cycles: u8, execute: Handler) -> Option<Instruction> {
	Some(Instruction {
		opcode,
		mnemonic: PRIMARY_MNEMONICS[opcode as usize],
		length,
		cycles,
		execute,
	})
}

/// Builds the descriptor of a primary opcode.
const fn primary(op: u8) -> Option<Instruction> {
	// Whether the 3-bit operand fields select the memory at (HL).
	let src_mem = (op & 7) == 6;
	let dst_mem = ((op >> 3) & 7) == 6;

	match op {
		0x00 => insn(op, 1, 4, nop),
		0x10 => insn(op, 2, 4, stop),
		0x08 => insn(op, 3, 20, ld_a16_sp),
		0x18 => insn(op, 2, 12, jr),
		0x20 | 0x28 | 0x30 | 0x38 => insn(op, 2, 8, jr_cc),

		0x01 | 0x11 | 0x21 | 0x31 => insn(op, 3, 12, ld_rr_d16),
		0x09 | 0x19 | 0x29 | 0x39 => insn(op, 1, 8, add_hl_rr),
		0x02 | 0x12 | 0x22 | 0x32 => insn(op, 1, 8, ld_ind_a),
		0x0A | 0x1A | 0x2A | 0x3A => insn(op, 1, 8, ld_a_ind),
		0x03 | 0x13 | 0x23 | 0x33 => insn(op, 1, 8, inc_rr),
		0x0B | 0x1B | 0x2B | 0x3B => insn(op, 1, 8, dec_rr),

		0x34 => insn(op, 1, 12, inc_r),
		0x35 => insn(op, 1, 12, dec_r),
		0x36 => insn(op, 2, 12, ld_r_d8),
		_ if op < 0x40 && (op & 7) == 4 => insn(op, 1, 4, inc_r),
		_ if op < 0x40 && (op & 7) == 5 => insn(op, 1, 4, dec_r),
		_ if op < 0x40 && (op & 7) == 6 => insn(op, 2, 8, ld_r_d8),

		0x07 | 0x0F | 0x17 | 0x1F => insn(op, 1, 4, rotate_a),
		0x27 => insn(op, 1, 4, daa),
		0x2F => insn(op, 1, 4, cpl),
		0x37 => insn(op, 1, 4, scf),
		0x3F => insn(op, 1, 4, ccf),

		0x76 => insn(op, 1, 4, halt),
		0x40..=0x7F => insn(op, 1, if src_mem || dst_mem { 8 } else { 4 }, ld_r_r),
		0x80..=0xBF => insn(op, 1, if src_mem { 8 } else { 4 }, alu_r),

		0xC0 | 0xC8 | 0xD0 | 0xD8 => insn(op, 1, 8, ret_cc),
		0xC2 | 0xCA | 0xD2 | 0xDA => insn(op, 3, 12, jp_cc),
		0xC4 | 0xCC | 0xD4 | 0xDC => insn(op, 3, 12, call_cc),
		0xC1 | 0xD1 | 0xE1 | 0xF1 => insn(op, 1, 12, pop),
		0xC5 | 0xD5 | 0xE5 | 0xF5 => insn(op, 1, 16, push),
		0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => insn(op, 2, 8, alu_d8),
		0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => insn(op, 1, 16, rst),

		0xC3 => insn(op, 3, 16, jp),
		0xC9 => insn(op, 1, 16, ret_unconditional),
		0xCB => insn(op, 2, 8, prefix_cb),
		0xCD => insn(op, 3, 24, call_a16),
		0xD9 => insn(op, 1, 16, reti),

		0xE0 => insn(op, 2, 12, ldh_a8_a),
		0xF0 => insn(op, 2, 12, ldh_a_a8),
		0xE2 => insn(op, 1, 8, ld_c_a),
		0xF2 => insn(op, 1, 8, ld_a_c),
		0xE8 => insn(op, 2, 16, add_sp_r8),
		0xF8 => insn(op, 2, 12, ld_hl_sp_r8),
		0xE9 => insn(op, 1, 4, jp_hl),
		0xF9 => insn(op, 1, 8, ld_sp_hl),
		0xEA => insn(op, 3, 16, ld_a16_a),
		0xFA => insn(op, 3, 16, ld_a_a16),
		0xF3 => insn(op, 1, 4, di),
		0xFB => insn(op, 1, 4, ei),

		// D3 DB DD E3 E4 EB EC ED F4 FC FD
		_ => None,
	}
}

/// Builds the descriptor of an extended opcode.
const fn extended(op: u8) -> Option<Instruction> {
	let mem = (op & 7) == 6;

	let (cycles, execute): (u8, Handler) = match op >> 6 {
		0 => (if mem { 16 } else { 8 }, cb_shift as Handler),
		1 => (if mem { 12 } else { 8 }, cb_bit as Handler),
		2 => (if mem { 16 } else { 8 }, cb_res as Handler),
		_ => (if mem { 16 } else { 8 }, cb_set as Handler),
	};

	Some(Instruction {
		opcode: op,
		mnemonic: CB_MNEMONICS[op as usize],
		length: 2,
		cycles,
		execute,
	})
}

const fn build_primary() -> [Option<Instruction>; 256] {
	let mut table: [Option<Instruction>; 256] = [None; 256];
	let mut opcode: usize = 0;

	while opcode < 256 {
		table[opcode] = primary(opcode as u8);
		opcode += 1;
	}

	table
}

const fn build_extended() -> [Option<Instruction>; 256] {
	let mut table: [Option<Instruction>; 256] = [None; 256];
	let mut opcode: usize = 0;

	while opcode < 256 {
		table[opcode] = extended(opcode as u8);
		opcode += 1;
	}

	table
}

/// Assembly forms of the primary opcodes.
const PRIMARY_MNEMONICS: [&str; 256] = [
	"NOP", "LD BC,d16", "LD (BC),A", "INC BC",
	"INC B", "DEC B", "LD B,d8", "RLCA",
	"LD (a16),SP", "ADD HL,BC", "LD A,(BC)", "DEC BC",
	"INC C", "DEC C", "LD C,d8", "RRCA",
	"STOP", "LD DE,d16", "LD (DE),A", "INC DE",
	"INC D", "DEC D", "LD D,d8", "RLA",
	"JR r8", "ADD HL,DE", "LD A,(DE)", "DEC DE",
	"INC E", "DEC E", "LD E,d8", "RRA",
	"JR NZ,r8", "LD HL,d16", "LD (HL+),A", "INC HL",
	"INC H", "DEC H", "LD H,d8", "DAA",
	"JR Z,r8", "ADD HL,HL", "LD A,(HL+)", "DEC HL",
	"INC L", "DEC L", "LD L,d8", "CPL",
	"JR NC,r8", "LD SP,d16", "LD (HL-),A", "INC SP",
	"INC (HL)", "DEC (HL)", "LD (HL),d8", "SCF",
	"JR C,r8", "ADD HL,SP", "LD A,(HL-)", "DEC SP",
	"INC A", "DEC A", "LD A,d8", "CCF",
	"LD B,B", "LD B,C", "LD B,D", "LD B,E",
	"LD B,H", "LD B,L", "LD B,(HL)", "LD B,A",
	"LD C,B", "LD C,C", "LD C,D", "LD C,E",
	"LD C,H", "LD C,L", "LD C,(HL)", "LD C,A",
	"LD D,B", "LD D,C", "LD D,D", "LD D,E",
	"LD D,H", "LD D,L", "LD D,(HL)", "LD D,A",
	"LD E,B", "LD E,C", "LD E,D", "LD E,E",
	"LD E,H", "LD E,L", "LD E,(HL)", "LD E,A",
	"LD H,B", "LD H,C", "LD H,D", "LD H,E",
	"LD H,H", "LD H,L", "LD H,(HL)", "LD H,A",
	"LD L,B", "LD L,C", "LD L,D", "LD L,E",
	"LD L,H", "LD L,L", "LD L,(HL)", "LD L,A",
	"LD (HL),B", "LD (HL),C", "LD (HL),D", "LD (HL),E",
	"LD (HL),H", "LD (HL),L", "HALT", "LD (HL),A",
	"LD A,B", "LD A,C", "LD A,D", "LD A,E",
	"LD A,H", "LD A,L", "LD A,(HL)", "LD A,A",
	"ADD A,B", "ADD A,C", "ADD A,D", "ADD A,E",
	"ADD A,H", "ADD A,L", "ADD A,(HL)", "ADD A,A",
	"ADC A,B", "ADC A,C", "ADC A,D", "ADC A,E",
	"ADC A,H", "ADC A,L", "ADC A,(HL)", "ADC A,A",
	"SUB B", "SUB C", "SUB D", "SUB E",
	"SUB H", "SUB L", "SUB (HL)", "SUB A",
	"SBC A,B", "SBC A,C", "SBC A,D", "SBC A,E",
	"SBC A,H", "SBC A,L", "SBC A,(HL)", "SBC A,A",
	"AND B", "AND C", "AND D", "AND E",
	"AND H", "AND L", "AND (HL)", "AND A",
	"XOR B", "XOR C", "XOR D", "XOR E",
	"XOR H", "XOR L", "XOR (HL)", "XOR A",
	"OR B", "OR C", "OR D", "OR E",
	"OR H", "OR L", "OR (HL)", "OR A",
	"CP B", "CP C", "CP D", "CP E",
	"CP H", "CP L", "CP (HL)", "CP A",
	"RET NZ", "POP BC", "JP NZ,a16", "JP a16",
	"CALL NZ,a16", "PUSH BC", "ADD A,d8", "RST 00H",
	"RET Z", "RET", "JP Z,a16", "PREFIX CB",
	"CALL Z,a16", "CALL a16", "ADC A,d8", "RST 08H",
	"RET NC", "POP DE", "JP NC,a16", "ILLEGAL",
	"CALL NC,a16", "PUSH DE", "SUB d8", "RST 10H",
	"RET C", "RETI", "JP C,a16", "ILLEGAL",
	"CALL C,a16", "ILLEGAL", "SBC A,d8", "RST 18H",
	"LDH (a8),A", "POP HL", "LD (C),A", "ILLEGAL",
	"ILLEGAL", "PUSH HL", "AND d8", "RST 20H",
	"ADD SP,r8", "JP (HL)", "LD (a16),A", "ILLEGAL",
	"ILLEGAL", "ILLEGAL", "XOR d8", "RST 28H",
	"LDH A,(a8)", "POP AF", "LD A,(C)", "DI",
	"ILLEGAL", "PUSH AF", "OR d8", "RST 30H",
	"LD HL,SP+r8", "LD SP,HL", "LD A,(a16)", "EI",
	"ILLEGAL", "ILLEGAL", "CP d8", "RST 38H",
];

/// Assembly forms of the extended opcodes.
const CB_MNEMONICS: [&str; 256] = [
	"RLC B", "RLC C", "RLC D", "RLC E",
	"RLC H", "RLC L", "RLC (HL)", "RLC A",
	"RRC B", "RRC C", "RRC D", "RRC E",
	"RRC H", "RRC L", "RRC (HL)", "RRC A",
	"RL B", "RL C", "RL D", "RL E",
	"RL H", "RL L", "RL (HL)", "RL A",
	"RR B", "RR C", "RR D", "RR E",
	"RR H", "RR L", "RR (HL)", "RR A",
	"SLA B", "SLA C", "SLA D", "SLA E",
	"SLA H", "SLA L", "SLA (HL)", "SLA A",
	"SRA B", "SRA C", "SRA D", "SRA E",
	"SRA H", "SRA L", "SRA (HL)", "SRA A",
	"SWAP B", "SWAP C", "SWAP D", "SWAP E",
	"SWAP H", "SWAP L", "SWAP (HL)", "SWAP A",
	"SRL B", "SRL C", "SRL D", "SRL E",
	"SRL H", "SRL L", "SRL (HL)", "SRL A",
	"BIT 0,B", "BIT 0,C", "BIT 0,D", "BIT 0,E",
	"BIT 0,H", "BIT 0,L", "BIT 0,(HL)", "BIT 0,A",
	"BIT 1,B", "BIT 1,C", "BIT 1,D", "BIT 1,E",
	"BIT 1,H", "BIT 1,L", "BIT 1,(HL)", "BIT 1,A",
	"BIT 2,B", "BIT 2,C", "BIT 2,D", "BIT 2,E",
	"BIT 2,H", "BIT 2,L", "BIT 2,(HL)", "BIT 2,A",
	"BIT 3,B", "BIT 3,C", "BIT 3,D", "BIT 3,E",
	"BIT 3,H", "BIT 3,L", "BIT 3,(HL)", "BIT 3,A",
	"BIT 4,B", "BIT 4,C", "BIT 4,D", "BIT 4,E",
	"BIT 4,H", "BIT 4,L", "BIT 4,(HL)", "BIT 4,A",
	"BIT 5,B", "BIT 5,C", "BIT 5,D", "BIT 5,E",
	"BIT 5,H", "BIT 5,L", "BIT 5,(HL)", "BIT 5,A",
	"BIT 6,B", "BIT 6,C", "BIT 6,D", "BIT 6,E",
	"BIT 6,H", "BIT 6,L", "BIT 6,(HL)", "BIT 6,A",
	"BIT 7,B", "BIT 7,C", "BIT 7,D", "BIT 7,E",
	"BIT 7,H", "BIT 7,L", "BIT 7,(HL)", "BIT 7,A",
	"RES 0,B", "RES 0,C", "RES 0,D", "RES 0,E",
	"RES 0,H", "RES 0,L", "RES 0,(HL)", "RES 0,A",
	"RES 1,B", "RES 1,C", "RES 1,D", "RES 1,E",
	"RES 1,H", "RES 1,L", "RES 1,(HL)", "RES 1,A",
	"RES 2,B", "RES 2,C", "RES 2,D", "RES 2,E",
	"RES 2,H", "RES 2,L", "RES 2,(HL)", "RES 2,A",
	"RES 3,B", "RES 3,C", "RES 3,D", "RES 3,E",
	"RES 3,H", "RES 3,L", "RES 3,(HL)", "RES 3,A",
	"RES 4,B", "RES 4,C", "RES 4,D", "RES 4,E",
	"RES 4,H", "RES 4,L", "RES 4,(HL)", "RES 4,A",
	"RES 5,B", "RES 5,C", "RES 5,D", "RES 5,E",
	"RES 5,H", "RES 5,L", "RES 5,(HL)", "RES 5,A",
	"RES 6,B", "RES 6,C", "RES 6,D", "RES 6,E",
	"RES 6,H", "RES 6,L", "RES 6,(HL)", "RES 6,A",
	"RES 7,B", "RES 7,C", "RES 7,D", "RES 7,E",
	"RES 7,H", "RES 7,L", "RES 7,(HL)", "RES 7,A",
	"SET 0,B", "SET 0,C", "SET 0,D", "SET 0,E",
	"SET 0,H", "SET 0,L", "SET 0,(HL)", "SET 0,A",
	"SET 1,B", "SET 1,C", "SET 1,D", "SET 1,E",
	"SET 1,H", "SET 1,L", "SET 1,(HL)", "SET 1,A",
	"SET 2,B", "SET 2,C", "SET 2,D", "SET 2,E",
	"SET 2,H", "SET 2,L", "SET 2,(HL)", "SET 2,A",
	"SET 3,B", "SET 3,C", "SET 3,D", "SET 3,E",
	"SET 3,H", "SET 3,L", "SET 3,(HL)", "SET 3,A",
	"SET 4,B", "SET 4,C", "SET 4,D", "SET 4,E",
	"SET 4,H", "SET 4,L", "SET 4,(HL)", "SET 4,A",
	"SET 5,B", "SET 5,C", "SET 5,D", "SET 5,E",
	"SET 5,H", "SET 5,L", "SET 5,(HL)", "SET 5,A",
	"SET 6,B", "SET 6,C", "SET 6,D", "SET 6,E",
	"SET 6,H", "SET 6,L", "SET 6,(HL)", "SET 6,A",
	"SET 7,B", "SET 7,C", "SET 7,D", "SET 7,E",
	"SET 7,H", "SET 7,L", "SET 7,(HL)", "SET 7,A",
];

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_illegal_opcodes() {
		let illegal: std::vec::Vec<u8> = (0..=255u8)
			.filter(|opcode| decode(*opcode).is_none())
			.collect();

		assert_eq!(illegal, [0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD]);
		assert!((0..=255u8).all(|opcode| decode_cb(opcode).is_some()));
	}

	#[test]
	fn test_descriptors() {
		let check = |opcode: u8, mnemonic: &str, length: u8, cycles: u8| {
			let insn = decode(opcode).map(|insn| (insn.opcode, insn.mnemonic, insn.length, insn.cycles));
			assert_eq!(Some((opcode, mnemonic, length, cycles)), insn);
		};

		check(0x00, "NOP", 1, 4);
		check(0x01, "LD BC,d16", 3, 12);
		check(0x10, "STOP", 2, 4);
		check(0x36, "LD (HL),d8", 2, 12);
		check(0x46, "LD B,(HL)", 1, 8);
		check(0x76, "HALT", 1, 4);
		check(0x86, "ADD A,(HL)", 1, 8);
		check(0xBF, "CP A", 1, 4);
		check(0xC4, "CALL NZ,a16", 3, 12);
		check(0xE0, "LDH (a8),A", 2, 12);
		check(0xFF, "RST 38H", 1, 16);
	}

	#[test]
	fn test_extended_descriptors() {
		let bit = decode_cb(0x7E).map(|insn| (insn.mnemonic, insn.cycles));
		assert_eq!(Some(("BIT 7,(HL)", 12)), bit);

		let swap = decode_cb(0x37).map(|insn| (insn.mnemonic, insn.cycles));
		assert_eq!(Some(("SWAP A", 8)), swap);

		let res = decode_cb(0x86).map(|insn| (insn.mnemonic, insn.cycles));
		assert_eq!(Some(("RES 0,(HL)", 16)), res);
	}
}
