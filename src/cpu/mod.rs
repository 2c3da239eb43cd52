// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy's processor emulation.

pub mod state;
pub mod alu;
pub mod decode;
pub mod instructions;
pub mod interrupts;

use alloc::collections::BTreeSet;
use core::mem::size_of;

use log::{debug, error};
#[cfg(feature = "debug")]
use log::trace;
use num::PrimInt;

use state::*;
use state::registers::*;
use instructions::{InsnResult, Operands};

use crate::bus::*;
use crate::bus::cartridge::Cartridge;
use crate::GameboyError;
use crate::config::Config;

/// The cycles a halted cpu waits between interrupt checks.
const HALT_CYCLES: usize = 4;

/// What happened during a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
	/// An instruction was executed (or the halted cpu idled) for the given cycles.
	Executed {
		/// Cycles spent, including a serviced interrupt.
		cycles: usize,
	},
	/// The program counter reached a breakpoint, nothing was executed.
	Breakpoint {
		/// The breakpoint's address.
		address: u16,
	},
}

/// The gameboy's processor.
///
/// The cpu owns the memory bus, so this struct contains the complete emulator's state.
pub struct Cpu {
	/// The cpu's registers.
	pub registers: CpuState,
	/// The devices' memory mapping
	pub mmap: SystemBus,
	/// The emulator's configuration
	pub config: Config,
	/// Set by HALT, cleared once an enabled interrupt is pending.
	pub(crate) halted: bool,
	/// The error that stopped the execution.
	fault: Option<GameboyError>,
	breakpoints: BTreeSet<u16>,
	/// A breakpoint that was just reported, and is stepped over by the next step.
	skip_breakpoint: Option<u16>,
	instructions: u64,
}

impl Cpu {
	/// Initializes a new virtual cpu in its post-boot state.
	pub fn new(config: Config, cartridge: Cartridge) -> Self {
		Cpu {
			registers: CpuState::new(config.model),
			mmap: SystemBus::new(&config, cartridge),
			config,
			halted: false,
			fault: None,
			breakpoints: BTreeSet::new(),
			skip_breakpoint: None,
			instructions: 0,
		}
	}

	/// Restores the power-on state, the breakpoints are dropped as well.
	pub fn reset(&mut self) {
		self.registers.reset(self.config.model);
		self.mmap.reset(&self.config);
		self.halted = false;
		self.fault = None;
		self.breakpoints.clear();
		self.skip_breakpoint = None;
		self.instructions = 0;
	}

	/// Reads a value from the memory without moving the program counter.
	///
	/// The function works in little-endian, that is, when reading 2 bytes,
	/// the first byte will be the least-significant one.
	pub fn peek<T: PrimInt>(&self, address: u16) -> Result<T, GameboyError> {
		let mut result = T::zero();

		for i in 0..size_of::<T>() {
			let byte = self.mmap.read(address.wrapping_add(i as u16))?;
			let data: T = num::cast::<u8, T>(byte).ok_or(GameboyError::MemoryFault { address })?;

			// We're using little-endianity.
			result = result | (data << (8 * i));
		}

		Ok(result)
	}

	/// Emulates the execution of a single instruction.
	///
	/// Returns the number of clock cycles the instruction has taken.
	/// An illegal opcode leaves the state untouched and faults the cpu.
	pub fn execute(&mut self) -> InsnResult {
		let pc = self.registers.get(Register::PC);

		// The opcode and the two bytes that follow it, reading code has no side effects.
		let opcode: u8 = self.peek(pc)?;
		let imm: u16 = self.peek(pc.wrapping_add(1))?;

		let insn = match decode::decode(opcode) {
			Some(insn) => insn,
			None => {
				let err = GameboyError::IllegalOpcode { opcode, prefixed: false, address: pc };
				error!("{}", err);
				self.fault = Some(err.clone());
				return Err(err);
			}
		};

		#[cfg(feature = "debug")]
		trace!(
			"{:04x}: {:<18} af={:04x} bc={:04x} de={:04x} hl={:04x} sp={:04x}",
			pc,
			insn.mnemonic,
			self.registers.get(Register::AF),
			self.registers.get(Register::BC),
			self.registers.get(Register::DE),
			self.registers.get(Register::HL),
			self.registers.get(Register::SP),
		);

		self.registers.set(Register::PC, pc.wrapping_add(insn.length as u16));
		self.instructions += 1;

		let operands = Operands {
			opcode,
			imm,
			cycles: insn.cycles as usize,
		};

		(insn.execute)(self, operands).map_err(|err| {
			error!("{} while executing {} at {:04x}", err, insn.mnemonic, pc);
			self.fault = Some(err.clone());
			err
		})
	}

	/// Runs a single instruction, advances the peripherals by the cycles it took
	/// and services a single pending interrupt.
	pub fn step(&mut self) -> Result<Event, GameboyError> {
		if let Some(err) = &self.fault {
			return Err(err.clone());
		}

		let pc = self.registers.get(Register::PC);

		if !self.halted && self.breakpoints.contains(&pc) && self.skip_breakpoint != Some(pc) {
			debug!("breakpoint hit at {:04x}", pc);
			self.skip_breakpoint = Some(pc);
			return Ok(Event::Breakpoint { address: pc });
		}

		self.skip_breakpoint = None;

		let mut cycles = if self.halted {
			HALT_CYCLES
		} else {
			self.execute()?
		};

		self.mmap.process(cycles);

		// The wake up doesn't depend on the master enable flag.
		if self.halted && self.pending_interrupts() != 0 {
			self.halted = false;
		}

		let dispatch = self.dispatch_interrupts()?;

		if dispatch > 0 {
			self.mmap.process(dispatch);
			cycles += dispatch;
		}

		Ok(Event::Executed { cycles })
	}

	/// Steps until a breakpoint is reached.
	///
	/// Returns the breakpoint's address.
	pub fn run(&mut self) -> Result<u16, GameboyError> {
		loop {
			if let Event::Breakpoint { address } = self.step()? {
				return Ok(address);
			}
		}
	}

	/// Steps the given amount of times, stopping early on a breakpoint.
	///
	/// Returns the last step's event.
	pub fn run_for(&mut self, steps: usize) -> Result<Event, GameboyError> {
		let mut event = Event::Executed { cycles: 0 };

		for _ in 0..steps {
			event = self.step()?;

			if let Event::Breakpoint { .. } = event {
				break;
			}
		}

		Ok(event)
	}

	/// Adds or removes a breakpoint.
	///
	/// Returns true if the breakpoint is now set.
	pub fn toggle_breakpoint(&mut self, address: u16) -> bool {
		if self.breakpoints.remove(&address) {
			false
		} else {
			self.breakpoints.insert(address)
		}
	}

	/// The set breakpoints, ordered by address.
	pub fn breakpoints(&self) -> impl Iterator<Item = u16> + '_ {
		self.breakpoints.iter().copied()
	}

	/// Whether the cpu is waiting for an interrupt.
	pub fn halted(&self) -> bool {
		self.halted
	}

	/// The error that stopped the execution, if any.
	pub fn faulted(&self) -> Option<&GameboyError> {
		self.fault.as_ref()
	}

	/// The amount of instructions executed since power-on.
	pub fn instructions(&self) -> u64 {
		self.instructions
	}

	/// Reads the 8-bit operand selected by a 3-bit opcode field.
	pub(crate) fn read_operand(&self, index: usize) -> Result<u8, GameboyError> {
		match Register::OPERANDS_8[index & 7] {
			Some(reg) => Ok(self.registers.get8(reg)),
			None => self.mmap.read(self.registers.get(Register::HL)),
		}
	}

	/// Writes the 8-bit operand selected by a 3-bit opcode field.
	pub(crate) fn write_operand(&mut self, index: usize, value: u8) -> Result<(), GameboyError> {
		match Register::OPERANDS_8[index & 7] {
			Some(reg) => {
				self.registers.set(reg, value as u16);
				Ok(())
			}
			None => {
				let address = self.registers.get(Register::HL);
				self.mmap.write(address, value)
			}
		}
	}

	/// Pushes a word to the stack, the high byte first.
	pub(crate) fn push(&mut self, value: u16) -> Result<(), GameboyError> {
		let sp = self.registers.get(Register::SP);

		self.mmap.write(sp.wrapping_sub(1), (value >> 8) as u8)?;
		self.mmap.write(sp.wrapping_sub(2), (value & 0xFF) as u8)?;
		self.registers.set(Register::SP, sp.wrapping_sub(2));

		Ok(())
	}

	/// Pops a word from the stack.
	pub(crate) fn pop(&mut self) -> Result<u16, GameboyError> {
		let sp = self.registers.get(Register::SP);

		let low = self.mmap.read(sp)? as u16;
		let high = self.mmap.read(sp.wrapping_add(1))? as u16;
		self.registers.set(Register::SP, sp.wrapping_add(2));

		Ok((high << 8) | low)
	}
}
