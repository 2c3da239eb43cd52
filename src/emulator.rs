// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The emulation library's front-end API.
//!
//! [`Emulator`] powers on a machine from a rom image, and exposes the operations
//! a debugger needs: registers and memory access, stepping, breakpoints and
//! interrupts inspection.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use log::warn;

use crate::cpu::*;
use crate::cpu::state::registers::*;
use crate::cpu::interrupts::*;
use crate::bus::*;
use crate::bus::cartridge::*;
use crate::bus::joypad::InputState;
use crate::bus::ppu::compositor::{DisplaySink, Frame};
use crate::config::Config;
use crate::GameboyError;

/// The amount of bytes in each line of a memory dump.
const DUMP_LINE: usize = 16;

/// Counters gathered since power-on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
	/// Executed instructions.
	pub instructions: u64,
	/// Bus reads, including the fetched code.
	pub reads: u64,
	/// Bus writes.
	pub writes: u64,
	/// Frames handed to the display.
	pub frames: u64,
}

/// The complete emulator's state.
pub struct Emulator {
	/// The gameboy's processor, owning the memory bus.
	cpu: Cpu,
}

impl Emulator {
	/// Power on a machine running the given rom image.
	pub fn new(config: Config, rom: Vec<u8>) -> Result<Self, GameboyError> {
		let cartridge = Cartridge::new(rom)?;

		if !cartridge.header().checksum_valid() && !config.skip_checksum_warning {
			warn!("cartridge checksum mismatch: stored {:04x}, computed {:04x}",
				cartridge.header().header_checksum,
				cartridge.header().computed_checksum);
		}

		Ok(Emulator::with_cartridge(config, cartridge))
	}

	/// Power on a machine with an already loaded cartridge.
	pub fn with_cartridge(config: Config, cartridge: Cartridge) -> Self {
		Emulator {
			cpu: Cpu::new(config, cartridge),
		}
	}

	/// The processor.
	pub fn cpu(&self) -> &Cpu {
		&self.cpu
	}

	/// The processor, mutably.
	pub fn cpu_mut(&mut self) -> &mut Cpu {
		&mut self.cpu
	}

	/// The configuration the machine was powered on with.
	pub fn config(&self) -> &Config {
		&self.cpu.config
	}

	/// The loaded cartridge.
	pub fn cartridge(&self) -> &Cartridge {
		self.cpu.mmap.cartridge()
	}

	/// Attach the sink that receives the completed frames.
	pub fn set_display(&mut self, sink: Box<dyn DisplaySink + Send>) {
		self.cpu.mmap.set_display(sink);
	}

	/// The buttons' state, clone it to press buttons from another thread.
	pub fn input(&self) -> InputState {
		self.cpu.mmap.input()
	}

	/// The frame currently being drawn.
	pub fn frame(&self) -> &Frame {
		self.cpu.mmap.ppu().frame()
	}

	/// Restores the power-on state and clears the breakpoints.
	///
	/// The cartridge, the display and the input are kept.
	pub fn reset(&mut self) {
		self.cpu.reset();
	}

	/// Runs the given amount of instructions, stopping early on a breakpoint.
	pub fn step(&mut self, count: usize) -> Result<Event, GameboyError> {
		self.cpu.run_for(count)
	}

	/// Runs until a breakpoint is reached, returning its address.
	pub fn run(&mut self) -> Result<u16, GameboyError> {
		self.cpu.run()
	}

	/// Runs until the next frame was presented or a breakpoint is reached.
	pub fn run_frame(&mut self) -> Result<Event, GameboyError> {
		let frames = self.cpu.mmap.ppu().frames();
		let mut cycles = 0;

		while self.cpu.mmap.ppu().frames() == frames {
			match self.cpu.step()? {
				Event::Executed { cycles: elapsed } => cycles += elapsed,
				breakpoint => return Ok(breakpoint),
			}
		}

		Ok(Event::Executed { cycles })
	}

	/// Reads a register.
	pub fn register(&self, reg: Register) -> u16 {
		self.cpu.registers.get(reg)
	}

	/// Writes a register, 8-bit registers keep the low byte.
	pub fn set_register(&mut self, reg: Register, value: u16) {
		self.cpu.registers.set(reg, value);
	}

	/// Reads a flag.
	pub fn flag(&self, flag: Flag) -> bool {
		self.cpu.registers.flag(flag)
	}

	/// Writes a flag.
	pub fn set_flag(&mut self, flag: Flag, value: bool) {
		self.cpu.registers.set_flag(flag, value);
	}

	/// Reads a byte through the memory bus.
	pub fn read_memory(&self, address: u16) -> Result<u8, GameboyError> {
		self.cpu.mmap.read(address)
	}

	/// Writes a byte through the memory bus, with the side effects of a cpu write.
	pub fn write_memory(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		self.cpu.mmap.write(address, value)
	}

	/// Formats the memory as lines of 16 bytes, in hex and ascii.
	pub fn dump_memory(&self, address: u16, length: usize) -> Result<Vec<String>, GameboyError> {
		let mut bytes = Vec::with_capacity(length);

		for offset in 0..length {
			bytes.push(self.read_memory(address.wrapping_add(offset as u16))?);
		}

		let lines = bytes.chunks(DUMP_LINE)
			.enumerate()
			.map(|(index, chunk)| {
				let mut line = String::new();
				let start = address.wrapping_add((index * DUMP_LINE) as u16);

				// Writing to a string never fails.
				let _ = write!(line, "{:04x}:", start);

				for byte in chunk {
					let _ = write!(line, " {:02x}", byte);
				}

				for _ in chunk.len()..DUMP_LINE {
					line.push_str("   ");
				}

				line.push_str("  ");
				line.extend(chunk.iter().map(|byte| {
					if byte.is_ascii_graphic() || *byte == b' ' { *byte as char } else { '.' }
				}));

				line
			})
			.collect();

		Ok(lines)
	}

	/// Adds or removes a breakpoint, returns true if it is now set.
	pub fn toggle_breakpoint(&mut self, address: u16) -> bool {
		self.cpu.toggle_breakpoint(address)
	}

	/// The set breakpoints, ordered by address.
	pub fn breakpoints(&self) -> Vec<u16> {
		self.cpu.breakpoints().collect()
	}

	/// The requested interrupts (IF).
	pub fn interrupt_flags(&self) -> InterruptFlags {
		self.cpu.mmap.interrupt_flag()
	}

	/// The enabled interrupts (IE).
	pub fn interrupt_enable(&self) -> InterruptFlags {
		self.cpu.mmap.interrupt_enable()
	}

	/// Raises or clears an interrupt request.
	pub fn set_interrupt_flag(&mut self, interrupt: Interrupt, value: bool) {
		self.cpu.mmap.set_interrupt_flag(interrupt, value);
	}

	/// The interrupt master enable flag.
	pub fn ime(&self) -> bool {
		self.cpu.registers.ime()
	}

	/// The mnemonic and length of the instruction at the given address.
	pub fn disassemble(&self, address: u16) -> Result<(&'static str, u8), GameboyError> {
		self.cpu.disassemble(address)
	}

	/// Counters gathered since power-on.
	pub fn statistics(&self) -> Statistics {
		Statistics {
			instructions: self.cpu.instructions(),
			reads: self.cpu.mmap.reads(),
			writes: self.cpu.mmap.writes(),
			frames: self.cpu.mmap.ppu().frames(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bus::cartridge::tests::empty_rom;

	fn emulator(program: &[u8]) -> Result<Emulator, GameboyError> {
		let mut rom = empty_rom(CartridgeType::RomOnly);
		rom[0x100..0x100 + program.len()].copy_from_slice(program);

		Emulator::new(Config::default(), rom)
	}

	#[test]
	fn test_power_on_state() -> Result<(), GameboyError> {
		let emulator = emulator(&[])?;

		assert_eq!(0x01B0, emulator.register(Register::AF));
		assert_eq!(0x0013, emulator.register(Register::BC));
		assert_eq!(0x00D8, emulator.register(Register::DE));
		assert_eq!(0x014D, emulator.register(Register::HL));
		assert_eq!(0xFFFE, emulator.register(Register::SP));
		assert_eq!(0x0100, emulator.register(Register::PC));

		assert_eq!(0xCF, emulator.read_memory(0xFF00)?);
		assert_eq!(0xF8, emulator.read_memory(0xFF07)?);
		assert_eq!(0x91, emulator.read_memory(0xFF40)?);
		assert_eq!(0xFC, emulator.read_memory(0xFF47)?);
		assert!(!emulator.ime());

		Ok(())
	}

	#[test]
	fn test_registers_and_flags() -> Result<(), GameboyError> {
		let mut emulator = emulator(&[])?;

		emulator.set_register(Register::A, 0x1234);
		assert_eq!(0x34, emulator.register(Register::A));

		emulator.set_flag(Flag::C, false);
		assert!(!emulator.flag(Flag::C));
		emulator.set_flag(Flag::C, true);
		assert!(emulator.flag(Flag::C));

		Ok(())
	}

	#[test]
	fn test_step_and_statistics() -> Result<(), GameboyError> {
		// ld A, 0x42; ld (0xC000), A; nop
		let mut emulator = emulator(&[0x3E, 0x42, 0xEA, 0x00, 0xC0, 0x00])?;

		assert_eq!(Event::Executed { cycles: 16 }, emulator.step(2)?);
		assert_eq!(0x42, emulator.read_memory(0xC000)?);
		assert_eq!(0x0105, emulator.register(Register::PC));

		let stats = emulator.statistics();
		assert_eq!(2, stats.instructions);
		assert_eq!(1, stats.writes);
		assert_eq!(0, stats.frames);

		Ok(())
	}

	#[test]
	fn test_disassemble() -> Result<(), GameboyError> {
		let emulator = emulator(&[0x3E, 0x42, 0xCB, 0x7C])?;

		assert_eq!(("LD A,d8", 2), emulator.disassemble(0x0100)?);
		assert_eq!(("BIT 7,H", 2), emulator.disassemble(0x0102)?);

		Ok(())
	}

	#[test]
	fn test_dump_memory() -> Result<(), GameboyError> {
		let mut emulator = emulator(&[])?;

		for (offset, byte) in b"Hello, world!\n".iter().enumerate() {
			emulator.write_memory(0xC000 + offset as u16, *byte)?;
		}

		let lines = emulator.dump_memory(0xC000, 20)?;
		assert_eq!(2, lines.len());
		assert_eq!("c000: 48 65 6c 6c 6f 2c 20 77 6f 72 6c 64 21 0a 00 00  Hello, world!...", lines[0]);
		assert!(lines[1].starts_with("c010: 00 00 00 00   "));

		Ok(())
	}

	#[test]
	fn test_interrupt_inspection() -> Result<(), GameboyError> {
		let mut emulator = emulator(&[])?;

		emulator.set_interrupt_flag(Interrupt::Serial, true);
		assert_eq!(InterruptFlags::SERIAL, emulator.interrupt_flags());

		emulator.set_interrupt_flag(Interrupt::Serial, false);
		assert!(emulator.interrupt_flags().is_empty());

		Ok(())
	}

	#[test]
	fn test_reset() -> Result<(), GameboyError> {
		let mut emulator = emulator(&[0x00, 0x00])?;

		emulator.toggle_breakpoint(0x0101);
		assert_eq!(0x0101, emulator.run()?);

		emulator.write_memory(0xC000, 0xAA)?;
		emulator.reset();

		assert_eq!(0x0100, emulator.register(Register::PC));
		assert_eq!(0x00, emulator.read_memory(0xC000)?);
		assert!(emulator.breakpoints().is_empty());
		assert_eq!(0, emulator.statistics().instructions);

		Ok(())
	}

	#[test]
	fn test_run_frame() -> Result<(), GameboyError> {
		// jr -2
		let mut emulator = emulator(&[0x18, 0xFE])?;

		emulator.run_frame()?;
		assert_eq!(1, emulator.statistics().frames);
		assert_eq!(144, emulator.read_memory(0xFF44)?);

		Ok(())
	}
}
