// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulate the gameboy's memory mapping and bus access.

#[macro_use]
pub mod memory_range;
pub mod cartridge;
pub mod rtc;
pub mod ram;
pub mod io;
pub mod timer;
pub mod joypad;
pub mod ppu;

use alloc::boxed::Box;
use core::cell::Cell;

use io::*;
use ram::*;
use timer::*;
use joypad::*;
use cartridge::*;
use memory_range::*;
use ppu::*;
use ppu::compositor::DisplaySink;
use ppu::consts::MMAP_IO_DISPLAY;
use joypad::consts::IO_P1;
use timer::consts::MMAP_IO_TIMER;

use crate::config::Config;
use crate::cpu::interrupts::*;
use crate::GameboyError;

/// Bus locations-related constants.
#[allow(missing_docs)]
pub mod consts {
	use super::*;

	pub const MMAP_ROM_BANK0: MemoryRange = make_range!(0x0000, 0x3FFF);
	/// Switchable ROM bank.
	pub const MMAP_ROM_BANK_SW: MemoryRange = make_range!(0x4000, 0x7FFF);
	pub const MMAP_VIDEO_RAM: MemoryRange = make_range!(0x8000, 0x9FFF);
	/// Switchable RAM bank.
	pub const MMAP_RAM_BANK_SW: MemoryRange = make_range!(0xA000, 0xBFFF);
	pub const MMAP_RAM_INTERNAL: MemoryRange = make_range!(0xC000, 0xDFFF);
	/// Maps to the same physical memory as the internal ram (depends on the echo policy).
	pub const MMAP_RAM_ECHO: MemoryRange = make_range!(0xE000, 0xFDFF);
	/// Sprite/Object attribute memory.
	pub const MMAP_SPRITE_OAM: MemoryRange = make_range!(0xFE00, 0xFE9F);
	/// Reads as 0xFF, writes are dropped.
	pub const MMAP_UNUSABLE: MemoryRange = make_range!(0xFEA0, 0xFEFF);
	pub const MMAP_IO_PORTS: MemoryRange = make_range!(0xFF00, 0xFF7F);
	/// High RAM.
	pub const MMAP_RAM_HIGH: MemoryRange = make_range!(0xFF80, 0xFFFE);

	/// Interrupt request register.
	pub const IO_IF: u16 = 0xFF0F;
	/// OAM DMA trigger.
	pub const IO_DMA: u16 = 0xFF46;
	/// Interrupt enable register.
	pub const IO_IE: u16 = 0xFFFF;

	/// The amount of bytes copied by a DMA transfer.
	pub const DMA_LENGTH: u16 = 0xA0;
}

use consts::*;

/// A peripheral that can be written and read by the cpu.
pub trait Memory {
	/// Write a 8-bit value to the peripheral.
	///
	/// * `address` - The absolute memory address to write into.
	/// * `value` - The value to write.
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError>;

	/// Read a 8-bit value from this peripheral.
	///
	/// * `address` - The absolute memory address to read from.
	fn read(&self, address: u16) -> Result<u8, GameboyError>;
}

/// A virtual representation of Gameboy memory bus.
///
/// This implementation provides memory/peripheral abstraction, and owns
/// every peripheral so the complete machine can be moved between threads.
pub struct SystemBus {
	pub(crate) cartridge: Cartridge,
	pub(crate) ram: InternalRam,
	pub(crate) io: IoPorts,
	pub(crate) timer: Timer,
	pub(crate) joypad: Joypad,
	pub(crate) ppu: Ppu,

	interrupt_flag: InterruptFlags,
	/// IE keeps all 8 bits, the upper ones are unused.
	interrupt_enable: u8,

	reads: Cell<u64>,
	writes: u64,
}

/// An abstraction for fetching mutable and immutable regions.
macro_rules! get_region {
	($name:tt $(,$mut_:tt)*) => {
		/// Returns the region that contains the given address.
		fn $name(&$($mut_)* self, address: u16) -> Result<&$($mut_)* dyn Memory, GameboyError> {
			match address {
				// Cartridge-mapped offsets
				memory_range!(MMAP_ROM_BANK0) |
				memory_range!(MMAP_ROM_BANK_SW) |
				memory_range!(MMAP_RAM_BANK_SW) => {
					Ok(&$($mut_)* self.cartridge)
				}
				// Video memory and sprite attributes
				memory_range!(MMAP_VIDEO_RAM) |
				memory_range!(MMAP_SPRITE_OAM) |
				memory_range!(MMAP_IO_DISPLAY) => {
					Ok(&$($mut_)* self.ppu)
				}
				// Internal RAM
				memory_range!(MMAP_RAM_INTERNAL) |
				memory_range!(MMAP_RAM_ECHO) |
				memory_range!(MMAP_RAM_HIGH) => {
					Ok(&$($mut_)* self.ram)
				}
				IO_P1 => {
					Ok(&$($mut_)* self.joypad)
				}
				memory_range!(MMAP_IO_TIMER) => {
					Ok(&$($mut_)* self.timer)
				}
				// Any other I/O register
				memory_range!(MMAP_IO_PORTS) => {
					Ok(&$($mut_)* self.io)
				}
				_ => {
					Err(GameboyError::MemoryFault { address })
				}
			}
		}
	}
}

impl SystemBus {
	/// Initialize a new address space.
	pub fn new(config: &Config, cartridge: Cartridge) -> Self {
		SystemBus {
			cartridge,
			ram: InternalRam::new(config.echo_ram),
			io: IoPorts::new(config),
			timer: Timer::new(config),
			joypad: Joypad::new(InputState::new()),
			ppu: Ppu::new(),
			interrupt_flag: InterruptFlags::empty(),
			interrupt_enable: 0,
			reads: Cell::new(0),
			writes: 0,
		}
	}

	/// Restores the power-on state of every peripheral.
	///
	/// The cartridge's content and the attached display and input are kept.
	pub fn reset(&mut self, config: &Config) {
		self.cartridge.reset();
		self.ram = InternalRam::new(config.echo_ram);
		self.io.reset(config);
		self.timer.reset(config);
		self.joypad.reset();
		self.ppu.reset();
		self.interrupt_flag = InterruptFlags::empty();
		self.interrupt_enable = 0;
		self.reads.set(0);
		self.writes = 0;
	}

	// Get an immutable region
	get_region!(region);

	// Get a mutable region
	get_region!(region_mut, mut);

	/// Advance every clocked peripheral and latch their interrupt requests.
	pub fn process(&mut self, cycles: usize) {
		self.timer.process(cycles);
		self.ppu.process(cycles);
		self.joypad.process(cycles);
		self.cartridge.process(cycles);

		let sources: [&mut dyn InterruptSource; 3] = [
			&mut self.timer,
			&mut self.ppu,
			&mut self.joypad,
		];

		for source in sources {
			self.interrupt_flag |= InterruptFlags::from_bits_truncate(source.interrupts());
			source.clear();
		}
	}

	/// Copies the sprite attributes from `page << 8` into the OAM.
	fn dma_transfer(&mut self, page: u8) -> Result<(), GameboyError> {
		let source = (page as u16) << 8;

		for offset in 0..DMA_LENGTH {
			let value = self.read(source.wrapping_add(offset))?;
			self.ppu.write(range_start!(MMAP_SPRITE_OAM) as u16 + offset, value)?;
		}

		Ok(())
	}

	/// The requested interrupts (IF).
	pub fn interrupt_flag(&self) -> InterruptFlags {
		self.interrupt_flag
	}

	/// The enabled interrupts (IE).
	pub fn interrupt_enable(&self) -> InterruptFlags {
		InterruptFlags::from_bits_truncate(self.interrupt_enable)
	}

	/// Clears the request bit of a serviced interrupt.
	pub fn acknowledge(&mut self, interrupt: Interrupt) {
		self.interrupt_flag.remove(InterruptFlags::from_bits_truncate(interrupt.value()));
	}

	/// Raises or clears an interrupt request.
	pub fn set_interrupt_flag(&mut self, interrupt: Interrupt, value: bool) {
		self.interrupt_flag.set(InterruptFlags::from_bits_truncate(interrupt.value()), value);
	}

	/// Attach the sink that receives the completed frames.
	pub fn set_display(&mut self, sink: Box<dyn DisplaySink + Send>) {
		self.ppu.set_display(sink);
	}

	/// The buttons' state sampled by the joypad.
	pub fn input(&self) -> InputState {
		self.joypad.input()
	}

	/// Replace the buttons' state sampled by the joypad.
	pub fn set_input(&mut self, input: InputState) {
		self.joypad.set_input(input);
	}

	/// The loaded cartridge.
	pub fn cartridge(&self) -> &Cartridge {
		&self.cartridge
	}

	/// The lcd controller.
	pub fn ppu(&self) -> &Ppu {
		&self.ppu
	}

	/// The amount of bus reads since power-on.
	pub fn reads(&self) -> u64 {
		self.reads.get()
	}

	/// The amount of bus writes since power-on.
	pub fn writes(&self) -> u64 {
		self.writes
	}

	/// Writes the complete array's bytes to the relevant memory region.
	pub fn write_all(&mut self, address: u16, array: &[u8]) -> Result<(), GameboyError> {
		for (index, value) in array.iter().enumerate() {
			self.write(address.wrapping_add(index as u16), *value)?;
		}

		Ok(())
	}
}

impl Memory for SystemBus {
	/// Handle writing to a memory region.
	/// The function calls the relevent peripheral's implementation.
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		self.writes += 1;

		match address {
			IO_IF => {
				self.interrupt_flag = InterruptFlags::from_bits_truncate(value);
				Ok(())
			}
			IO_IE => {
				self.interrupt_enable = value;
				Ok(())
			}
			IO_DMA => {
				self.io.write(address, value)?;
				self.dma_transfer(value)
			}
			memory_range!(MMAP_UNUSABLE) => Ok(()),
			_ => {
				let peripheral = self.region_mut(address)?;

				peripheral.write(address, value)
			}
		}
	}

	/// Handle reading from a memory region.
	/// The function calls the relevent peripheral's implementation.
	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		self.reads.set(self.reads.get() + 1);

		match address {
			// The upper 3 bits are unused and read as set.
			IO_IF => Ok(0xE0 | self.interrupt_flag.bits()),
			IO_IE => Ok(self.interrupt_enable),
			IO_DMA => self.io.read(address),
			memory_range!(MMAP_UNUSABLE) => Ok(0xFF),
			_ => {
				let peripheral = self.region(address)?;

				peripheral.read(address)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bus::cartridge::tests::empty_rom;

	fn bus() -> Result<SystemBus, GameboyError> {
		let cartridge = Cartridge::new(empty_rom(CartridgeType::RomOnly))?;

		Ok(SystemBus::new(&Config::default(), cartridge))
	}

	#[test]
	fn test_memory_range() {
		let int_enable_ptr: u16 = 0xFFFF;
		let ram_ptr: u16 = 0xA100;

		match int_enable_ptr {
			memory_range!(MMAP_RAM_HIGH) => { assert!(false); }
			IO_IE => { }
			_ => { assert!(false); }
		}

		match ram_ptr {
			memory_range!(MMAP_RAM_BANK_SW) => { }
			_ => { assert!(false); }
		}
	}

	#[test]
	fn test_dma_transfer() -> Result<(), GameboyError> {
		let mut bus = bus()?;

		for offset in 0..DMA_LENGTH {
			bus.write(0xC100 + offset, offset as u8 ^ 0x5A)?;
		}

		bus.write(IO_DMA, 0xC1)?;

		for offset in 0..DMA_LENGTH {
			assert_eq!(offset as u8 ^ 0x5A, bus.read(0xFE00 + offset)?);
		}

		Ok(())
	}

	#[test]
	fn test_interrupt_registers() -> Result<(), GameboyError> {
		let mut bus = bus()?;

		bus.write(IO_IF, 0xFF)?;
		assert_eq!(0xFF, bus.read(IO_IF)?);
		assert_eq!(InterruptFlags::all(), bus.interrupt_flag());

		bus.acknowledge(Interrupt::Timer);
		assert_eq!(0xFB, bus.read(IO_IF)?);

		bus.write(IO_IE, 0x15)?;
		assert_eq!(0x15, bus.read(IO_IE)?);

		Ok(())
	}

	#[test]
	fn test_unusable_region() -> Result<(), GameboyError> {
		let mut bus = bus()?;

		bus.write(0xFEA0, 0x12)?;
		assert_eq!(0xFF, bus.read(0xFEA0)?);
		assert_eq!(0xFF, bus.read(0xFEFF)?);

		Ok(())
	}

	#[test]
	fn test_access_counters() -> Result<(), GameboyError> {
		let mut bus = bus()?;

		bus.write(0xC000, 1)?;
		bus.write(0xC001, 2)?;
		bus.read(0xC000)?;

		assert_eq!(2, bus.writes());
		assert_eq!(1, bus.reads());

		Ok(())
	}
}
