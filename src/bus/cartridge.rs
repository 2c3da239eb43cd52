// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The cartridge controller - loading the game's image and handling IO
//! from/to its memory bank controller.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use log::{info, warn};

use crate::GameboyError;
use super::Memory;
use super::consts::*;
use super::memory_range::*;
use super::rtc::*;

/// cartridge addresses-related constants.
#[allow(missing_docs)]
pub mod consts {
	use super::*;

	/// Game title.
	pub const ROM_GAME_TITLE: MemoryRange = make_range!(0x0134, 0x0142);

	/// Gameboy color indicator.
	/// Bit 7 is set for games that use the GBC features.
	pub const ROM_GAMEBOY_COLOR: usize = 0x0143;
	/// Cartridge type.
	///
	/// 0 - ROM Only, 1 - ROM+MBC1, 2 - ROM+MBC1+RAM, 3 - ROM+MBC1+RAM+Battery,
	/// 5 - ROM+MBC2, 6 - ROM+MBC2+Battery, 8 - ROM+RAM, 9 - ROM+RAM+Battery,
	/// F - ROM+MBC3+Timer+Battery, 10 - ROM+MBC3+Timer+RAM+Battery,
	/// 11 - ROM+MBC3, 12 - ROM+MBC3+RAM, 13 - ROM+MBC3+RAM+Battery, 19 - ROM+MBC5,
	/// 1A - ROM+MBC5+RAM, 1B - ROM+MBC5+RAM+Battery, 1C - ROM+MBC5+Rumble,
	/// 1D - ROM+MBC5+Rumble+SRAM, 1E - ROM+MBC5+Rumble+SRAM+Battery
	pub const ROM_CARTRIDGE_TYPE: usize = 0x0147;
	pub const ROM_SIZE: usize = 0x0148;
	pub const RAM_SIZE: usize = 0x0149;
	/// Big-endian sum of all the bytes but itself.
	pub const ROM_GLOBAL_CHECKSUM: usize = 0x014E;
	/// The image must cover the whole header.
	pub const ROM_HEADER_END: usize = 0x0150;

	pub const ROM_BANK_SIZE: usize = 0x4000;
	pub const RAM_BANK_SIZE: usize = 0x2000;
	/// MBC2 has 512 half-bytes of internal ram.
	pub const MBC2_RAM_SIZE: usize = 0x200;

	/// Writing this to the low nibble of the enable register turns the ram on.
	pub const RAM_ENABLE_VALUE: u8 = 0x0A;
}

use consts::*;

/// The bank controller declared by the cartridge's header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartridgeType {
	/// A 32KB ROM, occupies 0000-7FFF. May carry an unbanked 8KB RAM.
	RomOnly,
	/// Memory bank controller 1.
	MBC1,
	/// Memory bank controller 2, with internal 4-bit RAM.
	MBC2,
	/// Memory bank controller 3.
	///
	/// This controlller also contains an RTC (real-time clock).
	MBC3,
	/// Memory bank controller 5.
	MBC5,
}

impl CartridgeType {
	/// Resolve the controller from the header's type byte.
	pub fn from_code(code: u8) -> Result<Self, GameboyError> {
		match code {
			0x00 | 0x08 | 0x09 => Ok(CartridgeType::RomOnly),
			0x01 | 0x02 | 0x03 => Ok(CartridgeType::MBC1),
			0x05 | 0x06 => Ok(CartridgeType::MBC2),
			0x0F..=0x13 => Ok(CartridgeType::MBC3),
			0x19..=0x1E => Ok(CartridgeType::MBC5),
			_ => Err(GameboyError::CartridgeFormat(code)),
		}
	}
}

/// Identity of the loaded game, resolved once from the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartridgeHeader {
	/// The internal title (0x134-0x142), without padding.
	pub title: String,
	/// The bank controller.
	pub kind: CartridgeType,
	/// The raw cartridge type byte.
	pub code: u8,
	/// Amount of 16KB ROM banks.
	pub rom_banks: usize,
	/// Amount of 8KB RAM banks.
	pub ram_banks: usize,
	/// The checksum stored in the header.
	pub header_checksum: u16,
	/// The checksum computed over the image.
	pub computed_checksum: u16,
}

impl CartridgeHeader {
	/// Parse the header of a raw ROM image.
	pub fn parse(data: &[u8]) -> Result<Self, GameboyError> {
		if data.len() < ROM_HEADER_END {
			return Err(GameboyError::RomTooSmall(data.len()));
		}

		if data[ROM_GAMEBOY_COLOR] & 0x80 != 0 {
			return Err(GameboyError::UnsupportedPlatform(data[ROM_GAMEBOY_COLOR]));
		}

		let code = data[ROM_CARTRIDGE_TYPE];
		let kind = CartridgeType::from_code(code)?;

		let rom_banks = match data[ROM_SIZE] {
			size @ 0..=8 => 2 << size,
			0x52 => 72,
			0x53 => 80,
			0x54 => 96,
			size => {
				let banks = core::cmp::max(2, (data.len() + ROM_BANK_SIZE - 1) / ROM_BANK_SIZE);
				warn!("unknown rom size code {:02x}, assuming {} banks", size, banks);
				banks
			}
		};

		let ram_banks = match data[RAM_SIZE] {
			0 => 0,
			1 | 2 => 1,
			3 => 4,
			4 => 16,
			5 => 32,
			size => {
				warn!("unknown ram size code {:02x}", size);
				0
			}
		};

		let title_bytes = &data[memory_offset_range!(ROM_GAME_TITLE)];
		let title_len = title_bytes.iter().position(|byte| *byte == 0).unwrap_or(title_bytes.len());
		let title = String::from_utf8_lossy(&title_bytes[..title_len]).into_owned();

		let header_checksum = u16::from_be_bytes([
			data[ROM_GLOBAL_CHECKSUM],
			data[ROM_GLOBAL_CHECKSUM + 1],
		]);

		Ok(CartridgeHeader {
			title,
			kind,
			code,
			rom_banks,
			ram_banks,
			header_checksum,
			computed_checksum: checksum(data),
		})
	}

	/// Whether the stored checksum matches the image.
	pub fn checksum_valid(&self) -> bool {
		self.header_checksum == self.computed_checksum
	}
}

impl fmt::Display for CartridgeHeader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "\"{}\" {:?} ({:02x}), rom: {} ({} KB), ram: {} ({} KB), checksum: {}",
			self.title,
			self.kind,
			self.code,
			self.rom_banks,
			self.rom_banks * 16,
			self.ram_banks,
			self.ram_banks * 8,
			if self.checksum_valid() { "ok" } else { "mismatch" })
	}
}

/// Sum of all the image's bytes, except for the checksum itself.
pub fn checksum(data: &[u8]) -> u16 {
	data.iter()
		.enumerate()
		.filter(|(index, _)| *index != ROM_GLOBAL_CHECKSUM && *index != ROM_GLOBAL_CHECKSUM + 1)
		.fold(0_u16, |sum, (_, byte)| sum.wrapping_add(*byte as u16))
}

/// The bank controller's registers.
#[derive(Clone, Debug)]
pub enum Mbc {
	/// No banking.
	RomOnly,
	/// Up to 2MB of ROM and 32KB of RAM.
	MBC1 {
		/// Lower 5 bits of the ROM bank.
		rom_bank: u8,
		/// 2 bits, either the upper ROM bank bits or the RAM bank.
		upper: u8,
		/// Banking mode select.
		advanced: bool,
	},
	/// Up to 256KB of ROM, with internal half-byte RAM.
	MBC2 {
		/// Bank number (1 - 15).
		rom_bank: u8,
	},
	/// Up to 2MB of ROM, 32KB of RAM and a real time clock.
	MBC3 {
		/// Bank number (1 - 127).
		rom_bank: u8,
		/// RAM bank (0 - 3) or RTC register (8 - C).
		ram_select: u8,
		/// The clock's registers.
		rtc: Rtc,
	},
	/// Up to 8MB of ROM and 128KB of RAM.
	MBC5 {
		/// Bank number (0 - 511).
		rom_bank: u16,
		/// Bank number (0 - 15).
		ram_bank: u8,
	},
}

impl Mbc {
	fn new(kind: CartridgeType) -> Self {
		match kind {
			CartridgeType::RomOnly => Mbc::RomOnly,
			CartridgeType::MBC1 => Mbc::MBC1 { rom_bank: 1, upper: 0, advanced: false },
			CartridgeType::MBC2 => Mbc::MBC2 { rom_bank: 1 },
			CartridgeType::MBC3 => Mbc::MBC3 { rom_bank: 1, ram_select: 0, rtc: Rtc::new() },
			CartridgeType::MBC5 => Mbc::MBC5 { rom_bank: 1, ram_bank: 0 },
		}
	}

	/// The bank mapped to 0x0000-0x3FFF.
	fn low_rom_bank(&self) -> usize {
		match self {
			Mbc::MBC1 { upper, advanced: true, .. } => (*upper as usize) << 5,
			_ => 0,
		}
	}

	/// The bank mapped to 0x4000-0x7FFF.
	fn high_rom_bank(&self) -> usize {
		match self {
			Mbc::RomOnly => 1,
			Mbc::MBC1 { rom_bank, upper, .. } => ((*upper as usize) << 5) | *rom_bank as usize,
			Mbc::MBC2 { rom_bank } => *rom_bank as usize,
			Mbc::MBC3 { rom_bank, .. } => *rom_bank as usize,
			Mbc::MBC5 { rom_bank, .. } => *rom_bank as usize,
		}
	}

	/// The RAM bank mapped to 0xA000-0xBFFF.
	fn ram_bank(&self) -> usize {
		match self {
			Mbc::MBC1 { upper, advanced: true, .. } => *upper as usize,
			Mbc::MBC3 { ram_select, .. } => *ram_select as usize & 3,
			Mbc::MBC5 { ram_bank, .. } => *ram_bank as usize,
			_ => 0,
		}
	}
}

/// The game's cartridge
pub struct Cartridge {
	data: Vec<u8>,
	ram: Vec<u8>,
	header: CartridgeHeader,
	mbc: Mbc,
	ram_enabled: bool,
}

impl Cartridge {
	/// Initialize a new cartridge given its raw data.
	///
	/// Images shorter than the size declared in the header are padded with zeros.
	pub fn new(mut data: Vec<u8>) -> Result<Self, GameboyError> {
		let header = CartridgeHeader::parse(&data)?;

		let rom_size = header.rom_banks * ROM_BANK_SIZE;
		if data.len() < rom_size {
			data.resize(rom_size, 0);
		}

		let ram = Self::make_ram(&header);

		info!("loaded cartridge {}", header);

		Ok(Cartridge {
			data,
			ram,
			mbc: Mbc::new(header.kind),
			// Unbanked cartridges have no enable gate.
			ram_enabled: header.kind == CartridgeType::RomOnly,
			header,
		})
	}

	/// Allocate the cartridge's external ram.
	pub fn make_ram(header: &CartridgeHeader) -> Vec<u8> {
		match header.kind {
			CartridgeType::MBC2 => vec![0_u8; MBC2_RAM_SIZE],
			_ => vec![0_u8; header.ram_banks * RAM_BANK_SIZE],
		}
	}

	/// Restore the controller's power-on state. RAM contents are kept.
	pub fn reset(&mut self) {
		self.mbc = Mbc::new(self.header.kind);
		self.ram_enabled = self.header.kind == CartridgeType::RomOnly;
	}

	/// Advance the cartridge's clock, if it has one.
	pub fn process(&mut self, cycles: usize) {
		if let Mbc::MBC3 { rtc, .. } = &mut self.mbc {
			rtc.tick(cycles);
		}
	}

	/// The parsed header.
	pub fn header(&self) -> &CartridgeHeader {
		&self.header
	}

	/// The bank controller's registers.
	pub fn mbc(&self) -> &Mbc {
		&self.mbc
	}

	/// Get the title of the game.
	pub fn title(&self) -> &str {
		&self.header.title
	}

	/// A human readable summary of the cartridge.
	pub fn info(&self) -> String {
		format!("{}", self.header)
	}

	/// Whether the external ram is currently accessible.
	pub fn ram_enabled(&self) -> bool {
		self.ram_enabled
	}

	/// Enable or disable the access to the cartridge's ram.
	pub fn set_ram_enabled(&mut self, value: bool) {
		self.ram_enabled = value;
	}

	fn rom_byte(&self, bank: usize, offset: usize) -> u8 {
		let bank = bank % self.header.rom_banks;

		self.data.get(bank * ROM_BANK_SIZE + offset).copied().unwrap_or(0xFF)
	}

	/// The offset in the external ram for the given address, if any.
	fn ram_offset(&self, address: u16) -> Option<usize> {
		if !self.ram_enabled || self.ram.is_empty() {
			return None;
		}

		let offset = range_offset!(MMAP_RAM_BANK_SW, address);

		let offset = match self.mbc {
			Mbc::MBC2 { .. } => offset % MBC2_RAM_SIZE,
			_ => (self.mbc.ram_bank() * RAM_BANK_SIZE + offset) % self.ram.len(),
		};

		Some(offset)
	}

	fn rtc_selected(&self) -> bool {
		matches!(self.mbc, Mbc::MBC3 { ram_select, .. } if RTC_CONTROL_RANGE.contains(&ram_select))
	}

	fn read_ram(&self, address: u16) -> Result<u8, GameboyError> {
		if let Mbc::MBC3 { rtc, .. } = &self.mbc {
			if self.ram_enabled && self.rtc_selected() {
				return rtc.read(address);
			}
		}

		match self.ram_offset(address) {
			// Only the lower nibble exists.
			Some(offset) if matches!(self.mbc, Mbc::MBC2 { .. }) => Ok(0xF0 | self.ram[offset]),
			Some(offset) => Ok(self.ram[offset]),
			None => Ok(0xFF),
		}
	}

	fn write_ram(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		if self.ram_enabled && self.rtc_selected() {
			if let Mbc::MBC3 { rtc, .. } = &mut self.mbc {
				return rtc.write(address, value);
			}
		}

		if let Some(offset) = self.ram_offset(address) {
			self.ram[offset] = match self.mbc {
				Mbc::MBC2 { .. } => value & 0x0F,
				_ => value,
			};
		}

		Ok(())
	}

	/// Handle a write to the controller's registers (0x0000-0x7FFF).
	fn write_control(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		let enable = (value & 0x0F) == RAM_ENABLE_VALUE;

		match &mut self.mbc {
			// Writes to ROM are ignored.
			Mbc::RomOnly => {}

			Mbc::MBC1 { rom_bank, upper, advanced } => match address {
				0x0000..=0x1FFF => self.ram_enabled = enable,
				0x2000..=0x3FFF => *rom_bank = core::cmp::max(1, value & 0x1F),
				0x4000..=0x5FFF => *upper = value & 0x03,
				_ => *advanced = (value & 1) != 0,
			},

			Mbc::MBC2 { rom_bank } => match address {
				// Bit 8 of the address selects between the two registers.
				0x0000..=0x3FFF if address & 0x0100 == 0 => self.ram_enabled = enable,
				0x0000..=0x3FFF => *rom_bank = core::cmp::max(1, value & 0x0F),
				_ => {}
			},

			Mbc::MBC3 { rom_bank, ram_select, rtc } => match address {
				0x0000..=0x1FFF => self.ram_enabled = enable,
				0x2000..=0x3FFF => *rom_bank = core::cmp::max(1, value & 0x7F),
				0x4000..=0x5FFF => {
					if RTC_CONTROL_RANGE.contains(&value) {
						rtc.set_active_register(value)?;
					}
					*ram_select = value;
				}
				_ => rtc.latch(value),
			},

			Mbc::MBC5 { rom_bank, ram_bank } => match address {
				0x0000..=0x1FFF => self.ram_enabled = enable,
				0x2000..=0x2FFF => *rom_bank = (*rom_bank & 0x100) | value as u16,
				0x3000..=0x3FFF => *rom_bank = (*rom_bank & 0xFF) | (((value & 1) as u16) << 8),
				0x4000..=0x5FFF => *ram_bank = value & 0x0F,
				_ => {}
			},
		}

		Ok(())
	}
}

impl Memory for Cartridge {
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		match address {
			memory_range!(MMAP_ROM_BANK0) |
			memory_range!(MMAP_ROM_BANK_SW) => {
				self.write_control(address, value)
			}
			memory_range!(MMAP_RAM_BANK_SW) => {
				self.write_ram(address, value)
			}
			_ => {
				Err(GameboyError::MemoryFault { address })
			}
		}
	}

	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		match address {
			memory_range!(MMAP_ROM_BANK0) => {
				let offset = range_offset!(MMAP_ROM_BANK0, address);
				Ok(self.rom_byte(self.mbc.low_rom_bank(), offset))
			}
			memory_range!(MMAP_ROM_BANK_SW) => {
				let offset = range_offset!(MMAP_ROM_BANK_SW, address);
				Ok(self.rom_byte(self.mbc.high_rom_bank(), offset))
			}
			memory_range!(MMAP_RAM_BANK_SW) => {
				self.read_ram(address)
			}
			_ => {
				Err(GameboyError::MemoryFault { address })
			}
		}
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	const TEST_GAME_TITLE: &[u8] = b"TEST TITLE\0\0\0\0\0";

	/// Creates an empty rom with a valid header for testing.
	pub fn empty_rom(kind: CartridgeType) -> Vec<u8> {
		let (code, rom_size, ram_size) = match kind {
			CartridgeType::RomOnly => (0x00, 0x00, 0x00),
			CartridgeType::MBC1 => (0x03, 0x02, 0x03),
			CartridgeType::MBC2 => (0x06, 0x02, 0x00),
			CartridgeType::MBC3 => (0x10, 0x02, 0x03),
			CartridgeType::MBC5 => (0x1B, 0x02, 0x03),
		};

		let mut rom = vec![0_u8; ROM_BANK_SIZE << (rom_size + 1)];
		rom[ROM_CARTRIDGE_TYPE] = code;
		rom[ROM_SIZE] = rom_size;
		rom[RAM_SIZE] = ram_size;

		// Write the game's title
		rom[memory_offset_range!(ROM_GAME_TITLE)].clone_from_slice(TEST_GAME_TITLE);

		// Tag every bank with its number.
		for (bank, chunk) in rom.chunks_mut(ROM_BANK_SIZE).enumerate().skip(1) {
			chunk[0] = bank as u8;
		}

		let sum = checksum(&rom).to_be_bytes();
		rom[ROM_GLOBAL_CHECKSUM] = sum[0];
		rom[ROM_GLOBAL_CHECKSUM + 1] = sum[1];

		rom
	}

	#[test]
	fn test_cartridge_loading() -> Result<(), GameboyError> {
		let cart = Cartridge::new(empty_rom(CartridgeType::MBC1))?;

		assert_eq!(CartridgeType::MBC1, cart.header().kind);
		assert_eq!("TEST TITLE", cart.title());
		assert_eq!(8, cart.header().rom_banks);
		assert_eq!(4, cart.header().ram_banks);
		assert!(cart.header().checksum_valid());

		Ok(())
	}

	#[test]
	fn test_header_errors() {
		let mut rom = empty_rom(CartridgeType::RomOnly);
		rom[ROM_CARTRIDGE_TYPE] = 0x20;
		assert_eq!(Some(GameboyError::CartridgeFormat(0x20)), Cartridge::new(rom).err());

		let mut rom = empty_rom(CartridgeType::RomOnly);
		rom[ROM_GAMEBOY_COLOR] = 0x80;
		assert_eq!(Some(GameboyError::UnsupportedPlatform(0x80)), Cartridge::new(rom).err());

		assert_eq!(Some(GameboyError::RomTooSmall(0x100)), Cartridge::new(vec![0; 0x100]).err());
	}

	#[test]
	fn test_checksum_mismatch() -> Result<(), GameboyError> {
		let mut rom = empty_rom(CartridgeType::RomOnly);
		rom[0x7000] ^= 0xFF;

		let cart = Cartridge::new(rom)?;
		assert!(!cart.header().checksum_valid());

		Ok(())
	}

	#[test]
	fn test_irregular_rom_sizes() -> Result<(), GameboyError> {
		let mut rom = empty_rom(CartridgeType::MBC1);
		rom[ROM_SIZE] = 0x52;

		let cart = Cartridge::new(rom)?;
		assert_eq!(72, cart.header().rom_banks);
		assert_eq!(0, cart.read(0x4000 + 0x10)?);

		Ok(())
	}

	#[test]
	fn test_rom_only() -> Result<(), GameboyError> {
		let mut rom = empty_rom(CartridgeType::RomOnly);
		rom[0x4010] = 0x42;

		let mut cart = Cartridge::new(rom)?;
		cart.write(0x4010, 0x99)?;
		cart.write(0x2000, 0x05)?;

		assert_eq!(0x42, cart.read(0x4010)?);
		assert_eq!(0xFF, cart.read(0xA000)?);

		Ok(())
	}

	#[test]
	fn test_mbc1_banking() -> Result<(), GameboyError> {
		let mut rom = empty_rom(CartridgeType::MBC1);
		rom[5 * ROM_BANK_SIZE + 0x123] = 0xA5;
		let mut cart = Cartridge::new(rom)?;

		cart.write(0x2000, 5)?;
		assert_eq!(5, cart.read(0x4000)?);
		assert_eq!(0xA5, cart.read(0x4123)?);

		// Bank 0 is remapped to 1.
		cart.write(0x2000, 0)?;
		assert_eq!(1, cart.read(0x4000)?);

		Ok(())
	}

	#[test]
	fn test_ram_enable_gate() -> Result<(), GameboyError> {
		let mut cart = Cartridge::new(empty_rom(CartridgeType::MBC1))?;

		cart.write(0xA000, 0x12)?;
		assert_eq!(0xFF, cart.read(0xA000)?);

		cart.write(0x0000, 0x0A)?;
		cart.write(0xA000, 0x12)?;
		assert_eq!(0x12, cart.read(0xA000)?);

		// Switch to ram bank 1 in advanced mode.
		cart.write(0x6000, 1)?;
		cart.write(0x4000, 1)?;
		assert_eq!(0x00, cart.read(0xA000)?);

		cart.write(0x0000, 0x00)?;
		assert_eq!(0xFF, cart.read(0xA000)?);

		Ok(())
	}

	#[test]
	fn test_mbc2_ram() -> Result<(), GameboyError> {
		let mut cart = Cartridge::new(empty_rom(CartridgeType::MBC2))?;

		cart.write(0x0000, 0x0A)?;
		cart.write(0xA001, 0xAB)?;
		assert_eq!(0xFB, cart.read(0xA001)?);
		// The 512 half-bytes are echoed across the window.
		assert_eq!(0xFB, cart.read(0xA201)?);

		cart.write(0x0100, 3)?;
		assert_eq!(3, cart.read(0x4000)?);

		Ok(())
	}

	#[test]
	fn test_mbc3_rtc() -> Result<(), GameboyError> {
		let mut cart = Cartridge::new(empty_rom(CartridgeType::MBC3))?;

		cart.write(0x0000, 0x0A)?;
		cart.process(CYCLES_PER_SECOND * 3);

		cart.write(0x6000, 0)?;
		cart.write(0x6001, 1)?;
		cart.write(0x4000, 0x08)?;
		assert_eq!(3, cart.read(0xA000)?);

		cart.write(0x4000, 0x00)?;
		cart.write(0xA000, 0x77)?;
		assert_eq!(0x77, cart.read(0xA000)?);

		cart.write(0x2000, 7)?;
		assert_eq!(7, cart.read(0x4000)?);

		Ok(())
	}

	#[test]
	fn test_mbc5_banking() -> Result<(), GameboyError> {
		let mut cart = Cartridge::new(empty_rom(CartridgeType::MBC5))?;

		cart.write(0x2000, 6)?;
		assert_eq!(6, cart.read(0x4000)?);

		// MBC5 can map bank 0 to the switchable window.
		cart.write(0x2000, 0)?;
		assert_eq!(0, cart.read(0x4000)?);

		cart.write(0x0000, 0x0A)?;
		cart.write(0x4000, 2)?;
		cart.write(0xA000, 0x33)?;
		cart.write(0x4000, 0)?;
		assert_eq!(0x00, cart.read(0xA000)?);
		cart.write(0x4000, 2)?;
		assert_eq!(0x33, cart.read(0xA000)?);

		Ok(())
	}
}
