// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulator hardware emulation configuration and preferences.

/// The hardware specification for the different models differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardwareModel {
	/// Original GameBoy
	GB,
	/// Gameboy Color (only its DMG compatibility boot state)
	GBC,
	/// GameBoy Pocket
	GBP,
	/// Super GameBoy
	SGB,
}

impl HardwareModel {
	/// The accumulator's value once the boot rom hands control to the cartridge.
	pub fn boot_accumulator(&self) -> u8 {
		match self {
			HardwareModel::GB | HardwareModel::SGB => 0x01,
			HardwareModel::GBC => 0x11,
			HardwareModel::GBP => 0xFF,
		}
	}

	/// The internal 16-bit divider's value once the boot rom hands control over.
	pub fn boot_divider(&self) -> u16 {
		match self {
			HardwareModel::GB | HardwareModel::SGB => 0xabcc,
			HardwareModel::GBC => 0x1ea0,
			HardwareModel::GBP => 0x1ea4,
		}
	}
}

/// How the echo region (0xE000-0xFDFF) relates to the internal ram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EchoRam {
	/// Writes to 0xC000-0xDFFF are not seen through the echo region, which keeps
	/// its own storage. Reproduces the behavior existing software was tuned against.
	Asymmetric,
	/// Both regions alias the same storage, as on the real hardware.
	Mirrored,
}

/// Emulation settings and preferences goes here.
#[derive(Clone, Debug)]
pub struct Config {
	/// The model of the emulated machine
	pub model: HardwareModel,
	/// Echo ram aliasing policy
	pub echo_ram: EchoRam,
	/// Don't log a warning when the cartridge's header checksum doesn't match
	pub skip_checksum_warning: bool,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			model: HardwareModel::GB,
			echo_ram: EchoRam::Asymmetric,
			skip_checksum_warning: false,
		}
	}
}
