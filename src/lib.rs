// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]
//! This library provides emulation of the gameboy's Z80-like CPU and it's peripherals,
//! as described in the publicly available "Game Boy CPU Manual".
//!
//! The core is driven one instruction at a time: the [`cpu::Cpu`] executes an
//! instruction, the peripherals on the [`bus::SystemBus`] advance by the cycles it
//! took (divider, timer, lcd modes and the pixel compositor), and a single
//! interrupt-dispatch check runs before the next fetch.

extern crate alloc;

#[cfg(all(test, not(feature = "std")))]
#[macro_use]
extern crate std;

#[macro_use]
pub mod bus;
pub mod cpu;
pub mod config;
pub mod emulator;
#[cfg(feature = "std")]
pub mod session;

pub use emulator::Emulator;
pub use config::Config;

use thiserror::Error;

/// Errors raised by the emulation core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameboyError {
	/// The fetched opcode has no defined semantics.
	#[error("illegal opcode {}{:02x} at {:04x}", cb_prefix(.prefixed), .opcode, .address)]
	IllegalOpcode {
		/// The offending opcode byte.
		opcode: u8,
		/// Whether the opcode was reached through the 0xCB prefix.
		prefixed: bool,
		/// The address the opcode was fetched from.
		address: u16,
	},
	/// A peripheral was accessed at an address it does not decode.
	#[error("memory fault at {address:04x}")]
	MemoryFault {
		/// The faulting address.
		address: u16,
	},
	/// The cartridge header declares a bank controller we can't emulate.
	#[error("unsupported cartridge type {0:02x}")]
	CartridgeFormat(u8),
	/// The cartridge header declares a platform we can't emulate.
	#[error("unsupported platform flag {0:02x}")]
	UnsupportedPlatform(u8),
	/// The rom image is too small to contain a cartridge header.
	#[error("rom image of {0} bytes is too small")]
	RomTooSmall(usize),
	/// The emulation worker has already stopped.
	#[error("the emulation session is stopped")]
	Stopped,
	/// The emulation worker halted on a fatal error.
	#[error("the emulation session halted on a fatal error")]
	Faulted,
}

fn cb_prefix(prefixed: &bool) -> &'static str {
	if *prefixed { "cb " } else { "" }
}
