// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Rom images for the integration tests.

#![allow(dead_code)]

use dmg_emu::bus::cartridge::checksum;
use dmg_emu::{Config, Emulator, GameboyError};

/// The address the cartridge's code starts at.
pub const ENTRY_POINT: usize = 0x0100;

/// A 32KB rom-only image, with the given code placed at each address.
pub fn rom(sections: &[(usize, &[u8])]) -> Vec<u8> {
	let mut rom = vec![0; 0x8000];

	rom[0x0134..0x0138].copy_from_slice(b"TEST");

	for (address, code) in sections {
		rom[*address..*address + code.len()].copy_from_slice(code);
	}

	let sum = checksum(&rom).to_be_bytes();
	rom[0x014E..0x0150].copy_from_slice(&sum);

	rom
}

/// Powers on a machine running the given code from the entry point.
pub fn emulator(program: &[u8]) -> Result<Emulator, GameboyError> {
	emulator_with(&[(ENTRY_POINT, program)])
}

/// Powers on a machine with code placed at several addresses.
pub fn emulator_with(sections: &[(usize, &[u8])]) -> Result<Emulator, GameboyError> {
	Emulator::new(Config::default(), rom(sections))
}
