// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Small programs run through the public emulator API.

mod common;

use common::*;

use dmg_emu::bus::joypad::Button;
use dmg_emu::cpu::Event;
use dmg_emu::cpu::interrupts::InterruptFlags;
use dmg_emu::cpu::state::registers::{Flag, Register};
use dmg_emu::{Config, Emulator, GameboyError};

#[test]
fn test_header_checksum() -> Result<(), GameboyError> {
	let emulator = emulator(&[])?;

	assert!(emulator.cartridge().header().checksum_valid());
	assert_eq!("TEST", emulator.cartridge().title());

	Ok(())
}

#[test]
fn test_rejects_bad_images() {
	let mut image = rom(&[]);
	image[0x0147] = 0xFC;
	assert_eq!(Some(GameboyError::CartridgeFormat(0xFC)), Emulator::new(Config::default(), image).err());

	assert_eq!(Some(GameboyError::RomTooSmall(0x40)), Emulator::new(Config::default(), vec![0; 0x40]).err());
}

#[test]
fn test_arithmetic() -> Result<(), GameboyError> {
	let mut emulator = emulator(&[
		0x3E, 0x12,       // ld A, 0x12
		0x47,             // ld B, A
		0x80,             // add A, B
		0xEA, 0x00, 0xC0, // ld (0xC000), A
		0xD6, 0x24,       // sub 0x24
		0x18, 0xFE,       // jr -2
	])?;

	emulator.step(4)?;
	assert_eq!(0x24, emulator.read_memory(0xC000)?);
	assert_eq!(0x24, emulator.register(Register::A));

	emulator.step(1)?;
	assert_eq!(0x00, emulator.register(Register::A));
	assert!(emulator.flag(Flag::Z));
	assert!(emulator.flag(Flag::N));
	assert!(!emulator.flag(Flag::C));

	Ok(())
}

#[test]
fn test_call_and_return() -> Result<(), GameboyError> {
	let mut emulator = emulator_with(&[
		(0x0100, &[
			0xCD, 0x00, 0x02, // call 0x0200
			0x18, 0xFE,       // jr -2
		]),
		(0x0200, &[
			0x3E, 0x07,       // ld A, 7
			0xC9,             // ret
		]),
	])?;

	emulator.toggle_breakpoint(0x0103);
	assert_eq!(0x0103, emulator.run()?);
	assert_eq!(0x07, emulator.register(Register::A));
	assert_eq!(0xFFFE, emulator.register(Register::SP));

	Ok(())
}

#[test]
fn test_timer_interrupt() -> Result<(), GameboyError> {
	let mut emulator = emulator_with(&[
		(0x0100, &[
			0x3E, 0x04, // ld A, 0x04
			0xE0, 0xFF, // ldh (IE), A
			0x3E, 0x05, // ld A, 0x05
			0xE0, 0x07, // ldh (TAC), A
			0xFB,       // ei
			0x18, 0xFE, // jr -2
		]),
		(0x0050, &[
			0xD9,       // reti
		]),
	])?;

	emulator.toggle_breakpoint(0x0050);
	assert_eq!(0x0050, emulator.run()?);

	// The master enable is restored once the dispatch check completes.
	assert!(emulator.ime());
	assert!(!emulator.interrupt_flags().contains(InterruptFlags::TIMER));
	assert_eq!(0xFFFC, emulator.register(Register::SP));
	assert_eq!(0x09, emulator.read_memory(0xFFFC)?);
	assert_eq!(0x01, emulator.read_memory(0xFFFD)?);

	// reti
	emulator.step(1)?;
	assert!(emulator.ime());
	assert_eq!(0x0109, emulator.register(Register::PC));

	Ok(())
}

#[test]
fn test_joypad_selection() -> Result<(), GameboyError> {
	let mut emulator = emulator(&[
		0x3E, 0x20, // ld A, 0x20
		0xE0, 0x00, // ldh (P1), A
		0xF0, 0x00, // ldh A, (P1)
		0x18, 0xFE, // jr -2
	])?;

	emulator.input().press(Button::Right);
	emulator.step(3)?;

	assert_eq!(0xEE, emulator.register(Register::A));
	assert!(emulator.interrupt_flags().contains(InterruptFlags::JOYPAD));

	Ok(())
}

#[test]
fn test_illegal_opcode_faults() -> Result<(), GameboyError> {
	let mut emulator = emulator(&[0x00, 0xD3])?;

	assert_eq!(Event::Executed { cycles: 4 }, emulator.step(1)?);

	let fault = GameboyError::IllegalOpcode { opcode: 0xD3, prefixed: false, address: 0x0101 };
	assert_eq!(Some(fault.clone()), emulator.step(1).err());

	// The machine is left untouched, and keeps reporting the fault.
	assert_eq!(0x0101, emulator.register(Register::PC));
	assert_eq!(Some(fault), emulator.step(1).err());

	emulator.reset();
	assert_eq!(Event::Executed { cycles: 4 }, emulator.step(1)?);

	Ok(())
}

#[test]
fn test_frames() -> Result<(), GameboyError> {
	let mut emulator = emulator(&[
		0x18, 0xFE, // jr -2
	])?;

	for _ in 0..3 {
		emulator.run_frame()?;
	}

	assert_eq!(3, emulator.statistics().frames);
	assert!(emulator.interrupt_flags().contains(InterruptFlags::VBLANK));
	// The empty tile maps draw the lightest shade after the power-on palette.
	assert!(emulator.frame().iter().all(|shade| *shade == 0));

	Ok(())
}
