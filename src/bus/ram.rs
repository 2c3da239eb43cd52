// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Emulate the gameboy's intermal RAM.

use super::Memory;
use super::consts::*;

use crate::config::EchoRam;
use crate::GameboyError;

/// Gameboy's internal memory.
pub struct InternalRam {
	data: [u8; range_size!(MMAP_RAM_INTERNAL)],
	/// Backs the echo region when it isn't mirrored.
	echo_data: [u8; range_size!(MMAP_RAM_ECHO)],
	high_data: [u8; range_size!(MMAP_RAM_HIGH)],
	echo: EchoRam,
}

impl InternalRam {
	/// Initialize the internal ram.
	pub fn new(echo: EchoRam) -> Self {
		InternalRam {
			data: [0_u8; range_size!(MMAP_RAM_INTERNAL)],
			echo_data: [0_u8; range_size!(MMAP_RAM_ECHO)],
			high_data: [0_u8; range_size!(MMAP_RAM_HIGH)],
			echo,
		}
	}

	/// Returns the storage and offset for the given address.
	fn cell(&mut self, address: u16) -> Result<&mut u8, GameboyError> {
		let cell = match address {
			memory_range!(MMAP_RAM_INTERNAL) => {
				self.data.get_mut(range_offset!(MMAP_RAM_INTERNAL, address))
			}
			memory_range!(MMAP_RAM_ECHO) => {
				let offset = range_offset!(MMAP_RAM_ECHO, address);

				match self.echo {
					EchoRam::Asymmetric => self.echo_data.get_mut(offset),
					EchoRam::Mirrored => self.data.get_mut(offset),
				}
			}
			memory_range!(MMAP_RAM_HIGH) => {
				self.high_data.get_mut(range_offset!(MMAP_RAM_HIGH, address))
			}
			_ => None,
		};

		cell.ok_or(GameboyError::MemoryFault { address })
	}
}

impl Memory for InternalRam {
	/// Write to the internal ram.
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		*self.cell(address)? = value;

		Ok(())
	}

	/// Read from the internal ram.
	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		let value = match address {
			memory_range!(MMAP_RAM_INTERNAL) => {
				self.data.get(range_offset!(MMAP_RAM_INTERNAL, address))
			}
			memory_range!(MMAP_RAM_ECHO) => {
				let offset = range_offset!(MMAP_RAM_ECHO, address);

				match self.echo {
					EchoRam::Asymmetric => self.echo_data.get(offset),
					EchoRam::Mirrored => self.data.get(offset),
				}
			}
			memory_range!(MMAP_RAM_HIGH) => {
				self.high_data.get(range_offset!(MMAP_RAM_HIGH, address))
			}
			_ => None,
		};

		value.copied().ok_or(GameboyError::MemoryFault { address })
	}
}
