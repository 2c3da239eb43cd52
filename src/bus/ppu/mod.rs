// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Gameboy's lcd controller / picture processing unit.

pub mod compositor;

use alloc::boxed::Box;

use super::Memory;
use super::consts::*;
use super::memory_range::*;

use compositor::*;

use crate::GameboyError;
use crate::cpu::interrupts::*;

#[allow(unused, missing_docs)]
pub mod consts {
	use super::*;

	// Position and scrolling
	pub const IO_LCDC: u16 = 0xFF40;
	pub const IO_STAT: u16 = 0xFF41;
	pub const IO_SCY: u16 = 0xFF42;
	pub const IO_SCX: u16 = 0xFF43;
	pub const IO_LY: u16 = 0xFF44;
	pub const IO_LYC: u16 = 0xFF45;
	pub const IO_BGP: u16 = 0xFF47;
	pub const IO_OBP0: u16 = 0xFF48;
	pub const IO_OBP1: u16 = 0xFF49;
	pub const IO_WY: u16 = 0xFF4A;
	pub const IO_WX: u16 = 0xFF4B;

	// 0xFF46 is in the range although it's unrelated, but it appears on a higher
	// match arm on the system bus so it won't reach our I/O handlers.
	pub const MMAP_IO_DISPLAY: MemoryRange = make_range!(0xFF40, 0xFF4B);

	pub const VRAM_SIZE: usize = range_size!(MMAP_VIDEO_RAM);
	pub const OAM_SIZE: usize = range_size!(MMAP_SPRITE_OAM);

	/// Cycles spent on each part of a visible line.
	pub const OAM_SEARCH_CYCLES: usize = 80;
	pub const TRANSFER_CYCLES: usize = 172;
	pub const HBLANK_CYCLES: usize = 204;
	pub const LINE_CYCLES: usize = OAM_SEARCH_CYCLES + TRANSFER_CYCLES + HBLANK_CYCLES;

	/// The first line of the vertical blank period.
	pub const VBLANK_LINE: u8 = 144;
	/// The amount of lines, including the vertical blank ones.
	pub const LINES: u8 = 154;
}

use consts::*;

/// The lcd controller peripheral has four states, and 154 lines made of these
/// states correspond to a single frame when the LCD is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PpuMode {
	Hblank,
	Vblank,
	SearchOam,
	RenderLine,
}

impl PpuMode {
	/// The mode's encoding in STAT's lower bits.
	pub fn value(&self) -> u8 {
		match self {
			PpuMode::Hblank => 0,
			PpuMode::Vblank => 1,
			PpuMode::SearchOam => 2,
			PpuMode::RenderLine => 3,
		}
	}

	fn duration(&self) -> usize {
		match self {
			PpuMode::SearchOam => OAM_SEARCH_CYCLES,
			PpuMode::RenderLine => TRANSFER_CYCLES,
			PpuMode::Hblank => HBLANK_CYCLES,
			PpuMode::Vblank => LINE_CYCLES,
		}
	}
}

/// The gameboy's lcd controller.
pub struct Ppu {
	vram: [u8; VRAM_SIZE],
	oam: [u8; OAM_SIZE],

	lcdc: Lcdc,
	stat: Stat,
	scy: u8,
	scx: u8,
	ly: u8,
	lyc: u8,
	bgp: u8,
	obp0: u8,
	obp1: u8,
	wy: u8,
	wx: u8,

	mode: PpuMode,
	mode_counter: usize,

	buffer: Box<Frame>,
	display: Box<dyn DisplaySink + Send>,
	frames: u64,

	interrupt_flag: InterruptMask,
}

struct Lcdc {
	data: u8,
}

struct Stat {
	/// Consists of bits 3-6 (RW).
	data: u8,
	/// Bit 2 (RO), set while LY equals LYC.
	signal: bool,
	/// Consists of bits 0-1 (RO).
	mode: u8,
}

impl Ppu {
	/// Initialize a new ppu instance, the frames are dropped until a display is attached.
	pub fn new() -> Self {
		let mut ppu = Ppu {
			vram: [0; VRAM_SIZE],
			oam: [0; OAM_SIZE],
			lcdc: Lcdc::new(),
			stat: Stat::new(),
			scy: 0,
			scx: 0,
			ly: 0,
			lyc: 0,
			bgp: 0,
			obp0: 0,
			obp1: 0,
			wy: 0,
			wx: 0,
			mode: PpuMode::SearchOam,
			mode_counter: 0,
			buffer: Box::new([0; WIDTH * HEIGHT]),
			display: Box::new(NullSink),
			frames: 0,
			interrupt_flag: 0,
		};

		ppu.reset();

		ppu
	}

	/// Reset this peripheral to boot state.
	///
	/// The attached display is kept.
	pub fn reset(&mut self) {
		self.vram = [0; VRAM_SIZE];
		self.oam = [0; OAM_SIZE];
		self.lcdc.reset();
		self.stat.reset();
		self.scy = 0x00;
		self.scx = 0x00;
		self.lyc = 0x00;
		self.bgp = 0xFC;
		self.obp0 = 0xFF;
		self.obp1 = 0xFF;
		self.wy = 0x00;
		self.wx = 0x00;
		self.mode_counter = 0;
		self.frames = 0;
		self.buffer.fill(0);
		self.interrupt_flag = 0;

		self.set_ly(0);
		self.stat.set_mode(PpuMode::SearchOam);
		self.mode = PpuMode::SearchOam;
	}

	/// Replace the sink that receives the completed frames.
	pub fn set_display(&mut self, display: Box<dyn DisplaySink + Send>) {
		self.display = display;
	}

	/// The current state of the lcd controller.
	pub fn mode(&self) -> PpuMode {
		self.mode
	}

	/// The line currently processed (LY).
	pub fn line(&self) -> u8 {
		self.ly
	}

	/// The frame being drawn, complete lines are kept until they're redrawn.
	pub fn frame(&self) -> &Frame {
		&self.buffer
	}

	/// The amount of frames handed to the display since power-on.
	pub fn frames(&self) -> u64 {
		self.frames
	}

	/// Update the ppu's state according to the elapsed time.
	pub fn process(&mut self, cycles: usize) {
		if !self.lcdc.power() {
			// LCD is powered off.
			return;
		}

		self.mode_counter += cycles;

		while self.mode_counter >= self.mode.duration() {
			self.mode_counter -= self.mode.duration();
			self.advance();
		}
	}

	/// Move to the state that follows the current one.
	fn advance(&mut self) {
		match self.mode {
			PpuMode::SearchOam => {
				self.enter(PpuMode::RenderLine);
				self.render_scanline(self.ly);
			}

			PpuMode::RenderLine => {
				self.enter(PpuMode::Hblank);
			}

			PpuMode::Hblank => {
				// Move to the next line
				self.set_ly(self.ly + 1);

				if self.ly == VBLANK_LINE {
					// Start V-Blank.
					self.enter(PpuMode::Vblank);
					self.interrupt_flag |= Interrupt::VerticalBlank.value();
					self.present_frame();
				} else {
					self.enter(PpuMode::SearchOam);
				}
			}

			PpuMode::Vblank => {
				if self.ly + 1 == LINES {
					self.set_ly(0);
					self.enter(PpuMode::SearchOam);
				} else {
					self.set_ly(self.ly + 1);
				}
			}
		}
	}

	/// Switch to the given mode, and raise the interrupt if STAT selects it.
	fn enter(&mut self, mode: PpuMode) {
		self.mode = mode;
		self.stat.set_mode(mode);

		let selected = match mode {
			PpuMode::Hblank => self.stat.hblank_check_enable(),
			PpuMode::Vblank => self.stat.vblank_check_enable(),
			PpuMode::SearchOam => self.stat.oam_check_enable(),
			PpuMode::RenderLine => false,
		};

		if selected {
			self.interrupt_flag |= Interrupt::LcdStat.value();
		}
	}

	/// Update the current line and the coincidence flag.
	fn set_ly(&mut self, line: u8) {
		self.ly = line;
		self.update_coincidence();
	}

	fn update_coincidence(&mut self) {
		let coincidence = self.ly == self.lyc;

		if coincidence && !self.stat.signal && self.stat.lyc_check_enable() {
			self.interrupt_flag |= Interrupt::LcdStat.value();
		}

		self.stat.set_lyc_signal(coincidence);
	}

	fn write_lcdc(&mut self, value: u8) {
		let was_powered = self.lcdc.power();
		self.lcdc.write(value);

		if was_powered && !self.lcdc.power() {
			// The line counter stays at 0 while the lcd is off.
			self.mode_counter = 0;
			self.set_ly(0);
			self.mode = PpuMode::Hblank;
			self.stat.set_mode(PpuMode::Hblank);
		} else if !was_powered && self.lcdc.power() {
			self.mode_counter = 0;
			self.mode = PpuMode::SearchOam;
			self.stat.set_mode(PpuMode::SearchOam);
		}
	}
}

impl Default for Ppu {
	fn default() -> Self {
		Ppu::new()
	}
}

impl Memory for Ppu {
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		match address {
			IO_LCDC => { self.write_lcdc(value); }
			IO_STAT => { self.stat.write(value); }
			IO_SCY => { self.scy = value; }
			IO_SCX => { self.scx = value; }
			// The line counter is read-only.
			IO_LY => {}
			IO_LYC => {
				self.lyc = value;
				self.update_coincidence();
			}
			IO_BGP => { self.bgp = value; }
			IO_OBP0 => { self.obp0 = value; }
			IO_OBP1 => { self.obp1 = value; }
			IO_WY => { self.wy = value; }
			IO_WX => { self.wx = value; }
			memory_range!(MMAP_VIDEO_RAM) => {
				self.vram[range_offset!(MMAP_VIDEO_RAM, address)] = value;
			}
			memory_range!(MMAP_SPRITE_OAM) => {
				self.oam[range_offset!(MMAP_SPRITE_OAM, address)] = value;
			}
			_ => {
				return Err(GameboyError::MemoryFault { address });
			}
		}

		Ok(())
	}

	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		let result = match address {
			IO_LCDC => { self.lcdc.read() }
			IO_STAT => { self.stat.read() }
			IO_SCY => { self.scy }
			IO_SCX => { self.scx }
			IO_LY => { self.ly }
			IO_LYC => { self.lyc }
			IO_BGP => { self.bgp }
			IO_OBP0 => { self.obp0 }
			IO_OBP1 => { self.obp1 }
			IO_WY => { self.wy }
			IO_WX => { self.wx }
			memory_range!(MMAP_VIDEO_RAM) => {
				self.vram[range_offset!(MMAP_VIDEO_RAM, address)]
			}
			memory_range!(MMAP_SPRITE_OAM) => {
				self.oam[range_offset!(MMAP_SPRITE_OAM, address)]
			}
			_ => {
				return Err(GameboyError::MemoryFault { address });
			}
		};

		Ok(result)
	}
}

impl InterruptSource for Ppu {
	fn interrupts(&self) -> InterruptMask {
		self.interrupt_flag
	}

	fn clear(&mut self) {
		self.interrupt_flag = 0;
	}
}

impl Lcdc {
	pub fn new() -> Self {
		Lcdc { data: 0 }
	}

	pub fn reset(&mut self) {
		self.data = 0x91;
	}

	pub fn power(&self) -> bool {
		self.data & 0x80 != 0
	}

	/// 0 - 0x9800-0x9BFF, 1 - 0x9C00-0x9FFF
	pub fn window_tilemap(&self) -> bool {
		self.data & 0x40 != 0
	}

	pub fn window_enable(&self) -> bool {
		self.data & 0x20 != 0
	}

	/// 0 - 0x8800-0x97FF, 1 - 0x8000-0x8FFF
	pub fn tileset(&self) -> bool {
		self.data & 0x10 != 0
	}

	/// 0 - 0x9800-0x9BFF, 1 - 0x9C00-0x9FFF
	pub fn bg_tilemap(&self) -> bool {
		self.data & 0x8 != 0
	}

	/// 0 - 8x8, 1 - 8x16
	pub fn sprite_size(&self) -> bool {
		self.data & 0x4 != 0
	}

	pub fn sprites_enable(&self) -> bool {
		self.data & 0x2 != 0
	}

	pub fn bg_enable(&self) -> bool {
		self.data & 0x1 != 0
	}

	pub fn write(&mut self, value: u8) {
		self.data = value;
	}

	pub fn read(&self) -> u8 {
		self.data
	}
}

impl Stat {
	pub fn new() -> Self {
		Stat { data: 0, signal: false, mode: 0 }
	}

	pub fn reset(&mut self) {
		self.data = 0;
		self.signal = false;
	}

	pub fn lyc_check_enable(&self) -> bool {
		self.data & 0x40 != 0
	}

	pub fn oam_check_enable(&self) -> bool {
		self.data & 0x20 != 0
	}

	pub fn vblank_check_enable(&self) -> bool {
		self.data & 0x10 != 0
	}

	pub fn hblank_check_enable(&self) -> bool {
		self.data & 0x8 != 0
	}

	pub fn set_lyc_signal(&mut self, value: bool) {
		self.signal = value;
	}

	pub fn set_mode(&mut self, mode: PpuMode) {
		self.mode = mode.value();
	}

	pub fn write(&mut self, value: u8) {
		self.data = value & 0x78;
	}

	/// Bit 7 is unused and reads as set.
	pub fn read(&self) -> u8 {
		0x80 | self.data | if self.signal { 4 } else { 0 } | self.mode
	}
}
