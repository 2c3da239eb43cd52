// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Composes the background, window and sprite layers into the frame buffer.
//!
//! Every pixel of the frame holds a shade (0-3) already resolved through the
//! relevant palette register, 0 being the lightest.

use super::Ppu;
use super::consts::*;

/// Screen width in pixels.
pub const WIDTH: usize = 160;
/// Screen height in pixels.
pub const HEIGHT: usize = 144;

/// A complete screen of shades, line after line.
pub type Frame = [u8; WIDTH * HEIGHT];

/// The amount of sprites described by the OAM.
pub const SPRITES: usize = OAM_SIZE / 4;

/// Tile maps' offsets within the video ram.
const TILE_MAP_LOW: usize = 0x1800;
const TILE_MAP_HIGH: usize = 0x1C00;
/// Signed tile indices are relative to 0x9000.
const SIGNED_TILE_BASE: i32 = 0x1000;
const TILE_SIZE: usize = 16;

/// Sprite attributes
const SPRITE_PALETTE: u8 = 0x10;
const SPRITE_FLIP_X: u8 = 0x20;
const SPRITE_FLIP_Y: u8 = 0x40;
const SPRITE_BEHIND_BG: u8 = 0x80;

/// Receives the completed frames.
pub trait DisplaySink {
	/// Called once per frame, when the lcd controller enters vertical blank.
	fn present(&mut self, frame: &Frame);
}

/// Drops every frame.
pub struct NullSink;

impl DisplaySink for NullSink {
	fn present(&mut self, _frame: &Frame) {}
}

/// Maps a color id through a palette register.
fn shade(palette: u8, id: u8) -> u8 {
	(palette >> (id * 2)) & 3
}

impl Ppu {
	/// Draw the given line of the frame from the current registers and video memory.
	pub fn render_scanline(&mut self, line: u8) {
		if line as usize >= HEIGHT {
			return;
		}

		// The background's color ids decide the sprites' priority.
		let mut ids = [0_u8; WIDTH];
		let mut shades = [0_u8; WIDTH];

		if self.lcdc.bg_enable() {
			self.render_background(line, &mut ids, &mut shades);
		}

		if self.lcdc.window_enable() {
			self.render_window(line, &mut ids, &mut shades);
		}

		if self.lcdc.sprites_enable() {
			self.render_sprites(line, &ids, &mut shades);
		}

		let start = line as usize * WIDTH;
		self.buffer[start..start + WIDTH].copy_from_slice(&shades);
	}

	/// Hand the frame buffer to the display.
	pub fn present_frame(&mut self) {
		self.display.present(&self.buffer);
		self.frames += 1;
	}

	fn render_background(&self, line: u8, ids: &mut [u8; WIDTH], shades: &mut [u8; WIDTH]) {
		let map = if self.lcdc.bg_tilemap() { TILE_MAP_HIGH } else { TILE_MAP_LOW };
		// The background is 256x256 pixels and wraps around.
		let y = line.wrapping_add(self.scy);

		for x in 0..WIDTH {
			let id = self.map_pixel(map, (x as u8).wrapping_add(self.scx), y);

			ids[x] = id;
			shades[x] = shade(self.bgp, id);
		}
	}

	fn render_window(&self, line: u8, ids: &mut [u8; WIDTH], shades: &mut [u8; WIDTH]) {
		if line < self.wy {
			return;
		}

		let map = if self.lcdc.window_tilemap() { TILE_MAP_HIGH } else { TILE_MAP_LOW };
		let left = self.wx as i32 - 7;
		let y = line - self.wy;

		for x in left.max(0)..WIDTH as i32 {
			let id = self.map_pixel(map, (x - left) as u8, y);

			ids[x as usize] = id;
			shades[x as usize] = shade(self.bgp, id);
		}
	}

	fn render_sprites(&self, line: u8, ids: &[u8; WIDTH], shades: &mut [u8; WIDTH]) {
		let height: i32 = if self.lcdc.sprite_size() { 16 } else { 8 };
		let line = line as i32;

		// Lower indices are drawn last, so they win when sprites overlap.
		for index in (0..SPRITES).rev() {
			let attributes = &self.oam[index * 4..index * 4 + 4];
			let top = attributes[0] as i32 - 16;
			let left = attributes[1] as i32 - 8;
			let flags = attributes[3];

			if line < top || line >= top + height {
				continue;
			}

			let mut row = line - top;
			if flags & SPRITE_FLIP_Y != 0 {
				row = height - 1 - row;
			}

			let tile = if height == 16 { attributes[2] & 0xFE } else { attributes[2] };
			let palette = if flags & SPRITE_PALETTE != 0 { self.obp1 } else { self.obp0 };

			for column in 0..8 {
				let x = left + column;
				if !(0..WIDTH as i32).contains(&x) {
					continue;
				}

				let bit = if flags & SPRITE_FLIP_X != 0 { 7 - column } else { column };
				let id = self.tile_pixel(tile as usize * TILE_SIZE, bit as u8, row as u8);

				// Color 0 is transparent.
				if id == 0 {
					continue;
				}

				if flags & SPRITE_BEHIND_BG != 0 && ids[x as usize] != 0 {
					continue;
				}

				shades[x as usize] = shade(palette, id);
			}
		}
	}

	/// Resolve the color id of a pixel within a 256x256 tile map.
	fn map_pixel(&self, map: usize, x: u8, y: u8) -> u8 {
		let index = map + (y as usize / 8) * 32 + (x as usize / 8);
		let tile = self.vram[index];

		self.tile_pixel(self.tile_address(tile), x % 8, y % 8)
	}

	/// The background and window tiles are either indexed from 0x8000,
	/// or signed relative to 0x9000.
	fn tile_address(&self, tile: u8) -> usize {
		if self.lcdc.tileset() {
			tile as usize * TILE_SIZE
		} else {
			(SIGNED_TILE_BASE + (tile as i8 as i32) * TILE_SIZE as i32) as usize
		}
	}

	/// Each tile row is two bytes, the first holds the low bit of every pixel.
	fn tile_pixel(&self, address: usize, x: u8, y: u8) -> u8 {
		let row = address + y as usize * 2;
		let low = self.vram[row];
		let high = self.vram[row + 1];
		let bit = 7 - x;

		(((high >> bit) & 1) << 1) | ((low >> bit) & 1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use super::super::Memory;
	use crate::GameboyError;

	use alloc::boxed::Box;
	use alloc::sync::Arc;
	use alloc::vec::Vec;
	use core::sync::atomic::{AtomicUsize, Ordering};

	/// Writes an 8x8 tile whose pixels all have the given color id.
	fn solid_tile(ppu: &mut Ppu, address: u16, id: u8) -> Result<(), GameboyError> {
		let low = if id & 1 != 0 { 0xFF } else { 0x00 };
		let high = if id & 2 != 0 { 0xFF } else { 0x00 };

		for row in 0..8 {
			ppu.write(address + row * 2, low)?;
			ppu.write(address + row * 2 + 1, high)?;
		}

		Ok(())
	}

	fn set_sprite(ppu: &mut Ppu, sprite: usize, attributes: [u8; 4]) -> Result<(), GameboyError> {
		for (offset, value) in attributes.iter().enumerate() {
			ppu.write(0xFE00 + (sprite * 4 + offset) as u16, *value)?;
		}

		Ok(())
	}

	fn line(ppu: &Ppu, line: usize) -> &[u8] {
		&ppu.frame()[line * WIDTH..(line + 1) * WIDTH]
	}

	/// Identity palette, so shades equal color ids.
	const IDENTITY: u8 = 0xE4;

	fn ppu() -> Result<Ppu, GameboyError> {
		let mut ppu = Ppu::new();

		ppu.write(IO_BGP, IDENTITY)?;
		ppu.write(IO_OBP0, IDENTITY)?;
		ppu.write(IO_OBP1, 0x1B)?;

		Ok(ppu)
	}

	#[test]
	fn test_pixel_bit_planes() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		// LCDC.4 is set, the map's tile 0 is at 0x8000.
		ppu.write(0x8000, 0b1010_0000)?;
		ppu.write(0x8001, 0b1100_0000)?;
		ppu.render_scanline(0);

		assert_eq!(&[3, 2, 1, 0, 0], &line(&ppu, 0)[..5]);

		Ok(())
	}

	#[test]
	fn test_signed_tile_data() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		ppu.write(IO_LCDC, 0x81)?;
		// Tile 0xFF is right below 0x9000.
		ppu.write(0x9800, 0xFF)?;
		solid_tile(&mut ppu, 0x8FF0, 2)?;
		solid_tile(&mut ppu, 0x9000, 1)?;
		ppu.render_scanline(0);

		assert_eq!(&[2; 8], &line(&ppu, 0)[..8]);
		assert_eq!(&[1; 8], &line(&ppu, 0)[8..16]);

		Ok(())
	}

	#[test]
	fn test_background_scroll_wraps() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		solid_tile(&mut ppu, 0x8010, 3)?;
		// Last tile of the first map row.
		ppu.write(0x981F, 1)?;
		ppu.write(IO_SCX, 0xFC)?;
		ppu.render_scanline(0);

		assert_eq!(&[3, 3, 3, 3, 0], &line(&ppu, 0)[..5]);

		// Vertical wrap: line 4 with SCY=0xFC reads map row 0.
		ppu.write(IO_SCX, 0)?;
		ppu.write(0x9800, 1)?;
		ppu.write(IO_SCY, 0xFC)?;
		ppu.render_scanline(4);

		assert_eq!(3, line(&ppu, 4)[0]);

		Ok(())
	}

	#[test]
	fn test_window_overlay() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		solid_tile(&mut ppu, 0x8010, 2)?;
		for index in 0..32 {
			ppu.write(0x9C00 + index, 1)?;
		}

		// Window on, using the high tile map.
		ppu.write(IO_LCDC, 0x91 | 0x20 | 0x40)?;
		ppu.write(IO_WY, 10)?;
		ppu.write(IO_WX, 7 + 100)?;

		ppu.render_scanline(9);
		assert!(line(&ppu, 9).iter().all(|shade| *shade == 0));

		ppu.render_scanline(10);
		assert!(line(&ppu, 10)[..100].iter().all(|shade| *shade == 0));
		assert!(line(&ppu, 10)[100..].iter().all(|shade| *shade == 2));

		Ok(())
	}

	#[test]
	fn test_sprite_order_and_attributes() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		ppu.write(IO_LCDC, 0x93)?;
		solid_tile(&mut ppu, 0x8020, 2)?;

		// Sprite 1 at x=0, its id 2 maps to shade 1 through OBP1.
		set_sprite(&mut ppu, 1, [16, 8, 2, SPRITE_PALETTE])?;
		// Sprite 0 overlaps its right half at x=4.
		set_sprite(&mut ppu, 0, [16, 12, 2, 0])?;

		ppu.render_scanline(0);
		assert_eq!(&[1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 0], &line(&ppu, 0)[..13]);

		// Out of the screen
		set_sprite(&mut ppu, 0, [0, 0, 0, 0])?;
		ppu.render_scanline(0);
		assert_eq!(&[1; 8], &line(&ppu, 0)[..8]);
		assert_eq!(0, line(&ppu, 0)[8]);

		Ok(())
	}

	#[test]
	fn test_sprite_priority() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		ppu.write(IO_LCDC, 0x93)?;
		solid_tile(&mut ppu, 0x8010, 3)?;
		// Background tile 0 is id 1 on its left half only.
		for row in 0..8 {
			ppu.write(0x8000 + row * 2, 0xF0)?;
		}

		set_sprite(&mut ppu, 0, [16, 8, 1, SPRITE_BEHIND_BG])?;
		ppu.render_scanline(0);

		assert_eq!(&[1, 1, 1, 1, 3, 3, 3, 3], &line(&ppu, 0)[..8]);

		Ok(())
	}

	#[test]
	fn test_tall_flipped_sprite() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		ppu.write(IO_LCDC, 0x97)?;
		// The lower half of the 8x16 sprite: tile 3 (the index's low bit is ignored).
		ppu.write(0x8030, 0x80)?;

		set_sprite(&mut ppu, 0, [16, 8, 3, SPRITE_FLIP_Y | SPRITE_FLIP_X])?;
		ppu.render_scanline(15);
		assert_eq!(0, line(&ppu, 15)[0]);

		// Flipped vertically, the lower half's first row is drawn at the sprite's top.
		ppu.render_scanline(7);
		assert_eq!(&[0, 0, 0, 0, 0, 0, 0, 1], &line(&ppu, 7)[..8]);

		Ok(())
	}

	#[test]
	fn test_render_idempotent() -> Result<(), GameboyError> {
		let mut ppu = ppu()?;

		ppu.write(IO_LCDC, 0xF3)?;
		for address in 0x8000..0x8100 {
			ppu.write(address, (address as u8).wrapping_mul(37))?;
		}
		for address in 0x9800..0x9C00 {
			ppu.write(address, (address % 16) as u8)?;
		}
		set_sprite(&mut ppu, 0, [20, 30, 5, SPRITE_FLIP_X])?;
		ppu.write(IO_SCX, 3)?;
		ppu.write(IO_WX, 80)?;

		ppu.render_scanline(6);
		let first: Vec<u8> = line(&ppu, 6).to_vec();

		ppu.render_scanline(6);
		assert_eq!(first.as_slice(), line(&ppu, 6));

		Ok(())
	}

	struct CountingSink(Arc<AtomicUsize>);

	impl DisplaySink for CountingSink {
		fn present(&mut self, _frame: &Frame) {
			self.0.fetch_add(1, Ordering::Relaxed);
		}
	}

	#[test]
	fn test_present_frame() {
		let presented = Arc::new(AtomicUsize::new(0));
		let mut ppu = Ppu::new();

		ppu.set_display(Box::new(CountingSink(presented.clone())));
		ppu.process(LINE_CYCLES * LINES as usize * 2);

		assert_eq!(2, presented.load(Ordering::Relaxed));
		assert_eq!(2, ppu.frames());
	}
}
