// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pixel encodings and tiled addressing
//!
//! The GPU stores textures and render targets in one of five pixel encodings
//! and in a tiled ("swizzled") layout. This module converts between those
//! encodings and a canonical [`Rgba8`] pixel, and between linear `(x, y)`
//! coordinates and tiled byte offsets.
//!
//! Every path that touches tiled memory (texture decode, framebuffer commit,
//! display upload) goes through [`tiled_image_offset`].
//!
//! # Tiled Layout
//!
//! Images are split into 8×8 tiles stored contiguously, tiles laid out
//! row-major. Inside a tile, each 2×2 block is stored as
//!
//! ```text
//! 2 3
//! 0 1
//! ```
//!
//! and the same pattern nests for 4×4 and 8×8 blocks (Morton / Z-order).
//!
//! # Memory Byte Order
//!
//! | Format | Bytes | Layout                                 |
//! |--------|-------|----------------------------------------|
//! | RGBA8  | 4     | `[a, b, g, r]`                         |
//! | RGB8   | 3     | `[b, g, r]`                            |
//! | RGB565 | 2     | u16 LE `r5<<11 \| g6<<5 \| b5`          |
//! | RGB5A1 | 2     | u16 LE `r5<<11 \| g5<<6 \| b5<<1 \| a1`  |
//! | RGBA4  | 2     | u16 LE `r4<<12 \| g4<<8 \| b4<<4 \| a4`  |

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Canonical decoded pixel: four 8-bit channels in `r, g, b, a` order
///
/// `#[repr(transparent)]` over `[u8; 4]`, so a `&[Rgba8]` can be handed to a
/// host API expecting tightly packed RGBA8 bytes via [`bytemuck::cast_slice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct Rgba8(pub [u8; 4]);

impl Rgba8 {
    /// Opaque black
    pub const BLACK: Rgba8 = Rgba8([0, 0, 0, 255]);

    /// Fully transparent black
    pub const TRANSPARENT: Rgba8 = Rgba8([0, 0, 0, 0]);

    /// Create a pixel from its channels
    #[inline(always)]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Red channel
    #[inline(always)]
    pub const fn r(self) -> u8 {
        self.0[0]
    }

    /// Green channel
    #[inline(always)]
    pub const fn g(self) -> u8 {
        self.0[1]
    }

    /// Blue channel
    #[inline(always)]
    pub const fn b(self) -> u8 {
        self.0[2]
    }

    /// Alpha channel
    #[inline(always)]
    pub const fn a(self) -> u8 {
        self.0[3]
    }
}

/// Hardware pixel encoding
///
/// The set is closed; raw register values outside it are resolved by the
/// caller (see [`PixelFormat::from_pica_raw`] and [`PixelFormat::from_lcd_raw`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 32-bit RGBA, 8 bits per channel
    Rgba8,
    /// 24-bit RGB, 8 bits per channel
    Rgb8,
    /// 16-bit RGB 5-6-5
    Rgb565,
    /// 16-bit RGB 5-5-5 with 1-bit alpha
    Rgb5A1,
    /// 16-bit RGBA 4-4-4-4
    Rgba4,
}

impl PixelFormat {
    /// All supported formats
    pub const ALL: [PixelFormat; 5] = [
        PixelFormat::Rgba8,
        PixelFormat::Rgb8,
        PixelFormat::Rgb565,
        PixelFormat::Rgb5A1,
        PixelFormat::Rgba4,
    ];

    /// Bytes per pixel in emulated memory
    #[inline(always)]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgb565 | PixelFormat::Rgb5A1 | PixelFormat::Rgba4 => 2,
        }
    }

    /// Decode a texture / render target format register value
    ///
    /// Texture units and the colour buffer share one numbering:
    /// RGBA8=0, RGB8=1, RGB5A1=2, RGB565=3, RGBA4=4.
    ///
    /// # Returns
    ///
    /// `None` for values outside the supported set
    pub const fn from_pica_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(PixelFormat::Rgba8),
            1 => Some(PixelFormat::Rgb8),
            2 => Some(PixelFormat::Rgb5A1),
            3 => Some(PixelFormat::Rgb565),
            4 => Some(PixelFormat::Rgba4),
            _ => None,
        }
    }

    /// Inverse of [`PixelFormat::from_pica_raw`]
    pub const fn to_pica_raw(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 0,
            PixelFormat::Rgb8 => 1,
            PixelFormat::Rgb5A1 => 2,
            PixelFormat::Rgb565 => 3,
            PixelFormat::Rgba4 => 4,
        }
    }

    /// Decode a display controller (LCD) format register value
    ///
    /// The display controller numbers formats differently:
    /// RGBA8=0, RGB8=1, RGB565=2, RGB5A1=3, RGBA4=4. Only the low 3 bits are
    /// significant.
    ///
    /// # Returns
    ///
    /// `None` for values outside the supported set
    pub const fn from_lcd_raw(raw: u32) -> Option<Self> {
        match raw & 0x7 {
            0 => Some(PixelFormat::Rgba8),
            1 => Some(PixelFormat::Rgb8),
            2 => Some(PixelFormat::Rgb565),
            3 => Some(PixelFormat::Rgb5A1),
            4 => Some(PixelFormat::Rgba4),
            _ => None,
        }
    }

    /// Inverse of [`PixelFormat::from_lcd_raw`]
    pub const fn to_lcd_raw(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 0,
            PixelFormat::Rgb8 => 1,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb5A1 => 3,
            PixelFormat::Rgba4 => 4,
        }
    }
}

/// Morton lookup for the x coordinate inside an 8×8 tile
const MORTON_X: [u32; 8] = [0x00, 0x01, 0x04, 0x05, 0x10, 0x11, 0x14, 0x15];

/// Morton lookup for the y coordinate inside an 8×8 tile
const MORTON_Y: [u32; 8] = [0x00, 0x02, 0x08, 0x0a, 0x20, 0x22, 0x28, 0x2a];

/// Tile edge length in pixels
pub const TILE_SIZE: u32 = 8;

/// Pixel index of `(x, y)` inside its 8×8 tile
#[inline(always)]
pub fn morton_interleave(x: u32, y: u32) -> u32 {
    MORTON_X[(x % 8) as usize] + MORTON_Y[(y % 8) as usize]
}

/// Byte offset of `(x, y)` within its row of tiles
///
/// Does not include the stride of the tile rows above `y`; see
/// [`tiled_image_offset`] for the full address.
///
/// # Example
///
/// ```
/// use picarx::core::gpu::tiled_offset;
///
/// assert_eq!(tiled_offset(0, 0, 4), 0);
/// assert_eq!(tiled_offset(1, 0, 4), 4);
/// assert_eq!(tiled_offset(0, 1, 4), 8);
/// assert_eq!(tiled_offset(8, 0, 4), 64 * 4); // second tile
/// ```
#[inline(always)]
pub fn tiled_offset(x: u32, y: u32, bytes_per_pixel: u32) -> u32 {
    let coarse_x = x & !7;
    (morton_interleave(x, y) + coarse_x * TILE_SIZE) * bytes_per_pixel
}

/// Byte offset of `(x, y)` in a tiled image `width` pixels wide
#[inline(always)]
pub fn tiled_image_offset(x: u32, y: u32, width: u32, bytes_per_pixel: u32) -> u32 {
    let coarse_y = y & !7;
    tiled_offset(x, y, bytes_per_pixel) + coarse_y * width * bytes_per_pixel
}

/// Size in bytes of a tiled image
///
/// Dimensions are rounded up to whole tiles, since a partial tile still
/// occupies its full footprint.
pub fn tiled_image_size(width: u32, height: u32, format: PixelFormat) -> usize {
    let w = width.div_ceil(TILE_SIZE) * TILE_SIZE;
    let h = height.div_ceil(TILE_SIZE) * TILE_SIZE;
    w as usize * h as usize * format.bytes_per_pixel() as usize
}

#[inline(always)]
fn expand4(v: u16) -> u8 {
    let v = v as u8;
    (v << 4) | v
}

#[inline(always)]
fn expand5(v: u16) -> u8 {
    let v = v as u8;
    (v << 3) | (v >> 2)
}

#[inline(always)]
fn expand6(v: u16) -> u8 {
    let v = v as u8;
    (v << 2) | (v >> 4)
}

#[inline(always)]
fn expand1(v: u16) -> u8 {
    if v != 0 {
        255
    } else {
        0
    }
}

/// Decode one pixel from its memory bytes
///
/// # Panics
///
/// Panics if `bytes` is shorter than `format.bytes_per_pixel()`
///
/// # Example
///
/// ```
/// use picarx::core::gpu::{decode, PixelFormat, Rgba8};
///
/// // RGBA4 0xF80F: r=0xF, g=0x8, b=0x0, a=0xF
/// assert_eq!(decode(&[0x0F, 0xF8], PixelFormat::Rgba4), Rgba8::new(255, 136, 0, 255));
/// ```
#[inline]
pub fn decode(bytes: &[u8], format: PixelFormat) -> Rgba8 {
    match format {
        PixelFormat::Rgba8 => Rgba8::new(bytes[3], bytes[2], bytes[1], bytes[0]),
        PixelFormat::Rgb8 => Rgba8::new(bytes[2], bytes[1], bytes[0], 255),
        PixelFormat::Rgb565 => {
            let p = u16::from_le_bytes([bytes[0], bytes[1]]);
            Rgba8::new(
                expand5((p >> 11) & 0x1F),
                expand6((p >> 5) & 0x3F),
                expand5(p & 0x1F),
                255,
            )
        }
        PixelFormat::Rgb5A1 => {
            let p = u16::from_le_bytes([bytes[0], bytes[1]]);
            Rgba8::new(
                expand5((p >> 11) & 0x1F),
                expand5((p >> 6) & 0x1F),
                expand5((p >> 1) & 0x1F),
                expand1(p & 0x1),
            )
        }
        PixelFormat::Rgba4 => {
            let p = u16::from_le_bytes([bytes[0], bytes[1]]);
            Rgba8::new(
                expand4((p >> 12) & 0xF),
                expand4((p >> 8) & 0xF),
                expand4((p >> 4) & 0xF),
                expand4(p & 0xF),
            )
        }
    }
}

/// Encode one pixel into its memory bytes
///
/// Channels are truncated (not rounded) to the target bit depth.
///
/// # Panics
///
/// Panics if `out` is shorter than `format.bytes_per_pixel()`
pub fn encode(pixel: Rgba8, format: PixelFormat, out: &mut [u8]) {
    let [r, g, b, a] = pixel.0.map(u16::from);
    match format {
        PixelFormat::Rgba8 => {
            out[..4].copy_from_slice(&[pixel.a(), pixel.b(), pixel.g(), pixel.r()]);
        }
        PixelFormat::Rgb8 => {
            out[..3].copy_from_slice(&[pixel.b(), pixel.g(), pixel.r()]);
        }
        PixelFormat::Rgb565 => {
            let p = ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3);
            out[..2].copy_from_slice(&p.to_le_bytes());
        }
        PixelFormat::Rgb5A1 => {
            let p = ((r >> 3) << 11) | ((g >> 3) << 6) | ((b >> 3) << 1) | (a >> 7);
            out[..2].copy_from_slice(&p.to_le_bytes());
        }
        PixelFormat::Rgba4 => {
            let p = ((r >> 4) << 12) | ((g >> 4) << 8) | ((b >> 4) << 4) | (a >> 4);
            out[..2].copy_from_slice(&p.to_le_bytes());
        }
    }
}

/// Decode the pixel at linear `(x, y)` of a tiled image
///
/// # Panics
///
/// Panics if `data` does not cover the pixel's tiled offset
#[inline]
pub fn decode_tiled(data: &[u8], x: u32, y: u32, width: u32, format: PixelFormat) -> Rgba8 {
    let offset = tiled_image_offset(x, y, width, format.bytes_per_pixel()) as usize;
    decode(&data[offset..], format)
}

/// Decode a whole tiled image into a linear, row-major buffer
///
/// `flip_rows` stores hardware row `y` at output row `height - 1 - y`.
/// Textures are stored bottom-up in emulated memory, display buffers are not.
///
/// # Arguments
///
/// * `data` - Tiled source bytes, at least [`tiled_image_size`] long
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `format` - Source pixel format
/// * `flip_rows` - Whether to flip vertically while decoding
pub fn decode_image(
    data: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    flip_rows: bool,
) -> Vec<Rgba8> {
    decode_image_pitched(data, width, height, width, format, flip_rows)
}

/// Decode the left `width` pixels of a tiled image laid out `pitch` pixels wide
///
/// Used for display buffers whose programmed stride is wider than the
/// visible area. `data` must be at least `tiled_image_size(pitch, height)`
/// long; `pitch` must not be smaller than `width`.
pub fn decode_image_pitched(
    data: &[u8],
    width: u32,
    height: u32,
    pitch: u32,
    format: PixelFormat,
    flip_rows: bool,
) -> Vec<Rgba8> {
    let mut pixels = vec![Rgba8::TRANSPARENT; width as usize * height as usize];

    for (row, line) in pixels.chunks_exact_mut(width.max(1) as usize).enumerate() {
        let row = row as u32;
        let y = if flip_rows { height - 1 - row } else { row };
        for (x, pixel) in line.iter_mut().enumerate() {
            *pixel = decode_tiled(data, x as u32, y, pitch, format);
        }
    }

    pixels
}

/// Encode a linear, row-major image into tiled memory bytes
///
/// Only the bytes belonging to pixels inside `width × height` are written, so
/// `out` may be seeded with the existing memory contents.
///
/// # Panics
///
/// Panics if `pixels` is shorter than `width * height` or `out` does not
/// cover every tiled offset
pub fn encode_image(pixels: &[Rgba8], width: u32, height: u32, format: PixelFormat, out: &mut [u8]) {
    let bpp = format.bytes_per_pixel();
    for y in 0..height {
        for x in 0..width {
            let pixel = pixels[(x + y * width) as usize];
            let offset = tiled_image_offset(x, y, width, bpp) as usize;
            encode(pixel, format, &mut out[offset..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::Rgba8.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rgb8.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::Rgb5A1.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::Rgba4.bytes_per_pixel(), 2);
    }

    #[test]
    fn test_raw_format_numbering() {
        assert_eq!(PixelFormat::from_pica_raw(2), Some(PixelFormat::Rgb5A1));
        assert_eq!(PixelFormat::from_pica_raw(3), Some(PixelFormat::Rgb565));
        assert_eq!(PixelFormat::from_lcd_raw(2), Some(PixelFormat::Rgb565));
        assert_eq!(PixelFormat::from_lcd_raw(3), Some(PixelFormat::Rgb5A1));
        assert_eq!(PixelFormat::from_pica_raw(5), None);
        assert_eq!(PixelFormat::from_lcd_raw(7), None);
        // Upper bits are ignored by the display controller
        assert_eq!(PixelFormat::from_lcd_raw(0x40), Some(PixelFormat::Rgba8));

        for format in PixelFormat::ALL {
            assert_eq!(PixelFormat::from_pica_raw(format.to_pica_raw()), Some(format));
            assert_eq!(PixelFormat::from_lcd_raw(format.to_lcd_raw()), Some(format));
        }
    }

    #[test]
    fn test_morton_tile_pattern() {
        // First 2x2 block: 0 1 on the bottom row, 2 3 on the next
        assert_eq!(morton_interleave(0, 0), 0);
        assert_eq!(morton_interleave(1, 0), 1);
        assert_eq!(morton_interleave(0, 1), 2);
        assert_eq!(morton_interleave(1, 1), 3);
        // Next 2x2 block to the right
        assert_eq!(morton_interleave(2, 0), 4);
        // Last pixel of the tile
        assert_eq!(morton_interleave(7, 7), 63);
        // Coordinates wrap per tile
        assert_eq!(morton_interleave(9, 10), morton_interleave(1, 2));
    }

    #[test]
    fn test_tiled_image_offset_tile_rows() {
        // 16 pixels wide: one tile row holds 2 tiles (128 pixels)
        assert_eq!(tiled_image_offset(0, 8, 16, 1), 128);
        assert_eq!(tiled_image_offset(8, 8, 16, 1), 192);
        assert_eq!(tiled_image_offset(15, 15, 16, 1), 255);
    }

    #[test]
    fn test_tiled_image_size_rounds_up() {
        assert_eq!(tiled_image_size(8, 8, PixelFormat::Rgba8), 256);
        assert_eq!(tiled_image_size(9, 8, PixelFormat::Rgb565), 16 * 8 * 2);
    }

    #[test]
    fn test_channel_expansion_replicates_high_bits() {
        assert_eq!(expand4(0xF), 0xFF);
        assert_eq!(expand4(0x8), 0x88);
        assert_eq!(expand5(0x1F), 0xFF);
        assert_eq!(expand5(0x10), 0x84);
        assert_eq!(expand6(0x3F), 0xFF);
        assert_eq!(expand6(0x20), 0x82);
        assert_eq!(expand1(1), 0xFF);
        assert_eq!(expand1(0), 0x00);
    }

    #[test]
    fn test_rgba8_byte_order() {
        let mut out = [0u8; 4];
        encode(Rgba8::new(0x11, 0x22, 0x33, 0x44), PixelFormat::Rgba8, &mut out);
        assert_eq!(out, [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(decode(&out, PixelFormat::Rgba8), Rgba8::new(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn test_rgb8_byte_order() {
        assert_eq!(
            decode(&[0x33, 0x22, 0x11], PixelFormat::Rgb8),
            Rgba8::new(0x11, 0x22, 0x33, 255)
        );
    }

    #[test]
    fn test_rgb565_decode() {
        let cases = [
            (0xF800u16, Rgba8::new(255, 0, 0, 255)),
            (0x07E0u16, Rgba8::new(0, 255, 0, 255)),
            (0x001Fu16, Rgba8::new(0, 0, 255, 255)),
        ];
        for (raw, expected) in cases {
            assert_eq!(decode(&raw.to_le_bytes(), PixelFormat::Rgb565), expected);
        }
    }

    #[test]
    fn test_rgb5a1_max_value_round_trip() {
        let raw = 0xFFFFu16.to_le_bytes();
        let pixel = decode(&raw, PixelFormat::Rgb5A1);
        assert_eq!(pixel, Rgba8::new(255, 255, 255, 255));

        let mut out = [0u8; 2];
        encode(pixel, PixelFormat::Rgb5A1, &mut out);
        let p = u16::from_le_bytes(out);
        assert_eq!((p >> 11) & 0x1F, 0b11111);
        assert_eq!((p >> 6) & 0x1F, 0b11111);
        assert_eq!((p >> 1) & 0x1F, 0b11111);
        assert_eq!(p & 1, 1);
    }

    #[test]
    fn test_rgba4_nibbles_exact() {
        for nibble in 0..16u8 {
            let value = (nibble << 4) | nibble;
            let pixel = Rgba8::new(value, value, value, value);
            let mut out = [0u8; 2];
            encode(pixel, PixelFormat::Rgba4, &mut out);
            assert_eq!(out, [(nibble << 4) | nibble, (nibble << 4) | nibble]);
            assert_eq!(decode(&out, PixelFormat::Rgba4), pixel);
        }
    }

    #[test]
    fn test_encode_truncates() {
        let mut out = [0u8; 2];
        // 0x1F would round up to 0x2, truncation keeps 0x1
        encode(Rgba8::new(0x1F, 0x1F, 0x1F, 0x1F), PixelFormat::Rgba4, &mut out);
        assert_eq!(u16::from_le_bytes(out), 0x1111);
    }

    #[test]
    fn test_decode_tiled_single_tile() {
        // 8x8 RGBA8 image where each pixel's red channel is its tiled index
        let mut data = vec![0u8; 8 * 8 * 4];
        for i in 0..64u8 {
            data[i as usize * 4 + 3] = i;
        }
        assert_eq!(decode_tiled(&data, 1, 1, 8, PixelFormat::Rgba8).r(), 3);
        assert_eq!(decode_tiled(&data, 2, 0, 8, PixelFormat::Rgba8).r(), 4);
        assert_eq!(decode_tiled(&data, 7, 7, 8, PixelFormat::Rgba8).r(), 63);
    }

    #[test]
    fn test_decode_image_flip() {
        let width = 8;
        let height = 8;
        let mut pixels = vec![Rgba8::BLACK; 64];
        pixels[0] = Rgba8::new(255, 0, 0, 255); // (0, 0)

        let mut data = vec![0u8; tiled_image_size(width, height, PixelFormat::Rgba8)];
        encode_image(&pixels, width, height, PixelFormat::Rgba8, &mut data);

        let straight = decode_image(&data, width, height, PixelFormat::Rgba8, false);
        assert_eq!(straight[0], Rgba8::new(255, 0, 0, 255));

        let flipped = decode_image(&data, width, height, PixelFormat::Rgba8, true);
        assert_eq!(flipped[(7 * width) as usize], Rgba8::new(255, 0, 0, 255));
        assert_eq!(flipped[0], Rgba8::BLACK);
    }

    #[test]
    fn test_rgba8_cast_to_bytes() {
        let pixels = [Rgba8::new(1, 2, 3, 4), Rgba8::new(5, 6, 7, 8)];
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);
        assert_eq!(bytes, &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_tiled_bijection_64x64() {
        for format in PixelFormat::ALL {
            let bpp = format.bytes_per_pixel();
            let mut seen = HashSet::new();
            for y in 0..64 {
                for x in 0..64 {
                    let offset = tiled_image_offset(x, y, 64, bpp);
                    assert_eq!(offset % bpp, 0);
                    assert!(offset < 64 * 64 * bpp);
                    assert!(seen.insert(offset), "duplicate offset {offset} for ({x}, {y})");
                }
            }
            assert_eq!(seen.len(), 64 * 64);
        }
    }

    /// Quantize a pixel to what `format` can represent
    fn representable(pixel: Rgba8, format: PixelFormat) -> Rgba8 {
        let mut bytes = [0u8; 4];
        encode(pixel, format, &mut bytes);
        decode(&bytes, format)
    }

    proptest! {
        #[test]
        fn prop_tiled_offset_bijection(tiles_w in 1u32..8, tiles_h in 1u32..8, bpp_index in 0usize..5) {
            let bpp = PixelFormat::ALL[bpp_index].bytes_per_pixel();
            let width = tiles_w * 8;
            let height = tiles_h * 8;
            let mut seen = vec![false; (width * height) as usize];

            for y in 0..height {
                for x in 0..width {
                    let offset = tiled_image_offset(x, y, width, bpp);
                    prop_assert_eq!(offset % bpp, 0);
                    let index = (offset / bpp) as usize;
                    prop_assert!(index < seen.len());
                    prop_assert!(!seen[index]);
                    seen[index] = true;
                }
            }

            prop_assert!(seen.iter().all(|&s| s));
        }

        #[test]
        fn prop_decode_encode_round_trip(r: u8, g: u8, b: u8, a: u8, format_index in 0usize..5) {
            let format = PixelFormat::ALL[format_index];
            let pixel = representable(Rgba8::new(r, g, b, a), format);

            let mut bytes = [0u8; 4];
            encode(pixel, format, &mut bytes);
            prop_assert_eq!(decode(&bytes, format), pixel);
        }

        #[test]
        fn prop_encode_decode_preserves_raw(lo: u8, hi: u8, format_index in 2usize..5) {
            // Every 16-bit pattern is a valid pixel in the 16-bit formats
            let format = PixelFormat::ALL[format_index];
            let raw = [lo, hi];
            let mut out = [0u8; 2];
            encode(decode(&raw, format), format, &mut out);
            prop_assert_eq!(out, raw);
        }
    }
}
