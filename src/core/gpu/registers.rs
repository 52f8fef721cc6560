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

//! GPU register snapshot types
//!
//! Read-only views of the register state the core consumes: texture unit
//! configuration, the render target, the vertex shader entry point and the
//! display controller's two screen framebuffers. Values are kept raw where
//! the hardware allows out-of-range encodings; resolving them is the
//! consumer's job.

use serde::{Deserialize, Serialize};

use super::pixel::PixelFormat;

/// Address registers hold physical addresses divided by 8
#[inline(always)]
pub const fn decode_address_register(value: u32) -> u32 {
    value.wrapping_mul(8)
}

/// Texture coordinate wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Clamp to the edge texel
    ClampToEdge,
    /// Clamp to the border colour
    ClampToBorder,
    /// Repeat
    Repeat,
    /// Repeat, mirroring every other repetition
    MirroredRepeat,
}

impl WrapMode {
    /// Decode a wrap mode register field
    ///
    /// # Returns
    ///
    /// `None` for undefined encodings
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(WrapMode::ClampToEdge),
            1 => Some(WrapMode::ClampToBorder),
            2 => Some(WrapMode::Repeat),
            3 => Some(WrapMode::MirroredRepeat),
            _ => None,
        }
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Nearest texel
    Nearest,
    /// Bilinear
    #[default]
    Linear,
}

/// Raw register state of one texture unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureRegisters {
    /// Unit enabled
    pub enabled: bool,

    /// Source address register (physical address / 8)
    pub address: u32,

    /// Width in texels
    pub width: u16,

    /// Height in texels
    pub height: u16,

    /// Raw S wrap mode field
    pub wrap_s: u32,

    /// Raw T wrap mode field
    pub wrap_t: u32,

    /// Raw texture format field
    pub format: u32,
}

impl TextureRegisters {
    /// Physical address of the texture data
    pub const fn physical_address(&self) -> u32 {
        decode_address_register(self.address)
    }
}

/// Resolved texture configuration
///
/// Part of a cached texture's identity: the same source address read with a
/// different configuration is a different texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureConfig {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Pixel encoding
    pub format: PixelFormat,
    /// S wrap mode
    pub wrap_s: WrapMode,
    /// T wrap mode
    pub wrap_t: WrapMode,
}

impl TextureConfig {
    /// Bytes of emulated memory the texture reads
    pub fn byte_size(&self) -> u32 {
        self.width * self.height * self.format.bytes_per_pixel()
    }
}

/// Raw render target registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramebufferRegisters {
    /// Colour buffer address register (physical address / 8)
    pub color_address: u32,
    /// Depth buffer address register (physical address / 8)
    pub depth_address: u32,
    /// Raw colour format field
    pub color_format: u32,
    /// Raw depth format field
    pub depth_format: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FramebufferRegisters {
    /// Build the render target descriptor from the live registers
    pub const fn descriptor(&self) -> FramebufferDescriptor {
        FramebufferDescriptor {
            color_address: decode_address_register(self.color_address),
            depth_address: decode_address_register(self.depth_address),
            color_format: self.color_format,
            depth_format: self.depth_format,
            width: self.width,
            height: self.height,
        }
    }
}

/// Currently configured render target
///
/// Compared by value across batches; any differing field is a framebuffer
/// switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FramebufferDescriptor {
    /// Physical address of the colour buffer
    pub color_address: u32,
    /// Physical address of the depth buffer
    pub depth_address: u32,
    /// Raw colour format (see [`PixelFormat::from_pica_raw`])
    pub color_format: u32,
    /// Raw depth format
    pub depth_format: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FramebufferDescriptor {
    /// Resolved colour format, if the raw value is supported
    pub const fn pixel_format(&self) -> Option<PixelFormat> {
        PixelFormat::from_pica_raw(self.color_format)
    }
}

/// Display controller configuration for one screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenFramebufferConfig {
    /// First left-eye buffer (physical address)
    pub address_left1: u32,
    /// Second left-eye buffer (physical address)
    pub address_left2: u32,
    /// Which of the two buffers is scanned out (0 or 1)
    pub active_fb: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Raw colour format (see [`PixelFormat::from_lcd_raw`])
    pub color_format: u32,
    /// Row stride in bytes as programmed
    pub stride: u32,
}

impl ScreenFramebufferConfig {
    /// Physical address of the buffer currently scanned out
    pub const fn active_address(&self) -> u32 {
        if self.active_fb == 0 {
            self.address_left1
        } else {
            self.address_left2
        }
    }

    /// Row pitch in pixels for a format `bytes_per_pixel` wide
    ///
    /// A stride shorter than `width` pixels (including an unprogrammed zero)
    /// is ignored and the rows are packed.
    pub const fn row_pixels(&self, bytes_per_pixel: u32) -> u32 {
        let pitch = match bytes_per_pixel {
            0 => 0,
            bpp => self.stride / bpp,
        };
        if pitch > self.width {
            pitch
        } else {
            self.width
        }
    }
}

/// Register snapshot consumed at the start of every draw batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PicaRegisters {
    /// Render target
    pub framebuffer: FramebufferRegisters,
    /// Texture units 0-2
    pub textures: [TextureRegisters; 3],
    /// Vertex shader entry point (in program words)
    pub vs_main_offset: u32,
}

/// Vertex shader state the shader cache compiles from
#[derive(Debug, Clone, Copy)]
pub struct ShaderSetup<'a> {
    /// Entry point (in program words)
    pub main_offset: u32,
    /// Uploaded program binary
    pub program: &'a [u32],
    /// Operand swizzle patterns
    pub swizzle: &'a [u32],
}

impl ShaderSetup<'_> {
    /// Bytes of shader program memory the program occupies
    pub fn byte_size(&self) -> u32 {
        (self.program.len() * 4) as u32
    }
}
