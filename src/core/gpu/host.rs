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

//! Host graphics API collaborator
//!
//! The core never talks to a graphics API directly. Every texture and shader
//! program it owns lives behind an opaque handle issued by a [`HostGpu`]
//! implementation. Pixel data crosses the boundary as linear, row-major
//! [`Rgba8`] buffers.

use bitflags::bitflags;

use super::pixel::Rgba8;
use super::registers::{FilterMode, WrapMode};
use crate::core::error::Result;

/// Opaque handle to a host texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Opaque handle to a host shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u32);

bitflags! {
    /// How a host texture is used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled by draws
        const SAMPLED = 1 << 0;
        /// Rendered into
        const RENDER_TARGET = 1 << 1;
        /// Read back to the CPU
        const READBACK = 1 << 2;
        /// Scanned out to a screen
        const DISPLAY = 1 << 3;
    }
}

/// Host texture creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// S wrap mode
    pub wrap_s: WrapMode,
    /// T wrap mode
    pub wrap_t: WrapMode,
    /// Sampling filter
    pub filter: FilterMode,
    /// Usage flags
    pub usage: TextureUsage,
}

impl TextureDesc {
    /// Descriptor for a sampled texture with the given wrap modes
    pub fn sampled(width: u32, height: u32, wrap_s: WrapMode, wrap_t: WrapMode) -> Self {
        Self {
            width,
            height,
            wrap_s,
            wrap_t,
            filter: FilterMode::default(),
            usage: TextureUsage::SAMPLED,
        }
    }

    /// Descriptor for a render target that is read back on commit
    pub fn render_target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            filter: FilterMode::Nearest,
            usage: TextureUsage::RENDER_TARGET | TextureUsage::READBACK | TextureUsage::SAMPLED,
        }
    }

    /// Descriptor for a screen texture refreshed from emulated memory
    pub fn display(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            filter: FilterMode::Linear,
            usage: TextureUsage::DISPLAY | TextureUsage::SAMPLED,
        }
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Host graphics API
///
/// All calls happen on the thread that owns the host context.
pub trait HostGpu {
    /// Allocate a texture
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::HostAllocation`](crate::core::error::EmulatorError::HostAllocation)
    /// if the host cannot allocate it
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle>;

    /// Replace a texture's contents with a linear, row-major pixel buffer
    ///
    /// `pixels` must hold exactly `width * height` pixels.
    fn upload_texture(&mut self, handle: TextureHandle, pixels: &[Rgba8]) -> Result<()>;

    /// Read a texture back into `out` as a linear, row-major pixel buffer
    ///
    /// `out` is resized to `width * height` pixels.
    fn read_texture(&mut self, handle: TextureHandle, out: &mut Vec<Rgba8>) -> Result<()>;

    /// Fill a texture with one colour
    fn clear_texture(&mut self, handle: TextureHandle, color: Rgba8) -> Result<()>;

    /// Release a texture
    ///
    /// Releasing an unknown handle is a no-op.
    fn delete_texture(&mut self, handle: TextureHandle);

    /// Compile a shader program from host shader source
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::Shader`](crate::core::error::EmulatorError::Shader)
    /// if the host rejects the source
    fn create_shader(&mut self, source: &str) -> Result<ShaderHandle>;

    /// Release a shader program
    ///
    /// Releasing an unknown handle is a no-op.
    fn delete_shader(&mut self, handle: ShaderHandle);
}
