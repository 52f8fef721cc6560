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

//! In-memory host GPU
//!
//! Keeps every texture as a CPU pixel buffer and counts each call, so cache
//! and pipeline behaviour can be observed without a graphics device. Also
//! used by the dump tool to decode through the same path a real renderer
//! takes.

use std::collections::HashMap;

use serde::Serialize;

use super::host::{HostGpu, ShaderHandle, TextureDesc, TextureHandle};
use super::pixel::Rgba8;
use crate::core::error::{EmulatorError, Result};

/// Per-call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostCounters {
    /// Textures allocated
    pub textures_created: u64,
    /// Textures released
    pub textures_deleted: u64,
    /// Texture uploads
    pub uploads: u64,
    /// Texture readbacks
    pub readbacks: u64,
    /// Texture clears
    pub clears: u64,
    /// Shader programs compiled
    pub shaders_created: u64,
    /// Shader programs released
    pub shaders_deleted: u64,
}

#[derive(Debug, Clone)]
struct SoftTexture {
    desc: TextureDesc,
    pixels: Vec<Rgba8>,
}

/// Host GPU backed by CPU memory
#[derive(Debug, Default)]
pub struct SoftwareHost {
    textures: HashMap<u32, SoftTexture>,
    shaders: HashMap<u32, String>,
    next_id: u32,
    /// Maximum live textures before allocation fails (None = unlimited)
    texture_limit: Option<usize>,
    counters: HostCounters,
}

impl SoftwareHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host that fails allocation once `limit` textures are live
    pub fn with_texture_limit(limit: usize) -> Self {
        Self {
            texture_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Change the live texture limit (None = unlimited)
    ///
    /// Textures already live are kept even if they exceed the new limit.
    pub fn set_texture_limit(&mut self, limit: Option<usize>) {
        self.texture_limit = limit;
    }

    /// Call counters
    pub fn counters(&self) -> HostCounters {
        self.counters
    }

    /// Number of live textures
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live shader programs
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Borrow a texture's pixels
    pub fn texture_pixels(&self, handle: TextureHandle) -> Option<&[Rgba8]> {
        self.textures.get(&handle.0).map(|t| t.pixels.as_slice())
    }

    /// Creation parameters of a live texture
    pub fn texture_desc(&self, handle: TextureHandle) -> Option<TextureDesc> {
        self.textures.get(&handle.0).map(|t| t.desc)
    }

    /// Source a live shader program was compiled from
    pub fn shader_source(&self, handle: ShaderHandle) -> Option<&str> {
        self.shaders.get(&handle.0).map(String::as_str)
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn texture_mut(&mut self, handle: TextureHandle) -> Result<&mut SoftTexture> {
        self.textures
            .get_mut(&handle.0)
            .ok_or(EmulatorError::InvalidHandle(handle.0))
    }
}

impl HostGpu for SoftwareHost {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        if self
            .texture_limit
            .is_some_and(|limit| self.textures.len() >= limit)
        {
            return Err(EmulatorError::HostAllocation(format!(
                "texture limit reached ({} live)",
                self.textures.len()
            )));
        }

        let id = self.allocate_id();
        self.textures.insert(
            id,
            SoftTexture {
                desc: *desc,
                pixels: vec![Rgba8::TRANSPARENT; desc.pixel_count()],
            },
        );
        self.counters.textures_created += 1;

        log::trace!(
            "SoftwareHost: created texture {} ({}x{})",
            id,
            desc.width,
            desc.height
        );
        Ok(TextureHandle(id))
    }

    fn upload_texture(&mut self, handle: TextureHandle, pixels: &[Rgba8]) -> Result<()> {
        let texture = self.texture_mut(handle)?;
        if pixels.len() != texture.pixels.len() {
            return Err(EmulatorError::BufferSize {
                expected: texture.pixels.len() * 4,
                actual: pixels.len() * 4,
            });
        }
        texture.pixels.copy_from_slice(pixels);
        self.counters.uploads += 1;
        Ok(())
    }

    fn read_texture(&mut self, handle: TextureHandle, out: &mut Vec<Rgba8>) -> Result<()> {
        let texture = self.texture_mut(handle)?;
        out.clear();
        out.extend_from_slice(&texture.pixels);
        self.counters.readbacks += 1;
        Ok(())
    }

    fn clear_texture(&mut self, handle: TextureHandle, color: Rgba8) -> Result<()> {
        let texture = self.texture_mut(handle)?;
        texture.pixels.fill(color);
        self.counters.clears += 1;
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle.0).is_some() {
            self.counters.textures_deleted += 1;
            log::trace!("SoftwareHost: deleted texture {}", handle.0);
        }
    }

    fn create_shader(&mut self, source: &str) -> Result<ShaderHandle> {
        if source.is_empty() {
            return Err(EmulatorError::Shader("empty shader source".to_string()));
        }

        let id = self.allocate_id();
        self.shaders.insert(id, source.to_string());
        self.counters.shaders_created += 1;
        Ok(ShaderHandle(id))
    }

    fn delete_shader(&mut self, handle: ShaderHandle) {
        if self.shaders.remove(&handle.0).is_some() {
            self.counters.shaders_deleted += 1;
        }
    }
}
