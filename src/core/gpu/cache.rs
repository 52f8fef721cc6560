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

//! Resource cache for decoded textures and compiled shaders
//!
//! Decoding a texture or translating a shader is expensive, so the result is
//! kept on the host and reused until the emulated memory it came from is
//! written. Textures are keyed by the physical address of their source bytes,
//! shaders by their entry point.
//!
//! # Invalidation
//!
//! Every entry indexes the byte range it was derived from. A write
//! notification removes every entry whose range overlaps the written range
//! and releases its host resource immediately. Entries are never patched; the
//! next acquire decodes them again.
//!
//! # Example
//!
//! ```
//! use picarx::core::gpu::{ResourceCache, SoftwareHost, TextureRegisters};
//! use picarx::core::memory::{AddressSpaceKind, PhysicalMemory};
//!
//! let mut host = SoftwareHost::new();
//! let memory = PhysicalMemory::console();
//! let mut cache = ResourceCache::new();
//!
//! let regs = TextureRegisters {
//!     enabled: true,
//!     address: 0x1800_0000 / 8,
//!     width: 8,
//!     height: 8,
//!     wrap_s: 2,
//!     wrap_t: 2,
//!     format: 0,
//! };
//!
//! let first = cache.acquire_texture(&mut host, &memory, &regs).unwrap();
//! let second = cache.acquire_texture(&mut host, &memory, &regs).unwrap();
//! assert_eq!(first, second);
//!
//! assert_eq!(cache.invalidate(&mut host, AddressSpaceKind::Physical, 0x1800_0000, 4), 1);
//! ```

use std::collections::HashMap;

use serde::Serialize;

use super::host::{HostGpu, ShaderHandle, TextureDesc, TextureHandle, TextureUsage};
use super::pixel::{decode_image, tiled_image_size, PixelFormat};
use super::range_index::AddressRangeIndex;
use super::registers::{FilterMode, ShaderSetup, TextureConfig, TextureRegisters, WrapMode};
use crate::core::error::{EmulatorError, Result};
use crate::core::memory::{physical_ranges, AddressSpaceKind, EmulatedMemory};

/// Produces host shader source from an emulated vertex shader
///
/// Implemented outside the core; the cache only decides when to call it.
pub trait ShaderTranslator {
    /// Translate the program starting at `main_offset` into host shader source
    fn translate(&mut self, program: &[u32], swizzle: &[u32], main_offset: u32) -> Result<String>;
}

/// A decoded texture resident on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedTexture {
    /// Physical address the texture was decoded from
    pub source_address: u32,
    /// Bytes of emulated memory the texture was decoded from
    pub byte_size: u32,
    /// Host texture
    pub handle: TextureHandle,
    /// Configuration the texture was decoded with
    pub config: TextureConfig,
}

/// A compiled shader program resident on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedShader {
    /// Entry point the program was translated from
    pub main_offset: u32,
    /// Bytes of shader program memory the program was translated from
    pub byte_size: u32,
    /// Host shader program
    pub handle: ShaderHandle,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Acquires served from the cache
    pub hits: u64,
    /// Acquires that decoded or translated
    pub misses: u64,
    /// Entries removed by invalidation
    pub invalidated: u64,
    /// Unrecognized register values replaced by a fallback
    pub config_fallbacks: u64,
}

/// Cache of host resources derived from emulated memory
#[derive(Debug, Default)]
pub struct ResourceCache {
    /// Textures by source physical address
    textures: HashMap<u32, CachedTexture>,

    /// Shaders by entry point
    shaders: HashMap<u32, CachedShader>,

    /// Physical ranges backing each texture (key: source address)
    texture_ranges: AddressRangeIndex<u32>,

    /// Shader program ranges backing each shader (key: entry point)
    shader_ranges: AddressRangeIndex<u32>,

    /// Filter applied to newly created textures
    filter: FilterMode,

    stats: CacheStats,
}

impl ResourceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache that creates textures with `filter`
    pub fn with_filter(filter: FilterMode) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Get the host texture for a texture unit's configuration
    ///
    /// On a hit no host calls are made. On a miss the source bytes are
    /// decoded into a linear buffer (rows flipped, since textures are stored
    /// bottom-up), uploaded into one new host texture and indexed.
    ///
    /// # Arguments
    ///
    /// * `host` - Host graphics API
    /// * `memory` - Emulated memory holding the texture
    /// * `regs` - Raw texture unit registers
    ///
    /// # Errors
    ///
    /// - [`EmulatorError::MemoryAccess`] if the texture is not fully mapped
    /// - Any error the host returns while allocating or uploading
    pub fn acquire_texture(
        &mut self,
        host: &mut dyn HostGpu,
        memory: &dyn EmulatedMemory,
        regs: &TextureRegisters,
    ) -> Result<TextureHandle> {
        let address = regs.physical_address();
        let config = self.resolve_texture_config(regs);

        if let Some(entry) = self.textures.get(&address) {
            if entry.config == config {
                self.stats.hits += 1;
                return Ok(entry.handle);
            }

            log::debug!(
                "Texture at {:#010x} reconfigured ({:?} -> {:?}), replacing",
                address,
                entry.config,
                config
            );
            self.release_texture(host, address);
        }

        self.stats.misses += 1;

        let byte_size = tiled_image_size(config.width, config.height, config.format);
        let data = memory
            .slice(address, byte_size)
            .ok_or(EmulatorError::MemoryAccess {
                address,
                length: byte_size,
            })?;

        let pixels = decode_image(data, config.width, config.height, config.format, true);

        let handle = host.create_texture(&TextureDesc {
            width: config.width,
            height: config.height,
            wrap_s: config.wrap_s,
            wrap_t: config.wrap_t,
            filter: self.filter,
            usage: TextureUsage::SAMPLED,
        })?;

        if let Err(e) = host.upload_texture(handle, &pixels) {
            host.delete_texture(handle);
            return Err(e);
        }

        let byte_size = byte_size as u32;
        self.texture_ranges.insert(address, byte_size, address);
        self.textures.insert(
            address,
            CachedTexture {
                source_address: address,
                byte_size,
                handle,
                config,
            },
        );

        log::trace!(
            "Cached texture {:#010x} ({}x{} {:?}, {:#x} bytes)",
            address,
            config.width,
            config.height,
            config.format,
            byte_size
        );

        Ok(handle)
    }

    /// Get the host program for a vertex shader entry point
    ///
    /// On a miss the translator produces host source from the program binary
    /// and swizzle data, and the program's footprint `[0, len * 4)` in shader
    /// program memory is indexed.
    ///
    /// # Errors
    ///
    /// Any error from the translator or from host compilation
    pub fn acquire_shader(
        &mut self,
        host: &mut dyn HostGpu,
        setup: &ShaderSetup<'_>,
        translator: &mut dyn ShaderTranslator,
    ) -> Result<ShaderHandle> {
        if let Some(entry) = self.shaders.get(&setup.main_offset) {
            self.stats.hits += 1;
            return Ok(entry.handle);
        }

        self.stats.misses += 1;

        let source = translator.translate(setup.program, setup.swizzle, setup.main_offset)?;
        let handle = host.create_shader(&source)?;

        let byte_size = setup.byte_size();
        self.shader_ranges.insert(0, byte_size, setup.main_offset);
        self.shaders.insert(
            setup.main_offset,
            CachedShader {
                main_offset: setup.main_offset,
                byte_size,
                handle,
            },
        );

        log::trace!(
            "Cached shader at entry point {:#x} ({} words)",
            setup.main_offset,
            setup.program.len()
        );

        Ok(handle)
    }

    /// Remove every entry derived from bytes in `[start, start + length)`
    ///
    /// Virtual ranges are clipped to the GPU-visible windows and translated
    /// to physical piece by piece; bytes outside those windows invalidate
    /// nothing. Shader program ranges invalidate shaders, every other kind
    /// invalidates textures.
    ///
    /// # Returns
    ///
    /// Number of entries removed
    pub fn invalidate(
        &mut self,
        host: &mut dyn HostGpu,
        kind: AddressSpaceKind,
        start: u32,
        length: u32,
    ) -> usize {
        let pieces = physical_ranges(kind, start, length);
        if pieces.is_empty() {
            log::debug!(
                "Ignoring invalidation of untranslatable {:?} range {:#010x}+{:#x}",
                kind,
                start,
                length
            );
            return 0;
        }

        let removed: usize = pieces
            .into_iter()
            .map(|(paddr, len)| self.remove_overlapping(host, kind, paddr, len))
            .sum();

        if removed > 0 {
            log::debug!(
                "Invalidated {} cached resource(s) overlapping {:?} {:#010x}+{:#x}",
                removed,
                kind,
                start,
                length
            );
        }

        self.stats.invalidated += removed as u64;
        removed
    }

    fn remove_overlapping(
        &mut self,
        host: &mut dyn HostGpu,
        kind: AddressSpaceKind,
        start: u32,
        length: u32,
    ) -> usize {
        match kind {
            AddressSpaceKind::ShaderProgram => {
                let offsets = self.shader_ranges.remove_overlapping(start, length);
                for offset in &offsets {
                    if let Some(entry) = self.shaders.remove(offset) {
                        host.delete_shader(entry.handle);
                    }
                }
                offsets.len()
            }
            AddressSpaceKind::Physical | AddressSpaceKind::Virtual => {
                let addresses = self.texture_ranges.remove_overlapping(start, length);
                for address in &addresses {
                    if let Some(entry) = self.textures.remove(address) {
                        host.delete_texture(entry.handle);
                    }
                }
                addresses.len()
            }
        }
    }

    /// Release every cached host resource
    pub fn flush_all(&mut self, host: &mut dyn HostGpu) {
        let textures = self.textures.len();
        let shaders = self.shaders.len();

        for (_, entry) in self.textures.drain() {
            host.delete_texture(entry.handle);
        }
        for (_, entry) in self.shaders.drain() {
            host.delete_shader(entry.handle);
        }
        self.texture_ranges.clear();
        self.shader_ranges.clear();

        if textures + shaders > 0 {
            log::debug!("Flushed {} texture(s) and {} shader(s)", textures, shaders);
        }
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Cached texture decoded from `address`, if any
    pub fn texture(&self, address: u32) -> Option<&CachedTexture> {
        self.textures.get(&address)
    }

    /// Cached shader for entry point `main_offset`, if any
    pub fn shader(&self, main_offset: u32) -> Option<&CachedShader> {
        self.shaders.get(&main_offset)
    }

    /// Number of cached textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of cached shaders
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Resolve raw texture registers, replacing undefined values
    ///
    /// Unknown wrap modes become `Repeat`, unknown formats become RGBA8. Each
    /// replacement is logged and counted.
    fn resolve_texture_config(&mut self, regs: &TextureRegisters) -> TextureConfig {
        let wrap_s = self.resolve_wrap(regs.wrap_s, 's');
        let wrap_t = self.resolve_wrap(regs.wrap_t, 't');

        let format = match PixelFormat::from_pica_raw(regs.format) {
            Some(format) => format,
            None => {
                log::error!(
                    "Unknown texture format {:#x} at {:#010x}, decoding as RGBA8",
                    regs.format,
                    regs.physical_address()
                );
                self.stats.config_fallbacks += 1;
                PixelFormat::Rgba8
            }
        };

        TextureConfig {
            width: u32::from(regs.width),
            height: u32::from(regs.height),
            format,
            wrap_s,
            wrap_t,
        }
    }

    fn resolve_wrap(&mut self, raw: u32, axis: char) -> WrapMode {
        WrapMode::from_raw(raw).unwrap_or_else(|| {
            log::error!("Unknown texture wrap mode {:#x} ({}), using Repeat", raw, axis);
            self.stats.config_fallbacks += 1;
            WrapMode::Repeat
        })
    }

    fn release_texture(&mut self, host: &mut dyn HostGpu, address: u32) {
        if let Some(entry) = self.textures.remove(&address) {
            self.texture_ranges.remove(address, &address);
            host.delete_texture(entry.handle);
        }
    }
}
