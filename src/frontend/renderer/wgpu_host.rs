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

//! wgpu host graphics API
//!
//! Implements [`HostGpu`] with one `Rgba8Unorm` texture per handle. The core's
//! [`Rgba8`] pixels are byte-compatible with that format, so uploads and
//! readbacks are plain byte copies.
//!
//! # Readback
//!
//! Texture-to-buffer copies require rows padded to
//! [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]; the padding is stripped after
//! mapping. Readback blocks on the device.

use std::collections::HashMap;
use std::sync::mpsc;

use crate::core::error::{EmulatorError, Result};
use crate::core::gpu::{
    FilterMode, HostGpu, Rgba8, ShaderHandle, TextureDesc, TextureHandle, TextureUsage, WrapMode,
};

use super::context::HeadlessContext;

/// Bytes per `Rgba8Unorm` texel
const BYTES_PER_PIXEL: u32 = 4;

/// A texture and the sampler it is bound with
struct HostTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    desc: TextureDesc,
}

/// Host GPU on top of a wgpu device
///
/// # Example
///
/// ```no_run
/// use picarx::core::gpu::{HostGpu, Rgba8, TextureDesc};
/// use picarx::frontend::renderer::WgpuHost;
///
/// let mut host = WgpuHost::new_headless().unwrap();
/// let handle = host.create_texture(&TextureDesc::render_target(400, 240)).unwrap();
/// host.clear_texture(handle, Rgba8::BLACK).unwrap();
/// ```
pub struct WgpuHost {
    context: HeadlessContext,
    textures: HashMap<u32, HostTexture>,
    shaders: HashMap<u32, wgpu::ShaderModule>,
    next_id: u32,
}

impl WgpuHost {
    /// Wrap an existing context
    pub fn new(context: HeadlessContext) -> Self {
        Self {
            context,
            textures: HashMap::new(),
            shaders: HashMap::new(),
            next_id: 0,
        }
    }

    /// Create a host on a new headless context
    pub fn new_headless() -> Result<Self> {
        Ok(Self::new(HeadlessContext::new_blocking()?))
    }

    /// Borrow the device context
    pub fn context(&self) -> &HeadlessContext {
        &self.context
    }

    /// View of a live texture, for binding in render passes
    pub fn texture_view(&self, handle: TextureHandle) -> Option<&wgpu::TextureView> {
        self.textures.get(&handle.0).map(|t| &t.view)
    }

    /// Sampler of a live texture
    pub fn sampler(&self, handle: TextureHandle) -> Option<&wgpu::Sampler> {
        self.textures.get(&handle.0).map(|t| &t.sampler)
    }

    /// Compiled module of a live shader program
    pub fn shader_module(&self, handle: ShaderHandle) -> Option<&wgpu::ShaderModule> {
        self.shaders.get(&handle.0)
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn texture(&self, handle: TextureHandle) -> Result<&HostTexture> {
        self.textures
            .get(&handle.0)
            .ok_or(EmulatorError::InvalidHandle(handle.0))
    }

    fn write_pixels(&self, texture: &HostTexture, pixels: &[Rgba8]) {
        let (width, height) = (texture.desc.width, texture.desc.height);

        // wgpu 27 API: write_texture(TexelCopyTextureInfo, &[u8], TexelCopyBufferLayout, Extent3d)
        self.context.queue.write_texture(
            texture.texture.as_image_copy(),
            bytemuck::cast_slice(pixels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * BYTES_PER_PIXEL),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
    }
}

impl HostGpu for WgpuHost {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        let max = self.context.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(EmulatorError::HostAllocation(format!(
                "invalid texture size {}x{} (max {})",
                desc.width, desc.height, max
            )));
        }

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("PICA Texture"),
            size: extent(desc.width, desc.height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: texture_usages(desc.usage),
            view_formats: &[],
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(EmulatorError::HostAllocation(error.to_string()));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("PICA Sampler"),
            address_mode_u: address_mode(desc.wrap_s),
            address_mode_v: address_mode(desc.wrap_t),
            mag_filter: filter_mode(desc.filter),
            min_filter: filter_mode(desc.filter),
            ..Default::default()
        });

        let id = self.allocate_id();
        self.textures.insert(
            id,
            HostTexture {
                texture,
                view,
                sampler,
                desc: *desc,
            },
        );

        log::trace!("wgpu: created texture {} ({}x{})", id, desc.width, desc.height);
        Ok(TextureHandle(id))
    }

    fn upload_texture(&mut self, handle: TextureHandle, pixels: &[Rgba8]) -> Result<()> {
        let texture = self.texture(handle)?;
        if pixels.len() != texture.desc.pixel_count() {
            return Err(EmulatorError::BufferSize {
                expected: texture.desc.pixel_count() * BYTES_PER_PIXEL as usize,
                actual: pixels.len() * BYTES_PER_PIXEL as usize,
            });
        }

        self.write_pixels(texture, pixels);
        Ok(())
    }

    fn read_texture(&mut self, handle: TextureHandle, out: &mut Vec<Rgba8>) -> Result<()> {
        let texture = self.texture(handle)?;
        let (width, height) = (texture.desc.width, texture.desc.height);
        let padded = padded_bytes_per_row(width);
        let device = &self.context.device;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("PICA Readback Buffer"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("PICA Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            texture.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );
        self.context.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });

        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| EmulatorError::Readback(e.to_string()))?;

        receiver
            .recv()
            .map_err(|_| EmulatorError::Readback("map_async callback dropped".to_string()))?
            .map_err(|e| EmulatorError::Readback(format!("map_async failed: {}", e)))?;

        {
            let mapped = slice.get_mapped_range();
            *out = strip_row_padding(&mapped, width, height, padded);
        }
        staging.unmap();

        Ok(())
    }

    fn clear_texture(&mut self, handle: TextureHandle, color: Rgba8) -> Result<()> {
        let texture = self.texture(handle)?;
        let pixels = vec![color; texture.desc.pixel_count()];
        self.write_pixels(texture, &pixels);
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        if let Some(texture) = self.textures.remove(&handle.0) {
            texture.texture.destroy();
            log::trace!("wgpu: deleted texture {}", handle.0);
        }
    }

    fn create_shader(&mut self, source: &str) -> Result<ShaderHandle> {
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("PICA Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(EmulatorError::Shader(error.to_string()));
        }

        let id = self.allocate_id();
        self.shaders.insert(id, module);
        Ok(ShaderHandle(id))
    }

    fn delete_shader(&mut self, handle: ShaderHandle) {
        self.shaders.remove(&handle.0);
    }
}

impl Drop for WgpuHost {
    fn drop(&mut self) {
        if !self.textures.is_empty() || !self.shaders.is_empty() {
            log::warn!(
                "WgpuHost dropped with {} texture(s) and {} shader(s) still live",
                self.textures.len(),
                self.shaders.len()
            );
        }
    }
}

#[inline(always)]
fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Row pitch of a readback buffer for a texture `width` texels wide
///
/// # Example
///
/// ```
/// use picarx::frontend::renderer::padded_bytes_per_row;
///
/// assert_eq!(padded_bytes_per_row(64), 256);
/// assert_eq!(padded_bytes_per_row(65), 512);
/// ```
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Collect the pixels of a padded readback buffer
///
/// # Arguments
///
/// * `data` - Mapped buffer contents, `padded * height` bytes
/// * `width` - Texture width in texels
/// * `height` - Texture height in texels
/// * `padded` - Row pitch in bytes
pub fn strip_row_padding(data: &[u8], width: u32, height: u32, padded: u32) -> Vec<Rgba8> {
    let row_bytes = (width * BYTES_PER_PIXEL) as usize;
    data.chunks(padded as usize)
        .take(height as usize)
        .flat_map(|row| bytemuck::cast_slice::<u8, Rgba8>(&row[..row_bytes]).iter().copied())
        .collect()
}

/// Sampler address mode for a wrap mode
///
/// Border clamping needs an optional device feature; edge clamping is used
/// instead.
pub fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::ClampToEdge | WrapMode::ClampToBorder => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

/// Sampler filter for a filter mode
pub fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// wgpu usages for a host texture
///
/// Every texture accepts writes, since uploads and clears go through the queue.
pub fn texture_usages(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut usages = wgpu::TextureUsages::COPY_DST;
    if usage.intersects(TextureUsage::SAMPLED | TextureUsage::DISPLAY) {
        usages |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(TextureUsage::RENDER_TARGET) {
        usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if usage.contains(TextureUsage::READBACK) {
        usages |= wgpu::TextureUsages::COPY_SRC;
    }
    usages
}
