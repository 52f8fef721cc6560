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

//! Hardware renderer facade
//!
//! Ties the resource cache, the framebuffer commit pipeline and the display
//! presenter to one host. The emulated GPU drives it with three kinds of
//! events:
//!
//! - batch starts, carrying a register snapshot
//! - memory write notifications from the CPU, DMA and shader uploads
//! - display events (pre-transfer commits and buffer swaps)

use super::cache::{CacheStats, ResourceCache, ShaderTranslator};
use super::framebuffer::{DisplayPresenter, FramebufferChange, FramebufferCommitPipeline};
use super::host::{HostGpu, ShaderHandle, TextureHandle};
use super::registers::{PicaRegisters, ScreenFramebufferConfig, ShaderSetup};
use crate::core::config::RendererConfig;
use crate::core::error::Result;
use crate::core::memory::{AddressSpaceKind, EmulatedMemory};

/// Host resources bound for the current batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundResources {
    /// Texture per unit (`None` if the unit is disabled)
    pub textures: [Option<TextureHandle>; 3],
    /// Vertex shader program
    pub shader: Option<ShaderHandle>,
}

/// Emulated vertex shader memory
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderMemory<'a> {
    /// Uploaded program binary
    pub program: &'a [u32],
    /// Operand swizzle patterns
    pub swizzle: &'a [u32],
}

/// Hardware renderer
///
/// # Example
///
/// ```
/// use picarx::core::config::RendererConfig;
/// use picarx::core::gpu::{HwRenderer, SoftwareHost};
/// use picarx::core::memory::AddressSpaceKind;
///
/// let mut renderer = HwRenderer::new(SoftwareHost::new(), RendererConfig::default());
/// assert_eq!(renderer.notify_write(AddressSpaceKind::Physical, 0x1800_0000, 0x100), 0);
/// renderer.shutdown();
/// ```
pub struct HwRenderer<H: HostGpu> {
    host: H,
    cache: ResourceCache,
    pipeline: FramebufferCommitPipeline,
    presenter: DisplayPresenter,
    config: RendererConfig,
    bound: BoundResources,
}

impl<H: HostGpu> HwRenderer<H> {
    /// Create a renderer on `host`
    pub fn new(host: H, config: RendererConfig) -> Self {
        log::info!(
            "Hardware renderer initialized (filter: {:?}, invalidate on commit: {})",
            config.texture_filter,
            config.invalidate_on_commit
        );

        Self {
            host,
            cache: ResourceCache::with_filter(config.texture_filter),
            pipeline: FramebufferCommitPipeline::new(config.clear_pixel()),
            presenter: DisplayPresenter::new(),
            config,
            bound: BoundResources::default(),
        }
    }

    /// Prepare host state for a draw batch
    ///
    /// Switches the render target if the framebuffer registers changed,
    /// then binds a texture for each enabled unit and the vertex shader.
    ///
    /// # Arguments
    ///
    /// * `memory` - Emulated memory (read for textures, written by commits)
    /// * `regs` - Register snapshot for the batch
    /// * `shader` - Vertex shader program memory
    /// * `translator` - Shader translator used on a shader cache miss
    ///
    /// # Returns
    ///
    /// What changed about the render target
    pub fn begin_batch(
        &mut self,
        memory: &mut dyn EmulatedMemory,
        regs: &PicaRegisters,
        shader: ShaderMemory<'_>,
        translator: &mut dyn ShaderTranslator,
    ) -> Result<FramebufferChange> {
        let switched =
            self.pipeline
                .begin_frame(&mut self.host, memory, &regs.framebuffer.descriptor());
        self.invalidate_committed();
        let change = switched?;

        for (slot, unit) in self.bound.textures.iter_mut().zip(regs.textures.iter()) {
            *slot = if unit.enabled {
                Some(self.cache.acquire_texture(&mut self.host, memory, unit)?)
            } else {
                None
            };
        }

        let setup = ShaderSetup {
            main_offset: regs.vs_main_offset,
            program: shader.program,
            swizzle: shader.swizzle,
        };
        self.bound.shader = Some(self.cache.acquire_shader(&mut self.host, &setup, translator)?);

        Ok(change)
    }

    /// Invalidate cached resources after emulated memory was written
    ///
    /// # Returns
    ///
    /// Number of cached resources removed
    pub fn notify_write(&mut self, kind: AddressSpaceKind, start: u32, length: u32) -> usize {
        self.cache.invalidate(&mut self.host, kind, start, length)
    }

    /// Invalidate cached resources after a DMA copy into physical memory
    pub fn notify_dma_copy(&mut self, dest: u32, length: u32) -> usize {
        self.notify_write(AddressSpaceKind::Physical, dest, length)
    }

    /// Invalidate cached shaders after program words were uploaded
    ///
    /// # Arguments
    ///
    /// * `offset` - First uploaded word
    /// * `count` - Number of uploaded words
    pub fn notify_shader_upload(&mut self, offset: u32, count: u32) -> usize {
        self.notify_write(
            AddressSpaceKind::ShaderProgram,
            offset.saturating_mul(4),
            count.saturating_mul(4),
        )
    }

    /// Commit the render target before a display transfer reads it
    ///
    /// Only acts when `source` is the active colour buffer; the target is
    /// cleared after the commit.
    pub fn notify_pre_display_transfer(
        &mut self,
        memory: &mut dyn EmulatedMemory,
        source: u32,
    ) -> Result<()> {
        let committed = self
            .pipeline
            .commit_for_transfer(&mut self.host, memory, source);
        self.invalidate_committed();
        committed.map(|_| ())
    }

    /// Refresh both screens from emulated memory
    pub fn swap_buffers(
        &mut self,
        memory: &dyn EmulatedMemory,
        screens: &[ScreenFramebufferConfig; 2],
    ) -> Result<()> {
        self.presenter.refresh(&mut self.host, memory, screens)
    }

    /// Release every host resource
    pub fn shutdown(&mut self) {
        self.cache.flush_all(&mut self.host);
        self.pipeline.release(&mut self.host);
        self.presenter.release(&mut self.host);
        self.bound = BoundResources::default();
    }

    /// Resources bound by the last batch
    pub fn bound(&self) -> BoundResources {
        self.bound
    }

    /// Host texture of screen `index` (0 = top, 1 = bottom)
    pub fn screen_texture(&self, index: usize) -> Option<TextureHandle> {
        self.presenter.screen_texture(index)
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Borrow the resource cache
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Borrow the host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrow the host (e.g. to draw into the render target)
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Host texture of the active render target
    pub fn render_target(&self) -> Option<TextureHandle> {
        self.pipeline.target()
    }

    fn invalidate_committed(&mut self) {
        let Some(range) = self.pipeline.take_last_commit() else {
            return;
        };
        if self.config.invalidate_on_commit {
            self.cache.invalidate(
                &mut self.host,
                AddressSpaceKind::Physical,
                range.address,
                range.length,
            );
        }
    }
}

impl<H: HostGpu> Drop for HwRenderer<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
