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

//! Framebuffer commit and display refresh
//!
//! Draws land in a host render target, but the emulated program expects them
//! in emulated memory: it may sample the result as a texture, copy it with a
//! display transfer or scan it out. Whenever the render target is switched
//! the previous one is read back, re-encoded into the hardware's tiled
//! layout and written to its colour address.
//!
//! The reverse direction is [`DisplayPresenter`]: once per presented frame
//! the two screen buffers are decoded from emulated memory and uploaded to
//! host textures.
//!
//! # Lifecycle
//!
//! ```text
//!  Idle ──begin_frame──▶ Active(d0) ──begin_frame(d1 != d0)──▶ Active(d1)
//!                          │   commit d0's target to d0.color_address
//!                          └── same descriptor: no-op
//! ```
//!
//! Depth buffers are not written back.

use bitflags::bitflags;

use super::host::{HostGpu, TextureDesc, TextureHandle};
use super::pixel::{decode_image_pitched, encode_image, tiled_image_size, PixelFormat, Rgba8};
use super::registers::{FramebufferDescriptor, ScreenFramebufferConfig};
use crate::core::error::{EmulatorError, Result};
use crate::core::memory::EmulatedMemory;

bitflags! {
    /// What changed at the start of a batch
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FramebufferChange: u32 {
        /// A different render target became active
        const SWITCHED = 1 << 0;
        /// The host target was reallocated at a new size
        const RESIZED = 1 << 1;
        /// The colour format changed
        const FORMAT_CHANGED = 1 << 2;
        /// The previous target was written to emulated memory
        const COMMITTED = 1 << 3;
    }
}

/// Emulated memory written by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedRange {
    /// Physical start address
    pub address: u32,
    /// Length in bytes
    pub length: u32,
}

/// Render target lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    /// No render target has been configured yet
    Idle,
    /// `target` holds the draws for `descriptor`
    Active {
        descriptor: FramebufferDescriptor,
        target: TextureHandle,
    },
}

/// Keeps emulated memory in sync with the host render target
#[derive(Debug)]
pub struct FramebufferCommitPipeline {
    state: PipelineState,

    /// Colour the render target is cleared to
    clear_color: Rgba8,

    /// Readback scratch buffer, reused across commits
    readback: Vec<Rgba8>,

    /// Range written by the most recent commit, until taken
    last_commit: Option<CommittedRange>,
}

impl FramebufferCommitPipeline {
    /// Create an idle pipeline
    ///
    /// # Arguments
    ///
    /// * `clear_color` - Colour a render target is cleared to when it becomes active
    pub fn new(clear_color: Rgba8) -> Self {
        Self {
            state: PipelineState::Idle,
            clear_color,
            readback: Vec::new(),
            last_commit: None,
        }
    }

    /// Descriptor of the active render target, if any
    pub fn active_descriptor(&self) -> Option<FramebufferDescriptor> {
        match self.state {
            PipelineState::Idle => None,
            PipelineState::Active { descriptor, .. } => Some(descriptor),
        }
    }

    /// Host texture of the active render target, if any
    pub fn target(&self) -> Option<TextureHandle> {
        match self.state {
            PipelineState::Idle => None,
            PipelineState::Active { target, .. } => Some(target),
        }
    }

    /// Make `descriptor` the active render target
    ///
    /// The first call allocates and clears a target without committing. A
    /// later call with a different descriptor commits the current target to
    /// its colour address, reallocates the host target if the size or format
    /// changed, and clears it. The new descriptor becomes active even if the
    /// commit fails; the commit error is returned afterwards.
    ///
    /// # Arguments
    ///
    /// * `host` - Host graphics API
    /// * `memory` - Emulated memory receiving the commit
    /// * `descriptor` - Render target configured for the coming batch
    ///
    /// # Returns
    ///
    /// What changed (empty if `descriptor` is already active)
    pub fn begin_frame(
        &mut self,
        host: &mut dyn HostGpu,
        memory: &mut dyn EmulatedMemory,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferChange> {
        let (previous, target) = match self.state {
            PipelineState::Idle => {
                let target = host.create_texture(&TextureDesc::render_target(
                    descriptor.width,
                    descriptor.height,
                ))?;
                host.clear_texture(target, self.clear_color)?;
                self.state = PipelineState::Active {
                    descriptor: *descriptor,
                    target,
                };
                log::debug!(
                    "Render target activated at {:#010x} ({}x{})",
                    descriptor.color_address,
                    descriptor.width,
                    descriptor.height
                );
                return Ok(FramebufferChange::SWITCHED);
            }
            PipelineState::Active {
                descriptor: previous,
                target,
            } => (previous, target),
        };

        if previous == *descriptor {
            return Ok(FramebufferChange::empty());
        }

        let mut change = FramebufferChange::SWITCHED;
        let committed = self.commit_target(host, memory, &previous, target);
        if matches!(committed, Ok(Some(_))) {
            change |= FramebufferChange::COMMITTED;
        }

        let resized = previous.width != descriptor.width || previous.height != descriptor.height;
        let reformatted = previous.color_format != descriptor.color_format;
        if resized {
            change |= FramebufferChange::RESIZED;
        }
        if reformatted {
            change |= FramebufferChange::FORMAT_CHANGED;
        }

        let target = if resized || reformatted {
            host.delete_texture(target);
            match host.create_texture(&TextureDesc::render_target(
                descriptor.width,
                descriptor.height,
            )) {
                Ok(target) => target,
                Err(e) => {
                    self.state = PipelineState::Idle;
                    return Err(e);
                }
            }
        } else {
            target
        };

        self.state = PipelineState::Active {
            descriptor: *descriptor,
            target,
        };
        host.clear_texture(target, self.clear_color)?;

        log::debug!(
            "Render target switched {:#010x} -> {:#010x} ({:?})",
            previous.color_address,
            descriptor.color_address,
            change
        );

        committed?;
        Ok(change)
    }

    /// Write the active render target to its colour address
    ///
    /// # Returns
    ///
    /// The written range, or `None` if no target is active
    ///
    /// # Errors
    ///
    /// - [`EmulatorError::UnsupportedFramebufferFormat`] if the colour format
    ///   has no memory encoding; nothing is written
    /// - [`EmulatorError::MemoryAccess`] if the colour buffer is not mapped
    pub fn commit_framebuffer(
        &mut self,
        host: &mut dyn HostGpu,
        memory: &mut dyn EmulatedMemory,
    ) -> Result<Option<CommittedRange>> {
        match self.state {
            PipelineState::Idle => Ok(None),
            PipelineState::Active { descriptor, target } => {
                self.commit_target(host, memory, &descriptor, target)
            }
        }
    }

    /// Commit and clear the active target if a display transfer reads it
    ///
    /// Transfers from any other address leave the target untouched; its
    /// draws are still committed on the next switch.
    ///
    /// # Arguments
    ///
    /// * `source` - Physical source address of the transfer
    ///
    /// # Returns
    ///
    /// The written range, or `None` if `source` is not the active colour buffer
    pub fn commit_for_transfer(
        &mut self,
        host: &mut dyn HostGpu,
        memory: &mut dyn EmulatedMemory,
        source: u32,
    ) -> Result<Option<CommittedRange>> {
        let PipelineState::Active { descriptor, target } = self.state else {
            return Ok(None);
        };
        if descriptor.color_address != source {
            return Ok(None);
        }

        let committed = self.commit_target(host, memory, &descriptor, target)?;
        host.clear_texture(target, self.clear_color)?;
        Ok(committed)
    }

    /// Take the range written by the most recent commit
    ///
    /// Includes commits made implicitly by [`Self::begin_frame`].
    pub fn take_last_commit(&mut self) -> Option<CommittedRange> {
        self.last_commit.take()
    }

    /// Release the host render target and return to idle
    pub fn release(&mut self, host: &mut dyn HostGpu) {
        if let PipelineState::Active { target, .. } = self.state {
            host.delete_texture(target);
        }
        self.state = PipelineState::Idle;
    }

    fn commit_target(
        &mut self,
        host: &mut dyn HostGpu,
        memory: &mut dyn EmulatedMemory,
        descriptor: &FramebufferDescriptor,
        target: TextureHandle,
    ) -> Result<Option<CommittedRange>> {
        let Some(format) = descriptor.pixel_format() else {
            log::error!(
                "Cannot commit framebuffer at {:#010x}: unsupported color format {:#x}",
                descriptor.color_address,
                descriptor.color_format
            );
            return Err(EmulatorError::UnsupportedFramebufferFormat {
                raw: descriptor.color_format,
            });
        };

        let (width, height) = (descriptor.width, descriptor.height);
        if width == 0 || height == 0 {
            return Ok(None);
        }

        host.read_texture(target, &mut self.readback)?;
        let expected = width as usize * height as usize;
        if self.readback.len() != expected {
            return Err(EmulatorError::BufferSize {
                expected: expected * 4,
                actual: self.readback.len() * 4,
            });
        }

        // Seeded from memory so padding bytes of partial tiles survive
        let mut buffer = vec![0u8; tiled_image_size(width, height, format)];
        memory.read_bytes(descriptor.color_address, &mut buffer)?;
        encode_image(&self.readback, width, height, format, &mut buffer);
        memory.write_bytes(descriptor.color_address, &buffer)?;

        log::trace!(
            "Committed {}x{} {:?} framebuffer to {:#010x} ({:#x} bytes)",
            width,
            height,
            format,
            descriptor.color_address,
            buffer.len()
        );
        log::trace!(
            "Depth buffer at {:#010x} not committed",
            descriptor.depth_address
        );

        let range = CommittedRange {
            address: descriptor.color_address,
            length: buffer.len() as u32,
        };
        self.last_commit = Some(range);
        Ok(Some(range))
    }
}

/// Host texture holding one screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenTexture {
    handle: TextureHandle,
    width: u32,
    height: u32,
    format: PixelFormat,
}

/// Uploads the two screen framebuffers from emulated memory
#[derive(Debug, Default)]
pub struct DisplayPresenter {
    /// Top and bottom screen
    screens: [Option<ScreenTexture>; 2],

    /// Unknown LCD formats replaced by RGBA8
    format_fallbacks: u64,
}

impl DisplayPresenter {
    /// Create a presenter with no screen textures
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-upload both screens
    ///
    /// A screen's host texture is reallocated when its width, height or
    /// format changes. Unknown LCD formats are decoded as RGBA8.
    ///
    /// # Arguments
    ///
    /// * `host` - Host graphics API
    /// * `memory` - Emulated memory holding the screen buffers
    /// * `screens` - Top and bottom screen configuration
    pub fn refresh(
        &mut self,
        host: &mut dyn HostGpu,
        memory: &dyn EmulatedMemory,
        screens: &[ScreenFramebufferConfig; 2],
    ) -> Result<()> {
        for (index, config) in screens.iter().enumerate() {
            self.refresh_screen(host, memory, index, config)?;
        }
        Ok(())
    }

    /// Host texture for screen `index` (0 = top, 1 = bottom)
    pub fn screen_texture(&self, index: usize) -> Option<TextureHandle> {
        self.screens.get(index).copied().flatten().map(|s| s.handle)
    }

    /// Number of unknown LCD formats replaced by RGBA8
    pub fn format_fallbacks(&self) -> u64 {
        self.format_fallbacks
    }

    /// Release both screen textures
    pub fn release(&mut self, host: &mut dyn HostGpu) {
        for screen in self.screens.iter_mut() {
            if let Some(texture) = screen.take() {
                host.delete_texture(texture.handle);
            }
        }
    }

    fn refresh_screen(
        &mut self,
        host: &mut dyn HostGpu,
        memory: &dyn EmulatedMemory,
        index: usize,
        config: &ScreenFramebufferConfig,
    ) -> Result<()> {
        let format = match PixelFormat::from_lcd_raw(config.color_format) {
            Some(format) => format,
            None => {
                log::error!(
                    "Unknown LCD color format {:#x} on screen {}, decoding as RGBA8",
                    config.color_format,
                    index
                );
                self.format_fallbacks += 1;
                PixelFormat::Rgba8
            }
        };

        if config.width == 0 || config.height == 0 {
            if let Some(texture) = self.screens[index].take() {
                host.delete_texture(texture.handle);
            }
            return Ok(());
        }

        let wanted = (config.width, config.height, format);
        let current = self.screens[index];
        let handle = match current {
            Some(texture) if (texture.width, texture.height, texture.format) == wanted => {
                texture.handle
            }
            existing => {
                if let Some(texture) = existing {
                    host.delete_texture(texture.handle);
                    self.screens[index] = None;
                }
                let handle =
                    host.create_texture(&TextureDesc::display(config.width, config.height))?;
                log::debug!(
                    "Screen {} texture allocated ({}x{} {:?})",
                    index,
                    config.width,
                    config.height,
                    format
                );
                self.screens[index] = Some(ScreenTexture {
                    handle,
                    width: config.width,
                    height: config.height,
                    format,
                });
                handle
            }
        };

        let address = config.active_address();
        let pitch = config.row_pixels(format.bytes_per_pixel());
        let size = tiled_image_size(pitch, config.height, format);
        let data = memory
            .slice(address, size)
            .ok_or(EmulatorError::MemoryAccess {
                address,
                length: size,
            })?;

        let pixels = decode_image_pitched(data, config.width, config.height, pitch, format, false);
        host.upload_texture(handle, &pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpu::soft_host::SoftwareHost;
    use crate::core::memory::PhysicalMemory;

    fn descriptor(address: u32, format: u32, width: u32, height: u32) -> FramebufferDescriptor {
        FramebufferDescriptor {
            color_address: address,
            depth_address: 0,
            color_format: format,
            depth_format: 0,
            width,
            height,
        }
    }

    fn memory() -> PhysicalMemory {
        let mut memory = PhysicalMemory::new();
        memory.map_region(0, vec![0u8; 0x4_0000]);
        memory
    }

    #[test]
    fn test_first_frame_allocates_without_commit() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);

        let change = pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 8, 8))
            .unwrap();

        assert_eq!(change, FramebufferChange::SWITCHED);
        assert_eq!(host.counters().readbacks, 0);
        assert_eq!(host.counters().clears, 1);
        assert!(pipeline.target().is_some());
    }

    #[test]
    fn test_same_descriptor_is_noop() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);
        let desc = descriptor(0x1000, 0, 8, 8);

        pipeline.begin_frame(&mut host, &mut memory, &desc).unwrap();
        let before = host.counters();
        let change = pipeline.begin_frame(&mut host, &mut memory, &desc).unwrap();

        assert!(change.is_empty());
        assert_eq!(host.counters(), before);
    }

    #[test]
    fn test_switch_commits_previous_target() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);

        pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 3, 8, 8))
            .unwrap();
        let target = pipeline.target().unwrap();
        host.upload_texture(target, &[Rgba8::new(255, 255, 255, 255); 64])
            .unwrap();

        let change = pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x2000, 3, 8, 8))
            .unwrap();

        assert_eq!(change, FramebufferChange::SWITCHED | FramebufferChange::COMMITTED);
        assert_eq!(pipeline.target(), Some(target));
        assert_eq!(memory.slice(0x1000, 128), Some(&[0xFF; 128][..]));
        assert_eq!(memory.slice(0x2000, 2), Some(&[0, 0][..]));
        assert_eq!(
            pipeline.take_last_commit(),
            Some(CommittedRange {
                address: 0x1000,
                length: 128
            })
        );
        assert_eq!(pipeline.take_last_commit(), None);
        assert_eq!(host.texture_pixels(target), Some(&[Rgba8::BLACK; 64][..]));
    }

    #[test]
    fn test_resize_reallocates_target() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);

        pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 8, 8))
            .unwrap();
        let change = pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 16, 8))
            .unwrap();

        assert!(change.contains(FramebufferChange::RESIZED));
        assert!(!change.contains(FramebufferChange::FORMAT_CHANGED));
        assert_eq!(host.live_textures(), 1);
        let target = pipeline.target().unwrap();
        assert_eq!(host.texture_desc(target).map(|d| d.width), Some(16));
    }

    #[test]
    fn test_failed_reallocation_returns_to_idle() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);

        pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 8, 8))
            .unwrap();

        host.set_texture_limit(Some(0));
        let result = pipeline.begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 16, 8));

        assert!(matches!(result, Err(EmulatorError::HostAllocation(_))));
        assert_eq!(pipeline.active_descriptor(), None);
        assert_eq!(pipeline.target(), None);
        assert_eq!(host.live_textures(), 0);

        // Recovers once the host can allocate again
        host.set_texture_limit(None);
        let change = pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 16, 8))
            .unwrap();
        assert_eq!(change, FramebufferChange::SWITCHED);
        assert_eq!(host.live_textures(), 1);
    }

    #[test]
    fn test_unsupported_format_aborts_commit() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);

        pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 6, 8, 8))
            .unwrap();
        let result = pipeline.begin_frame(&mut host, &mut memory, &descriptor(0x2000, 0, 8, 8));

        assert!(matches!(
            result,
            Err(EmulatorError::UnsupportedFramebufferFormat { raw: 6 })
        ));
        // Nothing written, but the new target is active
        assert_eq!(memory.slice(0x1000, 4), Some(&[0u8; 4][..]));
        assert_eq!(
            pipeline.active_descriptor().map(|d| d.color_address),
            Some(0x2000)
        );
    }

    #[test]
    fn test_commit_when_idle() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);
        assert_eq!(pipeline.commit_framebuffer(&mut host, &mut memory).unwrap(), None);
    }

    #[test]
    fn test_commit_for_transfer_matches_source() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::TRANSPARENT);

        pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 8, 8))
            .unwrap();

        assert_eq!(
            pipeline
                .commit_for_transfer(&mut host, &mut memory, 0x3000)
                .unwrap(),
            None
        );
        assert_eq!(
            pipeline
                .commit_for_transfer(&mut host, &mut memory, 0x1000)
                .unwrap(),
            Some(CommittedRange {
                address: 0x1000,
                length: 256
            })
        );
    }

    #[test]
    fn test_release() {
        let mut host = SoftwareHost::new();
        let mut memory = memory();
        let mut pipeline = FramebufferCommitPipeline::new(Rgba8::BLACK);

        pipeline
            .begin_frame(&mut host, &mut memory, &descriptor(0x1000, 0, 8, 8))
            .unwrap();
        pipeline.release(&mut host);

        assert_eq!(host.live_textures(), 0);
        assert!(pipeline.active_descriptor().is_none());
    }

    #[test]
    fn test_display_reallocates_on_change() {
        let mut host = SoftwareHost::new();
        let memory = memory();
        let mut presenter = DisplayPresenter::new();

        let mut screens = [
            ScreenFramebufferConfig {
                address_left1: 0x1000,
                width: 8,
                height: 8,
                ..Default::default()
            },
            ScreenFramebufferConfig {
                address_left1: 0x8000,
                width: 8,
                height: 8,
                color_format: 2,
                ..Default::default()
            },
        ];

        presenter.refresh(&mut host, &memory, &screens).unwrap();
        let top = presenter.screen_texture(0).unwrap();
        presenter.refresh(&mut host, &memory, &screens).unwrap();
        assert_eq!(presenter.screen_texture(0), Some(top));
        assert_eq!(host.counters().textures_created, 2);
        assert_eq!(host.counters().uploads, 4);

        screens[0].color_format = 1;
        presenter.refresh(&mut host, &memory, &screens).unwrap();
        assert_ne!(presenter.screen_texture(0), Some(top));
        assert_eq!(host.live_textures(), 2);

        presenter.release(&mut host);
        assert_eq!(host.live_textures(), 0);
    }

    #[test]
    fn test_display_unknown_format_falls_back() {
        let mut host = SoftwareHost::new();
        let memory = memory();
        let mut presenter = DisplayPresenter::new();

        let screen = ScreenFramebufferConfig {
            address_left1: 0x1000,
            width: 8,
            height: 8,
            color_format: 5,
            ..Default::default()
        };
        presenter
            .refresh(&mut host, &memory, &[screen, ScreenFramebufferConfig::default()])
            .unwrap();

        assert_eq!(presenter.format_fallbacks(), 1);
        assert!(presenter.screen_texture(0).is_some());
        assert!(presenter.screen_texture(1).is_none());
    }
}
