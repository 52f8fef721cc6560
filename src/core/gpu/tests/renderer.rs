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

//! Renderer facade scenarios

use crate::core::config::RendererConfig;
use crate::core::gpu::{
    FramebufferChange, FramebufferRegisters, HostGpu, HwRenderer, PicaRegisters, Rgba8,
    ScreenFramebufferConfig, ShaderMemory, ShaderTranslator, SoftwareHost, TextureRegisters,
};
use crate::core::memory::{AddressSpaceKind, EmulatedMemory, PhysicalMemory};
use crate::core::Result;

struct StubTranslator;

impl ShaderTranslator for StubTranslator {
    fn translate(&mut self, _program: &[u32], _swizzle: &[u32], main_offset: u32) -> Result<String> {
        Ok(format!("entry {}", main_offset))
    }
}

const PROGRAM: [u32; 32] = [0; 32];

fn shader_memory() -> ShaderMemory<'static> {
    ShaderMemory {
        program: &PROGRAM,
        swizzle: &[],
    }
}

fn memory() -> PhysicalMemory {
    let mut memory = PhysicalMemory::new();
    memory.map_region(0, vec![0u8; 0x1_0000]);
    memory
}

/// Render target at `fb` sampling an 8×8 RGBA8 texture at `tex`
fn registers(fb: u32, tex: u32) -> PicaRegisters {
    let texture = TextureRegisters {
        enabled: true,
        address: tex / 8,
        width: 8,
        height: 8,
        wrap_s: 0,
        wrap_t: 0,
        format: 0,
    };

    PicaRegisters {
        framebuffer: FramebufferRegisters {
            color_address: fb / 8,
            depth_address: 0x8000 / 8,
            color_format: 0,
            depth_format: 0,
            width: 8,
            height: 8,
        },
        textures: [texture, TextureRegisters::default(), TextureRegisters::default()],
        vs_main_offset: 0,
    }
}

#[test]
fn test_batch_binds_enabled_units() {
    let mut memory = memory();
    let mut renderer = HwRenderer::new(SoftwareHost::new(), RendererConfig::default());

    let change = renderer
        .begin_batch(&mut memory, &registers(0x1000, 0x4000), shader_memory(), &mut StubTranslator)
        .unwrap();
    assert_eq!(change, FramebufferChange::SWITCHED);

    let bound = renderer.bound();
    assert!(bound.textures[0].is_some());
    assert_eq!(bound.textures[1], None);
    assert_eq!(bound.textures[2], None);
    assert!(bound.shader.is_some());

    // Same state again: no host work beyond the first batch
    let before = renderer.host().counters();
    let change = renderer
        .begin_batch(&mut memory, &registers(0x1000, 0x4000), shader_memory(), &mut StubTranslator)
        .unwrap();
    assert!(change.is_empty());
    assert_eq!(renderer.host().counters(), before);
    assert_eq!(renderer.bound(), bound);
}

#[test]
fn test_render_to_texture_sees_committed_frame() {
    let mut memory = memory();
    let mut renderer = HwRenderer::new(SoftwareHost::new(), RendererConfig::default());
    let red = Rgba8::new(255, 0, 0, 255);

    // Pass 1 draws into 0x1000 while sampling it
    renderer
        .begin_batch(&mut memory, &registers(0x1000, 0x1000), shader_memory(), &mut StubTranslator)
        .unwrap();
    let stale = renderer.bound().textures[0].unwrap();
    let target = renderer.render_target().unwrap();
    renderer.host_mut().upload_texture(target, &[red; 64]).unwrap();

    // Pass 2 renders elsewhere, so pass 1 is committed and the texture reloaded
    let change = renderer
        .begin_batch(&mut memory, &registers(0x2000, 0x1000), shader_memory(), &mut StubTranslator)
        .unwrap();
    assert!(change.contains(FramebufferChange::COMMITTED));

    let fresh = renderer.bound().textures[0].unwrap();
    assert_ne!(fresh, stale);
    assert!(renderer
        .host()
        .texture_pixels(fresh)
        .unwrap()
        .iter()
        .all(|&p| p == red));
    assert_eq!(renderer.stats().invalidated, 1);
}

#[test]
fn test_commit_invalidation_can_be_disabled() {
    let mut memory = memory();
    let config = RendererConfig {
        invalidate_on_commit: false,
        ..RendererConfig::default()
    };
    let mut renderer = HwRenderer::new(SoftwareHost::new(), config);

    renderer
        .begin_batch(&mut memory, &registers(0x1000, 0x1000), shader_memory(), &mut StubTranslator)
        .unwrap();
    let stale = renderer.bound().textures[0].unwrap();
    renderer
        .begin_batch(&mut memory, &registers(0x2000, 0x1000), shader_memory(), &mut StubTranslator)
        .unwrap();

    assert_eq!(renderer.bound().textures[0], Some(stale));
    assert_eq!(renderer.stats().invalidated, 0);
}

#[test]
fn test_write_notifications() {
    let mut memory = memory();
    let mut renderer = HwRenderer::new(SoftwareHost::new(), RendererConfig::default());

    renderer
        .begin_batch(&mut memory, &registers(0x1000, 0x4000), shader_memory(), &mut StubTranslator)
        .unwrap();

    assert_eq!(renderer.notify_dma_copy(0x3000, 0x1000), 0);
    assert_eq!(renderer.notify_dma_copy(0x40F0, 0x10), 1);
    assert_eq!(renderer.notify_write(AddressSpaceKind::Physical, 0x40F0, 0x10), 0);

    // Program is 32 words; words 40.. are past it
    assert_eq!(renderer.notify_shader_upload(40, 4), 0);
    assert_eq!(renderer.notify_shader_upload(31, 1), 1);
    assert_eq!(renderer.cache().shader_count(), 0);
}

#[test]
fn test_pre_display_transfer_commits_active_buffer() {
    let mut memory = memory();
    let mut renderer = HwRenderer::new(SoftwareHost::new(), RendererConfig::default());

    renderer
        .begin_batch(&mut memory, &registers(0x1000, 0x4000), shader_memory(), &mut StubTranslator)
        .unwrap();
    let target = renderer.render_target().unwrap();
    renderer
        .host_mut()
        .upload_texture(target, &[Rgba8::new(1, 2, 3, 4); 64])
        .unwrap();

    // Another source address: nothing happens
    renderer.notify_pre_display_transfer(&mut memory, 0x2000).unwrap();
    assert_eq!(memory.slice(0x1000, 4), Some(&[0u8; 4][..]));

    renderer.notify_pre_display_transfer(&mut memory, 0x1000).unwrap();
    assert_eq!(memory.slice(0x1000, 4), Some(&[4, 3, 2, 1][..]));
    assert_eq!(
        renderer.host().texture_pixels(target).unwrap()[0],
        Rgba8::BLACK
    );
}

#[test]
fn test_swap_buffers_and_shutdown() {
    let mut memory = memory();
    let mut renderer = HwRenderer::new(SoftwareHost::new(), RendererConfig::default());

    renderer
        .begin_batch(&mut memory, &registers(0x1000, 0x4000), shader_memory(), &mut StubTranslator)
        .unwrap();

    let screen = ScreenFramebufferConfig {
        address_left1: 0x1000,
        width: 8,
        height: 8,
        ..Default::default()
    };
    renderer.swap_buffers(&memory, &[screen, screen]).unwrap();
    assert!(renderer.screen_texture(0).is_some());
    assert!(renderer.screen_texture(1).is_some());

    renderer.shutdown();
    assert_eq!(renderer.host().live_textures(), 0);
    assert_eq!(renderer.host().live_shaders(), 0);
    assert!(renderer.render_target().is_none());
}
