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

//! GPU (PICA200) hardware renderer core
//!
//! This module translates the register-described state of the PICA200 GPU
//! into calls against a host graphics API. It is responsible for:
//! - Caching decoded textures and translated shaders on the host
//! - Invalidating cached resources when their source memory is written
//! - Writing rendered framebuffers back into emulated memory
//! - Uploading the two screen buffers for display
//!
//! # Memory Layout
//!
//! Textures and framebuffers are stored in 8×8 tiles. Tiles are laid out
//! row-major, and the pixels inside a tile follow a Morton (Z-order) curve:
//!
//! ```text
//!  x:   0  1  2  3  4  5  6  7
//! y=0:  0  1  4  5 16 17 20 21
//! y=1:  2  3  6  7 18 19 22 23
//! y=2:  8  9 12 13 24 25 28 29
//! y=3: 10 11 14 15 26 27 30 31
//! ```
//!
//! # Pixel Formats
//!
//! | Format | Bytes | Memory layout (little-endian)         |
//! |--------|-------|---------------------------------------|
//! | RGBA8  | 4     | `[a, b, g, r]`                        |
//! | RGB8   | 3     | `[b, g, r]`                           |
//! | RGB565 | 2     | `r5<<11 \| g6<<5 \| b5`               |
//! | RGB5A1 | 2     | `r5<<11 \| g5<<6 \| b5<<1 \| a1`      |
//! | RGBA4  | 2     | `r4<<12 \| g4<<8 \| b4<<4 \| a4`      |
//!
//! # References
//!
//! - [3DBrew: GPU](https://www.3dbrew.org/wiki/GPU)

mod cache;
mod framebuffer;
mod host;
mod pixel;
mod range_index;
mod registers;
mod renderer;
mod soft_host;
#[cfg(test)]
mod tests;

// Public re-exports
pub use cache::{CacheStats, CachedShader, CachedTexture, ResourceCache, ShaderTranslator};
pub use framebuffer::{
    CommittedRange, DisplayPresenter, FramebufferChange, FramebufferCommitPipeline,
};
pub use host::{HostGpu, ShaderHandle, TextureDesc, TextureHandle, TextureUsage};
pub use pixel::*;
pub use range_index::{ranges_overlap, AddressRangeIndex};
pub use registers::*;
pub use renderer::{BoundResources, HwRenderer, ShaderMemory};
pub use soft_host::{HostCounters, SoftwareHost};
