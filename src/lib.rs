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

//! picarx: PICA200 hardware renderer core
//!
//! This crate implements the host-side half of a PICA200 GPU emulator: it
//! turns register snapshots into cached host textures and shaders, keeps those
//! caches coherent with emulated memory writes, and moves framebuffers between
//! the console's tiled memory layout and the host's linear pixel buffers.
//!
//! # Architecture
//!
//! - [`core`]: Resource cache, pixel codec, commit pipeline, emulated memory
//! - [`frontend`]: wgpu implementation of the host graphics API
//!
//! # Example
//!
//! ```
//! use picarx::core::gpu::{decode_tiled, encode, tiled_image_size, PixelFormat, Rgba8};
//!
//! let format = PixelFormat::Rgb565;
//! let mut memory = vec![0u8; tiled_image_size(8, 8, format)];
//!
//! // Pixel (1, 1) is the fourth pixel of the first tile
//! encode(Rgba8::new(255, 0, 0, 255), format, &mut memory[3 * 2..]);
//! assert_eq!(decode_tiled(&memory, 1, 1, 8, format), Rgba8::new(255, 0, 0, 255));
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, EmulatorError>`.

pub mod core;
pub mod frontend;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
