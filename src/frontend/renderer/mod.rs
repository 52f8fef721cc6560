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

//! wgpu rendering subsystem
//!
//! - [`HeadlessContext`]: wgpu device and queue without a window surface
//! - [`WgpuHost`]: [`HostGpu`](crate::core::gpu::HostGpu) on top of a context

mod context;
mod wgpu_host;

#[cfg(test)]
mod tests;

pub use context::HeadlessContext;
pub use wgpu_host::{
    address_mode, filter_mode, padded_bytes_per_row, strip_row_padding, texture_usages, WgpuHost,
};
