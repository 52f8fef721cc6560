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

//! wgpu rendering context
//!
//! The renderer core draws into offscreen textures and reads them back, so it
//! only needs a device and a queue. Presenting to a window is the embedding
//! application's concern.

use crate::core::error::{EmulatorError, Result};

/// wgpu rendering context without a surface
///
/// Manages the GPU device and queue shared by every host resource.
pub struct HeadlessContext {
    /// wgpu device for creating GPU resources
    pub device: wgpu::Device,
    /// Command queue for submitting GPU commands
    pub queue: wgpu::Queue,
    /// Information about the selected adapter
    pub adapter_info: wgpu::AdapterInfo,
}

impl HeadlessContext {
    /// Create a new headless context
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::HostAllocation`] if:
    /// - No suitable GPU adapter is found
    /// - Device creation fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// use picarx::frontend::renderer::HeadlessContext;
    ///
    /// let context = pollster::block_on(HeadlessContext::new()).unwrap();
    /// println!("{}", context.adapter_info.name);
    /// ```
    pub async fn new() -> Result<Self> {
        // Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| {
                EmulatorError::HostAllocation(format!("Failed to find suitable GPU adapter: {}", e))
            })?;

        // Request device and queue
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("PICARX Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| EmulatorError::HostAllocation(format!("Failed to create device: {}", e)))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Initialized headless wgpu context: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Create a new headless context, blocking until it is ready
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }
}
