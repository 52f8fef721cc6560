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

//! Renderer configuration
//!
//! Stored as TOML:
//!
//! ```toml
//! texture_filter = "nearest"
//! clear_color = [0, 0, 0, 255]
//! invalidate_on_commit = true
//! ```
//!
//! Missing keys take their default values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::gpu::{FilterMode, Rgba8};

/// Renderer configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Filter applied to textures decoded from emulated memory
    pub texture_filter: FilterMode,

    /// Colour a render target is cleared to when it becomes active (RGBA)
    pub clear_color: [u8; 4],

    /// Invalidate cached textures that overlap a committed framebuffer
    pub invalidate_on_commit: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            texture_filter: FilterMode::Linear,
            clear_color: [0, 0, 0, 255],
            invalidate_on_commit: true,
        }
    }
}

impl RendererConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Clear colour as a pixel
    pub fn clear_pixel(&self) -> Rgba8 {
        Rgba8(self.clear_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EmulatorError;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("renderer.toml");

        let config = RendererConfig {
            texture_filter: FilterMode::Nearest,
            clear_color: [10, 20, 30, 40],
            invalidate_on_commit: false,
        };
        config.save(&path).unwrap();

        assert_eq!(RendererConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: RendererConfig = toml::from_str("texture_filter = \"nearest\"").unwrap();
        assert_eq!(config.texture_filter, FilterMode::Nearest);
        assert_eq!(config.clear_color, [0, 0, 0, 255]);
        assert!(config.invalidate_on_commit);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();

        let missing = RendererConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(EmulatorError::Io(_))));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "texture_filter = \"cubic\"").unwrap();
        assert!(matches!(
            RendererConfig::load(&path),
            Err(EmulatorError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_clear_pixel() {
        let config = RendererConfig::default();
        assert_eq!(config.clear_pixel(), Rgba8::BLACK);
    }
}
