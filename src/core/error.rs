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

//! Error types for the GPU core
//!
//! All fallible operations in the crate return [`Result<T>`], an alias for
//! `std::result::Result<T, EmulatorError>`.
//!
//! Unrecognized register values (unknown wrap modes or texture formats) are
//! *not* errors: the cache substitutes a default and reports the event through
//! the log. Only conditions the core cannot recover from locally surface here.

use thiserror::Error;

/// Errors raised by the GPU resource cache, the framebuffer pipeline and
/// their collaborators
#[derive(Error, Debug)]
pub enum EmulatorError {
    /// The render target's colour format has no defined memory encoding
    ///
    /// Raised at commit time; the affected frame's commit is aborted.
    #[error("unsupported framebuffer color format: {raw:#x}")]
    UnsupportedFramebufferFormat {
        /// Raw color format register value
        raw: u32,
    },

    /// The host graphics API could not allocate a resource
    #[error("host resource allocation failed: {0}")]
    HostAllocation(String),

    /// A host resource handle was used after it was released
    #[error("unknown host resource handle: {0}")]
    InvalidHandle(u32),

    /// An emulated memory access fell outside every mapped region
    #[error("emulated memory access out of range: address={address:#010x}, length={length:#x}")]
    MemoryAccess {
        /// Physical start address of the access
        address: u32,
        /// Length of the access in bytes
        length: usize,
    },

    /// Pixel buffer size does not match the declared image dimensions
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize {
        /// Expected size in bytes
        expected: usize,
        /// Actual size in bytes
        actual: usize,
    },

    /// Shader translation or host compilation failed
    #[error("shader error: {0}")]
    Shader(String),

    /// Host GPU readback failed
    #[error("host readback failed: {0}")]
    Readback(String),

    /// I/O error (config files, memory dumps)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Image encoding failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type alias for GPU core operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_message() {
        let err = EmulatorError::UnsupportedFramebufferFormat { raw: 7 };
        assert_eq!(err.to_string(), "unsupported framebuffer color format: 0x7");
    }

    #[test]
    fn test_memory_access_message() {
        let err = EmulatorError::MemoryAccess {
            address: 0x1000,
            length: 0x40,
        };
        assert_eq!(
            err.to_string(),
            "emulated memory access out of range: address=0x00001000, length=0x40"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EmulatorError = io.into();
        assert!(matches!(err, EmulatorError::Io(_)));
    }
}
