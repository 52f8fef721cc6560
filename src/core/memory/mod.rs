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

//! Emulated memory as seen by the GPU core
//!
//! The GPU core never owns emulated memory. It reads texture and framebuffer
//! bytes through the [`EmulatedMemory`] trait and writes committed render
//! targets back through it. [`PhysicalMemory`] is a straightforward
//! implementation backed by owned buffers mapped at physical base addresses.
//!
//! # Example
//!
//! ```
//! use picarx::core::memory::{EmulatedMemory, PhysicalMemory};
//!
//! let mut memory = PhysicalMemory::console();
//!
//! memory.write_bytes(0x2000_0000, &[1, 2, 3, 4]).unwrap();
//!
//! let mut buf = [0u8; 4];
//! memory.read_bytes(0x2000_0000, &mut buf).unwrap();
//! assert_eq!(buf, [1, 2, 3, 4]);
//! ```

use crate::core::error::{EmulatorError, Result};

mod region;

pub use region::{
    identify_region, paddr_to_vaddr, physical_ranges, vaddr_to_paddr, AddressSpaceKind,
    MemoryRegion, FCRAM_PADDR, FCRAM_SIZE, LINEAR_HEAP_VADDR, VRAM_PADDR, VRAM_SIZE,
    VRAM_VADDR,
};

/// Emulated memory collaborator
///
/// Addresses are physical. Implementations must reject accesses that are not
/// fully contained in one mapped region.
pub trait EmulatedMemory {
    /// Borrow `len` bytes starting at `paddr` without copying
    ///
    /// # Returns
    ///
    /// `None` if the range is not fully mapped
    fn slice(&self, paddr: u32, len: usize) -> Option<&[u8]>;

    /// Write `src` starting at `paddr`
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::MemoryAccess`] if the range is not fully mapped
    fn write_bytes(&mut self, paddr: u32, src: &[u8]) -> Result<()>;

    /// Copy `dst.len()` bytes starting at `paddr` into `dst`
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::MemoryAccess`] if the range is not fully mapped
    fn read_bytes(&self, paddr: u32, dst: &mut [u8]) -> Result<()> {
        let src = self
            .slice(paddr, dst.len())
            .ok_or(EmulatorError::MemoryAccess {
                address: paddr,
                length: dst.len(),
            })?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// A contiguous block of emulated memory mapped at a physical base address
#[derive(Debug, Clone)]
struct MappedRegion {
    base: u32,
    data: Vec<u8>,
}

impl MappedRegion {
    /// Resolve `[paddr, paddr + len)` to a byte range inside this region
    fn range(&self, paddr: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = paddr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }
}

/// Physical memory backed by owned buffers
///
/// Regions must not overlap; the first region containing an access wins.
#[derive(Debug, Clone, Default)]
pub struct PhysicalMemory {
    regions: Vec<MappedRegion>,
}

impl PhysicalMemory {
    /// Create memory with no mapped regions
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory laid out like the console: VRAM and FCRAM, zero-filled
    pub fn console() -> Self {
        let mut memory = Self::new();
        memory.map_region(VRAM_PADDR, vec![0u8; VRAM_SIZE as usize]);
        memory.map_region(FCRAM_PADDR, vec![0u8; FCRAM_SIZE as usize]);
        memory
    }

    /// Map `data` at physical address `base`
    ///
    /// # Example
    ///
    /// ```
    /// use picarx::core::memory::{EmulatedMemory, PhysicalMemory};
    ///
    /// let mut memory = PhysicalMemory::new();
    /// memory.map_region(0x1000, vec![0xAA; 16]);
    /// assert_eq!(memory.slice(0x1008, 4), Some(&[0xAA; 4][..]));
    /// assert_eq!(memory.slice(0x100E, 4), None);
    /// ```
    pub fn map_region(&mut self, base: u32, data: Vec<u8>) {
        log::debug!(
            "Mapped {:#x} bytes of emulated memory at {:#010x}",
            data.len(),
            base
        );
        self.regions.push(MappedRegion { base, data });
    }

    /// Total mapped bytes
    pub fn mapped_size(&self) -> usize {
        self.regions.iter().map(|r| r.data.len()).sum()
    }
}

impl EmulatedMemory for PhysicalMemory {
    fn slice(&self, paddr: u32, len: usize) -> Option<&[u8]> {
        self.regions
            .iter()
            .find_map(|region| region.range(paddr, len).map(|r| &region.data[r]))
    }

    fn write_bytes(&mut self, paddr: u32, src: &[u8]) -> Result<()> {
        for region in &mut self.regions {
            if let Some(range) = region.range(paddr, src.len()) {
                region.data[range].copy_from_slice(src);
                return Ok(());
            }
        }

        Err(EmulatorError::MemoryAccess {
            address: paddr,
            length: src.len(),
        })
    }
}
