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

//! Memory region identification and address translation
//!
//! The console's memory is reachable both through physical addresses (what the
//! GPU registers hold) and through the application's virtual aliases of the
//! same bytes. Only the two GPU-visible windows are translated here:
//!
//! | Region | Physical range            | Virtual alias             |
//! |--------|---------------------------|---------------------------|
//! | VRAM   | 0x18000000-0x185FFFFF     | 0x1F000000-0x1F5FFFFF     |
//! | FCRAM  | 0x20000000-0x27FFFFFF     | 0x14000000-0x1BFFFFFF     |

/// Which address space an address or range is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpaceKind {
    /// Physical address (as programmed into GPU registers)
    Physical,
    /// Virtual alias used by the emulated CPU
    Virtual,
    /// Vertex shader program memory (byte offsets into the uploaded binary)
    ShaderProgram,
}

/// Memory region identification
///
/// Used to identify which memory window a physical address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Video RAM (6MB)
    Vram,
    /// Main FCRAM (128MB)
    Fcram,
    /// Not part of a GPU-visible window
    Unmapped,
}

/// VRAM physical base address
pub const VRAM_PADDR: u32 = 0x1800_0000;
/// VRAM size in bytes
pub const VRAM_SIZE: u32 = 0x0060_0000;
/// VRAM virtual alias base address
pub const VRAM_VADDR: u32 = 0x1F00_0000;

/// FCRAM physical base address
pub const FCRAM_PADDR: u32 = 0x2000_0000;
/// FCRAM size in bytes
pub const FCRAM_SIZE: u32 = 0x0800_0000;
/// Linear heap virtual alias of FCRAM
pub const LINEAR_HEAP_VADDR: u32 = 0x1400_0000;

/// Identify the GPU-visible window containing a physical address
///
/// # Example
///
/// ```
/// use picarx::core::memory::{identify_region, MemoryRegion};
///
/// assert_eq!(identify_region(0x1800_0000), MemoryRegion::Vram);
/// assert_eq!(identify_region(0x2000_1000), MemoryRegion::Fcram);
/// assert_eq!(identify_region(0x0000_1000), MemoryRegion::Unmapped);
/// ```
pub fn identify_region(paddr: u32) -> MemoryRegion {
    if (VRAM_PADDR..VRAM_PADDR + VRAM_SIZE).contains(&paddr) {
        MemoryRegion::Vram
    } else if (FCRAM_PADDR..FCRAM_PADDR + FCRAM_SIZE).contains(&paddr) {
        MemoryRegion::Fcram
    } else {
        MemoryRegion::Unmapped
    }
}

/// Translate a physical address to its virtual alias
///
/// # Returns
///
/// `None` if the address is outside the VRAM and FCRAM windows
pub fn paddr_to_vaddr(paddr: u32) -> Option<u32> {
    match identify_region(paddr) {
        MemoryRegion::Vram => Some(paddr - VRAM_PADDR + VRAM_VADDR),
        MemoryRegion::Fcram => Some(paddr - FCRAM_PADDR + LINEAR_HEAP_VADDR),
        MemoryRegion::Unmapped => None,
    }
}

/// Translate a virtual alias back to its physical address
///
/// # Returns
///
/// `None` if the address is not a virtual alias of a GPU-visible window
pub fn vaddr_to_paddr(vaddr: u32) -> Option<u32> {
    if (VRAM_VADDR..VRAM_VADDR + VRAM_SIZE).contains(&vaddr) {
        Some(vaddr - VRAM_VADDR + VRAM_PADDR)
    } else if (LINEAR_HEAP_VADDR..LINEAR_HEAP_VADDR + FCRAM_SIZE).contains(&vaddr) {
        Some(vaddr - LINEAR_HEAP_VADDR + FCRAM_PADDR)
    } else {
        None
    }
}

/// Virtual alias windows as `(virtual base, physical base, size)`
const ALIAS_WINDOWS: [(u32, u32, u32); 2] = [
    (VRAM_VADDR, VRAM_PADDR, VRAM_SIZE),
    (LINEAR_HEAP_VADDR, FCRAM_PADDR, FCRAM_SIZE),
];

/// Split `[start, start + length)` in the given space into physical ranges
///
/// A virtual range is clipped against every alias window and each clipped
/// piece is translated on its own, so a write crossing a window edge still
/// reaches the bytes inside the window. Bytes outside every window are
/// dropped. Physical and shader-program ranges pass through unchanged.
///
/// # Returns
///
/// `(start, length)` pairs in the physical space
///
/// # Example
///
/// ```
/// use picarx::core::memory::{physical_ranges, AddressSpaceKind};
///
/// let ranges = physical_ranges(AddressSpaceKind::Virtual, 0x13FF_FF00, 0x200);
/// assert_eq!(ranges, vec![(0x2000_0000, 0x100)]);
/// ```
pub fn physical_ranges(kind: AddressSpaceKind, start: u32, length: u32) -> Vec<(u32, u32)> {
    match kind {
        AddressSpaceKind::Physical | AddressSpaceKind::ShaderProgram => vec![(start, length)],
        AddressSpaceKind::Virtual => {
            let end = u64::from(start) + u64::from(length);
            ALIAS_WINDOWS
                .iter()
                .filter_map(|&(vbase, pbase, size)| {
                    let lo = u64::from(start).max(u64::from(vbase));
                    let hi = end.min(u64::from(vbase) + u64::from(size));
                    (lo < hi).then(|| (pbase + (lo - u64::from(vbase)) as u32, (hi - lo) as u32))
                })
                .collect()
        }
    }
}
