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

//! Address range index
//!
//! Tracks which cached resources are backed by which byte ranges of emulated
//! memory, so a memory write can find every resource it touches.
//!
//! # Overlap Rule
//!
//! Ranges are half-open. `[a0, a1)` and `[b0, b1)` overlap iff
//! `max(a0, b0) < min(a1, b1)`. Ranges that only touch (`a1 == b0`) do not
//! overlap, and an empty range overlaps nothing.
//!
//! # Example
//!
//! ```
//! use picarx::core::gpu::AddressRangeIndex;
//!
//! let mut index = AddressRangeIndex::new();
//! index.insert(1000, 4096, "texture");
//!
//! assert!(index.overlapping(5100, 100).is_empty());
//! assert_eq!(index.overlapping(900, 200), vec!["texture"]);
//! assert!(index.overlapping(5096, 10).is_empty()); // touching only
//! ```

use std::collections::BTreeMap;

/// Check whether two half-open byte ranges overlap
///
/// # Arguments
///
/// * `a_start`, `a_len` - First range `[a_start, a_start + a_len)`
/// * `b_start`, `b_len` - Second range `[b_start, b_start + b_len)`
///
/// Computed in 64-bit so ranges ending at the top of the 32-bit space do not
/// wrap.
#[inline]
pub fn ranges_overlap(a_start: u32, a_len: u32, b_start: u32, b_len: u32) -> bool {
    let max_lower = u64::from(a_start.max(b_start));
    let a_end = u64::from(a_start) + u64::from(a_len);
    let b_end = u64::from(b_start) + u64::from(b_len);
    max_lower < a_end.min(b_end)
}

/// One indexed range
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span<K> {
    len: u32,
    key: K,
}

/// Index from byte ranges of emulated memory to resource keys
///
/// Ranges are stored ordered by start address. The longest indexed range
/// bounds how far below a query's start an overlapping range can begin, so an
/// overlap query only visits starts in `(query_start - max_len, query_end)`.
#[derive(Debug, Clone)]
pub struct AddressRangeIndex<K> {
    /// Spans grouped by start address
    spans: BTreeMap<u32, Vec<Span<K>>>,
    /// Length of the longest span inserted since the index was last empty
    max_len: u32,
    /// Number of spans
    count: usize,
}

impl<K: Clone + PartialEq> AddressRangeIndex<K> {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            spans: BTreeMap::new(),
            max_len: 0,
            count: 0,
        }
    }

    /// Index `[start, start + len)` under `key`
    ///
    /// The same key may be indexed under several ranges.
    pub fn insert(&mut self, start: u32, len: u32, key: K) {
        self.spans.entry(start).or_default().push(Span { len, key });
        self.max_len = self.max_len.max(len);
        self.count += 1;
    }

    /// Remove the range starting at `start` indexed under `key`
    ///
    /// # Returns
    ///
    /// `true` if a range was removed
    pub fn remove(&mut self, start: u32, key: &K) -> bool {
        let Some(spans) = self.spans.get_mut(&start) else {
            return false;
        };

        let Some(pos) = spans.iter().position(|span| &span.key == key) else {
            return false;
        };

        spans.swap_remove(pos);
        if spans.is_empty() {
            self.spans.remove(&start);
        }
        self.count -= 1;
        true
    }

    /// Keys of every range overlapping `[start, start + len)`
    ///
    /// Keys are returned in start-address order.
    pub fn overlapping(&self, start: u32, len: u32) -> Vec<K> {
        if len == 0 || self.count == 0 {
            return Vec::new();
        }

        let query_end = u64::from(start) + u64::from(len);
        let lowest_start = start.saturating_sub(self.max_len);

        let mut keys = Vec::new();
        for (&span_start, spans) in self.spans.range(lowest_start..) {
            if u64::from(span_start) >= query_end {
                break;
            }
            keys.extend(
                spans
                    .iter()
                    .filter(|span| ranges_overlap(span_start, span.len, start, len))
                    .map(|span| span.key.clone()),
            );
        }
        keys
    }

    /// Remove and return the keys of every range overlapping `[start, start + len)`
    pub fn remove_overlapping(&mut self, start: u32, len: u32) -> Vec<K> {
        if len == 0 || self.count == 0 {
            return Vec::new();
        }

        let query_end = u64::from(start) + u64::from(len);
        let lowest_start = start.saturating_sub(self.max_len);

        let candidates: Vec<u32> = self
            .spans
            .range(lowest_start..)
            .map(|(&s, _)| s)
            .take_while(|&s| u64::from(s) < query_end)
            .collect();

        let mut removed = Vec::new();
        for span_start in candidates {
            let Some(spans) = self.spans.get_mut(&span_start) else {
                continue;
            };
            let before = spans.len();
            spans.retain(|span| {
                if ranges_overlap(span_start, span.len, start, len) {
                    removed.push(span.key.clone());
                    false
                } else {
                    true
                }
            });
            self.count -= before - spans.len();
            if spans.is_empty() {
                self.spans.remove(&span_start);
            }
        }

        if self.count == 0 {
            self.max_len = 0;
        }
        removed
    }

    /// Remove every range
    pub fn clear(&mut self) {
        self.spans.clear();
        self.max_len = 0;
        self.count = 0;
    }

    /// Number of indexed ranges
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<K: Clone + PartialEq> Default for AddressRangeIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
