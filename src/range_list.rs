// Copyright 2020 CoreOS, Inc.
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

//! Ordered list of coalescing byte ranges, used to record the regions of a
//! device that could not be read.  Forensic imagers copy the list into the
//! acquired image's metadata so unreadable regions stay identifiable.

/// A half-open byte range `[offset, offset + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: i64,
    pub size: u64,
}

impl ByteRange {
    fn end(&self) -> i64 {
        self.offset.saturating_add(self.size as i64)
    }
}

/// Sorted list of non-overlapping, non-touching byte ranges.  Appending a
/// range that overlaps or touches existing entries merges them into one.
#[derive(Debug, Clone, Default)]
pub struct RangeList {
    ranges: Vec<ByteRange>,
}

impl RangeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `[offset, offset + size)`, merging with any entry whose closed
    /// range touches or overlaps it.
    pub fn append(&mut self, offset: i64, size: u64) {
        if size == 0 {
            return;
        }
        let mut new = ByteRange { offset, size };

        // find the insertion window: entries strictly before the new range
        // stay, entries touching it are absorbed
        let start = self.ranges.partition_point(|r| r.end() < new.offset);
        let mut end = start;
        while end < self.ranges.len() && self.ranges[end].offset <= new.end() {
            let absorbed = &self.ranges[end];
            let merged_start = new.offset.min(absorbed.offset);
            let merged_end = new.end().max(absorbed.end());
            new.offset = merged_start;
            new.size = (merged_end - merged_start) as u64;
            end += 1;
        }
        self.ranges.splice(start..end, [new]);
    }

    pub fn get(&self, index: usize) -> Option<(i64, u64)> {
        self.ranges.get(index).map(|r| (r.offset, r.size))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether `offset` falls inside a recorded range.
    pub fn contains(&self, offset: i64) -> bool {
        let index = self.ranges.partition_point(|r| r.end() <= offset);
        match self.ranges.get(index) {
            Some(r) => r.offset <= offset,
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.ranges.iter().map(|r| (r.offset, r.size))
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}
