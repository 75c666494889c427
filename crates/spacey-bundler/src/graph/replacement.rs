// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Ordered, non-overlapping byte-range edits against a module's content

use crate::graph::module::ModuleId;

/// How a rewritten URL is re-encoded at emission time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlEncoder {
    /// Emit the URL text as-is (CSS `url()` arguments, bare macro calls)
    Raw,
    /// Emit as a quoted JavaScript string literal
    JsString(char),
    /// Emit as an HTML attribute value quoted by the given character
    HtmlAttr(char),
}

impl UrlEncoder {
    /// Encode `url` for the position it is written into.
    pub fn encode(self, url: &str) -> String {
        match self {
            UrlEncoder::Raw => url.to_string(),
            UrlEncoder::JsString(quote) => crate::strings::encode_string(url, quote),
            UrlEncoder::HtmlAttr(quote) => crate::strings::encode_attr(url, quote),
        }
    }
}

/// A deferred URL edit, evaluated against the emitting module at write
/// time (the emitted relative path depends on which bundle is written).
#[derive(Debug, Clone)]
pub struct UrlRewrite {
    /// The resolved module the URL points at
    pub target: ModuleId,
    /// Preserved `?...` part of the original URL
    pub query: String,
    /// Preserved `#...` part of the original URL
    pub hash: String,
    /// Original unaliased base when the alias table rewrote the path
    pub alias: Option<String>,
    /// Apply `url.postfix` (cleared by `?__postfix=0`)
    pub postfix: bool,
    /// Re-encoding applied to the built URL
    pub encoder: UrlEncoder,
}

/// The value spliced in place of a replaced range
#[derive(Debug, Clone)]
pub enum ReplacementData {
    /// A literal string
    Literal(String),
    /// A URL rebuilt against the emitting module
    Url(UrlRewrite),
    /// Another module's patched content, inlined verbatim
    Module(ModuleId),
}

/// One byte-range edit
#[derive(Debug, Clone)]
pub struct Replacement {
    /// Start byte index into the module content
    pub start: usize,
    /// End byte index (exclusive); `start == end` is a point insertion
    pub end: usize,
    /// The spliced value
    pub data: ReplacementData,
}

const NO_HIDDEN: usize = usize::MAX;

/// Ordered sequence of non-overlapping replacements.
///
/// Successive entries satisfy `prev.end <= next.start`. An edit that
/// would overlap an existing entry is silently dropped.
#[derive(Debug, Default)]
pub struct ReplacementList {
    items: Vec<Replacement>,
    last_end: usize,
    hidden_depth: usize,
    hidden_index: usize,
}

impl ReplacementList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            last_end: 0,
            hidden_depth: 0,
            hidden_index: NO_HIDDEN,
        }
    }

    /// The recorded replacements, in content order.
    pub fn items(&self) -> &[Replacement] {
        &self.items
    }

    /// Whether no replacement has been recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record an edit over `[start, end)`.
    ///
    /// Returns the insertion position, or `None` if the interval overlaps
    /// an existing entry (the edit is dropped and the list unchanged).
    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        data: ReplacementData,
        content_len: usize,
    ) -> Option<usize> {
        assert!(start <= end, "replacement interval reversed");
        assert!(end <= content_len, "replacement past end of content");

        if start >= self.last_end {
            self.items.push(Replacement { start, end, data });
            self.last_end = end;
            return Some(self.items.len() - 1);
        }

        // Back-scan for the last entry starting at or before `start`.
        let mut idx = self.items.len();
        while idx > 0 && self.items[idx - 1].start > start {
            idx -= 1;
        }
        if idx > 0 && start < self.items[idx - 1].end {
            return None;
        }
        if idx < self.items.len() && end > self.items[idx].start {
            return None;
        }
        self.items.insert(idx, Replacement { start, end, data });
        Some(idx)
    }

    /// Open a hidden region at `start`.
    ///
    /// The outermost open pushes a sentinel deletion running past the end
    /// of the content; it is closed by the matching [`end_hidden`].
    /// Nested regions only bump the depth counter.
    ///
    /// [`end_hidden`]: ReplacementList::end_hidden
    pub fn begin_hidden(&mut self, start: usize, content_len: usize) {
        self.hidden_depth += 1;
        if self.hidden_depth != 1 {
            return;
        }
        if start >= self.last_end {
            self.items.push(Replacement {
                start,
                end: content_len + 1,
                data: ReplacementData::Literal(String::new()),
            });
            self.hidden_index = self.items.len() - 1;
            self.last_end = content_len + 1;
        } else {
            // Overlapping open (already under an edit); track depth only.
            self.hidden_index = NO_HIDDEN;
        }
    }

    /// Close the innermost hidden region at `end`. Only the outermost
    /// close rewrites the sentinel's end index.
    pub fn end_hidden(&mut self, end: usize) {
        if self.hidden_depth == 0 {
            return;
        }
        self.hidden_depth -= 1;
        if self.hidden_depth != 0 || self.hidden_index == NO_HIDDEN {
            return;
        }
        let idx = self.hidden_index;
        self.hidden_index = NO_HIDDEN;
        let end = end.max(self.items[idx].start);
        self.items[idx].end = end;
        if idx == self.items.len() - 1 {
            self.last_end = end;
        }
    }

    /// Whether a hidden region is currently open.
    pub fn hidden_open(&self) -> bool {
        self.hidden_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> ReplacementData {
        ReplacementData::Literal(s.to_string())
    }

    #[test]
    fn test_append_in_order() {
        let mut list = ReplacementList::new();
        assert_eq!(list.replace(0, 2, lit("a"), 10), Some(0));
        assert_eq!(list.replace(2, 4, lit("b"), 10), Some(1));
        assert_eq!(list.replace(8, 10, lit("c"), 10), Some(2));
        assert_eq!(list.items().len(), 3);
    }

    #[test]
    fn test_overlap_rejected_state_unchanged() {
        let mut list = ReplacementList::new();
        list.replace(4, 8, lit("a"), 20);
        assert_eq!(list.replace(6, 10, lit("b"), 20), None);
        assert_eq!(list.replace(0, 5, lit("c"), 20), None);
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].start, 4);
        assert_eq!(list.items()[0].end, 8);
    }

    #[test]
    fn test_out_of_order_insert() {
        let mut list = ReplacementList::new();
        list.replace(10, 12, lit("b"), 20);
        assert_eq!(list.replace(0, 2, lit("a"), 20), Some(0));
        let starts: Vec<usize> = list.items().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 10]);
    }

    #[test]
    fn test_point_insertion_at_boundary() {
        let mut list = ReplacementList::new();
        // zero-width insertion followed by an adjacent deletion
        assert!(list.replace(5, 5, lit("inserted"), 20).is_some());
        assert!(list.replace(5, 9, lit(""), 20).is_some());
        assert_eq!(list.items().len(), 2);
    }

    #[test]
    fn test_successive_invariant() {
        let mut list = ReplacementList::new();
        list.replace(3, 6, lit("a"), 30);
        list.replace(0, 1, lit("b"), 30);
        list.replace(6, 6, lit("c"), 30);
        list.replace(10, 20, lit("d"), 30);
        for pair in list.items().windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_hidden_region_sentinel_closed() {
        let mut list = ReplacementList::new();
        list.begin_hidden(4, 20);
        // edits inside an open hidden region are dropped
        assert_eq!(list.replace(6, 8, lit("x"), 20), None);
        list.end_hidden(12);
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].start, 4);
        assert_eq!(list.items()[0].end, 12);
        // the range is free again after the close
        assert!(list.replace(12, 14, lit("y"), 20).is_some());
    }

    #[test]
    fn test_nested_hidden_regions_share_outermost() {
        let mut list = ReplacementList::new();
        list.begin_hidden(2, 20);
        list.begin_hidden(5, 20);
        list.end_hidden(8);
        assert!(list.hidden_open());
        list.end_hidden(15);
        assert!(!list.hidden_open());
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].start, 2);
        assert_eq!(list.items()[0].end, 15);
    }
}
