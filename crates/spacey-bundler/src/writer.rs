// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Output sink with source-map composition and indentation

use rustc_hash::FxHashMap;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Where a piece of emitted text came from
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
    /// Source file the text originates in
    pub file: &'a Path,
    /// The source file's full content
    pub content: &'a str,
    /// Byte index of the text within `content`
    pub index: usize,
}

/// One recorded mapping segment
#[derive(Debug, Clone, Copy)]
struct Segment {
    gen_line: u32,
    gen_col: u32,
    source: u32,
    src_line: u32,
    src_col: u32,
}

/// Source map v3 builder
#[derive(Debug, Default)]
struct MapBuilder {
    sources: Vec<PathBuf>,
    source_index: FxHashMap<PathBuf, u32>,
    line_starts: Vec<Vec<usize>>,
    segments: Vec<Segment>,
}

impl MapBuilder {
    fn source_id(&mut self, file: &Path, content: &str) -> u32 {
        if let Some(&id) = self.source_index.get(file) {
            return id;
        }
        let id = self.sources.len() as u32;
        self.sources.push(file.to_path_buf());
        self.source_index.insert(file.to_path_buf(), id);
        let mut starts = vec![0];
        for (pos, byte) in content.bytes().enumerate() {
            if byte == b'\n' {
                starts.push(pos + 1);
            }
        }
        self.line_starts.push(starts);
        id
    }

    fn add(&mut self, gen_line: u32, gen_col: u32, origin: Origin) {
        let source = self.source_id(origin.file, origin.content);
        let starts = &self.line_starts[source as usize];
        let src_line = match starts.binary_search(&origin.index) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let src_col = (origin.index - starts[src_line]) as u32;
        self.segments.push(Segment {
            gen_line,
            gen_col,
            source,
            src_line: src_line as u32,
            src_col,
        });
    }

    fn render(&self, file: Option<&str>) -> String {
        let mut mappings = String::new();
        let mut line = 0u32;
        let mut prev_col = 0i64;
        let mut prev_source = 0i64;
        let mut prev_src_line = 0i64;
        let mut prev_src_col = 0i64;
        for seg in &self.segments {
            while line < seg.gen_line {
                mappings.push(';');
                line += 1;
                prev_col = 0;
            }
            if !mappings.is_empty() && !mappings.ends_with(';') {
                mappings.push(',');
            }
            encode_vlq(&mut mappings, seg.gen_col as i64 - prev_col);
            encode_vlq(&mut mappings, seg.source as i64 - prev_source);
            encode_vlq(&mut mappings, seg.src_line as i64 - prev_src_line);
            encode_vlq(&mut mappings, seg.src_col as i64 - prev_src_col);
            prev_col = seg.gen_col as i64;
            prev_source = seg.source as i64;
            prev_src_line = seg.src_line as i64;
            prev_src_col = seg.src_col as i64;
        }
        let sources: Vec<String> = self
            .sources
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        json!({
            "version": 3,
            "file": file,
            "sources": sources,
            "names": [],
            "mappings": mappings,
        })
        .to_string()
    }
}

const BASE64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// The output sink modules are emitted into.
///
/// Tracks the generated position, applies the current indent after each
/// newline, and records mapping segments when source maps are enabled.
#[derive(Debug)]
pub struct Writer {
    out: String,
    line: u32,
    col: u32,
    indent: String,
    pending_indent: bool,
    map: Option<MapBuilder>,
}

impl Writer {
    /// Create a writer; `source_map` enables mapping collection.
    pub fn new(source_map: bool) -> Self {
        Self {
            out: String::new(),
            line: 0,
            col: 0,
            indent: String::new(),
            pending_indent: false,
            map: source_map.then(MapBuilder::default),
        }
    }

    /// Whether this writer collects source mappings.
    pub fn has_source_map(&self) -> bool {
        self.map.is_some()
    }

    /// Append `text`, mapping its start back to `origin` when given.
    pub fn write(&mut self, text: &str, origin: Option<Origin>) {
        if text.is_empty() {
            return;
        }
        if self.pending_indent && !text.starts_with('\n') {
            let indent = std::mem::take(&mut self.indent);
            self.col += indent.chars().count() as u32;
            self.out.push_str(&indent);
            self.indent = indent;
            self.pending_indent = false;
        }
        if let (Some(map), Some(origin)) = (&mut self.map, origin) {
            map.add(self.line, self.col, origin);
        }
        let mut rest = text;
        while let Some(pos) = rest.find('\n') {
            self.out.push_str(&rest[..=pos]);
            self.line += 1;
            self.col = 0;
            rest = &rest[pos + 1..];
            if rest.is_empty() {
                self.pending_indent = !self.indent.is_empty();
                return;
            }
            if !self.indent.is_empty() {
                let indent = std::mem::take(&mut self.indent);
                self.col += indent.chars().count() as u32;
                self.out.push_str(&indent);
                self.indent = indent;
            }
        }
        self.out.push_str(rest);
        self.col += rest.chars().count() as u32;
        self.pending_indent = false;
    }

    /// Append plain text with no source mapping.
    pub fn write_str(&mut self, text: &str) {
        self.write(text, None);
    }

    /// Push an indentation unit applied after every following newline.
    pub fn indent(&mut self, unit: &str) {
        self.indent.push_str(unit);
        if self.col == 0 && !self.out.is_empty() {
            self.pending_indent = true;
        }
    }

    /// Pop the most recent indentation unit.
    pub fn unindent(&mut self, unit: &str) {
        let new_len = self.indent.len().saturating_sub(unit.len());
        self.indent.truncate(new_len);
    }

    /// The text produced so far.
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Finish, returning the output text and the rendered source map.
    pub fn finish(self, map_file: Option<&str>) -> (String, Option<String>) {
        let map = self.map.map(|m| m.render(map_file));
        (self.out, map)
    }
}
