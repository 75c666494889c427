// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source file handles and extension dispatch

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// How a module's content is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    /// Unknown pass-through file
    Resource,
    /// Non-UTF-8 pass-through file; content is a base64 data URL
    Binary,
    /// Plain text
    Text,
    /// JavaScript
    Js,
    /// JSON
    Json,
    /// CSS stylesheet
    Css,
    /// HTML page or fragment
    Html,
}

impl ModuleType {
    /// Detect the module type from a file extension (lowercased).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" | "inc" | "shtm" | "shtml" | "jsp" | "asp" | "php" | "aspx" | "tpl"
            | "template" => ModuleType::Html,
            "xml" | "cshtml" | "vbhtml" | "txt" | "text" | "md" | "log" => ModuleType::Text,
            "js" => ModuleType::Js,
            "json" | "map" => ModuleType::Json,
            "css" => ModuleType::Css,
            _ => ModuleType::Resource,
        }
    }

    /// Whether this kind of module is scanned for `__macro(...)` calls.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            ModuleType::Js | ModuleType::Css | ModuleType::Html | ModuleType::Text
        )
    }
}

/// A handle to one physical (or synthetic) source file.
///
/// The path is the module's identity in the graph; the raw bytes stay
/// available for inline-threshold checks and data-URL generation.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    data: Arc<[u8]>,
}

impl SourceFile {
    /// Create a file handle from raw bytes.
    pub fn new(path: PathBuf, data: Vec<u8>) -> Self {
        Self {
            path,
            data: data.into(),
        }
    }

    /// The file's path (graph identity).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file name, without directories.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// The directory the file lives in.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    /// Raw content bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Content size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The content as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// MIME type guessed from the extension.
    pub fn mime(&self) -> &'static str {
        mime_for_path(&self.path)
    }

    /// Resolve `url` (a relative file path) against this file's directory.
    pub fn resolve(&self, url: &str) -> PathBuf {
        normalize_path(&self.dir().join(url))
    }
}

/// Normalize `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Compute the relative URL that reaches `to` from the directory `from`.
///
/// Always uses forward slashes and a leading `./` for same-or-below
/// targets, the form expected inside emitted module names.
pub fn relative_url(from: &Path, to: &Path) -> String {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = String::new();
    for _ in common..from.len() {
        out.push_str("../");
    }
    if out.is_empty() {
        out.push_str("./");
    }
    let mut first = true;
    for comp in &to[common..] {
        if !first {
            out.push('/');
        }
        first = false;
        out.push_str(&comp.as_os_str().to_string_lossy());
    }
    out
}

/// MIME type for a file path, from the extension table.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" | "map" => "application/json",
        "txt" | "text" | "md" | "log" => "text/plain",
        "xml" => "text/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_type_from_path() {
        assert_eq!(ModuleType::from_path(Path::new("a.js")), ModuleType::Js);
        assert_eq!(ModuleType::from_path(Path::new("a.JSON")), ModuleType::Json);
        assert_eq!(ModuleType::from_path(Path::new("a.shtml")), ModuleType::Html);
        assert_eq!(ModuleType::from_path(Path::new("a.md")), ModuleType::Text);
        assert_eq!(ModuleType::from_path(Path::new("a.css")), ModuleType::Css);
        assert_eq!(ModuleType::from_path(Path::new("a.png")), ModuleType::Resource);
        assert_eq!(ModuleType::from_path(Path::new("noext")), ModuleType::Resource);
    }

    #[test]
    fn test_resolve_normalizes() {
        let file = SourceFile::new(PathBuf::from("/www/pages/index.html"), Vec::new());
        assert_eq!(file.resolve("../img/a.png"), PathBuf::from("/www/img/a.png"));
        assert_eq!(file.resolve("./b.html"), PathBuf::from("/www/pages/b.html"));
    }

    #[test]
    fn test_relative_url() {
        assert_eq!(
            relative_url(Path::new("/www"), Path::new("/www/b.js")),
            "./b.js"
        );
        assert_eq!(
            relative_url(Path::new("/www/pages"), Path::new("/www/img/a.png")),
            "../img/a.png"
        );
        assert_eq!(
            relative_url(Path::new("/www"), Path::new("/www/src/x.js")),
            "./src/x.js"
        );
    }
}
