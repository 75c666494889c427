// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Option tree, deep merging and per-file overrides

use crate::diagnostics::Action;
use crate::error::{BundlerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Module-emission dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Plain concatenation for direct browser consumption
    #[default]
    Browser,
    /// Node.js; native modules are provided by the host
    NodeJs,
    /// Tpack CMD loader (`__tpack__.define`)
    Tpack,
    /// RequireJS AMD
    RequireJs,
}

impl Target {
    /// Parse a target name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "browser" => Some(Target::Browser),
            "nodejs" => Some(Target::NodeJs),
            "tpack" => Some(Target::Tpack),
            "requirejs" => Some(Target::RequireJs),
            _ => None,
        }
    }
}

/// URL resolution options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Path alias table, longest prefix wins
    pub alias: BTreeMap<String, String>,
    /// Extensions probed in order; `None` picks the target default
    pub extensions: Option<Vec<String>>,
    /// Package directories walked for bare specifiers
    pub modules_directories: Option<Vec<String>>,
    /// package.json fields consulted for a package entry point
    pub package_mains: Option<Vec<String>>,
    /// Absolute roots probed as a last resort for bare specifiers
    pub root: Vec<PathBuf>,
    /// Enable CommonJS-style search for `require` usage
    pub common_js: Option<bool>,
    /// Enable the native-module shim table
    pub native: bool,
    /// What to do when a URL cannot be resolved
    pub not_found: Option<Action>,
    /// What to do when a network URL appears in a local-only position
    pub non_local: Option<Action>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            alias: BTreeMap::new(),
            extensions: None,
            modules_directories: None,
            package_mains: None,
            root: Vec::new(),
            common_js: None,
            native: true,
            not_found: None,
            non_local: None,
        }
    }
}

impl ResolveOptions {
    /// Extensions probed for `target`, in order. An empty entry means
    /// "the path as written".
    pub fn extensions_for(&self, target: Target) -> Vec<String> {
        if let Some(exts) = &self.extensions {
            return exts.clone();
        }
        match target {
            Target::NodeJs => vec!["".into(), ".node".into(), ".json".into(), ".js".into()],
            _ => vec![
                "".into(),
                ".json".into(),
                ".js".into(),
                ".css".into(),
                ".tpl".into(),
            ],
        }
    }

    /// Package directory names walked for `target`.
    pub fn modules_directories_for(&self, target: Target) -> Vec<String> {
        if let Some(dirs) = &self.modules_directories {
            return dirs.clone();
        }
        match target {
            Target::NodeJs => vec!["node_modules".into()],
            _ => vec!["web_modules".into(), "node_modules".into()],
        }
    }

    /// package.json fields consulted for `target`, first string field wins.
    pub fn package_mains_for(&self, target: Target) -> Vec<String> {
        if let Some(mains) = &self.package_mains {
            return mains.clone();
        }
        match target {
            Target::NodeJs => vec!["main".into()],
            _ => vec![
                "browser".into(),
                "web".into(),
                "browserify".into(),
                "main".into(),
            ],
        }
    }

    /// The not-found action; inline references downgrade to warnings.
    pub fn not_found_action(&self, inline: bool) -> Action {
        self.not_found
            .unwrap_or(if inline { Action::Warning } else { Action::Error })
    }

    /// The non-local action.
    pub fn non_local_action(&self) -> Action {
        self.non_local.unwrap_or(Action::Error)
    }
}

/// Inline-as-data-URI limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InlineLimit {
    /// Inline everything (`true`) or nothing (`false`)
    Enabled(bool),
    /// Inline files up to this many bytes
    Limit(u64),
}

impl Default for InlineLimit {
    fn default() -> Self {
        InlineLimit::Enabled(false)
    }
}

impl InlineLimit {
    /// Whether a file of `size` bytes should be inlined.
    pub fn allows(self, size: usize) -> bool {
        match self {
            InlineLimit::Enabled(enabled) => enabled,
            InlineLimit::Limit(limit) => size as u64 <= limit,
        }
    }
}

/// URL emission options
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct UrlOptions {
    /// Inline threshold for data-URL-capable references
    pub inline: InlineLimit,
    /// Appended to every rewritten URL (cache busting); suppressed by
    /// `?__postfix=0`
    pub postfix: Option<String>,
    /// Public-path alias table applied to emitted URLs
    pub public: BTreeMap<String, String>,
}

/// Disposition of `@import` statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CssImport {
    /// Leave the statement untouched
    None,
    /// Rewrite the imported URL only
    Url,
    /// Pull the imported sheet into the bundle and delete the statement
    #[default]
    Inline,
    /// Splice whatever the session's `css_import` hook returns for the
    /// statement
    Function,
}

impl Serialize for CssImport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let name = match self {
            CssImport::None => "none",
            CssImport::Url => "url",
            CssImport::Inline => "inline",
            CssImport::Function => "function",
        };
        serializer.serialize_str(name)
    }
}

impl<'de> Deserialize<'de> for CssImport {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Name(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Flag(false) => Ok(CssImport::None),
            Repr::Flag(true) => Ok(CssImport::Inline),
            Repr::Name(name) => match name.as_str() {
                "none" => Ok(CssImport::None),
                "url" => Ok(CssImport::Url),
                "inline" => Ok(CssImport::Inline),
                "function" => Ok(CssImport::Function),
                other => Err(serde::de::Error::custom(format!(
                    "unknown css.import disposition '{other}'"
                ))),
            },
        }
    }
}

/// CSS handling options
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CssOptions {
    /// `@import` disposition
    pub import: CssImport,
}

/// Output composition options
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputOptions {
    /// Text emitted before the bundle
    pub prefix: Option<String>,
    /// Text emitted after the bundle
    pub postfix: Option<String>,
    /// Separator between bundled modules (default `"\n"`)
    pub module_seperator: Option<String>,
    /// Text emitted before each module
    pub module_prefix: Option<String>,
    /// Text emitted after each module
    pub module_postfix: Option<String>,
    /// Emit a source map alongside the bundle
    pub source_map: bool,
}

impl OutputOptions {
    /// The inter-module separator.
    pub fn seperator(&self) -> &str {
        self.module_seperator.as_deref().unwrap_or("\n")
    }
}

/// The resolved option set applied to a module.
///
/// The whole tree is serde-derived so per-file overrides can be deep-merged
/// as JSON values, the same way layered config files merge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Default emission target
    pub target: Option<Target>,
    /// URL resolution
    pub resolve: ResolveOptions,
    /// URL emission and inlining
    pub url: UrlOptions,
    /// CSS handling
    pub css: CssOptions,
    /// Output composition
    pub output: OutputOptions,
    /// Preprocessor symbol table for `#if` expressions
    pub define: BTreeMap<String, Value>,
    /// Named region switches; a region is hidden when set to `false`
    pub region: BTreeMap<String, bool>,
    /// Extract CSS required from JS into a sibling stylesheet
    pub extract_css: bool,
    /// Per-file overrides: pattern to option patch
    pub module: BTreeMap<String, Value>,
}

impl Options {
    /// The option set for one file: every matching `module` override
    /// deep-merged onto a clone of this base set.
    pub fn for_file(&self, path: &Path) -> Result<Options> {
        if self.module.is_empty() {
            return Ok(self.clone());
        }
        let path_str = path.to_string_lossy().replace('\\', "/");
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let mut value = serde_json::to_value(self)?;
        let mut merged_any = false;
        for (pattern, patch) in &self.module {
            let matched = match Regex::new(pattern) {
                Ok(re) => re.is_match(&path_str),
                Err(_) => file_name == pattern,
            };
            if !matched {
                continue;
            }
            let Value::Object(patch) = patch else {
                return Err(BundlerError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: "override must be an object".into(),
                });
            };
            if let Value::Object(dst) = &mut value {
                deep_merge(dst, patch);
                merged_any = true;
            }
        }
        if !merged_any {
            return Ok(self.clone());
        }
        serde_json::from_value(value).map_err(BundlerError::JsonParse)
    }
}

/// Deep-merge `patch` into `dst`.
///
/// Object values merge recursively unless the destination is `false`;
/// arrays and primitives replace the destination wholesale.
pub fn deep_merge(dst: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if let Value::Object(patch_obj) = value {
            let entry = dst.entry(key.clone()).or_insert(Value::Null);
            if !matches!(entry, Value::Bool(false)) {
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(dst_obj) = entry {
                    deep_merge(dst_obj, patch_obj);
                }
                continue;
            }
        }
        dst.insert(key.clone(), value.clone());
    }
}
