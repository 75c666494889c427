// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The build session
//!
//! Owns the module arena and the path-to-module side table. A module is
//! created exactly once per file. Parsing is queued: a module discovered
//! mid-parse is recorded (so the discovering module can attach its edges
//! first) and parsed once the current parse finishes; the outermost
//! `get_module` call drains the queue. The side table is filled before
//! any parse starts, so require cycles terminate.

use crate::diagnostics::{Report, Severity};
use crate::error::Result;
use crate::file::{ModuleType, SourceFile};
use crate::fs::FileSystem;
use crate::graph::module::{all_externals, all_requires, has_included, ModuleData, ModuleId};
use crate::modules::parse_module;
use crate::options::Options;
use crate::writer::Writer;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Optional resolution callbacks, kept out of the serde option tree.
#[derive(Default)]
pub struct Hooks {
    /// Rewrite a raw URL before resolution (`resolve.parse`)
    pub parse: Option<Box<dyn Fn(&str, &Path) -> Option<String>>>,
    /// Abort resolution with no result when true (`resolve.skip`)
    pub skip: Option<Box<dyn Fn(&str, &Path) -> bool>>,
    /// Last-chance resolution (`resolve.fallback`); the returned path is
    /// accepted only if it exists
    pub fallback: Option<Box<dyn Fn(&str, &Path) -> Option<PathBuf>>>,
    /// Replacement text for an `@import` statement when `css.import` is
    /// set to `function`; called with the imported URL and the importing
    /// file. `None` leaves the statement untouched.
    pub css_import: Option<Box<dyn Fn(&str, &Path) -> Option<String>>>,
}

/// One emitted file: the bundle text plus its source map.
#[derive(Debug)]
pub struct SaveOutput {
    /// The module's source path (the host maps it to an output location)
    pub path: PathBuf,
    /// Composed bundle text
    pub text: String,
    /// Rendered source map, when enabled
    pub source_map: Option<String>,
}

/// The bundling session and module graph owner.
pub struct Bundler {
    pub(crate) fs: Box<dyn FileSystem>,
    pub(crate) options: Options,
    pub(crate) modules: Vec<ModuleData>,
    pub(crate) by_path: FxHashMap<PathBuf, ModuleId>,
    pub(crate) hooks: Hooks,
    loading: bool,
    pending: VecDeque<ModuleId>,
}

impl Bundler {
    /// Create a session over `fs` with the given base options.
    pub fn new(options: Options, fs: impl FileSystem + 'static) -> Self {
        Self {
            fs: Box::new(fs),
            options,
            modules: Vec::new(),
            by_path: FxHashMap::default(),
            hooks: Hooks::default(),
            loading: false,
            pending: VecDeque::new(),
        }
    }

    /// Install resolution hooks.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Get or create the module for `path`, loading it (and its
    /// transitive references) on first sight.
    pub fn get_module(&mut self, path: &Path) -> Result<ModuleId> {
        let path = crate::file::normalize_path(path);
        if let Some(&id) = self.by_path.get(&path) {
            return Ok(id);
        }
        let data = self.fs.read(&path)?;
        let file = SourceFile::new(path, data);
        self.insert_module(file)
    }

    /// Create a module that has no backing file (inline script bodies,
    /// empty native shims).
    pub(crate) fn synthetic_module(&mut self, path: PathBuf, text: String) -> Result<ModuleId> {
        let path = crate::file::normalize_path(&path);
        if let Some(&id) = self.by_path.get(&path) {
            return Ok(id);
        }
        let file = SourceFile::new(path, text.into_bytes());
        self.insert_module(file)
    }

    fn insert_module(&mut self, file: SourceFile) -> Result<ModuleId> {
        let options = self.options.for_file(file.path())?;
        let ty = ModuleType::from_path(file.path());
        let (ty, content): (ModuleType, Arc<str>) = match file.text() {
            Some(text) => (ty, Arc::from(text)),
            None => {
                // Non-UTF-8 content passes through as a base64 data URL.
                let uri = format!("data:{};base64,{}", file.mime(), BASE64.encode(file.data()));
                (ModuleType::Binary, Arc::from(uri.as_str()))
            }
        };
        debug!(path = %file.path().display(), ?ty, "loading module");
        let id = ModuleId(self.modules.len());
        self.by_path.insert(file.path().to_path_buf(), id);
        self.modules.push(ModuleData::new(file, options, ty, content));
        // Parsing is deferred so the module that discovered this one can
        // attach its edges before ours are walked.
        self.pending.push_back(id);
        if !self.loading {
            self.loading = true;
            while let Some(next) = self.pending.pop_front() {
                parse_module(self, next);
            }
            self.loading = false;
        }
        Ok(id)
    }

    /// The module record for `id`.
    pub fn module(&self, id: ModuleId) -> &ModuleData {
        &self.modules[id.0]
    }

    /// All modules loaded so far, in creation order.
    pub fn modules(&self) -> &[ModuleData] {
        &self.modules
    }

    /// Diagnostics collected for `id`.
    pub fn reports(&self, id: ModuleId) -> &[Report] {
        &self.modules[id.0].reports
    }

    /// The emitted require-closure of `id` (self last).
    pub fn all_requires(&self, id: ModuleId) -> Vec<ModuleId> {
        all_requires(&self.modules, id)
    }

    /// The external closure of `id`.
    pub fn all_externals(&self, id: ModuleId) -> Vec<ModuleId> {
        all_externals(&self.modules, id)
    }

    /// Compose the bundle for `id` (and its extracted stylesheet, if
    /// any).
    pub fn save(&self, id: ModuleId) -> Vec<SaveOutput> {
        crate::emit::save(self, id)
    }

    /// Emit `id`'s closure (or an explicit module list) into `writer`.
    pub fn write(&self, id: ModuleId, writer: &mut Writer, list: Option<&[ModuleId]>) {
        crate::emit::write(self, id, writer, list);
    }

    pub(crate) fn report(
        &mut self,
        id: ModuleId,
        severity: Severity,
        message: String,
        span: (usize, usize),
    ) {
        let m = &mut self.modules[id.0];
        debug!(file = %m.file.path().display(), %severity, "{message}");
        m.reports.push(Report {
            severity,
            message,
            file: m.file.path().to_path_buf(),
            start: span.0,
            end: span.1,
            cause: None,
        });
    }

    pub(crate) fn report_with_cause(
        &mut self,
        id: ModuleId,
        severity: Severity,
        message: String,
        span: (usize, usize),
        cause: String,
    ) {
        let m = &mut self.modules[id.0];
        m.reports.push(Report {
            severity,
            message,
            file: m.file.path().to_path_buf(),
            start: span.0,
            end: span.1,
            cause: Some(cause),
        });
    }

    /// Record "`from` depends on `dep`". Self-references are ignored.
    pub(crate) fn require_edge(&mut self, from: ModuleId, dep: ModuleId) {
        if from == dep {
            return;
        }
        let m = &mut self.modules[from.0];
        if !m.requires.contains(&dep) {
            m.requires.push(dep);
        }
    }

    /// Record "`from` inlines `dep`". Refused (returning false, with a
    /// warning) when `dep` already transitively includes `from`.
    pub(crate) fn include_edge(
        &mut self,
        from: ModuleId,
        dep: ModuleId,
        span: (usize, usize),
    ) -> bool {
        if has_included(&self.modules, dep, from) {
            let name = self.modules[dep.0].file.name().to_string();
            self.report(
                from,
                Severity::Warning,
                format!("Circular include with '{name}'"),
                span,
            );
            return false;
        }
        let m = &mut self.modules[from.0];
        if !m.includes.contains(&dep) {
            m.includes.push(dep);
        }
        true
    }

    /// Record "`dep` is provided elsewhere". Self-references are ignored.
    pub(crate) fn external_edge(&mut self, from: ModuleId, dep: ModuleId) {
        if from == dep {
            return;
        }
        let m = &mut self.modules[from.0];
        if !m.externals.contains(&dep) {
            m.externals.push(dep);
        }
    }

    /// The sibling stylesheet collecting CSS extracted from `id`,
    /// created on first use.
    pub(crate) fn ensure_extract_css(&mut self, id: ModuleId) -> ModuleId {
        if let Some(sibling) = self.modules[id.0].extract_css {
            return sibling;
        }
        let base = self.modules[id.0].file.path().with_extension("css");
        let path = if self.by_path.contains_key(&base) {
            let name = self.modules[id.0].file.name().to_string();
            self.modules[id.0]
                .file
                .dir()
                .join(format!("{name}#extract.css"))
        } else {
            base
        };
        let options = self.modules[id.0].options.clone();
        let file = SourceFile::new(path, Vec::new());
        let sibling = ModuleId(self.modules.len());
        self.by_path.insert(file.path().to_path_buf(), sibling);
        self.modules
            .push(ModuleData::new(file, options, ModuleType::Css, Arc::from("")));
        self.modules[id.0].extract_css = Some(sibling);
        sibling
    }

    /// The data URL inlining `id`'s content.
    pub(crate) fn data_uri(&self, id: ModuleId) -> String {
        let m = &self.modules[id.0];
        if m.ty == ModuleType::Binary {
            // binary content already is a data URL
            return m.content.to_string();
        }
        format!(
            "data:{};base64,{}",
            m.file.mime(),
            BASE64.encode(m.file.data())
        )
    }
}
