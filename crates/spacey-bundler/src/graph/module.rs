// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module records and the three inter-module relations

use crate::diagnostics::Report;
use crate::file::{ModuleType, SourceFile};
use crate::graph::replacement::ReplacementList;
use crate::options::{Options, Target};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Index of a module in the session arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

/// One analysed file: its content, pending edits and graph edges.
///
/// Mutated only during its own `load()`; read-only for the rest of the
/// build, so the post-load graph needs no locking.
#[derive(Debug)]
pub struct ModuleData {
    /// The underlying file (graph identity)
    pub file: SourceFile,
    /// Option set resolved for this file
    pub options: Options,
    /// Content interpretation
    pub ty: ModuleType,
    /// Emission target set by a `#target` directive
    pub target: Option<Target>,
    /// Target the scanner defaulted to (e.g. tpack once `require()` is seen)
    pub default_target: Option<Target>,
    /// The text all replacement indices refer to
    pub content: Arc<str>,
    /// Pending byte-range edits
    pub replacements: ReplacementList,
    /// Modules inlined into this one's content (cycle-forbidden)
    pub includes: Vec<ModuleId>,
    /// Modules that must precede this one in the emitted closure
    pub requires: Vec<ModuleId>,
    /// Modules assumed provided elsewhere, excluded from the closure
    pub externals: Vec<ModuleId>,
    /// Diagnostics collected while loading
    pub reports: Vec<Report>,
    /// Sibling stylesheet collecting CSS extracted from this module
    pub extract_css: Option<ModuleId>,
    /// Counter behind the `<name>#inline<N><ext>` synthetic naming
    pub(crate) inline_counter: u32,
    /// Bare-specifier resolution memo
    pub(crate) specifier_cache: FxHashMap<String, PathBuf>,
    /// Native identifiers already shimmed in this file
    pub(crate) natives_seen: Vec<String>,
}

impl ModuleData {
    /// Create a fresh record; edges and replacements are filled by `load()`.
    pub fn new(file: SourceFile, options: Options, ty: ModuleType, content: Arc<str>) -> Self {
        Self {
            file,
            options,
            ty,
            target: None,
            default_target: None,
            content,
            replacements: ReplacementList::new(),
            includes: Vec::new(),
            requires: Vec::new(),
            externals: Vec::new(),
            reports: Vec::new(),
            extract_css: None,
            inline_counter: 0,
            specifier_cache: FxHashMap::default(),
            natives_seen: Vec::new(),
        }
    }

    /// The target this module is emitted for: an explicit `#target`
    /// directive wins, then the configured target, then the scanner's
    /// default.
    pub fn effective_target(&self) -> Target {
        self.target
            .or(self.options.target)
            .or(self.default_target)
            .unwrap_or_default()
    }
}

/// Reflexive-transitive inclusion check: does `a` include `b`?
pub fn has_included(modules: &[ModuleData], a: ModuleId, b: ModuleId) -> bool {
    fn walk(modules: &[ModuleData], a: ModuleId, b: ModuleId, seen: &mut Vec<ModuleId>) -> bool {
        if a == b {
            return true;
        }
        if seen.contains(&a) {
            return false;
        }
        seen.push(a);
        modules[a.0]
            .includes
            .iter()
            .any(|&inc| walk(modules, inc, b, seen))
    }
    walk(modules, a, b, &mut Vec::new())
}

/// Everything excluded from `m`'s closure: each direct external plus all
/// modules it transitively requires or excludes.
pub fn all_externals(modules: &[ModuleData], m: ModuleId) -> Vec<ModuleId> {
    fn collect(modules: &[ModuleData], id: ModuleId, out: &mut Vec<ModuleId>) {
        if out.contains(&id) {
            return;
        }
        out.push(id);
        for &dep in modules[id.0]
            .requires
            .iter()
            .chain(modules[id.0].externals.iter())
        {
            collect(modules, dep, out);
        }
    }
    let mut out = Vec::new();
    for &ext in &modules[m.0].externals {
        collect(modules, ext, &mut out);
    }
    out
}

/// The emitted require-closure of `m`: post-order DFS over `requires`
/// skipping the external closure, so callees precede callers and `m`
/// itself comes last.
pub fn all_requires(modules: &[ModuleData], m: ModuleId) -> Vec<ModuleId> {
    fn visit(
        modules: &[ModuleData],
        id: ModuleId,
        seen: &mut Vec<ModuleId>,
        out: &mut Vec<ModuleId>,
    ) {
        if seen.contains(&id) {
            return;
        }
        seen.push(id);
        for &dep in &modules[id.0].requires {
            visit(modules, dep, seen, out);
        }
        out.push(id);
    }
    // The external closure doubles as the visited set, so excluded
    // modules are never entered and cycles terminate.
    let mut seen = all_externals(modules, m);
    let mut out = Vec::new();
    visit(modules, m, &mut seen, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn module(path: &str) -> ModuleData {
        let file = SourceFile::new(PathBuf::from(path), Vec::new());
        ModuleData::new(file, Options::default(), ModuleType::Js, Arc::from(""))
    }

    fn graph(n: usize) -> Vec<ModuleData> {
        (0..n).map(|i| module(&format!("/m{i}.js"))).collect()
    }

    #[test]
    fn test_all_requires_post_order() {
        // 0 -> 1 -> 2, 0 -> 2
        let mut g = graph(3);
        g[0].requires = vec![ModuleId(1), ModuleId(2)];
        g[1].requires = vec![ModuleId(2)];
        let order = all_requires(&g, ModuleId(0));
        assert_eq!(order, vec![ModuleId(2), ModuleId(1), ModuleId(0)]);
    }

    #[test]
    fn test_all_requires_terminates_on_cycle() {
        let mut g = graph(2);
        g[0].requires = vec![ModuleId(1)];
        g[1].requires = vec![ModuleId(0)];
        let order = all_requires(&g, ModuleId(0));
        assert_eq!(order, vec![ModuleId(1), ModuleId(0)]);
    }

    #[test]
    fn test_externals_sticky() {
        // 0 requires 1 requires 2; 0 externals 1 => 1 and 2 excluded
        let mut g = graph(3);
        g[0].requires = vec![ModuleId(1)];
        g[0].externals = vec![ModuleId(1)];
        g[1].requires = vec![ModuleId(2)];
        let excluded = all_externals(&g, ModuleId(0));
        assert_eq!(excluded, vec![ModuleId(1), ModuleId(2)]);
        assert_eq!(all_requires(&g, ModuleId(0)), vec![ModuleId(0)]);
    }

    #[test]
    fn test_has_included_reflexive_transitive() {
        let mut g = graph(3);
        g[0].includes = vec![ModuleId(1)];
        g[1].includes = vec![ModuleId(2)];
        assert!(has_included(&g, ModuleId(0), ModuleId(0)));
        assert!(has_included(&g, ModuleId(0), ModuleId(2)));
        assert!(!has_included(&g, ModuleId(2), ModuleId(0)));
    }
}
