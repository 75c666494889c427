// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! URL resolution (layered pipeline)
//!
//! Maps a raw URL plus its usage intent to a module: custom parse hook,
//! alias rewrite, non-local guard, skip hook, then the resolution body
//! (relative probe or CommonJS package lookup), a fallback hook, and
//! finally the configured not-found handling.

use crate::bundler::Bundler;
use crate::diagnostics::Severity;
use crate::file::normalize_path;
use crate::fs::FileSystem;
use crate::graph::module::ModuleId;
use crate::graph::shims;
use crate::options::{ResolveOptions, Target};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static NON_LOCAL_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(\w\w+:|//)").unwrap());

/// The context a URL appears in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Data-URL-capable reference (images, stylesheets, script sources)
    Inline,
    /// Must name a local file (`#include` arguments, plain links)
    Local,
    /// Module-resolution rules apply (`require(...)`)
    Require,
}

/// A resolved URL: the target module plus the preserved query and hash.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The module the URL points at
    pub module: ModuleId,
    /// Preserved `?...` part (markers consumed by [`resolve_query`])
    pub query: String,
    /// Preserved `#...` part
    pub hash: String,
    /// Original unaliased base when the alias table rewrote the path
    pub alias: Option<String>,
}

/// A consumed URL query marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineQuery {
    /// Present without a numeric value (`?__inline`, `=true`, `=yes`, `=on`)
    Flag,
    /// Present with a numeric cap (`?__inline=1024`)
    Limit(u64),
    /// Not present
    Absent,
}

/// Extract and strip the query pair `name` from `query` (`?a=1&b` form).
pub fn resolve_query(query: &mut String, name: &str) -> InlineQuery {
    if query.is_empty() {
        return InlineQuery::Absent;
    }
    let body = query.strip_prefix('?').unwrap_or(query);
    let mut kept = Vec::new();
    let mut found = InlineQuery::Absent;
    for pair in body.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (pair, None),
        };
        if key == name && found == InlineQuery::Absent {
            found = match value {
                None | Some("true") | Some("yes") | Some("on") => InlineQuery::Flag,
                Some(num) => num.parse().map(InlineQuery::Limit).unwrap_or(InlineQuery::Flag),
            };
            continue;
        }
        kept.push(pair);
    }
    *query = if kept.is_empty() {
        String::new()
    } else {
        format!("?{}", kept.join("&"))
    };
    found
}

/// If `url` carries the query marker `name`, return the URL with the
/// marker stripped.
pub fn strip_marker(url: &str, name: &str) -> Option<String> {
    let (path, query, hash) = split_url(url);
    let mut query = query.to_string();
    match resolve_query(&mut query, name) {
        InlineQuery::Absent => None,
        _ => Some(format!("{path}{query}{hash}")),
    }
}

/// Split a URL into `(path, query, hash)`.
pub fn split_url(url: &str) -> (&str, &str, &str) {
    let (before_hash, hash) = match url.find('#') {
        Some(i) => (&url[..i], &url[i..]),
        None => (url, ""),
    };
    let (path, query) = match before_hash.find('?') {
        Some(i) => (&before_hash[..i], &before_hash[i..]),
        None => (before_hash, ""),
    };
    (path, query, hash)
}

/// Longest-prefix alias rewrite. Keys match case-insensitively; a
/// trailing `/` on key or value is ignored; the prefix must end at a
/// path boundary.
fn apply_alias(url: &str, alias: &BTreeMap<String, String>) -> (String, Option<String>) {
    let mut best: Option<(&str, &str)> = None;
    for (key, value) in alias {
        let key = key.trim_end_matches('/');
        if key.is_empty() || url.len() < key.len() {
            continue;
        }
        if !url[..key.len()].eq_ignore_ascii_case(key) {
            continue;
        }
        let boundary = url.len() == key.len()
            || matches!(url.as_bytes()[key.len()], b'/' | b'?' | b'#');
        if boundary && best.is_none_or(|(b, _)| key.len() > b.len()) {
            best = Some((key, value));
        }
    }
    match best {
        Some((key, value)) => {
            let rewritten = format!("{}{}", value.trim_end_matches('/'), &url[key.len()..]);
            let (orig_path, _, _) = split_url(url);
            (rewritten, Some(orig_path.to_string()))
        }
        None => (url.to_string(), None),
    }
}

/// Probe `base` with each extension, in order. An empty extension probes
/// the path as written.
fn probe(fs: &dyn FileSystem, base: &Path, extensions: &[String]) -> Option<PathBuf> {
    for ext in extensions {
        let candidate = if ext.is_empty() {
            base.to_path_buf()
        } else {
            let mut os = base.as_os_str().to_os_string();
            os.push(ext);
            PathBuf::from(os)
        };
        if fs.exists_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Walk up from `from_dir` probing each package directory for `spec`:
/// direct extension probe, then the package.json main fields, then an
/// `index` file.
fn try_package(
    fs: &dyn FileSystem,
    from_dir: &Path,
    spec: &str,
    extensions: &[String],
    modules_dirs: &[String],
    mains: &[String],
) -> Option<PathBuf> {
    for dir in from_dir.ancestors() {
        for modules_dir in modules_dirs {
            let base = dir.join(modules_dir).join(spec);
            if let Some(found) = probe(fs, &base, extensions) {
                return Some(found);
            }
            if !fs.exists_dir(&base) {
                continue;
            }
            let pkg_path = base.join("package.json");
            if fs.exists_file(&pkg_path) {
                if let Ok(text) = fs.read_to_string(&pkg_path) {
                    if let Ok(pkg) = serde_json::from_str::<serde_json::Value>(&text) {
                        for field in mains {
                            let Some(main) = pkg.get(field).and_then(|v| v.as_str()) else {
                                continue;
                            };
                            let main_path = normalize_path(&base.join(main));
                            if let Some(found) = probe(fs, &main_path, extensions) {
                                return Some(found);
                            }
                            break; // first string field wins
                        }
                    }
                }
            }
            for ext in extensions {
                if ext.is_empty() {
                    continue;
                }
                let index = base.join(format!("index{ext}"));
                if fs.exists_file(&index) {
                    return Some(index);
                }
            }
        }
    }
    None
}

enum BareOutcome {
    Found(PathBuf),
    /// Native module with no browser equivalent; substitute an empty module
    Empty,
    /// Native module on a nodejs target; the host provides it
    Skip,
    NotFound,
}

fn resolve_bare(
    fs: &dyn FileSystem,
    spec: &str,
    target: Target,
    ropts: &ResolveOptions,
    extensions: &[String],
    from_dir: &Path,
) -> BareOutcome {
    let modules_dirs = ropts.modules_directories_for(target);
    let mains = ropts.package_mains_for(target);

    if ropts.native {
        if let Some(shim) = shims::shim_for(spec) {
            if target == Target::NodeJs {
                return BareOutcome::Skip;
            }
            return match shim {
                Some(shim_spec) => {
                    match try_package(fs, from_dir, shim_spec, extensions, &modules_dirs, &mains) {
                        Some(found) => BareOutcome::Found(found),
                        None => BareOutcome::NotFound,
                    }
                }
                None => BareOutcome::Empty,
            };
        }
    }

    if let Some(found) = try_package(fs, from_dir, spec, extensions, &modules_dirs, &mains) {
        return BareOutcome::Found(found);
    }
    for root in &ropts.root {
        if let Some(found) = probe(fs, &root.join(spec), extensions) {
            return BareOutcome::Found(found);
        }
    }
    BareOutcome::NotFound
}

/// Resolve `raw` as referenced from `from`, reporting failures at
/// `span` per the module's resolve options.
pub(crate) fn resolve_url(
    b: &mut Bundler,
    from: ModuleId,
    raw: &str,
    usage: Usage,
    span: (usize, usize),
) -> Option<Resolved> {
    // 1. custom parse hook
    let url = match &b.hooks.parse {
        Some(hook) => hook(raw, b.modules[from.0].file.path()).unwrap_or_else(|| raw.to_string()),
        None => raw.to_string(),
    };

    // 2. alias rewrite
    let ropts = b.modules[from.0].options.resolve.clone();
    let (url, alias) = apply_alias(&url, &ropts.alias);

    // 3. non-local guard
    if NON_LOCAL_RE.is_match(&url) {
        if usage == Usage::Local {
            if let Some(severity) = ropts.non_local_action().severity() {
                b.report(
                    from,
                    severity,
                    format!("Cannot reference the network path '{raw}' here"),
                    span,
                );
            }
        }
        return None;
    }

    // 4. custom skip hook
    if let Some(hook) = &b.hooks.skip {
        if hook(&url, b.modules[from.0].file.path()) {
            return None;
        }
    }

    // 5. split off query and hash
    let (path_part, query, hash) = {
        let (p, q, h) = split_url(&url);
        (p.to_string(), q.to_string(), h.to_string())
    };
    if path_part.is_empty() {
        // pure fragment or query reference, nothing to resolve
        return None;
    }

    // 6. resolution body
    let target = b.modules[from.0].effective_target();
    let extensions = ropts.extensions_for(target);
    let from_dir = b.modules[from.0].file.dir().to_path_buf();
    let common_js = ropts.common_js.unwrap_or(true);

    let mut found: Option<PathBuf> = None;
    let mut empty_shim = false;

    if usage == Usage::Require && common_js && alias.is_none() {
        if path_part.starts_with('.') || path_part.starts_with('/') {
            let base = if path_part.starts_with('/') {
                PathBuf::from(&path_part)
            } else {
                normalize_path(&from_dir.join(&path_part))
            };
            found = probe(b.fs.as_ref(), &base, &extensions);
        } else {
            if let Some(cached) = b.modules[from.0].specifier_cache.get(&path_part) {
                found = Some(cached.clone());
            } else {
                match resolve_bare(
                    b.fs.as_ref(),
                    &path_part,
                    target,
                    &ropts,
                    &extensions,
                    &from_dir,
                ) {
                    BareOutcome::Found(path) => {
                        b.modules[from.0]
                            .specifier_cache
                            .insert(path_part.clone(), path.clone());
                        found = Some(path);
                    }
                    BareOutcome::Empty => empty_shim = true,
                    BareOutcome::Skip => return None,
                    BareOutcome::NotFound => {}
                }
            }
        }
    } else {
        let base = b.modules[from.0].file.resolve(&path_part);
        found = probe(b.fs.as_ref(), &base, &extensions);
    }

    if empty_shim {
        let path = from_dir.join(format!("{path_part}#empty.js"));
        let module = match b.synthetic_module(path, String::new()) {
            Ok(id) => id,
            Err(_) => return None,
        };
        return Some(Resolved {
            module,
            query,
            hash,
            alias,
        });
    }

    // 7. fallback hook
    if found.is_none() {
        if let Some(hook) = &b.hooks.fallback {
            if let Some(path) = hook(&path_part, b.modules[from.0].file.path()) {
                if b.fs.exists_file(&path) {
                    found = Some(path);
                }
            }
        }
    }

    // 8. not found
    let Some(path) = found else {
        let action = ropts.not_found_action(usage == Usage::Inline);
        if let Some(severity) = action.severity() {
            let message = if usage == Usage::Require {
                format!("Cannot find module '{path_part}'")
            } else {
                format!("Cannot find file '{path_part}'")
            };
            b.report(from, severity, message, span);
        }
        return None;
    };

    debug!(url = raw, path = %path.display(), "resolved");
    let module = match b.get_module(&path) {
        Ok(id) => id,
        Err(err) => {
            b.report_with_cause(
                from,
                Severity::Error,
                format!("Cannot load '{}'", path.display()),
                span,
                err.to_string(),
            );
            return None;
        }
    };
    Some(Resolved {
        module,
        query,
        hash,
        alias,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_url() {
        assert_eq!(split_url("a/b.js?v=1#frag"), ("a/b.js", "?v=1", "#frag"));
        assert_eq!(split_url("a.css"), ("a.css", "", ""));
        assert_eq!(split_url("#frag"), ("", "", "#frag"));
        assert_eq!(split_url("a?x#y?z"), ("a", "?x", "#y?z"));
    }

    #[test]
    fn test_resolve_query_union() {
        let mut q = String::from("?__inline&v=1");
        assert_eq!(resolve_query(&mut q, "__inline"), InlineQuery::Flag);
        assert_eq!(q, "?v=1");

        let mut q = String::from("?__inline=100");
        assert_eq!(resolve_query(&mut q, "__inline"), InlineQuery::Limit(100));
        assert_eq!(q, "");

        let mut q = String::from("?__inline=yes");
        assert_eq!(resolve_query(&mut q, "__inline"), InlineQuery::Flag);

        let mut q = String::from("?v=1");
        assert_eq!(resolve_query(&mut q, "__inline"), InlineQuery::Absent);
        assert_eq!(q, "?v=1");
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(
            strip_marker("a.png?__skip", "__skip").as_deref(),
            Some("a.png")
        );
        assert_eq!(
            strip_marker("a.png?__skip&v=2#f", "__skip").as_deref(),
            Some("a.png?v=2#f")
        );
        assert_eq!(strip_marker("a.png?v=2", "__skip"), None);
    }

    #[test]
    fn test_alias_longest_prefix() {
        let mut alias = BTreeMap::new();
        alias.insert("~".to_string(), "src".to_string());
        alias.insert("~/lib/".to_string(), "vendor".to_string());

        let (url, orig) = apply_alias("~/x.js", &alias);
        assert_eq!(url, "src/x.js");
        assert_eq!(orig.as_deref(), Some("~/x.js"));

        // longest key wins; trailing '/' on the key is ignored
        let (url, _) = apply_alias("~/lib/y.js", &alias);
        assert_eq!(url, "vendor/y.js");

        // prefix must end at a path boundary
        let (url, orig) = apply_alias("~x.js", &alias);
        assert_eq!(url, "~x.js");
        assert!(orig.is_none());
    }

    #[test]
    fn test_alias_case_insensitive() {
        let mut alias = BTreeMap::new();
        alias.insert("Lib".to_string(), "src/lib".to_string());
        let (url, _) = apply_alias("lib/a.js", &alias);
        assert_eq!(url, "src/lib/a.js");
    }

    #[test]
    fn test_non_local_pattern() {
        assert!(NON_LOCAL_RE.is_match("http://x/y.js"));
        assert!(NON_LOCAL_RE.is_match("data:image/png;base64,xx"));
        assert!(NON_LOCAL_RE.is_match("//cdn/x.js"));
        assert!(!NON_LOCAL_RE.is_match("c:/x.js"));
        assert!(!NON_LOCAL_RE.is_match("./a.js"));
    }
}
