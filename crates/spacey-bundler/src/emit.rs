// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Output composition
//!
//! Walks the closed require-list and emits each member's content spliced
//! with its replacements, recursing into module-valued replacements. For
//! the tpack target, modules are wrapped in `__tpack__.define(...)` and
//! a loader preamble is prefixed.

use crate::bundler::{Bundler, SaveOutput};
use crate::file::{relative_url, ModuleType};
use crate::graph::module::{all_externals, all_requires, ModuleId};
use crate::graph::replacement::{ReplacementData, UrlRewrite};
use crate::options::Target;
use crate::strings::encode_string;
use crate::writer::{Origin, Writer};
use tracing::debug;

/// The runtime loader prefixed to standalone tpack bundles.
const LOADER_JS: &str = include_str!("loader/require.js");

pub(crate) fn save(b: &Bundler, id: ModuleId) -> Vec<SaveOutput> {
    let m = &b.modules[id.0];
    debug!(path = %m.file.path().display(), "saving bundle");
    let mut writer = Writer::new(m.options.output.source_map);
    if let Some(prefix) = &m.options.output.prefix {
        writer.write_str(prefix);
    }
    write(b, id, &mut writer, None);
    if let Some(postfix) = &m.options.output.postfix {
        writer.write_str(postfix);
    }
    let (text, source_map) = writer.finish(Some(m.file.name()));
    let mut out = vec![SaveOutput {
        path: m.file.path().to_path_buf(),
        text,
        source_map,
    }];
    if let Some(css) = m.extract_css {
        out.extend(save(b, css));
    }
    out
}

pub(crate) fn write(b: &Bundler, root: ModuleId, writer: &mut Writer, list: Option<&[ModuleId]>) {
    let closure;
    let list = match list {
        Some(list) => list,
        None => {
            closure = all_requires(&b.modules, root);
            &closure
        }
    };
    let root_m = &b.modules[root.0];
    let seperator = root_m.options.output.seperator().to_string();
    let module_prefix = root_m.options.output.module_prefix.clone();
    let module_postfix = root_m.options.output.module_postfix.clone();
    let tpack = root_m.effective_target() == Target::Tpack && root_m.ty == ModuleType::Js;

    if tpack && all_externals(&b.modules, root).is_empty() {
        writer.write_str(LOADER_JS);
        writer.write_str(&seperator);
    }

    let mut first = true;
    for &id in list {
        if !first {
            writer.write_str(&seperator);
        }
        first = false;
        if let Some(prefix) = &module_prefix {
            writer.write_str(prefix);
        }
        if tpack {
            write_defined(b, writer, root, id);
        } else {
            write_module(b, writer, root, id);
        }
        if let Some(postfix) = &module_postfix {
            writer.write_str(postfix);
        }
    }
}

/// Wrap one module in a `__tpack__.define` registration. The emitting
/// module itself is registered anonymously (it always comes last).
fn write_defined(b: &Bundler, writer: &mut Writer, root: ModuleId, id: ModuleId) {
    let m = &b.modules[id.0];
    writer.write_str("__tpack__.define(");
    if id != root {
        let name = relative_url(b.modules[root.0].file.dir(), m.file.path());
        writer.write_str(&encode_string(&name, '"'));
        writer.write_str(", ");
    }
    writer.indent("\t");
    writer.write_str("function(require, exports, module){\n");
    match m.ty {
        ModuleType::Js => write_module(b, writer, root, id),
        ModuleType::Css => {
            let text = render_to_string(b, root, id);
            writer.write_str("module.exports = __tpack__.insertStyle(");
            writer.write_str(&encode_string(&text, '"'));
            writer.write_str(");");
        }
        ModuleType::Json => {
            writer.write_str("module.exports = ");
            write_module(b, writer, root, id);
            writer.write_str(";");
        }
        _ => {
            let text = render_to_string(b, root, id);
            writer.write_str("module.exports = ");
            writer.write_str(&encode_string(&text, '"'));
            writer.write_str(";");
        }
    }
    writer.unindent("\t");
    writer.write_str("\n});");
}

/// Emit one module: content slices merged with replacement values.
pub(crate) fn write_module(b: &Bundler, writer: &mut Writer, emitter: ModuleId, id: ModuleId) {
    let m = &b.modules[id.0];
    let content: &str = &m.content;
    let origin = |index: usize| {
        Some(Origin {
            file: m.file.path(),
            content,
            index,
        })
    };
    if m.replacements.is_empty() {
        writer.write(content, origin(0));
        return;
    }
    let mut cursor = 0;
    for rep in m.replacements.items() {
        if rep.start > cursor {
            writer.write(&content[cursor..rep.start], origin(cursor));
        }
        match &rep.data {
            ReplacementData::Literal(text) => {
                writer.write(text, origin(rep.start));
            }
            ReplacementData::Url(rewrite) => {
                let url = build_url(b, emitter, rewrite);
                writer.write(&rewrite.encoder.encode(&url), origin(rep.start));
            }
            ReplacementData::Module(nested) => {
                write_module(b, writer, emitter, *nested);
            }
        }
        cursor = rep.end.min(content.len());
    }
    if cursor < content.len() {
        writer.write(&content[cursor..], origin(cursor));
    }
}

fn render_to_string(b: &Bundler, emitter: ModuleId, id: ModuleId) -> String {
    let mut writer = Writer::new(false);
    write_module(b, &mut writer, emitter, id);
    writer.finish(None).0
}

/// Build the URL emitted for a deferred rewrite: target path re-based to
/// the emitting module, the configured postfix, the public-path alias
/// table, and the preserved query and hash.
pub(crate) fn build_url(b: &Bundler, emitter: ModuleId, rewrite: &UrlRewrite) -> String {
    let e = &b.modules[emitter.0];
    let target = &b.modules[rewrite.target.0];
    let mut url = relative_url(e.file.dir(), target.file.path());
    let opts = &e.options.url;

    let mut query = rewrite.query.clone();
    if rewrite.postfix {
        if let Some(postfix) = &opts.postfix {
            if let Some(rest) = postfix.strip_prefix('?') {
                if query.is_empty() {
                    query = format!("?{rest}");
                } else {
                    query.push('&');
                    query.push_str(rest);
                }
            } else {
                url.push_str(postfix);
            }
        }
    }

    if !opts.public.is_empty() {
        let trimmed = url.strip_prefix("./").unwrap_or(&url).to_string();
        let mut best: Option<(&str, &str)> = None;
        for (key, value) in &opts.public {
            let key = key.trim_end_matches('/');
            if key.is_empty() || trimmed.len() < key.len() {
                continue;
            }
            if !trimmed[..key.len()].eq_ignore_ascii_case(key) {
                continue;
            }
            // prefix ends at a path boundary, longest key wins
            let boundary =
                trimmed.len() == key.len() || trimmed.as_bytes()[key.len()] == b'/';
            if boundary && best.is_none_or(|(b, _)| key.len() > b.len()) {
                best = Some((key, value.as_str()));
            }
        }
        if let Some((key, value)) = best {
            url = format!("{}{}", value.trim_end_matches('/'), &trimmed[key.len()..]);
        }
    }

    format!("{url}{query}{}", rewrite.hash)
}
