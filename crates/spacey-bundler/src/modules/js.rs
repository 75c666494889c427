// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! JavaScript scanner
//!
//! A single ordered alternation over the source: string and template
//! literals are skipped, comments are routed to the directive parser,
//! `require("...")` calls become require edges with the literal rewritten
//! to the re-based path, and bare native identifiers pull in their shims.

use super::{handle_comment, push_url_rewrite, ParseCx};
use crate::bundler::Bundler;
use crate::file::ModuleType;
use crate::graph::replacement::{ReplacementData, UrlEncoder};
use crate::graph::resolver::{resolve_query, resolve_url, strip_marker, InlineQuery, Usage};
use crate::graph::shims;
use crate::options::Target;
use crate::strings::{decode_string, encode_string};
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static JS_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?s)"#,
        r#"(?P<str>"(?:[^"\\\r\n]|\\.)*"|'(?:[^'\\\r\n]|\\.)*'|`(?:[^`\\]|\\.)*`)"#,
        r#"|(?P<lc>//[^\r\n]*)"#,
        r#"|(?P<bc>/\*.*?\*/)"#,
        r#"|(?P<re_lit>/(?:[^/\\\r\n\[]|\\.|\[(?:[^\]\\\r\n]|\\.)*\])+/[A-Za-z]*)"#,
        r#"|require\s*\(\s*(?:"(?P<req_dq>(?:[^"\\\r\n]|\\.)*)"|'(?P<req_sq>(?:[^'\\\r\n]|\\.)*)')\s*\)"#,
        r#"|(?P<kw>\b(?:require|exports|module|process|global|Buffer|setImmediate|clearImmediate|__dirname|__filename)\b)"#,
    ))
    .unwrap()
});

/// Identifier, literal-close or postfix positions where `/` means
/// division rather than the start of a regex literal.
fn regex_allowed(content: &str, at: usize) -> bool {
    let before = content[..at].trim_end();
    let Some(prev) = before.chars().next_back() else {
        return true;
    };
    if matches!(prev, ')' | ']' | '"' | '\'' | '`') {
        return false;
    }
    if prev.is_alphanumeric() || prev == '_' || prev == '$' {
        // a regex may still follow these keywords
        let word_start = before
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .map(|i| i + 1)
            .unwrap_or(0);
        return matches!(
            &before[word_start..],
            "return" | "typeof" | "case" | "in" | "of" | "new" | "delete" | "void" | "do"
                | "else" | "instanceof"
        );
    }
    true
}

fn preceded_by_dot(content: &str, at: usize) -> bool {
    content[..at].trim_end().ends_with('.')
}

pub(crate) fn parse(b: &mut Bundler, cx: &mut ParseCx) {
    let content = Arc::clone(&cx.content);
    let mut pos = 0;
    while pos < content.len() {
        let Some(caps) = JS_TOKEN_RE.captures_at(&content, pos) else {
            break;
        };
        let (m_start, m_end) = caps.get(0).map_or((pos, content.len()), |m| (m.start(), m.end()));
        let mut next = m_end;

        if caps.name("str").is_some() {
            // skip string and template literals
        } else if let Some(m) = caps.name("lc") {
            handle_comment(
                b,
                cx,
                (m.start(), m.end()),
                m.start() + 2,
                &content[m.start() + 2..m.end()],
            );
        } else if let Some(m) = caps.name("bc") {
            let body_end = m.end().saturating_sub(2).max(m.start() + 2);
            handle_comment(
                b,
                cx,
                (m.start(), m.end()),
                m.start() + 2,
                &content[m.start() + 2..body_end],
            );
        } else if let Some(m) = caps.name("re_lit") {
            if !regex_allowed(&content, m.start()) {
                // division, not a regex literal: re-scan after the slash
                next = m.start() + 1;
            }
        } else if caps.name("req_dq").is_some() || caps.name("req_sq").is_some() {
            if !preceded_by_dot(&content, m_start) {
                handle_require(b, cx, &caps, (m_start, m_end));
            }
        } else if let Some(m) = caps.name("kw") {
            if !preceded_by_dot(&content, m.start()) {
                handle_native(b, cx, m.as_str(), (m.start(), m.end()));
            }
        }
        pos = next.max(pos + 1);
    }
}

fn handle_require(
    b: &mut Bundler,
    cx: &mut ParseCx,
    caps: &regex::Captures,
    call_span: (usize, usize),
) {
    let (lit, quote) = match (caps.name("req_dq"), caps.name("req_sq")) {
        (Some(m), _) => (m, '"'),
        (_, Some(m)) => (m, '\''),
        _ => return,
    };
    // the string literal span, quotes included
    let lit_span = (lit.start() - 1, lit.end() + 1);
    let url = decode_string(lit.as_str());

    // ?__skip: strip the marker, leave the call unrewritten
    if let Some(stripped) = strip_marker(&url, "__skip") {
        let len = cx.content.len();
        let rep = &mut b.modules[cx.id.0].replacements;
        let _ = rep.replace(
            lit_span.0,
            lit_span.1,
            ReplacementData::Literal(encode_string(&stripped, quote)),
            len,
        );
        return;
    }

    if b.modules[cx.id.0].default_target.is_none() {
        b.modules[cx.id.0].default_target = Some(Target::Tpack);
    }
    let Some(mut resolved) = resolve_url(b, cx.id, &url, Usage::Require, call_span) else {
        return;
    };
    let postfix = !matches!(
        resolve_query(&mut resolved.query, "__postfix"),
        InlineQuery::Limit(0)
    );

    let dep_ty = b.modules[resolved.module.0].ty;
    let extract =
        b.modules[cx.id.0].options.extract_css || b.modules[cx.id.0].extract_css.is_some();
    if dep_ty == ModuleType::Css && extract {
        // the stylesheet moves to the extracted sibling; drop the call
        let sibling = b.ensure_extract_css(cx.id);
        b.require_edge(sibling, resolved.module);
        let len = cx.content.len();
        let rep = &mut b.modules[cx.id.0].replacements;
        let _ = rep.replace(
            call_span.0,
            call_span.1,
            ReplacementData::Literal(String::new()),
            len,
        );
        return;
    }

    b.require_edge(cx.id, resolved.module);
    push_url_rewrite(
        b,
        cx,
        lit_span,
        resolved,
        postfix,
        UrlEncoder::JsString(quote),
    );
}

fn handle_native(b: &mut Bundler, cx: &mut ParseCx, ident: &str, span: (usize, usize)) {
    if b.modules[cx.id.0].natives_seen.iter().any(|s| s == ident) {
        return;
    }
    b.modules[cx.id.0].natives_seen.push(ident.to_string());

    if matches!(ident, "require" | "exports" | "module") {
        if b.modules[cx.id.0].default_target.is_none() {
            b.modules[cx.id.0].default_target = Some(Target::Tpack);
        }
        return;
    }

    let m = &b.modules[cx.id.0];
    if m.effective_target() == Target::NodeJs || !m.options.resolve.native {
        // the host runtime provides these
        return;
    }

    let len = cx.content.len();
    match ident {
        "__dirname" | "__filename" => {
            let m = &b.modules[cx.id.0];
            let text = if ident == "__dirname" {
                m.file.dir().to_string_lossy().replace('\\', "/")
            } else {
                m.file.path().to_string_lossy().replace('\\', "/")
            };
            let stmt = format!("var {ident} = {};\n", encode_string(&text, '"'));
            let rep = &mut b.modules[cx.id.0].replacements;
            let _ = rep.replace(0, 0, ReplacementData::Literal(stmt), len);
        }
        other => {
            let Some((module_spec, stmt)) = shims::native_prepend(other) else {
                return;
            };
            if let Some(spec) = module_spec {
                let Some(resolved) = resolve_url(b, cx.id, spec, Usage::Require, span) else {
                    return;
                };
                b.require_edge(cx.id, resolved.module);
            }
            let rep = &mut b.modules[cx.id.0].replacements;
            let _ = rep.replace(0, 0, ReplacementData::Literal(stmt.to_string()), len);
        }
    }
}
