// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-kind module scanners
//!
//! Each kind drives the same machinery: recognise comments (routed to the
//! directive parser), URL-bearing constructs (routed to the resolver and
//! replacement store), and the `__macro(...)` pass shared by all textual
//! kinds.

mod css;
mod html;
mod js;

use crate::bundler::Bundler;
use crate::diagnostics::Severity;
use crate::file::ModuleType;
use crate::graph::expr;
use crate::graph::preprocessor::Preprocessor;
use crate::graph::replacement::{ReplacementData, UrlEncoder, UrlRewrite};
use crate::graph::resolver::{resolve_query, resolve_url, strip_marker, InlineQuery, Usage};
use crate::graph::ModuleId;
use crate::options::Target;
use crate::strings::trim_quotes;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"#(include|external|extract-css|endregion|endif|elif|else|error|warning|require|region|target|if)\b\s*(.*)",
    )
    .unwrap()
});

static MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"__(url|skip|postfix|macro|include|external|require|target)\s*\(\s*(?:"([^"]*)"|'([^']*)'|([^)"']*?))\s*\)"#,
    )
    .unwrap()
});

/// Ephemeral state threaded through one module's parse.
pub(crate) struct ParseCx {
    pub id: ModuleId,
    pub content: Arc<str>,
    pub pre: Preprocessor,
}

/// Run the kind-specific scanner, then the macro pass, then close any
/// dangling preprocessor state.
pub(crate) fn parse_module(b: &mut Bundler, id: ModuleId) {
    let content = Arc::clone(&b.modules[id.0].content);
    let ty = b.modules[id.0].ty;
    let mut cx = ParseCx {
        id,
        content,
        pre: Preprocessor::new(),
    };
    match ty {
        ModuleType::Js => js::parse(b, &mut cx),
        ModuleType::Css => css::parse(b, &mut cx),
        ModuleType::Html => html::parse(b, &mut cx),
        // resource, binary, text and json files pass through untouched
        _ => {}
    }
    if ty.is_textual() {
        parse_subs(b, &mut cx);
    }
    let len = cx.content.len();
    let warnings = cx.pre.finish(&mut b.modules[id.0].replacements, len);
    for warning in warnings {
        b.report(id, Severity::Warning, warning, (len, len));
    }
}

/// Scan a comment body for directives. `span` is the whole comment
/// including its delimiters; `body_start` is where `body` begins in the
/// module content. A comment carrying at least one directive is deleted
/// from the output.
pub(crate) fn handle_comment(
    b: &mut Bundler,
    cx: &mut ParseCx,
    span: (usize, usize),
    body_start: usize,
    body: &str,
) {
    let len = cx.content.len();
    let mut needs_delete = false;
    let mut line_offset = 0usize;
    for line in body.split('\n') {
        let Some(caps) = DIRECTIVE_RE.captures(line) else {
            line_offset += line.len() + 1;
            continue;
        };
        let name = caps.get(1).map_or("", |m| m.as_str());
        let arg_raw = caps.get(2).map_or("", |m| m.as_str()).trim();
        let arg = trim_quotes(arg_raw);
        let at = body_start + line_offset + caps.get(0).map_or(0, |m| m.start());
        let line_span = (at, at + caps.get(0).map_or(0, |m| m.as_str().len()));

        match name {
            "if" | "elif" => {
                let truth = match expr::evaluate(arg, &b.modules[cx.id.0].options.define) {
                    Ok(value) => expr::is_truthy(&value),
                    Err(reason) => {
                        b.report_with_cause(
                            cx.id,
                            Severity::Error,
                            format!("Invalid expression '{arg}'"),
                            line_span,
                            reason,
                        );
                        false
                    }
                };
                let warning = {
                    let rep = &mut b.modules[cx.id.0].replacements;
                    if name == "if" {
                        cx.pre.directive_if(truth, rep, span.0, span.1, len);
                        None
                    } else {
                        cx.pre.directive_elif(truth, rep, span.0, span.1, len)
                    }
                };
                if let Some(warning) = warning {
                    b.report(cx.id, Severity::Warning, warning, line_span);
                }
            }
            "else" => {
                let warning = {
                    let rep = &mut b.modules[cx.id.0].replacements;
                    cx.pre.directive_else(rep, span.0, span.1, len)
                };
                if let Some(warning) = warning {
                    b.report(cx.id, Severity::Warning, warning, line_span);
                }
            }
            "endif" => {
                let warning = {
                    let rep = &mut b.modules[cx.id.0].replacements;
                    cx.pre.directive_endif(rep, span.0, span.1, len)
                };
                if let Some(warning) = warning {
                    b.report(cx.id, Severity::Warning, warning, line_span);
                }
            }
            "region" => {
                let truth = b.modules[cx.id.0].options.region.get(arg) != Some(&false);
                let rep = &mut b.modules[cx.id.0].replacements;
                cx.pre.directive_region(truth, rep, span.0, span.1, len);
            }
            "endregion" => {
                let warning = {
                    let rep = &mut b.modules[cx.id.0].replacements;
                    cx.pre.directive_endregion(rep, span.0, span.1, len)
                };
                if let Some(warning) = warning {
                    b.report(cx.id, Severity::Warning, warning, line_span);
                }
            }
            "error" => {
                b.report(cx.id, Severity::Error, arg.to_string(), line_span);
                needs_delete = true;
            }
            "warning" => {
                b.report(cx.id, Severity::Warning, arg.to_string(), line_span);
                needs_delete = true;
            }
            "target" => {
                match Target::parse(arg) {
                    Some(target) => b.modules[cx.id.0].target = Some(target),
                    None => {
                        b.report(
                            cx.id,
                            Severity::Warning,
                            format!("Invalid #target '{arg}'"),
                            line_span,
                        );
                    }
                }
                needs_delete = true;
            }
            "include" => {
                if let Some(resolved) = resolve_url(b, cx.id, arg, Usage::Local, line_span) {
                    if b.include_edge(cx.id, resolved.module, line_span) {
                        let rep = &mut b.modules[cx.id.0].replacements;
                        let _ = rep.replace(
                            span.0,
                            span.0,
                            ReplacementData::Module(resolved.module),
                            len,
                        );
                    }
                }
                needs_delete = true;
            }
            "external" => {
                if let Some(resolved) = resolve_url(b, cx.id, arg, Usage::Local, line_span) {
                    b.external_edge(cx.id, resolved.module);
                }
                needs_delete = true;
            }
            "require" => {
                if let Some(resolved) = resolve_url(b, cx.id, arg, Usage::Require, line_span) {
                    b.require_edge(cx.id, resolved.module);
                }
                needs_delete = true;
            }
            "extract-css" => {
                b.ensure_extract_css(cx.id);
                needs_delete = true;
            }
            _ => {}
        }
        line_offset += line.len() + 1;
    }
    if needs_delete {
        let rep = &mut b.modules[cx.id.0].replacements;
        let _ = rep.replace(span.0, span.1, ReplacementData::Literal(String::new()), len);
    }
}

/// The directive-macro pass over a module's whole content.
pub(crate) fn parse_subs(b: &mut Bundler, cx: &mut ParseCx) {
    let content = Arc::clone(&cx.content);
    let len = content.len();
    for caps in MACRO_RE.captures_iter(&content) {
        let whole = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
        let name = caps.get(1).map_or("", |m| m.as_str());
        let (arg, quote) = if let Some(m) = caps.get(2) {
            (m.as_str(), Some('"'))
        } else if let Some(m) = caps.get(3) {
            (m.as_str(), Some('\''))
        } else {
            (caps.get(4).map_or("", |m| m.as_str()).trim(), None)
        };
        let encoder = quote.map_or(UrlEncoder::Raw, UrlEncoder::JsString);

        match name {
            "url" | "postfix" => {
                process_url(b, cx, whole, arg, Usage::Inline, encoder);
            }
            "skip" => {
                let text = match quote {
                    Some(q) => format!("{q}{arg}{q}"),
                    None => arg.to_string(),
                };
                let rep = &mut b.modules[cx.id.0].replacements;
                let _ = rep.replace(whole.0, whole.1, ReplacementData::Literal(text), len);
            }
            "macro" => {
                let value = b.modules[cx.id.0].options.define.get(arg).cloned();
                let text = match value {
                    Some(value) => match serde_json::to_string(&value) {
                        Ok(text) => text,
                        Err(_) => "null".to_string(),
                    },
                    None => {
                        b.report(
                            cx.id,
                            Severity::Warning,
                            format!("Macro '{arg}' is not defined"),
                            whole,
                        );
                        "null".to_string()
                    }
                };
                let rep = &mut b.modules[cx.id.0].replacements;
                let _ = rep.replace(whole.0, whole.1, ReplacementData::Literal(text), len);
            }
            "include" => {
                if let Some(resolved) = resolve_url(b, cx.id, arg, Usage::Local, whole) {
                    if b.include_edge(cx.id, resolved.module, whole) {
                        let rep = &mut b.modules[cx.id.0].replacements;
                        let _ = rep.replace(
                            whole.0,
                            whole.1,
                            ReplacementData::Module(resolved.module),
                            len,
                        );
                    }
                }
            }
            "external" => {
                if let Some(resolved) = resolve_url(b, cx.id, arg, Usage::Local, whole) {
                    b.external_edge(cx.id, resolved.module);
                    let rep = &mut b.modules[cx.id.0].replacements;
                    let _ =
                        rep.replace(whole.0, whole.1, ReplacementData::Literal(String::new()), len);
                }
            }
            "require" => {
                if b.modules[cx.id.0].default_target.is_none() {
                    b.modules[cx.id.0].default_target = Some(Target::Tpack);
                }
                if let Some(resolved) = resolve_url(b, cx.id, arg, Usage::Require, whole) {
                    b.require_edge(cx.id, resolved.module);
                    let rep = &mut b.modules[cx.id.0].replacements;
                    let _ =
                        rep.replace(whole.0, whole.1, ReplacementData::Literal(String::new()), len);
                }
            }
            "target" => {
                match Target::parse(arg) {
                    Some(target) => b.modules[cx.id.0].target = Some(target),
                    None => {
                        b.report(
                            cx.id,
                            Severity::Warning,
                            format!("Invalid __target '{arg}'"),
                            whole,
                        );
                    }
                }
                let rep = &mut b.modules[cx.id.0].replacements;
                let _ = rep.replace(whole.0, whole.1, ReplacementData::Literal(String::new()), len);
            }
            _ => {}
        }
    }
}

/// Resolve a URL reference and record either an inline replacement or a
/// deferred link rewrite over `span`.
pub(crate) fn process_url(
    b: &mut Bundler,
    cx: &mut ParseCx,
    span: (usize, usize),
    raw_url: &str,
    usage: Usage,
    encoder: UrlEncoder,
) {
    let len = cx.content.len();

    // ?__skip: strip the marker, leave the URL otherwise untouched
    if let Some(stripped) = strip_marker(raw_url, "__skip") {
        let text = encoder.encode(&stripped);
        let rep = &mut b.modules[cx.id.0].replacements;
        let _ = rep.replace(span.0, span.1, ReplacementData::Literal(text), len);
        return;
    }

    let Some(mut resolved) = resolve_url(b, cx.id, raw_url, usage, span) else {
        return;
    };
    let postfix = !matches!(
        resolve_query(&mut resolved.query, "__postfix"),
        InlineQuery::Limit(0)
    );
    let inline_marker = resolve_query(&mut resolved.query, "__inline");

    if usage == Usage::Inline {
        let size = b.modules[resolved.module.0].file.len();
        let inline = match inline_marker {
            InlineQuery::Flag => true,
            InlineQuery::Limit(limit) => size as u64 <= limit,
            InlineQuery::Absent => b.modules[cx.id.0].options.url.inline.allows(size),
        };
        // include refused on a cycle: fall back to the link rewrite below
        if inline && b.include_edge(cx.id, resolved.module, span) {
            let uri = b.data_uri(resolved.module);
            let text = encoder.encode(&uri);
            let rep = &mut b.modules[cx.id.0].replacements;
            let _ = rep.replace(span.0, span.1, ReplacementData::Literal(text), len);
            return;
        }
    }

    push_url_rewrite(b, cx, span, resolved, postfix, encoder);
}

/// Record a deferred link rewrite over `span` without any inline check.
pub(crate) fn push_url_rewrite(
    b: &mut Bundler,
    cx: &mut ParseCx,
    span: (usize, usize),
    resolved: crate::graph::Resolved,
    postfix: bool,
    encoder: UrlEncoder,
) {
    let len = cx.content.len();
    let rewrite = UrlRewrite {
        target: resolved.module,
        query: resolved.query,
        hash: resolved.hash,
        alias: resolved.alias,
        postfix,
        encoder,
    };
    let rep = &mut b.modules[cx.id.0].replacements;
    let _ = rep.replace(span.0, span.1, ReplacementData::Url(rewrite), len);
}
