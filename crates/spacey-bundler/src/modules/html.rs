// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! HTML scanner
//!
//! One alternation distinguishes comments, `<script>`/`<style>` pairs,
//! template markers (opaque) and URL-bearing tags. Inline script and
//! style bodies become synthetic modules named
//! `<origName>#inline<N><ext>` (a stable contract, so emitted source
//! maps reference reproducible paths) stitched back between the
//! preserved tags.

use super::{handle_comment, process_url, push_url_rewrite, ParseCx};
use crate::bundler::Bundler;
use crate::diagnostics::Severity;
use crate::graph::replacement::{ReplacementData, UrlEncoder};
use crate::graph::resolver::{resolve_query, resolve_url, strip_marker, InlineQuery, Usage};
use crate::strings::decode_attr;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static HTML_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)(?P<comment><!--.*?-->)",
        r#"|<script\b(?P<script_attrs>[^>]*)>(?P<script_body>.*?)</script\s*>"#,
        r#"|<style\b(?P<style_attrs>[^>]*)>(?P<style_body>.*?)</style\s*>"#,
        r#"|(?P<tpl><%.*?%>|<\?.*?\?>|<#.*?#>|<![^>]*!>)"#,
        r#"|<(?P<tag_name>img|link|object|embed|audio|video|source|a|base|form|input|button)\b(?P<tag_attrs>[^>]*)>"#,
    ))
    .unwrap()
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([^\s"'<>=/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]*)))?"#).unwrap()
});

#[derive(Debug)]
struct AttrValue {
    text: String,
    span: (usize, usize),
    quote: Option<char>,
}

#[derive(Debug)]
struct Attr {
    name: String,
    full: (usize, usize),
    value: Option<AttrValue>,
}

fn parse_attrs(attrs: &str, offset: usize) -> Vec<Attr> {
    let mut out = Vec::new();
    for caps in ATTR_RE.captures_iter(attrs) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(name) = caps.get(1) else { continue };
        let value = if let Some(m) = caps.get(2) {
            Some((m, Some('"')))
        } else if let Some(m) = caps.get(3) {
            Some((m, Some('\'')))
        } else {
            caps.get(4).filter(|m| !m.as_str().is_empty()).map(|m| (m, None))
        };
        out.push(Attr {
            name: name.as_str().to_ascii_lowercase(),
            full: (offset + whole.start(), offset + whole.end()),
            value: value.map(|(m, quote)| AttrValue {
                text: decode_attr(m.as_str()),
                span: (offset + m.start(), offset + m.end()),
                quote,
            }),
        });
    }
    out
}

/// The span deleting an attribute, extended over the whitespace before it.
fn attr_delete_span(content: &str, attr: &Attr) -> (usize, usize) {
    let mut start = attr.full.0;
    while start > 0 && content.as_bytes()[start - 1].is_ascii_whitespace() {
        start -= 1;
    }
    (start, attr.full.1)
}

/// Strip a `__skip` attribute if present; returns true when the whole
/// tag must be left unprocessed.
fn strip_skip_attr(b: &mut Bundler, cx: &mut ParseCx, attrs: &[Attr]) -> bool {
    let Some(skip) = attrs.iter().find(|a| a.name == "__skip") else {
        return false;
    };
    let span = attr_delete_span(&cx.content, skip);
    let len = cx.content.len();
    let rep = &mut b.modules[cx.id.0].replacements;
    let _ = rep.replace(span.0, span.1, ReplacementData::Literal(String::new()), len);
    true
}

fn attr_encoder(value: &AttrValue) -> UrlEncoder {
    match value.quote {
        Some(quote) => UrlEncoder::HtmlAttr(quote),
        None => UrlEncoder::Raw,
    }
}

fn has_template_markers(body: &str) -> bool {
    ["<%", "<?", "<#"].iter().any(|m| body.contains(m))
}

pub(crate) fn parse(b: &mut Bundler, cx: &mut ParseCx) {
    let content = Arc::clone(&cx.content);
    for caps in HTML_TOKEN_RE.captures_iter(&content) {
        if let Some(m) = caps.name("comment") {
            let body_end = m.end().saturating_sub(3).max(m.start() + 4);
            handle_comment(
                b,
                cx,
                (m.start(), m.end()),
                m.start() + 4,
                &content[m.start() + 4..body_end],
            );
        } else if let Some(attrs_m) = caps.name("script_attrs") {
            let body = caps.name("script_body");
            handle_script(b, cx, &content, attrs_m, body);
        } else if let Some(attrs_m) = caps.name("style_attrs") {
            let body = caps.name("style_body");
            handle_style(b, cx, &content, attrs_m, body);
        } else if caps.name("tpl").is_some() {
            // opaque server-side template block
        } else if let Some(name_m) = caps.name("tag_name") {
            let attrs_m = caps.name("tag_attrs");
            handle_tag(b, cx, &content, name_m.as_str(), attrs_m);
        }
    }
}

fn handle_script(
    b: &mut Bundler,
    cx: &mut ParseCx,
    content: &str,
    attrs_m: regex::Match,
    body: Option<regex::Match>,
) {
    let attrs = parse_attrs(attrs_m.as_str(), attrs_m.start());
    if strip_skip_attr(b, cx, &attrs) {
        return;
    }
    let type_attr = attrs
        .iter()
        .find(|a| a.name == "type")
        .and_then(|a| a.value.as_ref())
        .map(|v| v.text.to_ascii_lowercase());
    let scriptish = type_attr
        .as_deref()
        .is_none_or(|t| t.contains("javascript") || t.contains("ecmascript") || t == "module");

    if let Some(src) = attrs
        .iter()
        .find(|a| a.name == "src")
        .and_then(|a| a.value.as_ref().map(|v| (a, v)))
    {
        let (attr, value) = src;
        handle_script_src(b, cx, content, attr, value, body);
        return;
    }

    let Some(body) = body else { return };
    let text = body.as_str();
    if text.trim().is_empty() || !scriptish || has_template_markers(text) {
        return;
    }
    synth_inline(b, cx, (body.start(), body.end()), text, ".js");
}

fn handle_script_src(
    b: &mut Bundler,
    cx: &mut ParseCx,
    content: &str,
    attr: &Attr,
    value: &AttrValue,
    body: Option<regex::Match>,
) {
    let encoder = attr_encoder(value);

    // ?__skip: strip the marker, leave the URL otherwise untouched
    if let Some(stripped) = strip_marker(&value.text, "__skip") {
        let len = cx.content.len();
        let rep = &mut b.modules[cx.id.0].replacements;
        let _ = rep.replace(
            value.span.0,
            value.span.1,
            ReplacementData::Literal(encoder.encode(&stripped)),
            len,
        );
        return;
    }

    let Some(mut resolved) = resolve_url(b, cx.id, &value.text, Usage::Inline, value.span) else {
        return;
    };
    let postfix = !matches!(
        resolve_query(&mut resolved.query, "__postfix"),
        InlineQuery::Limit(0)
    );
    let inline_marker = resolve_query(&mut resolved.query, "__inline");
    let size = b.modules[resolved.module.0].file.len();
    let inline = match inline_marker {
        InlineQuery::Flag => true,
        InlineQuery::Limit(limit) => size as u64 <= limit,
        InlineQuery::Absent => b.modules[cx.id.0].options.url.inline.allows(size),
    };

    if inline {
        if let Some(body) = body {
            if b.include_edge(cx.id, resolved.module, value.span) {
                // drop the src attribute, splice the module between the tags
                let del = attr_delete_span(content, attr);
                let len = cx.content.len();
                let rep = &mut b.modules[cx.id.0].replacements;
                let _ = rep.replace(del.0, del.1, ReplacementData::Literal(String::new()), len);
                let _ = rep.replace(
                    body.start(),
                    body.end(),
                    ReplacementData::Module(resolved.module),
                    len,
                );
                return;
            }
        }
    }
    push_url_rewrite(b, cx, value.span, resolved, postfix, encoder);
}

fn handle_style(
    b: &mut Bundler,
    cx: &mut ParseCx,
    _content: &str,
    attrs_m: regex::Match,
    body: Option<regex::Match>,
) {
    let attrs = parse_attrs(attrs_m.as_str(), attrs_m.start());
    if strip_skip_attr(b, cx, &attrs) {
        return;
    }
    let Some(body) = body else { return };
    let text = body.as_str();
    if text.trim().is_empty() || has_template_markers(text) {
        return;
    }
    synth_inline(b, cx, (body.start(), body.end()), text, ".css");
}

/// Create the synthetic module for an inline body and stitch it back as
/// a module-valued replacement.
fn synth_inline(b: &mut Bundler, cx: &mut ParseCx, span: (usize, usize), text: &str, ext: &str) {
    let counter = b.modules[cx.id.0].inline_counter;
    b.modules[cx.id.0].inline_counter += 1;
    let m = &b.modules[cx.id.0];
    let name = format!("{}#inline{}{}", m.file.name(), counter, ext);
    let path = m.file.dir().join(name);
    let synthetic = match b.synthetic_module(path, text.to_string()) {
        Ok(id) => id,
        Err(err) => {
            b.report_with_cause(
                cx.id,
                Severity::Error,
                "Cannot process inline content".to_string(),
                span,
                err.to_string(),
            );
            return;
        }
    };
    if b.include_edge(cx.id, synthetic, span) {
        let len = cx.content.len();
        let rep = &mut b.modules[cx.id.0].replacements;
        let _ = rep.replace(span.0, span.1, ReplacementData::Module(synthetic), len);
    }
}

fn handle_tag(
    b: &mut Bundler,
    cx: &mut ParseCx,
    content: &str,
    tag: &str,
    attrs_m: Option<regex::Match>,
) {
    let Some(attrs_m) = attrs_m else { return };
    let tag = tag.to_ascii_lowercase();
    let attrs = parse_attrs(attrs_m.as_str(), attrs_m.start());
    if strip_skip_attr(b, cx, &attrs) {
        return;
    }
    for attr in &attrs {
        let Some(value) = &attr.value else { continue };
        if value.text.is_empty() {
            continue;
        }
        let usage = match (tag.as_str(), attr.name.as_str()) {
            ("a" | "base", "href") => Usage::Local,
            ("link", "href") => Usage::Inline,
            ("form", "action") => Usage::Local,
            ("input" | "button", "formaction") => Usage::Local,
            ("object", "data") => Usage::Inline,
            ("img", "srcset") => {
                handle_srcset(b, cx, content, value);
                continue;
            }
            (_, "src" | "data-src") => Usage::Inline,
            _ => continue,
        };
        process_url(b, cx, value.span, &value.text, usage, attr_encoder(value));
    }
}

/// `srcset` is a comma-separated list of `url [descriptor]` entries; each
/// URL is rewritten in place.
fn handle_srcset(b: &mut Bundler, cx: &mut ParseCx, content: &str, value: &AttrValue) {
    let raw = &content[value.span.0..value.span.1];
    let mut offset = 0;
    for part in raw.split(',') {
        let lead = part.len() - part.trim_start().len();
        let entry = part.trim_start();
        let url_len = entry
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(entry.len());
        let url = &entry[..url_len];
        if !url.is_empty() {
            let start = value.span.0 + offset + lead;
            process_url(
                b,
                cx,
                (start, start + url_len),
                &decode_attr(url),
                Usage::Inline,
                UrlEncoder::HtmlAttr(value.quote.unwrap_or('"')),
            );
        }
        offset += part.len() + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_regex_order() {
        let caps = HTML_TOKEN_RE.captures("<!-- <img src=\"a.png\"> -->").unwrap();
        assert!(caps.name("comment").is_some());

        let caps = HTML_TOKEN_RE
            .captures("<script src=\"a.js\"></script>")
            .unwrap();
        assert_eq!(caps.name("script_attrs").unwrap().as_str(), " src=\"a.js\"");
        assert_eq!(caps.name("script_body").unwrap().as_str(), "");

        let caps = HTML_TOKEN_RE.captures("<img src=\"a.png\">").unwrap();
        assert_eq!(caps.name("tag_name").unwrap().as_str(), "img");
    }

    #[test]
    fn test_template_markers_opaque() {
        let caps = HTML_TOKEN_RE.captures("<% if (a) { %>").unwrap();
        assert!(caps.name("tpl").is_some());
        // doctype is not a template marker
        assert!(HTML_TOKEN_RE.captures("<!DOCTYPE html>").is_none());
    }

    #[test]
    fn test_parse_attrs_spans() {
        let attrs = parse_attrs(" src=\"a.png\" data-x=1 disabled", 100);
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].name, "src");
        let value = attrs[0].value.as_ref().unwrap();
        assert_eq!(value.text, "a.png");
        assert_eq!(value.quote, Some('"'));
        // span points inside the quotes, offset by the tag position
        assert_eq!(value.span, (106, 111));
        assert_eq!(attrs[2].name, "disabled");
        assert!(attrs[2].value.is_none());
    }

    #[test]
    fn test_attr_entities_decoded() {
        let attrs = parse_attrs(" href=\"a.png?x=1&amp;y=2\"", 0);
        let value = attrs[0].value.as_ref().unwrap();
        assert_eq!(value.text, "a.png?x=1&y=2");
    }
}
