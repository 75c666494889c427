// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CSS scanner
//!
//! Recognises comments, `@import` statements (disposition configured by
//! `css.import`), bare `url(...)` references and IE-filter `src=`
//! arguments.

use super::{handle_comment, process_url, push_url_rewrite, ParseCx};
use crate::bundler::Bundler;
use crate::graph::replacement::{ReplacementData, UrlEncoder};
use crate::graph::resolver::{resolve_url, strip_marker, Usage};
use crate::options::CssImport;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static CSS_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)(?P<comment>/\*.*?\*/)",
        r#"|(?P<import>@import\b\s*(?:url\s*\(\s*(?:"(?P<iu_dq>[^"]*)"|'(?P<iu_sq>[^']*)'|(?P<iu_bare>[^)"']*))\s*\)|"(?P<is_dq>[^"]*)"|'(?P<is_sq>[^']*)')[^;]*;?)"#,
        r#"|url\s*\(\s*(?:"(?P<u_dq>[^"]*)"|'(?P<u_sq>[^']*)'|(?P<u_bare>[^)"'\s]*))\s*\)"#,
        r#"|src\s*=\s*(?:"(?P<s_dq>[^"]*)"|'(?P<s_sq>[^']*)'|(?P<s_bare>[^\s,)]*))"#,
    ))
    .unwrap()
});

pub(crate) fn parse(b: &mut Bundler, cx: &mut ParseCx) {
    let content = Arc::clone(&cx.content);
    let len = content.len();
    for caps in CSS_TOKEN_RE.captures_iter(&content) {
        if let Some(m) = caps.name("comment") {
            let body_end = m.end().saturating_sub(2).max(m.start() + 2);
            handle_comment(
                b,
                cx,
                (m.start(), m.end()),
                m.start() + 2,
                &content[m.start() + 2..body_end],
            );
            continue;
        }
        if let Some(import) = caps.name("import") {
            let url = ["iu_dq", "iu_sq", "iu_bare", "is_dq", "is_sq"]
                .into_iter()
                .find_map(|g| caps.name(g));
            let Some(url) = url else { continue };
            let span = (url.start(), url.end());
            let text = url.as_str().trim().to_string();
            if text.is_empty() {
                continue;
            }
            match b.modules[cx.id.0].options.css.import {
                CssImport::None => {}
                CssImport::Url => {
                    if let Some(stripped) = strip_marker(&text, "__skip") {
                        let rep = &mut b.modules[cx.id.0].replacements;
                        let _ = rep.replace(
                            span.0,
                            span.1,
                            ReplacementData::Literal(stripped),
                            len,
                        );
                    } else if let Some(resolved) =
                        resolve_url(b, cx.id, &text, Usage::Inline, span)
                    {
                        push_url_rewrite(b, cx, span, resolved, true, UrlEncoder::Raw);
                    }
                }
                CssImport::Inline => {
                    if let Some(resolved) = resolve_url(b, cx.id, &text, Usage::Inline, span) {
                        b.require_edge(cx.id, resolved.module);
                        let rep = &mut b.modules[cx.id.0].replacements;
                        let _ = rep.replace(
                            import.start(),
                            import.end(),
                            ReplacementData::Literal(String::new()),
                            len,
                        );
                    }
                }
                CssImport::Function => {
                    let replacement = b.hooks.css_import.as_ref().and_then(|hook| {
                        hook(&text, b.modules[cx.id.0].file.path())
                    });
                    if let Some(replacement) = replacement {
                        let rep = &mut b.modules[cx.id.0].replacements;
                        let _ = rep.replace(
                            import.start(),
                            import.end(),
                            ReplacementData::Literal(replacement),
                            len,
                        );
                    }
                }
            }
            continue;
        }
        if let Some(url) = ["u_dq", "u_sq", "u_bare"].into_iter().find_map(|g| caps.name(g)) {
            let text = url.as_str().trim();
            if !text.is_empty() {
                process_url(
                    b,
                    cx,
                    (url.start(), url.end()),
                    text,
                    Usage::Inline,
                    UrlEncoder::Raw,
                );
            }
            continue;
        }
        if let Some(url) = ["s_dq", "s_sq", "s_bare"].into_iter().find_map(|g| caps.name(g)) {
            let text = url.as_str().trim();
            if !text.is_empty() {
                process_url(
                    b,
                    cx,
                    (url.start(), url.end()),
                    text,
                    Usage::Inline,
                    UrlEncoder::Raw,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_regex_import_forms() {
        let caps = CSS_TOKEN_RE
            .captures("@import url(\"base.css\") screen;")
            .unwrap();
        assert_eq!(caps.name("iu_dq").unwrap().as_str(), "base.css");

        let caps = CSS_TOKEN_RE.captures("@import 'theme.css';").unwrap();
        assert_eq!(caps.name("is_sq").unwrap().as_str(), "theme.css");
    }

    #[test]
    fn test_token_regex_url_and_src() {
        let caps = CSS_TOKEN_RE
            .captures("background: url(img/bg.png);")
            .unwrap();
        assert_eq!(caps.name("u_bare").unwrap().as_str(), "img/bg.png");

        let caps = CSS_TOKEN_RE
            .captures("filter: alpha(src='x.png');")
            .unwrap();
        assert_eq!(caps.name("s_sq").unwrap().as_str(), "x.png");
    }

    #[test]
    fn test_comment_matched_before_url() {
        let caps = CSS_TOKEN_RE.captures("/* url(a.png) */").unwrap();
        assert!(caps.name("comment").is_some());
    }
}
