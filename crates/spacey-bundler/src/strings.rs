// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! String literal helpers shared by the scanners and the emitter

/// Decode a JavaScript/CSS string literal body.
///
/// `value` is the text between the quotes. Unknown escapes decode to the
/// escaped character itself, matching how engines treat `"\q"`.
pub fn decode_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push('x');
                        out.push_str(&hex);
                    }
                }
            }
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            Some('\n') => {} // line continuation
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Encode a string as a quoted JavaScript literal using `quote` (`"` or `'`).
pub fn encode_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Strip one matching pair of surrounding quotes or parentheses, or a
/// leading `=`, from a directive argument.
pub fn trim_quotes(value: &str) -> &str {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let matched = matches!(
            (bytes[0], bytes[bytes.len() - 1]),
            (b'"', b'"') | (b'\'', b'\'') | (b'(', b')')
        );
        if matched {
            return value[1..value.len() - 1].trim();
        }
    }
    value.strip_prefix('=').map(str::trim).unwrap_or(value)
}

/// Decode an HTML attribute value (entity references).
pub fn decode_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let end = rest.find(';').filter(|&e| e <= 8);
        match end {
            Some(end) => {
                let entity = &rest[1..end];
                let decoded = match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    _ => entity
                        .strip_prefix('#')
                        .and_then(|num| {
                            if let Some(hex) = num.strip_prefix('x').or(num.strip_prefix('X')) {
                                u32::from_str_radix(hex, 16).ok()
                            } else {
                                num.parse().ok()
                            }
                        })
                        .and_then(char::from_u32),
                };
                match decoded {
                    Some(c) => {
                        out.push(c);
                        rest = &rest[end + 1..];
                    }
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Encode a string for use inside an HTML attribute quoted by `quote`.
///
/// Only the characters that would terminate or corrupt the attribute are
/// escaped, so the encoding is idempotent on attribute-legal input.
pub fn encode_attr(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' if quote == '"' => out.push_str("&quot;"),
            '\'' if quote == '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_string(r"a\nb"), "a\nb");
        assert_eq!(decode_string(r"a\tb"), "a\tb");
        assert_eq!(decode_string(r#"\"x\""#), "\"x\"");
        assert_eq!(decode_string(r"\x41"), "A");
        assert_eq!(decode_string(r"A"), "A");
        assert_eq!(decode_string(r"\q"), "q");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for s in ["", "plain", "with \"quotes\"", "line\nbreak", "back\\slash", "tab\there"] {
            let encoded = encode_string(s, '"');
            assert_eq!(decode_string(&encoded[1..encoded.len() - 1]), s);
            let encoded = encode_string(s, '\'');
            assert_eq!(decode_string(&encoded[1..encoded.len() - 1]), s);
        }
    }

    #[test]
    fn test_trim_quotes() {
        assert_eq!(trim_quotes("\"a.html\""), "a.html");
        assert_eq!(trim_quotes("'a.html'"), "a.html");
        assert_eq!(trim_quotes("(DEBUG)"), "DEBUG");
        assert_eq!(trim_quotes("= a.html"), "a.html");
        assert_eq!(trim_quotes("  bare  "), "bare");
    }

    #[test]
    fn test_attr_round_trip() {
        assert_eq!(decode_attr("a &amp; b"), "a & b");
        assert_eq!(decode_attr("&lt;x&gt;"), "<x>");
        assert_eq!(decode_attr("&#65;&#x42;"), "AB");
        assert_eq!(decode_attr("5 &up"), "5 &up");

        // encode(decode(v)) is idempotent on attribute-legal values
        for v in ["plain", "a &amp; b", "x.png?a=1", "&quot;q&quot;"] {
            let once = encode_attr(&decode_attr(v), '"');
            let twice = encode_attr(&decode_attr(&once), '"');
            assert_eq!(once, twice);
        }
    }
}
