// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Native-module shim table
//!
//! Maps Node.js built-in module names to the browser packages that stand
//! in for them, following the node-libs-browser table. A `None` shim
//! means the module has no browser equivalent and resolves to an empty
//! module.

/// Look up a built-in module name.
///
/// Returns `None` when `name` is not a native module at all;
/// `Some(None)` for a native module with no browser shim (an empty
/// module is substituted); `Some(Some(spec))` for the package specifier
/// resolved in its place.
pub fn shim_for(name: &str) -> Option<Option<&'static str>> {
    let shim = match name {
        "assert" => Some("assert"),
        "buffer" => Some("buffer"),
        "child_process" => None,
        "cluster" => None,
        "console" => Some("console-browserify"),
        "constants" => Some("constants-browserify"),
        "crypto" => Some("crypto-browserify"),
        "dgram" => None,
        "dns" => None,
        "domain" => Some("domain-browser"),
        "events" => Some("events"),
        "fs" => None,
        "http" => Some("stream-http"),
        "https" => Some("https-browserify"),
        "module" => None,
        "net" => None,
        "os" => Some("os-browserify/browser.js"),
        "path" => Some("path-browserify"),
        "process" => Some("process/browser.js"),
        "punycode" => Some("punycode"),
        "querystring" => Some("querystring-es3"),
        "readline" => None,
        "repl" => None,
        "stream" => Some("stream-browserify"),
        "string_decoder" => Some("string_decoder"),
        "sys" => Some("util/util.js"),
        "timers" => Some("timers-browserify"),
        "tls" => None,
        "tty" => Some("tty-browserify"),
        "url" => Some("url"),
        "util" => Some("util/util.js"),
        "vm" => Some("vm-browserify"),
        "zlib" => Some("browserify-zlib"),
        _ => return None,
    };
    Some(shim)
}

/// The statement prepended to a file that uses a native identifier, and
/// the module pulled in for it. `None` means the statement is
/// self-contained.
pub fn native_prepend(ident: &str) -> Option<(Option<&'static str>, &'static str)> {
    match ident {
        "Buffer" => Some((Some("buffer"), "var Buffer = require(\"buffer\").Buffer;\n")),
        "process" => Some((Some("process"), "var process = require(\"process\");\n")),
        "setImmediate" => Some((
            Some("timers"),
            "var setImmediate = require(\"timers\").setImmediate;\n",
        )),
        "clearImmediate" => Some((
            Some("timers"),
            "var clearImmediate = require(\"timers\").clearImmediate;\n",
        )),
        "global" => Some((
            None,
            "var global = typeof window !== \"undefined\" ? window : this;\n",
        )),
        _ => None,
    }
}
