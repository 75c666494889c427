// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-bundler
//!
//! The module graph engine behind the `spack` web-asset bundler.
//!
//! Given an entry asset (JavaScript, CSS, HTML, JSON or an arbitrary
//! resource), the engine discovers every transitively referenced asset,
//! rewrites inter-asset links, optionally inlines small assets as data
//! URLs, evaluates conditional-compilation directives, and composes a
//! single concatenated output with an optional source map.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use spacey_bundler::{Bundler, Options, OsFileSystem};
//! use std::path::Path;
//!
//! fn main() -> spacey_bundler::Result<()> {
//!     let options: Options = serde_json::from_str(r#"{"target": "tpack"}"#)?;
//!     let mut bundler = Bundler::new(options, OsFileSystem);
//!     let entry = bundler.get_module(Path::new("www/main.js"))?;
//!     for output in bundler.save(entry) {
//!         println!("{}", output.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Structure
//!
//! - [`graph`] — module records, the three relations (requires,
//!   includes, externals), the replacement store, URL resolution and the
//!   preprocessor state machine
//! - the per-kind scanners (JS, CSS, HTML), internal to the crate
//! - [`Bundler`] — the session: arena, memoised module construction,
//!   output composition

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundler;
pub mod diagnostics;
mod emit;
pub mod error;
pub mod file;
pub mod fs;
pub mod graph;
mod modules;
pub mod options;
pub mod strings;
pub mod writer;

// Re-exports
pub use bundler::{Bundler, Hooks, SaveOutput};
pub use diagnostics::{Action, Report, Severity};
pub use error::{BundlerError, Result};
pub use file::{ModuleType, SourceFile};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use graph::{resolve_query, InlineQuery, ModuleId, Usage};
pub use options::{Options, Target};
pub use strings::{decode_attr, decode_string, encode_attr, encode_string, trim_quotes};
pub use writer::Writer;

/// Version of the bundler engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
