// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module graph: records, relations, replacements, resolution and
//! the preprocessor.

pub mod expr;
pub mod module;
pub mod preprocessor;
pub mod replacement;
pub mod resolver;
pub mod shims;

pub use module::{all_externals, all_requires, has_included, ModuleData, ModuleId};
pub use replacement::{Replacement, ReplacementData, ReplacementList, UrlEncoder, UrlRewrite};
pub use resolver::{resolve_query, InlineQuery, Resolved, Usage};
