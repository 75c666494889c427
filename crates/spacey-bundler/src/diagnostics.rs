// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-module diagnostics collected during parsing and resolution

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity of a collected report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The build should be considered failed
    Error,
    /// The build can proceed
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// What to do when a recoverable problem is hit.
///
/// Drives the `resolve.notFound` / `resolve.nonLocal` knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Report an error
    #[default]
    Error,
    /// Report a warning
    Warning,
    /// Say nothing
    Ignore,
}

impl Action {
    /// The severity this action reports at, if any.
    pub fn severity(self) -> Option<Severity> {
        match self {
            Action::Error => Some(Severity::Error),
            Action::Warning => Some(Severity::Warning),
            Action::Ignore => None,
        }
    }
}

/// A diagnostic anchored to a byte range of a source file
#[derive(Debug, Clone)]
pub struct Report {
    /// Severity of the report
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// File the report refers to
    pub file: PathBuf,
    /// Start byte index into the file's content
    pub start: usize,
    /// End byte index (exclusive)
    pub end: usize,
    /// Underlying cause, if any
    pub cause: Option<String>,
}

impl Report {
    /// A short excerpt of the offending source range.
    pub fn excerpt<'a>(&self, content: &'a str) -> &'a str {
        let start = self.start.min(content.len());
        let mut end = self.end.min(content.len()).max(start);
        // Cap the excerpt at one line.
        if let Some(nl) = content[start..end].find('\n') {
            end = start + nl;
        }
        while !content.is_char_boundary(end) {
            end += 1;
        }
        &content[start..end]
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.file.display(),
            self.severity,
            self.message
        )?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_severity() {
        assert_eq!(Action::Error.severity(), Some(Severity::Error));
        assert_eq!(Action::Warning.severity(), Some(Severity::Warning));
        assert_eq!(Action::Ignore.severity(), None);
    }

    #[test]
    fn test_excerpt_caps_at_line() {
        let report = Report {
            severity: Severity::Warning,
            message: "test".into(),
            file: PathBuf::from("a.js"),
            start: 0,
            end: 14,
            cause: None,
        };
        assert_eq!(report.excerpt("var a;\nvar b;\n"), "var a;");
    }
}
