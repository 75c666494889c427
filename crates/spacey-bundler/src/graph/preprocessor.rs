// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Conditional-compilation state machine
//!
//! Evaluates `#if`/`#elif`/`#else`/`#endif` and `#region`/`#endregion`
//! directives found in comments. Suppressed branches become hidden
//! regions (deletion replacements) in the module's replacement list.
//!
//! Directive comments delete themselves; hidden regions open at the end
//! of the opening comment and close at the start of the closing one, so
//! the boundary edits stay adjacent and never overlap.

use crate::graph::replacement::{ReplacementData, ReplacementList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    If,
    Elif,
    Else,
    Region,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    truth: bool,
}

/// Per-module preprocessor state.
#[derive(Debug, Default)]
pub struct Preprocessor {
    frames: Vec<Frame>,
}

type Warning = Option<String>;

impl Preprocessor {
    /// Fresh state for one module load.
    pub fn new() -> Self {
        Self::default()
    }

    fn delete_comment(rep: &mut ReplacementList, start: usize, end: usize, len: usize) {
        let _ = rep.replace(start, end, ReplacementData::Literal(String::new()), len);
    }

    /// `#if expr` with the already-evaluated truth value.
    pub fn directive_if(
        &mut self,
        truth: bool,
        rep: &mut ReplacementList,
        start: usize,
        end: usize,
        len: usize,
    ) {
        Self::delete_comment(rep, start, end, len);
        self.frames.push(Frame {
            kind: FrameKind::If,
            truth,
        });
        if !truth {
            rep.begin_hidden(end, len);
        }
    }

    /// `#elif expr`: close the prior branch as `#else` would, then open a
    /// nested `#if`. The nested frame is popped together with its `elif`
    /// frame by [`directive_endif`].
    ///
    /// [`directive_endif`]: Preprocessor::directive_endif
    pub fn directive_elif(
        &mut self,
        truth: bool,
        rep: &mut ReplacementList,
        start: usize,
        end: usize,
        len: usize,
    ) -> Warning {
        let Some(top) = self.frames.last_mut() else {
            Self::delete_comment(rep, start, end, len);
            return Some("mismatched #elif".to_string());
        };
        if top.kind != FrameKind::If {
            Self::delete_comment(rep, start, end, len);
            return Some("mismatched #elif".to_string());
        }
        let prior = top.truth;
        if !prior {
            rep.end_hidden(start);
        }
        top.kind = FrameKind::Elif;
        top.truth = !prior;
        let else_truth = top.truth;
        Self::delete_comment(rep, start, end, len);
        if !else_truth {
            rep.begin_hidden(end, len);
        }
        self.frames.push(Frame {
            kind: FrameKind::If,
            truth,
        });
        if !truth {
            rep.begin_hidden(end, len);
        }
        None
    }

    /// `#else`
    pub fn directive_else(
        &mut self,
        rep: &mut ReplacementList,
        start: usize,
        end: usize,
        len: usize,
    ) -> Warning {
        let Some(top) = self.frames.last_mut() else {
            Self::delete_comment(rep, start, end, len);
            return Some("mismatched #else".to_string());
        };
        if top.kind != FrameKind::If {
            Self::delete_comment(rep, start, end, len);
            return Some("mismatched #else".to_string());
        }
        if !top.truth {
            rep.end_hidden(start);
        }
        top.truth = !top.truth;
        top.kind = FrameKind::Else;
        let truth = top.truth;
        Self::delete_comment(rep, start, end, len);
        if !truth {
            rep.begin_hidden(end, len);
        }
        None
    }

    /// `#endif`: pops the branch frame plus any `elif` frames under it.
    pub fn directive_endif(
        &mut self,
        rep: &mut ReplacementList,
        start: usize,
        end: usize,
        len: usize,
    ) -> Warning {
        let matches_top = self
            .frames
            .last()
            .is_some_and(|f| matches!(f.kind, FrameKind::If | FrameKind::Else));
        if !matches_top {
            Self::delete_comment(rep, start, end, len);
            return Some("mismatched #endif".to_string());
        }
        let top = self.frames.pop().expect("frame checked above");
        if !top.truth {
            rep.end_hidden(start);
        }
        while let Some(frame) = self.frames.last() {
            if frame.kind != FrameKind::Elif {
                break;
            }
            let frame = *frame;
            self.frames.pop();
            if !frame.truth {
                rep.end_hidden(start);
            }
        }
        Self::delete_comment(rep, start, end, len);
        None
    }

    /// `#region name` with the truth from `options.region`.
    pub fn directive_region(
        &mut self,
        truth: bool,
        rep: &mut ReplacementList,
        start: usize,
        end: usize,
        len: usize,
    ) {
        Self::delete_comment(rep, start, end, len);
        self.frames.push(Frame {
            kind: FrameKind::Region,
            truth,
        });
        if !truth {
            rep.begin_hidden(end, len);
        }
    }

    /// `#endregion`
    pub fn directive_endregion(
        &mut self,
        rep: &mut ReplacementList,
        start: usize,
        end: usize,
        len: usize,
    ) -> Warning {
        let matches_top = self
            .frames
            .last()
            .is_some_and(|f| f.kind == FrameKind::Region);
        if !matches_top {
            Self::delete_comment(rep, start, end, len);
            return Some("mismatched #endregion".to_string());
        }
        let top = self.frames.pop().expect("frame checked above");
        if !top.truth {
            rep.end_hidden(start);
        }
        Self::delete_comment(rep, start, end, len);
        None
    }

    /// Close anything left open at end of file. Returns one warning per
    /// unterminated frame.
    pub fn finish(&mut self, rep: &mut ReplacementList, len: usize) -> Vec<String> {
        let mut warnings = Vec::new();
        while let Some(frame) = self.frames.pop() {
            let name = match frame.kind {
                FrameKind::Region => "#region without #endregion",
                _ => "#if without #endif",
            };
            warnings.push(name.to_string());
            if !frame.truth {
                rep.end_hidden(len);
            }
        }
        while rep.hidden_open() {
            rep.end_hidden(len);
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::replacement::Replacement;

    // Apply literal-only replacements to content, for assertions.
    fn render(content: &str, items: &[Replacement]) -> String {
        let mut out = String::new();
        let mut cursor = 0;
        for rep in items {
            out.push_str(&content[cursor..rep.start]);
            if let ReplacementData::Literal(lit) = &rep.data {
                out.push_str(lit);
            }
            cursor = rep.end;
        }
        out.push_str(&content[cursor..]);
        out
    }

    // Drive the state machine over `content`, treating `[[...]]` spans as
    // directive comments.
    fn run(content: &str, truths: &[bool]) -> String {
        let mut pre = Preprocessor::new();
        let mut rep = ReplacementList::new();
        let len = content.len();
        let mut truth_iter = truths.iter().copied();
        let mut pos = 0;
        while let Some(open) = content[pos..].find("[[") {
            let start = pos + open;
            let close = content[start..].find("]]").expect("unclosed marker") + start + 2;
            let text = &content[start + 2..close - 2];
            let directive = text.trim();
            let (name, _arg) = directive
                .split_once(' ')
                .unwrap_or((directive, ""));
            match name {
                "#if" => pre.directive_if(truth_iter.next().unwrap(), &mut rep, start, close, len),
                "#elif" => {
                    pre.directive_elif(truth_iter.next().unwrap(), &mut rep, start, close, len);
                }
                "#else" => {
                    pre.directive_else(&mut rep, start, close, len);
                }
                "#endif" => {
                    pre.directive_endif(&mut rep, start, close, len);
                }
                "#region" => {
                    pre.directive_region(truth_iter.next().unwrap(), &mut rep, start, close, len)
                }
                "#endregion" => {
                    pre.directive_endregion(&mut rep, start, close, len);
                }
                other => panic!("unknown directive {other}"),
            }
            pos = close;
        }
        pre.finish(&mut rep, len);
        render(content, rep.items())
    }

    #[test]
    fn test_if_false_hides_branch() {
        let out = run("a[[#if X]]hidden[[#endif]]b", &[false]);
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_if_true_keeps_branch() {
        let out = run("a[[#if X]]kept[[#endif]]b", &[true]);
        assert_eq!(out, "akeptb");
    }

    #[test]
    fn test_if_else() {
        let out = run("[[#if X]]one[[#else]]two[[#endif]]", &[false]);
        assert_eq!(out, "two");
        let out = run("[[#if X]]one[[#else]]two[[#endif]]", &[true]);
        assert_eq!(out, "one");
    }

    #[test]
    fn test_elif_chain() {
        let src = "[[#if A]]a[[#elif B]]b[[#else]]c[[#endif]]";
        assert_eq!(run(src, &[true, false]), "a");
        assert_eq!(run(src, &[false, true]), "b");
        assert_eq!(run(src, &[false, false]), "c");
        // a taken branch suppresses every later arm, whatever it evaluates to
        assert_eq!(run(src, &[true, true]), "a");
    }

    #[test]
    fn test_nested_if() {
        let src = "[[#if A]]x[[#if B]]y[[#endif]]z[[#endif]]";
        assert_eq!(run(src, &[true, true]), "xyz");
        assert_eq!(run(src, &[true, false]), "xz");
        assert_eq!(run(src, &[false, true]), "");
    }

    #[test]
    fn test_region() {
        let src = "a[[#region r]]body[[#endregion]]b";
        assert_eq!(run(src, &[true]), "abodyb");
        assert_eq!(run(src, &[false]), "ab");
    }

    #[test]
    fn test_mismatched_directives_warn_without_state_change() {
        let mut pre = Preprocessor::new();
        let mut rep = ReplacementList::new();
        assert!(pre.directive_endif(&mut rep, 0, 4, 10).is_some());
        assert!(pre.directive_else(&mut rep, 4, 8, 10).is_some());
        assert!(pre.finish(&mut rep, 10).is_empty());
    }

    #[test]
    fn test_unterminated_if_closes_at_eof() {
        let out = run("a[[#if X]]tail", &[false]);
        assert_eq!(out, "a");
    }
}
