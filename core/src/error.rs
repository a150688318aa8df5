//! Compile-time errors. Pairs a typed error with the span and source slice
//! it happened at, so it can render itself without extra context, and uses
//! `failure::Fail` for the error trait, trimmed to the single fatal case a
//! parser that stops at the first mismatch needs: everything else — unknown
//! identifiers, struct field misses, missing operator-table entries — is
//! absorbed silently rather than reported, since there's no diagnostics
//! channel wired up for them.

use crate::util::{self, Span};
use failure::Fail;
use std::fmt::{self, Display, Formatter};

/// The one case the parser can't recover from: the token stream didn't
/// contain what the grammar rule being matched required.
#[derive(Debug, Fail)]
pub struct CompileError {
    pub expected: String,
    pub found: String,
    pub span: Span,
}

impl CompileError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        CompileError {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error on line {}: expected {}, found `{}`",
            self.span.start_line, self.expected, self.found
        )
    }
}

/// Pairs a [CompileError] with the full source text, so the alternate
/// (`{:#}`) format can underline the offending span. Collapsed to a single
/// error since the parser stops at the first one.
#[derive(Debug, Fail)]
pub struct WithSource {
    error: CompileError,
    source: String,
}

impl WithSource {
    pub fn new(error: CompileError, source: String) -> Self {
        WithSource { error, source }
    }
}

impl Display for WithSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if f.alternate() {
            util::fmt_src_highlights(f, &self.error.span, &self.source)?;
        }
        Ok(())
    }
}
