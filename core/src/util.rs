//! Small helpers shared across the compiler that don't belong to any single
//! pipeline stage.

use std::fmt::{self, Formatter};

/// Macro that can wrap any body, and only executes the body if we are running
/// in debug mode. Debug mode is enabled by setting the environment variable
/// DEBUG=true. This compiles away to nothing when --release is used.
///
/// Example:
/// ```
/// use mxcc::debug;
/// debug!(println!("Hello!"));
/// ```
#[macro_export]
macro_rules! debug {
    ($arg:expr) => {
        #[cfg(debug_assertions)]
        {
            if let Ok(debug_val) = std::env::var("DEBUG") {
                if debug_val.to_lowercase().as_str() == "true" {
                    $arg
                }
            }
        }
    };
}

/// A span of source text, recorded on every token and AST node that a
/// diagnostic might need to point at. `offset`/`length` index into the raw
/// source string; `start_line`/`start_col`/`end_line`/`end_col` are the
/// human-facing 1-indexed position, as produced by `nom_locate`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    /// A span with no useful position, for synthetic nodes that the code
    /// generator builds without any corresponding source text.
    pub const fn dummy() -> Self {
        Self {
            offset: 0,
            length: 0,
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
        }
    }

    /// Slice the original source text down to the piece this span covers.
    pub fn get_source_slice<'a>(&self, src: &'a str) -> &'a str {
        let end = (self.offset + self.length).min(src.len());
        &src[self.offset.min(end)..end]
    }
}

/// Write the line(s) of `src` that `span` covers, prefixed with their line
/// number, followed by a line of `^` markers under the offending text. Used
/// by `Display` impls when the alternate (`{:#}`) flag is set.
pub fn fmt_src_highlights(
    f: &mut Formatter<'_>,
    span: &Span,
    src: &str,
) -> fmt::Result {
    let lines: Vec<&str> = src.lines().collect();
    for line_num in span.start_line..=span.end_line {
        if let Some(line) = lines.get(line_num.saturating_sub(1)) {
            writeln!(f, "{:>4} | {}", line_num, line)?;
            let start_col = if line_num == span.start_line {
                span.start_col
            } else {
                1
            };
            let end_col = if line_num == span.end_line {
                span.end_col
            } else {
                line.len() + 1
            };
            let marker_len = end_col.saturating_sub(start_col).max(1);
            writeln!(
                f,
                "     | {}{}",
                " ".repeat(start_col.saturating_sub(1)),
                "^".repeat(marker_len)
            )?;
        }
    }
    Ok(())
}
