// Message block engine
//
// This module holds everything that reads or rewrites MSG blocks inside a
// script blob:
// - Locator: finds block spans in strict or relaxed dialect
// - Splice: offset-tracked substitution of block contents
// - Tags: reversible placeholder protection of inline markup
// - Recombine: merges original and translated blocks into bilingual ones
// - Notes: strips annotations trailing speaker tags
// - Newlines: flattens machine-translated blocks around speaker headers

pub mod locator;
pub mod splice;
pub mod tags;
pub mod recombine;
pub mod notes;
pub mod newlines;

use serde::{Deserialize, Serialize};

pub use splice::*;
pub use tags::{PlaceholderMap, protect, restore};
pub use recombine::{RecombineOptions, SpeakerLinePolicy, recombine};
pub use notes::strip_notes;
pub use newlines::cleanup_newlines;

/// Marker conventions of a script dialect.
///
/// The defaults describe Lua long-string message calls as exported to JSON,
/// where line breaks inside a block are the escaped sequence `\r\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSyntax {
    /// Opening marker of a message block
    pub open: String,
    /// Closing marker of a message block
    pub close: String,
    /// Line break token used inside block bodies
    pub line_break: String,
    /// Comment token that may precede both markers of a strict block
    pub prefix: Option<String>,
}

impl Default for BlockSyntax {
    fn default() -> Self {
        Self {
            open: "MSG([[".to_string(),
            close: "]])".to_string(),
            line_break: "\\r\\n".to_string(),
            prefix: Some("--".to_string()),
        }
    }
}

/// Which block shape the locator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Original-language blocks: break-wrapped body, matching prefixes
    Strict,
    /// Anything between an open and a close marker
    Relaxed,
}

/// Half-open byte range `[start, end)` inside a script blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A located message block: where its content sits and what it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub span: Span,
    pub content: &'a str,
}

/// Split block content into lines on the syntax' break token
pub(crate) fn split_lines<'a>(content: &'a str, line_break: &str) -> Vec<&'a str> {
    if line_break.is_empty() {
        return vec![content];
    }
    content.split(line_break).collect()
}
