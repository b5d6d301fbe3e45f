use std::borrow::Cow;

use crate::error::Result;
use super::{BlockSyntax, Dialect, Span, splice};

const TAG_OPEN: char = '【';
const TAG_CLOSE: char = '】';

/// Remove the annotations trailing speaker tags in every block of `blob`.
///
/// `【Erika】Serious\r\n` becomes `【Erika】\r\n`. Blocks without such an
/// annotation are left byte-for-byte untouched.
pub fn strip_notes(blob: &str, syntax: &BlockSyntax) -> Result<String> {
    let mut spans: Vec<Span> = Vec::new();
    let mut replacements: Vec<String> = Vec::new();

    for block in syntax.locate(blob, Dialect::Relaxed) {
        if let Cow::Owned(stripped) = strip_block_notes(block.content, &syntax.line_break) {
            spans.push(block.span);
            replacements.push(stripped);
        }
    }

    splice(blob, &spans, &replacements)
}

/// Strip speaker annotations inside a single block's content
pub fn strip_block_notes<'a>(content: &'a str, line_break: &str) -> Cow<'a, str> {
    if line_break.is_empty() {
        return Cow::Borrowed(content);
    }

    let mut out = String::new();
    let mut rest = content;
    let mut changed = false;

    while let Some(open) = rest.find(TAG_OPEN) {
        let name_start = open + TAG_OPEN.len_utf8();
        let Some(close) = rest[name_start..].find(TAG_CLOSE) else {
            break;
        };
        let tag_end = name_start + close + TAG_CLOSE.len_utf8();
        out.push_str(&rest[..tag_end]);

        let tail = &rest[tag_end..];
        let annotation_end = match tail.find(line_break) {
            Some(end) if close > 0 && end > 0 && !tail[..end].contains(['\r', '\n']) => Some(end),
            _ => None,
        };

        match annotation_end {
            Some(end) => {
                out.push_str(line_break);
                rest = &tail[end + line_break.len()..];
                changed = true;
            }
            None => rest = tail,
        }
    }

    if !changed {
        return Cow::Borrowed(content);
    }
    out.push_str(rest);
    Cow::Owned(out)
}
