use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScriptlocError};
use super::{BlockSyntax, Dialect, Span, splice, split_lines};

/// What happens to a speaker tag heading the original-language body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerLinePolicy {
    /// Drop the whole speaker line; the translated side already names the speaker
    #[default]
    Drop,
    /// Remove only the `【name】` group and keep the rest of the line
    StripBrackets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecombineOptions {
    pub speaker_line: SpeakerLinePolicy,
    /// Column width used to estimate how many lines the translation takes
    pub wrap_width: usize,
    /// Above this many estimated lines the original body is flattened
    pub max_combined_lines: usize,
}

impl Default for RecombineOptions {
    fn default() -> Self {
        Self {
            speaker_line: SpeakerLinePolicy::Drop,
            wrap_width: 70,
            max_combined_lines: 4,
        }
    }
}

impl RecombineOptions {
    pub fn with_speaker_line(mut self, policy: SpeakerLinePolicy) -> Self {
        self.speaker_line = policy;
        self
    }
}

/// Merge every original block with its translated counterpart.
///
/// Original blocks are read in strict dialect, falling back to relaxed when
/// none are found; translated blocks are always relaxed. Counts must agree.
pub fn recombine(
    original: &str,
    translated: &str,
    syntax: &BlockSyntax,
    options: &RecombineOptions,
) -> Result<String> {
    let (original_blocks, dialect) = syntax.locate_with_fallback(original);
    let translated_blocks = syntax.locate(translated, Dialect::Relaxed);

    if original_blocks.len() != translated_blocks.len() {
        return Err(ScriptlocError::StructuralMismatch {
            original: original_blocks.len(),
            translated: translated_blocks.len(),
        });
    }

    debug!(
        "Recombining {} blocks (original read as {:?})",
        original_blocks.len(),
        dialect
    );

    let spans: Vec<Span> = original_blocks.iter().map(|b| b.span).collect();
    let merged: Vec<String> = original_blocks
        .iter()
        .zip(&translated_blocks)
        .map(|(orig, trans)| merge_block(orig.content, trans.content, syntax, options))
        .collect();

    splice(original, &spans, &merged)
}

/// Render one bilingual block: translation first, then the original body
pub fn merge_block(
    original: &str,
    translated: &str,
    syntax: &BlockSyntax,
    options: &RecombineOptions,
) -> String {
    let line_break = syntax.line_break.as_str();
    let original = collapse_breaks(original, line_break);
    let original = original.trim();
    let translated = collapse_breaks(translated, line_break);
    let translated = translated.trim();

    // Lines after the first keep their relative indentation.
    let mut body: Vec<String> = split_lines(original, line_break)
        .into_iter()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();
    apply_speaker_policy(&mut body, options.speaker_line);

    let english_line = flatten(translated, line_break);
    let english_lines = wrapped_line_count(&english_line, options.wrap_width);
    let original_lines = body.len();

    let original_side = if body.is_empty() {
        String::new()
    } else if english_lines + original_lines > options.max_combined_lines && original_lines > 1 {
        let joined: Vec<&str> = body.iter().map(|line| line.trim()).collect();
        joined.join(" ")
    } else {
        body.join(line_break)
    };

    let english_side = if english_line.is_empty() {
        String::new()
    } else {
        isolate_speaker_tag(&english_line, line_break)
    };

    match (english_side.trim().is_empty(), original_side.trim().is_empty()) {
        (false, false) => format!(
            "{}{}{}",
            english_side.trim_end(),
            line_break,
            original_side.trim_start()
        ),
        (false, true) => english_side,
        (true, false) => original_side,
        (true, true) => String::new(),
    }
}

fn apply_speaker_policy(body: &mut Vec<String>, policy: SpeakerLinePolicy) {
    let Some(first) = body.first() else {
        return;
    };
    let Some((start, end)) = leading_speaker_tag(first) else {
        return;
    };

    match policy {
        SpeakerLinePolicy::Drop => {
            body.remove(0);
        }
        SpeakerLinePolicy::StripBrackets => {
            let stripped = format!("{}{}", &first[..start], &first[end..]);
            if stripped.trim().is_empty() {
                body.remove(0);
            } else {
                body[0] = stripped;
            }
        }
    }
}

/// Byte range of a `【name】` group opening `line` after its indentation
fn leading_speaker_tag(line: &str) -> Option<(usize, usize)> {
    let start = line.len() - line.trim_start().len();
    let rest = &line[start..];
    if !rest.starts_with('【') {
        return None;
    }
    let close = rest.find('】')?;
    Some((start, start + close + '】'.len_utf8()))
}

/// Put a break token on both sides of a leading speaker tag
fn isolate_speaker_tag(line: &str, line_break: &str) -> String {
    match leading_speaker_tag(line) {
        Some((start, end)) => format!(
            "{}{}{}{}{}",
            &line[..start],
            line_break,
            &line[start..end],
            line_break,
            &line[end..]
        ),
        None => line.to_string(),
    }
}

/// Collapse runs of consecutive break tokens into one
fn collapse_breaks(content: &str, line_break: &str) -> String {
    if line_break.is_empty() {
        return content.to_string();
    }
    let doubled = line_break.repeat(2);
    let mut collapsed = content.to_string();
    while collapsed.contains(&doubled) {
        collapsed = collapsed.replace(&doubled, line_break);
    }
    collapsed
}

/// Single-line form of a block: break tokens and whitespace runs become one space
fn flatten(content: &str, line_break: &str) -> String {
    let spaced = if line_break.is_empty() {
        content.to_string()
    } else {
        content.replace(line_break, " ")
    };
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Estimate the number of lines `text` occupies when greedily word-wrapped.
///
/// Words longer than `width` are broken: their head fills what is left of
/// the current line and the rest runs on in full-width pieces.
pub fn wrapped_line_count(text: &str, width: usize) -> usize {
    let width = width.max(1);
    let mut lines = 0;
    let mut current = 0;

    for word in text.split_whitespace() {
        let mut len = word.chars().count();
        if current > 0 && current + 1 + len <= width {
            current += 1 + len;
            continue;
        }
        if current > 0 && len > width {
            len -= width.saturating_sub(current + 1);
        }

        let needed = len.div_ceil(width).max(1);
        lines += needed;
        current = len - (needed - 1) * width;
    }

    lines
}
