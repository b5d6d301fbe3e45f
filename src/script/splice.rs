use crate::error::{Result, ScriptlocError};
use super::Span;

/// Replace each span of `blob` with its paired replacement.
///
/// Spans are given in the coordinates of the untouched `blob`, ascending and
/// non-overlapping. A running offset keeps later spans addressed correctly
/// once earlier replacements have changed the length of the text.
pub fn splice<S: AsRef<str>>(blob: &str, spans: &[Span], replacements: &[S]) -> Result<String> {
    validate_spans(blob, spans, replacements.len())?;

    let mut text = blob.to_string();
    let mut offset: isize = 0;

    for (span, replacement) in spans.iter().zip(replacements) {
        let replacement = replacement.as_ref();
        let start = shift(span.start, offset);
        let end = shift(span.end, offset);

        text.replace_range(start..end, replacement);
        offset += replacement.len() as isize - span.len() as isize;
    }

    Ok(text)
}

fn shift(position: usize, offset: isize) -> usize {
    position.saturating_add_signed(offset)
}

fn validate_spans(blob: &str, spans: &[Span], replacement_count: usize) -> Result<()> {
    if spans.len() != replacement_count {
        return Err(ScriptlocError::InvalidSpans(format!(
            "{} spans but {} replacements",
            spans.len(),
            replacement_count
        )));
    }

    let mut previous_end = 0;
    for (index, span) in spans.iter().enumerate() {
        if span.start > span.end {
            return Err(ScriptlocError::InvalidSpans(format!(
                "span {} is reversed ({}..{})",
                index, span.start, span.end
            )));
        }
        if span.start < previous_end {
            return Err(ScriptlocError::InvalidSpans(format!(
                "span {} ({}..{}) overlaps or precedes the previous span ending at {}",
                index, span.start, span.end, previous_end
            )));
        }
        if span.end > blob.len() {
            return Err(ScriptlocError::InvalidSpans(format!(
                "span {} ({}..{}) exceeds text length {}",
                index,
                span.start,
                span.end,
                blob.len()
            )));
        }
        if !blob.is_char_boundary(span.start) || !blob.is_char_boundary(span.end) {
            return Err(ScriptlocError::InvalidSpans(format!(
                "span {} ({}..{}) splits a character",
                index, span.start, span.end
            )));
        }
        previous_end = span.end;
    }

    Ok(())
}
