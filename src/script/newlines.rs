use super::split_lines;

/// Flatten a machine-translated block onto one line around its speaker headers.
///
/// A header is a line starting with `【name】` (an annotation may follow)
/// with a break token on both sides; it keeps both breaks. Every other break
/// becomes a space and whitespace runs collapse to a single space.
pub fn cleanup_newlines(content: &str, line_break: &str) -> String {
    if line_break.is_empty() {
        return collapse_whitespace(content);
    }

    let segments = split_lines(content, line_break);
    let last = segments.len() - 1;

    let mut result = String::with_capacity(content.len());
    let mut plain = String::new();
    // whether the break before the current segment belongs to a header
    let mut leading_break_used = false;

    for (index, segment) in segments.iter().enumerate() {
        let is_header = index > 0 && index < last && !leading_break_used && is_speaker_header(segment);

        if is_header {
            result.push_str(&collapse_whitespace(&plain));
            plain.clear();

            result.push_str(line_break);
            result.push_str(segment);
            result.push_str(line_break);
            leading_break_used = true;
            continue;
        }

        if index > 0 && !leading_break_used {
            plain.push(' ');
        }
        plain.push_str(segment);
        leading_break_used = false;
    }

    result.push_str(&collapse_whitespace(&plain));
    result
}

fn is_speaker_header(segment: &str) -> bool {
    let Some(rest) = segment.trim_start().strip_prefix('【') else {
        return false;
    };
    match rest.find('】') {
        Some(close) if close > 0 => !rest[close..].contains(['\r', '\n']),
        _ => false,
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BREAK: &str = r"\r\n";

    #[test]
    fn test_keeps_header_breaks_and_joins_the_rest() {
        let content = r"\r\n【Minato】Smile\r\nHello\r\n   there.\r\n";
        assert_eq!(cleanup_newlines(content, BREAK), r"\r\n【Minato】Smile\r\nHello there. ");
    }

    #[test]
    fn test_without_header_everything_joins() {
        let content = r" First line\r\n  second line\r\n";
        assert_eq!(cleanup_newlines(content, BREAK), " First line second line ");
    }

    #[test]
    fn test_header_needs_breaks_on_both_sides() {
        let content = r"【Minato】 Hello\r\nworld";
        assert_eq!(cleanup_newlines(content, BREAK), "【Minato】 Hello world");
    }

    #[test]
    fn test_indented_header_is_kept_verbatim() {
        let content = r"Hi.\r\n    【Erika】  Serious\r\nYes.";
        assert_eq!(cleanup_newlines(content, BREAK), r"Hi.\r\n    【Erika】  Serious\r\nYes.");
    }
}
