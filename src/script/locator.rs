use super::{Block, BlockSyntax, Dialect, Span};

impl BlockSyntax {
    /// Locate message blocks in `blob`, left to right.
    ///
    /// The locator never falls back from strict to relaxed on its own; callers
    /// that want that policy use [`BlockSyntax::locate_with_fallback`].
    pub fn locate<'a>(&self, blob: &'a str, dialect: Dialect) -> Vec<Block<'a>> {
        if self.open.is_empty() || self.close.is_empty() {
            return Vec::new();
        }

        match dialect {
            Dialect::Strict => self.locate_strict(blob),
            Dialect::Relaxed => self.locate_relaxed(blob),
        }
    }

    /// Strict first, relaxed when strict finds nothing
    pub fn locate_with_fallback<'a>(&self, blob: &'a str) -> (Vec<Block<'a>>, Dialect) {
        let strict = self.locate(blob, Dialect::Strict);
        if !strict.is_empty() {
            return (strict, Dialect::Strict);
        }
        (self.locate(blob, Dialect::Relaxed), Dialect::Relaxed)
    }

    fn locate_relaxed<'a>(&self, blob: &'a str) -> Vec<Block<'a>> {
        let mut blocks = Vec::new();
        let mut cursor = 0;

        while let Some(found) = blob[cursor..].find(self.open.as_str()) {
            let body_start = cursor + found + self.open.len();
            let Some(close_offset) = blob[body_start..].find(self.close.as_str()) else {
                break;
            };
            let body_end = body_start + close_offset;

            blocks.push(Block {
                span: Span::new(body_start, body_end),
                content: &blob[body_start..body_end],
            });
            cursor = body_end + self.close.len();
        }

        blocks
    }

    fn locate_strict<'a>(&self, blob: &'a str) -> Vec<Block<'a>> {
        let mut blocks = Vec::new();
        let mut cursor = 0;

        while let Some(found) = blob[cursor..].find(self.open.as_str()) {
            let open_at = cursor + found;
            match self.match_strict_at(blob, open_at) {
                Some((block, resume)) => {
                    blocks.push(block);
                    cursor = resume;
                }
                None => cursor = open_at + self.open.len(),
            }
        }

        blocks
    }

    /// Try to read one strict block whose open marker starts at `open_at`.
    ///
    /// Returns the block and the offset just past its close marker.
    fn match_strict_at<'a>(&self, blob: &'a str, open_at: usize) -> Option<(Block<'a>, usize)> {
        if self.line_break.is_empty() {
            return None;
        }

        let prefix = self.opening_prefix(&blob[..open_at]);

        let after_open = open_at + self.open.len();
        if !blob[after_open..].starts_with(self.line_break.as_str()) {
            return None;
        }
        let body_start = after_open + self.line_break.len();

        // A long string ends at its first terminator, so only that one is a candidate.
        let close_at = body_start + blob[body_start..].find(self.close.as_str())?;
        let head = &blob[body_start..close_at];

        // The closing prefix is optional even when the open marker carries one.
        let body = prefix
            .and_then(|prefix| self.strict_body(head, Some(prefix)))
            .or_else(|| self.strict_body(head, None))?;
        let body_end = body_start + body.len();

        Some((
            Block {
                span: Span::new(body_start, body_end),
                content: body,
            },
            close_at + self.close.len(),
        ))
    }

    /// Body of `head` once its `break, ws, [prefix], ws` tail is cut off
    fn strict_body<'a>(&self, head: &'a str, prefix: Option<&str>) -> Option<&'a str> {
        let head = match prefix {
            Some(prefix) => head.trim_end().strip_suffix(prefix)?,
            None => head,
        };
        let break_at = head.rfind(self.line_break.as_str())?;
        if !head[break_at + self.line_break.len()..].trim().is_empty() {
            return None;
        }
        Some(&head[..break_at])
    }

    /// Prefix token standing on the same line right before an open marker
    fn opening_prefix(&self, before: &str) -> Option<&str> {
        let prefix = self.prefix.as_deref().filter(|p| !p.is_empty())?;
        before
            .trim_end_matches(is_inline_space)
            .ends_with(prefix)
            .then_some(prefix)
    }
}

fn is_inline_space(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax() -> BlockSyntax {
        BlockSyntax::default()
    }

    fn contents<'a>(blocks: &[Block<'a>]) -> Vec<&'a str> {
        blocks.iter().map(|b| b.content).collect()
    }

    #[test]
    fn test_strict_blocks_in_order() {
        let blob = r"a = 1
MSG([[\r\n    first\r\n]])
b = 2
MSG([[\r\n    second\r\n    line\r\n]])";
        let blocks = syntax().locate(blob, Dialect::Strict);

        assert_eq!(contents(&blocks), vec!["    first", r"    second\r\n    line"]);
        for block in &blocks {
            assert_eq!(&blob[block.span.start..block.span.end], block.content);
        }
        assert!(blocks[0].span.end < blocks[1].span.start);
    }

    #[test]
    fn test_strict_body_ends_at_last_break_before_close() {
        let blob = r"MSG([[\r\n    【ミナト】\r\n    こんにちは\r\n    \r\n]])";
        let blocks = syntax().locate(blob, Dialect::Strict);

        assert_eq!(contents(&blocks), vec![r"    【ミナト】\r\n    こんにちは\r\n    "]);
    }

    #[test]
    fn test_strict_closing_prefix_is_optional() {
        let both = r"-- MSG([[\r\ncommented\r\n-- ]])";
        assert_eq!(contents(&syntax().locate(both, Dialect::Strict)), vec!["commented"]);

        let open_only = r"-- MSG([[\r\ncommented\r\n]])";
        assert_eq!(contents(&syntax().locate(open_only, Dialect::Strict)), vec!["commented"]);

        let close_only = r"MSG([[\r\ncommented\r\n-- ]])";
        assert!(syntax().locate(close_only, Dialect::Strict).is_empty());
    }

    #[test]
    fn test_strict_prefixed_block_followed_by_plain_block() {
        let blob = r"-- MSG([[\r\nA\r\n]]) MSG([[\r\nB\r\n]])";
        assert_eq!(contents(&syntax().locate(blob, Dialect::Strict)), vec!["A", "B"]);
    }

    #[test]
    fn test_strict_prefix_on_previous_line_is_ignored() {
        let blob = "x = 1 --\n".to_string() + r"MSG([[\r\nbody\r\n]])";
        assert_eq!(contents(&syntax().locate(&blob, Dialect::Strict)), vec!["body"]);
    }

    #[test]
    fn test_strict_requires_break_after_open() {
        let blob = "MSG([[ plain text ]])";
        assert!(syntax().locate(blob, Dialect::Strict).is_empty());
        assert_eq!(contents(&syntax().locate(blob, Dialect::Relaxed)), vec![" plain text "]);
    }

    #[test]
    fn test_strict_rejected_block_does_not_swallow_next_one() {
        let blob = r"MSG([[\r\nbroken]]) MSG([[\r\ngood\r\n]])";
        assert_eq!(contents(&syntax().locate(blob, Dialect::Strict)), vec!["good"]);
    }

    #[test]
    fn test_relaxed_captures_across_breaks() {
        let blob = "MSG([[ 【Minato】\n Hello. ]]) x MSG([[Bye]])";
        assert_eq!(
            contents(&syntax().locate(blob, Dialect::Relaxed)),
            vec![" 【Minato】\n Hello. ", "Bye"]
        );
    }

    #[test]
    fn test_unterminated_block_is_ignored() {
        let blob = "MSG([[done]]) MSG([[never closed";
        assert_eq!(contents(&syntax().locate(blob, Dialect::Relaxed)), vec!["done"]);
        assert!(syntax().locate(r"MSG([[\r\nnever", Dialect::Strict).is_empty());
    }

    #[test]
    fn test_fallback_yields_relaxed_count() {
        let blob = "MSG([[one]]) MSG([[two]]) MSG([[three]])";
        assert!(syntax().locate(blob, Dialect::Strict).is_empty());

        let (blocks, dialect) = syntax().locate_with_fallback(blob);
        assert_eq!(dialect, Dialect::Relaxed);
        assert_eq!(blocks.len(), syntax().locate(blob, Dialect::Relaxed).len());
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_custom_syntax() {
        let syntax = BlockSyntax {
            open: "<<".to_string(),
            close: ">>".to_string(),
            line_break: "\n".to_string(),
            prefix: None,
        };
        let blob = "<<\nhello\n>> and <<\nworld\n  >>";
        assert_eq!(contents(&syntax.locate(blob, Dialect::Strict)), vec!["hello", "world"]);
    }
}
