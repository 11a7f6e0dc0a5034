use serde::{Deserialize, Serialize};

/// Half-open byte range into the analysed source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct SourceSpan {
    pub start: u32,
    pub end: u32,
}

impl SourceSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, other: SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn slice<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(self.start as usize..self.end as usize)
    }
}

impl From<oxc_span::Span> for SourceSpan {
    fn from(span: oxc_span::Span) -> Self {
        Self::new(span.start, span.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Line start table used to turn byte offsets into 1-based line/column pairs.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx as u32 + 1);
            }
        }
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Offsets past the end clamp to the last position.
    pub fn location(&self, offset: u32) -> SourceLocation {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        SourceLocation {
            line: line as u32 + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }
}

/// Splits `text` on ASCII/Unicode whitespace, yielding each token with its
/// byte offset relative to the start of `text`.
pub fn split_tokens(text: &str) -> Vec<(u32, &str)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                tokens.push((begin as u32, &text[begin..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        tokens.push((begin as u32, &text[begin..]));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tokens_offsets() {
        let tokens = split_tokens("  flex  items-center\tp-4\n");
        assert_eq!(tokens, vec![(2, "flex"), (8, "items-center"), (21, "p-4")]);
    }

    #[test]
    fn test_split_tokens_empty() {
        assert!(split_tokens("").is_empty());
        assert!(split_tokens("   \n ").is_empty());
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.location(0), SourceLocation { line: 1, column: 1 });
        assert_eq!(index.location(4), SourceLocation { line: 2, column: 2 });
        assert_eq!(index.location(6), SourceLocation { line: 3, column: 1 });
        assert_eq!(index.location(8), SourceLocation { line: 4, column: 2 });
        assert_eq!(index.location(100), SourceLocation { line: 4, column: 3 });
    }
}
