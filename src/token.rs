/// Source location of a character, for error reporting and token
/// introspection.
///
/// `lineno` and `offset` are 1-based. The zero value (see [`LineInfo::NONE`])
/// means "no location".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo {
    /// 1-based line number in the source.
    pub lineno: usize,
    /// 1-based column within the line.
    pub offset: usize,
    /// The source line, without its line terminator.
    pub text: Vec<u8>,
}

impl LineInfo {
    /// The invalid sentinel: no location.
    pub const NONE: Self = Self {
        lineno: 0,
        offset: 0,
        text: Vec::new(),
    };

    /// Whether this is the "no location" sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.lineno == 0
    }
}

/// Token kinds produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A single word, parsed with shell-style quoting.
    /// `text()` is the parsed value, quotes stripped.
    Word,
    /// A complete JSON object or array, possibly spanning lines.
    /// `text()` is the raw source from the opening bracket through the
    /// matching close. Only bracket/string balance is checked here; full
    /// validation happens when the value is decoded.
    Object,
    /// End of a directive. `text()` is the line ending that terminated it
    /// (`\n`, `\r\n`, or empty at end of input).
    Terminator,
    /// The source indented to open a new block.
    /// `text()` is the exact indentation of the new block.
    Indent,
    /// The source outdented to close one block. One is produced per block
    /// closed. `text()` is the exact indentation of the block being
    /// restored.
    Outdent,
    /// A comment. Usually ignored, but available for metadirectives.
    /// `text()` runs from the `#` through end of line, terminator excluded.
    Comment,
}

/// Maps an offset within a token's parsed text back to the source
/// coordinates it came from. Words record a stop at every quote boundary;
/// JSON objects record one at every line boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Charstop {
    /// Index within the parsed text.
    pub at: usize,
    /// 1-based source line.
    pub lineno: usize,
    /// 1-based source column.
    pub offset: usize,
    /// Byte index of the owning line's start within the token's source
    /// snapshot.
    pub line_start: usize,
}

/// A single token: its kind, parsed text, and a snapshot of the source
/// line(s) it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: Vec<u8>,
    source: Vec<u8>,
    charstops: Vec<Charstop>,
}

impl Token {
    pub(crate) fn new(
        kind: TokenKind,
        text: Vec<u8>,
        source: Vec<u8>,
        charstops: Vec<Charstop>,
    ) -> Self {
        Self {
            kind,
            text,
            source,
            charstops,
        }
    }

    /// A token whose source span sits entirely on one line.
    pub(crate) fn simple(
        kind: TokenKind,
        text: Vec<u8>,
        lineno: usize,
        offset: usize,
        source: Vec<u8>,
    ) -> Self {
        Self::new(
            kind,
            text,
            source,
            vec![Charstop {
                at: 0,
                lineno,
                offset,
                line_start: 0,
            }],
        )
    }

    /// The kind of this token.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The parsed value of this token. See [`TokenKind`] for the meaning
    /// per kind.
    #[must_use]
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Source coordinates of the character at index `at` within `text()`.
    ///
    /// Quote stripping and multi-line JSON spans are accounted for, so the
    /// returned column is the character's position in the original source.
    /// Returns [`LineInfo::NONE`] if no mapping exists.
    #[must_use]
    pub fn line_info(&self, at: usize) -> LineInfo {
        let Some(stop) = self.charstops.iter().rev().find(|stop| stop.at <= at) else {
            return LineInfo::NONE;
        };

        let rest = &self.source[stop.line_start..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let mut line = &rest[..end];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }

        LineInfo {
            lineno: stop.lineno,
            offset: stop.offset + (at - stop.at),
            text: line.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_sentinel() {
        assert!(LineInfo::NONE.is_none());
        assert!(
            !LineInfo {
                lineno: 1,
                offset: 1,
                text: Vec::new()
            }
            .is_none()
        );
    }

    #[test]
    fn simple_token_maps_first_character() {
        let token = Token::simple(
            TokenKind::Word,
            b"hello".to_vec(),
            3,
            5,
            b"    hello there\n".to_vec(),
        );
        let info = token.line_info(0);
        assert_eq!(info.lineno, 3);
        assert_eq!(info.offset, 5);
        assert_eq!(info.text, b"    hello there");
    }

    #[test]
    fn later_offsets_extend_from_the_stop() {
        let token = Token::simple(TokenKind::Word, b"hello".to_vec(), 1, 1, b"hello\n".to_vec());
        assert_eq!(token.line_info(4).offset, 5);
    }

    #[test]
    fn lookup_uses_the_last_applicable_stop() {
        // Parsed "prefix" from source "pre'fix'" -- the quoted run starts
        // at source column 5.
        let source = b"pre'fix'\n".to_vec();
        let token = Token::new(
            TokenKind::Word,
            b"prefix".to_vec(),
            source,
            vec![
                Charstop {
                    at: 0,
                    lineno: 1,
                    offset: 1,
                    line_start: 0,
                },
                Charstop {
                    at: 3,
                    lineno: 1,
                    offset: 5,
                    line_start: 0,
                },
            ],
        );
        assert_eq!(token.line_info(2).offset, 3);
        assert_eq!(token.line_info(3).offset, 5);
        assert_eq!(token.line_info(5).offset, 7);
    }

    #[test]
    fn multi_line_lookup_returns_the_owning_line() {
        // Source "key {\n  1\n}\n" with the object starting at column 5.
        let source = b"key {\n  1\n}\n".to_vec();
        let token = Token::new(
            TokenKind::Object,
            b"{\n  1\n}".to_vec(),
            source,
            vec![
                Charstop {
                    at: 0,
                    lineno: 1,
                    offset: 5,
                    line_start: 0,
                },
                Charstop {
                    at: 2,
                    lineno: 2,
                    offset: 1,
                    line_start: 6,
                },
                Charstop {
                    at: 6,
                    lineno: 3,
                    offset: 1,
                    line_start: 10,
                },
            ],
        );

        let info = token.line_info(0);
        assert_eq!((info.lineno, info.offset), (1, 5));
        assert_eq!(info.text, b"key {");

        let info = token.line_info(4);
        assert_eq!((info.lineno, info.offset), (2, 3));
        assert_eq!(info.text, b"  1");

        let info = token.line_info(6);
        assert_eq!((info.lineno, info.offset), (3, 1));
        assert_eq!(info.text, b"}");
    }

    #[test]
    fn crlf_stripped_from_line_text() {
        let token = Token::simple(TokenKind::Word, b"word".to_vec(), 1, 1, b"word\r\n".to_vec());
        assert_eq!(token.line_info(0).text, b"word");
    }
}
