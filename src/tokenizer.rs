use std::io::BufRead;

use crate::error::{Error, ErrorKind};
use crate::token::{Charstop, LineInfo, Token, TokenKind};

/// What the tokenizer last produced, which drives the next transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Word,
    Object,
    Terminator,
    Indent,
    Outdent,
}

/// Streaming tokenizer for the indentfile syntax.
///
/// Input is read one line at a time; a line stays in memory until fully
/// consumed. Tokens own a snapshot of their source line(s), so they remain
/// valid after the tokenizer moves on.
///
/// End of stream is reached only after every open block has been closed by
/// synthetic [`TokenKind::Outdent`] tokens. Once a syntax error has been
/// returned, further calls yield end of stream.
pub struct Tokenizer<R> {
    reader: R,
    line: Vec<u8>,
    have_line: bool,
    lineno: usize,
    offset: usize,
    prev: Prev,
    last_word_end: usize,
    indent_stack: Vec<Vec<u8>>,
    outdenting: bool,
    done: bool,
}

impl<R: BufRead> Tokenizer<R> {
    /// Create a tokenizer over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            have_line: false,
            lineno: 0,
            offset: 1,
            prev: Prev::Start,
            last_word_end: 1,
            indent_stack: vec![Vec::new()],
            outdenting: false,
            done: false,
        }
    }

    /// Produce the next token, `Ok(None)` at end of stream, or a syntax or
    /// read error.
    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        if self.done {
            return Ok(None);
        }

        loop {
            if !self.have_line {
                self.lineno += 1;
                self.offset = 1;
                self.line.clear();
                if let Err(err) = self.reader.read_until(b'\n', &mut self.line) {
                    self.done = true;
                    return Err(err.into());
                }
                self.have_line = true;
            }

            if self.offset > self.line.len() {
                // The last line had no terminator: true end of input.
                return self.drain_eof();
            }

            match self.line[self.offset - 1] {
                b' ' | b'\t' => {
                    self.offset += 1;
                }

                b'\n' => {
                    if let Some(token) = self.line_end() {
                        return Ok(Some(token));
                    }
                }

                b'\r' => {
                    if self.line.get(self.offset) != Some(&b'\n') {
                        return Err(self.fail(ErrorKind::LineEnding, self.offset));
                    }
                    if let Some(token) = self.line_end() {
                        return Ok(Some(token));
                    }
                }

                b'#' => return Ok(Some(self.lex_comment())),

                b'{' | b'[' => {
                    if self.prev != Prev::Word {
                        return Err(self.fail(ErrorKind::UnexpectedJson, self.offset));
                    }
                    return self.lex_object().map(Some);
                }

                _ => {
                    if self.prev == Prev::Start && self.offset != 1 {
                        // The first directive must be unindented.
                        return Err(self.fail(ErrorKind::UnexpectedIndent, self.offset));
                    }

                    if self.outdenting || self.prev == Prev::Terminator {
                        match self.track_indent() {
                            Ok(Some(token)) => return Ok(Some(token)),
                            Ok(None) => {}
                            Err(err) => return Err(err),
                        }
                    }

                    return self.lex_word().map(Some);
                }
            }
        }
    }

    /// Handle `\n` or `\r\n` at the cursor. Returns the terminator token,
    /// or `None` for a blank line.
    fn line_end(&mut self) -> Option<Token> {
        match self.prev {
            Prev::Word | Prev::Object => {
                let token = Token::simple(
                    TokenKind::Terminator,
                    self.line[self.offset - 1..].to_vec(),
                    self.lineno,
                    self.offset,
                    self.line.clone(),
                );
                self.prev = Prev::Terminator;
                self.have_line = false;
                Some(token)
            }
            _ => {
                // Nothing on this line affects the directive stream.
                self.have_line = false;
                None
            }
        }
    }

    /// Handle `#` at the cursor: terminate a pending directive first, then
    /// emit the comment. Comments never touch indent tracking or `prev`.
    fn lex_comment(&mut self) -> Token {
        let ending = line_ending_len(&self.line);

        if matches!(self.prev, Prev::Word | Prev::Object) {
            // The directive ends where its last word did; the comment is
            // produced by the next call.
            let token = Token::simple(
                TokenKind::Terminator,
                self.line[self.line.len() - ending..].to_vec(),
                self.lineno,
                self.last_word_end,
                self.line.clone(),
            );
            self.prev = Prev::Terminator;
            return token;
        }

        let token = Token::simple(
            TokenKind::Comment,
            self.line[self.offset - 1..self.line.len() - ending].to_vec(),
            self.lineno,
            self.offset,
            self.line.clone(),
        );
        self.have_line = false;
        token
    }

    /// Compare the new line's indentation against the stack. Returns an
    /// Indent or Outdent token, or `None` when the level is unchanged.
    fn track_indent(&mut self) -> Result<Option<Token>, Error> {
        let indent = self.line[..self.offset - 1].to_vec();

        if self.outdenting {
            return self.outdent_step(&indent).map(Some);
        }

        let top = self.indent_stack.last().cloned().unwrap_or_default();

        if indent == top {
            return Ok(None);
        }

        if indent.starts_with(&top) {
            // The new line is deeper: open a block.
            self.indent_stack.push(indent.clone());
            self.prev = Prev::Indent;
            return Ok(Some(Token::simple(
                TokenKind::Indent,
                indent,
                self.lineno,
                self.offset,
                self.line.clone(),
            )));
        }

        if top.starts_with(&indent) {
            return self.outdent_step(&indent).map(Some);
        }

        Err(self.fail(ErrorKind::UnmatchedIndent, self.offset))
    }

    /// Close one block. Sets `outdenting` when the target level is still
    /// shallower than the new top, so the sweep continues on the next call.
    fn outdent_step(&mut self, indent: &[u8]) -> Result<Token, Error> {
        self.indent_stack.pop();
        let restored = self.indent_stack.last().cloned().unwrap_or_default();

        if restored.as_slice() != indent && !restored.starts_with(indent) {
            // The target level was never on the stack.
            return Err(self.fail(ErrorKind::UnmatchedIndent, self.offset));
        }

        self.outdenting = restored.as_slice() != indent;
        self.prev = Prev::Outdent;
        Ok(Token::simple(
            TokenKind::Outdent,
            restored,
            self.lineno,
            self.offset,
            self.line.clone(),
        ))
    }

    /// Emit the end-of-input sequence: a terminator for an unterminated
    /// directive, then one outdent per still-open block, then end of
    /// stream.
    fn drain_eof(&mut self) -> Result<Option<Token>, Error> {
        match self.prev {
            Prev::Word | Prev::Object => {
                self.prev = Prev::Terminator;
                Ok(Some(Token::simple(
                    TokenKind::Terminator,
                    Vec::new(),
                    self.lineno,
                    self.offset,
                    self.line.clone(),
                )))
            }
            Prev::Terminator | Prev::Outdent if self.indent_stack.len() > 1 => {
                self.indent_stack.pop();
                let restored = self.indent_stack.last().cloned().unwrap_or_default();
                self.prev = Prev::Outdent;
                Ok(Some(Token::simple(
                    TokenKind::Outdent,
                    restored,
                    self.lineno,
                    self.offset,
                    self.line.clone(),
                )))
            }
            _ => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Lex one shell-style word starting at the cursor: unquoted runs end
    /// at whitespace, `#`, or end of line; single and double quotes each
    /// close only their own kind and may open and close mid-word. A
    /// charstop is recorded at every quote boundary.
    fn lex_word(&mut self) -> Result<Token, Error> {
        let lineno = self.lineno;
        let mut word = Vec::new();
        let mut charstops: Vec<Charstop> = Vec::new();
        let mut quote: Option<u8> = None;
        let mut at = 0;
        let mut i = self.offset - 1;

        while i < self.line.len() {
            let c = self.line[i];

            if let Some(open) = quote {
                if c == open {
                    quote = None;
                    charstops.push(Charstop {
                        at,
                        lineno,
                        offset: i + 2,
                        line_start: 0,
                    });
                } else if c == b'\n' {
                    return Err(self.fail(ErrorKind::UnclosedQuotes, i + 1));
                } else if c == b'\r' {
                    let kind = if self.line.get(i + 1) == Some(&b'\n') {
                        ErrorKind::UnclosedQuotes
                    } else {
                        ErrorKind::LineEnding
                    };
                    return Err(self.fail(kind, i + 1));
                } else {
                    word.push(c);
                    at += 1;
                }
            } else {
                match c {
                    b' ' | b'\t' | b'\n' | b'#' => break,
                    b'\r' => {
                        if self.line.get(i + 1) == Some(&b'\n') {
                            break;
                        }
                        return Err(self.fail(ErrorKind::LineEnding, i + 1));
                    }
                    b'"' | b'\'' => {
                        quote = Some(c);
                        charstops.push(Charstop {
                            at,
                            lineno,
                            offset: i + 2,
                            line_start: 0,
                        });
                    }
                    _ => {
                        if charstops.is_empty() {
                            charstops.push(Charstop {
                                at,
                                lineno,
                                offset: i + 1,
                                line_start: 0,
                            });
                        }
                        word.push(c);
                        at += 1;
                    }
                }
            }

            i += 1;
        }

        if quote.is_some() {
            // End of input inside a quoted run.
            return Err(self.fail(ErrorKind::UnclosedQuotes, i + 1));
        }

        self.offset = i + 1;
        self.last_word_end = self.offset;
        self.prev = Prev::Word;
        Ok(Token::new(
            TokenKind::Word,
            word,
            self.line.clone(),
            charstops,
        ))
    }

    /// Lex a bracket-balanced JSON region starting at the `{` or `[` under
    /// the cursor, reading further lines as needed. The token's source
    /// snapshot is the concatenation of every spanned line; a charstop is
    /// recorded at each line boundary. Indentation is not interpreted
    /// inside the region.
    fn lex_object(&mut self) -> Result<Token, Error> {
        let open_lineno = self.lineno;
        let open_offset = self.offset;
        let text_start = self.offset - 1;

        let mut src = std::mem::take(&mut self.line);
        let mut charstops = vec![Charstop {
            at: 0,
            lineno: open_lineno,
            offset: open_offset,
            line_start: 0,
        }];
        let mut stack = vec![match src[text_start] {
            b'{' => b'}',
            _ => b']',
        }];
        let mut in_string = false;
        let mut escaped = false;
        let mut line_start = 0;
        let mut i = text_start + 1;

        loop {
            if i >= src.len() {
                let start = src.len();
                let read = match self.reader.read_until(b'\n', &mut src) {
                    Ok(read) => read,
                    Err(err) => {
                        self.done = true;
                        return Err(err.into());
                    }
                };
                if read == 0 {
                    self.line = src.split_off(line_start);
                    return Err(self
                        .fail(ErrorKind::UnexpectedEof, i - line_start + 1)
                        .with_detail("JSON object not finished"));
                }
                self.lineno += 1;
                line_start = start;
                charstops.push(Charstop {
                    at: i - text_start,
                    lineno: self.lineno,
                    offset: 1,
                    line_start,
                });
                continue;
            }

            let c = src[i];

            if in_string {
                match c {
                    b'\n' => {
                        self.line = src.split_off(line_start);
                        return Err(self.fail(ErrorKind::UnclosedQuotes, i - line_start + 1));
                    }
                    b'\r' => {
                        let kind = if src.get(i + 1) == Some(&b'\n') {
                            ErrorKind::UnclosedQuotes
                        } else {
                            ErrorKind::LineEnding
                        };
                        self.line = src.split_off(line_start);
                        return Err(self.fail(kind, i - line_start + 1));
                    }
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => {
                        in_string = false;
                        stack.pop();
                    }
                    _ => {}
                }
            } else {
                match c {
                    b'{' => stack.push(b'}'),
                    b'[' => stack.push(b']'),
                    b'"' => {
                        stack.push(b'"');
                        in_string = true;
                    }
                    b'}' | b']' => {
                        if stack.last() != Some(&c) {
                            self.line = src.split_off(line_start);
                            return Err(self.fail(ErrorKind::JsonBracket, i - line_start + 1));
                        }
                        stack.pop();
                        if stack.is_empty() {
                            i += 1;
                            break;
                        }
                    }
                    b'\r' => {
                        if src.get(i + 1) != Some(&b'\n') {
                            self.line = src.split_off(line_start);
                            return Err(self.fail(ErrorKind::LineEnding, i - line_start + 1));
                        }
                    }
                    _ => {}
                }
            }

            i += 1;
        }

        let text = src[text_start..i].to_vec();

        // Resume on the remainder of the last spanned line.
        self.line = src[line_start..].to_vec();
        self.have_line = true;
        self.offset = i - line_start + 1;
        self.last_word_end = self.offset;
        self.prev = Prev::Object;

        Ok(Token::new(TokenKind::Object, text, src, charstops))
    }

    /// Terminate the stream with a located syntax error.
    fn fail(&mut self, kind: ErrorKind, offset: usize) -> Error {
        self.done = true;
        let mut text = self.line.as_slice();
        text = &text[..text.len() - line_ending_len(text)];
        Error::at(
            kind,
            LineInfo {
                lineno: self.lineno,
                offset,
                text: text.to_vec(),
            },
        )
    }
}

impl<R: BufRead> Iterator for Tokenizer<R> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Length of the line terminator at the end of `line`: 2 for `\r\n`, 1 for
/// `\n`, 0 when the input ended without one.
fn line_ending_len(line: &[u8]) -> usize {
    if line.ends_with(b"\r\n") {
        2
    } else if line.ends_with(b"\n") {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<Token> {
        Tokenizer::new(input.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("tokenize failed")
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(Token::kind).collect()
    }

    #[test]
    fn single_directive() {
        let tokens = collect("hello world\n");
        assert_eq!(
            kinds(&tokens),
            [TokenKind::Word, TokenKind::Word, TokenKind::Terminator]
        );
        assert_eq!(tokens[0].text(), b"hello");
        assert_eq!(tokens[1].text(), b"world");
        assert_eq!(tokens[2].text(), b"\n");
    }

    #[test]
    fn empty_input() {
        assert!(collect("").is_empty());
        assert!(collect("\n\n  \n\t\n").is_empty());
    }

    #[test]
    fn missing_final_newline_still_terminates() {
        let tokens = collect("hello");
        assert_eq!(kinds(&tokens), [TokenKind::Word, TokenKind::Terminator]);
        assert_eq!(tokens[1].text(), b"");
    }

    #[test]
    fn quoted_words_concatenate() {
        let tokens = collect("set greeting 'Hello, World!'\n");
        assert_eq!(tokens[2].text(), b"Hello, World!");
    }

    #[test]
    fn quote_runs_can_open_mid_word() {
        let tokens = collect("say pre'fix'post\n");
        assert_eq!(tokens[1].text(), b"prefixpost");
    }

    #[test]
    fn hash_inside_quotes_is_literal() {
        let tokens = collect("say '#not a comment'\n");
        assert_eq!(tokens[1].text(), b"#not a comment");
        assert_eq!(
            kinds(&tokens),
            [TokenKind::Word, TokenKind::Word, TokenKind::Terminator]
        );
    }

    #[test]
    fn word_charstops_survive_quote_stripping() {
        let tokens = collect("say pre'fix'post\n");
        let word = &tokens[1];
        // p-r-e at columns 5..7, f-i-x at 9..11, p-o-s-t at 13..16.
        assert_eq!(word.line_info(0).offset, 5);
        assert_eq!(word.line_info(2).offset, 7);
        assert_eq!(word.line_info(3).offset, 9);
        assert_eq!(word.line_info(5).offset, 11);
        assert_eq!(word.line_info(6).offset, 13);
        assert_eq!(word.line_info(9).offset, 16);
    }

    #[test]
    fn lone_carriage_return_is_an_error() {
        let mut tokens = Tokenizer::new("foo\rbar\n".as_bytes());
        let err = tokens.next_token().expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::LineEnding);
        assert_eq!(err.location().offset, 4);
    }

    #[test]
    fn errors_fuse_the_stream() {
        let mut tokens = Tokenizer::new("'open\n".as_bytes());
        let err = tokens.next_token().expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnclosedQuotes);
        assert!(matches!(tokens.next_token(), Ok(None)));
        assert!(matches!(tokens.next_token(), Ok(None)));
    }

    #[test]
    fn indents_balance_outdents() {
        let tokens = collect("a\n  b\n    c\nd\n");
        let indents = tokens
            .iter()
            .filter(|t| t.kind() == TokenKind::Indent)
            .count();
        let outdents = tokens
            .iter()
            .filter(|t| t.kind() == TokenKind::Outdent)
            .count();
        assert_eq!(indents, 2);
        assert_eq!(outdents, 2);
    }

    #[test]
    fn single_line_json() {
        let tokens = collect("put { \"a\": [1, 2] }\n");
        assert_eq!(
            kinds(&tokens),
            [TokenKind::Word, TokenKind::Object, TokenKind::Terminator]
        );
        assert_eq!(tokens[1].text(), b"{ \"a\": [1, 2] }");
    }

    #[test]
    fn json_string_can_hold_brackets() {
        let tokens = collect("put { \"a\": \"}]\" }\n");
        assert_eq!(tokens[1].text(), b"{ \"a\": \"}]\" }");
    }

    #[test]
    fn json_escaped_quote_stays_in_string() {
        let tokens = collect("put { \"a\": \"x\\\"}\" }\n");
        assert_eq!(tokens[1].text(), b"{ \"a\": \"x\\\"}\" }");
    }
}
