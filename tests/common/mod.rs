#![allow(dead_code)]

use indentfile_rs::{Error, ErrorKind, TokenKind, Tokenizer};

/// One expected token: kind, line, column, and parsed text.
pub type Expect = (TokenKind, usize, usize, &'static str);

/// Tokenize `input` and assert the whole stream matches `expect`, ending
/// cleanly.
pub fn expect_tokens(input: &str, expect: &[Expect]) {
    let mut tokens = Tokenizer::new(input.as_bytes());
    check_prefix(&mut tokens, expect);
    match tokens.next_token() {
        Ok(None) => {}
        Ok(Some(token)) => panic!("unexpected trailing token: {token:?}"),
        Err(err) => panic!("unexpected error instead of end of stream: {err}"),
    }
}

/// Tokenize `input`, assert the stream starts with `expect`, then fails
/// with `kind` at `lineno:offset` and fuses.
pub fn expect_failure(
    input: &str,
    expect: &[Expect],
    kind: ErrorKind,
    lineno: usize,
    offset: usize,
) -> Error {
    let mut tokens = Tokenizer::new(input.as_bytes());
    check_prefix(&mut tokens, expect);
    let err = match tokens.next_token() {
        Err(err) => err,
        Ok(token) => panic!("expected an error, got {token:?}"),
    };
    assert_eq!(err.kind(), kind, "error kind: {err}");
    assert_eq!(
        (err.location().lineno, err.location().offset),
        (lineno, offset),
        "error location: {err}"
    );
    assert!(
        matches!(tokens.next_token(), Ok(None)),
        "stream must fuse after an error"
    );
    err
}

fn check_prefix(tokens: &mut Tokenizer<&[u8]>, expect: &[Expect]) {
    for (i, (kind, lineno, offset, text)) in expect.iter().enumerate() {
        let token = match tokens.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => panic!("token {i}: unexpected end of stream"),
            Err(err) => panic!("token {i}: unexpected error: {err}"),
        };
        assert_eq!(token.kind(), *kind, "token {i} kind");
        let info = token.line_info(0);
        assert_eq!(
            (info.lineno, info.offset),
            (*lineno, *offset),
            "token {i} ({kind:?}) location"
        );
        assert_eq!(
            token.text(),
            text.as_bytes(),
            "token {i} ({kind:?}) text was {:?}",
            String::from_utf8_lossy(token.text())
        );
    }
}
