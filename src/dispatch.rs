use std::io::BufRead;

use crate::error::{DirectiveError, Error, ErrorKind};
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Receives directives for one block.
///
/// Returning `Some(handler)` from a directive makes that handler the target
/// of an indented sub-block; returning `None` forbids sub-directives (an
/// indent below such a directive is an "unexpected indent" error).
///
/// Handlers that should share state with their parent can do so through
/// `Rc<RefCell<_>>` or similar; the dispatcher itself only threads the
/// boxed handler down the block recursion.
pub trait DirectiveHandler {
    /// Called for every directive without a JSON argument.
    fn directive(
        &mut self,
        name: &str,
        argv: &[String],
    ) -> Result<Option<Box<dyn DirectiveHandler>>, DirectiveError>;

    /// Called for every directive carrying a JSON argument. `json` is the
    /// raw source of the object or array, suitable for `serde_json`.
    ///
    /// The default rejects the JSON.
    fn object_directive(
        &mut self,
        name: &str,
        argv: &[String],
        json: &[u8],
    ) -> Result<Option<Box<dyn DirectiveHandler>>, DirectiveError> {
        let _ = (name, argv, json);
        Err(DirectiveError::unexpected_json())
    }

    /// Called exactly once after the last directive of this block, whether
    /// the block ended by outdent or end of input.
    fn end(&mut self) -> Result<(), DirectiveError> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn DirectiveHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<dyn DirectiveHandler>")
    }
}

/// Adapter turning a closure into a [`DirectiveHandler`].
pub struct HandlerFn<F>(pub F);

impl<F> DirectiveHandler for HandlerFn<F>
where
    F: FnMut(&str, &[String]) -> Result<Option<Box<dyn DirectiveHandler>>, DirectiveError>,
{
    fn directive(
        &mut self,
        name: &str,
        argv: &[String],
    ) -> Result<Option<Box<dyn DirectiveHandler>>, DirectiveError> {
        (self.0)(name, argv)
    }
}

/// Parse an indentfile from `reader`, dispatching to `handler`.
pub fn parse<R: BufRead>(reader: R, handler: &mut dyn DirectiveHandler) -> Result<(), Error> {
    let mut tokens = Tokenizer::new(reader);
    parse_tokens(&mut tokens, handler)
}

/// Parse an indentfile from a string, dispatching to `handler`.
pub fn parse_str(input: &str, handler: &mut dyn DirectiveHandler) -> Result<(), Error> {
    parse(input.as_bytes(), handler)
}

/// Drive `handler` with directives from `tokens` until the stream ends or
/// an outdent closes the current block.
///
/// The first error - from the tokenizer or from a handler - terminates
/// parsing. Handler errors are located against the directive line before
/// being returned.
pub fn parse_tokens<R: BufRead>(
    tokens: &mut Tokenizer<R>,
    handler: &mut dyn DirectiveHandler,
) -> Result<(), Error> {
    let mut words: Vec<String> = Vec::new();
    let mut line: Vec<Token> = Vec::new();
    let mut json: Option<Vec<u8>> = None;
    let mut block: Option<Box<dyn DirectiveHandler>> = None;

    while let Some(token) = tokens.next_token()? {
        match token.kind() {
            TokenKind::Word => {
                words.push(String::from_utf8_lossy(token.text()).into_owned());
                line.push(token);
            }

            TokenKind::Object => {
                json = Some(token.text().to_vec());
                line.push(token);
            }

            TokenKind::Terminator => {
                line.push(token);
                let Some((name, argv)) = words.split_first() else {
                    line.clear();
                    continue;
                };

                tracing::trace!(directive = name.as_str(), args = argv.len(), "dispatch");
                let result = match json.take() {
                    None => handler.directive(name, argv),
                    Some(bytes) => handler.object_directive(name, argv, &bytes),
                };

                block = match result {
                    Ok(sub) => sub,
                    Err(err) => return Err(err.into_located(&line)),
                };
                words.clear();
                line.clear();
            }

            TokenKind::Indent => match block.take() {
                Some(mut sub) => {
                    tracing::trace!("enter block");
                    parse_tokens(tokens, sub.as_mut())?;
                }
                None => {
                    return Err(Error::at(ErrorKind::UnexpectedIndent, token.line_info(0)));
                }
            },

            TokenKind::Outdent => break,

            TokenKind::Comment => {}
        }
    }

    handler.end().map_err(DirectiveError::into_unlocated)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call it sees; nested blocks are rejected.
    struct Flat(Vec<String>);

    impl DirectiveHandler for Flat {
        fn directive(
            &mut self,
            name: &str,
            argv: &[String],
        ) -> Result<Option<Box<dyn DirectiveHandler>>, DirectiveError> {
            self.0.push(format!("{name}({})", argv.join(",")));
            Ok(None)
        }

        fn end(&mut self) -> Result<(), DirectiveError> {
            self.0.push("end".to_string());
            Ok(())
        }
    }

    #[test]
    fn dispatches_words_and_calls_end() {
        let mut handler = Flat(Vec::new());
        parse_str("one a b\ntwo 'c d'\n", &mut handler).expect("parse failed");
        assert_eq!(handler.0, ["one(a,b)", "two(c d)", "end"]);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut handler = Flat(Vec::new());
        parse_str("# header\n\none a # trailing\n\n", &mut handler).expect("parse failed");
        assert_eq!(handler.0, ["one(a)", "end"]);
    }

    #[test]
    fn indent_below_leaf_directive_fails() {
        let mut handler = Flat(Vec::new());
        let err = parse_str("one\n    two\n", &mut handler).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnexpectedIndent);
        assert_eq!(err.location().lineno, 2);
        assert_eq!(err.location().offset, 5);
    }

    #[test]
    fn default_object_directive_rejects_json() {
        let mut handler = Flat(Vec::new());
        let err = parse_str("one {\"a\": 1}\n", &mut handler).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnexpectedJson);
        // Located at the JSON token.
        assert_eq!(err.location().offset, 5);
    }

    #[test]
    fn handler_error_locates_at_the_directive_name() {
        let mut handler = HandlerFn(
            |name: &str, _argv: &[String]| -> Result<Option<Box<dyn DirectiveHandler>>, DirectiveError> {
                Err(DirectiveError::new(format!("refused {name}")))
            },
        );
        let err = parse_str("refuse me\n", &mut handler).expect_err("should fail");
        assert!(err.is(ErrorKind::Directive));
        assert_eq!(err.location().offset, 1);
        assert_eq!(err.to_string(), "directive error at line 1:1: refused refuse");
    }

    #[test]
    fn argument_error_locates_at_the_argument() {
        let mut handler = HandlerFn(
            |_name: &str, _argv: &[String]| -> Result<Option<Box<dyn DirectiveHandler>>, DirectiveError> {
                Err(DirectiveError::argument(1, "not a number"))
            },
        );
        let err = parse_str("limit ten 20\n", &mut handler).expect_err("should fail");
        assert!(err.is(ErrorKind::BadArgument));
        assert_eq!(err.location().offset, 11);
    }
}
