//! Tokenizer and directive dispatcher for the indentfile configuration
//! syntax.
//!
//! An indentfile is a sequence of directives - a name, word arguments with
//! shell-style quoting, and optionally one JSON argument - scoped into
//! nested blocks by indentation. Parsing does not build an AST: each
//! directive is dispatched to a caller-supplied handler, and a handler may
//! return another handler to receive the directives of an indented
//! sub-block.
//!
//! # Quick start
//!
//! ## Parse with a directive table
//!
//! ```
//! use indentfile_rs::{Arity, DirectiveSet, parse_str};
//!
//! let mut handler = DirectiveSet::new(Vec::new()).handle(
//!     "greet",
//!     Arity::AtLeast(1),
//!     |log: &mut Vec<String>, argv: &[String]| {
//!         log.push(argv.join(" "));
//!         Ok(None)
//!     },
//! );
//!
//! parse_str("greet hello world\ngreet 'quoted name'\n", &mut handler)?;
//! assert_eq!(
//!     handler.context(),
//!     &vec!["hello world".to_string(), "quoted name".to_string()],
//! );
//! # Ok::<(), indentfile_rs::Error>(())
//! ```
//!
//! ## Nested blocks
//!
//! A directive opts into sub-directives by returning a handler for them:
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use indentfile_rs::{Arity, DirectiveSet, parse_str};
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sections = Rc::clone(&log);
//! let mut handler = DirectiveSet::new(()).handle(
//!     "section",
//!     Arity::Exactly(1),
//!     move |_ctx: &mut (), argv: &[String]| {
//!         let name = argv[0].clone();
//!         let entries = Rc::clone(&sections);
//!         Ok(Some(Box::new(DirectiveSet::new(()).handle(
//!             "entry",
//!             Arity::Exactly(1),
//!             move |_ctx: &mut (), argv: &[String]| {
//!                 entries.borrow_mut().push(format!("{name}.{}", argv[0]));
//!                 Ok(None)
//!             },
//!         ))))
//!     },
//! );
//!
//! parse_str("section app\n    entry start\n    entry stop\n", &mut handler)?;
//! assert_eq!(
//!     *log.borrow(),
//!     vec!["app.start".to_string(), "app.stop".to_string()],
//! );
//! # Ok::<(), indentfile_rs::Error>(())
//! ```
//!
//! ## JSON arguments
//!
//! A directive may take one JSON argument, decoded into a declared type:
//!
//! ```
//! use indentfile_rs::{Arity, DirectiveSet, parse_str};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Fields {
//!     key: String,
//! }
//!
//! let mut handler = DirectiveSet::new(String::new()).handle_object(
//!     "set-fields",
//!     Arity::Exactly(1),
//!     |out: &mut String, argv: &[String], fields: Fields| {
//!         *out = format!("{}={}", argv[0], fields.key);
//!         Ok(None)
//!     },
//! );
//!
//! parse_str("set-fields target {\n    \"key\": \"value\"\n}\n", &mut handler)?;
//! assert_eq!(handler.context(), "target=value");
//! # Ok::<(), indentfile_rs::Error>(())
//! ```
//!
//! For lower-level control, implement [`DirectiveHandler`] directly, or
//! iterate the raw token stream with [`Tokenizer`].
//!
//! Errors render as `<kind> at line L:C[: detail]`; attach a filename with
//! [`Error::in_file`] to get `<kind> in file F (L:C)[: detail]` instead.

// Pedantic lints that don't pay their way in a small library.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod directives;
pub mod dispatch;
pub mod error;
pub mod token;
pub mod tokenizer;

pub use directives::{Arity, DirectiveSet};
pub use dispatch::{DirectiveHandler, HandlerFn, parse, parse_str, parse_tokens};
pub use error::{DirectiveError, Error, ErrorKind};
pub use token::{LineInfo, Token, TokenKind};
pub use tokenizer::Tokenizer;
