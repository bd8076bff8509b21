use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::token::{LineInfo, Token, TokenKind};

/// Classifies an error produced by this crate.
///
/// Kinds form a tree: the lexical kinds descend from [`ErrorKind::Token`]
/// and the dispatch kinds from [`ErrorKind::Directive`], both rooted at
/// [`ErrorKind::Syntax`]. Use [`ErrorKind::is`] (or [`Error::is`]) to test
/// membership anywhere along the chain, the way `errors.Is` walks a wrap
/// chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Root of every syntax-level failure.
    Syntax,
    /// A lexical fault found by the tokenizer.
    Token,
    /// Input ended mid-construct.
    UnexpectedEof,
    /// A bare `\r` without a following `\n`.
    LineEnding,
    /// Indentation where none is allowed.
    UnexpectedIndent,
    /// Outdent to a level that was never opened.
    UnmatchedIndent,
    /// A quoted run left open at end of line or input.
    UnclosedQuotes,
    /// Mismatched bracket inside a JSON argument.
    JsonBracket,
    /// Root of every dispatch-level failure.
    Directive,
    /// Directive name not recognised.
    UnknownDirective,
    /// A directive argument was wrong.
    BadArgument,
    /// A JSON argument where none is accepted.
    UnexpectedJson,
    /// The input stream failed.
    Read,
}

impl ErrorKind {
    /// The parent kind, or `None` at a root.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Syntax | Self::Read => None,
            Self::Token | Self::Directive => Some(Self::Syntax),
            Self::UnexpectedEof
            | Self::LineEnding
            | Self::UnexpectedIndent
            | Self::UnmatchedIndent
            | Self::UnclosedQuotes
            | Self::JsonBracket => Some(Self::Token),
            Self::UnknownDirective | Self::BadArgument => Some(Self::Directive),
            Self::UnexpectedJson => Some(Self::BadArgument),
        }
    }

    /// Whether this kind is `ancestor` or descends from it.
    #[must_use]
    pub fn is(self, ancestor: Self) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == ancestor {
                return true;
            }
            kind = k.parent();
        }
        false
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Syntax | Self::Token => "syntax error",
            Self::UnexpectedEof => "unexpected eof",
            Self::LineEnding => "line ending error",
            Self::UnexpectedIndent => "unexpected indent",
            Self::UnmatchedIndent => "unmatched indent",
            Self::UnclosedQuotes => "unclosed quotes",
            Self::JsonBracket => "unmatched JSON syntax",
            Self::Directive => "directive error",
            Self::UnknownDirective => "unknown directive",
            Self::BadArgument => "bad argument",
            Self::UnexpectedJson => "unexpected JSON",
            Self::Read => "read error",
        };
        f.write_str(label)
    }
}

/// An error from tokenizing or parsing, with its source location when one
/// is known.
///
/// Renders as `<kind> at line L:C[: detail]`, or
/// `<kind> in file F (L:C)[: detail]` once [`Error::in_file`] has attached
/// a filename.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    location: LineInfo,
    file: Option<String>,
    detail: Option<String>,
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub(crate) fn at(kind: ErrorKind, location: LineInfo) -> Self {
        Self {
            kind,
            location,
            file: None,
            detail: None,
            cause: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether this error is `kind` or descends from it.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind.is(kind)
    }

    /// The source location this error points at, or [`LineInfo::NONE`] if
    /// it has none.
    #[must_use]
    pub fn location(&self) -> &LineInfo {
        &self.location
    }

    /// Attach a filename, so the error renders as
    /// `<kind> in file F (L:C)`. The location itself is unchanged.
    #[must_use]
    pub fn in_file(mut self, filename: impl Into<String>) -> Self {
        self.file = Some(filename.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_none() {
            write!(f, "{}", self.kind)?;
        } else if let Some(file) = &self.file {
            write!(
                f,
                "{} in file {} ({}:{})",
                self.kind, file, self.location.lineno, self.location.offset
            )?;
        } else {
            write!(
                f,
                "{} at line {}:{}",
                self.kind, self.location.lineno, self.location.offset
            )?;
        }

        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        } else if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self {
            kind: ErrorKind::Read,
            location: LineInfo::NONE,
            file: None,
            detail: None,
            cause: Some(Box::new(err)),
        }
    }
}

/// Where a [`DirectiveError`] attaches on the directive line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgPos {
    /// The directive name.
    Name,
    /// A zero-based index into `argv`.
    Arg(usize),
    /// The JSON argument, or the end of the line if there is none.
    Json,
}

/// An error returned from a directive handler.
///
/// It carries the position of the offending argument but no source
/// coordinates; the dispatcher resolves the position against the directive
/// line's tokens and converts it into a located [`Error`]. A wrapped cause
/// survives the conversion and is reachable through
/// [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct DirectiveError {
    kind: ErrorKind,
    index: ArgPos,
    detail: Option<String>,
    #[source]
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl DirectiveError {
    fn build(kind: ErrorKind, index: ArgPos) -> Self {
        Self {
            kind,
            index,
            detail: None,
            cause: None,
        }
    }

    /// An error attached to the directive name.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let mut err = Self::build(ErrorKind::Directive, ArgPos::Name);
        err.detail = Some(message.into());
        err
    }

    /// An error attached to the directive name, wrapping `cause`.
    #[must_use]
    pub fn with_cause(
        cause: impl Into<Box<dyn StdError + Send + Sync>>,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(message);
        err.cause = Some(cause.into());
        err
    }

    /// An error attached to `argv[index]`.
    #[must_use]
    pub fn argument(index: usize, message: impl Into<String>) -> Self {
        let mut err = Self::build(ErrorKind::BadArgument, ArgPos::Arg(index));
        err.detail = Some(message.into());
        err
    }

    /// An error attached to `argv[index]`, wrapping `cause`.
    #[must_use]
    pub fn argument_with_cause(
        index: usize,
        cause: impl Into<Box<dyn StdError + Send + Sync>>,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::argument(index, message);
        err.cause = Some(cause.into());
        err
    }

    /// An error attached to the JSON argument (or the end of the line when
    /// the directive has none).
    #[must_use]
    pub fn json(message: impl Into<String>) -> Self {
        let mut err = Self::build(ErrorKind::BadArgument, ArgPos::Json);
        err.detail = Some(message.into());
        err
    }

    /// An error attached to the JSON argument, wrapping `cause`.
    #[must_use]
    pub fn json_with_cause(
        cause: impl Into<Box<dyn StdError + Send + Sync>>,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::json(message);
        err.cause = Some(cause.into());
        err
    }

    /// A JSON argument was supplied to a directive that takes none.
    #[must_use]
    pub fn unexpected_json() -> Self {
        Self::build(ErrorKind::UnexpectedJson, ArgPos::Json)
    }

    /// The directive name is not recognised.
    #[must_use]
    pub fn unknown_directive() -> Self {
        Self::build(ErrorKind::UnknownDirective, ArgPos::Name)
    }

    /// Resolve the argument position against the tokens of the directive
    /// line (name word, argument words, optional JSON object, terminator).
    pub(crate) fn into_located(self, line: &[Token]) -> Error {
        let token = match self.index {
            ArgPos::Name => line.first(),
            ArgPos::Arg(index) => line.get(index + 1).or_else(|| line.last()),
            ArgPos::Json => line
                .len()
                .checked_sub(2)
                .and_then(|at| line.get(at))
                .filter(|token| token.kind() == TokenKind::Object)
                .or_else(|| line.last()),
        };

        Error {
            kind: self.kind,
            location: token.map_or(LineInfo::NONE, |token| token.line_info(0)),
            file: None,
            detail: self.detail,
            cause: self.cause,
        }
    }

    /// Convert without a location, for errors raised outside any directive
    /// line (the end-of-block hook).
    pub(crate) fn into_unlocated(self) -> Error {
        Error {
            kind: self.kind,
            location: LineInfo::NONE,
            file: None,
            detail: self.detail,
            cause: self.cause,
        }
    }
}
