use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::dispatch::DirectiveHandler;
use crate::error::DirectiveError;

type Outcome = Result<Option<Box<dyn DirectiveHandler>>, DirectiveError>;

/// How many word arguments a directive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Exactly(usize),
    /// At least `n` arguments; the rest bind as extra strings.
    AtLeast(usize),
}

impl Arity {
    fn check(self, argv: &[String]) -> Result<(), DirectiveError> {
        let required = match self {
            Self::Exactly(n) | Self::AtLeast(n) => n,
        };
        if argv.len() < required {
            // Located past the last provided argument.
            return Err(DirectiveError::argument(argv.len(), "not enough arguments"));
        }
        if let Self::Exactly(n) = self {
            if argv.len() > n {
                // Located at the first excess argument.
                return Err(DirectiveError::argument(n, "too many arguments"));
            }
        }
        Ok(())
    }
}

enum Call<C> {
    Words(Box<dyn FnMut(&mut C, &[String]) -> Outcome>),
    Object(Box<dyn FnMut(&mut C, &[String], &[u8]) -> Outcome>),
}

struct Entry<C> {
    arity: Arity,
    call: Call<C>,
}

/// A directive vocabulary bound to a context value.
///
/// Entries are registered by name with [`DirectiveSet::handle`] (word
/// arguments only) or [`DirectiveSet::handle_object`] (word arguments plus
/// a JSON argument decoded into a declared type). The set itself is a
/// [`DirectiveHandler`], so it can be passed to [`crate::parse`] directly
/// or returned from another directive to serve a nested block.
///
/// Directive names are lowercase by definition; a looked-up name containing
/// an uppercase letter is an unknown directive, whether or not a matching
/// entry could exist.
pub struct DirectiveSet<C> {
    context: C,
    entries: BTreeMap<String, Entry<C>>,
    end: Option<Box<dyn FnMut(&mut C) -> Result<(), DirectiveError>>>,
}

impl<C: 'static> DirectiveSet<C> {
    /// A set with no entries, bound to `context`.
    #[must_use]
    pub fn new(context: C) -> Self {
        Self {
            context,
            entries: BTreeMap::new(),
            end: None,
        }
    }

    /// Register a directive taking word arguments only.
    #[must_use]
    pub fn handle(
        mut self,
        name: &str,
        arity: Arity,
        run: impl FnMut(&mut C, &[String]) -> Outcome + 'static,
    ) -> Self {
        debug_assert!(
            !name.bytes().any(|b| b.is_ascii_uppercase()),
            "directive names are lowercase: {name:?}"
        );
        self.entries.insert(
            name.to_string(),
            Entry {
                arity,
                call: Call::Words(Box::new(run)),
            },
        );
        self
    }

    /// Register a directive that requires a JSON argument, decoded into a
    /// fresh `T`. A decode failure becomes a bad-argument error at the
    /// JSON token, with the decoder's error as its cause.
    #[must_use]
    pub fn handle_object<T, F>(mut self, name: &str, arity: Arity, mut run: F) -> Self
    where
        T: DeserializeOwned,
        F: FnMut(&mut C, &[String], T) -> Outcome + 'static,
    {
        debug_assert!(
            !name.bytes().any(|b| b.is_ascii_uppercase()),
            "directive names are lowercase: {name:?}"
        );
        let call = Call::Object(Box::new(move |context: &mut C, argv: &[String], json: &[u8]| {
            let value = serde_json::from_slice(json)
                .map_err(|err| DirectiveError::json_with_cause(err, "invalid JSON argument"))?;
            run(context, argv, value)
        }));
        self.entries.insert(name.to_string(), Entry { arity, call });
        self
    }

    /// Register a hook to run once this block's directives are exhausted.
    #[must_use]
    pub fn on_end(mut self, run: impl FnMut(&mut C) -> Result<(), DirectiveError> + 'static) -> Self {
        self.end = Some(Box::new(run));
        self
    }

    /// The bound context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// The bound context, mutably.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Unwrap the bound context.
    pub fn into_context(self) -> C {
        self.context
    }
}

impl<C: 'static> DirectiveHandler for DirectiveSet<C> {
    fn directive(&mut self, name: &str, argv: &[String]) -> Outcome {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(DirectiveError::unknown_directive());
        }
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(DirectiveError::unknown_directive)?;
        let arity = entry.arity;
        match &mut entry.call {
            Call::Object(_) => Err(DirectiveError::argument(argv.len(), "expected JSON argument")),
            Call::Words(run) => {
                arity.check(argv)?;
                run(&mut self.context, argv)
            }
        }
    }

    fn object_directive(&mut self, name: &str, argv: &[String], json: &[u8]) -> Outcome {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(DirectiveError::unknown_directive());
        }
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(DirectiveError::unknown_directive)?;
        let arity = entry.arity;
        match &mut entry.call {
            Call::Words(_) => Err(DirectiveError::unexpected_json()),
            Call::Object(run) => {
                arity.check(argv)?;
                run(&mut self.context, argv, json)
            }
        }
    }

    fn end(&mut self) -> Result<(), DirectiveError> {
        match &mut self.end {
            Some(run) => run(&mut self.context),
            None => Ok(()),
        }
    }
}
