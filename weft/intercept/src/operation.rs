use std::any::type_name;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

type Predicate = dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync;

/// Recognizes a class of errors, usually a concrete error type.
#[derive(Clone)]
pub struct ErrorMatcher {
    description: SmolStr,
    predicate: Arc<Predicate>,
}

impl ErrorMatcher {
    /// Matches errors whose concrete type is `E`.
    pub fn of<E: Error + 'static>() -> Self {
        Self {
            description: type_name::<E>().into(),
            predicate: Arc::new(|error: &(dyn Error + 'static)| error.is::<E>()),
        }
    }

    /// Matches errors accepted by an arbitrary predicate.
    pub fn predicate<F>(description: impl Into<SmolStr>, predicate: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    #[inline]
    pub fn matches(&self, error: &(dyn Error + 'static)) -> bool {
        (self.predicate)(error)
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorMatcher")
            .field(&self.description)
            .finish()
    }
}

/// Descriptor of an interceptable operation.
///
/// The descriptor carries the set of errors the operation declares as part of its contract.
/// Interceptors consult it to decide whether an error may pass through untouched.
#[derive(Debug, Clone)]
pub struct Operation {
    name: SmolStr,
    declared_errors: Vec<ErrorMatcher>,
}

impl Operation {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            declared_errors: Vec::new(),
        }
    }

    /// Declares `E` as an error the operation may return to its caller.
    pub fn declaring<E: Error + 'static>(self) -> Self {
        self.declaring_matching(ErrorMatcher::of::<E>())
    }

    pub fn declaring_matching(mut self, matcher: ErrorMatcher) -> Self {
        self.declared_errors.push(matcher);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn declared_errors(&self) -> &[ErrorMatcher] {
        &self.declared_errors
    }

    /// Returns true if `error` belongs to the operation's declared error set.
    pub fn declares(&self, error: &(dyn Error + 'static)) -> bool {
        self.declared_errors.iter().any(|m| m.matches(error))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
