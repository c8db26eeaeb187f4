use std::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use weft_intercept::BoxError;

use crate::error::DataAccessError;

pub type TranslatorRef = Arc<dyn PersistenceExceptionTranslator>;

/// Maps native errors onto [`DataAccessError`].
///
/// Implementations return `None` for errors they do not understand so that another translator,
/// or the caller, can deal with them.
pub trait PersistenceExceptionTranslator: Send + Sync {
    fn translate(&self, error: &(dyn Error + 'static)) -> Option<DataAccessError>;
}

/// Evaluates its delegates in registration order and returns the first translation.
#[derive(Clone, Default)]
pub struct ChainedTranslator {
    delegates: Vec<TranslatorRef>,
}

impl ChainedTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_delegate(&mut self, translator: TranslatorRef) {
        self.delegates.push(translator);
    }

    pub fn with_delegate(mut self, translator: TranslatorRef) -> Self {
        self.add_delegate(translator);
        self
    }

    #[inline]
    pub fn delegates(&self) -> &[TranslatorRef] {
        &self.delegates
    }
}

impl FromIterator<TranslatorRef> for ChainedTranslator {
    fn from_iter<I: IntoIterator<Item = TranslatorRef>>(iter: I) -> Self {
        Self {
            delegates: iter.into_iter().collect(),
        }
    }
}

impl PersistenceExceptionTranslator for ChainedTranslator {
    fn translate(&self, error: &(dyn Error + 'static)) -> Option<DataAccessError> {
        self.delegates.iter().find_map(|d| d.translate(error))
    }
}

impl fmt::Debug for ChainedTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedTranslator")
            .field("delegates", &self.delegates.len())
            .finish()
    }
}

/// Closure wrapper for translators
pub struct FnTranslator<F> {
    closure: F,
}

impl<F> FnTranslator<F>
where
    F: Fn(&(dyn Error + 'static)) -> Option<DataAccessError> + Send + Sync,
{
    pub fn new(closure: F) -> Self {
        Self { closure }
    }
}

impl<F> PersistenceExceptionTranslator for FnTranslator<F>
where
    F: Fn(&(dyn Error + 'static)) -> Option<DataAccessError> + Send + Sync,
{
    fn translate(&self, error: &(dyn Error + 'static)) -> Option<DataAccessError> {
        (self.closure)(error)
    }
}

/// Translator that only looks at errors of concrete type `E`.
struct TypedTranslator<E, F> {
    closure: F,
    _error: PhantomData<fn(&E)>,
}

impl<E, F> PersistenceExceptionTranslator for TypedTranslator<E, F>
where
    E: Error + 'static,
    F: Fn(&E) -> Option<DataAccessError> + Send + Sync,
{
    fn translate(&self, error: &(dyn Error + 'static)) -> Option<DataAccessError> {
        error.downcast_ref::<E>().and_then(&self.closure)
    }
}

/// Helper function to create a translator for errors of type `E`
pub fn translator_for<E, F>(f: F) -> TranslatorRef
where
    E: Error + 'static,
    F: Fn(&E) -> Option<DataAccessError> + Send + Sync + 'static,
{
    Arc::new(TypedTranslator {
        closure: f,
        _error: PhantomData,
    })
}

/// Translates `error` if `translator` recognizes it; otherwise hands the original back.
///
/// A translated error keeps the original as its source.
pub fn translate_if_necessary(
    error: BoxError,
    translator: &dyn PersistenceExceptionTranslator,
) -> BoxError {
    match translator.translate(&*error) {
        Some(translated) if translated.has_source() => Box::new(translated),
        Some(translated) => Box::new(translated.with_source(error)),
        None => error,
    }
}
