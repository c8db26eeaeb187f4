use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};
use weft_intercept::{Interceptor, Invocation, InvocationResult};

use crate::error::ConfigurationError;
use crate::source::TranslatorSource;
use crate::translator::{ChainedTranslator, PersistenceExceptionTranslator, TranslatorRef};
use crate::translate_if_necessary;

enum Resolution {
    Fixed(TranslatorRef),
    Detect {
        source: Arc<dyn TranslatorSource>,
        resolved: OnceLock<TranslatorRef>,
    },
}

/// Chain step translating errors raised further down the chain into [`DataAccessError`]s.
///
/// Errors the operation declares are rethrown untouched unless `always_translate` is set.
/// Errors no translator recognizes are rethrown untouched.
///
/// [`DataAccessError`]: crate::DataAccessError
pub struct TranslationInterceptor {
    resolution: Resolution,
    always_translate: bool,
}

impl TranslationInterceptor {
    /// Creates an interceptor with a fixed translator.
    pub fn new(translator: TranslatorRef) -> Self {
        Self {
            resolution: Resolution::Fixed(translator),
            always_translate: false,
        }
    }

    /// Creates an interceptor that assembles its translator from `source` on first use.
    pub fn detecting(source: Arc<dyn TranslatorSource>) -> Self {
        Self {
            resolution: Resolution::Detect {
                source,
                resolved: OnceLock::new(),
            },
            always_translate: false,
        }
    }

    pub fn builder() -> TranslationInterceptorBuilder {
        TranslationInterceptorBuilder::default()
    }

    pub fn with_always_translate(mut self, always_translate: bool) -> Self {
        self.always_translate = always_translate;
        self
    }

    #[inline]
    pub fn always_translate(&self) -> bool {
        self.always_translate
    }

    /// Returns the translator in effect, resolving it from the source if needed.
    pub fn translator(&self) -> &dyn PersistenceExceptionTranslator {
        match &self.resolution {
            Resolution::Fixed(translator) => translator.as_ref(),
            Resolution::Detect { source, resolved } => resolved
                .get_or_init(|| {
                    let chained: ChainedTranslator = source.translators().into_iter().collect();
                    debug!(
                        delegates = chained.delegates().len(),
                        "detected persistence exception translators"
                    );
                    Arc::new(chained)
                })
                .as_ref(),
        }
    }
}

impl<T> Interceptor<T> for TranslationInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_, T>) -> InvocationResult<T> {
        let error = match invocation.proceed() {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !self.always_translate && invocation.operation().declares(&*error) {
            trace!(operation = %invocation.operation(), %error, "rethrowing declared error");
            return Err(error);
        }
        Err(translate_if_necessary(error, self.translator()))
    }

    fn name(&self) -> &str {
        "persistence-exception-translation"
    }
}

impl fmt::Debug for TranslationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolution = match &self.resolution {
            Resolution::Fixed(_) => "fixed",
            Resolution::Detect { resolved, .. } if resolved.get().is_some() => "detected",
            Resolution::Detect { .. } => "pending detection",
        };
        f.debug_struct("TranslationInterceptor")
            .field("translator", &resolution)
            .field("always_translate", &self.always_translate)
            .finish()
    }
}

/// Assembles a [`TranslationInterceptor`] from optional collaborators.
#[derive(Default)]
pub struct TranslationInterceptorBuilder {
    translator: Option<TranslatorRef>,
    source: Option<Arc<dyn TranslatorSource>>,
    always_translate: bool,
}

impl TranslationInterceptorBuilder {
    pub fn translator(mut self, translator: TranslatorRef) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn source(mut self, source: Arc<dyn TranslatorSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn always_translate(mut self, always_translate: bool) -> Self {
        self.always_translate = always_translate;
        self
    }

    /// An explicit translator takes precedence over detection.
    pub fn build(self) -> Result<TranslationInterceptor, ConfigurationError> {
        let interceptor = match (self.translator, self.source) {
            (Some(translator), _) => TranslationInterceptor::new(translator),
            (None, Some(source)) => TranslationInterceptor::detecting(source),
            (None, None) => {
                return Err(ConfigurationError(
                    "a persistence exception translator or a translator source is required"
                        .into(),
                ));
            }
        };
        Ok(interceptor.with_always_translate(self.always_translate))
    }
}
