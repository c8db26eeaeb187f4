use parking_lot::RwLock;

use crate::translator::TranslatorRef;

/// Supplies every translator known to the surrounding configuration.
pub trait TranslatorSource: Send + Sync {
    fn translators(&self) -> Vec<TranslatorRef>;
}

/// A plain list of translators, in registration order.
#[derive(Default)]
pub struct TranslatorRegistry {
    translators: RwLock<Vec<TranslatorRef>>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, translator: TranslatorRef) {
        self.translators.write().push(translator);
    }

    pub fn len(&self) -> usize {
        self.translators.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.read().is_empty()
    }
}

impl FromIterator<TranslatorRef> for TranslatorRegistry {
    fn from_iter<I: IntoIterator<Item = TranslatorRef>>(iter: I) -> Self {
        Self {
            translators: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl TranslatorSource for TranslatorRegistry {
    fn translators(&self) -> Vec<TranslatorRef> {
        self.translators.read().clone()
    }
}
