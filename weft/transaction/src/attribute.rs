//! Per-operation transaction attributes and where they come from.

use std::error::Error;
use std::fmt;

use smol_str::SmolStr;
use weft_intercept::{ErrorMatcher, Operation};

use crate::definition::TransactionDefinition;

#[derive(Debug, Clone)]
pub enum RollbackRule {
    RollbackOn(ErrorMatcher),
    NoRollbackOn(ErrorMatcher),
}

impl RollbackRule {
    fn matcher(&self) -> &ErrorMatcher {
        match self {
            Self::RollbackOn(matcher) | Self::NoRollbackOn(matcher) => matcher,
        }
    }
}

/// A [`TransactionDefinition`] plus the decision which errors roll the transaction back.
///
/// Rules are consulted in order and the first matching rule decides. Without a matching rule
/// every error rolls back.
#[derive(Debug, Clone, Default)]
pub struct TransactionAttribute {
    definition: TransactionDefinition,
    rules: Vec<RollbackRule>,
}

impl TransactionAttribute {
    pub fn new(definition: TransactionDefinition) -> Self {
        Self {
            definition,
            rules: Vec::new(),
        }
    }

    pub fn rollback_for<E: Error + 'static>(self) -> Self {
        self.with_rule(RollbackRule::RollbackOn(ErrorMatcher::of::<E>()))
    }

    pub fn no_rollback_for<E: Error + 'static>(self) -> Self {
        self.with_rule(RollbackRule::NoRollbackOn(ErrorMatcher::of::<E>()))
    }

    pub fn with_rule(mut self, rule: RollbackRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[inline]
    pub fn definition(&self) -> &TransactionDefinition {
        &self.definition
    }

    #[inline]
    pub fn rules(&self) -> &[RollbackRule] {
        &self.rules
    }

    pub fn rolls_back_on(&self, error: &(dyn Error + 'static)) -> bool {
        match self.rules.iter().find(|rule| rule.matcher().matches(error)) {
            Some(RollbackRule::NoRollbackOn(_)) => false,
            Some(RollbackRule::RollbackOn(_)) | None => true,
        }
    }
}

impl From<TransactionDefinition> for TransactionAttribute {
    fn from(definition: TransactionDefinition) -> Self {
        Self::new(definition)
    }
}

impl fmt::Display for TransactionAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.definition)?;
        for rule in &self.rules {
            match rule {
                RollbackRule::RollbackOn(m) => write!(f, ",-{}", m.description())?,
                RollbackRule::NoRollbackOn(m) => write!(f, ",+{}", m.description())?,
            }
        }
        Ok(())
    }
}

/// Decides which operations run transactionally and how.
pub trait TransactionAttributeSource: Send + Sync {
    /// Returns `None` for operations that are not transactional.
    fn attribute(&self, operation: &Operation) -> Option<TransactionAttribute>;
}

/// Applies one attribute to every operation.
#[derive(Debug, Clone, Default)]
pub struct FixedAttributeSource {
    attribute: TransactionAttribute,
}

impl FixedAttributeSource {
    pub fn new(attribute: impl Into<TransactionAttribute>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl TransactionAttributeSource for FixedAttributeSource {
    fn attribute(&self, _operation: &Operation) -> Option<TransactionAttribute> {
        Some(self.attribute.clone())
    }
}

/// Maps operation names, or `*` wildcard patterns over them, to attributes.
///
/// An exact name wins over patterns; among matching patterns the longest wins.
#[derive(Debug, Clone, Default)]
pub struct NameMatchAttributeSource {
    mappings: Vec<(SmolStr, TransactionAttribute)>,
}

impl NameMatchAttributeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: impl Into<SmolStr>, attribute: impl Into<TransactionAttribute>) {
        self.mappings.push((pattern.into(), attribute.into()));
    }

    pub fn with(
        mut self,
        pattern: impl Into<SmolStr>,
        attribute: impl Into<TransactionAttribute>,
    ) -> Self {
        self.add(pattern, attribute);
        self
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl TransactionAttributeSource for NameMatchAttributeSource {
    fn attribute(&self, operation: &Operation) -> Option<TransactionAttribute> {
        let name = operation.name();
        if let Some((_, attribute)) = self.mappings.iter().find(|(p, _)| p == name) {
            return Some(attribute.clone());
        }
        self.mappings
            .iter()
            .filter(|(pattern, _)| simple_match(pattern, name))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, attribute)| attribute.clone())
    }
}

/// Matches `text` against `pattern`, where `*` stands for any run of characters.
fn simple_match(pattern: &str, text: &str) -> bool {
    let Some((head, rest)) = pattern.split_once('*') else {
        return pattern == text;
    };
    let Some(text) = text.strip_prefix(head) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .any(|i| simple_match(rest, &text[i..]))
}
