//! Transaction definitions: propagation, isolation, timeout, read-only flag and name.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::TransactionError;

/// How a call relates to a transaction that may already be active in its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Propagation {
    /// Join the current transaction, or begin one if there is none.
    #[default]
    Required,
    /// Join the current transaction, or run without one.
    Supports,
    /// Join the current transaction; fail if there is none.
    Mandatory,
    /// Suspend the current transaction, if any, and begin an independent one.
    RequiresNew,
    /// Suspend the current transaction, if any, and run without one.
    NotSupported,
    /// Run without a transaction; fail if one is active.
    Never,
    /// Run inside a savepoint of the current transaction, or begin one if there is none.
    Nested,
}

impl Propagation {
    pub const ALL: [Propagation; 7] = [
        Self::Required,
        Self::Supports,
        Self::Mandatory,
        Self::RequiresNew,
        Self::NotSupported,
        Self::Never,
        Self::Nested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Supports => "SUPPORTS",
            Self::Mandatory => "MANDATORY",
            Self::RequiresNew => "REQUIRES_NEW",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::Never => "NEVER",
            Self::Nested => "NESTED",
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Isolation {
    /// Whatever the backend uses by default.
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl Isolation {
    pub const ALL: [Isolation; 5] = [
        Self::Default,
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Serializable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::ReadUncommitted => "READ_UNCOMMITTED",
            Self::ReadCommitted => "READ_COMMITTED",
            Self::RepeatableRead => "REPEATABLE_READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeout {
    /// The manager's default timeout, if it has one.
    #[default]
    Default,
    After(Duration),
}

impl Timeout {
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Default => None,
            Self::After(duration) => Some(*duration),
        }
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// Immutable description of the transaction a call needs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionDefinition {
    propagation: Propagation,
    isolation: Isolation,
    timeout: Timeout,
    read_only: bool,
    name: Option<SmolStr>,
}

impl TransactionDefinition {
    pub fn new(propagation: Propagation) -> Self {
        Self {
            propagation,
            ..Self::default()
        }
    }

    /// `REQUIRED`, default isolation, default timeout, read-write, unnamed.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::After(timeout);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    #[inline]
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    #[inline]
    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Renders the attribute form `PROPAGATION_REQUIRED,ISOLATION_DEFAULT[,timeout_N][,readOnly]`.
///
/// A timeout is rendered in seconds when it is a whole number of seconds and as `timeout_Nms`
/// otherwise, rounded up to the next millisecond.
impl fmt::Display for TransactionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PROPAGATION_{},ISOLATION_{}", self.propagation, self.isolation)?;
        if let Timeout::After(duration) = self.timeout {
            if duration.subsec_nanos() == 0 {
                write!(f, ",timeout_{}", duration.as_secs())?;
            } else {
                write!(f, ",timeout_{}ms", duration.as_nanos().div_ceil(1_000_000))?;
            }
        }
        if self.read_only {
            f.write_str(",readOnly")?;
        }
        Ok(())
    }
}

/// Parses the attribute form produced by `Display`. Tokens may come in any order.
impl FromStr for TransactionDefinition {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut definition = Self::default();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(name) = token.strip_prefix("PROPAGATION_") {
                definition.propagation = Propagation::ALL
                    .into_iter()
                    .find(|p| p.as_str() == name)
                    .ok_or_else(|| invalid_token(token))?;
            } else if let Some(name) = token.strip_prefix("ISOLATION_") {
                definition.isolation = Isolation::ALL
                    .into_iter()
                    .find(|i| i.as_str() == name)
                    .ok_or_else(|| invalid_token(token))?;
            } else if let Some(value) = token.strip_prefix("timeout_") {
                let duration = match value.strip_suffix("ms") {
                    Some(millis) => millis.parse().map(Duration::from_millis),
                    None => value.parse().map(Duration::from_secs),
                };
                definition.timeout = Timeout::After(duration.map_err(|_| invalid_token(token))?);
            } else if token == "readOnly" {
                definition.read_only = true;
            } else {
                return Err(invalid_token(token));
            }
        }
        Ok(definition)
    }
}

fn invalid_token(token: &str) -> TransactionError {
    TransactionError::Configuration(format!("invalid transaction attribute token `{token}`"))
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_defaults() {
        let definition = TransactionDefinition::with_defaults();
        assert_eq!(definition.propagation(), Propagation::Required);
        assert_eq!(definition.isolation(), Isolation::Default);
        assert!(definition.timeout().is_default());
        assert!(!definition.is_read_only());
        assert_eq!(definition.name(), None);
        assert_snapshot!(definition.to_string(), @"PROPAGATION_REQUIRED,ISOLATION_DEFAULT");
    }

    #[test]
    fn test_display_and_parse() {
        let definition = TransactionDefinition::new(Propagation::RequiresNew)
            .with_isolation(Isolation::Serializable)
            .with_timeout(Duration::from_secs(10))
            .with_read_only(true);
        assert_snapshot!(
            definition.to_string(),
            @"PROPAGATION_REQUIRES_NEW,ISOLATION_SERIALIZABLE,timeout_10,readOnly"
        );
        assert_eq!(
            definition.to_string().parse::<TransactionDefinition>().unwrap(),
            definition
        );

        let parsed: TransactionDefinition = "readOnly, PROPAGATION_NESTED".parse().unwrap();
        assert_eq!(parsed.propagation(), Propagation::Nested);
        assert!(parsed.is_read_only());
    }

    #[test]
    fn test_parse_rejects_unknown_tokens() {
        let err = "PROPAGATION_SOMETIMES".parse::<TransactionDefinition>().unwrap_err();
        assert_snapshot!(
            err.to_string(),
            @"configuration error: invalid transaction attribute token `PROPAGATION_SOMETIMES`"
        );
        assert!("timeout_soon".parse::<TransactionDefinition>().is_err());
        assert!("timeout_5s".parse::<TransactionDefinition>().is_err());
    }

    #[test]
    fn test_sub_second_timeout_keeps_its_deadline() {
        let definition =
            TransactionDefinition::with_defaults().with_timeout(Duration::from_millis(500));
        assert_snapshot!(
            definition.to_string(),
            @"PROPAGATION_REQUIRED,ISOLATION_DEFAULT,timeout_500ms"
        );
        let parsed: TransactionDefinition = definition.to_string().parse().unwrap();
        assert_eq!(parsed.timeout().duration(), Some(Duration::from_millis(500)));

        let fraction =
            TransactionDefinition::with_defaults().with_timeout(Duration::from_micros(1500));
        assert_snapshot!(
            fraction.to_string(),
            @"PROPAGATION_REQUIRED,ISOLATION_DEFAULT,timeout_2ms"
        );
        let parsed: TransactionDefinition = fraction.to_string().parse().unwrap();
        assert_eq!(parsed.timeout().duration(), Some(Duration::from_millis(2)));
    }

    #[test]
    fn test_serde() {
        let definition: TransactionDefinition =
            serde_json::from_str(r#"{"propagation":"NOT_SUPPORTED","read_only":true}"#).unwrap();
        assert_eq!(definition.propagation(), Propagation::NotSupported);
        assert_eq!(definition.isolation(), Isolation::Default);
        assert!(definition.is_read_only());

        let json = serde_json::to_string(&TransactionDefinition::new(Propagation::Never)).unwrap();
        assert_snapshot!(
            json,
            @r#"{"propagation":"NEVER","isolation":"DEFAULT","timeout":"default","read_only":false,"name":null}"#
        );
    }
}
