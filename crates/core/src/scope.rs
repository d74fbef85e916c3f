use crate::error::DecorateError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// The method namespace a decoration targets.
///
/// Each scope has its own pending queue and its own bound chains, a decoration
/// declared for one scope never affects the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// methods called on a value of the owner type
    Instance,
    /// methods called on the owner type itself
    Type,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Instance, Scope::Type];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Instance => "instance",
            Scope::Type => "type",
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = DecorateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instance" => Ok(Scope::Instance),
            "type" | "singleton" => Ok(Scope::Type),
            other => Err(DecorateError::invalid_scope(other)),
        }
    }
}

/// Identifies one dispatch shim: a method name inside a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    scope: Scope,
    name: Arc<str>,
}

impl MethodKey {
    pub fn new(scope: Scope, name: impl Into<Arc<str>>) -> Self {
        Self { scope, name: name.into() }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for MethodKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            Scope::Instance => write!(f, "instance#{}", self.name),
            Scope::Type => write!(f, "type.{}", self.name),
        }
    }
}
