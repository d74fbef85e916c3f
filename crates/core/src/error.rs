use crate::arguments::BoxError;
use thiserror::Error;

/// Failures of the declaration surface.
///
/// Errors raised by behaviors or original operations never show up here, they
/// travel through the chain as [`BoxError`] untouched.
#[derive(Error, Debug)]
pub enum DecorateError {
    #[error("unknown decorator `{name}` for {owner}")]
    UnknownDecorator { owner: String, name: String },

    #[error("invalid scope `{scope}`, expected `instance` or `type`")]
    InvalidScope { scope: String },

    #[error("decorator factory `{name}` rejected its declaration context: {source}")]
    FactoryFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("decorator `{name}` is already linked into a chain")]
    AlreadyLinked { name: String },
}

impl DecorateError {
    pub fn unknown_decorator<O: ToString, N: ToString>(owner: O, name: N) -> Self {
        Self::UnknownDecorator { owner: owner.to_string(), name: name.to_string() }
    }

    pub fn invalid_scope<S: ToString>(scope: S) -> Self {
        Self::InvalidScope { scope: scope.to_string() }
    }

    pub fn factory_failed<N: ToString>(name: N, source: BoxError) -> Self {
        Self::FactoryFailed { name: name.to_string(), source }
    }

    pub fn already_linked<N: ToString>(name: N) -> Self {
        Self::AlreadyLinked { name: name.to_string() }
    }
}
