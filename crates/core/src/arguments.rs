//! Call-time and declaration-time argument containers.
//!
//! A decorated operation is invoked with positional values, keyword values and an
//! optional trailing [`Block`]. The same shapes are captured once, at declaration
//! time, as the [`DeclarationContext`] of a decoration.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The error currency of behaviors and original operations.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The result of running a decorated call, or any suffix of it.
pub type InvokeResult<V> = Result<V, BoxError>;

/// Keyword arguments, iterated in key order.
pub type Kwargs<V> = BTreeMap<String, V>;

/// Values that can flow through a decoration chain.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// Positional and keyword arguments of a single call.
#[derive(Clone, PartialEq, Eq)]
pub struct Arguments<V> {
    positional: Vec<V>,
    keywords: Kwargs<V>,
}

impl<V> Arguments<V> {
    pub fn new(positional: Vec<V>, keywords: Kwargs<V>) -> Self {
        Self { positional, keywords }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Kwargs::new())
    }

    pub fn positional(values: impl IntoIterator<Item = V>) -> Self {
        Self::new(values.into_iter().collect(), Kwargs::new())
    }

    #[must_use]
    pub fn with_arg(mut self, value: V) -> Self {
        self.positional.push(value);
        self
    }

    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: V) -> Self {
        self.keywords.insert(key.into(), value);
        self
    }

    pub fn args(&self) -> &[V] {
        &self.positional
    }

    pub fn args_mut(&mut self) -> &mut Vec<V> {
        &mut self.positional
    }

    pub fn arg(&self, index: usize) -> Option<&V> {
        self.positional.get(index)
    }

    pub fn kwargs(&self) -> &Kwargs<V> {
        &self.keywords
    }

    pub fn kwargs_mut(&mut self) -> &mut Kwargs<V> {
        &mut self.keywords
    }

    pub fn kwarg(&self, key: &str) -> Option<&V> {
        self.keywords.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    pub fn into_parts(self) -> (Vec<V>, Kwargs<V>) {
        (self.positional, self.keywords)
    }
}

impl<V> Default for Arguments<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> From<Vec<V>> for Arguments<V> {
    fn from(positional: Vec<V>) -> Self {
        Self::new(positional, Kwargs::new())
    }
}

impl<V: Debug> Debug for Arguments<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments").field("args", &self.positional).field("kwargs", &self.keywords).finish()
    }
}

type BlockFn<V> = dyn Fn(Arguments<V>) -> InvokeResult<V> + Send + Sync;

/// A trailing callback handed to an operation, or captured by a declaration.
pub struct Block<V> {
    f: Arc<BlockFn<V>>,
}

impl<V> Block<V> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Arguments<V>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn call(&self, arguments: Arguments<V>) -> InvokeResult<V> {
        (self.f)(arguments)
    }
}

impl<V> Clone for Block<V> {
    fn clone(&self) -> Self {
        Self { f: Arc::clone(&self.f) }
    }
}

impl<V> Debug for Block<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Block(..)")
    }
}

/// Everything a decoration was given when it was declared.
///
/// Context-free decorators ignore it; it is still kept on the chain node for
/// diagnostics.
#[derive(Clone)]
pub struct DeclarationContext<V> {
    arguments: Arguments<V>,
    block: Option<Block<V>>,
}

impl<V> DeclarationContext<V> {
    pub fn new(arguments: Arguments<V>, block: Option<Block<V>>) -> Self {
        Self { arguments, block }
    }

    pub fn empty() -> Self {
        Self::new(Arguments::empty(), None)
    }

    pub fn arguments(&self) -> &Arguments<V> {
        &self.arguments
    }

    pub fn args(&self) -> &[V] {
        self.arguments.args()
    }

    pub fn arg(&self, index: usize) -> Option<&V> {
        self.arguments.arg(index)
    }

    pub fn kwargs(&self) -> &Kwargs<V> {
        self.arguments.kwargs()
    }

    pub fn kwarg(&self, key: &str) -> Option<&V> {
        self.arguments.kwarg(key)
    }

    pub fn block(&self) -> Option<&Block<V>> {
        self.block.as_ref()
    }
}

impl<V> Default for DeclarationContext<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> From<Arguments<V>> for DeclarationContext<V> {
    fn from(arguments: Arguments<V>) -> Self {
        Self::new(arguments, None)
    }
}

impl<V: Debug> Debug for DeclarationContext<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclarationContext")
            .field("arguments", &self.arguments)
            .field("block", &self.block.is_some())
            .finish()
    }
}
