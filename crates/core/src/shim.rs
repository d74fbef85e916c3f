use crate::arguments::{Arguments, Block, InvokeResult, Value};
use crate::chain::ChainNode;
use crate::continuation::{Continuation, Operation};
use crate::scope::MethodKey;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::trace;

/// The entry point installed in front of one decorated method.
///
/// There is at most one shim per (scope, method name) of an owner. Later
/// decorations of the same method extend the tail of [`chain`](DispatchShim::chain)
/// instead of installing another shim, so a caller may keep the handle around and
/// dispatch through it directly.
pub struct DispatchShim<V> {
    owner: Arc<str>,
    method: MethodKey,
    head: Arc<ChainNode<V>>,
}

impl<V> DispatchShim<V> {
    pub(crate) fn new(owner: Arc<str>, method: MethodKey, head: Arc<ChainNode<V>>) -> Self {
        Self { owner, method, head }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn method(&self) -> &MethodKey {
        &self.method
    }

    /// Head of the bound chain, the outermost decorator.
    pub fn chain(&self) -> &Arc<ChainNode<V>> {
        &self.head
    }

    pub fn len(&self) -> usize {
        self.head.len()
    }

    /// A shim always wraps at least one decorator.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn decorator_names(&self) -> Vec<String> {
        self.head.names()
    }
}

impl<V: Value> DispatchShim<V> {
    /// Run the bound chain around `original`.
    pub fn call<F>(&self, arguments: Arguments<V>, block: Option<Block<V>>, original: F) -> InvokeResult<V>
    where
        F: Fn(Arguments<V>, Option<&Block<V>>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        self.call_operation(arguments, block, Arc::new(original))
    }

    pub fn call_operation(&self, arguments: Arguments<V>, block: Option<Block<V>>, original: Operation<V>) -> InvokeResult<V> {
        trace!(owner = %self.owner, method = %self.method, depth = self.len(), "dispatch decorated call");
        let continuation = Continuation::start(
            Arc::clone(&self.owner),
            self.method.clone(),
            Some(Arc::clone(&self.head)),
            arguments,
            block,
            original,
        );
        continuation.proceed()
    }
}

impl<V> Debug for DispatchShim<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchShim")
            .field("owner", &self.owner)
            .field("method", &self.method)
            .field("chain", &self.head.names())
            .finish()
    }
}
