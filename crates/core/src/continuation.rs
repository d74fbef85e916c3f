//! The execution continuation: how a behavior runs "the rest of the chain".

use crate::arguments::{Arguments, Block, InvokeResult, Value};
use crate::chain::ChainNode;
use crate::scope::{MethodKey, Scope};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// The undecorated behavior of a method, supplied by the caller at dispatch time.
pub type Operation<V> = Arc<dyn Fn(Arguments<V>, Option<&Block<V>>) -> InvokeResult<V> + Send + Sync>;

/// Per-call data shared by every level of one dispatch.
struct Frame<V> {
    owner: Arc<str>,
    method: MethodKey,
    block: Option<Block<V>>,
    original: Operation<V>,
}

/// Handle a behavior uses to proceed to the next decorator, or to the original
/// operation once the chain is exhausted.
///
/// Each call to [`proceed`](Continuation::proceed) or
/// [`proceed_with`](Continuation::proceed_with) walks the remaining suffix again,
/// nothing is cached between calls. A behavior may also never proceed, which
/// short-circuits everything below it.
pub struct Continuation<V> {
    cursor: Option<Arc<ChainNode<V>>>,
    arguments: Mutex<Arguments<V>>,
    frame: Arc<Frame<V>>,
}

impl<V: Value> Continuation<V> {
    pub(crate) fn start(
        owner: Arc<str>,
        method: MethodKey,
        head: Option<Arc<ChainNode<V>>>,
        arguments: Arguments<V>,
        block: Option<Block<V>>,
        original: Operation<V>,
    ) -> Self {
        let frame = Frame { owner, method, block, original };
        Self { cursor: head, arguments: Mutex::new(arguments), frame: Arc::new(frame) }
    }

    /// Run the suffix with the arguments most recently seen at this level.
    ///
    /// That is the arguments this continuation was created with, or the last ones
    /// passed to [`proceed_with`](Continuation::proceed_with).
    pub fn proceed(&self) -> InvokeResult<V> {
        self.run(self.arguments())
    }

    /// Run the suffix with a complete replacement of the arguments.
    ///
    /// Everything downstream observes exactly `arguments`, keyword arguments are
    /// not merged with the previous ones.
    pub fn proceed_with(&self, arguments: Arguments<V>) -> InvokeResult<V> {
        *self.arguments.lock().unwrap_or_else(PoisonError::into_inner) = arguments.clone();
        self.run(arguments)
    }

    pub(crate) fn run(&self, arguments: Arguments<V>) -> InvokeResult<V> {
        match &self.cursor {
            None => {
                trace!(method = %self.frame.method, "invoke original operation");
                (self.frame.original)(arguments, self.frame.block.as_ref())
            }
            Some(node) => {
                let nested = Continuation {
                    cursor: node.next().cloned(),
                    arguments: Mutex::new(arguments.clone()),
                    frame: Arc::clone(&self.frame),
                };
                trace!(method = %self.frame.method, decorator = node.name(), "enter decorator");
                let behavior = node.behavior();
                behavior(&nested, arguments)
            }
        }
    }

    /// Snapshot of the arguments [`proceed`](Continuation::proceed) would use.
    pub fn arguments(&self) -> Arguments<V> {
        self.arguments.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<V> Continuation<V> {
    pub fn owner(&self) -> &str {
        &self.frame.owner
    }

    pub fn method(&self) -> &MethodKey {
        &self.frame.method
    }

    pub fn method_name(&self) -> &str {
        self.frame.method.name()
    }

    pub fn scope(&self) -> Scope {
        self.frame.method.scope()
    }

    /// The trailing block of the call, forwarded untouched to the original operation.
    pub fn block(&self) -> Option<&Block<V>> {
        self.frame.block.as_ref()
    }

    /// Number of decorators still below this point.
    pub fn remaining(&self) -> usize {
        self.cursor.as_ref().map_or(0, |node| node.len())
    }
}

impl<V: Value> Clone for Continuation<V> {
    fn clone(&self) -> Self {
        Self { cursor: self.cursor.clone(), arguments: Mutex::new(self.arguments()), frame: Arc::clone(&self.frame) }
    }
}

impl<V> Debug for Continuation<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation")
            .field("owner", &self.frame.owner)
            .field("method", &self.frame.method)
            .field("next", &self.cursor.as_ref().map(|node| node.name()))
            .finish_non_exhaustive()
    }
}
