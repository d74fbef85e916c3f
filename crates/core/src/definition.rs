//! Decorator definitions: the named templates chain nodes are made from.

use crate::arguments::{Arguments, BoxError, DeclarationContext, InvokeResult, Value};
use crate::chain::ChainNode;
use crate::continuation::Continuation;
use crate::error::DecorateError;
use arc_swap::ArcSwap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A wrapping behavior: receives the continuation of the rest of the chain and
/// the current arguments, decides whether and how to proceed.
pub type Behavior<V> = Arc<dyn Fn(&Continuation<V>, Arguments<V>) -> InvokeResult<V> + Send + Sync>;

/// Builds a [`Behavior`] from the context given when a decoration is declared.
pub type Factory<V> = Arc<dyn Fn(&DeclarationContext<V>) -> Result<Behavior<V>, BoxError> + Send + Sync>;

/// How a definition turns into a wrapping behavior.
pub enum DecoratorKind<V> {
    /// a fixed behavior, shared by every node of the definition
    ContextFree(Behavior<V>),
    /// a factory, invoked once per node with that node's declaration context
    ContextFactory(Factory<V>),
}

impl<V: Value> DecoratorKind<V> {
    pub fn context_free<F>(f: F) -> Self
    where
        F: Fn(&Continuation<V>, Arguments<V>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        Self::ContextFree(Arc::new(f))
    }

    pub fn context_factory<F, B>(f: F) -> Self
    where
        F: Fn(&DeclarationContext<V>) -> Result<B, BoxError> + Send + Sync + 'static,
        B: Fn(&Continuation<V>, Arguments<V>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        Self::ContextFactory(Arc::new(move |context: &DeclarationContext<V>| {
            f(context).map(|behavior| Arc::new(behavior) as Behavior<V>)
        }))
    }
}

impl<V> DecoratorKind<V> {
    pub fn is_context_free(&self) -> bool {
        matches!(self, Self::ContextFree(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ContextFree(_) => "context_free",
            Self::ContextFactory(_) => "context_factory",
        }
    }
}

impl<V> Clone for DecoratorKind<V> {
    fn clone(&self) -> Self {
        match self {
            Self::ContextFree(behavior) => Self::ContextFree(Arc::clone(behavior)),
            Self::ContextFactory(factory) => Self::ContextFactory(Arc::clone(factory)),
        }
    }
}

impl<V> Debug for DecoratorKind<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A named decorator template.
///
/// The definition object keeps its identity for its whole life: redefining the
/// name swaps the kind in place, so registries and chain nodes that hold the
/// definition see the replacement.
pub struct DecoratorDefinition<V> {
    name: Arc<str>,
    kind: ArcSwap<DecoratorKind<V>>,
}

impl<V> DecoratorDefinition<V> {
    pub fn new(name: impl Into<Arc<str>>, kind: DecoratorKind<V>) -> Self {
        Self { name: name.into(), kind: ArcSwap::from_pointee(kind) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Arc<DecoratorKind<V>> {
        self.kind.load_full()
    }

    pub fn is_context_free(&self) -> bool {
        self.kind.load().is_context_free()
    }

    /// Replace the kind and behavior, keeping this object.
    pub fn redefine(&self, kind: DecoratorKind<V>) {
        self.kind.store(Arc::new(kind));
    }

    /// The current behavior, if the definition is context-free right now.
    pub(crate) fn fixed_behavior(&self) -> Option<Behavior<V>> {
        match self.kind.load().as_ref() {
            DecoratorKind::ContextFree(behavior) => Some(Arc::clone(behavior)),
            DecoratorKind::ContextFactory(_) => None,
        }
    }

    /// Create a free chain node.
    ///
    /// A factory definition runs its factory here, exactly once for the node.
    pub fn instantiate(self: &Arc<Self>, context: DeclarationContext<V>) -> Result<Arc<ChainNode<V>>, DecorateError> {
        let node = match self.kind().as_ref() {
            DecoratorKind::ContextFree(behavior) => {
                ChainNode::new(Arc::clone(self), context, Arc::clone(behavior), true)
            }
            DecoratorKind::ContextFactory(factory) => {
                let behavior = factory(&context).map_err(|e| DecorateError::factory_failed(self.name(), e))?;
                ChainNode::new(Arc::clone(self), context, behavior, false)
            }
        };
        Ok(Arc::new(node))
    }
}

impl<V> Debug for DecoratorDefinition<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoratorDefinition").field("name", &self.name).field("kind", &self.kind.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{DecoratorDefinition, DecoratorKind};
    use crate::arguments::{Arguments, DeclarationContext};
    use crate::continuation::Continuation;
    use crate::error::DecorateError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_redefine_keeps_identity() {
        let definition = Arc::new(DecoratorDefinition::<i64>::new("noop", DecoratorKind::context_free(|c, _| c.proceed())));
        let alias = Arc::clone(&definition);

        definition.redefine(DecoratorKind::context_factory(|_| Ok(|c: &Continuation<i64>, _arguments: Arguments<i64>| c.proceed())));

        assert!(Arc::ptr_eq(&definition, &alias));
        assert!(!alias.is_context_free());
        assert_eq!(alias.kind().label(), "context_factory");
    }

    #[test]
    fn test_factory_runs_once_per_instantiation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let definition = Arc::new(DecoratorDefinition::<i64>::new(
            "offset",
            DecoratorKind::context_factory(move |context| {
                counter.fetch_add(1, Ordering::SeqCst);
                let offset = *context.arg(0).ok_or("offset needs a value")?;
                Ok(move |c: &Continuation<i64>, _arguments: Arguments<i64>| c.proceed().map(|v| v + offset))
            }),
        ));

        definition.instantiate(DeclarationContext::from(Arguments::positional([3]))).unwrap();
        definition.instantiate(DeclarationContext::from(Arguments::positional([10]))).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_failure_is_reported() {
        let definition = Arc::new(DecoratorDefinition::<i64>::new(
            "offset",
            DecoratorKind::context_factory(|context| {
                let offset = *context.arg(0).ok_or("offset needs a value")?;
                Ok(move |c: &Continuation<i64>, _arguments: Arguments<i64>| c.proceed().map(|v| v + offset))
            }),
        ));

        let err = definition.instantiate(DeclarationContext::empty()).unwrap_err();
        assert!(matches!(err, DecorateError::FactoryFailed { ref name, .. } if name == "offset"));
        assert_eq!(
            err.to_string(),
            "decorator factory `offset` rejected its declaration context: offset needs a value"
        );
    }
}
