use crate::lock;
use micro_decorator::{
    Arguments, BoxError, Continuation, DeclarationContext, DecoratorDefinition, DecoratorKind, Injector, InvokeResult, Value,
};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

/// A named, reusable set of decorator definitions.
///
/// Owners [`include`](crate::Owner::include) a module to make its decorators
/// available. The definitions are shared, not copied: redefining a decorator in
/// the module later is seen by every owner that included it, and reported to
/// each of their observers.
pub struct DecoratorModule<V> {
    name: Arc<str>,
    definitions: BTreeMap<String, Arc<DecoratorDefinition<V>>>,
    includers: Mutex<Vec<Weak<Injector<V>>>>,
}

impl<V: Value> DecoratorModule<V> {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into(), definitions: BTreeMap::new(), includers: Mutex::new(Vec::new()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define a context-free decorator.
    pub fn def_decorator<F>(&mut self, name: &str, behavior: F) -> Arc<DecoratorDefinition<V>>
    where
        F: Fn(&Continuation<V>, Arguments<V>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        self.define(name, DecoratorKind::context_free(behavior))
    }

    /// Define a decorator whose behavior is built from its declaration context.
    pub fn def_decorator_factory<F, B>(&mut self, name: &str, factory: F) -> Arc<DecoratorDefinition<V>>
    where
        F: Fn(&DeclarationContext<V>) -> Result<B, BoxError> + Send + Sync + 'static,
        B: Fn(&Continuation<V>, Arguments<V>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        self.define(name, DecoratorKind::context_factory(factory))
    }

    /// Create `name` or replace the existing definition's kind in place.
    pub fn define(&mut self, name: &str, kind: DecoratorKind<V>) -> Arc<DecoratorDefinition<V>> {
        if let Some(existing) = self.definitions.get(name) {
            warn!(module = %self.name, decorator = name, from = existing.kind().label(), to = kind.label(), "decorator redefined");
            existing.redefine(kind);
            let existing = Arc::clone(existing);
            for injector in self.live_includers() {
                injector.report_redefinition(&existing);
            }
            return existing;
        }

        let definition = Arc::new(DecoratorDefinition::new(name, kind));
        self.definitions.insert(name.to_owned(), Arc::clone(&definition));
        definition
    }

    /// Remember an owner's injector, so later redefinitions reach its observer.
    pub(crate) fn track(&self, injector: &Arc<Injector<V>>) {
        let mut includers = lock(&self.includers);
        includers.retain(|included| included.strong_count() > 0 && !std::ptr::eq(included.as_ptr(), Arc::as_ptr(injector)));
        includers.push(Arc::downgrade(injector));
    }

    fn live_includers(&self) -> Vec<Arc<Injector<V>>> {
        let mut includers = lock(&self.includers);
        includers.retain(|included| included.strong_count() > 0);
        includers.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<DecoratorDefinition<V>>> {
        self.definitions.get(name)
    }

    /// Definitions in name order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<DecoratorDefinition<V>>> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl<V> Debug for DecoratorModule<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoratorModule")
            .field("name", &self.name)
            .field("decorators", &self.definitions.keys().collect::<Vec<_>>())
            .finish()
    }
}
